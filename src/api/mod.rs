//! 跨边界操作面 - 对外接口层
//!
//! 全部异步请求/响应；响应一律序列化为 camelCase 信封，失败以
//! `{success: false, error}` 的形状返回，调用方不会观察到未处理的故障。

pub mod auth;
pub mod quiz;

pub use auth::{AuthActionResult, AuthStatus};
pub use quiz::{AssistantResponse, GenerateResponse, QuizBackend};
