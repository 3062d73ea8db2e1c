//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 把各业务能力组合成两个对外用例，是生成管线的“指挥中心”。
//!
//! ### `generation` - 测验生成
//! - 演示模式短路返回内置题集，完全不触碰子进程层
//! - 其余模式：校验暂存 → 构建交换文件路径 → 构建指令 → 执行 → 形状校验
//! - 暂存副本和交换文件在每条退出路径上都被清理
//!
//! ### `assistant` - 助手问答
//! - 构建最小指令（不暂存 PDF，不携带避免/补救主题）
//! - 请求 json-object 形状的回答
//!
//! ## 层次关系
//!
//! ```text
//! workflow::QuizSession (客户端状态机)
//!     ↓
//! orchestrator (generation / assistant)
//!     ↓
//! services (能力层：validator / prompt / discovery / settings)
//!     ↓
//! infrastructure (基础设施：CliRunner)
//! ```

pub mod assistant;
pub mod generation;

pub use assistant::{AssistantReply, AssistantService};
pub use generation::QuizGenerator;
