//! # PDF Quiz Gen
//!
//! 把用户选中的 PDF 变成一套经过校验的结构化测验题：驱动外部 AI
//! 命令行工具出题，结果通过输出交换文件回传，客户端状态机负责
//! 配置 → 生成 → 预览 → 作答 → 评分 → 补救/重出 的完整旅程。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 唯一管理子进程生命周期的模块
//! - `CliRunner` - 执行外部工具，经交换文件取回结构化结果
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述“我能做什么”，互相独立
//! - `pdf_validator` - 校验并暂存输入 PDF
//! - `settings_store` - 设置记录的读取-合并-写入
//! - `prompt_builder` - 纯函数构建生成指令
//! - `tool_discovery` - 定位外部 CLI，进程内缓存一次
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/` - 组合能力层成完整用例
//! - `QuizGenerator` - 校验 → 指令 → 执行 → 形状校验，全程清理临时文件
//! - `AssistantService` - 轻量的助手问答
//!
//! ### ④ 流程层（Workflow）与对外接口（Api）
//! - `workflow/` - 客户端状态机，请求围栏与设置防抖
//! - `api/` - 跨边界操作面（生成/设置/工具状态/登录/助手）

pub mod api;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use api::{GenerateResponse, QuizBackend};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{CliRunner, ResponseType, ToolOutput};
pub use models::{
    Difficulty, GenerationMode, GenerationRequest, Question, QuizSettings, QuizSource, QuizState,
    QuizStyle, SettingsPatch,
};
pub use orchestrator::{AssistantReply, AssistantService, QuizGenerator};
pub use services::{CliLocator, CliStatus, SettingsStore};
pub use workflow::{ApplyResult, GenerationTicket, QuizPhase, QuizSession};
