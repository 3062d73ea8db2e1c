//! 应用程序错误类型
//!
//! 按领域分层的错误分类：
//! - 输入错误（用户可恢复，重新选择文件即可）
//! - 工具发现错误（需要安装外部 CLI）
//! - 执行错误（子进程超时/失败/输出损坏，由用户手动重试，绝不自动重试）
//! - 结果形状错误（解析成功但形状不符，视为失败，不做部分采纳）
//! - 设置存储错误
//! - 会话错误（非法状态转换等）

use std::path::PathBuf;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入错误
    #[error("输入错误: {0}")]
    Input(#[from] InputError),
    /// 工具发现错误
    #[error("工具发现错误: {0}")]
    Discovery(#[from] DiscoveryError),
    /// 执行错误
    #[error("执行错误: {0}")]
    Execution(#[from] ExecutionError),
    /// 结果形状错误
    #[error("结果格式错误: {0}")]
    Shape(#[from] ShapeError),
    /// 设置存储错误
    #[error("设置存储错误: {0}")]
    Settings(#[from] SettingsError),
    /// 会话错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 输入（PDF 候选文件）校验错误
#[derive(Debug, Error)]
pub enum InputError {
    /// 尚未选择文件
    #[error("尚未选择 PDF 文件")]
    NoFileSelected,
    /// 路径被拒绝
    #[error("文件路径不合法 ({path:?}): {reason}")]
    PathRejected { path: PathBuf, reason: String },
    /// 扩展名或文件签名不是 PDF
    #[error("该文件不是有效的 PDF: {path:?}")]
    NotAPdf { path: PathBuf },
    /// 文件超过大小上限
    #[error("文件过大: {size} 字节，上限 {limit} 字节")]
    FileTooLarge { size: u64, limit: u64 },
    /// 空文件
    #[error("文件为空")]
    EmptyFile,
    /// 暂存副本失败
    #[error("暂存文件失败: {source}")]
    StageFailed {
        #[source]
        source: std::io::Error,
    },
}

/// 外部工具发现错误
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// 未找到外部 CLI
    #[error("未找到外部工具 {binary}，请先安装该 CLI 并确认其在 PATH 中")]
    CliNotFound { binary: String },
}

/// 子进程执行错误
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// 启动子进程失败
    #[error("启动子进程失败: {source}")]
    SpawnFailed {
        #[source]
        source: std::io::Error,
    },
    /// 执行超时
    #[error("执行超时（{timeout_ms} 毫秒），子进程已终止")]
    TimedOut { timeout_ms: u64 },
    /// 子进程退出但没有可用结果
    #[error("子进程退出（退出码 {code:?}）但没有产出可用结果: {stderr}")]
    ProcessFailed { code: Option<i32>, stderr: String },
    /// 输出交换文件内容损坏或形状不符
    #[error("工具输出不符合预期格式（期望 {expected}）: {preview}")]
    MalformedOutput { expected: String, preview: String },
    /// 轮询输出文件时的 IO 错误
    #[error("读取输出交换文件失败: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// 结果形状校验错误
#[derive(Debug, Error)]
pub enum ShapeError {
    /// 解析成功但不是预期的题目数组/回答对象
    #[error("响应形状不符合预期: {detail}")]
    InvalidResponseFormat { detail: String },
}

/// 设置存储错误
#[derive(Debug, Error)]
pub enum SettingsError {
    /// 读取持久化记录失败
    #[error("读取设置失败 ({path:?}): {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 写入持久化记录失败
    #[error("写入设置失败 ({path:?}): {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 持久化记录内容损坏
    #[error("解析设置记录失败: {source}")]
    ParseFailed {
        #[from]
        source: toml::de::Error,
    },
    /// 序列化整条记录失败
    #[error("序列化设置记录失败: {source}")]
    SerializeFailed {
        #[from]
        source: toml::ser::Error,
    },
}

/// 客户端会话错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 当前阶段不允许该操作
    #[error("当前阶段 {phase} 不允许执行 {action}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },
    /// 作答的题目不存在
    #[error("题目不存在: {id}")]
    UnknownQuestion { id: String },
    /// 选项下标越界
    #[error("选项下标越界: {index}")]
    ChoiceOutOfRange { index: usize },
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Shape(ShapeError::InvalidResponseFormat {
            detail: err.to_string(),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建路径拒绝错误
    pub fn path_rejected(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AppError::Input(InputError::PathRejected {
            path: path.into(),
            reason: reason.into(),
        })
    }

    /// 创建形状错误
    pub fn invalid_response(detail: impl Into<String>) -> Self {
        AppError::Shape(ShapeError::InvalidResponseFormat {
            detail: detail.into(),
        })
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
