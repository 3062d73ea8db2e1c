//! 外部工具执行器 - 基础设施层
//!
//! 唯一负责子进程生命周期的模块，只暴露“执行一次生成”的能力。
//!
//! 工具的结构化结果通过输出交换文件回传：指令文本经标准输入写给子进
//! 程，随后轮询交换文件直到内容可解析、进程失败或超时。文件存在但尚
//! 未写完时做有限次退避重读，绝不无限等待。已经拿到可用结果的子进程
//! 不会被强杀，只有超时才终止它。

use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::Value as JsonValue;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, ExecutionError};
use crate::services::tool_discovery::CliLocator;
use crate::utils::truncate_text;

/// 常规轮询间隔
const POLL_INTERVAL_MS: u64 = 250;
/// 文件存在但不可解析时的重读上限
const PARSE_RETRY_LIMIT: u32 = 5;
/// 重读退避间隔
const PARSE_RETRY_BACKOFF_MS: u64 = 300;
/// 进程退出后继续等文件出现的轮询次数
const POST_EXIT_GRACE_POLLS: u32 = 4;
/// 错误信息中内容摘录的最大字符数
const PREVIEW_LEN: usize = 200;

/// 期望的响应类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    JsonArray,
    JsonObject,
    Text,
}

impl std::fmt::Display for ResponseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            ResponseType::JsonArray => "json-array",
            ResponseType::JsonObject => "json-object",
            ResponseType::Text => "text",
        };
        write!(f, "{}", tag)
    }
}

/// 工具产出的已解析结果
#[derive(Debug, Clone)]
pub enum ToolOutput {
    Json(JsonValue),
    Text(String),
}

/// 单次读取交换文件的结局
enum ReadOutcome {
    /// 内容完整且形状正确
    Parsed(ToolOutput),
    /// 文件还读不出来（不存在、半写、JSON 未闭合）
    Incomplete,
    /// 内容完整但形状不符
    WrongShape(String),
}

/// 外部工具执行器
pub struct CliRunner {
    locator: Arc<CliLocator>,
}

impl CliRunner {
    pub fn new(locator: Arc<CliLocator>) -> Self {
        Self { locator }
    }

    /// 执行一次生成并取回结构化结果
    ///
    /// # 参数
    /// - `prompt`: 指令文本，经标准输入传给工具
    /// - `model`: 模型标识
    /// - `working_dir`: 子进程的工作目录
    /// - `output_target`: 输出交换文件路径，读取一次后即删除
    /// - `response_type`: 期望的结果形状
    /// - `timeout_ms`: 超时毫秒数，超过即终止子进程
    pub async fn run(
        &self,
        prompt: &str,
        model: &str,
        working_dir: &Path,
        output_target: &Path,
        response_type: ResponseType,
        timeout_ms: u64,
    ) -> AppResult<ToolOutput> {
        let cli_path = self.locator.resolve()?;
        info!(
            "🚀 调用外部工具: {} (模型 {}, 期望 {}, 超时 {} 毫秒)",
            self.locator.binary(),
            model,
            response_type,
            timeout_ms,
        );
        debug!("指令长度: {} 字符", prompt.chars().count());

        let mut child = Command::new(&cli_path)
            .arg("-m")
            .arg(model)
            .current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| AppError::Execution(ExecutionError::SpawnFailed { source: e }))?;

        if let Some(mut stdin) = child.stdin.take() {
            // 写入失败多半意味着进程已经挂了，交给退出分支去报告
            if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                warn!("向子进程写入指令失败: {}", e);
            }
            let _ = stdin.shutdown().await;
        }

        let mut stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let mut exit_code: Option<Option<i32>> = None;
        let mut parse_attempts = 0u32;
        let mut grace_polls = 0u32;

        loop {
            let file_exists = tokio::fs::metadata(output_target).await.is_ok();
            if file_exists {
                match Self::read_output(output_target, response_type).await {
                    ReadOutcome::Parsed(output) => {
                        Self::remove_exchange_file(output_target).await;
                        Self::detach(child);
                        debug!("✓ 已取回工具结果 ({})", response_type);
                        return Ok(output);
                    }
                    ReadOutcome::WrongShape(preview) => {
                        Self::remove_exchange_file(output_target).await;
                        Self::detach(child);
                        return Err(AppError::Execution(ExecutionError::MalformedOutput {
                            expected: response_type.to_string(),
                            preview,
                        }));
                    }
                    ReadOutcome::Incomplete => {
                        // 进程还活着就当它在继续写；已经退出才计入重读次数
                        if exit_code.is_some() {
                            parse_attempts += 1;
                            if parse_attempts > PARSE_RETRY_LIMIT {
                                let preview = Self::file_preview(output_target).await;
                                Self::remove_exchange_file(output_target).await;
                                return Err(AppError::Execution(ExecutionError::MalformedOutput {
                                    expected: response_type.to_string(),
                                    preview,
                                }));
                            }
                            sleep(Duration::from_millis(PARSE_RETRY_BACKOFF_MS)).await;
                            continue;
                        }
                    }
                }
            } else if exit_code.is_some() {
                grace_polls += 1;
                if grace_polls > POST_EXIT_GRACE_POLLS {
                    let stderr = match stderr_task.take() {
                        Some(handle) => handle.await.unwrap_or_default(),
                        None => String::new(),
                    };
                    return Err(AppError::Execution(ExecutionError::ProcessFailed {
                        code: exit_code.flatten(),
                        stderr: truncate_text(stderr.trim(), PREVIEW_LEN),
                    }));
                }
            }

            if exit_code.is_none() {
                let status = child
                    .try_wait()
                    .map_err(|e| AppError::Execution(ExecutionError::Io { source: e }))?;
                if let Some(status) = status {
                    debug!("子进程已退出: {:?}", status.code());
                    exit_code = Some(status.code());
                }
            }

            if Instant::now() >= deadline {
                warn!("⏱️ 执行超时（{} 毫秒），终止子进程", timeout_ms);
                let _ = child.start_kill();
                Self::detach(child);
                return Err(AppError::Execution(ExecutionError::TimedOut { timeout_ms }));
            }

            sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    }

    /// 读取并解析交换文件的当前内容
    async fn read_output(path: &Path, response_type: ResponseType) -> ReadOutcome {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(_) => return ReadOutcome::Incomplete,
        };
        let cleaned = strip_code_fence(&raw).trim();

        match response_type {
            ResponseType::Text => {
                if cleaned.is_empty() {
                    ReadOutcome::Incomplete
                } else {
                    ReadOutcome::Parsed(ToolOutput::Text(cleaned.to_string()))
                }
            }
            ResponseType::JsonArray | ResponseType::JsonObject => {
                match serde_json::from_str::<JsonValue>(cleaned) {
                    // 解析失败视为尚未写完，交给有限次退避重读
                    Err(_) => ReadOutcome::Incomplete,
                    Ok(value) => {
                        let shape_ok = matches!(
                            (response_type, &value),
                            (ResponseType::JsonArray, JsonValue::Array(_))
                                | (ResponseType::JsonObject, JsonValue::Object(_))
                        );
                        if shape_ok {
                            ReadOutcome::Parsed(ToolOutput::Json(value))
                        } else {
                            ReadOutcome::WrongShape(truncate_text(&value.to_string(), PREVIEW_LEN))
                        }
                    }
                }
            }
        }
    }

    /// 读取文件内容摘录用于错误报告（截断，不原样展示）
    async fn file_preview(path: &Path) -> String {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => truncate_text(raw.trim(), PREVIEW_LEN),
            Err(_) => "<内容不可读>".to_string(),
        }
    }

    /// 删除交换文件；失败只记日志
    async fn remove_exchange_file(path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("🗑️ 删除输出交换文件失败 ({}): {}", path.display(), e);
            }
        }
    }

    /// 放掉对子进程的等待，让它自行跑完并在后台收尸
    fn detach(mut child: Child) {
        if matches!(child.try_wait(), Ok(None)) {
            tokio::spawn(async move {
                let _ = child.wait().await;
            });
        }
    }
}

/// 剥掉包裹结果的 Markdown 代码块围栏
fn strip_code_fence(raw: &str) -> &str {
    static FENCE_RE: OnceLock<Regex> = OnceLock::new();
    let re = FENCE_RE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```[a-zA-Z]*[ \t]*\r?\n(.*?)\r?\n?\s*```\s*$").expect("固定正则必定合法")
    });
    match re.captures(raw) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(raw),
        None => raw,
    }
}
