use std::path::PathBuf;

/// 程序配置
///
/// 每个字段都有硬编码默认值，可通过环境变量逐项覆盖。
#[derive(Clone, Debug)]
pub struct Config {
    /// 外部生成工具的可执行文件名
    pub cli_binary: String,
    /// 进程私有的工作目录（暂存副本与输出交换文件都放在这里）
    pub working_dir: PathBuf,
    /// 设置记录的持久化路径
    pub settings_path: PathBuf,
    /// 生成测验的超时时间（毫秒）
    pub generation_timeout_ms: u64,
    /// 助手问答的超时时间（毫秒）
    pub assistant_timeout_ms: u64,
    /// 生成内容的目标语言
    pub language: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cli_binary: "gemini".to_string(),
            working_dir: std::env::temp_dir().join(format!("pdf_quiz_gen_{}", std::process::id())),
            settings_path: default_settings_path(),
            generation_timeout_ms: 180_000,
            assistant_timeout_ms: 60_000,
            language: "zh-CN".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            cli_binary: std::env::var("QUIZ_CLI_BIN").unwrap_or(default.cli_binary),
            working_dir: std::env::var("QUIZ_WORK_DIR").map(PathBuf::from).unwrap_or(default.working_dir),
            settings_path: std::env::var("QUIZ_SETTINGS_PATH").map(PathBuf::from).unwrap_or(default.settings_path),
            generation_timeout_ms: std::env::var("QUIZ_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.generation_timeout_ms),
            assistant_timeout_ms: std::env::var("ASSISTANT_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.assistant_timeout_ms),
            language: std::env::var("QUIZ_LANG").unwrap_or(default.language),
        }
    }
}

/// 每用户配置目录下的设置文件位置
fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("pdf-quiz-gen")
        .join("settings.toml")
}
