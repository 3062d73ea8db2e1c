//! 测验相关的对外操作面

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::api::auth;
use crate::config::Config;
use crate::models::question::{GenerationRequest, Question};
use crate::models::settings::{QuizSettings, SettingsPatch};
use crate::orchestrator::{AssistantReply, AssistantService, QuizGenerator};
use crate::services::settings_store::SettingsStore;
use crate::services::tool_discovery::{CliLocator, CliStatus};

/// 生成操作的响应信封
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Question>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerateResponse {
    fn ok(questions: Vec<Question>) -> Self {
        Self {
            success: true,
            count: Some(questions.len()),
            data: Some(questions),
            error: None,
        }
    }

    fn fail(error: impl ToString) -> Self {
        Self {
            success: false,
            data: None,
            count: None,
            error: Some(error.to_string()),
        }
    }
}

/// 助手问答的响应信封
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<AssistantReply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 对外操作面的宿主
///
/// 聚合设置存储、工具定位器和两个编排用例；定位器在各用例之间共享，
/// 路径解析整个进程只发生一次。
pub struct QuizBackend {
    store: SettingsStore,
    locator: Arc<CliLocator>,
    generator: QuizGenerator,
    assistant: AssistantService,
}

impl QuizBackend {
    pub fn new(config: Config) -> Self {
        let locator = Arc::new(CliLocator::new(config.cli_binary.clone()));
        let store = SettingsStore::new(config.settings_path.clone());
        let generator = QuizGenerator::new(config.clone(), Arc::clone(&locator));
        let assistant = AssistantService::new(config, Arc::clone(&locator));
        Self {
            store,
            locator,
            generator,
            assistant,
        }
    }

    /// 执行一次生成请求
    pub async fn generate(&self, request: &GenerationRequest) -> GenerateResponse {
        match self.generator.generate(request).await {
            Ok(questions) => GenerateResponse::ok(questions),
            Err(e) => GenerateResponse::fail(e),
        }
    }

    /// 读取设置（永远全量）
    pub async fn get_settings(&self) -> QuizSettings {
        self.store.read().await
    }

    /// 保存部分设置
    ///
    /// 入参是边界另一侧的松散 JSON；类型不符的字段被忽略，其余字段
    /// 合并到此前持久化的记录上。
    pub async fn save_settings(&self, partial: &JsonValue) -> bool {
        let patch = SettingsPatch::from_json(partial);
        self.store.save(&patch).await
    }

    /// 设置存储（防抖落盘驱动需要直接访问）
    pub fn settings_store(&self) -> &SettingsStore {
        &self.store
    }

    /// 查询外部工具的安装状态，不触发任何生成
    pub async fn get_cli_path(&self) -> CliStatus {
        self.locator.status()
    }

    /// 用户安装工具后重新探测
    pub fn refresh_cli_path(&self) -> CliStatus {
        self.locator.invalidate();
        self.locator.status()
    }

    /// 助手问答
    pub async fn ask_assistant(&self, question: &str, context: Option<&str>) -> AssistantResponse {
        let model = self.store.read().await.model;
        match self.assistant.ask(question, context, &model).await {
            Ok(reply) => AssistantResponse {
                success: true,
                data: Some(reply),
                error: None,
            },
            Err(e) => AssistantResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// 打开外部工具的交互式登录
    pub async fn open_login(&self) -> auth::AuthActionResult {
        auth::open_login(&self.locator).await
    }

    /// 查询登录状态
    pub async fn check_auth(&self) -> auth::AuthStatus {
        auth::check_auth(&self.locator).await
    }

    /// 退出登录
    pub async fn logout(&self) -> auth::AuthActionResult {
        auth::logout(&self.locator).await
    }
}
