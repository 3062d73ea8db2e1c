//! 助手问答用例 - 编排层

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{CliRunner, ResponseType, ToolOutput};
use crate::services::prompt_builder;
use crate::services::tool_discovery::CliLocator;

/// 助手的一次回答
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantReply {
    /// 回答正文
    pub answer: String,
    /// 后续问题建议
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// 助手问答服务
///
/// 比测验生成轻得多：不暂存 PDF，不携带避免/补救主题，只要求一个
/// json-object 形状的回答。
pub struct AssistantService {
    config: Config,
    runner: CliRunner,
}

impl AssistantService {
    pub fn new(config: Config, locator: Arc<CliLocator>) -> Self {
        Self {
            config,
            runner: CliRunner::new(locator),
        }
    }

    /// 向助手提问
    ///
    /// 上下文超长时在构建指令前截断。
    pub async fn ask(
        &self,
        question: &str,
        context: Option<&str>,
        model: &str,
    ) -> AppResult<AssistantReply> {
        info!("💬 助手问答: {} 字符", question.chars().count());

        let working_dir = &self.config.working_dir;
        tokio::fs::create_dir_all(working_dir)
            .await
            .map_err(|e| AppError::Other(format!("创建工作目录失败: {}", e)))?;
        let output_target = working_dir.join(format!("answer-{}.json", Uuid::new_v4()));

        let prompt = prompt_builder::build_assistant_prompt(
            question,
            context,
            &output_target,
            &self.config.language,
        );

        let outcome = self
            .runner
            .run(
                &prompt,
                model,
                working_dir,
                &output_target,
                ResponseType::JsonObject,
                self.config.assistant_timeout_ms,
            )
            .await;

        let value = match outcome {
            Ok(ToolOutput::Json(value)) => value,
            Ok(ToolOutput::Text(_)) => {
                return Err(AppError::invalid_response("期望 JSON 对象，得到纯文本"));
            }
            Err(e) => {
                error!("助手问答失败: {}", e);
                return Err(e);
            }
        };

        let reply: AssistantReply = serde_json::from_value(value)
            .map_err(|e| AppError::invalid_response(format!("回答不合形状: {}", e)))?;
        if reply.answer.trim().is_empty() {
            return Err(AppError::invalid_response("回答正文为空"));
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_parses_without_suggestions() {
        let reply: AssistantReply =
            serde_json::from_value(json!({ "answer": "这是回答" })).expect("应当可解析");
        assert_eq!(reply.answer, "这是回答");
        assert!(reply.suggestions.is_empty());
    }

    #[test]
    fn test_reply_requires_answer_field() {
        let result: Result<AssistantReply, _> =
            serde_json::from_value(json!({ "suggestions": ["继续问"] }));
        assert!(result.is_err());
    }
}
