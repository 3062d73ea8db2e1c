//! 测验生成用例 - 编排层

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{CliRunner, ResponseType, ToolOutput};
use crate::models::demo;
use crate::models::question::{GenerationMode, GenerationRequest, Question, QuizSource};
use crate::services::pdf_validator;
use crate::services::prompt_builder;
use crate::services::tool_discovery::CliLocator;

/// 测验生成器
///
/// 任何一步失败都会让整条管线停下并原样上报；调用方永远拿到
/// `Result`，不会观察到未处理的故障。
pub struct QuizGenerator {
    config: Config,
    runner: CliRunner,
}

impl QuizGenerator {
    pub fn new(config: Config, locator: Arc<CliLocator>) -> Self {
        Self {
            config,
            runner: CliRunner::new(locator),
        }
    }

    /// 执行一次生成请求
    pub async fn generate(&self, request: &GenerationRequest) -> AppResult<Vec<Question>> {
        info!(
            "🧩 开始生成测验: 模式 {:?}, 期望 {} 道题",
            request.mode,
            request.requested_count(),
        );

        // 演示模式完全离线，不触碰子进程层；对演示题集发起的补救
        // 请求同样走离线通道
        if request.mode == GenerationMode::Demo || request.source == QuizSource::Demo {
            let questions = demo::demo_questions(&request.language)?;
            info!("✅ 演示题集就绪: {} 道题", questions.len());
            return Ok(questions);
        }

        let QuizSource::Pdf(pdf_path) = &request.source else {
            return Err(AppError::Input(crate::error::InputError::NoFileSelected));
        };

        let working_dir = &self.config.working_dir;
        let staged = pdf_validator::validate_and_stage(pdf_path, working_dir).await?;
        let output_target = working_dir.join(format!("quiz-{}.json", Uuid::new_v4()));

        let prompt = prompt_builder::build_quiz_prompt(
            &request.settings,
            request.mode,
            &staged.file_name(),
            &output_target,
            &request.language,
            &request.remedial_topics,
            &request.avoid_topics,
        );

        let outcome = self
            .runner
            .run(
                &prompt,
                &request.settings.model,
                working_dir,
                &output_target,
                ResponseType::JsonArray,
                self.config.generation_timeout_ms,
            )
            .await;
        // 暂存副本在 staged 离开作用域时删除；失败路径上顺手清掉
        // 可能残留的交换文件
        let value = match outcome {
            Ok(ToolOutput::Json(value)) => value,
            Ok(ToolOutput::Text(_)) => {
                return Err(AppError::invalid_response("期望 JSON 数组，得到纯文本"));
            }
            Err(e) => {
                error!("生成失败: {}", e);
                remove_leftover(&output_target).await;
                return Err(e);
            }
        };
        drop(staged);

        let questions = coerce_questions(value)?;
        info!("✅ 生成完成: {} 道题", questions.len());
        Ok(questions)
    }
}

/// 把工具返回的 JSON 数组收敛为题目列表
///
/// 任何一条记录不合形状都让整批失败，绝不收进部分结果。
fn coerce_questions(value: serde_json::Value) -> AppResult<Vec<Question>> {
    let mut questions: Vec<Question> = serde_json::from_value(value)
        .map_err(|e| AppError::invalid_response(format!("题目记录不合形状: {}", e)))?;

    if questions.is_empty() {
        return Err(AppError::invalid_response("工具返回了空的题目数组"));
    }
    for (index, question) in questions.iter_mut().enumerate() {
        if question.text.trim().is_empty() {
            return Err(AppError::invalid_response(format!("第 {} 条记录缺少题干", index + 1)));
        }
        if question.options.is_empty() {
            return Err(AppError::invalid_response(format!("第 {} 条记录没有选项", index + 1)));
        }
        if question.correct_answer_index >= question.options.len() {
            return Err(AppError::invalid_response(format!(
                "第 {} 条记录的正确选项下标越界",
                index + 1
            )));
        }
        if question.id.trim().is_empty() {
            question.id = Uuid::new_v4().to_string();
        }
    }
    Ok(questions)
}

/// 失败路径上的交换文件兜底清理，失败只记日志
async fn remove_leftover(path: &Path) {
    if tokio::fs::metadata(path).await.is_ok() {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("🗑️ 清理残留交换文件失败 ({}): {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_questions_assigns_missing_ids() {
        let value = json!([
            {
                "text": "太阳从哪边升起？",
                "options": ["东", "西"],
                "correctAnswerIndex": 0,
                "explanation": "地球自西向东自转。"
            }
        ]);
        let questions = coerce_questions(value).expect("应当通过");
        assert_eq!(questions.len(), 1);
        assert!(!questions[0].id.is_empty());
    }

    #[test]
    fn test_coerce_questions_rejects_out_of_range_answer() {
        let value = json!([
            {
                "id": "1",
                "text": "题干",
                "options": ["A", "B"],
                "correctAnswerIndex": 5
            }
        ]);
        assert!(coerce_questions(value).is_err());
    }

    #[test]
    fn test_coerce_questions_rejects_empty_array() {
        assert!(coerce_questions(json!([])).is_err());
    }

    #[test]
    fn test_coerce_questions_rejects_partial_batch() {
        // 只要有一条记录缺字段，整批都不能用
        let value = json!([
            {"id": "1", "text": "合法题目", "options": ["A", "B"], "correctAnswerIndex": 0},
            {"id": "2", "options": ["A", "B"], "correctAnswerIndex": 0}
        ]);
        assert!(coerce_questions(value).is_err());
    }
}
