//! 生成指令构建 - 业务能力层
//!
//! 纯函数，无 IO、无隐藏状态：同样的输入永远产出同样的指令文本。
//!
//! 指令里必须显式要求工具把结构化结果写入输出交换文件，因为工具的
//! 直接输出通道对大体积结构化内容不可靠。

use std::path::Path;

use crate::models::question::GenerationMode;
use crate::models::settings::QuizSettings;
use crate::utils::truncate_text;

/// 助手问答时嵌入上下文的最大字符数
pub const ASSISTANT_CONTEXT_LIMIT: usize = 2000;

/// 构建出题指令
///
/// 题目数量：初始模式取设置里的数量，补救模式恰好等于补救主题的数量。
pub fn build_quiz_prompt(
    settings: &QuizSettings,
    mode: GenerationMode,
    pdf_file_name: &str,
    output_target: &Path,
    language: &str,
    remedial_topics: &[String],
    avoid_topics: &[String],
) -> String {
    let count = match mode {
        GenerationMode::Remedial => remedial_topics.len(),
        _ => settings.question_count as usize,
    };
    let styles = settings
        .style
        .iter()
        .map(|s| s.name())
        .collect::<Vec<_>>()
        .join("、");

    let mut prompt = format!(
        "你是一名资深出题人。请仔细阅读当前工作目录下的文件「{pdf_file_name}」，\
         并完全依据其内容出题。\n\n\
         【出题要求】\n\
         - 题目数量：恰好 {count} 道\n\
         - 难度：{difficulty}\n\
         - 题型：{styles}\n\
         - 题目语言：{language}\n",
        difficulty = settings.difficulty.name(),
    );
    if !settings.focus_topic.trim().is_empty() {
        prompt.push_str(&format!("- 重点考查主题：{}\n", settings.focus_topic.trim()));
    }

    prompt.push_str(&format!(
        "\n【输出方式】\n\
         - 将最终结果写入文件：{output}\n\
         - 不要把结果打印到标准输出，标准输出不作为结果通道\n\
         - 文件内容必须是严格的 JSON 数组，不包含任何解释文字或 Markdown 代码块\n\
         - 数组中每道题包含字段：id、text、options、correctAnswerIndex、explanation、sourceQuote\n\
         - correctAnswerIndex 是正确选项在 options 中的下标，从 0 开始\n",
        output = output_target.display(),
    ));

    if !avoid_topics.is_empty() {
        prompt.push_str("\n【避免重复】\n本次会话中以下内容已经出过题，不要再出含义相同的题目：\n");
        for topic in avoid_topics {
            prompt.push_str(&format!("- {}\n", topic));
        }
    }

    if mode == GenerationMode::Remedial && !remedial_topics.is_empty() {
        prompt.push_str(&format!(
            "\n【补救出题】\n以下是用户此前答错的题目摘录，请针对相同的知识点\
             各出一道全新的题目，总数恰好 {} 道：\n",
            remedial_topics.len(),
        ));
        for topic in remedial_topics {
            prompt.push_str(&format!("- {}\n", topic));
        }
    }

    prompt
}

/// 构建助手问答指令
///
/// 不涉及 PDF 暂存，也不携带避免/补救主题；上下文超长时截断后再嵌入。
pub fn build_assistant_prompt(
    question: &str,
    context: Option<&str>,
    output_target: &Path,
    language: &str,
) -> String {
    let mut prompt = format!(
        "你是嵌入在 PDF 阅读器中的学习助手，请简明地回答用户的问题。\n\n\
         【用户问题】\n{question}\n",
    );
    if let Some(context) = context {
        let context = context.trim();
        if !context.is_empty() {
            prompt.push_str(&format!(
                "\n【相关上下文】\n{}\n",
                truncate_text(context, ASSISTANT_CONTEXT_LIMIT),
            ));
        }
    }
    prompt.push_str(&format!(
        "\n【输出方式】\n\
         - 将回答写入文件：{output}\n\
         - 不要把回答打印到标准输出，标准输出不作为结果通道\n\
         - 文件内容必须是严格的 JSON 对象，形如 {{\"answer\": \"…\", \"suggestions\": [\"…\"]}}\n\
         - answer 是回答正文，suggestions 是不超过三条的后续问题建议，可以省略\n\
         - 使用 {language} 作答\n",
        output = output_target.display(),
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::{Difficulty, QuizStyle};
    use std::path::PathBuf;

    fn sample_settings() -> QuizSettings {
        QuizSettings {
            question_count: 12,
            difficulty: Difficulty::Hard,
            style: vec![QuizStyle::MultipleChoice],
            focus_topic: "光合作用".to_string(),
            ..QuizSettings::default()
        }
    }

    #[test]
    fn test_initial_prompt_uses_settings_count() {
        let prompt = build_quiz_prompt(
            &sample_settings(),
            GenerationMode::Initial,
            "stage-abc.pdf",
            &PathBuf::from("/tmp/work/quiz-1.json"),
            "zh-CN",
            &[],
            &[],
        );
        assert!(prompt.contains("恰好 12 道"));
        assert!(prompt.contains("stage-abc.pdf"));
        assert!(prompt.contains("/tmp/work/quiz-1.json"));
        assert!(prompt.contains("困难"));
        assert!(prompt.contains("光合作用"));
        assert!(prompt.contains("JSON 数组"));
        assert!(!prompt.contains("【避免重复】"));
        assert!(!prompt.contains("【补救出题】"));
    }

    #[test]
    fn test_remedial_prompt_counts_remedial_topics() {
        let remedial = vec!["答错的题目一".to_string(), "答错的题目二".to_string()];
        let avoid = vec!["出现过的题目".to_string()];
        let prompt = build_quiz_prompt(
            &sample_settings(),
            GenerationMode::Remedial,
            "stage-abc.pdf",
            &PathBuf::from("/tmp/work/quiz-2.json"),
            "zh-CN",
            &remedial,
            &avoid,
        );
        assert!(prompt.contains("恰好 2 道"));
        assert!(!prompt.contains("恰好 12 道"));
        assert!(prompt.contains("【补救出题】"));
        assert!(prompt.contains("答错的题目二"));
        assert!(prompt.contains("【避免重复】"));
        assert!(prompt.contains("出现过的题目"));
    }

    #[test]
    fn test_prompt_is_pure() {
        let args = (
            sample_settings(),
            PathBuf::from("/tmp/work/quiz-3.json"),
            vec!["既往题目".to_string()],
        );
        let a = build_quiz_prompt(&args.0, GenerationMode::Initial, "s.pdf", &args.1, "en", &[], &args.2);
        let b = build_quiz_prompt(&args.0, GenerationMode::Initial, "s.pdf", &args.1, "en", &[], &args.2);
        assert_eq!(a, b);
    }

    #[test]
    fn test_assistant_prompt_truncates_context() {
        let long_context = "上".repeat(ASSISTANT_CONTEXT_LIMIT + 500);
        let prompt = build_assistant_prompt(
            "这段话是什么意思？",
            Some(&long_context),
            &PathBuf::from("/tmp/work/answer-1.json"),
            "zh-CN",
        );
        assert!(prompt.contains("这段话是什么意思？"));
        assert!(!prompt.contains(&long_context));
        assert!(prompt.contains("..."));
        assert!(prompt.contains("answer"));
        assert!(prompt.contains("/tmp/work/answer-1.json"));
    }
}
