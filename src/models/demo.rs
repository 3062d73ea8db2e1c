//! 演示模式的固定题集
//!
//! 离线试用通道：不触碰子进程层，按语言选取内置题集，结果是确定性的。

use phf::phf_map;

use crate::error::AppResult;
use crate::models::question::Question;

/// 语言主标签到内置题集 JSON 的映射
static DEMO_SETS: phf::Map<&'static str, &'static str> = phf_map! {
    "zh" => r#"[
  {
    "id": "demo-zh-1",
    "text": "阅读一篇较长的文献时，下面哪种做法最有助于保持理解的连贯性？",
    "options": ["一口气读完再回头整理", "边读边记录关键论点", "只读开头和结尾", "先背诵目录"],
    "correctAnswerIndex": 1,
    "explanation": "边读边记录关键论点可以把理解固定下来，便于后续回顾与串联。",
    "sourceQuote": "有效阅读强调在阅读过程中主动加工信息。"
  },
  {
    "id": "demo-zh-2",
    "text": "做完一套练习后，复盘的首要对象应当是？",
    "options": ["答对且有把握的题", "答错或蒙对的题", "花费时间最短的题", "题干最长的题"],
    "correctAnswerIndex": 1,
    "explanation": "答错或蒙对的题暴露了真实的知识缺口，是补救学习的重点。",
    "sourceQuote": null
  },
  {
    "id": "demo-zh-3",
    "text": "间隔重复之所以有效，核心原因是？",
    "options": ["缩短了单次学习时间", "在遗忘临界点重新激活记忆", "降低了学习材料难度", "增加了学习的趣味性"],
    "correctAnswerIndex": 1,
    "explanation": "在将要遗忘时复习，提取难度适中，记忆强化效果最好。",
    "sourceQuote": null
  }
]"#,
    "en" => r#"[
  {
    "id": "demo-en-1",
    "text": "When reading a long document, which habit best preserves comprehension?",
    "options": ["Read it all in one pass", "Note key claims while reading", "Read only the introduction", "Memorize the table of contents"],
    "correctAnswerIndex": 1,
    "explanation": "Recording key claims while reading anchors understanding for later review.",
    "sourceQuote": "Active reading means processing information as you go."
  },
  {
    "id": "demo-en-2",
    "text": "After finishing a practice set, what should you review first?",
    "options": ["Questions answered confidently", "Questions missed or guessed", "The fastest questions", "The longest questions"],
    "correctAnswerIndex": 1,
    "explanation": "Missed or guessed questions expose real knowledge gaps.",
    "sourceQuote": null
  },
  {
    "id": "demo-en-3",
    "text": "Why does spaced repetition work?",
    "options": ["It shortens each study session", "It reactivates memory near the point of forgetting", "It simplifies the material", "It makes studying more fun"],
    "correctAnswerIndex": 1,
    "explanation": "Reviewing just before forgetting strengthens retention the most.",
    "sourceQuote": null
  }
]"#,
};

/// 按语言标签选取内置题集
///
/// 取语言标签的主子标签（如 zh-CN 取 zh），未收录的语言回落到英文。
pub fn demo_questions(language: &str) -> AppResult<Vec<Question>> {
    let primary = language
        .split(['-', '_'])
        .next()
        .unwrap_or("en")
        .to_ascii_lowercase();
    let raw = DEMO_SETS
        .get(primary.as_str())
        .or_else(|| DEMO_SETS.get("en"))
        .copied()
        .unwrap_or("[]");
    let questions: Vec<Question> = serde_json::from_str(raw)?;
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_questions_deterministic() {
        let first = demo_questions("zh-CN").expect("内置题集应当可解析");
        let second = demo_questions("zh-CN").expect("内置题集应当可解析");
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(first[0].text, second[0].text);
    }

    #[test]
    fn test_demo_questions_language_selection() {
        let zh = demo_questions("zh").expect("中文题集");
        let en = demo_questions("en-US").expect("英文题集");
        assert!(zh[0].id.starts_with("demo-zh"));
        assert!(en[0].id.starts_with("demo-en"));
    }

    #[test]
    fn test_demo_questions_fallback() {
        let fallback = demo_questions("fr").expect("回落题集");
        assert!(fallback[0].id.starts_with("demo-en"));
    }

    #[test]
    fn test_demo_questions_are_well_formed() {
        for lang in ["zh", "en"] {
            for q in demo_questions(lang).expect("题集可解析") {
                assert!(!q.text.is_empty());
                assert!(q.correct_answer_index < q.options.len());
            }
        }
    }
}
