//! 题目与测验会话的共享数据模型

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::settings::QuizSettings;

/// 一道生成出的测验题
///
/// 由生成管线产出后不再修改，归当前测验持有。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// 不透明的唯一标识
    #[serde(default)]
    pub id: String,
    /// 题干
    pub text: String,
    /// 选项列表，按下标寻址
    pub options: Vec<String>,
    /// 正确选项的下标
    pub correct_answer_index: usize,
    /// 答案解析
    #[serde(default)]
    pub explanation: String,
    /// 原文出处摘录
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_quote: Option<String>,
}

/// 生成模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GenerationMode {
    /// 全新测验
    Initial,
    /// 针对答错题目的补救出题
    Remedial,
    /// 离线演示，不调用外部工具
    Demo,
}

/// 生成来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizSource {
    /// 用户选择的 PDF 文件路径
    Pdf(PathBuf),
    /// 演示固定题集
    Demo,
}

/// 一次生成请求
///
/// 设置在构建请求时快照一次，与任何单个测验的生命周期无关。
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub mode: GenerationMode,
    pub source: QuizSource,
    pub settings: QuizSettings,
    /// 生成内容的目标语言标签
    pub language: String,
    /// 补救主题，仅补救模式存在
    pub remedial_topics: Vec<String>,
    /// 本会话中要避免重复的既往题目摘录
    pub avoid_topics: Vec<String>,
}

impl GenerationRequest {
    /// 本次请求期望的题目数量
    pub fn requested_count(&self) -> usize {
        match self.mode {
            GenerationMode::Remedial => self.remedial_topics.len(),
            _ => self.settings.question_count as usize,
        }
    }
}

/// 客户端持有的一次测验状态
///
/// `score` 只在 `is_finished` 为真时有意义，而且总是在收卷时从
/// `user_answers` 重新计算，绝不增量维护。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizState {
    pub questions: Vec<Question>,
    /// 题目 ID 到所选选项下标的映射；取消作答时移除条目而不是存 null
    pub user_answers: HashMap<String, usize>,
    pub current_question_index: usize,
    pub score: usize,
    pub is_finished: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl QuizState {
    /// 用一组新题创建未开始的测验
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            user_answers: HashMap::new(),
            current_question_index: 0,
            score: 0,
            is_finished: false,
            start_time: None,
            end_time: None,
        }
    }

    /// 从当前作答重新计算得分
    ///
    /// 未作答的题目永远不计为正确。
    pub fn compute_score(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| self.user_answers.get(&q.id) == Some(&q.correct_answer_index))
            .count()
    }

    /// 答错或未作答的题目
    pub fn missed_questions(&self) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|q| self.user_answers.get(&q.id) != Some(&q.correct_answer_index))
            .collect()
    }
}
