//! 测验生成设置
//!
//! 设置记录整条持久化；读取永远是全量的（缺失字段回落到硬编码默认值），
//! 写入只能通过“读取-合并-写入”的整条替换完成。

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 题目数量下限
pub const MIN_QUESTION_COUNT: u32 = 1;
/// 题目数量上限
pub const MAX_QUESTION_COUNT: u32 = 30;

/// 难度档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "简单",
            Difficulty::Medium => "中等",
            Difficulty::Hard => "困难",
        }
    }

    /// 尝试从标签解析难度（忽略大小写）
    pub fn from_tag(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "EASY" => Some(Difficulty::Easy),
            "MEDIUM" => Some(Difficulty::Medium),
            "HARD" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 题型标签
///
/// `Mixed` 是通配档：由工具自行混合题型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuizStyle {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Mixed,
}

impl QuizStyle {
    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            QuizStyle::MultipleChoice => "选择题",
            QuizStyle::TrueFalse => "判断题",
            QuizStyle::ShortAnswer => "简答题",
            QuizStyle::Mixed => "混合题型",
        }
    }

    /// 尝试从标签解析题型（忽略大小写）
    pub fn from_tag(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "multiple-choice" => Some(QuizStyle::MultipleChoice),
            "true-false" => Some(QuizStyle::TrueFalse),
            "short-answer" => Some(QuizStyle::ShortAnswer),
            "mixed" => Some(QuizStyle::Mixed),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuizStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 用户可调的生成参数
///
/// 每个字段都带独立的 serde 默认值，保证读取持久化记录永远得到完整结构，
/// 记录中多余的未知字段会被忽略。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSettings {
    /// 题目数量，取值范围 [1, 30]
    #[serde(default = "default_question_count")]
    pub question_count: u32,
    /// 难度
    #[serde(default = "default_difficulty")]
    pub difficulty: Difficulty,
    /// 使用的模型标识
    #[serde(default = "default_model")]
    pub model: String,
    /// 题型集合，非空
    #[serde(default = "default_style")]
    pub style: Vec<QuizStyle>,
    /// 重点主题，可以为空
    #[serde(default)]
    pub focus_topic: String,
}

fn default_question_count() -> u32 {
    10
}

fn default_difficulty() -> Difficulty {
    Difficulty::Medium
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_style() -> Vec<QuizStyle> {
    vec![QuizStyle::Mixed]
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            question_count: default_question_count(),
            difficulty: default_difficulty(),
            model: default_model(),
            style: default_style(),
            focus_topic: String::new(),
        }
    }
}

impl QuizSettings {
    /// 收敛字段到合法范围
    ///
    /// 题目数量被夹取到 [1, 30]，空的题型集合回落到混合题型。
    pub fn normalize(&mut self) {
        self.question_count = self.question_count.clamp(MIN_QUESTION_COUNT, MAX_QUESTION_COUNT);
        if self.style.is_empty() {
            self.style = default_style();
        }
    }

    /// 将补丁合并到当前记录上
    ///
    /// 补丁中缺失的字段保持原值不变，合并后立即收敛。
    pub fn apply_patch(&mut self, patch: &SettingsPatch) {
        if let Some(count) = patch.question_count {
            self.question_count = count;
        }
        if let Some(difficulty) = patch.difficulty {
            self.difficulty = difficulty;
        }
        if let Some(model) = &patch.model {
            self.model = model.clone();
        }
        if let Some(style) = &patch.style {
            self.style = style.clone();
        }
        if let Some(topic) = &patch.focus_topic {
            self.focus_topic = topic.clone();
        }
        self.normalize();
    }
}

/// 设置的部分更新
///
/// 只有出现的字段会被应用，其余字段在持久化记录中保持不变。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub question_count: Option<u32>,
    pub difficulty: Option<Difficulty>,
    pub model: Option<String>,
    pub style: Option<Vec<QuizStyle>>,
    pub focus_topic: Option<String>,
}

impl SettingsPatch {
    /// 从松散类型的 JSON 对象构建补丁
    ///
    /// 来自边界另一侧的字段类型不可信：数值字段要求能转换为有限数并夹取
    /// 到合法范围，类型不符或无法识别的字段被静默忽略而不是应用。
    pub fn from_json(value: &JsonValue) -> Self {
        let mut patch = Self::default();
        let Some(obj) = value.as_object() else {
            return patch;
        };

        if let Some(n) = obj.get("questionCount").and_then(JsonValue::as_f64) {
            if n.is_finite() {
                patch.question_count =
                    Some(n.clamp(MIN_QUESTION_COUNT as f64, MAX_QUESTION_COUNT as f64).round() as u32);
            }
        }
        if let Some(tag) = obj.get("difficulty").and_then(JsonValue::as_str) {
            patch.difficulty = Difficulty::from_tag(tag);
        }
        if let Some(model) = obj.get("model").and_then(JsonValue::as_str) {
            if !model.trim().is_empty() {
                patch.model = Some(model.to_string());
            }
        }
        if let Some(tags) = obj.get("style").and_then(JsonValue::as_array) {
            let mut styles = Vec::new();
            for tag in tags.iter().filter_map(JsonValue::as_str) {
                if let Some(style) = QuizStyle::from_tag(tag) {
                    if !styles.contains(&style) {
                        styles.push(style);
                    }
                }
            }
            if !styles.is_empty() {
                patch.style = Some(styles);
            }
        }
        if let Some(topic) = obj.get("focusTopic").and_then(JsonValue::as_str) {
            patch.focus_topic = Some(topic.to_string());
        }

        patch
    }

    /// 是否没有任何字段
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// 将另一个补丁叠加到当前补丁上（后者的字段优先）
    pub fn merge(&mut self, other: SettingsPatch) {
        if other.question_count.is_some() {
            self.question_count = other.question_count;
        }
        if other.difficulty.is_some() {
            self.difficulty = other.difficulty;
        }
        if other.model.is_some() {
            self.model = other.model;
        }
        if other.style.is_some() {
            self.style = other.style;
        }
        if other.focus_topic.is_some() {
            self.focus_topic = other.focus_topic;
        }
    }
}
