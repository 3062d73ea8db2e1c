//! 客户端测验会话 - 流程层
//!
//! 驱动用户可见旅程的状态机：
//!
//! ```text
//! CONFIG --start--> GENERATING --成功--> READY --begin--> QUIZ --finish--> RESULTS
//!    ^                  |                                                   |
//!    |                  +--失败----------------------------------------------+--> restart / regenerate 回到 CONFIG
//!    |                                                                      +--> retryMistakes 回到 GENERATING
//! ```
//!
//! 状态机本身是被动的：`start` / `retry_mistakes` 发出 (票据, 请求) 对，
//! 由事件循环驱动编排层执行，再把结果经 `apply_generation` 喂回来。
//! 并发正确性只靠请求围栏：每次请求领取严格递增的票据，结算时票据不是
//! 最新的就整个丢弃，无论成败，绝不触碰已展示的状态。没有任何锁。

use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, InputError, SessionError};
use crate::models::question::{GenerationMode, GenerationRequest, Question, QuizSource, QuizState};
use crate::models::settings::{QuizSettings, SettingsPatch};
use crate::services::settings_store::SettingsStore;
use crate::utils::truncate_text;
use crate::workflow::settings_debounce::{SettingsDebouncer, SETTINGS_DEBOUNCE_MS};

/// 会话内避免重复主题的条数上限（取最近的）
pub const AVOID_TOPIC_CAP: usize = 25;
/// 主题摘录的最大字符数
pub const TOPIC_EXCERPT_CHARS: usize = 100;
/// 短于此字符数的条目视为无信息量，被过滤掉
pub const MIN_TOPIC_CHARS: usize = 10;

/// 会话阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    Config,
    Generating,
    Ready,
    Quiz,
    Results,
}

impl QuizPhase {
    pub fn name(self) -> &'static str {
        match self {
            QuizPhase::Config => "CONFIG",
            QuizPhase::Generating => "GENERATING",
            QuizPhase::Ready => "READY",
            QuizPhase::Quiz => "QUIZ",
            QuizPhase::Results => "RESULTS",
        }
    }
}

/// 生成请求的围栏票据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationTicket(u64);

impl GenerationTicket {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// 结算一次生成结果的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// 结果已应用到会话状态
    Applied,
    /// 票据已过期，结果被整个丢弃
    Superseded,
}

/// 客户端测验会话
pub struct QuizSession {
    phase: QuizPhase,
    settings: QuizSettings,
    language: String,
    selected_pdf: Option<PathBuf>,
    quiz: Option<QuizState>,
    /// 会话内出过的题目原文，随 regenerate 单调增长，restart 清空
    avoid_memory: Vec<String>,
    last_error: Option<String>,
    request_seq: u64,
    debouncer: SettingsDebouncer,
}

impl QuizSession {
    pub fn new(settings: QuizSettings, language: impl Into<String>) -> Self {
        let mut settings = settings;
        settings.normalize();
        Self {
            phase: QuizPhase::Config,
            settings,
            language: language.into(),
            selected_pdf: None,
            quiz: None,
            avoid_memory: Vec::new(),
            last_error: None,
            request_seq: 0,
            debouncer: SettingsDebouncer::new(),
        }
    }

    // ========== 只读视图 ==========

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    pub fn quiz(&self) -> Option<&QuizState> {
        self.quiz.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn selected_pdf(&self) -> Option<&PathBuf> {
        self.selected_pdf.as_ref()
    }

    pub fn avoid_memory(&self) -> &[String] {
        &self.avoid_memory
    }

    // ========== 配置阶段 ==========

    /// 记录用户选择的 PDF
    pub fn select_pdf(&mut self, path: PathBuf) -> AppResult<()> {
        if self.phase != QuizPhase::Config {
            return Err(self.invalid_transition("选择文件"));
        }
        debug!("已选择输入文件");
        self.selected_pdf = Some(path);
        self.last_error = None;
        Ok(())
    }

    /// 发出一次生成请求
    ///
    /// INITIAL 模式在尚未选择 PDF 时立刻拒绝，状态不变。生成中再次
    /// 调用视为用新请求取代旧请求，旧请求的结果会被围栏丢弃。
    pub fn start(&mut self, mode: GenerationMode) -> AppResult<(GenerationTicket, GenerationRequest)> {
        if self.phase != QuizPhase::Config && self.phase != QuizPhase::Generating {
            return Err(self.invalid_transition("开始生成"));
        }
        let source = match mode {
            GenerationMode::Initial => match &self.selected_pdf {
                Some(path) => QuizSource::Pdf(path.clone()),
                None => return Err(AppError::Input(InputError::NoFileSelected)),
            },
            GenerationMode::Demo => QuizSource::Demo,
            GenerationMode::Remedial => {
                // 补救请求只能从结果页经 retry_mistakes 发起
                return Err(self.invalid_transition("补救出题"));
            }
        };

        let ticket = self.next_ticket();
        self.phase = QuizPhase::Generating;
        let request = GenerationRequest {
            mode,
            source,
            settings: self.settings.clone(),
            language: self.language.clone(),
            remedial_topics: Vec::new(),
            avoid_topics: self.compose_avoid_topics(&[]),
        };
        info!("📨 发出生成请求 #{} ({:?})", ticket.id(), mode);
        Ok((ticket, request))
    }

    /// 结算一次生成结果
    ///
    /// 票据不是最新的就整个丢弃（无论成败），已展示的状态保持不变。
    pub fn apply_generation(
        &mut self,
        ticket: GenerationTicket,
        outcome: AppResult<Vec<Question>>,
    ) -> ApplyResult {
        if ticket.0 != self.request_seq {
            debug!("忽略已被取代的请求 #{}（最新 #{}）", ticket.0, self.request_seq);
            return ApplyResult::Superseded;
        }
        match outcome {
            Ok(questions) => {
                info!("✓ 请求 #{} 就绪: {} 道题", ticket.0, questions.len());
                self.quiz = Some(QuizState::new(questions));
                self.last_error = None;
                self.phase = QuizPhase::Ready;
            }
            Err(e) => {
                warn!("请求 #{} 失败: {}", ticket.0, e);
                self.last_error = Some(e.to_string());
                self.phase = QuizPhase::Config;
            }
        }
        ApplyResult::Applied
    }

    // ========== 作答阶段 ==========

    /// 开始作答，记录起始时间
    pub fn begin_quiz(&mut self) -> AppResult<()> {
        if self.phase != QuizPhase::Ready {
            return Err(self.invalid_transition("开始作答"));
        }
        let quiz = self.quiz.as_mut().ok_or_else(|| {
            AppError::Other("就绪状态下没有测验数据".to_string())
        })?;
        quiz.start_time = Some(Utc::now());
        quiz.current_question_index = 0;
        self.phase = QuizPhase::Quiz;
        info!("▶️ 开始作答: {} 道题", quiz.questions.len());
        Ok(())
    }

    /// 作答或取消作答
    ///
    /// 再次点选同一选项视为取消，映射条目被移除而不是存 null。
    pub fn toggle_answer(&mut self, question_id: &str, choice: usize) -> AppResult<()> {
        if self.phase != QuizPhase::Quiz {
            return Err(self.invalid_transition("作答"));
        }
        let quiz = self.quiz.as_mut().ok_or_else(|| {
            AppError::Other("作答状态下没有测验数据".to_string())
        })?;
        let question = quiz
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| {
                AppError::Session(SessionError::UnknownQuestion {
                    id: question_id.to_string(),
                })
            })?;
        if choice >= question.options.len() {
            return Err(AppError::Session(SessionError::ChoiceOutOfRange { index: choice }));
        }
        if quiz.user_answers.get(question_id) == Some(&choice) {
            quiz.user_answers.remove(question_id);
        } else {
            quiz.user_answers.insert(question_id.to_string(), choice);
        }
        Ok(())
    }

    /// 跳转到指定题目
    pub fn go_to_question(&mut self, index: usize) -> AppResult<()> {
        if self.phase != QuizPhase::Quiz {
            return Err(self.invalid_transition("切换题目"));
        }
        let quiz = self.quiz.as_mut().ok_or_else(|| {
            AppError::Other("作答状态下没有测验数据".to_string())
        })?;
        if index >= quiz.questions.len() {
            return Err(AppError::Session(SessionError::ChoiceOutOfRange { index }));
        }
        quiz.current_question_index = index;
        Ok(())
    }

    /// 收卷
    ///
    /// 得分在这里从作答映射整个重算，未作答的题目不计分。
    pub fn finish_quiz(&mut self) -> AppResult<&QuizState> {
        if self.phase != QuizPhase::Quiz {
            return Err(self.invalid_transition("收卷"));
        }
        let quiz = self.quiz.as_mut().ok_or_else(|| {
            AppError::Other("作答状态下没有测验数据".to_string())
        })?;
        quiz.score = quiz.compute_score();
        quiz.is_finished = true;
        quiz.end_time = Some(Utc::now());
        info!("🏁 收卷: 得分 {}/{}", quiz.score, quiz.questions.len());
        self.phase = QuizPhase::Results;
        self.quiz
            .as_ref()
            .ok_or_else(|| AppError::Other("作答状态下没有测验数据".to_string()))
    }

    // ========== 结果阶段 ==========

    /// 重新开始：清空会话累积的避免重复记忆
    pub fn restart(&mut self) -> AppResult<()> {
        if self.phase != QuizPhase::Results {
            return Err(self.invalid_transition("重新开始"));
        }
        self.avoid_memory.clear();
        self.quiz = None;
        self.last_error = None;
        self.phase = QuizPhase::Config;
        info!("🔄 会话重新开始，避免重复记忆已清空");
        Ok(())
    }

    /// 重新生成：把刚完成的整套题目记入避免重复记忆后回到配置页
    ///
    /// 记忆随每次 regenerate 单调增长，直到 restart 才清空。
    pub fn regenerate(&mut self) -> AppResult<()> {
        if self.phase != QuizPhase::Results {
            return Err(self.invalid_transition("重新生成"));
        }
        if let Some(quiz) = self.quiz.take() {
            for question in quiz.questions {
                self.avoid_memory.push(question.text);
            }
        }
        self.phase = QuizPhase::Config;
        info!("♻️ 回到配置页，避免重复记忆共 {} 条", self.avoid_memory.len());
        Ok(())
    }

    /// 补救重试：针对答错或未作答的题目发出补救请求
    ///
    /// 全部答对时是空操作，不发请求、状态不变。补救请求恰好索要
    /// 答错题数量的新题，避免列表临时拼上刚完成的整套题目。
    pub fn retry_mistakes(&mut self) -> AppResult<Option<(GenerationTicket, GenerationRequest)>> {
        if self.phase != QuizPhase::Results {
            return Err(self.invalid_transition("补救重试"));
        }
        let quiz = self.quiz.as_ref().ok_or_else(|| {
            AppError::Other("结果状态下没有测验数据".to_string())
        })?;
        let missed: Vec<String> = quiz
            .missed_questions()
            .iter()
            .map(|q| q.text.clone())
            .collect();
        if missed.is_empty() {
            info!("🎉 全部答对，无需补救");
            return Ok(None);
        }

        let remedial_topics: Vec<String> = missed
            .iter()
            .map(|text| truncate_text(text, TOPIC_EXCERPT_CHARS))
            .collect();
        let just_finished: Vec<String> =
            quiz.questions.iter().map(|q| q.text.clone()).collect();
        let avoid_topics = self.compose_avoid_topics(&just_finished);
        let source = match &self.selected_pdf {
            Some(path) => QuizSource::Pdf(path.clone()),
            None => QuizSource::Demo,
        };

        let ticket = self.next_ticket();
        self.phase = QuizPhase::Generating;
        let request = GenerationRequest {
            mode: GenerationMode::Remedial,
            source,
            settings: self.settings.clone(),
            language: self.language.clone(),
            remedial_topics,
            avoid_topics,
        };
        info!("📨 发出补救请求 #{}: {} 道题", ticket.id(), request.remedial_topics.len());
        Ok(Some((ticket, request)))
    }

    // ========== 设置编辑 ==========

    /// 编辑设置
    ///
    /// 内存快照立即生效（后续请求用新值），落盘经防抖合并。返回的
    /// 序号交给 `flush_settings_after_quiet` 驱动写入。
    pub fn edit_settings(&mut self, patch: SettingsPatch) -> u64 {
        self.settings.apply_patch(&patch);
        self.debouncer.queue(patch)
    }

    /// 安静期结束后取走待落盘的补丁；序号过期则什么都拿不到
    pub fn take_pending_settings(&mut self, token: u64) -> Option<SettingsPatch> {
        self.debouncer.take_if_current(token)
    }

    // ========== 内部 ==========

    fn next_ticket(&mut self) -> GenerationTicket {
        self.request_seq += 1;
        GenerationTicket(self.request_seq)
    }

    fn invalid_transition(&self, action: &'static str) -> AppError {
        AppError::Session(SessionError::InvalidTransition {
            action,
            phase: self.phase.name(),
        })
    }

    /// 组装请求携带的避免重复列表
    ///
    /// 取最近的 25 条，过滤掉信息量过低的短条目，逐条截断成摘录。
    fn compose_avoid_topics(&self, extra: &[String]) -> Vec<String> {
        let all: Vec<&String> = self.avoid_memory.iter().chain(extra.iter()).collect();
        let keep_from = all.len().saturating_sub(AVOID_TOPIC_CAP);
        all[keep_from..]
            .iter()
            .filter(|text| text.chars().count() >= MIN_TOPIC_CHARS)
            .map(|text| truncate_text(text, TOPIC_EXCERPT_CHARS))
            .collect()
    }
}

/// 防抖落盘驱动
///
/// 安静期结束后尝试取走补丁写入存储；期间又有编辑发生的话序号过期，
/// 这次什么都不写，由更晚的序号负责。返回是否真的写入了。
pub async fn flush_settings_after_quiet(
    session: &tokio::sync::Mutex<QuizSession>,
    store: &SettingsStore,
    token: u64,
) -> bool {
    tokio::time::sleep(std::time::Duration::from_millis(SETTINGS_DEBOUNCE_MS)).await;
    let patch = session.lock().await.take_pending_settings(token);
    match patch {
        Some(patch) => store.save(&patch).await,
        None => false,
    }
}
