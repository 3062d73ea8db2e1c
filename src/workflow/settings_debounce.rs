//! 设置编辑的防抖缓冲
//!
//! 交互式修改设置会在短时间内连续触发；这里把一阵编辑合并成一个补丁，
//! 安静期过后才写入存储。取舍逻辑和生成请求的围栏一样：每次入队领取
//! 一个递增序号，只有最后一个序号的持有者能取走补丁。

use crate::models::settings::SettingsPatch;

/// 安静期时长（毫秒）
pub const SETTINGS_DEBOUNCE_MS: u64 = 600;

/// 设置防抖缓冲
#[derive(Debug, Default)]
pub struct SettingsDebouncer {
    seq: u64,
    pending: Option<SettingsPatch>,
}

impl SettingsDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 叠加一次编辑，返回本次的序号
    pub fn queue(&mut self, patch: SettingsPatch) -> u64 {
        match &mut self.pending {
            Some(pending) => pending.merge(patch),
            None => self.pending = Some(patch),
        }
        self.seq += 1;
        self.seq
    }

    /// 只有最新序号能取走合并后的补丁；过期序号什么都拿不到
    pub fn take_if_current(&mut self, token: u64) -> Option<SettingsPatch> {
        if token == self.seq {
            self.pending.take()
        } else {
            None
        }
    }

    /// 是否还有未落盘的编辑
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::Difficulty;

    #[test]
    fn test_queue_merges_bursts() {
        let mut debouncer = SettingsDebouncer::new();
        let _t1 = debouncer.queue(SettingsPatch {
            question_count: Some(5),
            ..SettingsPatch::default()
        });
        let t2 = debouncer.queue(SettingsPatch {
            difficulty: Some(Difficulty::Hard),
            ..SettingsPatch::default()
        });

        let merged = debouncer.take_if_current(t2).expect("最新序号应当取到补丁");
        assert_eq!(merged.question_count, Some(5));
        assert_eq!(merged.difficulty, Some(Difficulty::Hard));
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn test_superseded_token_takes_nothing() {
        let mut debouncer = SettingsDebouncer::new();
        let t1 = debouncer.queue(SettingsPatch {
            question_count: Some(5),
            ..SettingsPatch::default()
        });
        let t2 = debouncer.queue(SettingsPatch {
            question_count: Some(8),
            ..SettingsPatch::default()
        });

        assert!(debouncer.take_if_current(t1).is_none());
        assert!(debouncer.has_pending());
        let merged = debouncer.take_if_current(t2).expect("最新序号应当取到补丁");
        assert_eq!(merged.question_count, Some(8));
    }
}
