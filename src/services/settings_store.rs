//! 设置存储服务 - 业务能力层
//!
//! 只负责设置记录的持久化，不关心流程。
//!
//! 记录以单个 TOML 文件整条存放。读取永远是全量的：持久化记录逐字段
//! 合并到硬编码默认值之上，缺失或多余的字段都不会让读取失败。写入走
//! “读取-合并-写入整条”的事务，先写临时文件再原子改名，避免半写损坏。

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{AppError, AppResult, SettingsError};
use crate::models::settings::{QuizSettings, SettingsPatch};

/// 设置存储
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// 以指定的持久化路径创建存储
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 持久化文件位置
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取设置
    ///
    /// 永远返回完整记录：文件不存在、无法读取或内容损坏时回落到默认值。
    pub async fn read(&self) -> QuizSettings {
        match self.load_record().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!("⚠️ 读取设置记录失败，回落到默认值: {}", e);
                QuizSettings::default()
            }
        }
    }

    /// 保存部分更新
    ///
    /// 把补丁合并到此前持久化的记录上，再整条写回；补丁里没有的字段
    /// 保持原值。返回是否成功写入。
    pub async fn save(&self, patch: &SettingsPatch) -> bool {
        if patch.is_empty() {
            debug!("设置补丁为空，跳过写入");
            return true;
        }
        match self.write_merged(patch).await {
            Ok(()) => true,
            Err(e) => {
                warn!("⚠️ 保存设置失败: {}", e);
                false
            }
        }
    }

    async fn load_record(&self) -> AppResult<QuizSettings> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(QuizSettings::default());
            }
            Err(e) => {
                return Err(AppError::Settings(SettingsError::ReadFailed {
                    path: self.path.clone(),
                    source: e,
                }));
            }
        };
        let mut settings: QuizSettings =
            toml::from_str(&raw).map_err(|e| AppError::Settings(SettingsError::from(e)))?;
        settings.normalize();
        Ok(settings)
    }

    async fn write_merged(&self, patch: &SettingsPatch) -> AppResult<()> {
        let mut settings = self.read().await;
        settings.apply_patch(patch);

        let body = toml::to_string_pretty(&settings)
            .map_err(|e| AppError::Settings(SettingsError::from(e)))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_failed(e))?;
        }

        // 先写临时文件，改名是原子的，记录不会出现半写状态
        let tmp = self.path.with_extension("toml.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| self.write_failed(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.write_failed(e))?;

        debug!("设置记录已写入: {}", self.path.display());
        Ok(())
    }

    fn write_failed(&self, source: std::io::Error) -> AppError {
        AppError::Settings(SettingsError::WriteFailed {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::{Difficulty, QuizStyle};

    fn store_in(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("settings.toml"))
    }

    #[tokio::test]
    async fn test_read_without_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        assert_eq!(store.read().await, QuizSettings::default());
    }

    #[tokio::test]
    async fn test_save_then_read_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);

        let patch = SettingsPatch {
            question_count: Some(15),
            difficulty: Some(Difficulty::Hard),
            model: Some("gemini-2.5-pro".to_string()),
            style: Some(vec![QuizStyle::MultipleChoice, QuizStyle::TrueFalse]),
            focus_topic: Some("牛顿第二定律".to_string()),
        };
        assert!(store.save(&patch).await);

        let settings = store.read().await;
        assert_eq!(settings.question_count, 15);
        assert_eq!(settings.difficulty, Difficulty::Hard);
        assert_eq!(settings.model, "gemini-2.5-pro");
        assert_eq!(settings.style, vec![QuizStyle::MultipleChoice, QuizStyle::TrueFalse]);
        assert_eq!(settings.focus_topic, "牛顿第二定律");
    }

    #[tokio::test]
    async fn test_partial_save_preserves_other_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);

        let first = SettingsPatch {
            question_count: Some(10),
            difficulty: Some(Difficulty::Hard),
            focus_topic: Some("细胞呼吸".to_string()),
            ..SettingsPatch::default()
        };
        assert!(store.save(&first).await);

        let second = SettingsPatch {
            question_count: Some(20),
            ..SettingsPatch::default()
        };
        assert!(store.save(&second).await);

        let settings = store.read().await;
        assert_eq!(settings.question_count, 20);
        assert_eq!(settings.difficulty, Difficulty::Hard);
        assert_eq!(settings.focus_topic, "细胞呼吸");
    }

    #[tokio::test]
    async fn test_save_clamps_question_count() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);

        let patch = SettingsPatch {
            question_count: Some(999),
            ..SettingsPatch::default()
        };
        assert!(store.save(&patch).await);
        assert_eq!(store.read().await.question_count, 30);
    }

    #[tokio::test]
    async fn test_corrupted_record_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        tokio::fs::write(store.path(), "这不是合法的 TOML {{{{")
            .await
            .expect("写损坏记录失败");

        assert_eq!(store.read().await, QuizSettings::default());

        // 损坏的记录不阻止后续写入
        let patch = SettingsPatch {
            question_count: Some(7),
            ..SettingsPatch::default()
        };
        assert!(store.save(&patch).await);
        assert_eq!(store.read().await.question_count, 7);
    }
}
