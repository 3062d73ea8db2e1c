//! 外部工具发现 - 业务能力层
//!
//! 在常见安装位置和 PATH 中定位外部生成工具的可执行文件。解析结果在
//! 进程生命周期内缓存一次，不随每次生成重复探测；单独暴露是为了让
//! 设置界面能显示“已安装/未安装”而不触发任何生成。

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, DiscoveryError};

/// 工具安装状态（供设置界面显示）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliStatus {
    /// 解析到的完整路径；未安装时是可执行文件名本身
    pub path: String,
    pub exists: bool,
}

/// 外部 CLI 定位器
pub struct CliLocator {
    binary: String,
    probe_dirs: Vec<PathBuf>,
    cache: RwLock<Option<PathBuf>>,
}

impl CliLocator {
    /// 以默认探测目录创建定位器
    pub fn new(binary: impl Into<String>) -> Self {
        Self::with_probe_dirs(binary, default_probe_dirs())
    }

    /// 以自定义探测目录创建定位器
    pub fn with_probe_dirs(binary: impl Into<String>, probe_dirs: Vec<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            probe_dirs,
            cache: RwLock::new(None),
        }
    }

    /// 可执行文件名
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// 解析工具路径
    ///
    /// 幂等：首次成功后缓存，进程内不再重复探测。
    pub fn resolve(&self) -> AppResult<PathBuf> {
        if let Some(path) = self.cached() {
            return Ok(path);
        }

        let found = self
            .probe_dirs
            .iter()
            .map(|dir| dir.join(&self.binary))
            .find(|candidate| is_executable(candidate))
            .or_else(|| self.search_path());

        match found {
            Some(path) => {
                info!("✓ 已定位外部工具: {}", path.display());
                *self.cache.write().unwrap_or_else(|e| e.into_inner()) = Some(path.clone());
                Ok(path)
            }
            None => Err(AppError::Discovery(DiscoveryError::CliNotFound {
                binary: self.binary.clone(),
            })),
        }
    }

    /// 查询安装状态，绝不触发生成
    pub fn status(&self) -> CliStatus {
        match self.resolve() {
            Ok(path) => CliStatus {
                path: path.display().to_string(),
                exists: true,
            },
            Err(_) => CliStatus {
                path: self.binary.clone(),
                exists: false,
            },
        }
    }

    /// 清除缓存
    ///
    /// 用户在会话中途安装工具后调用，下一次 resolve 重新探测，
    /// 不需要重启进程。
    pub fn invalidate(&self) {
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = None;
        debug!("已清除工具路径缓存");
    }

    fn cached(&self) -> Option<PathBuf> {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn search_path(&self) -> Option<PathBuf> {
        let path_var = std::env::var_os("PATH")?;
        std::env::split_paths(&path_var)
            .map(|dir| dir.join(&self.binary))
            .find(|candidate| is_executable(candidate))
    }
}

fn default_probe_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from("/usr/local/bin"),
        PathBuf::from("/opt/homebrew/bin"),
    ];
    if let Some(home) = dirs::home_dir() {
        dirs.push(home.join(".local/bin"));
        dirs.push(home.join(".npm-global/bin"));
    }
    dirs
}

fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn install_fake_tool(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").expect("写入失败");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod 失败");
        path
    }

    #[test]
    fn test_resolve_finds_tool_in_probe_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let expected = install_fake_tool(dir.path(), "faketool");

        let locator = CliLocator::with_probe_dirs("faketool", vec![dir.path().to_path_buf()]);
        assert_eq!(locator.resolve().expect("应当找到"), expected);

        let status = locator.status();
        assert!(status.exists);
        assert_eq!(status.path, expected.display().to_string());
    }

    #[test]
    fn test_resolve_is_cached() {
        let dir = tempfile::tempdir().expect("tempdir");
        let expected = install_fake_tool(dir.path(), "faketool");

        let locator = CliLocator::with_probe_dirs("faketool", vec![dir.path().to_path_buf()]);
        locator.resolve().expect("首次解析");

        // 文件删除后缓存仍然生效
        std::fs::remove_file(&expected).expect("删除失败");
        assert_eq!(locator.resolve().expect("缓存应当命中"), expected);
    }

    #[test]
    fn test_invalidate_forces_reprobe() {
        let dir = tempfile::tempdir().expect("tempdir");
        let expected = install_fake_tool(dir.path(), "faketool");

        let locator = CliLocator::with_probe_dirs("faketool", vec![dir.path().to_path_buf()]);
        locator.resolve().expect("首次解析");
        std::fs::remove_file(&expected).expect("删除失败");

        locator.invalidate();
        assert!(locator.resolve().is_err());
        assert!(!locator.status().exists);
    }

    #[test]
    fn test_not_found_reports_binary_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let locator =
            CliLocator::with_probe_dirs("definitely-not-installed", vec![dir.path().to_path_buf()]);
        // 探测目录为空时也不落到 PATH 里的同名工具
        let err = locator.resolve().expect_err("不应当找到");
        assert!(err.to_string().contains("definitely-not-installed"));
    }
}
