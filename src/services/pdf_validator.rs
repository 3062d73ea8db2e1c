//! 输入校验服务 - 业务能力层
//!
//! 只负责“校验并暂存 PDF”能力，不关心流程。
//!
//! 校验通过后在进程私有工作目录里落一份随机文件名的副本，下游只见到
//! 暂存副本，用户的原始路径不再向后传递。

use std::path::{Path, PathBuf};

use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult, InputError};

/// 可接受的最大 PDF 体积（50 MB）
pub const MAX_PDF_BYTES: u64 = 50 * 1024 * 1024;
/// PDF 文件头签名
pub const PDF_MAGIC: &[u8; 5] = b"%PDF-";

/// 暂存在工作目录中的 PDF 副本
///
/// 持有期间代表一次生成对输入文件的所有权；离开作用域时删除副本，
/// 无论这次生成成功、失败还是提前返回。删除失败只记日志，不影响结果。
#[derive(Debug)]
pub struct StagedPdf {
    path: PathBuf,
    removed: bool,
}

impl StagedPdf {
    /// 暂存副本的完整路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 暂存副本的文件名（用于写进生成指令）
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// 立即删除副本
    pub fn remove(mut self) {
        self.remove_now();
    }

    fn remove_now(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("🗑️ 删除暂存副本失败 ({}): {}", self.path.display(), e);
            }
        } else {
            debug!("已删除暂存副本: {}", self.file_name());
        }
    }
}

impl Drop for StagedPdf {
    fn drop(&mut self) {
        self.remove_now();
    }
}

/// 校验候选 PDF 并暂存副本
///
/// 拒绝：相对路径、含空字符的路径、非 .pdf 扩展名（忽略大小写）、
/// 不存在或非常规的文件（含符号链接）、超过 50 MB、空文件、
/// 前 5 个字节不是 `%PDF-` 签名的文件。
pub async fn validate_and_stage(path: &Path, working_dir: &Path) -> AppResult<StagedPdf> {
    if !path.is_absolute() {
        return Err(AppError::path_rejected(path, "必须是绝对路径"));
    }
    if path.as_os_str().to_string_lossy().contains('\0') {
        return Err(AppError::path_rejected(path, "路径包含空字符"));
    }
    let is_pdf_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf_ext {
        return Err(AppError::Input(InputError::NotAPdf { path: path.to_path_buf() }));
    }

    // symlink_metadata 不跟随符号链接，链接本身会因“非常规文件”被拒绝
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(m) => m,
        Err(_) => return Err(AppError::path_rejected(path, "文件不存在或不可访问")),
    };
    if !metadata.is_file() {
        return Err(AppError::path_rejected(path, "不是常规文件"));
    }

    let size = metadata.len();
    if size == 0 {
        return Err(AppError::Input(InputError::EmptyFile));
    }
    if size > MAX_PDF_BYTES {
        return Err(AppError::Input(InputError::FileTooLarge {
            size,
            limit: MAX_PDF_BYTES,
        }));
    }
    if size < PDF_MAGIC.len() as u64 {
        return Err(AppError::Input(InputError::NotAPdf { path: path.to_path_buf() }));
    }

    let mut magic = [0u8; 5];
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| AppError::Input(InputError::StageFailed { source: e }))?;
    file.read_exact(&mut magic)
        .await
        .map_err(|e| AppError::Input(InputError::StageFailed { source: e }))?;
    if &magic != PDF_MAGIC {
        return Err(AppError::Input(InputError::NotAPdf { path: path.to_path_buf() }));
    }

    tokio::fs::create_dir_all(working_dir)
        .await
        .map_err(|e| AppError::Input(InputError::StageFailed { source: e }))?;
    let staged_path = working_dir.join(format!("stage-{}.pdf", Uuid::new_v4()));
    tokio::fs::copy(path, &staged_path)
        .await
        .map_err(|e| AppError::Input(InputError::StageFailed { source: e }))?;

    let staged = StagedPdf {
        path: staged_path,
        removed: false,
    };
    info!("📄 输入校验通过，已暂存副本: {} ({} 字节)", staged.file_name(), size);
    Ok(staged)
}
