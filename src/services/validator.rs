//! 文件校验 - 业务能力层
//!
//! 纯函数，不做任何 I/O。上传流程的第一步，失败时不会发出任何网络请求。

use crate::error::ValidationError;
use crate::models::FileType;

/// 校验文件类型和大小，通过时返回对应的 [`FileType`]
///
/// # 参数
/// - `content_type`: 声明的 MIME 类型
/// - `size`: 文件字节数
/// - `max_size`: 大小上限（字节，含）
pub fn validate_file(
    content_type: &str,
    size: u64,
    max_size: u64,
) -> Result<FileType, ValidationError> {
    let kind = FileType::from_mime(content_type).ok_or_else(|| {
        ValidationError::UnsupportedType {
            content_type: content_type.to_string(),
            accepted: accepted_types(),
        }
    })?;

    if size > max_size {
        return Err(ValidationError::TooLarge {
            size,
            max_mib: max_size / (1024 * 1024),
        });
    }

    Ok(kind)
}

/// 标题不能为空白
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(())
}

fn accepted_types() -> String {
    FileType::ALL
        .iter()
        .map(|kind| kind.extension().to_uppercase())
        .collect::<Vec<_>>()
        .join(", ")
}
