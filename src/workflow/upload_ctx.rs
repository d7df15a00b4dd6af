//! 上传请求与上传会话
//!
//! 会话只在一次上传流程内存在，结束后即丢弃

use std::fmt::Display;
use std::path::Path;

use bytes::Bytes;

use crate::error::{AppError, AppResult};
use crate::models::{FileType, StudentId};
use crate::services::validate_file;
use crate::workflow::progress::ProgressTracker;

const OCTET_STREAM: &str = "application/octet-stream";

/// 调用方提交的上传请求
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// 所属学生
    pub student_id: StudentId,
    /// 原始文件名
    pub filename: String,
    /// 声明的 MIME 类型
    pub content_type: String,
    /// 文档标题
    pub title: String,
    /// 学科（可选）
    pub subject: Option<String>,
    /// 文件内容
    pub bytes: Bytes,
}

impl UploadRequest {
    /// 读取本地文件，按扩展名推断 MIME 类型
    ///
    /// 无法识别的扩展名记为 `application/octet-stream`，交给校验步骤拒绝。
    /// 超过 `max_size` 的文件在读取前就被拒绝。
    pub async fn from_path(
        path: impl AsRef<Path>,
        student_id: StudentId,
        title: impl Into<String>,
        subject: Option<String>,
        max_size: u64,
    ) -> AppResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let content_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(FileType::from_extension)
            .map_or(OCTET_STREAM, FileType::mime);

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| AppError::file_read_failed(display.clone(), e))?;
        if metadata.len() > max_size {
            validate_file(content_type, metadata.len(), max_size)?;
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(display.clone(), e))?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or(display);

        Ok(Self {
            student_id,
            filename,
            content_type: content_type.to_string(),
            title: title.into(),
            subject,
            bytes: Bytes::from(bytes),
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// 单次上传会话
pub struct UploadSession {
    pub request: UploadRequest,
    pub progress: ProgressTracker,
}

impl UploadSession {
    pub fn new(request: UploadRequest, progress: ProgressTracker) -> Self {
        Self { request, progress }
    }
}

impl Display for UploadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[上传 学生#{} {}]",
            self.request.student_id, self.request.filename
        )
    }
}
