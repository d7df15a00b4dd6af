//! 后端 HTTP 接口的请求/响应结构

use serde::{Deserialize, Serialize};

use super::document::{DocumentId, FileType, StudentId};

/// `POST /upload-url` 请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadUrlRequest {
    pub student_id: StudentId,
    pub filename: String,
    pub content_type: String,
}

/// 预签名上传地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignedUpload {
    pub presigned_url: String,
    /// 注册文档时必须使用的存储键
    #[serde(alias = "s3_key")]
    pub storage_key: String,
    /// 有效期（秒）
    pub expires_in: u64,
}

/// `POST /documents` 请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub student_id: StudentId,
    pub title: String,
    pub storage_key: String,
    pub file_type: FileType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

/// `POST /download-url` 请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadUrlRequest<'a> {
    pub storage_key: &'a str,
}

/// 预签名下载地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignedDownload {
    pub presigned_url: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// `DELETE /documents/{id}` 响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReceipt {
    pub message: String,
    pub document_id: DocumentId,
}

/// 后端错误响应，`detail` 可能是字符串，也可能是字段校验错误列表
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            serde_json::Value::String(_) | serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}
