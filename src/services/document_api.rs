//! 后端文档接口能力
//!
//! 上层（workflow / orchestrator）只依赖此 trait，不直接依赖 HTTP 客户端，
//! 测试中可以替换为内存实现。

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{
    DeleteReceipt, Document, DocumentId, NewDocument, PresignedDownload, PresignedUpload,
    StudentId, UploadUrlRequest,
};

/// 后端元数据/存储服务
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// 申请单个文件的预签名写入地址
    async fn request_upload_url(&self, request: &UploadUrlRequest) -> AppResult<PresignedUpload>;

    /// 注册文档元数据，新文档状态为 pending
    async fn register_document(&self, document: &NewDocument) -> AppResult<Document>;

    /// 请求后端开始异步分析；只等待请求被接受，不等待分析结束
    async fn trigger_analysis(&self, id: &DocumentId) -> AppResult<()>;

    /// 获取文档当前状态
    async fn get_document(&self, id: &DocumentId) -> AppResult<Document>;

    /// 学生的全部文档，按上传时间倒序
    async fn list_student_documents(&self, student_id: StudentId) -> AppResult<Vec<Document>>;

    /// 删除文档（后端负责删除存储对象）
    async fn delete_document(&self, id: &DocumentId) -> AppResult<DeleteReceipt>;

    /// 申请预签名下载地址
    async fn request_download_url(&self, storage_key: &str) -> AppResult<PresignedDownload>;
}
