//! 文档上传流程 - 流程层
//!
//! 核心职责：定义"一个文件"从本地字节到已注册文档的完整流程
//!
//! 流程顺序（严格串行，任一步失败立即终止）：
//! 1. 校验类型/大小（无 I/O）
//! 2. 申请预签名上传地址
//! 3. 直接写入对象存储
//! 4. 注册文档元数据（唯一的持久化步骤，放在最后）

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::error::AppResult;
use crate::models::{Document, NewDocument, UploadUrlRequest};
use crate::services::{validate_file, validate_title, DocumentApi, ObjectStore, ProgressFn};
use crate::utils::logging::truncate_text;
use crate::workflow::progress::{checkpoint, ProgressTracker};
use crate::workflow::upload_ctx::{UploadRequest, UploadSession};

/// 文档上传流程
///
/// - 编排 校验 → 预签名 → 传输 → 注册
/// - 不做重试：第一次失败即返回
/// - 不持有任何会话状态，可被多个上传并发复用
pub struct UploadFlow {
    api: Arc<dyn DocumentApi>,
    store: Arc<dyn ObjectStore>,
    max_file_size: u64,
}

impl UploadFlow {
    /// 创建新的上传流程
    pub fn new(api: Arc<dyn DocumentApi>, store: Arc<dyn ObjectStore>, config: &Config) -> Self {
        Self {
            api,
            store,
            max_file_size: config.max_file_size,
        }
    }

    /// 执行一次上传
    ///
    /// # 参数
    /// - `request`: 上传请求
    /// - `on_progress`: 进度观察者，收到单调递增的 0-100；只有成功时才会收到 100
    /// - `cancel`: 取消令牌，作用于对象存储传输
    ///
    /// # 返回
    /// 返回状态为 pending 的新文档
    pub async fn run(
        &self,
        request: UploadRequest,
        on_progress: ProgressFn,
        cancel: &CancellationToken,
    ) -> AppResult<Document> {
        let session = UploadSession::new(request, ProgressTracker::new(on_progress));

        match self.execute(&session, cancel).await {
            Ok(document) => {
                info!("{} ✓ 上传完成，文档 #{} ({})", session, document.id, document.status);
                Ok(document)
            }
            Err(e) => {
                error!("{} ❌ 上传失败 (进度 {}%): {}", session, session.progress.current(), e);
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        session: &UploadSession,
        cancel: &CancellationToken,
    ) -> AppResult<Document> {
        let request = &session.request;
        let progress = &session.progress;

        // ========== 步骤 1: 校验 ==========
        validate_title(&request.title)?;
        let file_type = validate_file(&request.content_type, request.size(), self.max_file_size)?;
        progress.report(checkpoint::VALIDATED);
        info!(
            "{} 标题: {} | 类型: {} | 大小: {} 字节",
            session,
            truncate_text(&request.title, 40),
            file_type,
            request.size()
        );

        // ========== 步骤 2: 申请预签名地址 ==========
        let presigned = self
            .api
            .request_upload_url(&UploadUrlRequest {
                student_id: request.student_id,
                filename: request.filename.clone(),
                content_type: request.content_type.clone(),
            })
            .await?;
        progress.report(checkpoint::PRESIGNED);
        info!(
            "{} ✓ 获得上传地址 (有效期 {} 秒)",
            session, presigned.expires_in
        );

        // ========== 步骤 3: 写入对象存储 ==========
        self.store
            .put_object(
                &presigned.presigned_url,
                request.bytes.clone(),
                &request.content_type,
                progress.scaled(checkpoint::PRESIGNED, checkpoint::TRANSFERRED),
                cancel,
            )
            .await?;
        progress.report(checkpoint::TRANSFERRED);
        info!("{} ✓ 文件已写入对象存储: {}", session, presigned.storage_key);

        // ========== 步骤 4: 注册元数据 ==========
        progress.report(checkpoint::REGISTERING);
        let document = self
            .api
            .register_document(&NewDocument {
                student_id: request.student_id,
                title: request.title.trim().to_string(),
                storage_key: presigned.storage_key,
                file_type,
                subject: request.subject.clone().filter(|s| !s.trim().is_empty()),
            })
            .await?;
        progress.report(checkpoint::DONE);

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, StorageError, ValidationError};
    use crate::models::DocumentStatus;
    use crate::test_support::{FakeBackend, FakeStore};
    use bytes::Bytes;
    use std::sync::Mutex;

    fn request(content_type: &str, size: usize) -> UploadRequest {
        UploadRequest {
            student_id: 42,
            filename: "essay.pdf".into(),
            content_type: content_type.into(),
            title: "Essay".into(),
            subject: Some("ELA".into()),
            bytes: Bytes::from(vec![0u8; size]),
        }
    }

    fn recorder() -> (ProgressFn, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (Arc::new(move |p: u8| sink.lock().unwrap().push(p)), seen)
    }

    fn flow(backend: &Arc<FakeBackend>, store: &Arc<FakeStore>) -> UploadFlow {
        UploadFlow::new(backend.clone(), store.clone(), &Config::default())
    }

    #[tokio::test]
    async fn successful_upload_registers_pending_document() {
        let backend = FakeBackend::new();
        let store = FakeStore::new();
        let (on_progress, seen) = recorder();

        let document = flow(&backend, &store)
            .run(request("application/pdf", 2 * 1024 * 1024), on_progress, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(document.status, DocumentStatus::Pending);
        assert_eq!(document.storage_key, "k1");
        assert_eq!(backend.calls(), vec!["upload-url", "register:k1"]);
        assert_eq!(store.puts(), 1);
        let stored = store.stored("https://store.test/essay.pdf").unwrap();
        assert_eq!(stored.len(), 2 * 1024 * 1024);

        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.first(), Some(&10));
        assert!(seen.contains(&20) && seen.contains(&80) && seen.contains(&90));
        assert_eq!(seen.last(), Some(&100));
    }

    #[tokio::test]
    async fn validation_failure_makes_no_external_calls() {
        let backend = FakeBackend::new();
        let store = FakeStore::new();

        for bad in [request("image/png", 10), request("application/pdf", 50 * 1024 * 1024 + 1)] {
            let (on_progress, seen) = recorder();
            let err = flow(&backend, &store)
                .run(bad, on_progress, &CancellationToken::new())
                .await
                .unwrap_err();
            assert!(err.is_validation());
            assert!(seen.lock().unwrap().is_empty());
        }

        let mut untitled = request("application/pdf", 10);
        untitled.title = "  ".into();
        let (on_progress, _) = recorder();
        let err = flow(&backend, &store)
            .run(untitled, on_progress, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::EmptyTitle)));

        assert!(backend.calls().is_empty());
        assert_eq!(store.puts(), 0);
    }

    #[tokio::test]
    async fn presign_failure_stops_before_transfer() {
        let backend = FakeBackend::new();
        backend.fail_step("upload-url");
        let store = FakeStore::new();
        let (on_progress, seen) = recorder();

        let err = flow(&backend, &store)
            .run(request("application/pdf", 10), on_progress, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("permission"));
        assert_eq!(store.puts(), 0);
        assert_eq!(backend.calls_matching("register"), 0);
        assert_eq!(*seen.lock().unwrap(), vec![10]);
    }

    #[tokio::test]
    async fn storage_rejection_never_registers() {
        let backend = FakeBackend::new();
        let store = FakeStore::new();
        store.reject_with(403);
        let (on_progress, seen) = recorder();

        let err = flow(&backend, &store)
            .run(request("text/plain", 10), on_progress, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(StorageError::Rejected { status: 403 })));
        assert_eq!(backend.calls_matching("register"), 0);
        let seen = seen.lock().unwrap();
        assert!(!seen.contains(&100));
        assert!(seen.iter().all(|p| *p <= 80));
    }

    #[tokio::test]
    async fn aborted_transfer_never_registers() {
        let backend = FakeBackend::new();
        let store = FakeStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (on_progress, _) = recorder();

        let err = flow(&backend, &store)
            .run(request("text/plain", 10), on_progress, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(StorageError::Aborted)));
        assert_eq!(backend.calls(), vec!["upload-url"]);
    }

    #[tokio::test]
    async fn registration_failure_surfaces_backend_detail() {
        let backend = FakeBackend::new();
        backend.fail_step("register");
        let store = FakeStore::new();
        let (on_progress, seen) = recorder();

        let err = flow(&backend, &store)
            .run(request("application/pdf", 10), on_progress, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Student with ID 42 not found");
        assert_eq!(store.puts(), 1);
        assert_eq!(seen.lock().unwrap().last(), Some(&90));
    }
}
