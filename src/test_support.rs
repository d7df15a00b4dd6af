//! 单元测试用的内存后端和对象存储

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::{ApiError, AppError, AppResult, StorageError};
use crate::models::{
    DeleteReceipt, Document, DocumentId, DocumentStatus, FileType, NewDocument,
    PresignedDownload, PresignedUpload, StudentId, UploadUrlRequest,
};
use crate::services::{DocumentApi, ObjectStore, ProgressFn};

pub(crate) fn doc(id: u64, title: &str, status: DocumentStatus) -> Document {
    Document {
        id: DocumentId::from(id),
        student_id: 42,
        title: title.to_string(),
        storage_key: format!("k{}", id),
        file_type: FileType::Pdf,
        subject: None,
        upload_date: None,
        status,
        error_message: (status == DocumentStatus::Failed).then(|| "analysis failed".to_string()),
    }
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    docs: Mutex<HashMap<DocumentId, Document>>,
    calls: Mutex<Vec<String>>,
    trigger_failures: Mutex<HashMap<DocumentId, String>>,
    status_script: Mutex<HashMap<DocumentId, VecDeque<DocumentStatus>>>,
    fail_step: Mutex<Option<&'static str>>,
    get_failures: Mutex<Option<(u16, String, usize)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_id: AtomicUsize,
    latency: Mutex<Duration>,
}

impl FakeBackend {
    pub(crate) fn new() -> Arc<Self> {
        let backend = Self::default();
        backend.next_id.store(100, Ordering::SeqCst);
        Arc::new(backend)
    }

    pub(crate) fn insert(&self, document: Document) {
        self.docs.lock().unwrap().insert(document.id.clone(), document);
    }

    pub(crate) fn fail_trigger(&self, id: u64, detail: &str) {
        self.trigger_failures
            .lock()
            .unwrap()
            .insert(DocumentId::from(id), detail.to_string());
    }

    /// 让某一步（"upload-url" / "register"）返回后端错误
    pub(crate) fn fail_step(&self, step: &'static str) {
        *self.fail_step.lock().unwrap() = Some(step);
    }

    /// 接下来 `times` 次 get_document 返回指定状态码的错误
    pub(crate) fn fail_gets(&self, status: u16, detail: &str, times: usize) {
        *self.get_failures.lock().unwrap() = Some((status, detail.to_string(), times));
    }

    fn next_get_failure(&self, id: &DocumentId) -> Option<AppError> {
        let mut slot = self.get_failures.lock().unwrap();
        let (status, detail, remaining) = slot.as_mut()?;
        if *remaining == 0 {
            return None;
        }
        *remaining -= 1;
        let endpoint = format!("/documents/{}", id);
        Some(if *status == 401 {
            AppError::Api(ApiError::Unauthorized {
                endpoint,
                message: detail.clone(),
            })
        } else {
            AppError::api_rejected(endpoint, *status, detail.clone())
        })
    }

    /// 后续 get_document 依次返回的状态
    pub(crate) fn script_statuses(&self, id: u64, statuses: &[DocumentStatus]) {
        self.status_script
            .lock()
            .unwrap()
            .insert(DocumentId::from(id), statuses.iter().copied().collect());
    }

    pub(crate) fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_matching(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn status_of(&self, id: u64) -> Option<DocumentStatus> {
        self.docs
            .lock()
            .unwrap()
            .get(&DocumentId::from(id))
            .map(|d| d.status)
    }

    async fn enter(&self, call: String) -> InFlight<'_> {
        self.calls.lock().unwrap().push(call);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);
        let latency = *self.latency.lock().unwrap();
        if latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(latency).await;
        }
        guard
    }

    fn failing(&self, step: &str) -> bool {
        *self.fail_step.lock().unwrap() == Some(step)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn not_found(id: &DocumentId) -> AppError {
    AppError::api_rejected(
        format!("/documents/{}", id),
        404,
        format!("Document with ID {} not found", id),
    )
}

#[async_trait]
impl DocumentApi for FakeBackend {
    async fn request_upload_url(&self, request: &UploadUrlRequest) -> AppResult<PresignedUpload> {
        let _guard = self.enter("upload-url".to_string()).await;
        if self.failing("upload-url") {
            return Err(AppError::api_rejected("/upload-url", 403, "You do not have permission to access this student's documents"));
        }
        Ok(PresignedUpload {
            presigned_url: format!("https://store.test/{}", request.filename),
            storage_key: "k1".to_string(),
            expires_in: 3600,
        })
    }

    async fn register_document(&self, document: &NewDocument) -> AppResult<Document> {
        let _guard = self.enter(format!("register:{}", document.storage_key)).await;
        if self.failing("register") {
            return Err(AppError::api_rejected("/documents", 404, "Student with ID 42 not found"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as u64;
        let created = Document {
            id: DocumentId::from(id),
            student_id: document.student_id,
            title: document.title.clone(),
            storage_key: document.storage_key.clone(),
            file_type: document.file_type,
            subject: document.subject.clone(),
            upload_date: None,
            status: DocumentStatus::Pending,
            error_message: None,
        };
        self.insert(created.clone());
        Ok(created)
    }

    async fn trigger_analysis(&self, id: &DocumentId) -> AppResult<()> {
        let _guard = self.enter(format!("analyze:{}", id)).await;
        let endpoint = format!("/documents/{}/analyze", id);
        if let Some(detail) = self.trigger_failures.lock().unwrap().get(id) {
            return Err(AppError::api_rejected(endpoint, 429, detail.clone()));
        }

        let mut docs = self.docs.lock().unwrap();
        let document = docs.get_mut(id).ok_or_else(|| not_found(id))?;
        if !document.status.can_trigger_analysis() {
            return Err(AppError::api_rejected(
                endpoint,
                409,
                format!("Document cannot be analyzed while {}", document.status),
            ));
        }
        document.status = DocumentStatus::Processing;
        document.error_message = None;
        Ok(())
    }

    async fn get_document(&self, id: &DocumentId) -> AppResult<Document> {
        let _guard = self.enter(format!("get:{}", id)).await;
        if let Some(err) = self.next_get_failure(id) {
            return Err(err);
        }
        let next = self
            .status_script
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(|queue| queue.pop_front());

        let mut docs = self.docs.lock().unwrap();
        let document = docs.get_mut(id).ok_or_else(|| not_found(id))?;
        if let Some(status) = next {
            document.status = status;
            document.error_message =
                (status == DocumentStatus::Failed).then(|| "could not extract text".to_string());
        }
        Ok(document.clone())
    }

    async fn list_student_documents(&self, student_id: StudentId) -> AppResult<Vec<Document>> {
        let _guard = self.enter(format!("list:{}", student_id)).await;
        let mut docs: Vec<Document> = self
            .docs
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.student_id == student_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(docs)
    }

    async fn delete_document(&self, id: &DocumentId) -> AppResult<DeleteReceipt> {
        let _guard = self.enter(format!("delete:{}", id)).await;
        let removed = self.docs.lock().unwrap().remove(id).ok_or_else(|| not_found(id))?;
        Ok(DeleteReceipt {
            message: format!("Document '{}' deleted successfully", removed.title),
            document_id: id.clone(),
        })
    }

    async fn request_download_url(&self, storage_key: &str) -> AppResult<PresignedDownload> {
        let _guard = self.enter(format!("download-url:{}", storage_key)).await;
        Ok(PresignedDownload {
            presigned_url: format!("https://store.test/get/{}", storage_key),
            expires_in: Some(3600),
        })
    }
}

/// 内存对象存储；可设置为拒绝写入
#[derive(Default)]
pub(crate) struct FakeStore {
    objects: Mutex<HashMap<String, Bytes>>,
    reject_with: Mutex<Option<u16>>,
    puts: AtomicUsize,
}

impl FakeStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn reject_with(&self, status: u16) {
        *self.reject_with.lock().unwrap() = Some(status);
    }

    pub(crate) fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// 写入到某个预签名地址的内容
    pub(crate) fn stored(&self, url: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(url).cloned()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn put_object(
        &self,
        url: &str,
        body: Bytes,
        _content_type: &str,
        on_progress: ProgressFn,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(StorageError::Aborted);
        }
        for p in [0, 25, 50, 75, 100] {
            on_progress(p);
            tokio::task::yield_now().await;
        }
        if let Some(status) = *self.reject_with.lock().unwrap() {
            return Err(StorageError::Rejected { status });
        }
        self.objects.lock().unwrap().insert(url.to_string(), body);
        Ok(())
    }
}
