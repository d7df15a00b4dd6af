//! 应用入口
//!
//! 持有客户端并组装各层，命令行的每个子命令对应这里的一个方法。

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clients::{BackendClient, StorageClient};
use crate::config::Config;
use crate::models::{
    DeleteReceipt, Document, DocumentId, DocumentStatus, PresignedDownload, StudentId,
};
use crate::orchestrator::{BatchOutcome, BulkAnalyzer, ReconcileEnd, StatusReconciler};
use crate::services::{DocumentApi, ProgressFn};
use crate::workflow::{AnalysisFlow, UploadFlow, UploadRequest};

/// 上传子命令的参数
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub student_id: StudentId,
    pub title: String,
    pub subject: Option<String>,
    /// 注册后立即触发分析
    pub analyze: bool,
    /// 触发后轮询直到终态
    pub watch: bool,
}

/// 应用主结构
pub struct App {
    config: Config,
    api: Arc<dyn DocumentApi>,
    upload: UploadFlow,
    analysis: AnalysisFlow,
    reconciler: StatusReconciler,
    bulk: BulkAnalyzer,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        let api: Arc<dyn DocumentApi> =
            Arc::new(BackendClient::new(&config).context("创建后端客户端失败")?);
        let store = Arc::new(StorageClient::new().context("创建对象存储客户端失败")?);

        log_startup(&config);
        Ok(Self::with_backends(config, api, store))
    }

    /// 使用指定的后端组装应用
    pub fn with_backends(
        config: Config,
        api: Arc<dyn DocumentApi>,
        store: Arc<dyn crate::services::ObjectStore>,
    ) -> Self {
        Self {
            upload: UploadFlow::new(api.clone(), store, &config),
            analysis: AnalysisFlow::new(api.clone()),
            reconciler: StatusReconciler::new(api.clone(), &config),
            bulk: BulkAnalyzer::new(api.clone()),
            api,
            config,
        }
    }

    /// 上传本地文件；Ctrl-C 会中止对象存储传输
    pub async fn upload(&self, path: &Path, options: UploadOptions) -> Result<Document> {
        let request = UploadRequest::from_path(
            path,
            options.student_id,
            options.title.clone(),
            options.subject.clone(),
            self.config.max_file_size,
        )
        .await?;

        let cancel = CancellationToken::new();
        let interrupt = spawn_interrupt_listener(cancel.clone());
        let on_progress: ProgressFn = Arc::new(|percent: u8| info!("⬆️ 上传进度 {}%", percent));

        let result = self.upload.run(request, on_progress, &cancel).await;
        interrupt.abort();
        let document = result?;

        if options.analyze {
            info!("[文档 {}] 已注册，开始触发分析", document.id);
            self.analysis
                .trigger(&document.id)
                .await
                .with_context(|| format!("文档 {} 已上传，但触发分析失败", document.id))?;
            if options.watch {
                return self.watch(&document.id).await;
            }
            return self.status(&document.id).await;
        }
        Ok(document)
    }

    /// 触发单个文档的分析
    pub async fn analyze(&self, id: &DocumentId, watch: bool) -> Result<Document> {
        self.analysis.trigger(id).await?;
        if watch {
            self.watch(id).await
        } else {
            self.status(id).await
        }
    }

    pub async fn status(&self, id: &DocumentId) -> Result<Document> {
        Ok(self.api.get_document(id).await?)
    }

    /// 轮询直到终态，Ctrl-C 停止轮询
    pub async fn watch(&self, id: &DocumentId) -> Result<Document> {
        let handle = self.reconciler.watch(id.clone(), true, log_status_change);
        let canceller = handle.canceller();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                canceller.cancel();
            }
        });

        let end = handle.finished().await;
        interrupt.abort();

        match end {
            ReconcileEnd::Terminal(document) => Ok(document),
            ReconcileEnd::Gone => anyhow::bail!("文档 {} 已不存在", id),
            ReconcileEnd::Failed(e) => {
                Err(anyhow::Error::new(e).context(format!("文档 {} 状态查询失败", id)))
            }
            ReconcileEnd::Cancelled | ReconcileEnd::Disabled => {
                warn!("[文档 {}] 轮询已停止，返回最近一次状态", id);
                self.status(id).await
            }
        }
    }

    /// 对学生所有 pending 文档批量触发分析
    pub async fn bulk_analyze(&self, student_id: StudentId) -> Result<BatchOutcome> {
        let outcome = self
            .bulk
            .run_for_student(student_id, |p| {
                info!(
                    "📈 批量进度 {}% ({} 成功 / {} 失败 / 共 {})",
                    p.percent(),
                    p.completed,
                    p.failed,
                    p.total
                )
            })
            .await?;
        Ok(outcome)
    }

    pub async fn list(&self, student_id: StudentId) -> Result<Vec<Document>> {
        Ok(self.api.list_student_documents(student_id).await?)
    }

    pub async fn delete(&self, id: &DocumentId) -> Result<DeleteReceipt> {
        Ok(self.api.delete_document(id).await?)
    }

    /// 文档原件的预签名下载地址
    pub async fn download_url(&self, id: &DocumentId) -> Result<PresignedDownload> {
        let document = self.api.get_document(id).await?;
        Ok(self.api.request_download_url(&document.storage_key).await?)
    }
}

fn spawn_interrupt_listener(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到中断信号，正在取消上传");
            cancel.cancel();
        }
    })
}

fn log_status_change(status: DocumentStatus, document: &Document) {
    match document.failure_reason() {
        Some(reason) => info!("[文档 {}] 状态: {} ({})", document.id, status, reason),
        None => info!("[文档 {}] 状态: {}", document.id, status),
    }
}

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 文档上传与分析客户端");
    info!("🌐 后端地址: {}", config.api_base_url);
    info!("⏱️ 轮询间隔: {:?}", config.poll_interval());
    if config.access_token.is_none() {
        warn!("⚠️ 未配置访问凭证 (DOCINGEST_ACCESS_TOKEN)，后端请求将被拒绝");
    }
    info!("{}", "=".repeat(60));
}
