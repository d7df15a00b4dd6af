//! 分析触发 - 流程层
//!
//! 请求后端对一个已注册的文档启动分析。后端接受后文档进入 processing，
//! 是否可以触发由后端判定；前端的状态检查只用于给出更早的提示。

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::AppResult;
use crate::models::{Document, DocumentId};
use crate::services::DocumentApi;

pub struct AnalysisFlow {
    api: Arc<dyn DocumentApi>,
}

impl AnalysisFlow {
    pub fn new(api: Arc<dyn DocumentApi>) -> Self {
        Self { api }
    }

    /// 触发分析
    ///
    /// 被拒绝时（状态冲突、限流等）返回后端给出的原因。
    pub async fn trigger(&self, id: &DocumentId) -> AppResult<()> {
        match self.api.trigger_analysis(id).await {
            Ok(()) => {
                info!("[文档 {}] ✓ 分析已受理", id);
                Ok(())
            }
            Err(e) => {
                warn!("[文档 {}] ❌ 分析请求被拒绝: {}", id, e);
                Err(e)
            }
        }
    }

    /// 对已知文档触发分析
    ///
    /// 本地状态明显不允许时仍然发送请求，以后端为准，只记录提示。
    pub async fn trigger_document(&self, document: &Document) -> AppResult<()> {
        if !document.status.can_trigger_analysis() {
            warn!(
                "[文档 {}] 当前状态为 {}，后端可能拒绝分析请求",
                document.id, document.status
            );
        }
        self.trigger(&document.id).await
    }
}
