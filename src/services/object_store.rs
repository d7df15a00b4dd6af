//! 对象存储写入能力

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::StorageError;

/// 传输进度回调，参数为 0-100 的百分比，单调不减
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// 外部对象存储
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 向预签名地址执行一次完整的 PUT 写入
    ///
    /// `cancel` 被触发时立即以 [`StorageError::Aborted`] 结束。
    async fn put_object(
        &self,
        url: &str,
        body: Bytes,
        content_type: &str,
        on_progress: ProgressFn,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError>;
}
