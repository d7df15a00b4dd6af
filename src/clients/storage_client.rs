/// 对象存储客户端
///
/// 直接向预签名地址 PUT 原始字节。整个文件作为一次连续传输发送，
/// 不做分片续传，也不携带后端的 bearer 凭证。
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{AppResult, ConfigError, StorageError};
use crate::services::{ObjectStore, ProgressFn};

/// 每次交给传输层的字节数
const CHUNK_SIZE: usize = 64 * 1024;

/// 对象存储客户端
#[derive(Clone, Debug)]
pub struct StorageClient {
    client: Client,
}

impl StorageClient {
    /// 使用传输层默认超时
    pub fn new() -> AppResult<Self> {
        let client = Client::builder().build().map_err(ConfigError::HttpClient)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ObjectStore for StorageClient {
    async fn put_object(
        &self,
        url: &str,
        body: Bytes,
        content_type: &str,
        on_progress: ProgressFn,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        if cancel.is_cancelled() {
            return Err(StorageError::Aborted);
        }

        let total = body.len();
        debug!("开始写入对象存储: {} 字节 ({})", total, content_type);
        on_progress(0);

        let request = self
            .client
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, total)
            .body(Body::wrap_stream(progress_stream(body, on_progress.clone())));

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("对象存储写入被取消");
                return Err(StorageError::Aborted);
            }
            result = request.send() => result.map_err(|source| StorageError::Transport { source })?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Rejected {
                status: status.as_u16(),
            });
        }

        on_progress(100);
        Ok(())
    }
}

/// 把文件切成块，每块被传输层取走时上报一次进度
fn progress_stream(
    body: Bytes,
    on_progress: ProgressFn,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static {
    let total = body.len();
    let chunks: Vec<Bytes> = (0..total)
        .step_by(CHUNK_SIZE)
        .map(|start| body.slice(start..(start + CHUNK_SIZE).min(total)))
        .collect();

    let mut sent = 0usize;
    futures::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len();
        on_progress(transfer_percent(sent, total));
        Ok(chunk)
    })
}

fn transfer_percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent as u128 * 100) / total as u128).min(100) as u8
}
