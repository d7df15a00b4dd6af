/// 后端 API 客户端
///
/// 封装所有与元数据/存储服务相关的 HTTP 调用。除对象存储写入外，
/// 所有请求都携带 bearer 凭证；本客户端不做任何重试。
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult, ConfigError};
use crate::models::{
    DeleteReceipt, Document, DocumentId, DownloadUrlRequest, ErrorBody, NewDocument,
    PresignedDownload, PresignedUpload, StudentId, UploadUrlRequest,
};
use crate::services::DocumentApi;

/// 后端 API 客户端
#[derive(Clone, Debug)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl BackendClient {
    /// 根据配置创建客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(ConfigError::HttpClient)?;

        let base_url = Url::parse(config.api_base_url.trim()).map_err(|e| {
            ConfigError::InvalidBaseUrl {
                url: config.api_base_url.clone(),
                reason: e.to_string(),
            }
        })?;
        if base_url.cannot_be_a_base() {
            return Err(invalid_base(&base_url).into());
        }

        Ok(Self {
            client,
            base_url,
            token: config.access_token.clone(),
        })
    }

    /// 在根路径后拼接路径段，每段单独百分号编码
    fn url(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| invalid_base(&self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// 附加 bearer 凭证；没有凭证时直接报未授权，不发请求
    fn authorized(&self, endpoint: &str, request: RequestBuilder) -> AppResult<RequestBuilder> {
        match self.token.as_deref() {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(ApiError::Unauthorized {
                endpoint: endpoint.to_string(),
                message: "no access token configured".to_string(),
            }
            .into()),
        }
    }

    /// 发送请求并把非 2xx 响应转换为错误
    async fn send(&self, endpoint: &str, request: RequestBuilder) -> AppResult<Response> {
        let request = self.authorized(endpoint, request)?;
        let response = request
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(endpoint, e))?;

        let status = response.status();
        debug!("{} -> {}", endpoint, status);
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.detail_text());

        Err(rejection(endpoint, status, detail).into())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> AppResult<T> {
        let response = self.send(endpoint, request).await?;
        response.json::<T>().await.map_err(|source| {
            ApiError::Decode {
                endpoint: endpoint.to_string(),
                source,
            }
            .into()
        })
    }
}

fn invalid_base(url: &Url) -> ConfigError {
    ConfigError::InvalidBaseUrl {
        url: url.to_string(),
        reason: "URL cannot be used as a base".to_string(),
    }
}

fn rejection(endpoint: &str, status: StatusCode, detail: Option<String>) -> ApiError {
    let reason = status.canonical_reason().unwrap_or("unknown status");
    if status == StatusCode::UNAUTHORIZED {
        return ApiError::Unauthorized {
            endpoint: endpoint.to_string(),
            message: detail.unwrap_or_else(|| reason.to_string()),
        };
    }

    ApiError::Rejected {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        message: detail.unwrap_or_else(|| format!("request failed: {}", reason)),
    }
}

#[async_trait]
impl DocumentApi for BackendClient {
    async fn request_upload_url(&self, request: &UploadUrlRequest) -> AppResult<PresignedUpload> {
        let endpoint = "/upload-url";
        debug!("申请上传地址: {} ({})", request.filename, request.content_type);
        let url = self.url(&["upload-url"])?;
        self.send_json(endpoint, self.client.post(url).json(request))
            .await
    }

    async fn register_document(&self, document: &NewDocument) -> AppResult<Document> {
        let endpoint = "/documents";
        debug!("注册文档: {} -> {}", document.title, document.storage_key);
        let url = self.url(&["documents"])?;
        self.send_json(endpoint, self.client.post(url).json(document))
            .await
    }

    async fn trigger_analysis(&self, id: &DocumentId) -> AppResult<()> {
        let endpoint = format!("/documents/{}/analyze", id);
        let url = self.url(&["documents", id.as_str(), "analyze"])?;
        self.send(&endpoint, self.client.post(url)).await?;
        Ok(())
    }

    async fn get_document(&self, id: &DocumentId) -> AppResult<Document> {
        let endpoint = format!("/documents/{}", id);
        let url = self.url(&["documents", id.as_str()])?;
        self.send_json(&endpoint, self.client.get(url)).await
    }

    async fn list_student_documents(&self, student_id: StudentId) -> AppResult<Vec<Document>> {
        let endpoint = format!("/documents/students/{}/documents", student_id);
        let student = student_id.to_string();
        let url = self.url(&["documents", "students", &student, "documents"])?;
        self.send_json(&endpoint, self.client.get(url)).await
    }

    async fn delete_document(&self, id: &DocumentId) -> AppResult<DeleteReceipt> {
        let endpoint = format!("/documents/{}", id);
        let url = self.url(&["documents", id.as_str()])?;
        self.send_json(&endpoint, self.client.delete(url)).await
    }

    async fn request_download_url(&self, storage_key: &str) -> AppResult<PresignedDownload> {
        let endpoint = "/download-url";
        let body = DownloadUrlRequest { storage_key };
        let url = self.url(&["download-url"])?;
        self.send_json(endpoint, self.client.post(url).json(&body))
            .await
    }
}
