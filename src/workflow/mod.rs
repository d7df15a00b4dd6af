//! 流程层（Workflow Layer）
//!
//! 定义"一个文件"和"一次分析请求"的完整处理流程。
//!
//! - `upload_flow`: 校验 → 预签名 → 传输 → 注册
//! - `analysis_flow`: 触发单个文档的分析
//! - `progress`: 上传进度的单调上报

pub mod analysis_flow;
pub mod progress;
pub mod upload_ctx;
pub mod upload_flow;

pub use analysis_flow::AnalysisFlow;
pub use progress::ProgressTracker;
pub use upload_ctx::{UploadRequest, UploadSession};
pub use upload_flow::UploadFlow;
