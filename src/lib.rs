//! # Document Ingest
//!
//! 学生文档上传与分析的客户端流水线
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 持有 HTTP 连接，只暴露能力
//! - `BackendClient` - 元数据/存储服务，携带 bearer 凭证
//! - `StorageClient` - 直接向预签名地址写入字节
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `DocumentApi` / `ObjectStore` - 后端与对象存储的抽象
//! - `validator` - 上传前的类型/大小校验
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义单个文件/单个文档的完整流程
//! - `UploadFlow` - 校验 → 预签名 → 传输 → 注册
//! - `AnalysisFlow` - 触发分析
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/status_reconciler` - 轮询分析状态直到终态
//! - `orchestrator/batch_processor` - 串行批量触发 pending 文档
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

#[cfg(test)]
mod test_support;

// 重新导出常用类型
pub use app::App;
pub use clients::{BackendClient, StorageClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Document, DocumentId, DocumentStatus, FileType, StudentId};
pub use orchestrator::{BatchOutcome, BatchReport, BulkAnalyzer, ReconcileEnd, StatusReconciler};
pub use workflow::{AnalysisFlow, UploadFlow, UploadRequest};
