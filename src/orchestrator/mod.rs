//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 处理跨越多次请求或多个文档的调度，不关心单次请求的细节。
//!
//! ## 模块划分
//!
//! ### `status_reconciler` - 状态轮询器
//! - 每个文档一个独立的轮询任务
//! - 状态变化时通知观察者，到达终态后自动停止
//! - 支持禁用和幂等取消
//!
//! ### `batch_processor` - 批量分析处理器
//! - 过滤出 pending 文档
//! - 逐个串行触发分析，失败不中断
//! - 输出批次统计
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator (StatusReconciler / BulkAnalyzer)
//!     ↓
//! workflow (UploadFlow / AnalysisFlow)
//!     ↓
//! services (DocumentApi / ObjectStore / validator)
//!     ↓
//! clients (BackendClient / StorageClient)
//! ```

pub mod batch_processor;
pub mod status_reconciler;

pub use batch_processor::{BatchOutcome, BatchProgress, BatchReport, BulkAnalyzer};
pub use status_reconciler::{
    ReconcileCanceller, ReconcileEnd, ReconcileHandle, StatusObserver, StatusReconciler,
};
