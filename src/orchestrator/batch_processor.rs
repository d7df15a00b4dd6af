//! 批量分析处理器 - 编排层
//!
//! ## 职责
//!
//! 对一组文档中所有 pending 的文档逐个触发分析，汇总成功/失败。
//!
//! ## 设计特点
//!
//! - **严格串行**：上一次触发返回后才发起下一次，任意时刻最多一个请求在途
//! - **失败隔离**：单个文档失败只记录，不终止批次
//! - **只触发不等待**：不轮询分析结果，终态由状态轮询器负责
//! - **非 pending 静默排除**：不计入 total，也不算失败

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::AppResult;
use crate::models::{Document, StudentId};
use crate::services::DocumentApi;
use crate::utils::logging::{log_batch_start, print_batch_stats};

/// 批次进行中的计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchProgress {
    pub attempted: usize,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

impl BatchProgress {
    /// 已成功触发的比例，向下取整
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        (self.completed * 100 / self.total) as u8
    }
}

/// 批次最终结果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchReport {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// 每个失败文档一条 "标题: 原因"，按处理顺序排列
    pub errors: Vec<String>,
}

/// 批量分析的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// 没有 pending 文档，未发起任何请求
    NothingToDo,
    Ran(BatchReport),
}

impl BatchOutcome {
    pub fn report(&self) -> Option<&BatchReport> {
        match self {
            BatchOutcome::NothingToDo => None,
            BatchOutcome::Ran(report) => Some(report),
        }
    }
}

/// 批量分析处理器
#[derive(Clone)]
pub struct BulkAnalyzer {
    api: Arc<dyn DocumentApi>,
}

impl BulkAnalyzer {
    pub fn new(api: Arc<dyn DocumentApi>) -> Self {
        Self { api }
    }

    /// 对 `documents` 中的 pending 文档逐个触发分析
    ///
    /// 每处理完一个文档调用一次 `on_progress`。
    pub async fn run(
        &self,
        documents: &[Document],
        mut on_progress: impl FnMut(&BatchProgress),
    ) -> BatchOutcome {
        let eligible: Vec<&Document> = documents
            .iter()
            .filter(|d| d.is_eligible_for_bulk())
            .collect();

        if eligible.is_empty() {
            warn!("⚠️ 没有 pending 状态的文档，跳过批量分析");
            return BatchOutcome::NothingToDo;
        }

        let total = eligible.len();
        log_batch_start(total, documents.len() - total);

        let mut progress = BatchProgress {
            total,
            ..Default::default()
        };
        let mut errors = Vec::new();

        for (idx, document) in eligible.into_iter().enumerate() {
            match self.api.trigger_analysis(&document.id).await {
                Ok(()) => {
                    info!("[{}/{}] ✓ 已触发分析: {}", idx + 1, total, document.title);
                    progress.completed += 1;
                }
                Err(e) => {
                    error!("[{}/{}] ❌ 触发分析失败: {} - {}", idx + 1, total, document.title, e);
                    progress.failed += 1;
                    errors.push(format!("{}: {}", document.title, e));
                }
            }
            progress.attempted += 1;
            on_progress(&progress);
        }

        print_batch_stats(progress.completed, progress.failed, total);

        BatchOutcome::Ran(BatchReport {
            total,
            completed: progress.completed,
            failed: progress.failed,
            errors,
        })
    }

    /// 拉取学生的全部文档后对其中 pending 的批量触发
    ///
    /// 只有列表请求本身失败时才返回错误。
    pub async fn run_for_student(
        &self,
        student_id: StudentId,
        on_progress: impl FnMut(&BatchProgress),
    ) -> AppResult<BatchOutcome> {
        let documents = self.api.list_student_documents(student_id).await?;
        info!("📁 学生 #{} 共有 {} 个文档", student_id, documents.len());
        Ok(self.run(&documents, on_progress).await)
    }
}
