//! 上传进度
//!
//! 进度是一串离散、单调不减的百分比，每次调用上传流程都从 0 重新开始。

use std::sync::{Arc, Mutex};

use crate::services::ProgressFn;

/// 上传流程各阶段的固定检查点
pub mod checkpoint {
    pub const VALIDATED: u8 = 10;
    pub const PRESIGNED: u8 = 20;
    pub const TRANSFERRED: u8 = 80;
    pub const REGISTERING: u8 = 90;
    pub const DONE: u8 = 100;
}

/// 进度跟踪器
///
/// 只把严格增大的值转发给观察者，回退或重复的值被丢弃。
#[derive(Clone)]
pub struct ProgressTracker {
    current: Arc<Mutex<u8>>,
    observer: ProgressFn,
}

impl ProgressTracker {
    pub fn new(observer: ProgressFn) -> Self {
        Self {
            current: Arc::new(Mutex::new(0)),
            observer,
        }
    }

    pub fn current(&self) -> u8 {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if percent > *current {
            *current = percent;
            (self.observer)(percent);
        }
    }

    /// 把子任务的 0-100 映射到 `[from, to]` 区间
    pub fn scaled(&self, from: u8, to: u8) -> ProgressFn {
        let tracker = self.clone();
        let span = to.saturating_sub(from) as u16;
        Arc::new(move |inner: u8| {
            let inner = inner.min(100) as u16;
            tracker.report(from + (inner * span / 100) as u8);
        })
    }
}
