//! 状态轮询器 - 编排层
//!
//! 分析在后端异步执行，本模块通过轮询把调用方看到的状态与后端对齐：
//!
//! - 启动后立即拉取一次，之后按固定间隔拉取，直到 completed / failed
//! - 同一文档的轮询严格串行，上一次返回后才安排下一次
//! - 只有状态变化时才通知观察者
//! - 网络故障和 5xx 在下一次继续轮询；401 和其他 4xx 直接结束
//! - 取消是幂等的；`cancel()` 返回后观察者不会再收到任何回调，
//!   即使取消时有一次轮询正在进行

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Document, DocumentId, DocumentStatus};
use crate::services::DocumentApi;

/// 状态变化观察者
pub trait StatusObserver: Send + Sync + 'static {
    fn on_status_change(&self, status: DocumentStatus, document: &Document);
}

impl<F> StatusObserver for F
where
    F: Fn(DocumentStatus, &Document) + Send + Sync + 'static,
{
    fn on_status_change(&self, status: DocumentStatus, document: &Document) {
        self(status, document)
    }
}

/// 轮询结束原因
#[derive(Debug)]
pub enum ReconcileEnd {
    /// 到达终态（completed / failed）
    Terminal(Document),
    /// 被取消
    Cancelled,
    /// 文档已不存在（后端返回 404）
    Gone,
    /// 查询遇到不可重试的错误（凭证失效、无权限等）
    Failed(AppError),
    /// 创建时即为禁用状态，从未轮询
    Disabled,
}

thread_local! {
    // 当前线程正在执行回调的闸门地址，0 表示不在回调中
    static IN_CALLBACK: Cell<usize> = const { Cell::new(0) };
}

/// 观察者回调的闸门
///
/// 回调在 `callback` 锁内执行；关闭闸门时先置位再获取一次锁，
/// 保证关闭返回后不会有回调在执行或即将执行。
struct Gate {
    open: AtomicBool,
    callback: Mutex<()>,
    token: CancellationToken,
}

impl Gate {
    fn new() -> Self {
        Self {
            open: AtomicBool::new(true),
            callback: Mutex::new(()),
            token: CancellationToken::new(),
        }
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.token.cancel();
        // 在自己的回调内部取消时不能再等锁
        if IN_CALLBACK.with(Cell::get) != self.addr() {
            drop(self.callback.lock().unwrap_or_else(|e| e.into_inner()));
        }
    }

    fn addr(&self) -> usize {
        self as *const Gate as usize
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// 闸门仍打开时执行回调，返回是否执行
    fn deliver(&self, f: impl FnOnce()) -> bool {
        let _guard = self.callback.lock().unwrap_or_else(|e| e.into_inner());
        if !self.is_open() {
            return false;
        }
        let _mark = CallbackMark(IN_CALLBACK.with(|c| c.replace(self.addr())));
        f();
        true
    }
}

/// 回调结束（包括 panic）时恢复线程标记
struct CallbackMark(usize);

impl Drop for CallbackMark {
    fn drop(&mut self) {
        IN_CALLBACK.with(|c| c.set(self.0));
    }
}

/// 可克隆的取消句柄，交给任意持有者使用
#[derive(Clone)]
pub struct ReconcileCanceller {
    gate: Arc<Gate>,
}

impl ReconcileCanceller {
    pub fn cancel(&self) {
        self.gate.close();
    }
}

/// 单个文档的轮询句柄
///
/// 句柄被丢弃时同样会停止轮询。
pub struct ReconcileHandle {
    id: DocumentId,
    gate: Arc<Gate>,
    task: Option<JoinHandle<ReconcileEnd>>,
}

impl ReconcileHandle {
    /// 停止轮询（幂等）
    pub fn cancel(&self) {
        if self.gate.is_open() {
            debug!("[文档 {}] 停止状态轮询", self.id);
        }
        self.gate.close();
    }

    pub fn canceller(&self) -> ReconcileCanceller {
        ReconcileCanceller {
            gate: self.gate.clone(),
        }
    }

    /// 轮询仍在进行
    pub fn is_active(&self) -> bool {
        self.gate.is_open() && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// 等待轮询结束
    pub async fn finished(mut self) -> ReconcileEnd {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(ReconcileEnd::Cancelled),
            None => ReconcileEnd::Disabled,
        }
    }
}

impl Drop for ReconcileHandle {
    fn drop(&mut self) {
        self.gate.close();
    }
}

/// 状态轮询器
///
/// 每个被观察的文档拥有独立的轮询任务，互不阻塞。
#[derive(Clone)]
pub struct StatusReconciler {
    api: Arc<dyn DocumentApi>,
    interval: Duration,
}

impl StatusReconciler {
    pub fn new(api: Arc<dyn DocumentApi>, config: &Config) -> Self {
        Self::with_interval(api, config.poll_interval())
    }

    pub fn with_interval(api: Arc<dyn DocumentApi>, interval: Duration) -> Self {
        Self { api, interval }
    }

    /// 开始观察一个文档
    ///
    /// # 参数
    /// - `id`: 文档 ID
    /// - `enabled`: 为 false 时不发起任何请求
    /// - `observer`: 状态变化时回调，参数为新状态和完整文档
    pub fn watch(
        &self,
        id: DocumentId,
        enabled: bool,
        observer: impl StatusObserver,
    ) -> ReconcileHandle {
        let gate = Arc::new(Gate::new());
        if !enabled {
            gate.close();
            return ReconcileHandle {
                id,
                gate,
                task: None,
            };
        }

        let task = tokio::spawn(poll_loop(
            self.api.clone(),
            id.clone(),
            self.interval,
            gate.clone(),
            observer,
        ));

        ReconcileHandle {
            id,
            gate,
            task: Some(task),
        }
    }

    /// 观察直到结束
    pub async fn wait_for_terminal(
        &self,
        id: DocumentId,
        observer: impl StatusObserver,
    ) -> ReconcileEnd {
        self.watch(id, true, observer).finished().await
    }
}

async fn poll_loop(
    api: Arc<dyn DocumentApi>,
    id: DocumentId,
    interval: Duration,
    gate: Arc<Gate>,
    observer: impl StatusObserver,
) -> ReconcileEnd {
    let mut last_seen: Option<DocumentStatus> = None;

    loop {
        let fetched = tokio::select! {
            biased;
            _ = gate.token.cancelled() => return ReconcileEnd::Cancelled,
            result = api.get_document(&id) => result,
        };

        match fetched {
            Ok(document) => {
                let status = document.status;
                if last_seen != Some(status) {
                    debug!("[文档 {}] 状态: {:?} -> {}", id, last_seen, status);
                    if !gate.deliver(|| observer.on_status_change(status, &document)) {
                        return ReconcileEnd::Cancelled;
                    }
                    last_seen = Some(status);
                }

                if status.is_terminal() {
                    info!("[文档 {}] ✓ 到达终态: {}", id, status);
                    return ReconcileEnd::Terminal(document);
                }
            }
            Err(e) if e.is_not_found() => {
                warn!("[文档 {}] ⚠️ 文档已不存在，停止轮询", id);
                return ReconcileEnd::Gone;
            }
            Err(e) if e.is_transient() => {
                warn!("[文档 {}] ⚠️ 状态查询失败，下次继续: {}", id, e);
            }
            Err(e) => {
                error!("[文档 {}] ❌ 状态查询失败，停止轮询: {}", id, e);
                return ReconcileEnd::Failed(e);
            }
        }

        tokio::select! {
            biased;
            _ = gate.token.cancelled() => return ReconcileEnd::Cancelled,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
