//! Background task management.
//!
//! Registers, supervises and shuts down the long-running actors around the
//! engine: kitchen display pollers, status board refreshers, listener
//! bridges. Every task is wrapped to catch panics so one crashing poller
//! never takes the process down silently.

use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Long-lived background worker.
    Worker,
    /// Event listener bridge.
    Listener,
    /// Fixed-interval poller (display refresh and the like).
    Periodic,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Worker => write!(f, "Worker"),
            TaskKind::Listener => write!(f, "Listener"),
            TaskKind::Periodic => write!(f, "Periodic"),
        }
    }
}

struct RegisteredTask {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// Cancellation handle for one periodic poller. Cancelling it stops that
/// poller alone; registry shutdown still stops everything.
#[derive(Clone)]
pub struct PollHandle {
    token: CancellationToken,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Owns every spawned background task and the shared cancellation token.
///
/// ```ignore
/// let mut tasks = BackgroundTasks::new();
/// tasks.spawn_periodic("kitchen_display", Duration::from_secs(1), move || {
///     let service = service.clone();
///     async move {
///         if let Ok(orders) = service.get_by_status(OrderStatus::Confirmed).await {
///             render(orders);
///         }
///     }
/// });
/// // later
/// tasks.shutdown().await;
/// ```
pub struct BackgroundTasks {
    tasks: Vec<RegisteredTask>,
    shutdown: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token tasks can watch to stop on shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Register and start a background task.
    ///
    /// The future is wrapped to catch panics; an unexpected exit is logged
    /// instead of vanishing.
    pub fn spawn<F>(&mut self, name: &'static str, kind: TaskKind, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let wrapped = async move {
            let result: Result<(), Box<dyn std::any::Any + Send>> =
                AssertUnwindSafe(future).catch_unwind().await;
            match result {
                Ok(()) => {
                    if kind != TaskKind::Periodic {
                        tracing::warn!(task = %name, kind = %kind, "Background task completed unexpectedly");
                    }
                }
                Err(panic_info) => {
                    let panic_msg: String = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        (*s).to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    tracing::error!(
                        task = %name,
                        kind = %kind,
                        panic = %panic_msg,
                        "Background task panicked"
                    );
                }
            }
        };

        let handle = tokio::spawn(wrapped);
        tracing::debug!(task = %name, kind = %kind, "Registered background task");
        self.tasks.push(RegisteredTask { name, kind, handle });
    }

    /// Register a fixed-interval poller. `tick` is called once per interval
    /// until the returned handle is cancelled or the registry shuts down; a
    /// slow tick delays the next one rather than stacking.
    ///
    /// This is the shape every polling display surface uses: each tick
    /// re-queries storage instead of trusting a cached snapshot, and closing
    /// one display cancels only its own poller.
    pub fn spawn_periodic<F, Fut>(
        &mut self,
        name: &'static str,
        interval: Duration,
        mut tick: F,
    ) -> PollHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let token = self.shutdown.child_token();
        let handle = PollHandle {
            token: token.clone(),
        };
        self.spawn(name, TaskKind::Periodic, async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = timer.tick() => tick().await,
                }
            }
            tracing::debug!(task = %name, "Periodic task stopped");
        });
        handle
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Count tasks whose handles have already finished. A finished handle
    /// means a poller died; the caller decides whether to restart or abort.
    pub fn check_health(&self) -> usize {
        let mut failed = 0;
        for task in &self.tasks {
            if task.handle.is_finished() {
                tracing::error!(
                    task = %task.name,
                    kind = %task.kind,
                    "Background task unexpectedly finished"
                );
                failed += 1;
            }
        }
        failed
    }

    /// Cancel every task and wait for each to wind down.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down {} background tasks", self.tasks.len());
        self.shutdown.cancel();

        for task in self.tasks {
            match task.handle.await {
                Ok(()) => tracing::debug!(task = %task.name, "Task completed"),
                Err(e) if e.is_cancelled() => tracing::debug!(task = %task.name, "Task cancelled"),
                Err(e) => tracing::error!(task = %task.name, error = ?e, "Task panicked"),
            }
        }
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}
