//! Execution contexts
//!
//! The view never creates its own threads or runtimes. The owner injects:
//!
//! - a [`WorkerContext`]: a tokio runtime handle for control streams, the
//!   pipeline task and projection workers
//! - a [`ConsumptionContext`]: a serial job queue that is the only place the
//!   bound container is mutated. The owner drives it with [`ConsumptionLoop::run`]
//!   on whatever task or thread serves the display.

use crate::error::{Result, ViewError};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Background context for control streams and pipeline work
#[derive(Debug, Clone)]
pub struct WorkerContext {
    name: Arc<str>,
    handle: Handle,
}

impl WorkerContext {
    pub fn new(name: &str, handle: Handle) -> Self {
        Self {
            name: name.into(),
            handle,
        }
    }

    /// Bind to the runtime the caller is running on
    pub fn try_current(name: &str) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| ViewError::ContextClosed(format!("{}: {}", name, e)))?;
        Ok(Self::new(name, handle))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Serial context for everything that touches the bound container
#[derive(Clone)]
pub struct ConsumptionContext {
    name: Arc<str>,
    jobs: mpsc::UnboundedSender<Job>,
}

/// Receiving end of a [`ConsumptionContext`]; runs jobs one at a time in order
pub struct ConsumptionLoop {
    name: Arc<str>,
    jobs: mpsc::UnboundedReceiver<Job>,
}

impl ConsumptionContext {
    pub fn new(name: &str) -> (Self, ConsumptionLoop) {
        let name: Arc<str> = name.into();
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                name: name.clone(),
                jobs: tx,
            },
            ConsumptionLoop { name, jobs: rx },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a job without waiting for it
    pub fn post(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        self.jobs
            .send(Box::new(job))
            .map_err(|_| ViewError::ContextClosed(self.name.to_string()))
    }

    /// Queue a job and wait for its result
    pub async fn invoke<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.post(move || {
            let _ = tx.send(f());
        })?;
        rx.await
            .map_err(|_| ViewError::ContextClosed(self.name.to_string()))
    }

    pub fn is_closed(&self) -> bool {
        self.jobs.is_closed()
    }
}

impl ConsumptionLoop {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run jobs until every [`ConsumptionContext`] handle has been dropped
    pub async fn run(mut self) {
        log::debug!("Consumption loop '{}' started", self.name);
        while let Some(job) = self.jobs.recv().await {
            job();
        }
        log::debug!("Consumption loop '{}' stopped", self.name);
    }

    /// Run whatever is queued right now and return how many jobs ran
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.jobs.try_recv() {
            job();
            ran += 1;
        }
        ran
    }
}
