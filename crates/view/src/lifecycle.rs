//! Teardown handle
//!
//! Collects every task and cleanup action a view owns so they can be
//! disposed as one unit. Disposal is atomic and idempotent: the first call
//! takes everything out under the lock, later calls find nothing.

use parking_lot::Mutex;
use tokio::task::JoinHandle;

type Action = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Resources {
    tasks: Vec<JoinHandle<()>>,
    actions: Vec<Action>,
}

pub struct Teardown {
    name: String,
    /// `None` once disposed
    resources: Mutex<Option<Resources>>,
}

impl Teardown {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: Mutex::new(Some(Resources::default())),
        }
    }

    /// Track a task. Aborted straight away if already disposed.
    pub fn add_task(&self, task: JoinHandle<()>) {
        let mut resources = self.resources.lock();
        match resources.as_mut() {
            Some(r) => r.tasks.push(task),
            None => task.abort(),
        }
    }

    /// Register a cleanup action. Runs straight away if already disposed.
    pub fn add_action(&self, action: impl FnOnce() + Send + 'static) {
        let mut resources = self.resources.lock();
        match resources.as_mut() {
            Some(r) => r.actions.push(Box::new(action)),
            None => {
                drop(resources);
                action();
            }
        }
    }

    /// Abort all tasks, then run cleanup actions in reverse registration order.
    ///
    /// Returns true only for the call that actually tore things down.
    pub fn dispose(&self) -> bool {
        let Some(resources) = self.resources.lock().take() else {
            return false;
        };

        let task_count = resources.tasks.len();
        for task in resources.tasks {
            task.abort();
        }
        for action in resources.actions.into_iter().rev() {
            action();
        }

        log::info!("Disposed '{}' ({} tasks)", self.name, task_count);
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.resources.lock().is_none()
    }

    pub fn task_count(&self) -> usize {
        self.resources.lock().as_ref().map_or(0, |r| r.tasks.len())
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let teardown = Teardown::new("test");
        let runs = Arc::new(AtomicUsize::new(0));
        {
            let runs = runs.clone();
            teardown.add_action(move || {
                runs.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(teardown.dispose());
        assert!(!teardown.dispose());
        assert!(teardown.is_disposed());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispose_aborts_tasks() {
        let teardown = Teardown::new("test");
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        let abort = task.abort_handle();
        teardown.add_task(task);
        assert_eq!(teardown.task_count(), 1);

        teardown.dispose();
        for _ in 0..10 {
            if abort.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(abort.is_finished());
    }

    #[tokio::test]
    async fn test_late_registration_runs_immediately() {
        let teardown = Teardown::new("test");
        teardown.dispose();

        let ran = Arc::new(AtomicUsize::new(0));
        let flag = ran.clone();
        teardown.add_action(move || {
            flag.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(teardown.task_count(), 0);
    }

    #[test]
    fn test_actions_run_in_reverse_order() {
        let teardown = Teardown::new("test");
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            teardown.add_action(move || order.lock().push(i));
        }
        drop(teardown);
        assert_eq!(*order.lock(), vec![2, 1, 0]);
    }
}
