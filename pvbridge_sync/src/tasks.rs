//! User loop tasks.
//!
//! Tasks run once per cycle after the output phase, in registration order.
//! An `Err` or a panic from one task is logged and counted; the remaining
//! tasks still run.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::warn;

use crate::error::EngineError;

pub type TaskError = Box<dyn std::error::Error + Send + Sync>;
pub type TaskResult = Result<(), TaskError>;

struct LoopTask {
    name: String,
    func: Box<dyn FnMut() -> TaskResult + Send>,
}

#[derive(Default)]
pub struct TaskList {
    tasks: Vec<LoopTask>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F>(&mut self, name: impl Into<String>, func: F) -> Result<(), EngineError>
    where
        F: FnMut() -> TaskResult + Send + 'static,
    {
        let name = name.into();
        if self.contains(&name) {
            return Err(EngineError::DuplicateTask(name));
        }
        self.tasks.push(LoopTask {
            name,
            func: Box::new(func),
        });
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.name != name);
        self.tasks.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.iter().any(|t| t.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.name.clone()).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Run every task once. Returns the number that failed.
    pub fn run_all(&mut self) -> u64 {
        let mut failures = 0;
        for task in &mut self.tasks {
            match catch_unwind(AssertUnwindSafe(|| (task.func)())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(task = %task.name, "Loop task failed: {e}");
                }
                Err(payload) => {
                    failures += 1;
                    warn!(
                        task = %task.name,
                        "Loop task panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        failures
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
