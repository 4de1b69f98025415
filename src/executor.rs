//! Bounded-concurrency execution units.
//!
//! One [`ExecutionUnit`] runs one pre-partitioned batch of task
//! assignments. Units run strictly one after another, which caps the
//! number of outstanding model calls at the unit size regardless of the
//! total task count. Within a unit, outcome slots are keyed by
//! registration index, so identifier-to-result correlation is exact no
//! matter the completion order.

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::dataset::DataRow;
use crate::error::{EvolutionError, GenerationError};
use crate::scheduler::TaskAssignment;

/// Bounded batch runner for one slice of task assignments.
///
/// Fail-fast contract: with `raise_exceptions` set, the first task
/// failure discards the whole unit's results, including rows already
/// completed by sibling tasks. Tolerant contract: failures become
/// dropped rows and never surface individually.
pub struct ExecutionUnit {
    desc: String,
    raise_exceptions: bool,
    is_async: bool,
    tasks: Vec<TaskAssignment>,
}

impl ExecutionUnit {
    pub fn new(desc: impl Into<String>, raise_exceptions: bool, is_async: bool) -> Self {
        Self {
            desc: desc.into(),
            raise_exceptions,
            is_async,
            tasks: Vec::new(),
        }
    }

    /// Register a task. Registration order defines the outcome order.
    pub fn submit(&mut self, assignment: TaskAssignment) {
        self.tasks.push(assignment);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run all registered tasks to completion and report per-task
    /// outcomes in registration order. `None` slots are rows that were
    /// filtered out or (in tolerant mode) failed.
    pub async fn run(self) -> Result<Vec<Option<DataRow>>, GenerationError> {
        debug!(unit = %self.desc, tasks = self.tasks.len(), "running execution unit");
        if self.is_async {
            self.run_concurrent().await
        } else {
            self.run_sequential().await
        }
    }

    async fn run_concurrent(self) -> Result<Vec<Option<DataRow>>, GenerationError> {
        let raise_exceptions = self.raise_exceptions;
        let task_count = self.tasks.len();
        let mut join_set: JoinSet<(usize, String, Result<Option<DataRow>, EvolutionError>)> =
            JoinSet::new();

        for (slot, assignment) in self.tasks.into_iter().enumerate() {
            let TaskAssignment {
                evolution,
                context,
                task_id,
            } = assignment;
            join_set.spawn(async move {
                let result = evolution.evolve(context).await;
                (slot, task_id, result)
            });
        }

        let mut outcomes: Vec<Option<DataRow>> = (0..task_count).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            let (slot, task_id, result) = match joined {
                Ok(settled) => settled,
                Err(join_error) => {
                    if raise_exceptions {
                        join_set.abort_all();
                        return Err(EvolutionError::Execution(join_error.to_string()).into());
                    }
                    warn!(error = %join_error, "generation task aborted, dropping row");
                    continue;
                }
            };
            match result {
                Ok(row) => {
                    if row.is_none() {
                        debug!(%task_id, "generation filtered out, no row");
                    }
                    outcomes[slot] = row;
                }
                Err(error) => {
                    if raise_exceptions {
                        join_set.abort_all();
                        return Err(error.into());
                    }
                    warn!(%task_id, error = %error, "generation task failed, dropping row");
                }
            }
        }
        Ok(outcomes)
    }

    async fn run_sequential(self) -> Result<Vec<Option<DataRow>>, GenerationError> {
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        for assignment in self.tasks {
            let TaskAssignment {
                evolution,
                context,
                task_id,
            } = assignment;
            match evolution.evolve(context).await {
                Ok(row) => outcomes.push(row),
                Err(error) => {
                    if self.raise_exceptions {
                        return Err(error.into());
                    }
                    warn!(%task_id, error = %error, "generation task failed, dropping row");
                    outcomes.push(None);
                }
            }
        }
        Ok(outcomes)
    }
}
