//! Assignment planning.
//!
//! Converts a weighted evolution mix plus a fixed supply of sampled
//! node contexts into an ordered list of task assignments, then splits
//! the list into execution-unit batches. Planning is pure apart from
//! the injected RNG, so every property here is testable without
//! running a single task.

use rand::distributions::{Distribution as _, WeightedIndex};
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

use crate::docstore::NodeContext;
use crate::error::GenerationError;
use crate::evolutions::{Distribution, Evolution};

/// Weight-sum tolerance accepted by [`validate_distribution`].
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-3;

/// One planned unit of work: a strategy applied to an exclusively
/// owned node context.
pub struct TaskAssignment {
    pub evolution: Arc<dyn Evolution>,
    pub context: NodeContext,
    /// Unique, human-meaningful identifier: `"{name}-{sequence}"`.
    pub task_id: String,
}

/// Reject the mix before any node is sampled or any strategy is
/// configured. A configuration error must never spend generation
/// budget.
pub fn validate_distribution(distribution: &Distribution) -> Result<(), GenerationError> {
    let sum: f64 = distribution.iter().map(|(_, weight)| weight).sum();
    if (sum - 1.0).abs() >= DISTRIBUTION_TOLERANCE {
        return Err(GenerationError::InvalidDistribution { sum });
    }
    Ok(())
}

/// Plan exactly one assignment per sampled context.
///
/// Per-strategy counts are `round(weight * n)` in the caller's mix
/// order, consuming contexts by a strictly increasing cursor. Rounding
/// overshoot is capped at `n`; rounding shortfall is backfilled by
/// weighted draws with replacement over the full mix (zero-weight
/// strategies stay in the draw set, they just never win). Every context
/// is consumed at most once and never reused.
pub fn plan_assignments<R: Rng>(
    distribution: &Distribution,
    contexts: Vec<NodeContext>,
    rng: &mut R,
) -> Vec<TaskAssignment> {
    let n = contexts.len();
    let mut picks: Vec<Arc<dyn Evolution>> = Vec::with_capacity(n);

    for (evolution, weight) in distribution.iter() {
        let count = (weight * n as f64).round() as usize;
        for _ in 0..count {
            if picks.len() == n {
                break;
            }
            picks.push(Arc::clone(evolution));
        }
    }

    if picks.len() < n {
        let shortfall = n - picks.len();
        debug!(shortfall, "backfilling rounding shortfall by weighted draw");
        let entries: Vec<_> = distribution.iter().collect();
        if let Ok(index) = WeightedIndex::new(entries.iter().map(|(_, weight)| *weight)) {
            for _ in 0..shortfall {
                let (evolution, _) = entries[index.sample(rng)];
                picks.push(Arc::clone(evolution));
            }
        }
    }

    picks
        .into_iter()
        .zip(contexts)
        .enumerate()
        .map(|(sequence, (evolution, context))| {
            let task_id = format!("{}-{}", evolution.name(), sequence);
            TaskAssignment {
                evolution,
                context,
                task_id,
            }
        })
        .collect()
}

/// Split assignments into consecutive batches of at most `unit_size`
/// tasks. Pure: computed in full before any execution begins.
pub fn partition_batches(
    assignments: Vec<TaskAssignment>,
    unit_size: usize,
) -> Vec<Vec<TaskAssignment>> {
    let unit_size = unit_size.max(1);
    let mut batches = Vec::with_capacity(assignments.len().div_ceil(unit_size));
    let mut batch = Vec::with_capacity(unit_size);
    for assignment in assignments {
        batch.push(assignment);
        if batch.len() == unit_size {
            batches.push(std::mem::take(&mut batch));
        }
    }
    if !batch.is_empty() {
        batches.push(batch);
    }
    batches
}
