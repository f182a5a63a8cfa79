//! Parallel program evaluation
//!
//! Uses Rayon for work-stealing parallelism with configurable limits.

use crate::error::{Error, Result};
use crate::program::{AgentState, Program, ProgramResult};
use rayon::prelude::*;

/// Configuration for parallel evaluation
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Maximum number of worker threads (default: num_cpus)
    pub max_parallelism: usize,
    /// Batches smaller than this run on the calling thread (default: 64)
    pub sequential_threshold: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_parallelism: num_cpus::get(),
            sequential_threshold: 64,
        }
    }
}

/// Evaluates one program against many agents
///
/// Each evaluation runs with its own condition stack; the program is only read.
/// Results are in the same order as `states`.
///
/// # Example
/// ```
/// use routing_restrict::parallel::{evaluate_batch, ParallelConfig};
/// use routing_restrict::{
///     EditOp, EvaluationContext, Instruction, Restrictions, RoutingPoint, TileIndex, Track,
/// };
///
/// let point = RoutingPoint::new(TileIndex(7), Track::X);
/// let mut restrictions = Restrictions::default();
/// restrictions
///     .apply(point, EditOp::Insert { offset: 0, item: Instruction::penalty(25) })
///     .unwrap();
///
/// let agents = vec![EvaluationContext::with_length_tiles(3); 4];
/// let program = restrictions.program(point).unwrap();
/// let results = evaluate_batch(program, &agents, &ParallelConfig::default()).unwrap();
/// assert!(results.iter().all(|r| r.penalty == 25));
/// ```
pub fn evaluate_batch<S>(
    program: &Program,
    states: &[S],
    config: &ParallelConfig,
) -> Result<Vec<ProgramResult>>
where
    S: AgentState + Sync,
{
    // Small batches - no parallelism needed
    if states.len() < config.sequential_threshold.max(2) {
        return Ok(states.iter().map(|state| program.execute(state)).collect());
    }

    // Configure Rayon thread pool
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.max_parallelism.clamp(1, states.len()))
        .build()
        .map_err(|e| Error::RuntimeError(format!("Failed to create thread pool: {}", e)))?;

    Ok(pool.install(|| {
        states
            .par_iter()
            .map(|state| program.execute(state))
            .collect()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::apply_edit;
    use crate::edit::EditOp;
    use crate::program::{CondOp, EvaluationContext, Instruction, ItemType};

    fn long_train_penalty() -> Program {
        let mut program = Program::default();
        let edited = apply_edit(
            &[],
            EditOp::Insert {
                offset: 0,
                item: Instruction::if_cond(ItemType::CondTrainLength, CondOp::MoreThan, 5),
            },
        )
        .and_then(|e| {
            apply_edit(
                &e.items,
                EditOp::Insert {
                    offset: 1,
                    item: Instruction::penalty(10),
                },
            )
        })
        .unwrap();
        program.commit(edited.items, edited.actions_used);
        program
    }

    #[test]
    fn test_evaluate_batch_matches_sequential() {
        let program = long_train_penalty();
        let states: Vec<EvaluationContext> = (0..500)
            .map(|n| EvaluationContext::with_length_tiles(n % 10))
            .collect();

        let results = evaluate_batch(&program, &states, &ParallelConfig::default()).unwrap();

        assert_eq!(results.len(), states.len());
        for (state, result) in states.iter().zip(&results) {
            assert_eq!(*result, program.execute(state));
        }
        assert_eq!(results[8].penalty, 10);
        assert_eq!(results[3].penalty, 0);
    }

    #[test]
    fn test_evaluate_batch_empty() {
        let program = long_train_penalty();
        let states: Vec<EvaluationContext> = Vec::new();
        let results = evaluate_batch(&program, &states, &ParallelConfig::default()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_evaluate_batch_single_thread() {
        let program = long_train_penalty();
        let states = vec![EvaluationContext::with_length_tiles(9); 100];
        let config = ParallelConfig {
            max_parallelism: 1,
            sequential_threshold: 0,
        };
        let results = evaluate_batch(&program, &states, &config).unwrap();
        assert!(results.iter().all(|r| r.penalty == 10));
    }
}
