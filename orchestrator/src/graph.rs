//! Step graph validation and ordering

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{OrchestratorError, Result};
use crate::workflow::WorkflowStep;

/// Validate the step graph and compute its execution order (Kahn's algorithm).
///
/// Returns indices into `steps`. Rejects duplicate ids, dependencies on ids
/// outside the workflow, and cycles, in that order. The ready queue is
/// seeded and refilled in declaration order so the result is deterministic.
pub fn execution_order(steps: &[WorkflowStep]) -> Result<Vec<usize>> {
    let mut index_of: HashMap<&str, usize> = HashMap::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        if index_of.insert(step.id.as_str(), index).is_some() {
            return Err(OrchestratorError::DuplicateStepId(step.id.clone()));
        }
    }

    // Repeated ids in one depends_on list count once
    let dependencies: Vec<HashSet<&str>> = steps
        .iter()
        .map(|step| step.depends_on.iter().map(String::as_str).collect())
        .collect();

    for step in steps {
        if let Some(missing) = step.depends_on.iter().find(|d| !index_of.contains_key(d.as_str())) {
            return Err(OrchestratorError::UnknownDependency {
                step: step.id.clone(),
                dependency: missing.clone(),
            });
        }
    }

    let mut in_degree: Vec<usize> = dependencies.iter().map(HashSet::len).collect();
    let mut queue: VecDeque<usize> = (0..steps.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(steps.len());

    while let Some(current) = queue.pop_front() {
        order.push(current);
        let current_id = steps[current].id.as_str();

        for (index, deps) in dependencies.iter().enumerate() {
            if deps.contains(current_id) {
                in_degree[index] -= 1;
                if in_degree[index] == 0 {
                    queue.push_back(index);
                }
            }
        }
    }

    if order.len() != steps.len() {
        return Err(OrchestratorError::CircularDependency);
    }

    Ok(order)
}
