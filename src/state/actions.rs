// Workflow run selection and ordering.
// Narrows runs to configured workflows and builds per-workflow summaries.

use std::cmp::Reverse;
use std::collections::HashMap;

use crate::github::WorkflowRun;
use crate::registry::Repository;

/// Most recent runs kept per repository.
pub const MAX_RUNS: usize = 50;

/// Runs of the repository's configured workflows, newest first.
///
/// Takes at most [`MAX_RUNS`] of the (newest-first) input, then orders with
/// [`order_runs`].
pub fn select_configured_runs(runs: Vec<WorkflowRun>, repository: &Repository) -> Vec<WorkflowRun> {
    let mut selected: Vec<WorkflowRun> = runs
        .into_iter()
        .filter(|run| {
            run.name
                .as_deref()
                .is_some_and(|name| repository.tracks_workflow(name))
        })
        .take(MAX_RUNS)
        .collect();

    order_runs(&mut selected);
    selected
}

/// Newest hour first; within the same hour by workflow name, then newest first.
pub fn order_runs(runs: &mut [WorkflowRun]) {
    runs.sort_by_key(|run| {
        (
            Reverse(run.created_at.timestamp().div_euclid(3600)),
            run.workflow_name().to_lowercase(),
            Reverse(run.created_at),
        )
    });
}

/// The most recent run of each workflow, ordered by workflow name.
pub fn latest_per_workflow(runs: &[WorkflowRun]) -> Vec<WorkflowRun> {
    let mut latest: HashMap<&str, &WorkflowRun> = HashMap::new();

    for run in runs {
        latest
            .entry(run.workflow_name())
            .and_modify(|current| {
                if run.created_at > current.created_at {
                    *current = run;
                }
            })
            .or_insert(run);
    }

    let mut latest: Vec<WorkflowRun> = latest.into_values().cloned().collect();
    latest.sort_by(|a, b| a.workflow_name().cmp(b.workflow_name()));
    latest
}

/// All runs ordered by workflow name, newest first within each workflow.
pub fn group_by_workflow(runs: &[WorkflowRun]) -> Vec<WorkflowRun> {
    let mut grouped = runs.to_vec();
    grouped.sort_by(|a, b| {
        a.workflow_name()
            .cmp(b.workflow_name())
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    grouped
}
