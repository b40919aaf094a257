//! Workflow runner
//!
//! Walks the top-level step list in order: plain steps execute directly,
//! branch steps fan out onto concurrently-running branch tasks, merge steps
//! execute with the referenced branch step's collected outputs in their
//! payload. Progress streams through an unbounded channel the caller drains
//! until a `completed` or `error` event.
//!
//! Key invariants:
//! - No top-level step begins before the previous one (including all its
//!   branches) has fully completed.
//! - The context is never shared mutably across branches; each branch gets
//!   its own snapshot at fork time.
//! - A run emits at most one `error` event and never a `completed` after it.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{info, instrument, warn};

use crate::context::Context;
use crate::error::FlowError;
use crate::executor::StepExecutor;
use crate::progress::{ProgressEvent, ProgressSender};
use crate::template::substitute_tags;
use crate::workflow::{BranchStep, PlainStep, Step, Workflow};

// ============================================================================
// RUN HANDLE
// ============================================================================

/// Handle for one in-flight run: the ordered progress stream plus the
/// spawned driver task
pub struct RunHandle {
    events: mpsc::UnboundedReceiver<ProgressEvent>,
    task: JoinHandle<Result<Context, FlowError>>,
}

impl RunHandle {
    /// Next progress event, in emission order; `None` once the run is over
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.events.recv().await
    }

    /// Drain every remaining event in order
    pub async fn collect_events(&mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        events
    }

    /// Wait for the run to finish and return the final context
    pub async fn into_result(self) -> Result<Context, FlowError> {
        let RunHandle { events: _events, task } = self;
        // _events stays alive until the task resolves; dropping the receiver
        // early would abort the run with ChannelClosed
        task.await.map_err(|e| FlowError::Executor {
            step: "workflow".to_string(),
            detail: format!("run task panicked: {e}"),
        })?
    }

    /// Split into the raw receiver and the driver task handle
    pub fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedReceiver<ProgressEvent>,
        JoinHandle<Result<Context, FlowError>>,
    ) {
        (self.events, self.task)
    }
}

// ============================================================================
// RUNNER
// ============================================================================

/// Workflow runner bound to one step executor
pub struct Runner {
    executor: Arc<dyn StepExecutor>,
}

impl Runner {
    pub fn new(executor: Arc<dyn StepExecutor>) -> Self {
        Self { executor }
    }

    /// Start one run. Spawns a driver task and returns immediately;
    /// independent runs share nothing.
    pub fn run(&self, workflow: Workflow, initial: Context) -> RunHandle {
        let (progress, events) = ProgressSender::channel();
        let executor = Arc::clone(&self.executor);
        let task = tokio::spawn(run_workflow(workflow, initial, executor, progress));
        RunHandle { events, task }
    }
}

// ============================================================================
// ORCHESTRATION
// ============================================================================

#[instrument(skip_all, fields(workflow = %workflow.id, steps = workflow.steps.len()))]
async fn run_workflow(
    workflow: Workflow,
    initial: Context,
    executor: Arc<dyn StepExecutor>,
    progress: ProgressSender,
) -> Result<Context, FlowError> {
    let total = workflow.total_steps();
    info!(total, "Starting workflow run");

    // Definition errors fail the whole run before any executor call
    if let Err(e) = workflow.validate() {
        progress.emit_error(0, total, e.to_string())?;
        return Err(e);
    }

    let mut ctx = initial;
    let mut current = 0usize;

    for (index, step) in workflow.steps.iter().enumerate() {
        match step {
            Step::Plain(plain) => {
                current += 1;
                let payload = unit_payload(&plain.shortcut_name, &plain.model, &plain.system_prompt, &ctx);
                ctx = execute_unit(&plain.name, &plain.shortcut_name, payload, ctx, current, total, &executor, &progress)
                    .await?;
            }
            Step::Branch(branch) => {
                let (next, advanced) =
                    run_branches(branch, ctx, index, current, total, &executor, &progress).await?;
                ctx = next;
                current = advanced;
            }
            Step::Merge(merge) => {
                current += 1;
                // branch_outputs rides along in the context snapshot; the
                // referenced entry exists because validation passed and the
                // branch step already ran
                let payload = unit_payload(&merge.shortcut_name, &merge.model, &None, &ctx);
                ctx = execute_unit(&merge.name, &merge.shortcut_name, payload, ctx, current, total, &executor, &progress)
                    .await?;
            }
        }
    }

    progress.emit(ProgressEvent::completed(total))?;
    info!("Workflow run completed");
    Ok(ctx)
}

/// Payload for a plain or merge step: the full context snapshot plus the
/// step's declared overrides. The system prompt is tag-substituted against
/// the pre-step snapshot.
fn unit_payload(
    shortcut_name: &str,
    model: &Option<String>,
    system_prompt: &Option<String>,
    ctx: &Context,
) -> Context {
    let mut payload = ctx.with_value("shortcut_name", Value::String(shortcut_name.to_string()));
    if let Some(model) = model {
        payload = payload.with_value("model", Value::String(model.clone()));
    }
    if let Some(system) = system_prompt {
        payload = payload.with_value("system", Value::String(substitute_tags(system, ctx)));
    }
    payload
}

/// Shared execution for plain and merge steps: emit running, call the
/// executor, roll `previous_output` forward, emit output
#[allow(clippy::too_many_arguments)]
async fn execute_unit(
    name: &str,
    shortcut_name: &str,
    payload: Context,
    ctx: Context,
    step_no: usize,
    total: usize,
    executor: &Arc<dyn StepExecutor>,
    progress: &ProgressSender,
) -> Result<Context, FlowError> {
    progress.emit(ProgressEvent::running(step_no, total).with_message(name.to_string()))?;

    match executor.execute(shortcut_name, &payload).await {
        Ok(output) => {
            progress.emit(ProgressEvent::output(step_no, total, output.clone()))?;
            Ok(ctx.with_previous_output(output))
        }
        Err(e) => {
            let err = FlowError::Executor {
                step: name.to_string(),
                detail: e.to_string(),
            };
            progress.emit_error(step_no, total, err.to_string())?;
            Err(err)
        }
    }
}

// ============================================================================
// BRANCH EXECUTION
// ============================================================================

/// Fan a branch step out onto one task per branch and wait for all of them.
///
/// Every branch is seeded with its own copy of the fork-point context. A
/// failed branch does not cancel its siblings: all branches run to
/// completion and the run aborts afterwards, discarding the round.
/// The branch step itself never updates `previous_output` - a merge step is
/// the only way branch results re-enter the main pipeline.
#[allow(clippy::too_many_arguments)]
async fn run_branches(
    step: &BranchStep,
    ctx: Context,
    step_index: usize,
    current: usize,
    total: usize,
    executor: &Arc<dyn StepExecutor>,
    progress: &ProgressSender,
) -> Result<(Context, usize), FlowError> {
    let branch_count = step.branches.len();
    let advanced = current + step.leaf_count();

    // The fan-out event stays at the completed-leaf count; per-leaf running
    // events come from the branch runners themselves
    progress.emit(
        ProgressEvent::running(current, total)
            .with_message(format!("Running {branch_count} branches")),
    )?;

    let mut join_set: JoinSet<(usize, Result<String, FlowError>)> = JoinSet::new();
    let mut offset = current;
    for (branch_index, branch) in step.branches.iter().enumerate() {
        let branch = branch.clone();
        let seed = ctx.clone();
        let executor = Arc::clone(executor);
        let progress = progress.clone();
        let start = offset;
        offset += branch.len();

        join_set.spawn(async move {
            let result =
                run_branch(&branch, seed, branch_index, start, total, executor, progress).await;
            (branch_index, result)
        });
    }

    let mut outputs: Vec<Option<String>> = vec![None; branch_count];
    let mut first_failure: Option<FlowError> = None;

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((branch_index, Ok(output))) => outputs[branch_index] = Some(output),
            Ok((branch_index, Err(e))) => {
                warn!(branch = branch_index, error = %e, "Branch failed");
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
            Err(e) => {
                let err = FlowError::Executor {
                    step: "branch".to_string(),
                    detail: format!("branch task panicked: {e}"),
                };
                progress.emit_error(current, total, err.to_string())?;
                if first_failure.is_none() {
                    first_failure = Some(err);
                }
            }
        }
    }

    if let Some(e) = first_failure {
        return Err(e);
    }

    let summary: Vec<String> = outputs.iter().flatten().cloned().collect();
    let mut collected = Map::new();
    for (branch_index, output) in outputs.into_iter().enumerate() {
        collected.insert(
            format!("branch_{branch_index}"),
            Value::String(output.unwrap_or_default()),
        );
    }

    let next = if branch_count == 0 {
        ctx
    } else {
        ctx.with_branch_outputs(step_index, collected)
    };

    progress.emit(
        ProgressEvent::branch_output(advanced, total, summary)
            .with_message(format!("{branch_count} branches completed")),
    )?;

    Ok((next, advanced))
}

/// Execute one branch sequentially with a branch-local context.
///
/// Step numbers start at `start + 1`, offset by the branch's position in
/// the global leaf count, so sibling branches never collide numerically.
/// Returns the branch's final `previous_output`.
async fn run_branch(
    steps: &[PlainStep],
    seed: Context,
    branch_index: usize,
    start: usize,
    total: usize,
    executor: Arc<dyn StepExecutor>,
    progress: ProgressSender,
) -> Result<String, FlowError> {
    let mut ctx = seed;

    for (i, step) in steps.iter().enumerate() {
        let step_no = start + i + 1;
        progress.emit(
            ProgressEvent::running(step_no, total)
                .with_message(format!("branch {branch_index}: {}", step.name)),
        )?;

        let payload = unit_payload(&step.shortcut_name, &step.model, &step.system_prompt, &ctx);
        match executor.execute(&step.shortcut_name, &payload).await {
            Ok(output) => {
                progress.emit(ProgressEvent::output(step_no, total, output.clone()))?;
                ctx = ctx.with_previous_output(output);
            }
            Err(e) => {
                let err = FlowError::Executor {
                    step: step.name.clone(),
                    detail: e.to_string(),
                };
                progress.emit_error(step_no, total, format!("branch {branch_index}: {err}"))?;
                return Err(err);
            }
        }
    }

    Ok(ctx.previous_output().unwrap_or_default().to_string())
}

// ============================================================================
// TESTS
// ============================================================================
