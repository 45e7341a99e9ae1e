//! Concurrent execution of a batch of [`TaskSpec`]s against one [`ResourcePool`].
//!
//! Every task runs as its own unit of work and walks
//! `Pending → Acquiring → Preparing → Running → Completed(SUCCESS|FAIL)`:
//! - **Acquiring**: wait for `quantity` tokens (oversized requests are rejected without waiting);
//! - **Preparing**: inject the tokens into the selector variable, run the pre-hook,
//!   create the io directory and write the pre-run provenance;
//! - **Running**: spawn through the [`Runner`], persist the pid, wait, persist the outcome,
//!   drop a `FAST_EXIT` marker when the task ended below the threshold.
//!
//! Tokens are released whatever happens after the grant, including pre-hook errors, spawn errors and panics.
//! A failing task never affects its siblings and nothing is retried.
mod config;
pub use config::{CUDA_VISIBLE_DEVICES, LauncherConfig};

mod report;
pub use report::{RunReport, readable_duration};

use std::{collections::HashMap, sync::Arc, time::Instant};

use tokio::task::JoinSet;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};
use uuid::Uuid;

use batchrun_model::{
    ExecutionRecord, HostInfo, ResourceToken, TaskPhase, TaskResult, TaskSpec, TaskStatus,
};

use crate::{
    error::CoreError,
    pool::ResourcePool,
    provenance::{ProvenanceWriter, local_now, log_stamp},
    runner::{Invocation, Runner},
    state::TaskBoard,
    system,
};

pub struct Launcher {
    inner: Arc<Inner>,
    span: Span,
}

struct Inner {
    pool: Arc<ResourcePool>,
    runner: Arc<dyn Runner>,
    config: LauncherConfig,
    board: TaskBoard,
    host: HostInfo,
    run_id: String,
}

impl Launcher {
    pub fn new(pool: ResourcePool, runner: Arc<dyn Runner>) -> Self {
        Self::with_config(pool, runner, LauncherConfig::default())
    }

    pub fn with_config(pool: ResourcePool, runner: Arc<dyn Runner>, config: LauncherConfig) -> Self {
        let pool = Arc::new(pool.with_poll_interval(config.poll_interval));
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!(target: "batchrun.launcher", "launcher", run_id = %run_id, runner = runner.name());
        Self {
            inner: Arc::new(Inner {
                pool,
                runner,
                config,
                board: TaskBoard::new(),
                host: system::host_info(),
                run_id,
            }),
            span,
        }
    }

    /// Parent span for everything this launcher logs.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.inner.pool
    }

    /// Handle on the live phase of every task of the current run.
    pub fn board(&self) -> TaskBoard {
        self.inner.board.clone()
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.inner.config
    }

    pub fn run_id(&self) -> &str {
        &self.inner.run_id
    }

    /// Run every task concurrently and wait for all of them.
    ///
    /// Always yields exactly one [`TaskResult`] per spec, in submission order.
    pub async fn run(&self, tasks: Vec<TaskSpec>) -> RunReport {
        let started = Instant::now();
        let total = tasks.len();
        let identifiers: Vec<String> = tasks.iter().map(TaskSpec::identifier).collect();
        self.inner.board.reset(identifiers.clone());

        info!(
            target: "batchrun.launcher",
            parent: &self.span,
            total,
            capacity = self.inner.pool.capacity(),
            "launching batch"
        );

        let mut set = JoinSet::new();
        let mut owners = HashMap::with_capacity(total);
        for (index, spec) in tasks.into_iter().enumerate() {
            let span = info_span!(
                target: "batchrun.launcher",
                parent: &self.span,
                "task",
                index,
                identifier = %identifiers[index]
            );
            let inner = Arc::clone(&self.inner);
            let handle = set.spawn(inner.execute(index, spec).instrument(span));
            owners.insert(handle.id(), index);
        }

        let mut slots: Vec<Option<TaskResult>> = vec![None; total];
        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((_, result)) => {
                    let index = result.index;
                    slots[index] = Some(result);
                }
                Err(err) => {
                    let Some(&index) = owners.get(&err.id()) else {
                        error!(target: "batchrun.launcher", parent: &self.span, error = %err, "unknown task aborted");
                        continue;
                    };
                    error!(
                        target: "batchrun.launcher",
                        parent: &self.span,
                        index,
                        identifier = %identifiers[index],
                        error = %err,
                        "task aborted"
                    );
                    self.inner
                        .board
                        .advance(index, TaskPhase::Completed(TaskStatus::Fail));
                    slots[index] = Some(TaskResult::failed(
                        index,
                        identifiers[index].clone(),
                        format!("execution aborted: {err}"),
                    ));
                }
            }
        }

        let report = RunReport {
            results: slots.into_iter().flatten().collect(),
            elapsed: started.elapsed(),
        };
        info!(
            target: "batchrun.launcher",
            parent: &self.span,
            total,
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            elapsed = %readable_duration(report.elapsed),
            "batch finished"
        );
        report
    }

    /// Drive [`Launcher::run`] on a fresh single-threaded runtime.
    pub fn run_blocking(&self, tasks: Vec<TaskSpec>) -> Result<RunReport, CoreError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(CoreError::Runtime)?;
        Ok(rt.block_on(self.run(tasks)))
    }
}

impl Inner {
    async fn execute(self: Arc<Self>, index: usize, spec: TaskSpec) -> TaskResult {
        let identifier = spec.identifier();

        self.board.advance(index, TaskPhase::Acquiring);
        let allocation = match self.pool.acquire(spec.quantity()).await {
            Ok(allocation) => allocation,
            Err(e) => {
                warn!(target: "batchrun.launcher", index, error = %e, "rejected");
                self.board
                    .advance(index, TaskPhase::Completed(TaskStatus::Fail));
                return TaskResult::failed(index, identifier, e.to_string());
            }
        };
        self.board.advance(index, TaskPhase::Preparing);
        self.board.hold(index, allocation.tokens());

        let result = match self
            .launch(index, &identifier, &spec, allocation.tokens())
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    target: "batchrun.launcher",
                    index,
                    tokens = %allocation.joined(),
                    error = %e,
                    "FAIL before spawn"
                );
                TaskResult {
                    tokens: allocation.tokens().to_vec(),
                    ..TaskResult::failed(index, identifier, e.to_string())
                }
            }
        };

        drop(allocation);
        self.board
            .advance(index, TaskPhase::Completed(result.status));
        result
    }

    async fn launch(
        &self,
        index: usize,
        identifier: &str,
        spec: &TaskSpec,
        tokens: &[ResourceToken],
    ) -> Result<TaskResult, CoreError> {
        let cfg = &self.config;
        let selector = ResourceToken::join(tokens);
        let env = spec.env().with_var(&cfg.selector_var, &selector);
        info!(target: "batchrun.launcher", index, tokens = %selector, identifier, "starting");

        spec.run_pre_hook()
            .map_err(|e| CoreError::PreHook(e.to_string()))?;

        let cwd = std::path::absolute(spec.cwd()).map_err(|source| CoreError::Cwd {
            path: spec.cwd().clone(),
            source,
        })?;
        let writer = ProvenanceWriter::new(spec.io_dir(), &cfg.provenance_dir);
        writer.prepare()?;

        let mut record = ExecutionRecord {
            run_id: self.run_id.clone(),
            identifier: identifier.to_string(),
            cmd_str: spec.command_string(),
            cmd_list: spec.command_list(),
            cwd: cwd.clone(),
            env: env.clone(),
            host: self.host.clone(),
            resources: tokens.to_vec(),
            launched_at: local_now(),
            ended_at: None,
            pid: None,
            exit_code: None,
            status: None,
            elapsed_ms: None,
        };
        writer.write_task_description(&record)?;
        writer.write_command(&record, &cfg.selector_var)?;
        writer.write_record(&record)?;

        let (stdout, stderr) = writer.log_paths(&log_stamp());
        let invocation = Invocation {
            identifier: identifier.to_string(),
            command: spec.command().clone(),
            cwd,
            env,
            stdout,
            stderr,
        };

        self.board.advance(index, TaskPhase::Running);
        let started = Instant::now();
        let outcome = {
            let mut on_spawn = |pid: u32| {
                debug!(target: "batchrun.launcher", index, pid, "spawned");
                record.mark_spawned(pid);
                if let Err(e) = writer.write_record(&record) {
                    warn!(target: "batchrun.launcher", index, error = %e, "pid checkpoint not persisted");
                }
            };
            self.runner.run(&invocation, &mut on_spawn).await
        };
        let elapsed = started.elapsed();

        let (status, exit_code, mut failure) = match outcome {
            Ok(exit) => (TaskStatus::from_exit_code(exit.code), exit.code, None),
            Err(e) => (TaskStatus::Fail, None, Some(e.to_string())),
        };
        record.mark_finished(status, exit_code, elapsed, local_now());
        if let Err(e) = writer.write_record(&record) {
            error!(target: "batchrun.launcher", index, error = %e, "final checkpoint not persisted");
            failure.get_or_insert_with(|| e.to_string());
        }

        if elapsed < cfg.fast_exit_threshold {
            warn!(
                target: "batchrun.launcher",
                index,
                elapsed_ms = elapsed.as_millis() as u64,
                "finished suspiciously fast"
            );
            if let Err(e) = writer.write_fast_exit(elapsed, cfg.fast_exit_threshold) {
                warn!(target: "batchrun.launcher", index, error = %e, "fast-exit marker not written");
            }
        }

        match status {
            TaskStatus::Success => info!(
                target: "batchrun.launcher",
                index,
                pid = ?record.pid,
                tokens = %selector,
                identifier,
                "SUCCESS"
            ),
            TaskStatus::Fail => warn!(
                target: "batchrun.launcher",
                index,
                pid = ?record.pid,
                code = ?exit_code,
                tokens = %selector,
                identifier,
                error = failure.as_deref().unwrap_or(""),
                "FAIL"
            ),
        }

        Ok(TaskResult {
            index,
            identifier: identifier.to_string(),
            status,
            elapsed,
            tokens: tokens.to_vec(),
            pid: record.pid,
            exit_code,
            error: failure,
        })
    }
}

#[cfg(test)]
mod tests;
