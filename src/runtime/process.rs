//! Runtime that executes a definition's command as a child process.
//!
//! Input rows are written to the process's stdin as JSON lines. Every stdout
//! line that parses as a JSON object becomes a result row; other lines are
//! logged. A non-zero exit status counts as one error.

use super::{PipelineRuntime, RuntimeError, RuntimeHandle, RuntimeOutcome};
use crate::model::{PipelineDefinition, Row, RunOutcome, VariableScope};
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Pause between exit checks while waiting for a process
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

struct RunningProcess {
    pipeline: String,
    child: Child,
    exit: Option<std::process::ExitStatus>,
    /// The exit status could not be read; the process counts as finished
    poll_failed: bool,
    stopped: bool,
    stdout_reader: Option<JoinHandle<Vec<Row>>>,
}

impl RunningProcess {
    fn is_finished(&self) -> bool {
        self.exit.is_some() || self.poll_failed
    }

    fn error_count(&self) -> u64 {
        if self.poll_failed {
            return 1;
        }
        match self.exit {
            Some(status) if !status.success() => 1,
            _ => 0,
        }
    }

    /// Fold one `try_wait` result into the process state; returns whether it finished
    fn record_poll(&mut self, poll: std::io::Result<Option<std::process::ExitStatus>>) -> bool {
        match poll {
            Ok(Some(status)) => self.exit = Some(status),
            Ok(None) => {}
            Err(e) => {
                warn!("Unable to poll pipeline '{}', giving up on it: {}", self.pipeline, e);
                if let Err(e) = self.child.start_kill() {
                    debug!("Unable to kill pipeline '{}': {}", self.pipeline, e);
                }
                self.poll_failed = true;
            }
        }
        self.is_finished()
    }
}

#[derive(Default)]
pub struct ProcessRuntime {
    next_handle: AtomicU64,
    processes: Mutex<HashMap<RuntimeHandle, RunningProcess>>,
}

impl ProcessRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn build_command(
        definition: &PipelineDefinition,
        arguments: &[String],
        scope: &VariableScope,
    ) -> Result<Command, RuntimeError> {
        let command_spec = definition
            .command
            .as_ref()
            .ok_or_else(|| RuntimeError::StartFailed {
                pipeline: definition.name.clone(),
                message: "definition has no command".to_string(),
            })?;

        let mut command = Command::new(scope.substitute(&command_spec.program));
        command
            .args(command_spec.args.iter().map(|a| scope.substitute(a)))
            .args(arguments)
            .envs(scope.iter())
            .envs(command_spec.env.iter().map(|(k, v)| (k.as_str(), scope.substitute(v))))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &command_spec.working_dir {
            command.current_dir(dir);
        }

        debug!(
            "Executing pipeline '{}': {} {} {}",
            definition.name,
            command_spec.program,
            command_spec.args.join(" "),
            arguments.join(" ")
        );
        trace!("Pipeline environment: {:?}", scope);

        Ok(command)
    }
}

#[async_trait]
impl PipelineRuntime for ProcessRuntime {
    async fn start(
        &self,
        definition: &PipelineDefinition,
        arguments: &[String],
        scope: &VariableScope,
        prior: &RunOutcome,
    ) -> Result<RuntimeHandle, RuntimeError> {
        let mut command = Self::build_command(definition, arguments, scope)?;
        let mut child = command.spawn().map_err(|e| RuntimeError::StartFailed {
            pipeline: definition.name.clone(),
            message: e.to_string(),
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            let input: Vec<String> = prior
                .rows
                .iter()
                .filter_map(|row| serde_json::to_string(row).ok())
                .collect();
            tokio::spawn(async move {
                for line in input {
                    if stdin.write_all(line.as_bytes()).await.is_err()
                        || stdin.write_all(b"\n").await.is_err()
                    {
                        break;
                    }
                }
            });
        }

        let stdout_reader = child.stdout.take().map(|stdout| {
            let pipeline = definition.name.clone();
            tokio::spawn(async move {
                let mut rows = Vec::new();
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    match serde_json::from_str(&line).ok().and_then(Row::from_json_object) {
                        Some(row) => rows.push(row),
                        None => debug!("[{}] {}", pipeline, line),
                    }
                }
                rows
            })
        });

        if let Some(stderr) = child.stderr.take() {
            let pipeline = definition.name.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!("[{}] {}", pipeline, line);
                }
            });
        }

        let handle = RuntimeHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.processes.lock().await.insert(
            handle,
            RunningProcess {
                pipeline: definition.name.clone(),
                child,
                exit: None,
                poll_failed: false,
                stopped: false,
                stdout_reader,
            },
        );
        Ok(handle)
    }

    async fn is_finished(&self, handle: RuntimeHandle) -> bool {
        let mut processes = self.processes.lock().await;
        let Some(process) = processes.get_mut(&handle) else {
            return true;
        };
        if process.is_finished() {
            return true;
        }
        let poll = process.child.try_wait();
        process.record_poll(poll)
    }

    async fn error_count(&self, handle: RuntimeHandle) -> u64 {
        self.processes
            .lock()
            .await
            .get(&handle)
            .map(RunningProcess::error_count)
            .unwrap_or(0)
    }

    async fn stop_all(&self, handle: RuntimeHandle) {
        let mut processes = self.processes.lock().await;
        if let Some(process) = processes.get_mut(&handle) {
            if !process.is_finished() {
                debug!("Stopping pipeline '{}'", process.pipeline);
                if let Err(e) = process.child.start_kill() {
                    warn!("Unable to stop pipeline '{}': {}", process.pipeline, e);
                }
                process.stopped = true;
            }
        }
    }

    async fn wait_until_finished(&self, handle: RuntimeHandle) -> Result<(), RuntimeError> {
        if !self.processes.lock().await.contains_key(&handle) {
            return Err(RuntimeError::UnknownHandle(handle));
        }
        // the map is only locked per check so other handles stay usable
        while !self.is_finished(handle).await {
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }
        Ok(())
    }

    async fn collect_outcome(&self, handle: RuntimeHandle) -> Result<RuntimeOutcome, RuntimeError> {
        let mut process = self
            .processes
            .lock()
            .await
            .remove(&handle)
            .ok_or(RuntimeError::UnknownHandle(handle))?;

        if !process.is_finished() {
            process.exit = Some(process.child.wait().await?);
        }

        let rows = match process.stdout_reader.take() {
            Some(reader) => reader
                .await
                .map_err(|e| RuntimeError::Failed(format!("stdout reader failed: {}", e)))?,
            None => Vec::new(),
        };

        let rows_set = !rows.is_empty();
        let mut outcome = RunOutcome::failed(process.error_count()).with_rows(rows);
        outcome.stopped = process.stopped;

        Ok(RuntimeOutcome { outcome, rows_set })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::model::CommandSpec;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn shell(script: &str) -> PipelineDefinition {
        let mut definition = PipelineDefinition::new("shell");
        definition.command = Some(CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            working_dir: None,
            env: BTreeMap::new(),
        });
        definition
    }

    async fn run(
        runtime: &ProcessRuntime,
        definition: &PipelineDefinition,
        scope: &VariableScope,
    ) -> RuntimeOutcome {
        let handle = runtime
            .start(definition, &[], scope, &RunOutcome::new())
            .await
            .unwrap();
        runtime.wait_until_finished(handle).await.unwrap();
        assert!(runtime.is_finished(handle).await);
        runtime.collect_outcome(handle).await.unwrap()
    }

    #[tokio::test]
    async fn test_json_lines_become_rows() {
        let runtime = ProcessRuntime::new();
        let definition = shell(r#"echo '{"id": 1}'; echo 'plain text'; echo '{"id": 2}'"#);

        let result = run(&runtime, &definition, &VariableScope::new()).await;
        assert!(result.rows_set);
        assert_eq!(result.outcome.rows.len(), 2);
        assert_eq!(result.outcome.error_count, 0);
    }

    #[tokio::test]
    async fn test_scope_is_exported_as_environment() {
        let runtime = ProcessRuntime::new();
        let definition = shell(r#"echo "{\"region\": \"$REGION\"}""#);
        let scope: VariableScope = [("REGION", "EU")].into_iter().collect();

        let result = run(&runtime, &definition, &scope).await;
        assert_eq!(
            result.outcome.rows[0].get_string("region").as_deref(),
            Some("EU")
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_one_error() {
        let runtime = ProcessRuntime::new();
        let result = run(&runtime, &shell("exit 3"), &VariableScope::new()).await;
        assert_eq!(result.outcome.error_count, 1);
        assert!(!result.rows_set);
    }

    #[tokio::test]
    async fn test_stop_all_kills_the_process() {
        let runtime = ProcessRuntime::new();
        let handle = runtime
            .start(&shell("exec sleep 30"), &[], &VariableScope::new(), &RunOutcome::new())
            .await
            .unwrap();
        assert!(!runtime.is_finished(handle).await);

        runtime.stop_all(handle).await;
        runtime.wait_until_finished(handle).await.unwrap();
        let result = runtime.collect_outcome(handle).await.unwrap();
        assert!(result.outcome.stopped);
        assert_eq!(result.outcome.error_count, 1);
    }

    #[tokio::test]
    async fn test_waiting_does_not_block_other_handles() {
        let runtime = Arc::new(ProcessRuntime::new());
        let no_input = RunOutcome::new();
        let slow = runtime
            .start(&shell("exec sleep 30"), &[], &VariableScope::new(), &no_input)
            .await
            .unwrap();
        let quick = runtime
            .start(&shell("exit 0"), &[], &VariableScope::new(), &no_input)
            .await
            .unwrap();

        let waiter = {
            let runtime = runtime.clone();
            tokio::spawn(async move { runtime.wait_until_finished(slow).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        tokio::time::timeout(Duration::from_secs(5), runtime.wait_until_finished(quick))
            .await
            .unwrap()
            .unwrap();
        assert!(!runtime.is_finished(slow).await);
        tokio::time::timeout(Duration::from_secs(1), runtime.stop_all(slow))
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(runtime.collect_outcome(slow).await.unwrap().outcome.stopped);
    }

    #[tokio::test]
    async fn test_unreadable_exit_status_finishes_with_one_error() {
        let child = Command::new("sleep").arg("30").kill_on_drop(true).spawn().unwrap();
        let mut process = RunningProcess {
            pipeline: "stuck".to_string(),
            child,
            exit: None,
            poll_failed: false,
            stopped: false,
            stdout_reader: None,
        };

        assert!(!process.record_poll(Ok(None)));
        assert_eq!(process.error_count(), 0);

        assert!(process.record_poll(Err(std::io::Error::other("no child process"))));
        assert!(process.is_finished());
        assert_eq!(process.error_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_command_fails_to_start() {
        let runtime = ProcessRuntime::new();
        let err = runtime
            .start(
                &PipelineDefinition::new("empty"),
                &[],
                &VariableScope::new(),
                &RunOutcome::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::StartFailed { .. }));
    }
}
