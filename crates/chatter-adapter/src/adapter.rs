use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

use crate::config::AdapterConfig;
use crate::error::AdapterError;
use crate::event::{parse_jsonl_line, AgentEvent, FinishReason};

/// Tagged variant per agent family (§9 design note): a common interface
/// rather than inheritance across CLI-specific behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    ClaudeCode,
    Codex,
    Gemini,
    PlainText,
}

impl AgentKind {
    /// Whether a `Text` event with this `category` contributes to
    /// `accumulatedText` (§4.5.3).
    fn accumulates(self, category: Option<&str>) -> bool {
        match self {
            AgentKind::ClaudeCode => category == Some("result"),
            _ => matches!(category, None | Some("message")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub member_id: String,
    pub prepared_message: String,
    pub system_flag: Option<String>,
    pub env: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnResult {
    pub success: bool,
    pub finish_reason: FinishReason,
    pub accumulated_text: String,
}

/// A handle the caller can use to cooperatively cancel an in-flight turn
/// (§4.5.2). Dropping it without calling `cancel()` has no effect.
#[derive(Debug)]
pub struct CancelHandle {
    tx: Option<oneshot::Sender<()>>,
}

impl CancelHandle {
    pub fn cancel(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

fn new_cancel_pair() -> (CancelHandle, oneshot::Receiver<()>) {
    let (tx, rx) = oneshot::channel();
    (CancelHandle { tx: Some(tx) }, rx)
}

#[async_trait]
pub trait Adapter: Send + Sync {
    /// Spawn one child process for this turn, forward normalized events
    /// to `events_tx` as they arrive, and resolve with the final outcome
    /// once a `turn.completed` event is seen, the process exits, the
    /// timeout elapses, or cancellation fires (§4.5.1).
    async fn run_turn(
        &self,
        request: TurnRequest,
        events_tx: mpsc::UnboundedSender<AgentEvent>,
        cancel: oneshot::Receiver<()>,
    ) -> Result<TurnResult, AdapterError>;
}

/// Spawns `config.command` per turn and parses its JSONL stdout.
pub struct ProcessAdapter {
    kind: AgentKind,
    config: AdapterConfig,
}

impl ProcessAdapter {
    pub fn new(kind: AgentKind, config: AdapterConfig) -> Self {
        ProcessAdapter { kind, config }
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Produce a fresh cancellation handle/receiver pair for a turn about
    /// to be submitted to [`Adapter::run_turn`].
    pub fn new_cancel_handle() -> (CancelHandle, oneshot::Receiver<()>) {
        new_cancel_pair()
    }

    fn build_args(&self, request: &TurnRequest) -> Vec<String> {
        let mut args = self.config.default_args.clone();
        args.extend(self.config.extra_args_for_prompt.clone());
        if let (Some(flag_name), Some(flag_value)) =
            (&self.config.system_flag_name, &request.system_flag)
        {
            args.push(flag_name.clone());
            args.push(flag_value.clone());
        }
        args.push(request.prepared_message.clone());
        args
    }

    async fn terminate(&self, child: &mut Child) {
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
            let grace = tokio::time::sleep(self.config.kill_grace);
            tokio::select! {
                _ = child.wait() => return,
                _ = grace => {}
            }
        }
        let _ = child.kill().await;
        let _ = child.wait().await;
    }
}

#[async_trait]
impl Adapter for ProcessAdapter {
    async fn run_turn(
        &self,
        request: TurnRequest,
        events_tx: mpsc::UnboundedSender<AgentEvent>,
        mut cancel: oneshot::Receiver<()>,
    ) -> Result<TurnResult, AdapterError> {
        let args = self.build_args(&request);
        let mut command = Command::new(&self.config.command);
        command
            .args(&args)
            .envs(&request.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &request.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(AdapterError::AgentSpawnError)?;
        let stdout = child.stdout.take().expect("piped stdout");
        let mut lines = BufReader::new(stdout).lines();

        // Drained concurrently on its own task: if nothing reads stderr, a
        // chatty CLI fills the OS pipe buffer and blocks the child's write,
        // stalling stdout production right along with it.
        let stderr = child.stderr.take().expect("piped stderr");
        let mut stderr_lines = BufReader::new(stderr).lines();
        let stderr_member_id = request.member_id.clone();
        tokio::spawn(async move {
            while let Ok(Some(line)) = stderr_lines.next_line().await {
                tracing::warn!(member_id = %stderr_member_id, "agent stderr: {line}");
            }
        });

        let mut accumulated = String::new();
        let mut completed: Option<FinishReason> = None;
        let mut stream_started = false;
        let timeout = tokio::time::sleep(self.config.max_timeout);
        tokio::pin!(timeout);

        loop {
            tokio::select! {
                biased;

                _ = &mut cancel => {
                    tracing::info!(member_id = %request.member_id, "agent turn cancelled");
                    self.terminate(&mut child).await;
                    if !stream_started {
                        return Err(AdapterError::AgentCancelled);
                    }
                    return Ok(TurnResult {
                        success: false,
                        finish_reason: FinishReason::Cancelled,
                        accumulated_text: accumulated,
                    });
                }

                _ = &mut timeout => {
                    tracing::warn!(member_id = %request.member_id, "agent turn timed out");
                    self.terminate(&mut child).await;
                    if !stream_started {
                        return Err(AdapterError::AgentTimeout);
                    }
                    return Ok(TurnResult {
                        success: false,
                        finish_reason: FinishReason::Timeout,
                        accumulated_text: accumulated,
                    });
                }

                line = lines.next_line() => {
                    match line {
                        Ok(Some(raw_line)) => {
                            stream_started = true;
                            if let Some(event) = parse_jsonl_line(&raw_line) {
                                if let AgentEvent::Text { category, text } = &event {
                                    if self.kind.accumulates(category.as_deref()) {
                                        accumulated.push_str(text);
                                    }
                                }
                                if let AgentEvent::TurnCompleted { finish_reason } = &event {
                                    completed = Some(*finish_reason);
                                }
                                let _ = events_tx.send(event);
                            }
                        }
                        Ok(None) => {
                            // stdout closed; fall through to exit-status handling.
                            let status = child.wait().await.map_err(AdapterError::AgentSpawnError)?;
                            if completed.is_none() && !stream_started && !status.success() {
                                return Err(AdapterError::AgentExitError { code: status.code() });
                            }
                            return Ok(finalize(status.code(), completed, accumulated));
                        }
                        Err(err) => {
                            return Err(AdapterError::DecodeError(err.to_string()));
                        }
                    }
                }
            }
        }
    }
}

fn finalize(exit_code: Option<i32>, completed: Option<FinishReason>, accumulated: String) -> TurnResult {
    match completed {
        Some(finish_reason) => TurnResult {
            success: matches!(finish_reason, FinishReason::Done),
            finish_reason,
            accumulated_text: accumulated,
        },
        None if exit_code == Some(0) => TurnResult {
            success: true,
            finish_reason: FinishReason::Done,
            accumulated_text: accumulated,
        },
        None => TurnResult {
            success: false,
            finish_reason: FinishReason::Error,
            accumulated_text: accumulated,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn synthesizes_done_on_clean_exit_without_completion_event() {
        let adapter = ProcessAdapter::new(AgentKind::PlainText, AdapterConfig::new("true"));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (_handle, cancel_rx) = ProcessAdapter::new_cancel_handle();
        let request = TurnRequest {
            member_id: "alpha".into(),
            prepared_message: "hi".into(),
            system_flag: None,
            env: HashMap::new(),
            cwd: None,
        };
        let result = adapter.run_turn(request, tx, cancel_rx).await.unwrap();
        assert_eq!(result.finish_reason, FinishReason::Done);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn exits_nonzero_before_any_output_is_an_error() {
        let adapter = ProcessAdapter::new(AgentKind::PlainText, AdapterConfig::new("false"));
        let (tx, _rx) = mpsc::unbounded_channel();
        let (_handle, cancel_rx) = ProcessAdapter::new_cancel_handle();
        let request = TurnRequest {
            member_id: "alpha".into(),
            prepared_message: "hi".into(),
            system_flag: None,
            env: HashMap::new(),
            cwd: None,
        };
        let err = adapter.run_turn(request, tx, cancel_rx).await.unwrap_err();
        assert!(matches!(err, AdapterError::AgentExitError { code: Some(1) }));
    }

    #[tokio::test]
    async fn reports_error_finish_reason_on_nonzero_exit_after_streaming() {
        let mut config = AdapterConfig::new("sh");
        config.default_args = vec!["-c".into(), "echo hi; exit 1".into()];
        let adapter = ProcessAdapter::new(AgentKind::PlainText, config);
        let (tx, _rx) = mpsc::unbounded_channel();
        let (_handle, cancel_rx) = ProcessAdapter::new_cancel_handle();
        let request = TurnRequest {
            member_id: "alpha".into(),
            prepared_message: "hi".into(),
            system_flag: None,
            env: HashMap::new(),
            cwd: None,
        };
        let result = adapter.run_turn(request, tx, cancel_rx).await.unwrap();
        assert_eq!(result.finish_reason, FinishReason::Error);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn spawn_error_on_missing_command() {
        let adapter = ProcessAdapter::new(
            AgentKind::PlainText,
            AdapterConfig::new("/no/such/binary-really"),
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        let (_handle, cancel_rx) = ProcessAdapter::new_cancel_handle();
        let request = TurnRequest {
            member_id: "alpha".into(),
            prepared_message: "hi".into(),
            system_flag: None,
            env: HashMap::new(),
            cwd: None,
        };
        let err = adapter.run_turn(request, tx, cancel_rx).await.unwrap_err();
        assert!(matches!(err, AdapterError::AgentSpawnError(_)));
    }

    #[tokio::test]
    async fn cancellation_before_any_output_is_an_error() {
        let mut config = AdapterConfig::new("sleep");
        config.default_args = vec!["5".into()];
        let adapter = ProcessAdapter::new(AgentKind::PlainText, config);
        let (tx, _rx) = mpsc::unbounded_channel();
        let (handle, cancel_rx) = ProcessAdapter::new_cancel_handle();
        let request = TurnRequest {
            member_id: "alpha".into(),
            prepared_message: String::new(),
            system_flag: None,
            env: HashMap::new(),
            cwd: None,
        };
        let run = tokio::spawn(async move { adapter.run_turn(request, tx, cancel_rx).await });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        handle.cancel();
        let err = run.await.unwrap().unwrap_err();
        assert!(matches!(err, AdapterError::AgentCancelled));
    }

    #[tokio::test]
    async fn cancellation_after_output_yields_cancelled_finish_reason() {
        let mut config = AdapterConfig::new("sh");
        config.default_args = vec!["-c".into(), "echo hi; sleep 5".into()];
        let adapter = ProcessAdapter::new(AgentKind::PlainText, config);
        let (tx, _rx) = mpsc::unbounded_channel();
        let (handle, cancel_rx) = ProcessAdapter::new_cancel_handle();
        let request = TurnRequest {
            member_id: "alpha".into(),
            prepared_message: String::new(),
            system_flag: None,
            env: HashMap::new(),
            cwd: None,
        };
        let run = tokio::spawn(async move { adapter.run_turn(request, tx, cancel_rx).await });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        handle.cancel();
        let result = run.await.unwrap().unwrap();
        assert_eq!(result.finish_reason, FinishReason::Cancelled);
    }

    #[test]
    fn claude_code_only_accumulates_result_category() {
        assert!(AgentKind::ClaudeCode.accumulates(Some("result")));
        assert!(!AgentKind::ClaudeCode.accumulates(Some("streaming")));
        assert!(!AgentKind::ClaudeCode.accumulates(None));
    }

    #[test]
    fn non_claude_accumulates_message_or_uncategorized() {
        assert!(AgentKind::Codex.accumulates(None));
        assert!(AgentKind::Codex.accumulates(Some("message")));
        assert!(!AgentKind::Codex.accumulates(Some("reasoning")));
    }
}
