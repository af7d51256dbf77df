//! # Command Executor
//!
//! Runs one external command under the [`CommandPolicy`], with a hard wall-clock timeout,
//! and captures the outcome as a [`CommandResult`]. Every outcome, including rejection and
//! failure, is data: nothing here returns an error to the caller.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::traits::{ProcessOutput, ProcessRunner};
use crate::infrastructure::tools::policy::{CommandPolicy, PermissionResult};
use crate::strings::messages;

/// Closed set of outcomes, serialized as the `kind` discriminant of a tool result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Success,
    EmptyCommand,
    VerbNotAllowed,
    Timeout,
    CommandFailed,
    ExecutionError,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKind::Success => "success",
            ResultKind::EmptyCommand => "empty_command",
            ResultKind::VerbNotAllowed => "verb_not_allowed",
            ResultKind::Timeout => "timeout",
            ResultKind::CommandFailed => "command_failed",
            ResultKind::ExecutionError => "execution_error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
    Timeout,
    /// Refused before any process was spawned.
    Rejected,
}

/// Outcome of one `execute` call. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub kind: ResultKind,
    /// Arguments actually executed (or that would have been, for rejections).
    pub invocation: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
    message: String,
}

impl CommandResult {
    fn new(kind: ResultKind, invocation: Vec<String>, message: String) -> Self {
        Self {
            kind,
            invocation,
            stdout: String::new(),
            stderr: String::new(),
            elapsed: Duration::ZERO,
            message,
        }
    }

    pub fn exit_status(&self) -> ExitStatus {
        match self.kind {
            ResultKind::Success => ExitStatus::Success,
            ResultKind::Timeout => ExitStatus::Timeout,
            ResultKind::CommandFailed | ResultKind::ExecutionError => ExitStatus::Failure,
            ResultKind::EmptyCommand | ResultKind::VerbNotAllowed => ExitStatus::Rejected,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == ResultKind::Success
    }

    /// Text shown to the model for this outcome.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// JSON payload of the tool-result message: `result` on success, `error` otherwise.
    pub fn to_payload(&self) -> Value {
        if self.is_success() {
            json!({ "kind": self.kind, "result": self.message })
        } else {
            json!({ "kind": self.kind, "error": self.message })
        }
    }
}

/// Spawns real processes through tokio, without a shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, argv: &[String]) -> std::io::Result<ProcessOutput> {
        let Some((program, args)) = argv.split_first() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty argument vector",
            ));
        };

        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // The timeout drops this future; the child must not outlive it.
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(ProcessOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Executes policy-checked commands of a single external tool.
pub struct CommandExecutor {
    policy: CommandPolicy,
    runner: Arc<dyn ProcessRunner>,
    timeout: Duration,
}

impl CommandExecutor {
    pub fn new(policy: CommandPolicy, timeout: Duration) -> Self {
        Self::with_runner(policy, Arc::new(SystemRunner), timeout)
    }

    pub fn with_runner(
        policy: CommandPolicy,
        runner: Arc<dyn ProcessRunner>,
        timeout: Duration,
    ) -> Self {
        Self {
            policy,
            runner,
            timeout,
        }
    }

    /// Ensures the argument vector starts with the tool name, exactly once.
    /// A leading token that matches case-insensitively is replaced by the canonical name.
    pub fn normalize(&self, parts: &[String]) -> Vec<String> {
        let tool = self.policy.tool();
        let mut argv = Vec::with_capacity(parts.len() + 1);
        argv.push(tool.to_string());

        match parts.split_first() {
            Some((first, rest)) if first.eq_ignore_ascii_case(tool) => argv.extend_from_slice(rest),
            _ => argv.extend_from_slice(parts),
        }
        argv
    }

    pub async fn execute(&self, requested_parts: &[String]) -> CommandResult {
        if requested_parts.is_empty() {
            tracing::warn!("Rejected empty command");
            return CommandResult::new(
                ResultKind::EmptyCommand,
                Vec::new(),
                messages::NO_COMMAND.to_string(),
            );
        }

        let argv = self.normalize(requested_parts);
        let verb = argv.get(1).map(|v| v.to_lowercase()).unwrap_or_default();

        if let PermissionResult::Blocked(reason) = self.policy.check_verb(&verb) {
            tracing::warn!(verb = %verb, "Rejected command verb");
            return CommandResult::new(ResultKind::VerbNotAllowed, argv, reason);
        }

        let line = argv.join(" ");
        tracing::info!(command = %line, "Executing command");

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.runner.run(&argv)).await;
        let elapsed = started.elapsed();

        let mut result = match outcome {
            Err(_) => CommandResult::new(
                ResultKind::Timeout,
                argv,
                messages::command_timed_out(self.timeout.as_secs()),
            ),
            Ok(Err(e)) => CommandResult::new(
                ResultKind::ExecutionError,
                argv,
                messages::execution_error(&e.to_string()),
            ),
            Ok(Ok(output)) if !output.success => {
                let mut result = CommandResult::new(
                    ResultKind::CommandFailed,
                    argv,
                    messages::command_failed(output.stderr.trim()),
                );
                result.stdout = output.stdout;
                result.stderr = output.stderr;
                result
            }
            Ok(Ok(output)) => {
                let trimmed = output.stdout.trim();
                let message = if trimmed.is_empty() {
                    messages::command_no_output(&line)
                } else {
                    messages::command_output(&line, trimmed)
                };
                let mut result = CommandResult::new(ResultKind::Success, argv, message);
                result.stdout = trimmed.to_string();
                result.stderr = output.stderr;
                result
            }
        };
        result.elapsed = elapsed;

        tracing::info!(
            verb = %verb,
            kind = result.kind.as_str(),
            status = ?result.exit_status(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Command finished"
        );
        result
    }
}

pub type SharedCommandExecutor = Arc<CommandExecutor>;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every argv it is asked to run and answers from a fixed script.
    pub(crate) struct FakeRunner {
        pub calls: Mutex<Vec<Vec<String>>>,
        output: ProcessOutput,
        delay: Option<Duration>,
    }

    impl FakeRunner {
        pub(crate) fn ok(stdout: &str) -> Self {
            Self::with_output(ProcessOutput {
                success: true,
                stdout: stdout.to_string(),
                stderr: String::new(),
            })
        }

        pub(crate) fn with_output(output: ProcessOutput) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                output,
                delay: None,
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ProcessRunner for FakeRunner {
        async fn run(&self, argv: &[String]) -> std::io::Result<ProcessOutput> {
            self.calls.lock().unwrap().push(argv.to_vec());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.output.clone())
        }
    }

    struct BrokenRunner;

    #[async_trait]
    impl ProcessRunner for BrokenRunner {
        async fn run(&self, _argv: &[String]) -> std::io::Result<ProcessOutput> {
            Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            ))
        }
    }

    pub(crate) fn kubectl_policy() -> CommandPolicy {
        let config = crate::domain::config::CommandsConfig::default();
        CommandPolicy::new(config.tool, config.allowed_verbs)
    }

    fn executor(runner: Arc<FakeRunner>) -> CommandExecutor {
        CommandExecutor::with_runner(kubectl_policy(), runner, Duration::from_secs(45))
    }

    fn parts(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_get_pods_success() {
        let runner = Arc::new(FakeRunner::ok("NAME   READY\nweb-1  1/1\n"));
        let exec = executor(runner.clone());

        let result = exec.execute(&parts(&["get", "pods", "-n", "default"])).await;

        assert_eq!(result.kind, ResultKind::Success);
        assert_eq!(result.exit_status(), ExitStatus::Success);
        assert!(result.message().starts_with("Command: kubectl get pods -n default"));
        assert_eq!(
            result.message(),
            "Command: kubectl get pods -n default\n\nNAME   READY\nweb-1  1/1"
        );
        assert_eq!(
            runner.calls.lock().unwrap()[0],
            parts(&["kubectl", "get", "pods", "-n", "default"])
        );
    }

    #[tokio::test]
    async fn test_delete_is_rejected_without_spawning() {
        let runner = Arc::new(FakeRunner::ok("should never be seen"));
        let exec = executor(runner.clone());

        let result = exec.execute(&parts(&["delete", "deployment", "x"])).await;

        assert_eq!(result.kind, ResultKind::VerbNotAllowed);
        assert_eq!(result.exit_status(), ExitStatus::Rejected);
        assert_eq!(
            result.message(),
            "Error: Command verb 'delete' is not allowed for safety reasons."
        );
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unlisted_verbs_never_spawn() {
        let runner = Arc::new(FakeRunner::ok("x"));
        let exec = executor(runner.clone());

        for verb in ["apply", "create", "patch", "drain", "port-forward", "cp"] {
            let result = exec.execute(&parts(&[verb, "something"])).await;
            assert_eq!(result.kind, ResultKind::VerbNotAllowed, "{verb}");
        }
        // Tool name alone leaves an empty verb.
        let result = exec.execute(&parts(&["kubectl"])).await;
        assert_eq!(result.kind, ResultKind::VerbNotAllowed);
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_command() {
        let runner = Arc::new(FakeRunner::ok("x"));
        let exec = executor(runner.clone());

        let result = exec.execute(&[]).await;

        assert_eq!(result.kind, ResultKind::EmptyCommand);
        assert_eq!(result.message(), "Error: No command provided.");
        assert!(result.invocation.is_empty());
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn test_normalize_prefixes_exactly_once() {
        let exec = executor(Arc::new(FakeRunner::ok("")));

        assert_eq!(
            exec.normalize(&parts(&["get", "pods"])),
            parts(&["kubectl", "get", "pods"])
        );
        assert_eq!(
            exec.normalize(&parts(&["kubectl", "get", "pods"])),
            parts(&["kubectl", "get", "pods"])
        );
        assert_eq!(
            exec.normalize(&parts(&["KubeCtl", "logs", "web"])),
            parts(&["kubectl", "logs", "web"])
        );
        assert_eq!(exec.normalize(&parts(&["top"])), parts(&["kubectl", "top"]));
    }

    #[tokio::test]
    async fn test_uppercase_verb_allowed() {
        let runner = Arc::new(FakeRunner::ok("ok"));
        let exec = executor(runner.clone());

        let result = exec.execute(&parts(&["kubectl", "GET", "nodes"])).await;

        assert_eq!(result.kind, ResultKind::Success);
        // Arguments pass through untouched.
        assert_eq!(runner.calls.lock().unwrap()[0], parts(&["kubectl", "GET", "nodes"]));
    }

    #[tokio::test]
    async fn test_success_without_output() {
        let exec = executor(Arc::new(FakeRunner::ok("  \n")));

        let result = exec.execute(&parts(&["scale", "deploy/web", "--replicas=2"])).await;

        assert_eq!(result.kind, ResultKind::Success);
        assert_eq!(
            result.message(),
            "Command: kubectl scale deploy/web --replicas=2\nSuccess (no output)"
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr() {
        let runner = Arc::new(FakeRunner::with_output(ProcessOutput {
            success: false,
            stdout: String::new(),
            stderr: "Error from server (NotFound): pods \"web\" not found\n".to_string(),
        }));
        let exec = executor(runner);

        let result = exec.execute(&parts(&["describe", "pod", "web"])).await;

        assert_eq!(result.kind, ResultKind::CommandFailed);
        assert_eq!(result.exit_status(), ExitStatus::Failure);
        assert_eq!(
            result.message(),
            "Error:\nError from server (NotFound): pods \"web\" not found"
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit_without_stderr() {
        let exec = executor(Arc::new(FakeRunner::with_output(ProcessOutput::default())));

        let result = exec.execute(&parts(&["get", "pods"])).await;

        assert_eq!(result.kind, ResultKind::CommandFailed);
        assert_eq!(result.message(), "Error:\nCommand failed");
    }

    #[tokio::test]
    async fn test_timeout() {
        let runner = Arc::new(FakeRunner {
            calls: Mutex::new(Vec::new()),
            output: ProcessOutput {
                success: true,
                stdout: "late output".to_string(),
                stderr: String::new(),
            },
            delay: Some(Duration::from_secs(5)),
        });
        let exec = CommandExecutor::with_runner(kubectl_policy(), runner, Duration::from_millis(50));

        let result = exec.execute(&parts(&["logs", "web", "-f"])).await;

        assert_eq!(result.kind, ResultKind::Timeout);
        assert_eq!(result.exit_status(), ExitStatus::Timeout);
        assert!(result.stdout.is_empty());
        assert_eq!(result.message(), "Error: Command timed out after 0 seconds");
    }

    #[tokio::test]
    async fn test_spawn_error() {
        let exec = CommandExecutor::with_runner(
            kubectl_policy(),
            Arc::new(BrokenRunner),
            Duration::from_secs(45),
        );

        let result = exec.execute(&parts(&["get", "pods"])).await;

        assert_eq!(result.kind, ResultKind::ExecutionError);
        assert_eq!(result.message(), "Execution error: permission denied");
    }

    #[tokio::test]
    async fn test_payload_shape() {
        let exec = executor(Arc::new(FakeRunner::ok("hello")));

        let ok = exec.execute(&parts(&["get", "ns"])).await.to_payload();
        assert_eq!(ok["kind"], "success");
        assert_eq!(ok["result"], "Command: kubectl get ns\n\nhello");
        assert!(ok.get("error").is_none());

        let denied = exec.execute(&parts(&["delete", "ns", "prod"])).await.to_payload();
        assert_eq!(denied["kind"], "verb_not_allowed");
        assert!(denied["error"].as_str().unwrap().contains("'delete'"));
        assert!(denied.get("result").is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_real_process_output() {
        let exec = CommandExecutor::new(CommandPolicy::new("echo", ["get"]), Duration::from_secs(5));

        let result = exec.execute(&parts(&["get", "pods; rm -rf /"])).await;

        // No shell: the metacharacters are echoed back verbatim.
        assert_eq!(result.kind, ResultKind::Success);
        assert_eq!(result.stdout, "get pods; rm -rf /");
        assert_eq!(result.message(), "Command: echo get pods; rm -rf /\n\nget pods; rm -rf /");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_real_process_timeout() {
        let exec = CommandExecutor::new(CommandPolicy::new("sleep", ["5"]), Duration::from_millis(200));

        let result = exec.execute(&parts(&["5"])).await;

        assert_eq!(result.kind, ResultKind::Timeout);
        assert!(result.elapsed < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_real_missing_binary() {
        let exec = CommandExecutor::new(
            CommandPolicy::new("kubechat-no-such-binary", ["get"]),
            Duration::from_secs(5),
        );

        let result = exec.execute(&parts(&["get", "pods"])).await;

        assert_eq!(result.kind, ResultKind::ExecutionError);
        assert!(result.message().starts_with("Execution error: "));
    }
}
