//! Mock runner for testing.
//!
//! Records every `(host, command)` pair and serves pre-configured outputs in
//! FIFO order, making polling call sites deterministic in tests. Clones share
//! the same script and history.

use super::{CommandOutput, CommandRunner};
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Default)]
struct MockState {
    responses: VecDeque<CommandOutput>,
    calls: Vec<(String, String)>,
}

/// A test-double that records calls and returns scripted outputs.
///
/// Once the script is exhausted every call succeeds with empty output.
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    state: Arc<Mutex<MockState>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock with a prepared script
    pub fn with_outputs(outputs: Vec<CommandOutput>) -> Self {
        let mock = Self::new();
        mock.state.lock().responses.extend(outputs);
        mock
    }

    /// Queue a successful response
    pub fn push_ok(&self, stdout: impl Into<String>) -> &Self {
        self.push(CommandOutput::ok(stdout))
    }

    /// Queue a failed response
    pub fn push_failure(&self, exit_code: i32, stderr: impl Into<String>) -> &Self {
        self.push(CommandOutput::failed(exit_code, stderr))
    }

    /// Queue an arbitrary response
    pub fn push(&self, output: CommandOutput) -> &Self {
        self.state.lock().responses.push_back(output);
        self
    }

    /// Commands executed so far, in order
    pub fn executed_commands(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .map(|(_, cmd)| cmd.clone())
            .collect()
    }

    /// Hosts and commands executed so far, in order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.state.lock().calls.clone()
    }

    /// Number of scripted responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.state.lock().responses.len()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, host: &str, command: &str) -> Result<CommandOutput> {
        let mut state = self.state.lock();
        state.calls.push((host.to_string(), command.to_string()));
        Ok(state.responses.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_runner_records_calls() {
        let runner = MockRunner::new();
        runner.push_ok("ok").push_ok("ok2");
        runner.run("master", "oc get pods").unwrap();
        runner.run("node1", "oc get pv").unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                ("master".to_string(), "oc get pods".to_string()),
                ("node1".to_string(), "oc get pv".to_string()),
            ]
        );
    }

    #[test]
    fn mock_runner_returns_responses_in_order() {
        let runner = MockRunner::with_outputs(vec![
            CommandOutput::ok("first"),
            CommandOutput::failed(1, "fail"),
            CommandOutput::ok("third"),
        ]);
        assert_eq!(runner.run("h", "cmd1").unwrap().stdout, "first");
        assert_eq!(runner.run("h", "cmd2").unwrap().exit_code, 1);
        assert_eq!(runner.run("h", "cmd3").unwrap().stdout, "third");
        assert_eq!(runner.remaining(), 0);
    }

    #[test]
    fn mock_runner_defaults_to_empty_success() {
        let runner = MockRunner::new();
        let output = runner.run("h", "anything").unwrap();
        assert!(output.success());
        assert!(output.stdout.is_empty());
    }

    #[test]
    fn mock_runner_clones_share_state() {
        let runner = MockRunner::new();
        let clone = runner.clone();
        clone.push_ok("shared");
        assert_eq!(runner.run("h", "cmd").unwrap().stdout, "shared");
        assert_eq!(clone.executed_commands(), vec!["cmd".to_string()]);
    }
}
