//! Configuration for PTY-backed terminals
//!
//! Nothing is read from disk: embedders build a [`TerminalConfig`] in code
//! or deserialize one themselves (every field has a default).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Shell used when neither the config nor `$SHELL` names one
pub const FALLBACK_SHELL: &str = "/bin/sh";

/// Settings for the child process of a PTY session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Program to run; `$SHELL` or [`FALLBACK_SHELL`] when unset
    pub shell: Option<String>,
    /// Arguments passed after the program name
    pub shell_args: Vec<String>,
    /// Value of `TERM` in the child environment
    pub term: String,
    /// Extra environment variables for the child, applied last
    pub env: Vec<(String, String)>,
    /// How long terminate waits after SIGHUP before sending SIGKILL
    pub terminate_grace_ms: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            shell: None,
            shell_args: Vec::new(),
            term: "xterm-256color".to_string(),
            env: Vec::new(),
            terminate_grace_ms: 100,
        }
    }
}

impl TerminalConfig {
    /// Config that runs `program` with `args` instead of a shell
    pub fn command<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            shell: Some(program.into()),
            shell_args: args.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// The program to execute
    pub fn resolve_shell(&self) -> String {
        self.shell
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| std::env::var("SHELL").ok().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| FALLBACK_SHELL.to_string())
    }

    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }

    /// Variables set in the child on top of the inherited environment
    pub fn child_env(&self) -> Vec<(String, String)> {
        let mut env = vec![
            ("TERM".to_string(), self.term.clone()),
            ("COLORTERM".to_string(), "truecolor".to_string()),
        ];
        env.extend(self.env.iter().cloned());
        env
    }
}
