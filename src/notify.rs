//! Optional hand-off of the saved final prompt to an external command.
//!
//! Typical commands are clipboard tools (`pbcopy`, `wl-copy`, `xclip -sel
//! clip`). The prompt is written to the command's stdin. Saving never depends
//! on the notifier: a missing notifier is skipped and a failing one is
//! reported as an outcome, not an error.
use anyhow::{anyhow, Context, Result};
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

/// Environment variable naming the default notify command.
pub const NOTIFY_ENV: &str = "PROMPTBUSTER_NOTIFY";

/// Receiver of the final prompt after it has been saved.
pub trait FinalPromptNotifier {
    fn notify(&self, prompt: &str) -> Result<()>;
}

/// Pipes the prompt into a user-configured command.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    argv: Vec<String>,
}

impl CommandNotifier {
    /// Parse a shell-style command line.
    pub fn parse(command: &str) -> Result<Self> {
        let argv = shell_words::split(command)
            .with_context(|| format!("parse notify command: {command}"))?;
        if argv.is_empty() {
            return Err(anyhow!("notify command is empty"));
        }
        Ok(Self { argv })
    }
}

impl FinalPromptNotifier for CommandNotifier {
    fn notify(&self, prompt: &str) -> Result<()> {
        let mut child = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn notify command: {}", self.argv[0]))?;

        // A command may exit without draining stdin; its status decides.
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(err) = stdin.write_all(prompt.as_bytes()) {
                if err.kind() != ErrorKind::BrokenPipe {
                    return Err(err).context("write prompt to notify stdin");
                }
            }
        }

        let output = child.wait_with_output().context("wait for notify command")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "notify command failed with status {}: {}",
                output.status,
                stderr.trim()
            ));
        }
        Ok(())
    }
}

/// What happened when the final prompt was handed off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Skipped,
    Delivered,
    Failed(String),
}

/// Hand the prompt to `notifier` if there is one; never fails.
pub fn notify_final_prompt(
    notifier: Option<&dyn FinalPromptNotifier>,
    prompt: &str,
) -> NotifyOutcome {
    let Some(notifier) = notifier else {
        return NotifyOutcome::Skipped;
    };
    match notifier.notify(prompt) {
        Ok(()) => NotifyOutcome::Delivered,
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "final prompt notifier failed");
            NotifyOutcome::Failed(format!("{err:#}"))
        }
    }
}
