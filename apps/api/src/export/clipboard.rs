//! Copies text to the system clipboard by piping it into the platform's clipboard tool.

use std::process::Stdio;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CopyOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A clipboard tool invocation that reads the text from stdin.
#[derive(Debug, Clone, Copy)]
pub struct ClipboardCommand {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

/// Tried in order; the first one that runs successfully wins.
pub const PLATFORM_COMMANDS: &[ClipboardCommand] = &[
    ClipboardCommand {
        program: "pbcopy",
        args: &[],
    },
    ClipboardCommand {
        program: "wl-copy",
        args: &[],
    },
    ClipboardCommand {
        program: "xclip",
        args: &["-selection", "clipboard"],
    },
    ClipboardCommand {
        program: "xsel",
        args: &["--clipboard", "--input"],
    },
    ClipboardCommand {
        program: "clip.exe",
        args: &[],
    },
];

/// Never fails; reports `success: false` with the last error when no tool worked.
pub async fn copy_to_clipboard(text: &str) -> CopyOutcome {
    copy_with(PLATFORM_COMMANDS, text).await
}

pub async fn copy_with(commands: &[ClipboardCommand], text: &str) -> CopyOutcome {
    let mut last_error = String::from("no clipboard tool configured");

    for cmd in commands {
        match run(cmd, text).await {
            Ok(()) => {
                debug!("Copied {} bytes to clipboard via {}", text.len(), cmd.program);
                return CopyOutcome {
                    success: true,
                    error: None,
                };
            }
            Err(e) => {
                debug!("Clipboard tool {} unavailable: {e}", cmd.program);
                last_error = format!("{}: {e}", cmd.program);
            }
        }
    }

    CopyOutcome {
        success: false,
        error: Some(last_error),
    }
}

async fn run(cmd: &ClipboardCommand, text: &str) -> std::io::Result<()> {
    let mut child = Command::new(cmd.program)
        .args(cmd.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    // Dropping stdin closes the pipe so the tool sees EOF.
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(text.as_bytes()).await,
        None => Ok(()),
    };

    // A tool that exits early breaks the pipe; its exit status is the better error.
    let status = child.wait().await?;
    if !status.success() {
        return Err(std::io::Error::other(format!("exited with {status}")));
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAT: ClipboardCommand = ClipboardCommand {
        program: "cat",
        args: &[],
    };
    const MISSING: ClipboardCommand = ClipboardCommand {
        program: "definitely-not-a-clipboard-tool",
        args: &[],
    };
    const FALSE: ClipboardCommand = ClipboardCommand {
        program: "false",
        args: &[],
    };

    #[tokio::test]
    async fn test_first_working_tool_wins() {
        let outcome = copy_with(&[MISSING, CAT], "# Performance Profile").await;
        assert!(outcome.success);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_all_tools_missing_reports_error() {
        let outcome = copy_with(&[MISSING], "text").await;
        assert!(!outcome.success);
        assert!(outcome
            .error
            .unwrap()
            .starts_with("definitely-not-a-clipboard-tool"));
    }

    #[tokio::test]
    async fn test_failing_tool_reports_exit_status() {
        let outcome = copy_with(&[FALSE], "text").await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("exited with"));
    }

    #[tokio::test]
    async fn test_no_tools_configured() {
        let outcome = copy_with(&[], "text").await;
        assert_eq!(
            outcome.error.as_deref(),
            Some("no clipboard tool configured")
        );
    }
}
