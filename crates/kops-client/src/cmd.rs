//! External command runners
//!
//! Two execution modes: a streaming runner that forwards child output
//! line by line into the operator log (replace, update, rolling-update,
//! delete), and a capturing runner that buffers stdout for structured
//! parsing (validate, list).
//!
//! Neither runner imposes a timeout; long kops operations block the
//! calling reconcile worker by design.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::KopsError;

/// How many trailing stderr lines the streaming runner retains for
/// error reporting.
const STDERR_TAIL_LINES: usize = 20;

/// Runs a command, interleaving its output live into the log.
///
/// Returns only success or failure; stdout is not machine-consumed.
/// On non-zero exit the retained stderr tail is attached to the error.
pub(crate) async fn run_streaming(
    description: &str,
    program: &str,
    args: &[String],
) -> Result<(), KopsError> {
    debug!("Running {}: {} {}", description, program, args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let out_task = async {
        if let Some(stdout) = stdout {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!("{}: {}", description, line);
            }
        }
    };

    let err_task = async {
        let mut tail = Vec::new();
        if let Some(stderr) = stderr {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!("{}: {}", description, line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.remove(0);
                }
                tail.push(line);
            }
        }
        tail
    };

    let ((), tail) = tokio::join!(out_task, err_task);
    let status = child.wait().await?;

    if status.success() {
        Ok(())
    } else {
        Err(KopsError::Command {
            description: description.to_string(),
            code: status.code(),
            stderr: tail.join("\n"),
        })
    }
}

/// Runs a command and buffers stdout for structured parsing.
///
/// Non-zero exit surfaces as an error carrying the full stderr.
pub(crate) async fn run_capturing(
    description: &str,
    program: &str,
    args: &[String],
) -> Result<Vec<u8>, KopsError> {
    debug!("Running {}: {} {}", description, program, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(KopsError::Command {
            description: description.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn capturing_returns_stdout() {
        let out = run_capturing("echo", "sh", &args(&["-c", "printf hello"]))
            .await
            .unwrap();
        assert_eq!(out, b"hello");
    }

    #[tokio::test]
    async fn capturing_surfaces_exit_code_and_stderr() {
        let err = run_capturing("fail", "sh", &args(&["-c", "echo boom >&2; exit 3"]))
            .await
            .unwrap_err();
        match err {
            KopsError::Command { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn streaming_succeeds_on_zero_exit() {
        run_streaming("echo", "sh", &args(&["-c", "echo line1; echo line2"]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn streaming_exit_one_is_not_found() {
        let err = run_streaming("get cluster", "sh", &args(&["-c", "echo absent >&2; exit 1"]))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        match err {
            KopsError::Command { stderr, .. } => assert_eq!(stderr, "absent"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_io_error() {
        let err = run_capturing("noop", "/nonexistent/kops-test-binary", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, KopsError::Io(_)));
    }
}
