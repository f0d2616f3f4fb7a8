use anyhow::Context;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub duration: f64,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub exit_code: Option<i32>,
    pub failure_reason: Option<String>,
}

/// Run one toolchain invocation with piped output. Both streams are
/// forwarded line-by-line to the callback as they arrive, interleaved in
/// arrival order, and collected for the result.
pub async fn execute_step<F>(command: &[String], mut output_callback: F) -> anyhow::Result<ExecutionResult>
where
    F: FnMut(String) + Send + 'static,
{
    let start = Instant::now();

    let program = &command[0];
    let args = &command[1..];

    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn command: {}", program))?;

    let stdout = child.stdout.take().context("Failed to capture stdout")?;
    let stderr = child.stderr.take().context("Failed to capture stderr")?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let tx_stdout = tx.clone();
    let stdout_task = tokio::spawn(async move {
        let mut lines = Vec::new();
        let mut reader = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            lines.push(line.clone());
            tx_stdout
                .send(line)
                .expect("Failed to send stdout line to channel");
        }
        lines
    });

    let stderr_task = tokio::spawn(async move {
        let mut lines = Vec::new();
        let mut reader = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            lines.push(line.clone());
            tx.send(line)
                .expect("Failed to send stderr line to channel");
        }
        lines
    });

    let callback_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            output_callback(line);
        }
    });

    let status = child
        .wait()
        .await
        .context("Failed to wait for child process")?;

    let stdout_lines = stdout_task.await.context("stdout task panicked")?;
    let stderr_lines = stderr_task.await.context("stderr task panicked")?;

    // both senders are gone once the reader tasks finish, so this drains
    // the channel and ends
    callback_task.await.context("callback task panicked")?;

    let duration = start.elapsed().as_secs_f64();
    let exit_code = status.code();
    let failure_reason = if !status.success() {
        exit_code.map(|code| format!("Exit code {}", code))
    } else {
        None
    };

    Ok(ExecutionResult {
        success: status.success(),
        duration,
        stdout: stdout_lines,
        stderr: stderr_lines,
        exit_code,
        failure_reason,
    })
}

/// Run a produced binary interactively: standard streams are inherited
/// so the program owns the console until it exits.
pub async fn execute_binary(path: &Path, working_dir: &Path) -> anyhow::Result<ExecutionResult> {
    let start = Instant::now();

    // current_dir takes effect in the child before the program path is
    // resolved, so a relative path has to be absolutized here first
    let program = path
        .canonicalize()
        .with_context(|| format!("Failed to locate executable: {}", path.display()))?;

    let status = Command::new(program)
        .current_dir(working_dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .with_context(|| format!("Failed to run executable: {}", path.display()))?;

    let duration = start.elapsed().as_secs_f64();
    let exit_code = status.code();
    let mut failure_reason: Option<String> = None;

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            failure_reason = Some(format!("Signal {} ({})", signal, signal_name(signal)));
        }
    }

    if failure_reason.is_none() && !status.success() {
        failure_reason = match exit_code {
            Some(code) => Some(format!("Exit code {}", code)),
            None => Some("Abnormal termination".to_string()),
        };
    }

    Ok(ExecutionResult {
        success: status.success(),
        duration,
        stdout: vec![],
        stderr: vec![],
        exit_code,
        failure_reason,
    })
}

#[cfg(unix)]
fn signal_name(signal: i32) -> &'static str {
    match signal {
        1 => "SIGHUP (Hangup)",
        2 => "SIGINT (Interrupt)",
        3 => "SIGQUIT (Quit)",
        4 => "SIGILL (Illegal instruction)",
        6 => "SIGABRT (Abort)",
        8 => "SIGFPE (Floating point exception)",
        9 => "SIGKILL (Killed)",
        11 => "SIGSEGV (Segmentation fault)",
        13 => "SIGPIPE (Broken pipe)",
        15 => "SIGTERM (Terminated)",
        _ => "Unknown signal",
    }
}
