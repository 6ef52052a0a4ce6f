use async_trait::async_trait;
use std::process::Stdio;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::{Child, Command},
    time::{self, Duration, Instant},
};
use tracing::{debug, warn};

use crate::{error::Error, languages::Invocation, types::ProcessOutcome};

const READ_CHUNK: usize = 8 * 1024;

/// How long to keep collecting already-buffered output after a forced kill
const KILL_DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Runs one interpreter invocation to completion or until `timeout`.
///
/// Implementations decide how much isolation the process gets; the evaluator
/// only sees the resulting [`ProcessOutcome`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(
        &self,
        invocation: &Invocation,
        input: &str,
        timeout: Duration,
    ) -> Result<ProcessOutcome, Error>;
}

/// Executes the interpreter as a direct child process.
#[derive(Debug, Clone, Default)]
pub struct DirectExecutor {
    /// Per-stream byte ceiling; bytes past it are read and discarded
    capture_limit: Option<usize>,
}

impl DirectExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capture_limit(mut self, bytes: usize) -> Self {
        self.capture_limit = Some(bytes);
        self
    }
}

#[async_trait]
impl Executor for DirectExecutor {
    async fn run(
        &self,
        invocation: &Invocation,
        input: &str,
        timeout: Duration,
    ) -> Result<ProcessOutcome, Error> {
        debug!(
            invocation = %invocation,
            timeout_ms = timeout.as_millis() as u64,
            input_bytes = input.len(),
            "Spawning process"
        );

        let mut command = Command::new(&invocation.command);
        command
            .args(&invocation.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group, so a timeout can take down anything it forked
        #[cfg(unix)]
        command.process_group(0);

        let started = Instant::now();
        let mut child = command.spawn().map_err(|source| Error::Spawn {
            command: invocation.command.clone(),
            source,
        })?;
        // Also the process group id. Kept because `Child::id` turns `None`
        // once the leader is reaped, while its group can still be alive.
        let pid = child.id();

        // Fed from its own task: a program that never reads stdin must not
        // stall output collection.
        let stdin = child.stdin.take();
        let input = input.as_bytes().to_vec();
        let feeder = tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                if !input.is_empty() {
                    if let Err(e) = stdin.write_all(&input).await {
                        debug!(error = %e, "Program closed stdin before reading all input");
                    }
                }
            }
        });

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Process("stdout was not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Process("stderr was not captured".to_string()))?;
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();
        let limit = self.capture_limit;

        let finished = time::timeout(timeout, async {
            let (status, out, err) = tokio::join!(
                child.wait(),
                capture(&mut stdout, &mut stdout_buf, limit),
                capture(&mut stderr, &mut stderr_buf, limit),
            );
            out.and(err).and(status)
        })
        .await;

        let (status, runtime_ms, was_killed) = match finished {
            Ok(status) => (status?, elapsed_ms(started), false),
            Err(_) => {
                kill_process_tree(&mut child, pid);
                let status = child.wait().await?;
                let runtime_ms = elapsed_ms(started);

                let _ = time::timeout(KILL_DRAIN_GRACE, async {
                    tokio::join!(
                        capture(&mut stdout, &mut stdout_buf, limit),
                        capture(&mut stderr, &mut stderr_buf, limit),
                    )
                })
                .await;

                (status, runtime_ms, true)
            }
        };
        feeder.abort();

        let outcome = ProcessOutcome {
            exit_code: status.code(),
            runtime_ms,
            was_killed,
            stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
            stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
        };

        debug!(
            exit_code = ?outcome.exit_code,
            runtime_ms,
            killed = was_killed,
            stdout_bytes = stdout_buf.len(),
            stderr_bytes = stderr_buf.len(),
            "Process finished"
        );

        Ok(outcome)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Reads until EOF, appending to `buf`. Safe to resume after cancellation.
async fn capture<R>(reader: &mut R, buf: &mut Vec<u8>, limit: Option<usize>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        let keep = limit.map_or(n, |limit| limit.saturating_sub(buf.len()).min(n));
        buf.extend_from_slice(&chunk[..keep]);
    }
}

/// SIGKILL for the child's whole process group, falling back to the child alone.
fn kill_process_tree(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    {
        use nix::{
            errno::Errno,
            sys::signal::{killpg, Signal},
            unistd::Pid,
        };

        if let Some(pid) = pid {
            match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => return,
                Err(e) => warn!(pid, error = %e, "Failed to kill process group"),
            }
        }
    }

    #[cfg(not(unix))]
    let _ = pid;

    if let Err(e) = child.start_kill() {
        warn!(error = %e, "Failed to kill process");
    }
}
