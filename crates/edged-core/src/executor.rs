// ── Single-flight command execution ──
//
// `ExecutorCoordinator` launches the daemon's interactive control command
// (`tailscale up` and friends) in the background, at most one at a time.
// The slot lives behind one mutex shared by every clone; the in-flight
// count is mirrored on a watch channel so shutdown can wait for it to
// reach zero.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use strum::Display;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::CoreError;

// ── Output sinks ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Destination for raw command output.
pub trait OutputSink: Send + Sync {
    fn write(&self, stream: OutputStream, data: &[u8]);
}

/// Logs command output line by line through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn write(&self, stream: OutputStream, data: &[u8]) {
        let text = String::from_utf8_lossy(data);
        for line in text.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
            info!(target: "edged::command", %stream, "{line}");
        }
    }
}

// ── Runners ──────────────────────────────────────────────────────────

/// Launches one command invocation and resolves when it exits.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        args: Vec<String>,
        sink: Arc<dyn OutputSink>,
    ) -> BoxFuture<'static, Result<(), CoreError>>;
}

/// Runs the control binary as a child process, forwarding its output.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }
}

impl CommandRunner for ProcessRunner {
    fn run(
        &self,
        args: Vec<String>,
        sink: Arc<dyn OutputSink>,
    ) -> BoxFuture<'static, Result<(), CoreError>> {
        let program = self.program.clone();
        Box::pin(async move {
            let command = format!("{} {}", program.display(), args.join(" "));
            let failed = |reason: String| CoreError::CommandFailed {
                command: command.clone(),
                reason,
            };

            let mut child = Command::new(&program)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(|e| failed(format!("spawn failed: {e}")))?;
            debug!(%command, pid = ?child.id(), "control command started");

            let stdout = child.stdout.take();
            let stderr = child.stderr.take();
            let (status, (), ()) = tokio::join!(
                child.wait(),
                forward(stdout, OutputStream::Stdout, sink.as_ref()),
                forward(stderr, OutputStream::Stderr, sink.as_ref()),
            );

            let status = status.map_err(|e| failed(format!("wait failed: {e}")))?;
            if status.success() {
                debug!(%command, "control command finished");
                Ok(())
            } else {
                Err(failed(format!("exited with {status}")))
            }
        })
    }
}

/// Copy a child pipe into the sink in 4 KiB chunks until EOF.
async fn forward<R>(reader: Option<R>, stream: OutputStream, sink: &dyn OutputSink)
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return;
    };
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => sink.write(stream, &buf[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                // Dropping the pipe makes further child writes fail instead
                // of blocking on a full buffer.
                warn!(%stream, error = %e, "stopped forwarding control command output");
                break;
            }
        }
    }
}

// ── Coordinator ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Slot {
    running: bool,
    in_flight: usize,
}

struct Inner {
    slot: Mutex<Slot>,
    in_flight_tx: watch::Sender<usize>,
    runner: Arc<dyn CommandRunner>,
    sink: Arc<dyn OutputSink>,
}

impl Inner {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Single-flight launcher for the control command.
///
/// Cheaply cloneable; all clones share one slot.
#[derive(Clone)]
pub struct ExecutorCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ExecutorCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.inner.slot();
        f.debug_struct("ExecutorCoordinator")
            .field("running", &slot.running)
            .field("in_flight", &slot.in_flight)
            .finish_non_exhaustive()
    }
}

impl ExecutorCoordinator {
    /// Coordinator that runs `program` as a child process and logs its
    /// output through `tracing`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self::with_runner(Arc::new(ProcessRunner::new(program)), Arc::new(TracingSink))
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>, sink: Arc<dyn OutputSink>) -> Self {
        let (in_flight_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(Slot::default()),
                in_flight_tx,
                runner,
                sink,
            }),
        }
    }

    /// Launch the command in the background.
    ///
    /// Fails immediately with `ExecutionConflict` if a launch is already
    /// in flight. Failures of the command itself are written to the
    /// sink's stderr stream, not returned. Must be called within a tokio
    /// runtime.
    pub fn run<I, S>(&self, args: I) -> Result<(), CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        {
            let mut slot = self.inner.slot();
            if slot.running {
                return Err(CoreError::ExecutionConflict);
            }
            slot.running = true;
            slot.in_flight += 1;
            self.inner.in_flight_tx.send_replace(slot.in_flight);
        }

        let guard = SlotGuard {
            inner: Arc::clone(&self.inner),
        };
        let runner = Arc::clone(&self.inner.runner);
        let sink = Arc::clone(&self.inner.sink);
        debug!(?args, "launching control command");

        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = runner.run(args, Arc::clone(&sink)).await {
                warn!(error = %e, "control command failed");
                sink.write(OutputStream::Stderr, format!("{e}\n").as_bytes());
            }
        });
        Ok(())
    }

    /// Whether a launch is currently in flight.
    pub fn is_running(&self) -> bool {
        self.inner.slot().running
    }

    pub fn in_flight(&self) -> usize {
        self.inner.slot().in_flight
    }

    /// Resolve once no launch is in flight.
    pub async fn wait_for_all(&self) {
        let mut rx = self.inner.in_flight_tx.subscribe();
        // The sender lives in `inner`, which `self` keeps alive.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

/// Releases the slot when the launched task ends, including by panic
/// or cancellation.
struct SlotGuard {
    inner: Arc<Inner>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut slot = self.inner.slot();
        slot.running = false;
        slot.in_flight = slot.in_flight.saturating_sub(1);
        self.inner.in_flight_tx.send_replace(slot.in_flight);
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::ReadBuf;

    use super::*;

    #[derive(Default)]
    struct CollectingSink(Mutex<Vec<u8>>);

    impl OutputSink for CollectingSink {
        fn write(&self, _stream: OutputStream, data: &[u8]) {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(data);
        }
    }

    /// Yields one chunk, then fails; panics if read after the failure.
    struct BrokenPipe {
        reads: usize,
    }

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            self.reads += 1;
            match self.reads {
                1 => {
                    buf.put_slice(b"logging in\n");
                    Poll::Ready(Ok(()))
                }
                2 => Poll::Ready(Err(io::Error::other("pipe broke"))),
                _ => panic!("read after error"),
            }
        }
    }

    #[tokio::test]
    async fn forward_stops_at_read_error_after_delivering_output() {
        let sink = CollectingSink::default();
        forward(Some(BrokenPipe { reads: 0 }), OutputStream::Stdout, &sink).await;

        let written = sink.0.into_inner().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(written, b"logging in\n");
    }

    #[tokio::test]
    async fn forward_without_pipe_is_a_no_op() {
        let sink = CollectingSink::default();
        forward(None::<BrokenPipe>, OutputStream::Stderr, &sink).await;
        assert!(sink.0.into_inner().unwrap_or_else(PoisonError::into_inner).is_empty());
    }
}
