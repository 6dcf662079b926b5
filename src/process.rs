//! External Process Runner
//!
//! One synchronous call per process: spawn, wait with a deadline, capture
//! both streams. A process that outlives its deadline is killed.

use std::ffi::OsString;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// How long captured streams may keep draining once the process is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// A command line to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// What came back from one process run.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code; `None` when killed by a signal or by the timeout.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Both streams, for diagnostics.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Seam for running external programs; tests substitute a fake.
pub trait ProcessRunner {
    /// `Err` only when the process could not be started or waited on.
    fn run(&self, invocation: &Invocation, timeout: Duration) -> io::Result<ProcessOutput>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, invocation: &Invocation, timeout: Duration) -> io::Result<ProcessOutput> {
        (**self).run(invocation, timeout)
    }
}

/// Runs real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            // A read error just truncates the captured output.
            let _ = stream.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// A stray descendant can hold the pipe open forever; the reader thread is
/// left behind rather than joined.
fn collect(rx: &Receiver<String>, limit: Duration) -> String {
    rx.recv_timeout(limit).unwrap_or_default()
}

#[cfg(unix)]
fn isolate(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate(_command: &mut Command) {}

/// Kill the child and, on unix, every process in its group.
fn kill_tree(child: &mut Child) -> io::Result<()> {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: plain syscall; the group id is the child's pid.
            unsafe {
                libc::kill(-pgid, libc::SIGKILL);
            }
        }
    }
    match child.kill() {
        Ok(()) => Ok(()),
        // Exited before the kill landed.
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
        Err(e) => Err(e),
    }
}

/// `Ok(None)` when the deadline passed first.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation, timeout: Duration) -> io::Result<ProcessOutput> {
        let started_at = Instant::now();
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        isolate(&mut command);
        let mut child = command.spawn()?;

        // Drain while waiting; a full pipe would stall the child.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let (exit_code, timed_out) = match wait_with_deadline(&mut child, timeout)? {
            Some(status) => (status.code(), false),
            None => {
                tracing::warn!(
                    op = "process::run",
                    command = %invocation,
                    timeout_ms = timeout.as_millis() as u64,
                    "process exceeded timeout, killing"
                );
                kill_tree(&mut child)?;
                child.wait()?;
                (None, true)
            }
        };

        let output = ProcessOutput {
            exit_code,
            stdout: collect(&stdout, DRAIN_GRACE),
            stderr: collect(&stderr, DRAIN_GRACE),
            elapsed: started_at.elapsed(),
            timed_out,
        };
        tracing::debug!(
            op = "process::run",
            command = %invocation,
            exit_code = ?output.exit_code,
            elapsed_ms = output.elapsed.as_millis() as u64,
            "process finished"
        );
        Ok(output)
    }
}
