// judge-providers/src/sandbox.rs
// ============================================================================
// Module: Sandboxed Executor
// Description: Runs a built artifact under bounded wall time, CPU time,
//              memory, and file-redirected I/O.
// Purpose: The sole authority on time/memory enforcement per §5.
// Dependencies: std::process, nix::sys::resource, nix::sys::signal
// ============================================================================

#![allow(unsafe_code, reason = "pre_exec resource-limit setup and getrusage require unsafe; every block carries its own SAFETY comment")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::os::unix::process::ExitStatusExt as _;
use std::process::Command;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use judge_core::ExecError;
use judge_core::ExecOutcome;
use judge_core::ExecRequest;
use judge_core::TerminationReason;
use nix::sys::resource::Resource;
use nix::sys::resource::setrlimit;
use nix::sys::signal::Signal;
use nix::sys::signal::kill;
use nix::unistd::Pid;

// ============================================================================
// SECTION: Tuning Constants
// ============================================================================

/// Poll interval for the wall-time / idleness watchdog.
const WATCHDOG_POLL: Duration = Duration::from_millis(25);

/// Extra seconds of CPU-time headroom granted on top of the wall-time
/// budget, so RLIMIT_CPU is a backstop rather than the primary timer —
/// the watchdog thread is the primary wall-clock enforcement mechanism.
const CPU_LIMIT_HEADROOM_SECS: u64 = 2;

/// A process-based implementation of judge-core's sandboxed execution
/// contract.
///
/// Resource limits are enforced two ways: `RLIMIT_AS` and `RLIMIT_CPU`
/// are set in the child before `exec()`, and a watchdog thread
/// separately enforces the wall-clock and idleness budgets by sending
/// `SIGKILL`. Two mechanisms are necessary because `RLIMIT_CPU` bounds
/// CPU time, not wall-clock time, and a process blocked on I/O could
/// otherwise run indefinitely.
#[derive(Debug, Default, Clone, Copy)]
pub struct SandboxedExecutor;

impl SandboxedExecutor {
    /// Builds a new executor. Stateless; configuration is per-request.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Runs `request.artifact` to completion or until a resource limit
    /// kills it.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Spawn`] if the process could not be started
    /// (missing binary, permission denied, resource-limit setup
    /// failure), and [`ExecError::Io`] for failures wiring stdio or
    /// reading resource usage after the process exits.
    pub fn execute(&self, request: &ExecRequest) -> Result<ExecOutcome, ExecError> {
        let stdin = Self::open_stdin(request.stdin_file.as_deref())?;
        let stdout = File::create(&request.stdout_file).map_err(ExecError::Io)?;
        let stderr = File::create(&request.stderr_file).map_err(ExecError::Io)?;

        let mut command = Command::new(&request.artifact);
        command.args(&request.args).stdin(stdin).stdout(stdout).stderr(stderr);

        let max_memory_kb = request.max_memory_kb;
        let cpu_limit_secs = request.max_time_ms.div_ceil(1000).saturating_add(CPU_LIMIT_HEADROOM_SECS);
        let trusted = request.trusted;

        // SAFETY: the closure only calls async-signal-safe functions
        // (`setrlimit`) between fork and exec, and performs no heap
        // allocation or locking; `pre_exec` requires this contract to
        // avoid deadlocking the forked child.
        unsafe {
            command.pre_exec(move || Self::apply_resource_limits(max_memory_kb, cpu_limit_secs, trusted));
        }

        let mut child = command.spawn().map_err(ExecError::Spawn)?;
        let pid = Pid::from_raw(child.id().cast_signed());

        let killed_for_timeout = Arc::new(AtomicBool::new(false));
        let killed_for_idle = Arc::new(AtomicBool::new(false));
        let watchdog = Self::spawn_watchdog(
            pid,
            request.max_time_ms,
            request.idle_timeout_ms,
            request.stdout_file.clone(),
            Arc::clone(&killed_for_timeout),
            Arc::clone(&killed_for_idle),
        );

        let start = Instant::now();
        let status = child.wait().map_err(ExecError::Io)?;
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        watchdog.stop();

        let memory_kb = Self::peak_memory_kb();

        let termination = if killed_for_timeout.load(Ordering::SeqCst) {
            TerminationReason::TimedOut
        } else if killed_for_idle.load(Ordering::SeqCst) {
            TerminationReason::Idle
        } else if memory_kb > request.max_memory_kb {
            TerminationReason::MemoryExceeded
        } else if status.signal().is_some() {
            TerminationReason::Signalled
        } else {
            TerminationReason::Exited
        };

        Ok(ExecOutcome {
            elapsed_ms,
            memory_kb,
            exit_code: status.code(),
            signal: status.signal(),
            termination,
        })
    }

    /// Opens `path` for the child's stdin, or `/dev/null` when absent.
    fn open_stdin(path: Option<&std::path::Path>) -> Result<Stdio, ExecError> {
        match path {
            Some(path) => File::open(path).map(Stdio::from).map_err(ExecError::Io),
            None => Ok(Stdio::null()),
        }
    }

    /// Sets the child's resource limits. Runs after `fork`, before
    /// `exec`, inside the parent's address space copy — see the
    /// `pre_exec` safety note at the call site.
    fn apply_resource_limits(max_memory_kb: u64, cpu_limit_secs: u64, trusted: bool) -> std::io::Result<()> {
        if trusted {
            // Interactors are trusted and run with a relaxed sandbox
            // per §4.2; only a generous CPU backstop applies.
            setrlimit(Resource::RLIMIT_CPU, cpu_limit_secs.saturating_mul(4), cpu_limit_secs.saturating_mul(4))
                .map_err(std::io::Error::from)?;
            return Ok(());
        }
        let memory_bytes = max_memory_kb.saturating_mul(1024);
        setrlimit(Resource::RLIMIT_AS, memory_bytes, memory_bytes).map_err(std::io::Error::from)?;
        setrlimit(Resource::RLIMIT_CPU, cpu_limit_secs, cpu_limit_secs).map_err(std::io::Error::from)?;
        Ok(())
    }

    /// Reads peak resident memory of the most recently reaped child, in
    /// kilobytes, via `getrusage(RUSAGE_CHILDREN)`. Accurate because the
    /// orchestrator runs one child at a time per submission (§5
    /// forbids intra-submission parallelism).
    #[expect(clippy::cast_sign_loss, reason = "ru_maxrss is non-negative for RUSAGE_CHILDREN on Linux")]
    fn peak_memory_kb() -> u64 {
        let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
        // SAFETY: `usage` is a valid, fully-initialized-on-return
        // `libc::rusage` buffer; `getrusage` only writes to it.
        let rc = unsafe { libc::getrusage(libc::RUSAGE_CHILDREN, &raw mut usage) };
        if rc != 0 {
            return 0;
        }
        usage.ru_maxrss.max(0) as u64
    }

    /// Spawns the background thread enforcing `max_time_ms` and, if set,
    /// `idle_timeout_ms` against `pid`, killing it with `SIGKILL` on
    /// either breach.
    fn spawn_watchdog(
        pid: Pid,
        max_time_ms: u64,
        idle_timeout_ms: Option<u64>,
        stdout_file: std::path::PathBuf,
        killed_for_timeout: Arc<AtomicBool>,
        killed_for_idle: Arc<AtomicBool>,
    ) -> Watchdog {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_millis(max_time_ms);
            let mut last_size = std::fs::metadata(&stdout_file).map(|meta| meta.len()).unwrap_or(0);
            let mut last_growth = Instant::now();

            while !stop_flag.load(Ordering::SeqCst) {
                if Instant::now() >= deadline {
                    killed_for_timeout.store(true, Ordering::SeqCst);
                    let _ = kill(pid, Signal::SIGKILL);
                    return;
                }
                if let Some(idle_timeout_ms) = idle_timeout_ms {
                    let current_size = std::fs::metadata(&stdout_file).map(|meta| meta.len()).unwrap_or(last_size);
                    if current_size > last_size {
                        last_size = current_size;
                        last_growth = Instant::now();
                    } else if last_growth.elapsed() >= Duration::from_millis(idle_timeout_ms) {
                        killed_for_idle.store(true, Ordering::SeqCst);
                        let _ = kill(pid, Signal::SIGKILL);
                        return;
                    }
                }
                thread::sleep(WATCHDOG_POLL);
            }
        });
        Watchdog {
            stop,
            handle: Some(handle),
        }
    }
}

/// Handle to the background watchdog thread; stopping it is idempotent
/// and joins the thread so `execute` never returns while the watchdog
/// is still polling a dead process.
struct Watchdog {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Watchdog {
    /// Signals the watchdog thread to stop polling and joins it.
    fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_docs_in_private_items,
    reason = "test assertions use panic-based helpers for clarity"
)]
mod tests {
    use super::*;

    fn base_request(dir: &std::path::Path, artifact: std::path::PathBuf) -> ExecRequest {
        ExecRequest {
            artifact,
            args: Vec::new(),
            stdin_file: None,
            stdout_file: dir.join("stdout"),
            stderr_file: dir.join("stderr"),
            max_time_ms: 2000,
            max_memory_kb: 262_144,
            idle_timeout_ms: None,
            trusted: false,
        }
    }

    #[test]
    fn true_binary_exits_normally() {
        let dir = tempfile::tempdir().expect("tempdir");
        let request = base_request(dir.path(), std::path::PathBuf::from("/bin/true"));
        let executor = SandboxedExecutor::new();
        let outcome = executor.execute(&request).expect("executes");
        assert_eq!(outcome.termination, TerminationReason::Exited);
        assert_eq!(outcome.exit_code, Some(0));
    }

    #[test]
    fn sleep_past_wall_time_is_killed_for_timeout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut request = base_request(dir.path(), std::path::PathBuf::from("/bin/sleep"));
        request.args = vec!["5".to_string()];
        request.max_time_ms = 200;
        let executor = SandboxedExecutor::new();
        let outcome = executor.execute(&request).expect("executes");
        assert_eq!(outcome.termination, TerminationReason::TimedOut);
    }

    #[test]
    fn missing_artifact_is_a_spawn_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let request = base_request(dir.path(), dir.path().join("does-not-exist"));
        let executor = SandboxedExecutor::new();
        let result = executor.execute(&request);
        assert!(matches!(result, Err(ExecError::Spawn(_))));
    }
}
