// judge-core/src/interfaces/mod.rs
// ============================================================================
// Module: Collaborator Interfaces
// Description: The traits the Judge Orchestrator consumes but does not
//              implement: compiler/sandbox, case store, checker,
//              interactor, and progress cache.
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::Case;
use crate::core::CheckerRef;
use crate::core::Fingerprint;
use crate::core::InteractorRef;
use crate::core::ProgressSnapshot;

/// Why a sandboxed execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The process exited normally within all limits.
    Exited,
    /// The process was killed for exceeding the wall-time limit.
    TimedOut,
    /// The process was killed for exceeding the memory limit.
    MemoryExceeded,
    /// The process was killed or exited due to a signal.
    Signalled,
    /// The process produced no output for longer than the idleness
    /// limit (interactive mode only).
    Idle,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Exited => "exited",
            Self::TimedOut => "timed out",
            Self::MemoryExceeded => "memory exceeded",
            Self::Signalled => "signalled",
            Self::Idle => "idle",
        };
        f.write_str(label)
    }
}

/// One sandboxed execution request.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    /// Path to the executable artifact.
    pub artifact: PathBuf,
    /// Argument vector passed to the artifact, excluding argv\[0\].
    pub args: Vec<String>,
    /// File to bind as stdin, if any.
    pub stdin_file: Option<PathBuf>,
    /// File to redirect stdout into.
    pub stdout_file: PathBuf,
    /// File to redirect stderr into.
    pub stderr_file: PathBuf,
    /// Wall time limit in milliseconds.
    pub max_time_ms: u64,
    /// Memory limit in kilobytes.
    pub max_memory_kb: u64,
    /// Idleness limit in milliseconds: if set, the executor kills the
    /// process and reports [`TerminationReason::Idle`] once this long
    /// elapses without new bytes written to `stdout_file`. Batch-mode
    /// requests leave this `None`; only interactive contestants are
    /// subject to idleness enforcement (§4.2).
    pub idle_timeout_ms: Option<u64>,
    /// When true, resource limits are relaxed (used for interactors,
    /// which are trusted per §4.2).
    pub trusted: bool,
}

/// Outcome of one sandboxed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Elapsed wall time in milliseconds.
    pub elapsed_ms: u64,
    /// Peak resident memory in kilobytes.
    pub memory_kb: u64,
    /// Process exit code, absent if terminated by signal.
    pub exit_code: Option<i32>,
    /// Terminating signal number, absent on normal exit.
    pub signal: Option<i32>,
    /// Why the execution ended.
    pub termination: TerminationReason,
}

impl ExecOutcome {
    /// Returns true if the process ran to a normal, unsignalled exit —
    /// the precondition for proceeding to checking in §4.2 step 2.
    #[must_use]
    pub const fn exited_normally(self) -> bool {
        matches!(self.termination, TerminationReason::Exited) && self.signal.is_none()
    }
}

/// Errors from the Submission Builder's `compile` operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("compile failed: {diagnostic}")]
pub struct CompileError {
    /// Compiler diagnostic text, surfaced verbatim as the snapshot
    /// `message` per §7.
    pub diagnostic: String,
}

/// Errors from the Sandboxed Executor.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The artifact could not be spawned (missing binary, permission
    /// denied, resource-limit setup failure).
    #[error("failed to launch artifact: {0}")]
    Spawn(#[source] std::io::Error),
    /// An I/O error occurred wiring stdio or reading resource usage.
    #[error("execution I/O error: {0}")]
    Io(#[source] std::io::Error),
}

/// Compiles a submission and runs its artifact under sandboxed limits.
///
/// Implementations own the scratch workspace for the submission's
/// lifetime; [`SubmissionBuilder::clean`] must be idempotent and must
/// tolerate being called on a builder that never successfully compiled.
pub trait SubmissionBuilder {
    /// Compiles `code` under `lang`, within `time_budget_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] with the compiler's diagnostic text on
    /// failure; this is a terminal verdict, not an infrastructure fault.
    fn compile(&mut self, code: &[u8], lang: &str, time_budget_ms: u64) -> Result<(), CompileError>;

    /// Runs the compiled artifact under the given sandboxed execution
    /// request.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError`] on infrastructure failure (not a verdict).
    fn run(&self, request: &ExecRequest) -> Result<ExecOutcome, ExecError>;

    /// Returns the compiled artifact's path, if compilation succeeded.
    fn artifact_path(&self) -> Option<&Path>;

    /// Deletes the submission's scratch workspace. Idempotent; must
    /// tolerate a builder that never compiled.
    fn clean(&mut self);
}

/// A contestant process spec for interactive judging: the artifact and
/// argv the Interactor spawns as the opposing end of the pipe pair.
#[derive(Debug, Clone)]
pub struct ContestantSpec {
    /// Path to the compiled contestant artifact.
    pub artifact: PathBuf,
    /// Argument vector passed to the artifact.
    pub args: Vec<String>,
    /// Wall time limit applied to the contestant process.
    pub max_time_ms: u64,
    /// Memory limit applied to the contestant process.
    pub max_memory_kb: u64,
}

/// Errors resolving or persisting a case, checker, or interactor from
/// the Fingerprint Store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No blob exists for the given fingerprint.
    #[error("fingerprint {0} is not present in the store")]
    NotFound(Fingerprint),
    /// The blob exists but is malformed (missing input/output file,
    /// missing or unreadable language descriptor).
    #[error("fingerprint {0} is malformed: {1}")]
    Malformed(Fingerprint, String),
    /// An I/O error occurred reading the store.
    #[error("store I/O error: {0}")]
    Io(#[source] std::io::Error),
}

/// Resolves fingerprints to on-disk case, checker, and interactor blobs.
///
/// Read-only from the orchestrator's perspective; the Fingerprint Store
/// layout is a flat directory keyed by fingerprint (§6).
pub trait CaseStore {
    /// Resolves a case fingerprint to its input/output file paths.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] or [`StoreError::Malformed`] if
    /// the case cannot be used as-is.
    fn resolve_case(&self, fingerprint: &Fingerprint) -> Result<Case, StoreError>;

    /// Resolves a checker fingerprint, or the default comparator if
    /// `fingerprint.is_default_checker()`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] or [`StoreError::Malformed`].
    fn resolve_checker(&self, fingerprint: &Fingerprint) -> Result<CheckerRef, StoreError>;

    /// Resolves an interactor fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] or [`StoreError::Malformed`].
    fn resolve_interactor(&self, fingerprint: &Fingerprint) -> Result<InteractorRef, StoreError>;
}

/// A checker's verdict: ACCEPTED or WRONG_ANSWER plus an optional
/// diagnostic message. Never any other [`crate::Verdict`] — a checker
/// only ever distinguishes these two outcomes (§4.2 step 3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// True if the contestant output was judged correct.
    pub accepted: bool,
    /// Checker diagnostic text, if any.
    pub message: Option<String>,
}

/// Errors from invoking a checker or interactor as an infrastructure
/// operation (distinct from the checker reporting WRONG_ANSWER, which is
/// an ordinary [`CheckOutcome`]).
#[derive(Debug, Error)]
pub enum CheckerError {
    /// The checker process could not be launched or crashed.
    #[error("checker execution error: {0}")]
    Exec(#[source] std::io::Error),
    /// The checker produced output that could not be interpreted as a
    /// verdict.
    #[error("checker produced an unparseable verdict: {0}")]
    UnparseableVerdict(String),
}

/// Decides ACCEPTED vs. WRONG_ANSWER given the three-file protocol:
/// input, expected output, contestant output.
pub trait Checker {
    /// Invokes the checker, or the in-process byte comparator when
    /// `checker.is_default()`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckerError`] on infrastructure failure; a checker
    /// disagreeing with the contestant is an ordinary
    /// `Ok(CheckOutcome { accepted: false, .. })`, not an error.
    fn check(
        &self,
        checker: &CheckerRef,
        input_file: &Path,
        expected_output_file: &Path,
        contestant_output_file: &Path,
    ) -> Result<CheckOutcome, CheckerError>;
}

/// Drives one interactive-mode case: spawns the interactor and the
/// contestant, connects them with a bidirectional pipe pair, and
/// produces the checker-facing contestant log.
///
/// Unlike the batch path, the Interactor owns the pipe plumbing and the
/// contestant's process lifetime directly — it does not go back through
/// [`SubmissionBuilder::run`], since that primitive assumes file-redirected
/// stdio rather than a live pipe pair.
pub trait Interactor {
    /// Runs one interactive case.
    ///
    /// Returns the path to the contestant log the checker should read,
    /// alongside the contestant's resource outcome. The interactor
    /// itself is trusted and unbounded in §4.2's sense; only the
    /// contestant's outcome participates in verdict translation.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError`] on infrastructure failure.
    fn interact(
        &self,
        interactor: &InteractorRef,
        case: &Case,
        contestant: &ContestantSpec,
    ) -> Result<(PathBuf, ExecOutcome), ExecError>;
}

/// Errors publishing to the progress cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache backend could not be reached or returned an error.
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Publishes judging progress and the textual report buffer.
///
/// The orchestrator is the sole writer for a given `sub_fingerprint`
/// (§5); implementations need no cross-writer locking.
pub trait ProgressCache {
    /// Publishes `snapshot` at `key` with the given TTL in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the write could not be completed.
    fn publish_snapshot(&self, key: &str, snapshot: &ProgressSnapshot, ttl_secs: u64) -> Result<(), CacheError>;

    /// Publishes the free-form report buffer text at `key` with the
    /// given TTL in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the write could not be completed.
    fn publish_report(&self, key: &str, report: &str, ttl_secs: u64) -> Result<(), CacheError>;
}
