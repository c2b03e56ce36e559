// judge-core/src/runtime/case_runner.rs
// ============================================================================
// Module: CaseRunner
// Description: Batch per-case harness: run under the sandbox, then check.
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use crate::core::Case;
use crate::core::CaseResult;
use crate::core::CaseVerdict;
use crate::core::CheckerRef;
use crate::core::Verdict;
use crate::interfaces::Checker;
use crate::interfaces::CheckerError;
use crate::interfaces::ExecError;
use crate::interfaces::ExecOutcome;
use crate::interfaces::ExecRequest;
use crate::interfaces::SubmissionBuilder;
use crate::interfaces::TerminationReason;

/// Errors a [`CaseRunner`] cannot translate into an ordinary
/// [`CaseVerdict`] — infrastructure faults that the orchestrator surfaces
/// as `JUDGEMENT_FAILED` rather than unwinding past the case boundary.
#[derive(Debug, thiserror::Error)]
pub enum CaseRunnerError {
    /// The sandboxed executor could not run the artifact.
    #[error(transparent)]
    Exec(#[from] ExecError),
    /// The checker could not be invoked or produced no verdict.
    #[error(transparent)]
    Checker(#[from] CheckerError),
}

/// Runs one batch-mode case: sandboxed execution, then checking.
///
/// Bound to `(submission, max_time, max_memory, report_buffer)` for the
/// submission's lifetime per §4.1 step 4; the report buffer is append-
/// only text shared with the orchestrator.
pub struct CaseRunner<'a> {
    builder: &'a dyn SubmissionBuilder,
    checker: &'a dyn Checker,
    max_time_ms: u64,
    max_memory_kb: u64,
    scratch_dir: PathBuf,
}

impl<'a> CaseRunner<'a> {
    /// Builds a batch case runner bound to a compiled submission and a
    /// resolved checker.
    #[must_use]
    pub const fn new(
        builder: &'a dyn SubmissionBuilder,
        checker: &'a dyn Checker,
        max_time_ms: u64,
        max_memory_kb: u64,
        scratch_dir: PathBuf,
    ) -> Self {
        Self {
            builder,
            checker,
            max_time_ms,
            max_memory_kb,
            scratch_dir,
        }
    }

    /// Runs `case`, producing a fully-populated [`CaseResult`].
    ///
    /// # Errors
    ///
    /// Returns [`CaseRunnerError`] only for infrastructure failures; any
    /// resource violation or checker disagreement is an ordinary `Ok`
    /// result with the appropriate verdict.
    pub fn run(&self, checker_ref: &CheckerRef, case: &Case) -> Result<CaseResult, CaseRunnerError> {
        let Some(artifact) = self.builder.artifact_path() else {
            return Err(CaseRunnerError::Exec(ExecError::Spawn(std::io::Error::other(
                "submission has no compiled artifact",
            ))));
        };
        let artifact = artifact.to_path_buf();
        let stdout_file = self.scratch_dir.join("stdout");
        let stderr_file = self.scratch_dir.join("stderr");

        let request = ExecRequest {
            artifact,
            args: Vec::new(),
            stdin_file: Some(case.input_path().to_path_buf()),
            stdout_file: stdout_file.clone(),
            stderr_file,
            max_time_ms: self.max_time_ms,
            max_memory_kb: self.max_memory_kb,
            idle_timeout_ms: None,
            trusted: false,
        };
        let outcome = self.builder.run(&request)?;

        if let Some(preliminary) = Self::preliminary_verdict(outcome) {
            return Ok(Self::result_from_outcome(preliminary, outcome));
        }

        let check = self.checker.check(checker_ref, case.input_path(), case.output_path(), &stdout_file)?;
        let verdict = if check.accepted { Verdict::Accepted } else { Verdict::WrongAnswer };
        Ok(CaseResult {
            verdict: CaseVerdict::Judged(verdict),
            time: Some(outcome.elapsed_ms),
            memory: Some(outcome.memory_kb),
            message: check.message,
            group: None,
        })
    }

    /// Returns idempotent scratch-directory teardown for this runner.
    pub fn clean(&self) {
        let _ = std::fs::remove_dir_all(&self.scratch_dir);
    }

    /// Translates a non-normal execution outcome to its preliminary
    /// verdict, per §4.2 step 2. Returns `None` when the process exited
    /// normally, in which case checking must still decide ACCEPTED vs.
    /// WRONG_ANSWER.
    fn preliminary_verdict(outcome: ExecOutcome) -> Option<Verdict> {
        if outcome.exited_normally() {
            return None;
        }
        Some(match outcome.termination {
            TerminationReason::TimedOut => Verdict::TimeLimitExceeded,
            TerminationReason::MemoryExceeded => Verdict::MemoryLimitExceeded,
            TerminationReason::Idle => Verdict::IdlenessLimitExceeded,
            TerminationReason::Signalled | TerminationReason::Exited => Verdict::RuntimeError,
        })
    }

    /// Builds a [`CaseResult`] from a preliminary, checker-skipping
    /// verdict and the raw execution outcome it was derived from.
    fn result_from_outcome(verdict: Verdict, outcome: ExecOutcome) -> CaseResult {
        CaseResult {
            verdict: CaseVerdict::Judged(verdict),
            time: Some(outcome.elapsed_ms),
            memory: Some(outcome.memory_kb),
            message: None,
            group: None,
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
    use std::cell::RefCell;
    use std::path::Path;

    use crate::core::Fingerprint;
    use crate::interfaces::CheckOutcome;
    use crate::interfaces::CompileError;

    struct StubBuilder {
        artifact: PathBuf,
        outcome: ExecOutcome,
    }

    impl SubmissionBuilder for StubBuilder {
        fn compile(&mut self, _code: &[u8], _lang: &str, _time_budget_ms: u64) -> Result<(), CompileError> {
            Ok(())
        }

        fn run(&self, _request: &ExecRequest) -> Result<ExecOutcome, ExecError> {
            Ok(self.outcome)
        }

        fn artifact_path(&self) -> Option<&Path> {
            Some(&self.artifact)
        }

        fn clean(&mut self) {}
    }

    struct StubChecker {
        accepted: bool,
        calls: RefCell<u32>,
    }

    impl Checker for StubChecker {
        fn check(
            &self,
            _checker: &CheckerRef,
            _input_file: &Path,
            _expected_output_file: &Path,
            _contestant_output_file: &Path,
        ) -> Result<CheckOutcome, CheckerError> {
            *self.calls.borrow_mut() += 1;
            Ok(CheckOutcome {
                accepted: self.accepted,
                message: None,
            })
        }
    }

    fn case(dir: &std::path::Path) -> Case {
        Case::new(Fingerprint::new("c1").expect("valid"), dir.join("input"), dir.join("output"))
    }

    #[test]
    fn normal_exit_defers_to_checker() {
        let dir = tempfile::tempdir().expect("tempdir");
        let builder = StubBuilder {
            artifact: dir.path().join("a.out"),
            outcome: ExecOutcome {
                elapsed_ms: 12,
                memory_kb: 256,
                exit_code: Some(0),
                signal: None,
                termination: TerminationReason::Exited,
            },
        };
        let checker = StubChecker {
            accepted: true,
            calls: RefCell::new(0),
        };
        let runner = CaseRunner::new(&builder, &checker, 1000, 65536, dir.path().to_path_buf());
        let result = runner.run(&CheckerRef::default_comparator(), &case(dir.path())).expect("runs");
        assert_eq!(*checker.calls.borrow(), 1);
        assert!(result.is_accepted());
    }

    #[test]
    fn timeout_skips_checker_entirely() {
        let dir = tempfile::tempdir().expect("tempdir");
        let builder = StubBuilder {
            artifact: dir.path().join("a.out"),
            outcome: ExecOutcome {
                elapsed_ms: 1000,
                memory_kb: 256,
                exit_code: None,
                signal: None,
                termination: TerminationReason::TimedOut,
            },
        };
        let checker = StubChecker {
            accepted: true,
            calls: RefCell::new(0),
        };
        let runner = CaseRunner::new(&builder, &checker, 1000, 65536, dir.path().to_path_buf());
        let result = runner.run(&CheckerRef::default_comparator(), &case(dir.path())).expect("runs");
        assert_eq!(*checker.calls.borrow(), 0);
        assert_eq!(result.verdict, CaseVerdict::Judged(Verdict::TimeLimitExceeded));
    }
}
