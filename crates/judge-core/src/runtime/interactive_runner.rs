// judge-core/src/runtime/interactive_runner.rs
// ============================================================================
// Module: InteractiveRunner
// Description: Per-case harness for interactor-driven judging: spawns
//              the contestant and interactor as a connected pipe pair.
// ============================================================================

use std::fmt::Write as _;

use crate::core::Case;
use crate::core::CaseResult;
use crate::core::CaseVerdict;
use crate::core::CheckerRef;
use crate::core::InteractorRef;
use crate::core::Verdict;
use crate::interfaces::Checker;
use crate::interfaces::CheckerError;
use crate::interfaces::ContestantSpec;
use crate::interfaces::ExecError;
use crate::interfaces::ExecOutcome;
use crate::interfaces::Interactor;
use crate::interfaces::TerminationReason;

/// Errors an [`InteractiveRunner`] cannot translate into an ordinary
/// [`CaseVerdict`].
#[derive(Debug, thiserror::Error)]
pub enum InteractiveRunnerError {
    /// The interactor/contestant pipe pair could not be run.
    #[error(transparent)]
    Exec(#[from] ExecError),
    /// The checker could not be invoked on the resulting contestant log.
    #[error(transparent)]
    Checker(#[from] CheckerError),
}

/// Runs one interactive-mode case: the contestant and interactor are
/// connected by a bidirectional pipe pair; the interactor's resulting
/// contestant log is checked against the expected output.
///
/// Verdict precedence, per §4.2: contestant resource violation takes
/// priority over the checker's verdict on the interactor's log. The
/// wall-time cap applies only to the contestant; the interactor is
/// trusted and runs with a relaxed sandbox, which is `interactor.interact`'s
/// concern, not this runner's.
pub struct InteractiveRunner<'a> {
    interactor: &'a dyn Interactor,
    checker: &'a dyn Checker,
    max_time_ms: u64,
    max_memory_kb: u64,
}

impl<'a> InteractiveRunner<'a> {
    /// Builds an interactive case runner bound to the resolved
    /// interactor and checker collaborators.
    #[must_use]
    pub const fn new(interactor: &'a dyn Interactor, checker: &'a dyn Checker, max_time_ms: u64, max_memory_kb: u64) -> Self {
        Self {
            interactor,
            checker,
            max_time_ms,
            max_memory_kb,
        }
    }

    /// Runs `case` against `interactor_ref`, appending a transcript
    /// paragraph to `report_buffer`.
    ///
    /// # Errors
    ///
    /// Returns [`InteractiveRunnerError`] only for infrastructure
    /// failures.
    pub fn run(
        &self,
        interactor_ref: &InteractorRef,
        checker_ref: &CheckerRef,
        case: &Case,
        contestant_artifact: &std::path::Path,
        report_buffer: &mut String,
    ) -> Result<CaseResult, InteractiveRunnerError> {
        let contestant = ContestantSpec {
            artifact: contestant_artifact.to_path_buf(),
            args: Vec::new(),
            max_time_ms: self.max_time_ms,
            max_memory_kb: self.max_memory_kb,
        };

        let (contestant_log, contestant_outcome) = self.interactor.interact(interactor_ref, case, &contestant)?;

        let _ = writeln!(
            report_buffer,
            "case {}: interactor {} -> contestant outcome {} ({} ms, {} kb)",
            case.fingerprint(),
            interactor_ref.fingerprint(),
            contestant_outcome.termination,
            contestant_outcome.elapsed_ms,
            contestant_outcome.memory_kb,
        );

        if let Some(preliminary) = Self::preliminary_verdict(contestant_outcome) {
            return Ok(CaseResult {
                verdict: CaseVerdict::Judged(preliminary),
                time: Some(contestant_outcome.elapsed_ms),
                memory: Some(contestant_outcome.memory_kb),
                message: None,
                group: None,
            });
        }

        let check = self.checker.check(checker_ref, case.input_path(), case.output_path(), &contestant_log)?;
        let verdict = if check.accepted { Verdict::Accepted } else { Verdict::WrongAnswer };
        let _ = writeln!(report_buffer, "  checker verdict: {verdict}");

        Ok(CaseResult {
            verdict: CaseVerdict::Judged(verdict),
            time: Some(contestant_outcome.elapsed_ms),
            memory: Some(contestant_outcome.memory_kb),
            message: check.message,
            group: None,
        })
    }

    /// Idempotent scratch teardown; interactive-mode scratch is owned by
    /// the `Interactor` implementation, so this is a no-op placeholder
    /// kept for API symmetry with [`crate::CaseRunner::clean`].
    pub const fn clean(&self) {}

    /// Translates a non-normal contestant termination to its preliminary
    /// verdict, mirroring [`crate::CaseRunner`]'s rule. Returns `None`
    /// when the contestant exited normally, deferring to the checker.
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
    use std::path::Path;
    use std::path::PathBuf;

    use crate::core::Fingerprint;
    use crate::interfaces::CheckOutcome;

    struct StubInteractor {
        log_path: PathBuf,
        outcome: ExecOutcome,
    }

    impl Interactor for StubInteractor {
        fn interact(
            &self,
            _interactor: &InteractorRef,
            _case: &Case,
            _contestant: &ContestantSpec,
        ) -> Result<(PathBuf, ExecOutcome), ExecError> {
            Ok((self.log_path.clone(), self.outcome))
        }
    }

    struct StubChecker {
        accepted: bool,
    }

    impl Checker for StubChecker {
        fn check(
            &self,
            _checker: &CheckerRef,
            _input_file: &Path,
            _expected_output_file: &Path,
            _contestant_output_file: &Path,
        ) -> Result<CheckOutcome, CheckerError> {
            Ok(CheckOutcome {
                accepted: self.accepted,
                message: None,
            })
        }
    }

    #[test]
    fn contestant_timeout_preempts_checker() {
        let dir = tempfile::tempdir().expect("tempdir");
        let interactor = StubInteractor {
            log_path: dir.path().join("log"),
            outcome: ExecOutcome {
                elapsed_ms: 1000,
                memory_kb: 256,
                exit_code: None,
                signal: None,
                termination: TerminationReason::TimedOut,
            },
        };
        let checker = StubChecker { accepted: true };
        let runner = InteractiveRunner::new(&interactor, &checker, 1000, 65536);
        let case = Case::new(Fingerprint::new("c1").expect("valid"), dir.path().join("input"), dir.path().join("output"));
        let interactor_ref = InteractorRef::new(Fingerprint::new("inter1").expect("valid"), dir.path().join("inter"), "cpp17".into());
        let mut report = String::new();
        let result = runner
            .run(&interactor_ref, &CheckerRef::default_comparator(), &case, &dir.path().join("a.out"), &mut report)
            .expect("runs");
        assert_eq!(result.verdict, CaseVerdict::Judged(Verdict::TimeLimitExceeded));
        assert!(report.contains("contestant outcome"));
    }
}
