// judge-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: Orchestrator
// Description: The judging entry point. Sequences compile, per-case
//              execution, group skip propagation, and cache publishing.
// ============================================================================

use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use crate::core::CaseResult;
use crate::core::CaseVerdict;
use crate::core::Fingerprint;
use crate::core::GroupId;
use crate::core::JudgeRequest;
use crate::core::ProgressSnapshot;
use crate::core::SnapshotStatus;
use crate::core::Verdict;
use crate::interfaces::CacheError;
use crate::interfaces::CaseStore;
use crate::interfaces::Checker;
use crate::interfaces::Interactor;
use crate::interfaces::ProgressCache;
use crate::interfaces::StoreError;
use crate::interfaces::SubmissionBuilder;
use crate::runtime::case_runner::CaseRunner;
use crate::runtime::group_resolver::GroupDependencyResolver;
use crate::runtime::interactive_runner::InteractiveRunner;

/// Maximum number of lines kept from a bounded traceback surfaced in a
/// rejection snapshot's `message` field, per §4.1 step 7.
pub const TRACEBACK_LIMIT: usize = 64;

const SNAPSHOT_TTL_SECS: u64 = 3600;
const REPORT_TTL_SECS: u64 = 1800;

/// Infrastructure failures severe enough that no per-case verdict can
/// absorb them — these unwind to the outer catch and are surfaced as a
/// `{status: "reject"}` snapshot, per §7's propagation policy. A fault
/// confined to a single case's runner or interactor is handled one level
/// down instead: [`Orchestrator::run`] catches it there and records
/// [`Verdict::JudgementFailed`] for that case, continuing the run.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    /// A Fingerprint Store lookup failed (unknown or malformed case,
    /// checker, or interactor).
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A progress cache write failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// A scratch-directory operation failed.
    #[error("scratch directory error: {0}")]
    Io(#[source] std::io::Error),
    /// Interactive mode was requested but no `Interactor` collaborator
    /// was supplied to the orchestrator.
    #[error("interactive mode requires an Interactor collaborator")]
    MissingInteractor,
    /// The submission builder reported no compiled artifact after a
    /// successful compile.
    #[error("submission builder reported no compiled artifact")]
    MissingArtifact,
}

/// Sequences the Submission Builder, Case Store, Checker, Interactor,
/// and Progress Cache collaborators into one judging run.
///
/// One `Orchestrator` invocation runs to completion sequentially; cases
/// are executed strictly in submission order and parallelism within a
/// single run is forbidden (§5) — the collaborators here are plain
/// trait object references, not behind any internal synchronization.
pub struct Orchestrator<'a> {
    case_store: &'a dyn CaseStore,
    progress_cache: &'a dyn ProgressCache,
    checker: &'a dyn Checker,
    interactor: Option<&'a dyn Interactor>,
}

impl<'a> Orchestrator<'a> {
    /// Builds an orchestrator bound to its four always-present
    /// collaborators plus an optional interactor (present only when the
    /// deployment supports interactive judging at all; a given request
    /// may still select batch mode even when one is supplied).
    #[must_use]
    pub const fn new(
        case_store: &'a dyn CaseStore,
        progress_cache: &'a dyn ProgressCache,
        checker: &'a dyn Checker,
        interactor: Option<&'a dyn Interactor>,
    ) -> Self {
        Self {
            case_store,
            progress_cache,
            checker,
            interactor,
        }
    }

    /// Judges `request` against `builder`, an empty submission builder
    /// already bound to its own scratch workspace by the caller.
    ///
    /// Always returns a [`ProgressSnapshot`] — infrastructure failures
    /// anywhere in the run, including a panic unwinding out of a
    /// collaborator, are converted into a `{status: "reject"}` snapshot
    /// rather than propagated, per §7. The cache is guaranteed to hold
    /// the returned snapshot at `request.sub_fingerprint` when this
    /// returns, and the submission workspace is deleted unless
    /// `keep_workspace` is set.
    #[expect(clippy::too_many_lines, reason = "mirrors the single-pass orchestration algorithm in §4.1; splitting it would scatter one state machine across files")]
    pub fn judge(&self, request: &JudgeRequest, builder: &mut dyn SubmissionBuilder, case_scratch_root: &Path, keep_workspace: bool) -> ProgressSnapshot {
        let run_result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| self.run(request, &mut *builder, case_scratch_root)));

        let snapshot = match run_result {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(err)) => {
                tracing::warn!(sub_fingerprint = %request.sub_fingerprint, error = %err, "judging failed with an infrastructure error");
                ProgressSnapshot::reject(Self::bounded_traceback(&err.to_string()))
            }
            Err(panic) => {
                let message = Self::panic_message(&panic);
                tracing::error!(sub_fingerprint = %request.sub_fingerprint, panic = %message, "judging panicked");
                ProgressSnapshot::reject(Self::bounded_traceback(&message))
            }
        };

        // Guaranteed final publish, regardless of which path produced
        // `snapshot` — tolerates a snapshot that was already published
        // moments earlier inside `run`.
        if let Err(err) = self.progress_cache.publish_snapshot(request.sub_fingerprint.as_str(), &snapshot, SNAPSHOT_TTL_SECS) {
            tracing::warn!(sub_fingerprint = %request.sub_fingerprint, error = %err, "final snapshot publish failed");
        }

        if !keep_workspace {
            builder.clean();
        }

        snapshot
    }

    /// The unwinding-unsafe body of [`Self::judge`]: compile, then run
    /// every case in order, applying group-skip propagation and early
    /// exit per `request.run_until_complete`.
    fn run(&self, request: &JudgeRequest, builder: &mut dyn SubmissionBuilder, case_scratch_root: &Path) -> Result<ProgressSnapshot, JudgeError> {
        let span = tracing::info_span!("judge", sub_fingerprint = %request.sub_fingerprint);
        let _entered = span.enter();

        let table = GroupDependencyResolver::new().resolve(request.group_dependencies.as_deref());
        let mut detail: Vec<CaseResult> = Vec::new();
        let mut skipped_groups: HashSet<GroupId> = HashSet::new();
        let mut sum_verdict = Verdict::Accepted;
        let mut time_max: Option<u64> = None;
        let mut memory_max: Option<u64> = None;
        let mut report = String::new();

        self.publish_snapshot(request, &ProgressSnapshot::judging())?;

        if let Err(compile_err) = builder.compile(&request.sub_code, &request.sub_lang, request.compile_budget_ms()) {
            tracing::info!(sub_fingerprint = %request.sub_fingerprint, "submission failed to compile");
            let snapshot = ProgressSnapshot {
                status: SnapshotStatus::Received,
                verdict: Some(Verdict::CompileError),
                detail: Some(Vec::new()),
                time: None,
                memory: None,
                message: Some(compile_err.diagnostic),
            };
            self.publish_snapshot(request, &snapshot)?;
            self.publish_report(request, &report)?;
            return Ok(snapshot);
        }

        let checker_ref = self.case_store.resolve_checker(&request.effective_checker_fingerprint())?;
        let interactor_ref = match &request.interactor_fingerprint {
            Some(fingerprint) => Some(self.case_store.resolve_interactor(fingerprint)?),
            None => None,
        };
        if interactor_ref.is_some() && self.interactor.is_none() {
            return Err(JudgeError::MissingInteractor);
        }

        for (case_idx, case_fingerprint) in request.case_list.iter().enumerate() {
            let group = request.group_list.as_ref().map(|groups| groups[case_idx]);

            if let Some(group) = group {
                if skipped_groups.contains(&group) && !request.run_until_complete {
                    detail.push(CaseResult::skipped(group));
                    self.publish_partial(request, &detail)?;
                    continue;
                }
            }

            let case = self.case_store.resolve_case(case_fingerprint)?;
            let mut case_result = if let Some(interactor_ref) = &interactor_ref {
                let artifact = builder.artifact_path().ok_or(JudgeError::MissingArtifact)?.to_path_buf();
                #[expect(clippy::unwrap_used, reason = "checked above: interactor_ref.is_some() implies self.interactor.is_some()")]
                let interactive_runner = InteractiveRunner::new(self.interactor.unwrap(), self.checker, request.max_time_ms, request.max_memory_kb);
                match interactive_runner.run(interactor_ref, &checker_ref, &case, &artifact, &mut report) {
                    Ok(result) => result,
                    Err(err) => {
                        tracing::warn!(sub_fingerprint = %request.sub_fingerprint, case = %case_fingerprint, error = %err, "interactive case runner hit an infrastructure fault");
                        Self::judgement_failed(err.to_string())
                    }
                }
            } else {
                let case_scratch: PathBuf = case_scratch_root.join(format!("case-{case_idx}"));
                std::fs::create_dir_all(&case_scratch).map_err(JudgeError::Io)?;
                let case_runner = CaseRunner::new(&*builder, self.checker, request.max_time_ms, request.max_memory_kb, case_scratch);
                let result = match case_runner.run(&checker_ref, &case) {
                    Ok(result) => result,
                    Err(err) => {
                        tracing::warn!(sub_fingerprint = %request.sub_fingerprint, case = %case_fingerprint, error = %err, "batch case runner hit an infrastructure fault");
                        Self::judgement_failed(err.to_string())
                    }
                };
                case_runner.clean();
                result
            };
            case_result.group = group;

            detail.push(case_result.clone());
            self.publish_partial(request, &detail)?;

            if let Some(elapsed) = case_result.time {
                time_max = Some(time_max.map_or(elapsed, |current| current.max(elapsed)));
            }
            if let Some(peak) = case_result.memory {
                memory_max = Some(memory_max.map_or(peak, |current| current.max(peak)));
            }

            if !case_result.is_accepted() {
                if sum_verdict == Verdict::Accepted {
                    if let Some(verdict) = case_result.verdict.judged() {
                        sum_verdict = verdict;
                    }
                }
                if let Some(group) = group {
                    skipped_groups.extend(table.skip_set(group));
                } else if !request.run_until_complete {
                    break;
                }
            }
        }

        let snapshot = ProgressSnapshot {
            status: SnapshotStatus::Received,
            verdict: Some(sum_verdict),
            detail: Some(detail),
            time: time_max,
            memory: memory_max,
            message: None,
        };
        self.publish_snapshot(request, &snapshot)?;
        self.publish_report(request, &report)?;
        Ok(snapshot)
    }

    /// Writes `snapshot` to the progress cache under the submission's
    /// fingerprint, per §6's key scheme.
    fn publish_snapshot(&self, request: &JudgeRequest, snapshot: &ProgressSnapshot) -> Result<(), JudgeError> {
        self.progress_cache.publish_snapshot(request.sub_fingerprint.as_str(), snapshot, SNAPSHOT_TTL_SECS)?;
        Ok(())
    }

    /// Publishes an in-progress snapshot after each case, so a poller
    /// sees incremental `detail` before the run terminates.
    fn publish_partial(&self, request: &JudgeRequest, detail: &[CaseResult]) -> Result<(), JudgeError> {
        let snapshot = ProgressSnapshot {
            status: SnapshotStatus::Received,
            verdict: Some(Verdict::Judging),
            detail: Some(detail.to_vec()),
            time: None,
            memory: None,
            message: None,
        };
        self.publish_snapshot(request, &snapshot)
    }

    /// Writes the accumulated interactive transcript to the progress
    /// cache under the `report_<fp>` key, per §6.
    fn publish_report(&self, request: &JudgeRequest, report: &str) -> Result<(), JudgeError> {
        self.progress_cache.publish_report(&report_key(&request.sub_fingerprint), report, REPORT_TTL_SECS)?;
        Ok(())
    }

    /// Builds the [`CaseResult`] for a case whose runner raised an
    /// infrastructure fault rather than an ordinary verdict, per §7's
    /// "Runner/infra error mid-case" row: the case becomes
    /// `JUDGEMENT_FAILED` with no observed time or memory, and the run
    /// continues past it exactly as it would past any other failing
    /// verdict.
    fn judgement_failed(diagnostic: String) -> CaseResult {
        CaseResult {
            verdict: CaseVerdict::Judged(Verdict::JudgementFailed),
            time: None,
            memory: None,
            message: Some(diagnostic),
            group: None,
        }
    }

    /// Truncates `message` to [`TRACEBACK_LIMIT`] lines, per §4.1 step 7.
    fn bounded_traceback(message: &str) -> String {
        let lines: Vec<&str> = message.lines().take(TRACEBACK_LIMIT).collect();
        lines.join("\n")
    }

    /// Extracts a human-readable message from a caught panic payload,
    /// falling back to a generic description for non-string payloads.
    fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
        if let Some(message) = panic.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = panic.downcast_ref::<String>() {
            message.clone()
        } else {
            "orchestrator panicked with a non-string payload".to_string()
        }
    }
}

/// Builds the `report_<fingerprint>` cache key for a submission.
fn report_key(sub_fingerprint: &Fingerprint) -> String {
    format!("report_{sub_fingerprint}")
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

    use crate::core::Case;
    use crate::core::CaseVerdict;
    use crate::core::CheckerRef;
    use crate::core::Fingerprint;
    use crate::core::InteractorRef;
    use crate::interfaces::CheckOutcome;
    use crate::interfaces::CheckerError;
    use crate::interfaces::CompileError;
    use crate::interfaces::ExecError;
    use crate::interfaces::ExecOutcome;
    use crate::interfaces::ExecRequest;
    use crate::interfaces::TerminationReason;

    struct FakeStore {
        case_dir: PathBuf,
    }

    impl CaseStore for FakeStore {
        fn resolve_case(&self, fingerprint: &Fingerprint) -> Result<Case, StoreError> {
            Ok(Case::new(fingerprint.clone(), self.case_dir.join("input"), self.case_dir.join("output")))
        }

        fn resolve_checker(&self, fingerprint: &Fingerprint) -> Result<CheckerRef, StoreError> {
            if fingerprint.is_default_checker() {
                return Ok(CheckerRef::default_comparator());
            }
            Err(StoreError::NotFound(fingerprint.clone()))
        }

        fn resolve_interactor(&self, fingerprint: &Fingerprint) -> Result<InteractorRef, StoreError> {
            Err(StoreError::NotFound(fingerprint.clone()))
        }
    }

    struct FakeCache {
        snapshots: RefCell<Vec<ProgressSnapshot>>,
    }

    impl ProgressCache for FakeCache {
        fn publish_snapshot(&self, _key: &str, snapshot: &ProgressSnapshot, _ttl_secs: u64) -> Result<(), CacheError> {
            self.snapshots.borrow_mut().push(snapshot.clone());
            Ok(())
        }

        fn publish_report(&self, _key: &str, _report: &str, _ttl_secs: u64) -> Result<(), CacheError> {
            Ok(())
        }
    }

    struct ScriptedBuilder {
        artifact: PathBuf,
        compile_error: Option<String>,
        outcomes: RefCell<std::collections::VecDeque<ExecOutcome>>,
        cleaned: RefCell<bool>,
    }

    impl SubmissionBuilder for ScriptedBuilder {
        fn compile(&mut self, _code: &[u8], _lang: &str, _time_budget_ms: u64) -> Result<(), CompileError> {
            if let Some(diagnostic) = &self.compile_error {
                return Err(CompileError { diagnostic: diagnostic.clone() });
            }
            Ok(())
        }

        fn run(&self, _request: &ExecRequest) -> Result<ExecOutcome, ExecError> {
            Ok(self.outcomes.borrow_mut().pop_front().expect("scripted outcome available"))
        }

        fn artifact_path(&self) -> Option<&Path> {
            Some(&self.artifact)
        }

        fn clean(&mut self) {
            *self.cleaned.borrow_mut() = true;
        }
    }

    struct ScriptedChecker {
        accepted: RefCell<std::collections::VecDeque<bool>>,
    }

    impl Checker for ScriptedChecker {
        fn check(
            &self,
            _checker: &CheckerRef,
            _input_file: &Path,
            _expected_output_file: &Path,
            _contestant_output_file: &Path,
        ) -> Result<CheckOutcome, CheckerError> {
            Ok(CheckOutcome {
                accepted: self.accepted.borrow_mut().pop_front().expect("scripted verdict available"),
                message: None,
            })
        }
    }

    fn exited(elapsed_ms: u64) -> ExecOutcome {
        ExecOutcome {
            elapsed_ms,
            memory_kb: 128,
            exit_code: Some(0),
            signal: None,
            termination: TerminationReason::Exited,
        }
    }

    fn fp(value: &str) -> Fingerprint {
        Fingerprint::new(value).expect("valid fingerprint")
    }

    fn request(case_list: Vec<Fingerprint>, run_until_complete: bool) -> JudgeRequest {
        JudgeRequest::new(fp("sub1"), Vec::new(), "cpp17".to_string(), case_list, 1000, 262_144, None, None, run_until_complete, None, None).expect("valid request")
    }

    #[test]
    fn all_cases_passing_yields_accepted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FakeStore { case_dir: dir.path().to_path_buf() };
        let cache = FakeCache { snapshots: RefCell::new(Vec::new()) };
        let checker = ScriptedChecker { accepted: RefCell::new(vec![true; 5].into()) };
        let orchestrator = Orchestrator::new(&store, &cache, &checker, None);

        let mut builder = ScriptedBuilder {
            artifact: dir.path().join("a.out"),
            compile_error: None,
            outcomes: RefCell::new((0..5).map(|_| exited(5)).collect()),
            cleaned: RefCell::new(false),
        };

        let req = request(vec![fp("c1"), fp("c2"), fp("c3"), fp("c4"), fp("c5")], false);
        let snapshot = orchestrator.judge(&req, &mut builder, dir.path(), false);

        assert_eq!(snapshot.verdict, Some(Verdict::Accepted));
        assert_eq!(snapshot.detail.as_ref().expect("detail present").len(), 5);
        assert!(*builder.cleaned.borrow());
    }

    #[test]
    fn first_failure_halts_without_run_until_complete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FakeStore { case_dir: dir.path().to_path_buf() };
        let cache = FakeCache { snapshots: RefCell::new(Vec::new()) };
        let checker = ScriptedChecker { accepted: RefCell::new(vec![true, false].into()) };
        let orchestrator = Orchestrator::new(&store, &cache, &checker, None);

        let mut builder = ScriptedBuilder {
            artifact: dir.path().join("a.out"),
            compile_error: None,
            outcomes: RefCell::new((0..3).map(|_| exited(5)).collect()),
            cleaned: RefCell::new(false),
        };

        let req = request(vec![fp("c1"), fp("c2"), fp("c3")], false);
        let snapshot = orchestrator.judge(&req, &mut builder, dir.path(), false);

        assert_eq!(snapshot.verdict, Some(Verdict::WrongAnswer));
        assert_eq!(snapshot.detail.as_ref().expect("detail present").len(), 2);
    }

    #[test]
    fn run_until_complete_judges_every_case() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FakeStore { case_dir: dir.path().to_path_buf() };
        let cache = FakeCache { snapshots: RefCell::new(Vec::new()) };
        let checker = ScriptedChecker { accepted: RefCell::new(vec![true, false, true].into()) };
        let orchestrator = Orchestrator::new(&store, &cache, &checker, None);

        let mut builder = ScriptedBuilder {
            artifact: dir.path().join("a.out"),
            compile_error: None,
            outcomes: RefCell::new((0..3).map(|_| exited(5)).collect()),
            cleaned: RefCell::new(false),
        };

        let req = request(vec![fp("c1"), fp("c2"), fp("c3")], true);
        let snapshot = orchestrator.judge(&req, &mut builder, dir.path(), false);

        assert_eq!(snapshot.verdict, Some(Verdict::WrongAnswer));
        assert_eq!(snapshot.detail.as_ref().expect("detail present").len(), 3);
    }

    #[test]
    fn compile_failure_skips_every_case() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FakeStore { case_dir: dir.path().to_path_buf() };
        let cache = FakeCache { snapshots: RefCell::new(Vec::new()) };
        let checker = ScriptedChecker { accepted: RefCell::new(Vec::new()) };
        let orchestrator = Orchestrator::new(&store, &cache, &checker, None);

        let mut builder = ScriptedBuilder {
            artifact: dir.path().join("a.out"),
            compile_error: Some("syntax error on line 3".to_string()),
            outcomes: RefCell::new(std::collections::VecDeque::new()),
            cleaned: RefCell::new(false),
        };

        let req = request(vec![fp("c1")], false);
        let snapshot = orchestrator.judge(&req, &mut builder, dir.path(), false);

        assert_eq!(snapshot.verdict, Some(Verdict::CompileError));
        assert_eq!(snapshot.detail, Some(Vec::new()));
        assert_eq!(snapshot.message.as_deref(), Some("syntax error on line 3"));
    }

    #[test]
    fn unknown_checker_fingerprint_rejects_with_traceback() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FakeStore { case_dir: dir.path().to_path_buf() };
        let cache = FakeCache { snapshots: RefCell::new(Vec::new()) };
        let checker = ScriptedChecker { accepted: RefCell::new(Vec::new()) };
        let orchestrator = Orchestrator::new(&store, &cache, &checker, None);

        let mut builder = ScriptedBuilder {
            artifact: dir.path().join("a.out"),
            compile_error: None,
            outcomes: RefCell::new(std::collections::VecDeque::new()),
            cleaned: RefCell::new(false),
        };

        let req = JudgeRequest::new(fp("sub1"), Vec::new(), "cpp17".to_string(), vec![fp("c1")], 1000, 262_144, Some(fp("missing-checker")), None, false, None, None).expect("valid request");
        let snapshot = orchestrator.judge(&req, &mut builder, dir.path(), false);

        assert_eq!(snapshot.status, SnapshotStatus::Reject);
        assert!(snapshot.message.is_some());
    }

    #[test]
    fn empty_case_list_is_accepted_with_no_time_or_memory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FakeStore { case_dir: dir.path().to_path_buf() };
        let cache = FakeCache { snapshots: RefCell::new(Vec::new()) };
        let checker = ScriptedChecker { accepted: RefCell::new(Vec::new()) };
        let orchestrator = Orchestrator::new(&store, &cache, &checker, None);

        let mut builder = ScriptedBuilder {
            artifact: dir.path().join("a.out"),
            compile_error: None,
            outcomes: RefCell::new(std::collections::VecDeque::new()),
            cleaned: RefCell::new(false),
        };

        let req = request(Vec::new(), false);
        let snapshot = orchestrator.judge(&req, &mut builder, dir.path(), false);

        assert_eq!(snapshot.verdict, Some(Verdict::Accepted));
        assert_eq!(snapshot.detail, Some(Vec::new()));
        assert!(snapshot.time.is_none());
        assert!(snapshot.memory.is_none());
    }

    #[test]
    fn group_failure_skips_dependent_groups_but_not_siblings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FakeStore { case_dir: dir.path().to_path_buf() };
        let cache = FakeCache { snapshots: RefCell::new(Vec::new()) };
        // 6 cases, groups [1,1,2,2,3,3]; only case index 1 (group 1) is
        // checked (the other group-1 case and every skipped case never
        // reach the checker at all).
        let checker = ScriptedChecker { accepted: RefCell::new(vec![true, false].into()) };
        let orchestrator = Orchestrator::new(&store, &cache, &checker, None);

        let mut builder = ScriptedBuilder {
            artifact: dir.path().join("a.out"),
            compile_error: None,
            outcomes: RefCell::new((0..2).map(|_| exited(5)).collect()),
            cleaned: RefCell::new(false),
        };

        let groups = vec![GroupId::new(1), GroupId::new(1), GroupId::new(2), GroupId::new(2), GroupId::new(3), GroupId::new(3)];
        let req = JudgeRequest::new(
            fp("sub1"),
            Vec::new(),
            "cpp17".to_string(),
            vec![fp("c1"), fp("c2"), fp("c3"), fp("c4"), fp("c5"), fp("c6")],
            1000,
            262_144,
            None,
            None,
            false,
            Some(groups),
            Some(vec![(2, 1), (3, 2), (3, 1)]),
        )
        .expect("valid request");

        let snapshot = orchestrator.judge(&req, &mut builder, dir.path(), false);
        let detail = snapshot.detail.expect("detail present");

        assert_eq!(detail[0].verdict, CaseVerdict::Judged(Verdict::Accepted));
        assert_eq!(detail[1].verdict, CaseVerdict::Judged(Verdict::WrongAnswer));
        assert_eq!(detail[2].verdict, CaseVerdict::Skipped);
        assert_eq!(detail[3].verdict, CaseVerdict::Skipped);
        assert_eq!(detail[4].verdict, CaseVerdict::Skipped);
        assert_eq!(detail[5].verdict, CaseVerdict::Skipped);
        assert_eq!(snapshot.verdict, Some(Verdict::WrongAnswer));
    }

    struct FlakyBuilder {
        artifact: PathBuf,
        fail_on_case: usize,
        calls: RefCell<usize>,
    }

    impl SubmissionBuilder for FlakyBuilder {
        fn compile(&mut self, _code: &[u8], _lang: &str, _time_budget_ms: u64) -> Result<(), CompileError> {
            Ok(())
        }

        fn run(&self, _request: &ExecRequest) -> Result<ExecOutcome, ExecError> {
            let call = *self.calls.borrow();
            *self.calls.borrow_mut() += 1;
            if call == self.fail_on_case {
                return Err(ExecError::Spawn(std::io::Error::other("sandbox worker crashed")));
            }
            Ok(exited(5))
        }

        fn artifact_path(&self) -> Option<&Path> {
            Some(&self.artifact)
        }

        fn clean(&mut self) {}
    }

    #[test]
    fn mid_case_infra_fault_becomes_judgement_failed_and_run_continues() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FakeStore { case_dir: dir.path().to_path_buf() };
        let cache = FakeCache { snapshots: RefCell::new(Vec::new()) };
        let checker = ScriptedChecker { accepted: RefCell::new(vec![true, true].into()) };
        let orchestrator = Orchestrator::new(&store, &cache, &checker, None);

        let mut builder = FlakyBuilder {
            artifact: dir.path().join("a.out"),
            fail_on_case: 1,
            calls: RefCell::new(0),
        };

        let req = request(vec![fp("c1"), fp("c2"), fp("c3")], true);
        let snapshot = orchestrator.judge(&req, &mut builder, dir.path(), false);

        assert_eq!(snapshot.status, SnapshotStatus::Received);
        let detail = snapshot.detail.expect("detail present");
        assert_eq!(detail.len(), 3);
        assert_eq!(detail[0].verdict, CaseVerdict::Judged(Verdict::Accepted));
        assert_eq!(detail[1].verdict, CaseVerdict::Judged(Verdict::JudgementFailed));
        assert!(detail[1].message.is_some());
        assert_eq!(detail[2].verdict, CaseVerdict::Judged(Verdict::Accepted));
        assert_eq!(snapshot.verdict, Some(Verdict::JudgementFailed));
    }

    proptest::proptest! {
        /// Invariant 2 (§8): for any submission, the final verdict is
        /// ACCEPTED if and only if every executed case's verdict is
        /// ACCEPTED. `run_until_complete` is fixed `true` so every case in
        /// the random sequence is actually judged and contributes to
        /// `detail`.
        #[test]
        fn final_verdict_accepted_iff_every_case_accepted(outcomes in proptest::collection::vec(proptest::bool::ANY, 1..12)) {
            let dir = tempfile::tempdir().expect("tempdir");
            let store = FakeStore { case_dir: dir.path().to_path_buf() };
            let cache = FakeCache { snapshots: RefCell::new(Vec::new()) };
            let checker = ScriptedChecker { accepted: RefCell::new(outcomes.iter().copied().collect()) };
            let orchestrator = Orchestrator::new(&store, &cache, &checker, None);

            let mut builder = ScriptedBuilder {
                artifact: dir.path().join("a.out"),
                compile_error: None,
                outcomes: RefCell::new(outcomes.iter().map(|_| exited(5)).collect()),
                cleaned: RefCell::new(false),
            };

            let case_list: Vec<Fingerprint> = (0..outcomes.len()).map(|i| fp(&format!("c{i}"))).collect();
            let req = JudgeRequest::new(fp("sub1"), Vec::new(), "cpp17".to_string(), case_list, 1000, 262_144, None, None, true, None, None).expect("valid request");
            let snapshot = orchestrator.judge(&req, &mut builder, dir.path(), false);

            let detail = snapshot.detail.expect("detail present");
            let all_accepted = detail.iter().all(CaseResult::is_accepted);
            proptest::prop_assert_eq!(snapshot.verdict == Some(Verdict::Accepted), all_accepted);
        }
    }
}
