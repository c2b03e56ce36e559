// judge-cli/src/main.rs
// ============================================================================
// Module: Judge CLI
// Description: Parses one judge request, loads the daemon configuration,
//              wires the reference collaborators together, and runs the
//              orchestrator on a blocking task.
// Purpose: The process entry point judging workers invoke per submission
//          (§2, §6).
// Dependencies: clap, judge-core, judge-providers, judge-config,
//               judge-cache-redis, tokio, tracing
// ============================================================================

//! ## Overview
//! This binary judges exactly one submission per invocation: it reads a
//! [`judge_core::JudgeRequest`] as JSON (from a file or stdin), builds the
//! reference [`judge_providers`] collaborators from a
//! [`judge_config::DaemonConfig`], and runs [`judge_core::Orchestrator::judge`]
//! to completion. The final [`judge_core::ProgressSnapshot`] is both
//! published to the progress cache (per §6) and printed to stdout as JSON,
//! so the process can be driven either by polling the cache or by reading
//! this process's own output. A non-[`judge_core::Verdict::Accepted`]
//! terminal verdict is not a CLI failure — the process exit code reflects
//! only whether judging itself completed, per the exit code table below.

use std::fs;
use std::io::Read as _;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use judge_cache_redis::CACHE_URL_ENV;
use judge_cache_redis::RedisCacheError;
use judge_cache_redis::RedisProgressCache;
use judge_config::ConfigError;
use judge_config::DaemonConfig;
use judge_core::JudgeRequest;
use judge_core::JudgeRequestError;
use judge_core::Orchestrator;
use judge_core::ProgressSnapshot;
use judge_core::SnapshotStatus;
use judge_providers::BuilderError;
use judge_providers::ConfiguredLanguage;
use judge_providers::FlatDirectoryCaseStore;
use judge_providers::LanguageRegistry;
use judge_providers::ProcessChecker;
use judge_providers::ProcessInteractor;
use judge_providers::ProcessSubmissionBuilder;
use judge_providers::SandboxedExecutor;
use thiserror::Error;

/// Exit code returned when judging reached a terminal, accepted verdict.
const EXIT_ACCEPTED: u8 = 0;
/// Exit code returned when judging reached a terminal, non-accepted
/// verdict (wrong answer, compile error, and so on) — judging itself
/// succeeded, the submission did not.
const EXIT_REJECTED_VERDICT: u8 = 1;
/// Exit code returned when the orchestrator itself could not complete
/// (a `{status: "reject"}` snapshot).
const EXIT_JUDGING_FAILED: u8 = 2;
/// Exit code returned when this process could not even start judging
/// (bad CLI arguments, unreadable config, malformed request JSON).
const EXIT_USAGE_ERROR: u8 = 3;

/// Judges one submission against a sequence of test cases and publishes
/// incremental progress to the configured progress cache.
#[derive(Debug, Parser)]
#[command(name = "judge-cli", version, about)]
struct Args {
    /// Path to the JSON-encoded judge request, or `-` to read from stdin.
    #[arg(value_name = "REQUEST")]
    request: PathBuf,

    /// Path to the daemon configuration file. Falls back to
    /// `JUDGE_CONFIG` or `judge.toml` in the current directory when
    /// omitted, per [`judge_config::DaemonConfig::load`].
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Root of the read-only fingerprint store (cases, checkers,
    /// interactors).
    #[arg(long, value_name = "PATH", default_value = "fingerprint-store")]
    store: PathBuf,

    /// Retain the submission's scratch workspace after judging, for
    /// post-mortem inspection. Overrides the config file's
    /// `keep_workspaces` when passed.
    #[arg(long)]
    keep_workspace: bool,
}

/// Errors that prevent judging from even starting — distinct from a
/// [`ProgressSnapshot`] with `status = "reject"`, which is judging
/// reaching a terminal failure state cleanly.
#[derive(Debug, Error)]
enum CliError {
    /// The request file or stdin could not be read.
    #[error("failed to read request from {0:?}: {1}")]
    ReadRequest(PathBuf, std::io::Error),
    /// The request JSON could not be parsed.
    #[error("failed to parse request JSON: {0}")]
    ParseRequest(#[source] serde_json::Error),
    /// The parsed request failed [`JudgeRequest`]'s own invariants.
    #[error(transparent)]
    InvalidRequest(#[from] JudgeRequestError),
    /// The daemon configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// No language profile matched the request's `sub_lang`.
    #[error(transparent)]
    Builder(#[from] BuilderError),
    /// The fingerprint store root could not be opened.
    #[error("failed to open fingerprint store at {0:?}: {1}")]
    Store(PathBuf, judge_core::StoreError),
    /// The per-run case scratch directory could not be created.
    #[error("failed to create scratch directory at {0:?}: {1}")]
    Scratch(PathBuf, std::io::Error),
    /// The progress cache connection could not be established.
    #[error(transparent)]
    Cache(#[from] RedisCacheError),
    /// The final snapshot could not be written to stdout.
    #[error("failed to write snapshot to stdout: {0}")]
    Output(std::io::Error),
}

/// Parses CLI arguments, runs one judging pass on a blocking thread, and
/// maps the outcome to an exit code per the table in [`exit_code_for`].
#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args = Args::parse();
    match tokio::task::spawn_blocking(move || run(&args)).await {
        Ok(Ok(exit_code)) => exit_code,
        Ok(Err(err)) => {
            tracing::error!(error = %err, "judge-cli could not complete");
            ExitCode::from(EXIT_USAGE_ERROR)
        }
        Err(join_err) => {
            tracing::error!(error = %join_err, "judging task panicked or was cancelled");
            ExitCode::from(EXIT_USAGE_ERROR)
        }
    }
}

/// Reads the request, wires the reference collaborators, and runs one
/// judging pass to completion. Everything here is synchronous and
/// blocking, matching §5's "no cooperative yielding within a single
/// submission" scheduling model; [`main`] only supplies the blocking
/// thread.
fn run(args: &Args) -> Result<ExitCode, CliError> {
    let request = read_request(&args.request)?;
    let config = DaemonConfig::load(args.config.as_deref())?;
    let keep_workspace = args.keep_workspace || config.keep_workspaces;

    let registry = LanguageRegistry::from_entries(config.languages.entries.iter().map(|(tag, entry)| (tag.clone(), to_configured_language(entry))));
    let executor = SandboxedExecutor::new();
    let store = FlatDirectoryCaseStore::open(&args.store).map_err(|err| CliError::Store(args.store.clone(), err))?;
    let cache = RedisProgressCache::new(&config.cache_url(CACHE_URL_ENV))?;

    let case_scratch_root = config.sandbox.root.join(format!("run-{}", request.sub_fingerprint));
    fs::create_dir_all(&case_scratch_root).map_err(|err| CliError::Scratch(case_scratch_root.clone(), err))?;

    let checker = ProcessChecker::new(&executor, case_scratch_root.join("checker"));
    let interactor = ProcessInteractor::new(&executor, case_scratch_root.join("interactor"));
    let mut builder = ProcessSubmissionBuilder::new(&executor, &config.sandbox.root, &request.sub_fingerprint, &request.sub_lang, &registry)?;

    let orchestrator = Orchestrator::new(&store, &cache, &checker, Some(&interactor));
    let snapshot = orchestrator.judge(&request, &mut builder, &case_scratch_root, keep_workspace);

    if !keep_workspace {
        let _ = fs::remove_dir_all(&case_scratch_root);
    }

    write_snapshot(&snapshot).map_err(CliError::Output)?;
    Ok(exit_code_for(&snapshot))
}

/// Reads and parses the request JSON from `path`, or from stdin when
/// `path` is `-`.
fn read_request(path: &Path) -> Result<JudgeRequest, CliError> {
    let bytes = if path == Path::new("-") {
        let mut buffer = Vec::new();
        std::io::stdin().read_to_end(&mut buffer).map_err(|err| CliError::ReadRequest(path.to_path_buf(), err))?;
        buffer
    } else {
        fs::read(path).map_err(|err| CliError::ReadRequest(path.to_path_buf(), err))?
    };
    let request: JudgeRequest = serde_json::from_slice(&bytes).map_err(CliError::ParseRequest)?;
    validate_request(&request)?;
    Ok(request)
}

/// Re-checks [`JudgeRequest`]'s own construction invariant against a
/// value obtained by direct JSON deserialization, which bypasses
/// [`JudgeRequest::new`].
fn validate_request(request: &JudgeRequest) -> Result<(), JudgeRequestError> {
    if let Some(groups) = &request.group_list {
        if groups.len() != request.case_list.len() {
            return Err(JudgeRequestError::GroupListLengthMismatch {
                group_len: groups.len(),
                case_len: request.case_list.len(),
            });
        }
    }
    Ok(())
}

/// Translates a [`judge_config::LanguageEntryConfig`] into the
/// config-agnostic shape [`judge_providers::LanguageRegistry`] expects.
fn to_configured_language(entry: &judge_config::LanguageEntryConfig) -> ConfiguredLanguage {
    ConfiguredLanguage {
        compile_command: entry.compile_command.clone(),
        run_command: entry.run_command.clone(),
        source_file: entry.source_file.clone(),
        artifact_file: entry.artifact_file.clone(),
    }
}

/// Writes `snapshot` as JSON to stdout, terminated with a newline.
fn write_snapshot(snapshot: &ProgressSnapshot) -> Result<(), std::io::Error> {
    let payload = serde_json::to_vec(snapshot).unwrap_or_default();
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&payload)?;
    stdout.write_all(b"\n")
}

/// Maps a terminal snapshot to this process's exit code.
fn exit_code_for(snapshot: &ProgressSnapshot) -> ExitCode {
    match snapshot.status {
        SnapshotStatus::Reject => ExitCode::from(EXIT_JUDGING_FAILED),
        SnapshotStatus::Received => match snapshot.verdict {
            Some(verdict) if verdict == judge_core::Verdict::Accepted => ExitCode::from(EXIT_ACCEPTED),
            _ => ExitCode::from(EXIT_REJECTED_VERDICT),
        },
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

    #[test]
    fn validate_request_rejects_mismatched_group_list() {
        let request = JudgeRequest {
            sub_fingerprint: judge_core::Fingerprint::new("sub1").expect("valid fingerprint"),
            sub_code: Vec::new(),
            sub_lang: "cpp17".to_string(),
            case_list: vec![judge_core::Fingerprint::new("c1").expect("valid fingerprint"), judge_core::Fingerprint::new("c2").expect("valid fingerprint")],
            max_time_ms: 1000,
            max_memory_kb: 262_144,
            checker_fingerprint: None,
            interactor_fingerprint: None,
            run_until_complete: false,
            group_list: Some(vec![judge_core::GroupId::new(1)]),
            group_dependencies: None,
        };
        assert!(matches!(validate_request(&request), Err(JudgeRequestError::GroupListLengthMismatch { group_len: 1, case_len: 2 })));
    }

    #[test]
    fn exit_code_reflects_accepted_verdict() {
        let snapshot = ProgressSnapshot {
            status: SnapshotStatus::Received,
            verdict: Some(judge_core::Verdict::Accepted),
            detail: Some(Vec::new()),
            time: None,
            memory: None,
            message: None,
        };
        assert_eq!(exit_code_for(&snapshot), ExitCode::from(EXIT_ACCEPTED));
    }

    #[test]
    fn exit_code_reflects_reject_status() {
        let snapshot = ProgressSnapshot::reject("boom");
        assert_eq!(exit_code_for(&snapshot), ExitCode::from(EXIT_JUDGING_FAILED));
    }

    #[test]
    fn exit_code_reflects_non_accepted_verdict() {
        let snapshot = ProgressSnapshot {
            status: SnapshotStatus::Received,
            verdict: Some(judge_core::Verdict::WrongAnswer),
            detail: Some(Vec::new()),
            time: None,
            memory: None,
            message: None,
        };
        assert_eq!(exit_code_for(&snapshot), ExitCode::from(EXIT_REJECTED_VERDICT));
    }
}
