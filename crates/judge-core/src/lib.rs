// judge-core/src/lib.rs
// ============================================================================
// Module: Judge Core Library
// Description: Public API surface for the judging orchestrator core.
// Purpose: Expose the data model, collaborator interfaces, and the
//          orchestration runtime (Judge Orchestrator, Case Runner,
//          Interactive Runner, Group Dependency Resolver).
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Judge core implements the per-submission judging orchestrator: it
//! compiles a candidate solution, runs it against a sequence of test cases
//! under sandboxed resource limits, scores each case via a checker,
//! aggregates a verdict, and publishes incremental progress to a shared
//! result cache. It is backend-agnostic — it integrates with a compiler
//! toolchain, a sandboxed executor, a fingerprint store, and a progress
//! cache only through the traits in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CacheError;
pub use interfaces::CaseStore;
pub use interfaces::Checker;
pub use interfaces::CheckerError;
pub use interfaces::CheckOutcome;
pub use interfaces::CompileError;
pub use interfaces::ContestantSpec;
pub use interfaces::ExecError;
pub use interfaces::ExecOutcome;
pub use interfaces::ExecRequest;
pub use interfaces::Interactor;
pub use interfaces::ProgressCache;
pub use interfaces::StoreError;
pub use interfaces::SubmissionBuilder;
pub use interfaces::TerminationReason;
pub use runtime::CaseRunner;
pub use runtime::CaseRunnerError;
pub use runtime::GroupDependencyResolver;
pub use runtime::InteractiveRunner;
pub use runtime::InteractiveRunnerError;
pub use runtime::JudgeError;
pub use runtime::Orchestrator;
pub use runtime::TRACEBACK_LIMIT;
