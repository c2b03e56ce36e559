// judge-core/src/core/mod.rs
// ============================================================================
// Module: Core Data Model
// Description: Fingerprints, verdicts, cases, requests, and the wire shapes
//              published to the progress cache.
// ============================================================================

mod case;
mod fingerprint;
mod group;
mod request;
mod result;
mod snapshot;
mod verdict;

pub use case::Case;
pub use case::CheckerRef;
pub use case::InteractorRef;
pub use fingerprint::Fingerprint;
pub use fingerprint::FingerprintError;
pub use fingerprint::DEFAULT_CHECKER_FINGERPRINT;
pub use group::GroupDependencyTable;
pub use group::GroupId;
pub use request::JudgeRequest;
pub use request::JudgeRequestError;
pub use request::RawGroupEdge;
pub use result::CaseResult;
pub use result::CaseVerdict;
pub use result::SKIPPED_VERDICT;
pub use snapshot::ProgressSnapshot;
pub use snapshot::SnapshotStatus;
pub use verdict::Verdict;
