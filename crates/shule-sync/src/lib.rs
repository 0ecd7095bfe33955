//! # shule-sync
//!
//! Decision and orchestration layer over `shule-portal`:
//!
//! - [`engine::LifecycleEngine`] - drives one learner through one lifecycle
//!   transition per call (request, admit, capture, transfer-in), over one
//!   strictly sequential portal conversation
//! - [`reconcile::Reconciler`] - classifies candidate remote records for a
//!   learner with no remote identifier yet
//! - [`name_match`] - re-ordering-tolerant name confidence scoring behind
//!   the reconciler
//! - [`bulk::BulkRunner`] - bounded fan-out across independent learners,
//!   one fresh conversation each, settle-all
//! - [`ports`] - collaborator seams (credentials, lookup)

pub mod bulk;
pub mod engine;
pub mod name_match;
pub mod ports;
pub mod reconcile;

pub use bulk::{partition_outcomes, BulkRunner, LearnerOutcome, SyncOperation};
pub use engine::{LifecycleEngine, TransitionOutcome};
pub use name_match::{name_confidence, score_name, NameScore, TokenDelta, MIN_NAME_CONFIDENCE};
pub use ports::{config_with_credentials, CredentialSource, StaticCredentials};
pub use reconcile::{MatchCandidate, MatchDecision, Reconciler};
