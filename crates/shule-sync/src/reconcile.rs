//! Reconciliation matching
//!
//! Given a local learner with no remote identifier yet and a candidate
//! remote record (from the lookup API or a listing page), decide what the
//! record implies: capture directly, adopt as already captured, open a
//! transfer, or stop on a conflict. Outcomes are a closed set of tagged
//! variants; callers handle them exhaustively instead of string-matching
//! error text.

use serde::Serialize;
use tracing::debug;

use shule_core::config::InstitutionLevel;
use shule_core::ids::LearnerId;
use shule_core::learner::{Gender, Learner};
use shule_core::record::FieldMap;

use crate::name_match::{score_name, NameScore, MIN_NAME_CONFIDENCE};

// Remote field names as the lookup API and listing extraction render them.
// Lookup keys are lowercased JSON keys; listing keys are normalized headers.
const FIELDS_UPI: &[&str] = &["upi", "learner_upi"];
const FIELDS_NAME: &[&str] = &["name", "learner_name", "names"];
const FIELDS_GENDER: &[&str] = &["gender", "sex"];
const FIELDS_INSTITUTION_CODE: &[&str] = &["institutioncode", "institution_code", "inst_code"];
const FIELDS_INSTITUTION_LEVEL: &[&str] = &["institutionlevel", "institution_level", "level"];

fn remote_field<'a>(record: &'a FieldMap, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| record.get_trimmed(name))
}

/// What a candidate remote record implies for a local learner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum MatchDecision {
    /// The remote system does not own this learner at our level; biodata
    /// capture can proceed directly.
    CaptureDirectly,
    /// The record already belongs to our own institution; adopt its
    /// identifiers locally, submit nothing.
    AlreadyCaptured {
        upi: Option<String>,
    },
    /// Same level, same person with sufficient confidence: request a
    /// transfer-in instead of capturing.
    TransferCandidate {
        confidence: f64,
    },
    /// Plausibly a different person, or one under different control;
    /// requires human or explicit transfer-flow resolution.
    Conflict {
        reason: String,
    },
}

/// One scored pairing of the local learner and a remote record.
#[derive(Debug, Clone, Serialize)]
pub struct MatchCandidate {
    pub learner_id: LearnerId,
    pub record: FieldMap,
    pub confidence: f64,
    pub score: NameScore,
}

/// Reconciliation matcher for one institution.
#[derive(Debug, Clone)]
pub struct Reconciler {
    institution_code: String,
    institution_level: InstitutionLevel,
}

impl Reconciler {
    /// Create a matcher for the given institution identity.
    pub fn new(institution_code: impl Into<String>, institution_level: InstitutionLevel) -> Self {
        Self {
            institution_code: institution_code.into(),
            institution_level,
        }
    }

    /// Classify one candidate remote record against a local learner.
    ///
    /// Priority order is fixed; notably, a record under our own institution
    /// code is `AlreadyCaptured` before any gender or name comparison is
    /// even attempted.
    pub fn classify(&self, learner: &Learner, remote: &FieldMap) -> MatchDecision {
        let remote_code = remote_field(remote, FIELDS_INSTITUTION_CODE);
        let remote_level =
            remote_field(remote, FIELDS_INSTITUTION_LEVEL).and_then(InstitutionLevel::parse_portal);
        let remote_upi = remote_field(remote, FIELDS_UPI).map(str::to_string);

        // 1. No institution information at all: nobody owns the learner.
        if remote_code.is_none() && remote_level.is_none() {
            return MatchDecision::CaptureDirectly;
        }

        // 2. Our own record, observed remotely.
        if remote_code == Some(self.institution_code.as_str()) {
            debug!(learner_id = %learner.id, "remote record already under own institution");
            return MatchDecision::AlreadyCaptured { upi: remote_upi };
        }

        let Some(remote_level) = remote_level else {
            // 6. Institution present but no usable level (alumnus records,
            // archived shapes): the level that matters is unclaimed.
            return MatchDecision::CaptureDirectly;
        };

        // 3. Owned at a lower level than ours.
        if remote_level < self.institution_level {
            return MatchDecision::CaptureDirectly;
        }

        // 5. Owned at a higher level than ours.
        if remote_level > self.institution_level {
            return MatchDecision::CaptureDirectly;
        }

        // 4. Same level at another institution: same person?
        if let Some(remote_gender) = remote_field(remote, FIELDS_GENDER).and_then(Gender::parse_portal)
        {
            if remote_gender != learner.gender {
                return MatchDecision::Conflict {
                    reason: format!(
                        "gender mismatch: local {} vs remote {}",
                        learner.gender, remote_gender
                    ),
                };
            }
        }

        let remote_name = remote_field(remote, FIELDS_NAME).unwrap_or_default();
        let score = score_name(&learner.full_name(), remote_name);
        if !score.is_match() {
            return MatchDecision::Conflict {
                reason: format!(
                    "name confidence {:.2} below {:.2} for remote name {remote_name:?}",
                    score.confidence, MIN_NAME_CONFIDENCE
                ),
            };
        }

        MatchDecision::TransferCandidate {
            confidence: score.confidence,
        }
    }

    /// Score a batch of candidate records for one learner, best first.
    pub fn rank_candidates(&self, learner: &Learner, records: Vec<FieldMap>) -> Vec<MatchCandidate> {
        let reference = learner.full_name();
        let mut candidates: Vec<MatchCandidate> = records
            .into_iter()
            .map(|record| {
                let remote_name = remote_field(&record, FIELDS_NAME).unwrap_or_default();
                let score = score_name(&reference, remote_name);
                MatchCandidate {
                    learner_id: learner.id,
                    confidence: score.confidence,
                    score,
                    record,
                }
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates
    }
}
