//! Local learner model and transaction state machine
//!
//! The learner record mirrors what the external store holds: biodata,
//! contact triples, and the finite transaction state tracking progress
//! through the remote lifecycle. Persistence itself lives elsewhere; this
//! crate only defines the shape.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::LearnerId;

/// Learner gender as the portal encodes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Single-letter form used in portal forms and listings.
    pub fn as_portal_code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    /// Parse the portal's rendering ("M", "MALE", "F", "FEMALE").
    pub fn parse_portal(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "M" | "MALE" => Some(Gender::Male),
            "F" | "FEMALE" => Some(Gender::Female),
            _ => None,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_portal_code())
    }
}

/// Grade/class a learner belongs to, by portal numeric code.
///
/// The portal keys everything on the numeric grade code; the label is only
/// for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grade(pub u8);

impl Grade {
    /// The portal's numeric code for this grade.
    pub fn code(&self) -> u8 {
        self.0
    }

    /// Form the value submitted in grade selection controls.
    pub fn as_form_value(&self) -> String {
        self.0.to_string()
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Grade {}", self.0)
    }
}

/// One parent/guardian contact triple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub id_number: Option<String>,
}

impl Contact {
    /// Whether any of the three fields is present.
    pub fn is_present(&self) -> bool {
        self.name.is_some() || self.phone.is_some() || self.id_number.is_some()
    }
}

/// Father/mother/guardian contacts for one learner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSet {
    #[serde(default)]
    pub father: Contact,
    #[serde(default)]
    pub mother: Contact,
    #[serde(default)]
    pub guardian: Contact,
}

/// Finite state of one learner's progress through the remote system.
///
/// New joiners: `Unsubmitted → Requested → Admitted → Captured → Reported`.
/// Continuing learners: `PendingCapture → Captured`.
/// `TransferOut`/`TransferIn` are reachable from any non-terminal state
/// when a birth-certificate/UPI collision with another institution is
/// detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    Unsubmitted,
    Requested,
    Admitted,
    Captured,
    Reported,
    PendingCapture,
    TransferOut,
    TransferIn,
}

impl TransactionState {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionState::Unsubmitted => "unsubmitted",
            TransactionState::Requested => "requested",
            TransactionState::Admitted => "admitted",
            TransactionState::Captured => "captured",
            TransactionState::Reported => "reported",
            TransactionState::PendingCapture => "pending_capture",
            TransactionState::TransferOut => "transfer_out",
            TransactionState::TransferIn => "transfer_in",
        }
    }

    /// Terminal states: nothing left to drive.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionState::Reported)
    }

    /// Rank along the new-joiner path, for already-satisfied checks.
    /// Transfer and continuing states sit outside this ordering.
    fn progress_rank(&self) -> Option<u8> {
        match self {
            TransactionState::Unsubmitted => Some(0),
            TransactionState::Requested => Some(1),
            TransactionState::Admitted => Some(2),
            TransactionState::Captured => Some(3),
            TransactionState::Reported => Some(4),
            _ => None,
        }
    }

    /// Whether a placement request has already been made (or surpassed).
    pub fn satisfies_request(&self) -> bool {
        self.progress_rank().is_some_and(|r| r >= 1)
    }

    /// Whether admission has already happened (or been surpassed).
    pub fn satisfies_admission(&self) -> bool {
        self.progress_rank().is_some_and(|r| r >= 2)
    }

    /// Whether biodata capture has already happened (or been surpassed).
    pub fn satisfies_capture(&self) -> bool {
        self.progress_rank().is_some_and(|r| r >= 3)
            || matches!(self, TransactionState::TransferIn)
    }

    /// Whether capture may be attempted from this state.
    pub fn ready_for_capture(&self) -> bool {
        matches!(
            self,
            TransactionState::Admitted | TransactionState::PendingCapture
        )
    }

    /// Whether a transfer sub-state may be entered from here.
    pub fn can_enter_transfer(&self) -> bool {
        !self.is_terminal()
            && !matches!(
                self,
                TransactionState::TransferOut | TransactionState::TransferIn
            )
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One locally held learner record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learner {
    /// Local identifier.
    pub id: LearnerId,
    /// First name.
    pub first_name: String,
    /// Middle name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    /// Surname.
    pub surname: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub grade: Grade,
    /// Birth certificate entry number, the portal's strongest natural key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_certificate: Option<String>,
    /// KCPE/placement index number, used by the request flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_number: Option<String>,
    /// Free-text county and sub-county of residence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_county: Option<String>,
    #[serde(default)]
    pub contacts: ContactSet,
    /// Remote identifier (UPI) once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upi: Option<String>,
    pub state: TransactionState,
    /// Verbatim remote message from the last failed attempt, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Learner {
    /// Full name in portal order: first, middle, surname.
    pub fn full_name(&self) -> String {
        match &self.middle_name {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.surname),
            None => format!("{} {}", self.first_name, self.surname),
        }
    }

    /// Date of birth in the portal's form format (dd/mm/yyyy).
    pub fn dob_form_value(&self) -> String {
        self.date_of_birth.format("%d/%m/%Y").to_string()
    }
}
