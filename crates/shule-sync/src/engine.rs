//! Learner lifecycle engine
//!
//! Drives one learner through one lifecycle transition per call: placement
//! request, admission, biodata capture, or transfer-in. Each transition is
//! a bounded sequence of `SessionClient` operations whose page-level
//! outcomes are translated into a typed result.
//!
//! Two rules hold everywhere:
//!
//! - a transition never counts as succeeded without a positively recognized
//!   confirmation marker; an unrecognized page is a failure, never an
//!   assumed success;
//! - nothing is retried automatically. The single "ignore this error"
//!   resubmission during capture is the only retry, and it happens exactly
//!   once.
//!
//! Re-attempting an already-satisfied transition is detected from the
//! learner's transaction state before any request is issued and reported as
//! [`TransitionOutcome::AlreadySatisfied`], a no-op success rather than a
//! duplicate submission.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use shule_core::error::{PortalError, PortalResult};
use shule_core::learner::{Learner, TransactionState};
use shule_portal::client::{Page, SessionClient};
use shule_portal::{extract, geo, selectors};

/// Result of one attempted lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// The transition ran and the portal confirmed it.
    Completed {
        new_state: TransactionState,
        /// Freshly issued remote identifier, when the portal assigned one.
        upi: Option<String>,
    },
    /// The learner's state already satisfies this transition; nothing was
    /// submitted.
    AlreadySatisfied { state: TransactionState },
}

/// Engine driving one learner transition at a time over one conversation.
///
/// Owns its [`SessionClient`] exclusively; the client's sequential
/// discipline carries over, so an engine is a single logical thread of
/// control.
#[derive(Debug)]
pub struct LifecycleEngine {
    client: SessionClient,
}

impl LifecycleEngine {
    /// Create an engine over an authenticated client.
    pub fn new(client: SessionClient) -> Self {
        Self { client }
    }

    /// Give the conversation back, e.g. for listing work after a batch.
    pub fn into_client(self) -> SessionClient {
        self.client
    }

    // -----------------------------------------------------------------------
    // request
    // -----------------------------------------------------------------------

    /// Place a placement request for a new joiner.
    #[instrument(skip(self, learner), fields(learner_id = %learner.id))]
    pub async fn request(&mut self, learner: &Learner) -> PortalResult<TransitionOutcome> {
        if learner.state.satisfies_request() {
            debug!(state = %learner.state, "placement already requested");
            return Ok(TransitionOutcome::AlreadySatisfied {
                state: learner.state,
            });
        }
        if learner.state != TransactionState::Unsubmitted {
            return Err(PortalError::prerequisite(format!(
                "placement request does not apply to state {}",
                learner.state
            )));
        }
        let index_number = learner.index_number.as_deref().ok_or_else(|| {
            PortalError::prerequisite("placement request needs an index number")
        })?;

        self.client.navigate(selectors::PATH_PLACEMENT_REQUEST).await?;

        // Vacancy pre-check renders the position for the grade before any
        // request is placed.
        let precheck = self
            .client
            .submit(
                selectors::PATH_PLACEMENT_REQUEST,
                "",
                "",
                vec![
                    (selectors::REQUEST_GRADE.to_string(), learner.grade.as_form_value()),
                    (selectors::REQUEST_PRECHECK.to_string(), "Check".to_string()),
                ],
            )
            .await?;
        if precheck.contains(selectors::MARKER_NO_VACANCIES) {
            let message = alert_text(&precheck)
                .unwrap_or_else(|| selectors::MARKER_NO_VACANCIES.to_string());
            warn!(%message, "vacancies exhausted");
            return Err(PortalError::CapacityExhausted { message });
        }

        let page = self
            .client
            .submit(
                selectors::PATH_PLACEMENT_REQUEST,
                "",
                "",
                vec![
                    (selectors::REQUEST_INDEX_NUMBER.to_string(), index_number.to_string()),
                    (selectors::REQUEST_LEARNER_NAME.to_string(), learner.full_name()),
                    (
                        selectors::REQUEST_GENDER.to_string(),
                        learner.gender.as_portal_code().to_string(),
                    ),
                    (selectors::REQUEST_GRADE.to_string(), learner.grade.as_form_value()),
                    (selectors::REQUEST_SUBMIT.to_string(), "Request".to_string()),
                ],
            )
            .await?;

        if page.contains(selectors::MARKER_REQUEST_SAVED) {
            info!("placement request saved");
            return Ok(TransitionOutcome::Completed {
                new_state: TransactionState::Requested,
                upi: None,
            });
        }
        match alert_text(&page) {
            Some(message) => Err(PortalError::request_failed(message)),
            None => Err(PortalError::unrecognized("placement request")),
        }
    }

    // -----------------------------------------------------------------------
    // admit
    // -----------------------------------------------------------------------

    /// Admit a requested learner. Two-phase: only the second confirmation
    /// submission's success text confirms the admission.
    #[instrument(skip(self, learner), fields(learner_id = %learner.id))]
    pub async fn admit(&mut self, learner: &Learner) -> PortalResult<TransitionOutcome> {
        if learner.state.satisfies_admission() {
            debug!(state = %learner.state, "already admitted");
            return Ok(TransitionOutcome::AlreadySatisfied {
                state: learner.state,
            });
        }
        if !learner.state.satisfies_request() {
            return Err(PortalError::prerequisite(
                "admission requires a placement request first",
            ));
        }
        let index_number = learner
            .index_number
            .as_deref()
            .ok_or_else(|| PortalError::prerequisite("admission needs an index number"))?;

        // The admissions-open flag lives on the institution dashboard, not
        // on the admission page itself.
        let dashboard = self.client.navigate(selectors::PATH_INSTITUTION).await?;
        let admissions_open = extract::element_value(dashboard.body(), selectors::ADMISSION_OPEN_FLAG)
            .is_some_and(|flag| flag.trim() == "1");
        if !admissions_open {
            return Err(PortalError::prerequisite(
                "admissions are closed on the portal",
            ));
        }

        self.client.navigate(selectors::PATH_ADMISSION).await?;
        let first = self
            .client
            .submit(
                selectors::PATH_ADMISSION,
                "",
                "",
                vec![
                    (selectors::ADMIT_INDEX_NUMBER.to_string(), index_number.to_string()),
                    (selectors::ADMIT_SUBMIT.to_string(), "Admit".to_string()),
                ],
            )
            .await?;

        // A bounce into the request flow means the learner was never
        // requested remotely; never silently request on their behalf.
        if first.contains(selectors::MARKER_ADMIT_REDIRECT_TO_REQUEST) {
            return Err(PortalError::prerequisite(
                "portal has no placement request for this learner",
            ));
        }
        if !first.contains(selectors::ADMIT_CONFIRM) {
            return match alert_text(&first) {
                Some(message) => Err(PortalError::request_failed(message)),
                None => Err(PortalError::unrecognized("admission")),
            };
        }

        let second = self
            .client
            .submit(
                selectors::PATH_ADMISSION,
                "",
                "",
                vec![(selectors::ADMIT_CONFIRM.to_string(), "Confirm".to_string())],
            )
            .await?;

        if second.contains(selectors::MARKER_ADMITTED) {
            info!("admission confirmed");
            return Ok(TransitionOutcome::Completed {
                new_state: TransactionState::Admitted,
                upi: None,
            });
        }
        match alert_text(&second) {
            Some(message) => Err(PortalError::request_failed(message)),
            None => Err(PortalError::unrecognized("admission confirmation")),
        }
    }

    // -----------------------------------------------------------------------
    // capture
    // -----------------------------------------------------------------------

    /// Capture a learner's biodata.
    ///
    /// The county choice is submitted and acknowledged first because the
    /// sub-county options are server-rendered from it; skipping that
    /// partial postback gets the full submission rejected.
    #[instrument(skip(self, learner), fields(learner_id = %learner.id))]
    pub async fn capture_biodata(&mut self, learner: &Learner) -> PortalResult<TransitionOutcome> {
        if learner.state.satisfies_capture() {
            debug!(state = %learner.state, "biodata already captured");
            return Ok(TransitionOutcome::AlreadySatisfied {
                state: learner.state,
            });
        }
        if !learner.state.ready_for_capture() {
            return Err(PortalError::prerequisite(format!(
                "biodata capture requires admission; learner is {}",
                learner.state
            )));
        }

        self.client.navigate(selectors::PATH_BIODATA).await?;

        let county_code = geo::county_code(learner.county.as_deref()).to_string();
        let county_page = self
            .client
            .submit(
                selectors::PATH_BIODATA,
                selectors::BIODATA_COUNTY,
                "",
                vec![
                    (
                        selectors::SCRIPT_MANAGER.to_string(),
                        format!("ctl00$upMain|{}", selectors::BIODATA_COUNTY),
                    ),
                    (selectors::BIODATA_COUNTY.to_string(), county_code.clone()),
                ],
            )
            .await?;

        let sub_county_options =
            extract::select_options(county_page.body(), selectors::BIODATA_SUB_COUNTY);
        let sub_county = geo::select_sub_county(&sub_county_options, learner.sub_county.as_deref())
            .map(|(value, _)| value.clone())
            .unwrap_or_default();
        debug!(county = %county_code, sub_county = %sub_county, "location resolved");

        let fields = biodata_fields(learner, &county_code, &sub_county, "0");
        let first = self
            .client
            .submit(selectors::PATH_BIODATA, "", "", fields)
            .await?;

        let page = if first.contains(selectors::MARKER_IGNORE_PROMPT) {
            // Resubmit the identical payload with the ignore flag set,
            // exactly once. A second prompt is a hard failure: the portal
            // is looping, and so would we.
            warn!("portal raised its ignorable-error prompt; resubmitting once");
            let fields = biodata_fields(learner, &county_code, &sub_county, "1");
            let second = self
                .client
                .submit(selectors::PATH_BIODATA, "", "", fields)
                .await?;
            if second.contains(selectors::MARKER_IGNORE_PROMPT) {
                let message = alert_text(&second)
                    .unwrap_or_else(|| selectors::MARKER_IGNORE_PROMPT.to_string());
                return Err(PortalError::capture_failed(message));
            }
            second
        } else {
            first
        };

        let upi = extract::element_value(page.body(), selectors::FIELD_ASSIGNED_UPI)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        if page.contains(selectors::MARKER_BASIC_SAVED) || upi.is_some() {
            info!(upi = upi.as_deref().unwrap_or(""), "biodata captured");
            return Ok(TransitionOutcome::Completed {
                new_state: TransactionState::Captured,
                upi,
            });
        }
        match alert_text(&page) {
            Some(message) => Err(PortalError::capture_failed(message)),
            None => Err(PortalError::unrecognized("biodata capture")),
        }
    }

    // -----------------------------------------------------------------------
    // transfer-in
    // -----------------------------------------------------------------------

    /// Request a transfer-in for a learner enrolled elsewhere.
    ///
    /// Success means "request saved, pending release by the other side";
    /// completion is only observable by re-querying the portal later.
    #[instrument(skip(self, learner), fields(learner_id = %learner.id))]
    pub async fn transfer_in(&mut self, learner: &Learner) -> PortalResult<TransitionOutcome> {
        if learner.state == TransactionState::TransferIn {
            return Ok(TransitionOutcome::AlreadySatisfied {
                state: learner.state,
            });
        }
        if !learner.state.can_enter_transfer() {
            return Err(PortalError::prerequisite(format!(
                "transfer-in does not apply to state {}",
                learner.state
            )));
        }
        let upi = learner.upi.as_deref().ok_or_else(|| {
            PortalError::prerequisite("transfer-in needs the learner's existing UPI")
        })?;

        self.client.navigate(selectors::PATH_TRANSFER_IN).await?;
        let page = self
            .client
            .submit(
                selectors::PATH_TRANSFER_IN,
                "",
                "",
                vec![
                    (selectors::TRANSFER_UPI.to_string(), upi.to_string()),
                    (
                        selectors::TRANSFER_BIRTH_CERT.to_string(),
                        learner.birth_certificate.clone().unwrap_or_default(),
                    ),
                    (
                        selectors::TRANSFER_REASON.to_string(),
                        "Enrolment at current institution".to_string(),
                    ),
                    (selectors::TRANSFER_SUBMIT.to_string(), "Request Transfer".to_string()),
                ],
            )
            .await?;

        if page.contains(selectors::MARKER_TRANSFER_SAVED) {
            info!("transfer-in request saved, pending release");
            return Ok(TransitionOutcome::Completed {
                new_state: TransactionState::TransferIn,
                upi: Some(upi.to_string()),
            });
        }
        match alert_text(&page) {
            Some(message) => Err(PortalError::request_failed(message)),
            None => Err(PortalError::unrecognized("transfer-in request")),
        }
    }
}

/// Non-empty alert label text, if the page carries one.
fn alert_text(page: &Page) -> Option<String> {
    extract::element_value(page.body(), selectors::FIELD_ALERT)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// The full biodata form for one learner. The learner's actual birth
/// certificate number is always submitted; no substitute values.
fn biodata_fields(
    learner: &Learner,
    county_code: &str,
    sub_county: &str,
    ignore_flag: &str,
) -> Vec<(String, String)> {
    vec![
        (selectors::BIODATA_FIRST_NAME.to_string(), learner.first_name.clone()),
        (
            selectors::BIODATA_MIDDLE_NAME.to_string(),
            learner.middle_name.clone().unwrap_or_default(),
        ),
        (selectors::BIODATA_SURNAME.to_string(), learner.surname.clone()),
        (
            selectors::BIODATA_GENDER.to_string(),
            learner.gender.as_portal_code().to_string(),
        ),
        (selectors::BIODATA_DOB.to_string(), learner.dob_form_value()),
        (
            selectors::BIODATA_BIRTH_CERT.to_string(),
            learner.birth_certificate.clone().unwrap_or_default(),
        ),
        (selectors::BIODATA_COUNTY.to_string(), county_code.to_string()),
        (selectors::BIODATA_SUB_COUNTY.to_string(), sub_county.to_string()),
        (
            selectors::BIODATA_FATHER_NAME.to_string(),
            learner.contacts.father.name.clone().unwrap_or_default(),
        ),
        (
            selectors::BIODATA_FATHER_PHONE.to_string(),
            learner.contacts.father.phone.clone().unwrap_or_default(),
        ),
        (
            selectors::BIODATA_FATHER_ID.to_string(),
            learner.contacts.father.id_number.clone().unwrap_or_default(),
        ),
        (
            selectors::BIODATA_MOTHER_NAME.to_string(),
            learner.contacts.mother.name.clone().unwrap_or_default(),
        ),
        (
            selectors::BIODATA_MOTHER_PHONE.to_string(),
            learner.contacts.mother.phone.clone().unwrap_or_default(),
        ),
        (
            selectors::BIODATA_MOTHER_ID.to_string(),
            learner.contacts.mother.id_number.clone().unwrap_or_default(),
        ),
        (
            selectors::BIODATA_GUARDIAN_NAME.to_string(),
            learner.contacts.guardian.name.clone().unwrap_or_default(),
        ),
        (
            selectors::BIODATA_GUARDIAN_PHONE.to_string(),
            learner.contacts.guardian.phone.clone().unwrap_or_default(),
        ),
        (
            selectors::BIODATA_GUARDIAN_ID.to_string(),
            learner.contacts.guardian.id_number.clone().unwrap_or_default(),
        ),
        (selectors::BIODATA_IGNORE_FLAG.to_string(), ignore_flag.to_string()),
        (selectors::BIODATA_SUBMIT.to_string(), "Save".to_string()),
    ]
}
