//! Fixed portal identifiers
//!
//! Every literal the remote portal's markup forces on us lives here: hidden
//! field names, control ids, page paths, and the marker substrings that
//! distinguish one 200-OK body from another. Nothing outside this module
//! spells out a portal identifier, so a markup change is a one-file fix.

// ---------------------------------------------------------------------------
// Hidden-state fields (names must be reproduced exactly; content is opaque)
// ---------------------------------------------------------------------------

pub const VIEW_STATE: &str = "__VIEWSTATE";
pub const VIEW_STATE_GENERATOR: &str = "__VIEWSTATEGENERATOR";
pub const EVENT_VALIDATION: &str = "__EVENTVALIDATION";
pub const EVENT_TARGET: &str = "__EVENTTARGET";
pub const EVENT_ARGUMENT: &str = "__EVENTARGUMENT";
pub const LAST_FOCUS: &str = "__LASTFOCUS";

/// ScriptManager field that marks a submission as a partial postback.
pub const SCRIPT_MANAGER: &str = "ctl00$smMain";

// ---------------------------------------------------------------------------
// Page paths
// ---------------------------------------------------------------------------

pub const PATH_LOGIN: &str = "Login.aspx";
/// Institution dashboard; hosts the admissions-open hidden flag.
pub const PATH_INSTITUTION: &str = "Institution/Home.aspx";
pub const PATH_LEARNER_LISTING: &str = "Learner/Listing.aspx";
pub const PATH_PLACEMENT_REQUEST: &str = "Admission/RequestPlacement.aspx";
pub const PATH_ADMISSION: &str = "Admission/AdmitLearner.aspx";
pub const PATH_BIODATA: &str = "Learner/Biodata.aspx";
pub const PATH_TRANSFER_IN: &str = "Learner/TransferIn.aspx";

// ---------------------------------------------------------------------------
// Login page controls and outcome markers
// ---------------------------------------------------------------------------

pub const LOGIN_USERNAME: &str = "ctl00$cphMain$txtUserName";
pub const LOGIN_PASSWORD: &str = "ctl00$cphMain$txtPassword";
pub const LOGIN_BUTTON: &str = "ctl00$cphMain$btnLogin";

/// The portal answers 200 for both login outcomes; only the redirect target
/// embedded in the body tells them apart.
pub const MARKER_LOGIN_SUCCESS: &str = "pageRedirect||Default.aspx";
pub const MARKER_INVALID_CREDENTIALS: &str = "Invalid Username or Password";
/// Expired/unauthorized sessions come back as a 200 body redirecting here.
pub const MARKER_SESSION_EXPIRED: &str = "pageRedirect||Login.aspx%3fReturnUrl";
/// Any body carrying a redirect directive is terminal: it ends the current
/// conversation page and carries no hidden state of its own.
pub const MARKER_PAGE_REDIRECT: &str = "pageRedirect||";

// ---------------------------------------------------------------------------
// Listing page controls
// ---------------------------------------------------------------------------

/// Anchor attribute of the learner listing table.
pub const LISTING_TABLE_ANCHOR: &str = "id=\"grdLearners\"";
pub const LISTING_PAGE_SIZE_CONTROL: &str = "ctl00$cphMain$ddlPageSize";
pub const LISTING_CATEGORY_CONTROL: &str = "ctl00$cphMain$ddlCategory";
/// Prefix of per-row action controls inside the listing grid. The numeric
/// `ctlNN` suffix of the first data row is observed, not assumed.
pub const LISTING_ROW_CONTROL_PREFIX: &str = "grdLearners$ctl";

// ---------------------------------------------------------------------------
// Placement request page
// ---------------------------------------------------------------------------

pub const REQUEST_INDEX_NUMBER: &str = "ctl00$cphMain$txtIndexNo";
pub const REQUEST_LEARNER_NAME: &str = "ctl00$cphMain$txtLearnerName";
pub const REQUEST_GENDER: &str = "ctl00$cphMain$ddlGender";
pub const REQUEST_GRADE: &str = "ctl00$cphMain$ddlGrade";
/// Pre-check button: renders the vacancy position for the selected grade
/// before any request is placed.
pub const REQUEST_PRECHECK: &str = "ctl00$cphMain$btnCheckVacancies";
pub const REQUEST_SUBMIT: &str = "ctl00$cphMain$btnRequest";

pub const MARKER_REQUEST_SAVED: &str = "Request Placed Successfully";
pub const MARKER_NO_VACANCIES: &str = "No Vacancies Available";

// ---------------------------------------------------------------------------
// Admission page
// ---------------------------------------------------------------------------

/// Hidden flag on the institution dashboard; "1" when admissions are open.
pub const ADMISSION_OPEN_FLAG: &str = "hdnAdmissionsOpen";
pub const ADMIT_INDEX_NUMBER: &str = "ctl00$cphMain$txtAdmIndexNo";
pub const ADMIT_SUBMIT: &str = "ctl00$cphMain$btnAdmit";
/// Second-phase confirmation button; only its response confirms admission.
pub const ADMIT_CONFIRM: &str = "ctl00$cphMain$btnConfirmAdmit";

pub const MARKER_ADMITTED: &str = "Learner Admitted Successfully";
/// An admission attempt for a never-requested learner bounces to the
/// placement-request flow instead of a confirmation page.
pub const MARKER_ADMIT_REDIRECT_TO_REQUEST: &str = "RequestPlacement.aspx";

// ---------------------------------------------------------------------------
// Biodata capture page
// ---------------------------------------------------------------------------

pub const BIODATA_FIRST_NAME: &str = "ctl00$cphMain$txtFirstName";
pub const BIODATA_MIDDLE_NAME: &str = "ctl00$cphMain$txtMiddleName";
pub const BIODATA_SURNAME: &str = "ctl00$cphMain$txtSurname";
pub const BIODATA_GENDER: &str = "ctl00$cphMain$ddlBioGender";
pub const BIODATA_DOB: &str = "ctl00$cphMain$txtDob";
pub const BIODATA_BIRTH_CERT: &str = "ctl00$cphMain$txtBirthCertNo";
pub const BIODATA_COUNTY: &str = "ctl00$cphMain$ddlCounty";
pub const BIODATA_SUB_COUNTY: &str = "ctl00$cphMain$ddlSubCounty";
pub const BIODATA_FATHER_NAME: &str = "ctl00$cphMain$txtFatherName";
pub const BIODATA_FATHER_PHONE: &str = "ctl00$cphMain$txtFatherPhone";
pub const BIODATA_FATHER_ID: &str = "ctl00$cphMain$txtFatherIdNo";
pub const BIODATA_MOTHER_NAME: &str = "ctl00$cphMain$txtMotherName";
pub const BIODATA_MOTHER_PHONE: &str = "ctl00$cphMain$txtMotherPhone";
pub const BIODATA_MOTHER_ID: &str = "ctl00$cphMain$txtMotherIdNo";
pub const BIODATA_GUARDIAN_NAME: &str = "ctl00$cphMain$txtGuardianName";
pub const BIODATA_GUARDIAN_PHONE: &str = "ctl00$cphMain$txtGuardianPhone";
pub const BIODATA_GUARDIAN_ID: &str = "ctl00$cphMain$txtGuardianIdNo";
/// "1" tells the server to proceed past its non-fatal validation prompt.
pub const BIODATA_IGNORE_FLAG: &str = "ctl00$cphMain$hdnIgnoreError";
pub const BIODATA_SUBMIT: &str = "ctl00$cphMain$btnSaveBiodata";

pub const MARKER_BASIC_SAVED: &str = "Basic Details Saved Successfully";
pub const MARKER_IGNORE_PROMPT: &str = "Do you want to ignore this error and continue";
/// Span holding a freshly issued UPI on the confirmation panel.
pub const FIELD_ASSIGNED_UPI: &str = "lblAssignedUpi";
/// General-purpose alert label present on every form page.
pub const FIELD_ALERT: &str = "lblAlertMsg";

// ---------------------------------------------------------------------------
// Transfer-in page
// ---------------------------------------------------------------------------

pub const TRANSFER_UPI: &str = "ctl00$cphMain$txtTransferUpi";
pub const TRANSFER_BIRTH_CERT: &str = "ctl00$cphMain$txtTransferBirthCert";
pub const TRANSFER_REASON: &str = "ctl00$cphMain$txtTransferReason";
pub const TRANSFER_SUBMIT: &str = "ctl00$cphMain$btnRequestTransfer";

/// Transfer-in success means "saved, pending release by the other side",
/// never immediate completion.
pub const MARKER_TRANSFER_SAVED: &str = "Transfer Request Saved Awaiting Release";
