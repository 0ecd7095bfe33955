//! Integration tests for the session client against a mock portal.
//!
//! The mock reproduces the portal's defining behaviors: hidden-state tokens
//! on every page, 200-OK bodies for both success and failure, redirect
//! directives embedded in partial-postback bodies, and sticky listing
//! pagination.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shule_core::config::{InstitutionLevel, PortalConfig};
use shule_portal::{listing_row_controls, SessionClient};

// =============================================================================
// Test helpers
// =============================================================================

fn config_for(server: &MockServer) -> PortalConfig {
    PortalConfig::new(server.uri())
        .with_credentials("inst-0001", "secret")
        .with_institution("10203040", InstitutionLevel::Primary)
}

/// A full page rendering carrying the hidden-state token set.
fn stateful_page(extra: &str) -> String {
    format!(
        r#"<html><body><form method="post" action="./page.aspx">
        <input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="dDwtMTcxMT" />
        <input type="hidden" name="__VIEWSTATEGENERATOR" id="__VIEWSTATEGENERATOR" value="CA0B0334" />
        <input type="hidden" name="__EVENTVALIDATION" id="__EVENTVALIDATION" value="/wEdAAV" />
        {extra}
        </form></body></html>"#
    )
}

const LOGIN_ACCEPTED: &str = "1|#||4|23|pageRedirect||Default.aspx|";
const SESSION_EXPIRED: &str =
    "1|#||4|55|pageRedirect||Login.aspx%3fReturnUrl=%2fLearner%2fListing.aspx|";

async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/Login.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page("")))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Login.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_ACCEPTED))
        .mount(server)
        .await;
}

fn listing_page(selected_size: &str) -> String {
    stateful_page(&format!(
        r#"<select name="ctl00$cphMain$ddlPageSize" id="ddlPageSize">
          <option value="50"{fifty}>50</option>
          <option value="1000"{thousand}>1000</option>
        </select>
        <table id="grdLearners"><tr><th>UPI</th></tr></table>"#,
        fifty = if selected_size == "50" { " selected=\"selected\"" } else { "" },
        thousand = if selected_size == "1000" { " selected=\"selected\"" } else { "" },
    ))
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_success() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let mut client = SessionClient::new(config_for(&server)).unwrap();
    client.login().await.unwrap();
    assert!(client.is_authenticated());
}

#[tokio::test]
async fn test_login_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Login.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page("")))
        .mount(&server)
        .await;
    // Rejection is a 200 re-render of the login page with an error label.
    Mock::given(method("POST"))
        .and(path("/Login.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page(
            r#"<span id="lblAlertMsg">Invalid Username or Password</span>"#,
        )))
        .mount(&server)
        .await;

    let mut client = SessionClient::new(config_for(&server)).unwrap();
    let err = client.login().await.unwrap_err();
    assert_eq!(err.error_code(), "AUTHENTICATION");
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_login_unrecognized_body_is_not_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Login.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page("")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Login.aspx"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(stateful_page("<p>Scheduled maintenance</p>")),
        )
        .mount(&server)
        .await;

    let mut client = SessionClient::new(config_for(&server)).unwrap();
    let err = client.login().await.unwrap_err();
    assert_eq!(err.error_code(), "UNRECOGNIZED_RESPONSE");
    assert!(!client.is_authenticated());
}

// =============================================================================
// Session expiry and state discipline
// =============================================================================

#[tokio::test]
async fn test_session_expiry_surfaces_and_clears_authentication() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/Learner/Listing.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SESSION_EXPIRED))
        .mount(&server)
        .await;

    let mut client = SessionClient::new(config_for(&server)).unwrap();
    client.login().await.unwrap();

    let err = client.navigate("Learner/Listing.aspx").await.unwrap_err();
    assert_eq!(err.error_code(), "SESSION_EXPIRED");
    assert!(err.needs_reauth());
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_submit_without_navigate_is_protocol_error() {
    let server = MockServer::start().await;
    let mut client = SessionClient::new(config_for(&server)).unwrap();

    let err = client
        .submit("Learner/Biodata.aspx", "", "", vec![])
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "PROTOCOL");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_state_loss_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Learner/Biodata.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page("")))
        .mount(&server)
        .await;
    // A body with neither hidden state nor a redirect directive means the
    // conversation's state is gone.
    Mock::given(method("POST"))
        .and(path("/Learner/Biodata.aspx"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>An error occurred.</body></html>"),
        )
        .mount(&server)
        .await;

    let mut client = SessionClient::new(config_for(&server)).unwrap();
    client.navigate("Learner/Biodata.aspx").await.unwrap();
    let err = client
        .submit("Learner/Biodata.aspx", "", "", vec![])
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "PROTOCOL");

    // The lost state is not silently reused afterwards.
    let err = client
        .submit("Learner/Biodata.aspx", "", "", vec![])
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "PROTOCOL");
}

// =============================================================================
// Pagination
// =============================================================================

#[tokio::test]
async fn test_pagination_already_correct_issues_no_postback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Learner/Listing.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page("1000")))
        .mount(&server)
        .await;
    // No POST mock mounted: any control-change submission would 404 and fail
    // the call.

    let mut client = SessionClient::new(config_for(&server)).unwrap();
    client
        .ensure_page_size("Learner/Listing.aspx", 1000, None)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method.as_str(), "GET");
}

#[tokio::test]
async fn test_pagination_changes_size_once_and_verifies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Learner/Listing.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page("50")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Learner/Listing.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page("1000")))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = SessionClient::new(config_for(&server)).unwrap();
    let page = client
        .ensure_page_size("Learner/Listing.aspx", 1000, None)
        .await
        .unwrap();
    assert!(page.contains("grdLearners"));
}

#[tokio::test]
async fn test_pagination_persistent_mismatch_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Learner/Listing.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page("50")))
        .mount(&server)
        .await;
    // The portal keeps rendering the old size no matter what is posted.
    Mock::given(method("POST"))
        .and(path("/Learner/Listing.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page("50")))
        .mount(&server)
        .await;

    let mut client = SessionClient::new(config_for(&server)).unwrap();
    let err = client
        .ensure_page_size("Learner/Listing.aspx", 1000, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "PROTOCOL");
}

// =============================================================================
// Learner listing
// =============================================================================

/// A populated roster at the configured page size, with per-row action
/// controls numbered the way the portal numbers them.
fn roster_page() -> String {
    stateful_page(
        r##"<select name="ctl00$cphMain$ddlPageSize" id="ddlPageSize">
          <option value="50">50</option>
          <option selected="selected" value="1000">1000</option>
        </select>
        <table id="grdLearners">
        <tr><th>UPI</th><th>Learner Name</th><th>Gender</th></tr>
        <tr><td>A001</td><td>JOHN KAMAU</td><td>M</td>
          <td><a href="#" name="ctl00$cphMain$grdLearners$ctl02$lnkSelect">Select</a></td></tr>
        <tr><td>B002</td><td>JANE WANJIKU</td><td>F</td>
          <td><a href="#" name="ctl00$cphMain$grdLearners$ctl03$lnkSelect">Select</a></td></tr>
        </table>"##,
    )
}

#[tokio::test]
async fn test_learner_listing_reads_rows_without_postback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Learner/Listing.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(roster_page()))
        .mount(&server)
        .await;
    // Page size already matches the configured default; no POST mock mounted.

    let mut client = SessionClient::new(config_for(&server)).unwrap();
    let (page, rows) = client.learner_listing(None).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("upi"), Some("A001"));
    assert_eq!(rows[1].get("learner_name"), Some("JANE WANJIKU"));

    // Row action controls are observed from the page, not assumed.
    let controls = listing_row_controls(&page).unwrap();
    assert_eq!(controls.count(), 2);
    assert_eq!(controls.name_for(1).as_deref(), Some("grdLearners$ctl03"));
    assert_eq!(controls.name_for(2), None);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method.as_str(), "GET");
}

// =============================================================================
// Transport
// =============================================================================

#[tokio::test]
async fn test_gateway_error_is_transient_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Default.aspx"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let mut client = SessionClient::new(config_for(&server)).unwrap();
    let err = client.navigate("Default.aspx").await.unwrap_err();
    assert_eq!(err.error_code(), "TRANSPORT");
    assert!(err.is_transient());
}
