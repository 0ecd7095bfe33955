//! Integration tests for the lifecycle engine and bulk runner against a
//! mock portal.
//!
//! The mock renders the portal's actual shapes: hidden-state tokens on
//! every full page, redirect directives in partial-postback bodies, and
//! outcome markers inside 200-OK responses.

use chrono::NaiveDate;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shule_core::config::{InstitutionLevel, PortalConfig};
use shule_core::ids::LearnerId;
use shule_core::learner::{ContactSet, Gender, Grade, Learner, TransactionState};
use shule_portal::SessionClient;
use shule_sync::{BulkRunner, LifecycleEngine, SyncOperation, TransitionOutcome};

// =============================================================================
// Test helpers
// =============================================================================

fn config_for(server: &MockServer) -> PortalConfig {
    PortalConfig::new(server.uri())
        .with_credentials("inst-0001", "secret")
        .with_institution("10203040", InstitutionLevel::Primary)
}

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

async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/Login.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page("")))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Login.aspx"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("1|#||4|23|pageRedirect||Default.aspx|"),
        )
        .mount(server)
        .await;
}

async fn engine_for(server: &MockServer) -> LifecycleEngine {
    let mut client = SessionClient::new(config_for(server)).unwrap();
    client.login().await.unwrap();
    LifecycleEngine::new(client)
}

fn learner(state: TransactionState) -> Learner {
    Learner {
        id: LearnerId::new(),
        first_name: "JOHN".into(),
        middle_name: Some("KAMAU".into()),
        surname: "OTIENO".into(),
        gender: Gender::Male,
        date_of_birth: NaiveDate::from_ymd_opt(2011, 3, 7).unwrap(),
        grade: Grade(4),
        birth_certificate: Some("1234567".into()),
        index_number: Some("20301234567".into()),
        county: Some("Nairobi".into()),
        sub_county: Some("Westlands".into()),
        contacts: ContactSet::default(),
        upi: None,
        state,
        last_error: None,
    }
}

// =============================================================================
// Placement request
// =============================================================================

#[tokio::test]
async fn test_request_success() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/Admission/RequestPlacement.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page("")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Admission/RequestPlacement.aspx"))
        .and(body_string_contains("btnCheckVacancies"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(stateful_page("<span>Position 12 of 40</span>")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Admission/RequestPlacement.aspx"))
        .and(body_string_contains("btnRequest"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(stateful_page("Request Placed Successfully")),
        )
        .mount(&server)
        .await;

    let mut engine = engine_for(&server).await;
    let outcome = engine.request(&learner(TransactionState::Unsubmitted)).await.unwrap();
    assert_eq!(
        outcome,
        TransitionOutcome::Completed {
            new_state: TransactionState::Requested,
            upi: None,
        }
    );
}

#[tokio::test]
async fn test_request_stops_when_no_vacancies() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/Admission/RequestPlacement.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page("")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Admission/RequestPlacement.aspx"))
        .and(body_string_contains("btnCheckVacancies"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page(
            r#"<span id="lblAlertMsg">No Vacancies Available</span>"#,
        )))
        .mount(&server)
        .await;
    // The actual request must never be placed.
    Mock::given(method("POST"))
        .and(path("/Admission/RequestPlacement.aspx"))
        .and(body_string_contains("btnRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page("")))
        .expect(0)
        .mount(&server)
        .await;

    let mut engine = engine_for(&server).await;
    let err = engine
        .request(&learner(TransactionState::Unsubmitted))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CAPACITY_EXHAUSTED");
}

// =============================================================================
// Lifecycle ordering and idempotence
// =============================================================================

#[tokio::test]
async fn test_capture_before_admission_issues_no_requests() {
    let server = MockServer::start().await;

    let mut engine = LifecycleEngine::new(SessionClient::new(config_for(&server)).unwrap());
    for state in [TransactionState::Unsubmitted, TransactionState::Requested] {
        let err = engine.capture_biodata(&learner(state)).await.unwrap_err();
        assert_eq!(err.error_code(), "PREREQUISITE");
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_readmission_is_a_noop() {
    let server = MockServer::start().await;

    let mut engine = LifecycleEngine::new(SessionClient::new(config_for(&server)).unwrap());
    let outcome = engine
        .admit(&learner(TransactionState::Captured))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        TransitionOutcome::AlreadySatisfied {
            state: TransactionState::Captured,
        }
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

// =============================================================================
// Admission
// =============================================================================

async fn mount_admission_pages(server: &MockServer, flag: &str) {
    Mock::given(method("GET"))
        .and(path("/Institution/Home.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page(&format!(
            r#"<input type="hidden" id="hdnAdmissionsOpen" value="{flag}" />"#
        ))))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Admission/AdmitLearner.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page("")))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_admission_is_two_phase() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_admission_pages(&server, "1").await;
    Mock::given(method("POST"))
        .and(path("/Admission/AdmitLearner.aspx"))
        .and(body_string_contains("txtAdmIndexNo"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page(
            r#"<p>Admit JOHN KAMAU OTIENO to Grade 4?</p>
            <input type="submit" name="ctl00$cphMain$btnConfirmAdmit" value="Confirm" />"#,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Admission/AdmitLearner.aspx"))
        .and(body_string_contains("btnConfirmAdmit"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(stateful_page("Learner Admitted Successfully")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = engine_for(&server).await;
    let outcome = engine.admit(&learner(TransactionState::Requested)).await.unwrap();
    assert_eq!(
        outcome,
        TransitionOutcome::Completed {
            new_state: TransactionState::Admitted,
            upi: None,
        }
    );
}

#[tokio::test]
async fn test_admission_refused_while_window_closed() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_admission_pages(&server, "0").await;

    let mut engine = engine_for(&server).await;
    let err = engine
        .admit(&learner(TransactionState::Requested))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "PREREQUISITE");
}

#[tokio::test]
async fn test_admission_bounce_to_request_flow_is_prerequisite() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_admission_pages(&server, "1").await;
    // The portal has no placement request on file and bounces the
    // conversation into the request flow.
    Mock::given(method("POST"))
        .and(path("/Admission/AdmitLearner.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "1|#||4|42|pageRedirect||Admission/RequestPlacement.aspx|",
        ))
        .mount(&server)
        .await;

    let mut engine = engine_for(&server).await;
    let err = engine
        .admit(&learner(TransactionState::Requested))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "PREREQUISITE");
}

// =============================================================================
// Biodata capture
// =============================================================================

const SUB_COUNTY_DELTA: &str = "1|#||4|900|updatePanel|ctl00_upMain|\
    <select name=\"ctl00$cphMain$ddlSubCounty\" id=\"ctl00_cphMain_ddlSubCounty\">\
    <option value=\"4701\">Dagoretti North</option>\
    <option value=\"4702\">Westlands</option>\
    </select>|\
    |hiddenField|__VIEWSTATE|deltaVS|\
    |hiddenField|__VIEWSTATEGENERATOR|CA0B0334|\
    |hiddenField|__EVENTVALIDATION|deltaEV|";

async fn mount_capture_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/Learner/Biodata.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page("")))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Learner/Biodata.aspx"))
        .and(body_string_contains("smMain"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SUB_COUNTY_DELTA))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_capture_resubmits_exactly_once_on_ignorable_prompt() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_capture_pages(&server).await;
    Mock::given(method("POST"))
        .and(path("/Learner/Biodata.aspx"))
        .and(body_string_contains("hdnIgnoreError=0"))
        .and(body_string_contains("ddlSubCounty=4702"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page(
            r#"<span id="lblAlertMsg">Do you want to ignore this error and continue?</span>"#,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Learner/Biodata.aspx"))
        .and(body_string_contains("hdnIgnoreError=1"))
        .and(body_string_contains("ddlSubCounty=4702"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page(
            r#"<p>Basic Details Saved Successfully</p>
            <span id="lblAssignedUpi">P9X4K7</span>"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = engine_for(&server).await;
    let outcome = engine
        .capture_biodata(&learner(TransactionState::Admitted))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        TransitionOutcome::Completed {
            new_state: TransactionState::Captured,
            upi: Some("P9X4K7".into()),
        }
    );
}

#[tokio::test]
async fn test_capture_fails_when_prompt_repeats() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_capture_pages(&server).await;
    let prompt = stateful_page(
        r#"<span id="lblAlertMsg">Do you want to ignore this error and continue?</span>"#,
    );
    Mock::given(method("POST"))
        .and(path("/Learner/Biodata.aspx"))
        .and(body_string_contains("hdnIgnoreError=0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(prompt.clone()))
        .expect(1)
        .mount(&server)
        .await;
    // The prompt survives the ignore resubmission: exactly one retry, then
    // a hard failure.
    Mock::given(method("POST"))
        .and(path("/Learner/Biodata.aspx"))
        .and(body_string_contains("hdnIgnoreError=1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(prompt))
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = engine_for(&server).await;
    let err = engine
        .capture_biodata(&learner(TransactionState::Admitted))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CAPTURE_FAILED");
}

// =============================================================================
// Transfer-in
// =============================================================================

#[tokio::test]
async fn test_transfer_in_saved_pending_release() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/Learner/TransferIn.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page("")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Learner/TransferIn.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page(
            "Transfer Request Saved Awaiting Release",
        )))
        .mount(&server)
        .await;

    let mut subject = learner(TransactionState::Unsubmitted);
    subject.upi = Some("A1B2C3".into());

    let mut engine = engine_for(&server).await;
    let outcome = engine.transfer_in(&subject).await.unwrap();
    assert_eq!(
        outcome,
        TransitionOutcome::Completed {
            new_state: TransactionState::TransferIn,
            upi: Some("A1B2C3".into()),
        }
    );
}

#[tokio::test]
async fn test_transfer_in_needs_an_existing_upi() {
    let server = MockServer::start().await;

    let mut engine = LifecycleEngine::new(SessionClient::new(config_for(&server)).unwrap());
    let err = engine
        .transfer_in(&learner(TransactionState::Unsubmitted))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "PREREQUISITE");
    assert!(server.received_requests().await.unwrap().is_empty());
}

// =============================================================================
// Bulk fan-out
// =============================================================================

#[tokio::test]
async fn test_bulk_failures_stay_isolated_and_ordered() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/Admission/RequestPlacement.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page("")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Admission/RequestPlacement.aspx"))
        .and(body_string_contains("btnCheckVacancies"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page("")))
        .mount(&server)
        .await;
    // The third learner's request is rejected; everyone else succeeds.
    Mock::given(method("POST"))
        .and(path("/Admission/RequestPlacement.aspx"))
        .and(body_string_contains("btnRequest"))
        .and(body_string_contains("IDX-3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stateful_page(
            r#"<span id="lblAlertMsg">Duplicate Request Detected</span>"#,
        )))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Admission/RequestPlacement.aspx"))
        .and(body_string_contains("btnRequest"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(stateful_page("Request Placed Successfully")),
        )
        .mount(&server)
        .await;

    let learners: Vec<Learner> = (1..=5)
        .map(|n| {
            let mut l = learner(TransactionState::Unsubmitted);
            l.index_number = Some(format!("IDX-{n}"));
            l
        })
        .collect();
    let ids: Vec<LearnerId> = learners.iter().map(|l| l.id).collect();

    let runner = BulkRunner::new(config_for(&server), 2);
    let outcomes = runner.run(learners, SyncOperation::Request).await;

    assert_eq!(outcomes.len(), 5);
    for (i, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.learner_id, ids[i]);
        if i == 2 {
            let err = outcome.result.as_ref().unwrap_err();
            assert_eq!(err.error_code(), "REQUEST_FAILED");
        } else {
            assert!(
                outcome.result.is_ok(),
                "learner {i} should succeed: {:?}",
                outcome.result
            );
        }
    }
}
