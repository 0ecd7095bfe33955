//! Session client
//!
//! One authenticated conversation with the portal: the bearer cookie, the
//! current hidden-state token set, and nothing else. The protocol is
//! strictly sequential (submitting request B before absorbing the state
//! from request A's response corrupts the conversation), so every operation
//! takes `&mut self`: two in-flight operations on one client are a compile
//! error, not a runtime surprise.
//!
//! This layer never retries anything. Transport failures surface as
//! [`PortalError::Transport`] with the offending path; retry policy belongs
//! to the caller.

use std::time::Duration;

use tracing::{debug, instrument, warn};

use shule_core::config::PortalConfig;
use shule_core::error::{PortalError, PortalResult};
use shule_core::ids::SessionId;
use shule_core::record::FieldMap;

use crate::extract;
use crate::selectors;
use crate::state::SessionState;

/// One response page, as received.
#[derive(Debug, Clone)]
pub struct Page {
    path: String,
    body: String,
}

impl Page {
    /// The portal path this page came from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw response body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Whether the body contains the given marker substring.
    pub fn contains(&self, marker: &str) -> bool {
        self.body.contains(marker)
    }
}

/// Client for one portal conversation.
///
/// Owns the cookie jar and the [`SessionState`] for its lifetime; neither is
/// ever shared with, or mutated by, another component.
pub struct SessionClient {
    config: PortalConfig,
    http: reqwest::Client,
    session: SessionId,
    state: Option<SessionState>,
    authenticated: bool,
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("config", &self.config.redacted())
            .field("session", &self.session)
            .field("authenticated", &self.authenticated)
            .finish()
    }
}

impl SessionClient {
    /// Create a client for the given portal configuration.
    pub fn new(config: PortalConfig) -> PortalResult<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(config.connection.connection_timeout_secs))
            .timeout(Duration::from_secs(config.connection.read_timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                PortalError::invalid_configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http,
            session: SessionId::new(),
            state: None,
            authenticated: false,
        })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Tracing tag for this conversation.
    pub fn session_id(&self) -> SessionId {
        self.session
    }

    /// Whether `login` has succeeded on this client.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    async fn get_raw(&self, path: &str) -> PortalResult<String> {
        let url = self.config.url_for(path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PortalError::transport(path, e))?;
        Self::check_status(path, response.status())?;
        response
            .text()
            .await
            .map_err(|e| PortalError::transport(path, e))
    }

    async fn post_raw(&self, path: &str, form: &[(String, String)]) -> PortalResult<String> {
        let url = self.config.url_for(path);
        let response = self
            .http
            .post(&url)
            .form(form)
            .send()
            .await
            .map_err(|e| PortalError::transport(path, e))?;
        Self::check_status(path, response.status())?;
        response
            .text()
            .await
            .map_err(|e| PortalError::transport(path, e))
    }

    fn check_status(path: &str, status: reqwest::StatusCode) -> PortalResult<()> {
        // The portal reports its own failures in 200-OK bodies; an actual
        // error status means an intermediary (gateway, proxy) failed.
        if status.is_success() {
            Ok(())
        } else {
            Err(PortalError::transport(
                path,
                std::io::Error::other(format!("HTTP {status}")),
            ))
        }
    }

    /// Absorb one response: detect expiry, capture fresh state, build the
    /// page. Every response of the conversation passes through here.
    fn absorb(&mut self, path: &str, body: String) -> PortalResult<Page> {
        if body.contains(selectors::MARKER_SESSION_EXPIRED) {
            self.state = None;
            self.authenticated = false;
            warn!(session = %self.session, path, "portal reported session expired");
            return Err(PortalError::SessionExpired);
        }

        match SessionState::capture(&body) {
            Some(state) => {
                self.state = Some(state);
            }
            None if body.contains(selectors::MARKER_PAGE_REDIRECT) => {
                // Redirect bodies are terminal; they carry no state.
                self.state = None;
            }
            None => {
                self.state = None;
                return Err(PortalError::protocol("state lost"));
            }
        }

        Ok(Page {
            path: path.to_string(),
            body,
        })
    }

    // -----------------------------------------------------------------------
    // Protocol primitives
    // -----------------------------------------------------------------------

    /// Fetch a page and absorb its state.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn navigate(&mut self, path: &str) -> PortalResult<Page> {
        let body = self.get_raw(path).await?;
        debug!(bytes = body.len(), "page fetched");
        self.absorb(path, body)
    }

    /// Post a form carrying the current state plus the given fields.
    ///
    /// `event_target`/`event_argument` name the control that logically
    /// triggered the postback (empty for a plain button submit). Requires a
    /// previously absorbed state; call [`navigate`](Self::navigate) first.
    #[instrument(skip(self, fields), fields(session = %self.session))]
    pub async fn submit(
        &mut self,
        path: &str,
        event_target: &str,
        event_argument: &str,
        fields: Vec<(String, String)>,
    ) -> PortalResult<Page> {
        let state = self.state.as_ref().ok_or_else(|| {
            PortalError::protocol("no session state held; navigate before submitting")
        })?;
        let form = state.apply_to(event_target, event_argument, fields);
        let body = self.post_raw(path, &form).await?;
        debug!(bytes = body.len(), "form submitted");
        self.absorb(path, body)
    }

    // -----------------------------------------------------------------------
    // Login
    // -----------------------------------------------------------------------

    /// Authenticate this conversation.
    ///
    /// The portal answers 200 for both outcomes; only the redirect target in
    /// the body distinguishes success from rejection.
    #[instrument(skip(self), fields(session = %self.session, username = %self.config.username))]
    pub async fn login(&mut self) -> PortalResult<()> {
        self.navigate(selectors::PATH_LOGIN).await?;

        let fields = vec![
            (
                selectors::LOGIN_USERNAME.to_string(),
                self.config.username.clone(),
            ),
            (
                selectors::LOGIN_PASSWORD.to_string(),
                self.config.password.clone(),
            ),
            (selectors::LOGIN_BUTTON.to_string(), "Login".to_string()),
        ];
        let page = self.submit(selectors::PATH_LOGIN, "", "", fields).await?;

        if page.contains(selectors::MARKER_LOGIN_SUCCESS) {
            self.authenticated = true;
            debug!("login accepted");
            return Ok(());
        }
        if page.contains(selectors::MARKER_INVALID_CREDENTIALS) {
            return Err(PortalError::authentication(
                selectors::MARKER_INVALID_CREDENTIALS,
            ));
        }
        Err(PortalError::unrecognized("login"))
    }

    // -----------------------------------------------------------------------
    // Pagination
    // -----------------------------------------------------------------------

    /// Bring a listing page to the desired page size and category.
    ///
    /// The portal remembers the previously selected values across requests,
    /// so the currently rendered selection is inspected first and a
    /// control-change postback is only issued for values that actually
    /// differ. Calling this twice in a row with the same desired values
    /// issues at most one state-changing submission.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn ensure_page_size(
        &mut self,
        path: &str,
        desired_size: u32,
        desired_category: Option<&str>,
    ) -> PortalResult<Page> {
        let mut page = self.navigate(path).await?;
        let desired_size = desired_size.to_string();

        if self.size_matches(&page, &desired_size)
            && self.category_matches(&page, desired_category)
        {
            debug!("listing already at desired page parameters");
            return Ok(page);
        }

        if !self.size_matches(&page, &desired_size) {
            debug!(size = %desired_size, "changing listing page size");
            let mut fields = vec![(
                selectors::LISTING_PAGE_SIZE_CONTROL.to_string(),
                desired_size.clone(),
            )];
            if let Some(category) = current_or_desired_category(&page, desired_category) {
                fields.push((selectors::LISTING_CATEGORY_CONTROL.to_string(), category));
            }
            page = self
                .submit(path, selectors::LISTING_PAGE_SIZE_CONTROL, "", fields)
                .await?;
        }

        if !self.category_matches(&page, desired_category) {
            let category = desired_category.unwrap_or_default().to_string();
            debug!(category = %category, "changing listing category");
            let fields = vec![
                (
                    selectors::LISTING_PAGE_SIZE_CONTROL.to_string(),
                    desired_size.clone(),
                ),
                (selectors::LISTING_CATEGORY_CONTROL.to_string(), category),
            ];
            page = self
                .submit(path, selectors::LISTING_CATEGORY_CONTROL, "", fields)
                .await?;
        }

        if self.size_matches(&page, &desired_size)
            && self.category_matches(&page, desired_category)
        {
            Ok(page)
        } else {
            Err(PortalError::protocol("failed to set page parameters"))
        }
    }

    // -----------------------------------------------------------------------
    // Learner listing
    // -----------------------------------------------------------------------

    /// Fetch the learner listing at the configured page size.
    ///
    /// Brings the listing to [`PortalConfig::page_size`] first so one page
    /// holds the full roster, then reads the grid rows. Rows come back in
    /// render order with headers normalized to lowercase identifiers.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn learner_listing(
        &mut self,
        category: Option<&str>,
    ) -> PortalResult<(Page, Vec<FieldMap>)> {
        let size = self.config.page_size;
        let page = self
            .ensure_page_size(selectors::PATH_LEARNER_LISTING, size, category)
            .await?;
        let rows = extract::extract_table(page.body(), selectors::LISTING_TABLE_ANCHOR);
        debug!(rows = rows.len(), "learner listing fetched");
        Ok((page, rows))
    }

    fn size_matches(&self, page: &Page, desired: &str) -> bool {
        extract::selected_option(page.body(), selectors::LISTING_PAGE_SIZE_CONTROL)
            .is_some_and(|current| current == desired)
    }

    fn category_matches(&self, page: &Page, desired: Option<&str>) -> bool {
        match desired {
            // None means leave the category as rendered.
            None => true,
            Some(desired) => {
                extract::selected_option(page.body(), selectors::LISTING_CATEGORY_CONTROL)
                    .is_some_and(|current| current == desired)
            }
        }
    }
}

/// Category value to echo in a size-change postback: the desired one if the
/// caller named one, otherwise whatever is currently rendered.
fn current_or_desired_category(page: &Page, desired: Option<&str>) -> Option<String> {
    match desired {
        Some(category) => Some(category.to_string()),
        None => extract::selected_option(page.body(), selectors::LISTING_CATEGORY_CONTROL),
    }
}

/// Per-row action control names for a fetched listing page.
///
/// The `ctlNN` suffix numbering of grid rows varies between portal builds,
/// so it is observed from the page rather than assumed. Returns `None` when
/// the grid rendered no data rows.
pub fn listing_row_controls(page: &Page) -> Option<extract::RowControls> {
    extract::extract_row_controls(page.body(), selectors::LISTING_ROW_CONTROL_PREFIX)
}
