//! Hidden-state capture and replay
//!
//! The portal is a classic server-rendered postback application: every
//! response embeds an opaque token set (`__VIEWSTATE` and friends) that must
//! be echoed, by exact field name, on the next request of the conversation.
//! The tokens are never interpreted, only captured and replayed.
//!
//! Capture understands both full HTML pages (hidden `<input>` elements) and
//! the pipe-delimited partial-postback delta bodies the portal's script
//! manager produces.

use std::sync::OnceLock;

use regex::Regex;

use crate::selectors;

/// Opaque per-conversation state captured from one response.
///
/// A value of this type is only ever produced by
/// [`SessionState::capture`] and consumed by [`SessionState::apply_to`];
/// callers above the session layer never see one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    view_state: String,
    view_state_generator: String,
    event_validation: String,
    last_focus: Option<String>,
}

fn hidden_input_pattern(field: &str) -> Regex {
    // name="__X" ... value="..." with id/name order tolerated.
    Regex::new(&format!(
        r#"(?is)<input[^>]*name="{}"[^>]*value="([^"]*)""#,
        regex::escape(field)
    ))
    .expect("hidden input pattern")
}

struct Patterns {
    view_state: Regex,
    view_state_generator: Regex,
    event_validation: Regex,
    last_focus: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        view_state: hidden_input_pattern(selectors::VIEW_STATE),
        view_state_generator: hidden_input_pattern(selectors::VIEW_STATE_GENERATOR),
        event_validation: hidden_input_pattern(selectors::EVENT_VALIDATION),
        last_focus: hidden_input_pattern(selectors::LAST_FOCUS),
    })
}

fn capture_input(re: &Regex, body: &str) -> Option<String> {
    re.captures(body).map(|c| c[1].to_string())
}

/// Pull `|hiddenField|NAME|VALUE|` segments out of a partial-postback body.
fn capture_delta_field(body: &str, field: &str) -> Option<String> {
    let needle = format!("|hiddenField|{field}|");
    let start = body.find(&needle)? + needle.len();
    let end = body[start..].find('|')? + start;
    Some(body[start..end].to_string())
}

impl SessionState {
    /// Capture the hidden-state token set from a response body.
    ///
    /// Returns `None` when the body carries no state blob, which is the
    /// portal's way of saying the conversation is over (redirect bodies,
    /// expired sessions).
    pub fn capture(body: &str) -> Option<Self> {
        let p = patterns();

        // Full page rendering first.
        if let Some(view_state) = capture_input(&p.view_state, body) {
            return Some(Self {
                view_state,
                view_state_generator: capture_input(&p.view_state_generator, body)
                    .unwrap_or_default(),
                event_validation: capture_input(&p.event_validation, body).unwrap_or_default(),
                last_focus: capture_input(&p.last_focus, body),
            });
        }

        // Partial-postback delta.
        let view_state = capture_delta_field(body, selectors::VIEW_STATE)?;
        Some(Self {
            view_state,
            view_state_generator: capture_delta_field(body, selectors::VIEW_STATE_GENERATOR)
                .unwrap_or_default(),
            event_validation: capture_delta_field(body, selectors::EVENT_VALIDATION)
                .unwrap_or_default(),
            last_focus: None,
        })
    }

    /// Merge this state into an outgoing form, in the exact field order the
    /// portal renders them: target, argument, focus, then the state blobs.
    ///
    /// `event_target`/`event_argument` identify the control that logically
    /// triggered the postback; empty strings mean a plain submit-button post.
    pub fn apply_to(
        &self,
        event_target: &str,
        event_argument: &str,
        form: Vec<(String, String)>,
    ) -> Vec<(String, String)> {
        let mut out = Vec::with_capacity(form.len() + 6);
        out.push((selectors::EVENT_TARGET.to_string(), event_target.to_string()));
        out.push((
            selectors::EVENT_ARGUMENT.to_string(),
            event_argument.to_string(),
        ));
        if let Some(focus) = &self.last_focus {
            out.push((selectors::LAST_FOCUS.to_string(), focus.clone()));
        }
        out.push((selectors::VIEW_STATE.to_string(), self.view_state.clone()));
        out.push((
            selectors::VIEW_STATE_GENERATOR.to_string(),
            self.view_state_generator.clone(),
        ));
        out.push((
            selectors::EVENT_VALIDATION.to_string(),
            self.event_validation.clone(),
        ));
        out.extend(form);
        out
    }
}
