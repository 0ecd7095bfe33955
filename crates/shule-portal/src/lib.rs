//! # shule-portal
//!
//! Session/protocol layer for the legacy learner-management portal. The
//! portal exposes no stable API for most operations, only a server-rendered
//! postback application whose hidden per-request tokens must be captured
//! from every response and replayed on the next request, in order, or the
//! server silently bounces the conversation to an error page.
//!
//! This crate makes that protocol usable as a sequence of composable
//! operations:
//!
//! - [`client::SessionClient`] - one authenticated, strictly sequential
//!   conversation (cookie + hidden state)
//! - [`state::SessionState`] - the opaque token set, captured and replayed
//! - [`extract`] - rendered pages to loosely-typed [`shule_core::record::FieldMap`]s
//! - [`geo`] - free-text region names to the numeric codes the portal wants
//! - [`selectors`] - the single home of every fixed portal markup identifier
//! - [`lookup`] - the narrow read-only JSON lookup endpoint

pub mod client;
pub mod extract;
pub mod geo;
pub mod lookup;
pub mod selectors;
pub mod state;

pub use client::{listing_row_controls, Page, SessionClient};
pub use lookup::{JsonLookupClient, LearnerLookup};
pub use state::SessionState;
