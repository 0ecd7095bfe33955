//! # shule-core
//!
//! Shared foundation for the shule learner-portal synchronization engine:
//! typed identifiers, the portal error taxonomy, the loosely-typed record
//! type produced by page extraction, the local learner model with its
//! transaction state machine, and per-client portal configuration.
//!
//! ## Crate Organization
//!
//! - [`ids`] - Type-safe identifiers (`LearnerId`, `SessionId`)
//! - [`error`] - Error types with transient/permanent classification
//! - [`record`] - [`record::FieldMap`], the loose record every extraction produces
//! - [`learner`] - Learner model and [`learner::TransactionState`] machine
//! - [`config`] - [`config::PortalConfig`] and connection settings

pub mod config;
pub mod error;
pub mod ids;
pub mod learner;
pub mod record;

/// Prelude module for convenient imports.
///
/// ```
/// use shule_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConnectionSettings, InstitutionLevel, PortalConfig};
    pub use crate::error::{PortalError, PortalResult};
    pub use crate::ids::{LearnerId, SessionId};
    pub use crate::learner::{
        Contact, ContactSet, Gender, Grade, Learner, TransactionState,
    };
    pub use crate::record::FieldMap;
}
