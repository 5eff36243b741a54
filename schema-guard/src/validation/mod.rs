//! Snapshot validation against a schema.
//!
//! [`Validator`] reports schema violations as [`Anomaly`] values; drift
//! distances are computed by the helpers in [`drift`].

mod anomaly;
pub mod drift;
mod validator;

pub use anomaly::{Anomaly, AnomalyKind, ValidationReport};
pub use validator::Validator;
