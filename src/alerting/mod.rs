//! Severity alert engine.
//!
//! `severity` turns a pain log into a tier; `reconciler` replaces a
//! patient's alert set on every update and annotates physician feeds with
//! the status log that answered each alert.

pub mod clock;
pub mod reconciler;
pub mod severity;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use reconciler::{annotate_contacted, AlertReconciler};
pub use severity::{
    evaluate, PAIN_SEVERITY_LEVEL_0, PAIN_SEVERITY_LEVEL_1, PAIN_SEVERITY_LEVEL_2,
    PAIN_SEVERITY_LEVEL_3, PAIN_SEVERITY_LEVEL_4,
};
pub use types::{AlertingError, Caller, ReconcileOutcome};
