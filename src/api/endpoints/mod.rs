//! REST endpoint handlers, one module per resource.

pub mod alerts;
pub mod health;
pub mod patients;
pub mod physicians;
