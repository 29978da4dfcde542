//! API middleware stack.
//!
//! Protected routes run the auth identifier before any handler; it
//! rejects requests without a bearer token and tags the rest with the
//! caller's identity.

pub mod auth;
