//! Integration tests for flurry-sql.
//!
//! Every test drives a real coordinator against a scripted transport, so no
//! network or service account is needed.

mod cancel;
mod concurrent;
mod poll;
