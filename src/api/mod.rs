//! HTTP access to the GutWise backend.
//!
//! Queued mutations map onto REST calls against per-kind collections:
//!
//! | action | request                     |
//! |--------|-----------------------------|
//! | create | `POST /<collection>`        |
//! | update | `PATCH /<collection>/<id>`  |
//! | delete | `DELETE /<collection>/<id>` |
//!
//! A 2xx response counts as delivered, any other status as a failed
//! attempt, and a transport failure surfaces as an [`ApiError`].

mod client;
mod error;
mod probe;

pub use client::ApiClient;
pub use error::ApiError;
pub use probe::spawn_probe;
