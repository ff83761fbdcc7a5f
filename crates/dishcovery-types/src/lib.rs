//! Wire types shared by the Dishcovery API and its clients.
//!
//! Everything here serializes as camelCase JSON, which is what the
//! browser client sends and expects.

pub mod api;
pub mod models;
