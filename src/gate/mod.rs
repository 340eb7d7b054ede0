//! Newline-delimited JSON front end for the rate limiters.

mod protocol;
mod server;

pub use protocol::{GateRequest, GateResponse};
pub use server::{GateServer, GateStats};
