//! HTTP API
//!
//! Control surface for a reader UI: article catalog and selection, chunk
//! navigation, session snapshot, and an SSE event stream.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, run, AppContext};
