//! # Narration Player Library (narr-ap)
//!
//! Chunk playback synchronization for narrated articles.
//!
//! **Purpose:** Keep the highlighted chunk of an article and the audio being
//! played in lockstep while the user clicks chunks, steps back and forth, or
//! lets narration auto-advance.
//!
//! **Architecture:** A single navigation task owns the article, the chunk
//! index, the audio cache and the playback driver; an axum HTTP/SSE surface
//! talks to it through a cloneable handle.

pub mod api;
pub mod audio;
pub mod config;
pub mod content;
pub mod error;
pub mod playback;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
