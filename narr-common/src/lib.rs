//! # Narr Common Library
//!
//! Shared code for the narr workspace:
//! - Article / chunk data model exchanged with the content server
//! - Event types broadcast to UI consumers (NarrEvent)
//! - Session snapshot types
//! - Configuration file resolution

pub mod config;
pub mod error;
pub mod events;
pub mod model;

pub use error::{Error, Result};
pub use events::{NarrEvent, PlaybackStatus};
pub use model::{Article, ArticleSummary, AudioRef, Chunk};
