//! Chunk navigation and playback
//!
//! - `sequence`: ordered chunk lookup with no-wrap neighbours
//! - `cache`: per-chunk audio handles, invalidated on article change
//! - `driver`: binds one handle to the output and tracks its lifecycle
//! - `controller`: the single task that turns intents into playback
//! - `handle`: cloneable client used by the HTTP layer

pub mod cache;
pub(crate) mod controller;
pub mod driver;
pub mod events;
pub mod handle;
pub mod sequence;

pub use cache::AudioResourceCache;
pub use controller::SelectionTicket;
pub use driver::PlaybackDriver;
pub use handle::{spawn_navigation, NavigationHandle};
pub use sequence::ChunkSequence;
