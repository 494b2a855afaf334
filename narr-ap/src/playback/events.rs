//! Internal playback events (not exposed via SSE)
//!
//! Signals travel from the audio output to the playback driver over a single
//! typed channel. They are converted to `NarrEvent`s by the navigation
//! controller before anything is broadcast.

/// Identifies one binding of a handle to the output.
///
/// Every `load` or `stop` invalidates the previous token, so signals from
/// audio that was replaced or stopped are recognized as stale and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackToken(pub(crate) u64);

/// What the output reports about the audio it was asked to play
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkSignal {
    /// Output began producing sound
    Started,
    /// Audio played to its natural end
    Finished,
    /// Output could not decode or play the audio
    Failed(String),
}

/// Output → driver event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverEvent {
    pub token: PlaybackToken,
    pub signal: SinkSignal,
}

/// Driver state change produced by applying a `DriverEvent`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverTransition {
    /// Loading → Playing
    Playing,
    /// Playing → Ended (fires once per binding)
    Ended,
    /// Loading → Ended: the output finished before reporting a start
    StartedAndEnded,
    /// Loading/Playing → Failed
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_compare_by_value() {
        assert_eq!(PlaybackToken(3), PlaybackToken(3));
        assert_ne!(PlaybackToken(3), PlaybackToken(4));
    }
}
