//! Narration decoding, timeline building, the real-time audio graph and playback control.

/// Audio clock abstraction and the published playback position.
pub mod clock;
/// Narration byte decoding with headerless-PCM fallback.
pub mod decode;
/// Optional listening-device output (`device` feature).
#[cfg(feature = "device")]
pub mod device;
/// Scheduled voices, buses and block rendering.
pub mod graph;
/// Sample interpolation and mixdown output helpers.
pub mod mix;
/// Narration collaborator interface.
pub mod narration;
/// Play/pause/seek transport over the audio graph.
pub mod playback;
/// Sequential per-scene timeline construction and lookup.
pub mod timeline;
