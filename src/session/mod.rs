//! Session-level orchestration: one project, its timeline, preview and exports.

/// Host-driven preview ticking.
pub mod preview;
/// Project session owning timeline, playback and exports.
pub mod story;
