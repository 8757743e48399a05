//! Frame and audio sinks fed by the export pipeline.

/// System `ffmpeg` MP4 sink.
pub mod ffmpeg;
/// Sink contract and in-memory sink.
pub mod sink;
