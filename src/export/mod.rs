//! Export artifacts: capture pipeline, artifact naming and the script transcript.

/// Artifact kinds, names and atomic publication.
pub mod artifact;
/// Artifact file-name stem derived from the project title.
pub mod filename;
/// Offline capture of frames and audio into a sink.
pub mod pipeline;
/// Plain-text script transcript.
pub mod script;
