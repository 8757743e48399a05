//! Project, scene and subtitle-style data supplied by the editing collaborators.

/// Project and scene model.
pub mod model;
/// Subtitle styling value objects.
pub mod style;
