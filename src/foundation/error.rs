/// Convenience result type used across storyreel.
pub type StoryreelResult<T> = Result<T, StoryreelError>;

/// Top-level error taxonomy used by the compositing core.
#[derive(thiserror::Error, Debug)]
pub enum StoryreelError {
    /// Invalid user-provided project or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Narration bytes are unusable under every supported interpretation.
    #[error("decode error: {0}")]
    Decode(String),

    /// A scene failed while building the narration timeline. No partial timeline is kept.
    #[error("timeline build failed at scene {scene_index} ('{scene_id}'): {source}")]
    TimelineBuild {
        /// 0-based index of the failing scene.
        scene_index: usize,
        /// Identity of the failing scene.
        scene_id: String,
        /// Underlying decode or collaborator error.
        source: Box<StoryreelError>,
    },

    /// A long-running operation observed its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// Capture or encoding failed; the export was aborted and partial output removed.
    #[error("capture error: {0}")]
    Capture(String),

    /// A second export was requested while one is still running.
    #[error("an export is already running for this session")]
    ExportBusy,

    /// Monitored playback was requested while an export holds the capture bus.
    #[error("monitored playback is unavailable while an export is running")]
    PlaybackBusy,

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoryreelError {
    /// Build a [`StoryreelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StoryreelError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`StoryreelError::Capture`] value.
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    /// Build a [`StoryreelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Wrap `source` as the failure of scene `scene_index`.
    pub fn timeline_build(
        scene_index: usize,
        scene_id: impl Into<String>,
        source: StoryreelError,
    ) -> Self {
        Self::TimelineBuild {
            scene_index,
            scene_id: scene_id.into(),
            source: Box::new(source),
        }
    }

    /// Index of the failing scene for [`StoryreelError::TimelineBuild`] errors.
    pub fn failing_scene(&self) -> Option<usize> {
        match self {
            Self::TimelineBuild { scene_index, .. } => Some(*scene_index),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
