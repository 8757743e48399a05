use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{StoryreelError, StoryreelResult};

/// What an export produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    /// MP4 with narration, music and burned-in subtitles.
    Video,
    /// Narration and music mixdown as 16-bit WAV.
    Audio,
    /// Plain-text prompts and narration per scene.
    Script,
    /// PNG of the first frame.
    Thumbnail,
    /// Archive of every artifact. Not supported.
    Bundle,
}

impl ExportKind {
    /// Every supported kind, in the order the CLI lists them.
    pub const SUPPORTED: [ExportKind; 4] = [
        ExportKind::Video,
        ExportKind::Audio,
        ExportKind::Script,
        ExportKind::Thumbnail,
    ];

    /// Artifact file name for `stem`, or a validation error for unsupported kinds.
    pub fn file_name(self, stem: &str) -> StoryreelResult<String> {
        match self {
            ExportKind::Video => Ok(format!("{stem}.mp4")),
            ExportKind::Audio => Ok(format!("{stem}.wav")),
            ExportKind::Script => Ok(format!("{stem}_script.txt")),
            ExportKind::Thumbnail => Ok(format!("{stem}_thumbnail.png")),
            ExportKind::Bundle => Err(StoryreelError::validation(
                "bundle exports are not supported; export each artifact separately",
            )),
        }
    }
}

impl std::fmt::Display for ExportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExportKind::Video => "video",
            ExportKind::Audio => "audio",
            ExportKind::Script => "script",
            ExportKind::Thumbnail => "thumbnail",
            ExportKind::Bundle => "bundle",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ExportKind {
    type Err = StoryreelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "video" | "mp4" => Ok(ExportKind::Video),
            "audio" | "wav" => Ok(ExportKind::Audio),
            "script" | "txt" => Ok(ExportKind::Script),
            "thumbnail" | "png" => Ok(ExportKind::Thumbnail),
            "bundle" | "zip" => Ok(ExportKind::Bundle),
            other => Err(StoryreelError::validation(format!(
                "unknown export kind '{other}'"
            ))),
        }
    }
}

/// An artifact written under a temporary name and renamed into place on [`commit`].
///
/// Dropping an uncommitted artifact removes the temporary file, so a failed export never leaves
/// a file under the final name.
///
/// [`commit`]: PendingArtifact::commit
#[derive(Debug)]
pub struct PendingArtifact {
    part: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl PendingArtifact {
    /// Reserve `target`, creating its directory. Writes go to `<target>.part`.
    pub fn new(target: impl Into<PathBuf>) -> StoryreelResult<Self> {
        let target = target.into();
        if let Some(parent) = target.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create export directory '{}'", parent.display()))?;
        }
        let mut part = target.clone().into_os_string();
        part.push(".part");
        Ok(Self {
            part: PathBuf::from(part),
            target,
            committed: false,
        })
    }

    /// Temporary path to write to.
    pub fn path(&self) -> &Path {
        &self.part
    }

    /// Final path the artifact is published under.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Rename the temporary file to the final name.
    pub fn commit(mut self) -> StoryreelResult<PathBuf> {
        std::fs::rename(&self.part, &self.target).map_err(|e| {
            StoryreelError::capture(format!(
                "failed to publish '{}': {e}",
                self.target.display()
            ))
        })?;
        self.committed = true;
        Ok(self.target.clone())
    }
}

impl Drop for PendingArtifact {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.part);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/artifact.rs"]
mod tests;
