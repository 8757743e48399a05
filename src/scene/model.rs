use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::core::{AspectRatio, Canvas};
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::scene::style::SubtitleStyle;

/// Opaque scene identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SceneId(pub String);

impl SceneId {
    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of generated visual asset attached to a scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Still image (PNG/JPEG/WebP/SVG).
    #[default]
    Image,
    /// Generated video clip. Not composited by the slideshow renderer.
    Video,
}

/// Time-parameterized camera move applied to a scene image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisualEffect {
    /// No transform.
    #[default]
    Static,
    /// Scale 1.00 -> 1.15.
    ZoomIn,
    /// Scale 1.15 -> 1.00.
    ZoomOut,
    /// Horizontal offset 0 -> -150 px.
    PanLeft,
    /// Horizontal offset 0 -> +150 px.
    PanRight,
    /// Vertical offset 0 -> -150 px.
    TiltUp,
    /// Vertical offset 0 -> +150 px.
    TiltDown,
    /// Scale 1.00 -> 1.40.
    DollyIn,
    /// Scale 1.40 -> 1.00.
    DollyOut,
}

/// One story scene as produced by the breakdown collaborator.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Scene {
    /// Scene identity.
    pub id: SceneId,
    /// Narration text.
    pub script: String,
    /// Prompt used to generate the visual.
    #[serde(default)]
    pub visual_prompt: String,
    /// Project-relative path of the generated visual, if any.
    #[serde(default)]
    pub media: Option<String>,
    /// Kind of visual referenced by `media`.
    #[serde(default)]
    pub media_type: MediaType,
    /// Declared camera move.
    #[serde(default)]
    pub visual_effect: VisualEffect,
    /// Advisory duration in seconds. Replaced by the decoded narration length.
    #[serde(default)]
    pub duration: f64,
    /// Marks the closing call-to-action scene.
    #[serde(default)]
    pub is_cta: bool,
}

impl Scene {
    /// Build a scene with only the fields the core needs.
    pub fn new(id: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            id: SceneId(id.into()),
            script: script.into(),
            visual_prompt: String::new(),
            media: None,
            media_type: MediaType::Image,
            visual_effect: VisualEffect::Static,
            duration: 0.0,
            is_cta: false,
        }
    }

    /// Builder-style setter for the visual effect.
    pub fn with_effect(mut self, effect: VisualEffect) -> Self {
        self.visual_effect = effect;
        self
    }

    /// Builder-style setter for the media reference.
    pub fn with_media(mut self, media: impl Into<String>) -> Self {
        self.media = Some(media.into());
        self
    }

    /// Effect actually rendered: call-to-action scenes hold a static frame.
    pub fn effective_effect(&self) -> VisualEffect {
        if self.is_cta {
            VisualEffect::Static
        } else {
            self.visual_effect
        }
    }

    /// Whitespace-delimited narration words.
    pub fn words(&self) -> Vec<&str> {
        self.script.split_whitespace().collect()
    }
}

/// Optional background music bed.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MusicBed {
    /// Project-relative audio file (WAV).
    pub source: String,
    /// Linear gain applied to the bed.
    #[serde(default = "default_music_volume")]
    pub volume: f32,
}

fn default_music_volume() -> f32 {
    0.1
}

fn default_narration_volume() -> f32 {
    1.0
}

fn default_language() -> String {
    "en".to_owned()
}

fn default_voice() -> String {
    "Fenrir".to_owned()
}

fn default_title() -> String {
    "New Project".to_owned()
}

/// Complete project snapshot handed to the compositing core.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Project {
    /// Human-readable title; used for artifact names.
    #[serde(default = "default_title")]
    pub title: String,
    /// Output aspect ratio.
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// Narration language code.
    #[serde(default = "default_language")]
    pub language: String,
    /// Narration voice id.
    #[serde(default = "default_voice")]
    pub voice: String,
    /// Ordered scenes.
    pub scenes: Vec<Scene>,
    /// Subtitle styling.
    #[serde(default)]
    pub subtitles: SubtitleStyle,
    /// Narration volume multiplier applied at the mix stage.
    #[serde(default = "default_narration_volume")]
    pub narration_volume: f32,
    /// Optional background music bed.
    #[serde(default)]
    pub music: Option<MusicBed>,
    /// Optional project-relative watermark image.
    #[serde(default)]
    pub watermark: Option<String>,
}

impl Project {
    /// Project with default settings around `scenes`.
    pub fn new(title: impl Into<String>, scenes: Vec<Scene>) -> Self {
        Self {
            title: title.into(),
            aspect_ratio: AspectRatio::default(),
            language: default_language(),
            voice: default_voice(),
            scenes,
            subtitles: SubtitleStyle::default(),
            narration_volume: default_narration_volume(),
            music: None,
            watermark: None,
        }
    }

    /// Parse and validate a project from JSON text.
    pub fn from_json_str(s: &str) -> StoryreelResult<Self> {
        let project: Self =
            serde_json::from_str(s).map_err(|e| StoryreelError::serde(e.to_string()))?;
        project.validate()?;
        Ok(project)
    }

    /// Read, parse and validate a project JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> StoryreelResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read project '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> StoryreelResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| StoryreelError::serde(e.to_string()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> StoryreelResult<()> {
        if self.scenes.is_empty() {
            return Err(StoryreelError::validation(
                "project must contain at least one scene",
            ));
        }
        let mut seen = HashSet::new();
        for (i, scene) in self.scenes.iter().enumerate() {
            if scene.id.0.is_empty() {
                return Err(StoryreelError::validation(format!(
                    "scene {i} has an empty id"
                )));
            }
            if !seen.insert(scene.id.as_str()) {
                return Err(StoryreelError::validation(format!(
                    "duplicate scene id '{}'",
                    scene.id
                )));
            }
            if !scene.duration.is_finite() || scene.duration < 0.0 {
                return Err(StoryreelError::validation(format!(
                    "scene '{}' duration hint must be finite and >= 0",
                    scene.id
                )));
            }
        }
        if !self.narration_volume.is_finite() || self.narration_volume < 0.0 {
            return Err(StoryreelError::validation(
                "narration_volume must be finite and >= 0",
            ));
        }
        if let Some(music) = &self.music
            && (!music.volume.is_finite() || music.volume < 0.0)
        {
            return Err(StoryreelError::validation(
                "music volume must be finite and >= 0",
            ));
        }
        self.subtitles.validate()
    }

    /// Output canvas for this project.
    pub fn canvas(&self) -> Canvas {
        Canvas::for_aspect(self.aspect_ratio)
    }

    /// Immutable scene snapshot shared by a playback/export session.
    pub fn scene_snapshot(&self) -> Arc<[Scene]> {
        Arc::from(self.scenes.clone())
    }

    /// Resolve a project-relative reference against `root`.
    pub fn resolve(root: &Path, rel: &str) -> PathBuf {
        let p = Path::new(rel);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            root.join(p)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
