use smallvec::SmallVec;

use crate::foundation::color::Color;
use crate::scene::style::{SubtitleAnimation, SubtitleStyle};

/// Words shown together on screen.
pub const CHUNK_WORDS: usize = 3;
/// Opacity of words that are not being spoken.
pub const INACTIVE_OPACITY: f32 = 0.5;
/// Blur radius of the glow behind the active word, in pixels.
pub const GLOW_BLUR_PX: f32 = 30.0;

/// Draw instructions for one visible word.
#[derive(Clone, Debug, PartialEq)]
pub struct WordCue<'a> {
    /// Word text.
    pub text: &'a str,
    /// Index of the word in the whole script.
    pub index: usize,
    /// Whether this is the word being spoken.
    pub active: bool,
    /// Fill color.
    pub color: Color,
    /// Multiplier on the word's opacity.
    pub opacity: f32,
    /// Scale about the word's center.
    pub scale: f64,
    /// Vertical displacement in pixels.
    pub dy: f64,
    /// Whether to draw a blurred halo in the fill color.
    pub glow: bool,
}

/// The visible chunk of a scene's subtitles at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct SubtitleFrame<'a> {
    /// Index of the spoken word.
    pub active_index: usize,
    /// Index of the chunk containing the spoken word.
    pub chunk_index: usize,
    /// Words of the chunk in reading order.
    pub words: SmallVec<[WordCue<'a>; CHUNK_WORDS]>,
}

/// Index of the spoken word with uniform per-word timing.
///
/// Returns `None` when there are no words or the segment has no duration.
pub fn active_word_index(word_count: usize, elapsed: f64, duration: f64) -> Option<usize> {
    if word_count == 0 || !(duration > 0.0) {
        return None;
    }
    let per_word = duration / word_count as f64;
    let elapsed = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };
    let idx = (elapsed / per_word).floor() as usize;
    Some(idx.min(word_count - 1))
}

/// Lay out the visible subtitle chunk for `script` at `elapsed` seconds into its segment.
///
/// `anim_secs` drives the oscillating animations and is independent from the timeline position.
pub fn plan_subtitles<'a>(
    script: &'a str,
    elapsed: f64,
    duration: f64,
    style: &SubtitleStyle,
    anim_secs: f64,
) -> Option<SubtitleFrame<'a>> {
    if !style.visible {
        return None;
    }
    let words: Vec<&str> = script.split_whitespace().collect();
    let active_index = active_word_index(words.len(), elapsed, duration)?;
    let chunk_index = active_index / CHUNK_WORDS;
    let first = chunk_index * CHUNK_WORDS;
    let now_ms = anim_secs * 1000.0;

    let hide_future =
        !style.show_future_text || style.animation == SubtitleAnimation::Typewriter;

    let cues = words
        .iter()
        .enumerate()
        .skip(first)
        .take(CHUNK_WORDS)
        .map(|(index, text)| {
            let active = index == active_index;
            let mut cue = WordCue {
                text,
                index,
                active,
                color: style.text_color,
                opacity: INACTIVE_OPACITY,
                scale: 1.0,
                dy: 0.0,
                glow: false,
            };
            if active {
                cue.color = style.active_text_color;
                cue.opacity = 1.0;
                match style.animation {
                    SubtitleAnimation::Pop => cue.scale = 1.15 + (now_ms / 150.0).sin() * 0.05,
                    SubtitleAnimation::Bounce => cue.dy = (now_ms / 100.0).sin() * 15.0,
                    SubtitleAnimation::Glow => cue.glow = true,
                    SubtitleAnimation::None
                    | SubtitleAnimation::Fade
                    | SubtitleAnimation::Typewriter => {}
                }
            } else if hide_future && index > active_index {
                cue.opacity = 0.0;
            }
            cue
        })
        .collect();

    Some(SubtitleFrame {
        active_index,
        chunk_index,
        words: cues,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/subtitles.rs"]
mod tests;
