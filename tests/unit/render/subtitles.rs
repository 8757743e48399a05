use super::*;

fn style(animation: SubtitleAnimation) -> SubtitleStyle {
    SubtitleStyle {
        animation,
        ..SubtitleStyle::default()
    }
}

const SCRIPT: &str = "one two three four five six seven";

#[test]
fn active_index_is_uniform_and_clamped() {
    assert_eq!(active_word_index(4, 0.0, 2.0), Some(0));
    assert_eq!(active_word_index(4, 0.49, 2.0), Some(0));
    assert_eq!(active_word_index(4, 0.5, 2.0), Some(1));
    assert_eq!(active_word_index(4, 2.0, 2.0), Some(3));
    assert_eq!(active_word_index(4, 50.0, 2.0), Some(3));
    assert_eq!(active_word_index(4, -1.0, 2.0), Some(0));
    assert_eq!(active_word_index(0, 1.0, 2.0), None);
    assert_eq!(active_word_index(3, 1.0, 0.0), None);
}

#[test]
fn active_index_is_monotonic_within_a_segment() {
    let mut last = 0;
    for step in 0..=700 {
        let idx = active_word_index(7, f64::from(step) * 0.01, 7.0).unwrap();
        assert!(idx >= last);
        last = idx;
    }
    assert_eq!(last, 6);
}

#[test]
fn only_the_active_chunk_is_visible() {
    let s = style(SubtitleAnimation::None);
    let f = plan_subtitles(SCRIPT, 3.5, 7.0, &s, 0.0).unwrap();
    assert_eq!(f.active_index, 3);
    assert_eq!(f.chunk_index, 1);
    let texts: Vec<&str> = f.words.iter().map(|w| w.text).collect();
    assert_eq!(texts, vec!["four", "five", "six"]);

    let tail = plan_subtitles(SCRIPT, 6.5, 7.0, &s, 0.0).unwrap();
    let texts: Vec<&str> = tail.words.iter().map(|w| w.text).collect();
    assert_eq!(texts, vec!["seven"]);
}

#[test]
fn inactive_words_are_dimmed_in_base_color() {
    let s = style(SubtitleAnimation::Fade);
    let f = plan_subtitles(SCRIPT, 4.2, 7.0, &s, 0.0).unwrap();
    let active = &f.words[1];
    assert!(active.active);
    assert_eq!(active.color, s.active_text_color);
    assert_eq!(active.opacity, 1.0);
    for w in [&f.words[0], &f.words[2]] {
        assert_eq!(w.color, s.text_color);
        assert_eq!(w.opacity, INACTIVE_OPACITY);
    }
}

#[test]
fn pop_and_bounce_follow_animation_clock() {
    let pop = plan_subtitles(SCRIPT, 0.0, 7.0, &style(SubtitleAnimation::Pop), 0.0).unwrap();
    assert!((pop.words[0].scale - 1.15).abs() < 1e-12);
    let t = 0.15 * std::f64::consts::FRAC_PI_2;
    let pop = plan_subtitles(SCRIPT, 0.0, 7.0, &style(SubtitleAnimation::Pop), t).unwrap();
    assert!((pop.words[0].scale - 1.2).abs() < 1e-9);

    let t = 0.1 * std::f64::consts::FRAC_PI_2;
    let bounce = plan_subtitles(SCRIPT, 0.0, 7.0, &style(SubtitleAnimation::Bounce), t).unwrap();
    assert!((bounce.words[0].dy - 15.0).abs() < 1e-9);
    assert_eq!(bounce.words[1].dy, 0.0);
}

#[test]
fn glow_marks_only_the_active_word() {
    let f = plan_subtitles(SCRIPT, 1.5, 7.0, &style(SubtitleAnimation::Glow), 0.0).unwrap();
    let glows: Vec<bool> = f.words.iter().map(|w| w.glow).collect();
    assert_eq!(glows, vec![false, true, false]);
}

#[test]
fn typewriter_and_hidden_future_text_hide_later_words() {
    let f = plan_subtitles(SCRIPT, 0.5, 7.0, &style(SubtitleAnimation::Typewriter), 0.0).unwrap();
    let op: Vec<f32> = f.words.iter().map(|w| w.opacity).collect();
    assert_eq!(op, vec![1.0, 0.0, 0.0]);

    let s = SubtitleStyle {
        show_future_text: false,
        ..style(SubtitleAnimation::Pop)
    };
    let f = plan_subtitles(SCRIPT, 1.5, 7.0, &s, 0.0).unwrap();
    let op: Vec<f32> = f.words.iter().map(|w| w.opacity).collect();
    assert_eq!(op, vec![INACTIVE_OPACITY, 1.0, 0.0]);
}

#[test]
fn invisible_style_or_empty_script_draws_nothing() {
    let hidden = SubtitleStyle {
        visible: false,
        ..SubtitleStyle::default()
    };
    assert!(plan_subtitles(SCRIPT, 1.0, 7.0, &hidden, 0.0).is_none());
    assert!(plan_subtitles("   ", 1.0, 7.0, &SubtitleStyle::default(), 0.0).is_none());
}

#[test]
fn active_index_resets_at_the_next_segment() {
    use crate::audio::decode::AudioPcm;
    use crate::audio::timeline::Timeline;
    use crate::scene::model::SceneId;

    let timeline = Timeline::from_decoded([("a", 5.0), ("b", 7.0)].map(|(id, secs)| {
        (
            SceneId(id.to_owned()),
            AudioPcm {
                sample_rate: 100,
                channels: 1,
                interleaved_f32: vec![0.0; (secs * 100.0) as usize],
            },
        )
    }));
    let scripts = ["one two three four", "five six seven"];
    let style = style(SubtitleAnimation::None);

    let plan_at = |t: f64| {
        let cursor = timeline.resolve(t).unwrap();
        let seg = &timeline.segments()[cursor.index];
        let plan =
            plan_subtitles(scripts[cursor.index], cursor.elapsed, seg.duration, &style, 0.0)
                .unwrap();
        (cursor.index, plan.active_index)
    };

    assert_eq!(plan_at(5.0 - 1e-6), (0, 3));
    assert_eq!(plan_at(5.0), (1, 0));
}
