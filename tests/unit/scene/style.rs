use super::*;

#[test]
fn defaults_are_valid() {
    let s = SubtitleStyle::default();
    s.validate().unwrap();
    assert!(s.visible);
    assert_eq!(s.animation, SubtitleAnimation::Pop);
    assert_eq!(s.font_px(), 85.0);
}

#[test]
fn partial_json_fills_defaults() {
    let s: SubtitleStyle =
        serde_json::from_str(r##"{"animation":"typewriter","active_text_color":"#FF0000"}"##)
            .unwrap();
    assert_eq!(s.animation, SubtitleAnimation::Typewriter);
    assert_eq!(s.active_text_color, Color::rgb(255, 0, 0));
    assert_eq!(s.text_color, Color::WHITE);
}

#[test]
fn vertical_fraction_falls_back_when_zero() {
    let mut s = SubtitleStyle {
        vertical_position: 50.0,
        ..SubtitleStyle::default()
    };
    assert_eq!(s.vertical_fraction(), 0.5);
    s.vertical_position = 0.0;
    assert_eq!(s.vertical_fraction(), 0.85);
}

#[test]
fn out_of_range_values_are_rejected() {
    let bad = [
        SubtitleStyle {
            font_size: 0.0,
            ..SubtitleStyle::default()
        },
        SubtitleStyle {
            stroke_width: -1.0,
            ..SubtitleStyle::default()
        },
        SubtitleStyle {
            vertical_position: 120.0,
            ..SubtitleStyle::default()
        },
        SubtitleStyle {
            background_opacity: 1.5,
            ..SubtitleStyle::default()
        },
    ];
    for s in bad {
        assert!(s.validate().is_err(), "{s:?}");
    }
}
