use super::*;

fn scene(id: &str, prompt: &str, script: &str) -> Scene {
    let mut s = Scene::new(id, script);
    s.visual_prompt = prompt.to_owned();
    s
}

#[test]
fn blocks_are_numbered_and_separated_by_blank_lines() {
    let scenes = vec![
        scene("a", "A misty forest", "Once upon a time."),
        scene("b", "A castle", "The end."),
    ];
    assert_eq!(
        script_transcript(&scenes),
        "Scene 1:\n[Prompt]: A misty forest\n[Narration]: Once upon a time.\n\n\
         Scene 2:\n[Prompt]: A castle\n[Narration]: The end.\n"
    );
}

#[test]
fn no_scenes_is_empty() {
    assert_eq!(script_transcript(&[]), "");
}
