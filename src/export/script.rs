use crate::scene::model::Scene;

/// Plain-text transcript of every scene's prompt and narration.
///
/// Each scene becomes `Scene N:\n[Prompt]: ...\n[Narration]: ...\n`, numbered from 1; blocks are
/// separated by a blank line.
pub fn script_transcript(scenes: &[Scene]) -> String {
    scenes
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "Scene {}:\n[Prompt]: {}\n[Narration]: {}\n",
                i + 1,
                s.visual_prompt,
                s.script
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[path = "../../tests/unit/export/script.rs"]
mod tests;
