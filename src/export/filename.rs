/// Stem used when a title sanitizes to nothing.
pub const DEFAULT_STEM: &str = "video_story";

/// Maximum number of title characters kept.
pub const MAX_STEM_CHARS: usize = 40;

/// Turn a project title into a file-name stem.
///
/// Keeps the first [`MAX_STEM_CHARS`] characters, replaces everything outside ASCII letters and
/// digits with `_` and lowercases the result. An empty title yields [`DEFAULT_STEM`].
pub fn sanitize_filename(title: &str) -> String {
    let stem: String = title
        .chars()
        .take(MAX_STEM_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        DEFAULT_STEM.to_owned()
    } else {
        stem
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/filename.rs"]
mod tests;
