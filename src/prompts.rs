pub const SOLVE_SYSTEM: &str = include_str!("../data/prompts/solve_system.txt");
pub const IMAGE_FALLBACK: &str = include_str!("../data/prompts/image_fallback.txt");

/// Text part for a request: the user's text, or the image fallback prompt when
/// the user supplied none.
pub fn problem_text(text: &str) -> &str {
    if text.trim().is_empty() {
        IMAGE_FALLBACK
    } else {
        text
    }
}
