// ABOUTME: Line-oriented cleanup of extracted article text.
// ABOUTME: Drops photo caption lines and re-inserts spaces lost between words during extraction.

use once_cell::sync::Lazy;
use regex::Regex;

/// Lines starting with an "ẢNH:" / "Ảnh -" photo credit marker.
static CAPTION_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*ẢNH\s*[:\-]").unwrap());

/// A lowercase letter directly followed by an uppercase one ("cấpHà").
static MISSING_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\p{Ll})(\p{Lu})").unwrap());

/// Cleans extracted text.
///
/// Caption lines are removed, a space is inserted wherever a lowercase
/// letter runs straight into an uppercase one, and the remaining lines are
/// rejoined with `\n` and trimmed. Applying it twice gives the same result.
pub fn clean(text: &str) -> String {
    text.lines()
        .filter(|line| !is_caption_line(line))
        .map(|line| MISSING_SPACE_RE.replace_all(line, "$1 $2"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Returns true if the line is a photo caption marker line.
pub fn is_caption_line(line: &str) -> bool {
    CAPTION_LINE_RE.is_match(line)
}
