//! Title cleanup applied to both sides of a comparison.

use std::sync::LazyLock;

use regex::Regex;

/// Start of a featured-artist annotation: "(feat. X)", "(Feat X)", "(featuring X)", "(ft. X)".
/// Words that merely start with "feat", like "(Feathered Mix)", are kept.
static FEATURING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(\s*(?:feat|featuring|ft)\b").expect("featuring pattern is valid")
});

/// Catalog noise. Alternatives are tried left to right, so the parenthesised
/// markers must precede the bare parentheses.
static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)- Single\b|\(Radio Edit\)|\(Single Version\)|[()]|- ")
        .expect("noise pattern is valid")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Strip edition markers, parentheses, "- " separators and any trailing
/// "(feat..." annotation, then collapse whitespace.
///
/// Cleanup is repeated until nothing changes, so removing one marker can't
/// leave another behind: `normalize_title(normalize_title(x)) == normalize_title(x)`.
pub fn normalize_title(title: &str) -> String {
    let mut current = clean_once(title);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(title: &str) -> String {
    let truncated = match FEATURING.find(title) {
        Some(found) => &title[..found.start()],
        None => title,
    };
    let stripped = NOISE.replace_all(truncated, " ");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}
