use once_cell::sync::Lazy;
use regex::Regex;

static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(.*?\)|\[.*?\]").expect("valid bracket pattern"));
static NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid non-alnum pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid space pattern"));

/// Canonicalize a free-text artist/title/album field for comparison.
///
/// `"Song (Live) [2019 Remaster]"` → `"song"`, `"AC/DC"` → `"ac dc"`.
/// Absent or empty input yields an empty string.
pub fn normalize(text: Option<&str>) -> String {
    let text = match text {
        Some(t) if !t.is_empty() => t,
        _ => return String::new(),
    };

    let lowered = text.to_lowercase();
    let stripped = BRACKETED.replace_all(lowered.trim(), "");
    let spaced = NON_ALNUM.replace_all(&stripped, " ");
    WHITESPACE.replace_all(&spaced, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_absent() {
        assert_eq!(normalize(None), "");
        assert_eq!(normalize(Some("")), "");
        assert_eq!(normalize(Some("   ")), "");
        assert_eq!(normalize(Some("()")), "");
    }

    #[test]
    fn test_strips_brackets() {
        assert_eq!(normalize(Some("Song (Live)")), normalize(Some("Song")));
        assert_eq!(normalize(Some("Song [Remastered 2011]")), "song");
        assert_eq!(normalize(Some("A (x) B (y) C")), "a b c");
    }

    #[test]
    fn test_punctuation_runs_become_single_space() {
        assert_eq!(normalize(Some("AC/DC")), "ac dc");
        assert_eq!(normalize(Some("  Hello,   World!!  ")), "hello world");
        assert_eq!(normalize(Some("Absence Of You - Single")), "absence of you single");
    }

    #[test]
    fn test_non_ascii_letters_are_separators() {
        assert_eq!(normalize(Some("Beyoncé")), "beyonc");
        assert_eq!(normalize(Some("Sigur Rós")), "sigur r s");
    }

    #[test]
    fn test_idempotent() {
        for s in [
            "PALESKIN",
            "Absence Of You (feat. Someone) [Live]",
            "  --weird__spacing--  ",
            "Mötley Crüe",
            "unclosed (bracket",
            "",
        ] {
            let once = normalize(Some(s));
            assert_eq!(normalize(Some(&once)), once, "not idempotent for {s:?}");
        }
    }
}
