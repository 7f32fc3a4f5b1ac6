//! Text truncation helpers.
//!
//! Two distinct disciplines, used in two distinct places:
//! - [`truncate_chars`] — hard left-anchored character cut, applied to
//!   the classifier's combined subject+body input;
//! - [`truncate_words`] — whole-word cut, applied to reply prompts
//!   before generation.

/// Truncate to at most `max_chars` characters, keeping the front.
///
/// Counts `char`s rather than bytes so multi-byte input never splits
/// mid-character.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Truncate to at most `max_words` whitespace-separated words.
///
/// Input with `max_words` or fewer words is returned unchanged;
/// longer input comes back as the first `max_words` words joined by
/// single spaces.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_string();
    }
    words[..max_words].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_chars_cuts_from_the_left() {
        let input = "a".repeat(1000);
        let cut = truncate_chars(&input, 512);
        assert_eq!(cut.chars().count(), 512);
        assert_eq!(cut, input[..512]);
    }

    #[test]
    fn truncate_chars_keeps_short_input() {
        assert_eq!(truncate_chars("hello", 512), "hello");
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        let input = "héllo wörld".repeat(100);
        let cut = truncate_chars(&input, 512);
        assert_eq!(cut.chars().count(), 512);
        assert!(input.starts_with(&cut));
    }

    #[test]
    fn truncate_words_cuts_to_exact_count() {
        let input = (0..2500).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let cut = truncate_words(&input, 2000);
        assert_eq!(cut.split_whitespace().count(), 2000);
        assert!(cut.ends_with("1999"));
    }

    #[test]
    fn truncate_words_keeps_short_input_unchanged() {
        let input = "just a few\n words  with odd   spacing";
        assert_eq!(truncate_words(input, 2000), input);
    }

    #[test]
    fn truncate_words_exact_boundary_unchanged() {
        let input = (0..2000).map(|_| "w").collect::<Vec<_>>().join(" ");
        assert_eq!(truncate_words(&input, 2000), input);
    }
}
