//! Cheap content filters applied before language detection.
//!
//! Ordered cheapest-first by the worker: word count, letter ratio,
//! repetitive patterns, spam heuristics. Everything here is pure and
//! operates on the raw post text.

use unicode_general_category::{get_general_category, GeneralCategory};

/// Literal substrings that mark a post as spam. Matched case-insensitively.
const SPAM_PATTERNS: &[&str] = &[
    "onlyfans.com",
    "join my vip",
    "subscribe to my",
    "check my profile",
    "check my bio",
    "link in bio",
    "link in profile",
    "follow me",
    "follow back",
    "follow for follow",
    "f4f",
];

/// NSFW terms. Kept minimal to avoid false positives.
const NSFW_TERMS: &[&str] = &["porn", "xxx", "nsfw", "18+"];

/// Minimum whitespace-separated words for a post to be considered.
const MIN_WORD_COUNT: usize = 4;

/// Whether the text has enough words to be worth processing. The cheapest
/// check in the cascade, so it runs first.
pub fn has_enough_words(text: &str) -> bool {
    text.split_whitespace().count() >= MIN_WORD_COUNT
}

/// Whether enough of the text is letters to be worth processing.
///
/// Letters are `[A-Za-z]` plus the Norwegian `æøåÆØÅ`; the ratio is over
/// the UTF-8 byte length and must strictly exceed 30%.
pub fn has_enough_letters(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    let letters = text
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || matches!(c, 'æ' | 'ø' | 'å' | 'Æ' | 'Ø' | 'Å'))
        .count();

    letters as f64 / text.len() as f64 > 0.30
}

/// Whether the text is dominated by repeated symbols or short patterns.
///
/// Text is lowercased and stripped of spaces, then split into grapheme
/// clusters (a base code point plus any contiguous nonspacing marks,
/// zero-width joiners, or variation selectors). Rejects when a single
/// cluster occurs 4+ times in a row, or a window of length k ∈ [2..8]
/// occurs consecutively at least 4 times (k ≤ 3) or twice (k ≥ 4).
pub fn contains_repetitive_pattern(text: &str) -> bool {
    let text = text.to_lowercase().replace(' ', "");
    if text.chars().count() < 4 {
        return false;
    }

    let clusters = grapheme_clusters(&text);

    // Runs of one repeated cluster.
    let mut run = 1usize;
    let mut last: Option<&str> = None;
    for cluster in &clusters {
        if last == Some(cluster.as_str()) {
            run += 1;
            if run >= 4 {
                return true;
            }
        } else {
            run = 1;
            last = Some(cluster);
        }
    }

    // Consecutively repeating windows, up to 8 clusters long.
    for pattern_len in 2..=8usize {
        if clusters.len() < pattern_len * 2 {
            continue;
        }
        let min_occurrences = if pattern_len >= 4 { 2 } else { 4 };

        for start in 0..=clusters.len() - pattern_len * 2 {
            let pattern = &clusters[start..start + pattern_len];
            let mut occurrences = 1usize;
            let mut next = start + pattern_len;
            while next + pattern_len <= clusters.len()
                && &clusters[next..next + pattern_len] == pattern
            {
                occurrences += 1;
                if occurrences >= min_occurrences {
                    return true;
                }
                next += pattern_len;
            }
        }
    }

    false
}

/// Whether the text trips the spam/NSFW heuristics.
pub fn contains_spam(text: &str) -> bool {
    let lower = text.to_lowercase();

    if SPAM_PATTERNS
        .iter()
        .chain(NSFW_TERMS)
        .any(|pattern| lower.contains(pattern))
    {
        return true;
    }

    // Excessive emoji, common in NSFW spam.
    let mut emoji_count = 0usize;
    for c in text.chars() {
        if c as u32 >= 0x1F300 {
            emoji_count += 1;
            if emoji_count > 8 {
                return true;
            }
        }
    }

    let hashtags = text.matches('#').count();
    let mentions = text.matches('@').count();

    if hashtags > 5 || mentions > 5 {
        return true;
    }

    if text.contains("##") || text.contains("@@") {
        return true;
    }

    let words = text.split_whitespace().count();
    if words > 0 && (hashtags + mentions) as f64 / words as f64 > 0.5 {
        return true;
    }

    false
}

/// Split text into grapheme clusters: a base code point plus any contiguous
/// nonspacing marks, ZWJ (U+200D), or variation selectors (U+FE0F).
fn grapheme_clusters(text: &str) -> Vec<String> {
    let mut clusters = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(base) = chars.next() {
        let mut cluster = String::new();
        cluster.push(base);
        while let Some(&next) = chars.peek() {
            if is_cluster_extension(next) {
                cluster.push(next);
                chars.next();
            } else {
                break;
            }
        }
        clusters.push(cluster);
    }

    clusters
}

fn is_cluster_extension(c: char) -> bool {
    c == '\u{200d}'
        || c == '\u{fe0f}'
        || get_general_category(c) == GeneralCategory::NonspacingMark
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Word count
    // =========================================================================

    #[test]
    fn three_words_reject_four_proceed() {
        assert!(!has_enough_words("Hei på deg"));
        assert!(has_enough_words("Hei på deg du"));
    }

    #[test]
    fn extra_whitespace_does_not_inflate_the_count() {
        assert!(!has_enough_words("  Hei   på   deg  "));
        assert!(!has_enough_words(""));
    }

    // =========================================================================
    // Letter ratio
    // =========================================================================

    #[test]
    fn empty_text_has_no_letters() {
        assert!(!has_enough_letters(""));
    }

    #[test]
    fn symbols_only_rejects() {
        assert!(!has_enough_letters("!@#$%^&*()"));
    }

    #[test]
    fn norwegian_text_passes() {
        assert!(has_enough_letters("Dette er en normal norsk tekst"));
        assert!(has_enough_letters("Blåbær og røde æbler på trærne"));
    }

    #[test]
    fn exactly_thirty_percent_rejects() {
        // 3 letters over 10 bytes: ratio is exactly 0.30, which is not enough.
        assert!(!has_enough_letters("abc1234567"));
    }

    #[test]
    fn just_above_thirty_percent_accepts() {
        // 3 letters over 9 bytes.
        assert!(has_enough_letters("abc123456"));
    }

    #[test]
    fn norwegian_letters_count_as_letters() {
        // Four letters over 11 bytes (æøå are two bytes each); the text
        // would be all symbols if æøå did not count.
        assert!(has_enough_letters("æøåå 12"));
    }

    #[test]
    fn ratio_is_over_bytes_not_chars() {
        // 3 letters over 12 bytes is 0.25 even though it is 3 of 9 chars.
        assert!(!has_enough_letters("æøå123456"));
    }

    // =========================================================================
    // Repetitive patterns
    // =========================================================================

    #[test]
    fn four_repeated_clusters_reject() {
        assert!(contains_repetitive_pattern("aaaa"));
    }

    #[test]
    fn three_repeated_clusters_accept() {
        assert!(!contains_repetitive_pattern("aaa"));
    }

    #[test]
    fn repeated_run_inside_text_rejects() {
        assert!(contains_repetitive_pattern("se her looooook"));
    }

    #[test]
    fn short_pattern_needs_four_occurrences() {
        assert!(!contains_repetitive_pattern("ab ab"));
        assert!(!contains_repetitive_pattern("ab ab ab"));
        assert!(contains_repetitive_pattern("ab ab ab ab"));
    }

    #[test]
    fn long_pattern_needs_two_occurrences() {
        assert!(contains_repetitive_pattern("abcd abcd"));
        assert!(contains_repetitive_pattern("spam spam"));
    }

    #[test]
    fn case_and_spaces_are_ignored() {
        assert!(contains_repetitive_pattern("AB aB Ab ab"));
    }

    #[test]
    fn normal_sentence_accepts() {
        assert!(!contains_repetitive_pattern(
            "I dag var det veldig pent vær ute i Oslo sentrum."
        ));
    }

    #[test]
    fn emoji_zwj_sequences_cluster_with_their_joiner() {
        // Family emoji: the ZWJs attach to the preceding base, so each
        // family is three clusters and repeats are caught by the window
        // rule (k = 3 needs four occurrences).
        let family = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F466}";
        let three = family.repeat(3);
        assert!(!contains_repetitive_pattern(&three));

        let four = family.repeat(4);
        assert!(contains_repetitive_pattern(&four));
    }

    #[test]
    fn combining_marks_stay_with_their_base() {
        // "e" + combining acute repeated four times is four identical
        // clusters.
        let accented = "e\u{0301}";
        let text = accented.repeat(4);
        assert!(contains_repetitive_pattern(&text));
        assert!(!contains_repetitive_pattern(&accented.repeat(3)));
    }

    #[test]
    fn too_short_text_accepts() {
        assert!(!contains_repetitive_pattern("aa"));
        assert!(!contains_repetitive_pattern(""));
    }

    // =========================================================================
    // Spam heuristics
    // =========================================================================

    #[test]
    fn blocklist_matches_case_insensitively() {
        assert!(contains_spam("Check out my OnlyFans.com page"));
        assert!(contains_spam("follow back please"));
        assert!(contains_spam("F4F everyone"));
        assert!(contains_spam("LINK IN BIO"));
    }

    #[test]
    fn nsfw_terms_reject() {
        assert!(contains_spam("free porn here"));
        assert!(contains_spam("strictly 18+ content"));
    }

    #[test]
    fn double_hashtag_rejects() {
        assert!(contains_spam("##x"));
        assert!(contains_spam("hello @@everyone"));
    }

    #[test]
    fn nine_emojis_reject_eight_accept() {
        let eight = "fin dag på fjellet sammen i sola 🌞🌞🌞🌞🌞🌞🌞🌞";
        let nine = "fin dag på fjellet sammen i sola 🌞🌞🌞🌞🌞🌞🌞🌞🌞";
        assert!(!contains_spam(eight));
        assert!(contains_spam(nine));
    }

    #[test]
    fn six_hashtags_reject_five_accept() {
        let five = "#a #b #c #d #e and some more plain words here today";
        let six = "#a #b #c #d #e #f and some more plain words here";
        assert!(!contains_spam(five));
        assert!(contains_spam(six));
    }

    #[test]
    fn six_mentions_reject() {
        assert!(contains_spam(
            "@a @b @c @d @e @f hei på alle sammen her inne"
        ));
    }

    #[test]
    fn high_symbol_ratio_rejects() {
        // 3 hashtags + 1 mention over 6 words: ratio 0.67.
        assert!(contains_spam("#x #y #z @w se her"));
    }

    #[test]
    fn plain_text_accepts() {
        assert!(!contains_spam(
            "I dag var det veldig pent vær ute i Oslo sentrum."
        ));
    }
}
