//! Estimates how long a post takes to read from the word count of its section
//! headings and bodies.
//!
//! Words are counted by splitting on every single whitespace character, so a
//! run of `n` consecutive delimiters yields `n - 1` empty words. `"A  B"`
//! counts as three words and the empty string counts as one. Estimates
//! produced by earlier versions of the site depend on this exact count.

use crate::post::Section;
use crate::richtext;

/// The default reading speed.
pub const WORDS_PER_MINUTE: u32 = 200;

/// Counts the words in `text`, including the empty words between consecutive
/// delimiters.
pub fn count_words(text: &str) -> usize {
    text.split(is_delimiter).count()
}

// The ECMAScript whitespace and line terminator set: Unicode `White_Space`
// without NEL (U+0085), plus the byte-order mark.
fn is_delimiter(c: char) -> bool {
    match c {
        '\u{85}' => false,
        '\u{feff}' => true,
        c => c.is_whitespace(),
    }
}

/// Sums the heading and body word counts of every section. Bodies are
/// flattened to plain text first. An absent heading or body adds nothing.
pub fn total_words(content: &[Section]) -> usize {
    content
        .iter()
        .map(|section| {
            let heading = section.heading.as_deref().map_or(0, count_words);
            let body = section
                .body
                .as_deref()
                .map_or(0, |blocks| count_words(&richtext::as_text(blocks)));
            heading + body
        })
        .sum()
}

/// Estimates the reading time in whole minutes at `words_per_minute`, rounding
/// to the nearest minute. Short posts may take zero minutes. `words_per_minute`
/// must be at least 1.
pub fn estimate(content: &[Section], words_per_minute: u32) -> u32 {
    let words = total_words(content) as f64;
    (words / f64::from(words_per_minute)).round() as u32
}

/// Estimates the reading time at [`WORDS_PER_MINUTE`].
pub fn reading_time(content: &[Section]) -> u32 {
    estimate(content, WORDS_PER_MINUTE)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::richtext::Block;

    fn section(heading: &str, body: &[&str]) -> Section {
        Section {
            heading: Some(heading.to_owned()),
            body: Some(
                body.iter()
                    .map(|text| Block {
                        kind: String::from("paragraph"),
                        text: (*text).to_owned(),
                        ..Block::default()
                    })
                    .collect(),
            ),
        }
    }

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn test_short_post_rounds_to_zero() {
        let content = vec![section("Intro", &["This is a test"])];
        assert_eq!(5, total_words(&content));
        assert_eq!(0, reading_time(&content));
    }

    #[test]
    fn test_four_hundred_words_is_two_minutes() {
        let content = vec![
            section(&words(10), &[words(190).as_str()]),
            section(&words(100), &[words(50).as_str(), words(50).as_str()]),
        ];
        // The two body blocks of the second section join into 100 words.
        assert_eq!(400, total_words(&content));
        assert_eq!(2, reading_time(&content));
    }

    #[test]
    fn test_consecutive_delimiters_count_empty_words() {
        assert_eq!(3, count_words("A  B"));
        assert_eq!(3, count_words("A\t\nB"));
        assert_eq!(2, count_words("A "));
        assert_eq!(1, count_words(""));
        assert_eq!(3, total_words(&[Section {
            heading: Some(String::from("A  B")),
            body: None,
        }]));
    }

    #[test]
    fn test_delimiters() {
        // NEL separates words for `char::is_whitespace` but not here.
        assert_eq!(1, count_words("A\u{85}B"));
        assert_eq!(2, count_words("A\u{feff}B"));
        assert_eq!(2, count_words("A\u{a0}B"));
        assert_eq!(2, count_words("A\u{2028}B"));
        assert_eq!(2, count_words("A\u{3000}B"));
        assert_eq!(1, count_words("A\u{200b}B"));
    }

    #[test]
    fn test_empty_body_counts_one_word() {
        let content = vec![section("Intro", &[])];
        assert_eq!(2, total_words(&content));
    }

    #[test]
    fn test_rounds_half_up() {
        let content = vec![section(&words(100), &[words(199).as_str()])];
        assert_eq!(299, total_words(&content));
        assert_eq!(1, reading_time(&content));

        let content = vec![section(&words(100), &[words(200).as_str()])];
        assert_eq!(300, total_words(&content));
        assert_eq!(2, reading_time(&content));
    }

    #[test]
    fn test_custom_reading_speed() {
        let content = vec![section(&words(100), &[words(200).as_str()])];
        assert_eq!(3, estimate(&content, 100));
        assert_eq!(300, estimate(&content, 1));
    }

    #[test]
    fn test_no_content() {
        assert_eq!(0, reading_time(&[]));
    }
}
