//! Heuristic structure reconstruction for OCR text.
//!
//! OCR output carries no markup, so document structure is guessed per line.
//! The heuristic is deterministic and total: every line gets exactly one
//! role, first matching rule wins. False positives are expected; downstream
//! consumers treat the roles as formatting hints, not ground truth.

use regex::Regex;

/// Structural role assigned to one line of extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    Empty,
    Title,
    Subtitle,
    Paragraph,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub role: LineRole,
    pub text: String,
}

/// A trimmed line shorter than this, with at most [`TITLE_MAX_WORDS`] words,
/// is treated as a title.
const TITLE_MAX_CHARS: usize = 50;
const TITLE_MAX_WORDS: usize = 8;

/// Non-title lines shorter than this default to subtitle, as do lines with a
/// leading numeric-dot marker ("2. ..."). Longer lines are body paragraphs.
const SUBTITLE_MAX_CHARS: usize = 100;

pub struct StructureClassifier {
    numbered_heading: Regex,
}

impl StructureClassifier {
    pub fn new() -> Self {
        Self {
            // One or more digits followed by a literal dot at line start.
            numbered_heading: Regex::new(r"^\d+\.").expect("static pattern"),
        }
    }

    /// Splits one page of raw text into lines and classifies each in order.
    /// Lengths are counted in Unicode scalar values, not bytes — a Bangla
    /// title is a handful of characters but several times that in UTF-8.
    pub fn classify_page(&self, text: &str) -> Vec<ClassifiedLine> {
        text.split('\n').map(|line| self.classify_line(line)).collect()
    }

    fn classify_line(&self, line: &str) -> ClassifiedLine {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            return ClassifiedLine {
                role: LineRole::Empty,
                text: String::new(),
            };
        }

        let chars = trimmed.chars().count();
        let words = trimmed.split_whitespace().count();

        let role = if chars < TITLE_MAX_CHARS && words <= TITLE_MAX_WORDS {
            LineRole::Title
        } else if self.numbered_heading.is_match(trimmed) || chars < SUBTITLE_MAX_CHARS {
            LineRole::Subtitle
        } else {
            LineRole::Paragraph
        };

        ClassifiedLine {
            role,
            text: trimmed.to_string(),
        }
    }
}

impl Default for StructureClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Whitespace-split token count for one page of raw text.
pub fn count_words(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(text: &str) -> Vec<LineRole> {
        StructureClassifier::new()
            .classify_page(text)
            .into_iter()
            .map(|l| l.role)
            .collect()
    }

    #[test]
    fn test_empty_and_whitespace_lines() {
        assert_eq!(roles(""), vec![LineRole::Empty]);
        assert_eq!(roles("   \t "), vec![LineRole::Empty]);
        assert_eq!(roles("\n"), vec![LineRole::Empty, LineRole::Empty]);
    }

    #[test]
    fn test_short_line_is_title() {
        assert_eq!(roles("Chapter One"), vec![LineRole::Title]);
    }

    #[test]
    fn test_title_precedes_subtitle_check() {
        // 5 words, 40 chars: satisfies the subtitle length rule too, but the
        // title rule is checked first.
        let line = "Five short words make a line"; // 28 chars, 6 words
        assert!(line.chars().count() < 50);
        assert_eq!(roles(line), vec![LineRole::Title]);
    }

    #[test]
    fn test_nine_words_under_fifty_chars_is_subtitle() {
        let line = "one two three four five six seven eight nine";
        assert!(line.chars().count() < 50);
        assert_eq!(line.split_whitespace().count(), 9);
        assert_eq!(roles(line), vec![LineRole::Subtitle]);
    }

    #[test]
    fn test_numbered_line_is_subtitle() {
        assert_eq!(
            roles("2. Subtitle Two and then some words to push it well past the fifty character title cutoff"),
            vec![LineRole::Subtitle]
        );
    }

    #[test]
    fn test_numbered_pattern_beats_length() {
        // Over 100 chars but numeric-dot prefixed: still a subtitle.
        let long = format!("12. {}", "word ".repeat(30));
        assert!(long.trim().chars().count() > 100);
        assert_eq!(roles(&long), vec![LineRole::Subtitle]);
    }

    #[test]
    fn test_long_line_is_paragraph() {
        let line = "This is a body paragraph that is reasonably long and exceeds one \
                    hundred characters in total length to force paragraph classification.";
        assert!(line.chars().count() > 100);
        assert_eq!(roles(line), vec![LineRole::Paragraph]);
    }

    #[test]
    fn test_medium_line_defaults_to_subtitle() {
        // Between 50 and 100 chars, many words, no numeric prefix: the
        // literal contract classifies this as subtitle, not paragraph.
        let line = "a line of many small words that runs past fifty characters but stays under one hundred";
        let n = line.chars().count();
        assert!(n > 50 && n < 100);
        assert_eq!(roles(line), vec![LineRole::Subtitle]);
    }

    #[test]
    fn test_bangla_lengths_counted_in_chars() {
        // 9 chars in 3 words; far more than 50 bytes would be wrong.
        let line = "বাংলা ভাষা আন্দোলন";
        assert!(line.len() > line.chars().count());
        assert_eq!(roles(line), vec![LineRole::Title]);
    }

    #[test]
    fn test_order_preserved_and_total() {
        let page = "Title One\n\n2. Numbered\nshort";
        let lines = StructureClassifier::new().classify_page(page);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].role, LineRole::Title);
        assert_eq!(lines[1].role, LineRole::Empty);
        assert_eq!(lines[2].role, LineRole::Title); // "2. Numbered" is short enough for title
        assert_eq!(lines[3].role, LineRole::Title);
    }

    #[test]
    fn test_deterministic() {
        let classifier = StructureClassifier::new();
        let page = "Heading\nsome middling line of text that sits between the two cutoffs ok\n\nbody";
        assert_eq!(classifier.classify_page(page), classifier.classify_page(page));
    }

    #[test]
    fn test_classified_text_is_trimmed() {
        let lines = StructureClassifier::new().classify_page("  padded title  ");
        assert_eq!(lines[0].text, "padded title");
    }

    #[test]
    fn test_word_count() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("   \n\t"), 0);
        assert_eq!(count_words("one two  three\nfour"), 4);
        assert_eq!(count_words("বাংলা ভাষা"), 2);
    }

    #[test]
    fn test_word_count_idempotent() {
        let text = "Title One\nThis is a body paragraph.";
        assert_eq!(count_words(text), count_words(text));
    }
}
