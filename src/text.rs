//! Helpers for text already extracted from a document page.

/// Reading speed assumed before any sessions have established a real one.
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 200;

/// Collapses whitespace runs to single spaces and trims the result, so
/// extracted page text reads as one clean block before display or speech.
pub fn normalize_page_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_whitespace = false;
    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            in_whitespace = true;
        } else {
            if in_whitespace && !out.is_empty() {
                out.push(' ');
            }
            in_whitespace = false;
            out.push(ch);
        }
    }
    out
}

/// Splits text into paragraphs on blank-line boundaries. Lines holding
/// only whitespace count as blank. Empty paragraphs are dropped.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.trim().is_empty() {
                paragraphs.push(current.trim().to_string());
            }
            current.clear();
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.trim().is_empty() {
        paragraphs.push(current.trim().to_string());
    }

    paragraphs
}

/// Estimated reading time in whole minutes, rounded up.
pub fn reading_time_minutes(text: &str, words_per_minute: u32) -> u32 {
    let words = text.split_whitespace().count() as u32;
    if words == 0 || words_per_minute == 0 {
        return 0;
    }
    words.div_ceil(words_per_minute)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_runs_and_trims() {
        assert_eq!(
            normalize_page_text("  The   quick\n\nbrown\tfox  "),
            "The quick brown fox"
        );
    }

    #[test]
    fn normalize_empty_is_empty() {
        assert_eq!(normalize_page_text(""), "");
        assert_eq!(normalize_page_text("   \n\t "), "");
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        let text = "First para\nstill first.\n\nSecond.\n   \nThird.";
        assert_eq!(
            split_paragraphs(text),
            vec!["First para\nstill first.", "Second.", "Third."]
        );
    }

    #[test]
    fn paragraphs_drop_empty_chunks() {
        assert_eq!(split_paragraphs("\n\n\n"), Vec::<String>::new());
    }

    #[test]
    fn reading_time_rounds_up() {
        let text = "word ".repeat(201);
        assert_eq!(reading_time_minutes(&text, 200), 2);
        assert_eq!(reading_time_minutes("a few words here", 200), 1);
        assert_eq!(reading_time_minutes("", 200), 0);
    }
}
