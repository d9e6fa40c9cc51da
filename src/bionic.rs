//! Bionic-reading transform: marks a fixed-ratio prefix of each word for
//! emphasis so the eye can anchor on word shapes.
//!
//! Pure and deterministic, with no state and no I/O. The emphasized prefix is
//! wrapped in `**…**` markers; rendering them is the display layer's job.

use crate::text::split_paragraphs;

/// Tuning knobs for [`transform`].
#[derive(Debug, Clone, Copy)]
pub struct BionicOptions {
    /// Fraction of each word to emphasize, expected in `[0.0, 1.0]`.
    /// Values outside that range are the caller's responsibility; the
    /// transform does not clamp.
    pub bold_ratio: f32,
    /// Words shorter than this many characters pass through unchanged.
    pub min_chars: usize,
}

impl Default for BionicOptions {
    fn default() -> Self {
        Self {
            bold_ratio: 0.5,
            min_chars: 3,
        }
    }
}

/// Applies the bionic transform to `text`.
///
/// Words are the runs between single spaces; consecutive spaces survive
/// the round trip, and newlines inside a word are kept as part of it.
/// Each word of at least `min_chars` characters gets a
/// `max(1, ceil(len * bold_ratio))`-character emphasized prefix.
pub fn transform(text: &str, options: &BionicOptions) -> String {
    if text.is_empty() {
        return String::new();
    }

    text.split(' ')
        .map(|word| transform_word(word, options))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Applies [`transform`] paragraph by paragraph, preserving paragraph
/// breaks as blank lines.
pub fn transform_paragraphs(text: &str, options: &BionicOptions) -> String {
    split_paragraphs(text)
        .iter()
        .map(|paragraph| transform(paragraph, options))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn transform_word(word: &str, options: &BionicOptions) -> String {
    let len = word.chars().count();
    if len < options.min_chars {
        return word.to_string();
    }

    let bold_len = ((len as f32 * options.bold_ratio).ceil() as usize).max(1);
    let split_at = word
        .char_indices()
        .nth(bold_len)
        .map(|(idx, _)| idx)
        .unwrap_or(word.len());

    format!("**{}**{}", &word[..split_at], &word[split_at..])
}
