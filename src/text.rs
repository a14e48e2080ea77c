//! Cosmetic transcript normalization
//!
//! Applied only in transcription mode, where the delivered text must stay
//! byte-equal to the model output modulo trimming and sentence punctuation.
//! Content words are never altered.

use regex::Regex;

/// Normalize a raw transcript for delivery.
///
/// Trims, collapses whitespace runs, fixes spacing around punctuation,
/// capitalizes the first letter, and appends a terminal period when the
/// text does not already end a sentence.
pub fn normalize_transcript(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut result = collapse_whitespace(trimmed);
    result = fix_punctuation_spacing(&result);
    result = capitalize_first(&result);

    if !ends_sentence(&result) {
        result.push('.');
    }

    result
}

fn collapse_whitespace(text: &str) -> String {
    // Runs of spaces/tabs become a single space; newlines are preserved
    match Regex::new(r"[ \t]+") {
        Ok(re) => re.replace_all(text, " ").into_owned(),
        Err(_) => text.to_string(),
    }
}

fn fix_punctuation_spacing(text: &str) -> String {
    let mut result = text.to_string();

    // Remove space before closing punctuation
    for punct in ['.', ',', '?', '!', ':', ';', ')', ']'] {
        result = result.replace(&format!(" {}", punct), &punct.to_string());
    }

    // Remove space after opening brackets
    for punct in ['(', '['] {
        result = result.replace(&format!("{} ", punct), &punct.to_string());
    }

    result
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => {
            let mut result: String = first.to_uppercase().collect();
            result.push_str(chars.as_str());
            result
        }
        None => String::new(),
    }
}

fn ends_sentence(text: &str) -> bool {
    matches!(
        text.chars().last(),
        Some('.') | Some('!') | Some('?') | Some('…')
    )
}
