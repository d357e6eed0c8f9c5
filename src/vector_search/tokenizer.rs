use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    // Terminal punctuation, optional closing quotes/brackets, then whitespace.
    static ref SENTENCE_END: Regex = Regex::new(r#"[.!?]+["'”’)\]]*\s+"#).unwrap();

    static ref PARAGRAPH_BREAK: Regex = Regex::new(r"\n[ \t]*\n\s*").unwrap();

    static ref NON_LETTER: Regex = Regex::new(r"[^\p{L}\s]").unwrap();

    static ref WORD: Regex = Regex::new(r"\p{L}+").unwrap();

    static ref ABBREVIATIONS: HashSet<&'static str> = [
        "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "mt", "vs", "etc",
        "e.g", "i.e", "cf", "fig", "no", "inc", "ltd", "co", "corp", "approx",
        "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec",
    ]
    .into_iter()
    .collect();
}

/// Split running text into sentences.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace and something
/// that can open a sentence (an uppercase letter, a digit, or an opening
/// quote or bracket). A full stop after a known abbreviation or a single
/// initial does not end a sentence. Blank lines always do.
pub fn sentences(text: &str) -> Vec<String> {
    PARAGRAPH_BREAK
        .split(text)
        .flat_map(split_paragraph)
        .collect()
}

fn split_paragraph(paragraph: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_END.find_iter(paragraph) {
        let before = &paragraph[start..boundary.start()];
        let after = &paragraph[boundary.end()..];

        if !opens_sentence(after) || ends_with_abbreviation(before, boundary.as_str()) {
            continue;
        }

        push_trimmed(&mut sentences, &paragraph[start..boundary.end()]);
        start = boundary.end();
    }

    push_trimmed(&mut sentences, &paragraph[start..]);
    sentences
}

fn push_trimmed(sentences: &mut Vec<String>, chunk: &str) {
    let chunk = chunk.trim();
    if !chunk.is_empty() {
        sentences.push(chunk.to_string());
    }
}

fn opens_sentence(rest: &str) -> bool {
    match rest.chars().next() {
        Some(c) => c.is_uppercase() || c.is_numeric() || matches!(c, '"' | '\'' | '“' | '‘' | '(' | '['),
        None => false,
    }
}

fn ends_with_abbreviation(before: &str, terminator: &str) -> bool {
    if !terminator.starts_with('.') || terminator.starts_with("..") {
        return false;
    }

    let last_word = before
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();

    let is_initial = last_word.chars().count() == 1 && last_word.chars().all(char::is_alphabetic);
    is_initial || ABBREVIATIONS.contains(last_word.as_str())
}

/// Normalize a sentence into lowercase word tokens.
///
/// Every character that is neither a letter nor whitespace is removed first,
/// so `don't` becomes `dont` and `e-mail` becomes `email`.
pub fn tokens(sentence: &str) -> Vec<String> {
    let letters_only = NON_LETTER.replace_all(sentence, "").to_lowercase();

    WORD.find_iter(&letters_only)
        .map(|word| word.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentences_split_on_terminal_punctuation() {
        let result = sentences("The cat sat. The dog ran! Did it stop? Yes.");
        assert_eq!(result, vec!["The cat sat.", "The dog ran!", "Did it stop?", "Yes."]);
    }

    #[test]
    fn test_sentences_respect_capitalization() {
        let result = sentences("Version 2.5 is out. see the notes. Then upgrade.");
        assert_eq!(result, vec!["Version 2.5 is out. see the notes.", "Then upgrade."]);
    }

    #[test]
    fn test_sentences_skip_abbreviations_and_initials() {
        let result = sentences("Dr. Smith met J. Doe at noon. They talked, e.g. About work.");
        assert_eq!(result, vec!["Dr. Smith met J. Doe at noon.", "They talked, e.g. About work."]);
    }

    #[test]
    fn test_sentences_keep_closing_quotes() {
        let result = sentences("He said \"stop.\" Then he left.");
        assert_eq!(result, vec!["He said \"stop.\"", "Then he left."]);
    }

    #[test]
    fn test_sentences_break_on_blank_lines() {
        let result = sentences("Senior UX Designer\n\nworking on complex topics\nand products");
        assert_eq!(result, vec!["Senior UX Designer", "working on complex topics\nand products"]);
    }

    #[test]
    fn test_sentences_of_empty_text() {
        assert!(sentences("").is_empty());
        assert!(sentences("   \n\n  ").is_empty());
    }

    #[test]
    fn test_sentences_are_deterministic() {
        let text = "One. Two! Three? Four.";
        assert_eq!(sentences(text), sentences(text));
    }

    #[test]
    fn test_tokens_strip_punctuation_and_lowercase() {
        assert_eq!(tokens("Hello, World!"), vec!["hello", "world"]);
        assert_eq!(tokens("I'm a senior UX designer."), vec!["im", "a", "senior", "ux", "designer"]);
    }

    #[test]
    fn test_tokens_drop_digits() {
        assert_eq!(tokens("Top 10 tips for 2024"), vec!["top", "tips", "for"]);
    }

    #[test]
    fn test_tokens_keep_unicode_letters() {
        assert_eq!(tokens("Café Über naïve"), vec!["café", "über", "naïve"]);
    }

    #[test]
    fn test_tokens_of_noise() {
        assert!(tokens("123 -- ?!").is_empty());
    }
}
