//! Sentence and term splitting for the summarizer.

/// Split `text` into trimmed sentences.
///
/// A sentence ends at `.`, `!` or `?` (plus any closing quotes or brackets)
/// followed by whitespace, unless the next word starts lowercase or the
/// period closes a known abbreviation or an initial. A lone capital letter
/// counts as an initial only next to another one, as in `J. K. Rowling`.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }

        let mut end = idx + c.len_utf8();
        while let Some(&(next_idx, next)) = chars.peek() {
            if matches!(next, '.' | '!' | '?' | '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}') {
                end = next_idx + next.len_utf8();
                chars.next();
            } else {
                break;
            }
        }

        let rest = &text[end..];
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }
        let next_word = rest.trim_start();
        if next_word.starts_with(char::is_lowercase) {
            continue;
        }
        if c == '.' && ends_with_abbreviation(&text[start..idx], next_word) {
            continue;
        }

        push_trimmed(&mut sentences, &text[start..end]);
        start = end;
    }

    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed<'a>(sentences: &mut Vec<&'a str>, candidate: &'a str) {
    let trimmed = candidate.trim();
    if trimmed.chars().any(char::is_alphanumeric) {
        sentences.push(trimmed);
    }
}

fn ends_with_abbreviation(before_period: &str, next_word: &str) -> bool {
    let mut words = before_period.rsplit(|c: char| c.is_whitespace() || c == '(' || c == '"');
    let word = words.next().unwrap_or("");

    let mut letters = word.chars();
    if let (Some(first), None) = (letters.next(), letters.next()) {
        if first.is_uppercase() {
            let previous = words.find(|w| !w.is_empty()).unwrap_or("");
            let following = next_word.split_whitespace().next().unwrap_or("");
            return is_initial(previous) || is_initial(following);
        }
    }

    matches!(
        word.to_lowercase().as_str(),
        "mr" | "mrs" | "ms" | "dr" | "prof" | "sr" | "jr" | "st" | "vs" | "etc" | "e.g" | "i.e" |
        "u.s" | "u.k" | "u.n" | "inc" | "ltd" | "co" | "corp" | "gen" | "gov" | "sen" | "rep" |
        "jan" | "feb" | "mar" | "apr" | "aug" | "sept" | "sep" | "oct" | "nov" | "dec"
    )
}

fn is_initial(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(letter), Some('.'), None) if letter.is_uppercase()
    )
}

/// Lowercased terms of two or more word characters, stop words removed.
pub fn terms(sentence: &str) -> impl Iterator<Item = String> + '_ {
    sentence
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|token| !is_stop_word(token))
}

/// Check if a word is a common English stop word
pub fn is_stop_word(word: &str) -> bool {
    matches!(
        word,
        "a" | "about" | "above" | "after" | "again" | "against" | "ain" | "all" | "am" | "an" |
        "and" | "any" | "are" | "aren" | "as" | "at" | "be" | "because" | "been" | "before" |
        "being" | "below" | "between" | "both" | "but" | "by" | "can" | "couldn" | "d" | "did" |
        "didn" | "do" | "does" | "doesn" | "doing" | "don" | "down" | "during" | "each" | "few" |
        "for" | "from" | "further" | "had" | "hadn" | "has" | "hasn" | "have" | "haven" |
        "having" | "he" | "her" | "here" | "hers" | "herself" | "him" | "himself" | "his" |
        "how" | "i" | "if" | "in" | "into" | "is" | "isn" | "it" | "its" | "itself" | "just" |
        "ll" | "m" | "ma" | "me" | "mightn" | "more" | "most" | "mustn" | "my" | "myself" |
        "needn" | "no" | "nor" | "not" | "now" | "o" | "of" | "off" | "on" | "once" | "only" |
        "or" | "other" | "our" | "ours" | "ourselves" | "out" | "over" | "own" | "re" | "s" |
        "same" | "shan" | "she" | "should" | "shouldn" | "so" | "some" | "such" | "t" | "than" |
        "that" | "the" | "their" | "theirs" | "them" | "themselves" | "then" | "there" |
        "these" | "they" | "this" | "those" | "through" | "to" | "too" | "under" | "until" |
        "up" | "ve" | "very" | "was" | "wasn" | "we" | "were" | "weren" | "what" | "when" |
        "where" | "which" | "while" | "who" | "whom" | "why" | "will" | "with" | "won" |
        "wouldn" | "y" | "you" | "your" | "yours" | "yourself" | "yourselves" | "would" |
        "could" | "may" | "might" | "must" | "also" | "said" | "says"
    )
}
