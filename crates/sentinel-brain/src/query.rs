/// Words that get a query rejected before it reaches any provider.
const PROFANITY: &[&str] = &[
    "arsehole", "asshole", "bastard", "bitch", "bollocks", "cunt", "dick",
    "dickhead", "fuck", "fucked", "fucker", "fucking", "motherfucker",
    "piss", "prick", "shit", "shitty", "slut", "twat", "wanker", "whore",
];

/// Outcome of screening a raw `.chat` invocation. Rejections happen
/// entirely offline; only `Query` proceeds to the network phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screened {
    Empty,
    /// A token parsed as a URL. Users must not be able to smuggle their
    /// own links into bot output.
    Unsafe,
    Profane,
    /// The normalized search string: whitespace collapsed, `?` ensured.
    Query(String),
}

/// Screen and normalize a raw query.
pub fn screen(raw: &str) -> Screened {
    let words: Vec<&str> = raw.split_whitespace().collect();

    if words.is_empty() {
        return Screened::Empty;
    }

    for word in &words {
        if reqwest::Url::parse(word).is_ok() {
            return Screened::Unsafe;
        }
        if is_profane(word) {
            return Screened::Profane;
        }
    }

    let mut query = words.join(" ");
    if !query.contains('?') {
        query.push('?');
    }

    Screened::Query(query)
}

fn is_profane(word: &str) -> bool {
    let cleaned: String = word
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    PROFANITY.contains(&cleaned.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_empty() {
        assert_eq!(screen(""), Screened::Empty);
        assert_eq!(screen("   \t "), Screened::Empty);
    }

    #[test]
    fn test_url_token_is_unsafe() {
        assert_eq!(
            screen("see https://evil.example.com/page please"),
            Screened::Unsafe
        );
    }

    #[test]
    fn test_profane_token_is_rejected() {
        assert_eq!(screen("what the fuck is this"), Screened::Profane);
        // Punctuation does not hide a profane word
        assert_eq!(screen("this is shit!"), Screened::Profane);
    }

    #[test]
    fn test_whitespace_is_collapsed_and_question_mark_ensured() {
        assert_eq!(
            screen("  how   does autopilot\twork "),
            Screened::Query("how does autopilot work?".to_string())
        );
    }

    #[test]
    fn test_existing_question_mark_is_kept() {
        assert_eq!(
            screen("how does autopilot work?"),
            Screened::Query("how does autopilot work?".to_string())
        );
    }

    #[test]
    fn test_plain_words_are_not_urls() {
        assert!(matches!(screen("autopilot basics"), Screened::Query(_)));
    }
}
