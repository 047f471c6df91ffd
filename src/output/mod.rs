// Output formatting: terminal display of runs, themes and store status.

pub mod terminal;

/// Shorten an IRI to at most `max_chars` characters, keeping its tail.
///
/// The end of an IRI (the local name or UUID) is what tells two resources
/// apart, so the front is elided. Counts characters, not bytes, so it never
/// splits a multi-byte character.
pub fn short_iri(iri: &str, max_chars: usize) -> String {
    let char_count = iri.chars().count();
    if char_count <= max_chars {
        return iri.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let tail: String = iri.chars().skip(char_count - keep).collect();
    format!("...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_iri_keeps_short_values() {
        assert_eq!(short_iri("http://ex.org/a", 40), "http://ex.org/a");
    }

    #[test]
    fn test_short_iri_keeps_tail() {
        let s = short_iri("http://example.org/themes/music-and-dance", 15);
        assert_eq!(s, "...ic-and-dance");
        assert_eq!(s.chars().count(), 15);
    }

    #[test]
    fn test_short_iri_multibyte() {
        let s = short_iri("http://example.org/thèmes/fête", 8);
        assert_eq!(s, ".../fête");
    }
}
