//! Short preview of the text around the typing cursor

use std::fmt;

/// Characters shown after the current one.
const UPCOMING_LEN: usize = 3;

/// Previous, current and next few characters, with whitespace made visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preview {
    /// Character typed just before the current one.
    pub past: String,
    /// Character being typed.
    pub current: String,
    /// Characters typed next.
    pub upcoming: String,
}

impl Preview {
    /// Build the preview for position `index` of `text`.
    ///
    /// Returns `None` when `index` is past the end.
    pub fn around(text: &[char], index: usize) -> Option<Self> {
        let current = *text.get(index)?;
        let past = index
            .checked_sub(1)
            .and_then(|prev| text.get(prev))
            .map(|&c| visible(c))
            .unwrap_or_default();
        let upcoming = text
            .iter()
            .skip(index + 1)
            .take(UPCOMING_LEN)
            .map(|&c| visible(c))
            .collect();

        Some(Self {
            past,
            current: visible(current),
            upcoming,
        })
    }
}

impl fmt::Display for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]{}", self.past, self.current, self.upcoming)
    }
}

/// Replace whitespace that would otherwise render as nothing.
fn visible(c: char) -> String {
    match c {
        '\n' => "↵".to_owned(),
        '\t' => "→".to_owned(),
        ' ' => "␣".to_owned(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_first_character_has_no_past() {
        let preview = Preview::around(&chars("Hello"), 0);
        assert_eq!(
            preview,
            Some(Preview {
                past: String::new(),
                current: "H".to_owned(),
                upcoming: "ell".to_owned(),
            })
        );
    }

    #[test]
    fn test_whitespace_is_visible() {
        let text = chars("a b\tc\nd");
        let preview = Preview::around(&text, 1).unwrap_or_default();
        assert_eq!(preview.past, "a");
        assert_eq!(preview.current, "␣");
        assert_eq!(preview.upcoming, "b→c");

        let preview = Preview::around(&text, 4).unwrap_or_default();
        assert_eq!(preview.past, "→");
        assert_eq!(preview.current, "c");
        assert_eq!(preview.upcoming, "↵d");
    }

    #[test]
    fn test_last_character_has_no_upcoming() {
        let preview = Preview::around(&chars("ab"), 1).unwrap_or_default();
        assert_eq!(preview.to_string(), "a[b]");
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(Preview::around(&chars("ab"), 2), None);
        assert_eq!(Preview::around(&[], 0), None);
    }
}
