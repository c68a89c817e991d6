//! Splits raw input lines into whitespace-delimited words.

/// Ordered words extracted from one input line.
///
/// There is no quoting or escaping: every non-blank character is a literal
/// part of a word, and a blank line produces an empty sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokens {
    words: Vec<String>,
}

impl Tokens {
    /// Word at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}

/// Tokenizes one line: splits on runs of blanks and tabs, dropping leading
/// and trailing whitespace along with the line terminator.
pub fn split_line(line: &str) -> Tokens {
    Tokens {
        words: line.split_ascii_whitespace().map(str::to_owned).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_line_yields_no_tokens() {
        let tokens = split_line("");
        assert!(tokens.is_empty());
        assert_eq!(tokens.len(), 0);
    }

    #[test]
    fn whitespace_only_line_yields_no_tokens() {
        assert!(split_line("   \t  \n").is_empty());
    }

    #[test]
    fn splits_into_three_words() {
        let tokens = split_line("run /bin/true out.txt");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens.get(0), Some("run"));
        assert_eq!(tokens.get(1), Some("/bin/true"));
        assert_eq!(tokens.get(2), Some("out.txt"));
    }

    #[test]
    fn surrounding_whitespace_is_dropped() {
        let tokens = split_line("  run   /bin/true  out.txt  ");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens.get(0), Some("run"));
        assert_eq!(tokens.get(2), Some("out.txt"));
    }

    #[test]
    fn tabs_separate_words_like_spaces() {
        let tokens = split_line("\texit\t\tnow\n");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens.get(0), Some("exit"));
        assert_eq!(tokens.get(1), Some("now"));
    }

    #[test]
    fn quotes_are_ordinary_characters() {
        let tokens = split_line("echo 'a b'");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens.get(1), Some("'a"));
        assert_eq!(tokens.get(2), Some("b'"));
    }

    #[test]
    fn out_of_range_index_is_absent() {
        let tokens = split_line("exit");
        assert_eq!(tokens.get(1), None);
    }

    #[test]
    fn iteration_preserves_order() {
        let tokens = split_line("a b c");
        let words: Vec<&str> = tokens.iter().collect();
        assert_eq!(words, vec!["a", "b", "c"]);
    }
}
