//! Text utilities: answer segmentation and graph-literal escaping.

/// Split an assistant answer into sentences.
///
/// Answers arrive line-oriented (one statement per line), so segmentation is
/// newline-based with whitespace trimmed and blank lines dropped.
pub fn split_sentences(answer: &str) -> Vec<String> {
    answer
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Escape a string for embedding as a literal in a graph mutation statement.
///
/// Single quotes are doubled (all of them - a contraction heuristic that
/// leaves `'` after a letter untouched under-escapes legitimate quoted text),
/// double quotes are backslash-escaped, and backticks are stripped since
/// they delimit identifiers in the query language.
pub fn escape_graph_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\'' => escaped.push_str("''"),
            '"' => escaped.push_str("\\\""),
            '`' => {}
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences_drops_blank_lines() {
        let answer = "First line.\n\n  Second line.  \nThird.\n";
        assert_eq!(
            split_sentences(answer),
            vec!["First line.", "Second line.", "Third."]
        );
    }

    #[test]
    fn test_split_sentences_empty_answer() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("\n \n").is_empty());
    }

    #[test]
    fn test_escape_graph_literal() {
        let input = r#"I'm a "test" with `backtick`"#;
        let escaped = escape_graph_literal(input);
        assert_eq!(escaped, r#"I''m a \"test\" with backtick"#);
    }

    #[test]
    fn test_escape_doubles_every_single_quote() {
        // No contraction heuristic: quotes after letters are doubled too
        assert_eq!(escape_graph_literal("don't"), "don''t");
        assert_eq!(escape_graph_literal("'quoted'"), "''quoted''");
    }

    #[test]
    fn test_escape_leaves_plain_text_alone() {
        assert_eq!(escape_graph_literal("plain text 123"), "plain text 123");
    }
}
