//! Plain-text rule list import and export
//!
//! One rule per line. Blank lines and comment lines (`#`, `!`) are skipped;
//! surrounding whitespace is trimmed. Rules are otherwise passed through
//! verbatim so the compiler can report them as written.

/// Parse a rule list into raw rule strings, in file order.
pub fn parse_rule_list(text: &str) -> Vec<String> {
    let mut rules = Vec::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || is_comment_line(line) {
            continue;
        }
        rules.push(line.to_string());
    }

    rules
}

/// Render rules back to the line format.
pub fn format_rule_list<S: AsRef<str>>(rules: &[S]) -> String {
    let mut out = String::new();
    for rule in rules {
        let rule = rule.as_ref().trim();
        if rule.is_empty() {
            continue;
        }
        out.push_str(rule);
        out.push('\n');
    }
    out
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with('#') || line.starts_with('!')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rule_list_skips_comments_and_blanks() {
        let text = "# social\nreddit.com\n\n  ! temporary\n  *.twitter.com/*  \r\nnews.ycombinator.com/item\n";
        assert_eq!(
            parse_rule_list(text),
            vec!["reddit.com", "*.twitter.com/*", "news.ycombinator.com/item"]
        );
    }

    #[test]
    fn test_format_then_parse_preserves_order() {
        let rules = vec!["b.com", " ", "a.com/x/*"];
        let text = format_rule_list(&rules);
        assert_eq!(text, "b.com\na.com/x/*\n");
        assert_eq!(parse_rule_list(&text), vec!["b.com", "a.com/x/*"]);
    }
}
