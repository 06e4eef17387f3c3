//! Parsing of free-text model output.
//!
//! Expected shape:
//!
//! ```text
//! Judgment: Yes
//! Alternatives: first, second, third
//! ```
//!
//! The alternatives may also follow on separate lines with list markers.

pub const MAX_ALTERNATIVES: usize = 3;

const JUDGMENT: &str = "judgment:";
const ALTERNATIVES: &str = "alternatives:";

/// `true` when a `Judgment:` line answers yes. A missing line reads as no.
pub fn parse_judgment(text: &str) -> bool {
    text.lines()
        .map(clean_line)
        .find_map(|line| strip_prefix_ci(&line, JUDGMENT).map(|v| v.trim().to_lowercase()))
        .is_some_and(|value| value.starts_with("yes"))
}

/// Items of the `Alternatives:` section, at most [`MAX_ALTERNATIVES`].
pub fn parse_alternatives(text: &str) -> Vec<String> {
    let mut lines = text.lines();
    let mut section = Vec::new();

    for line in lines.by_ref() {
        let cleaned = clean_line(line);
        if let Some(rest) = strip_prefix_ci(&cleaned, ALTERNATIVES) {
            if !rest.trim().is_empty() {
                section.push(rest.trim().to_string());
            }
            break;
        }
    }

    for line in lines {
        let cleaned = clean_line(line);
        if strip_prefix_ci(&cleaned, JUDGMENT).is_some() {
            break;
        }
        if !cleaned.is_empty() {
            section.push(cleaned);
        }
    }

    let mut items = split_items(&section);
    items.truncate(MAX_ALTERNATIVES);
    items
}

/// Parses a bare list (the whole output), at most `limit` items.
pub fn parse_list(text: &str, limit: usize) -> Vec<String> {
    let lines: Vec<String> = text
        .lines()
        .map(clean_line)
        .filter(|l| !l.is_empty())
        .collect();
    let mut items = split_items(&lines);
    items.truncate(limit);
    items
}

/// One line is comma separated; several lines are one item each.
fn split_items(lines: &[String]) -> Vec<String> {
    let raw: Vec<&str> = match lines {
        [] => Vec::new(),
        [single] => single.split(',').collect(),
        many => many.iter().map(String::as_str).collect(),
    };
    raw.into_iter()
        .map(strip_list_marker)
        .filter(|item| !item.is_empty())
        .collect()
}

fn clean_line(line: &str) -> String {
    line.trim().replace("**", "").trim().to_string()
}

fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &line[prefix.len()..])
}

/// Drops `1.`, `2)`, `-`, `*`, `•` prefixes and wrapping quotes.
fn strip_list_marker(item: &str) -> String {
    let mut s = item.trim();

    let digits = s.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &s[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            s = stripped.trim_start();
        }
    } else if let Some(stripped) = s
        .strip_prefix('-')
        .or_else(|| s.strip_prefix('*'))
        .or_else(|| s.strip_prefix('•'))
    {
        s = stripped.trim_start();
    }

    for quote in ['"', '\'', '“'] {
        let close = if quote == '“' { '”' } else { quote };
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(close) {
            s = s[quote.len_utf8()..s.len() - close.len_utf8()].trim();
            break;
        }
    }
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_separated_alternatives() {
        let alts = parse_alternatives("Alternatives: Try this, Or that, Maybe this");
        assert_eq!(alts, vec!["Try this", "Or that", "Maybe this"]);
    }

    #[test]
    fn numbered_alternatives_on_following_lines() {
        let alts = parse_alternatives("Alternatives:\n1. Option A\n2. Option B");
        assert_eq!(alts, vec!["Option A", "Option B"]);
    }

    #[test]
    fn alternatives_truncated_to_three() {
        let alts = parse_alternatives("Judgment: Yes\nAlternatives: A, B, C, D");
        assert_eq!(alts.len(), 3);
        assert_eq!(alts, vec!["A", "B", "C"]);
    }

    #[test]
    fn mixed_markers_and_quotes() {
        let text = "**Judgment:** Yes\n**Alternatives:**\n- \"When I saw the dishes\"\n* When I noticed the mess\n• When I came home\n";
        assert!(parse_judgment(text));
        assert_eq!(
            parse_alternatives(text),
            vec![
                "When I saw the dishes",
                "When I noticed the mess",
                "When I came home"
            ]
        );
    }

    #[test]
    fn judgment_is_case_insensitive_and_defaults_to_no() {
        assert!(parse_judgment("judgment: YES, this is evaluative"));
        assert!(!parse_judgment("Judgment: No"));
        assert!(!parse_judgment("The sentence looks fine."));
    }

    #[test]
    fn missing_section_yields_no_alternatives() {
        assert!(parse_alternatives("Judgment: No").is_empty());
        assert!(parse_alternatives("Alternatives:").is_empty());
    }

    #[test]
    fn bare_lists_in_either_shape() {
        assert_eq!(parse_list("angry, frustrated, tired", 5), vec!["angry", "frustrated", "tired"]);
        assert_eq!(
            parse_list("1. Respect\n2. Rest\n3. Support\n4. Ease\n5. Trust\n6. Order", 5).len(),
            5
        );
    }
}
