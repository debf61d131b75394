//! Splits a console line into flag/value tokens.
//!
//! Items are separated by whitespace. An item is either a flag (`-x`,
//! `--name`, optionally followed by `=value` or by a separate value) or a
//! bare value. Values may be quoted with `'` or `"`; the other quote
//! character is allowed verbatim inside. An unterminated quote swallows the
//! rest of the line.

use std::iter::Peekable;
use std::str::Chars;

/// One parsed item of a console line. At least one of `flag`/`value` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    flag: Option<String>,
    value: Option<String>,
}

impl Token {
    /// A bare value with no flag.
    pub fn positional(value: impl Into<String>) -> Self {
        Self {
            flag: None,
            value: Some(value.into()),
        }
    }

    /// A flag, with or without a value.
    pub fn flag(name: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            flag: Some(name.into()),
            value: value.map(str::to_string),
        }
    }

    pub fn flag_name(&self) -> Option<&str> {
        self.flag.as_deref()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn is_flag(&self) -> bool {
        self.flag.is_some()
    }

    /// Render the token back to console syntax, for messages.
    pub fn display(&self) -> String {
        match (&self.flag, &self.value) {
            (Some(flag), Some(value)) => format!("{}{} {}", dashes(flag), flag, quote(value)),
            (Some(flag), None) => format!("{}{}", dashes(flag), flag),
            (None, Some(value)) => quote(value),
            (None, None) => String::new(),
        }
    }
}

fn dashes(flag: &str) -> &'static str {
    if flag.chars().count() == 1 {
        "-"
    } else {
        "--"
    }
}

/// Quote a value so that `tokenize` reads it back unchanged.
pub fn quote(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.starts_with('-')
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '"');
    if !needs_quotes {
        value.to_string()
    } else if value.contains('\'') {
        format!("\"{}\"", value)
    } else {
        format!("'{}'", value)
    }
}

/// Tokenize one console line. Never fails.
pub fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        skip_whitespace(&mut chars);
        let Some(&c) = chars.peek() else {
            break;
        };

        if c == '-' {
            if let Some(token) = read_flag(&mut chars) {
                tokens.push(token);
                continue;
            }
        }

        if let Some(value) = read_value(&mut chars) {
            tokens.push(Token::positional(value));
        }
    }

    tokens
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

/// Read a flag item. Returns `None` (consuming nothing) when the dashes are
/// not followed by a name, so the caller reads them as a plain value.
fn read_flag(chars: &mut Peekable<Chars<'_>>) -> Option<Token> {
    if !starts_flag(chars) {
        return None;
    }
    while chars.next_if_eq(&'-').is_some() {}

    let mut name = String::new();
    while let Some(c) = chars.next_if(|&c| is_name_char(c)) {
        name.push(c);
    }

    if chars.next_if_eq(&'=').is_some() {
        let value = read_value(chars);
        return Some(Token {
            flag: Some(name),
            value,
        });
    }

    // A separate value belongs to the flag unless another flag follows.
    let mut lookahead = chars.clone();
    skip_whitespace(&mut lookahead);
    let value = match lookahead.peek().copied() {
        None => None,
        Some('-') if starts_flag(&lookahead) => None,
        Some(_) => {
            *chars = lookahead;
            read_value(chars)
        }
    };

    Some(Token {
        flag: Some(name),
        value,
    })
}

fn starts_flag(chars: &Peekable<Chars<'_>>) -> bool {
    let mut rest = chars.clone();
    while rest.next_if_eq(&'-').is_some() {}
    matches!(rest.peek(), Some(&c) if is_name_char(c))
}

fn is_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '=' | '\'' | '"')
}

/// Read a quoted or bare value. `None` when nothing value-like follows.
fn read_value(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    match chars.peek() {
        Some(&quote @ ('\'' | '"')) => {
            chars.next();
            let mut value = String::new();
            for c in chars.by_ref() {
                if c == quote {
                    return Some(value);
                }
                value.push(c);
            }
            // Unterminated: keep what we have.
            Some(value)
        }
        Some(c) if c.is_whitespace() => None,
        Some(_) => {
            let mut value = String::new();
            while let Some(c) = chars.next_if(|&c| !c.is_whitespace() && c != '\'' && c != '"') {
                value.push(c);
            }
            Some(value)
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_send_line() {
        let tokens = tokenize("send 'John Doe' -t contact -m 'hi there'");
        assert_eq!(
            tokens,
            vec![
                Token::positional("send"),
                Token::positional("John Doe"),
                Token::flag("t", Some("contact")),
                Token::flag("m", Some("hi there")),
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t ").is_empty());
    }

    #[test]
    fn test_flag_forms() {
        assert_eq!(
            tokenize("--targetType=room --message \"a b\""),
            vec![
                Token::flag("targetType", Some("room")),
                Token::flag("message", Some("a b")),
            ]
        );
        assert_eq!(
            tokenize("ls -c -r"),
            vec![
                Token::positional("ls"),
                Token::flag("c", None),
                Token::flag("r", None),
            ]
        );
        assert_eq!(tokenize("ls --room"), vec![Token::positional("ls"), Token::flag("room", None)]);
    }

    #[test]
    fn test_flag_followed_by_flag_has_no_value() {
        assert_eq!(
            tokenize("ls -c   --room"),
            vec![Token::positional("ls"), Token::flag("c", None), Token::flag("room", None)]
        );
        assert_eq!(
            tokenize("send Bob -m - -t room"),
            vec![
                Token::positional("send"),
                Token::positional("Bob"),
                Token::flag("m", Some("-")),
                Token::flag("t", Some("room")),
            ]
        );
    }

    #[test]
    fn test_hyphenated_flag_name() {
        assert_eq!(tokenize("--target-type room"), vec![Token::flag("target-type", Some("room"))]);
    }

    #[test]
    fn test_alternate_quote_inside() {
        assert_eq!(
            tokenize(r#"send Bob -m "it's fine""#)[2],
            Token::flag("m", Some("it's fine"))
        );
        assert_eq!(
            tokenize(r#"send Bob -m 'say "hi"'"#)[2],
            Token::flag("m", Some(r#"say "hi""#))
        );
    }

    #[test]
    fn test_unterminated_quote_takes_rest_of_line() {
        assert_eq!(
            tokenize("send 'John Doe -m hi"),
            vec![Token::positional("send"), Token::positional("John Doe -m hi")]
        );
    }

    #[test]
    fn test_lone_dashes_are_values() {
        assert_eq!(
            tokenize("search - --"),
            vec![Token::positional("search"), Token::positional("-"), Token::positional("--")]
        );
    }

    #[test]
    fn test_regex_pattern_stays_whole() {
        assert_eq!(
            tokenize("search /.*ad.*/ -t contact"),
            vec![
                Token::positional("search"),
                Token::positional("/.*ad.*/"),
                Token::flag("t", Some("contact")),
            ]
        );
    }

    #[test]
    fn test_values_survive_requoting() {
        let line = r#"send "Mary O'Neil" 'he said "ok"' plain"#;
        let values: Vec<String> = tokenize(line)
            .iter()
            .filter_map(|t| t.value().map(str::to_string))
            .collect();
        let rejoined = values.iter().map(|v| quote(v)).collect::<Vec<_>>().join(" ");
        let again: Vec<String> = tokenize(&rejoined)
            .iter()
            .filter_map(|t| t.value().map(str::to_string))
            .collect();
        assert_eq!(values, again);
    }
}
