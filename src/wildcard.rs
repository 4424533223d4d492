//
// wildcard.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

use regex::Regex;

use crate::error::IllegalRuleError;

// =====================================================================
/// A wildcard pattern compiled to a regular expression.
///
/// - `*` matches any characters except the separator;
/// - `**` matches any characters, the separator included; `**/`
///   also matches nothing, so "a/**/b" matches "a/b";
/// - `?` matches one character other than the separator;
/// - `\` escapes the next character.
///
/// Without a separator `*` and `**` are the same.
///
/// ```
/// use aspectran::wildcard::WildcardPattern;
/// let p = WildcardPattern::new("/example/*", Some('/')).unwrap();
/// assert!(p.matches("/example/hello"));
/// assert!(! p.matches("/example/a/b"));
/// let p = WildcardPattern::new("/example/**", Some('/')).unwrap();
/// assert!(p.matches("/example/a/b"));
/// ```
///
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    pattern: String,
    regex: Regex,
}

impl WildcardPattern {
    pub fn new(pattern: &str, separator: Option<char>) -> Result<WildcardPattern, IllegalRuleError> {
        let source = to_regex(pattern, separator);
        let regex = Regex::new(&source)
                .map_err(|e| illegal_rule!("Invalid wildcard pattern '{}': {}", pattern, e))?;
        return Ok(WildcardPattern {
            pattern: String::from(pattern),
            regex,
        });
    }

    pub fn matches(&self, s: &str) -> bool {
        return self.regex.is_match(s);
    }

    pub fn pattern(&self) -> &str {
        return self.pattern.as_str();
    }

    /// Captured text of each wildcard, in order.
    ///
    pub fn captures(&self, s: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(s)?;
        return Some(caps.iter()
                .skip(1)
                .map(|c| c.map(|m| String::from(m.as_str())).unwrap_or_default())
                .collect());
    }

    // -----------------------------------------------------------------
    /// The part of 's' covered by the wildcards: from the start of the
    /// first one to the end of the last one.  None if 's' does not
    /// match or the pattern has no wildcard.
    ///
    pub fn mask(&self, s: &str) -> Option<String> {
        let caps = self.regex.captures(s)?;
        let spans: Vec<(usize, usize)> = caps.iter()
                .skip(1)
                .filter_map(|c| c.map(|m| (m.start(), m.end())))
                .collect();
        let start = spans.first()?.0;
        let end = spans.last()?.1;
        return Some(String::from(&s[start..end]));
    }
}

impl fmt::Display for WildcardPattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl PartialEq for WildcardPattern {
    fn eq(&self, other: &WildcardPattern) -> bool {
        return self.pattern == other.pattern;
    }
}

// ---------------------------------------------------------------------
/// Whether 's' contains a wildcard character.
///
pub fn has_wildcards(s: &str) -> bool {
    return s.contains(|c| c == '*' || c == '?');
}

// ---------------------------------------------------------------------
//
fn to_regex(pattern: &str, separator: Option<char>) -> String {
    let not_sep = match separator {
        Some(sep) => format!("[^{}]", regex::escape(&sep.to_string())),
        None => String::from("."),
    };
    let mut re = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(next) = chars.next() {
                    re += &regex::escape(&next.to_string());
                }
            },
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    match separator {
                        Some(sep) if chars.peek() == Some(&sep) => {
                            chars.next();
                            re += &format!("((?:.*{})?)", regex::escape(&sep.to_string()));
                        },
                        _ => re += "(.*)",
                    }
                } else {
                    re += &format!("({}*)", not_sep);
                }
            },
            '?' => {
                re += &format!("({})", not_sep);
            },
            _ => {
                re += &regex::escape(&ch.to_string());
            },
        }
    }
    re.push('$');
    return re;
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_matches() {
        let test_specs = [
            ( "/example/*", Some('/'), "/example/hello", true ),
            ( "/example/*", Some('/'), "/example/a/b", false ),
            ( "/example/**", Some('/'), "/example/a/b", true ),
            ( "/example/**/*.do", Some('/'), "/example/list.do", true ),
            ( "/example/**/*.do", Some('/'), "/example/a/b/list.do", true ),
            ( "/example/*.do", Some('/'), "/example/list.do", true ),
            ( "/example/?", Some('/'), "/example/x", true ),
            ( "/example/?", Some('/'), "/example/xy", false ),
            ( "app.*Dao", Some('.'), "app.UserDao", true ),
            ( "app.*Dao", Some('.'), "app.sub.UserDao", false ),
            ( "get*", None, "getUser", true ),
            ( "get*", None, "setUser", false ),
            ( "a\\*b", None, "a*b", true ),
            ( "a\\*b", None, "axb", false ),
            ( "a.b", None, "axb", false ),
        ];
        for (pattern, sep, s, guess) in test_specs.iter() {
            let p = WildcardPattern::new(pattern, *sep).unwrap();
            assert_eq!(p.matches(s), *guess, "{} ~ {}", pattern, s);
        }
    }

    #[test]
    fn test_captures() {
        let p = WildcardPattern::new("/user/*/item/*", Some('/')).unwrap();
        assert_eq!(p.captures("/user/10/item/20").unwrap(), vec!["10", "20"]);
        assert!(p.captures("/user/10").is_none());
    }

    #[test]
    fn test_mask() {
        let test_specs = [
            ( "/views/**/*.html", "/views/a/b.html", Some("a/b") ),
            ( "app.dao.*Dao", "app.dao.UserDao", Some("User") ),
            ( "/views/*", "/other/x", None ),
            ( "/views/x", "/views/x", None ),
        ];
        for (pattern, s, guess) in test_specs.iter() {
            let p = WildcardPattern::new(pattern, Some('/')).unwrap();
            assert_eq!(p.mask(s).as_deref(), *guess, "{} ~ {}", pattern, s);
        }
    }

    #[test]
    fn test_has_wildcards() {
        assert!(has_wildcards("/a/*"));
        assert!(has_wildcards("get?"));
        assert!(! has_wildcards("/a/b"));
    }
}
