//
// rule/token.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

/// Prefix of a bean reference that names a class instead of an id.
pub const CLASS_DIRECTIVE_PREFIX: &str = "class:";

const MAX_TOKEN_NAME_LENGTH: usize = 256;

// =====================================================================
//
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Text,
    /// `${name}`: request parameter.
    Parameter,
    /// `@{name}`: activity attribute.
    Attribute,
    /// `#{id}`: bean, or a property of it with `#{id^name}`.
    Bean,
    /// `%{name}`: environment property.
    Property,
}

impl TokenType {
    fn from_symbol(symbol: char) -> Option<TokenType> {
        return match symbol {
            '$' => Some(TokenType::Parameter),
            '@' => Some(TokenType::Attribute),
            '#' => Some(TokenType::Bean),
            '%' => Some(TokenType::Property),
            _ => None,
        };
    }

    fn symbol(&self) -> char {
        return match self {
            TokenType::Text => ' ',
            TokenType::Parameter => '$',
            TokenType::Attribute => '@',
            TokenType::Bean => '#',
            TokenType::Property => '%',
        };
    }
}

// =====================================================================
/// One piece of a value expression: literal text or a reference.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    token_type: TokenType,
    name: String,
    /// Literal text, or the default value of a reference.
    value: Option<String>,
    getter: Option<String>,
}

impl Token {

    pub fn text(s: &str) -> Token {
        return Token {
            token_type: TokenType::Text,
            name: String::new(),
            value: Some(String::from(s)),
            getter: None,
        };
    }

    pub fn new(token_type: TokenType, name: &str) -> Token {
        return Token {
            token_type,
            name: String::from(name),
            value: None,
            getter: None,
        };
    }

    pub fn token_type(&self) -> TokenType {
        return self.token_type;
    }

    pub fn name(&self) -> &str {
        return self.name.as_str();
    }

    pub fn value(&self) -> Option<&str> {
        return self.value.as_deref();
    }

    pub fn default_value(&self) -> Option<&str> {
        if self.token_type == TokenType::Text {
            return None;
        }
        return self.value.as_deref();
    }

    pub fn getter(&self) -> Option<&str> {
        return self.getter.as_deref();
    }

    pub fn is_text(&self) -> bool {
        return self.token_type == TokenType::Text;
    }

    /// Class named by `#{class:Name}`.
    ///
    pub fn class_name(&self) -> Option<&str> {
        if self.token_type != TokenType::Bean {
            return None;
        }
        return self.name.strip_prefix(CLASS_DIRECTIVE_PREFIX);
    }

    /// Bean id of a `#{id}` reference.
    ///
    pub fn bean_id(&self) -> Option<&str> {
        if self.token_type != TokenType::Bean || self.class_name().is_some() {
            return None;
        }
        return Some(self.name.as_str());
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.token_type == TokenType::Text {
            return f.write_str(self.value.as_deref().unwrap_or(""));
        }
        write!(f, "{}{{{}", self.token_type.symbol(), self.name)?;
        if let Some(ref getter) = self.getter {
            write!(f, "^{}", getter)?;
        }
        if let Some(ref value) = self.value {
            write!(f, ":{}", value)?;
        }
        return f.write_str("}");
    }
}

// ---------------------------------------------------------------------
/// Writes 'tokens' back as an expression.
///
pub fn tokens_to_string(tokens: &[Token]) -> String {
    return tokens.iter().map(|t| t.to_string()).collect();
}

// ---------------------------------------------------------------------
/// Whether 's' contains at least one reference.
///
pub fn has_tokens(s: &str) -> bool {
    return tokenize(s, false).iter().any(|t| ! t.is_text());
}

// ---------------------------------------------------------------------
/// Splits 'input' into text and reference tokens.  With 'trim' the
/// white space around the whole expression is dropped.
///
/// ```
/// use aspectran::rule::{tokenize, TokenType};
/// let tokens = tokenize(" Hello, ${name:World}! ", true);
/// assert_eq!(tokens.len(), 3);
/// assert_eq!(tokens[0].value(), Some("Hello, "));
/// assert_eq!(tokens[1].token_type(), TokenType::Parameter);
/// assert_eq!(tokens[1].default_value(), Some("World"));
/// assert_eq!(tokens[2].value(), Some("!"));
/// ```
///
pub fn tokenize(input: &str, trim: bool) -> Vec<Token> {
    let input = if trim { input.trim() } else { input };
    let chars: Vec<char> = input.chars().collect();
    let mut tokens: Vec<Token> = vec!{};
    let mut text = String::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let token_type = TokenType::from_symbol(ch);
        if token_type.is_none() || i + 1 >= chars.len() || chars[i + 1] != '{' {
            text.push(ch);
            i += 1;
            continue;
        }
        let close = match chars[i + 2 ..].iter().position(|&c| c == '}') {
            Some(n) => i + 2 + n,
            None => {
                text.push(ch);
                i += 1;
                continue;
            },
        };
        let body: String = chars[i + 2 .. close].iter().collect();
        match make_token(ch, &body) {
            Some(token) => {
                if ! text.is_empty() {
                    tokens.push(Token::text(&text));
                    text.clear();
                }
                tokens.push(token);
            },
            None => {
                text.extend(chars[i ..= close].iter());
            },
        }
        i = close + 1;
    }
    if ! text.is_empty() {
        tokens.push(Token::text(&text));
    }
    return tokens;
}

// ---------------------------------------------------------------------
// Body of a reference: "name", "name:default", "name^getter" (for
// attributes and beans), "class:Name" (for beans).
//
fn make_token(symbol: char, body: &str) -> Option<Token> {
    let token_type = TokenType::from_symbol(symbol)?;
    let (mut name, mut value) = match token_type {
        TokenType::Bean if body.starts_with(CLASS_DIRECTIVE_PREFIX) => {
            let rest = &body[CLASS_DIRECTIVE_PREFIX.len()..];
            match rest.find(':') {
                Some(n) => (format!("{}{}", CLASS_DIRECTIVE_PREFIX, &rest[..n]),
                            Some(String::from(&rest[n+1..]))),
                None => (String::from(body), None),
            }
        },
        _ => match body.find(':') {
            Some(n) => (String::from(&body[..n]), Some(String::from(&body[n+1..]))),
            None => (String::from(body), None),
        },
    };
    name = String::from(name.trim());
    if name.is_empty() || name.len() > MAX_TOKEN_NAME_LENGTH {
        return None;
    }
    if value.as_deref() == Some("") {
        value = None;
    }

    let mut getter = None;
    if token_type == TokenType::Attribute || token_type == TokenType::Bean {
        if let Some(n) = name.find('^') {
            let property = String::from(&name[n+1..]);
            if n > 0 && ! property.is_empty() {
                getter = Some(property);
                name.truncate(n);
            }
        }
    }
    return Some(Token {
        token_type,
        name,
        value,
        getter,
    });
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tokenize() {
        let test_specs = [
            ( "plain", vec![ (TokenType::Text, "", Some("plain"), None) ] ),
            ( "${a}", vec![ (TokenType::Parameter, "a", None, None) ] ),
            ( "x @{user^name} y", vec![
                (TokenType::Text, "", Some("x "), None),
                (TokenType::Attribute, "user", None, Some("name")),
                (TokenType::Text, "", Some(" y"), None),
            ] ),
            ( "#{class:app.Clock^now}", vec![
                (TokenType::Bean, "class:app.Clock", None, Some("now")),
            ] ),
            ( "%{app.home:/srv}", vec![ (TokenType::Property, "app.home", Some("/srv"), None) ] ),
            ( "$5 and ${ }", vec![ (TokenType::Text, "", Some("$5 and ${ }"), None) ] ),
            ( "${open", vec![ (TokenType::Text, "", Some("${open"), None) ] ),
        ];
        for (input, guess) in test_specs.iter() {
            let tokens = tokenize(input, false);
            assert_eq!(tokens.len(), guess.len(), "{}", input);
            for (token, (t, name, value, getter)) in tokens.iter().zip(guess.iter()) {
                assert_eq!(token.token_type(), *t, "{}", input);
                assert_eq!(token.name(), *name, "{}", input);
                assert_eq!(token.value(), *value, "{}", input);
                assert_eq!(token.getter(), *getter, "{}", input);
            }
        }
    }

    #[test]
    fn test_bean_references() {
        let tokens = tokenize("#{clock^now} #{class:app.Clock}", false);
        assert_eq!(tokens[0].bean_id(), Some("clock"));
        assert_eq!(tokens[0].getter(), Some("now"));
        assert_eq!(tokens[2].class_name(), Some("app.Clock"));
        assert_eq!(tokens[2].bean_id(), None);
        assert!(has_tokens("a ${b}"));
        assert!(! has_tokens("a $b"));
    }

    #[test]
    fn test_display() {
        let test_specs = [
            "Hello, ${name:World}!",
            "@{user^name}",
            "#{class:app.Clock}",
            "%{home}",
        ];
        for s in test_specs.iter() {
            assert_eq!(tokens_to_string(&tokenize(s, false)), *s);
        }
    }
}
