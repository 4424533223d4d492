//
// env/profiles.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

use crate::error::ProfilesError;

// =====================================================================
/// A parsed profile expression.
///
/// Grammar: names combined with `&`, `|`, `!` and parentheses.
/// `&` and `|` may not be mixed without parentheses.
///
/// ```
/// use aspectran::env::Profiles;
/// let profiles = Profiles::of("(dev | test) & !prod").unwrap();
/// assert!(profiles.matches(|p| p == "dev"));
/// assert!(! profiles.matches(|p| p == "prod"));
/// assert!(Profiles::of("a & b | c").is_err());
/// ```
///
#[derive(Debug, Clone, PartialEq)]
pub struct Profiles {
    expression: String,
    predicate: Predicate,
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Name(String),
    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    fn matches(&self, active: &dyn Fn(&str) -> bool) -> bool {
        return match self {
            Predicate::Name(name) => active(name),
            Predicate::Not(p) => ! p.matches(active),
            Predicate::And(ps) => ps.iter().all(|p| p.matches(active)),
            Predicate::Or(ps) => ps.iter().any(|p| p.matches(active)),
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Context {
    Top,
    Parenthesis,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Operator {
    And,
    Or,
}

impl Profiles {

    // -----------------------------------------------------------------
    /// Parses 'expression'.
    ///
    pub fn of(expression: &str) -> Result<Profiles, ProfilesError> {
        if expression.trim().is_empty() {
            return Err(ProfilesError::InvalidProfile {
                profile: String::from(expression),
                reason: "must contain text",
            });
        }
        let tokens = tokenize(expression);
        let mut parser = ExpressionParser {
            expression,
            tokens,
            pos: 0,
        };
        let predicate = parser.parse(Context::Top)?;
        if parser.pos < parser.tokens.len() {
            return Err(parser.malformed());
        }
        return Ok(Profiles {
            expression: String::from(expression.trim()),
            predicate,
        });
    }

    pub fn expression(&self) -> &str {
        return self.expression.as_str();
    }

    // -----------------------------------------------------------------
    /// Evaluates the expression; 'active' tells whether one profile
    /// name is active.
    ///
    pub fn matches<F: Fn(&str) -> bool>(&self, active: F) -> bool {
        return self.predicate.matches(&active);
    }
}

impl fmt::Display for Profiles {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

// ---------------------------------------------------------------------
// Operators and parentheses are tokens on their own; names end at
// white space.
//
fn tokenize(expression: &str) -> Vec<String> {
    let mut tokens: Vec<String> = vec!{};
    let mut name = String::new();
    for ch in expression.chars() {
        if "()&|!".contains(ch) || ch.is_whitespace() {
            if ! name.is_empty() {
                tokens.push(name.clone());
                name.clear();
            }
            if ! ch.is_whitespace() {
                tokens.push(ch.to_string());
            }
        } else {
            name.push(ch);
        }
    }
    if ! name.is_empty() {
        tokens.push(name);
    }
    return tokens;
}

// =====================================================================
//
struct ExpressionParser<'a> {
    expression: &'a str,
    tokens: Vec<String>,
    pos: usize,
}

impl<'a> ExpressionParser<'a> {

    fn parse(&mut self, context: Context) -> Result<Predicate, ProfilesError> {
        let mut elements: Vec<Predicate> = vec!{};
        let mut operator: Option<Operator> = None;
        let mut expect_operand = true;

        while self.pos < self.tokens.len() {
            let token = self.tokens[self.pos].clone();
            self.pos += 1;
            match token.as_str() {
                "(" => {
                    if ! expect_operand {
                        return Err(self.malformed());
                    }
                    let contents = self.parse(Context::Parenthesis)?;
                    if context == Context::Negate {
                        return Ok(contents);
                    }
                    elements.push(contents);
                    expect_operand = false;
                },
                "&" | "|" => {
                    let op = if token == "&" { Operator::And } else { Operator::Or };
                    if expect_operand || (operator.is_some() && operator != Some(op)) {
                        return Err(self.malformed());
                    }
                    operator = Some(op);
                    expect_operand = true;
                },
                "!" => {
                    if ! expect_operand {
                        return Err(self.malformed());
                    }
                    let negated = Predicate::Not(Box::new(self.parse(Context::Negate)?));
                    if context == Context::Negate {
                        return Ok(negated);
                    }
                    elements.push(negated);
                    expect_operand = false;
                },
                ")" => {
                    if context != Context::Parenthesis || expect_operand {
                        return Err(self.malformed());
                    }
                    return self.merge(elements, operator);
                },
                name => {
                    if ! expect_operand {
                        return Err(self.malformed());
                    }
                    let value = Predicate::Name(String::from(name));
                    if context == Context::Negate {
                        return Ok(value);
                    }
                    elements.push(value);
                    expect_operand = false;
                },
            }
        }
        if context != Context::Top || expect_operand {
            return Err(self.malformed());
        }
        return self.merge(elements, operator);
    }

    fn merge(&self, mut elements: Vec<Predicate>, operator: Option<Operator>)
            -> Result<Predicate, ProfilesError> {
        if elements.is_empty() {
            return Err(self.malformed());
        }
        if elements.len() == 1 {
            return Ok(elements.remove(0));
        }
        return Ok(match operator {
            Some(Operator::And) => Predicate::And(elements),
            _ => Predicate::Or(elements),
        });
    }

    fn malformed(&self) -> ProfilesError {
        return ProfilesError::Malformed(String::from(self.expression));
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    fn active(names: &'static [&'static str]) -> impl Fn(&str) -> bool {
        return move |p| names.contains(&p);
    }

    #[test]
    fn test_matches() {
        let test_specs = [
            ( "prod", true ),
            ( "dev", false ),
            ( "!dev", true ),
            ( "!prod", false ),
            ( "prod | dev", true ),
            ( "prod & dev", false ),
            ( "(dev | test) & !prod", false ),
            ( "(prod | test) & !dev", true ),
            ( "!(dev & test)", true ),
            ( "((prod))", true ),
            ( "!!prod", true ),
            ( "prod & (dev | !test)", true ),
        ];
        for (expr, guess) in test_specs.iter() {
            let profiles = Profiles::of(expr).unwrap();
            assert_eq!(profiles.matches(active(&["prod"])), *guess, "{}", expr);
        }
    }

    #[test]
    fn test_malformed() {
        let test_specs = [
            "a & b | c",
            "!",
            "abc!",
            "(",
            ")",
            "()",
            "(a",
            "a)",
            "& a",
            "a &",
            "a b",
            "a (b)",
        ];
        for expr in test_specs.iter() {
            let err = Profiles::of(expr).unwrap_err();
            assert_eq!(err, ProfilesError::Malformed(String::from(*expr)), "{}", expr);
            assert_eq!(err.to_string(), format!("Malformed profile expression [{}]", expr));
        }
    }

    #[test]
    fn test_empty() {
        let err = Profiles::of("  ").unwrap_err();
        assert_eq!(err.to_string(), "Invalid profile [  ]: must contain text");
    }

    #[test]
    fn test_display() {
        let profiles = Profiles::of(" dev | test ").unwrap();
        assert_eq!(profiles.to_string(), "dev | test");
        assert_eq!(profiles.expression(), "dev | test");
    }
}
