//
// parsing/inspector.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

use tracing::error;

use crate::error::IllegalRuleError;
use crate::parsing::bean_registry::BeanRuleRegistry;
use crate::rule::CLASS_DIRECTIVE_PREFIX;

// =====================================================================
/// A reference to a bean by id or by class.
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BeanReference {
    Id(String),
    Class(String),
}

impl BeanReference {
    // -----------------------------------------------------------------
    /// "class:Name" is a class reference, anything else an id.
    ///
    pub fn parse(s: &str) -> BeanReference {
        return match s.strip_prefix(CLASS_DIRECTIVE_PREFIX) {
            Some(class) => BeanReference::Class(String::from(class)),
            None => BeanReference::Id(String::from(s)),
        };
    }
}

impl fmt::Display for BeanReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return match self {
            BeanReference::Id(id) => f.write_str(id),
            BeanReference::Class(class) => write!(f, "{}{}", CLASS_DIRECTIVE_PREFIX, class),
        };
    }
}

// ---------------------------------------------------------------------
// What refers to a bean, and where it was declared.
//
#[derive(Debug, Clone, PartialEq)]
struct Referer {
    description: String,
    location: Option<String>,
}

impl fmt::Display for Referer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref location) = self.location {
            write!(f, "{} ", location)?;
        }
        f.write_str(&self.description)
    }
}

// =====================================================================
/// Bean references collected while parsing, checked once every bean
/// rule is known.  Forward references and references into imported
/// documents therefore resolve regardless of declaration order.
///
#[derive(Debug, Default)]
pub struct BeanReferenceInspector {
    references: Vec<(BeanReference, Vec<Referer>)>,
}

impl BeanReferenceInspector {
    pub fn new() -> BeanReferenceInspector {
        return BeanReferenceInspector::default();
    }

    // -----------------------------------------------------------------
    /// Reserves a check of 'reference' on behalf of 'referer'.
    ///
    pub fn reserve(&mut self, reference: BeanReference, referer: &dyn fmt::Display,
            location: Option<String>) {
        let referer = Referer {
            description: referer.to_string(),
            location,
        };
        match self.references.iter_mut().find(|(r, _)| *r == reference) {
            Some((_, referers)) => {
                if ! referers.contains(&referer) {
                    referers.push(referer);
                }
            },
            None => self.references.push((reference, vec![referer])),
        }
    }

    pub fn len(&self) -> usize {
        return self.references.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.references.is_empty();
    }

    // -----------------------------------------------------------------
    /// Checks every reserved reference against 'registry'.  Each broken
    /// reference is logged with its referers, then all of them are
    /// reported at once.
    ///
    pub fn inspect(&mut self, registry: &BeanRuleRegistry) -> Result<(), IllegalRuleError> {
        let mut broken: Vec<String> = vec!{};
        for (reference, referers) in self.references.iter() {
            let found = match reference {
                BeanReference::Id(id) => registry.contains_id(id),
                BeanReference::Class(class) => registry.contains_class(class),
            };
            if ! found {
                for referer in referers.iter() {
                    error!("Cannot resolve reference to bean '{}' on {}", reference, referer);
                }
                broken.push(reference.to_string());
            }
        }
        if broken.is_empty() {
            return Ok(());
        }
        self.references.retain(|(r, _)| ! broken.contains(&r.to_string()));
        return Err(IllegalRuleError::BrokenReferences(broken));
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use crate::bean::{BeanClassRegistry, PropertiesBean};
    use crate::rule::BeanRule;

    #[test]
    fn test_parse() {
        let test_specs = [
            ( "dao", BeanReference::Id(String::from("dao")) ),
            ( "class:app.Dao", BeanReference::Class(String::from("app.Dao")) ),
        ];
        for (s, guess) in test_specs.iter() {
            let r = BeanReference::parse(s);
            assert_eq!(r, *guess);
            assert_eq!(r.to_string(), *s);
        }
    }

    #[test]
    fn test_inspect() {
        let mut classes = BeanClassRegistry::new();
        classes.register("app.Dao", || Box::new(PropertiesBean::new()));
        let mut registry = BeanRuleRegistry::new();
        registry.add_bean_rule(BeanRule {
            id: Some(String::from("dao")),
            class_name: Some(String::from("app.Dao")),
            ..BeanRule::default()
        }, &classes).unwrap();

        let mut inspector = BeanReferenceInspector::new();
        inspector.reserve(BeanReference::parse("dao"), &"action method=list", None);
        inspector.reserve(BeanReference::parse("class:app.Dao"), &"action method=list", None);
        inspector.reserve(BeanReference::parse("missing"), &"action method=a", Some(String::from("<action>")));
        inspector.reserve(BeanReference::parse("missing"), &"action method=b", None);
        assert_eq!(inspector.len(), 3);

        let err = inspector.inspect(&registry).unwrap_err();
        assert_eq!(err.to_string(), "Unable to resolve reference to bean missing");
        assert_eq!(inspector.len(), 2);
        assert!(inspector.inspect(&registry).is_ok());
    }
}
