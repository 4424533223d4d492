//
// rule/template.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

use crate::error::IllegalRuleError;
use crate::rule::description::styling;
use crate::rule::types::TextStyleType;

/// Engine name of the builtin token renderer.
pub const BUILTIN_ENGINE: &str = "token";

// =====================================================================
/// Where the text of a template comes from.
///
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSource {
    Inline,
    File(String),
    /// Path relative to the base path of the context.
    Resource(String),
    Url(String),
}

// =====================================================================
/// `<template>`: a named text rendered by a template engine bean or
/// by the builtin token renderer.
///
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRule {
    pub id: Option<String>,
    pub engine: Option<String>,
    /// Template name passed to an engine bean.
    pub name: Option<String>,
    pub source: TemplateSource,
    pub style: Option<TextStyleType>,
    pub encoding: Option<String>,
    pub no_cache: bool,
    content: Option<String>,
}

impl TemplateRule {

    // -----------------------------------------------------------------
    /// At most one of 'file', 'resource' and 'url' may be given.
    ///
    pub fn new(id: Option<String>, file: Option<String>, resource: Option<String>,
            url: Option<String>) -> Result<TemplateRule, IllegalRuleError> {
        let given = [ file.is_some(), resource.is_some(), url.is_some() ];
        if given.iter().filter(|g| **g).count() > 1 {
            return Err(illegal_rule!("Template {} can have only one of file, resource and url",
                id.as_deref().unwrap_or("(inline)")));
        }
        let source = if let Some(f) = file {
            TemplateSource::File(f)
        } else if let Some(r) = resource {
            TemplateSource::Resource(r)
        } else if let Some(u) = url {
            TemplateSource::Url(u)
        } else {
            TemplateSource::Inline
        };
        return Ok(TemplateRule {
            id,
            engine: None,
            name: None,
            source,
            style: None,
            encoding: None,
            no_cache: false,
            content: None,
        });
    }

    pub fn inline(content: &str) -> TemplateRule {
        return TemplateRule {
            id: None,
            engine: None,
            name: None,
            source: TemplateSource::Inline,
            style: None,
            encoding: None,
            no_cache: false,
            content: Some(String::from(content)),
        };
    }

    /// Inline text, styled.
    ///
    pub fn content(&self) -> Option<&str> {
        return self.content.as_deref();
    }

    pub fn set_content(&mut self, text: Option<&str>) {
        self.content = text.map(|t| match self.style {
            Some(_) => styling(t, self.style),
            None => String::from(t),
        });
    }

    pub fn is_builtin(&self) -> bool {
        return self.engine.as_deref().map_or(true, |e| e == BUILTIN_ENGINE);
    }

    pub fn is_external(&self) -> bool {
        return self.source != TemplateSource::Inline;
    }
}

impl fmt::Display for TemplateRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("template")?;
        if let Some(ref id) = self.id {
            write!(f, " id={}", id)?;
        }
        if let Some(ref engine) = self.engine {
            write!(f, " engine={}", engine)?;
        }
        match self.source {
            TemplateSource::Inline => {},
            TemplateSource::File(ref p) => write!(f, " file={}", p)?,
            TemplateSource::Resource(ref p) => write!(f, " resource={}", p)?,
            TemplateSource::Url(ref p) => write!(f, " url={}", p)?,
        }
        return Ok(());
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new() {
        let rule = TemplateRule::new(Some(String::from("t1")), Some(String::from("a.xsl")), None, None).unwrap();
        assert_eq!(rule.source, TemplateSource::File(String::from("a.xsl")));
        assert_eq!(rule.to_string(), "template id=t1 file=a.xsl");
        assert!(rule.is_builtin());
        assert!(rule.is_external());

        let err = TemplateRule::new(None, Some(String::from("a")), Some(String::from("b")), None).unwrap_err();
        assert_eq!(err.to_string(), "Template (inline) can have only one of file, resource and url");
    }

    #[test]
    fn test_styled_content() {
        let mut rule = TemplateRule::inline("");
        rule.style = Some(TextStyleType::Compressed);
        rule.set_content(Some("  Hello,\n\n   ${name}!  "));
        assert_eq!(rule.content(), Some("Hello, ${name}!"));
    }
}
