//
// rule/response.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;
use std::sync::Arc;

use crate::response::Response;
use crate::rule::item::ItemRuleMap;
use crate::rule::template::TemplateRule;
use crate::rule::token::{tokenize, tokens_to_string, Token};
use crate::rule::types::{MethodType, TransformType};

// =====================================================================
/// `<transform>`: renders the ProcessResult in one format.
///
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRule {
    pub transform_type: TransformType,
    pub content_type: Option<String>,
    pub encoding: Option<String>,
    pub default: bool,
    pub pretty: Option<bool>,
    /// Spaces per level of pretty output; setting it implies pretty.
    pub indent_size: Option<usize>,
    /// Inline `<template>`, or the stylesheet of an XSL transform.
    pub template: Option<TemplateRule>,
    /// Id of a `<template>` declared at the top level (`<call template>`).
    pub template_id: Option<String>,
}

impl TransformRule {
    pub fn new(transform_type: TransformType) -> TransformRule {
        return TransformRule {
            transform_type,
            content_type: None,
            encoding: None,
            default: false,
            pretty: None,
            indent_size: None,
            template: None,
            template_id: None,
        };
    }

    /// Whether output is indented: 'pretty' if given, else whether an
    /// indent size is; 'default' when neither is.
    ///
    pub fn is_pretty(&self, default: bool) -> bool {
        return self.pretty.unwrap_or(default || self.indent_size.is_some());
    }
}

impl fmt::Display for TransformRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "transform type={}", self.transform_type)?;
        if let Some(ref ct) = self.content_type {
            write!(f, " contentType={}", ct)?;
        }
        if let Some(ref enc) = self.encoding {
            write!(f, " encoding={}", enc)?;
        }
        if let Some(ref id) = self.template_id {
            write!(f, " template={}", id)?;
        }
        return Ok(());
    }
}

// =====================================================================
/// `<dispatch>`: hands the result to a view dispatcher bean.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchRule {
    pub name: String,
    pub dispatcher: Option<String>,
    pub content_type: Option<String>,
    pub encoding: Option<String>,
    pub default: bool,
}

impl fmt::Display for DispatchRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "dispatch name={}", self.name)?;
        if let Some(ref d) = self.dispatcher {
            write!(f, " dispatcher={}", d)?;
        }
        return Ok(());
    }
}

// =====================================================================
/// `<forward>`: processes another translet with the same result.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForwardRule {
    pub translet_name: String,
    pub method: Option<MethodType>,
    pub content_type: Option<String>,
    pub default: bool,
    pub attributes: Option<ItemRuleMap>,
}

impl fmt::Display for ForwardRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "forward translet={}", self.translet_name)?;
        if let Some(m) = self.method {
            write!(f, " method={}", m)?;
        }
        return Ok(());
    }
}

// =====================================================================
/// `<redirect>`: sends the client elsewhere.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedirectRule {
    path: Vec<Token>,
    pub content_type: Option<String>,
    pub encoding: Option<String>,
    pub default: bool,
    pub exclude_null_parameters: bool,
    pub parameters: Option<ItemRuleMap>,
}

impl RedirectRule {
    pub fn new(path: &str) -> RedirectRule {
        return RedirectRule {
            path: tokenize(path, true),
            ..RedirectRule::default()
        };
    }

    pub fn path_tokens(&self) -> &[Token] {
        return &self.path;
    }

    pub fn path(&self) -> String {
        return tokens_to_string(&self.path);
    }
}

impl fmt::Display for RedirectRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "redirect path={}", self.path())
    }
}

// =====================================================================
/// A named response of a translet.
///
#[derive(Debug, Clone, Default)]
pub struct ResponseRule {
    pub name: Option<String>,
    pub encoding: Option<String>,
    pub response: Option<Arc<dyn Response>>,
}

impl ResponseRule {
    pub fn new(name: Option<String>, encoding: Option<String>) -> ResponseRule {
        return ResponseRule {
            name,
            encoding,
            response: None,
        };
    }

    pub fn with_response(response: Arc<dyn Response>) -> ResponseRule {
        return ResponseRule {
            name: None,
            encoding: None,
            response: Some(response),
        };
    }

    pub fn content_type(&self) -> Option<&str> {
        return self.response.as_ref().and_then(|r| r.content_type());
    }
}

impl fmt::Display for ResponseRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("response")?;
        if let Some(ref name) = self.name {
            write!(f, " name={}", name)?;
        }
        if let Some(ref enc) = self.encoding {
            write!(f, " encoding={}", enc)?;
        }
        if let Some(ref r) = self.response {
            write!(f, " ({})", r)?;
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
    fn test_display() {
        let mut rule = TransformRule::new(TransformType::Json);
        rule.content_type = Some(String::from("application/json"));
        assert_eq!(rule.to_string(), "transform type=json contentType=application/json");

        let redirect = RedirectRule::new(" /login?next=${next} ");
        assert_eq!(redirect.to_string(), "redirect path=/login?next=${next}");
        assert_eq!(redirect.path_tokens().len(), 2);
    }
}
