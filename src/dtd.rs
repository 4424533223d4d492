//
// dtd.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//
//!
//! DTD subset reader and validator.
//!
//! Only what a configuration grammar needs is supported:
//! &lt;!ELEMENT&gt; declarations (EMPTY, ANY, mixed and element content)
//! and &lt;!ATTLIST&gt; declarations (CDATA, tokenized and enumerated
//! types with #REQUIRED, #IMPLIED, #FIXED and literal defaults).
//! Element content is checked for membership of the child in the
//! declared model, not for the order of children.
//! &lt;!ENTITY&gt; declarations and parameter entity references are
//! skipped.
//!
//! ```
//! use aspectran::dtd::Dtd;
//! use aspectran::sax::Attr;
//! let dtd = Dtd::parse(r#"
//!     <!ELEMENT a (b)*>
//!     <!ELEMENT b EMPTY>
//!     <!ATTLIST b kind (x|y) "x">
//! "#).unwrap();
//! let mut attrs = vec!{};
//! assert!(dtd.check_element(Some("a"), "b", &mut attrs).is_ok());
//! assert_eq!(attrs[0].value(), "x");
//! assert!(dtd.check_element(Some("b"), "a", &mut vec!{}).is_err());
//! ```
//!

use std::collections::HashMap;
use std::io;

use crate::error::XmlError;
use crate::sax::{self, Attr};

// =====================================================================
/// Supplies the text of an external DTD named in a DOCTYPE.
/// Returning None means the entity is unknown to this resolver.
///
pub trait EntityResolver {
    fn resolve_entity(&self, public_id: Option<&str>, system_id: Option<&str>)
            -> Result<Option<String>, io::Error>;
}

// =====================================================================
//
#[derive(Debug, Clone, PartialEq)]
pub enum ContentModel {
    Empty,
    Any,
    Mixed(Vec<String>),
    Children(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
enum AttrType {
    Cdata,
    Tokenized,
    Enumerated(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
enum AttrDefault {
    Required,
    Implied,
    Fixed(String),
    Value(String),
}

#[derive(Debug, Clone, PartialEq)]
struct AttributeDecl {
    name: String,
    attr_type: AttrType,
    default: AttrDefault,
}

// =====================================================================
/// Element and attribute-list declarations of a DTD.
///
#[derive(Debug, Clone, Default)]
pub struct Dtd {
    elements: HashMap<String, ContentModel>,
    attlists: HashMap<String, Vec<AttributeDecl>>,
}

impl Dtd {

    // -----------------------------------------------------------------
    /// Reads the declarations in 'text'.
    ///
    pub fn parse(text: &str) -> Result<Dtd, XmlError> {
        let mut dtd = Dtd::default();
        let mut rest = text;
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            if let Some(r) = rest.strip_prefix("<!--") {
                let end = r.find("-->").ok_or_else(||
                        dtd_syntax_error!("Unterminated comment"))?;
                rest = &r[end+3..];
            } else if let Some(r) = rest.strip_prefix("<?") {
                let end = r.find("?>").ok_or_else(||
                        dtd_syntax_error!("Unterminated processing instruction"))?;
                rest = &r[end+2..];
            } else if rest.starts_with('%') {
                let end = rest.find(';').ok_or_else(||
                        dtd_syntax_error!("Unterminated parameter entity reference"))?;
                tracing::debug!("Parameter entity reference {} skipped", &rest[..=end]);
                rest = &rest[end+1..];
            } else if rest.starts_with("<!") {
                let end = find_decl_end(rest).ok_or_else(||
                        dtd_syntax_error!("Unterminated declaration"))?;
                dtd.read_declaration(&rest[2..end])?;
                rest = &rest[end+1..];
            } else {
                let head: String = rest.chars().take(20).collect();
                return Err(dtd_syntax_error!("Unexpected text: {}", head));
            }
        }
        return Ok(dtd);
    }

    // -----------------------------------------------------------------
    /// Adds the declarations of 'other' that are not declared yet.
    /// The first declaration of an element is binding.
    ///
    pub fn merge(&mut self, other: Dtd) {
        for (name, model) in other.elements {
            self.elements.entry(name).or_insert(model);
        }
        for (name, decls) in other.attlists {
            let list = self.attlists.entry(name).or_insert_with(Vec::new);
            for decl in decls {
                if ! list.iter().any(|d| d.name == decl.name) {
                    list.push(decl);
                }
            }
        }
    }

    pub fn is_declared(&self, name: &str) -> bool {
        return self.elements.contains_key(name);
    }

    // -----------------------------------------------------------------
    /// Checks that 'name' may appear inside 'parent' and that the
    /// attributes are declared; fills in defaulted attributes.
    ///
    pub fn check_element(&self, parent: Option<&str>, name: &str,
                attrs: &mut Vec<Attr>) -> Result<(), String> {
        if ! self.elements.contains_key(name) {
            return Err(format!("Element type \"{}\" must be declared.", name));
        }
        if let Some(parent) = parent {
            match self.elements.get(parent) {
                Some(ContentModel::Empty) => {
                    return Err(format!("Element type \"{}\" must be empty; found \"{}\".",
                            parent, name));
                },
                Some(ContentModel::Mixed(names)) |
                Some(ContentModel::Children(names)) => {
                    if ! names.iter().any(|n| n == name) {
                        return Err(format!("Element type \"{}\" is not allowed in \"{}\".",
                                name, parent));
                    }
                },
                Some(ContentModel::Any) | None => {},
            }
        }

        let empty = vec!{};
        let decls = self.attlists.get(name).unwrap_or(&empty);
        for at in attrs.iter() {
            let decl = match decls.iter().find(|d| d.name == at.name()) {
                Some(d) => d,
                None => {
                    if at.name() == "xmlns" || at.name().starts_with("xmlns:") {
                        continue;
                    }
                    return Err(format!("Attribute \"{}\" must be declared for element type \"{}\".",
                            at.name(), name));
                },
            };
            if let AttrType::Enumerated(ref values) = decl.attr_type {
                if ! values.iter().any(|v| v == at.value()) {
                    return Err(format!("Attribute \"{}\" with value \"{}\" must have a value from the list \"{}\".",
                            at.name(), at.value(), values.join(" ")));
                }
            }
            if let AttrDefault::Fixed(ref v) = decl.default {
                if v != at.value() {
                    return Err(format!("Attribute \"{}\" must have the fixed value \"{}\".",
                            at.name(), v));
                }
            }
        }
        for decl in decls.iter() {
            if attrs.iter().any(|a| a.name() == decl.name) {
                continue;
            }
            match decl.default {
                AttrDefault::Required => {
                    return Err(format!("Attribute \"{}\" is required and must be specified for element type \"{}\".",
                            decl.name, name));
                },
                AttrDefault::Fixed(ref v) | AttrDefault::Value(ref v) => {
                    attrs.push(Attr::new(&decl.name, v));
                },
                AttrDefault::Implied => {},
            }
        }
        return Ok(());
    }

    // -----------------------------------------------------------------
    /// Checks that character data may appear directly inside 'element'.
    ///
    pub fn check_text(&self, element: &str, text: &str) -> Result<(), String> {
        if text.trim().is_empty() {
            return Ok(());
        }
        return match self.elements.get(element) {
            Some(ContentModel::Empty) | Some(ContentModel::Children(_)) => {
                Err(format!("Element type \"{}\" must not contain character data.", element))
            },
            _ => Ok(()),
        };
    }

    // -----------------------------------------------------------------
    //
    fn read_declaration(&mut self, decl: &str) -> Result<(), XmlError> {
        if let Some(body) = decl.strip_prefix("ELEMENT") {
            let body = body.trim();
            let (name, spec) = split_name(body)
                    .ok_or_else(|| dtd_syntax_error!("ELEMENT without name"))?;
            let model = parse_content_model(spec.trim())?;
            self.elements.entry(String::from(name)).or_insert(model);
        } else if let Some(body) = decl.strip_prefix("ATTLIST") {
            let words = split_attlist(body.trim())?;
            if words.is_empty() {
                return Err(dtd_syntax_error!("ATTLIST without element name"));
            }
            let list = self.attlists.entry(words[0].clone()).or_insert_with(Vec::new);
            let mut i = 1;
            while i < words.len() {
                if words.len() < i + 3 {
                    return Err(dtd_syntax_error!("Incomplete attribute definition in ATTLIST {}", words[0]));
                }
                let attr_name = words[i].clone();
                let attr_type = parse_attr_type(&words[i+1]);
                let (default, used) = match words[i+2].as_str() {
                    "#REQUIRED" => (AttrDefault::Required, 3),
                    "#IMPLIED" => (AttrDefault::Implied, 3),
                    "#FIXED" => {
                        let v = words.get(i+3).ok_or_else(||
                                dtd_syntax_error!("#FIXED without value for {}", attr_name))?;
                        (AttrDefault::Fixed(unquote(v)), 4)
                    },
                    v => (AttrDefault::Value(unquote(v)), 3),
                };
                if ! list.iter().any(|d| d.name == attr_name) {
                    list.push(AttributeDecl {
                        name: attr_name,
                        attr_type,
                        default,
                    });
                }
                i += used;
            }
        } else if decl.starts_with("ENTITY") || decl.starts_with("NOTATION") {
            tracing::debug!("Declaration skipped: <!{}>", decl.trim());
        } else {
            return Err(dtd_syntax_error!("Unknown declaration: <!{}>", decl.trim()));
        }
        return Ok(());
    }
}

// ---------------------------------------------------------------------
// Byte index of the '>' closing the declaration that starts 'text'.
//
fn find_decl_end(text: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, ch) in text.char_indices() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            },
            None => {
                if ch == '"' || ch == '\'' {
                    quote = Some(ch);
                } else if ch == '>' {
                    return Some(i);
                }
            },
        }
    }
    return None;
}

// ---------------------------------------------------------------------
//
fn split_name(s: &str) -> Option<(&str, &str)> {
    let end = s.find(|c: char| ! sax::is_name_char(c)).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    return Some((&s[..end], &s[end..]));
}

// ---------------------------------------------------------------------
// [46] contentspec ::= 'EMPTY' | 'ANY' | Mixed | children
//
fn parse_content_model(spec: &str) -> Result<ContentModel, XmlError> {
    match spec {
        "EMPTY" => return Ok(ContentModel::Empty),
        "ANY" => return Ok(ContentModel::Any),
        _ => {},
    }
    if ! spec.starts_with('(') ||
            spec.matches('(').count() != spec.matches(')').count() {
        return Err(dtd_syntax_error!("Invalid content model: {}", spec));
    }
    let mut names: Vec<String> = vec!{};
    let mut mixed = false;
    let mut word = String::new();
    for ch in spec.chars().chain(std::iter::once(' ')) {
        if sax::is_name_char(ch) || ch == '#' {
            word.push(ch);
        } else {
            if word == "#PCDATA" {
                mixed = true;
            } else if word != "" && ! names.contains(&word) {
                names.push(word.clone());
            }
            word.clear();
        }
    }
    return Ok(if mixed {
        ContentModel::Mixed(names)
    } else {
        ContentModel::Children(names)
    });
}

// ---------------------------------------------------------------------
//
fn parse_attr_type(s: &str) -> AttrType {
    if s.starts_with('(') {
        let values = s.trim_matches(|c| c == '(' || c == ')')
                .split('|')
                .map(|v| String::from(v.trim()))
                .collect();
        return AttrType::Enumerated(values);
    }
    return match s {
        "CDATA" => AttrType::Cdata,
        _ => AttrType::Tokenized,
    };
}

// ---------------------------------------------------------------------
// Splits an ATTLIST body into words; a quoted literal or a
// parenthesized group is one word.
//
fn split_attlist(s: &str) -> Result<Vec<String>, XmlError> {
    let mut words: Vec<String> = vec!{};
    let mut chars = s.chars().peekable();
    while let Some(&ch) = chars.peek() {
        if sax::is_space(ch) {
            chars.next();
            continue;
        }
        let mut w = String::new();
        if ch == '"' || ch == '\'' {
            w.push(ch);
            chars.next();
            loop {
                match chars.next() {
                    Some(c) => {
                        w.push(c);
                        if c == ch {
                            break;
                        }
                    },
                    None => return Err(dtd_syntax_error!("Unterminated literal in ATTLIST")),
                }
            }
        } else if ch == '(' {
            loop {
                match chars.next() {
                    Some(c) => {
                        if ! sax::is_space(c) {
                            w.push(c);
                        }
                        if c == ')' {
                            break;
                        }
                    },
                    None => return Err(dtd_syntax_error!("Unterminated group in ATTLIST")),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if sax::is_space(c) {
                    break;
                }
                w.push(c);
                chars.next();
            }
        }
        words.push(w);
    }
    return Ok(words);
}

// ---------------------------------------------------------------------
//
fn unquote(s: &str) -> String {
    let t = s.trim_matches(|c| c == '"' || c == '\'');
    return sax::decode_entity(t);
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    const DTD_TEXT: &str = r#"
        <!-- test grammar -->
        <!ENTITY % common "id">
        <!ELEMENT root (item | note)*>
        <!ELEMENT item (#PCDATA | value)*>
        <!ELEMENT value (#PCDATA)>
        <!ELEMENT note EMPTY>
        <!ATTLIST item
            name CDATA #REQUIRED
            type ( single | array ) "single"
            version CDATA #FIXED "1.0"
            label CDATA #IMPLIED>
    "#;

    #[test]
    fn test_content_models() {
        let dtd = Dtd::parse(DTD_TEXT).unwrap();
        assert_eq!(dtd.elements.get("root"),
                Some(&ContentModel::Children(vec![String::from("item"), String::from("note")])));
        assert_eq!(dtd.elements.get("item"),
                Some(&ContentModel::Mixed(vec![String::from("value")])));
        assert_eq!(dtd.elements.get("note"), Some(&ContentModel::Empty));
        assert!(dtd.is_declared("value"));
    }

    #[test]
    fn test_check_element() {
        let dtd = Dtd::parse(DTD_TEXT).unwrap();
        let mut attrs = vec![Attr::new("name", "a")];
        assert_eq!(dtd.check_element(Some("root"), "item", &mut attrs), Ok(()));
        let filled: Vec<String> = attrs.iter()
                .map(|a| format!("{}={}", a.name(), a.value())).collect();
        assert_eq!(filled, vec!["name=a", "type=single", "version=1.0"]);

        let test_specs = [
            ( Some("root"), "item", vec![],
              "Attribute \"name\" is required and must be specified for element type \"item\"." ),
            ( Some("root"), "item", vec![Attr::new("name", "a"), Attr::new("type", "map")],
              "Attribute \"type\" with value \"map\" must have a value from the list \"single array\"." ),
            ( Some("root"), "item", vec![Attr::new("name", "a"), Attr::new("version", "2.0")],
              "Attribute \"version\" must have the fixed value \"1.0\"." ),
            ( Some("root"), "value", vec![],
              "Element type \"value\" is not allowed in \"root\"." ),
            ( Some("note"), "value", vec![],
              "Element type \"note\" must be empty; found \"value\"." ),
            ( None, "unknown", vec![],
              "Element type \"unknown\" must be declared." ),
            ( Some("root"), "note", vec![Attr::new("x", "1")],
              "Attribute \"x\" must be declared for element type \"note\"." ),
        ];
        for (parent, name, attrs, guess) in test_specs.iter() {
            let mut attrs = attrs.clone();
            assert_eq!(dtd.check_element(*parent, name, &mut attrs), Err(String::from(*guess)));
        }
    }

    #[test]
    fn test_check_text() {
        let dtd = Dtd::parse(DTD_TEXT).unwrap();
        assert!(dtd.check_text("item", "text").is_ok());
        assert!(dtd.check_text("root", "  \n ").is_ok());
        assert!(dtd.check_text("root", "text").is_err());
    }

    #[test]
    fn test_syntax_error() {
        assert!(Dtd::parse("<!ELEMENT a (b>").is_err());
        assert!(Dtd::parse("<!WHATEVER a>").is_err());
        assert!(Dtd::parse("junk").is_err());
    }
}
