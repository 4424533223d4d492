//
// xslt.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

//!
//! A small XSL stylesheet interpreter over the DOM.
//!
//! Supported: `xsl:output` (method, encoding, indent,
//! omit-xml-declaration), `xsl:template match`, `xsl:apply-templates`,
//! `xsl:value-of`, `xsl:for-each`, `xsl:if`, `xsl:choose` /
//! `xsl:when` / `xsl:otherwise`, `xsl:text`, literal result elements
//! and attribute value templates.
//!
//! Select expressions are location paths made of `/`, `//`, `.`, `..`,
//! `*`, names, `@name`, `@*`, `text()` and `node()`; tests may compare
//! a path, a quoted string or a number with `=` or `!=`, or negate one
//! with `not(...)`.
//!
//! ```
//! use aspectran::dom::new_document;
//! use aspectran::xslt::Stylesheet;
//!
//! let xsl = r#"
//! <xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
//!   <xsl:output method="text"/>
//!   <xsl:template match="/">Hello, <xsl:value-of select="contents/name"/>!</xsl:template>
//! </xsl:stylesheet>
//! "#;
//! let stylesheet = Stylesheet::parse(xsl).unwrap();
//! let doc = new_document("<contents><name>World</name></contents>").unwrap();
//! assert_eq!(stylesheet.transform(&doc).unwrap(), "Hello, World!");
//! ```
//!

use crate::dom::{new_document, new_document_root, NodePtr, NodeType};
use crate::error::XmlError;

const XSL_NAMESPACE: &str = "http://www.w3.org/1999/XSL/Transform";
const DEFAULT_PREFIX: &str = "xsl";
const MAX_DEPTH: usize = 256;
const INDENT_SIZE: usize = 2;

// =====================================================================
// Location paths.
//
#[derive(Debug, Clone, PartialEq)]
enum Axis {
    Child,
    Attribute,
    SelfNode,
    Parent,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    Name(String),
    Any,
    Text,
    Node,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    /// Preceded by "//".
    descendant: bool,
    axis: Axis,
    test: NodeTest,
}

#[derive(Debug, Clone, PartialEq)]
struct LocationPath {
    absolute: bool,
    steps: Vec<Step>,
}

fn parse_path(s: &str) -> Result<LocationPath, XmlError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(xsl_syntax_error!("Empty location path"));
    }
    let parts: Vec<&str> = s.split('/').collect();
    let absolute = parts.len() > 1 && parts[0].trim().is_empty();
    let mut steps: Vec<Step> = vec!{};
    let mut descendant = false;
    for (i, part) in parts.iter().enumerate() {
        let part = part.trim();
        if part.is_empty() {
            if i == 0 {
                continue;
            }
            if i == parts.len() - 1 {
                if absolute && steps.is_empty() && ! descendant {
                    break;
                }
                return Err(xsl_syntax_error!("Location path ends with '/': {}", s));
            }
            descendant = true;
            continue;
        }
        steps.push(parse_step(part, descendant, s)?);
        descendant = false;
    }
    return Ok(LocationPath {
        absolute,
        steps,
    });
}

fn parse_step(part: &str, descendant: bool, path: &str) -> Result<Step, XmlError> {
    let (axis, test) = match part {
        "." => (Axis::SelfNode, NodeTest::Node),
        ".." => (Axis::Parent, NodeTest::Node),
        "*" => (Axis::Child, NodeTest::Any),
        "text()" => (Axis::Child, NodeTest::Text),
        "node()" => (Axis::Child, NodeTest::Node),
        "@*" => (Axis::Attribute, NodeTest::Any),
        _ => match part.strip_prefix('@') {
            Some(name) if is_name(name) => (Axis::Attribute, NodeTest::Name(String::from(name))),
            None if is_name(part) => (Axis::Child, NodeTest::Name(String::from(part))),
            _ => return Err(xsl_syntax_error!("Unsupported step '{}' in {}", part, path)),
        },
    };
    return Ok(Step {
        descendant,
        axis,
        test,
    });
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    return match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.' || c == ':')
        },
        _ => false,
    };
}

// ---------------------------------------------------------------------
//
fn test_matches(node: &NodePtr, step: &Step) -> bool {
    let node_type = node.node_type();
    let principal = match step.axis {
        Axis::Attribute => NodeType::Attribute,
        _ => NodeType::Element,
    };
    return match step.test {
        NodeTest::Name(ref name) => node_type == principal && node.name() == *name,
        NodeTest::Any => node_type == principal,
        NodeTest::Text => node_type == NodeType::Text,
        NodeTest::Node => match step.axis {
            Axis::Attribute => node_type == NodeType::Attribute,
            Axis::Child => node_type == NodeType::Element || node_type == NodeType::Text,
            _ => true,
        },
    };
}

fn descendants_or_self(node: &NodePtr, nodes: &mut Vec<NodePtr>) {
    nodes.push(node.clone());
    for ch in node.children().iter() {
        descendants_or_self(ch, nodes);
    }
}

fn push_unique(nodes: &mut Vec<NodePtr>, node: NodePtr) {
    if ! nodes.contains(&node) {
        nodes.push(node);
    }
}

fn select(context: &NodePtr, path: &LocationPath) -> Vec<NodePtr> {
    let mut nodes = if path.absolute { vec![context.root()] } else { vec![context.clone()] };
    for step in path.steps.iter() {
        let mut next: Vec<NodePtr> = vec!{};
        for node in nodes.iter() {
            let mut bases: Vec<NodePtr> = vec!{};
            if step.descendant {
                descendants_or_self(node, &mut bases);
            } else {
                bases.push(node.clone());
            }
            for base in bases.iter() {
                match step.axis {
                    Axis::Child => {
                        for ch in base.children().into_iter().filter(|ch| test_matches(ch, step)) {
                            push_unique(&mut next, ch);
                        }
                    },
                    Axis::Attribute => {
                        for at in base.attributes().into_iter().filter(|at| test_matches(at, step)) {
                            push_unique(&mut next, at);
                        }
                    },
                    Axis::SelfNode => push_unique(&mut next, base.clone()),
                    Axis::Parent => {
                        if let Some(p) = base.parent() {
                            push_unique(&mut next, p);
                        }
                    },
                }
            }
        }
        nodes = next;
    }
    return nodes;
}

// ---------------------------------------------------------------------
// Patterns are location paths read from the last step backwards.
//
fn pattern_matches(node: &NodePtr, steps: &[Step], absolute: bool) -> bool {
    let (last, rest) = match steps.split_last() {
        Some(split) => split,
        None => return absolute && node.node_type() == NodeType::DocumentRoot,
    };
    if ! test_matches(node, last) {
        return false;
    }
    let parent = match node.parent() {
        Some(p) => p,
        None => return false,
    };
    if last.descendant {
        let mut curr = Some(parent);
        while let Some(p) = curr {
            if pattern_rest_matches(&p, rest, absolute) {
                return true;
            }
            curr = p.parent();
        }
        return false;
    }
    return pattern_rest_matches(&parent, rest, absolute);
}

fn pattern_rest_matches(node: &NodePtr, rest: &[Step], absolute: bool) -> bool {
    if rest.is_empty() {
        return ! absolute || node.node_type() == NodeType::DocumentRoot;
    }
    return pattern_matches(node, rest, absolute);
}

// =====================================================================
// Expressions.
//
#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Path(LocationPath),
    Literal(String),
    Number(f64),
    Not(Box<Expr>),
    Compare(Box<Expr>, Box<Expr>, bool),
}

#[derive(Debug)]
enum Value {
    Nodes(Vec<NodePtr>),
    Str(String),
    Num(f64),
    Bool(bool),
}

fn parse_expr(s: &str) -> Result<Expr, XmlError> {
    let s = s.trim();
    if let Some((pos, negate)) = find_comparison(s) {
        let len = if negate { 2 } else { 1 };
        let left = parse_expr(&s[..pos])?;
        let right = parse_expr(&s[pos + len ..])?;
        return Ok(Expr::Compare(Box::new(left), Box::new(right), negate));
    }
    if let Some(inner) = s.strip_prefix("not(").and_then(|r| r.strip_suffix(')')) {
        return Ok(Expr::Not(Box::new(parse_expr(inner)?)));
    }
    for quote in [ '\'', '"' ].iter() {
        if s.len() >= 2 && s.starts_with(*quote) && s.ends_with(*quote) {
            return Ok(Expr::Literal(String::from(&s[1 .. s.len() - 1])));
        }
    }
    if let Ok(n) = s.parse::<f64>() {
        return Ok(Expr::Number(n));
    }
    return Ok(Expr::Path(parse_path(s)?));
}

// ---------------------------------------------------------------------
// Position of the first '=' or '!=' outside quotes.
//
fn find_comparison(s: &str) -> Option<(usize, bool)> {
    let mut quote: Option<char> = None;
    let mut prev: Option<(usize, char)> = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {},
            None => match c {
                '\'' | '"' => quote = Some(c),
                '=' => return match prev {
                    Some((p, '!')) => Some((p, true)),
                    _ => Some((i, false)),
                },
                _ => {},
            },
        }
        prev = Some((i, c));
    }
    return None;
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    return n.to_string();
}

impl Value {
    fn to_text(&self) -> String {
        return match self {
            Value::Nodes(nodes) => nodes.first().map(|n| n.string_value()).unwrap_or_default(),
            Value::Str(s) => s.clone(),
            Value::Num(n) => format_number(*n),
            Value::Bool(b) => b.to_string(),
        };
    }

    fn to_bool(&self) -> bool {
        return match self {
            Value::Nodes(nodes) => ! nodes.is_empty(),
            Value::Str(s) => ! s.is_empty(),
            Value::Num(n) => *n != 0.0 && ! n.is_nan(),
            Value::Bool(b) => *b,
        };
    }

    // Texts to compare: every node of a node-set, else the value.
    fn texts(&self) -> Vec<String> {
        return match self {
            Value::Nodes(nodes) => nodes.iter().map(|n| n.string_value()).collect(),
            v => vec![v.to_text()],
        };
    }
}

fn compare(left: &Value, right: &Value, negate: bool) -> bool {
    let numeric = matches!(left, Value::Num(_)) || matches!(right, Value::Num(_));
    if let (Value::Bool(_), _) | (_, Value::Bool(_)) = (left, right) {
        return (left.to_bool() == right.to_bool()) != negate;
    }
    for l in left.texts().iter() {
        for r in right.texts().iter() {
            let equal = if numeric {
                match (l.trim().parse::<f64>(), r.trim().parse::<f64>()) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                }
            } else {
                l == r
            };
            if equal != negate {
                return true;
            }
        }
    }
    return false;
}

fn evaluate(expr: &Expr, context: &NodePtr) -> Value {
    return match expr {
        Expr::Path(path) => Value::Nodes(select(context, path)),
        Expr::Literal(s) => Value::Str(s.clone()),
        Expr::Number(n) => Value::Num(*n),
        Expr::Not(inner) => Value::Bool(! evaluate(inner, context).to_bool()),
        Expr::Compare(left, right, negate) => {
            Value::Bool(compare(&evaluate(left, context), &evaluate(right, context), *negate))
        },
    };
}

// =====================================================================
// Instructions.
//
#[derive(Debug, Clone, PartialEq)]
enum AvtPart {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
enum Instruction {
    ApplyTemplates(Option<LocationPath>),
    ValueOf(Expr),
    ForEach(LocationPath, Vec<Instruction>),
    If(Expr, Vec<Instruction>),
    Choose(Vec<(Expr, Vec<Instruction>)>, Option<Vec<Instruction>>),
    Text(String),
    Element(String, Vec<(String, Vec<AvtPart>)>, Vec<Instruction>),
}

fn parse_avt(s: &str) -> Result<Vec<AvtPart>, XmlError> {
    let mut parts: Vec<AvtPart> = vec!{};
    let mut text = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            },
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            },
            '{' => {
                let expr: String = chars.by_ref().take_while(|&c| c != '}').collect();
                if ! text.is_empty() {
                    parts.push(AvtPart::Text(std::mem::take(&mut text)));
                }
                parts.push(AvtPart::Expr(parse_expr(&expr)?));
            },
            _ => text.push(c),
        }
    }
    if ! text.is_empty() {
        parts.push(AvtPart::Text(text));
    }
    return Ok(parts);
}

#[derive(Debug, Clone, PartialEq)]
struct Template {
    pattern: LocationPath,
    priority: f64,
    body: Vec<Instruction>,
}

fn default_priority(pattern: &LocationPath) -> f64 {
    if pattern.steps.len() != 1 || pattern.absolute {
        return 0.5;
    }
    return match pattern.steps[0].test {
        NodeTest::Name(_) => 0.0,
        _ => -0.5,
    };
}

// =====================================================================
/// Settings of `xsl:output`.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputSettings {
    pub method: Option<String>,
    pub encoding: Option<String>,
    pub indent: bool,
    pub omit_xml_declaration: bool,
}

impl OutputSettings {
    /// Content type implied by the output method.
    ///
    pub fn content_type(&self) -> Option<&'static str> {
        return match self.method.as_deref().map(|m| m.to_ascii_lowercase()).as_deref() {
            Some("xml") => Some("text/xml"),
            Some("html") => Some("text/html"),
            Some("text") => Some("text/plain"),
            _ => None,
        };
    }
}

// =====================================================================
/// A compiled stylesheet; owns no DOM, so it can be shared between
/// threads.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Stylesheet {
    output: OutputSettings,
    templates: Vec<Template>,
}

// ---------------------------------------------------------------------
// Compiler state: the prefix bound to the XSL namespace.
//
struct Compiler {
    prefix: String,
}

impl Compiler {
    fn xsl_name(&self, node: &NodePtr) -> Option<String> {
        if node.node_type() != NodeType::Element {
            return None;
        }
        let name = node.name();
        return name.strip_prefix(&self.prefix)
                .and_then(|n| n.strip_prefix(':'))
                .map(String::from);
    }

    fn required(&self, node: &NodePtr, attr: &str) -> Result<String, XmlError> {
        return node.attribute_value(attr).ok_or_else(|| {
            xsl_syntax_error!("{} requires the attribute '{}'", node.name(), attr)
        });
    }

    fn compile_body(&self, node: &NodePtr) -> Result<Vec<Instruction>, XmlError> {
        let mut body: Vec<Instruction> = vec!{};
        for ch in node.children().iter() {
            match ch.node_type() {
                NodeType::Text => {
                    let text = ch.value();
                    if ! text.trim().is_empty() {
                        body.push(Instruction::Text(text));
                    }
                },
                NodeType::Element => body.push(self.compile_element(ch)?),
                _ => {},
            }
        }
        return Ok(body);
    }

    fn compile_element(&self, node: &NodePtr) -> Result<Instruction, XmlError> {
        let local = match self.xsl_name(node) {
            Some(local) => local,
            None => {
                let mut attributes: Vec<(String, Vec<AvtPart>)> = vec!{};
                for at in node.attributes().iter() {
                    let name = at.name();
                    if name == "xmlns" || name.starts_with("xmlns:") {
                        continue;
                    }
                    attributes.push((name, parse_avt(&at.value())?));
                }
                return Ok(Instruction::Element(node.name(), attributes, self.compile_body(node)?));
            },
        };
        let instruction = match local.as_str() {
            "apply-templates" => {
                let select = match node.attribute_value("select") {
                    Some(s) => Some(parse_path(&s)?),
                    None => None,
                };
                Instruction::ApplyTemplates(select)
            },
            "value-of" => Instruction::ValueOf(parse_expr(&self.required(node, "select")?)?),
            "for-each" => Instruction::ForEach(
                    parse_path(&self.required(node, "select")?)?, self.compile_body(node)?),
            "if" => Instruction::If(
                    parse_expr(&self.required(node, "test")?)?, self.compile_body(node)?),
            "choose" => {
                let mut whens: Vec<(Expr, Vec<Instruction>)> = vec!{};
                let mut otherwise = None;
                for ch in node.child_elements().iter() {
                    match self.xsl_name(ch).as_deref() {
                        Some("when") => whens.push((
                                parse_expr(&self.required(ch, "test")?)?, self.compile_body(ch)?)),
                        Some("otherwise") => otherwise = Some(self.compile_body(ch)?),
                        _ => return Err(xsl_syntax_error!("Unexpected {} in {}", ch.name(), node.name())),
                    }
                }
                Instruction::Choose(whens, otherwise)
            },
            "text" => Instruction::Text(node.string_value()),
            _ => return Err(xsl_syntax_error!("Unsupported instruction {}", node.name())),
        };
        return Ok(instruction);
    }
}

// ---------------------------------------------------------------------
// Prefix declared for the XSL namespace on the stylesheet element.
//
fn xsl_prefix(root: &NodePtr) -> String {
    for at in root.attributes().iter() {
        if at.value() == XSL_NAMESPACE {
            if let Some(prefix) = at.name().strip_prefix("xmlns:") {
                return String::from(prefix);
            }
        }
    }
    return String::from(DEFAULT_PREFIX);
}

impl Stylesheet {
    // -----------------------------------------------------------------
    /// Compiles the stylesheet text.
    ///
    /// # Errors
    ///
    /// - When the text is not well-formed XML.
    /// - When it uses an instruction or expression beyond the subset.
    ///
    pub fn parse(text: &str) -> Result<Stylesheet, XmlError> {
        let doc = new_document(text)?;
        let root = doc.root_element();
        let compiler = Compiler {
            prefix: xsl_prefix(&root),
        };
        match compiler.xsl_name(&root).as_deref() {
            Some("stylesheet") | Some("transform") => {},
            _ => return Err(xsl_syntax_error!("Not a stylesheet: {}", root.name())),
        }

        let mut output = OutputSettings::default();
        let mut templates: Vec<Template> = vec!{};
        for child in root.child_elements().iter() {
            match compiler.xsl_name(child).as_deref() {
                Some("output") => {
                    output.method = child.attribute_value("method");
                    output.encoding = child.attribute_value("encoding");
                    output.indent = child.attribute_value("indent").as_deref() == Some("yes");
                    output.omit_xml_declaration =
                            child.attribute_value("omit-xml-declaration").as_deref() == Some("yes");
                },
                Some("template") => {
                    let pattern_text = compiler.required(child, "match")?;
                    let body = compiler.compile_body(child)?;
                    let priority = match child.attribute_value("priority") {
                        Some(p) => Some(p.trim().parse::<f64>()
                                .map_err(|_| xsl_syntax_error!("Bad priority: {}", p))?),
                        None => None,
                    };
                    for alternative in pattern_text.split('|') {
                        let pattern = parse_path(alternative)?;
                        if pattern.steps.iter().any(|s| s.axis == Axis::SelfNode || s.axis == Axis::Parent) {
                            return Err(xsl_syntax_error!("Unsupported pattern: {}", alternative.trim()));
                        }
                        templates.push(Template {
                            priority: priority.unwrap_or_else(|| default_priority(&pattern)),
                            pattern,
                            body: body.clone(),
                        });
                    }
                },
                Some("strip-space") | Some("preserve-space") => {},
                _ => return Err(xsl_syntax_error!("Unsupported top-level element {}", child.name())),
            }
        }
        return Ok(Stylesheet {
            output,
            templates,
        });
    }

    pub fn output(&self) -> &OutputSettings {
        return &self.output;
    }

    // -----------------------------------------------------------------
    /// Transforms the document 'source' into text.
    ///
    pub fn transform(&self, source: &NodePtr) -> Result<String, XmlError> {
        let result = new_document_root();
        self.process_node(&source.root(), &result, 0)?;

        let method = match self.output.method {
            Some(ref m) => m.to_ascii_lowercase(),
            None => {
                let first = result.child_elements().into_iter().next();
                match first {
                    Some(e) if e.name().eq_ignore_ascii_case("html") => String::from("html"),
                    _ => String::from("xml"),
                }
            },
        };
        let step = if self.output.indent { INDENT_SIZE } else { 0 };
        return Ok(match method.as_str() {
            "text" => result.string_value(),
            "html" => result.to_pretty_string(step),
            _ => {
                let mut s = String::new();
                if ! self.output.omit_xml_declaration {
                    s += &format!(r#"<?xml version="1.0" encoding="{}"?>"#,
                            self.output.encoding.as_deref().unwrap_or("UTF-8"));
                    if step > 0 {
                        s += "\n";
                    }
                }
                s += &result.to_pretty_string(step);
                s
            },
        });
    }

    // -----------------------------------------------------------------
    // The template of highest priority matching 'node'; the last one
    // declared wins a tie.
    //
    fn find_template(&self, node: &NodePtr) -> Option<&Template> {
        let mut found: Option<&Template> = None;
        for t in self.templates.iter() {
            if pattern_matches(node, &t.pattern.steps, t.pattern.absolute) {
                if found.map_or(true, |f| t.priority >= f.priority) {
                    found = Some(t);
                }
            }
        }
        return found;
    }

    fn process_node(&self, node: &NodePtr, out: &NodePtr, depth: usize) -> Result<(), XmlError> {
        if depth > MAX_DEPTH {
            return Err(xsl_dynamic_error!("Templates nested too deeply at {}", node.name()));
        }
        if let Some(template) = self.find_template(node) {
            return self.execute(&template.body, node, out, depth + 1);
        }
        match node.node_type() {
            NodeType::DocumentRoot | NodeType::Element => {
                for ch in node.children().iter() {
                    self.process_node(ch, out, depth + 1)?;
                }
            },
            NodeType::Text | NodeType::Attribute => out.append_text(&node.value()),
            _ => {},
        }
        return Ok(());
    }

    fn execute(&self, body: &[Instruction], node: &NodePtr, out: &NodePtr, depth: usize)
            -> Result<(), XmlError> {
        for instruction in body.iter() {
            match instruction {
                Instruction::ApplyTemplates(path) => {
                    let nodes = match path {
                        Some(path) => select(node, path),
                        None => node.children(),
                    };
                    for n in nodes.iter() {
                        self.process_node(n, out, depth)?;
                    }
                },
                Instruction::ValueOf(expr) => {
                    let text = evaluate(expr, node).to_text();
                    if ! text.is_empty() {
                        out.append_text(&text);
                    }
                },
                Instruction::ForEach(path, inner) => {
                    for n in select(node, path).iter() {
                        self.execute(inner, n, out, depth)?;
                    }
                },
                Instruction::If(test, inner) => {
                    if evaluate(test, node).to_bool() {
                        self.execute(inner, node, out, depth)?;
                    }
                },
                Instruction::Choose(whens, otherwise) => {
                    let chosen = whens.iter()
                            .find(|(test, _)| evaluate(test, node).to_bool())
                            .map(|(_, inner)| inner)
                            .or(otherwise.as_ref());
                    if let Some(inner) = chosen {
                        self.execute(inner, node, out, depth)?;
                    }
                },
                Instruction::Text(text) => out.append_text(text),
                Instruction::Element(name, attributes, inner) => {
                    let elem = out.append_element(name);
                    for (attr, parts) in attributes.iter() {
                        let value: String = parts.iter().map(|p| match p {
                            AvtPart::Text(t) => t.clone(),
                            AvtPart::Expr(e) => evaluate(e, node).to_text(),
                        }).collect();
                        elem.set_attribute(attr, &value);
                    }
                    self.execute(inner, node, &elem, depth)?;
                },
            }
        }
        return Ok(());
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    const HEAD: &str = r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">"#;
    const TAIL: &str = "</xsl:stylesheet>";

    fn run(body: &str, xml: &str) -> Result<String, XmlError> {
        let stylesheet = Stylesheet::parse(&format!("{}{}{}", HEAD, body, TAIL))?;
        let doc = new_document(xml)?;
        return stylesheet.transform(&doc);
    }

    #[test]
    fn test_select() {
        let doc = new_document(r#"<a><b id="1">x</b><c><b id="2">y</b></c></a>"#).unwrap();
        let test_specs = [
            ( "/a/b", "x" ),
            ( "//b", "xy" ),
            ( "/a/c/b/@id", "2" ),
            ( "//b/@id", "12" ),
            ( "/a/*", "xy" ),
            ( "/a/c/b/..", "y" ),
            ( "/a/b/text()", "x" ),
        ];
        for (path, guess) in test_specs.iter() {
            let nodes = select(&doc, &parse_path(path).unwrap());
            let s: String = nodes.iter().map(|n| n.string_value()).collect();
            assert_eq!(s, *guess, "{}", path);
        }
    }

    #[test]
    fn test_transform() {
        let xml = r#"<contents><user><name>lee</name><role>admin</role></user><user><name>kim</name><role>guest</role></user></contents>"#;
        let test_specs = [
            (
                r#"<xsl:output method="html"/>
                   <xsl:template match="/"><ul><xsl:apply-templates select="contents/user"/></ul></xsl:template>
                   <xsl:template match="user"><li class="{role}"><xsl:value-of select="name"/></li></xsl:template>"#,
                r#"<ul><li class="admin">lee</li><li class="guest">kim</li></ul>"#,
            ),
            (
                r#"<xsl:output method="text"/>
                   <xsl:template match="/"><xsl:for-each select="//user"><xsl:if test="role = 'admin'">*</xsl:if><xsl:value-of select="name"/><xsl:text>;</xsl:text></xsl:for-each></xsl:template>"#,
                "*lee;kim;",
            ),
            (
                r#"<xsl:output method="text"/>
                   <xsl:template match="user"><xsl:choose><xsl:when test="role != 'admin'">[<xsl:value-of select="name"/>]</xsl:when><xsl:otherwise><xsl:value-of select="name"/></xsl:otherwise></xsl:choose></xsl:template>"#,
                "lee[kim]",
            ),
            (
                r#"<xsl:output method="xml" omit-xml-declaration="yes"/>
                   <xsl:template match="contents"><count n="{{x}}"><xsl:value-of select="not(user/missing)"/></count></xsl:template>"#,
                r#"<count n="{x}">true</count>"#,
            ),
        ];
        for (body, guess) in test_specs.iter() {
            assert_eq!(run(body, xml).unwrap(), *guess);
        }
    }

    #[test]
    fn test_builtin_rules() {
        let out = run(r#"<xsl:output method="text"/>"#, "<a>x<b>y</b></a>").unwrap();
        assert_eq!(out, "xy");
        let out = run("", "<a>x</a>").unwrap();
        assert_eq!(out, r#"<?xml version="1.0" encoding="UTF-8"?>x"#);
    }

    #[test]
    fn test_numeric_compare() {
        let out = run(r#"<xsl:output method="text"/>
                <xsl:template match="item"><xsl:if test="@n = 2">two</xsl:if></xsl:template>"#,
                r#"<list><item n="1"/><item n="2.0"/></list>"#).unwrap();
        assert_eq!(out, "two");
    }

    #[test]
    fn test_errors() {
        let test_specs = [
            ( r#"<xsl:template match="/"><xsl:call-template name="x"/></xsl:template>"#,
              "Syntax Error in XSL: Unsupported instruction xsl:call-template" ),
            ( r#"<xsl:template><x/></xsl:template>"#,
              "Syntax Error in XSL: xsl:template requires the attribute 'match'" ),
            ( r#"<xsl:template match="/"><xsl:value-of select="a[1]"/></xsl:template>"#,
              "Syntax Error in XSL: Unsupported step 'a[1]' in a[1]" ),
        ];
        for (body, guess) in test_specs.iter() {
            assert_eq!(run(body, "<a/>").unwrap_err().to_string(), *guess);
        }
        let err = Stylesheet::parse("<root/>").unwrap_err();
        assert_eq!(err.to_string(), "Syntax Error in XSL: Not a stylesheet: root");
    }

    #[test]
    fn test_output_settings() {
        let stylesheet = Stylesheet::parse(&format!(
                r#"{}<xsl:output method="html" encoding="EUC-KR" indent="yes"/>{}"#, HEAD, TAIL)).unwrap();
        assert_eq!(stylesheet.output().content_type(), Some("text/html"));
        assert_eq!(stylesheet.output().encoding.as_deref(), Some("EUC-KR"));
        assert!(stylesheet.output().indent);
    }
}
