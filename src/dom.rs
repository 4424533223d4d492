//
// dom.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//
//!
//! Small XML DOM.
//!
//! Used for two things: XSL stylesheets and their source documents are
//! read into this tree, and the XML transform response builds its
//! output as this tree before serializing it.
//!
//! ```
//! use aspectran::dom::*;
//! let doc = new_document_root();
//! let root = doc.append_element("contents");
//! let msg = root.append_element("msg");
//! msg.append_text("R&D");
//! assert_eq!(doc.to_string(), "<contents><msg>R&amp;D</msg></contents>");
//! assert_eq!(doc.to_pretty_string(2), "<contents>\n  <msg>R&amp;D</msg>\n</contents>\n");
//! ```
//!
//! ### Note
//!
//! This processor does not translate namespace prefixes to
//! their corresponding URIs.
//!

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::XmlError;
use crate::sax::{SaxDecoder, XmlToken};

// =====================================================================
/// A node in the XML document tree.
///
#[derive(Clone)]
pub struct NodePtr {
    rc_node: RcNode,
}

type RcNode = Rc<Node>;

fn wrap_rc_clone(rc_node: &RcNode) -> NodePtr {
    return NodePtr{ rc_node: Rc::clone(rc_node) };
}

// ---------------------------------------------------------------------
//
impl fmt::Debug for NodePtr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.node_type() {
            NodeType::DocumentRoot => {
                return write!(f, "(DocumentRoot)");
            },
            NodeType::Element => {
                let mut str = String::new();
                str += &"<";
                str += &self.name();
                for at in self.attributes().iter() {
                    str += &format!(r#" {}="{}""#, at.name(), at.value());
                }
                str += &">";
                return write!(f, "{}", str);
            },
            NodeType::Text => {
                return write!(f, "{}", self.value());
            },
            NodeType::Attribute => {
                return write!(f, r#"{}="{}""#, self.name(), self.value());
            },
            _ => {
                return write!(f, "");
            },
        }
    }
}

// ---------------------------------------------------------------------
//
impl fmt::Display for NodePtr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return write!(f, "{}", to_string_with_indent(&self.rc_node, 0, 0));
    }
}

// ---------------------------------------------------------------------
//
impl PartialEq for NodePtr {
    fn eq(&self, other: &NodePtr) -> bool {
        return Rc::ptr_eq(&self.rc_node, &other.rc_node)
    }
}

impl Eq for NodePtr {
}

// =====================================================================
/// Type of node in the XML document tree.
///
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum NodeType {
    DocumentRoot,
    Element,
    Text,
    Comment,
    XMLDecl,
    Instruction,
    Attribute,
}

// =====================================================================
//
#[derive(Debug)]
struct Node {
    node_type: NodeType,
    name: String,
    value: RefCell<String>,
    parent: RefCell<Weak<Node>>,
    children: RefCell<Vec<RcNode>>,
    attributes: RefCell<Vec<RcNode>>,
}

// ---------------------------------------------------------------------
//
fn make_new_rc_node(node_type: NodeType, parent: Option<&RcNode>,
                name: &str, value: &str) -> RcNode {
    return Rc::new(Node {
        node_type,
        name: String::from(name),
        value: RefCell::new(String::from(value)),
        parent: RefCell::new(match parent {
            Some(p) => Rc::downgrade(p),
            None => Weak::new(),
        }),
        children: RefCell::new(vec!{}),
        attributes: RefCell::new(vec!{}),
    });
}

// ---------------------------------------------------------------------
//
fn make_new_child_rc_node(node_type: NodeType, parent: &RcNode,
                name: &str, value: &str) -> RcNode {
    let node = make_new_rc_node(node_type, Some(parent), name, value);
    parent.children.borrow_mut().push(Rc::clone(&node));
    return node;
}

// =====================================================================
/// Creates an empty document whose children are added by the
/// append_* methods.
///
pub fn new_document_root() -> NodePtr {
    return NodePtr{
        rc_node: make_new_rc_node(NodeType::DocumentRoot, None, "", ""),
    };
}

// =====================================================================
/// Parses the XML string and creates the DOM tree and
/// returns the topmost DocumentRoot node.
///
/// # Errors
///
/// - When there is syntax error, e.g. "&lt;foo&gt;xxx&lt;/bar&gt;".
///
pub fn new_document(xml_string: &str) -> Result<NodePtr, XmlError> {

    let mut dec = SaxDecoder::new(xml_string);

    let doc_root = make_new_rc_node(NodeType::DocumentRoot, None, "", "");
    let mut curr_node = Rc::clone(&doc_root);
    loop {
        match dec.raw_token()? {
            XmlToken::EOF => {
                break;
            },
            XmlToken::StartElement{name, attr} => {
                let e = make_new_child_rc_node(NodeType::Element,
                            &curr_node, name.as_str(), "");
                for at in attr.iter() {
                    let attr_node = make_new_rc_node(NodeType::Attribute,
                            Some(&e), at.name(), at.value());
                    e.attributes.borrow_mut().push(attr_node);
                }
                curr_node = e;
            },
            XmlToken::EndElement{name} => {
                if curr_node.name.as_str() != name {
                    return Err(xml_syntax_error!(
                        "Element name mismatch: {} and {}",
                        curr_node.name.as_str(), name));
                }
                let parent = curr_node.parent.borrow().upgrade();
                curr_node = match parent {
                    Some(p) => p,
                    None => Rc::clone(&doc_root),
                };
            },
            XmlToken::CharData{chardata} => {
                if curr_node.node_type == NodeType::DocumentRoot {
                    if chardata.trim() != "" {
                        return Err(xml_syntax_error!(
                            "Text outside of the root element: {}", chardata.trim()));
                    }
                } else {
                    make_new_child_rc_node(NodeType::Text,
                                &curr_node, "", chardata.as_str());
                }
            },
            XmlToken::ProcInst{target, inst} => {
                if target == "xml" {
                    make_new_child_rc_node(NodeType::XMLDecl,
                                &curr_node, "xml", inst.as_str());
                } else {
                    make_new_child_rc_node(NodeType::Instruction,
                                &curr_node, target.as_str(), inst.as_str());
                }
            },
            XmlToken::Comment{comment} => {
                make_new_child_rc_node(NodeType::Comment,
                            &curr_node, "", comment.as_str());
            },
            XmlToken::Directive{..} => {},
        }
    }
    if ! Rc::ptr_eq(&curr_node, &doc_root) {
        return Err(xml_syntax_error!("Unclosed element: {}", curr_node.name));
    }
    return Ok(NodePtr{rc_node: doc_root});
}

// =====================================================================
//
impl NodePtr {

    // =================================================================
    /// Turns XML DOM tree into 'pretty' XML string, indented by 'step'
    /// spaces.  An element whose children are all text stays on one line.
    ///
    pub fn to_pretty_string(&self, step: usize) -> String {
        return to_string_with_indent(&self.rc_node, 0, step);
    }

    // =================================================================
    /// Returns type of the node (NodeType::Element, etc.).
    //
    pub fn node_type(&self) -> NodeType {
        return self.rc_node.node_type;
    }

    // =================================================================
    /// Returns the name of the Element/Attribute node,
    /// or the target of the Instruction node.
    ///
    pub fn name(&self) -> String {
        return self.rc_node.name.clone();
    }

    // =================================================================
    /// Returns the value of the Attribute node,
    /// text of the Text/Comment node,
    /// inst of XMLDecl/Instruction node.
    ///
    pub fn value(&self) -> String {
        return self.rc_node.value.borrow().clone();
    }

    // =================================================================
    /// Returns the local name of Element.
    ///
    pub fn local_name(&self) -> String {
        let name = &self.rc_node.name;
        return match name.split_once(':') {
            Some((_, local)) => String::from(local),
            None => name.clone(),
        };
    }

    // =================================================================
    /// Concatenated text of all descendant Text nodes,
    /// or the value for other leaf nodes.
    ///
    /// ```
    /// use aspectran::dom::*;
    /// let doc = new_document("<a>x<b>y</b>z</a>").unwrap();
    /// assert_eq!(doc.root_element().string_value(), "xyz");
    /// ```
    ///
    pub fn string_value(&self) -> String {
        match self.node_type() {
            NodeType::DocumentRoot | NodeType::Element => {
                let mut s = String::new();
                for ch in self.children().iter() {
                    match ch.node_type() {
                        NodeType::Text => s += &ch.value(),
                        NodeType::Element => s += &ch.string_value(),
                        _ => {},
                    }
                }
                return s;
            },
            _ => return self.value(),
        }
    }

    // =================================================================
    /// Returns the root (topmost) node of DOM tree.
    ///
    pub fn root(&self) -> NodePtr {
        let mut curr = Rc::clone(&self.rc_node);
        loop {
            let parent = curr.parent.borrow().upgrade();
            curr = match parent {
                Some(p) => p,
                None => return wrap_rc_clone(&curr),
            };
        }
    }

    // =================================================================
    /// Returns the topmost Element node,
    /// or root node when there is no Element node.
    ///
    pub fn root_element(&self) -> NodePtr {
        let doc_root = self.root();
        for ch in doc_root.children().iter() {
            if ch.node_type() == NodeType::Element {
                return ch.clone();
            }
        }
        return doc_root;
    }

    // =================================================================
    /// Returns the parent of the node, or None if it is DocumentRoot.
    ///
    pub fn parent(&self) -> Option<NodePtr> {
        let parent = self.rc_node.parent.borrow().upgrade();
        return parent.map(|p| wrap_rc_clone(&p));
    }

    // =================================================================
    /// Returns the children of the node.
    ///
    pub fn children(&self) -> Vec<NodePtr> {
        return self.rc_node.children.borrow().iter()
                .map(wrap_rc_clone).collect();
    }

    // =================================================================
    /// Returns the element children of the node.
    ///
    pub fn child_elements(&self) -> Vec<NodePtr> {
        return self.rc_node.children.borrow().iter()
                .filter(|ch| ch.node_type == NodeType::Element)
                .map(wrap_rc_clone).collect();
    }

    // =================================================================
    /// Returns the attributes of the node.
    ///
    pub fn attributes(&self) -> Vec<NodePtr> {
        return self.rc_node.attributes.borrow().iter()
                .map(wrap_rc_clone).collect();
    }

    // =================================================================
    /// Returns the value of attribute named 'name'.
    ///
    pub fn attribute_value(&self, name: &str) -> Option<String> {
        for at in self.rc_node.attributes.borrow().iter() {
            if at.name == name {
                return Some(at.value.borrow().clone());
            }
        }
        return None;
    }

    // =================================================================
    /// Sets (or replaces) the attribute of an Element.
    ///
    pub fn set_attribute(&self, name: &str, value: &str) {
        for at in self.rc_node.attributes.borrow().iter() {
            if at.name == name {
                *at.value.borrow_mut() = String::from(value);
                return;
            }
        }
        let attr_node = make_new_rc_node(NodeType::Attribute,
                Some(&self.rc_node), name, value);
        self.rc_node.attributes.borrow_mut().push(attr_node);
    }

    // =================================================================
    /// Appends a new Element as the last child and returns it.
    ///
    pub fn append_element(&self, name: &str) -> NodePtr {
        let e = make_new_child_rc_node(NodeType::Element, &self.rc_node, name, "");
        return wrap_rc_clone(&e);
    }

    // =================================================================
    /// Appends a Text node; adjacent text is merged into the last one.
    ///
    pub fn append_text(&self, text: &str) {
        if let Some(last) = self.rc_node.children.borrow().last() {
            if last.node_type == NodeType::Text {
                last.value.borrow_mut().push_str(text);
                return;
            }
        }
        make_new_child_rc_node(NodeType::Text, &self.rc_node, "", text);
    }

    // =================================================================
    /// Appends an XML declaration, e.g. 'version="1.0" encoding="UTF-8"'.
    ///
    pub fn append_xml_decl(&self, inst: &str) {
        make_new_child_rc_node(NodeType::XMLDecl, &self.rc_node, "xml", inst);
    }
}

// ---------------------------------------------------------------------
//
fn to_string_with_indent(rc_node: &RcNode, indent: usize, step: usize) -> String {
    match rc_node.node_type {
        NodeType::DocumentRoot => {
            let mut s = String::new();
            for ch in rc_node.children.borrow().iter() {
                s += &to_string_with_indent(ch, indent, step);
            }
            return s;
        },
        NodeType::Element => {
            let mut s = String::new();
            s += &format!("{}<{}", " ".repeat(indent), rc_node.name);
            for at in rc_node.attributes.borrow().iter() {
                s += &format!(r#" {}="{}""#,
                    at.name, encode_entity(&at.value.borrow()));
            }
            let children = rc_node.children.borrow();
            if children.len() == 0 {
                s += &"/>";
            } else if children.iter().all(|ch| ch.node_type == NodeType::Text) {
                s += &">";
                for ch in children.iter() {
                    s += &encode_entity(&ch.value.borrow());
                }
                s += &format!("</{}>", rc_node.name);
            } else {
                s += &">";
                s += &nl_if_positive(step);
                for ch in children.iter() {
                    s += &to_string_with_indent(ch, indent + step, step);
                }
                s += &format!("{}</{}>", " ".repeat(indent), rc_node.name);
            }
            s += &nl_if_positive(step);
            return s;
        },
        NodeType::Text => {
            let value = rc_node.value.borrow();
            if 0 < step && value.trim() == "" {
                return String::new();
            }
            return format!("{}{}{}",
                &" ".repeat(indent),
                &encode_entity(&value),
                &nl_if_positive(step));
        },
        NodeType::Comment => {
            return format!("{}<!--{}-->{}",
                &" ".repeat(indent),
                &rc_node.value.borrow(),
                &nl_if_positive(step));
        },
        NodeType::XMLDecl => {
            return format!("{}<?xml {}?>{}",
                &" ".repeat(indent),
                &rc_node.value.borrow(),
                &nl_if_positive(step));
        },
        NodeType::Instruction => {
            return format!("{}<?{} {}?>{}",
                &" ".repeat(indent),
                &rc_node.name,
                &rc_node.value.borrow(),
                &nl_if_positive(step));
        },
        NodeType::Attribute => return String::new(),
    }
}

// ---------------------------------------------------------------------
//
pub fn encode_entity(s: &str) -> String {
    let mut str = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => str += "&amp;",
            '>' => str += "&gt;",
            '<' => str += "&lt;",
            '"' => str += "&quot;",
            '\'' => str += "&apos;",
            _ => str.push(ch),
        }
    }
    return str;
}

// ---------------------------------------------------------------------
//
fn nl_if_positive<'a>(n: usize) -> &'a str {
    return if 0 < n { "\n" } else { "" };
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_round_trip() {
        let test_specs = [
            [ r#"<article>About <em>XML</em> string</article>"#,
              r#"<article>About <em>XML</em> string</article>"# ],
            [ r#"<?xml version="1.0"?><a b="&lt;"/>"#,
              r#"<?xml version="1.0"?><a b="&lt;"/>"# ],
            [ r#"<a><!--c--><?pi x?></a>"#,
              r#"<a><!--c--><?pi x?></a>"# ],
        ];
        for spec in test_specs.iter() {
            let doc = new_document(spec[0]).unwrap();
            assert_eq!(doc.to_string(), spec[1]);
        }
    }

    #[test]
    fn test_syntax_errors() {
        let test_specs = [
            [ "<foo>xxx</bar>", "Syntax Error in XML: Element name mismatch: foo and bar" ],
            [ "<foo><bar/>", "Syntax Error in XML: Unclosed element: foo" ],
            [ "text<foo/>", "Syntax Error in XML: Text outside of the root element: text" ],
        ];
        for spec in test_specs.iter() {
            match new_document(spec[0]) {
                Ok(_) => panic!("accepted: {}", spec[0]),
                Err(e) => assert_eq!(e.to_string(), spec[1]),
            }
        }
    }

    #[test]
    fn test_build_and_navigate() {
        let doc = new_document_root();
        doc.append_xml_decl(r#"version="1.0" encoding="UTF-8""#);
        let root = doc.append_element("contents");
        let row = root.append_element("row");
        row.set_attribute("id", "1");
        row.set_attribute("id", "2");
        row.append_text("a");
        row.append_text("b");
        root.append_element("empty");

        assert_eq!(row.attribute_value("id"), Some(String::from("2")));
        assert_eq!(row.children().len(), 1);
        assert_eq!(row.parent().unwrap(), root);
        assert_eq!(row.root(), doc);
        assert_eq!(doc.root_element(), root);
        assert_eq!(doc.to_pretty_string(2),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<contents>\n  <row id=\"2\">ab</row>\n  <empty/>\n</contents>\n");
    }

    #[test]
    fn test_local_name() {
        let doc = new_document(r#"<xsl:stylesheet/>"#).unwrap();
        assert_eq!(doc.root_element().local_name(), "stylesheet");
        assert_eq!(doc.root_element().name(), "xsl:stylesheet");
    }
}
