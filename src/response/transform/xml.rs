//
// response/transform/xml.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

use tracing::debug;

use crate::activity::{CoreActivity, ProcessResult, ResultValue};
use crate::dom::{new_document_root, NodePtr};
use crate::error::ActivityError;
use crate::response::transform::write_body;
use crate::response::{apply_content_type, apply_encoding, Response};
use crate::rule::{ResponseType, TransformRule};

const CONTENTS_TAG: &str = "contents";
const CONTENT_TAG: &str = "content";
const ROWS_TAG: &str = "rows";
const ROW_TAG: &str = "row";
const EMPTY_TAG: &str = "empty";
const ITEM_TAG: &str = "item";
const NAME_ATTR: &str = "name";

const DEFAULT_ENCODING: &str = "UTF-8";
const INDENT_SIZE: usize = 2;

// =====================================================================
/// The ProcessResult as an XML document.
///
/// The contents and each content are wrapped in an element named after
/// them ("contents", "content" when unnamed) unless they are
/// omittable.  Each action result is an element named by its action
/// id; maps become child elements, lists become `<rows><row>`.  An
/// id or key that is not an XML name is kept as `<item name="...">`.
/// An empty result is `<empty/>`.
///
/// ```
/// use aspectran::activity::{ContentResult, ProcessResult, ResultValue};
/// use aspectran::response::transform::process_result_document;
///
/// let mut content = ContentResult::new(None, true);
/// content.put_result_value(Some("user.name"), ResultValue::from("lee"));
/// let mut pr = ProcessResult::new(None, false);
/// pr.add_content_result(content);
/// let doc = process_result_document(Some(&pr));
/// assert_eq!(doc.to_string(), "<contents><user><name>lee</name></user></contents>");
/// ```
///
pub fn process_result_document(process_result: Option<&ProcessResult>) -> NodePtr {
    let doc = new_document_root();
    let pr = match process_result {
        Some(pr) if ! pr.is_empty() => pr,
        _ => {
            doc.append_element(EMPTY_TAG);
            return doc;
        },
    };
    let top = if pr.is_omittable() {
        doc.clone()
    } else {
        doc.append_element(pr.name().unwrap_or(CONTENTS_TAG))
    };
    for content in pr.content_results().iter() {
        let parent = if content.is_omittable() {
            top.clone()
        } else {
            top.append_element(content.name().unwrap_or(CONTENT_TAG))
        };
        for action_result in content.action_results().iter() {
            match action_result.action_id() {
                Some(id) => {
                    let elem = append_named(&parent, id);
                    append_value(&elem, action_result.result_value());
                },
                None => append_value(&parent, action_result.result_value()),
            }
        }
    }
    return doc;
}

fn append_value(parent: &NodePtr, value: &ResultValue) {
    match value {
        ResultValue::Null => {},
        ResultValue::Map(map) => {
            for (name, v) in map.iter() {
                let elem = append_named(parent, name);
                append_value(&elem, v);
            }
        },
        ResultValue::List(list) => {
            let rows = parent.append_element(ROWS_TAG);
            for v in list.iter() {
                let row = rows.append_element(ROW_TAG);
                append_value(&row, v);
            }
        },
        v => parent.append_text(&v.to_string()),
    }
}

fn append_named(parent: &NodePtr, name: &str) -> NodePtr {
    if is_xml_name(name) {
        return parent.append_element(name);
    }
    let elem = parent.append_element(ITEM_TAG);
    elem.set_attribute(NAME_ATTR, name);
    return elem;
}

// ---------------------------------------------------------------------
// A name start char followed by name chars; colons are not allowed,
// nor names starting with "xml" in any case.
//
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let first = match chars.next() {
        Some(ch) => ch,
        None => return false,
    };
    if ! (first.is_alphabetic() || first == '_') {
        return false;
    }
    if name.get(..3).map_or(false, |prefix| prefix.eq_ignore_ascii_case("xml")) {
        return false;
    }
    return chars.all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '-' || ch == '.');
}

// =====================================================================
/// Renders the ProcessResult as XML, indented unless the rule says
/// otherwise.
///
#[derive(Debug)]
pub struct XmlTransformResponse {
    rule: TransformRule,
}

impl XmlTransformResponse {
    pub fn new(rule: TransformRule) -> XmlTransformResponse {
        return XmlTransformResponse { rule };
    }

    fn render(&self, activity: &CoreActivity, encoding: Option<&str>) -> String {
        let content = process_result_document(activity.process_result());
        let doc = new_document_root();
        doc.append_xml_decl(&format!(r#"version="1.0" encoding="{}""#,
                encoding.unwrap_or(DEFAULT_ENCODING)));
        let step = if self.rule.is_pretty(true) {
            self.rule.indent_size.unwrap_or(INDENT_SIZE)
        } else {
            0
        };
        let mut s = doc.to_pretty_string(step);
        s += &content.to_pretty_string(step);
        return s;
    }
}

impl fmt::Display for XmlTransformResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.rule)
    }
}

impl Response for XmlTransformResponse {
    fn response_type(&self) -> ResponseType {
        return ResponseType::Transform;
    }

    fn content_type(&self) -> Option<&str> {
        return self.rule.content_type.as_deref();
    }

    fn is_default(&self) -> bool {
        return self.rule.default;
    }

    fn commit(&self, activity: &mut CoreActivity) -> Result<(), ActivityError> {
        debug!("response {}", self.rule);
        apply_content_type(activity, self.rule.content_type.as_deref(),
                Some(self.rule.transform_type.default_content_type()));
        let encoding = apply_encoding(activity, self.rule.encoding.as_deref());
        let body = self.render(activity, encoding.as_deref());
        return write_body(activity, &self.rule, &body);
    }
}
