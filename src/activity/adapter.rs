//
// activity/adapter.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

use crate::rule::MethodType;

// =====================================================================
/// The request side of an activity, as seen by the core.
///
pub trait RequestAdapter: fmt::Debug {
    fn method(&self) -> MethodType;

    /// First value of the parameter 'name'.
    ///
    fn parameter(&self, name: &str) -> Option<&str> {
        return self.parameter_values(name).and_then(|v| v.first()).map(|s| s.as_str());
    }

    fn parameter_values(&self, name: &str) -> Option<&[String]>;
    fn parameter_names(&self) -> Vec<&str>;
    fn set_parameter(&mut self, name: &str, values: Vec<String>);

    fn encoding(&self) -> Option<&str>;
    fn set_encoding(&mut self, encoding: Option<&str>);

    fn header(&self, name: &str) -> Option<&str>;
}

// =====================================================================
/// The response side of an activity: headers, content type, encoding
/// and a writer for the body.
///
pub trait ResponseAdapter: fmt::Debug {
    fn content_type(&self) -> Option<&str>;
    fn set_content_type(&mut self, content_type: Option<&str>);

    fn encoding(&self) -> Option<&str>;
    fn set_encoding(&mut self, encoding: Option<&str>);

    fn header(&self, name: &str) -> Option<&str>;
    fn set_header(&mut self, name: &str, value: &str);

    fn writer(&mut self) -> &mut dyn fmt::Write;

    fn redirect(&mut self, location: &str);
    fn redirected(&self) -> Option<&str>;
}

// =====================================================================
/// In-memory request.
///
/// ```
/// use aspectran::activity::{BasicRequestAdapter, RequestAdapter};
/// use aspectran::rule::MethodType;
/// let mut req = BasicRequestAdapter::new(MethodType::Get);
/// req.add_parameter("tag", "a");
/// req.add_parameter("tag", "b");
/// assert_eq!(req.parameter("tag"), Some("a"));
/// assert_eq!(req.parameter_values("tag").unwrap().len(), 2);
/// ```
///
#[derive(Debug, Clone)]
pub struct BasicRequestAdapter {
    method: MethodType,
    parameters: Vec<(String, Vec<String>)>,
    headers: Vec<(String, String)>,
    encoding: Option<String>,
}

impl BasicRequestAdapter {
    pub fn new(method: MethodType) -> BasicRequestAdapter {
        return BasicRequestAdapter {
            method,
            parameters: vec!{},
            headers: vec!{},
            encoding: None,
        };
    }

    pub fn add_parameter(&mut self, name: &str, value: &str) {
        match self.parameters.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1.push(String::from(value)),
            None => self.parameters.push((String::from(name), vec![String::from(value)])),
        }
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((String::from(name), String::from(value)));
    }
}

impl RequestAdapter for BasicRequestAdapter {
    fn method(&self) -> MethodType {
        return self.method;
    }

    fn parameter_values(&self, name: &str) -> Option<&[String]> {
        return self.parameters.iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_slice());
    }

    fn parameter_names(&self) -> Vec<&str> {
        return self.parameters.iter().map(|(n, _)| n.as_str()).collect();
    }

    fn set_parameter(&mut self, name: &str, values: Vec<String>) {
        match self.parameters.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = values,
            None => self.parameters.push((String::from(name), values)),
        }
    }

    fn encoding(&self) -> Option<&str> {
        return self.encoding.as_deref();
    }

    fn set_encoding(&mut self, encoding: Option<&str>) {
        self.encoding = encoding.map(String::from);
    }

    fn header(&self, name: &str) -> Option<&str> {
        return self.headers.iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str());
    }
}

// =====================================================================
/// In-memory response; the body is kept as a String.
///
#[derive(Debug, Clone, Default)]
pub struct BasicResponseAdapter {
    content_type: Option<String>,
    encoding: Option<String>,
    headers: Vec<(String, String)>,
    body: String,
    redirected: Option<String>,
}

impl BasicResponseAdapter {
    pub fn new() -> BasicResponseAdapter {
        return BasicResponseAdapter::default();
    }

    pub fn body(&self) -> &str {
        return self.body.as_str();
    }

    pub fn headers(&self) -> &[(String, String)] {
        return &self.headers;
    }
}

impl ResponseAdapter for BasicResponseAdapter {
    fn content_type(&self) -> Option<&str> {
        return self.content_type.as_deref();
    }

    fn set_content_type(&mut self, content_type: Option<&str>) {
        self.content_type = content_type.map(String::from);
    }

    fn encoding(&self) -> Option<&str> {
        return self.encoding.as_deref();
    }

    fn set_encoding(&mut self, encoding: Option<&str>) {
        self.encoding = encoding.map(String::from);
    }

    fn header(&self, name: &str) -> Option<&str> {
        return self.headers.iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str());
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(entry) => entry.1 = String::from(value),
            None => self.headers.push((String::from(name), String::from(value))),
        }
    }

    fn writer(&mut self) -> &mut dyn fmt::Write {
        return &mut self.body;
    }

    fn redirect(&mut self, location: &str) {
        self.set_header("Location", location);
        self.redirected = Some(String::from(location));
    }

    fn redirected(&self) -> Option<&str> {
        return self.redirected.as_deref();
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn test_request() {
        let mut req = BasicRequestAdapter::new(MethodType::Post);
        req.add_parameter("a", "1");
        req.set_parameter("b", vec![String::from("2"), String::from("3")]);
        req.set_parameter("a", vec![String::from("9")]);
        req.add_header("Accept", "application/json");
        assert_eq!(req.method(), MethodType::Post);
        assert_eq!(req.parameter("a"), Some("9"));
        assert_eq!(req.parameter_names(), vec!["a", "b"]);
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_eq!(req.parameter("none"), None);
    }

    #[test]
    fn test_response() {
        let mut res = BasicResponseAdapter::new();
        res.set_content_type(Some("text/plain"));
        res.set_header("X-Test", "1");
        res.set_header("x-test", "2");
        res.writer().write_str("hello").unwrap();
        res.redirect("/login");
        assert_eq!(res.body(), "hello");
        assert_eq!(res.header("X-TEST"), Some("2"));
        assert_eq!(res.header("Location"), Some("/login"));
        assert_eq!(res.redirected(), Some("/login"));
        assert_eq!(res.headers().len(), 2);
    }
}
