//
// activity/result.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use serde::ser::{Serialize, Serializer};

use crate::activity::value::{ResultValue, ResultValueMap};

/// Separates the parts of a dotted action id.
pub const ACTION_ID_SEPARATOR: char = '.';

// =====================================================================
/// The value one action produced.
///
/// A dotted id is split: the first part becomes the action id and the
/// rest nests the value in single-entry maps, so "user.name" gives
/// the action "user" the value `{name=...}`.
///
/// ```
/// use aspectran::activity::{ActionResult, ResultValue};
/// let mut ar = ActionResult::new();
/// ar.set_result_value(Some("user.address.city"), ResultValue::from("Seoul"));
/// assert_eq!(ar.action_id(), Some("user"));
/// assert_eq!(ar.result_value().to_string(), "{address={city=Seoul}}");
/// ```
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionResult {
    action_id: Option<String>,
    result_value: ResultValue,
}

impl ActionResult {
    pub fn new() -> ActionResult {
        return ActionResult::default();
    }

    pub fn action_id(&self) -> Option<&str> {
        return self.action_id.as_deref();
    }

    pub fn result_value(&self) -> &ResultValue {
        return &self.result_value;
    }

    pub fn into_result_value(self) -> ResultValue {
        return self.result_value;
    }

    // -----------------------------------------------------------------
    /// Sets the value of the action 'action_id'; see above for dotted
    /// ids.  Empty parts of a dotted id are ignored.
    ///
    pub fn set_result_value(&mut self, action_id: Option<&str>, value: ResultValue) {
        let ids: Vec<&str> = match action_id {
            Some(id) => id.split(ACTION_ID_SEPARATOR).filter(|s| ! s.is_empty()).collect(),
            None => vec!{},
        };
        if ids.is_empty() {
            self.action_id = None;
            self.result_value = value;
            return;
        }
        let mut value = value;
        for id in ids[1..].iter().rev() {
            let mut map = ResultValueMap::new();
            map.put(id, value);
            value = ResultValue::Map(map);
        }
        self.action_id = Some(String::from(ids[0]));
        self.result_value = value;
    }

    // -----------------------------------------------------------------
    /// The value at 'path' below this result's value.
    ///
    fn value_at(&self, path: &[&str]) -> Option<&ResultValue> {
        let mut value = &self.result_value;
        for name in path.iter() {
            value = value.as_map()?.get(name)?;
        }
        return Some(value);
    }
}

// =====================================================================
/// Results of the actions of one ActionList.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentResult {
    name: Option<String>,
    omittable: bool,
    explicit: bool,
    action_results: Vec<ActionResult>,
}

impl ContentResult {
    pub fn new(name: Option<&str>, omittable: bool) -> ContentResult {
        return ContentResult {
            name: name.map(String::from),
            omittable,
            explicit: false,
            action_results: vec!{},
        };
    }

    pub fn name(&self) -> Option<&str> {
        return self.name.as_deref();
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = name.map(String::from);
    }

    pub fn is_omittable(&self) -> bool {
        return self.omittable;
    }

    pub fn set_omittable(&mut self, omittable: bool) {
        self.omittable = omittable;
    }

    /// Whether the content was declared by a `<content>` element
    /// rather than made for actions placed directly in a translet.
    ///
    pub fn is_explicit(&self) -> bool {
        return self.explicit;
    }

    pub fn set_explicit(&mut self, explicit: bool) {
        self.explicit = explicit;
    }

    // -----------------------------------------------------------------
    /// Adds 'action_result'.  When a result with the same id is
    /// already present and both values are maps, the new top-level
    /// entries are put into it; a later key replaces the whole value.
    ///
    pub fn add_action_result(&mut self, action_result: ActionResult) {
        if let Some(id) = action_result.action_id().map(String::from) {
            if let ResultValue::Map(_) = action_result.result_value {
                let existing = self.action_results.iter_mut()
                        .rev()
                        .find(|ar| ar.action_id() == Some(id.as_str()) && ar.result_value.as_map().is_some());
                if let Some(existing) = existing {
                    if let (Some(target), ResultValue::Map(map)) =
                            (existing.result_value.as_map_mut(), action_result.result_value) {
                        target.merge(map);
                    }
                    return;
                }
            }
        }
        self.action_results.push(action_result);
    }

    /// Shorthand for an ActionResult made by set_result_value().
    ///
    pub fn put_result_value(&mut self, action_id: Option<&str>, value: ResultValue) {
        let mut ar = ActionResult::new();
        ar.set_result_value(action_id, value);
        self.add_action_result(ar);
    }

    // -----------------------------------------------------------------
    /// Adds the results of a nested process, prefixing their ids with
    /// 'parent_id'.  The content names of 'process_result' are not
    /// kept.
    ///
    pub fn add_process_result(&mut self, parent_id: Option<&str>, process_result: ProcessResult) {
        for cr in process_result.content_results.into_iter() {
            for ar in cr.action_results.into_iter() {
                let id = match (parent_id, ar.action_id.as_deref()) {
                    (Some(p), Some(c)) => Some(format!("{}{}{}", p, ACTION_ID_SEPARATOR, c)),
                    (Some(p), None) => Some(String::from(p)),
                    (None, Some(c)) => Some(String::from(c)),
                    (None, None) => None,
                };
                self.put_result_value(id.as_deref(), ar.result_value);
            }
        }
    }

    /// The most recent result of the action 'action_id'.
    ///
    pub fn action_result(&self, action_id: &str) -> Option<&ActionResult> {
        return self.action_results.iter().rev().find(|ar| ar.action_id() == Some(action_id));
    }

    pub fn action_results(&self) -> &[ActionResult] {
        return &self.action_results;
    }

    pub fn action_ids(&self) -> Vec<&str> {
        return self.action_results.iter().filter_map(|ar| ar.action_id()).collect();
    }

    pub fn len(&self) -> usize {
        return self.action_results.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.action_results.is_empty();
    }
}

// =====================================================================
/// Everything the content pipeline of one activity produced.
///
/// ```
/// use aspectran::activity::{ContentResult, ProcessResult, ResultValue};
/// let mut pr = ProcessResult::new(None, false);
/// let mut cr = ContentResult::new(None, false);
/// cr.put_result_value(Some("user.name"), ResultValue::from("kim"));
/// cr.put_result_value(Some("user.email"), ResultValue::from("kim@example.com"));
/// pr.add_content_result(cr);
/// assert_eq!(pr.get_result_value("user.email"), Some(&ResultValue::from("kim@example.com")));
/// assert_eq!(pr.get_result_value("user.phone"), None);
/// assert_eq!(pr.get_result_value("nobody.name"), None);
/// ```
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessResult {
    name: Option<String>,
    omittable: bool,
    content_results: Vec<ContentResult>,
}

impl ProcessResult {
    pub fn new(name: Option<&str>, omittable: bool) -> ProcessResult {
        return ProcessResult {
            name: name.map(String::from),
            omittable,
            content_results: vec!{},
        };
    }

    pub fn name(&self) -> Option<&str> {
        return self.name.as_deref();
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = name.map(String::from);
    }

    pub fn is_omittable(&self) -> bool {
        return self.omittable;
    }

    pub fn set_omittable(&mut self, omittable: bool) {
        self.omittable = omittable;
    }

    pub fn add_content_result(&mut self, content_result: ContentResult) {
        self.content_results.push(content_result);
    }

    pub fn content_results(&self) -> &[ContentResult] {
        return &self.content_results;
    }

    /// The most recent content named 'name'.
    ///
    pub fn content_result(&self, name: &str) -> Option<&ContentResult> {
        return self.find_content_result(name, false);
    }

    /// content_result(); with 'explicit', only a content declared by a
    /// `<content>` element is taken.
    ///
    pub fn find_content_result(&self, name: &str, explicit: bool) -> Option<&ContentResult> {
        return self.content_results.iter().rev()
                .find(|cr| cr.name() == Some(name) && (cr.is_explicit() || ! explicit));
    }

    pub fn last_content_result_mut(&mut self) -> Option<&mut ContentResult> {
        return self.content_results.last_mut();
    }

    // -----------------------------------------------------------------
    /// The most recent result of the action 'action_id', searching the
    /// contents from the last one.
    ///
    pub fn action_result(&self, action_id: &str) -> Option<&ActionResult> {
        return self.content_results.iter().rev().find_map(|cr| cr.action_result(action_id));
    }

    // -----------------------------------------------------------------
    /// The value at the dotted path 'path': an action id followed by
    /// map keys.  A path that leads nowhere gives None.
    ///
    pub fn get_result_value(&self, path: &str) -> Option<&ResultValue> {
        let ids: Vec<&str> = path.split(ACTION_ID_SEPARATOR).collect();
        if ids.iter().any(|id| id.is_empty()) {
            return None;
        }
        let ar = self.action_result(ids[0])?;
        return ar.value_at(&ids[1..]);
    }

    pub fn action_ids(&self) -> Vec<&str> {
        return self.content_results.iter().flat_map(|cr| cr.action_ids()).collect();
    }

    pub fn len(&self) -> usize {
        return self.content_results.len();
    }

    // -----------------------------------------------------------------
    /// Whether no action produced anything.
    ///
    pub fn is_empty(&self) -> bool {
        return self.content_results.iter().all(|cr| cr.is_empty());
    }

    // -----------------------------------------------------------------
    /// The results as one map, the form JSON and APON are written in:
    ///
    /// - a named content becomes an entry holding its own map;
    /// - the actions of an unnamed content are entries of the top map;
    /// - an action without id spreads the entries of its map value, a
    ///   value that is not a map is left out;
    /// - a later action with the same id replaces the value in place.
    ///
    pub fn to_value_map(&self) -> ResultValueMap {
        let mut top = ResultValueMap::new();
        for cr in self.content_results.iter() {
            match cr.name() {
                Some(name) => {
                    let mut sub = ResultValueMap::new();
                    put_action_results(&mut sub, cr);
                    top.put(name, ResultValue::Map(sub));
                },
                None => put_action_results(&mut top, cr),
            }
        }
        return top;
    }
}

fn put_action_results(map: &mut ResultValueMap, cr: &ContentResult) {
    for ar in cr.action_results.iter() {
        match ar.action_id() {
            Some(id) => map.put(id, ar.result_value.clone()),
            None => {
                if let Some(values) = ar.result_value.as_map() {
                    for (name, value) in values.iter() {
                        map.put(name, value.clone());
                    }
                }
            },
        }
    }
}

impl Serialize for ProcessResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        return self.to_value_map().serialize(serializer);
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use crate::apon::AponWriter;

    fn text(s: &str) -> ResultValue {
        return ResultValue::from(s);
    }

    #[test]
    fn test_dotted_round_trip() {
        let test_specs = [
            "action1",
            "action1.result1",
            "a.b.c.d",
        ];
        for path in test_specs.iter() {
            let mut cr = ContentResult::new(None, false);
            cr.put_result_value(Some(*path), text("v"));
            let mut pr = ProcessResult::new(None, false);
            pr.add_content_result(cr);
            assert_eq!(pr.get_result_value(path), Some(&text("v")), "{}", path);
        }
    }

    #[test]
    fn test_lookup_misses() {
        let mut cr = ContentResult::new(None, false);
        cr.put_result_value(Some("a"), text("scalar"));
        let mut pr = ProcessResult::new(None, false);
        pr.add_content_result(cr);
        let test_specs = [
            "a.b",
            "x",
            "a..b",
            "",
        ];
        for path in test_specs.iter() {
            assert_eq!(pr.get_result_value(path), None, "{}", path);
        }
    }

    #[test]
    fn test_merge_same_id() {
        let mut cr = ContentResult::new(None, false);
        cr.put_result_value(Some("user.name"), text("kim"));
        cr.put_result_value(Some("user.email"), text("kim@example.com"));
        cr.put_result_value(Some("user.name"), text("lee"));
        assert_eq!(cr.len(), 1);
        assert_eq!(cr.action_result("user").unwrap().result_value().to_string(),
            "{name=lee, email=kim@example.com}");
    }

    #[test]
    fn test_merge_replaces_top_level_keys() {
        let test_specs = [
            ( vec!["a.b.c", "a.b.d"], "{b={d=2}}" ),
            ( vec!["a.b", "a.c"], "{b=1, c=2}" ),
            ( vec!["a.b", "a.b.c"], "{b={c=2}}" ),
        ];
        for (ids, guess) in test_specs.iter() {
            let mut cr = ContentResult::new(None, false);
            for (i, id) in ids.iter().enumerate() {
                cr.put_result_value(Some(*id), text(&(i + 1).to_string()));
            }
            assert_eq!(cr.len(), 1, "{:?}", ids);
            assert_eq!(cr.action_result("a").unwrap().result_value().to_string(), *guess, "{:?}", ids);
        }
    }

    #[test]
    fn test_find_explicit_content() {
        let mut pr = ProcessResult::new(None, false);
        let mut declared = ContentResult::new(Some("main"), false);
        declared.set_explicit(true);
        declared.put_result_value(Some("x"), text("declared"));
        let mut implicit = ContentResult::new(Some("main"), false);
        implicit.put_result_value(Some("x"), text("implicit"));
        pr.add_content_result(declared);
        pr.add_content_result(implicit);

        let test_specs = [
            ( "main", false, Some("implicit") ),
            ( "main", true, Some("declared") ),
            ( "other", false, None ),
            ( "other", true, None ),
        ];
        for (name, explicit, guess) in test_specs.iter() {
            let found = pr.find_content_result(name, *explicit)
                    .and_then(|cr| cr.action_result("x"))
                    .map(|ar| ar.result_value().to_string());
            assert_eq!(found.as_deref(), *guess, "{} {}", name, explicit);
        }
    }

    #[test]
    fn test_most_recent_first() {
        let mut pr = ProcessResult::new(None, false);
        let mut cr1 = ContentResult::new(Some("c1"), false);
        cr1.put_result_value(Some("x"), text("first"));
        let mut cr2 = ContentResult::new(Some("c2"), false);
        cr2.put_result_value(Some("x"), text("second"));
        pr.add_content_result(cr1);
        pr.add_content_result(cr2);
        assert_eq!(pr.get_result_value("x"), Some(&text("second")));
        assert_eq!(pr.content_result("c1").unwrap().len(), 1);
        assert!(pr.find_content_result("c1", true).is_none());
        assert_eq!(pr.find_content_result("c1", false).unwrap().len(), 1);
        assert_eq!(pr.action_ids(), vec!["x", "x"]);
    }

    #[test]
    fn test_add_process_result() {
        let mut inner = ProcessResult::new(None, false);
        let mut icr = ContentResult::new(Some("ignored"), false);
        icr.put_result_value(Some("count"), ResultValue::Int(3));
        let mut spread = ResultValueMap::new();
        spread.put("k", "v");
        icr.put_result_value(None, ResultValue::Map(spread));
        inner.add_content_result(icr);

        let mut cr = ContentResult::new(None, false);
        cr.add_process_result(Some("sub"), inner);
        let mut pr = ProcessResult::new(None, false);
        pr.add_content_result(cr);
        assert_eq!(pr.get_result_value("sub.count"), Some(&ResultValue::Int(3)));
        assert_eq!(pr.get_result_value("sub.k"), Some(&text("v")));
        assert_eq!(pr.content_results()[0].len(), 1);
    }

    // Layouts as the APON writer prints them.
    #[test]
    fn test_value_map_layout() {
        let mut cr = ContentResult::new(None, false);
        cr.put_result_value(Some("action0"), text("value0"));
        cr.put_result_value(Some("action1.result1"), text("value1"));
        cr.put_result_value(Some("action1.result2"), text("value2"));
        cr.put_result_value(Some("action1"), text("value3"));
        let mut pr = ProcessResult::new(None, false);
        pr.add_content_result(cr);
        let apon = AponWriter::new().to_text(&pr.to_value_map().to_parameters());
        assert_eq!(apon, "action0: value0\naction1: value3\n");

        let mut pr = ProcessResult::new(None, false);
        for name in ["content1", "content2"].iter() {
            let mut cr = ContentResult::new(Some(*name), false);
            cr.put_result_value(Some("action1.result1"), text("value1"));
            cr.put_result_value(Some("action1.result2"), text("value2"));
            pr.add_content_result(cr);
        }
        let apon = AponWriter::new().to_text(&pr.to_value_map().to_parameters());
        assert_eq!(apon, "content1: {\n  action1: {\n    result1: value1\n    result2: value2\n  }\n}\n\
                          content2: {\n  action1: {\n    result1: value1\n    result2: value2\n  }\n}\n");

        let mut map = ResultValueMap::new();
        map.put("key1", "value1");
        map.put("key2", "value2");
        let mut cr = ContentResult::new(None, false);
        cr.put_result_value(None, ResultValue::Map(map));
        cr.put_result_value(None, text("dropped"));
        let mut pr = ProcessResult::new(None, false);
        pr.add_content_result(cr);
        assert_eq!(serde_json::to_string(&pr).unwrap(), r#"{"key1":"value1","key2":"value2"}"#);
    }

    #[test]
    fn test_is_empty() {
        let mut pr = ProcessResult::new(None, false);
        assert!(pr.is_empty());
        pr.add_content_result(ContentResult::new(None, false));
        assert!(pr.is_empty());
        pr.last_content_result_mut().unwrap().put_result_value(Some("a"), ResultValue::Null);
        assert!(! pr.is_empty());
    }
}
