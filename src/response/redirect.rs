//
// response/redirect.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

use tracing::debug;

use crate::activity::{CoreActivity, ResultValue};
use crate::error::ActivityError;
use crate::response::{apply_content_type, apply_encoding, Response};
use crate::rule::{RedirectRule, ResponseType};

// =====================================================================
/// Sends the client to the evaluated path, with the redirect
/// parameters appended as a query string.
///
#[derive(Debug)]
pub struct RedirectResponse {
    rule: RedirectRule,
}

impl RedirectResponse {
    pub fn new(rule: RedirectRule) -> RedirectResponse {
        return RedirectResponse { rule };
    }

    fn location(&self, activity: &CoreActivity) -> Result<String, ActivityError> {
        let evaluator = activity.evaluator();
        let mut location = evaluator.evaluate_as_string(self.rule.path_tokens())?
                .unwrap_or_default();
        let params = match self.rule.parameters {
            Some(ref irm) => evaluator.evaluate_item_rule_map(irm)?,
            None => return Ok(location),
        };
        let mut delimiter = if location.contains('?') { '&' } else { '?' };
        for (name, value) in params.iter() {
            let values: Vec<String> = match value {
                ResultValue::Null if self.rule.exclude_null_parameters => continue,
                ResultValue::Null => vec![String::new()],
                ResultValue::List(list) => list.iter()
                        .filter(|v| ! (v.is_null() && self.rule.exclude_null_parameters))
                        .map(|v| if v.is_null() { String::new() } else { v.to_string() })
                        .collect(),
                v => vec![v.to_string()],
            };
            for v in values.iter() {
                location.push(delimiter);
                location += &encode_uri_component(name);
                location.push('=');
                location += &encode_uri_component(v);
                delimiter = '&';
            }
        }
        return Ok(location);
    }
}

// ---------------------------------------------------------------------
// Percent-encodes everything but the unreserved characters.
//
fn encode_uri_component(s: &str) -> String {
    let mut encoded = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A' ..= b'Z' | b'a' ..= b'z' | b'0' ..= b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(b as char);
            },
            _ => encoded += &format!("%{:02X}", b),
        }
    }
    return encoded;
}

impl fmt::Display for RedirectResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.rule)
    }
}

impl Response for RedirectResponse {
    fn response_type(&self) -> ResponseType {
        return ResponseType::Redirect;
    }

    fn content_type(&self) -> Option<&str> {
        return self.rule.content_type.as_deref();
    }

    fn is_default(&self) -> bool {
        return self.rule.default;
    }

    fn commit(&self, activity: &mut CoreActivity) -> Result<(), ActivityError> {
        let location = self.location(activity)?;
        debug!("redirect to {}", location);
        apply_content_type(activity, self.rule.content_type.as_deref(), None);
        apply_encoding(activity, self.rule.encoding.as_deref());
        activity.response_mut().redirect(&location);
        return Ok(());
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encode_uri_component() {
        let test_specs = [
            ( "abc-1_2.3~", "abc-1_2.3~" ),
            ( "a b&c=d", "a%20b%26c%3Dd" ),
            ( "한", "%ED%95%9C" ),
        ];
        for (s, guess) in test_specs.iter() {
            assert_eq!(encode_uri_component(s), *guess);
        }
    }
}
