//
// response/transform/json.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::debug;

use crate::activity::{CoreActivity, ResultValueMap};
use crate::error::{ActivityError, BoxError};
use crate::response::transform::{transform_error, write_body};
use crate::response::{apply_content_type, apply_encoding, Response};
use crate::rule::{ResponseType, TransformRule};

/// Request parameter naming the JSONP callback.
///
pub const CALLBACK_PARAM_NAME: &str = "callback";

/// Spaces per level of pretty JSON when the rule sets no indent size.
///
pub const DEFAULT_INDENT_SIZE: usize = 2;

// =====================================================================
/// Renders the ProcessResult as JSON; compact unless the rule asks
/// for pretty output.  With a "callback" parameter the JSON is wrapped
/// as a JSONP call.
///
#[derive(Debug)]
pub struct JsonTransformResponse {
    rule: TransformRule,
}

impl JsonTransformResponse {
    pub fn new(rule: TransformRule) -> JsonTransformResponse {
        return JsonTransformResponse { rule };
    }

    fn render(&self, activity: &CoreActivity) -> Result<String, BoxError> {
        let value = activity.process_result()
                .map(|pr| pr.to_value_map())
                .unwrap_or_else(ResultValueMap::new);
        let json = to_json(&value, &self.rule)?;
        return Ok(match activity.request().parameter(CALLBACK_PARAM_NAME) {
            Some(callback) => format!("{}({})", callback, json),
            None => json,
        });
    }
}

// ---------------------------------------------------------------------
/// 'value' as JSON: compact, or indented by the indent size of 'rule'
/// (DEFAULT_INDENT_SIZE when it has none).
///
pub fn to_json(value: &ResultValueMap, rule: &TransformRule) -> Result<String, BoxError> {
    if ! rule.is_pretty(false) {
        return Ok(serde_json::to_string(value)?);
    }
    let indent = " ".repeat(rule.indent_size.unwrap_or(DEFAULT_INDENT_SIZE));
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut buf: Vec<u8> = vec!{};
    let mut serializer = Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    return Ok(String::from_utf8(buf)?);
}

impl fmt::Display for JsonTransformResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.rule)
    }
}

impl Response for JsonTransformResponse {
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
        let body = self.render(activity).map_err(|e| transform_error(&self.rule, e))?;
        apply_content_type(activity, self.rule.content_type.as_deref(),
                Some(self.rule.transform_type.default_content_type()));
        apply_encoding(activity, self.rule.encoding.as_deref());
        return write_body(activity, &self.rule, &body);
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use crate::rule::TransformType;

    #[test]
    fn test_to_json() {
        let mut value = ResultValueMap::new();
        value.put("msg", "hi");
        let rule = |pretty: Option<bool>, indent_size: Option<usize>| {
            let mut rule = TransformRule::new(TransformType::Json);
            rule.pretty = pretty;
            rule.indent_size = indent_size;
            rule
        };
        let test_specs = [
            ( rule(None, None), "{\"msg\":\"hi\"}" ),
            ( rule(Some(false), Some(4)), "{\"msg\":\"hi\"}" ),
            ( rule(Some(true), None), "{\n  \"msg\": \"hi\"\n}" ),
            ( rule(None, Some(4)), "{\n    \"msg\": \"hi\"\n}" ),
            ( rule(Some(true), Some(1)), "{\n \"msg\": \"hi\"\n}" ),
        ];
        for (rule, guess) in test_specs.iter() {
            assert_eq!(to_json(&value, rule).unwrap(), *guess, "{:?}", rule);
        }
    }
}
