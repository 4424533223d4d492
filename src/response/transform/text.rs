//
// response/transform/text.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

use tracing::debug;

use crate::activity::{CoreActivity, ProcessResult};
use crate::error::ActivityError;
use crate::response::transform::{transform_error, write_body};
use crate::response::{apply_content_type, apply_encoding, Response};
use crate::rule::{ResponseType, TransformRule};

// =====================================================================
/// Renders a template, or without one, the values of the action
/// results one per line.
///
#[derive(Debug)]
pub struct TextTransformResponse {
    rule: TransformRule,
}

impl TextTransformResponse {
    pub fn new(rule: TransformRule) -> TextTransformResponse {
        return TextTransformResponse { rule };
    }

    fn render(&self, activity: &CoreActivity) -> Result<String, ActivityError> {
        let context = activity.context();
        let template = match (self.rule.template.as_ref(), self.rule.template_id.as_deref()) {
            (Some(template), _) => template,
            (None, Some(id)) => context.template_rule(id)
                    .ok_or_else(|| transform_error(&self.rule, format!("No template named '{}'", id)))?,
            (None, None) => return Ok(join_values(activity.process_result())),
        };
        let mut out = String::new();
        let evaluator = activity.evaluator();
        context.template_renderer().render(template, &evaluator, &mut out)?;
        return Ok(out);
    }
}

// ---------------------------------------------------------------------
// Non-null action result values, one per line.
//
fn join_values(process_result: Option<&ProcessResult>) -> String {
    let pr = match process_result {
        Some(pr) => pr,
        None => return String::new(),
    };
    let values: Vec<String> = pr.content_results().iter()
            .flat_map(|c| c.action_results().iter())
            .map(|r| r.result_value())
            .filter(|v| ! v.is_null())
            .map(|v| v.to_string())
            .collect();
    return values.join("\n");
}

impl fmt::Display for TextTransformResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.rule)
    }
}

impl Response for TextTransformResponse {
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
        let body = self.render(activity)?;
        apply_content_type(activity, self.rule.content_type.as_deref(),
                Some(self.rule.transform_type.default_content_type()));
        apply_encoding(activity, self.rule.encoding.as_deref());
        return write_body(activity, &self.rule, &body);
    }
}
