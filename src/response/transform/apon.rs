//
// response/transform/apon.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

use tracing::debug;

use crate::activity::CoreActivity;
use crate::apon::{AponWriter, Parameters};
use crate::error::ActivityError;
use crate::response::transform::write_body;
use crate::response::{apply_content_type, apply_encoding, Response};
use crate::rule::{ResponseType, TransformRule};

// =====================================================================
/// Renders the ProcessResult as an APON document, pretty unless the
/// rule says otherwise.
///
#[derive(Debug)]
pub struct AponTransformResponse {
    rule: TransformRule,
}

impl AponTransformResponse {
    pub fn new(rule: TransformRule) -> AponTransformResponse {
        return AponTransformResponse { rule };
    }

    fn render(&self, activity: &CoreActivity) -> String {
        let params = activity.process_result()
                .map(|pr| pr.to_value_map().to_parameters())
                .unwrap_or_else(Parameters::new);
        let mut writer = AponWriter::new().pretty(self.rule.is_pretty(true));
        if let Some(size) = self.rule.indent_size {
            writer = writer.indent_size(size);
        }
        return writer.to_text(&params);
    }
}

impl fmt::Display for AponTransformResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.rule)
    }
}

impl Response for AponTransformResponse {
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
        let body = self.render(activity);
        apply_content_type(activity, self.rule.content_type.as_deref(),
                Some(self.rule.transform_type.default_content_type()));
        apply_encoding(activity, self.rule.encoding.as_deref());
        return write_body(activity, &self.rule, &body);
    }
}
