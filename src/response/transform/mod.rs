//
// response/transform/mod.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

//!
//! Transform responses: the ProcessResult rendered in one format.
//!
//! Content type and encoding follow one priority: the value the
//! transform rule gives, then the value already on the response
//! adapter, then the default of the transform type.
//!

mod apon;
mod json;
mod text;
mod xml;
mod xsl;

use std::fmt::Write;
use std::sync::Arc;

use crate::activity::CoreActivity;
use crate::error::{ActivityError, BoxError, TransformResponseError};
use crate::response::Response;
use crate::rule::{TransformRule, TransformType};

pub use self::apon::AponTransformResponse;
pub use self::json::{to_json, JsonTransformResponse, CALLBACK_PARAM_NAME, DEFAULT_INDENT_SIZE};
pub use self::text::TextTransformResponse;
pub use self::xml::{process_result_document, XmlTransformResponse};
pub use self::xsl::XslTransformResponse;

pub(crate) fn new_transform_response(rule: TransformRule) -> Arc<dyn Response> {
    return match rule.transform_type {
        TransformType::Json => Arc::new(JsonTransformResponse::new(rule)),
        TransformType::Xml => Arc::new(XmlTransformResponse::new(rule)),
        TransformType::Apon => Arc::new(AponTransformResponse::new(rule)),
        TransformType::Text => Arc::new(TextTransformResponse::new(rule)),
        TransformType::Xsl => Arc::new(XslTransformResponse::new(rule)),
    };
}

// ---------------------------------------------------------------------
// Writes the rendered body to the response.
//
fn write_body(activity: &mut CoreActivity, rule: &TransformRule, body: &str)
        -> Result<(), ActivityError> {
    activity.response_mut().writer().write_str(body)
            .map_err(|e| TransformResponseError::new(rule, e))?;
    return Ok(());
}

fn transform_error<E: Into<BoxError>>(rule: &TransformRule, source: E) -> ActivityError {
    return ActivityError::Response(TransformResponseError::new(rule, source));
}
