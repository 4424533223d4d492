//
// response/mod.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

//!
//! Responses: what an activity does with its ProcessResult once the
//! actions have run.
//!
//! A transform renders the result (JSON, XML, APON, text, XSL); a
//! dispatch hands it to a view dispatcher bean; a forward processes
//! another translet; a redirect sends the client elsewhere.
//!

mod dispatch;
mod forward;
mod redirect;
mod template;
pub mod transform;

use std::fmt;
use std::sync::Arc;

use crate::activity::CoreActivity;
use crate::error::ActivityError;
use crate::rule::{DispatchRule, ForwardRule, RedirectRule, ResponseType, TransformRule};

pub use self::dispatch::DispatchResponse;
pub use self::forward::ForwardResponse;
pub use self::redirect::RedirectResponse;
pub use self::template::{read_template_source, TemplateRenderer, TokenTemplateRenderer};

// =====================================================================
/// A response bound to a translet, an exception-thrown rule or an
/// aspect.  Responses are built once, at parse time, and shared.
///
pub trait Response: fmt::Debug + fmt::Display + Send + Sync {
    fn response_type(&self) -> ResponseType;

    /// Content type the rule declares, if any.
    ///
    fn content_type(&self) -> Option<&str>;

    fn is_default(&self) -> bool;

    fn commit(&self, activity: &mut CoreActivity) -> Result<(), ActivityError>;

    /// A copy rendering the view 'view_name', for translets made by a
    /// scan.  Only a dispatch has a view; the others give None.
    ///
    fn replicate_for_view(&self, _view_name: &str) -> Option<Arc<dyn Response>> {
        return None;
    }
}

// ---------------------------------------------------------------------
/// The response a transform rule describes.
///
pub fn transform_response(rule: TransformRule) -> Arc<dyn Response> {
    return transform::new_transform_response(rule);
}

pub fn dispatch_response(rule: DispatchRule) -> Arc<dyn Response> {
    return Arc::new(DispatchResponse::new(rule));
}

pub fn forward_response(rule: ForwardRule) -> Arc<dyn Response> {
    return Arc::new(ForwardResponse::new(rule));
}

pub fn redirect_response(rule: RedirectRule) -> Arc<dyn Response> {
    return Arc::new(RedirectResponse::new(rule));
}

// ---------------------------------------------------------------------
/// Sets the content type of the response: the one the rule gives,
/// else the one already on the adapter, else 'default'.
///
pub(crate) fn apply_content_type(activity: &mut CoreActivity, content_type: Option<&str>,
        default: Option<&str>) {
    let content_type = match content_type {
        Some(ct) => Some(String::from(ct)),
        None => activity.response().content_type()
                .or(default)
                .map(String::from),
    };
    if content_type.is_some() {
        activity.response_mut().set_content_type(content_type.as_deref());
    }
}

/// Sets the encoding of the response the same way; the fallback is
/// the encoding of the translet's response.  Returns the encoding in
/// effect.
///
pub(crate) fn apply_encoding(activity: &mut CoreActivity, encoding: Option<&str>) -> Option<String> {
    let encoding = match encoding {
        Some(enc) => Some(String::from(enc)),
        None => activity.response().encoding()
                .map(String::from)
                .or_else(|| activity.response_encoding()),
    };
    if encoding.is_some() {
        activity.response_mut().set_encoding(encoding.as_deref());
    }
    return encoding;
}
