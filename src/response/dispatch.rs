//
// response/dispatch.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::activity::CoreActivity;
use crate::error::{ActivityError, BoxError};
use crate::parsing::BeanReference;
use crate::response::{apply_content_type, apply_encoding, Response};
use crate::rule::{DispatchRule, ResponseType};

// =====================================================================
/// Hands the results and attributes of the activity to a view
/// dispatcher bean, which writes the response for the named view.
///
#[derive(Debug)]
pub struct DispatchResponse {
    rule: DispatchRule,
}

impl DispatchResponse {
    pub fn new(rule: DispatchRule) -> DispatchResponse {
        return DispatchResponse { rule };
    }

    fn dispatch_error<E: Into<BoxError>>(&self, source: E) -> ActivityError {
        return ActivityError::Dispatch {
            view: self.rule.name.clone(),
            source: source.into(),
        };
    }
}

impl fmt::Display for DispatchResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.rule)
    }
}

impl Response for DispatchResponse {
    fn response_type(&self) -> ResponseType {
        return ResponseType::Dispatch;
    }

    fn content_type(&self) -> Option<&str> {
        return self.rule.content_type.as_deref();
    }

    fn is_default(&self) -> bool {
        return self.rule.default;
    }

    fn commit(&self, activity: &mut CoreActivity) -> Result<(), ActivityError> {
        debug!("response {}", self.rule);
        let dispatcher_id = self.rule.dispatcher.as_deref()
                .ok_or_else(|| self.dispatch_error("No view dispatcher specified"))?;
        let bean = {
            let evaluator = activity.evaluator();
            activity.context().bean_registry()
                    .get_bean(&BeanReference::parse(dispatcher_id), &evaluator)?
        };
        let dispatcher = bean.as_view_dispatcher()
                .ok_or_else(|| self.dispatch_error(format!("Bean '{}' is not a view dispatcher", dispatcher_id)))?;

        apply_content_type(activity, self.rule.content_type.as_deref(), None);
        apply_encoding(activity, self.rule.encoding.as_deref());
        let model = activity.template_model();
        dispatcher.dispatch(&self.rule.name, &model, activity.response_mut())
                .map_err(|e| self.dispatch_error(e))?;
        return Ok(());
    }

    fn replicate_for_view(&self, view_name: &str) -> Option<Arc<dyn Response>> {
        let mut rule = self.rule.clone();
        rule.name = String::from(view_name);
        return Some(Arc::new(DispatchResponse::new(rule)));
    }
}
