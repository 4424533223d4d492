//
// response/forward.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

use tracing::debug;

use crate::activity::CoreActivity;
use crate::error::ActivityError;
use crate::response::Response;
use crate::rule::{ForwardRule, ResponseType};

// =====================================================================
/// Processes another translet in the same request; its response is
/// the one the client gets.
///
#[derive(Debug)]
pub struct ForwardResponse {
    rule: ForwardRule,
}

impl ForwardResponse {
    pub fn new(rule: ForwardRule) -> ForwardResponse {
        return ForwardResponse { rule };
    }
}

impl fmt::Display for ForwardResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.rule)
    }
}

impl Response for ForwardResponse {
    fn response_type(&self) -> ResponseType {
        return ResponseType::Forward;
    }

    fn content_type(&self) -> Option<&str> {
        return self.rule.content_type.as_deref();
    }

    fn is_default(&self) -> bool {
        return self.rule.default;
    }

    fn commit(&self, activity: &mut CoreActivity) -> Result<(), ActivityError> {
        debug!("response {}", self.rule);
        return activity.forward(&self.rule);
    }
}
