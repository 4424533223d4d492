//
// response/transform/xsl.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use tracing::{debug, trace};

use crate::activity::{ActivityContext, CoreActivity};
use crate::error::ActivityError;
use crate::response::template::{is_template_stale, read_template_source};
use crate::response::transform::{process_result_document, transform_error, write_body};
use crate::response::{apply_content_type, apply_encoding, Response};
use crate::rule::{ResponseType, TemplateRule, TransformRule};
use crate::xslt::Stylesheet;

#[derive(Debug)]
struct LoadedStylesheet {
    stylesheet: Arc<Stylesheet>,
    loaded_at: Option<SystemTime>,
}

// =====================================================================
/// Applies an XSL stylesheet to the ProcessResult in its XML form.
///
/// The compiled stylesheet is kept until its file changes; a template
/// marked no-cache is compiled on every commit.
///
#[derive(Debug)]
pub struct XslTransformResponse {
    rule: TransformRule,
    cache: RwLock<Option<LoadedStylesheet>>,
}

impl XslTransformResponse {
    pub fn new(rule: TransformRule) -> XslTransformResponse {
        return XslTransformResponse {
            rule,
            cache: RwLock::new(None),
        };
    }

    fn template_rule<'c>(&'c self, context: &'c ActivityContext) -> Result<&'c TemplateRule, ActivityError> {
        return match (self.rule.template.as_ref(), self.rule.template_id.as_deref()) {
            (Some(template), _) => Ok(template),
            (None, Some(id)) => context.template_rule(id)
                    .ok_or_else(|| transform_error(&self.rule, format!("No template named '{}'", id))),
            (None, None) => Err(transform_error(&self.rule, "No specified template")),
        };
    }

    // -----------------------------------------------------------------
    // The compiled stylesheet; reloaded when stale.
    //
    fn stylesheet(&self, context: &ActivityContext) -> Result<Arc<Stylesheet>, ActivityError> {
        let template = self.template_rule(context)?;
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref loaded) = *cache {
                if ! is_template_stale(template, context, loaded.loaded_at) {
                    return Ok(Arc::clone(&loaded.stylesheet));
                }
            }
        }

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(ref loaded) = *cache {
            if ! is_template_stale(template, context, loaded.loaded_at) {
                return Ok(Arc::clone(&loaded.stylesheet));
            }
        }
        let (text, loaded_at) = read_template_source(template, context)
                .map_err(|e| transform_error(&self.rule, e))?;
        let stylesheet = Arc::new(Stylesheet::parse(&text)
                .map_err(|e| transform_error(&self.rule, e))?);
        debug!("stylesheet compiled: {}", template);
        if ! template.no_cache {
            *cache = Some(LoadedStylesheet {
                stylesheet: Arc::clone(&stylesheet),
                loaded_at,
            });
        }
        return Ok(stylesheet);
    }
}

impl fmt::Display for XslTransformResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.rule)
    }
}

impl Response for XslTransformResponse {
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
        let stylesheet = self.stylesheet(activity.context())?;
        let doc = process_result_document(activity.process_result());
        trace!("XSL input: {}", doc);
        let body = stylesheet.transform(&doc).map_err(|e| transform_error(&self.rule, e))?;

        let output = stylesheet.output();
        let content_type = self.rule.content_type.as_deref()
                .or_else(|| output.content_type());
        apply_content_type(activity, content_type,
                Some(self.rule.transform_type.default_content_type()));
        let encoding = output.encoding.as_deref().or(self.rule.encoding.as_deref());
        apply_encoding(activity, encoding);
        return write_body(activity, &self.rule, &body);
    }
}
