//
// response/template.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use tracing::debug;

use crate::activity::{ActivityContext, ItemEvaluator, ResultValueMap};
use crate::error::{ActivityError, BoxError};
use crate::parsing::BeanReference;
use crate::rule::{tokenize, TemplateRule, TemplateSource};

const FILE_URL_PREFIX: &str = "file://";

// ---------------------------------------------------------------------
/// Path of an external template source: files and resources are
/// resolved against the base path; only "file://" URLs are supported.
///
fn source_path(source: &TemplateSource, context: &ActivityContext) -> Result<Option<PathBuf>, BoxError> {
    return match source {
        TemplateSource::Inline => Ok(None),
        TemplateSource::File(name) | TemplateSource::Resource(name) => Ok(Some(context.resolve_path(name))),
        TemplateSource::Url(url) => match url.strip_prefix(FILE_URL_PREFIX) {
            Some(path) => Ok(Some(PathBuf::from(path))),
            None => Err(format!("Unsupported template URL: {}", url).into()),
        },
    };
}

// ---------------------------------------------------------------------
/// Reads the text of an external template, with the time it was last
/// modified.  Inline templates yield their content and no time.
///
pub fn read_template_source(rule: &TemplateRule, context: &ActivityContext)
        -> Result<(String, Option<SystemTime>), BoxError> {
    let path = match source_path(&rule.source, context)? {
        Some(path) => path,
        None => return Ok((String::from(rule.content().unwrap_or("")), None)),
    };
    let text = fs::read_to_string(&path)
            .map_err(|e| format!("Error reading {}: {}", path.display(), e))?;
    let modified = fs::metadata(&path).and_then(|m| m.modified()).ok();
    debug!("template loaded from {}", path.display());
    return Ok((text, modified));
}

/// Whether the external template of 'rule' must be read again: it
/// is a file that changed since 'loaded_at'.  Resources and URLs are
/// read once.
///
pub(crate) fn is_template_stale(rule: &TemplateRule, context: &ActivityContext,
        loaded_at: Option<SystemTime>) -> bool {
    if rule.no_cache {
        return true;
    }
    let name = match rule.source {
        TemplateSource::File(ref name) => name,
        _ => return false,
    };
    let modified = fs::metadata(context.resolve_path(name)).and_then(|m| m.modified()).ok();
    return match (modified, loaded_at) {
        (Some(m), Some(l)) => m > l,
        _ => true,
    };
}

// =====================================================================
/// Renders a template rule into text.
///
pub trait TemplateRenderer: fmt::Debug + Send + Sync {
    fn render(&self, rule: &TemplateRule, evaluator: &ItemEvaluator,
            out: &mut dyn fmt::Write) -> Result<(), ActivityError>;
}

// ---------------------------------------------------------------------
//
#[derive(Debug, Clone)]
struct CachedTemplate {
    text: Arc<String>,
    loaded_at: Option<SystemTime>,
}

// =====================================================================
/// The builtin renderer.
///
/// A template of the builtin engine is token text: its `${...}`,
/// `@{...}`, `#{...}` and `%{...}` references are evaluated and
/// concatenated.  A template naming another engine is handed to that
/// engine bean, with the activity's results and attributes as model.
///
/// External texts are cached by source; a file is read again when it
/// changes.
///
#[derive(Debug, Default)]
pub struct TokenTemplateRenderer {
    cache: Mutex<HashMap<String, CachedTemplate>>,
}

impl TokenTemplateRenderer {
    pub fn new() -> TokenTemplateRenderer {
        return TokenTemplateRenderer::default();
    }

    fn template_text(&self, rule: &TemplateRule, context: &ActivityContext)
            -> Result<Arc<String>, BoxError> {
        if ! rule.is_external() {
            return Ok(Arc::new(String::from(rule.content().unwrap_or(""))));
        }
        let key = rule.to_string();
        {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(cached) = cache.get(&key) {
                if ! is_template_stale(rule, context, cached.loaded_at) {
                    return Ok(Arc::clone(&cached.text));
                }
            }
        }
        let (text, loaded_at) = read_template_source(rule, context)?;
        let text = Arc::new(text);
        if ! rule.no_cache {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            cache.insert(key, CachedTemplate {
                text: Arc::clone(&text),
                loaded_at,
            });
        }
        return Ok(text);
    }
}

impl TemplateRenderer for TokenTemplateRenderer {
    fn render(&self, rule: &TemplateRule, evaluator: &ItemEvaluator,
            out: &mut dyn fmt::Write) -> Result<(), ActivityError> {
        let template_error = |e: BoxError| ActivityError::Template {
            template: rule.to_string(),
            source: e,
        };
        let context = evaluator.context();
        let text = self.template_text(rule, context).map_err(template_error)?;

        let engine_id = match rule.engine {
            Some(ref engine) if ! rule.is_builtin() => engine,
            _ => {
                let tokens = tokenize(&text, false);
                let rendered = evaluator.evaluate_as_string(&tokens)?.unwrap_or_default();
                out.write_str(&rendered).map_err(|e| template_error(e.into()))?;
                return Ok(());
            },
        };

        let bean = context.bean_registry().get_bean(&BeanReference::parse(engine_id), evaluator)?;
        let engine = bean.as_template_engine()
                .ok_or_else(|| template_error(format!("Bean '{}' is not a template engine", engine_id).into()))?;
        let model = evaluator.activity()
                .map(|a| a.template_model())
                .unwrap_or_else(ResultValueMap::new);
        let content = if rule.is_external() || rule.content().is_some() {
            Some(text.as_str())
        } else {
            None
        };
        engine.process(rule.name.as_deref(), content, &model, out).map_err(template_error)?;
        return Ok(());
    }
}
