//
// parsing/translet_registry.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{trace, warn};

use crate::error::IllegalRuleError;
use crate::parsing::settings::{split_prefix_suffix, DefaultSettings};
use crate::rule::{MethodType, ResponseRule, TransletRule};
use crate::wildcard::WildcardPattern;

/// Separates the segments of a translet name.
///
pub const TRANSLET_NAME_SEPARATOR: char = '/';

/// A response name starting with this is appended to the translet
/// name as an extension.
///
pub const TRANSLET_NAME_EXTENSION_DELIMITER: char = '.';

// =====================================================================
/// Translet rules by name.
///
/// A translet with allowed methods is keyed once per method as
/// "METHOD name".  Translets whose name is a pattern are also kept in
/// declaration order for matching.
///
#[derive(Debug, Default)]
pub struct TransletRuleRegistry {
    rules: Vec<TransletRule>,
    keys: HashMap<String, usize>,
    patterned: Vec<usize>,
}

impl TransletRuleRegistry {
    pub fn new() -> TransletRuleRegistry {
        return TransletRuleRegistry::default();
    }

    // -----------------------------------------------------------------
    /// Adds 'translet_rule'.  A translet with a scan path becomes one
    /// translet per file found under 'base_path'.
    ///
    pub fn add_translet_rule(&mut self, translet_rule: TransletRule,
            settings: Option<&DefaultSettings>, base_path: Option<&Path>)
            -> Result<(), IllegalRuleError> {
        let scan_path = match translet_rule.scan_path {
            Some(ref s) => s.clone(),
            None => return self.dissect(translet_rule, settings),
        };
        let base_path = base_path.unwrap_or_else(|| Path::new("."));
        let mask = translet_rule.mask_pattern.clone().unwrap_or_else(|| scan_path.clone());
        let mask = WildcardPattern::new(&mask, Some(TRANSLET_NAME_SEPARATOR))?;
        let files = scan_files(base_path, &scan_path)?;
        if files.is_empty() {
            warn!("No files found for translet scan path {}", scan_path);
        }
        let name_pattern = split_prefix_suffix(translet_rule.name());
        for file_path in files.into_iter() {
            let masked = mask.mask(&file_path).unwrap_or_else(|| file_path.clone());
            let name = match name_pattern {
                Some((ref prefix, ref suffix)) => format!("{}{}{}",
                        prefix.as_deref().unwrap_or(""), masked, suffix.as_deref().unwrap_or("")),
                None => format!("{}{}", translet_rule.name(), masked),
            };
            let mut rule = translet_rule.clone();
            rule.scan_path = None;
            rule.mask_pattern = None;
            rule.set_name(&name)?;
            replicate_responses(&mut rule, &file_path);
            self.dissect(rule, settings)?;
        }
        return Ok(());
    }

    // -----------------------------------------------------------------
    // One response: it is the translet's.  Several: each named one
    // makes a sub-translet, the unnamed one stays with the translet.
    //
    fn dissect(&mut self, mut translet_rule: TransletRule, settings: Option<&DefaultSettings>)
            -> Result<(), IllegalRuleError> {
        if translet_rule.request_rule.is_none() {
            translet_rule.request_rule = Some(Default::default());
        }
        let mut response_rules = translet_rule.take_response_rules();
        if response_rules.len() <= 1 {
            if let Some(rr) = response_rules.pop() {
                translet_rule.response_rule = Some(rr);
            }
            return self.save(translet_rule, settings);
        }

        let mut default_rule: Option<ResponseRule> = None;
        for rr in response_rules.into_iter() {
            match rr.name.clone().filter(|n| ! n.is_empty()) {
                Some(response_name) => {
                    let mut sub = translet_rule.clone();
                    sub.set_name(&sub_translet_name(translet_rule.name(), &response_name))?;
                    sub.response_rule = Some(rr);
                    self.save(sub, settings)?;
                },
                None => {
                    if let Some(ref dup) = default_rule {
                        warn!("Ignore duplicated default response rule {} of {}", dup, translet_rule);
                    }
                    default_rule = Some(rr);
                },
            }
        }
        if let Some(rr) = default_rule {
            translet_rule.response_rule = Some(rr);
            return self.save(translet_rule, settings);
        }
        return Ok(());
    }

    fn save(&mut self, mut translet_rule: TransletRule, settings: Option<&DefaultSettings>)
            -> Result<(), IllegalRuleError> {
        let name = apply_translet_name_pattern(translet_rule.name(), settings, false);
        translet_rule.set_name(&name)?;

        let index = self.rules.len();
        match translet_rule.allowed_methods {
            Some(ref methods) => {
                for method in methods.iter() {
                    self.keys.insert(make_key(&name, Some(*method)), index);
                }
            },
            None => {
                self.keys.insert(name.clone(), index);
            },
        }
        if translet_rule.name_pattern().is_some() {
            self.patterned.push(index);
        }
        trace!("add TransletRule {}", translet_rule);
        self.rules.push(translet_rule);
        return Ok(());
    }

    // -----------------------------------------------------------------
    /// The translet serving 'name' for 'method': an exact name first,
    /// then the patterns in declaration order.
    ///
    pub fn lookup(&self, name: &str, method: MethodType) -> Option<&TransletRule> {
        if let Some(&i) = self.keys.get(&make_key(name, Some(method))) {
            return Some(&self.rules[i]);
        }
        if let Some(&i) = self.keys.get(name) {
            return Some(&self.rules[i]);
        }
        return self.patterned.iter()
                .map(|&i| &self.rules[i])
                .find(|r| r.allows(method)
                        && r.name_pattern().map_or(false, |p| p.matches(name)));
    }

    /// Whether any translet is named 'name', whatever its methods.
    ///
    pub fn contains_name(&self, name: &str) -> bool {
        return self.rules.iter().any(|r| {
            r.name() == name || r.name_pattern().map_or(false, |p| p.matches(name))
        });
    }

    pub fn translet_rules(&self) -> &[TransletRule] {
        return &self.rules;
    }

    pub fn len(&self) -> usize {
        return self.rules.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.rules.is_empty();
    }
}

// ---------------------------------------------------------------------
/// "METHOD name", or the name alone.
///
pub fn make_key(name: &str, method: Option<MethodType>) -> String {
    return match method {
        Some(m) => format!("{} {}", m, name),
        None => String::from(name),
    };
}

// ---------------------------------------------------------------------
/// Name of the sub-translet for a named response: "name.ext" for
/// ".ext", "name/response" otherwise.
///
pub fn sub_translet_name(name: &str, response_name: &str) -> String {
    if response_name.starts_with(TRANSLET_NAME_EXTENSION_DELIMITER) {
        return format!("{}{}", name, response_name);
    }
    return format!("{}{}{}", name, TRANSLET_NAME_SEPARATOR, response_name);
}

// ---------------------------------------------------------------------
/// Adds the configured prefix and suffix to 'name'.
///
/// With 'absolutely', a name starting with '/' is taken as is;
/// otherwise its leading '/' gives way to the prefix.  Names are
/// unchanged when no prefix or suffix is configured.
///
pub fn apply_translet_name_pattern(name: &str, settings: Option<&DefaultSettings>,
        absolutely: bool) -> String {
    let settings = match settings {
        Some(s) => s,
        None => return String::from(name),
    };
    let prefix = settings.translet_name_prefix();
    let suffix = settings.translet_name_suffix();
    if prefix.is_none() && suffix.is_none() {
        return String::from(name);
    }
    let mut name = name;
    if name.starts_with(TRANSLET_NAME_SEPARATOR) {
        if absolutely {
            return String::from(name);
        }
        if prefix.is_some() {
            name = &name[1..];
        }
    }
    return format!("{}{}{}", prefix.unwrap_or(""), name, suffix.unwrap_or(""));
}

// ---------------------------------------------------------------------
// Dispatch responses of a scanned translet render the scanned file.
//
fn replicate_responses(translet_rule: &mut TransletRule, file_path: &str) {
    let replicate = |rr: &ResponseRule| -> ResponseRule {
        let mut rr = rr.clone();
        if let Some(response) = rr.response.as_ref().and_then(|r| r.replicate_for_view(file_path)) {
            rr.response = Some(response);
        }
        return rr;
    };
    let response_rules: Vec<ResponseRule> = translet_rule.take_response_rules()
            .iter().map(|rr| replicate(rr)).collect();
    for rr in response_rules.into_iter() {
        translet_rule.add_response_rule(rr);
    }
    if let Some(rr) = translet_rule.response_rule.take() {
        translet_rule.response_rule = Some(replicate(&rr));
    }
}

// ---------------------------------------------------------------------
// Files under 'base_path' whose "/relative/path" matches 'scan_path'.
//
fn scan_files(base_path: &Path, scan_path: &str) -> Result<Vec<String>, IllegalRuleError> {
    let pattern = WildcardPattern::new(scan_path, Some(TRANSLET_NAME_SEPARATOR))?;
    let fixed = match scan_path.find(|c| c == '*' || c == '?') {
        Some(pos) => match scan_path[..pos].rfind(TRANSLET_NAME_SEPARATOR) {
            Some(sep) => &scan_path[..sep],
            None => "",
        },
        None => scan_path,
    };
    let start = base_path.join(fixed.trim_start_matches(TRANSLET_NAME_SEPARATOR));
    let mut files: Vec<String> = vec!{};
    if start.is_dir() {
        walk(&start, base_path, &mut files)
                .map_err(|e| illegal_rule!("Failed to scan translets with {}: {}", scan_path, e))?;
    }
    files.retain(|f| pattern.matches(f));
    files.sort();
    return Ok(files);
}

fn walk(dir: &Path, base_path: &Path, files: &mut Vec<String>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, base_path, files)?;
        } else if let Ok(relative) = path.strip_prefix(base_path) {
            let segments: Vec<String> = relative.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
            files.push(format!("{}{}", TRANSLET_NAME_SEPARATOR, segments.join("/")));
        }
    }
    return Ok(());
}
