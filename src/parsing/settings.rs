//
// parsing/settings.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use crate::rule::DefaultSettingType;

/// Separates the prefix from the suffix in a translet name pattern.
///
pub const PREFIX_SUFFIX_SEPARATOR: char = '*';

// =====================================================================
/// Settings declared by `<settings>` that shape the rules parsed after
/// them.
///
/// ```
/// use aspectran::parsing::DefaultSettings;
/// use aspectran::rule::DefaultSettingType;
/// let mut ds = DefaultSettings::new();
/// ds.apply(&[(DefaultSettingType::TransletNamePattern, String::from("/app/*.do"))]);
/// assert_eq!(ds.translet_name_prefix(), Some("/app/"));
/// assert_eq!(ds.translet_name_suffix(), Some(".do"));
/// ```
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultSettings {
    translet_name_pattern: Option<String>,
    translet_name_prefix: Option<String>,
    translet_name_suffix: Option<String>,
    bean_proxifier: Option<String>,
    pointcut_pattern_verifiable: Option<bool>,
    default_template_engine_bean: Option<String>,
    default_scheduler_bean: Option<String>,
}

impl DefaultSettings {
    pub fn new() -> DefaultSettings {
        return DefaultSettings::default();
    }

    pub fn translet_name_pattern(&self) -> Option<&str> {
        return self.translet_name_pattern.as_deref();
    }

    // -----------------------------------------------------------------
    /// Sets "prefix*suffix".  A pattern without '*' is kept as is and
    /// leaves the prefix and suffix untouched.
    ///
    pub fn set_translet_name_pattern(&mut self, pattern: &str) {
        self.translet_name_pattern = Some(String::from(pattern));
        if let Some((prefix, suffix)) = split_prefix_suffix(pattern) {
            self.translet_name_prefix = prefix;
            self.translet_name_suffix = suffix;
        }
    }

    fn set_prefix_and_suffix(&mut self, prefix: &str, suffix: &str) {
        self.translet_name_pattern = Some(format!("{}{}{}", prefix, PREFIX_SUFFIX_SEPARATOR, suffix));
        self.translet_name_prefix = Some(String::from(prefix));
        self.translet_name_suffix = Some(String::from(suffix));
    }

    pub fn translet_name_prefix(&self) -> Option<&str> {
        return self.translet_name_prefix.as_deref();
    }

    pub fn set_translet_name_prefix(&mut self, prefix: &str) {
        match self.translet_name_suffix.clone() {
            Some(suffix) => self.set_prefix_and_suffix(prefix, &suffix),
            None => self.translet_name_prefix = Some(String::from(prefix)),
        }
    }

    pub fn translet_name_suffix(&self) -> Option<&str> {
        return self.translet_name_suffix.as_deref();
    }

    pub fn set_translet_name_suffix(&mut self, suffix: &str) {
        match self.translet_name_prefix.clone() {
            Some(prefix) => self.set_prefix_and_suffix(&prefix, suffix),
            None => self.translet_name_suffix = Some(String::from(suffix)),
        }
    }

    pub fn bean_proxifier(&self) -> Option<&str> {
        return self.bean_proxifier.as_deref();
    }

    /// True unless explicitly turned off.
    ///
    pub fn is_pointcut_pattern_verifiable(&self) -> bool {
        return self.pointcut_pattern_verifiable.unwrap_or(true);
    }

    pub fn default_template_engine_bean(&self) -> Option<&str> {
        return self.default_template_engine_bean.as_deref();
    }

    pub fn default_scheduler_bean(&self) -> Option<&str> {
        return self.default_scheduler_bean.as_deref();
    }

    // -----------------------------------------------------------------
    /// Applies collected `<setting>` values in declaration order.
    ///
    pub fn apply(&mut self, settings: &[(DefaultSettingType, String)]) {
        for (setting_type, value) in settings.iter() {
            match setting_type {
                DefaultSettingType::TransletNamePattern => self.set_translet_name_pattern(value),
                DefaultSettingType::TransletNamePrefix => self.set_translet_name_prefix(value),
                DefaultSettingType::TransletNameSuffix => self.set_translet_name_suffix(value),
                DefaultSettingType::BeanProxifier =>
                        self.bean_proxifier = Some(value.clone()),
                DefaultSettingType::PointcutPatternVerifiable =>
                        self.pointcut_pattern_verifiable = Some(value.trim() != "false"),
                DefaultSettingType::DefaultTemplateEngineBean =>
                        self.default_template_engine_bean = Some(value.clone()),
                DefaultSettingType::DefaultSchedulerBean =>
                        self.default_scheduler_bean = Some(value.clone()),
            }
        }
    }
}

// ---------------------------------------------------------------------
/// Splits "prefix*suffix" at the first '*'.  Empty sides are None.
///
pub fn split_prefix_suffix(pattern: &str) -> Option<(Option<String>, Option<String>)> {
    let pos = pattern.find(PREFIX_SUFFIX_SEPARATOR)?;
    let side = |s: &str| if s.is_empty() { None } else { Some(String::from(s)) };
    return Some((side(&pattern[..pos]), side(&pattern[pos + 1..])));
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split_prefix_suffix() {
        let test_specs = [
            ( "/app/*.do", Some((Some("/app/"), Some(".do"))) ),
            ( "*.do", Some((None, Some(".do"))) ),
            ( "/app/*", Some((Some("/app/"), None)) ),
            ( "/app", None ),
        ];
        for (pattern, guess) in test_specs.iter() {
            let result = split_prefix_suffix(pattern);
            let result = result.as_ref().map(|(p, s)| (p.as_deref(), s.as_deref()));
            assert_eq!(result, *guess, "{}", pattern);
        }
    }

    #[test]
    fn test_prefix_then_suffix() {
        let mut ds = DefaultSettings::new();
        ds.set_translet_name_prefix("/a/");
        assert_eq!(ds.translet_name_pattern(), None);
        ds.set_translet_name_suffix(".json");
        assert_eq!(ds.translet_name_pattern(), Some("/a/*.json"));
    }

    #[test]
    fn test_apply() {
        let mut ds = DefaultSettings::new();
        assert!(ds.is_pointcut_pattern_verifiable());
        ds.apply(&[
            (DefaultSettingType::PointcutPatternVerifiable, String::from("false")),
            (DefaultSettingType::DefaultTemplateEngineBean, String::from("engine")),
            (DefaultSettingType::BeanProxifier, String::from("javassist")),
        ]);
        assert!(! ds.is_pointcut_pattern_verifiable());
        assert_eq!(ds.default_template_engine_bean(), Some("engine"));
        assert_eq!(ds.bean_proxifier(), Some("javassist"));
        assert_eq!(ds.default_scheduler_bean(), None);
    }
}
