//
// rule/description.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use crate::env::{EnvironmentProfiles, Profiles};
use crate::rule::types::TextStyleType;

// =====================================================================
/// Reformats 'text' according to 'style'.
///
/// - apon: keeps the part after '|' of each line that has one;
/// - compact: trims every line and squeezes runs of blank lines;
/// - compressed: trims every line and joins the non-blank ones with
///   a space.
///
/// ```
/// use aspectran::rule::{styling, TextStyleType};
/// assert_eq!(styling("  a\n\n\n  b  ", Some(TextStyleType::Compact)), "a\n\nb");
/// assert_eq!(styling("  a\n\n  b  ", Some(TextStyleType::Compressed)), "a b");
/// assert_eq!(styling("  |a\n  | b", Some(TextStyleType::Apon)), "a\n b");
/// ```
///
pub fn styling(text: &str, style: Option<TextStyleType>) -> String {
    return match style {
        None => String::from(text),
        Some(TextStyleType::Apon) => {
            text.lines()
                .filter_map(|line| line.trim_start().strip_prefix('|'))
                .collect::<Vec<&str>>()
                .join("\n")
        },
        Some(TextStyleType::Compact) => {
            let mut lines: Vec<&str> = vec!{};
            for line in text.lines().map(|l| l.trim()) {
                if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
                    continue;
                }
                lines.push(line);
            }
            while lines.last() == Some(&"") {
                lines.pop();
            }
            lines.join("\n")
        },
        Some(TextStyleType::Compressed) => {
            text.lines()
                .map(|l| l.trim())
                .filter(|l| ! l.is_empty())
                .collect::<Vec<&str>>()
                .join(" ")
        },
    };
}

// =====================================================================
/// Description of the whole configuration, a translet, an aspect or
/// a bean.  Profile-conditional descriptions are kept as candidates.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptionRule {
    profile: Option<Profiles>,
    style: Option<TextStyleType>,
    content: Option<String>,
    formatted_content: Option<String>,
    candidates: Vec<DescriptionRule>,
}

impl DescriptionRule {
    pub fn new(content: Option<&str>, style: Option<TextStyleType>) -> DescriptionRule {
        return DescriptionRule {
            profile: None,
            style,
            content: content.map(String::from),
            formatted_content: None,
            candidates: vec!{},
        };
    }

    pub fn profile(&self) -> Option<&Profiles> {
        return self.profile.as_ref();
    }

    pub fn set_profile(&mut self, profile: Option<Profiles>) {
        self.profile = profile;
    }

    pub fn style(&self) -> Option<TextStyleType> {
        return self.style;
    }

    pub fn content(&self) -> Option<&str> {
        return self.content.as_deref();
    }

    pub fn set_content(&mut self, content: Option<&str>) {
        self.content = content.map(String::from);
    }

    /// The content after styling, set once the rule is profiled.
    ///
    pub fn formatted_content(&self) -> Option<&str> {
        return self.formatted_content.as_deref();
    }

    pub fn candidates(&self) -> &[DescriptionRule] {
        return &self.candidates;
    }

    pub(crate) fn format(&mut self) {
        self.formatted_content = self.content.as_deref().map(|c| styling(c, self.style));
    }

    pub(crate) fn set_formatted_content(&mut self, formatted: Option<String>) {
        self.formatted_content = formatted;
    }

    pub(crate) fn take_candidates(&mut self) -> Vec<DescriptionRule> {
        return std::mem::take(&mut self.candidates);
    }

    pub(crate) fn set_candidates(&mut self, candidates: Vec<DescriptionRule>) {
        self.candidates = candidates;
    }

    pub fn add_candidate(&mut self, mut candidate: DescriptionRule) {
        candidate.candidates.clear();
        self.candidates.push(candidate);
    }

    // -----------------------------------------------------------------
    /// The text in effect under 'env'.  Without candidates it is the
    /// formatted content; otherwise the concatenation of the matching
    /// candidates.
    ///
    pub fn effective(&self, env: &EnvironmentProfiles) -> Option<String> {
        if self.candidates.is_empty() {
            return self.formatted_content.clone()
                    .or_else(|| self.content.as_deref().map(|c| styling(c, self.style)));
        }
        let mut text: Option<String> = None;
        for candidate in self.candidates.iter() {
            let accepted = match candidate.profile {
                Some(ref p) => env.matches(p),
                None => true,
            };
            if ! accepted {
                continue;
            }
            if let Some(c) = candidate.content.as_deref() {
                let formatted = styling(c, candidate.style);
                text = Some(match text {
                    Some(t) => t + &formatted,
                    None => formatted,
                });
            }
        }
        return text;
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_styling() {
        let test_specs = [
            ( "x", None, "x" ),
            ( "\n   first\n\n\n   second\n\n", Some(TextStyleType::Compact), "first\n\nsecond" ),
            ( "\n   first\n\n   second\n", Some(TextStyleType::Compressed), "first second" ),
            ( "ignored\n  |kept\n  |  indented", Some(TextStyleType::Apon), "kept\n  indented" ),
        ];
        for (text, style, guess) in test_specs.iter() {
            assert_eq!(styling(text, *style), *guess, "{:?}", style);
        }
    }

    #[test]
    fn test_effective_candidates() {
        let env = EnvironmentProfiles::new();
        let mut prod = DescriptionRule::new(Some("prod"), None);
        prod.set_profile(Some(Profiles::of("prod").unwrap()));
        let mut dr = DescriptionRule::new(Some("base;"), None);
        dr.format();
        assert_eq!(dr.effective(&env).as_deref(), Some("base;"));

        let base = dr.clone();
        dr.add_candidate(base);
        dr.add_candidate(prod);
        assert_eq!(dr.effective(&env).as_deref(), Some("base;"));
        env.set_active_profiles(&["prod"]).unwrap();
        assert_eq!(dr.effective(&env).as_deref(), Some("base;prod"));
    }
}
