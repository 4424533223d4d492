//
// parsing/mod.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

//!
//! Rule parsing state: default settings and their scope, the rule
//! registries and the bean reference inspector, held together by the
//! RuleParsingContext.
//!

mod bean_registry;
mod context;
mod inspector;
mod registry;
mod scope;
mod settings;
mod translet_registry;

pub use self::bean_registry::BeanRuleRegistry;
pub use self::context::{ParsedRules, RuleParsingContext, RuleRegistries, RuleSet};
pub use self::inspector::{BeanReference, BeanReferenceInspector};
pub use self::registry::{
    apply_default_engine, AspectRuleRegistry, ScheduleRuleRegistry, TemplateRuleRegistry,
};
pub use self::scope::RuleParsingScope;
pub use self::settings::{split_prefix_suffix, DefaultSettings, PREFIX_SUFFIX_SEPARATOR};
pub use self::translet_registry::{
    apply_translet_name_pattern, make_key, sub_translet_name, TransletRuleRegistry,
    TRANSLET_NAME_EXTENSION_DELIMITER, TRANSLET_NAME_SEPARATOR,
};
