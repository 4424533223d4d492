//
// rule/mod.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

//!
//! The rule model: what a configuration document declares.
//!
//! Rules are plain data built by the parser and frozen into an
//! ActivityContext.  Values that are evaluated per request (item
//! values, redirect paths, translet names with path variables) are
//! kept as token lists.
//!

mod action;
mod aspect;
mod bean;
mod description;
mod environment;
mod exception;
mod item;
mod response;
mod schedule;
mod template;
mod token;
mod translet;
mod types;

pub use self::action::{
    split_bean_reference, ActionList, ActionRule, BeanActionRule, ContentList,
    EchoActionRule, HeaderActionRule, IncludeActionRule,
};
pub use self::aspect::{
    AspectAdviceRule, AspectRule, JoinpointRule, JoinpointTarget,
    PointcutPatternRule, PointcutRule,
};
pub use self::bean::BeanRule;
pub use self::description::{styling, DescriptionRule};
pub use self::environment::EnvironmentRule;
pub use self::exception::{ExceptionRule, ExceptionThrownRule};
pub use self::item::{ItemRule, ItemRuleMap, ItemValue};
pub use self::response::{DispatchRule, ForwardRule, RedirectRule, ResponseRule, TransformRule};
pub use self::schedule::{ScheduleRule, ScheduledJobRule, TriggerRule};
pub use self::template::{TemplateRule, TemplateSource, BUILTIN_ENGINE};
pub use self::token::{has_tokens, tokenize, tokens_to_string, Token, TokenType, CLASS_DIRECTIVE_PREFIX};
pub use self::translet::{FileItemRule, RequestRule, TransletRule};
pub use self::types::{
    AspectAdviceType, DefaultSettingType, ItemType, ItemValueType, JoinpointTargetType, MethodType,
    PointcutType, ResponseType, ScopeType, TextStyleType, TransformType, TriggerType,
};
