//
// parser/template.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::rc::Rc;

use crate::nodelet::{NodeletAdder, NodeletGroup};
use crate::parser::{flag, parse_attr, RuleEntry, SharedContext};
use crate::rule::{TemplateRule, TextStyleType};

// =====================================================================
/// A top-level `<template>`, which transforms refer to by id.
///
pub(crate) struct TemplateNodeletAdder {
    context: SharedContext,
}

impl TemplateNodeletAdder {
    pub(crate) fn new(context: &SharedContext) -> TemplateNodeletAdder {
        return TemplateNodeletAdder { context: Rc::clone(context) };
    }
}

impl NodeletAdder<RuleEntry> for TemplateNodeletAdder {
    fn add_to(&self, group: &NodeletGroup<RuleEntry>) {
        let context = Rc::clone(&self.context);
        group.child("template").nodelet(|attrs, stack| {
            let id = attrs.get_text("id");
            if id.is_none() {
                return Err(illegal_rule!("A top-level <template> requires an id attribute").into());
            }
            let mut rule = TemplateRule::new(id, attrs.get_text("file"),
                    attrs.get_text("resource"), attrs.get_text("url"))?;
            rule.engine = attrs.get_text("engine");
            rule.name = attrs.get_text("name");
            rule.style = parse_attr::<TextStyleType>(attrs, "style")?;
            rule.encoding = attrs.get_text("encoding");
            rule.no_cache = flag(attrs, "noCache").unwrap_or(false);
            stack.push(rule);
            return Ok(());
        }).end_nodelet(move |text, stack| {
            let mut rule: TemplateRule = stack.pop()?;
            rule.set_content(text);
            let mut ctx = context.borrow_mut();
            ctx.prepare_template_rule(&mut rule);
            ctx.resolve_template_bean_class(&rule)?;
            ctx.add_template_rule(rule)?;
            return Ok(());
        });
    }
}
