//
// parser/bean.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::rc::Rc;

use crate::nodelet::{NodeletAdder, NodeletGroup};
use crate::parser::item::item_map;
use crate::parser::root::DescriptionNodeletAdder;
use crate::parser::{flag, parse_attr, RuleEntry, SharedContext};
use crate::rule::{BeanRule, ScopeType};

// =====================================================================
/// `<bean>` with its constructor arguments and properties.
///
pub(crate) struct BeanNodeletAdder {
    context: SharedContext,
}

impl BeanNodeletAdder {
    pub(crate) fn new(context: &SharedContext) -> BeanNodeletAdder {
        return BeanNodeletAdder { context: Rc::clone(context) };
    }
}

impl NodeletAdder<RuleEntry> for BeanNodeletAdder {
    fn add_to(&self, group: &NodeletGroup<RuleEntry>) {
        let bean = group.child("bean");
        let context = Rc::clone(&self.context);
        bean.nodelet(move |attrs, stack| {
            let class_name = attrs.get_text("class")
                    .map(|c| context.borrow().resolve_alias_type(&c));
            let scan_pattern = attrs.get_text("scan");
            if class_name.is_none() && scan_pattern.is_none() && attrs.get_text("factoryBean").is_none() {
                return Err(illegal_rule!("The <bean> element requires a class, scan or factoryBean attribute").into());
            }
            stack.push(BeanRule {
                id: attrs.get_text("id"),
                class_name,
                scan_pattern,
                mask_pattern: attrs.get_text("mask"),
                scope: parse_attr::<ScopeType>(attrs, "scope")?,
                factory_bean_id: attrs.get_text("factoryBean"),
                factory_method: attrs.get_text("factoryMethod"),
                init_method: attrs.get_text("initMethod"),
                destroy_method: attrs.get_text("destroyMethod"),
                lazy_init: flag(attrs, "lazyInit").unwrap_or(false),
                important: flag(attrs, "important").unwrap_or(false),
                ..BeanRule::default()
            });
            return Ok(());
        }).with(DescriptionNodeletAdder::new(&self.context));

        let context = Rc::clone(&self.context);
        bean.end_nodelet(move |_, stack| {
            let rule: BeanRule = stack.pop()?;
            let mut ctx = context.borrow_mut();
            ctx.resolve_bean_class(&rule)?;
            ctx.resolve_factory_bean_class(&rule)?;
            ctx.add_bean_rule(rule)?;
            return Ok(());
        });

        let context = Rc::clone(&self.context);
        item_map(&bean.child("arguments"), &self.context, move |stack, irm| {
            let rule = stack.peek_mut::<BeanRule>()?;
            rule.arguments = Some(context.borrow().profiling_item_rule_map(irm, rule.arguments.take()));
            return Ok(());
        });
        let context = Rc::clone(&self.context);
        item_map(&bean.child("properties"), &self.context, move |stack, irm| {
            let rule = stack.peek_mut::<BeanRule>()?;
            rule.properties = Some(context.borrow().profiling_item_rule_map(irm, rule.properties.take()));
            return Ok(());
        });
    }
}
