//
// parser/action.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::rc::Rc;

use crate::nodelet::{HandlerResult, NodeletAdder, NodeletGroup, ObjectStack};
use crate::parser::item::{item_map, ItemNodeletAdder};
use crate::parser::{flag, required, RuleEntry, SharedContext};
use crate::rule::{
    ActionRule, BeanActionRule, EchoActionRule, HeaderActionRule, IncludeActionRule,
    ItemRuleMap, MethodType,
};

// =====================================================================
/// The action elements: `<action>`, `<echo>`, `<headers>` and
/// `<include>`.  A finished action goes to the action list, translet,
/// advice or thrown rule below it on the stack.
///
pub(crate) struct ActionNodeletAdder {
    context: SharedContext,
}

impl ActionNodeletAdder {
    pub(crate) fn new(context: &SharedContext) -> ActionNodeletAdder {
        return ActionNodeletAdder { context: Rc::clone(context) };
    }

    fn add_bean_action(&self, group: &NodeletGroup<RuleEntry>) {
        let action = group.child("action");
        let context = Rc::clone(&self.context);
        action.nodelet(|attrs, stack| {
            let method = required(attrs, "method", "action")?;
            let bean = attrs.get_text("bean");
            let mut rule = BeanActionRule::new(attrs.get_text("id"), bean.as_deref(), &method);
            rule.hidden = flag(attrs, "hidden").unwrap_or(false);
            stack.push(ActionRule::Bean(rule));
            return Ok(());
        }).end_nodelet(move |_, stack| {
            let action: ActionRule = stack.pop()?;
            if let ActionRule::Bean(ref rule) = action {
                context.borrow_mut().resolve_action_bean_class(rule)?;
            }
            return apply_action(stack, action);
        });

        let context = Rc::clone(&self.context);
        item_map(&action.child("arguments"), &self.context, move |stack, irm| {
            if let ActionRule::Bean(ref mut rule) = *stack.peek_mut::<ActionRule>()? {
                rule.arguments = Some(context.borrow().profiling_item_rule_map(irm, rule.arguments.take()));
            }
            return Ok(());
        });
        let context = Rc::clone(&self.context);
        item_map(&action.child("properties"), &self.context, move |stack, irm| {
            if let ActionRule::Bean(ref mut rule) = *stack.peek_mut::<ActionRule>()? {
                rule.properties = Some(context.borrow().profiling_item_rule_map(irm, rule.properties.take()));
            }
            return Ok(());
        });
    }

    // -----------------------------------------------------------------
    // <echo> and <headers> hold their items directly; the ItemRuleMap
    // sits on the action.
    //
    fn add_item_actions(&self, group: &NodeletGroup<RuleEntry>) {
        let context = Rc::clone(&self.context);
        group.child("echo").nodelet(|attrs, stack| {
            stack.push(ActionRule::Echo(EchoActionRule {
                action_id: attrs.get_text("id"),
                hidden: flag(attrs, "hidden").unwrap_or(false),
                items: None,
            }));
            stack.push(ItemRuleMap::new());
            return Ok(());
        }).with(ItemNodeletAdder::new(&self.context))
        .end_nodelet(move |text, stack| {
            let irm = finish_items(&context, stack, text)?;
            let mut action: ActionRule = stack.pop()?;
            if let ActionRule::Echo(ref mut rule) = action {
                rule.items = Some(irm);
            }
            return apply_action(stack, action);
        });

        let context = Rc::clone(&self.context);
        group.child("headers").nodelet(|attrs, stack| {
            stack.push(ActionRule::Header(HeaderActionRule {
                action_id: attrs.get_text("id"),
                hidden: flag(attrs, "hidden").unwrap_or(false),
                headers: ItemRuleMap::new(),
            }));
            stack.push(ItemRuleMap::new());
            return Ok(());
        }).with(ItemNodeletAdder::new(&self.context))
        .end_nodelet(move |text, stack| {
            let irm = finish_items(&context, stack, text)?;
            let mut action: ActionRule = stack.pop()?;
            if let ActionRule::Header(ref mut rule) = action {
                rule.headers = irm;
            }
            return apply_action(stack, action);
        });
    }

    fn add_include_action(&self, group: &NodeletGroup<RuleEntry>) {
        let include = group.child("include");
        let context = Rc::clone(&self.context);
        include.nodelet(move |attrs, stack| {
            let translet = required(attrs, "translet", "include")?;
            let method: Option<MethodType> = match attrs.get_text("method") {
                Some(m) => Some(m.to_uppercase().parse()?),
                None => None,
            };
            stack.push(ActionRule::Include(IncludeActionRule {
                action_id: attrs.get_text("id"),
                translet_name: context.borrow().apply_translet_name_pattern(&translet),
                method,
                hidden: flag(attrs, "hidden").unwrap_or(false),
                parameters: None,
                attributes: None,
            }));
            return Ok(());
        }).end_nodelet(|_, stack| {
            let action: ActionRule = stack.pop()?;
            return apply_action(stack, action);
        });

        item_map(&include.child("parameters"), &self.context, |stack, irm| {
            if let ActionRule::Include(ref mut rule) = *stack.peek_mut::<ActionRule>()? {
                rule.parameters = Some(irm);
            }
            return Ok(());
        });
        item_map(&include.child("attributes"), &self.context, |stack, irm| {
            if let ActionRule::Include(ref mut rule) = *stack.peek_mut::<ActionRule>()? {
                rule.attributes = Some(irm);
            }
            return Ok(());
        });
    }
}

impl NodeletAdder<RuleEntry> for ActionNodeletAdder {
    fn add_to(&self, group: &NodeletGroup<RuleEntry>) {
        self.add_bean_action(group);
        self.add_item_actions(group);
        self.add_include_action(group);
    }
}

// ---------------------------------------------------------------------
// Pops the items of an <echo> or <headers>, with those written as
// APON in its body.
//
fn finish_items(context: &SharedContext, stack: &mut ObjectStack<RuleEntry>,
        text: Option<&str>) -> Result<ItemRuleMap, crate::error::BoxError> {
    let mut irm: ItemRuleMap = stack.pop()?;
    if let Some(text) = text {
        irm.put_all(&ItemRuleMap::from_text(text)?);
    }
    context.borrow_mut().resolve_item_rule_map(&irm)?;
    return Ok(irm);
}

// ---------------------------------------------------------------------
/// Hands a finished action to its holder.  An advice block or a thrown
/// rule holds a single action.
///
pub(crate) fn apply_action(stack: &mut ObjectStack<RuleEntry>, action: ActionRule) -> HandlerResult {
    match stack.peek_entry_mut() {
        Some(RuleEntry::Actions(list)) => list.add_action(action),
        Some(RuleEntry::Translet(translet)) => translet.add_action(action),
        Some(RuleEntry::Advice(advice)) => {
            if advice.action.is_some() {
                return Err(illegal_rule!("The {} advice can have only one action", advice.advice_type).into());
            }
            advice.action = Some(action);
        },
        Some(RuleEntry::Thrown(thrown)) => {
            if thrown.action.is_some() {
                return Err(illegal_rule!("A <thrown> can have only one action").into());
            }
            thrown.action = Some(action);
        },
        other => {
            let found = other.map_or("nothing", |e| crate::nodelet::StackEntry::entry_name(e));
            return Err(illegal_rule!("No holder for action {}; found {}", action, found).into());
        },
    }
    return Ok(());
}
