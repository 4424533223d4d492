//
// parser/item.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::rc::Rc;

use crate::nodelet::{HandlerResult, NodeletAdder, NodeletGroup, ObjectStack};
use crate::parser::{flag, parse_attr, profile_attr, required, PendingValue, RuleEntry, SharedContext};
use crate::rule::{ItemRule, ItemRuleMap, ItemType, ItemValueType};

// =====================================================================
/// `<item>` with its `<value>` and `<entry>` children, added under an
/// element that has pushed an ItemRuleMap.
///
pub(crate) struct ItemNodeletAdder {
    context: SharedContext,
}

impl ItemNodeletAdder {
    pub(crate) fn new(context: &SharedContext) -> ItemNodeletAdder {
        return ItemNodeletAdder { context: Rc::clone(context) };
    }
}

impl NodeletAdder<RuleEntry> for ItemNodeletAdder {
    fn add_to(&self, group: &NodeletGroup<RuleEntry>) {
        let item = group.child("item");
        let context = Rc::clone(&self.context);
        item.nodelet(|attrs, stack| {
            let name = required(attrs, "name", "item")?;
            let item_type: Option<ItemType> = parse_attr(attrs, "type")?;
            let mut ir = ItemRule::new(&name, item_type.unwrap_or(ItemType::Single));
            ir.set_value_type(parse_attr::<ItemValueType>(attrs, "valueType")?);
            if let Some(tokenize) = flag(attrs, "tokenize") {
                ir.set_tokenize(tokenize);
            }
            if let Some(mandatory) = flag(attrs, "mandatory") {
                ir.set_mandatory(mandatory);
            }
            if let Some(value) = attrs.get("value") {
                add_item_value(&mut ir, value)?;
            }
            stack.push(ir);
            return Ok(());
        }).end_nodelet(move |text, stack| {
            let mut ir: ItemRule = stack.pop()?;
            if let Some(text) = text {
                if ir.is_mappable() {
                    return Err(illegal_rule!(
                        "Item '{}' of type {} takes <entry> elements, not text", ir.name(), ir.item_type()).into());
                }
                add_item_value(&mut ir, text)?;
            }
            context.borrow_mut().resolve_item_bean_class(&ir)?;
            stack.peek_mut::<ItemRuleMap>()?.put(ir);
            return Ok(());
        });

        item.child("value").end_nodelet(|text, stack| {
            let ir = stack.peek_mut::<ItemRule>()?;
            add_item_value(ir, text.unwrap_or(""))?;
            return Ok(());
        });

        item.child("entry").nodelet(|attrs, stack| {
            stack.push(PendingValue {
                name: required(attrs, "name", "entry")?,
                value: attrs.get("value").map(String::from),
            });
            return Ok(());
        }).end_nodelet(|text, stack| {
            let entry: PendingValue = stack.pop()?;
            let value = text.map(String::from).or(entry.value).unwrap_or_default();
            stack.peek_mut::<ItemRule>()?.put_entry(&entry.name, &value)?;
            return Ok(());
        });
    }
}

// ---------------------------------------------------------------------
// A single item takes the value; an array or list appends it.
//
fn add_item_value(ir: &mut ItemRule, text: &str) -> HandlerResult {
    let text = match ir.value_type() {
        Some(ItemValueType::Text) => text,
        _ => text.trim(),
    };
    if ir.is_listable() {
        ir.add_value(text)?;
    } else if ir.is_mappable() {
        return Err(illegal_rule!(
            "Item '{}' of type {} cannot have a value", ir.name(), ir.item_type()).into());
    } else {
        ir.set_value(text);
    }
    return Ok(());
}

// =====================================================================
/// Registers 'group' as an item container: its start pushes an
/// ItemRuleMap for the profile given, items fill it, and its end hands
/// the map to 'apply'.  Body text is read as APON, one item per name.
///
pub(crate) fn item_map<F>(group: &NodeletGroup<RuleEntry>, context: &SharedContext, apply: F)
        where F: Fn(&mut ObjectStack<RuleEntry>, ItemRuleMap) -> HandlerResult + 'static {
    let ctx = Rc::clone(context);
    group.nodelet(|attrs, stack| {
        let mut irm = ItemRuleMap::new();
        irm.set_profile(profile_attr(attrs)?);
        stack.push(irm);
        return Ok(());
    }).with(ItemNodeletAdder::new(context))
    .end_nodelet(move |text, stack| {
        let mut irm: ItemRuleMap = stack.pop()?;
        if let Some(text) = text {
            let parsed = ItemRuleMap::from_text(text)?;
            irm.put_all(&parsed);
        }
        ctx.borrow_mut().resolve_item_rule_map(&irm)?;
        return apply(stack, irm);
    });
}
