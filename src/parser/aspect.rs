//
// parser/aspect.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::rc::Rc;

use crate::nodelet::{NodeletAdder, NodeletGroup};
use crate::parser::action::ActionNodeletAdder;
use crate::parser::response::ExceptionNodeletAdder;
use crate::parser::root::DescriptionNodeletAdder;
use crate::parser::{flag, parse_attr, PendingAdvice, RuleEntry, SharedContext};
use crate::rule::{
    split_bean_reference, AspectAdviceType, AspectRule, JoinpointTargetType, MethodType,
    PointcutPatternRule, PointcutRule, PointcutType,
};

// =====================================================================
/// `<aspect>`: where it joins, the advice it brings and the
/// exceptions it handles.
///
pub(crate) struct AspectNodeletAdder {
    context: SharedContext,
}

impl AspectNodeletAdder {
    pub(crate) fn new(context: &SharedContext) -> AspectNodeletAdder {
        return AspectNodeletAdder { context: Rc::clone(context) };
    }

    fn add_joinpoint(&self, aspect: &NodeletGroup<RuleEntry>) {
        let joinpoint = aspect.child("joinpoint");
        joinpoint.nodelet(|attrs, stack| {
            let target: Option<JoinpointTargetType> = parse_attr(attrs, "target")?;
            let methods = match attrs.get_text("method") {
                Some(m) => Some(MethodType::parse_list(&m)?),
                None => None,
            };
            let rule = stack.peek_mut::<AspectRule>()?;
            if let Some(target) = target {
                rule.joinpoint.target = target;
            }
            rule.joinpoint.methods = methods;
            return Ok(());
        });

        let pointcut = joinpoint.child("pointcut");
        pointcut.nodelet(|attrs, stack| {
            let pointcut_type: Option<PointcutType> = parse_attr(attrs, "type")?;
            stack.push(PointcutRule::new(pointcut_type));
            return Ok(());
        }).end_nodelet(|text, stack| {
            let mut pointcut: PointcutRule = stack.pop()?;
            if let Some(text) = text {
                pointcut.add_pattern_text(text)?;
            }
            stack.peek_mut::<AspectRule>()?.joinpoint.pointcut = Some(pointcut);
            return Ok(());
        });

        pointcut.child("target").nodelet(|attrs, stack| {
            let translet = attrs.get_text("translet");
            let bean = attrs.get_text("bean");
            let method = attrs.get_text("method");
            let mut pattern = PointcutPatternRule::new(translet.as_deref(), bean.as_deref(), method.as_deref());
            if let Some(exclude) = attrs.get_text("exclude") {
                pattern.excludes.push(PointcutPatternRule::parse_pattern(&exclude));
            }
            if pattern.is_empty() {
                return Err(illegal_rule!("A pointcut <target> needs a translet, bean or method").into());
            }
            stack.peek_mut::<PointcutRule>()?.add_pattern_rule(pattern)?;
            return Ok(());
        });
    }

    fn add_advice(&self, aspect: &NodeletGroup<RuleEntry>) {
        let advice = aspect.child("advice");
        advice.nodelet(|attrs, stack| {
            if let Some(bean) = attrs.get_text("bean") {
                let (bean_id, bean_class) = split_bean_reference(Some(&bean));
                let rule = stack.peek_mut::<AspectRule>()?;
                rule.advice_bean_id = bean_id;
                rule.advice_bean_class = bean_class;
            }
            return Ok(());
        });

        for advice_type in AspectAdviceType::values().iter().cloned() {
            advice.child(advice_type.as_str()).nodelet(move |_, stack| {
                stack.push(PendingAdvice {
                    advice_type,
                    action: None,
                });
                return Ok(());
            }).with(ActionNodeletAdder::new(&self.context))
            .end_nodelet(|_, stack| {
                let pending: PendingAdvice = stack.pop()?;
                let rule = stack.peek_mut::<AspectRule>()?;
                rule.touch_advice_rule(pending.advice_type).action = pending.action;
                return Ok(());
            });
        }
    }
}

impl NodeletAdder<RuleEntry> for AspectNodeletAdder {
    fn add_to(&self, group: &NodeletGroup<RuleEntry>) {
        let aspect = group.child("aspect");
        let context = Rc::clone(&self.context);
        aspect.nodelet(|attrs, stack| {
            let mut rule = AspectRule::new(&attrs.get_text("id").unwrap_or_default());
            if let Some(order) = attrs.get_text("order") {
                rule.order = Some(order.parse::<i32>()
                        .map_err(|_| illegal_rule!("The order of aspect '{}' is not a number: {}", rule.id, order))?);
            }
            rule.isolated = flag(attrs, "isolated").unwrap_or(false);
            rule.disabled = flag(attrs, "disabled").unwrap_or(false);
            let (bean_id, bean_class) = split_bean_reference(attrs.get_text("bean").as_deref());
            rule.advice_bean_id = bean_id;
            rule.advice_bean_class = bean_class;
            stack.push(rule);
            return Ok(());
        }).with(DescriptionNodeletAdder::new(&self.context))
        .with(ExceptionNodeletAdder::new(&self.context))
        .end_nodelet(move |_, stack| {
            let rule: AspectRule = stack.pop()?;
            let mut ctx = context.borrow_mut();
            ctx.resolve_advice_bean_class(&rule)?;
            ctx.add_aspect_rule(rule)?;
            return Ok(());
        });

        self.add_joinpoint(&aspect);
        self.add_advice(&aspect);
    }
}
