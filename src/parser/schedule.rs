//
// parser/schedule.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::rc::Rc;

use crate::apon::Parameters;
use crate::nodelet::{NodeletAdder, NodeletGroup};
use crate::parser::root::DescriptionNodeletAdder;
use crate::parser::{flag, required, RuleEntry, SharedContext};
use crate::rule::{ScheduleRule, ScheduledJobRule, TriggerRule, TriggerType};

// =====================================================================
/// `<schedule>`: a scheduler bean, its trigger and the jobs it fires.
///
pub(crate) struct ScheduleNodeletAdder {
    context: SharedContext,
}

impl ScheduleNodeletAdder {
    pub(crate) fn new(context: &SharedContext) -> ScheduleNodeletAdder {
        return ScheduleNodeletAdder { context: Rc::clone(context) };
    }
}

impl NodeletAdder<RuleEntry> for ScheduleNodeletAdder {
    fn add_to(&self, group: &NodeletGroup<RuleEntry>) {
        let schedule = group.child("schedule");
        let context = Rc::clone(&self.context);
        schedule.nodelet(|attrs, stack| {
            stack.push(ScheduleRule::new(&required(attrs, "id", "schedule")?));
            return Ok(());
        }).with(DescriptionNodeletAdder::new(&self.context))
        .end_nodelet(move |_, stack| {
            let rule: ScheduleRule = stack.pop()?;
            let mut ctx = context.borrow_mut();
            ctx.resolve_schedule_bean_class(&rule)?;
            ctx.add_schedule_rule(rule)?;
            return Ok(());
        });

        let scheduler = schedule.child("scheduler");
        scheduler.nodelet(|attrs, stack| {
            stack.peek_mut::<ScheduleRule>()?.scheduler_bean_id = attrs.get_text("bean");
            return Ok(());
        });

        // The trigger expression is APON in the body.
        scheduler.child("trigger").nodelet(|attrs, stack| {
            let trigger_type: TriggerType = required(attrs, "type", "trigger")?.parse()?;
            stack.push(trigger_type);
            return Ok(());
        }).end_nodelet(|text, stack| {
            let trigger_type: TriggerType = stack.pop()?;
            let parameters: Parameters = match text {
                Some(text) => text.parse()?,
                None => Parameters::new(),
            };
            stack.peek_mut::<ScheduleRule>()?.trigger = Some(TriggerRule {
                trigger_type,
                parameters,
            });
            return Ok(());
        });

        schedule.child("job").nodelet(|attrs, stack| {
            let job = ScheduledJobRule {
                translet_name: required(attrs, "translet", "job")?,
                disabled: flag(attrs, "disabled").unwrap_or(false),
            };
            stack.peek_mut::<ScheduleRule>()?.jobs.push(job);
            return Ok(());
        });
    }
}
