//
// rule/schedule.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

use crate::apon::Parameters;
use crate::rule::description::DescriptionRule;
use crate::rule::types::TriggerType;

// =====================================================================
/// `<job>`: a translet run by the scheduler.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduledJobRule {
    pub translet_name: String,
    pub disabled: bool,
}

// =====================================================================
/// `<trigger>`: when the jobs of a schedule fire.  The expression is
/// kept as parameters ("expression: 0 0 * * * ?" for cron,
/// "intervalInSeconds: 10" for simple).
///
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRule {
    pub trigger_type: TriggerType,
    pub parameters: Parameters,
}

// =====================================================================
/// `<schedule>`: jobs handed to a scheduler bean.  The scheduler
/// itself lives outside this crate; the rules are only collected.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleRule {
    pub id: String,
    pub scheduler_bean_id: Option<String>,
    pub trigger: Option<TriggerRule>,
    pub jobs: Vec<ScheduledJobRule>,
    pub description: Option<DescriptionRule>,
}

impl ScheduleRule {
    pub fn new(id: &str) -> ScheduleRule {
        return ScheduleRule {
            id: String::from(id),
            ..ScheduleRule::default()
        };
    }
}

impl fmt::Display for ScheduleRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "schedule id={}", self.id)?;
        if let Some(ref bean) = self.scheduler_bean_id {
            write!(f, " scheduler={}", bean)?;
        }
        if let Some(ref trigger) = self.trigger {
            write!(f, " trigger={}", trigger.trigger_type)?;
        }
        let jobs: Vec<&str> = self.jobs.iter()
                .filter(|j| ! j.disabled)
                .map(|j| j.translet_name.as_str())
                .collect();
        return write!(f, " jobs=[{}]", jobs.join(", "));
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display() {
        let mut rule = ScheduleRule::new("s1");
        rule.scheduler_bean_id = Some(String::from("scheduler"));
        rule.trigger = Some(TriggerRule {
            trigger_type: TriggerType::Cron,
            parameters: "expression: 0 0 * * * ?".parse().unwrap(),
        });
        rule.jobs.push(ScheduledJobRule { translet_name: String::from("/batch/a"), disabled: false });
        rule.jobs.push(ScheduledJobRule { translet_name: String::from("/batch/b"), disabled: true });
        assert_eq!(rule.to_string(), "schedule id=s1 scheduler=scheduler trigger=cron jobs=[/batch/a]");
    }
}
