//
// parser/response.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::rc::Rc;
use std::sync::Arc;

use crate::nodelet::{HandlerResult, NodeletAdder, NodeletGroup, ObjectStack, StackEntry};
use crate::parser::action::ActionNodeletAdder;
use crate::parser::item::item_map;
use crate::parser::root::DescriptionNodeletAdder;
use crate::parser::{flag, parse_attr, required, RuleEntry, SharedContext};
use crate::response::{dispatch_response, forward_response, redirect_response, transform_response, Response};
use crate::rule::{
    DispatchRule, ExceptionRule, ExceptionThrownRule, ForwardRule, MethodType, RedirectRule,
    ResponseRule, TemplateRule, TextStyleType, TransformRule, TransformType,
};

// =====================================================================
/// Mounts the response elements `<transform>`, `<dispatch>`,
/// `<forward>` and `<redirect>` under the group's element.
///
pub(crate) struct ResponseNodeletAdder {
    context: SharedContext,
}

impl ResponseNodeletAdder {
    pub(crate) fn new(context: &SharedContext) -> ResponseNodeletAdder {
        return ResponseNodeletAdder { context: Rc::clone(context) };
    }

    fn transform_group(&self) -> NodeletGroup<RuleEntry> {
        let transform: NodeletGroup<RuleEntry> = NodeletGroup::new("transform");
        transform.nodelet(|attrs, stack| {
            let type_name = required(attrs, "type", "transform")?;
            let mut tr = TransformRule::new(TransformType::parse_lenient(&type_name)?);
            tr.content_type = attrs.get_text("contentType");
            tr.encoding = attrs.get_text("encoding");
            tr.default = flag(attrs, "default").unwrap_or(false);
            tr.pretty = flag(attrs, "pretty");
            if let Some(size) = attrs.get_text("indentSize") {
                let size = size.parse::<usize>()
                        .map_err(|_| illegal_rule!("Invalid indentSize '{}' of <transform>", size))?;
                tr.indent_size = Some(size);
            }
            stack.push(tr);
            return Ok(());
        }).end_nodelet(|_, stack| {
            let tr: TransformRule = stack.pop()?;
            return apply_response(stack, transform_response(tr));
        });

        let context = Rc::clone(&self.context);
        transform.child("template").nodelet(|attrs, stack| {
            let mut template = TemplateRule::new(None, attrs.get_text("file"),
                    attrs.get_text("resource"), attrs.get_text("url"))?;
            template.engine = attrs.get_text("engine");
            template.name = attrs.get_text("name");
            template.style = parse_attr::<TextStyleType>(attrs, "style")?;
            template.encoding = attrs.get_text("encoding");
            template.no_cache = flag(attrs, "noCache").unwrap_or(false);
            stack.push(template);
            return Ok(());
        }).end_nodelet(move |text, stack| {
            let mut template: TemplateRule = stack.pop()?;
            template.set_content(text);
            {
                let mut ctx = context.borrow_mut();
                ctx.prepare_template_rule(&mut template);
                ctx.resolve_template_bean_class(&template)?;
            }
            stack.peek_mut::<TransformRule>()?.template = Some(template);
            return Ok(());
        });

        transform.child("call").nodelet(|attrs, stack| {
            let template_id = required(attrs, "template", "call")?;
            stack.peek_mut::<TransformRule>()?.template_id = Some(template_id);
            return Ok(());
        });
        return transform;
    }

    fn dispatch_group(&self) -> NodeletGroup<RuleEntry> {
        let dispatch: NodeletGroup<RuleEntry> = NodeletGroup::new("dispatch");
        dispatch.nodelet(|attrs, stack| {
            let rule = DispatchRule {
                name: required(attrs, "name", "dispatch")?,
                dispatcher: attrs.get_text("dispatcher"),
                content_type: attrs.get_text("contentType"),
                encoding: attrs.get_text("encoding"),
                default: flag(attrs, "default").unwrap_or(false),
            };
            return apply_response(stack, dispatch_response(rule));
        });
        return dispatch;
    }

    fn forward_group(&self) -> NodeletGroup<RuleEntry> {
        let forward: NodeletGroup<RuleEntry> = NodeletGroup::new("forward");
        let context = Rc::clone(&self.context);
        forward.nodelet(move |attrs, stack| {
            let translet = required(attrs, "translet", "forward")?;
            let method = match attrs.get_text("method") {
                Some(m) => Some(m.to_uppercase().parse::<MethodType>()?),
                None => None,
            };
            stack.push(ForwardRule {
                translet_name: context.borrow().apply_translet_name_pattern(&translet),
                method,
                content_type: attrs.get_text("contentType"),
                default: flag(attrs, "default").unwrap_or(false),
                attributes: None,
            });
            return Ok(());
        }).end_nodelet(|_, stack| {
            let rule: ForwardRule = stack.pop()?;
            return apply_response(stack, forward_response(rule));
        });

        item_map(&forward.child("attributes"), &self.context, |stack, irm| {
            stack.peek_mut::<ForwardRule>()?.attributes = Some(irm);
            return Ok(());
        });
        return forward;
    }

    fn redirect_group(&self) -> NodeletGroup<RuleEntry> {
        let redirect: NodeletGroup<RuleEntry> = NodeletGroup::new("redirect");
        redirect.nodelet(|attrs, stack| {
            let mut rule = RedirectRule::new(&required(attrs, "path", "redirect")?);
            rule.content_type = attrs.get_text("contentType");
            rule.encoding = attrs.get_text("encoding");
            rule.default = flag(attrs, "default").unwrap_or(false);
            rule.exclude_null_parameters = flag(attrs, "excludeNullParameters").unwrap_or(false);
            stack.push(rule);
            return Ok(());
        }).end_nodelet(|_, stack| {
            let rule: RedirectRule = stack.pop()?;
            return apply_response(stack, redirect_response(rule));
        });

        item_map(&redirect.child("parameters"), &self.context, |stack, irm| {
            stack.peek_mut::<RedirectRule>()?.parameters = Some(irm);
            return Ok(());
        });
        return redirect;
    }
}

impl NodeletAdder<RuleEntry> for ResponseNodeletAdder {
    fn add_to(&self, group: &NodeletGroup<RuleEntry>) {
        group.mount(&self.transform_group())
            .mount(&self.dispatch_group())
            .mount(&self.forward_group())
            .mount(&self.redirect_group());
    }
}

// ---------------------------------------------------------------------
/// Hands a finished response to its holder.  A `<response>` holds a
/// single response; a translet wraps each one in an unnamed
/// ResponseRule.
///
pub(crate) fn apply_response(stack: &mut ObjectStack<RuleEntry>, response: Arc<dyn Response>) -> HandlerResult {
    match stack.peek_entry_mut() {
        Some(RuleEntry::Response(rr)) => {
            if rr.response.is_some() {
                return Err(illegal_rule!("A <response> can have only one response; {} is extra", response).into());
            }
            rr.response = Some(response);
        },
        Some(RuleEntry::Translet(translet)) => {
            translet.add_response_rule(ResponseRule::with_response(response));
        },
        Some(RuleEntry::Thrown(thrown)) => thrown.add_response(response),
        other => {
            let found = other.map_or("nothing", |e| e.entry_name());
            return Err(illegal_rule!("No holder for {}; found {}", response, found).into());
        },
    }
    return Ok(());
}

// =====================================================================
/// `<exception>` with its `<thrown>` rules, each holding an action and
/// responses.  The finished ExceptionRule goes to the translet or
/// aspect below it.
///
pub(crate) struct ExceptionNodeletAdder {
    context: SharedContext,
}

impl ExceptionNodeletAdder {
    pub(crate) fn new(context: &SharedContext) -> ExceptionNodeletAdder {
        return ExceptionNodeletAdder { context: Rc::clone(context) };
    }
}

impl NodeletAdder<RuleEntry> for ExceptionNodeletAdder {
    fn add_to(&self, group: &NodeletGroup<RuleEntry>) {
        let exception = group.child("exception");
        exception.nodelet(|_, stack| {
            stack.push(ExceptionRule::new());
            return Ok(());
        }).with(DescriptionNodeletAdder::new(&self.context))
        .end_nodelet(|_, stack| {
            let rule: ExceptionRule = stack.pop()?;
            match stack.peek_entry_mut() {
                Some(RuleEntry::Translet(translet)) => translet.exception_rule = Some(rule),
                Some(RuleEntry::Aspect(aspect)) => aspect.exception_rule = Some(rule),
                _ => return Err(illegal_rule!("An <exception> is not allowed here").into()),
            }
            return Ok(());
        });

        exception.child("thrown").nodelet(|attrs, stack| {
            let types: Vec<String> = attrs.get_text("type")
                    .map(|t| t.split(',')
                            .map(|s| s.trim())
                            .filter(|s| ! s.is_empty())
                            .map(String::from)
                            .collect())
                    .unwrap_or_default();
            stack.push(ExceptionThrownRule::new(types));
            return Ok(());
        }).with(ActionNodeletAdder::new(&self.context))
        .with(ResponseNodeletAdder::new(&self.context))
        .end_nodelet(|_, stack| {
            let thrown: ExceptionThrownRule = stack.pop()?;
            stack.peek_mut::<ExceptionRule>()?.put_exception_thrown_rule(thrown);
            return Ok(());
        });
    }
}
