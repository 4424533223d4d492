//
// parser/root.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::path::PathBuf;
use std::rc::Rc;

use tracing::{debug, info};

use crate::apon::Parameters;
use crate::nodelet::{HandlerResult, NodeletAdder, NodeletGroup, ObjectStack};
use crate::parser::item::item_map;
use crate::parser::{
    parse_attr, profile_attr, required, AspectranNodeParser, ParseOptions, PendingImport,
    PendingValue, RuleEntry, SharedContext, MAX_IMPORT_DEPTH,
};
use crate::rule::{DescriptionRule, EnvironmentRule, TextStyleType};

// =====================================================================
/// `<description>`, wherever it appears.  At the top of a document it
/// describes the document's scope.
///
pub(crate) struct DescriptionNodeletAdder {
    context: SharedContext,
}

impl DescriptionNodeletAdder {
    pub(crate) fn new(context: &SharedContext) -> DescriptionNodeletAdder {
        return DescriptionNodeletAdder { context: Rc::clone(context) };
    }
}

impl NodeletAdder<RuleEntry> for DescriptionNodeletAdder {
    fn add_to(&self, group: &NodeletGroup<RuleEntry>) {
        let context = Rc::clone(&self.context);
        group.child("description").nodelet(|attrs, stack| {
            let style: Option<TextStyleType> = parse_attr(attrs, "style")?;
            let mut dr = DescriptionRule::new(None, style);
            dr.set_profile(profile_attr(attrs)?);
            stack.push(dr);
            return Ok(());
        }).end_nodelet(move |text, stack| {
            let mut dr: DescriptionRule = stack.pop()?;
            dr.set_content(text);
            return apply_description(&context, stack, dr);
        });
    }
}

fn apply_description(context: &SharedContext, stack: &mut ObjectStack<RuleEntry>,
        dr: DescriptionRule) -> HandlerResult {
    if stack.is_empty() {
        let mut ctx = context.borrow_mut();
        let old = ctx.scope().description().cloned();
        let merged = ctx.profiling_description(dr, old);
        ctx.scope_mut().set_description(Some(merged));
        return Ok(());
    }

    let ctx = context.borrow();
    match stack.peek_entry_mut() {
        Some(RuleEntry::Environment(er)) => {
            let merged = ctx.profiling_description(dr, er.description().cloned());
            er.set_description(Some(merged));
        },
        Some(RuleEntry::Aspect(r)) => {
            r.description = Some(ctx.profiling_description(dr, r.description.take()));
        },
        Some(RuleEntry::Bean(r)) => {
            r.description = Some(ctx.profiling_description(dr, r.description.take()));
        },
        Some(RuleEntry::Schedule(r)) => {
            r.description = Some(ctx.profiling_description(dr, r.description.take()));
        },
        Some(RuleEntry::Translet(r)) => {
            r.description = Some(ctx.profiling_description(dr, r.description.take()));
        },
        Some(RuleEntry::Exception(r)) => {
            r.description = Some(ctx.profiling_description(dr, r.description.take()));
        },
        _ => return Err(illegal_rule!("A <description> is not allowed here").into()),
    }
    return Ok(());
}

// =====================================================================
/// The document-level elements that are not rules of their own:
/// description, settings, environment, type aliases and imports.
///
pub(crate) struct RootNodeletAdder {
    context: SharedContext,
    options: ParseOptions,
}

impl RootNodeletAdder {
    pub(crate) fn new(context: &SharedContext, options: ParseOptions) -> RootNodeletAdder {
        return RootNodeletAdder {
            context: Rc::clone(context),
            options,
        };
    }

    fn add_settings(&self, group: &NodeletGroup<RuleEntry>) {
        let settings = group.child("settings");
        let context = Rc::clone(&self.context);
        settings.end_nodelet(move |text, _| {
            let mut ctx = context.borrow_mut();
            if let Some(text) = text {
                let params: Parameters = text.parse()?;
                for (name, value) in params.iter() {
                    ctx.put_setting(name, &value.to_string())?;
                }
            }
            ctx.apply_settings();
            return Ok(());
        });

        let context = Rc::clone(&self.context);
        settings.child("setting").nodelet(|attrs, stack| {
            stack.push(PendingValue {
                name: required(attrs, "name", "setting")?,
                value: attrs.get("value").map(String::from),
            });
            return Ok(());
        }).end_nodelet(move |text, stack| {
            let setting: PendingValue = stack.pop()?;
            let value = text.map(|t| t.trim().to_string()).or(setting.value).unwrap_or_default();
            context.borrow_mut().put_setting(&setting.name, &value)?;
            return Ok(());
        });
    }

    fn add_environment(&self, group: &NodeletGroup<RuleEntry>) {
        let environment = group.child("environment");
        let context = Rc::clone(&self.context);
        environment.nodelet(|attrs, stack| {
            stack.push(EnvironmentRule::new(profile_attr(attrs)?));
            return Ok(());
        }).with(DescriptionNodeletAdder::new(&self.context))
        .end_nodelet(move |_, stack| {
            let er: EnvironmentRule = stack.pop()?;
            context.borrow_mut().add_environment_rule(er);
            return Ok(());
        });

        let context = Rc::clone(&self.context);
        item_map(&environment.child("properties"), &self.context, move |stack, irm| {
            let er = stack.peek_mut::<EnvironmentRule>()?;
            let merged = context.borrow().profiling_item_rule_map(irm, er.properties().cloned());
            er.set_properties(Some(merged));
            return Ok(());
        });
    }

    fn add_type_aliases(&self, group: &NodeletGroup<RuleEntry>) {
        let aliases = group.child("typeAliases");
        let context = Rc::clone(&self.context);
        aliases.end_nodelet(move |text, _| {
            if let Some(text) = text {
                let params: Parameters = text.parse()?;
                let mut ctx = context.borrow_mut();
                for (alias, type_name) in params.iter() {
                    ctx.add_type_alias(alias, &type_name.to_string());
                }
            }
            return Ok(());
        });

        let context = Rc::clone(&self.context);
        aliases.child("typeAlias").nodelet(move |attrs, _| {
            let alias = required(attrs, "alias", "typeAlias")?;
            let type_name = required(attrs, "type", "typeAlias")?;
            context.borrow_mut().add_type_alias(&alias, &type_name);
            return Ok(());
        });
    }

    fn add_import(&self, group: &NodeletGroup<RuleEntry>) {
        let context = Rc::clone(&self.context);
        let options = self.options;
        group.child("import").nodelet(|attrs, stack| {
            stack.push(PendingImport {
                file: attrs.get_text("file"),
                resource: attrs.get_text("resource"),
                profile: profile_attr(attrs)?,
            });
            return Ok(());
        }).end_nodelet(move |text, stack| {
            let import: PendingImport = stack.pop()?;
            return import_document(&context, options, import, text);
        });
    }
}

impl NodeletAdder<RuleEntry> for RootNodeletAdder {
    fn add_to(&self, group: &NodeletGroup<RuleEntry>) {
        group.with(DescriptionNodeletAdder::new(&self.context));
        self.add_settings(group);
        self.add_environment(group);
        self.add_type_aliases(group);
        self.add_import(group);
    }
}

// ---------------------------------------------------------------------
// Parses an imported document with a nested parser in a replica of
// the current scope.  No borrow of the context is held meanwhile.
//
fn import_document(context: &SharedContext, options: ParseOptions, import: PendingImport,
        text: Option<&str>) -> HandlerResult {
    if let Some(ref profile) = import.profile {
        let accepted = context.borrow().environment().map_or(true, |env| env.matches(profile));
        if ! accepted {
            debug!("import skipped for profile {}", profile);
            return Ok(());
        }
    }
    if options.depth >= MAX_IMPORT_DEPTH {
        return Err(illegal_rule!("Imports nested deeper than {}", MAX_IMPORT_DEPTH).into());
    }

    let path: Option<PathBuf> = match import.file.as_ref().or(import.resource.as_ref()) {
        Some(name) => {
            let ctx = context.borrow();
            Some(match ctx.base_path() {
                Some(base) => base.join(name),
                None => PathBuf::from(name),
            })
        },
        None => None,
    };
    if path.is_none() && text.is_none() {
        return Err(illegal_rule!("An <import> needs a file, a resource or an inline document").into());
    }

    let (outer_scope, outer_tracker) = {
        let mut ctx = context.borrow_mut();
        (ctx.backup_rule_parsing_scope(), ctx.node_tracker())
    };
    let mut parser = AspectranNodeParser::with_options(Rc::clone(context), ParseOptions {
        depth: options.depth + 1,
        ..options
    });
    let result = match path {
        Some(ref path) => {
            info!("Importing {}", path.display());
            parser.parse_file(path)
        },
        None => parser.parse_text(text.unwrap_or("")),
    };
    {
        let mut ctx = context.borrow_mut();
        ctx.set_node_tracker(outer_tracker);
        ctx.restore_rule_parsing_scope(outer_scope);
    }
    result?;
    return Ok(());
}
