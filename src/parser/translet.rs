//
// parser/translet.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::rc::Rc;

use crate::nodelet::{NodeletAdder, NodeletGroup};
use crate::parser::action::ActionNodeletAdder;
use crate::parser::item::item_map;
use crate::parser::response::{ExceptionNodeletAdder, ResponseNodeletAdder};
use crate::parser::root::DescriptionNodeletAdder;
use crate::parser::{flag, required, RuleEntry, SharedContext};
use crate::rule::{
    ActionList, ContentList, FileItemRule, MethodType, RequestRule, ResponseRule, TransletRule,
};

// =====================================================================
/// `<translet>`: its request, contents, responses and exception
/// handling.
///
pub(crate) struct TransletNodeletAdder {
    context: SharedContext,
}

impl TransletNodeletAdder {
    pub(crate) fn new(context: &SharedContext) -> TransletNodeletAdder {
        return TransletNodeletAdder { context: Rc::clone(context) };
    }

    fn add_request(&self, translet: &NodeletGroup<RuleEntry>) {
        let request = translet.child("request");
        request.nodelet(|attrs, stack| {
            let method = match attrs.get_text("method") {
                Some(m) => Some(m.to_uppercase().parse::<MethodType>()?),
                None => None,
            };
            stack.push(RequestRule {
                method,
                encoding: attrs.get_text("encoding"),
                ..RequestRule::default()
            });
            return Ok(());
        }).end_nodelet(|_, stack| {
            let rule: RequestRule = stack.pop()?;
            stack.peek_mut::<TransletRule>()?.request_rule = Some(rule);
            return Ok(());
        });

        item_map(&request.child("parameters"), &self.context, |stack, irm| {
            stack.peek_mut::<RequestRule>()?.parameters = Some(irm);
            return Ok(());
        });
        item_map(&request.child("attributes"), &self.context, |stack, irm| {
            stack.peek_mut::<RequestRule>()?.attributes = Some(irm);
            return Ok(());
        });

        request.child("fileItem").nodelet(|attrs, stack| {
            let file_item = FileItemRule {
                name: required(attrs, "name", "fileItem")?,
                mandatory: flag(attrs, "mandatory").unwrap_or(false),
                allowed_extensions: split_extensions(attrs.get("allowedExtensions")),
                denied_extensions: split_extensions(attrs.get("deniedExtensions")),
            };
            stack.peek_mut::<RequestRule>()?.file_items.push(file_item);
            return Ok(());
        });
    }

    // -----------------------------------------------------------------
    // <content> under <contents>, or directly under the translet.
    //
    fn add_content(&self, group: &NodeletGroup<RuleEntry>) {
        group.child("content").nodelet(|attrs, stack| {
            stack.push(ActionList::new(attrs.get_text("name"),
                    flag(attrs, "omittable"), flag(attrs, "hidden")));
            return Ok(());
        }).with(ActionNodeletAdder::new(&self.context))
        .end_nodelet(|_, stack| {
            let list: ActionList = stack.pop()?;
            match stack.peek_entry_mut() {
                Some(RuleEntry::Contents(contents)) => contents.add_action_list(list),
                Some(RuleEntry::Translet(translet)) => translet.add_action_list(list),
                _ => return Err(illegal_rule!("A <content> is not allowed here").into()),
            }
            return Ok(());
        });
    }

    fn add_contents(&self, translet: &NodeletGroup<RuleEntry>) {
        let contents = translet.child("contents");
        contents.nodelet(|attrs, stack| {
            stack.push(ContentList::new(attrs.get_text("name"), flag(attrs, "omittable")));
            return Ok(());
        }).end_nodelet(|_, stack| {
            let list: ContentList = stack.pop()?;
            stack.peek_mut::<TransletRule>()?.set_content_list(list);
            return Ok(());
        });
        self.add_content(&contents);
        self.add_content(translet);
    }

    fn add_response(&self, translet: &NodeletGroup<RuleEntry>) {
        translet.child("response").nodelet(|attrs, stack| {
            stack.push(ResponseRule::new(attrs.get_text("name"), attrs.get_text("encoding")));
            return Ok(());
        }).with(ResponseNodeletAdder::new(&self.context))
        .end_nodelet(|_, stack| {
            let rule: ResponseRule = stack.pop()?;
            if rule.response.is_none() {
                return Err(illegal_rule!("A <response> needs a transform, dispatch, forward or redirect").into());
            }
            stack.peek_mut::<TransletRule>()?.add_response_rule(rule);
            return Ok(());
        });
    }
}

impl NodeletAdder<RuleEntry> for TransletNodeletAdder {
    fn add_to(&self, group: &NodeletGroup<RuleEntry>) {
        let translet = group.child("translet");
        let context = Rc::clone(&self.context);
        translet.nodelet(|attrs, stack| {
            let mut rule = TransletRule::new(&required(attrs, "name", "translet")?);
            rule.scan_path = attrs.get_text("scan");
            rule.mask_pattern = attrs.get_text("mask");
            if let Some(methods) = attrs.get_text("method") {
                rule.allowed_methods = Some(MethodType::parse_list(&methods)?);
            }
            stack.push(rule);
            return Ok(());
        }).with(DescriptionNodeletAdder::new(&self.context))
        .with(ActionNodeletAdder::new(&self.context))
        .with(ResponseNodeletAdder::new(&self.context))
        .with(ExceptionNodeletAdder::new(&self.context))
        .end_nodelet(move |_, stack| {
            let rule: TransletRule = stack.pop()?;
            context.borrow_mut().add_translet_rule(rule)?;
            return Ok(());
        });

        self.add_request(&translet);
        self.add_contents(&translet);
        self.add_response(&translet);
    }
}

// ---------------------------------------------------------------------
//
fn split_extensions(list: Option<&str>) -> Vec<String> {
    return list.map(|l| {
        l.split(|c: char| c == ',' || c.is_whitespace())
            .map(|e| e.trim_start_matches('.'))
            .filter(|e| ! e.is_empty())
            .map(String::from)
            .collect()
    }).unwrap_or_default();
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;

    use crate::parser::AspectranNodeParser;
    use crate::parsing::RuleParsingContext;

    #[test]
    fn test_request_file_items() {
        let context = Rc::new(RefCell::new(RuleParsingContext::shallow(None)));
        AspectranNodeParser::new(Rc::clone(&context), false, false).parse_text(r#"
<aspectran>
  <translet name="/upload" scan="/upload/**" mask="/upload/*">
    <request method="post" encoding="utf-8">
      <fileItem name="photo" mandatory="true" allowedExtensions="jpg, .png gif"/>
      <fileItem name="doc" deniedExtensions="exe"/>
    </request>
  </translet>
</aspectran>"#).unwrap();
        let ctx = context.borrow();
        let translet = &ctx.rule_set().translet_rules[0];
        assert_eq!(translet.scan_path.as_deref(), Some("/upload/**"));
        let request = translet.request_rule.as_ref().unwrap();
        assert_eq!(request.method, Some(MethodType::Post));
        assert_eq!(request.encoding.as_deref(), Some("utf-8"));
        assert_eq!(request.file_items.len(), 2);

        let test_specs = [
            ( 0, "me.png", true ),
            ( 0, "me.bmp", false ),
            ( 1, "notes.txt", true ),
            ( 1, "setup.exe", false ),
        ];
        for (index, file_name, guess) in test_specs.iter() {
            assert_eq!(request.file_items[*index].is_allowed(file_name), *guess, "{}", file_name);
        }
        assert!(request.file_items[0].mandatory);
    }

    #[test]
    fn test_split_extensions() {
        let test_specs = [
            ( None, vec!{} ),
            ( Some("jpg"), vec!["jpg"] ),
            ( Some(" jpg, .png  gif "), vec!["jpg", "png", "gif"] ),
        ];
        for (list, guess) in test_specs.iter() {
            assert_eq!(split_extensions(*list), *guess, "{:?}", list);
        }
    }

    #[test]
    fn test_empty_response() {
        let context = Rc::new(RefCell::new(RuleParsingContext::shallow(None)));
        let err = AspectranNodeParser::new(Rc::clone(&context), false, false)
                .parse_text(r#"<aspectran><translet name="/a"><response/></translet></aspectran>"#)
                .unwrap_err();
        assert!(err.to_string().contains("needs a transform"), "{}", err);
    }
}
