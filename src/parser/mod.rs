//
// parser/mod.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

//!
//! Reading configuration documents into rules.
//!
//! AspectranNodeParser registers the nodelets of the `<aspectran>`
//! grammar and feeds what they build into a RuleParsingContext.
//! An element pushes the rule it starts onto the object stack; when
//! the element ends, the rule is popped and handed to whatever is on
//! the stack below it, or to the context for top-level rules.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use aspectran::parser::AspectranNodeParser;
//! use aspectran::parsing::RuleParsingContext;
//!
//! let context = Rc::new(RefCell::new(RuleParsingContext::shallow(None)));
//! let mut parser = AspectranNodeParser::new(Rc::clone(&context), false, false);
//! parser.parse_text(r#"
//!     <aspectran>
//!       <translet name="/hello">
//!         <echo><item name="msg">hi</item></echo>
//!         <transform type="json"/>
//!       </translet>
//!     </aspectran>"#).unwrap();
//! assert_eq!(context.borrow().rule_set().translet_rules[0].name(), "/hello");
//! ```
//!

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

use tracing::debug;

use crate::env::Profiles;
use crate::error::{IllegalRuleError, NodeletError};
use crate::nodelet::{Attributes, NodeTracker, NodeletGroup, NodeletParser};
use crate::parsing::RuleParsingContext;
use crate::rule::{
    ActionList, ActionRule, AspectAdviceType, AspectRule, BeanRule, ContentList,
    DescriptionRule, DispatchRule, EnvironmentRule, ExceptionRule, ExceptionThrownRule,
    ForwardRule, ItemRule, ItemRuleMap, PointcutRule, RedirectRule, RequestRule,
    ResponseRule, ScheduleRule, TemplateRule, TransformRule, TransletRule, TriggerType,
};

mod action;
mod aspect;
mod bean;
mod item;
mod resolver;
mod response;
mod root;
mod schedule;
mod template;
mod translet;

pub use self::resolver::{AspectranDtdResolver, ASPECTRAN_DTD_PUBLIC_ID, ASPECTRAN_DTD_SYSTEM_ID};

/// Imports nested deeper than this are taken for a cycle.
pub const MAX_IMPORT_DEPTH: usize = 16;

pub(crate) type SharedContext = Rc<RefCell<RuleParsingContext>>;

// =====================================================================
/// `<setting>` or `<entry>` waiting for its body text.
///
#[derive(Debug)]
pub(crate) struct PendingValue {
    name: String,
    value: Option<String>,
}

/// Advice block waiting for its action.
///
#[derive(Debug)]
pub(crate) struct PendingAdvice {
    advice_type: AspectAdviceType,
    action: Option<ActionRule>,
}

/// `<import>` waiting for its body text.
///
#[derive(Debug)]
pub(crate) struct PendingImport {
    file: Option<String>,
    resource: Option<String>,
    profile: Option<Profiles>,
}

stack_entries! {
    #[derive(Debug)]
    pub(crate) enum RuleEntry {
        Description(DescriptionRule),
        Environment(EnvironmentRule),
        Items(ItemRuleMap),
        Item(ItemRule),
        Value(PendingValue),
        Aspect(AspectRule),
        Pointcut(PointcutRule),
        Advice(PendingAdvice),
        Exception(ExceptionRule),
        Thrown(ExceptionThrownRule),
        Bean(BeanRule),
        Schedule(ScheduleRule),
        Trigger(TriggerType),
        Template(TemplateRule),
        Translet(TransletRule),
        Request(RequestRule),
        Contents(ContentList),
        Actions(ActionList),
        Response(ResponseRule),
        Action(ActionRule),
        Transform(TransformRule),
        Dispatch(DispatchRule),
        Forward(ForwardRule),
        Redirect(RedirectRule),
        Import(PendingImport),
    }
}

// ---------------------------------------------------------------------
// What a nested parser for an import inherits.
//
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParseOptions {
    validating: bool,
    tracking_location: bool,
    depth: usize,
}

// =====================================================================
/// Parser of `<aspectran>` configuration documents.
///
/// The rules found are added to the shared RuleParsingContext, which
/// may receive several documents in turn.  With tracking on, the
/// context learns where each rule was declared, which error messages
/// then report.
///
pub struct AspectranNodeParser {
    parser: NodeletParser<RuleEntry>,
    context: SharedContext,
    tracker: Option<Rc<RefCell<NodeTracker>>>,
}

impl AspectranNodeParser {

    pub fn new(context: Rc<RefCell<RuleParsingContext>>, validating: bool,
            tracking_location: bool) -> AspectranNodeParser {
        return AspectranNodeParser::with_options(context, ParseOptions {
            validating,
            tracking_location,
            depth: 0,
        });
    }

    pub(crate) fn with_options(context: SharedContext, options: ParseOptions) -> AspectranNodeParser {
        let group = make_grammar(&context, options);
        let mut parser = NodeletParser::new(group);
        parser.set_validating(options.validating);
        parser.set_entity_resolver(AspectranDtdResolver::new());
        let tracker = if options.tracking_location {
            Some(parser.tracking_location())
        } else {
            None
        };
        return AspectranNodeParser {
            parser,
            context,
            tracker,
        };
    }

    // -----------------------------------------------------------------
    /// Parses the document in the file at 'path'.
    ///
    pub fn parse_file(&mut self, path: &Path) -> Result<(), NodeletError> {
        debug!("parsing {}", path.display());
        self.context.borrow_mut().set_node_tracker(self.tracker.clone());
        let result = self.parser.parse_file(path);
        return self.finish(result);
    }

    // -----------------------------------------------------------------
    /// Parses the document 'text'.
    ///
    pub fn parse_text(&mut self, text: &str) -> Result<(), NodeletError> {
        self.context.borrow_mut().set_node_tracker(self.tracker.clone());
        let result = self.parser.parse(text);
        return self.finish(result);
    }

    fn finish(&mut self, result: Result<(), NodeletError>) -> Result<(), NodeletError> {
        let stack = self.parser.object_stack();
        if result.is_err() {
            stack.clear();
        } else if ! stack.is_empty() {
            debug!("{} objects left on the stack", stack.len());
            stack.clear();
        }
        return result;
    }
}

// ---------------------------------------------------------------------
//
fn make_grammar(context: &SharedContext, options: ParseOptions) -> NodeletGroup<RuleEntry> {
    let root: NodeletGroup<RuleEntry> = NodeletGroup::new("aspectran");
    root.with(root::RootNodeletAdder::new(context, options))
        .with(aspect::AspectNodeletAdder::new(context))
        .with(bean::BeanNodeletAdder::new(context))
        .with(schedule::ScheduleNodeletAdder::new(context))
        .with(template::TemplateNodeletAdder::new(context))
        .with(translet::TransletNodeletAdder::new(context));
    return root;
}

// =====================================================================
// Attribute helpers
// =====================================================================

/// "true" in any case is true; any other value given is false.
///
pub(crate) fn flag(attrs: &Attributes, name: &str) -> Option<bool> {
    return attrs.get_text(name).map(|v| v.eq_ignore_ascii_case("true"));
}

pub(crate) fn parse_attr<T>(attrs: &Attributes, name: &str) -> Result<Option<T>, IllegalRuleError>
        where T: FromStr<Err = IllegalRuleError> {
    return attrs.get_text(name).map(|v| v.parse::<T>()).transpose();
}

pub(crate) fn required(attrs: &Attributes, name: &str, element: &str) -> Result<String, IllegalRuleError> {
    return attrs.get_text(name)
            .ok_or_else(|| illegal_rule!("The <{}> element requires a {} attribute", element, name));
}

pub(crate) fn profile_attr(attrs: &Attributes) -> Result<Option<Profiles>, IllegalRuleError> {
    return match attrs.get_text("profile") {
        Some(expr) => Ok(Some(Profiles::of(&expr)?)),
        None => Ok(None),
    };
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use crate::bean::BeanClassRegistry;
    use crate::env::EnvironmentProfiles;
    use crate::rule::{ItemValue, MethodType, ResponseType, ScopeType, TransformType};

    fn full_context(profiles: &[&str], base_path: Option<&Path>) -> SharedContext {
        let env = EnvironmentProfiles::new();
        env.set_active_profiles(profiles).unwrap();
        let mut context = RuleParsingContext::new(Arc::new(env),
                Arc::new(BeanClassRegistry::new()), base_path.map(Path::to_path_buf));
        context.prepare();
        return Rc::new(RefCell::new(context));
    }

    fn shallow_parse(xml: &str) -> SharedContext {
        let context = Rc::new(RefCell::new(RuleParsingContext::shallow(None)));
        AspectranNodeParser::new(Rc::clone(&context), false, false).parse_text(xml).unwrap();
        return context;
    }

    #[test]
    fn test_translet_shapes() {
        let context = shallow_parse(r#"
<aspectran>
  <translet name="/hello" method="get, post">
    <description>Says hello.</description>
    <request>
      <parameters>
        <item name="who" mandatory="true"/>
      </parameters>
    </request>
    <echo id="greeting">
      <item name="msg">hi</item>
      <item name="list" type="list">
        <value>a</value>
        <value>b</value>
      </item>
    </echo>
    <action bean="sample" method="run"/>
    <transform type="json" contentType="text/plain" pretty="true"/>
  </translet>
</aspectran>"#);
        let ctx = context.borrow();
        let rules = &ctx.rule_set().translet_rules;
        assert_eq!(rules.len(), 1);
        let translet = &rules[0];
        assert_eq!(translet.allowed_methods, Some(vec![MethodType::Get, MethodType::Post]));
        assert!(translet.description.is_some());

        let params = translet.request_rule.as_ref().unwrap().parameters.as_ref().unwrap();
        assert!(params.get("who").unwrap().is_mandatory());

        let content = translet.content_list().unwrap();
        let actions = content.action_lists()[0].actions();
        assert_eq!(actions.len(), 2);
        let echo = match actions[0] {
            ActionRule::Echo(ref r) => r,
            ref other => panic!("unexpected {:?}", other),
        };
        assert_eq!(echo.action_id.as_deref(), Some("greeting"));
        let items = echo.items.as_ref().unwrap();
        assert_eq!(items.len(), 2);
        match items.get("list").unwrap().value() {
            ItemValue::List(values) => assert_eq!(values.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        match actions[1] {
            ActionRule::Bean(ref r) => {
                assert_eq!(r.bean_id.as_deref(), Some("sample"));
                assert_eq!(r.method, "run");
            },
            ref other => panic!("unexpected {:?}", other),
        }

        let responses = translet.response_rules();
        assert_eq!(responses.len(), 1);
        let response = responses[0].response.as_ref().unwrap();
        assert_eq!(response.response_type(), ResponseType::Transform);
        assert_eq!(response.content_type(), Some("text/plain"));
    }

    #[test]
    fn test_contents_and_named_responses() {
        let context = shallow_parse(r#"
<aspectran>
  <translet name="/report">
    <contents name="report">
      <content name="first">
        <echo><item name="a">1</item></echo>
      </content>
      <content name="second" hidden="true">
        <echo><item name="b">2</item></echo>
      </content>
    </contents>
    <response name=".xml">
      <transform type="xml"/>
    </response>
    <response>
      <transform type="apon"/>
    </response>
  </translet>
</aspectran>"#);
        let ctx = context.borrow();
        let translet = &ctx.rule_set().translet_rules[0];
        assert!(translet.is_explicit_content());
        let content = translet.content_list().unwrap();
        assert_eq!(content.name(), Some("report"));
        assert_eq!(content.len(), 2);
        assert!(content.action_lists()[1].is_hidden());
        assert_eq!(content.visible_count(), 1);

        let responses = translet.response_rules();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].name.as_deref(), Some(".xml"));
        assert_eq!(responses[1].name, None);
    }

    #[test]
    fn test_inner_responses() {
        let context = shallow_parse(r#"
<aspectran>
  <translet name="/go">
    <redirect path="/target">
      <parameters>
        <item name="q">${q}</item>
      </parameters>
    </redirect>
  </translet>
  <translet name="/fwd">
    <forward translet="/go" method="post">
      <attributes>
        <item name="from">fwd</item>
      </attributes>
    </forward>
  </translet>
  <translet name="/view">
    <dispatch name="index" dispatcher="viewDispatcher" contentType="text/html"/>
  </translet>
  <translet name="/xsl">
    <transform type="xsl">
      <template file="style.xsl" noCache="true"/>
    </transform>
  </translet>
</aspectran>"#);
        let ctx = context.borrow();
        let test_specs = [
            ( "/go", ResponseType::Redirect, None ),
            ( "/fwd", ResponseType::Forward, None ),
            ( "/view", ResponseType::Dispatch, Some("text/html") ),
            ( "/xsl", ResponseType::Transform, None ),
        ];
        for (name, response_type, content_type) in test_specs.iter() {
            let translet = ctx.rule_set().translet_rules.iter()
                    .find(|r| r.name() == *name)
                    .unwrap();
            let response = translet.response_rules()[0].response.as_ref().unwrap();
            assert_eq!(response.response_type(), *response_type, "{}", name);
            assert_eq!(response.content_type(), *content_type, "{}", name);
        }
    }

    #[test]
    fn test_aspect_and_exception() {
        let context = shallow_parse(r#"
<aspectran>
  <aspect id="audit" order="1" bean="auditor">
    <joinpoint target="translet" method="GET">
      <pointcut type="wildcard">
        <target translet="/admin/**" exclude="/admin/public/**"/>
      </pointcut>
    </joinpoint>
    <advice>
      <before>
        <action method="check"/>
      </before>
      <after>
        <echo id="audited"><item name="ok">true</item></echo>
      </after>
    </advice>
    <exception>
      <thrown type="ActionError">
        <transform type="json"/>
      </thrown>
    </exception>
  </aspect>
</aspectran>"#);
        let ctx = context.borrow();
        let aspect = &ctx.rule_set().aspect_rules[0];
        assert_eq!(aspect.id, "audit");
        assert_eq!(aspect.order, Some(1));
        assert_eq!(aspect.advice_bean_id.as_deref(), Some("auditor"));
        assert_eq!(aspect.joinpoint.methods, Some(vec![MethodType::Get]));
        let pointcut = aspect.joinpoint.pointcut.as_ref().unwrap();
        assert_eq!(pointcut.pattern_rules().len(), 1);
        assert_eq!(pointcut.pattern_rules()[0].excludes.len(), 1);
        assert_eq!(aspect.advice_rules.len(), 2);
        assert_eq!(aspect.advice_rules[0].advice_type, AspectAdviceType::Before);
        assert!(aspect.advice_rules[0].action.is_some());

        let exception = aspect.exception_rule.as_ref().unwrap();
        let thrown = exception.exception_thrown_rule("ActionError").unwrap();
        assert_eq!(thrown.responses().len(), 1);
    }

    #[test]
    fn test_bean_schedule_template() {
        let context = shallow_parse(r#"
<aspectran>
  <typeAliases>
    <typeAlias alias="Props" type="aspectran.bean.PropertiesBean"/>
  </typeAliases>
  <bean id="props" class="Props" scope="prototype" initMethod="init">
    <arguments>
      <item name="a" valueType="int">1</item>
    </arguments>
    <properties>
      <item name="m" type="map">
        <entry name="k1">v1</entry>
        <entry name="k2" value="v2"/>
      </item>
    </properties>
  </bean>
  <schedule id="nightly">
    <scheduler bean="scheduler">
      <trigger type="cron">expression: "0 0 3 * * ?"</trigger>
    </scheduler>
    <job translet="/batch/run"/>
    <job translet="/batch/off" disabled="true"/>
  </schedule>
  <template id="greeting" style="compact">Hello, ${name}!</template>
</aspectran>"#);
        let ctx = context.borrow();
        let bean = &ctx.rule_set().bean_rules[0];
        assert_eq!(bean.class_name.as_deref(), Some("aspectran.bean.PropertiesBean"));
        assert_eq!(bean.scope, Some(ScopeType::Prototype));
        assert_eq!(bean.init_method.as_deref(), Some("init"));
        assert_eq!(bean.arguments.as_ref().unwrap().len(), 1);
        match bean.properties.as_ref().unwrap().get("m").unwrap().value() {
            ItemValue::Map(entries) => assert_eq!(entries.len(), 2),
            other => panic!("unexpected {:?}", other),
        }

        let schedule = &ctx.rule_set().schedule_rules[0];
        assert_eq!(schedule.scheduler_bean_id.as_deref(), Some("scheduler"));
        let trigger = schedule.trigger.as_ref().unwrap();
        assert_eq!(trigger.parameters.get_str("expression"), Some("0 0 3 * * ?"));
        assert_eq!(schedule.jobs.len(), 2);
        assert!(schedule.jobs[1].disabled);

        let template = &ctx.rule_set().template_rules[0];
        assert_eq!(template.id.as_deref(), Some("greeting"));
        assert!(template.content().unwrap().starts_with("Hello"));
    }

    #[test]
    fn test_settings_apply_to_translets() {
        let context = full_context(&[], None);
        AspectranNodeParser::new(Rc::clone(&context), false, false).parse_text(r#"
<aspectran>
  <settings>
    <setting name="transletNamePrefix" value="/api/"/>
    <setting name="transletNameSuffix">.json</setting>
  </settings>
  <translet name="users"/>
</aspectran>"#).unwrap();
        let ctx = context.borrow();
        let registry = &ctx.registries().translet;
        assert!(registry.lookup("/api/users.json", MethodType::Get).is_some());
        assert_eq!(ctx.setting(crate::rule::DefaultSettingType::TransletNameSuffix), Some(".json"));
    }

    #[test]
    fn test_import_keeps_outer_scope() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("inner.xml"), r#"
<aspectran>
  <settings>
    <setting name="transletNamePrefix" value="/inner/"/>
  </settings>
  <translet name="a"/>
</aspectran>"#).unwrap();

        let context = full_context(&[], Some(dir.path()));
        AspectranNodeParser::new(Rc::clone(&context), false, true).parse_text(r#"
<aspectran>
  <settings>
    <setting name="transletNamePrefix" value="/outer/"/>
  </settings>
  <import file="inner.xml"/>
  <import file="missing.xml" profile="never"/>
  <translet name="b"/>
</aspectran>"#).unwrap();

        let ctx = context.borrow();
        let registry = &ctx.registries().translet;
        assert!(registry.lookup("/inner/a", MethodType::Get).is_some());
        assert!(registry.lookup("/outer/b", MethodType::Get).is_some());
        assert_eq!(ctx.default_settings().unwrap().translet_name_prefix(), Some("/outer/"));
    }

    #[test]
    fn test_inline_import() {
        let context = shallow_parse(r#"
<aspectran>
  <import><![CDATA[
    <aspectran>
      <translet name="/inline"/>
    </aspectran>
  ]]></import>
</aspectran>"#);
        let ctx = context.borrow();
        assert_eq!(ctx.rule_set().translet_rules[0].name(), "/inline");
    }

    #[test]
    fn test_profiled_properties() {
        let context = full_context(&["dev"], None);
        AspectranNodeParser::new(Rc::clone(&context), false, false).parse_text(r#"
<aspectran>
  <environment>
    <properties>
      <item name="url">jdbc:base</item>
    </properties>
    <properties profile="dev">
      <item name="url">jdbc:dev</item>
    </properties>
    <properties profile="prod">
      <item name="url">jdbc:prod</item>
    </properties>
  </environment>
</aspectran>"#).unwrap();
        let ctx = context.borrow();
        let env = EnvironmentProfiles::new();
        env.set_active_profiles(&["dev"]).unwrap();
        let props = ctx.environment_rules()[0].properties().unwrap().effective(&env);
        let url = props.get("url").unwrap();
        assert_eq!(url.all_tokens()[0].value(), Some("jdbc:dev"));
    }

    #[test]
    fn test_errors() {
        let test_specs = [
            ( r#"<aspectran><settings><setting name="bogus" value="1"/></settings></aspectran>"#,
              "No such default setting name as 'bogus'" ),
            ( r#"<aspectran><translet name="/a"><transform/></translet></aspectran>"#,
              "requires a type attribute" ),
            ( r#"<aspectran><translet name="/a"><redirect/></translet></aspectran>"#,
              "requires a path attribute" ),
            ( r#"<aspectran><translet name="/a"><transform type="yaml"/></translet></aspectran>"#,
              "No transform type for 'yaml'" ),
            ( r#"<aspectran><translet name="/a"><transform type="json" indentSize="wide"/></translet></aspectran>"#,
              "Invalid indentSize 'wide'" ),
            ( r#"<aspectran><translet name="/a"><response><transform type="json"/><transform type="xml"/></response></translet></aspectran>"#,
              "only one response" ),
            ( r#"<aspectran><translet name="/a"><item name="x"/></translet></aspectran>"#,
              "" ),
            ( r#"<aspectran><translet name="/a">"#,
              "not closed" ),
        ];
        for (xml, guess) in test_specs.iter() {
            let context = Rc::new(RefCell::new(RuleParsingContext::shallow(None)));
            let result = AspectranNodeParser::new(Rc::clone(&context), false, false).parse_text(xml);
            match result {
                Err(e) => assert!(e.to_string().contains(guess), "{}: {}", xml, e),
                Ok(()) => assert_eq!(*guess, "", "{}", xml),
            }
        }
    }

    #[test]
    fn test_unknown_bean_class() {
        let context = full_context(&[], None);
        let err = AspectranNodeParser::new(Rc::clone(&context), false, true)
                .parse_text(r#"<aspectran><bean id="x" class="com.example.Missing"/></aspectran>"#)
                .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("com.example.Missing"), "{}", message);
        assert!(message.contains("/aspectran/bean"), "{}", message);
    }

    #[test]
    fn test_validating() {
        let test_specs = [
            ( r#"<!DOCTYPE aspectran PUBLIC "-//ASPECTRAN//DTD Aspectran 1.0//EN" "aspectran-1.0.dtd">
<aspectran>
  <translet name="/a">
    <echo><item name="x">1</item></echo>
    <transform type="json"/>
  </translet>
</aspectran>"#, true ),
            ( r#"<!DOCTYPE aspectran PUBLIC "-//ASPECTRAN//DTD Aspectran 1.0//EN" "aspectran-1.0.dtd">
<aspectran><translet name="/a" bogus="1"/></aspectran>"#, false ),
            ( r#"<!DOCTYPE aspectran PUBLIC "-//ASPECTRAN//DTD Aspectran 1.0//EN" "aspectran-1.0.dtd">
<aspectran><translet/></aspectran>"#, false ),
            ( r#"<aspectran><translet name="/a"/></aspectran>"#, false ),
        ];
        for (xml, guess) in test_specs.iter() {
            let context = Rc::new(RefCell::new(RuleParsingContext::shallow(None)));
            let result = AspectranNodeParser::new(Rc::clone(&context), true, false).parse_text(xml);
            assert_eq!(result.is_ok(), *guess, "{}: {:?}", xml, result);
        }
    }

    #[test]
    fn test_transform_type_lenient() {
        let context = shallow_parse(
            r#"<aspectran><translet name="/a"><transform type="transform/xml"/></translet></aspectran>"#);
        let ctx = context.borrow();
        let translet = &ctx.rule_set().translet_rules[0];
        assert!(translet.response_rules()[0].response.as_ref().unwrap().to_string()
                .contains(TransformType::Xml.as_str()));
    }
}
