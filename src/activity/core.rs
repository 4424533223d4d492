//
// activity/core.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, error, trace, warn};

use crate::activity::adapter::{BasicRequestAdapter, BasicResponseAdapter, RequestAdapter, ResponseAdapter};
use crate::activity::context::ActivityContext;
use crate::activity::evaluator::ItemEvaluator;
use crate::activity::result::{ContentResult, ProcessResult};
use crate::activity::value::{ResultValue, ResultValueMap};
use crate::bean::{Bean, Invocation};
use crate::error::{ActivityError, BoxError};
use crate::parsing::BeanReference;
use crate::response::Response;
use crate::rule::{
    ActionRule, AspectAdviceType, AspectRule, ExceptionRule, ForwardRule, IncludeActionRule,
    ItemRuleMap, ItemValue, JoinpointTarget, JoinpointTargetType, MethodType, TransletRule,
};

/// Nesting limit of forwards and includes.
pub const MAX_ACTIVITY_DEPTH: usize = 16;

/// Attribute holding the error being handled: `{type=..., message=...}`.
pub const EXCEPTION_ATTRIBUTE: &str = "exception";

// ---------------------------------------------------------------------
// What executing an action gives.
//
enum ActionOutcome {
    Value(ResultValue),
    Included(ProcessResult),
    Nothing,
}

// =====================================================================
/// Processes one request against a translet.
///
/// prepare() resolves the translet and sets up the request: path
/// variables and request parameters become parameters, request
/// attributes are evaluated.  perform() then runs, in order:
///
/// 1. the before (and around) advice of the matching aspects;
/// 2. the contents of the translet, one ContentResult per action list;
/// 3. the after (and around) advice;
/// 4. the response of the translet, unless the activity is included;
/// 5. the finally advice, whatever happened before.
///
/// An error in steps 1 to 4 goes to the exceptionRaised advice, then
/// to the first exception-thrown rule selecting its kind, in the
/// aspects and then in the translet.  An error no rule handles is
/// returned.
///
pub struct CoreActivity<'r> {
    context: Arc<ActivityContext>,
    request: &'r mut dyn RequestAdapter,
    response: &'r mut dyn ResponseAdapter,
    translet: Option<Rc<TransletRule>>,
    request_name: Option<String>,
    attributes: ResultValueMap,
    process_result: Option<ProcessResult>,
    advice_results: Vec<(String, AspectAdviceType, ResultValue)>,
    request_beans: RefCell<Vec<(String, Arc<dyn Bean>)>>,
    depth: usize,
    included: bool,
    committed: bool,
}

impl<'r> CoreActivity<'r> {
    pub fn new(context: Arc<ActivityContext>, request: &'r mut dyn RequestAdapter,
            response: &'r mut dyn ResponseAdapter) -> CoreActivity<'r> {
        return CoreActivity::nested(context, request, response, 0);
    }

    fn nested(context: Arc<ActivityContext>, request: &'r mut dyn RequestAdapter,
            response: &'r mut dyn ResponseAdapter, depth: usize) -> CoreActivity<'r> {
        return CoreActivity {
            context,
            request,
            response,
            translet: None,
            request_name: None,
            attributes: ResultValueMap::new(),
            process_result: None,
            advice_results: vec!{},
            request_beans: RefCell::new(vec!{}),
            depth,
            included: false,
            committed: false,
        };
    }

    // -----------------------------------------------------------------
    // Accessors.
    //
    pub fn context(&self) -> &ActivityContext {
        return &self.context;
    }

    pub fn request(&self) -> &dyn RequestAdapter {
        return &*self.request;
    }

    pub fn request_mut(&mut self) -> &mut dyn RequestAdapter {
        return &mut *self.request;
    }

    pub fn response(&self) -> &dyn ResponseAdapter {
        return &*self.response;
    }

    pub fn response_mut(&mut self) -> &mut dyn ResponseAdapter {
        return &mut *self.response;
    }

    pub fn translet(&self) -> Option<&TransletRule> {
        return self.translet.as_deref();
    }

    /// Name the translet was requested by.
    ///
    pub fn translet_name(&self) -> Option<&str> {
        return self.request_name.as_deref();
    }

    pub fn is_included(&self) -> bool {
        return self.included;
    }

    pub fn is_committed(&self) -> bool {
        return self.committed;
    }

    pub fn attribute(&self, name: &str) -> Option<&ResultValue> {
        return self.attributes.get(name);
    }

    pub fn set_attribute<V: Into<ResultValue>>(&mut self, name: &str, value: V) {
        self.attributes.put(name, value);
    }

    pub fn attributes(&self) -> &ResultValueMap {
        return &self.attributes;
    }

    pub fn process_result(&self) -> Option<&ProcessResult> {
        return self.process_result.as_ref();
    }

    pub fn into_process_result(self) -> Option<ProcessResult> {
        return self.process_result;
    }

    /// Value an advice action of the aspect 'aspect_id' produced.
    ///
    pub fn advice_result(&self, aspect_id: &str, advice_type: AspectAdviceType) -> Option<&ResultValue> {
        return self.advice_results.iter().rev()
                .find(|(id, t, _)| id == aspect_id && *t == advice_type)
                .map(|(_, _, v)| v);
    }

    pub fn evaluator(&self) -> ItemEvaluator<'_, 'r> {
        return ItemEvaluator::new(&self.context, Some(self));
    }

    /// Model handed to template engines and view dispatchers: the
    /// results as one map, with the attributes over them.
    ///
    pub fn template_model(&self) -> ResultValueMap {
        let mut model = self.process_result.as_ref()
                .map(|pr| pr.to_value_map())
                .unwrap_or_else(ResultValueMap::new);
        model.merge(self.attributes.clone());
        return model;
    }

    /// Encoding of the translet's response, else of the request.
    ///
    pub fn response_encoding(&self) -> Option<String> {
        return self.translet.as_ref()
                .and_then(|t| t.response_rule.as_ref())
                .and_then(|r| r.encoding.clone())
                .or_else(|| self.request.encoding().map(String::from));
    }

    // -----------------------------------------------------------------
    // Request scoped beans.
    //
    pub fn request_bean(&self, key: &str) -> Option<Arc<dyn Bean>> {
        return self.request_beans.borrow().iter()
                .find(|(k, _)| k == key)
                .map(|(_, b)| Arc::clone(b));
    }

    pub fn put_request_bean(&self, key: &str, bean: Arc<dyn Bean>) {
        self.request_beans.borrow_mut().push((String::from(key), bean));
    }

    // =================================================================
    /// Resolves the translet 'name' for the method of the request.
    ///
    pub fn prepare(&mut self, name: &str) -> Result<(), ActivityError> {
        let method = self.request.method();
        return self.prepare_with_method(name, method);
    }

    pub fn prepare_with_method(&mut self, name: &str, method: MethodType) -> Result<(), ActivityError> {
        let translet = match self.context.translet_rules().lookup(name, method) {
            Some(translet) => Rc::new(translet.clone()),
            None if self.context.translet_rules().contains_name(name) => {
                return Err(ActivityError::MethodNotAllowed {
                    translet: String::from(name),
                    method: method.to_string(),
                });
            },
            None => return Err(ActivityError::TransletNotFound(String::from(name))),
        };
        debug!("translet {} ({} {})", translet, method, name);

        for (var, value) in translet.path_variables(name).into_iter() {
            self.request.set_parameter(&var, vec![value]);
        }
        self.translet = Some(Rc::clone(&translet));
        self.request_name = Some(String::from(name));

        if let Some(ref request_rule) = translet.request_rule {
            if let Some(ref encoding) = request_rule.encoding {
                self.request.set_encoding(Some(encoding));
            }
            if let Some(ref parameters) = request_rule.parameters {
                let values = self.request_parameters(parameters)?;
                for (name, values) in values.into_iter() {
                    self.request.set_parameter(&name, values);
                }
            }
            if let Some(ref attributes) = request_rule.attributes {
                let values = self.evaluator().evaluate_item_rule_map(attributes)?;
                self.attributes.merge(values);
            }
        }
        return Ok(());
    }

    // -----------------------------------------------------------------
    // Values of the declared request parameters.  An item without a
    // value keeps what the request carries.
    //
    fn request_parameters(&self, irm: &ItemRuleMap)
            -> Result<Vec<(String, Vec<String>)>, ActivityError> {
        let irm = if irm.has_candidates() {
            Cow::Owned(irm.effective(self.context.environment()))
        } else {
            Cow::Borrowed(irm)
        };
        let evaluator = self.evaluator();
        let mut params: Vec<(String, Vec<String>)> = vec!{};
        for item in irm.iter() {
            let values: Vec<String> = match item.value() {
                ItemValue::Single(None) => self.request.parameter_values(item.name())
                        .map(|v| v.to_vec())
                        .unwrap_or_default(),
                _ => parameter_strings(&evaluator.evaluate_item(item)?),
            };
            if values.is_empty() {
                if item.is_mandatory() {
                    return Err(ActivityError::MandatoryItemMissing(String::from(item.name())));
                }
                continue;
            }
            params.push((String::from(item.name()), values));
        }
        return Ok(params);
    }

    // =================================================================
    /// Runs the prepared translet.
    ///
    pub fn perform(&mut self) -> Result<(), ActivityError> {
        let translet = self.translet.clone().ok_or(ActivityError::NotPrepared)?;
        let context = Arc::clone(&self.context);
        let aspects = self.matching_aspects(&context);
        trace!("{} aspects apply to {}", aspects.len(), translet.name());

        let outcome = match self.perform_translet(&translet, &aspects) {
            Err(e) => self.handle_exception(&translet, &aspects, e),
            ok => ok,
        };
        let finally = self.run_advice(&aspects, AspectAdviceType::Finally);
        if let (Err(_), Err(e)) = (&outcome, &finally) {
            error!("Error in finally advice: {}", e);
        }
        outcome?;
        return finally;
    }

    fn perform_translet(&mut self, translet: &TransletRule, aspects: &[&AspectRule])
            -> Result<(), ActivityError> {
        self.run_advice(aspects, AspectAdviceType::Before)?;
        self.produce(translet)?;
        self.run_advice(aspects, AspectAdviceType::After)?;
        if ! self.included {
            self.respond(translet)?;
        }
        return Ok(());
    }

    // -----------------------------------------------------------------
    // Enabled translet aspects whose pointcut takes the request name,
    // in aspect order.
    //
    fn matching_aspects<'c>(&self, context: &'c ActivityContext) -> Vec<&'c AspectRule> {
        let name = self.request_name.as_deref().unwrap_or("");
        let target = JoinpointTarget::translet(name);
        let method = Some(self.request.method());
        return context.aspect_rules().ordered_aspect_rules().into_iter()
                .filter(|a| ! a.disabled)
                .filter(|a| a.joinpoint.target == JoinpointTargetType::Translet)
                .filter(|a| a.joinpoint.matches(method, &target))
                .collect();
    }

    fn run_advice(&mut self, aspects: &[&AspectRule], advice_type: AspectAdviceType)
            -> Result<(), ActivityError> {
        for aspect in aspects.iter() {
            for advice in aspect.advice_rules_for(advice_type).into_iter() {
                let action = match advice.action {
                    Some(ref action) => action,
                    None => continue,
                };
                trace!("{} advice of aspect {}", advice_type, aspect.id);
                let advice_bean = advice_bean_reference(aspect);
                if let ActionOutcome::Value(value) = self.execute_action(action, advice_bean.as_ref())? {
                    self.advice_results.push((aspect.id.clone(), advice_type, value));
                }
            }
        }
        return Ok(());
    }

    // -----------------------------------------------------------------
    // The content pipeline.
    //
    fn produce(&mut self, translet: &TransletRule) -> Result<(), ActivityError> {
        let content_list = match translet.content_list() {
            Some(content_list) => content_list,
            None => return Ok(()),
        };
        if self.process_result.is_none() {
            self.process_result = Some(ProcessResult::new(content_list.name(), content_list.is_omittable()));
        }
        for action_list in content_list.action_lists().iter() {
            let mut content = ContentResult::new(action_list.name(), action_list.is_omittable());
            content.set_explicit(translet.is_explicit_content());
            self.add_content_result(content);
            for action in action_list.actions().iter() {
                let outcome = self.execute_action(action, None)?;
                if action_list.is_hidden() || action.is_hidden() {
                    continue;
                }
                self.store_outcome(action.action_id(), outcome);
            }
        }
        return Ok(());
    }

    fn add_content_result(&mut self, content: ContentResult) {
        self.process_result.get_or_insert_with(|| ProcessResult::new(None, true))
                .add_content_result(content);
    }

    fn store_outcome(&mut self, action_id: Option<&str>, outcome: ActionOutcome) {
        let content = match self.process_result.as_mut().and_then(|pr| pr.last_content_result_mut()) {
            Some(content) => content,
            None => return,
        };
        match outcome {
            ActionOutcome::Value(value) => content.put_result_value(action_id, value),
            ActionOutcome::Included(pr) => content.add_process_result(action_id, pr),
            ActionOutcome::Nothing => {},
        }
    }

    // -----------------------------------------------------------------
    // Executes one action.  A bean action naming no bean calls the
    // advice bean of its aspect.
    //
    fn execute_action(&mut self, action: &ActionRule, advice_bean: Option<&BeanReference>)
            -> Result<ActionOutcome, ActivityError> {
        trace!("action {}", action);
        return match action {
            ActionRule::Bean(rule) => {
                let reference = match (rule.bean_id.as_deref(), rule.bean_class.as_deref(), advice_bean) {
                    (Some(id), _, _) => BeanReference::parse(id),
                    (None, Some(class), _) => BeanReference::Class(String::from(class)),
                    (None, None, Some(reference)) => reference.clone(),
                    (None, None, None) => return Err(action_error(action, "No bean to invoke")),
                };
                let evaluator = self.evaluator();
                let bean = self.context.bean_registry().get_bean(&reference, &evaluator)?;
                let mut invocation = Invocation::new();
                invocation.translet_name = self.request_name.clone();
                if let Some(ref arguments) = rule.arguments {
                    invocation.arguments = evaluator.evaluate_item_rule_map(arguments)?;
                }
                if let Some(ref properties) = rule.properties {
                    invocation.properties = evaluator.evaluate_item_rule_map(properties)?;
                }
                let value = bean.invoke(&rule.method, &invocation)
                        .map_err(|e| action_error(action, e))?;
                Ok(ActionOutcome::Value(value))
            },
            ActionRule::Echo(rule) => {
                let values = match rule.items {
                    Some(ref items) => self.evaluator().evaluate_item_rule_map(items)?,
                    None => ResultValueMap::new(),
                };
                Ok(ActionOutcome::Value(ResultValue::Map(values)))
            },
            ActionRule::Header(rule) => {
                let headers = self.evaluator().evaluate_item_rule_map(&rule.headers)?;
                for (name, value) in headers.into_iter() {
                    if ! value.is_null() {
                        self.response.set_header(&name, &value.to_string());
                    }
                }
                Ok(ActionOutcome::Nothing)
            },
            ActionRule::Include(rule) => Ok(ActionOutcome::Included(self.include(rule)?)),
        };
    }

    // -----------------------------------------------------------------
    // Runs another translet on a copy of the request and takes its
    // results; nothing is written to the response.
    //
    fn include(&mut self, rule: &IncludeActionRule) -> Result<ProcessResult, ActivityError> {
        if self.depth + 1 >= MAX_ACTIVITY_DEPTH {
            return Err(ActivityError::TooDeep(self.depth + 1));
        }
        let (parameters, attributes) = {
            let evaluator = self.evaluator();
            let parameters = match rule.parameters {
                Some(ref irm) => evaluator.evaluate_item_rule_map(irm)?,
                None => ResultValueMap::new(),
            };
            let attributes = match rule.attributes {
                Some(ref irm) => evaluator.evaluate_item_rule_map(irm)?,
                None => ResultValueMap::new(),
            };
            (parameters, attributes)
        };
        let method = rule.method.unwrap_or_else(|| self.request.method());
        debug!("include translet {} ({})", rule.translet_name, method);

        let mut request = BasicRequestAdapter::new(method);
        for name in self.request.parameter_names().into_iter() {
            if let Some(values) = self.request.parameter_values(name) {
                request.set_parameter(name, values.to_vec());
            }
        }
        request.set_encoding(self.request.encoding());
        for (name, value) in parameters.iter() {
            request.set_parameter(name, parameter_strings(value));
        }
        let mut response = BasicResponseAdapter::new();

        let mut activity = CoreActivity::nested(Arc::clone(&self.context),
                &mut request, &mut response, self.depth + 1);
        activity.included = true;
        activity.attributes = self.attributes.clone();
        activity.attributes.merge(attributes);
        activity.prepare_with_method(&rule.translet_name, method)?;
        activity.perform()?;
        return Ok(activity.into_process_result().unwrap_or_default());
    }

    // =================================================================
    /// Processes the translet of 'rule' with this activity's request,
    /// response, attributes and results.
    ///
    pub fn forward(&mut self, rule: &ForwardRule) -> Result<(), ActivityError> {
        if self.depth + 1 >= MAX_ACTIVITY_DEPTH {
            return Err(ActivityError::TooDeep(self.depth + 1));
        }
        let mut attributes = self.attributes.clone();
        if let Some(ref irm) = rule.attributes {
            attributes.merge(self.evaluator().evaluate_item_rule_map(irm)?);
        }
        let method = rule.method.unwrap_or_else(|| self.request.method());
        debug!("forward to translet {} ({})", rule.translet_name, method);

        let context = Arc::clone(&self.context);
        let process_result = self.process_result.take();
        let depth = self.depth + 1;
        let mut activity = CoreActivity::nested(context, &mut *self.request, &mut *self.response, depth);
        activity.attributes = attributes;
        activity.process_result = process_result;
        activity.prepare_with_method(&rule.translet_name, method)?;
        activity.perform()?;
        self.committed = activity.committed;
        return Ok(());
    }

    // -----------------------------------------------------------------
    //
    fn respond(&mut self, translet: &TransletRule) -> Result<(), ActivityError> {
        let response = match translet.response_rule.as_ref().and_then(|r| r.response.clone()) {
            Some(response) => response,
            None => {
                trace!("No response for {}", translet.name());
                return Ok(());
            },
        };
        return self.commit(response);
    }

    fn commit(&mut self, response: Arc<dyn Response>) -> Result<(), ActivityError> {
        self.committed = true;
        return response.commit(self);
    }

    // -----------------------------------------------------------------
    // Gives 'err' to the exceptionRaised advice and to the exception
    // rules; Ok when one of the rules handled it.
    //
    fn handle_exception(&mut self, translet: &TransletRule, aspects: &[&AspectRule],
            err: ActivityError) -> Result<(), ActivityError> {
        warn!("{} raised in {}: {}", err.kind(), translet.name(), err);
        let mut exception = ResultValueMap::new();
        exception.put("type", err.kind());
        exception.put("message", err.to_string());
        self.attributes.put(EXCEPTION_ATTRIBUTE, exception);

        self.run_advice(aspects, AspectAdviceType::ExceptionRaised)?;

        for aspect in aspects.iter() {
            if let Some(ref exception_rule) = aspect.exception_rule {
                let advice_bean = advice_bean_reference(aspect);
                if self.handle_thrown(translet, exception_rule, advice_bean.as_ref(), &err)? {
                    return Ok(());
                }
            }
        }
        if let Some(ref exception_rule) = translet.exception_rule {
            if self.handle_thrown(translet, exception_rule, None, &err)? {
                return Ok(());
            }
        }
        return Err(err);
    }

    fn handle_thrown(&mut self, translet: &TransletRule, exception_rule: &ExceptionRule,
            advice_bean: Option<&BeanReference>, err: &ActivityError) -> Result<bool, ActivityError> {
        let thrown = match exception_rule.exception_thrown_rule(err.kind()) {
            Some(thrown) => thrown,
            None => return Ok(false),
        };
        debug!("handling {} with thrown rule {:?}", err.kind(), thrown.exception_types);
        if let Some(ref action) = thrown.action {
            self.add_content_result(ContentResult::new(None, true));
            let outcome = self.execute_action(action, advice_bean)?;
            if ! action.is_hidden() {
                self.store_outcome(action.action_id(), outcome);
            }
        }
        if self.included {
            return Ok(true);
        }
        let content_type = translet.content_type()
                .map(String::from)
                .or_else(|| self.response.content_type().map(String::from));
        let response = content_type.as_deref()
                .and_then(|ct| thrown.response_for(ct))
                .or_else(|| thrown.default_response());
        if let Some(response) = response {
            self.commit(response)?;
        }
        return Ok(true);
    }
}

// ---------------------------------------------------------------------
// The advice bean of an aspect, by id or by class.
//
fn advice_bean_reference(aspect: &AspectRule) -> Option<BeanReference> {
    if let Some(ref id) = aspect.advice_bean_id {
        return Some(BeanReference::parse(id));
    }
    return aspect.advice_bean_class.as_ref().map(|class| BeanReference::Class(class.clone()));
}

fn action_error<E: Into<BoxError>>(action: &ActionRule, source: E) -> ActivityError {
    return ActivityError::Action {
        action: action.to_string(),
        source: source.into(),
    };
}

// ---------------------------------------------------------------------
// A value as request parameter values; nulls are dropped.
//
fn parameter_strings(value: &ResultValue) -> Vec<String> {
    return match value {
        ResultValue::Null => vec!{},
        ResultValue::List(list) => list.iter()
                .filter(|v| ! v.is_null())
                .map(|v| v.to_string())
                .collect(),
        v => vec![v.to_string()],
    };
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    use crate::env::{ContextConfig, NoPropertySource};
    use crate::activity::context::ActivityContextBuilder;

    fn build(xml: &str) -> Arc<ActivityContext> {
        return ActivityContextBuilder::new(ContextConfig::default())
                .property_source(NoPropertySource)
                .build_from_text(xml)
                .unwrap();
    }

    fn run(context: &Arc<ActivityContext>, name: &str, method: MethodType, params: &[(&str, &str)])
            -> (Result<(), ActivityError>, BasicResponseAdapter) {
        let mut request = BasicRequestAdapter::new(method);
        for (param, value) in params.iter() {
            request.add_parameter(param, value);
        }
        let mut response = BasicResponseAdapter::new();
        let result = {
            let mut activity = CoreActivity::new(Arc::clone(context), &mut request, &mut response);
            activity.prepare(name).and_then(|_| activity.perform())
        };
        return (result, response);
    }

    const HELLO: &str = r#"
<aspectran>
  <translet name="/hello">
    <echo><item name="msg">hi</item></echo>
    <transform type="json"/>
  </translet>
</aspectran>"#;

    #[test]
    fn test_echo_as_json() {
        let context = build(HELLO);
        let (result, response) = run(&context, "/hello", MethodType::Get, &[]);
        result.unwrap();
        assert_eq!(response.body(), r#"{"msg":"hi"}"#);
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(response.redirected(), None);

        let (result, response) = run(&context, "/hello", MethodType::Get, &[("callback", "cb")]);
        result.unwrap();
        assert_eq!(response.body(), r#"cb({"msg":"hi"})"#);
    }

    #[test]
    fn test_indent_size() {
        let context = build(r#"
<aspectran>
  <translet name="/json">
    <echo><item name="msg">hi</item></echo>
    <transform type="json" indentSize="3"/>
  </translet>
  <translet name="/xml">
    <echo><item name="msg">hi</item></echo>
    <transform type="xml" indentSize="4"/>
  </translet>
</aspectran>"#);
        let (result, response) = run(&context, "/json", MethodType::Get, &[]);
        result.unwrap();
        assert_eq!(response.body(), "{\n   \"msg\": \"hi\"\n}");

        let (result, response) = run(&context, "/xml", MethodType::Get, &[]);
        result.unwrap();
        let body = response.body();
        assert!(body.contains("<msg>hi</msg>"), "{}", body);
        assert!(body.lines().any(|l| l.starts_with("    <")), "{}", body);
        assert!(body.lines().all(|l| (l.len() - l.trim_start().len()) % 4 == 0), "{}", body);
        assert_eq!(response.content_type(), Some("application/xml"));
    }

    #[test]
    fn test_prepare_errors() {
        let context = build(r#"
<aspectran>
  <translet name="/post" method="post">
    <echo><item name="msg">hi</item></echo>
  </translet>
  <translet name="/need">
    <request>
      <parameters><item name="id" mandatory="true"/></parameters>
    </request>
  </translet>
</aspectran>"#);
        let test_specs = [
            ( "/none", MethodType::Get, "TransletNotFound" ),
            ( "/post", MethodType::Get, "MethodNotAllowed" ),
            ( "/need", MethodType::Get, "MandatoryItemMissing" ),
        ];
        for (name, method, guess) in test_specs.iter() {
            let (result, _) = run(&context, name, *method, &[]);
            assert_eq!(result.unwrap_err().kind(), *guess, "{}", name);
        }
        let (result, _) = run(&context, "/need", MethodType::Get, &[("id", "7")]);
        result.unwrap();
    }

    #[test]
    fn test_not_prepared() {
        let context = build(HELLO);
        let mut request = BasicRequestAdapter::new(MethodType::Get);
        let mut response = BasicResponseAdapter::new();
        let mut activity = CoreActivity::new(context, &mut request, &mut response);
        assert_eq!(activity.perform().unwrap_err().kind(), "NotPrepared");
    }

    #[test]
    fn test_bean_action() {
        let context = build(r#"
<aspectran>
  <bean id="props" class="aspectran.bean.PropertiesBean">
    <properties><item name="greeting">hello</item></properties>
  </bean>
  <translet name="/props">
    <action id="all" bean="props" method="getAll"/>
    <transform type="json"/>
  </translet>
</aspectran>"#);
        let (result, response) = run(&context, "/props", MethodType::Get, &[]);
        result.unwrap();
        assert_eq!(response.body(), r#"{"all":{"greeting":"hello"}}"#);
    }

    #[test]
    fn test_exception_handling() {
        let context = build(r#"
<aspectran>
  <bean id="props" class="aspectran.bean.PropertiesBean"/>
  <translet name="/broken">
    <action id="x" bean="props" method="nope"/>
    <transform type="json"/>
    <exception>
      <thrown type="ActionError">
        <echo id="error"><item name="handled">yes</item></echo>
        <transform type="json"/>
      </thrown>
    </exception>
  </translet>
  <translet name="/unhandled">
    <action bean="props" method="nope"/>
  </translet>
</aspectran>"#);
        let (result, response) = run(&context, "/broken", MethodType::Get, &[]);
        result.unwrap();
        assert_eq!(response.body(), r#"{"error":{"handled":"yes"}}"#);

        let (result, _) = run(&context, "/unhandled", MethodType::Get, &[]);
        assert_eq!(result.unwrap_err().kind(), "ActionError");
    }

    #[test]
    fn test_before_advice() {
        let context = build(r#"
<aspectran>
  <aspect id="greeter">
    <joinpoint target="translet"/>
    <advice>
      <before><echo id="greet"><item name="to">all</item></echo></before>
    </advice>
  </aspect>
  <translet name="/hello">
    <echo><item name="msg">hi</item></echo>
  </translet>
</aspectran>"#);
        let mut request = BasicRequestAdapter::new(MethodType::Get);
        let mut response = BasicResponseAdapter::new();
        let mut activity = CoreActivity::new(context, &mut request, &mut response);
        activity.prepare("/hello").unwrap();
        activity.perform().unwrap();
        assert!(activity.advice_result("greeter", AspectAdviceType::Before).is_some());
        assert!(activity.advice_result("greeter", AspectAdviceType::After).is_none());
    }

    #[test]
    fn test_include_and_forward() {
        let context = build(r#"
<aspectran>
  <translet name="/hello">
    <echo><item name="msg">hi</item></echo>
    <transform type="json"/>
  </translet>
  <translet name="/page">
    <include id="inc" translet="/hello"/>
    <transform type="json"/>
  </translet>
  <translet name="/fwd">
    <forward translet="/hello"/>
  </translet>
</aspectran>"#);
        let test_specs = [
            ( "/page", r#"{"inc":{"msg":"hi"}}"# ),
            ( "/fwd", r#"{"msg":"hi"}"# ),
        ];
        for (name, guess) in test_specs.iter() {
            let (result, response) = run(&context, name, MethodType::Get, &[]);
            result.unwrap();
            assert_eq!(response.body(), *guess, "{}", name);
        }
    }

    #[test]
    fn test_redirect() {
        let context = build(r#"
<aspectran>
  <translet name="/go">
    <redirect path="/target">
      <parameters><item name="q">${q}</item></parameters>
    </redirect>
  </translet>
</aspectran>"#);
        let (result, response) = run(&context, "/go", MethodType::Get, &[("q", "a b")]);
        result.unwrap();
        assert_eq!(response.redirected(), Some("/target?q=a%20b"));
    }

    #[test]
    fn test_parameter_strings() {
        let test_specs = [
            ( ResultValue::Null, vec!{} ),
            ( ResultValue::from("a"), vec!["a"] ),
            ( ResultValue::Int(3), vec!["3"] ),
            ( ResultValue::List(vec![ResultValue::from("x"), ResultValue::Null, ResultValue::Bool(true)]),
              vec!["x", "true"] ),
        ];
        for (value, guess) in test_specs.iter() {
            assert_eq!(parameter_strings(value), *guess);
        }
    }
}
