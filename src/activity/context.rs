//
// activity/context.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::activity::evaluator::ItemEvaluator;
use crate::activity::value::{ResultValue, ResultValueMap};
use crate::bean::{Bean, BeanClassRegistry, BeanRegistry};
use crate::env::{ContextConfig, EnvVarPropertySource, EnvironmentProfiles, PropertySource};
use crate::error::{ActivityError, ContextError};
use crate::parser::AspectranNodeParser;
use crate::parsing::{
    AspectRuleRegistry, DefaultSettings, RuleParsingContext, ScheduleRuleRegistry,
    TemplateRuleRegistry, TransletRuleRegistry,
};
use crate::response::{TemplateRenderer, TokenTemplateRenderer};
use crate::rule::{DescriptionRule, EnvironmentRule, TemplateRule};

// =====================================================================
/// Everything a configuration declares, ready to process requests.
///
/// The rule registries are read-only; the bean registry caches the
/// beans it creates.  A context is shared by every activity through
/// an Arc.
///
pub struct ActivityContext {
    config: ContextConfig,
    environment: Arc<EnvironmentProfiles>,
    description: Option<DescriptionRule>,
    default_settings: Option<Arc<DefaultSettings>>,
    environment_rules: Vec<EnvironmentRule>,
    aspect_rules: AspectRuleRegistry,
    schedule_rules: ScheduleRuleRegistry,
    template_rules: TemplateRuleRegistry,
    translet_rules: TransletRuleRegistry,
    bean_registry: BeanRegistry,
    properties: OnceCell<ResultValueMap>,
    template_renderer: Box<dyn TemplateRenderer>,
}

impl fmt::Debug for ActivityContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ActivityContext")
            .field("base_path", &self.config.base_path)
            .field("aspects", &self.aspect_rules.len())
            .field("translets", &self.translet_rules.len())
            .field("templates", &self.template_rules.len())
            .field("beans", &self.bean_registry)
            .finish()
    }
}

impl ActivityContext {
    pub fn config(&self) -> &ContextConfig {
        return &self.config;
    }

    pub fn environment(&self) -> &EnvironmentProfiles {
        return &self.environment;
    }

    pub fn description(&self) -> Option<&DescriptionRule> {
        return self.description.as_ref();
    }

    pub fn default_settings(&self) -> Option<&DefaultSettings> {
        return self.default_settings.as_deref();
    }

    pub fn aspect_rules(&self) -> &AspectRuleRegistry {
        return &self.aspect_rules;
    }

    pub fn schedule_rules(&self) -> &ScheduleRuleRegistry {
        return &self.schedule_rules;
    }

    pub fn template_rules(&self) -> &TemplateRuleRegistry {
        return &self.template_rules;
    }

    pub fn translet_rules(&self) -> &TransletRuleRegistry {
        return &self.translet_rules;
    }

    pub fn bean_registry(&self) -> &BeanRegistry {
        return &self.bean_registry;
    }

    pub fn template_rule(&self, id: &str) -> Option<&TemplateRule> {
        return self.template_rules.template_rule(id);
    }

    pub fn template_renderer(&self) -> &dyn TemplateRenderer {
        return self.template_renderer.as_ref();
    }

    /// Property of the active `<environment>` blocks, for `%{name}`.
    ///
    pub fn property(&self, name: &str) -> Option<&ResultValue> {
        return self.properties.get().and_then(|p| p.get(name));
    }

    pub fn properties(&self) -> Option<&ResultValueMap> {
        return self.properties.get();
    }

    /// Resolves 'name' against the base path.
    ///
    pub fn resolve_path(&self, name: &str) -> PathBuf {
        return self.config.resolve_path(name);
    }

    // -----------------------------------------------------------------
    // Evaluates the environment properties, then creates the eager
    // singletons.  Properties are evaluated without an activity, and a
    // property cannot refer to another one.
    //
    fn initialize(&self) -> Result<(), ActivityError> {
        let evaluator = ItemEvaluator::new(self, None);
        let mut properties = ResultValueMap::new();
        for rule in self.environment_rules.iter().filter(|r| r.is_active(&self.environment)) {
            if let Some(irm) = rule.properties() {
                properties.merge(evaluator.evaluate_item_rule_map(irm)?);
            }
        }
        debug!("{} environment properties", properties.len());
        if self.properties.set(properties).is_err() {
            warn!("Environment properties are already set");
        }
        self.bean_registry.initialize(&evaluator)?;
        return Ok(());
    }

    // -----------------------------------------------------------------
    /// Destroys the singleton beans.
    ///
    pub fn destroy(&self) {
        info!("Destroying the activity context ({} singletons)", self.bean_registry.singleton_count());
        self.bean_registry.destroy();
    }
}

// ---------------------------------------------------------------------
//
enum RuleSource {
    File(PathBuf),
    Text(String),
}

// =====================================================================
/// Builds an ActivityContext: parses the configuration, checks the
/// bean references, hands the registries over and creates the eager
/// singletons.
///
/// ```
/// use aspectran::activity::ActivityContextBuilder;
/// use aspectran::env::{ContextConfig, NoPropertySource};
///
/// let context = ActivityContextBuilder::new(ContextConfig::default())
///         .property_source(NoPropertySource)
///         .build_from_text(r#"<aspectran><translet name="/hi"/></aspectran>"#)
///         .unwrap();
/// assert_eq!(context.translet_rules().len(), 1);
/// ```
///
pub struct ActivityContextBuilder {
    config: ContextConfig,
    classes: BeanClassRegistry,
    property_source: Box<dyn PropertySource>,
    template_renderer: Option<Box<dyn TemplateRenderer>>,
}

impl ActivityContextBuilder {
    pub fn new(config: ContextConfig) -> ActivityContextBuilder {
        return ActivityContextBuilder {
            config,
            classes: BeanClassRegistry::with_builtins(),
            property_source: Box::new(EnvVarPropertySource),
            template_renderer: None,
        };
    }

    /// Replaces the bean classes.
    ///
    pub fn classes(mut self, classes: BeanClassRegistry) -> ActivityContextBuilder {
        self.classes = classes;
        return self;
    }

    pub fn register_class<F>(mut self, class_name: &str, constructor: F) -> ActivityContextBuilder
            where F: Fn() -> Box<dyn Bean> + Send + Sync + 'static {
        self.classes.register(class_name, constructor);
        return self;
    }

    /// Where `aspectran.profiles.*` are read from; the default is the
    /// environment variables.
    ///
    pub fn property_source<S: PropertySource + 'static>(mut self, source: S) -> ActivityContextBuilder {
        self.property_source = Box::new(source);
        return self;
    }

    pub fn template_renderer<R: TemplateRenderer + 'static>(mut self, renderer: R) -> ActivityContextBuilder {
        self.template_renderer = Some(Box::new(renderer));
        return self;
    }

    // -----------------------------------------------------------------
    /// Builds from the configured file, resolved against the base path.
    ///
    pub fn build(self) -> Result<Arc<ActivityContext>, ContextError> {
        let path = match self.config.config_file {
            Some(ref name) => self.config.resolve_path(name),
            None => return Err(ContextError::NoConfigFile),
        };
        return self.build_with(RuleSource::File(path));
    }

    pub fn build_from_text(self, text: &str) -> Result<Arc<ActivityContext>, ContextError> {
        return self.build_with(RuleSource::Text(String::from(text)));
    }

    fn build_with(self, source: RuleSource) -> Result<Arc<ActivityContext>, ContextError> {
        let environment = Arc::new(self.config.environment_profiles(self.property_source.as_ref())?);
        let classes = Arc::new(self.classes);
        let parsing_context = Rc::new(RefCell::new(RuleParsingContext::new(
                Arc::clone(&environment), Arc::clone(&classes), self.config.base_path.clone())));
        parsing_context.borrow_mut().prepare();

        {
            let mut parser = AspectranNodeParser::new(Rc::clone(&parsing_context),
                    self.config.validating, self.config.tracking_location);
            match source {
                RuleSource::File(ref path) => {
                    info!("Loading configuration {}", path.display());
                    parser.parse_file(path)?;
                },
                RuleSource::Text(ref text) => parser.parse_text(text)?,
            }
        }

        let parsed = {
            let mut pc = parsing_context.borrow_mut();
            pc.inspect_bean_references()?;
            if pc.is_pointcut_pattern_verifiable() {
                let unknown = pc.verify_pointcut_patterns();
                if unknown > 0 {
                    warn!("{} pointcut patterns refer to unknown beans", unknown);
                }
            }
            pc.release()
        };
        let registries = parsed.registries.unwrap_or_default();

        let context = Arc::new(ActivityContext {
            config: self.config,
            environment,
            description: parsed.description,
            default_settings: parsed.default_settings,
            environment_rules: parsed.environment_rules,
            aspect_rules: registries.aspect,
            schedule_rules: registries.schedule,
            template_rules: registries.template,
            translet_rules: registries.translet,
            bean_registry: BeanRegistry::new(registries.bean, classes),
            properties: OnceCell::new(),
            template_renderer: self.template_renderer
                    .unwrap_or_else(|| Box::new(TokenTemplateRenderer::new())),
        });
        context.initialize()?;
        info!("Activity context built: {} translets, {} aspects, {} beans",
                context.translet_rules.len(), context.aspect_rules.len(),
                context.bean_registry.bean_rules().len());
        return Ok(context);
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    use crate::env::NoPropertySource;

    fn build(xml: &str) -> Result<Arc<ActivityContext>, ContextError> {
        return ActivityContextBuilder::new(ContextConfig::default())
                .property_source(NoPropertySource)
                .build_from_text(xml);
    }

    #[test]
    fn test_environment_properties() {
        let context = build(r#"
<aspectran>
  <environment>
    <properties>
      <item name="db.url">jdbc:h2:mem</item>
    </properties>
  </environment>
  <environment profile="prod">
    <properties>
      <item name="db.url">jdbc:prod</item>
    </properties>
  </environment>
</aspectran>"#).unwrap();
        assert_eq!(context.property("db.url"), Some(&ResultValue::from("jdbc:h2:mem")));
        assert_eq!(context.property("none"), None);
    }

    #[test]
    fn test_active_profile_from_source() {
        let mut source: HashMap<String, String> = HashMap::new();
        source.insert(String::from("aspectran.profiles.active"), String::from("prod"));
        let context = ActivityContextBuilder::new(ContextConfig::default())
                .property_source(source)
                .build_from_text(r#"
<aspectran>
  <environment profile="prod">
    <properties>
      <item name="mode">production</item>
    </properties>
  </environment>
</aspectran>"#).unwrap();
        assert!(context.environment().is_profile_active("prod"));
        assert_eq!(context.property("mode"), Some(&ResultValue::from("production")));
    }

    #[test]
    fn test_eager_singletons() {
        let context = build(r#"
<aspectran>
  <bean id="props" class="aspectran.bean.PropertiesBean">
    <properties>
      <item name="greeting">hello</item>
    </properties>
  </bean>
  <bean id="lazy" class="aspectran.bean.PropertiesBean" lazyInit="true"/>
</aspectran>"#).unwrap();
        assert_eq!(context.bean_registry().singleton_count(), 1);
        context.destroy();
        assert_eq!(context.bean_registry().singleton_count(), 0);
    }

    #[test]
    fn test_unknown_class() {
        let err = build(r#"<aspectran><bean id="x" class="com.example.Missing"/></aspectran>"#)
                .unwrap_err();
        assert!(err.to_string().contains("com.example.Missing"), "{}", err);
    }

    #[test]
    fn test_build_from_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.xml"),
                r#"<aspectran><translet name="/a"/><translet name="/b"/></aspectran>"#).unwrap();
        let config = ContextConfig {
            base_path: Some(dir.path().to_path_buf()),
            config_file: Some(String::from("app.xml")),
            ..ContextConfig::default()
        };
        let context = ActivityContextBuilder::new(config)
                .property_source(NoPropertySource)
                .build()
                .unwrap();
        assert_eq!(context.translet_rules().len(), 2);

        let err = ActivityContextBuilder::new(ContextConfig::default()).build().unwrap_err();
        assert_eq!(err.to_string(), "No configuration file specified");
    }
}
