//
// bean/registry.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tracing::{debug, trace, warn};

use crate::activity::{ItemEvaluator, ResultValue};
use crate::bean::class::{Bean, BeanClassRegistry, Invocation, ValueBean};
use crate::error::{ActivityError, BoxError};
use crate::parsing::{BeanReference, BeanRuleRegistry};
use crate::rule::{BeanRule, ItemRuleMap, ScopeType, CLASS_DIRECTIVE_PREFIX};

// ---------------------------------------------------------------------
//
struct Singleton {
    key: String,
    bean: Arc<dyn Bean>,
    destroy_method: Option<String>,
}

// =====================================================================
/// Creates beans from their rules.
///
/// Singletons (and session beans, which live as long as the context)
/// are cached once created; the cache is not locked while a bean is
/// being created, so a bean may refer to other beans through its
/// properties.  Request beans are cached by the activity; prototype
/// beans are created on every reference.
///
pub struct BeanRegistry {
    rules: BeanRuleRegistry,
    classes: Arc<BeanClassRegistry>,
    singletons: Mutex<Vec<Singleton>>,
    creating: Mutex<Vec<(ThreadId, String)>>,
}

impl fmt::Debug for BeanRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BeanRegistry")
            .field("rules", &self.rules.len())
            .field("classes", &self.classes)
            .field("singletons", &lock(&self.singletons).len())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    return mutex.lock().unwrap_or_else(PoisonError::into_inner);
}

fn creation_error<E: Into<BoxError>>(key: &str, source: E) -> ActivityError {
    return ActivityError::BeanCreation {
        bean: String::from(key),
        source: source.into(),
    };
}

// Key of a bean rule: its id, else "class:" and its class name.
//
fn bean_key(rule: &BeanRule) -> String {
    return match (rule.id.as_ref(), rule.class_name.as_ref()) {
        (Some(id), _) => id.clone(),
        (None, Some(class)) => format!("{}{}", CLASS_DIRECTIVE_PREFIX, class),
        (None, None) => String::new(),
    };
}

// ---------------------------------------------------------------------
// Marks a bean as being created by the current thread.
//
struct CreationGuard<'a> {
    creating: &'a Mutex<Vec<(ThreadId, String)>>,
    entry: (ThreadId, String),
}

impl<'a> Drop for CreationGuard<'a> {
    fn drop(&mut self) {
        let mut creating = lock(self.creating);
        if let Some(pos) = creating.iter().rposition(|e| *e == self.entry) {
            creating.remove(pos);
        }
    }
}

impl BeanRegistry {
    pub fn new(rules: BeanRuleRegistry, classes: Arc<BeanClassRegistry>) -> BeanRegistry {
        return BeanRegistry {
            rules,
            classes,
            singletons: Mutex::new(vec!{}),
            creating: Mutex::new(vec!{}),
        };
    }

    pub fn bean_rules(&self) -> &BeanRuleRegistry {
        return &self.rules;
    }

    pub fn class_registry(&self) -> &BeanClassRegistry {
        return &self.classes;
    }

    pub fn contains(&self, reference: &BeanReference) -> bool {
        return self.find_bean_rule(reference).is_ok();
    }

    // -----------------------------------------------------------------
    /// The rule a reference denotes; a class reference takes the rule
    /// declared last.
    ///
    pub fn find_bean_rule(&self, reference: &BeanReference) -> Result<&BeanRule, ActivityError> {
        let rule = match reference {
            BeanReference::Id(id) => self.rules.bean_rule(id),
            BeanReference::Class(class) => self.rules.bean_rules_of_class(class).into_iter().next(),
        };
        return rule.ok_or_else(|| ActivityError::BeanNotFound(reference.to_string()));
    }

    pub fn get_bean(&self, reference: &BeanReference, evaluator: &ItemEvaluator)
            -> Result<Arc<dyn Bean>, ActivityError> {
        let rule = self.find_bean_rule(reference)?;
        return self.get_bean_of_rule(rule, evaluator);
    }

    // -----------------------------------------------------------------
    /// The bean of 'rule' in the scope the rule declares.
    ///
    pub fn get_bean_of_rule(&self, rule: &BeanRule, evaluator: &ItemEvaluator)
            -> Result<Arc<dyn Bean>, ActivityError> {
        let key = bean_key(rule);
        match rule.scope() {
            ScopeType::Singleton | ScopeType::Session => {
                if let Some(bean) = self.singleton(&key) {
                    return Ok(bean);
                }
                let bean = self.create_bean(rule, &key, evaluator)?;
                let mut singletons = lock(&self.singletons);
                if let Some(s) = singletons.iter().find(|s| s.key == key) {
                    return Ok(Arc::clone(&s.bean));
                }
                singletons.push(Singleton {
                    key,
                    bean: Arc::clone(&bean),
                    destroy_method: rule.destroy_method.clone(),
                });
                return Ok(bean);
            },
            ScopeType::Prototype => {
                return self.create_bean(rule, &key, evaluator);
            },
            ScopeType::Request => {
                let activity = match evaluator.activity() {
                    Some(activity) => activity,
                    None => {
                        warn!("No activity for request scoped bean {}; creating a new one", key);
                        return self.create_bean(rule, &key, evaluator);
                    },
                };
                if let Some(bean) = activity.request_bean(&key) {
                    return Ok(bean);
                }
                let bean = self.create_bean(rule, &key, evaluator)?;
                activity.put_request_bean(&key, Arc::clone(&bean));
                return Ok(bean);
            },
        }
    }

    fn singleton(&self, key: &str) -> Option<Arc<dyn Bean>> {
        return lock(&self.singletons).iter()
                .find(|s| s.key == key)
                .map(|s| Arc::clone(&s.bean));
    }

    // -----------------------------------------------------------------
    // Instantiates the bean (or calls its factory), sets its properties
    // and invokes its init method.
    //
    fn create_bean(&self, rule: &BeanRule, key: &str, evaluator: &ItemEvaluator)
            -> Result<Arc<dyn Bean>, ActivityError> {
        let _guard = self.enter(key)?;
        let invocation = self.invocation(rule.arguments.as_ref(), evaluator)?;

        let mut bean: Box<dyn Bean> = match rule.factory_bean_id {
            Some(ref factory_id) => {
                let factory = self.get_bean(&BeanReference::parse(factory_id), evaluator)?;
                let method = rule.factory_method.as_deref()
                        .ok_or_else(|| creation_error(key, "No factory method is given"))?;
                let value = factory.invoke(method, &invocation)
                        .map_err(|e| creation_error(key, e))?;
                Box::new(ValueBean::new(value))
            },
            None => {
                let class_name = rule.class_name.as_deref()
                        .ok_or_else(|| creation_error(key, "No bean class is given"))?;
                self.classes.instantiate(class_name)
                        .ok_or_else(|| creation_error(key, format!("Unable to load class: {}", class_name)))?
            },
        };

        if let Some(ref properties) = rule.properties {
            let values = evaluator.evaluate_item_rule_map(properties)?;
            for (name, value) in values.into_iter() {
                bean.set_property(&name, value).map_err(|e| creation_error(key, e))?;
            }
        }
        if let Some(ref init_method) = rule.init_method {
            bean.invoke(init_method, &invocation).map_err(|e| creation_error(key, e))?;
        }
        debug!("Bean {} created in {} scope", key, rule.scope());
        return Ok(Arc::from(bean));
    }

    fn enter(&self, key: &str) -> Result<CreationGuard, ActivityError> {
        let entry = (thread::current().id(), String::from(key));
        let mut creating = lock(&self.creating);
        if creating.contains(&entry) {
            return Err(creation_error(key, "Circular reference between beans"));
        }
        creating.push(entry.clone());
        return Ok(CreationGuard {
            creating: &self.creating,
            entry,
        });
    }

    fn invocation(&self, arguments: Option<&ItemRuleMap>, evaluator: &ItemEvaluator)
            -> Result<Invocation, ActivityError> {
        let mut invocation = Invocation::new();
        invocation.translet_name = evaluator.activity()
                .and_then(|a| a.translet_name())
                .map(String::from);
        if let Some(arguments) = arguments {
            invocation.arguments = evaluator.evaluate_item_rule_map(arguments)?;
        }
        return Ok(invocation);
    }

    // -----------------------------------------------------------------
    /// Creates every singleton that is not lazily initialized.
    ///
    pub fn initialize(&self, evaluator: &ItemEvaluator) -> Result<(), ActivityError> {
        for rule in self.rules.bean_rules().into_iter() {
            if rule.is_singleton() && ! rule.lazy_init {
                self.get_bean_of_rule(rule, evaluator)?;
            }
        }
        return Ok(());
    }

    // -----------------------------------------------------------------
    /// Invokes the destroy methods of the singletons, newest first,
    /// and empties the cache.
    ///
    pub fn destroy(&self) {
        let singletons = std::mem::take(&mut *lock(&self.singletons));
        for singleton in singletons.into_iter().rev() {
            if let Some(ref method) = singleton.destroy_method {
                if let Err(e) = singleton.bean.invoke(method, &Invocation::new()) {
                    warn!("Failed to destroy bean {}: {}", singleton.key, e);
                }
            }
            trace!("Bean {} destroyed", singleton.key);
        }
    }

    pub fn singleton_count(&self) -> usize {
        return lock(&self.singletons).len();
    }

    /// The value of a bean, for `#{id}` and `#{id^property}` tokens.
    ///
    pub fn bean_value(&self, reference: &BeanReference, getter: Option<&str>,
            evaluator: &ItemEvaluator) -> Result<ResultValue, ActivityError> {
        let bean = self.get_bean(reference, evaluator)?;
        return Ok(match getter {
            Some(name) => bean.property(name).unwrap_or_default(),
            None => bean.as_value(),
        });
    }
}
