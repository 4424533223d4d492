//
// bean/mod.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

//!
//! Beans: the objects actions invoke.
//!
//! A bean rule names a class; the class registry maps class names to
//! constructors registered by the embedding program.  The runtime
//! BeanRegistry creates beans from their rules, caches singletons and
//! runs their init and destroy methods.
//!

mod class;
mod registry;

pub use self::class::{
    Bean, BeanClassRegistry, BeanConstructor, Invocation, PropertiesBean,
    TemplateEngine, ValueBean, ViewDispatcher, PROPERTIES_BEAN_CLASS,
};
pub use self::registry::BeanRegistry;
