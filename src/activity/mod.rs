//
// activity/mod.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

//!
//! Request processing.
//!
//! An ActivityContext holds the frozen rules of one configuration and
//! the beans they declare.  A CoreActivity runs one translet against a
//! RequestAdapter and a ResponseAdapter, collecting the results of its
//! actions into a ProcessResult that the response then renders.
//!

mod adapter;
mod context;
mod core;
mod evaluator;
mod result;
mod value;

pub use self::adapter::{BasicRequestAdapter, BasicResponseAdapter, RequestAdapter, ResponseAdapter};
pub use self::context::{ActivityContext, ActivityContextBuilder};
pub use self::core::{CoreActivity, EXCEPTION_ATTRIBUTE, MAX_ACTIVITY_DEPTH};
pub use self::evaluator::ItemEvaluator;
pub use self::result::{ActionResult, ContentResult, ProcessResult, ACTION_ID_SEPARATOR};
pub use self::value::{ResultValue, ResultValueMap};
