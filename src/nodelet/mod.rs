//
// nodelet/mod.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

//!
//! XPath-callback XML parsing.
//!
//! A grammar is a tree of NodeletGroup: nodelets (start handlers) and
//! end nodelets keyed by element path.  NodeletParser walks a document
//! and calls them, and the handlers build their objects on a typed
//! ObjectStack.  Groups can be mounted under other groups' elements,
//! so one bundle (e.g. the response rules) serves several parents.
//!

#[macro_use]
mod stack;
mod group;
mod parser;
mod path;

pub use self::group::{Attributes, EndNodelet, HandlerResult, Nodelet, NodeletAdder, NodeletGroup};
pub use self::parser::NodeletParser;
pub use self::path::{make_mount_path, NodeTracker, NodeletPath};
pub use self::stack::{Downcast, ObjectStack, StackEntry};
