//
// lib.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//
//!
//! Rule-parsing and activity-dispatch core.
//!
//! An XML configuration document declares translets (named units of
//! request processing), beans, aspects, schedules and templates.
//! The document is read by an XPath-callback parser into rules, the
//! rules are frozen into an ActivityContext, and an activity runs one
//! translet against a request, collecting what its actions produce and
//! rendering it as JSON, XML, APON, text or through XSL.
//!
//! # Building a context and running a translet
//!
//! ```
//! use aspectran::activity::*;
//! use aspectran::env::{ContextConfig, NoPropertySource};
//! use aspectran::rule::MethodType;
//!
//! let context = ActivityContextBuilder::new(ContextConfig::default())
//!         .property_source(NoPropertySource)
//!         .build_from_text(r#"
//! <aspectran>
//!   <translet name="/hello">
//!     <echo><item name="msg">hi</item></echo>
//!     <transform type="json"/>
//!   </translet>
//! </aspectran>"#)
//!         .unwrap();
//!
//! let mut request = BasicRequestAdapter::new(MethodType::Get);
//! let mut response = BasicResponseAdapter::new();
//! {
//!     let mut activity = CoreActivity::new(context, &mut request, &mut response);
//!     activity.prepare("/hello").unwrap();
//!     activity.perform().unwrap();
//! }
//! assert_eq!(response.body(), r#"{"msg":"hi"}"#);
//! assert_eq!(response.content_type(), Some("text/plain"));
//! ```
//!
//! # Reading rules without building a context
//!
//! A shallow RuleParsingContext resolves nothing; it only collects the
//! rules in document order.  See the 'parser' module.
//!
//! # XML substrate
//!
//! 'sax' tokenizes, 'dtd' validates against the subset of DTD the
//! configuration grammar needs, 'dom' builds trees for the XML and XSL
//! transforms, and 'xslt' applies a stylesheet.
//!

#[macro_use]
pub mod error;
#[macro_use]
pub mod nodelet;

pub mod sax;
pub mod dtd;
pub mod dom;
pub mod xslt;
pub mod wildcard;

pub mod apon;
pub mod env;
pub mod rule;
pub mod parsing;
pub mod parser;
pub mod bean;
pub mod activity;
pub mod response;
