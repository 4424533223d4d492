//
// error.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

//!
//! Error types and constructor macros.
//!
//! Every layer of the crate has its own error type:
//!
//! - XmlError: syntax errors found by the SAX decoder, the DOM builder,
//!   the DTD reader and the XSL processor.
//! - NodeletError: failure of a whole document parse.
//! - IllegalRuleError: configuration errors found while building rules.
//! - ProfilesError: malformed profile expressions and invalid profile names.
//! - AponError: syntax errors in APON text.
//! - ConfigError: a context configuration that cannot be loaded.
//! - TransformResponseError: rendering failures.
//! - ActivityError: failures while processing a translet.
//! - ContextError: an activity context that cannot be built.
//!

use std::error::Error;
use std::fmt;
use std::io;

use thiserror::Error;

/// Boxed error used by nodelet handlers and bean invocations.
///
pub type BoxError = Box<dyn Error + Send + Sync>;

// =====================================================================
//
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// Type code of XmlError.
///
pub enum XmlErrorType {
    CantOccur,
    XmlSyntaxError,
    DtdSyntaxError,
    XslSyntaxError,
    XslDynamicError,
}

const ERROR_PREFIX: [(XmlErrorType, &str); 5] = [
    ( XmlErrorType::CantOccur, "Can't Occur: problem in aspectran library:" ),
    ( XmlErrorType::XmlSyntaxError, "Syntax Error in XML:" ),
    ( XmlErrorType::DtdSyntaxError, "Syntax Error in DTD:" ),
    ( XmlErrorType::XslSyntaxError, "Syntax Error in XSL:" ),
    ( XmlErrorType::XslDynamicError, "Dynamic Error in XSL:" ),
];

#[derive(Debug, Clone, PartialEq)]
pub struct XmlError {
    error_type: XmlErrorType,
    descri: String,
}

impl XmlError {
    pub fn error_type(&self) -> XmlErrorType {
        return self.error_type;
    }

    pub fn description(&self) -> &str {
        return self.descri.as_str();
    }
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.descri)
    }
}

impl Error for XmlError {
}

// ---------------------------------------------------------------------
//
pub fn xmlerror(error_type: XmlErrorType, descri: &str) -> XmlError {
    let mut prefix = "Unknown error:";
    for el in ERROR_PREFIX.iter() {
        if el.0 == error_type {
            prefix = el.1;
            break;
        }
    }

    return XmlError {
        error_type,
        descri: format!("{} {}", prefix, descri),
    };
}

// =====================================================================
/// Failure of a document parse driven by NodeletParser.
/// Parsing is all-or-nothing: any of these aborts the whole document.
///
#[derive(Debug, Error)]
pub enum NodeletError {
    #[error("Error parsing XML; {0}")]
    Xml(#[from] XmlError),

    #[error("Document is invalid: {message}{location}")]
    Invalid {
        message: String,
        location: String,
    },

    #[error("Error processing nodelet \"{path}\"{location}: {source}")]
    Handler {
        path: String,
        location: String,
        #[source]
        source: BoxError,
    },

    #[error("Object stack mismatch: expected {expected}, found {found}")]
    StackMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("Error reading {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

// =====================================================================
/// A configuration error found while building rules.
///
#[derive(Debug, Error)]
pub enum IllegalRuleError {
    #[error("{0}")]
    Invalid(String),

    #[error("Unable to resolve reference to bean {}", .0.join(", "))]
    BrokenReferences(Vec<String>),

    #[error(transparent)]
    Profiles(#[from] ProfilesError),

    #[error(transparent)]
    Apon(#[from] AponError),
}

// =====================================================================
/// A malformed profile expression or an invalid profile name.
///
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfilesError {
    #[error("Malformed profile expression [{0}]")]
    Malformed(String),

    #[error("Invalid profile [{profile}]: {reason}")]
    InvalidProfile {
        profile: String,
        reason: &'static str,
    },
}

// =====================================================================
/// Syntax error in an APON document.
///
#[derive(Debug, Clone, PartialEq, Error)]
#[error("APON syntax error at line {line}: {message}")]
pub struct AponError {
    pub line: usize,
    pub message: String,
}

// =====================================================================
/// A context configuration could not be loaded.
///
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error reading {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Apon(#[from] AponError),

    #[error("Invalid context configuration: {0}")]
    Json(#[from] serde_json::Error),
}

// =====================================================================
/// A response could not be rendered; carries the rule that failed.
///
#[derive(Debug, Error)]
#[error("Failed to transform {rule}; {source}")]
pub struct TransformResponseError {
    pub rule: String,
    #[source]
    pub source: BoxError,
}

impl TransformResponseError {
    pub fn new<E>(rule: &dyn fmt::Display, source: E) -> TransformResponseError
            where E: Into<BoxError> {
        return TransformResponseError {
            rule: rule.to_string(),
            source: source.into(),
        };
    }
}

// =====================================================================
/// Failure while processing a translet.
///
#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("No translet mapped to '{0}'")]
    TransletNotFound(String),

    #[error("Request method {method} is not allowed for translet '{translet}'")]
    MethodNotAllowed {
        translet: String,
        method: String,
    },

    #[error("Missing mandatory item '{0}'")]
    MandatoryItemMissing(String),

    #[error("No bean named '{0}'")]
    BeanNotFound(String),

    #[error("Failed to create bean {bean}; {source}")]
    BeanCreation {
        bean: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to execute action {action}; {source}")]
    Action {
        action: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to render template '{template}'; {source}")]
    Template {
        template: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Response(#[from] TransformResponseError),

    #[error("Failed to dispatch view '{view}'; {source}")]
    Dispatch {
        view: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Rule(#[from] IllegalRuleError),

    #[error("Activity is not prepared")]
    NotPrepared,

    #[error("Too many nested activities ({0})")]
    TooDeep(usize),
}

impl ActivityError {
    /// Name used by exception-thrown rules to select a handler.
    ///
    pub fn kind(&self) -> &'static str {
        return match self {
            ActivityError::TransletNotFound(_) => "TransletNotFound",
            ActivityError::MethodNotAllowed{..} => "MethodNotAllowed",
            ActivityError::MandatoryItemMissing(_) => "MandatoryItemMissing",
            ActivityError::BeanNotFound(_) => "BeanNotFound",
            ActivityError::BeanCreation{..} => "BeanCreationError",
            ActivityError::Action{..} => "ActionError",
            ActivityError::Template{..} => "TemplateError",
            ActivityError::Response(_) => "TransformResponseError",
            ActivityError::Dispatch{..} => "DispatchResponseError",
            ActivityError::Rule(_) => "IllegalRuleError",
            ActivityError::NotPrepared => "NotPrepared",
            ActivityError::TooDeep(_) => "TooDeep",
        };
    }
}

// =====================================================================
/// An activity context could not be built.
///
#[derive(Debug, Error)]
pub enum ContextError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Profiles(#[from] ProfilesError),

    #[error("No configuration file specified")]
    NoConfigFile,

    #[error(transparent)]
    Parse(#[from] NodeletError),

    #[error(transparent)]
    Rule(#[from] IllegalRuleError),

    #[error("Failed to initialize the activity context; {0}")]
    Init(#[from] ActivityError),
}

// ---------------------------------------------------------------------
//
#[allow(unused_macros)]
macro_rules! cant_occur {
    (
        $( $e:expr ),*
    ) => {
        $crate::error::xmlerror($crate::error::XmlErrorType::CantOccur, &format!( $($e),+ ))
    }
}

macro_rules! xml_syntax_error {
    (
        $( $e:expr ),*
    ) => {
        $crate::error::xmlerror($crate::error::XmlErrorType::XmlSyntaxError, &format!( $($e),+ ))
    }
}

macro_rules! dtd_syntax_error {
    (
        $( $e:expr ),*
    ) => {
        $crate::error::xmlerror($crate::error::XmlErrorType::DtdSyntaxError, &format!( $($e),+ ))
    }
}

macro_rules! xsl_syntax_error {
    (
        $( $e:expr ),*
    ) => {
        $crate::error::xmlerror($crate::error::XmlErrorType::XslSyntaxError, &format!( $($e),+ ))
    }
}

macro_rules! xsl_dynamic_error {
    (
        $( $e:expr ),*
    ) => {
        $crate::error::xmlerror($crate::error::XmlErrorType::XslDynamicError, &format!( $($e),+ ))
    }
}

macro_rules! illegal_rule {
    (
        $( $e:expr ),*
    ) => {
        $crate::error::IllegalRuleError::Invalid(format!( $($e),+ ))
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_prefix() {
        let test_specs = [
            ( xml_syntax_error!("no Quote"), "Syntax Error in XML: no Quote" ),
            ( dtd_syntax_error!("bad {}", "ELEMENT"), "Syntax Error in DTD: bad ELEMENT" ),
            ( xsl_syntax_error!("{}", "x"), "Syntax Error in XSL: x" ),
            ( cant_occur!("{}", 1), "Can't Occur: problem in aspectran library: 1" ),
        ];
        for (err, guess) in test_specs.iter() {
            assert_eq!(err.to_string(), *guess);
        }
    }

    #[test]
    fn test_activity_error_kind() {
        let err = ActivityError::TransletNotFound(String::from("/x"));
        assert_eq!(err.kind(), "TransletNotFound");
        assert_eq!(err.to_string(), "No translet mapped to '/x'");
    }

    #[test]
    fn test_illegal_rule_macro() {
        let err = illegal_rule!("No such default setting name as '{}'", "foo");
        assert_eq!(err.to_string(), "No such default setting name as 'foo'");
    }
}
