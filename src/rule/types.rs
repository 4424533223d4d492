//
// rule/types.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;
use std::str::FromStr;

use crate::error::IllegalRuleError;

// ---------------------------------------------------------------------
// Declares an enum of attribute keywords with as_str(), resolve(),
// FromStr and Display.  'what' names the type in error messages.
//
macro_rules! rule_types {
    (
        $(
            $(#[$meta:meta])*
            $name:ident ( $what:expr ) {
                $( $variant:ident => $text:literal ),* $(,)?
            }
        )*
    ) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum $name {
                $( $variant ),*
            }

            impl $name {
                pub fn as_str(&self) -> &'static str {
                    return match self {
                        $( $name::$variant => $text ),*
                    };
                }

                pub fn resolve(s: &str) -> Option<$name> {
                    return match s {
                        $( $text => Some($name::$variant), )*
                        _ => None,
                    };
                }

                pub fn values() -> &'static [$name] {
                    return &[ $( $name::$variant ),* ];
                }
            }

            impl FromStr for $name {
                type Err = IllegalRuleError;

                fn from_str(s: &str) -> Result<$name, IllegalRuleError> {
                    return $name::resolve(s)
                            .ok_or_else(|| illegal_rule!("No {} type for '{}'", $what, s));
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    }
}

rule_types! {
    /// Kind of advice an aspect applies around a join point.
    AspectAdviceType ("aspect advice") {
        Before => "before",
        After => "after",
        Around => "around",
        Finally => "finally",
        ExceptionRaised => "exceptionRaised",
    }

    /// What an aspect is woven into.
    JoinpointTargetType ("joinpoint target") {
        Translet => "translet",
        Method => "method",
    }

    PointcutType ("pointcut") {
        Wildcard => "wildcard",
        Regexp => "regexp",
    }

    ScopeType ("bean scope") {
        Singleton => "singleton",
        Prototype => "prototype",
        Request => "request",
        Session => "session",
    }

    ItemType ("item") {
        Single => "single",
        Array => "array",
        List => "list",
        Map => "map",
        Properties => "properties",
    }

    ItemValueType ("item value") {
        String => "string",
        Text => "text",
        Int => "int",
        Long => "long",
        Float => "float",
        Double => "double",
        Boolean => "boolean",
        Bean => "bean",
    }

    TransformType ("transform") {
        Json => "json",
        Xml => "xml",
        Apon => "apon",
        Text => "text",
        Xsl => "xsl",
    }

    ResponseType ("response") {
        Transform => "transform",
        Dispatch => "dispatch",
        Forward => "forward",
        Redirect => "redirect",
    }

    MethodType ("request method") {
        Get => "GET",
        Post => "POST",
        Put => "PUT",
        Patch => "PATCH",
        Delete => "DELETE",
        Head => "HEAD",
        Options => "OPTIONS",
        Trace => "TRACE",
        Connect => "CONNECT",
    }

    /// How description and template text is reformatted.
    TextStyleType ("text style") {
        Apon => "apon",
        Compact => "compact",
        Compressed => "compressed",
    }

    TriggerType ("trigger") {
        Simple => "simple",
        Cron => "cron",
    }

    /// Names accepted by `<setting name>`.
    DefaultSettingType ("default setting") {
        TransletNamePattern => "transletNamePattern",
        TransletNamePrefix => "transletNamePrefix",
        TransletNameSuffix => "transletNameSuffix",
        BeanProxifier => "beanProxifier",
        PointcutPatternVerifiable => "pointcutPatternVerifiable",
        DefaultTemplateEngineBean => "defaultTemplateEngineBean",
        DefaultSchedulerBean => "defaultSchedulerBean",
    }
}

impl TransformType {
    /// Content type a transform produces when nothing else sets one.
    ///
    pub fn default_content_type(&self) -> &'static str {
        return match self {
            TransformType::Xml => "application/xml",
            _ => "text/plain",
        };
    }

    /// Also accepts the older "transform/json" spelling.
    ///
    pub fn parse_lenient(s: &str) -> Result<TransformType, IllegalRuleError> {
        let s = s.strip_prefix("transform/").unwrap_or(s);
        return s.parse();
    }
}

impl MethodType {
    /// Parses a comma delimited list such as "GET, POST".
    ///
    pub fn parse_list(s: &str) -> Result<Vec<MethodType>, IllegalRuleError> {
        let mut methods: Vec<MethodType> = vec!{};
        for name in s.split(',').map(|n| n.trim()).filter(|n| ! n.is_empty()) {
            let method = MethodType::resolve(&name.to_uppercase())
                    .ok_or_else(|| illegal_rule!("No request method type for '{}'", name))?;
            if ! methods.contains(&method) {
                methods.push(method);
            }
        }
        return Ok(methods);
    }
}

impl ItemType {
    pub fn is_listable(&self) -> bool {
        return *self == ItemType::Array || *self == ItemType::List;
    }

    pub fn is_mappable(&self) -> bool {
        return *self == ItemType::Map || *self == ItemType::Properties;
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_resolve() {
        assert_eq!("before".parse::<AspectAdviceType>().unwrap(), AspectAdviceType::Before);
        assert_eq!(AspectAdviceType::ExceptionRaised.to_string(), "exceptionRaised");
        assert_eq!(ScopeType::resolve("prototype"), Some(ScopeType::Prototype));
        assert_eq!(ItemValueType::values().len(), 8);

        let err = "sometimes".parse::<PointcutType>().unwrap_err();
        assert_eq!(err.to_string(), "No pointcut type for 'sometimes'");
    }

    #[test]
    fn test_transform_type() {
        let test_specs = [
            ( "json", TransformType::Json, "text/plain" ),
            ( "transform/xml", TransformType::Xml, "application/xml" ),
            ( "apon", TransformType::Apon, "text/plain" ),
            ( "text", TransformType::Text, "text/plain" ),
        ];
        for (s, guess, content_type) in test_specs.iter() {
            let t = TransformType::parse_lenient(s).unwrap();
            assert_eq!(t, *guess);
            assert_eq!(t.default_content_type(), *content_type);
        }
    }

    #[test]
    fn test_method_list() {
        let methods = MethodType::parse_list("get, POST,get").unwrap();
        assert_eq!(methods, vec![MethodType::Get, MethodType::Post]);
        let err = MethodType::parse_list("GET,FETCH").unwrap_err();
        assert_eq!(err.to_string(), "No request method type for 'FETCH'");
    }
}
