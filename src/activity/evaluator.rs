//
// activity/evaluator.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::borrow::Cow;

use crate::activity::context::ActivityContext;
use crate::activity::core::CoreActivity;
use crate::activity::value::{ResultValue, ResultValueMap};
use crate::error::ActivityError;
use crate::parsing::BeanReference;
use crate::rule::{ItemRule, ItemRuleMap, ItemValue, ItemValueType, Token, TokenType};

// =====================================================================
/// Evaluates tokens and items against a context and, when there is
/// one, the activity in progress.
///
/// - `${name}`: request parameter; several values make a list.
/// - `@{name}`: activity attribute, else the action result of that id
///   (dotted ids reach into nested results).
/// - `#{id}`, `#{class:Name}`: the bean's value; `#{id^prop}` one of
///   its properties.
/// - `%{name}`: context property.
///
/// A reference that yields nothing takes its default value.  A lone
/// reference keeps the type of its value; anything else is
/// concatenated into text, skipping nulls.
///
pub struct ItemEvaluator<'a, 'r> {
    context: &'a ActivityContext,
    activity: Option<&'a CoreActivity<'r>>,
}

impl<'a, 'r> ItemEvaluator<'a, 'r> {
    pub fn new(context: &'a ActivityContext, activity: Option<&'a CoreActivity<'r>>) -> ItemEvaluator<'a, 'r> {
        return ItemEvaluator {
            context,
            activity,
        };
    }

    pub fn context(&self) -> &'a ActivityContext {
        return self.context;
    }

    pub fn activity(&self) -> Option<&'a CoreActivity<'r>> {
        return self.activity;
    }

    // -----------------------------------------------------------------
    //
    pub fn evaluate_token(&self, token: &Token) -> Result<ResultValue, ActivityError> {
        let value = match token.token_type() {
            TokenType::Text => {
                return Ok(token.value().map(ResultValue::from).unwrap_or_default());
            },
            TokenType::Parameter => self.parameter_value(token.name()),
            TokenType::Attribute => {
                self.attribute_value(token.name()).map(|v| apply_getter(v, token.getter()))
            },
            TokenType::Bean => {
                let reference = BeanReference::parse(token.name());
                Some(self.context.bean_registry().bean_value(&reference, token.getter(), self)?)
            },
            TokenType::Property => self.context.property(token.name()).cloned(),
        };
        return Ok(match value {
            Some(v) if ! v.is_null() => v,
            _ => token.default_value().map(ResultValue::from).unwrap_or_default(),
        });
    }

    pub fn evaluate_tokens(&self, tokens: &[Token]) -> Result<ResultValue, ActivityError> {
        if tokens.len() == 1 {
            return self.evaluate_token(&tokens[0]);
        }
        if tokens.is_empty() {
            return Ok(ResultValue::Null);
        }
        let mut s = String::new();
        for token in tokens.iter() {
            let value = self.evaluate_token(token)?;
            if ! value.is_null() {
                s += &value.to_string();
            }
        }
        return Ok(ResultValue::Text(s));
    }

    /// Tokens evaluated into text; null becomes None.
    ///
    pub fn evaluate_as_string(&self, tokens: &[Token]) -> Result<Option<String>, ActivityError> {
        let value = self.evaluate_tokens(tokens)?;
        if value.is_null() {
            return Ok(None);
        }
        return Ok(Some(value.to_string()));
    }

    fn parameter_value(&self, name: &str) -> Option<ResultValue> {
        let activity = self.activity?;
        let values = activity.request().parameter_values(name)?;
        return match values.len() {
            0 => None,
            1 => Some(ResultValue::from(values[0].as_str())),
            _ => Some(ResultValue::List(
                    values.iter().map(|v| ResultValue::from(v.as_str())).collect())),
        };
    }

    fn attribute_value(&self, name: &str) -> Option<ResultValue> {
        let activity = self.activity?;
        if let Some(value) = activity.attribute(name) {
            return Some(value.clone());
        }
        return activity.process_result()
                .and_then(|pr| pr.get_result_value(name))
                .cloned();
    }

    // -----------------------------------------------------------------
    /// The value of 'item', converted to its value type.
    ///
    pub fn evaluate_item(&self, item: &ItemRule) -> Result<ResultValue, ActivityError> {
        let value = match item.value() {
            ItemValue::Single(None) => ResultValue::Null,
            ItemValue::Single(Some(tokens)) => self.evaluate_typed(tokens, item)?,
            ItemValue::List(values) => {
                let mut list = vec!{};
                for tokens in values.iter() {
                    list.push(self.evaluate_typed(tokens, item)?);
                }
                ResultValue::List(list)
            },
            ItemValue::Map(entries) => {
                let mut map = ResultValueMap::new();
                for (name, tokens) in entries.iter() {
                    map.put(name, self.evaluate_typed(tokens, item)?);
                }
                ResultValue::Map(map)
            },
        };
        if value.is_null() && item.is_mandatory() {
            return Err(ActivityError::MandatoryItemMissing(String::from(item.name())));
        }
        return Ok(value);
    }

    fn evaluate_typed(&self, tokens: &[Token], item: &ItemRule) -> Result<ResultValue, ActivityError> {
        let value = self.evaluate_tokens(tokens)?;
        return convert_value(value, item);
    }

    // -----------------------------------------------------------------
    /// Every item of 'irm', under the profiles currently active.
    ///
    pub fn evaluate_item_rule_map(&self, irm: &ItemRuleMap) -> Result<ResultValueMap, ActivityError> {
        let irm = if irm.has_candidates() {
            Cow::Owned(irm.effective(self.context.environment()))
        } else {
            Cow::Borrowed(irm)
        };
        let mut map = ResultValueMap::new();
        for item in irm.iter() {
            map.put(item.name(), self.evaluate_item(item)?);
        }
        return Ok(map);
    }
}

// ---------------------------------------------------------------------
// Property 'getter' of a map value.
//
fn apply_getter(value: ResultValue, getter: Option<&str>) -> ResultValue {
    return match getter {
        Some(name) => value.as_map().and_then(|m| m.get(name)).cloned().unwrap_or_default(),
        None => value,
    };
}

// ---------------------------------------------------------------------
// Converts a scalar to the value type the item declares.
//
fn convert_value(value: ResultValue, item: &ItemRule) -> Result<ResultValue, ActivityError> {
    let value_type = match item.value_type() {
        Some(t) => t,
        None => return Ok(value),
    };
    if value.is_null() {
        return Ok(value);
    }
    let text = match value {
        ResultValue::Text(ref s) => s.trim().to_string(),
        ResultValue::List(_) | ResultValue::Map(_) => return Ok(value),
        ref v => v.to_string(),
    };
    let converted = match value_type {
        ItemValueType::String | ItemValueType::Text => match value {
            ResultValue::Text(_) => Some(value),
            ref v => Some(ResultValue::Text(v.to_string())),
        },
        ItemValueType::Int | ItemValueType::Long => match value {
            ResultValue::Int(_) => Some(value),
            ResultValue::Float(f) if f.fract() == 0.0 => Some(ResultValue::Int(f as i64)),
            _ => text.parse::<i64>().ok().map(ResultValue::Int),
        },
        ItemValueType::Float | ItemValueType::Double => match value {
            ResultValue::Float(_) => Some(value),
            ResultValue::Int(i) => Some(ResultValue::Float(i as f64)),
            _ => text.parse::<f64>().ok().map(ResultValue::Float),
        },
        ItemValueType::Boolean => match value {
            ResultValue::Bool(_) => Some(value),
            _ => text.parse::<bool>().ok().map(ResultValue::Bool),
        },
        ItemValueType::Bean => Some(value),
    };
    return converted.ok_or_else(|| ActivityError::Rule(illegal_rule!(
            "Cannot convert '{}' of item '{}' to {}", text, item.name(), value_type)));
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use crate::rule::ItemType;

    fn typed(value: &str, value_type: ItemValueType) -> ItemRule {
        let mut item = ItemRule::single("n", value);
        item.set_value_type(Some(value_type));
        return item;
    }

    #[test]
    fn test_convert_value() {
        let test_specs = [
            ( "42", ItemValueType::Int, Ok(ResultValue::Int(42)) ),
            ( " 7 ", ItemValueType::Long, Ok(ResultValue::Int(7)) ),
            ( "1.5", ItemValueType::Double, Ok(ResultValue::Float(1.5)) ),
            ( "true", ItemValueType::Boolean, Ok(ResultValue::Bool(true)) ),
            ( "abc", ItemValueType::String, Ok(ResultValue::from("abc")) ),
            ( "abc", ItemValueType::Int, Err("Cannot convert 'abc' of item 'n' to int") ),
            ( "yes", ItemValueType::Boolean, Err("Cannot convert 'yes' of item 'n' to boolean") ),
        ];
        for (value, value_type, guess) in test_specs.iter() {
            let item = typed(value, *value_type);
            let result = convert_value(ResultValue::from(*value), &item);
            match guess {
                Ok(v) => assert_eq!(result.unwrap(), *v),
                Err(msg) => assert_eq!(result.unwrap_err().to_string(), *msg),
            }
        }
    }

    #[test]
    fn test_convert_keeps_collections() {
        let item = typed("x", ItemValueType::Int);
        let list = ResultValue::List(vec![ResultValue::from("1")]);
        assert_eq!(convert_value(list.clone(), &item).unwrap(), list);
        let untyped = ItemRule::new("n", ItemType::Single);
        assert_eq!(convert_value(ResultValue::from("x"), &untyped).unwrap(), ResultValue::from("x"));
    }

    #[test]
    fn test_apply_getter() {
        let mut map = ResultValueMap::new();
        map.put("name", "lee");
        let value = ResultValue::Map(map);
        assert_eq!(apply_getter(value.clone(), Some("name")), ResultValue::from("lee"));
        assert_eq!(apply_getter(value.clone(), Some("age")), ResultValue::Null);
        assert_eq!(apply_getter(value.clone(), None), value);
    }
}
