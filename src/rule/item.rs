//
// rule/item.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use crate::apon::{ParameterValue, Parameters};
use crate::env::{EnvironmentProfiles, Profiles};
use crate::error::IllegalRuleError;
use crate::rule::token::{tokenize, Token, TokenType};
use crate::rule::types::{ItemType, ItemValueType};

// =====================================================================
/// Value expressions of an item, shaped by its ItemType.
///
#[derive(Debug, Clone, PartialEq)]
pub enum ItemValue {
    Single(Option<Vec<Token>>),
    List(Vec<Vec<Token>>),
    Map(Vec<(String, Vec<Token>)>),
}

// =====================================================================
/// A named, typed value used for parameters, attributes, arguments,
/// properties and echo output.
///
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRule {
    name: String,
    item_type: ItemType,
    value_type: Option<ItemValueType>,
    tokenize: bool,
    mandatory: bool,
    value: ItemValue,
}

impl ItemRule {

    pub fn new(name: &str, item_type: ItemType) -> ItemRule {
        let value = if item_type.is_listable() {
            ItemValue::List(vec!{})
        } else if item_type.is_mappable() {
            ItemValue::Map(vec!{})
        } else {
            ItemValue::Single(None)
        };
        return ItemRule {
            name: String::from(name),
            item_type,
            value_type: None,
            tokenize: true,
            mandatory: false,
            value,
        };
    }

    // -----------------------------------------------------------------
    /// A single item holding 'value'.
    ///
    pub fn single(name: &str, value: &str) -> ItemRule {
        let mut ir = ItemRule::new(name, ItemType::Single);
        ir.set_value(value);
        return ir;
    }

    pub fn name(&self) -> &str {
        return self.name.as_str();
    }

    pub fn item_type(&self) -> ItemType {
        return self.item_type;
    }

    pub fn value_type(&self) -> Option<ItemValueType> {
        return self.value_type;
    }

    pub fn set_value_type(&mut self, value_type: Option<ItemValueType>) {
        self.value_type = value_type;
    }

    pub fn is_tokenize(&self) -> bool {
        return self.tokenize;
    }

    pub fn set_tokenize(&mut self, tokenize: bool) {
        self.tokenize = tokenize;
    }

    pub fn is_mandatory(&self) -> bool {
        return self.mandatory;
    }

    pub fn set_mandatory(&mut self, mandatory: bool) {
        self.mandatory = mandatory;
    }

    pub fn value(&self) -> &ItemValue {
        return &self.value;
    }

    pub fn is_listable(&self) -> bool {
        return self.item_type.is_listable();
    }

    pub fn is_mappable(&self) -> bool {
        return self.item_type.is_mappable();
    }

    // -----------------------------------------------------------------
    /// Sets the value of a single item.
    ///
    pub fn set_value(&mut self, text: &str) {
        let tokens = self.make_tokens(text);
        self.value = ItemValue::Single(Some(tokens));
    }

    // -----------------------------------------------------------------
    /// Appends a value to an array or list item.
    ///
    pub fn add_value(&mut self, text: &str) -> Result<(), IllegalRuleError> {
        let tokens = self.make_tokens(text);
        match self.value {
            ItemValue::List(ref mut values) => values.push(tokens),
            _ => return Err(illegal_rule!(
                    "Item '{}' of type {} cannot hold a list of values", self.name, self.item_type)),
        }
        return Ok(());
    }

    // -----------------------------------------------------------------
    /// Sets an entry of a map or properties item.
    ///
    pub fn put_entry(&mut self, name: &str, text: &str) -> Result<(), IllegalRuleError> {
        let tokens = self.make_tokens(text);
        match self.value {
            ItemValue::Map(ref mut entries) => {
                match entries.iter_mut().find(|(n, _)| n == name) {
                    Some(entry) => entry.1 = tokens,
                    None => entries.push((String::from(name), tokens)),
                }
            },
            _ => return Err(illegal_rule!(
                    "Item '{}' of type {} cannot hold entries", self.name, self.item_type)),
        }
        return Ok(());
    }

    // -----------------------------------------------------------------
    /// All tokens of the item, in value order.
    ///
    pub fn all_tokens(&self) -> Vec<&Token> {
        return match self.value {
            ItemValue::Single(Some(ref tokens)) => tokens.iter().collect(),
            ItemValue::Single(None) => vec!{},
            ItemValue::List(ref values) => values.iter().flatten().collect(),
            ItemValue::Map(ref entries) => entries.iter().flat_map(|(_, t)| t.iter()).collect(),
        };
    }

    fn make_tokens(&self, text: &str) -> Vec<Token> {
        if self.value_type == Some(ItemValueType::Bean) {
            return vec![Token::new(TokenType::Bean, text.trim())];
        }
        if ! self.tokenize {
            return vec![Token::text(text)];
        }
        return tokenize(text, true);
    }
}

// =====================================================================
/// Ordered set of items keyed by name, optionally bound to a profile.
///
/// A map merged from profile-conditional fragments keeps the
/// fragments as candidates; effective() re-evaluates them against the
/// current profiles.
///
/// ```
/// use aspectran::env::{EnvironmentProfiles, Profiles};
/// use aspectran::rule::{ItemRule, ItemRuleMap};
///
/// let mut base = ItemRuleMap::new();
/// base.put(ItemRule::single("url", "jdbc:dev"));
/// let mut prod = ItemRuleMap::new();
/// prod.set_profile(Some(Profiles::of("prod").unwrap()));
/// prod.put(ItemRule::single("url", "jdbc:prod"));
///
/// let mut irm = base.clone();
/// irm.add_candidate(prod);
///
/// let env = EnvironmentProfiles::new();
/// assert_eq!(irm.effective(&env).get("url").unwrap().all_tokens()[0].value(), Some("jdbc:dev"));
/// env.set_active_profiles(&["prod"]).unwrap();
/// assert_eq!(irm.effective(&env).get("url").unwrap().all_tokens()[0].value(), Some("jdbc:prod"));
/// ```
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemRuleMap {
    items: Vec<ItemRule>,
    profile: Option<Profiles>,
    candidates: Vec<ItemRuleMap>,
}

impl ItemRuleMap {
    pub fn new() -> ItemRuleMap {
        return ItemRuleMap::default();
    }

    // -----------------------------------------------------------------
    /// Adds 'item'; an item of the same name is replaced in place.
    ///
    pub fn put(&mut self, item: ItemRule) {
        match self.items.iter_mut().find(|ir| ir.name == item.name) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    pub fn put_all(&mut self, other: &ItemRuleMap) {
        for item in other.items.iter() {
            self.put(item.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&ItemRule> {
        return self.items.iter().find(|ir| ir.name == name);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemRule> {
        return self.items.iter();
    }

    pub fn len(&self) -> usize {
        return self.items.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.items.is_empty();
    }

    pub fn profile(&self) -> Option<&Profiles> {
        return self.profile.as_ref();
    }

    pub fn set_profile(&mut self, profile: Option<Profiles>) {
        self.profile = profile;
    }

    pub fn candidates(&self) -> &[ItemRuleMap] {
        return &self.candidates;
    }

    pub fn has_candidates(&self) -> bool {
        return ! self.candidates.is_empty();
    }

    // -----------------------------------------------------------------
    /// Keeps 'candidate' for later evaluation.  The map's own items
    /// become the first candidate.
    ///
    pub fn add_candidate(&mut self, candidate: ItemRuleMap) {
        if self.candidates.is_empty() && ! self.items.is_empty() {
            let own = self.fragment();
            self.candidates.push(own);
        }
        self.push_candidate(candidate);
    }

    pub(crate) fn push_candidate(&mut self, mut candidate: ItemRuleMap) {
        if candidate.candidates.is_empty() {
            self.candidates.push(candidate);
        } else {
            self.candidates.append(&mut candidate.candidates);
        }
    }

    pub(crate) fn take_candidates(&mut self) -> Vec<ItemRuleMap> {
        return std::mem::take(&mut self.candidates);
    }

    pub(crate) fn set_candidates(&mut self, candidates: Vec<ItemRuleMap>) {
        self.candidates = candidates;
    }

    /// The items and profile, without candidates.
    ///
    pub(crate) fn fragment(&self) -> ItemRuleMap {
        return ItemRuleMap {
            items: self.items.clone(),
            profile: self.profile.clone(),
            candidates: vec!{},
        };
    }

    // -----------------------------------------------------------------
    /// The items in effect under 'env': the map itself, or the merge of
    /// the candidates whose profile matches, later ones winning.
    ///
    pub fn effective(&self, env: &EnvironmentProfiles) -> ItemRuleMap {
        if self.candidates.is_empty() {
            return self.fragment();
        }
        let mut irm = ItemRuleMap::new();
        for candidate in self.candidates.iter() {
            let accepted = match candidate.profile {
                Some(ref p) => env.matches(p),
                None => true,
            };
            if accepted {
                irm.put_all(candidate);
            }
        }
        return irm;
    }

    // -----------------------------------------------------------------
    /// Items from APON text, one single item per entry.
    ///
    pub fn from_text(text: &str) -> Result<ItemRuleMap, IllegalRuleError> {
        let params: Parameters = text.parse()?;
        let mut irm = ItemRuleMap::new();
        for (name, value) in params.iter() {
            irm.put(item_from_parameter(name, value)?);
        }
        return Ok(irm);
    }
}

// ---------------------------------------------------------------------
//
fn item_from_parameter(name: &str, value: &ParameterValue) -> Result<ItemRule, IllegalRuleError> {
    return match value {
        ParameterValue::Array(values) => {
            let mut ir = ItemRule::new(name, ItemType::List);
            for v in values.iter() {
                ir.add_value(&v.to_string())?;
            }
            Ok(ir)
        },
        ParameterValue::Params(params) => {
            let mut ir = ItemRule::new(name, ItemType::Map);
            for (n, v) in params.iter() {
                ir.put_entry(n, &v.to_string())?;
            }
            Ok(ir)
        },
        ParameterValue::Null => Ok(ItemRule::new(name, ItemType::Single)),
        other => Ok(ItemRule::single(name, &other.to_string())),
    };
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    fn first_value(irm: &ItemRuleMap, name: &str) -> String {
        return irm.get(name).unwrap().all_tokens()[0].to_string();
    }

    #[test]
    fn test_item_shapes() {
        let mut list = ItemRule::new("colors", ItemType::List);
        list.add_value("red").unwrap();
        list.add_value("${color}").unwrap();
        assert_eq!(list.all_tokens().len(), 2);
        assert!(list.put_entry("x", "y").is_err());

        let mut map = ItemRule::new("sizes", ItemType::Map);
        map.put_entry("s", "1").unwrap();
        map.put_entry("s", "2").unwrap();
        match map.value() {
            ItemValue::Map(entries) => assert_eq!(entries.len(), 1),
            other => panic!("{:?}", other),
        }
        let err = map.add_value("3").unwrap_err();
        assert_eq!(err.to_string(), "Item 'sizes' of type map cannot hold a list of values");
    }

    #[test]
    fn test_tokenize_flags() {
        let mut ir = ItemRule::new("raw", ItemType::Single);
        ir.set_tokenize(false);
        ir.set_value("${not}");
        assert!(ir.all_tokens()[0].is_text());

        let mut ir = ItemRule::new("dao", ItemType::Single);
        ir.set_value_type(Some(ItemValueType::Bean));
        ir.set_value(" userDao ");
        assert_eq!(ir.all_tokens()[0].bean_id(), Some("userDao"));
    }

    #[test]
    fn test_put_keeps_order() {
        let mut irm = ItemRuleMap::new();
        irm.put(ItemRule::single("a", "1"));
        irm.put(ItemRule::single("b", "2"));
        irm.put(ItemRule::single("a", "3"));
        let names: Vec<&str> = irm.iter().map(|ir| ir.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(first_value(&irm, "a"), "3");
    }

    #[test]
    fn test_candidates() {
        let env = EnvironmentProfiles::new();
        let mut dev = ItemRuleMap::new();
        dev.set_profile(Some(Profiles::of("dev").unwrap()));
        dev.put(ItemRule::single("level", "debug"));

        let mut irm = ItemRuleMap::new();
        irm.add_candidate(dev);
        assert!(irm.effective(&env).is_empty());
        env.set_active_profiles(&["dev"]).unwrap();
        assert_eq!(first_value(&irm.effective(&env), "level"), "debug");
    }

    #[test]
    fn test_from_text() {
        let irm = ItemRuleMap::from_text("host: localhost\nports: [\n  80\n  443\n]\nopts: {\n  a: 1\n}").unwrap();
        assert_eq!(irm.len(), 3);
        assert_eq!(first_value(&irm, "host"), "localhost");
        assert_eq!(irm.get("ports").unwrap().item_type(), ItemType::List);
        assert_eq!(irm.get("opts").unwrap().item_type(), ItemType::Map);
    }
}
