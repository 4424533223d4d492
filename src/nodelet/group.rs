//
// nodelet/group.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::BoxError;
use crate::nodelet::path::make_mount_path;
use crate::nodelet::stack::ObjectStack;
use crate::sax::Attr;

// =====================================================================
/// Attributes of the element a nodelet is called for.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    attrs: Vec<Attr>,
}

impl Attributes {
    pub fn new(attrs: Vec<Attr>) -> Attributes {
        return Attributes { attrs };
    }

    /// Raw value, as written (after entity decoding).
    ///
    pub fn get(&self, name: &str) -> Option<&str> {
        return self.attrs.iter().find(|a| a.name() == name).map(|a| a.value());
    }

    /// Trimmed value; an empty value counts as absent.
    ///
    pub fn get_text(&self, name: &str) -> Option<String> {
        return self.get(name)
                .map(|v| v.trim())
                .filter(|v| ! v.is_empty())
                .map(String::from);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attr> {
        return self.attrs.iter();
    }

    pub fn len(&self) -> usize {
        return self.attrs.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.attrs.is_empty();
    }
}

impl<'a> From<&'a [(&'a str, &'a str)]> for Attributes {
    fn from(pairs: &'a [(&'a str, &'a str)]) -> Attributes {
        return Attributes::new(pairs.iter().map(|(n, v)| Attr::new(n, v)).collect());
    }
}

// =====================================================================
//
pub type HandlerResult = Result<(), BoxError>;

/// Called when the parser enters an element.
///
pub type Nodelet<E> = Rc<dyn Fn(&Attributes, &mut ObjectStack<E>) -> HandlerResult>;

/// Called when the parser leaves an element, with the element's text,
/// or None when it has no text other than white space.
///
pub type EndNodelet<E> = Rc<dyn Fn(Option<&str>, &mut ObjectStack<E>) -> HandlerResult>;

// =====================================================================
/// A reusable bundle of nodelets, registered into whatever group it
/// is applied to.
///
pub trait NodeletAdder<E> {
    fn add_to(&self, group: &NodeletGroup<E>);
}

impl<E, F> NodeletAdder<E> for F where F: Fn(&NodeletGroup<E>) {
    fn add_to(&self, group: &NodeletGroup<E>) {
        self(group);
    }
}

// =====================================================================
//
struct Registry<E> {
    nodelets: HashMap<String, Nodelet<E>>,
    end_nodelets: HashMap<String, EndNodelet<E>>,
    mounts: HashMap<String, NodeletGroup<E>>,
}

impl<E> Registry<E> {
    fn new() -> Registry<E> {
        return Registry {
            nodelets: HashMap::new(),
            end_nodelets: HashMap::new(),
            mounts: HashMap::new(),
        };
    }
}

// =====================================================================
/// A named set of nodelets keyed by element path.
///
/// A group created with new() is a root: its paths start with
/// "/name".  Groups made by child() share the root's tables.
/// A root group can be mounted under another group's element; it is
/// then consulted, with paths relative to the mount point, for
/// everything below that element.
///
/// ```
/// use aspectran::nodelet::*;
/// use aspectran::stack_entries;
///
/// stack_entries! {
///     enum Entry {
///         Text(String),
///     }
/// }
///
/// let root: NodeletGroup<Entry> = NodeletGroup::new("aspectran");
/// root.child("description")
///     .nodelet(|_, stack| { stack.push(String::new()); Ok(()) })
///     .end_nodelet(|text, stack| {
///         *stack.peek_mut::<String>()? = text.unwrap_or("").to_string();
///         Ok(())
///     });
/// assert!(root.nodelet_for("/aspectran/description").is_some());
/// assert!(root.end_nodelet_for("/aspectran/description").is_some());
/// assert!(root.nodelet_for("/aspectran").is_none());
/// ```
///
pub struct NodeletGroup<E> {
    name: String,
    xpath: String,
    registry: Rc<RefCell<Registry<E>>>,
}

impl<E> Clone for NodeletGroup<E> {
    fn clone(&self) -> Self {
        return NodeletGroup {
            name: self.name.clone(),
            xpath: self.xpath.clone(),
            registry: Rc::clone(&self.registry),
        };
    }
}

impl<E> fmt::Debug for NodeletGroup<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let registry = self.registry.borrow();
        let mut paths: Vec<&String> = registry.nodelets.keys().collect();
        paths.sort();
        f.debug_struct("NodeletGroup")
            .field("name", &self.name)
            .field("xpath", &self.xpath)
            .field("nodelets", &paths)
            .finish()
    }
}

impl<E: 'static> NodeletGroup<E> {

    // -----------------------------------------------------------------
    /// Creates a root group named 'name'.
    ///
    pub fn new(name: &str) -> NodeletGroup<E> {
        return NodeletGroup {
            name: String::from(name),
            xpath: format!("/{}", name),
            registry: Rc::new(RefCell::new(Registry::new())),
        };
    }

    pub fn name(&self) -> &str {
        return self.name.as_str();
    }

    pub fn xpath(&self) -> &str {
        return self.xpath.as_str();
    }

    // -----------------------------------------------------------------
    /// Group for the child element 'name', sharing this group's tables.
    ///
    pub fn child(&self, name: &str) -> NodeletGroup<E> {
        return NodeletGroup {
            name: String::from(name),
            xpath: format!("{}/{}", self.xpath, name),
            registry: Rc::clone(&self.registry),
        };
    }

    // -----------------------------------------------------------------
    /// Registers the start handler for this group's element.
    ///
    pub fn nodelet<F>(&self, handler: F) -> &Self
            where F: Fn(&Attributes, &mut ObjectStack<E>) -> HandlerResult + 'static {
        let xpath = self.xpath.clone();
        self.put_nodelet(xpath, Rc::new(handler));
        return self;
    }

    // -----------------------------------------------------------------
    /// Registers the end handler for this group's element.
    ///
    pub fn end_nodelet<F>(&self, handler: F) -> &Self
            where F: Fn(Option<&str>, &mut ObjectStack<E>) -> HandlerResult + 'static {
        let xpath = self.xpath.clone();
        self.put_end_nodelet(xpath, Rc::new(handler));
        return self;
    }

    // -----------------------------------------------------------------
    /// Registers a start handler at a path relative to this group,
    /// e.g. "item/value".  "/" registers the document start handler.
    ///
    pub fn nodelet_at<F>(&self, relative: &str, handler: F) -> &Self
            where F: Fn(&Attributes, &mut ObjectStack<E>) -> HandlerResult + 'static {
        let xpath = self.resolve(relative);
        self.put_nodelet(xpath, Rc::new(handler));
        return self;
    }

    pub fn end_nodelet_at<F>(&self, relative: &str, handler: F) -> &Self
            where F: Fn(Option<&str>, &mut ObjectStack<E>) -> HandlerResult + 'static {
        let xpath = self.resolve(relative);
        self.put_end_nodelet(xpath, Rc::new(handler));
        return self;
    }

    // -----------------------------------------------------------------
    /// Lets 'adder' register its bundle of nodelets into this group.
    ///
    pub fn with<A: NodeletAdder<E>>(&self, adder: A) -> &Self {
        adder.add_to(self);
        return self;
    }

    /// with(), only when 'condition' holds.
    ///
    pub fn with_if<A: NodeletAdder<E>>(&self, condition: bool, adder: A) -> &Self {
        if condition {
            adder.add_to(self);
        }
        return self;
    }

    /// with() for an adder built on demand; 'make' runs once, at this call.
    ///
    pub fn with_lazy<A, F>(&self, make: F) -> &Self
            where A: NodeletAdder<E>, F: FnOnce() -> A {
        make().add_to(self);
        return self;
    }

    // -----------------------------------------------------------------
    /// Mounts the root group 'group' under this group's element:
    /// an element named group.name() whose parent is this group's
    /// element switches lookups to 'group'.
    ///
    pub fn mount(&self, group: &NodeletGroup<E>) -> &Self {
        let key = make_mount_path(&self.name, &group.name);
        tracing::trace!("mount {} at {}", group.xpath, key);
        self.registry.borrow_mut().mounts.insert(key, group.clone());
        return self;
    }

    // -----------------------------------------------------------------
    //
    pub fn nodelet_for(&self, xpath: &str) -> Option<Nodelet<E>> {
        return self.registry.borrow().nodelets.get(xpath).cloned();
    }

    pub fn end_nodelet_for(&self, xpath: &str) -> Option<EndNodelet<E>> {
        return self.registry.borrow().end_nodelets.get(xpath).cloned();
    }

    pub fn mounted_group(&self, trigger_name: &str, name: &str) -> Option<NodeletGroup<E>> {
        let key = make_mount_path(trigger_name, name);
        return self.registry.borrow().mounts.get(&key).cloned();
    }

    // -----------------------------------------------------------------
    //
    fn resolve(&self, relative: &str) -> String {
        if relative.starts_with('/') {
            return String::from(relative);
        }
        return format!("{}/{}", self.xpath, relative);
    }

    fn put_nodelet(&self, xpath: String, nodelet: Nodelet<E>) {
        if self.registry.borrow_mut().nodelets.insert(xpath.clone(), nodelet).is_some() {
            tracing::debug!("Nodelet for {} replaced", xpath);
        }
    }

    fn put_end_nodelet(&self, xpath: String, nodelet: EndNodelet<E>) {
        if self.registry.borrow_mut().end_nodelets.insert(xpath.clone(), nodelet).is_some() {
            tracing::debug!("End nodelet for {} replaced", xpath);
        }
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use crate::nodelet::StackEntry;

    #[derive(Debug)]
    struct Entry;

    impl StackEntry for Entry {
        fn entry_name(&self) -> &'static str {
            return "Entry";
        }
    }

    fn noop(_: &Attributes, _: &mut ObjectStack<Entry>) -> HandlerResult {
        return Ok(());
    }

    #[test]
    fn test_paths() {
        let root: NodeletGroup<Entry> = NodeletGroup::new("aspectran");
        let translet = root.child("translet");
        translet.nodelet(noop);
        translet.nodelet_at("request/parameters", noop);
        root.nodelet_at("/", noop);
        assert_eq!(translet.xpath(), "/aspectran/translet");

        let test_specs = [
            ( "/aspectran/translet", true ),
            ( "/aspectran/translet/request/parameters", true ),
            ( "/", true ),
            ( "/aspectran", false ),
            ( "/translet", false ),
        ];
        for (xpath, guess) in test_specs.iter() {
            assert_eq!(root.nodelet_for(xpath).is_some(), *guess, "{}", xpath);
        }
    }

    #[test]
    fn test_mount() {
        let root: NodeletGroup<Entry> = NodeletGroup::new("aspectran");
        let transform: NodeletGroup<Entry> = NodeletGroup::new("transform");
        transform.nodelet(noop).child("template").nodelet(noop);
        root.child("translet").mount(&transform);

        let mounted = root.mounted_group("translet", "transform").unwrap();
        assert_eq!(mounted.xpath(), "/transform");
        assert!(mounted.nodelet_for("/transform/template").is_some());
        assert!(root.nodelet_for("/transform/template").is_none());
        assert!(root.mounted_group("aspectran", "transform").is_none());
    }

    #[test]
    fn test_with_adder() {
        let root: NodeletGroup<Entry> = NodeletGroup::new("aspectran");
        let items = |group: &NodeletGroup<Entry>| {
            group.child("item").nodelet(noop);
        };
        root.child("bean").with(&items);
        root.child("translet").with(&items);
        assert!(root.nodelet_for("/aspectran/bean/item").is_some());
        assert!(root.nodelet_for("/aspectran/translet/item").is_some());
    }

    #[test]
    fn test_guarded_adders() {
        let root: NodeletGroup<Entry> = NodeletGroup::new("aspectran");
        let items = |group: &NodeletGroup<Entry>| {
            group.child("item").nodelet(noop);
        };
        root.child("bean").with_if(true, &items);
        root.child("schedule").with_if(false, &items);
        root.child("translet").with_lazy(|| &items);

        let test_specs = [
            ( "/aspectran/bean/item", true ),
            ( "/aspectran/schedule/item", false ),
            ( "/aspectran/translet/item", true ),
        ];
        for (xpath, guess) in test_specs.iter() {
            assert_eq!(root.nodelet_for(xpath).is_some(), *guess, "{}", xpath);
        }
    }

    #[test]
    fn test_attributes() {
        let attrs = Attributes::from(&[("name", " /hello "), ("empty", "  ")][..]);
        assert_eq!(attrs.get("name"), Some(" /hello "));
        assert_eq!(attrs.get_text("name"), Some(String::from("/hello")));
        assert_eq!(attrs.get_text("empty"), None);
        assert_eq!(attrs.get("none"), None);
        assert_eq!(attrs.len(), 2);
    }
}
