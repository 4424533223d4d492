//
// nodelet/path.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

use crate::sax::Location;

// =====================================================================
/// Path of element names from the document root to the element being
/// parsed, with an optional mount point.
///
/// Display always gives the full path from the document root, which
/// is what error messages and the tracker report.  mount_xpath() is the
/// same path relative to the mount point: while a group is mounted,
/// lookups use it, so the same group answers wherever it is mounted.
/// Without a mount the two are equal.
///
/// ```
/// use aspectran::nodelet::NodeletPath;
/// let mut path = NodeletPath::new();
/// path.add("aspectran");
/// path.add("translet");
/// path.add("transform");
/// assert_eq!(path.to_string(), "/aspectran/translet/transform");
/// assert_eq!(path.find_trigger_name(), Some("translet"));
/// path.mount();
/// path.add("echo");
/// assert_eq!(path.mount_xpath(), "/transform/echo");
/// assert_eq!(path.to_string(), "/aspectran/translet/transform/echo");
/// ```
///
#[derive(Debug, Clone, Default)]
pub struct NodeletPath {
    names: Vec<String>,
    mount_index: usize,
}

impl NodeletPath {
    pub fn new() -> NodeletPath {
        return NodeletPath::default();
    }

    pub fn add(&mut self, name: &str) {
        self.names.push(String::from(name));
    }

    pub fn remove(&mut self) {
        self.names.pop();
    }

    pub fn len(&self) -> usize {
        return self.names.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.names.is_empty();
    }

    pub fn last_name(&self) -> Option<&str> {
        return self.names.last().map(|s| s.as_str());
    }

    pub fn parent_name(&self) -> Option<&str> {
        if self.names.len() < 2 {
            return None;
        }
        return Some(self.names[self.names.len() - 2].as_str());
    }

    // -----------------------------------------------------------------
    /// Marks the current element as the mount point.
    ///
    pub fn mount(&mut self) {
        self.mount_index = self.names.len().saturating_sub(1);
    }

    pub fn remount(&mut self, index: usize) {
        self.mount_index = index;
    }

    pub fn unmount(&mut self) {
        self.mount_index = 0;
    }

    pub fn is_mounted(&self) -> bool {
        return self.mount_index > 0;
    }

    pub fn mount_index(&self) -> usize {
        return self.mount_index;
    }

    // -----------------------------------------------------------------
    /// Path from the mount point down; the full path when nothing is
    /// mounted.
    ///
    pub fn mount_xpath(&self) -> String {
        let mut s = String::new();
        for name in self.names.iter().skip(self.mount_index) {
            s.push('/');
            s += name;
        }
        if s.is_empty() {
            s.push('/');
        }
        return s;
    }

    // -----------------------------------------------------------------
    /// Name of the parent element, which may trigger mounting a group
    /// for the current element.  The root element never does.
    ///
    pub fn find_trigger_name(&self) -> Option<&str> {
        if self.names.len() > 2 {
            return Some(self.names[self.names.len() - 2].as_str());
        }
        return None;
    }
}

impl fmt::Display for NodeletPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.names.is_empty() {
            return f.write_str("/");
        }
        for name in self.names.iter() {
            write!(f, "/{}", name)?;
        }
        return Ok(());
    }
}

// ---------------------------------------------------------------------
/// Key under which a group is mounted: "trigger/name".
///
pub fn make_mount_path(trigger_name: &str, name: &str) -> String {
    return format!("{}/{}", trigger_name, name);
}

// =====================================================================
/// Where the parser is: element name, path and position in the input.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeTracker {
    name: String,
    path: String,
    location: Option<Location>,
}

impl NodeTracker {
    pub fn new() -> NodeTracker {
        return NodeTracker::default();
    }

    pub fn update(&mut self, name: &str, path: &str, location: Option<Location>) {
        self.name = String::from(name);
        self.path = String::from(path);
        self.location = location;
    }

    pub fn name(&self) -> &str {
        return self.name.as_str();
    }

    pub fn path(&self) -> &str {
        return self.path.as_str();
    }

    pub fn location(&self) -> Option<Location> {
        return self.location;
    }
}

impl fmt::Display for NodeTracker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{}>", self.name)?;
        if let Some(loc) = self.location {
            write!(f, " ({})", loc)?;
        }
        return Ok(());
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_path() {
        let mut path = NodeletPath::new();
        assert_eq!(path.to_string(), "/");
        let test_specs = [
            ( "a", "/a", None ),
            ( "b", "/a/b", None ),
            ( "c", "/a/b/c", Some("b") ),
            ( "d", "/a/b/c/d", Some("c") ),
        ];
        for (name, guess, trigger) in test_specs.iter() {
            path.add(name);
            assert_eq!(path.to_string(), *guess);
            assert_eq!(path.find_trigger_name(), *trigger);
        }
        path.remove();
        path.remove();
        assert_eq!(path.to_string(), "/a/b");
        assert_eq!(path.last_name(), Some("b"));
        assert_eq!(path.parent_name(), Some("a"));
    }

    #[test]
    fn test_mount() {
        let mut path = NodeletPath::new();
        for name in ["aspectran", "translet", "transform"].iter() {
            path.add(name);
        }
        assert!(! path.is_mounted());
        path.mount();
        assert!(path.is_mounted());
        assert_eq!(path.mount_index(), 2);
        assert_eq!(path.mount_xpath(), "/transform");
        path.add("template");
        assert_eq!(path.mount_xpath(), "/transform/template");
        assert_eq!(path.to_string(), "/aspectran/translet/transform/template");
        path.remount(1);
        assert_eq!(path.mount_xpath(), "/translet/transform/template");
        path.unmount();
        assert!(! path.is_mounted());
        assert_eq!(path.mount_xpath(), "/aspectran/translet/transform/template");
    }

    #[test]
    fn test_tracker() {
        let mut tracker = NodeTracker::new();
        tracker.update("translet", "/aspectran/translet",
                Some(Location { line: 3, column: 5 }));
        assert_eq!(tracker.to_string(), "<translet> (line 3, column 5)");
        assert_eq!(make_mount_path("translet", "transform"), "translet/transform");
    }
}
