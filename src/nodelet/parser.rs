//
// nodelet/parser.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use crate::dtd::{Dtd, EntityResolver};
use crate::error::{BoxError, NodeletError};
use crate::nodelet::group::{Attributes, NodeletGroup};
use crate::nodelet::path::{make_mount_path, NodeTracker, NodeletPath};
use crate::nodelet::stack::{ObjectStack, StackEntry};
use crate::sax::{self, Doctype, Location, SaxDecoder, XmlToken};

// =====================================================================
/// A group mounted while its element is open.
///
struct MountStatus<E> {
    index: usize,
    key: String,
    group: NodeletGroup<E>,
}

// =====================================================================
/// Drives a document through the nodelets of a NodeletGroup.
///
/// For each start tag the parser looks the element's path up, either
/// as an absolute path in the root group or, while a group is mounted,
/// relative to the mount point.  When nothing is registered and the
/// parent element has a group mounted for this element name, that
/// group is mounted and consulted instead.  End tags call the end
/// nodelet with the text collected since the last start tag.
///
/// ```
/// use aspectran::nodelet::*;
/// use aspectran::stack_entries;
///
/// stack_entries! {
///     enum Entry {
///         Names(Vec<String>),
///     }
/// }
///
/// let root: NodeletGroup<Entry> = NodeletGroup::new("list");
/// root.child("name").end_nodelet(|text, stack| {
///     stack.peek_mut::<Vec<String>>()?.push(text.unwrap_or("").to_string());
///     Ok(())
/// });
/// let mut parser = NodeletParser::new(root);
/// parser.object_stack().push(Vec::<String>::new());
/// parser.parse("<list><name>a</name><name>b</name></list>").unwrap();
/// let names: Vec<String> = parser.object_stack().pop().unwrap();
/// assert_eq!(names, vec!["a", "b"]);
/// ```
///
pub struct NodeletParser<E> {
    group: NodeletGroup<E>,
    object_stack: ObjectStack<E>,
    validating: bool,
    entity_resolver: Option<Box<dyn EntityResolver>>,
    node_tracker: Option<Rc<RefCell<NodeTracker>>>,
}

// ---------------------------------------------------------------------
// State of one parse run.
//
struct ParseRun<E> {
    path: NodeletPath,
    locations: Vec<Location>,
    mounts: Vec<MountStatus<E>>,
    text: String,
    dtd: Option<Dtd>,
    doctype: Option<Doctype>,
    root_seen: bool,
    finished: bool,
}

impl<E: StackEntry + 'static> NodeletParser<E> {

    pub fn new(group: NodeletGroup<E>) -> NodeletParser<E> {
        return NodeletParser {
            group,
            object_stack: ObjectStack::new(),
            validating: false,
            entity_resolver: None,
            node_tracker: None,
        };
    }

    /// With validation on, a document must declare a DOCTYPE and
    /// conform to it.
    ///
    pub fn set_validating(&mut self, validating: bool) {
        self.validating = validating;
    }

    pub fn is_validating(&self) -> bool {
        return self.validating;
    }

    pub fn set_entity_resolver<R: EntityResolver + 'static>(&mut self, resolver: R) {
        self.entity_resolver = Some(Box::new(resolver));
    }

    // -----------------------------------------------------------------
    /// Turns location tracking on; the returned tracker follows the
    /// element being handled.
    ///
    pub fn tracking_location(&mut self) -> Rc<RefCell<NodeTracker>> {
        let tracker = self.node_tracker
                .get_or_insert_with(|| Rc::new(RefCell::new(NodeTracker::new())));
        return Rc::clone(tracker);
    }

    pub fn object_stack(&mut self) -> &mut ObjectStack<E> {
        return &mut self.object_stack;
    }

    pub fn group(&self) -> &NodeletGroup<E> {
        return &self.group;
    }

    // -----------------------------------------------------------------
    /// Reads and parses the file at 'path'.
    ///
    pub fn parse_file(&mut self, path: &Path) -> Result<(), NodeletError> {
        let source = fs::read_to_string(path).map_err(|e| NodeletError::Io {
            name: path.display().to_string(),
            source: e,
        })?;
        return self.parse(&source);
    }

    // -----------------------------------------------------------------
    /// Parses a whole document.  Any error aborts the parse.
    ///
    pub fn parse(&mut self, source: &str) -> Result<(), NodeletError> {
        let mut dec = SaxDecoder::new(source);
        let mut run: ParseRun<E> = ParseRun {
            path: NodeletPath::new(),
            locations: vec!{},
            mounts: vec!{},
            text: String::new(),
            dtd: None,
            doctype: None,
            root_seen: false,
            finished: false,
        };

        if let Some(nodelet) = self.group.nodelet_for("/") {
            nodelet(&Attributes::default(), &mut self.object_stack)
                    .map_err(|e| handler_error("/", None, e))?;
        }

        loop {
            match dec.raw_token()? {
                XmlToken::EOF => {
                    break;
                },
                XmlToken::StartElement{name, mut attr} => {
                    let location = dec.location();
                    if run.finished {
                        return Err(xml_syntax_error!(
                            "Extra content after the root element at {}", location).into());
                    }
                    if ! run.root_seen {
                        run.root_seen = true;
                        if self.validating {
                            run.dtd = Some(self.load_dtd(run.doctype.as_ref(), &name, location)?);
                        }
                    }
                    if let Some(ref dtd) = run.dtd {
                        dtd.check_element(run.path.last_name(), &name, &mut attr)
                                .map_err(|message| invalid(message, location))?;
                    }

                    run.path.add(&name);
                    run.locations.push(location);
                    run.text.clear();
                    let xpath = run.path.to_string();
                    self.track(&name, &xpath, location);

                    let attrs = Attributes::new(attr);
                    if let Some(nodelet) = self.find_nodelet(&mut run) {
                        nodelet(&attrs, &mut self.object_stack)
                                .map_err(|e| handler_error(&xpath, Some(location), e))?;
                    }
                },
                XmlToken::EndElement{name} => {
                    if run.path.last_name() != Some(name.as_str()) {
                        return Err(xml_syntax_error!(
                            "Element name mismatch: {} and {}",
                            run.path.last_name().unwrap_or(""), name).into());
                    }
                    let location = run.locations.last().cloned();
                    let xpath = run.path.to_string();
                    if let Some(loc) = location {
                        self.track(&name, &xpath, loc);
                    }

                    let end_nodelet = self.find_end_nodelet(&mut run, &name);
                    if let Some(end_nodelet) = end_nodelet {
                        let text = if run.text.trim().is_empty() {
                            None
                        } else {
                            Some(run.text.as_str())
                        };
                        end_nodelet(text, &mut self.object_stack)
                                .map_err(|e| handler_error(&xpath, location, e))?;
                    }

                    run.path.remove();
                    run.locations.pop();
                    run.text.clear();
                    if run.path.is_empty() {
                        run.finished = true;
                    }
                },
                XmlToken::CharData{chardata} => {
                    match run.path.last_name() {
                        None => {
                            if chardata.trim() != "" {
                                return Err(xml_syntax_error!(
                                    "Text outside of the root element: {}", chardata.trim()).into());
                            }
                        },
                        Some(element) => {
                            if let Some(ref dtd) = run.dtd {
                                let location = dec.location();
                                dtd.check_text(element, &chardata)
                                        .map_err(|message| invalid(message, location))?;
                            }
                            run.text += &chardata;
                        },
                    }
                },
                XmlToken::Directive{directive} => {
                    if let Some(doctype) = sax::parse_doctype(&directive)? {
                        if run.root_seen {
                            return Err(xml_syntax_error!("DOCTYPE after the root element").into());
                        }
                        run.doctype = Some(doctype);
                    }
                },
                XmlToken::ProcInst{..} | XmlToken::Comment{..} => {},
            }
        }

        if let Some(name) = run.path.last_name() {
            return Err(xml_syntax_error!("Unexpected EOF; <{}> is not closed", name).into());
        }
        if ! run.root_seen {
            return Err(xml_syntax_error!("Premature end of file: no root element").into());
        }

        if let Some(end_nodelet) = self.group.end_nodelet_for("/") {
            end_nodelet(None, &mut self.object_stack)
                    .map_err(|e| handler_error("/", None, e))?;
        }
        return Ok(());
    }

    // -----------------------------------------------------------------
    //
    fn find_nodelet(&self, run: &mut ParseRun<E>)
            -> Option<crate::nodelet::group::Nodelet<E>> {
        let found = match run.mounts.last() {
            Some(m) => m.group.nodelet_for(&run.path.mount_xpath()),
            None => self.group.nodelet_for(&run.path.to_string()),
        };
        if found.is_some() {
            return found;
        }

        let (trigger, name) = match (run.path.find_trigger_name(), run.path.last_name()) {
            (Some(t), Some(n)) => (String::from(t), String::from(n)),
            _ => return None,
        };
        let owner = match run.mounts.last() {
            Some(m) => m.group.clone(),
            None => self.group.clone(),
        };
        let mounted = owner.mounted_group(&trigger, &name)?;
        run.path.mount();
        tracing::trace!("mounted {} at {}", mounted.xpath(), run.path);
        run.mounts.push(MountStatus {
            index: run.path.mount_index(),
            key: make_mount_path(&trigger, &name),
            group: mounted.clone(),
        });
        return mounted.nodelet_for(&run.path.mount_xpath());
    }

    // -----------------------------------------------------------------
    // Resolves the end nodelet, then unmounts when the mounted element
    // itself is closing.
    //
    fn find_end_nodelet(&self, run: &mut ParseRun<E>, name: &str)
            -> Option<crate::nodelet::group::EndNodelet<E>> {
        let found = match run.mounts.last() {
            Some(m) => m.group.end_nodelet_for(&run.path.mount_xpath()),
            None => self.group.end_nodelet_for(&run.path.to_string()),
        };

        let closing_mount = match (run.mounts.last(), run.path.find_trigger_name()) {
            (Some(m), Some(trigger)) => {
                m.index + 1 == run.path.len() && m.key == make_mount_path(trigger, name)
            },
            _ => false,
        };
        if closing_mount {
            run.mounts.pop();
            match run.mounts.last() {
                Some(m) => run.path.remount(m.index),
                None => run.path.unmount(),
            }
            tracing::trace!("unmounted at {}", run.path);
        }
        return found;
    }

    // -----------------------------------------------------------------
    //
    fn track(&self, name: &str, xpath: &str, location: Location) {
        if let Some(ref tracker) = self.node_tracker {
            tracker.borrow_mut().update(name, xpath, Some(location));
        }
    }

    // -----------------------------------------------------------------
    // Internal subset first; its declarations win over the external DTD.
    //
    fn load_dtd(&self, doctype: Option<&Doctype>, root_name: &str,
                location: Location) -> Result<Dtd, NodeletError> {
        let doctype = match doctype {
            Some(d) => d,
            None => return Err(invalid(String::from("no grammar found"), location)),
        };
        if doctype.root_name != root_name {
            return Err(invalid(format!("Document root element \"{}\", must match DOCTYPE root \"{}\".",
                    root_name, doctype.root_name), location));
        }

        let mut dtd = match doctype.internal_subset {
            Some(ref subset) => Dtd::parse(subset)?,
            None => Dtd::default(),
        };
        if doctype.public_id.is_some() || doctype.system_id.is_some() {
            let resolved = match self.entity_resolver {
                Some(ref resolver) => resolver
                        .resolve_entity(doctype.public_id.as_deref(), doctype.system_id.as_deref())
                        .map_err(|e| NodeletError::Io {
                            name: doctype.system_id.clone().unwrap_or_default(),
                            source: e,
                        })?,
                None => None,
            };
            let text = match resolved {
                Some(text) => text,
                None => {
                    let system_id = doctype.system_id.clone().unwrap_or_default();
                    match fs::read_to_string(&system_id) {
                        Ok(text) => text,
                        Err(_) => return Err(invalid(
                            format!("External DTD \"{}\" cannot be resolved", system_id), location)),
                    }
                },
            };
            tracing::trace!("DTD resolved for {:?}", doctype.system_id);
            dtd.merge(Dtd::parse(&text)?);
        }
        return Ok(dtd);
    }
}

// ---------------------------------------------------------------------
//
fn handler_error(xpath: &str, location: Option<Location>, source: BoxError) -> NodeletError {
    return NodeletError::Handler {
        path: String::from(xpath),
        location: location.map(|l| format!(" at {}", l)).unwrap_or_default(),
        source,
    };
}

fn invalid(message: String, location: Location) -> NodeletError {
    return NodeletError::Invalid {
        message,
        location: format!(" at {}", location),
    };
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use std::io;

    stack_entries! {
        #[derive(Debug)]
        enum Entry {
            Log(Vec<String>),
        }
    }

    fn log(stack: &mut ObjectStack<Entry>, s: String) -> crate::nodelet::HandlerResult {
        stack.peek_mut::<Vec<String>>()?.push(s);
        return Ok(());
    }

    // Root group logging every visit by path, with a "response" group
    // mounted under translet.
    fn make_groups() -> NodeletGroup<Entry> {
        let root: NodeletGroup<Entry> = NodeletGroup::new("aspectran");
        root.nodelet(|_, stack| log(stack, String::from("S:aspectran")));
        let translet = root.child("translet");
        translet.nodelet(|attrs, stack| {
            log(stack, format!("S:translet:{}", attrs.get("name").unwrap_or("")))
        });
        translet.end_nodelet(|_, stack| log(stack, String::from("E:translet")));

        let response: NodeletGroup<Entry> = NodeletGroup::new("transform");
        response.nodelet(|attrs, stack| {
            log(stack, format!("S:transform:{}", attrs.get("type").unwrap_or("")))
        });
        response.end_nodelet(|_, stack| log(stack, String::from("E:transform")));
        response.child("template").end_nodelet(|text, stack| {
            log(stack, format!("E:template:{}", text.unwrap_or("-")))
        });
        translet.mount(&response);
        return root;
    }

    fn run(source: &str) -> Result<Vec<String>, NodeletError> {
        let mut parser = NodeletParser::new(make_groups());
        parser.object_stack().push(Vec::<String>::new());
        parser.parse(source)?;
        return Ok(parser.object_stack().pop::<Vec<String>>()?);
    }

    #[test]
    fn test_dispatch() {
        let result = run(r#"<aspectran>
            <translet name="/a">
                <transform type="json"><template>T</template></transform>
            </translet>
            <translet name="/b"/>
        </aspectran>"#).unwrap();
        assert_eq!(result, vec![
            "S:aspectran", "S:translet:/a", "S:transform:json", "E:template:T",
            "E:transform", "E:translet", "S:translet:/b", "E:translet",
        ]);
    }

    #[test]
    fn test_mount_isolation() {
        // transform is only known below translet; template is only
        // known inside the mounted group.
        let result = run(r#"<aspectran>
            <transform type="xml"/>
            <translet name="/a"><template>X</template></translet>
        </aspectran>"#).unwrap();
        assert_eq!(result, vec!["S:aspectran", "S:translet:/a", "E:translet"]);
    }

    #[test]
    fn test_empty_text_is_none() {
        let result = run(r#"<aspectran><translet name="/a"><transform>
            <template>  </template></transform></translet></aspectran>"#).unwrap();
        assert!(result.contains(&String::from("E:template:-")));
    }

    #[test]
    fn test_handler_error_location() {
        let root: NodeletGroup<Entry> = NodeletGroup::new("aspectran");
        root.child("bad").nodelet(|_, _| Err("boom".into()));
        let mut parser = NodeletParser::new(root);
        let err = parser.parse("<aspectran>\n  <bad/>\n</aspectran>").unwrap_err();
        assert_eq!(err.to_string(),
            "Error processing nodelet \"/aspectran/bad\" at line 2, column 3: boom");
    }

    #[test]
    fn test_malformed() {
        let test_specs = [
            ( "<aspectran><translet></aspectran>",
              "Error parsing XML; Syntax Error in XML: Element name mismatch: translet and aspectran" ),
            ( "<aspectran>",
              "Error parsing XML; Syntax Error in XML: Unexpected EOF; <aspectran> is not closed" ),
            ( "<aspectran/><aspectran/>",
              "Error parsing XML; Syntax Error in XML: Extra content after the root element at line 1, column 13" ),
            ( "",
              "Error parsing XML; Syntax Error in XML: Premature end of file: no root element" ),
        ];
        for (src, guess) in test_specs.iter() {
            let err = run(src).unwrap_err();
            assert_eq!(err.to_string(), *guess);
        }
    }

    struct TestResolver;

    impl EntityResolver for TestResolver {
        fn resolve_entity(&self, _public_id: Option<&str>, system_id: Option<&str>)
                -> Result<Option<String>, io::Error> {
            if system_id == Some("test.dtd") {
                return Ok(Some(String::from(r#"
                    <!ELEMENT aspectran (translet)*>
                    <!ELEMENT translet (transform)?>
                    <!ATTLIST translet name CDATA #REQUIRED>
                    <!ELEMENT transform (template)?>
                    <!ATTLIST transform type (json|xml) "json">
                    <!ELEMENT template (#PCDATA)>
                "#)));
            }
            return Ok(None);
        }
    }

    #[test]
    fn test_validation() {
        let mut parser = NodeletParser::new(make_groups());
        parser.set_validating(true);
        parser.set_entity_resolver(TestResolver);
        parser.object_stack().push(Vec::<String>::new());
        parser.parse(r#"<?xml version="1.0"?>
            <!DOCTYPE aspectran SYSTEM "test.dtd">
            <aspectran><translet name="/a"><transform/></translet></aspectran>"#).unwrap();
        let result: Vec<String> = parser.object_stack().pop().unwrap();
        assert!(result.contains(&String::from("S:transform:json")));

        let test_specs = [
            ( r#"<!DOCTYPE aspectran SYSTEM "test.dtd"><aspectran><translet/></aspectran>"#,
              "Document is invalid: Attribute \"name\" is required and must be specified for element type \"translet\". at line 1, column 50" ),
            ( r#"<aspectran/>"#,
              "Document is invalid: no grammar found at line 1, column 1" ),
            ( r#"<!DOCTYPE other SYSTEM "test.dtd"><aspectran/>"#,
              "Document is invalid: Document root element \"aspectran\", must match DOCTYPE root \"other\". at line 1, column 35" ),
        ];
        for (src, guess) in test_specs.iter() {
            let mut parser = NodeletParser::new(make_groups());
            parser.set_validating(true);
            parser.set_entity_resolver(TestResolver);
            parser.object_stack().push(Vec::<String>::new());
            assert_eq!(parser.parse(src).unwrap_err().to_string(), *guess);
        }
    }

    #[test]
    fn test_tracker() {
        let root: NodeletGroup<Entry> = NodeletGroup::new("aspectran");
        let mut parser = NodeletParser::new(root);
        let tracker = parser.tracking_location();
        parser.parse("<aspectran>\n<translet/>\n</aspectran>").unwrap();
        assert_eq!(tracker.borrow().name(), "aspectran");
        assert_eq!(tracker.borrow().to_string(), "<aspectran> (line 1, column 1)");
    }
}
