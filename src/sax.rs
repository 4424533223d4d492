//
// sax.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//
//!
//! Pull-style SAX tokenizer.
//!
//! # Examples
//!
//! Basic usage:
//!
//! - Create the SaxDecoder object with the XML string as argument.
//!
//! - Call SaxDecoder#raw_token() in loop. raw_token() returns
//!   the next token, which is one of StartElement, EndElement, CharData, etc.
//!
//! - If XML string has standalone element like &lt;foo/&gt;, raw_token()
//!   returns in 2 phases: first as StartElement &lt;foo&gt;, and second
//!   as EndElement &lt;/foo&gt;.
//!
//! - location() tells the line and column where the last token began.
//!
//! ```
//! use aspectran::sax::*;
//! let xml_string = "<?xml version=\"1.0\"?>\n<root a=\"v\">-&gt;text<img/></root>";
//! let mut dec = SaxDecoder::new(&xml_string);
//! let mut buf = String::from("");
//! loop {
//!     match dec.raw_token() {
//!         Ok(XmlToken::EOF) => {
//!             buf += "EOF";
//!             break;
//!         },
//!         Ok(XmlToken::StartElement{name, attr}) => {
//!             let loc = dec.location();
//!             buf += &format!("[S] {} ({}:{}); ", name, loc.line, loc.column);
//!             for at in attr.iter() {
//!                 buf += &format!("[A] {} = \"{}\"; ", at.name(), at.value());
//!             }
//!         },
//!         Ok(XmlToken::EndElement{name}) => {
//!             buf += &format!("[E] {}; ", name);
//!         },
//!         Ok(XmlToken::CharData{chardata}) => {
//!             buf += &format!("[T] \"{}\"; ", chardata);
//!         },
//!         _ => {},
//!     }
//! }
//! assert_eq!(buf, r#"[T] "
//! "; [S] root (2:1); [A] a = "v"; [T] "->text"; [S] img (2:22); [E] img; [E] root; EOF"#);
//! ```
//!
//! ### Note
//!
//! SaxDecoder does not verify that StartElement and EndElement match;
//! NodeletParser does that.
//! Namespace prefixes are kept as part of the name.
//!
//! &lt;!DOCTYPE ...&gt; is returned as a Directive; use parse_doctype()
//! to read the identifiers and the internal subset.
//!

use std::char;
use std::fmt;
use std::u32;
use std::usize;

use crate::error::XmlError;

// =====================================================================
//
const EOF: char = '\u{0000}';

// =====================================================================
/// SaxDecoder represents an XML parser reading a particular input stream.
/// See the module document for details.
///
pub struct SaxDecoder {
    char_vec: Vec<char>,
    index: usize,
    to_close: String,
    token_start: usize,
    counted_index: usize,
    line: usize,
    column: usize,
}

// =====================================================================
/// XmlToken, return type of SaxDecoder#raw_token()
///
#[derive(Debug, PartialEq)]
pub enum XmlToken {
    EOF,
    StartElement {
        name: String,
        attr: Vec<Attr>,
    },
    EndElement {
        name: String,
    },
    CharData {
        chardata: String,
    },
    ProcInst {
        target: String,
        inst: String,
    },
    Comment {
        comment: String,
    },
    Directive {
        directive: String,
    },
}

// =====================================================================
/// In XmlToken::StartElement, attribute of element.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    name: String,
    value: String,
}

impl Attr {
    pub fn new(name: &str, value: &str) -> Attr {
        return Attr {
            name: String::from(name),
            value: String::from(value),
        };
    }
    pub fn name(&self) -> &str {
        return self.name.as_str();
    }
    pub fn value(&self) -> &str {
        return self.value.as_str();
    }
}

// =====================================================================
/// Line and column (both 1-based) of a token in the input.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

// =====================================================================
/// Parsed form of a &lt;!DOCTYPE ...&gt; directive.
///
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Doctype {
    pub root_name: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
    pub internal_subset: Option<String>,
}

// =====================================================================
//
impl SaxDecoder {

    // -----------------------------------------------------------------
    /// Creates a new XML parser reading from String.
    ///
    pub fn new(xml_string: &str) -> SaxDecoder {
        return SaxDecoder{
            char_vec: xml_string.chars().filter(|x| *x != '\r').collect(),
            index: 0,
            to_close: String::from(""),
            token_start: 0,
            counted_index: 0,
            line: 1,
            column: 1,
        };
    }

    // -----------------------------------------------------------------
    /// Where the token last returned by raw_token() began.
    ///
    pub fn location(&mut self) -> Location {
        let limit = usize::min(self.token_start, self.char_vec.len());
        while self.counted_index < limit {
            if self.char_vec[self.counted_index] == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.counted_index += 1;
        }
        return Location {
            line: self.line,
            column: self.column,
        };
    }

    // -----------------------------------------------------------------
    /// Returns the next XML token in the input stream.
    /// At end of the input stream, raw_token() returns XmlToken::EOF.
    ///
    pub fn raw_token(&mut self) -> Result<XmlToken, XmlError> {
        if self.to_close != "" {
            let name = self.to_close.clone();
            self.to_close = String::from("");
            return Ok(XmlToken::EndElement{name});
        }

        self.token_start = self.index;
        let mut ch = self.getchar();
        if ch == EOF {
            return Ok(XmlToken::EOF);

        } else if ch == '<' {
            ch = self.getchar();

            if ch == EOF {
                return Err(xml_syntax_error!("Unexpected EOF after <"));

            // ---------------------------------------------------------
            // [42] ETag ::= '</' Name S? '>'
            //
            } else if ch == '/' {
                let name = self.get_name();
                self.get_until_ch('>')?;
                if name == "" {
                    return Err(xml_syntax_error!("End tag without name"));
                }
                return Ok(XmlToken::EndElement{name});

            // ---------------------------------------------------------
            // [16] PI ::= '<?' PITarget (S (Char* - (Char* '?>' Char*)))? '?>'
            // XML declaration is returned as a PI whose target is "xml".
            //
            } else if ch == '?' {
                let target = self.get_name();
                self.skip_spaces();
                let inst = self.get_until("?>")?;
                return Ok(XmlToken::ProcInst{target, inst});

            // ---------------------------------------------------------
            // <!-- --> / <![CDATA[ ... ]]> / <!DOCTYPE ...>
            //
            } else if ch == '!' {
                ch = self.getchar();
                if ch == '-' {
                    ch = self.getchar();
                    if ch == '-' {
                        let comment = self.get_until("-->")?;
                        return Ok(XmlToken::Comment{comment});
                    } else {
                        self.ungetchar();
                        return Err(xml_syntax_error!("Invalid sequence '<!-', not part of '<!--'"));
                    }
                } else if ch == '[' {
                    if self.look_ahead_keyword("CDATA[") == true {
                        let chardata = self.get_until("]]>")?;
                        return Ok(XmlToken::CharData{chardata});
                    } else {
                        return Err(xml_syntax_error!("Invalid sequence '<![', not part of '<![CDATA[' "));
                    }
                } else {
                    let directive = format!("<!{}{}",
                        ch, &self.get_until_matching_bracket()?);
                    return Ok(XmlToken::Directive{directive});
                }

            // ---------------------------------------------------------
            // [40] STag ::= '<' Name (S Attribute)* S? '>'
            // [44] EmptyElemTag ::= '<' Name (S Attribute)* S? '/>'
            //
            } else {
                self.ungetchar();
                let name = self.get_name();
                if name == "" {
                    return Err(xml_syntax_error!("Invalid character '{}' after <", ch));
                }
                let mut attr: Vec<Attr> = vec!{};
                loop {
                    self.skip_spaces();
                    let attr_name = self.get_name();
                    let no_attr = attr_name == "";
                    if ! no_attr {
                        self.skip_spaces();
                        ch = self.getchar();
                        if ch == '=' {
                            self.skip_spaces();
                            ch = self.getchar();
                            if ch == '"' || ch == '\'' {
                                let attr_value = self.get_until_ch(ch)?;
                                if attr.iter().any(|a| a.name == attr_name) {
                                    self.get_until_ch('>')?;
                                    return Err(xml_syntax_error!("Attribute {} redefined in <{}>", attr_name, name));
                                }
                                attr.push(Attr{
                                    name: attr_name,
                                    value: decode_entity(&attr_value),
                                });
                            } else {
                                self.get_until_ch('>')?;
                                return Err(xml_syntax_error!("attr_value: no Quote"));
                            }
                        } else {
                            self.get_until_ch('>')?;
                            return Err(xml_syntax_error!("attr_name: no Eq"));
                        }
                    }
                    ch = self.getchar();
                    if ch == '>' {
                        break;
                    } else if ch == '/' {
                        ch = self.getchar();
                        if ch == '>' {
                            self.to_close = name.clone();
                            break;
                        } else {
                            return Err(xml_syntax_error!("illegal char after /"));
                        }
                    } else if ch == EOF {
                        return Err(xml_syntax_error!("Unexpected EOF in <{}>", name));
                    } else if no_attr {
                        self.get_until_ch('>')?;
                        return Err(xml_syntax_error!("Invalid character '{}' in <{}>", ch, name));
                    } else {
                        self.ungetchar();
                    }
                }
                return Ok(XmlToken::StartElement{name, attr});
            }

        // ---------------------------------------------------------
        // char data
        //
        } else {
            self.ungetchar();
            let chardata = self.get_chardata();
            return Ok(XmlToken::CharData{chardata: decode_entity(&chardata)});
        }
    }

    // -----------------------------------------------------------------
    // [3] S ::= (#x20 | #x9 | #xD | #xA)+
    //
    fn skip_spaces(&mut self) {
        loop {
            let ch = self.getchar();
            if ch == EOF {
                return;
            } else if ! is_space(ch) {
                self.ungetchar();
                return;
            }
        }
    }

    // -----------------------------------------------------------------
    // Consumes keyword and returns true if it follows; otherwise stays.
    //
    fn look_ahead_keyword(&mut self, keyword: &str) -> bool {
        for (i, key_ch) in keyword.chars().enumerate() {
            let ch = self.getchar();
            if ch != key_ch {
                for _ in 0 ..= i {
                    self.ungetchar();
                }
                return false;
            }
        }
        return true;
    }

    // -----------------------------------------------------------------
    // Substring up to delim; the position is left just after delim.
    //
    fn get_until(&mut self, delim: &str) -> Result<String, XmlError> {
        let mut s = String::new();
        loop {
            if self.look_ahead_keyword(delim) == true {
                return Ok(s);
            } else {
                let ch = self.getchar();
                if ch == EOF {
                    return Err(xml_syntax_error!("Unexpected EOF while searching {}", delim));
                }
                s.push(ch);
            }
        }
    }

    // -----------------------------------------------------------------
    //
    fn get_until_ch(&mut self, delim: char) -> Result<String, XmlError> {
        let mut s = String::new();
        loop {
            let ch = self.getchar();
            if ch == EOF {
                return Err(xml_syntax_error!("Unexpected EOF while searching {}", delim));
            } else if ch == delim {
                return Ok(s);
            } else {
                s.push(ch);
            }
        }
    }

    // -----------------------------------------------------------------
    // [5] Name ::= (Letter | '_' | ':') (NameChar)*
    //
    fn get_name(&mut self) -> String {
        let mut s = String::new();

        let ch = self.getchar();
        if ! is_name_first_char(ch) {
            self.ungetchar();
            return s;
        }

        s.push(ch);
        loop {
            let ch = self.getchar();
            if is_name_char(ch) {
                s.push(ch);
            } else {
                self.ungetchar();
                return s;
            }
        }
    }

    // -----------------------------------------------------------------
    //
    fn get_chardata(&mut self) -> String {
        let mut s = String::new();
        loop {
            let ch = self.getchar();
            if ch == EOF {
                return s;
            } else if ch == '<' {
                self.ungetchar();
                return s;
            } else {
                s.push(ch);
            }
        }
    }

    // -----------------------------------------------------------------
    // Quoted literals may hold '<' or '>' in a DOCTYPE.
    //
    fn get_until_matching_bracket(&mut self) -> Result<String, XmlError> {
        let mut s = String::new();
        let mut nest_level = 1;
        let mut quote = EOF;
        loop {
            let ch = self.getchar();
            if ch == EOF {
                return Err(xml_syntax_error!("Unexpected EOF while searching matching bracket"));
            }
            s.push(ch);
            if quote != EOF {
                if ch == quote {
                    quote = EOF;
                }
            } else if ch == '"' || ch == '\'' {
                quote = ch;
            } else if ch == '<' {
                nest_level += 1;
            } else if ch == '>' {
                nest_level -= 1;
                if nest_level == 0 {
                    return Ok(s);
                }
            }
        }
    }

    // -----------------------------------------------------------------
    //
    fn getchar(&mut self) -> char {
        self.index += 1;
        if self.char_vec.len() <= self.index - 1 {
            return EOF;
        } else {
            return self.char_vec[self.index - 1];
        }
    }

    // -----------------------------------------------------------------
    //
    fn ungetchar(&mut self) {
        if 0 < self.index {
            self.index -= 1;
        }
    }
}

// =====================================================================
/// Reads the identifiers and the internal subset of a DOCTYPE directive.
/// Returns None when the directive is not a DOCTYPE.
///
/// [28] doctypedecl ::= '<!DOCTYPE' S Name (S ExternalID)? S? ('[' intSubset ']' S?)? '>'
///
pub fn parse_doctype(directive: &str) -> Result<Option<Doctype>, XmlError> {
    let body = match directive.strip_prefix("<!DOCTYPE") {
        Some(b) => b,
        None => return Ok(None),
    };
    let body = body.strip_suffix('>').unwrap_or(body);

    let (head, internal_subset) = match body.find('[') {
        Some(p) => {
            let end = body.rfind(']').ok_or_else(||
                    xml_syntax_error!("Unterminated internal subset in DOCTYPE"))?;
            (&body[..p], Some(String::from(&body[p+1 .. end])))
        },
        None => (body, None),
    };

    let words = split_quoted(head)?;
    if words.is_empty() {
        return Err(xml_syntax_error!("DOCTYPE without root element name"));
    }
    let mut doctype = Doctype {
        root_name: words[0].clone(),
        internal_subset,
        ..Default::default()
    };
    match words.get(1).map(|s| s.as_str()) {
        Some("PUBLIC") => {
            if words.len() < 3 {
                return Err(xml_syntax_error!("DOCTYPE PUBLIC without public id"));
            }
            doctype.public_id = Some(words[2].clone());
            doctype.system_id = words.get(3).cloned();
        },
        Some("SYSTEM") => {
            if words.len() < 3 {
                return Err(xml_syntax_error!("DOCTYPE SYSTEM without system id"));
            }
            doctype.system_id = Some(words[2].clone());
        },
        Some(other) => {
            return Err(xml_syntax_error!("Unexpected '{}' in DOCTYPE", other));
        },
        None => {},
    }
    return Ok(Some(doctype));
}

// ---------------------------------------------------------------------
// Splits by white space; quoted literals become a single word.
//
fn split_quoted(s: &str) -> Result<Vec<String>, XmlError> {
    let mut words: Vec<String> = vec!{};
    let mut chars = s.chars().peekable();
    while let Some(&ch) = chars.peek() {
        if is_space(ch) {
            chars.next();
        } else if ch == '"' || ch == '\'' {
            chars.next();
            let mut w = String::new();
            loop {
                match chars.next() {
                    Some(c) if c == ch => break,
                    Some(c) => w.push(c),
                    None => return Err(xml_syntax_error!("Unterminated literal in DOCTYPE")),
                }
            }
            words.push(w);
        } else {
            let mut w = String::new();
            while let Some(&c) = chars.peek() {
                if is_space(c) {
                    break;
                }
                w.push(c);
                chars.next();
            }
            words.push(w);
        }
    }
    return Ok(words);
}

// ---------------------------------------------------------------------
// [3] S ::= (#x20 | #x9 | #xD | #xA)+
//
pub fn is_space(ch: char) -> bool {
    return [ ' ', '\t', '\r', '\n' ].contains(&ch);
}

// ---------------------------------------------------------------------
// [4] NameChar ::= Letter | Digit | '.' | '-' | '_' | ':' | CombiningChar | Extender
//
pub fn is_name_char(ch: char) -> bool {
    return is_name_first_char(ch) || ch.is_numeric() ||
        ch == '.' || ch == '-' || ch == '\u{00B7}' ||
        (! ch.is_ascii() && ! ch.is_whitespace() && ! ch.is_control());
}

// ---------------------------------------------------------------------
// [5] Name ::= (Letter | '_' | ':') (NameChar)*
//
pub fn is_name_first_char(ch: char) -> bool {
    return ch.is_alphabetic() || ch == '_' || ch == ':';
}

// ---------------------------------------------------------------------
// Decodes predefined entities and character references in one pass.
// [66] CharRef ::= '&#' [0-9]+ ';' | '&#x' [0-9a-fA-F]+ ';'
// [68] EntityRef ::= '&' Name ';'
// Unknown entity references are left as they are.
//
pub fn decode_entity(s: &str) -> String {
    if ! s.contains('&') {
        return String::from(s);
    }
    let mut buf = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(p) = rest.find('&') {
        buf += &rest[..p];
        let tail = &rest[p..];
        let semi = match tail.find(';') {
            Some(semi) if semi <= 12 => semi,
            _ => {
                buf.push('&');
                rest = &tail[1..];
                continue;
            },
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "gt" => Some('>'),
            "lt" => Some('<'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "amp" => Some('&'),
            _ => {
                if let Some(hex) = entity.strip_prefix("#x") {
                    Some(u32::from_str_radix(hex, 16).ok()
                            .and_then(char::from_u32).unwrap_or('〓'))
                } else if let Some(dec) = entity.strip_prefix('#') {
                    Some(u32::from_str_radix(dec, 10).ok()
                            .and_then(char::from_u32).unwrap_or('〓'))
                } else {
                    None
                }
            },
        };
        match decoded {
            Some(ch) => buf.push(ch),
            None => buf += &tail[..=semi],
        }
        rest = &tail[semi+1..];
    }
    buf += rest;
    return buf;
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    fn tokenize(src: &str) -> String {
        let mut dec = SaxDecoder::new(src);
        let mut result = String::from("");
        loop {
            let token = dec.raw_token();
            match token {
                Ok(XmlToken::EOF) => {
                    result += "EOF";
                    break;
                },
                Ok(XmlToken::StartElement{name, attr}) => {
                    result += &format!("[S]: {}; ", name);
                    for at in attr.iter() {
                        result += &format!("{} = \"{}\"; ", at.name, at.value);
                    }
                },
                Ok(XmlToken::EndElement{name}) => {
                    result += &format!("[E]: {}; ", name);
                },
                Ok(XmlToken::CharData{chardata}) => {
                    result += &format!("[T]: \"{}\"; ", chardata);
                },
                Ok(XmlToken::ProcInst{target, inst}) => {
                    result += &format!("[P]: {}; {}; ", target, inst);
                },
                Ok(XmlToken::Comment{comment}) => {
                    result += &format!("[C]: {}; ", comment);
                },
                Ok(XmlToken::Directive{directive}) => {
                    result += &format!("[D]: {}; ", directive);
                },
                Err(e) => {
                    result += &format!("Err: {}; ", e);
                },
            }
        }
        return result;
    }

    #[test]
    fn test_decoder() {
        let test_specs = [
            [ r#"<translet name="/hello"><echo/></translet>"#,
              r#"[S]: translet; name = "/hello"; [S]: echo; [E]: echo; [E]: translet; EOF"# ],
            [ r#"<ns:a>R&amp;D</ns:a>"#,
              r#"[S]: ns:a; [T]: "R&D"; [E]: ns:a; EOF"# ],
            [ r#"<a>R&amp;D&#169; &#x30BD;&#x30BF;</a>"#,
              r#"[S]: a; [T]: "R&D© ソタ"; [E]: a; EOF"# ],
            [ r#"<a>&amp;lt; &unknown;</a>"#,
              r#"[S]: a; [T]: "&lt; &unknown;"; [E]: a; EOF"# ],
            [ r#"<a>&#xXXXX; - &#x110000;</a>"#,
              r#"[S]: a; [T]: "〓 - 〓"; [E]: a; EOF"# ],
            [ r#"<a><![CDATA[<R&D>]]></a>"#,
              r#"[S]: a; [T]: "<R&D>"; [E]: a; EOF"# ],
            [ r#"<a b="c&gt;d"/>"#,
              r#"[S]: a; b = "c>d"; [E]: a; EOF"# ],
            [ r#"<a b="1" b="2"/>"#,
              r#"Err: Syntax Error in XML: Attribute b redefined in <a>; EOF"# ],
            [ r#"<?xml version="1.0" ?>"#,
              r#"[P]: xml; version="1.0" ; EOF"# ],
            [ r#"<段落 属性="値">文章</段落>"#,
              r#"[S]: 段落; 属性 = "値"; [T]: "文章"; [E]: 段落; EOF"# ],
            [ r#"<!--A--B-->"#,
              r#"[C]: A--B; EOF"# ],
            [ r#"<!-COMMENT-->"#,
              r#"Err: Syntax Error in XML: Invalid sequence '<!-', not part of '<!--'; [T]: "COMMENT-->"; EOF"# ],
            [ r#"<?xml version="1.0" "#,
              r#"Err: Syntax Error in XML: Unexpected EOF while searching ?>; EOF"# ],
            [ r#"<!DOCTYPE a [ <!ATTLIST a b CDATA "x>y"> ]>"#,
              r#"[D]: <!DOCTYPE a [ <!ATTLIST a b CDATA "x>y"> ]>; EOF"# ],
        ];

        for spec in test_specs.iter() {
            assert_eq!(tokenize(spec[0]), spec[1], "source: {}", spec[0]);
        }
    }

    #[test]
    fn test_location() {
        let src = "<aspectran>\n  <translet name=\"a\">\n\n    <echo/>\n  </translet>\n</aspectran>";
        let mut dec = SaxDecoder::new(src);
        let mut found = vec!{};
        loop {
            match dec.raw_token() {
                Ok(XmlToken::EOF) => break,
                Ok(XmlToken::StartElement{name, ..}) => {
                    let loc = dec.location();
                    found.push(format!("{}@{}:{}", name, loc.line, loc.column));
                },
                Ok(_) => {},
                Err(e) => panic!("{}", e),
            }
        }
        assert_eq!(found, vec!["aspectran@1:1", "translet@2:3", "echo@4:5"]);
    }

    #[test]
    fn test_parse_doctype() {
        let test_specs = [
            ( r#"<!DOCTYPE aspectran PUBLIC "-//ASPECTRAN//DTD Aspectran 1.0//EN" "https://aspectran.com/dtd/aspectran-1.0.dtd">"#,
              Some(Doctype {
                  root_name: String::from("aspectran"),
                  public_id: Some(String::from("-//ASPECTRAN//DTD Aspectran 1.0//EN")),
                  system_id: Some(String::from("https://aspectran.com/dtd/aspectran-1.0.dtd")),
                  internal_subset: None,
              }) ),
            ( r#"<!DOCTYPE a SYSTEM 'a.dtd'>"#,
              Some(Doctype {
                  root_name: String::from("a"),
                  public_id: None,
                  system_id: Some(String::from("a.dtd")),
                  internal_subset: None,
              }) ),
            ( r#"<!DOCTYPE a [<!ELEMENT a EMPTY>]>"#,
              Some(Doctype {
                  root_name: String::from("a"),
                  public_id: None,
                  system_id: None,
                  internal_subset: Some(String::from("<!ELEMENT a EMPTY>")),
              }) ),
            ( r#"<!ELEMENT a EMPTY>"#, None ),
        ];
        for (src, guess) in test_specs.iter() {
            assert_eq!(parse_doctype(src).unwrap(), *guess);
        }
        assert!(parse_doctype("<!DOCTYPE a PUBLIC>").is_err());
    }
}
