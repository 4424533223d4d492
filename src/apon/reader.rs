//
// apon/reader.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use crate::apon::parameters::{ParameterValue, Parameters};
use crate::error::AponError;

// =====================================================================
/// Reads APON text into Parameters.
///
/// Syntax, one entry per line:
///
/// - `name: value` where value is a scalar, `null`, `true`/`false`, a
///   number or a (possibly double-quoted) string;
/// - `name: {` ... `}` for a nested block;
/// - `name: [` ... `]` for an array, one value or `{` block per line;
/// - `name: (` ... `)` for text, each line prefixed by `|`;
/// - lines starting with `#` are comments.
///
pub struct AponReader<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> AponReader<'a> {

    pub fn parse(text: &'a str) -> Result<Parameters, AponError> {
        let mut reader = AponReader {
            lines: text.lines().collect(),
            pos: 0,
        };
        return reader.read_block(false);
    }

    // -----------------------------------------------------------------
    //
    fn read_block(&mut self, nested: bool) -> Result<Parameters, AponError> {
        let mut params = Parameters::new();
        while let Some(line) = self.next_line() {
            if line == "}" {
                if nested {
                    return Ok(params);
                }
                return Err(self.error("unexpected '}'"));
            }
            let (name, rest) = match line.split_once(':') {
                Some((n, r)) => (n.trim(), r.trim()),
                None => return Err(self.error(&format!("expected 'name: value', found '{}'", line))),
            };
            if name.is_empty() {
                return Err(self.error("empty name"));
            }
            let value = self.read_value(rest)?;
            params.put(name, value);
        }
        if nested {
            return Err(self.error("missing '}'"));
        }
        return Ok(params);
    }

    // -----------------------------------------------------------------
    //
    fn read_value(&mut self, rest: &str) -> Result<ParameterValue, AponError> {
        return match rest {
            "{" => Ok(ParameterValue::Params(self.read_block(true)?)),
            "{}" => Ok(ParameterValue::Params(Parameters::new())),
            "[" => Ok(ParameterValue::Array(self.read_array()?)),
            "[]" => Ok(ParameterValue::Array(vec!{})),
            "(" => Ok(ParameterValue::Text(self.read_text()?)),
            _ => self.read_scalar(rest),
        };
    }

    fn read_array(&mut self) -> Result<Vec<ParameterValue>, AponError> {
        let mut values: Vec<ParameterValue> = vec!{};
        while let Some(line) = self.next_line() {
            if line == "]" {
                return Ok(values);
            }
            values.push(self.read_value(line)?);
        }
        return Err(self.error("missing ']'"));
    }

    fn read_text(&mut self) -> Result<String, AponError> {
        let mut lines: Vec<&str> = vec!{};
        while self.pos < self.lines.len() {
            let raw = self.lines[self.pos];
            self.pos += 1;
            let line = raw.trim_start();
            if line.trim_end() == ")" {
                return Ok(lines.join("\n"));
            }
            match line.strip_prefix('|') {
                Some(content) => lines.push(content),
                None => return Err(self.error("text line must start with '|'")),
            }
        }
        return Err(self.error("missing ')'"));
    }

    fn read_scalar(&self, s: &str) -> Result<ParameterValue, AponError> {
        if s.starts_with('"') {
            if s.len() < 2 || ! s.ends_with('"') {
                return Err(self.error("unterminated quoted string"));
            }
            return Ok(ParameterValue::Str(unescape(&s[1..s.len()-1])));
        }
        return Ok(match s {
            "null" => ParameterValue::Null,
            "true" => ParameterValue::Bool(true),
            "false" => ParameterValue::Bool(false),
            _ => {
                if let Ok(i) = s.parse::<i64>() {
                    ParameterValue::Int(i)
                } else if s.contains(|c: char| c == '.' || c == 'e' || c == 'E')
                        && s.starts_with(|c: char| c.is_ascii_digit() || c == '-')
                        && s.parse::<f64>().is_ok() {
                    ParameterValue::Float(s.parse::<f64>().unwrap_or_default())
                } else {
                    ParameterValue::Str(String::from(s))
                }
            },
        });
    }

    // -----------------------------------------------------------------
    // Next non-blank, non-comment line, trimmed.
    //
    fn next_line(&mut self) -> Option<&'a str> {
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos].trim();
            self.pos += 1;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(line);
        }
        return None;
    }

    fn error(&self, message: &str) -> AponError {
        return AponError {
            line: self.pos,
            message: String::from(message),
        };
    }
}

// ---------------------------------------------------------------------
//
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(c) => out.push(c),
            None => out.push('\\'),
        }
    }
    return out;
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use crate::apon::AponWriter;

    #[test]
    fn test_parse() {
        let text = r#"
            # settings
            transletNamePattern: /example/*.do
            pointcutPatternVerifiable: false
            retries: 3
            ratio: 0.5
            quoted: " padded "
            empty: ""
            none: null
            nested: {
                a: 1
                b: {
                    c: x
                }
            }
            list: [
                one
                {
                    id: 2
                }
            ]
            text: (
                |line one
                |  line two
            )
        "#;
        let params = AponReader::parse(text).unwrap();
        assert_eq!(params.get_str("transletNamePattern"), Some("/example/*.do"));
        assert_eq!(params.get_bool("pointcutPatternVerifiable"), Some(false));
        assert_eq!(params.get_int("retries"), Some(3));
        assert_eq!(params.get("ratio"), Some(&ParameterValue::Float(0.5)));
        assert_eq!(params.get_str("quoted"), Some(" padded "));
        assert_eq!(params.get_str("empty"), Some(""));
        assert_eq!(params.get("none"), Some(&ParameterValue::Null));
        let nested = params.get_params("nested").unwrap();
        assert_eq!(nested.get_params("b").unwrap().get_str("c"), Some("x"));
        match params.get("list") {
            Some(ParameterValue::Array(items)) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0], ParameterValue::Str(String::from("one")));
            },
            other => panic!("{:?}", other),
        }
        assert_eq!(params.get_str("text"), Some("line one\n  line two"));
    }

    #[test]
    fn test_errors() {
        let test_specs = [
            ( "a: {\n  b: 1\n", "APON syntax error at line 2: missing '}'" ),
            ( "}", "APON syntax error at line 1: unexpected '}'" ),
            ( "novalue", "APON syntax error at line 1: expected 'name: value', found 'novalue'" ),
            ( "t: (\n  x\n)", "APON syntax error at line 2: text line must start with '|'" ),
            ( "q: \"open", "APON syntax error at line 1: unterminated quoted string" ),
        ];
        for (src, guess) in test_specs.iter() {
            assert_eq!(AponReader::parse(src).unwrap_err().to_string(), *guess);
        }
    }

    #[test]
    fn test_written_text_reads_back() {
        let text = "name: \"123\"\nblock: {\n  say: \"a \\\"b\\\"\"\n}\nbody: (\n  |x\n  |y\n)\n";
        let params = AponReader::parse(text).unwrap();
        assert_eq!(params.get_str("name"), Some("123"));
        assert_eq!(params.get_params("block").unwrap().get_str("say"), Some("a \"b\""));
        assert_eq!(AponWriter::new().to_text(&params), text);
    }
}
