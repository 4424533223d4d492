//
// apon/writer.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt::{self, Write};

use crate::apon::parameters::{ParameterValue, Parameters};

// =====================================================================
/// Writes Parameters as APON text.
///
/// ```
/// use aspectran::apon::{AponWriter, Parameters};
/// let mut inner = Parameters::new();
/// inner.put("result1", "value1");
/// inner.put("result2", "value2");
/// let mut params = Parameters::new();
/// params.put("action1", inner);
/// assert_eq!(AponWriter::new().to_text(&params),
///     "action1: {\n  result1: value1\n  result2: value2\n}\n");
/// ```
///
#[derive(Debug, Clone)]
pub struct AponWriter {
    pretty: bool,
    indent: String,
    null_writable: bool,
}

impl Default for AponWriter {
    fn default() -> AponWriter {
        return AponWriter {
            pretty: true,
            indent: String::from("  "),
            null_writable: true,
        };
    }
}

impl AponWriter {
    pub fn new() -> AponWriter {
        return AponWriter::default();
    }

    pub fn pretty(mut self, pretty: bool) -> AponWriter {
        self.pretty = pretty;
        return self;
    }

    pub fn indent_size(mut self, size: usize) -> AponWriter {
        self.indent = " ".repeat(size);
        return self;
    }

    pub fn null_writable(mut self, null_writable: bool) -> AponWriter {
        self.null_writable = null_writable;
        return self;
    }

    pub fn to_text(&self, params: &Parameters) -> String {
        let mut s = String::new();
        // Writing into a String cannot fail.
        let _ = self.write(params, &mut s);
        return s;
    }

    // -----------------------------------------------------------------
    //
    pub fn write<W: Write>(&self, params: &Parameters, out: &mut W) -> fmt::Result {
        return self.write_entries(params, 0, out);
    }

    fn write_entries<W: Write>(&self, params: &Parameters, depth: usize, out: &mut W) -> fmt::Result {
        for (name, value) in params.iter() {
            if *value == ParameterValue::Null && ! self.null_writable {
                continue;
            }
            self.write_indent(depth, out)?;
            out.write_str(name)?;
            out.write_str(": ")?;
            self.write_value(value, depth, out)?;
        }
        return Ok(());
    }

    // -----------------------------------------------------------------
    // Writes the value and the line break that ends it.
    //
    fn write_value<W: Write>(&self, value: &ParameterValue, depth: usize, out: &mut W) -> fmt::Result {
        match value {
            ParameterValue::Null => out.write_str("null\n")?,
            ParameterValue::Bool(b) => writeln!(out, "{}", b)?,
            ParameterValue::Int(i) => writeln!(out, "{}", i)?,
            ParameterValue::Float(f) => writeln!(out, "{}", f)?,
            ParameterValue::Str(s) => {
                if s.contains('\n') {
                    self.write_text(s, depth, out)?;
                } else {
                    writeln!(out, "{}", quote_if_needed(s))?;
                }
            },
            ParameterValue::Text(s) => self.write_text(s, depth, out)?,
            ParameterValue::Params(p) => {
                out.write_str("{\n")?;
                self.write_entries(p, depth + 1, out)?;
                self.write_indent(depth, out)?;
                out.write_str("}\n")?;
            },
            ParameterValue::Array(a) => {
                out.write_str("[\n")?;
                for item in a.iter() {
                    if *item == ParameterValue::Null && ! self.null_writable {
                        continue;
                    }
                    self.write_indent(depth + 1, out)?;
                    self.write_value(item, depth + 1, out)?;
                }
                self.write_indent(depth, out)?;
                out.write_str("]\n")?;
            },
        }
        return Ok(());
    }

    fn write_text<W: Write>(&self, text: &str, depth: usize, out: &mut W) -> fmt::Result {
        out.write_str("(\n")?;
        for line in text.split('\n') {
            self.write_indent(depth + 1, out)?;
            out.write_char('|')?;
            out.write_str(line)?;
            out.write_char('\n')?;
        }
        self.write_indent(depth, out)?;
        out.write_str(")\n")?;
        return Ok(());
    }

    fn write_indent<W: Write>(&self, depth: usize, out: &mut W) -> fmt::Result {
        if self.pretty {
            for _ in 0..depth {
                out.write_str(&self.indent)?;
            }
        }
        return Ok(());
    }
}

// ---------------------------------------------------------------------
// A string is quoted when reading it back unquoted would change it.
//
fn quote_if_needed(s: &str) -> String {
    let needs_quote = s.is_empty()
        || s.starts_with(char::is_whitespace)
        || s.ends_with(char::is_whitespace)
        || s.contains(|c| c == '"' || c == '\'' || c == '\t' || c == '\r')
        || s.starts_with(|c| c == '{' || c == '[' || c == '(' || c == '#')
        || s == "null" || s == "true" || s == "false"
        || s.parse::<f64>().is_ok();
    if ! needs_quote {
        return String::from(s);
    }
    let mut q = String::with_capacity(s.len() + 2);
    q.push('"');
    for ch in s.chars() {
        match ch {
            '"' => q += "\\\"",
            '\\' => q += "\\\\",
            '\t' => q += "\\t",
            '\r' => q += "\\r",
            '\n' => q += "\\n",
            _ => q.push(ch),
        }
    }
    q.push('"');
    return q;
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_scalars() {
        let test_specs = [
            ( ParameterValue::Str(String::from("value")), "v: value\n" ),
            ( ParameterValue::Str(String::from("")), "v: \"\"\n" ),
            ( ParameterValue::Str(String::from(" pad")), "v: \" pad\"\n" ),
            ( ParameterValue::Str(String::from("say \"hi\"")), "v: \"say \\\"hi\\\"\"\n" ),
            ( ParameterValue::Str(String::from("123")), "v: \"123\"\n" ),
            ( ParameterValue::Int(123), "v: 123\n" ),
            ( ParameterValue::Float(1.5), "v: 1.5\n" ),
            ( ParameterValue::Bool(false), "v: false\n" ),
            ( ParameterValue::Null, "v: null\n" ),
        ];
        for (value, guess) in test_specs.iter() {
            let mut params = Parameters::new();
            params.put("v", value.clone());
            assert_eq!(AponWriter::new().to_text(&params), *guess);
        }
    }

    #[test]
    fn test_blocks() {
        let mut row = Parameters::new();
        row.put("id", ParameterValue::Int(1));
        let mut params = Parameters::new();
        params.put("rows", ParameterValue::Array(vec![
            ParameterValue::Params(row),
            ParameterValue::Str(String::from("x")),
        ]));
        params.put("text", ParameterValue::Text(String::from("line1\nline2")));
        params.put("none", ParameterValue::Null);

        let guess = "rows: [\n  {\n    id: 1\n  }\n  x\n]\ntext: (\n  |line1\n  |line2\n)\nnone: null\n";
        assert_eq!(AponWriter::new().to_text(&params), guess);

        let guess = "rows: [\n{\nid: 1\n}\nx\n]\ntext: (\n|line1\n|line2\n)\n";
        assert_eq!(AponWriter::new().pretty(false).null_writable(false).to_text(&params), guess);
    }
}
