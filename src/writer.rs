//! Writing a document tree back to text.
//!
//! The writer walks a node's properties first (in table order), then its
//! child sections depth-first, emitting section headers as absolute dotted
//! paths at increasing indent. Quoting and escaping decisions come from the
//! writer's own [`SyntaxOptions`], which is independent of the options any
//! reader used, so a document can be re-serialized under a different
//! dialect.
//!
//! The writer emits raw (pre-interpolation) values, so `${ref}` tokens
//! survive a round-trip. There is no silent data loss: a value that cannot
//! be represented under the active options fails with
//! [`Error::Unrepresentable`] instead of being truncated.
//!
//! ## Examples
//!
//! ```rust
//! use initree::{parse, Writer, SyntaxOptions};
//!
//! let doc = parse("[server]\nhost = localhost").unwrap();
//! let writer = Writer::new(SyntaxOptions::new()).unwrap();
//! assert_eq!(writer.write(doc.root()).unwrap(), "[server]\nhost = localhost\n");
//! ```

use crate::node::Node;
use crate::options::{Escapes, MultiValues, Quoting, SyntaxOptions};
use crate::{Error, Result};

/// Serializes [`Node`] subtrees to text under one fixed dialect.
pub struct Writer {
    options: SyntaxOptions,
}

impl Writer {
    /// Creates a writer, validating the dialect options first.
    pub fn new(options: SyntaxOptions) -> Result<Writer> {
        options.validate()?;
        Ok(Writer { options })
    }

    /// The dialect this writer was built with.
    #[must_use]
    pub fn options(&self) -> &SyntaxOptions {
        &self.options
    }

    /// Serializes `node` and its subtree. Passing a document root emits
    /// the whole document; passing a section emits that section's header
    /// block and everything below it.
    pub fn write(&self, node: &Node) -> Result<String> {
        let mut out = String::new();
        self.write_node(node, &mut out)?;
        Ok(out)
    }

    /// Serializes into an existing sink. Sink failures surface as
    /// [`Error::Io`].
    pub fn write_to<W: std::fmt::Write>(&self, node: &Node, sink: &mut W) -> Result<()> {
        let text = self.write(node)?;
        sink.write_str(&text)?;
        Ok(())
    }

    fn write_node(&self, node: &Node, out: &mut String) -> Result<()> {
        if !node.is_root() {
            // Blank line between blocks, but never at the start of output.
            if !out.is_empty() {
                out.push('\n');
            }
            self.write_header(node, out)?;
        }
        self.write_properties(node, out)?;
        for (_, siblings) in self.ordered_sections(node) {
            for section in siblings {
                self.write_node(&section, out)?;
            }
        }
        Ok(())
    }

    fn indent_for(&self, node: &Node) -> String {
        self.options
            .indent_unit()
            .repeat(node.path().len().saturating_sub(1))
    }

    fn write_header(&self, node: &Node, out: &mut String) -> Result<()> {
        let components = node
            .path()
            .iter()
            .map(|c| self.encode_component(c))
            .collect::<Result<Vec<_>>>()?;
        out.push_str(&self.indent_for(node));
        out.push('[');
        out.push_str(&components.join(&self.options.path_separator.to_string()));
        out.push_str("]\n");
        Ok(())
    }

    fn write_properties(&self, node: &Node, out: &mut String) -> Result<()> {
        let indent = if node.is_root() {
            String::new()
        } else {
            self.indent_for(node)
        };
        for (key, values) in self.ordered_properties(node) {
            self.check_key(&key)?;
            if values.is_empty() {
                if !self.options.empty_values {
                    return Err(Error::unrepresentable(&format!(
                        "key `{}` has no values and empty values are disabled",
                        key
                    )));
                }
                out.push_str(&indent);
                out.push_str(&key);
                if self.options.empty_value_separator {
                    if self.options.separator_whitespace {
                        out.push(' ');
                    }
                    out.push(self.options.value_separator);
                }
                out.push('\n');
                continue;
            }

            match self.options.multi_values {
                MultiValues::RepeatedKey => {
                    for value in &values {
                        out.push_str(&indent);
                        self.push_assignment(&key, &self.encode_value(value)?, out);
                    }
                }
                MultiValues::Separated => {
                    let tokens = values
                        .iter()
                        .map(|v| self.encode_value(v))
                        .collect::<Result<Vec<_>>>()?;
                    let joiner = if self.options.trim_values {
                        format!("{} ", self.options.multi_value_separator)
                    } else {
                        self.options.multi_value_separator.to_string()
                    };
                    out.push_str(&indent);
                    self.push_assignment(&key, &tokens.join(&joiner), out);
                }
            }
        }
        Ok(())
    }

    fn push_assignment(&self, key: &str, encoded: &str, out: &mut String) {
        out.push_str(key);
        // Padding after the separator is only safe when the reader side
        // trims values again.
        if self.options.separator_whitespace && self.options.trim_values {
            out.push(' ');
            out.push(self.options.value_separator);
            out.push(' ');
        } else {
            out.push(self.options.value_separator);
        }
        out.push_str(encoded);
        out.push('\n');
    }

    /// Keys are emitted verbatim, never quoted; anything the tokenizer
    /// would misread is rejected.
    fn check_key(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::unrepresentable("empty key"));
        }
        if key.starts_with('[') {
            return Err(Error::unrepresentable(&format!(
                "key `{}` would parse as a section header",
                key
            )));
        }
        if key.starts_with(char::is_whitespace) || key.ends_with(char::is_whitespace) {
            return Err(Error::unrepresentable(&format!(
                "key `{}` has surrounding whitespace",
                key
            )));
        }
        let forbidden = [
            self.options.value_separator,
            self.options.comment_char,
            self.options.quote_char,
            '\n',
            '\r',
        ];
        if key.chars().any(|c| forbidden.contains(&c)) {
            return Err(Error::unrepresentable(&format!(
                "key `{}` contains a delimiter character",
                key
            )));
        }
        Ok(())
    }

    fn encode_value(&self, value: &str) -> Result<String> {
        let mut danger = vec![self.options.comment_char];
        if self.options.multi_values == MultiValues::Separated {
            danger.push(self.options.multi_value_separator);
        }
        let triggers = [
            self.options.value_separator,
            self.options.multi_value_separator,
            self.options.comment_char,
            self.options.quote_char,
        ];
        self.encode_token(value, &triggers, &danger, true)
    }

    fn encode_component(&self, component: &str) -> Result<String> {
        if component.contains('[') || component.contains(']') {
            return Err(Error::unrepresentable(&format!(
                "section name `{}` contains brackets",
                component
            )));
        }
        let triggers = [
            self.options.path_separator,
            self.options.comment_char,
            self.options.quote_char,
        ];
        let danger = [self.options.path_separator, self.options.comment_char];
        self.encode_token(component, &triggers, &danger, false)
    }

    /// Renders one token, deciding quoting per the dialect and escaping
    /// what the active escape mode allows. `danger` lists characters the
    /// tokenizer would treat as delimiters when the token ends up
    /// unquoted; if one occurs and can neither be escaped nor quoted away,
    /// the token is unrepresentable.
    fn encode_token(
        &self,
        value: &str,
        quote_triggers: &[char],
        danger: &[char],
        continuation: bool,
    ) -> Result<String> {
        let quoted = match self.options.quoting {
            Quoting::Never => false,
            Quoting::Always => true,
            Quoting::Special => self.special_trigger(value, quote_triggers),
            Quoting::Auto => {
                self.special_trigger(value, quote_triggers)
                    || value.chars().any(char::is_whitespace)
            }
        };
        let active = match self.options.escapes {
            Escapes::Never => false,
            Escapes::Quoted => quoted,
            Escapes::Always => true,
        };

        if !quoted {
            if value.is_empty() {
                return Err(Error::unrepresentable(
                    "empty value requires quoting",
                ));
            }
            // An unescaped trailing backslash would read back as a line
            // continuation.
            if self.options.escapes == Escapes::Quoted && value.ends_with('\\') {
                return Err(Error::unrepresentable(
                    "trailing backslash requires quoting",
                ));
            }
            if self.options.trim_values {
                for edge in [value.chars().next(), value.chars().next_back()] {
                    match edge {
                        Some('\t') if active => {}
                        Some(c) if c.is_whitespace() && c != '\n' => {
                            return Err(Error::unrepresentable(
                                "surrounding whitespace requires quoting",
                            ));
                        }
                        _ => {}
                    }
                }
            }
        }

        let quote = self.options.quote_char;
        let mut out = String::with_capacity(value.len() + 2);
        if quoted {
            out.push(quote);
        }
        let mut chars = value.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if active {
                        out.push_str("\\\\");
                    } else {
                        out.push('\\');
                    }
                }
                '\n' => {
                    if !active {
                        return Err(Error::unrepresentable(
                            "embedded newline requires escaping",
                        ));
                    }
                    out.push_str("\\n");
                    // Physical break; the continuation join re-parses to
                    // the same logical value. Skipped when the value
                    // continues with whitespace the join would strip.
                    if quoted
                        && continuation
                        && chars.peek().map_or(true, |next| !next.is_whitespace())
                    {
                        out.push_str("\\\n");
                        out.push_str(&self.options.indent_unit().repeat(2));
                    }
                }
                '\r' | '\0' | '\u{0008}' | '\u{000C}' => {
                    if !active {
                        return Err(Error::unrepresentable(
                            "control character requires escaping",
                        ));
                    }
                    out.push_str(match c {
                        '\r' => "\\r",
                        '\0' => "\\0",
                        '\u{0008}' => "\\b",
                        _ => "\\f",
                    });
                }
                '\t' => {
                    if !quoted && active {
                        out.push_str("\\t");
                    } else {
                        out.push('\t');
                    }
                }
                c if c == quote => {
                    if active {
                        out.push('\\');
                        out.push(c);
                    } else {
                        return Err(Error::unrepresentable(
                            "quote character requires escaping",
                        ));
                    }
                }
                c if !quoted && danger.contains(&c) => {
                    if active {
                        out.push('\\');
                        out.push(c);
                    } else {
                        return Err(Error::unrepresentable(&format!(
                            "`{}` requires quoting or escaping",
                            c
                        )));
                    }
                }
                c => out.push(c),
            }
        }
        if quoted {
            out.push(quote);
        }
        Ok(out)
    }

    fn special_trigger(&self, value: &str, triggers: &[char]) -> bool {
        value.is_empty()
            || value
                .chars()
                .any(|c| triggers.contains(&c) || c == '\\' || c.is_control())
            || (self.options.trim_values
                && (value.starts_with(char::is_whitespace)
                    || value.ends_with(char::is_whitespace)))
    }

    fn ordered_properties(&self, node: &Node) -> Vec<(String, Vec<String>)> {
        let mut entries: Vec<(String, Vec<String>)> = node.raw_values().into_iter().collect();
        if !self.options.preserve_order {
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        }
        entries
    }

    fn ordered_sections(&self, node: &Node) -> Vec<(String, Vec<Node>)> {
        let mut entries: Vec<(String, Vec<Node>)> = node.sections().into_iter().collect();
        if !self.options.preserve_order {
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Document;
    use crate::reader::Reader;

    fn write(doc: &Document) -> String {
        Writer::new(SyntaxOptions::new())
            .unwrap()
            .write(doc.root())
            .unwrap()
    }

    fn write_with(doc: &Document, options: SyntaxOptions) -> Result<String> {
        Writer::new(options)?.write(doc.root())
    }

    #[test]
    fn empty_document_writes_nothing() {
        assert_eq!(write(&Document::new()), "");
    }

    #[test]
    fn root_properties_then_sections_with_blank_line() {
        let doc = Document::new();
        doc.put("global", "1");
        doc.obtain(&["s"]).put("x", "2");
        assert_eq!(write(&doc), "global = 1\n\n[s]\nx = 2\n");
    }

    #[test]
    fn first_section_starts_the_file_without_blank_line() {
        let doc = Document::new();
        doc.obtain(&["s"]).put("x", "1");
        assert!(write(&doc).starts_with("[s]\n"));
    }

    #[test]
    fn sibling_sections_are_separated_by_blank_lines() {
        let doc = Document::new();
        doc.obtain(&["a"]).put("x", "1");
        doc.obtain(&["b"]).put("y", "2");
        assert_eq!(write(&doc), "[a]\nx = 1\n\n[b]\ny = 2\n");
    }

    #[test]
    fn nested_sections_use_full_paths_and_indent() {
        let doc = Document::new();
        doc.obtain(&["a"]).put("x", "1");
        doc.obtain(&["a", "b"]).put("y", "2");
        assert_eq!(write(&doc), "[a]\nx = 1\n\n  [a.b]\n  y = 2\n");
    }

    #[test]
    fn duplicate_siblings_emit_one_block_each() {
        let doc = Document::new();
        doc.create(&["s"]).put("x", "1");
        doc.create(&["s"]).put("x", "2");
        assert_eq!(write(&doc), "[s]\nx = 1\n\n[s]\nx = 2\n");
    }

    #[test]
    fn separated_values_join_on_one_line() {
        let doc = Document::new();
        doc.put_all("tel", ["123".to_string(), "456".to_string()]);
        assert_eq!(write(&doc), "tel = 123, 456\n");
    }

    #[test]
    fn repeated_key_emits_one_line_per_value() {
        let doc = Document::new();
        doc.put_all("tel", ["123".to_string(), "456".to_string()]);
        let text = write_with(
            &doc,
            SyntaxOptions::new().with_multi_values(MultiValues::RepeatedKey),
        )
        .unwrap();
        assert_eq!(text, "tel = 123\ntel = 456\n");
    }

    #[test]
    fn zero_value_key_emission() {
        let doc = Document::new();
        doc.put_all("flag", std::iter::empty());
        assert_eq!(write(&doc), "flag =\n");
        let bare = write_with(
            &doc,
            SyntaxOptions::new().with_empty_value_separator(false),
        )
        .unwrap();
        assert_eq!(bare, "flag\n");
    }

    #[test]
    fn special_quotes_value_containing_comment_char() {
        let doc = Document::new();
        doc.put("v", "a;b");
        assert_eq!(write(&doc), "v = \"a;b\"\n");
    }

    #[test]
    fn special_leaves_plain_values_unquoted() {
        let doc = Document::new();
        doc.put("v", "plain value");
        assert_eq!(write(&doc), "v = plain value\n");
    }

    #[test]
    fn auto_quotes_on_whitespace() {
        let doc = Document::new();
        doc.put("v", "plain value");
        let text = write_with(&doc, SyntaxOptions::new().with_quoting(Quoting::Auto)).unwrap();
        assert_eq!(text, "v = \"plain value\"\n");
    }

    #[test]
    fn always_quotes_everything() {
        let doc = Document::new();
        doc.put("v", "x");
        let text = write_with(&doc, SyntaxOptions::new().with_quoting(Quoting::Always)).unwrap();
        assert_eq!(text, "v = \"x\"\n");
    }

    #[test]
    fn embedded_newline_renders_as_continuation() {
        let doc = Document::new();
        doc.put("v", "a\nb");
        let text = write(&doc);
        assert_eq!(text, "v = \"a\\n\\\n    b\"\n");
        let back = Reader::new(SyntaxOptions::new())
            .unwrap()
            .parse(&text)
            .unwrap();
        assert_eq!(back.raw("v").as_deref(), Some("a\nb"));
    }

    #[test]
    fn newline_without_escapes_is_unrepresentable() {
        let doc = Document::new();
        doc.put("v", "a\nb");
        let err = write_with(&doc, SyntaxOptions::new().with_escapes(Escapes::Never));
        assert!(matches!(err, Err(Error::Unrepresentable(_))));
    }

    #[test]
    fn separator_in_value_without_quoting_or_escaping_is_unrepresentable() {
        let doc = Document::new();
        doc.put("v", "a,b");
        let err = write_with(
            &doc,
            SyntaxOptions::new()
                .with_quoting(Quoting::Never)
                .with_escapes(Escapes::Never),
        );
        assert!(matches!(err, Err(Error::Unrepresentable(_))));
    }

    #[test]
    fn separator_in_value_escapes_under_always() {
        let doc = Document::new();
        doc.put("v", "a,b");
        let text = write_with(
            &doc,
            SyntaxOptions::new()
                .with_quoting(Quoting::Never)
                .with_escapes(Escapes::Always),
        )
        .unwrap();
        assert_eq!(text, "v = a\\,b\n");
    }

    #[test]
    fn key_with_separator_is_unrepresentable() {
        let doc = Document::new();
        doc.put("bad=key", "v");
        assert!(matches!(
            write_with(&doc, SyntaxOptions::new()),
            Err(Error::Unrepresentable(_))
        ));
    }

    #[test]
    fn lexical_order_when_preserve_order_disabled() {
        let doc = Document::new();
        doc.put("zeta", "1");
        doc.put("alpha", "2");
        let text = write_with(&doc, SyntaxOptions::new().with_preserve_order(false)).unwrap();
        assert_eq!(text, "alpha = 2\nzeta = 1\n");
    }

    #[test]
    fn writes_raw_interpolation_tokens() {
        let doc = Document::new();
        doc.put("base", "/opt");
        doc.put("path", "${base}/bin");
        assert_eq!(write(&doc), "base = /opt\npath = ${base}/bin\n");
    }

    #[test]
    fn subtree_write_emits_the_section_header() {
        let doc = Document::new();
        doc.obtain(&["a", "b"]).put("x", "1");
        let writer = Writer::new(SyntaxOptions::new()).unwrap();
        let text = writer.write(&doc.section(&["a", "b"]).unwrap()).unwrap();
        assert_eq!(text, "  [a.b]\n  x = 1\n");
    }

    #[test]
    fn write_to_appends_to_sink() {
        let doc = Document::new();
        doc.put("k", "v");
        let writer = Writer::new(SyntaxOptions::new()).unwrap();
        let mut sink = String::from("; header\n");
        writer.write_to(doc.root(), &mut sink).unwrap();
        assert_eq!(sink, "; header\nk = v\n");
    }
}
