//! Reading text into a document tree.
//!
//! The reader is line-oriented and single-pass. Each physical line is first
//! joined with its continuations (a trailing unescaped backslash), then
//! stripped of comments outside quotes, and finally classified as a section
//! header, a key/value line, or a bare key. Section headers carry absolute
//! dotted paths; there is no relative section syntax.
//!
//! Every interacting dialect option (quoting, escaping, duplicate policy,
//! multi-value encoding, case folding) comes from the [`SyntaxOptions`]
//! the reader was built with. The whole input is parsed into memory; a
//! failure on any line aborts the parse.
//!
//! ## Examples
//!
//! ```rust
//! use initree::{Reader, SyntaxOptions};
//!
//! let reader = Reader::new(SyntaxOptions::new()).unwrap();
//! let doc = reader.parse("[server]\nhost = localhost\nport = 8080").unwrap();
//! let server = doc.section(&["server"]).unwrap();
//! assert_eq!(server.raw("port").as_deref(), Some("8080"));
//! ```

use crate::node::{Document, Node};
use crate::options::{DuplicateKeys, DuplicateSections, Escapes, MultiValues, SyntaxOptions};
use crate::{Error, Result};

/// Parses text into [`Document`] trees under one fixed dialect.
pub struct Reader {
    options: SyntaxOptions,
}

impl Reader {
    /// Creates a reader, validating the dialect options first.
    pub fn new(options: SyntaxOptions) -> Result<Reader> {
        options.validate()?;
        Ok(Reader { options })
    }

    /// The dialect this reader was built with.
    #[must_use]
    pub fn options(&self) -> &SyntaxOptions {
        &self.options
    }

    /// Parses a complete document. An empty input yields an empty root.
    pub fn parse(&self, text: &str) -> Result<Document> {
        let document = Document::with_case_sensitive(self.options.case_sensitive);
        let mut current: Node = document.root().clone();
        let mut seen_header = false;

        let mut lines = text.lines().enumerate();
        while let Some((index, first)) = lines.next() {
            let line_no = index + 1;
            let mut logical = first.to_string();
            if self.options.escapes != Escapes::Never {
                // Join continuation lines; their leading indent is cosmetic.
                while ends_with_unescaped_backslash(&logical) {
                    logical.pop();
                    match lines.next() {
                        Some((_, next)) => logical.push_str(next.trim_start()),
                        None => break,
                    }
                }
            }

            // Leading indent is always cosmetic; trailing whitespace
            // belongs to the value when trimming is disabled.
            let stripped = self.strip_comment(&logical);
            let line = stripped.trim_start();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('[') {
                current = self.read_header(document.root(), line.trim_end(), line_no)?;
                seen_header = true;
            } else {
                if current.is_root() && !seen_header && !self.options.global_section {
                    return Err(Error::structure(
                        line_no,
                        1,
                        "property before any section header",
                    ));
                }
                self.read_property(&current, line, line_no)?;
            }
        }
        Ok(document)
    }

    /// Cuts the line at the first comment character outside quotes.
    fn strip_comment<'a>(&self, line: &'a str) -> &'a str {
        let track_escapes = self.options.escapes != Escapes::Never;
        let mut in_quote = false;
        let mut escaped = false;
        for (pos, c) in line.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            if track_escapes && c == '\\' {
                escaped = true;
            } else if c == self.options.quote_char {
                in_quote = !in_quote;
            } else if c == self.options.comment_char && !in_quote {
                return &line[..pos];
            }
        }
        line
    }

    /// Parses `[a.b.c]` and resolves the path from the root. Intermediate
    /// components navigate to the most recently created same-key sibling
    /// (creating one when missing); the duplicate-section policy applies
    /// to the final component, which names the section the header opens.
    fn read_header(&self, root: &Node, line: &str, line_no: usize) -> Result<Node> {
        let Some(inner) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else {
            return Err(Error::structure(line_no, 1, "unbalanced section header"));
        };
        if inner.contains('[') || inner.contains(']') {
            return Err(Error::structure(line_no, 1, "nested brackets in section header"));
        }

        let mut components = Vec::new();
        for piece in self.split_outside_quotes(inner, self.options.path_separator) {
            let piece = piece.trim();
            if piece.is_empty() {
                return Err(Error::structure(line_no, 1, "empty section path component"));
            }
            components.push(self.decode_value(piece, line_no)?);
        }
        if components.is_empty() {
            return Err(Error::structure(line_no, 1, "empty section path"));
        }

        let mut current = root.clone();
        let (last, ancestors) = components.split_last().expect("non-empty path");
        for component in ancestors {
            current = match current.all_sections(component).into_iter().next_back() {
                Some(node) => node,
                None => current.add_section(component),
            };
        }
        let existing = current.all_sections(last);
        let node = match self.options.duplicate_sections {
            DuplicateSections::Merge => match existing.into_iter().next_back() {
                Some(node) => node,
                None => current.add_section(last),
            },
            DuplicateSections::Replace => match existing.into_iter().next_back() {
                Some(node) => {
                    node.clear();
                    node
                }
                None => current.add_section(last),
            },
            DuplicateSections::Append => current.add_section(last),
            DuplicateSections::Deny => {
                if existing.is_empty() {
                    current.add_section(last)
                } else {
                    let mut path = current.path();
                    path.push(last.clone());
                    return Err(Error::duplicate_section(line_no, &path.join(".")));
                }
            }
        };
        Ok(node)
    }

    /// Parses one key/value (or bare-key) line into `node`.
    fn read_property(&self, node: &Node, line: &str, line_no: usize) -> Result<()> {
        let (key, value_text) = match self.find_separator(line) {
            Some(pos) => {
                let key = line[..pos].trim_end();
                let rest = &line[pos + self.options.value_separator.len_utf8()..];
                (key, Some(rest))
            }
            None => {
                if !self.options.empty_values {
                    return Err(Error::structure(line_no, 1, "missing value separator"));
                }
                (line.trim_end(), None)
            }
        };
        if key.is_empty() {
            return Err(Error::structure(line_no, 1, "empty key"));
        }

        let values = match value_text {
            None => Vec::new(),
            Some(text) => {
                let text = if self.options.trim_values {
                    text.trim()
                } else {
                    text
                };
                if text.is_empty() {
                    if !self.options.empty_values {
                        return Err(Error::structure(line_no, 1, "empty value not allowed"));
                    }
                    Vec::new()
                } else {
                    match self.options.multi_values {
                        MultiValues::Separated => {
                            let mut out = Vec::new();
                            for segment in
                                self.split_outside_quotes(text, self.options.multi_value_separator)
                            {
                                let segment = if self.options.trim_values {
                                    segment.trim()
                                } else {
                                    segment
                                };
                                out.push(self.decode_value(segment, line_no)?);
                            }
                            out
                        }
                        MultiValues::RepeatedKey => vec![self.decode_value(text, line_no)?],
                    }
                }
            }
        };

        self.apply_values(node, key, values, line_no)
    }

    /// Applies the duplicate-key policy. In repeated-key encoding a second
    /// occurrence is the multi-value mechanism itself, so `Replace`
    /// accumulates instead of overwriting; `Ignore` and `Deny` keep their
    /// meaning.
    fn apply_values(
        &self,
        node: &Node,
        key: &str,
        values: Vec<String>,
        line_no: usize,
    ) -> Result<()> {
        let exists = node.contains_key(key);
        if !exists {
            node.put_all(key, values);
            return Ok(());
        }
        let accumulate = self.options.multi_values == MultiValues::RepeatedKey;
        match self.options.duplicate_keys {
            DuplicateKeys::Replace if accumulate => {
                for value in values {
                    node.add(key, &value);
                }
            }
            DuplicateKeys::Replace => node.put_all(key, values),
            DuplicateKeys::Append => {
                for value in values {
                    node.add(key, &value);
                }
            }
            DuplicateKeys::Ignore => {}
            DuplicateKeys::Deny => return Err(Error::duplicate_key(line_no, key)),
        }
        Ok(())
    }

    /// Finds the first value separator outside quotes, escape-aware.
    fn find_separator(&self, line: &str) -> Option<usize> {
        let track_escapes = self.options.escapes != Escapes::Never;
        let mut in_quote = false;
        let mut escaped = false;
        for (pos, c) in line.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            if track_escapes && c == '\\' {
                escaped = true;
            } else if c == self.options.quote_char {
                in_quote = !in_quote;
            } else if c == self.options.value_separator && !in_quote {
                return Some(pos);
            }
        }
        None
    }

    /// Splits on a delimiter, skipping occurrences inside quotes or after
    /// a backslash.
    fn split_outside_quotes<'a>(&self, text: &'a str, delimiter: char) -> Vec<&'a str> {
        let track_escapes = self.options.escapes != Escapes::Never;
        let mut parts = Vec::new();
        let mut start = 0;
        let mut in_quote = false;
        let mut escaped = false;
        for (pos, c) in text.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            if track_escapes && c == '\\' {
                escaped = true;
            } else if c == self.options.quote_char {
                in_quote = !in_quote;
            } else if c == delimiter && !in_quote {
                parts.push(&text[start..pos]);
                start = pos + c.len_utf8();
            }
        }
        parts.push(&text[start..]);
        parts
    }

    /// Strips quote delimiters and decodes escapes per the dialect.
    fn decode_value(&self, text: &str, line_no: usize) -> Result<String> {
        let (inner, quoted) = self.unquote(text, line_no)?;
        let interpret = match self.options.escapes {
            Escapes::Never => false,
            Escapes::Quoted => quoted,
            Escapes::Always => true,
        };
        if interpret {
            self.unescape(inner, line_no)
        } else {
            Ok(inner.to_string())
        }
    }

    /// If `text` is quote-delimited, returns the interior and `true`.
    /// Text after the closing quote, or a quote that never closes, is a
    /// [`Error::Quote`].
    fn unquote<'a>(&self, text: &'a str, line_no: usize) -> Result<(&'a str, bool)> {
        let quote = self.options.quote_char;
        if !text.starts_with(quote) {
            return Ok((text, false));
        }
        let track_escapes = self.options.escapes != Escapes::Never;
        let body = &text[quote.len_utf8()..];
        let mut escaped = false;
        for (pos, c) in body.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            if track_escapes && c == '\\' {
                escaped = true;
            } else if c == quote {
                let end = pos + c.len_utf8();
                if end != body.len() {
                    return Err(Error::quote(
                        line_no,
                        end + 1,
                        "text after closing quote",
                    ));
                }
                return Ok((&body[..pos], true));
            }
        }
        Err(Error::quote(line_no, 1, "unterminated quoted value"))
    }

    /// Decodes backslash sequences. `\$` is kept intact so the
    /// interpolation layer can distinguish a suppressed reference.
    fn unescape(&self, text: &str, line_no: usize) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.char_indices().peekable();
        while let Some((pos, c)) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            let Some((_, next)) = chars.next() else {
                return Err(Error::escape(line_no, pos + 1, "\\"));
            };
            match next {
                '\\' => out.push('\\'),
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                '0' => out.push('\0'),
                'b' => out.push('\u{0008}'),
                'f' => out.push('\u{000C}'),
                '$' => out.push_str("\\$"),
                'u' => {
                    let mut hex = String::new();
                    for _ in 0..4 {
                        match chars.next() {
                            Some((_, h)) if h.is_ascii_hexdigit() => hex.push(h),
                            _ => return Err(Error::escape(line_no, pos + 1, "\\u")),
                        }
                    }
                    let code = u32::from_str_radix(&hex, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| Error::escape(line_no, pos + 1, &format!("\\u{}", hex)))?;
                    out.push(code);
                }
                other
                    if other == self.options.quote_char
                        || other == self.options.value_separator
                        || other == self.options.multi_value_separator
                        || other == self.options.comment_char
                        || other == self.options.path_separator =>
                {
                    out.push(other)
                }
                other => {
                    return Err(Error::escape(line_no, pos + 1, &format!("\\{}", other)));
                }
            }
        }
        Ok(out)
    }
}

/// True when the line ends with an odd run of backslashes, i.e. an
/// unescaped continuation marker.
fn ends_with_unescaped_backslash(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}
