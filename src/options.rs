//! Dialect options shared by the reader and the writer.
//!
//! This module provides [`SyntaxOptions`], the immutable description of an
//! INI dialect: which characters delimit keys, values and comments, how
//! duplicates are treated, how multi-valued properties are encoded, and how
//! quoting and escaping behave.
//!
//! A reader and a writer each take their own [`SyntaxOptions`] instance, so
//! a document can be read under one dialect and written under another.
//!
//! ## Examples
//!
//! ```rust
//! use initree::{SyntaxOptions, DuplicateKeys, MultiValues};
//!
//! // The defaults: `=` separator, `,` multi-value separator, `;` comments,
//! // `.` paths, `"` quotes, case-insensitive, order-preserving.
//! let options = SyntaxOptions::new();
//!
//! // A stricter dialect.
//! let options = SyntaxOptions::new()
//!     .with_value_separator(':')
//!     .with_comment_char('#')
//!     .with_duplicate_keys(DuplicateKeys::Deny)
//!     .with_multi_values(MultiValues::RepeatedKey)
//!     .with_case_sensitive(true);
//! assert!(options.validate().is_ok());
//! ```

use crate::{Error, Result};

/// What happens when the same property key is seen twice at one scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DuplicateKeys {
    /// The new value list overwrites the existing one.
    #[default]
    Replace,
    /// The new values are appended to the existing list.
    Append,
    /// The new occurrence is dropped silently.
    Ignore,
    /// The parse fails with [`Error::DuplicateKey`].
    Deny,
}

/// What happens when a section path component resolves to an existing
/// section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DuplicateSections {
    /// The existing section is cleared and reused.
    Replace,
    /// New content is added into the existing section.
    #[default]
    Merge,
    /// A new same-key sibling is created with the next free index.
    Append,
    /// The parse fails with [`Error::DuplicateSection`].
    Deny,
}

/// How a multi-valued property is encoded in text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MultiValues {
    /// One line, values joined by the multi-value separator.
    #[default]
    Separated,
    /// One line per value, the key repeated.
    RepeatedKey,
}

/// When backslash escape sequences are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Escapes {
    /// Backslashes are literal text.
    Never,
    /// Escapes apply only inside quoted values.
    #[default]
    Quoted,
    /// Escapes apply everywhere.
    Always,
}

/// When the writer wraps a value in quote characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Quoting {
    /// Never quote; rely on escaping alone.
    Never,
    /// Quote every value.
    Always,
    /// Quote when the value contains a delimiter, the comment character,
    /// the quote character, a control character, or edge whitespace that
    /// trimming would otherwise eat.
    #[default]
    Special,
    /// Like `Special`, and additionally quote on any whitespace.
    Auto,
}

/// An immutable set of dialect options for one reader or writer instance.
///
/// Constructed only through the builder methods; there is no way to mutate
/// the options of a live reader or writer.
///
/// # Examples
///
/// ```rust
/// use initree::SyntaxOptions;
///
/// let options = SyntaxOptions::new().with_indent(4).with_comment_char('#');
/// assert_eq!(options.indent, 4);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SyntaxOptions {
    /// Character between key and value.
    pub value_separator: char,
    /// Character between scalars of a multi-valued property
    /// ([`MultiValues::Separated`] only).
    pub multi_value_separator: char,
    /// Character starting a comment outside quotes.
    pub comment_char: char,
    /// Character between section path components inside `[...]`.
    pub path_separator: char,
    /// Character delimiting quoted values.
    pub quote_char: char,
    /// Whether key and section-name comparison is case sensitive. Stored
    /// text always preserves original casing.
    pub case_sensitive: bool,
    /// Whether the writer emits properties and sections in insertion
    /// order. When `false` they are emitted in lexical key order.
    pub preserve_order: bool,
    pub duplicate_keys: DuplicateKeys,
    pub duplicate_sections: DuplicateSections,
    pub multi_values: MultiValues,
    pub escapes: Escapes,
    /// Writer-only quoting decision.
    pub quoting: Quoting,
    /// Whether properties may appear before the first section header.
    pub global_section: bool,
    /// Whether values are trimmed of surrounding whitespace.
    pub trim_values: bool,
    /// Whether keys without any value are legal.
    pub empty_values: bool,
    /// Writer-only: whether a zero-value key gets a trailing separator.
    pub empty_value_separator: bool,
    /// Writer-only: whether the value separator is padded with spaces.
    pub separator_whitespace: bool,
    /// Writer-only: indent width per nesting level.
    pub indent: usize,
    /// Writer-only: indent character.
    pub indent_char: char,
}

impl Default for SyntaxOptions {
    fn default() -> Self {
        SyntaxOptions {
            value_separator: '=',
            multi_value_separator: ',',
            comment_char: ';',
            path_separator: '.',
            quote_char: '"',
            case_sensitive: false,
            preserve_order: true,
            duplicate_keys: DuplicateKeys::default(),
            duplicate_sections: DuplicateSections::default(),
            multi_values: MultiValues::default(),
            escapes: Escapes::default(),
            quoting: Quoting::default(),
            global_section: true,
            trim_values: true,
            empty_values: true,
            empty_value_separator: true,
            separator_whitespace: true,
            indent: 2,
            indent_char: ' ',
        }
    }
}

impl SyntaxOptions {
    /// Creates the default dialect (see module docs for the full table).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key/value separator character. Default `=`.
    #[must_use]
    pub fn with_value_separator(mut self, c: char) -> Self {
        self.value_separator = c;
        self
    }

    /// Sets the multi-value separator character. Default `,`.
    #[must_use]
    pub fn with_multi_value_separator(mut self, c: char) -> Self {
        self.multi_value_separator = c;
        self
    }

    /// Sets the comment character. Default `;`.
    #[must_use]
    pub fn with_comment_char(mut self, c: char) -> Self {
        self.comment_char = c;
        self
    }

    /// Sets the section path separator. Default `.`.
    #[must_use]
    pub fn with_path_separator(mut self, c: char) -> Self {
        self.path_separator = c;
        self
    }

    /// Sets the quote character. Default `"`.
    #[must_use]
    pub fn with_quote_char(mut self, c: char) -> Self {
        self.quote_char = c;
        self
    }

    /// Sets key/section-name comparison case sensitivity. Default `false`.
    #[must_use]
    pub fn with_case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    /// Sets whether output follows insertion order (`true`, the default)
    /// or lexical key order.
    #[must_use]
    pub fn with_preserve_order(mut self, yes: bool) -> Self {
        self.preserve_order = yes;
        self
    }

    /// Sets the duplicate-key policy. Default [`DuplicateKeys::Replace`].
    #[must_use]
    pub fn with_duplicate_keys(mut self, mode: DuplicateKeys) -> Self {
        self.duplicate_keys = mode;
        self
    }

    /// Sets the duplicate-section policy. Default
    /// [`DuplicateSections::Merge`].
    #[must_use]
    pub fn with_duplicate_sections(mut self, mode: DuplicateSections) -> Self {
        self.duplicate_sections = mode;
        self
    }

    /// Sets the multi-value encoding. Default [`MultiValues::Separated`].
    #[must_use]
    pub fn with_multi_values(mut self, mode: MultiValues) -> Self {
        self.multi_values = mode;
        self
    }

    /// Sets the escape policy. Default [`Escapes::Quoted`].
    #[must_use]
    pub fn with_escapes(mut self, mode: Escapes) -> Self {
        self.escapes = mode;
        self
    }

    /// Sets the writer quoting policy. Default [`Quoting::Special`].
    #[must_use]
    pub fn with_quoting(mut self, mode: Quoting) -> Self {
        self.quoting = mode;
        self
    }

    /// Allows or forbids properties before the first section header.
    /// Default `true`.
    #[must_use]
    pub fn with_global_section(mut self, yes: bool) -> Self {
        self.global_section = yes;
        self
    }

    /// Enables or disables value trimming. Default `true`.
    #[must_use]
    pub fn with_trim_values(mut self, yes: bool) -> Self {
        self.trim_values = yes;
        self
    }

    /// Allows or forbids zero-value keys. Default `true`.
    #[must_use]
    pub fn with_empty_values(mut self, yes: bool) -> Self {
        self.empty_values = yes;
        self
    }

    /// Writer: emit `key =` (true) or bare `key` (false) for zero-value
    /// keys. Default `true`.
    #[must_use]
    pub fn with_empty_value_separator(mut self, yes: bool) -> Self {
        self.empty_value_separator = yes;
        self
    }

    /// Writer: pad the value separator with spaces. Default `true`.
    #[must_use]
    pub fn with_separator_whitespace(mut self, yes: bool) -> Self {
        self.separator_whitespace = yes;
        self
    }

    /// Writer: indent width per nesting level. Default `2`.
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Writer: indent character. Default space.
    #[must_use]
    pub fn with_indent_char(mut self, c: char) -> Self {
        self.indent_char = c;
        self
    }

    /// Checks that the delimiter characters are pairwise distinct and that
    /// none of them collides with the quote character.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use initree::SyntaxOptions;
    ///
    /// assert!(SyntaxOptions::new().validate().is_ok());
    /// assert!(SyntaxOptions::new().with_quote_char(',').validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        let delimiters = [
            ("value separator", self.value_separator),
            ("multi-value separator", self.multi_value_separator),
            ("comment character", self.comment_char),
            ("path separator", self.path_separator),
        ];
        for (i, (name_a, a)) in delimiters.iter().enumerate() {
            if *a == self.quote_char {
                return Err(Error::InvalidOptions(format!(
                    "{} `{}` collides with the quote character",
                    name_a, a
                )));
            }
            for (name_b, b) in delimiters.iter().skip(i + 1) {
                if a == b {
                    return Err(Error::InvalidOptions(format!(
                        "{} and {} are both `{}`",
                        name_a, name_b, a
                    )));
                }
            }
        }
        if self.quote_char == '\\' || delimiters.iter().any(|(_, c)| *c == '\\') {
            return Err(Error::InvalidOptions(
                "backslash is reserved for escapes".to_string(),
            ));
        }
        Ok(())
    }

    /// The writer's indent string for one nesting level.
    pub(crate) fn indent_unit(&self) -> String {
        std::iter::repeat(self.indent_char).take(self.indent).collect()
    }
}
