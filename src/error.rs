//! Error types for reading and writing INI documents.
//!
//! ## Error Categories
//!
//! - **Structure errors**: malformed section headers, misplaced global
//!   properties, lines with no key/value separator
//! - **Policy errors**: duplicate keys or sections under a `Deny` policy
//! - **Quote/escape errors**: unterminated quotes, unknown escape sequences
//! - **Interpolation errors**: unresolved or cyclic `${ref}` references
//!
//! All parse errors carry the line and column of the offending input. A
//! parse error is fatal to the whole `parse` call; there is no
//! partial-document recovery. Interpolation errors surface at value access,
//! not at parse time, because interpolation is lazy.
//!
//! ## Examples
//!
//! ```rust
//! use initree::{parse, Error};
//!
//! let result = parse("[unterminated\nkey = value");
//! assert!(matches!(result, Err(Error::Structure { line: 1, .. })));
//! ```

use thiserror::Error;

/// Represents all possible errors from parsing, writing, or value access.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// Structural problem in the input: malformed section header, misplaced
    /// global property, missing key, unbalanced brackets.
    #[error("structure error at line {line}, column {col}: {msg}")]
    Structure {
        line: usize,
        col: usize,
        msg: String,
    },

    /// A key was seen twice at the same scope under `DuplicateKeys::Deny`.
    #[error("duplicate key `{key}` at line {line}")]
    DuplicateKey { line: usize, key: String },

    /// A section path was seen twice under `DuplicateSections::Deny`.
    #[error("duplicate section `{path}` at line {line}")]
    DuplicateSection { line: usize, path: String },

    /// Unterminated or malformed quoted value.
    #[error("quote error at line {line}, column {col}: {msg}")]
    Quote {
        line: usize,
        col: usize,
        msg: String,
    },

    /// Unknown escape sequence while escape decoding is active.
    #[error("unknown escape sequence `{sequence}` at line {line}, column {col}")]
    Escape {
        line: usize,
        col: usize,
        sequence: String,
    },

    /// A `${ref}` token could not be resolved against the document tree or
    /// the fallback lookup chain.
    #[error("unresolved reference `${{{name}}}`")]
    UnresolvedReference { name: String },

    /// Interpolation revisited a `(section, key)` pair already on the
    /// resolution stack.
    #[error("cyclic reference while resolving: {chain}")]
    CyclicReference { chain: String },

    /// A mutator was called through a read-only view.
    #[error("unsupported operation on read-only node: {0}")]
    ReadOnly(String),

    /// A value cannot be rendered losslessly under the active writer
    /// options.
    #[error("value not representable under current options: {0}")]
    Unrepresentable(String),

    /// Invalid option combination (e.g. quote character equal to a
    /// delimiter character).
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Failure of the underlying output sink.
    #[error("write error: {0}")]
    Io(String),
}

impl Error {
    /// Creates a structure error with line and column information.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use initree::Error;
    ///
    /// let err = Error::structure(10, 5, "empty section path component");
    /// assert!(err.to_string().contains("line 10"));
    /// ```
    pub fn structure(line: usize, col: usize, msg: &str) -> Self {
        Error::Structure {
            line,
            col,
            msg: msg.to_string(),
        }
    }

    /// Creates a duplicate-key error for `DuplicateKeys::Deny` violations.
    pub fn duplicate_key(line: usize, key: &str) -> Self {
        Error::DuplicateKey {
            line,
            key: key.to_string(),
        }
    }

    /// Creates a duplicate-section error for `DuplicateSections::Deny`
    /// violations. `path` is the full dotted path of the colliding section.
    pub fn duplicate_section(line: usize, path: &str) -> Self {
        Error::DuplicateSection {
            line,
            path: path.to_string(),
        }
    }

    /// Creates a quote error (unterminated or malformed quoted value).
    pub fn quote(line: usize, col: usize, msg: &str) -> Self {
        Error::Quote {
            line,
            col,
            msg: msg.to_string(),
        }
    }

    /// Creates an escape error for an unknown escape sequence.
    pub fn escape(line: usize, col: usize, sequence: &str) -> Self {
        Error::Escape {
            line,
            col,
            sequence: sequence.to_string(),
        }
    }

    /// Creates an unresolved-reference error for `${name}`.
    pub fn unresolved(name: &str) -> Self {
        Error::UnresolvedReference {
            name: name.to_string(),
        }
    }

    /// Creates a cyclic-reference error from the resolution chain, ordered
    /// from the first access to the repeated one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use initree::Error;
    ///
    /// let err = Error::cyclic(&["a".to_string(), "b".to_string(), "a".to_string()]);
    /// assert!(err.to_string().contains("a -> b -> a"));
    /// ```
    pub fn cyclic(chain: &[String]) -> Self {
        Error::CyclicReference {
            chain: chain.join(" -> "),
        }
    }

    /// Creates a read-only violation error naming the attempted operation.
    pub fn read_only(operation: &str) -> Self {
        Error::ReadOnly(operation.to_string())
    }

    /// Creates a lossless-representation error for the writer.
    pub fn unrepresentable(msg: &str) -> Self {
        Error::Unrepresentable(msg.to_string())
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Error::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
