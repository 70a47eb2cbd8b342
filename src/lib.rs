//! # initree
//!
//! A configurable reader/writer for hierarchical, line-oriented key/value
//! documents: INI-like files with nested sections, multi-valued properties,
//! and `${ref}` variable interpolation.
//!
//! ## Key Features
//!
//! - **Dialect-configurable**: separators, comment and quote characters,
//!   duplicate-handling policies, multi-value encoding, case folding and
//!   escaping are all options, independently chosen for reading and
//!   writing
//! - **Lossless round-trips**: whatever a reader builds, a writer with the
//!   same options serializes back to text that re-parses deep-equal
//! - **Nested sections**: `[a.b.c]` headers address a path-keyed tree,
//!   including duplicate same-key sibling sections
//! - **Lazy interpolation**: `${ref}` tokens expand at value access against
//!   the section, its ancestors, and a pluggable lookup chain, with cycle
//!   detection
//! - **No silent data loss**: a value the active dialect cannot represent
//!   is an error, never a truncation
//!
//! ## Quick Start
//!
//! ```rust
//! use initree::parse;
//!
//! let doc = parse(r#"
//! ; application configuration
//! timeout = 30
//!
//! [server]
//! host = localhost
//! ports = 8080, 8081
//! "#).unwrap();
//!
//! let server = doc.section(&["server"]).unwrap();
//! assert_eq!(server.get("host").unwrap().as_deref(), Some("localhost"));
//! assert_eq!(
//!     server.raw_all("ports"),
//!     Some(vec!["8080".to_string(), "8081".to_string()])
//! );
//! ```
//!
//! ## Custom Dialects
//!
//! ```rust
//! use initree::{parse_with_options, to_text_with_options, SyntaxOptions};
//!
//! // Read a colon-separated, hash-commented dialect...
//! let read = SyntaxOptions::new().with_value_separator(':').with_comment_char('#');
//! let doc = parse_with_options("# note\nname: deep thought", read).unwrap();
//!
//! // ...and write it back under the default dialect.
//! let text = to_text_with_options(&doc, SyntaxOptions::new()).unwrap();
//! assert_eq!(text, "name = deep thought\n");
//! ```
//!
//! ## Interpolation
//!
//! ```rust
//! use initree::parse;
//!
//! let doc = parse("base = /opt\n[app]\nbin = ${base}/bin").unwrap();
//! let app = doc.section(&["app"]).unwrap();
//! assert_eq!(app.get("bin").unwrap().as_deref(), Some("/opt/bin"));
//! // The stored raw value is untouched.
//! assert_eq!(app.raw("bin").as_deref(), Some("${base}/bin"));
//! ```
//!
//! ## Concurrency
//!
//! Parsing and writing run synchronously on the calling thread and perform
//! no I/O; callers pass in and receive text. Node handles are `Rc`-based
//! and single-threaded by design; a document follows a single-writer
//! discipline the caller enforces.

mod error;
mod interpolate;
mod node;
mod options;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use interpolate::{EnvLookup, Lookup, MapLookup, Unresolved};
pub use node::{Document, MergeMode, Node, ReadOnlyNode};
pub use options::{
    DuplicateKeys, DuplicateSections, Escapes, MultiValues, Quoting, SyntaxOptions,
};
pub use reader::Reader;
pub use writer::Writer;

/// Parses a document under the default dialect.
///
/// # Examples
///
/// ```rust
/// use initree::parse;
///
/// let doc = parse("[s]\nkey = value").unwrap();
/// assert!(doc.contains_section("s"));
/// ```
pub fn parse(text: &str) -> Result<Document> {
    parse_with_options(text, SyntaxOptions::new())
}

/// Parses a document under an explicit dialect.
pub fn parse_with_options(text: &str, options: SyntaxOptions) -> Result<Document> {
    Reader::new(options)?.parse(text)
}

/// Serializes a document under the default dialect.
///
/// # Examples
///
/// ```rust
/// use initree::{parse, to_text};
///
/// let doc = parse("key = value").unwrap();
/// assert_eq!(to_text(&doc).unwrap(), "key = value\n");
/// ```
pub fn to_text(document: &Document) -> Result<String> {
    to_text_with_options(document, SyntaxOptions::new())
}

/// Serializes a document under an explicit dialect.
pub fn to_text_with_options(document: &Document, options: SyntaxOptions) -> Result<String> {
    Writer::new(options)?.write(document.root())
}
