//! Write-then-reparse round trips across dialect combinations.
//!
//! Every test builds a document, serializes it, re-parses the output under
//! the same options and requires structural deep equality.

use initree::{
    parse_with_options, to_text_with_options, Document, DuplicateSections, Escapes, MultiValues,
    Quoting, SyntaxOptions,
};

fn assert_roundtrip(doc: &Document, options: SyntaxOptions) {
    let text = to_text_with_options(doc, options.clone()).unwrap();
    let back = parse_with_options(&text, options).unwrap();
    assert!(
        doc.deep_eq(&back),
        "round trip changed the document; written text:\n{}\nre-parsed: {:?}",
        text,
        back
    );
}

/// Plain values only, representable under every dialect combination.
fn plain_fixture() -> Document {
    let doc = Document::new();
    doc.put("name", "app");
    doc.put_all(
        "hosts",
        ["alpha".to_string(), "beta".to_string(), "gamma".to_string()],
    );
    doc.put_all("flag", std::iter::empty());
    let server = doc.obtain(&["server"]);
    server.put("host", "localhost");
    server.put("port", "8080");
    let tls = doc.obtain(&["server", "tls"]);
    tls.put("cert", "/etc/ssl/cert.pem");
    tls.put("key", "/etc/ssl/key.pem");
    doc.obtain(&["client"]).put("retries", "3");
    doc
}

/// Values that need quoting or escaping to survive serialization.
fn gnarly_fixture() -> Document {
    let doc = Document::new();
    doc.put("list", "a,b");
    doc.put("comment", "semi;colon");
    doc.put("quoted", "has \"quotes\"");
    doc.put("slash", "back\\slash");
    doc.put("multiline", "line\nbreak");
    doc.put("padded", "  padded  ");
    doc.put("empty", "");
    doc.put("tabbed", "tab\there");
    doc.put("assign", "k=v");
    doc.put("reference", "${base}/bin");
    doc.put_all("both", ["x;1".to_string(), "y,2".to_string()]);
    let sub = doc.obtain(&["Mixed", "Case"]);
    sub.put("Inner", "деньги");
    doc
}

#[test]
fn plain_document_roundtrips_under_every_dialect() {
    let quoting = [
        Quoting::Never,
        Quoting::Always,
        Quoting::Auto,
        Quoting::Special,
    ];
    let escapes = [Escapes::Never, Escapes::Quoted, Escapes::Always];
    let multi = [MultiValues::Separated, MultiValues::RepeatedKey];

    let doc = plain_fixture();
    for q in quoting {
        for e in escapes {
            for m in multi {
                let options = SyntaxOptions::new()
                    .with_quoting(q)
                    .with_escapes(e)
                    .with_multi_values(m);
                assert_roundtrip(&doc, options);
            }
        }
    }
}

#[test]
fn gnarly_document_roundtrips_when_quoting_is_available() {
    let quoting = [Quoting::Special, Quoting::Auto, Quoting::Always];
    let escapes = [Escapes::Quoted, Escapes::Always];
    let multi = [MultiValues::Separated, MultiValues::RepeatedKey];

    let doc = gnarly_fixture();
    for q in quoting {
        for e in escapes {
            for m in multi {
                let options = SyntaxOptions::new()
                    .with_quoting(q)
                    .with_escapes(e)
                    .with_multi_values(m);
                assert_roundtrip(&doc, options);
            }
        }
    }
}

#[test]
fn comment_character_in_value_survives_because_it_is_quoted() {
    let doc = Document::new();
    doc.put("v", "before;after");
    let text = to_text_with_options(&doc, SyntaxOptions::new()).unwrap();
    assert_eq!(text, "v = \"before;after\"\n");
    let back = parse_with_options(&text, SyntaxOptions::new()).unwrap();
    assert_eq!(back.raw("v").as_deref(), Some("before;after"));
}

#[test]
fn embedded_newline_roundtrips_through_continuation() {
    let doc = Document::new();
    doc.put("v", "first\nsecond\nthird");
    assert_roundtrip(&doc, SyntaxOptions::new());
}

#[test]
fn duplicate_sibling_sections_roundtrip_under_append() {
    let options = SyntaxOptions::new().with_duplicate_sections(DuplicateSections::Append);
    let doc = Document::new();
    let a = doc.create(&["peer"]);
    a.put("addr", "10.0.0.1");
    a.obtain(&["limits"]).put("rate", "100");
    let b = doc.create(&["peer"]);
    b.put("addr", "10.0.0.2");
    b.obtain(&["limits"]).put("rate", "200");
    assert_roundtrip(&doc, options);
}

#[test]
fn zero_value_keys_roundtrip() {
    let doc = Document::new();
    doc.put_all("bare", std::iter::empty());
    doc.obtain(&["s"]).put_all("also", std::iter::empty());

    assert_roundtrip(&doc, SyntaxOptions::new());
    assert_roundtrip(&doc, SyntaxOptions::new().with_empty_value_separator(false));
}

#[test]
fn edge_whitespace_roundtrips_when_trimming_disabled() {
    let options = SyntaxOptions::new().with_trim_values(false);
    let doc = Document::new();
    doc.put("trail", "a ");
    doc.put("lead", " b");
    doc.put("both", "  c  ");
    doc.put_all("list", ["x ".to_string(), " y".to_string()]);
    doc.obtain(&["s"]).put("inner", "v\t");

    let text = to_text_with_options(&doc, options.clone()).unwrap();
    let back = parse_with_options(&text, options.clone()).unwrap();
    assert!(doc.deep_eq(&back), "written text:\n{}", text);
    assert_eq!(back.raw("trail").as_deref(), Some("a "));

    // The same values survive the always-quote dialect too.
    let quoted = options.with_quoting(Quoting::Always);
    let text = to_text_with_options(&doc, quoted.clone()).unwrap();
    let back = parse_with_options(&text, quoted).unwrap();
    assert!(doc.deep_eq(&back));
}

#[test]
fn interpolation_tokens_survive_roundtrips_verbatim() {
    let doc = Document::new();
    doc.put("base", "/opt");
    doc.put("bin", "${base}/bin");
    doc.put("literal", "\\${not-a-ref}");

    let text = to_text_with_options(&doc, SyntaxOptions::new()).unwrap();
    let back = parse_with_options(&text, SyntaxOptions::new()).unwrap();
    assert!(doc.deep_eq(&back));
    assert_eq!(back.get("bin").unwrap().as_deref(), Some("/opt/bin"));
    assert_eq!(back.get("literal").unwrap().as_deref(), Some("${not-a-ref}"));
}

#[test]
fn text_level_roundtrip_is_stable_after_one_pass() {
    // Comments and layout are dropped on the first parse; after that the
    // written form is a fixed point.
    let source = "; top\nkey = value ; trailing\n\n[s]\nlist = 1, 2, 3\n";
    let options = SyntaxOptions::new();
    let doc = parse_with_options(source, options.clone()).unwrap();
    let first = to_text_with_options(&doc, options.clone()).unwrap();
    let again = parse_with_options(&first, options.clone()).unwrap();
    let second = to_text_with_options(&again, options).unwrap();
    assert_eq!(first, second);
}

#[test]
fn dialect_translation_roundtrips() {
    let colon = SyntaxOptions::new()
        .with_value_separator(':')
        .with_comment_char('#')
        .with_path_separator('/');
    let doc = parse_with_options("# src\n[net/http]\nport: 80\nflags: a, b", colon.clone())
        .unwrap();

    // Default dialect out, default dialect back in.
    let text = to_text_with_options(&doc, SyntaxOptions::new()).unwrap();
    let back = parse_with_options(&text, SyntaxOptions::new()).unwrap();
    assert!(doc.deep_eq(&back));

    // And back out through the original dialect.
    let colon_text = to_text_with_options(&back, colon.clone()).unwrap();
    let colon_back = parse_with_options(&colon_text, colon).unwrap();
    assert!(doc.deep_eq(&colon_back));
}

#[test]
fn case_sensitive_documents_roundtrip() {
    let options = SyntaxOptions::new().with_case_sensitive(true);
    let doc = parse_with_options("Key = a\nkey = b\n[S]\n[s]", options.clone()).unwrap();
    assert_roundtrip(&doc, options);
}

#[test]
fn unicode_values_roundtrip() {
    let doc = Document::new();
    doc.put("greeting", "héllo wörld");
    doc.put("emoji", "🦀 crab");
    doc.obtain(&["секция"]).put("ключ", "значение");
    assert_roundtrip(&doc, SyntaxOptions::new());
}
