use std::fmt::Write;

use insta::assert_snapshot;
use mathspan::{
    BlockReader, InlineTokenizer, MathExtension, Node, Reader, ScannerConfig, tokenize,
    tokenize_with,
};

fn describe_nodes(source: &str, nodes: &[Node]) -> String {
    let mut out = String::new();
    for (idx, node) in nodes.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        let segment = node.segment();
        let kind = match node {
            Node::Text(_) => "text",
            Node::CodeSpan(_) => "code",
            Node::Math { display, .. } => display.as_str(),
        };
        let raw = &source[segment.range()];
        write!(out, "{kind} {}..{} {raw:?}", segment.start, segment.stop).unwrap();
    }
    out
}

fn describe(source: &str) -> String {
    describe_nodes(source, &tokenize(source))
}

#[test]
fn paragraph_with_inline_and_block() {
    let source = "Let $x$ be real.\nThen\n$$\nx^2 \\geq 0\n$$\nholds.\n";
    assert_snapshot!(describe(source), @r#"
    text 0..4 "Let "
    inline 4..7 "$x$"
    text 7..22 " be real.\nThen\n"
    block 22..38 "$$\nx^2 \\geq 0\n$$"
    text 38..46 "\nholds.\n"
    "#);
}

#[test]
fn markup_inside_math_is_opaque() {
    let source = "a $x_1 * `y` * x_2$ b `$z$`";
    assert_snapshot!(describe(source), @r#"
    text 0..2 "a "
    inline 2..19 "$x_1 * `y` * x_2$"
    text 19..22 " b "
    code 22..27 "`$z$`"
    "#);
}

#[test]
fn stray_dollars() {
    let source = "It costs $5 today.\n$$ alone\n";
    assert_snapshot!(describe(source), @r#"
    text 0..28 "It costs $5 today.\n$$ alone\n"
    "#);
}

#[test]
fn adjacent_regions() {
    let source = "$a$$b$";
    assert_snapshot!(describe(source), @r#"
    inline 0..3 "$a$"
    inline 3..6 "$b$"
    "#);
}

#[test]
fn block_lookahead_window() {
    // Closing `$$` four lines below the opener is found.
    let source = "$$\n1\n2\n3\n$$";
    assert_snapshot!(describe(source), @r#"
    block 0..11 "$$\n1\n2\n3\n$$"
    "#);

    // Six lines below is outside the window.
    let source = "$$\n1\n2\n3\n4\n5\n$$";
    assert!(
        tokenize(source)
            .iter()
            .all(|node| matches!(node, Node::Text(_)))
    );
    assert_eq!(
        tokenize_with(source, ScannerConfig { lookahead_lines: 7 }).len(),
        1
    );
}

#[test]
fn math_only_pipeline() {
    let source = "`$x$`";
    let tokenizer = InlineTokenizer::new().with_extension(&MathExtension::default());
    let mut reader = BlockReader::new(source.as_bytes());
    let nodes = tokenizer.parse(&mut reader);
    assert!(reader.is_eof());
    assert_snapshot!(describe_nodes(source, &nodes), @r#"
    text 0..1 "`"
    inline 1..4 "$x$"
    text 4..5 "`"
    "#);
}

#[test]
fn scanning_twice_is_identical() {
    let source = "x $$\ny\n$$ and $z$ `w`";
    assert_eq!(tokenize(source), tokenize(source));
}

#[test]
fn scanner_config_from_toml() {
    let config: ScannerConfig = toml::from_str("lookahead-lines = 3").unwrap();
    assert_eq!(config.lookahead_lines, 3);

    let config: ScannerConfig = toml::from_str("").unwrap();
    assert_eq!(config, ScannerConfig::default());
    assert_eq!(config.lookahead_lines, mathspan::DEFAULT_LOOKAHEAD_LINES);
}
