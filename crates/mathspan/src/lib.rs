//! Find `$...$` and `$$...$$` math regions in text.
//!
//! Math markup is full of characters that other inline rules care about (`_`, `*`, `` ` ``,
//! `\`). This crate detects math regions and hands them out as opaque segments, so that no
//! other rule ever looks inside them. What is inside is left for a renderer to deal with.
//!
//! # Usage
//!
//! The simplest entry point is [`tokenize`], which splits a document into text, code spans
//! and math:
//!
//! ```rust
//! use mathspan::{MathDisplay, Node, tokenize};
//!
//! let source = "Euler: $e^{i\\pi} + 1 = 0$.";
//! let math: Vec<_> = tokenize(source)
//!     .into_iter()
//!     .filter_map(|node| match node {
//!         Node::Math { display, segment } => Some((display, &source[segment.range()])),
//!         _ => None,
//!     })
//!     .collect();
//! assert_eq!(math, [(MathDisplay::Inline, "$e^{i\\pi} + 1 = 0$")]);
//! ```
//!
//! To combine the scanner with other inline parsers, register [`MathExtension`] (or a
//! [`MathScanner`] directly) with an [`InlineTokenizer`]. To turn math into something else,
//! pass the nodes to a [`Replacer`] together with an implementation of [`Render`].
//!
//! # Features
//!
//! - `serde`: With this feature, `ScannerConfig` implements serde's `Deserialize`.
//!
mod code_span;
mod parser;
mod render;
mod scanner;
mod text;

use strum_macros::IntoStaticStr;

pub use self::code_span::CodeSpanParser;
pub use self::parser::{
    CODE_SPAN_PRIORITY, Extension, InlineParser, InlineTokenizer, MATH_PRIORITY, MathExtension,
    Node, default_tokenizer, tokenize, tokenize_with,
};
pub use self::render::{ConversionError, MathSpan, Passthrough, Render, Replacer, line_and_col};
pub use self::scanner::{
    DEFAULT_LOOKAHEAD_LINES, MATH_TRIGGER, MathMatch, MathScanner, ScannerConfig,
};
pub use self::text::{BlockReader, Reader, Segment};

/// Display mode of a math region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum MathDisplay {
    /// `$...$`, confined to one line.
    Inline,
    /// `$$...$$`, which may span several lines.
    Block,
}

impl MathDisplay {
    /// Length of the opening (and closing) delimiter.
    #[inline]
    pub const fn delimiter_len(self) -> usize {
        match self {
            MathDisplay::Inline => 1,
            MathDisplay::Block => 2,
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}
