use rustc_hash::FxHashMap;
use tracing::trace;

use crate::MathDisplay;
use crate::code_span::CodeSpanParser;
use crate::scanner::{MathScanner, ScannerConfig};
use crate::text::{BlockReader, Reader, Segment};

/// An inline node. Every node refers back into the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    /// Ordinary text that no inline parser claimed.
    Text(Segment),
    /// A backtick code span, including its backticks.
    CodeSpan(Segment),
    /// A math region, including both delimiters. Its interior is never tokenized.
    Math {
        display: MathDisplay,
        segment: Segment,
    },
}

impl Node {
    #[inline]
    pub fn segment(&self) -> Segment {
        match self {
            Node::Text(segment) | Node::CodeSpan(segment) | Node::Math { segment, .. } => *segment,
        }
    }
}

/// A parser that is offered the cursor whenever it sits on one of its trigger bytes.
///
/// Returning `None` declines the position. A parser that declines must leave the reader
/// exactly where it found it, so that the next parser can try.
pub trait InlineParser: Send + Sync {
    fn trigger(&self) -> &[u8];

    fn parse(&self, reader: &mut dyn Reader) -> Option<Node>;
}

/// Something that registers parsers with an [`InlineTokenizer`].
pub trait Extension {
    fn extend(&self, tokenizer: &mut InlineTokenizer);
}

/// Registers [`MathScanner`] at the lowest priority.
#[derive(Debug, Default, Clone, Copy)]
pub struct MathExtension {
    pub config: ScannerConfig,
}

impl Extension for MathExtension {
    fn extend(&self, tokenizer: &mut InlineTokenizer) {
        tokenizer.add_parser(MathScanner::new(self.config), MATH_PRIORITY);
    }
}

pub const MATH_PRIORITY: i32 = 0;
pub const CODE_SPAN_PRIORITY: i32 = 100;

struct Prioritized {
    parser: Box<dyn InlineParser>,
    priority: i32,
}

/// Splits a document into [`Node`]s by offering trigger bytes to registered parsers.
#[derive(Default)]
pub struct InlineTokenizer {
    parsers: Vec<Prioritized>,
    /// For each trigger byte, the indices into `parsers` in the order they are tried.
    triggers: FxHashMap<u8, Vec<usize>>,
}

impl InlineTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `parser`. Parsers with a higher priority are tried first; parsers with equal
    /// priority are tried in registration order.
    pub fn add_parser<P>(&mut self, parser: P, priority: i32)
    where
        P: InlineParser + 'static,
    {
        let idx = self.parsers.len();
        for &byte in parser.trigger() {
            let slot = self.triggers.entry(byte).or_default();
            let pos = slot.partition_point(|&other| self.parsers[other].priority >= priority);
            slot.insert(pos, idx);
        }
        self.parsers.push(Prioritized {
            parser: Box::new(parser),
            priority,
        });
    }

    pub fn with_parser<P>(mut self, parser: P, priority: i32) -> Self
    where
        P: InlineParser + 'static,
    {
        self.add_parser(parser, priority);
        self
    }

    pub fn with_extension(mut self, extension: &dyn Extension) -> Self {
        extension.extend(&mut self);
        self
    }

    #[inline]
    fn is_trigger(&self, byte: u8) -> bool {
        self.triggers.contains_key(&byte)
    }

    /// Tokenizes everything from the reader's position to the end of its buffer.
    pub fn parse(&self, reader: &mut dyn Reader) -> Vec<Node> {
        let mut nodes = Vec::new();
        while !reader.is_eof() {
            let (_, pos) = reader.position();
            let (first, text_len) = {
                let rest = pos.value(reader.source());
                let Some(&first) = rest.first() else {
                    reader.advance_line();
                    continue;
                };
                // Ordinary text runs up to the next trigger byte on this line.
                let text_len = rest[1..]
                    .iter()
                    .position(|&b| self.is_trigger(b))
                    .map_or(rest.len(), |idx| idx + 1);
                (first, text_len)
            };

            if let Some(node) = self.try_parsers(first, reader) {
                nodes.push(node);
                continue;
            }

            push_text(&mut nodes, Segment::new(pos.start, pos.start + text_len));
            reader.advance(text_len);
        }
        nodes
    }

    fn try_parsers(&self, byte: u8, reader: &mut dyn Reader) -> Option<Node> {
        let candidates = self.triggers.get(&byte)?;
        candidates.iter().find_map(|&idx| {
            let node = self.parsers[idx].parser.parse(reader);
            if node.is_none() {
                trace!(byte = %char::from(byte), parser = idx, "declined");
            }
            node
        })
    }
}

/// Appends `segment` as text, merging it with a directly preceding text node.
fn push_text(nodes: &mut Vec<Node>, segment: Segment) {
    if let Some(Node::Text(last)) = nodes.last_mut()
        && last.stop == segment.start
    {
        last.stop = segment.stop;
        return;
    }
    nodes.push(Node::Text(segment));
}

impl std::fmt::Debug for InlineTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineTokenizer")
            .field("parsers", &self.parsers.len())
            .field("triggers", &self.triggers)
            .finish()
    }
}

/// The tokenizer used by [`tokenize`]: code spans, then math.
pub fn default_tokenizer(config: ScannerConfig) -> InlineTokenizer {
    InlineTokenizer::new()
        .with_parser(CodeSpanParser, CODE_SPAN_PRIORITY)
        .with_extension(&MathExtension { config })
}

/// Tokenizes `source` with code spans and math enabled.
///
/// ```rust
/// use mathspan::{MathDisplay, Node, Segment, tokenize};
///
/// let nodes = tokenize("cost is $x^2$ here");
/// assert_eq!(
///     nodes,
///     [
///         Node::Text(Segment::new(0, 8)),
///         Node::Math { display: MathDisplay::Inline, segment: Segment::new(8, 13) },
///         Node::Text(Segment::new(13, 18)),
///     ]
/// );
/// ```
pub fn tokenize(source: &str) -> Vec<Node> {
    tokenize_with(source, ScannerConfig::default())
}

pub fn tokenize_with(source: &str, config: ScannerConfig) -> Vec<Node> {
    let mut reader = BlockReader::new(source.as_bytes());
    default_tokenizer(config).parse(&mut reader)
}
