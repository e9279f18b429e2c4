//! The `$`/`$$` delimiter scanner.
//!
//! The scanner only decides where a math region starts and ends. It never looks at what is
//! inside, and every malformed or unterminated region is a silent decline so that a stray
//! dollar sign in ordinary text costs nothing.
use memchr::memmem;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::MathDisplay;
use crate::parser::{InlineParser, Node};
use crate::text::{Reader, Segment};

/// The byte that opens and closes math regions.
pub const MATH_TRIGGER: u8 = b'$';

/// How many lines (including the opening one) a block region may span by default.
pub const DEFAULT_LOOKAHEAD_LINES: usize = 5;

const BLOCK_CLOSER: &[u8] = b"$$";

/// Configuration for [`MathScanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct ScannerConfig {
    /// Number of lines searched for the closing `$$` of a block region, counting the line
    /// that contains the opening `$$`. The opening line is always searched, so `0` acts
    /// like `1`.
    pub lookahead_lines: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            lookahead_lines: DEFAULT_LOOKAHEAD_LINES,
        }
    }
}

/// A math region found by [`MathScanner::scan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MathMatch {
    pub display: MathDisplay,
    /// The whole region, from the opening delimiter through the closing one.
    pub segment: Segment,
    /// Index of the line that holds the closing delimiter.
    pub line: usize,
    /// Stop offset of the line that holds the closing delimiter.
    pub line_stop: usize,
}

/// Where the closing delimiter was found.
struct Closer {
    /// Offset of the first closing byte.
    end: usize,
    /// Length of the closing delimiter.
    advance: usize,
    line: usize,
    line_stop: usize,
}

/// Inline parser claiming `$` and producing [`Node::Math`].
#[derive(Debug, Default, Clone)]
pub struct MathScanner {
    config: ScannerConfig,
}

static_assertions::assert_impl_all!(MathScanner: Send, Sync);

impl MathScanner {
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Looks for a math region at the cursor without moving it.
    pub fn scan(&self, reader: &dyn Reader) -> Option<MathMatch> {
        let (line, pos) = reader.position();
        let bytes = pos.value(reader.source());
        if bytes.first() != Some(&MATH_TRIGGER) {
            return None;
        }

        let (kind, start, closer) = if bytes.get(1) == Some(&MATH_TRIGGER) {
            (
                MathDisplay::Block,
                pos.start + 2,
                self.scan_block(reader, line, pos),
            )
        } else {
            (MathDisplay::Inline, pos.start + 1, scan_inline(line, pos, bytes))
        };

        let Some(closer) = closer else {
            trace!(offset = pos.start, display = ?kind, "unterminated math region");
            return None;
        };
        if start >= closer.end {
            trace!(offset = pos.start, display = ?kind, "empty math region");
            return None;
        }

        Some(MathMatch {
            display: kind,
            segment: Segment::new(pos.start, closer.end + closer.advance),
            line: closer.line,
            line_stop: closer.line_stop,
        })
    }

    /// Searches for `$$`, starting right after the opener and continuing into following lines
    /// until the lookahead budget or the buffer runs out.
    fn scan_block(
        &self,
        reader: &dyn Reader,
        mut line: usize,
        mut segment: Segment,
    ) -> Option<Closer> {
        let source = reader.source();
        let mut offset = 2;
        for _ in 0..self.config.lookahead_lines.max(1) {
            let found = segment
                .value(source)
                .get(offset..)
                .and_then(|rest| memmem::find(rest, BLOCK_CLOSER));
            if let Some(idx) = found {
                return Some(Closer {
                    end: segment.start + offset + idx,
                    advance: BLOCK_CLOSER.len(),
                    line,
                    line_stop: segment.stop,
                });
            }
            if segment.stop >= source.len() {
                break;
            }
            segment = reader.line_after(segment.stop)?;
            line += 1;
            offset = 0;
        }
        None
    }
}

/// Searches the rest of the current line for an unescaped `$`.
///
/// A backslash always swallows the byte after it, so `\\` and `\$` are both skipped as pairs.
fn scan_inline(line: usize, segment: Segment, bytes: &[u8]) -> Option<Closer> {
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            MATH_TRIGGER => {
                return Some(Closer {
                    end: segment.start + i,
                    advance: 1,
                    line,
                    line_stop: segment.stop,
                });
            }
            _ => i += 1,
        }
    }
    None
}

impl InlineParser for MathScanner {
    fn trigger(&self) -> &[u8] {
        &[MATH_TRIGGER]
    }

    fn parse(&self, reader: &mut dyn Reader) -> Option<Node> {
        let found = self.scan(reader)?;
        let (_, pos) = reader.position();
        let new_pos = found.segment.stop;
        if new_pos < found.line_stop {
            reader.set_position(found.line, Segment::new(new_pos, found.line_stop));
        } else {
            reader.advance(new_pos - pos.start);
        }
        trace!(
            start = found.segment.start,
            stop = found.segment.stop,
            display = ?found.display,
            "math region"
        );
        Some(Node::Math {
            display: found.display,
            segment: found.segment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::BlockReader;

    fn scan(input: &str) -> Option<MathMatch> {
        let reader = BlockReader::new(input.as_bytes());
        MathScanner::default().scan(&reader)
    }

    fn parse(input: &str) -> (Option<Node>, BlockReader<'_>) {
        let mut reader = BlockReader::new(input.as_bytes());
        let node = MathScanner::default().parse(&mut reader);
        (node, reader)
    }

    fn matched_text(input: &str) -> Option<&str> {
        scan(input).map(|m| &input[m.segment.range()])
    }

    #[test]
    fn inline() {
        let m = scan("$x+y$").unwrap();
        assert_eq!(m.display, MathDisplay::Inline);
        assert_eq!(m.segment, Segment::new(0, 5));
        assert_eq!(matched_text("$x+y$"), Some("$x+y$"));
    }

    #[test]
    fn inline_followed_by_text() {
        assert_eq!(matched_text("$a$ and $b$"), Some("$a$"));
    }

    #[test]
    fn inline_escaped_dollar() {
        let input = r"$a\$b$";
        let m = scan(input).unwrap();
        assert_eq!(m.segment.len(), 6);
        assert_eq!(matched_text(input), Some(input));
    }

    #[test]
    fn inline_escaped_backslash_is_skipped_as_pair() {
        // `\\` is consumed as one escape, so the `$` after it closes the region.
        assert_eq!(matched_text(r"$a\\$b$"), Some(r"$a\\$"));
    }

    #[test]
    fn inline_trailing_backslash() {
        assert_eq!(scan(r"$abc\"), None);
        assert_eq!(scan(r"$abc\$"), None);
    }

    #[test]
    fn inline_unterminated() {
        assert_eq!(scan("$abc"), None);
    }

    #[test]
    fn inline_stays_on_its_line() {
        assert_eq!(scan("$abc\ndef$"), None);
    }

    #[test]
    fn not_at_trigger() {
        assert_eq!(scan("abc$d$"), None);
        assert_eq!(scan(""), None);
    }

    #[test]
    fn lone_dollar() {
        assert_eq!(scan("$"), None);
    }

    #[test]
    fn block_same_line() {
        let m = scan("$$x^2$$").unwrap();
        assert_eq!(m.display, MathDisplay::Block);
        // The closer starts at offset 5 and is two bytes long.
        assert_eq!(m.segment, Segment::new(0, 7));
        assert_eq!(m.line, 0);
    }

    #[test]
    fn block_multi_line() {
        let input = "$$\nx^2\n$$";
        let m = scan(input).unwrap();
        assert_eq!(m.display, MathDisplay::Block);
        assert_eq!(m.segment, Segment::new(0, input.len()));
        assert_eq!(m.line, 2);
        assert_eq!(matched_text(input), Some(input));
    }

    #[test]
    fn block_multi_line_unclosed() {
        assert_eq!(scan("$$\nx^2\ny^2"), None);
        assert_eq!(scan("$$\nx^2\ny^2\n"), None);
    }

    #[test]
    fn block_closer_four_lines_away() {
        let input = "$$\na\nb\nc\n$$ rest";
        let m = scan(input).unwrap();
        assert_eq!(m.line, 4);
        assert_eq!(&input[m.segment.range()], "$$\na\nb\nc\n$$");
    }

    #[test]
    fn block_closer_five_lines_away() {
        assert_eq!(scan("$$\na\nb\nc\nd\n$$"), None);
    }

    #[test]
    fn block_closer_six_lines_away() {
        assert_eq!(scan("$$\na\nb\nc\nd\ne\n$$"), None);
    }

    #[test]
    fn block_lookahead_is_configurable() {
        let input = "$$\na\nb\nc\nd\ne\n$$";
        let reader = BlockReader::new(input.as_bytes());
        let scanner = MathScanner::new(ScannerConfig { lookahead_lines: 7 });
        let m = scanner.scan(&reader).unwrap();
        assert_eq!(m.segment, Segment::new(0, input.len()));

        let scanner = MathScanner::new(ScannerConfig { lookahead_lines: 1 });
        assert_eq!(scanner.scan(&BlockReader::new(b"$$\nx$$")), None);
        assert!(scanner.scan(&BlockReader::new(b"$$x$$")).is_some());
    }

    #[test]
    fn zero_lookahead_still_searches_opening_line() {
        let scanner = MathScanner::new(ScannerConfig { lookahead_lines: 0 });
        let m = scanner.scan(&BlockReader::new(b"$$x$$ rest")).unwrap();
        assert_eq!(m.display, MathDisplay::Block);
        assert_eq!(m.segment, Segment::new(0, 5));
        assert_eq!(scanner.scan(&BlockReader::new(b"$$\nx$$")), None);
    }

    #[test]
    fn block_ignores_escapes() {
        assert_eq!(matched_text(r"$$a\$$b"), Some(r"$$a\$$"));
    }

    #[test]
    fn block_empty() {
        assert_eq!(scan("$$$$"), None);
    }

    #[test]
    fn block_unterminated_at_end_of_buffer() {
        assert_eq!(scan("$$x"), None);
        assert_eq!(scan("$$"), None);
    }

    #[test]
    fn block_closer_on_empty_line_after_opener() {
        assert_eq!(matched_text("$$x\n\n$$"), Some("$$x\n\n$$"));
    }

    #[test]
    fn decline_leaves_cursor() {
        let (node, reader) = parse("$abc");
        assert_eq!(node, None);
        assert_eq!(reader.position(), (0, Segment::new(0, 4)));
    }

    #[test]
    fn parse_repositions_within_line() {
        let (node, reader) = parse("$x$ and more\nnext");
        assert_eq!(
            node,
            Some(Node::Math {
                display: MathDisplay::Inline,
                segment: Segment::new(0, 3),
            })
        );
        assert_eq!(reader.position(), (0, Segment::new(3, 13)));
    }

    #[test]
    fn parse_repositions_on_closing_line() {
        let (node, reader) = parse("$$\nx\n$$ tail\n");
        assert_eq!(
            node,
            Some(Node::Math {
                display: MathDisplay::Block,
                segment: Segment::new(0, 7),
            })
        );
        assert_eq!(reader.position(), (2, Segment::new(7, 13)));
    }

    #[test]
    fn parse_advances_past_line_end() {
        let (_, reader) = parse("$$\nx\n$$");
        assert!(reader.is_eof());

        let (_, reader) = parse("$x$");
        assert!(reader.is_eof());

        // The newline is still part of the line, so the cursor stays on it.
        let (_, reader) = parse("$x$\nnext");
        assert_eq!(reader.position(), (0, Segment::new(3, 4)));
    }

    #[test]
    fn parse_from_middle_of_line() {
        let input = "a $$b\nc$$ d";
        let mut reader = BlockReader::new(input.as_bytes());
        reader.advance(2);
        let node = MathScanner::default().parse(&mut reader);
        assert_eq!(
            node,
            Some(Node::Math {
                display: MathDisplay::Block,
                segment: Segment::new(2, 9),
            })
        );
        assert_eq!(reader.position(), (1, Segment::new(9, 11)));
    }

    #[test]
    fn rescanning_gives_same_result() {
        let input = "$$\nx^2\n$$ and $y$";
        let reader = BlockReader::new(input.as_bytes());
        let scanner = MathScanner::default();
        assert_eq!(scanner.scan(&reader), scanner.scan(&reader));

        let (first, _) = parse(input);
        let (second, _) = parse(input);
        assert_eq!(first, second);
    }

    #[test]
    fn trigger_is_dollar() {
        assert_eq!(MathScanner::default().trigger(), b"$");
    }
}
