use std::convert::Infallible;
use std::fmt;

use crate::MathDisplay;
use crate::parser::Node;

/// A math region as handed to a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MathSpan<'source> {
    pub display: MathDisplay,
    /// Offset of the opening delimiter in the source.
    pub offset: usize,
    /// The region exactly as written, delimiters included.
    pub raw: &'source str,
}

impl<'source> MathSpan<'source> {
    /// The text between the delimiters.
    pub fn content(&self) -> &'source str {
        let delim = self.display.delimiter_len();
        self.raw
            .get(delim..self.raw.len().saturating_sub(delim))
            .unwrap_or_default()
    }
}

/// Converts math regions into output markup.
pub trait Render {
    type Error: std::error::Error;

    /// Appends the rendering of `span` to `out`.
    fn render(&mut self, out: &mut String, span: &MathSpan<'_>) -> Result<(), Self::Error>;
}

/// Keeps every math region as it was written.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl Render for Passthrough {
    type Error = Infallible;

    fn render(&mut self, out: &mut String, span: &MathSpan<'_>) -> Result<(), Infallible> {
        out.push_str(span.raw);
        Ok(())
    }
}

/// A renderer failure, located in the source document.
#[derive(Debug)]
pub struct ConversionError<E> {
    pub display: MathDisplay,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    /// The math region that failed, delimiters included.
    pub raw: String,
    pub error: E,
}

impl<E: fmt::Display> fmt::Display for ConversionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Error at line {}, column {} in '{}':\n{}",
            self.line, self.column, self.raw, self.error
        )
    }
}

impl<E> std::error::Error for ConversionError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// 1-based line and column of byte offset `offset` in `input`, as shown in error messages.
///
/// Columns count characters. An offset past the end is clamped to the end of the input.
pub fn line_and_col(offset: usize, input: &str) -> (usize, usize) {
    let before = &input.as_bytes()[..offset.min(input.len())];
    let line_start = memchr::memrchr(b'\n', before).map_or(0, |nl| nl + 1);
    let line = memchr::memchr_iter(b'\n', &before[..line_start]).count() + 1;
    // Count the leading byte of every character; continuation bytes look like 0b10xx_xxxx.
    let chars = before[line_start..]
        .iter()
        .filter(|&&b| b & 0xC0 != 0x80)
        .count();
    (line, chars + 1)
}

/// Rebuilds a document from its nodes, sending math regions through a [`Render`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Replacer {
    /// If `true`, a region the renderer rejects is kept verbatim instead of aborting.
    pub continue_on_error: bool,
}

impl Replacer {
    pub fn new(continue_on_error: bool) -> Self {
        Self { continue_on_error }
    }

    /// Text and code spans are copied unchanged; math regions are rendered.
    ///
    /// `nodes` must come from tokenizing `source`.
    pub fn replace<R: Render>(
        &self,
        source: &str,
        nodes: &[Node],
        renderer: &mut R,
    ) -> Result<String, ConversionError<R::Error>> {
        let mut result = String::with_capacity(source.len());

        for node in nodes {
            let (display, segment) = match *node {
                Node::Math { display, segment } => (display, segment),
                Node::Text(segment) | Node::CodeSpan(segment) => {
                    result.push_str(&source[segment.range()]);
                    continue;
                }
            };
            let span = MathSpan {
                display,
                offset: segment.start,
                raw: &source[segment.range()],
            };
            let checkpoint = result.len();
            if let Err(error) = renderer.render(&mut result, &span) {
                // Drop whatever the renderer wrote before failing.
                result.truncate(checkpoint);
                if self.continue_on_error {
                    tracing::debug!(offset = span.offset, %error, "keeping math region verbatim");
                    result.push_str(span.raw);
                    continue;
                }
                let (line, column) = line_and_col(span.offset, source);
                return Err(ConversionError {
                    display,
                    offset: span.offset,
                    line,
                    column,
                    raw: span.raw.to_string(),
                    error,
                });
            }
        }

        Ok(result)
    }
}
