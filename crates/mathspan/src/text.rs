use std::ops::Range;

use memchr::{memchr, memchr_iter};

/// A half-open byte range `[start, stop)` into a source buffer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    pub start: usize,
    pub stop: usize,
}

impl Segment {
    #[inline]
    pub const fn new(start: usize, stop: usize) -> Self {
        debug_assert!(stop >= start);
        Segment { start, stop }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.stop - self.start
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.stop == self.start
    }

    #[inline]
    pub const fn range(&self) -> Range<usize> {
        self.start..self.stop
    }

    /// The bytes covered by this segment.
    #[inline]
    pub fn value<'source>(&self, source: &'source [u8]) -> &'source [u8] {
        &source[self.range()]
    }
}

impl From<Segment> for Range<usize> {
    #[inline]
    fn from(segment: Segment) -> Self {
        segment.range()
    }
}

/// A cursor over a source buffer that hands out one line at a time.
///
/// Inline parsers only see the document through this trait. The position is a line index
/// together with the unread remainder of that line; lines include their trailing `\n`.
pub trait Reader {
    /// The full, immutable source buffer.
    fn source(&self) -> &[u8];

    /// The current line index and the unread part of the current line.
    fn position(&self) -> (usize, Segment);

    /// Moves the cursor to `segment`, which must lie inside line `line`.
    fn set_position(&mut self, line: usize, segment: Segment);

    /// Moves the cursor `n` bytes forward, crossing line boundaries as needed.
    fn advance(&mut self, n: usize);

    /// Skips the rest of the current line.
    fn advance_line(&mut self);

    fn is_eof(&self) -> bool;

    /// Returns the line that starts at the absolute offset `start`, or `None` if `start` is
    /// at or past the end of the buffer.
    fn line_after(&self, start: usize) -> Option<Segment> {
        line_at(self.source(), start)
    }
}

/// Returns the line (including its `\n`, if any) starting at `start`.
pub(crate) fn line_at(source: &[u8], start: usize) -> Option<Segment> {
    let rest = source.get(start..).filter(|rest| !rest.is_empty())?;
    let stop = match memchr(b'\n', rest) {
        Some(idx) => start + idx + 1,
        None => source.len(),
    };
    Some(Segment::new(start, stop))
}

/// The [`Reader`] over a whole document.
#[derive(Debug, Clone)]
pub struct BlockReader<'source> {
    source: &'source [u8],
    lines: Vec<Segment>,
    line: usize,
    pos: Segment,
}

impl<'source> BlockReader<'source> {
    pub fn new(source: &'source [u8]) -> Self {
        let mut lines = Vec::new();
        let mut start = 0;
        for newline in memchr_iter(b'\n', source) {
            lines.push(Segment::new(start, newline + 1));
            start = newline + 1;
        }
        if start < source.len() {
            lines.push(Segment::new(start, source.len()));
        }
        let pos = lines
            .first()
            .copied()
            .unwrap_or(Segment::new(source.len(), source.len()));
        BlockReader {
            source,
            lines,
            line: 0,
            pos,
        }
    }

    #[inline]
    pub fn lines(&self) -> &[Segment] {
        &self.lines
    }

    /// The absolute offset of the cursor.
    #[inline]
    pub fn offset(&self) -> usize {
        self.pos.start
    }

    fn enter_line(&mut self, line: usize) {
        self.line = line;
        self.pos = match self.lines.get(line) {
            Some(segment) => *segment,
            None => Segment::new(self.source.len(), self.source.len()),
        };
    }
}

impl Reader for BlockReader<'_> {
    #[inline]
    fn source(&self) -> &[u8] {
        self.source
    }

    #[inline]
    fn position(&self) -> (usize, Segment) {
        (self.line, self.pos)
    }

    fn set_position(&mut self, line: usize, segment: Segment) {
        self.line = line;
        self.pos = segment;
    }

    fn advance(&mut self, n: usize) {
        let mut remaining = n;
        while !self.is_eof() {
            let available = self.pos.len();
            if remaining < available {
                self.pos.start += remaining;
                return;
            }
            remaining -= available;
            self.enter_line(self.line + 1);
            if remaining == 0 {
                return;
            }
        }
    }

    #[inline]
    fn advance_line(&mut self) {
        if !self.is_eof() {
            self.enter_line(self.line + 1);
        }
    }

    #[inline]
    fn is_eof(&self) -> bool {
        self.line >= self.lines.len()
    }
}
