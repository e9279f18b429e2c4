use memchr::memchr;

use crate::parser::{InlineParser, Node};
use crate::text::{Reader, Segment};

const BACKTICK: u8 = b'`';

/// Backtick code spans on a single line.
///
/// An opening run of `n` backticks is closed by the next run of exactly `n` backticks.
#[derive(Debug, Default, Clone, Copy)]
pub struct CodeSpanParser;

impl InlineParser for CodeSpanParser {
    fn trigger(&self) -> &[u8] {
        &[BACKTICK]
    }

    fn parse(&self, reader: &mut dyn Reader) -> Option<Node> {
        let (line, pos) = reader.position();
        let stop = {
            let bytes = pos.value(reader.source());
            let opening = run_length(bytes, 0);
            if opening == 0 {
                return None;
            }
            let mut search = opening;
            loop {
                let idx = search + memchr(BACKTICK, &bytes[search..])?;
                let run = run_length(bytes, idx);
                if run == opening {
                    break pos.start + idx + run;
                }
                search = idx + run;
            }
        };
        if stop < pos.stop {
            reader.set_position(line, Segment::new(stop, pos.stop));
        } else {
            reader.advance(stop - pos.start);
        }
        Some(Node::CodeSpan(Segment::new(pos.start, stop)))
    }
}

fn run_length(bytes: &[u8], from: usize) -> usize {
    bytes[from..].iter().take_while(|&&b| b == BACKTICK).count()
}
