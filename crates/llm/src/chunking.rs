use docsum_common::{DocsumError, Result};
use std::ops::Range;

use crate::types::Chunk;

/// Sentence endings that need trailing whitespace to count
const LATIN_ENDINGS: [char; 3] = ['.', '!', '?'];

/// Sentence endings that stand on their own
const CJK_ENDINGS: [char; 3] = ['。', '！', '？'];

/// Splits documents into chunks of at most `max_chunk_size` characters
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    max_chunk_size: usize,
}

impl Segmenter {
    pub fn new(max_chunk_size: usize) -> Self {
        Self {
            max_chunk_size: max_chunk_size.max(1),
        }
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Segment a document into ordered chunks
    pub fn segment(&self, text: &str) -> Result<Vec<Chunk>> {
        chunk_text(text, self.max_chunk_size)
    }
}

/// Split text into chunks on paragraph and sentence boundaries.
///
/// Chunks are contiguous, so `text[c.start..c.end]` over all chunks
/// reproduces `text`. Each chunk's trimmed text is at most `max_chars`
/// characters long.
pub fn chunk_text(text: &str, max_chars: usize) -> Result<Vec<Chunk>> {
    if text.trim().is_empty() {
        return Err(DocsumError::empty_document("document contains no text"));
    }

    let max_chars = max_chars.max(1);
    let mut packer = Packer::new(max_chars);

    for paragraph in paragraph_ranges(text) {
        let len = char_len(text, &paragraph);
        if len <= max_chars {
            packer.push(paragraph, len);
            continue;
        }

        // Oversized paragraphs never share a chunk with their neighbours
        packer.flush();
        for sentence in sentence_ranges(text, paragraph) {
            for piece in hard_split(text, sentence, max_chars) {
                let len = char_len(text, &piece);
                packer.push(piece, len);
            }
        }
        packer.flush();
    }

    let chunks = merge_blank_ranges(text, packer.finish())
        .into_iter()
        .enumerate()
        .map(|(id, range)| Chunk::new(id, text[range.clone()].trim(), range.start, range.end))
        .collect();

    Ok(chunks)
}

/// Greedy packer over contiguous ranges
struct Packer {
    max_chars: usize,
    current: Option<(Range<usize>, usize)>,
    done: Vec<Range<usize>>,
}

impl Packer {
    fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            current: None,
            done: Vec::new(),
        }
    }

    fn push(&mut self, range: Range<usize>, len: usize) {
        match self.current.as_mut() {
            Some((current, current_len)) if *current_len + len <= self.max_chars => {
                current.end = range.end;
                *current_len += len;
            }
            Some(_) => {
                self.flush();
                self.current = Some((range, len));
            }
            None => self.current = Some((range, len)),
        }
    }

    fn flush(&mut self) {
        if let Some((range, _)) = self.current.take() {
            self.done.push(range);
        }
    }

    fn finish(mut self) -> Vec<Range<usize>> {
        self.flush();
        self.done
    }
}

fn char_len(text: &str, range: &Range<usize>) -> usize {
    text[range.clone()].chars().count()
}

/// Paragraph ranges; each includes the blank-line run that follows it
fn paragraph_ranges(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let is_inline_space = |b: u8| matches!(b, b' ' | b'\t' | b'\r');

    let mut ranges = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\n' {
            let mut j = i + 1;
            while j < bytes.len() && is_inline_space(bytes[j]) {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'\n' {
                let mut end = j + 1;
                while end < bytes.len() && (is_inline_space(bytes[end]) || bytes[end] == b'\n') {
                    end += 1;
                }
                ranges.push(start..end);
                start = end;
                i = end;
                continue;
            }
        }
        i += 1;
    }

    if start < bytes.len() {
        ranges.push(start..bytes.len());
    }

    ranges
}

/// Sentence ranges inside `range`; each includes its trailing whitespace
fn sentence_ranges(text: &str, range: Range<usize>) -> Vec<Range<usize>> {
    let slice = &text[range.clone()];
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut chars = slice.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        let boundary = ch == '\n'
            || CJK_ENDINGS.contains(&ch)
            || (LATIN_ENDINGS.contains(&ch)
                && chars.peek().map_or(true, |(_, next)| next.is_whitespace()));

        if !boundary {
            continue;
        }

        let mut end = idx + ch.len_utf8();
        while let Some(&(next_idx, next)) = chars.peek() {
            if !next.is_whitespace() {
                break;
            }
            end = next_idx + next.len_utf8();
            chars.next();
        }

        ranges.push(range.start + start..range.start + end);
        start = end;
    }

    if start < slice.len() {
        ranges.push(range.start + start..range.end);
    }

    ranges
}

/// Split a range that is longer than `max_chars` at whitespace
fn hard_split(text: &str, range: Range<usize>, max_chars: usize) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    let mut start = range.start;

    while start < range.end {
        let limit = match text[start..range.end].char_indices().nth(max_chars) {
            Some((offset, _)) => start + offset,
            None => {
                pieces.push(start..range.end);
                break;
            }
        };

        let cut = find_break_point(text, start, limit);
        pieces.push(start..cut);
        start = cut;
    }

    pieces
}

/// Find a good breaking point (after the last whitespace before `limit`)
fn find_break_point(text: &str, start: usize, limit: usize) -> usize {
    text[start..limit]
        .char_indices()
        .rev()
        .find(|(offset, c)| *offset > 0 && c.is_whitespace())
        .map(|(offset, c)| start + offset + c.len_utf8())
        .unwrap_or(limit)
}

/// Fold whitespace-only ranges into a neighbour
fn merge_blank_ranges(text: &str, ranges: Vec<Range<usize>>) -> Vec<Range<usize>> {
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    let mut leading_start = None;

    for range in ranges {
        if text[range.clone()].trim().is_empty() {
            match merged.last_mut() {
                Some(last) => last.end = range.end,
                None => {
                    leading_start.get_or_insert(range.start);
                }
            }
        } else {
            let start = leading_start.take().unwrap_or(range.start);
            merged.push(start..range.end);
        }
    }

    merged
}
