//! Deterministic line segmentation for the handwriting renderer.
//!
//! The renderer consumes whole lines, so wrapping happens server-side before
//! invocation: words are packed greedily up to a per-line character budget,
//! and only words that cannot fit on a line by themselves are hard-split into
//! budget-width chunks. Exact whitespace run lengths are not preserved; words
//! are re-joined with single spaces. The output is a pure function of
//! `(text, max_chars)`.

use std::num::NonZeroUsize;

/// Per-line character budget accepted by the handwriting renderer.
pub const MAX_LINE_CHARS: usize = 75;

/// Split `text` into render-ready lines of at most `max_chars` characters.
///
/// Words (maximal non-whitespace runs) stay intact whenever possible; a word
/// longer than the budget flushes any pending partial line and is split into
/// consecutive `max_chars`-character chunks, the last of which may be shorter.
/// Lengths are Unicode scalar counts, never bytes. Whitespace-only input
/// produces an empty sequence.
pub fn segment_text(text: &str, max_chars: NonZeroUsize) -> Vec<String> {
    let max_chars = max_chars.get();
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            flush(&mut lines, &mut current, &mut current_len);
            split_oversized(&mut lines, word, max_chars);
            continue;
        }

        let packed_len = if current_len == 0 {
            word_len
        } else {
            current_len + 1 + word_len
        };

        if packed_len <= max_chars {
            if current_len > 0 {
                current.push(' ');
            }
            current.push_str(word);
            current_len = packed_len;
        } else {
            flush(&mut lines, &mut current, &mut current_len);
            current.push_str(word);
            current_len = word_len;
        }
    }

    flush(&mut lines, &mut current, &mut current_len);
    lines
}

fn flush(lines: &mut Vec<String>, current: &mut String, current_len: &mut usize) {
    if *current_len > 0 {
        lines.push(std::mem::take(current));
        *current_len = 0;
    }
}

fn split_oversized(lines: &mut Vec<String>, word: &str, max_chars: usize) {
    let mut chunk = String::new();
    let mut chunk_len = 0usize;

    for ch in word.chars() {
        chunk.push(ch);
        chunk_len += 1;
        if chunk_len == max_chars {
            lines.push(std::mem::take(&mut chunk));
            chunk_len = 0;
        }
    }

    if chunk_len > 0 {
        lines.push(chunk);
    }
}
