//! Deterministic text segmentation.
//!
//! Splits a document's raw text into [`Chunk`]s bounded by a configurable
//! `max_chunk_size` (counted in characters, never bytes). Splitting prefers
//! paragraph boundaries (`\n\n`) to preserve semantic coherence, falling
//! back to sentence boundaries and finally to fixed-size slices.
//!
//! # Algorithm
//!
//! 1. Normalize whitespace: CR/CRLF → LF, runs of horizontal whitespace →
//!    one space, runs of blank lines → one blank line, trim ends. Fewer
//!    than [`MIN_DOCUMENT_CHARS`] normalized characters is an error.
//! 2. If the normalized text fits in `max_chunk_size`, return one chunk.
//! 3. Otherwise split on paragraph boundaries and greedily pack consecutive
//!    paragraphs into a chunk while the running length stays within the
//!    limit.
//! 4. A paragraph that alone exceeds the limit (including a document with
//!    no paragraph breaks at all) is split on sentence boundaries
//!    (`.?!` runs) and packed the same way.
//! 5. A single sentence that exceeds the limit is hard-split into slices of
//!    exactly `max_chunk_size` characters (the last slice may be shorter).
//!    This is the only point where a chunk boundary may fall inside a word.
//! 6. Chunks shorter than [`MIN_CHUNK_CHARS`] are discarded as noise,
//!    except when that would leave zero chunks — then the last chunk is
//!    kept anyway.
//!
//! Chunks come back in original document order with contiguous indices.
//! The whole pass is pure: the same input always yields the same chunks.

use crate::error::SegmentError;
use crate::models::Chunk;

/// Minimum normalized document length; anything shorter is rejected.
pub const MIN_DOCUMENT_CHARS: usize = 10;

/// Chunks shorter than this are dropped as noise (unless they are all we have).
pub const MIN_CHUNK_CHARS: usize = 20;

/// Split `text` into chunks of at most `max_chunk_size` characters.
///
/// # Errors
///
/// Returns [`SegmentError::EmptyInput`] when the normalized text has fewer
/// than [`MIN_DOCUMENT_CHARS`] characters.
pub fn segment(text: &str, max_chunk_size: usize) -> Result<Vec<Chunk>, SegmentError> {
    let normalized = normalize(text);
    if char_len(&normalized) < MIN_DOCUMENT_CHARS {
        return Err(SegmentError::EmptyInput);
    }

    let pieces = if char_len(&normalized) <= max_chunk_size {
        vec![normalized]
    } else {
        pack_paragraphs(&normalized, max_chunk_size)
    };

    Ok(apply_noise_floor(pieces)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk { index, text })
        .collect())
}

/// Normalize whitespace ahead of segmentation.
///
/// Line endings are unified to `\n`, runs of horizontal whitespace inside a
/// line collapse to a single space, lines are trimmed, runs of blank lines
/// collapse to a single blank line, and the ends are trimmed.
pub fn normalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    let mut pending_blank = false;
    for line in unified.split('\n') {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            pending_blank = true;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if pending_blank { "\n\n" } else { "\n" });
        }
        pending_blank = false;
        out.push_str(&collapsed);
    }
    out
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Greedily pack paragraphs into pieces of at most `max` characters.
///
/// Paragraphs within a piece are re-joined with `\n\n`. A paragraph that
/// alone exceeds `max` is handed to the sentence packer.
fn pack_paragraphs(text: &str, max: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut buf = String::new();

    for para in text.split("\n\n") {
        let para = para.trim();
        if para.is_empty() {
            continue;
        }
        let para_len = char_len(para);

        if para_len > max {
            if !buf.is_empty() {
                pieces.push(std::mem::take(&mut buf));
            }
            pieces.extend(pack_sentences(para, max));
            continue;
        }

        let would_be = if buf.is_empty() {
            para_len
        } else {
            char_len(&buf) + 2 + para_len
        };
        if would_be > max && !buf.is_empty() {
            pieces.push(std::mem::take(&mut buf));
        }
        if !buf.is_empty() {
            buf.push_str("\n\n");
        }
        buf.push_str(para);
    }

    if !buf.is_empty() {
        pieces.push(buf);
    }
    pieces
}

/// Greedily pack sentences into pieces of at most `max` characters.
///
/// Sentences within a piece are re-joined with a single space. A sentence
/// that alone exceeds `max` is hard-split as a last resort.
fn pack_sentences(text: &str, max: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut buf = String::new();

    for sentence in split_sentences(text) {
        let sentence_len = char_len(&sentence);

        if sentence_len > max {
            if !buf.is_empty() {
                pieces.push(std::mem::take(&mut buf));
            }
            pieces.extend(hard_split(&sentence, max));
            continue;
        }

        let would_be = if buf.is_empty() {
            sentence_len
        } else {
            char_len(&buf) + 1 + sentence_len
        };
        if would_be > max && !buf.is_empty() {
            pieces.push(std::mem::take(&mut buf));
        }
        if !buf.is_empty() {
            buf.push(' ');
        }
        buf.push_str(&sentence);
    }

    if !buf.is_empty() {
        pieces.push(buf);
    }
    pieces
}

/// Split on sentence-terminating punctuation runs (`.`, `?`, `!`).
///
/// A run of terminators stays attached to the sentence it closes, so
/// `"Really?!"` comes back as one sentence.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let is_terminator = matches!(c, '.' | '?' | '!');
        let run_ends = !matches!(chars.peek(), Some('.') | Some('?') | Some('!'));
        if is_terminator && run_ends {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    sentences
}

/// Slice into pieces of exactly `max` characters; the last may be shorter.
fn hard_split(text: &str, max: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max.max(1))
        .map(|slice| slice.iter().collect())
        .collect()
}

/// Drop pieces below the noise floor, keeping the last one if nothing
/// would survive.
fn apply_noise_floor(mut pieces: Vec<String>) -> Vec<String> {
    if pieces.iter().all(|p| char_len(p) < MIN_CHUNK_CHARS) {
        return pieces.pop().into_iter().collect();
    }
    pieces.retain(|p| char_len(p) >= MIN_CHUNK_CHARS);
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    fn non_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = segment("Hello. World is big.", 500).unwrap();
        assert_eq!(texts(&chunks), vec!["Hello. World is big."]);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_empty_and_short_inputs_rejected() {
        assert_eq!(segment("", 500), Err(SegmentError::EmptyInput));
        assert_eq!(segment("   \n\n \t ", 500), Err(SegmentError::EmptyInput));
        assert_eq!(segment("too short", 500), Err(SegmentError::EmptyInput));
    }

    #[test]
    fn test_normalize_line_endings_and_runs() {
        let normalized = normalize("alpha  \t beta\r\n\r\n\r\n\r\ngamma   delta\r\n");
        assert_eq!(normalized, "alpha beta\n\ngamma delta");
    }

    #[test]
    fn test_normalize_is_a_fixpoint() {
        let once = normalize("  a\r\nb\n\n\n\nc  d  ");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_three_equal_paragraphs_one_each() {
        let para = "x".repeat(300);
        let text = format!("{para}\n\n{para}\n\n{para}");
        let chunks = segment(&text, 500).unwrap();
        // Any pair of 300-char paragraphs joined by "\n\n" exceeds 500.
        assert_eq!(texts(&chunks), vec![para.as_str(); 3]);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
        }
    }

    #[test]
    fn test_paragraphs_pack_greedily() {
        let text = "First paragraph with some words in it.\n\nSecond paragraph, also modest.\n\nThird paragraph rounds things out nicely.";
        let chunks = segment(&text, 500).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("First paragraph"));
        assert!(chunks[0].text.contains("Third paragraph"));
    }

    #[test]
    fn test_no_paragraph_breaks_falls_back_to_sentences() {
        let sentence = "This sentence talks about one of the forty topics covered here.";
        let text = sentence.repeat(10).replace(".T", ". T");
        assert!(text.chars().count() > 200);
        let chunks = segment(&text, 200).unwrap();
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.text.chars().count() <= 200);
            // sentence packing never splits inside a word
            assert!(c.text.ends_with('.'));
        }
    }

    #[test]
    fn test_giant_sentence_hard_split_exact_slices() {
        let text: String = "x".repeat(1050);
        let chunks = segment(&text, 100).unwrap();
        assert_eq!(chunks.len(), 11);
        for c in &chunks[..10] {
            assert_eq!(c.text.chars().count(), 100);
        }
        assert_eq!(chunks[10].text.chars().count(), 50);
    }

    #[test]
    fn test_no_character_lost_or_duplicated() {
        let text = "Alpha paragraph has several words.\n\nBeta paragraph follows with more words.\n\nGamma paragraph closes the document with a final thought.";
        let chunks = segment(text, 60).unwrap();
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(non_whitespace(&joined), non_whitespace(&normalize(text)));
    }

    #[test]
    fn test_noise_floor_drops_short_chunks() {
        // A tiny trailing paragraph that cannot pack into the previous chunk.
        let long = "a".repeat(495);
        let text = format!("{}\n\nok bye.", long);
        let chunks = segment(&text, 500).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, long);
    }

    #[test]
    fn test_noise_floor_keeps_last_when_all_short() {
        let chunks = segment("only twelve c", 500).unwrap();
        assert_eq!(texts(&chunks), vec!["only twelve c"]);
    }

    #[test]
    fn test_multibyte_counts_chars_not_bytes() {
        let text: String = "é".repeat(120);
        let chunks = segment(&text, 50).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text.chars().count(), 50);
        assert_eq!(chunks[2].text.chars().count(), 20);
    }

    #[test]
    fn test_deterministic_and_idempotent() {
        let text = "One paragraph with enough words to matter.\n\nAnother paragraph that also has plenty of words inside.\n\nA third paragraph to force at least one boundary decision.";
        let first = segment(text, 80).unwrap();
        let second = segment(text, 80).unwrap();
        assert_eq!(first, second);

        let rejoined: String = first
            .iter()
            .map(|c| c.text.clone())
            .collect::<Vec<_>>()
            .join("\n\n");
        let again = segment(&rejoined, 80).unwrap();
        assert_eq!(texts(&again), texts(&first));
    }
}
