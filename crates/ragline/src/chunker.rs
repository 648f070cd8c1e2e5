//! Fixed-width text chunking.
//!
//! Chunks are measured in `char`s, so a boundary never lands inside a UTF-8
//! sequence. Word and sentence boundaries are ignored.

use crate::errors::{EmbeddingError, Result};

/// Chunk size used when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Split `input` into consecutive, non-overlapping slices of `chunk_size`
/// characters. The last slice may be shorter. Empty input yields no chunks.
pub fn chunk_text(input: &str, chunk_size: usize) -> Result<Vec<&str>> {
    if chunk_size == 0 {
        return Err(EmbeddingError::InvalidArgument(
            "chunk size must be greater than zero".into(),
        ));
    }

    let mut chunks = Vec::with_capacity(input.len() / chunk_size + 1);
    let mut start = 0;
    let mut count = 0;
    for (offset, _) in input.char_indices() {
        if count == chunk_size {
            chunks.push(&input[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    if start < input.len() {
        chunks.push(&input[start..]);
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_input_no_chunks() {
        assert!(chunk_text("", 10).unwrap().is_empty());
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let err = chunk_text("abc", 0).unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidArgument(_)));
    }

    #[test]
    fn exact_multiple() {
        assert_eq!(chunk_text("abcdef", 3).unwrap(), vec!["abc", "def"]);
    }

    #[test]
    fn short_tail() {
        assert_eq!(chunk_text("abcdefg", 3).unwrap(), vec!["abc", "def", "g"]);
    }

    #[test]
    fn input_shorter_than_chunk() {
        assert_eq!(chunk_text("hi", 1000).unwrap(), vec!["hi"]);
    }

    #[test]
    fn splits_words() {
        assert_eq!(
            chunk_text("hello world", 4).unwrap(),
            vec!["hell", "o wo", "rld"]
        );
    }

    #[test]
    fn multibyte_boundaries() {
        let chunks = chunk_text("héllo wörld ✓", 2).unwrap();
        assert_eq!(chunks, vec!["hé", "ll", "o ", "wö", "rl", "d ", "✓"]);
    }

    #[test]
    fn default_chunk_size() {
        let input = "x".repeat(2500);
        let chunks = chunk_text(&input, DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 500);
    }

    proptest! {
        #[test]
        fn concatenation_reproduces_input(input in "\\PC{1,300}", size in 1usize..64) {
            let chunks = chunk_text(&input, size).unwrap();
            prop_assert_eq!(chunks.concat(), input);
        }

        #[test]
        fn chunk_lengths(input in "\\PC{1,300}", size in 1usize..64) {
            let chunks = chunk_text(&input, size).unwrap();
            let total = input.chars().count();
            let (last, rest) = chunks.split_last().unwrap();
            for chunk in rest {
                prop_assert_eq!(chunk.chars().count(), size);
            }
            let expected_last = if total % size == 0 { size } else { total % size };
            prop_assert_eq!(last.chars().count(), expected_last);
            prop_assert_eq!(chunks.len(), total.div_ceil(size));
        }
    }
}
