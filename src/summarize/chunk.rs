/// Characters per chunk when nothing else is configured.
pub const DEFAULT_MAX_CHARS: usize = 3000;

/// Splits `text` into contiguous, non-overlapping slices of `max_chars`
/// characters (the last may be shorter), in order, from offset 0.
///
/// Lengths count Unicode scalar values, so a slice never splits a code point.
/// Empty text yields no chunks.
///
/// # Panics
///
/// If `max_chars` is zero.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    assert!(max_chars > 0, "max_chars must be positive");

    let mut chunks = Vec::with_capacity(text.len() / max_chars + 1);
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected_count(text: &str, max_chars: usize) -> usize {
        text.chars().count().div_ceil(max_chars)
    }

    #[test]
    fn test_chunks_reassemble_to_original() {
        let samples = [
            "a",
            "hello world",
            "決算公告から分析する長い文書です。",
            "mixed ascii and 日本語 and emoji 🦀🦀 text",
        ];
        for text in samples {
            for max_chars in [1, 2, 3, 7, 100] {
                let chunks = chunk_text(text, max_chars);
                assert_eq!(chunks.concat(), text, "max_chars={}", max_chars);
                assert_eq!(chunks.len(), expected_count(text, max_chars));
            }
        }
    }

    #[test]
    fn test_all_but_last_are_full() {
        let text = "x".repeat(7000);
        let chunks = chunk_text(&text, 3000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 3000);
        assert_eq!(chunks[1].len(), 3000);
        assert_eq!(chunks[2].len(), 1000);
    }

    #[test]
    fn test_exact_multiple_has_no_empty_tail() {
        let text = "ab".repeat(3000);
        let chunks = chunk_text(&text, 3000);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.chars().count() == 3000));
    }

    #[test]
    fn test_multibyte_counts_characters() {
        let text = "あいうえおかきくけこ";
        let chunks = chunk_text(text, 3);
        assert_eq!(chunks, vec!["あいう", "えおか", "きくけ", "こ"]);
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        assert_eq!(chunk_text("short", 3000), vec!["short"]);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("", 3000).is_empty());
    }

    #[test]
    #[should_panic(expected = "max_chars must be positive")]
    fn test_zero_max_chars_panics() {
        chunk_text("abc", 0);
    }
}
