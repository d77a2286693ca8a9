//! Split article text into model-sized chunks.
//!
//! Chunks never exceed `max_chars` characters. Breaks prefer a newline, then
//! the end of a sentence, then any whitespace; a run with none of those is
//! split hard. Offsets are in characters so they line up with the spans the
//! resolver reports.

/// A slice of the document and where it starts, in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub char_offset: usize,
}

const SENTENCE_ENDS: [char; 4] = ['.', '!', '?', '।'];

pub fn chunk_text(text: &str, max_chars: usize) -> Vec<Chunk> {
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let end = if chars.len() - pos <= max_chars {
            chars.len()
        } else {
            pos + break_point(&chars[pos..pos + max_chars])
        };
        let piece: String = chars[pos..end].iter().collect();
        if !piece.trim().is_empty() {
            chunks.push(Chunk {
                text: piece,
                char_offset: pos,
            });
        }
        pos = end;
    }
    chunks
}

/// Length of the prefix of `window` to emit as one chunk.
fn break_point(window: &[char]) -> usize {
    if let Some(i) = window.iter().rposition(|&c| c == '\n') {
        if i > 0 {
            return i + 1;
        }
    }
    let sentence_end = window
        .windows(2)
        .rposition(|w| SENTENCE_ENDS.contains(&w[0]) && w[1].is_whitespace());
    if let Some(i) = sentence_end {
        return i + 2;
    }
    if let Some(i) = window.iter().rposition(|c| c.is_whitespace()) {
        if i > 0 {
            return i + 1;
        }
    }
    window.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejoin(chunks: &[Chunk]) -> String {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("Short article.", 1000);
        assert_eq!(
            chunks,
            vec![Chunk {
                text: "Short article.".into(),
                char_offset: 0
            }]
        );
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunk_text("", 100).is_empty());
        assert!(chunk_text("  \n ", 100).is_empty());
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let text = "First paragraph here.\nSecond paragraph here.";
        let chunks = chunk_text(text, 30);
        assert_eq!(chunks[0].text, "First paragraph here.\n");
        assert_eq!(chunks[1].char_offset, 22);
        assert_eq!(rejoin(&chunks), text);
    }

    #[test]
    fn test_falls_back_to_sentence_then_word() {
        let text = "One two. Three four five six";
        let chunks = chunk_text(text, 12);
        assert_eq!(chunks[0].text, "One two. ");
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 12));
        assert_eq!(rejoin(&chunks), text);
    }

    #[test]
    fn test_hard_splits_long_token() {
        let text = "abcdefghij";
        let chunks = chunk_text(text, 4);
        let lens: Vec<_> = chunks.iter().map(|c| c.text.len()).collect();
        assert_eq!(lens, vec![4, 4, 2]);
        assert_eq!(chunks[2].char_offset, 8);
    }

    #[test]
    fn test_offsets_count_characters_not_bytes() {
        let text = "बचत खाते। ब्याज दर बढ़ी।";
        let chunks = chunk_text(text, 10);
        for chunk in &chunks {
            let expected: String = text
                .chars()
                .skip(chunk.char_offset)
                .take(chunk.text.chars().count())
                .collect();
            assert_eq!(chunk.text, expected);
        }
        assert_eq!(rejoin(&chunks), text);
    }
}
