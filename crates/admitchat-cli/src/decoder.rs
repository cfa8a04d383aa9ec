//! Incremental UTF-8 decoding for chunked byte streams.

use std::char::REPLACEMENT_CHARACTER;

/// Decodes a byte stream chunk by chunk.
///
/// A character whose bytes straddle a chunk boundary is held back until the
/// rest of it arrives. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning all text that is complete so far.
    pub fn decode(&mut self, input: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(input);

        let mut out = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Incomplete character at the end: wait for more bytes.
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush at end of stream. A dangling partial character becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        REPLACEMENT_CHARACTER.to_string()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_in_pieces(bytes: &[u8], split_points: &[usize]) -> String {
        let mut decoder = Utf8StreamDecoder::new();
        let mut out = String::new();
        let mut start = 0;
        for &point in split_points {
            out.push_str(&decoder.decode(&bytes[start..point]));
            start = point;
        }
        out.push_str(&decoder.decode(&bytes[start..]));
        out.push_str(&decoder.finish());
        out
    }

    #[test]
    fn test_ascii_passes_through() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"You typically"), "You typically");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_every_split_of_multibyte_text_is_lossless() {
        // 2-, 3- and 4-byte characters.
        let text = "é – 🎓 résumé";
        let bytes = text.as_bytes();
        for point in 1..bytes.len() {
            assert_eq!(decode_in_pieces(bytes, &[point]), text, "split at {}", point);
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let text = "Ünïcödé 🎓 essays";
        let bytes = text.as_bytes();
        let points: Vec<usize> = (1..bytes.len()).collect();
        assert_eq!(decode_in_pieces(bytes, &points), text);
    }

    #[test]
    fn test_held_back_bytes_are_not_emitted_early() {
        let bytes = "🎓".as_bytes();
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&bytes[..2]), "");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(&bytes[2..]), "🎓");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_invalid_bytes_become_replacement() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"ok \xff done"), "ok \u{fffd} done");
    }

    #[test]
    fn test_finish_flushes_truncated_character() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&"é".as_bytes()[..1]), "");
        assert_eq!(decoder.finish(), "\u{fffd}");
        assert_eq!(decoder.finish(), "");
    }
}
