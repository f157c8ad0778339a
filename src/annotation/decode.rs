//! Text decoding with an ordered chain of candidate encodings.
//!
//! The detector's guess is tried first, then the fixed fallbacks
//! UTF-8, GBK, ISO-8859-1 and Latin-1. Decoding is strict: a candidate that
//! meets malformed input fails instead of substituting replacement
//! characters.

use crate::util::{PrepError, PrepResult};
use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use std::borrow::Cow;

/// One decoder in the candidate chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextEncoding {
    /// Whatever the detector guessed for this input.
    Detected(&'static Encoding),
    Utf8,
    Gbk,
    /// Byte-to-code-point mapping `0xNN -> U+00NN`.
    Iso8859_1,
    /// Same mapping as `Iso8859_1`, listed separately as in the fallback chain.
    Latin1,
}

/// Fallback encodings tried after the detected one, in order.
pub const FALLBACK_ENCODINGS: [TextEncoding; 4] = [
    TextEncoding::Utf8,
    TextEncoding::Gbk,
    TextEncoding::Iso8859_1,
    TextEncoding::Latin1,
];

impl TextEncoding {
    /// Human-readable label.
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Detected(enc) => enc.name(),
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Gbk => "gbk",
            TextEncoding::Iso8859_1 => "iso-8859-1",
            TextEncoding::Latin1 => "latin-1",
        }
    }

    /// Strictly decodes `bytes`, returning `None` on malformed input.
    pub fn decode<'b>(&self, bytes: &'b [u8]) -> Option<Cow<'b, str>> {
        match self {
            TextEncoding::Detected(enc) => {
                enc.decode_without_bom_handling_and_without_replacement(bytes)
            }
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
            TextEncoding::Gbk => {
                encoding_rs::GBK.decode_without_bom_handling_and_without_replacement(bytes)
            }
            TextEncoding::Iso8859_1 | TextEncoding::Latin1 => {
                Some(Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()))
            }
        }
    }
}

/// Guesses the encoding of `bytes` from their statistics.
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

/// The full chain for `bytes`: detected guess first, then the fallbacks.
pub fn candidate_chain(bytes: &[u8]) -> Vec<TextEncoding> {
    let mut chain = Vec::with_capacity(FALLBACK_ENCODINGS.len() + 1);
    chain.push(TextEncoding::Detected(detect_encoding(bytes)));
    chain.extend_from_slice(&FALLBACK_ENCODINGS);
    chain
}

/// Tries `candidates` in order and returns the first value `accept` produces.
///
/// A candidate succeeds only if it decodes strictly and `accept` returns
/// `Some` for the text. Fails with `UndecodableFile` when every candidate is
/// exhausted.
pub fn decode_with<T, F>(
    candidates: &[TextEncoding],
    bytes: &[u8],
    mut accept: F,
) -> PrepResult<(T, TextEncoding)>
where
    F: FnMut(&str) -> Option<T>,
{
    for &candidate in candidates {
        if let Some(value) = candidate.decode(bytes).and_then(|text| accept(&text)) {
            return Ok((value, candidate));
        }
    }
    Err(PrepError::UndecodableFile)
}

/// Decodes `bytes` into text using the full candidate chain.
pub fn decode_text(bytes: &[u8]) -> PrepResult<(String, TextEncoding)> {
    decode_with(&candidate_chain(bytes), bytes, |text| Some(text.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::{decode_text, decode_with, TextEncoding, FALLBACK_ENCODINGS};
    use crate::util::PrepError;

    #[test]
    fn utf8_is_borrowed_and_exact() {
        let text = "{\"name\": \"碗\"}";
        let decoded = TextEncoding::Utf8.decode(text.as_bytes()).unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn latin1_maps_every_byte() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let decoded = TextEncoding::Iso8859_1.decode(&bytes).unwrap();
        assert_eq!(decoded.chars().count(), 256);
        assert_eq!(decoded.chars().nth(0xE9), Some('é'));
    }

    #[test]
    fn gbk_rejects_truncated_sequence() {
        assert!(TextEncoding::Gbk.decode(&[b'a', 0xB5]).is_none());
        assert_eq!(TextEncoding::Gbk.decode(&[0xCD, 0xEB]).unwrap(), "碗");
    }

    #[test]
    fn fallbacks_run_in_order() {
        // 0xE9 followed by a quote is neither UTF-8 nor GBK.
        let bytes = b"caf\xe9\"";
        let (text, used) =
            decode_with(&FALLBACK_ENCODINGS, bytes, |t| Some(t.to_owned())).unwrap();
        assert_eq!(used, TextEncoding::Iso8859_1);
        assert_eq!(text, "café\"");
    }

    #[test]
    fn rejection_by_accept_moves_to_next_candidate() {
        let mut seen = Vec::new();
        let err = decode_with(&FALLBACK_ENCODINGS, b"plain", |t| {
            seen.push(t.to_owned());
            None::<()>
        })
        .unwrap_err();
        assert_eq!(err, PrepError::UndecodableFile);
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn chain_decodes_utf8_text() {
        let (text, _) = decode_text("{\"a\": 1}".as_bytes()).unwrap();
        assert_eq!(text, "{\"a\": 1}");
    }
}
