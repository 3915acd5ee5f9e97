//! Decoding blob bytes into text for line diffing.
//!
//! With canonical transcoding enabled, byte-order marks are honored and
//! content that is not valid UTF-8 is run through `chardetng` to guess its
//! legacy encoding before `encoding_rs` converts it. Without it, invalid
//! sequences are replaced with U+FFFD.

use std::borrow::Cow;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use tracing::debug;

/// Decode `data` as text, optionally transcoding to canonical UTF-8.
pub fn decode_text(data: &[u8], to_canonical: bool) -> Cow<'_, str> {
    if to_canonical {
        to_canonical_utf8(data)
    } else {
        String::from_utf8_lossy(data)
    }
}

/// Convert `data` from its detected encoding to UTF-8, without a BOM.
pub fn to_canonical_utf8(data: &[u8]) -> Cow<'_, str> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(data) {
        let (text, _) = encoding.decode_without_bom_handling(&data[bom_len..]);
        return text;
    }
    if let Ok(text) = std::str::from_utf8(data) {
        return Cow::Borrowed(text);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(data, true);
    let encoding = detector.guess(None, true);
    let (text, had_errors) = encoding.decode_without_bom_handling(data);
    debug!(encoding = encoding.name(), had_errors, "transcoded blob to UTF-8");
    text
}
