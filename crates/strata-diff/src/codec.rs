//! Line-id codec: maps dense line ids onto single Unicode scalar values.
//!
//! A character-oriented diff algorithm treats every scalar as one atomic
//! symbol. Encoding each interned line id as a scalar turns a file into a
//! short pseudo-text with one symbol per line, so the same algorithm can be
//! reused unmodified for line-mode diffs.
//!
//! Ids are packed by magnitude into the 1, 2, 3 or 4 byte UTF-8 forms. The
//! 3-byte tier skips the surrogate block and excludes its top three values
//! (U+FFFD..=U+FFFF); the 4-byte tier is shifted past both. Every packed form
//! is run back through the standard UTF-8 decoder before it is returned.

use crate::error::CodecError;

const ONE_BYTE_BITS: u32 = 7;
const TWO_BYTE_BITS: u32 = 11;
const THREE_BYTE_BITS: u32 = 16;
const FOUR_BYTE_BITS: u32 = 21;

const SURROGATE_START: u32 = 0xD800;
const SURROGATE_END: u32 = 0xDFFF;
const SURROGATE_LEN: u32 = SURROGATE_END - SURROGATE_START + 1;

/// Top values of the 3-byte range that are never produced.
const TIER3_EXCLUDED: u32 = 3;

/// Exclusive upper bound of the 1-byte tier.
pub const TIER1_MAX: u32 = 1 << ONE_BYTE_BITS;
/// Exclusive upper bound of the 2-byte tier.
pub const TIER2_MAX: u32 = 1 << TWO_BYTE_BITS;
/// Exclusive upper bound of the 3-byte tier.
pub const TIER3_MAX: u32 = (1 << THREE_BYTE_BITS) - SURROGATE_LEN - TIER3_EXCLUDED;
/// Exclusive upper bound of the raw 4-byte tier.
///
/// Ids between [`LINE_ID_LIMIT`] and this bound pack into byte sequences
/// above U+10FFFF and are rejected by the decoder self-check.
pub const TIER4_MAX: u32 = (1 << FOUR_BYTE_BITS) - SURROGATE_LEN - TIER3_EXCLUDED;

/// Number of encodable line ids: every id in `0..LINE_ID_LIMIT` round-trips.
pub const LINE_ID_LIMIT: u32 = char::MAX as u32 + 1 - SURROGATE_LEN - TIER3_EXCLUDED;

fn bits(value: u32, count: u32, from: u32) -> u8 {
    ((value >> from) & ((1 << count) - 1)) as u8
}

/// Decode `units` as exactly one scalar value, or `None`.
fn single_scalar(units: &[u8]) -> Option<char> {
    let text = std::str::from_utf8(units).ok()?;
    let mut chars = text.chars();
    let c = chars.next()?;
    if chars.next().is_some() || c == char::REPLACEMENT_CHARACTER {
        return None;
    }
    Some(c)
}

/// Encode a line id as a single scalar value.
pub fn encode_line_id(id: u32) -> Result<char, CodecError> {
    let mut units = [0u8; 4];
    let len = if id < TIER1_MAX {
        units[0] = id as u8;
        1
    } else if id < TIER2_MAX {
        units[0] = 0b1100_0000 | bits(id, 5, 6);
        units[1] = 0b1000_0000 | bits(id, 6, 0);
        2
    } else if id < TIER3_MAX {
        let v = if id >= SURROGATE_START {
            id + SURROGATE_LEN
        } else {
            id
        };
        units[0] = 0b1110_0000 | bits(v, 4, 12);
        units[1] = 0b1000_0000 | bits(v, 6, 6);
        units[2] = 0b1000_0000 | bits(v, 6, 0);
        3
    } else if id < TIER4_MAX {
        let v = id + SURROGATE_LEN + TIER3_EXCLUDED;
        units[0] = 0b1111_0000 | bits(v, 3, 18);
        units[1] = 0b1000_0000 | bits(v, 6, 12);
        units[2] = 0b1000_0000 | bits(v, 6, 6);
        units[3] = 0b1000_0000 | bits(v, 6, 0);
        4
    } else {
        return Err(CodecError::OutOfRange(id));
    };

    single_scalar(&units[..len]).ok_or(CodecError::OutOfRange(id))
}

/// Decode a scalar produced by [`encode_line_id`] back to its line id.
pub fn decode_line_id(c: char) -> Result<u32, CodecError> {
    let mut buf = [0u8; 4];
    let units = c.encode_utf8(&mut buf).as_bytes();
    let b = |i: usize, mask: u8| u32::from(units[i] & mask);

    let id = match units.len() {
        1 => b(0, 0b0111_1111),
        2 => (b(0, 0b1_1111) << 6) | b(1, 0b11_1111),
        3 => {
            let raw = (b(0, 0b1111) << 12) | (b(1, 0b11_1111) << 6) | b(2, 0b11_1111);
            if raw >= TIER3_MAX + SURROGATE_LEN {
                return Err(CodecError::InvalidScalar(c));
            }
            if raw > SURROGATE_END {
                raw - SURROGATE_LEN
            } else {
                raw
            }
        }
        _ => {
            let raw = (b(0, 0b111) << 18)
                | (b(1, 0b11_1111) << 12)
                | (b(2, 0b11_1111) << 6)
                | b(3, 0b11_1111);
            raw - SURROGATE_LEN - TIER3_EXCLUDED
        }
    };
    Ok(id)
}

/// Encode a sequence of line ids into a pseudo-text, one scalar per id.
pub fn encode_ids(ids: &[u32]) -> Result<String, CodecError> {
    ids.iter().copied().map(encode_line_id).collect()
}

/// Decode every scalar of a pseudo-text back into line ids.
pub fn decode_text(text: &str) -> Result<Vec<u32>, CodecError> {
    text.chars().map(decode_line_id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn width(id: u32) -> usize {
        encode_line_id(id).unwrap().len_utf8()
    }

    #[test]
    fn tier_constants() {
        assert_eq!(TIER1_MAX, 128);
        assert_eq!(TIER2_MAX, 2048);
        assert_eq!(TIER3_MAX, 63_485);
        assert_eq!(TIER4_MAX, 2_095_101);
        assert_eq!(LINE_ID_LIMIT, 1_112_061);
    }

    #[test]
    fn tier_boundaries_are_exact() {
        assert_eq!(width(0), 1);
        assert_eq!(width(127), 1);
        assert_eq!(width(128), 2);
        assert_eq!(width(2047), 2);
        assert_eq!(width(2048), 3);
        assert_eq!(width(TIER3_MAX - 1), 3);
        assert_eq!(width(TIER3_MAX), 4);
        assert_eq!(width(LINE_ID_LIMIT - 1), 4);
    }

    #[test]
    fn surrogate_block_is_skipped() {
        assert_eq!(encode_line_id(0xD7FF).unwrap(), '\u{D7FF}');
        assert_eq!(encode_line_id(0xD800).unwrap(), '\u{E000}');
        assert_eq!(encode_line_id(TIER3_MAX - 1).unwrap(), '\u{FFFC}');
        assert_eq!(encode_line_id(TIER3_MAX).unwrap(), '\u{10000}');
        assert_eq!(encode_line_id(LINE_ID_LIMIT - 1).unwrap(), char::MAX);
    }

    #[test]
    fn out_of_domain_ids_fail() {
        for id in [LINE_ID_LIMIT, LINE_ID_LIMIT + 1, TIER4_MAX - 1, TIER4_MAX, u32::MAX] {
            assert_eq!(encode_line_id(id), Err(CodecError::OutOfRange(id)));
        }
    }

    #[test]
    fn excluded_scalars_do_not_decode() {
        for c in ['\u{FFFD}', '\u{FFFE}', '\u{FFFF}'] {
            assert_eq!(decode_line_id(c), Err(CodecError::InvalidScalar(c)));
        }
    }

    #[test]
    fn whole_domain_is_monotonic_and_avoids_reserved_values() {
        let mut prev: Option<u32> = None;
        for id in 0..LINE_ID_LIMIT {
            let c = encode_line_id(id).unwrap();
            let v = u32::from(c);
            assert!(!(0xD800..=0xDFFF).contains(&v), "id {id} hit a surrogate");
            assert!(!(0xFFFD..=0xFFFF).contains(&v), "id {id} hit an excluded value");
            if let Some(p) = prev {
                assert!(v > p, "encoding is not strictly increasing at {id}");
            }
            prev = Some(v);
            assert_eq!(decode_line_id(c).unwrap(), id);
        }
    }

    #[test]
    fn pseudo_text_roundtrip() {
        let ids = [0, 5, 200, 0xD800, 70_000, 5];
        let text = encode_ids(&ids).unwrap();
        assert_eq!(text.chars().count(), ids.len());
        assert_eq!(decode_text(&text).unwrap(), ids);
    }

    #[test]
    fn pseudo_text_rejects_overflow() {
        assert_eq!(
            encode_ids(&[1, LINE_ID_LIMIT]),
            Err(CodecError::OutOfRange(LINE_ID_LIMIT))
        );
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(id in 0..LINE_ID_LIMIT) {
            let c = encode_line_id(id).unwrap();
            prop_assert_eq!(decode_line_id(c).unwrap(), id);
        }

        #[test]
        fn encode_never_wraps(id in LINE_ID_LIMIT..=u32::MAX) {
            prop_assert_eq!(encode_line_id(id), Err(CodecError::OutOfRange(id)));
        }
    }
}
