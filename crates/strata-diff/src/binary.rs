//! Binary content detection.
//!
//! Content is binary when it is larger than the text size limit or when a
//! NUL byte appears within the first `sniff_len` bytes. Both checks depend on
//! the bytes alone, so the verdict is the same on every run.

/// Files larger than this are never line-diffed (50 MiB).
pub const MAX_TEXT_SIZE: u64 = 50 << 20;

/// Number of leading bytes scanned for NUL.
pub const SNIFF_LEN: usize = 8000;

/// Returns `true` if `data` should be treated as binary.
pub fn is_binary(data: &[u8], max_text_size: u64, sniff_len: usize) -> bool {
    if data.len() as u64 > max_text_size {
        return true;
    }
    let sample = &data[..data.len().min(sniff_len)];
    sample.contains(&0)
}
