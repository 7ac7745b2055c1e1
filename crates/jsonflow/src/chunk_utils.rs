//! Helpers for cutting payloads into chunks in tests, benches and fuzzing.

use bytes::Bytes;

/// Splits `payload` into `parts` chunks of roughly equal size.
///
/// Cuts fall on arbitrary byte offsets, so multi-byte characters may be
/// split between chunks.
///
/// # Panics
///
/// Panics if `parts` is zero.
#[must_use]
pub fn produce_chunks(payload: &[u8], parts: usize) -> Vec<Bytes> {
    assert!(parts > 0);
    let chunk_size = payload.len().div_ceil(parts).max(1);
    payload.chunks(chunk_size).map(Bytes::copy_from_slice).collect()
}

/// Splits `payload` at sizes derived from `seed`, each chunk at least one
/// byte long.
#[must_use]
pub fn split_with_seed(payload: &[u8], seed: u64) -> Vec<Bytes> {
    let mut chunks = Vec::new();
    let mut state = seed | 1;
    let mut rest = payload;
    while !rest.is_empty() {
        // xorshift64
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let size = usize::try_from(state % rest.len() as u64).unwrap_or(0) + 1;
        let (chunk, tail) = rest.split_at(size);
        chunks.push(Bytes::copy_from_slice(chunk));
        rest = tail;
    }
    chunks
}

/// Splits `payload` at the given sizes, taken modulo what remains. Whatever
/// is left after the last size becomes the final chunk.
#[must_use]
pub fn split_at_sizes(payload: &[u8], sizes: &[usize]) -> Vec<Bytes> {
    let mut chunks = Vec::new();
    let mut rest = payload;
    for size in sizes {
        if rest.is_empty() {
            break;
        }
        let (chunk, tail) = rest.split_at(1 + size % rest.len());
        chunks.push(Bytes::copy_from_slice(chunk));
        rest = tail;
    }
    if !rest.is_empty() {
        chunks.push(Bytes::copy_from_slice(rest));
    }
    chunks
}
