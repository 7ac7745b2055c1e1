/// Batch size used by the prefetching decoder when none (or zero) is given.
pub const DEFAULT_PREFETCH: usize = 32;

/// Default capacity of each encoded chunk, in bytes.
pub const DEFAULT_CHUNK_CAPACITY: usize = 8192;

/// Configuration for a [`Decoder`](crate::Decoder).
///
/// # Examples
///
/// ```rust
/// use jsonflow::DecoderOptions;
///
/// let options = DecoderOptions {
///     ignore_level: 1,
///     prefetch: Some(8),
/// };
/// assert_eq!(options.prefetch_batch(), Some(8));
/// assert_eq!(DecoderOptions::default().prefetch_batch(), None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct DecoderOptions {
    /// Number of outer array or object levels unwrapped before values are
    /// emitted.
    ///
    /// With `1`, a document `[a, b, c]` decodes to the three values `a`, `b`
    /// and `c` rather than one array. Field names inside an unwrapped level
    /// are rejected.
    ///
    /// # Default
    ///
    /// `0`
    pub ignore_level: usize,

    /// Number of chunks requested ahead of need.
    ///
    /// `None` requests exactly one chunk at a time. `Some(n)` keeps up to `n`
    /// chunks buffered and asks for another `n` once that many have been
    /// consumed; `Some(0)` means [`DEFAULT_PREFETCH`].
    ///
    /// # Default
    ///
    /// `None`
    pub prefetch: Option<usize>,
}

impl DecoderOptions {
    /// The effective prefetch batch size, with zero clamped to the default.
    #[must_use]
    pub fn prefetch_batch(&self) -> Option<usize> {
        self.prefetch.map(|n| if n > 0 { n } else { DEFAULT_PREFETCH })
    }
}

/// Configuration for an [`Encoder`](crate::Encoder).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct EncoderOptions {
    /// Capacity of each emitted chunk. A single write larger than this gets a
    /// chunk of its own, sized to fit.
    ///
    /// # Default
    ///
    /// [`DEFAULT_CHUNK_CAPACITY`]
    pub chunk_capacity: usize,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
        }
    }
}
