//! Decoding of `\uXXXX` escapes, including UTF-16 surrogate pairs.
//!
//! [`UnicodeEscapeBuffer`] accumulates four hexadecimal digits as they
//! arrive, so an escape split across chunks decodes the same as a contiguous
//! one. A high surrogate is held until the following escape supplies the low
//! half.

use crate::error::SyntaxError;

#[derive(Debug, Default)]
pub(super) struct UnicodeEscapeBuffer {
    acc: u32,
    len: u8,
    high_surrogate: Option<u32>,
}

impl UnicodeEscapeBuffer {
    pub(super) fn reset(&mut self) {
        self.acc = 0;
        self.len = 0;
    }

    /// `true` while a high surrogate is waiting for its low half.
    pub(super) fn awaiting_low_surrogate(&self) -> bool {
        self.high_surrogate.is_some()
    }

    /// `true` while some but not all four digits of an escape are in.
    pub(super) fn in_progress(&self) -> bool {
        self.len > 0
    }

    /// Abandons a pending high surrogate, returning it as an error.
    pub(super) fn unpaired(&mut self) -> Option<SyntaxError> {
        self.high_surrogate
            .take()
            .map(SyntaxError::InvalidUnicodeEscapeSequence)
    }

    #[inline]
    fn hex_val(b: u8) -> Option<u32> {
        match b {
            b'0'..=b'9' => Some(u32::from(b - b'0')),
            b'a'..=b'f' => Some(u32::from(b - b'a') + 10),
            b'A'..=b'F' => Some(u32::from(b - b'A') + 10),
            _ => None,
        }
    }

    /// Feeds one hex digit.
    ///
    /// - `Ok(None)` while the escape (or surrogate pair) is incomplete.
    /// - `Ok(Some(ch))` once a full scalar value has been decoded.
    /// - `Err` on a non-hex digit, a lone low surrogate, or a high surrogate
    ///   followed by anything but a low surrogate.
    pub(super) fn feed(&mut self, b: u8) -> Result<Option<char>, SyntaxError> {
        let d = Self::hex_val(b).ok_or(SyntaxError::InvalidUnicodeEscapeChar(char::from(b)))?;
        self.acc = (self.acc << 4) | d;
        self.len += 1;
        if self.len < 4 {
            return Ok(None);
        }

        let code = self.acc;
        self.reset();

        match (self.high_surrogate.take(), code) {
            (None, 0xD800..=0xDBFF) => {
                self.high_surrogate = Some(code);
                Ok(None)
            }
            (Some(high), 0xDC00..=0xDFFF) => {
                let scalar = 0x10000 + ((high - 0xD800) << 10) + (code - 0xDC00);
                char::from_u32(scalar)
                    .map(Some)
                    .ok_or(SyntaxError::InvalidUnicodeEscapeSequence(scalar))
            }
            (Some(high), _) => Err(SyntaxError::InvalidUnicodeEscapeSequence(high)),
            (None, _) => char::from_u32(code)
                .map(Some)
                .ok_or(SyntaxError::InvalidUnicodeEscapeSequence(code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(buf: &mut UnicodeEscapeBuffer, digits: &str) -> Result<Option<char>, SyntaxError> {
        let mut last = Ok(None);
        for b in digits.bytes() {
            last = buf.feed(b);
            if last.is_err() {
                break;
            }
        }
        last
    }

    #[test]
    fn basic_decoding() {
        let mut buf = UnicodeEscapeBuffer::default();
        assert_eq!(feed_all(&mut buf, "0041"), Ok(Some('A')));
        assert_eq!(feed_all(&mut buf, "AbCd"), Ok(char::from_u32(0xABCD)));
    }

    #[test]
    fn surrogate_pair() {
        let mut buf = UnicodeEscapeBuffer::default();
        assert_eq!(feed_all(&mut buf, "D83D"), Ok(None));
        assert!(buf.awaiting_low_surrogate());
        assert_eq!(feed_all(&mut buf, "DE00"), Ok(Some('😀')));
        assert!(!buf.awaiting_low_surrogate());
    }

    #[test]
    fn lone_low_surrogate_errors() {
        let mut buf = UnicodeEscapeBuffer::default();
        assert_eq!(
            feed_all(&mut buf, "DC00"),
            Err(SyntaxError::InvalidUnicodeEscapeSequence(0xDC00))
        );
    }

    #[test]
    fn high_surrogate_without_low_errors() {
        let mut buf = UnicodeEscapeBuffer::default();
        let _ = feed_all(&mut buf, "D800");
        assert_eq!(
            feed_all(&mut buf, "0041"),
            Err(SyntaxError::InvalidUnicodeEscapeSequence(0xD800))
        );
    }

    #[test]
    fn invalid_hex_error() {
        let mut buf = UnicodeEscapeBuffer::default();
        assert_eq!(buf.feed(b'G'), Err(SyntaxError::InvalidUnicodeEscapeChar('G')));
    }
}
