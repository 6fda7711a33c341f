//! Sequential big-endian record reader.

use std::io::{ErrorKind, Read};

use crate::error::{DecodeError, DecodeResult};

/// Forward-only reader for the fixed-width and length-prefixed fields of a
/// container.
///
/// All multi-byte values are big-endian. Running out of bytes is reported as
/// [`DecodeError::Truncated`] with the offset (relative to where the reader
/// started) of the field that could not be completed.
#[derive(Debug)]
pub struct RecordReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Number of bytes consumed so far.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> DecodeResult<()> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.offset += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(DecodeError::Truncated {
                offset: self.offset,
            }),
            Err(e) => Err(DecodeError::Io(e)),
        }
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        self.read_array().map(u16::from_be_bytes)
    }

    pub fn read_i32(&mut self) -> DecodeResult<i32> {
        self.read_array().map(i32::from_be_bytes)
    }

    pub fn read_i64(&mut self) -> DecodeResult<i64> {
        self.read_array().map(i64::from_be_bytes)
    }

    pub fn read_f32(&mut self) -> DecodeResult<f32> {
        self.read_array().map(f32::from_be_bytes)
    }

    /// Read a `u16` byte-length prefixed UTF-8 string.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub fn read_string(&mut self) -> DecodeResult<String> {
        let len = usize::from(self.read_u16()?);
        let mut bytes = vec![0u8; len];
        self.read_exact(&mut bytes)?;
        Ok(String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
    }

    /// Read a count field, rejecting negative values.
    pub fn read_count(&mut self, what: &'static str) -> DecodeResult<usize> {
        let count = self.read_i32()?;
        usize::try_from(count).map_err(|_| DecodeError::InvalidCount { what, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reads_big_endian_fields() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x0102_0304_i32.to_be_bytes());
        data.extend_from_slice(&(-5_i64).to_be_bytes());
        data.push(0xff);
        data.extend_from_slice(&1.5f32.to_be_bytes());

        let mut r = RecordReader::new(data.as_slice());
        assert_eq!(r.read_i32().unwrap(), 0x0102_0304);
        assert_eq!(r.read_i64().unwrap(), -5);
        assert_eq!(r.read_u8().unwrap(), 0xff);
        assert!((r.read_f32().unwrap() - 1.5).abs() < f32::EPSILON);
        assert_eq!(r.offset(), 17);
    }

    #[test]
    fn reads_length_prefixed_string() {
        let mut data = Vec::new();
        data.extend_from_slice(&5u16.to_be_bytes());
        data.extend_from_slice(&"héllo".as_bytes()[..5]);
        let mut r = RecordReader::new(data.as_slice());
        // "hé" is 3 bytes, so the first five bytes are "héll".
        assert_eq!(r.read_string().unwrap(), "héll");
    }

    #[test]
    fn empty_string_has_no_payload() {
        let data = 0u16.to_be_bytes();
        let mut r = RecordReader::new(data.as_slice());
        assert_eq!(r.read_string().unwrap(), "");
        assert_eq!(r.offset(), 2);
    }

    #[test]
    fn truncated_read_reports_offset() {
        let data = [0u8, 0, 0, 1, 0, 0];
        let mut r = RecordReader::new(data.as_slice());
        r.read_i32().unwrap();
        match r.read_i32() {
            Err(DecodeError::Truncated { offset }) => assert_eq!(offset, 4),
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn truncated_string_payload() {
        let mut data = Vec::new();
        data.extend_from_slice(&10u16.to_be_bytes());
        data.extend_from_slice(b"abc");
        let mut r = RecordReader::new(data.as_slice());
        assert!(matches!(
            r.read_string(),
            Err(DecodeError::Truncated { offset: 2 })
        ));
    }

    #[test]
    fn negative_count_is_rejected() {
        let data = (-1_i32).to_be_bytes();
        let mut r = RecordReader::new(data.as_slice());
        assert!(matches!(
            r.read_count("volume"),
            Err(DecodeError::InvalidCount {
                what: "volume",
                count: -1
            })
        ));
    }

    proptest! {
        #[test]
        fn string_prefix_matches_payload(s in "\\PC{0,64}") {
            let bytes = s.as_bytes();
            let mut data = Vec::new();
            data.extend_from_slice(&u16::try_from(bytes.len()).unwrap().to_be_bytes());
            data.extend_from_slice(bytes);
            let mut r = RecordReader::new(data.as_slice());
            prop_assert_eq!(r.read_string().unwrap(), s.clone());
            prop_assert_eq!(r.offset(), 2 + bytes.len() as u64);
        }
    }
}
