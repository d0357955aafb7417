//! Little-endian byte cursors used by every codec in this crate.
//!
//! [`Reader`] and [`Writer`] carry a sticky first error: once an operation
//! fails, every later operation is a no-op that returns a zero value. Decoders
//! stay straight-line and the first fault is reported once, by
//! [`Reader::finish`] or [`Writer::finish`].

/// A fault raised by a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Not enough bytes remained to satisfy a read.
    #[error("insufficient bytes")]
    InsufficientBytes,
    /// A field held a value the decoder cannot accept.
    #[error("invalid field: {0}")]
    Invalid(&'static str),
}

/// A bounded cursor over a byte slice.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    err: Option<WireError>,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            err: None,
        }
    }

    /// Remaining unread bytes.
    pub fn len(&self) -> usize {
        if self.err.is_some() {
            0
        } else {
            self.data.len() - self.pos
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn err(&self) -> Option<WireError> {
        self.err
    }

    /// Record `err` unless an earlier fault is already sticking.
    pub fn set_err(&mut self, err: WireError) {
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    /// Consume the cursor, reporting the first fault if one occurred.
    pub fn finish(self) -> Result<(), WireError> {
        match self.err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.err.is_some() {
            return None;
        }
        if self.data.len() - self.pos < n {
            self.set_err(WireError::InsufficientBytes);
            return None;
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Some(out)
    }

    /// Read exactly `n` bytes, or stick [`WireError::InsufficientBytes`].
    pub fn read_bytes(&mut self, n: usize) -> &'a [u8] {
        self.take(n).unwrap_or(&[])
    }

    /// Read everything that remains.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let n = self.len();
        self.read_bytes(n)
    }

    pub fn read_array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        if let Some(bytes) = self.take(N) {
            out.copy_from_slice(bytes);
        }
        out
    }

    /// Split off an independent reader over the next `n` bytes, advancing
    /// this one past them. Sub-decoders handed a fork cannot overrun their
    /// region.
    pub fn fork(&mut self, n: usize) -> Reader<'a> {
        match self.take(n) {
            Some(region) => Reader::new(region),
            None => Reader {
                data: &[],
                pos: 0,
                err: Some(WireError::InsufficientBytes),
            },
        }
    }

    pub fn read_u8(&mut self) -> u8 {
        self.take(1).map(|b| b[0]).unwrap_or(0)
    }

    pub fn read_u16(&mut self) -> u16 {
        self.take(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .unwrap_or(0)
    }

    pub fn read_u32(&mut self) -> u32 {
        self.take(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .unwrap_or(0)
    }

    pub fn read_u64(&mut self) -> u64 {
        self.take(8)
            .map(|b| {
                u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
            })
            .unwrap_or(0)
    }

    pub fn read_i8(&mut self) -> i8 {
        self.read_u8() as i8
    }

    pub fn read_i16(&mut self) -> i16 {
        self.read_u16() as i16
    }

    pub fn read_i32(&mut self) -> i32 {
        self.read_u32() as i32
    }

    /// Big-endian read, used only by the ASF framing.
    pub fn read_u32_be(&mut self) -> u32 {
        self.take(4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            .unwrap_or(0)
    }
}

/// A growable output buffer with the same sticky-error discipline.
pub struct Writer {
    buf: Vec<u8>,
    err: Option<WireError>,
}

impl Writer {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
            err: None,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn err(&self) -> Option<WireError> {
        self.err
    }

    pub fn set_err(&mut self, err: WireError) {
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Drop everything after the first `n` bytes. Used when a region is
    /// re-encoded in place, e.g. after encryption.
    pub fn truncate(&mut self, n: usize) {
        self.buf.truncate(n);
    }

    pub fn finish(self) -> Result<Vec<u8>, WireError> {
        match self.err {
            Some(e) => Err(e),
            None => Ok(self.buf),
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.err.is_none() {
            self.buf.extend_from_slice(bytes);
        }
    }

    pub fn write_u8(&mut self, v: u8) {
        if self.err.is_none() {
            self.buf.push(v);
        }
    }

    pub fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_i8(&mut self, v: i8) {
        self.write_u8(v as u8);
    }

    pub fn write_i16(&mut self, v: i16) {
        self.write_u16(v as u16);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_u32(v as u32);
    }

    /// Big-endian write, used only by the ASF framing.
    pub fn write_u32_be(&mut self, v: u32) {
        self.write_bytes(&v.to_be_bytes());
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

/// A value that knows how to serialise itself onto a [`Writer`].
pub trait Encode {
    fn encode(&self, w: &mut Writer);
}

/// A value that knows how to parse itself from a [`Reader`].
///
/// Implementations never fail directly; they read through the cursor and let
/// the sticky error carry the outcome.
pub trait Decode: Sized {
    fn decode(r: &mut Reader<'_>) -> Self;
}

impl Encode for () {
    fn encode(&self, _: &mut Writer) {}
}

impl Decode for () {
    fn decode(_: &mut Reader<'_>) -> Self {}
}

pub fn to_bytes<T: Encode>(value: &T) -> Result<Vec<u8>, WireError> {
    let mut w = Writer::new();
    value.encode(&mut w);
    w.finish()
}

pub fn from_bytes<T: Decode>(data: &[u8]) -> Result<T, WireError> {
    let mut r = Reader::new(data);
    let value = T::decode(&mut r);
    r.finish()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sticky_error_halts_reads() {
        let mut r = Reader::new(&[0x01, 0x02]);
        assert_eq!(r.read_u8(), 0x01);
        assert_eq!(r.read_u32(), 0);
        assert_eq!(r.err(), Some(WireError::InsufficientBytes));
        // Once stuck, even a satisfiable read returns a zero value.
        assert_eq!(r.read_u8(), 0);
        assert!(r.finish().is_err());
    }

    #[test]
    fn little_endian_round_trip() {
        let mut w = Writer::new();
        w.write_u8(0xAB);
        w.write_u16(0x1234);
        w.write_u32(0xDEADBEEF);
        w.write_i16(-2);
        let bytes = w.finish().unwrap();

        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_u8(), 0xAB);
        assert_eq!(r.read_u16(), 0x1234);
        assert_eq!(r.read_u32(), 0xDEADBEEF);
        assert_eq!(r.read_i16(), -2);
        assert!(r.finish().is_ok());
    }

    #[test]
    fn fork_bounds_the_sub_decoder() {
        let mut r = Reader::new(&[1, 2, 3, 4, 5]);
        let mut sub = r.fork(3);
        assert_eq!(sub.read_bytes(3), &[1, 2, 3]);
        assert_eq!(sub.read_u8(), 0);
        assert!(sub.finish().is_err());

        // The parent advanced past the forked region.
        assert_eq!(r.read_u8(), 4);
    }

    #[test]
    fn fork_past_the_end_is_an_error() {
        let mut r = Reader::new(&[1, 2]);
        let sub = r.fork(5);
        assert!(sub.finish().is_err());
        assert_eq!(r.err(), Some(WireError::InsufficientBytes));
    }

    #[test]
    fn truncate_discards_a_scratch_region() {
        let mut w = Writer::new();
        w.write_bytes(&[1, 2, 3, 4]);
        w.truncate(2);
        w.write_u8(9);
        assert_eq!(w.bytes(), &[1, 2, 9]);
    }
}
