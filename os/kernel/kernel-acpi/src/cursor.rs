//! Bounds-checked reading of firmware structures.

use crate::AcpiError;

/// A read position over a byte slice.
///
/// Reads are little-endian and unaligned. A read that would pass the end of
/// the slice fails with [`AcpiError::Truncated`] and leaves the cursor where
/// it was.
#[derive(Debug, Clone)]
pub struct TableCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> TableCursor<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// The unread tail.
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }

    /// Takes the next `len` bytes.
    ///
    /// # Errors
    /// [`AcpiError::Truncated`] if fewer than `len` bytes remain.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], AcpiError> {
        let end = self.pos.checked_add(len).ok_or(AcpiError::Truncated)?;
        let bytes = self.bytes.get(self.pos..end).ok_or(AcpiError::Truncated)?;
        self.pos = end;
        Ok(bytes)
    }

    /// # Errors
    /// [`AcpiError::Truncated`] if fewer than `len` bytes remain.
    pub fn skip(&mut self, len: usize) -> Result<(), AcpiError> {
        self.take(len).map(drop)
    }

    /// # Errors
    /// [`AcpiError::Truncated`] if fewer than `N` bytes remain.
    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], AcpiError> {
        let bytes = self.take(N)?;
        bytes.try_into().map_err(|_| AcpiError::Truncated)
    }

    /// # Errors
    /// [`AcpiError::Truncated`] at the end of the slice.
    pub fn read_u8(&mut self) -> Result<u8, AcpiError> {
        self.read_bytes::<1>().map(|[b]| b)
    }

    /// # Errors
    /// [`AcpiError::Truncated`] if fewer than 2 bytes remain.
    pub fn read_u16(&mut self) -> Result<u16, AcpiError> {
        self.read_bytes().map(u16::from_le_bytes)
    }

    /// # Errors
    /// [`AcpiError::Truncated`] if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> Result<u32, AcpiError> {
        self.read_bytes().map(u32::from_le_bytes)
    }

    /// # Errors
    /// [`AcpiError::Truncated`] if fewer than 8 bytes remain.
    pub fn read_u64(&mut self) -> Result<u64, AcpiError> {
        self.read_bytes().map(u64::from_le_bytes)
    }
}

/// Walks variable-length records laid out back to back.
///
/// `record_length` reports the total length of the record at the start of the
/// slice it is given, or `None` if the record header itself is unreadable.
/// The walk ends at the end of `bytes`. A record that reports a zero length or
/// runs past the end yields a single [`AcpiError::Truncated`] and ends the walk.
///
/// The iterator is lazy and can be restarted by cloning it before use.
pub const fn walk_by_length<F>(bytes: &[u8], record_length: F) -> Records<'_, F>
where
    F: Fn(&[u8]) -> Option<usize>,
{
    Records {
        rest: bytes,
        record_length,
        align: 1,
        done: false,
    }
}

/// Iterator returned by [`walk_by_length`].
#[derive(Debug, Clone)]
pub struct Records<'a, F> {
    rest: &'a [u8],
    record_length: F,
    align: usize,
    done: bool,
}

impl<F> Records<'_, F> {
    /// Starts every record after the first on a multiple of `align` bytes,
    /// measured from the start of the walk.
    #[must_use]
    pub fn aligned(self, align: usize) -> Self {
        Self {
            align: align.max(1),
            ..self
        }
    }
}

impl<'a, F> Iterator for Records<'a, F>
where
    F: Fn(&[u8]) -> Option<usize>,
{
    type Item = Result<&'a [u8], AcpiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.rest.is_empty() {
            return None;
        }

        let len = match (self.record_length)(self.rest) {
            Some(len) if len > 0 && len <= self.rest.len() => len,
            _ => {
                self.done = true;
                return Some(Err(AcpiError::Truncated));
            }
        };

        let record = &self.rest[..len];
        let advance = len.next_multiple_of(self.align).min(self.rest.len());
        self.rest = &self.rest[advance..];
        Some(Ok(record))
    }
}

/// Length of an ACPI interrupt-controller or affinity structure:
/// `{type: u8, length: u8, ...}`. The length covers this 2-byte header.
pub fn structure_length(bytes: &[u8]) -> Option<usize> {
    bytes
        .get(1)
        .map(|&len| usize::from(len))
        .filter(|&len| len >= 2)
}
