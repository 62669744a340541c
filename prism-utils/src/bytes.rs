//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

// Region of the original input buffer a decoded entity was parsed from.
//
// Offsets are always absolute, even for entities decoded through nested
// sub-cursors, so a region can be used to index the original buffer directly.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct ByteRegion {
    pub offset: usize,
    pub length: usize,
}

// Failed buffer read: the requested span extends past the cursor's end.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Truncated {
    pub offset: usize,
    pub wanted: usize,
    pub available: usize,
}

// Bounds-tracked read position over an immutable byte buffer.
//
// A cursor never reads past its own end, and a child cursor created with
// `sub_cursor` can never read past the parent's position at creation time
// plus the requested length. The position is monotonically non-decreasing.
#[derive(Clone, Debug)]
pub struct Cursor {
    data: Bytes,
    pos: usize,
    end: usize,
}

pub type ReadResult<T> = Result<T, Truncated>;

// ===== impl ByteRegion =====

impl ByteRegion {
    pub fn new(offset: usize, length: usize) -> Self {
        ByteRegion { offset, length }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

// ===== impl Truncated =====

impl std::fmt::Display for Truncated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "truncated read at offset {}: wanted {} bytes, {} available",
            self.offset, self.wanted, self.available
        )
    }
}

impl std::error::Error for Truncated {}

// ===== impl Cursor =====

impl Cursor {
    pub fn new(data: Bytes) -> Self {
        let end = data.len();
        Cursor { data, pos: 0, end }
    }

    /// Returns the current absolute read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the absolute end of this cursor's readable span.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Returns the number of bytes left before this cursor's end.
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == self.end
    }

    /// Returns the region covering `start` up to the current position.
    pub fn region_since(&self, start: usize) -> ByteRegion {
        ByteRegion::new(start, self.pos - start)
    }

    /// Returns the region covering everything left before the end.
    pub fn remaining_region(&self) -> ByteRegion {
        ByteRegion::new(self.pos, self.remaining())
    }

    fn check(&self, wanted: usize) -> ReadResult<()> {
        if wanted > self.remaining() {
            return Err(Truncated {
                offset: self.pos,
                wanted,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Returns the next `n` bytes as a zero-copy slice and advances the
    /// position by `n`.
    pub fn take(&mut self, n: usize) -> ReadResult<Bytes> {
        self.check(n)?;
        let value = self.data.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(value)
    }

    /// Advances the position by `n` without inspecting the bytes.
    pub fn skip(&mut self, n: usize) -> ReadResult<()> {
        self.check(n)?;
        self.pos += n;
        Ok(())
    }

    /// Creates a child cursor bounded to exactly `len` bytes starting at the
    /// current position, then advances this cursor past those bytes. Whatever
    /// the child leaves unconsumed is skipped, never re-read by the parent.
    pub fn sub_cursor(&mut self, len: usize) -> ReadResult<Cursor> {
        self.check(len)?;
        let child = Cursor {
            data: self.data.clone(),
            pos: self.pos,
            end: self.pos + len,
        };
        self.pos += len;
        Ok(child)
    }

    /// Returns a read-only view of an already-delimited region of the
    /// underlying buffer, without moving the cursor. Used for checksum
    /// computations that span consumed bytes.
    pub fn peek_region(&self, region: ByteRegion) -> Option<Bytes> {
        if region.end() > self.data.len() {
            return None;
        }
        Some(self.data.slice(region.offset..region.end()))
    }

    /// Returns the next byte without advancing.
    pub fn peek_u8(&self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        Some(self.data[self.pos])
    }

    pub fn get_u8(&mut self) -> ReadResult<u8> {
        self.check(1)?;
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    pub fn get_u16(&mut self) -> ReadResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Gets an unsigned 24 bit integer in big-endian byte order.
    ///
    /// The current position is advanced by 3.
    pub fn get_u24(&mut self) -> ReadResult<u32> {
        let bytes = self.take(3)?;
        let mut n = [0; 4];
        n[1..=3].copy_from_slice(&bytes);
        Ok(u32::from_be_bytes(n))
    }

    pub fn get_u32(&mut self) -> ReadResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn get_u64(&mut self) -> ReadResult<u64> {
        let bytes = self.take(8)?;
        let mut n = [0; 8];
        n.copy_from_slice(&bytes);
        Ok(u64::from_be_bytes(n))
    }

    /// Gets an IEEE 754 single-precision float in big-endian byte order.
    pub fn get_f32(&mut self) -> ReadResult<f32> {
        Ok(f32::from_bits(self.get_u32()?))
    }

    /// Gets an IPv4 addr in big-endian byte order.
    ///
    /// The current position is advanced by 4.
    pub fn get_ipv4(&mut self) -> ReadResult<Ipv4Addr> {
        Ok(Ipv4Addr::from(self.get_u32()?))
    }

    /// Gets an optional IPv4 addr in big-endian byte order, mapping the
    /// unspecified address to `None`.
    pub fn get_opt_ipv4(&mut self) -> ReadResult<Option<Ipv4Addr>> {
        let addr = self.get_ipv4()?;
        if addr.is_unspecified() {
            Ok(None)
        } else {
            Ok(Some(addr))
        }
    }

    /// Gets an IPv6 addr in big-endian byte order.
    ///
    /// The current position is advanced by 16.
    pub fn get_ipv6(&mut self) -> ReadResult<Ipv6Addr> {
        let bytes = self.take(16)?;
        let mut n = [0; 16];
        n.copy_from_slice(&bytes);
        Ok(Ipv6Addr::from(n))
    }
}

// ===== unit tests =====
