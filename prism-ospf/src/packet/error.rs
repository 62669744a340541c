//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//

use prism_utils::bytes::{ByteRegion, Truncated};
use serde::{Deserialize, Serialize};

// Type aliases.
pub type DecodeResult<T> = Result<T, DecodeError>;

// Decode errors that abort the message being decoded.
//
// Everything else a hostile or damaged buffer can contain is demoted to a
// `Diagnostic` on the nearest enclosing field and decoding continues with the
// next sibling structure.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum DecodeError {
    Truncated {
        offset: usize,
        wanted: usize,
        available: usize,
    },
    UnsupportedVersion(u8),
    UnknownPacketType(u8),
    InvalidLength(u16),
    RecursionLimit(u8),
}

// Severity of a structural anomaly.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

// Structural anomaly found while decoding.
//
// Anomalies never unwind past the LSA/TLV that contains them; they are
// recorded on the nearest enclosing field node.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum Anomaly {
    Truncated {
        wanted: usize,
        available: usize,
    },
    TruncatedTlv {
        declared: u16,
        available: usize,
    },
    BadLength {
        declared: u32,
        minimum: u32,
    },
    UnknownType {
        code: u16,
    },
    ChecksumMismatch {
        declared: u16,
        expected: u16,
    },
    ReservedNonZero {
        value: u32,
    },
    MissingElement {
        what: String,
    },
}

// A recorded anomaly: severity, location, and message.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub region: ByteRegion,
    pub anomaly: Anomaly,
}

// ===== impl DecodeError =====

impl DecodeError {
    // Converts a recoverable error into the anomaly recorded on the field
    // that contains it. Fatal errors return `None` and keep propagating.
    pub(crate) fn demote(&self) -> Option<Anomaly> {
        match *self {
            DecodeError::Truncated {
                wanted, available, ..
            } => Some(Anomaly::Truncated { wanted, available }),
            DecodeError::InvalidLength(length) => Some(Anomaly::BadLength {
                declared: length as u32,
                minimum: 0,
            }),
            DecodeError::UnsupportedVersion(_)
            | DecodeError::UnknownPacketType(_)
            | DecodeError::RecursionLimit(_) => None,
        }
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Truncated {
                offset,
                wanted,
                available,
            } => {
                write!(
                    f,
                    "truncated message at offset {}: wanted {} bytes, {} available",
                    offset, wanted, available
                )
            }
            DecodeError::UnsupportedVersion(version) => {
                write!(f, "unsupported version: {}", version)
            }
            DecodeError::UnknownPacketType(pkt_type) => {
                write!(f, "unknown packet type: {}", pkt_type)
            }
            DecodeError::InvalidLength(pkt_len) => {
                write!(f, "invalid packet length: {}", pkt_len)
            }
            DecodeError::RecursionLimit(max_depth) => {
                write!(f, "recursion limit exceeded: {}", max_depth)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<Truncated> for DecodeError {
    fn from(error: Truncated) -> DecodeError {
        DecodeError::Truncated {
            offset: error.offset,
            wanted: error.wanted,
            available: error.available,
        }
    }
}

// ===== impl Anomaly =====

impl Anomaly {
    pub fn severity(&self) -> Severity {
        match self {
            Anomaly::Truncated { .. }
            | Anomaly::TruncatedTlv { .. }
            | Anomaly::BadLength { .. } => Severity::Error,
            Anomaly::ChecksumMismatch { .. }
            | Anomaly::ReservedNonZero { .. }
            | Anomaly::MissingElement { .. } => Severity::Warning,
            Anomaly::UnknownType { .. } => Severity::Note,
        }
    }
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::Truncated { wanted, available } => {
                write!(
                    f,
                    "truncated: wanted {} bytes, {} available",
                    wanted, available
                )
            }
            Anomaly::TruncatedTlv {
                declared,
                available,
            } => {
                write!(
                    f,
                    "TLV length {} exceeds the {} bytes left in its container",
                    declared, available
                )
            }
            Anomaly::BadLength { declared, minimum } => {
                write!(
                    f,
                    "invalid length {}, expected at least {}",
                    declared, minimum
                )
            }
            Anomaly::UnknownType { code } => {
                write!(f, "unknown type code: {}", code)
            }
            Anomaly::ChecksumMismatch { declared, expected } => {
                write!(
                    f,
                    "checksum mismatch: 0x{:04x}, should be 0x{:04x}",
                    declared, expected
                )
            }
            Anomaly::ReservedNonZero { value } => {
                write!(f, "reserved field is non-zero: {}", value)
            }
            Anomaly::MissingElement { what } => {
                write!(f, "missing required element: {}", what)
            }
        }
    }
}

// ===== impl Diagnostic =====

impl Diagnostic {
    pub fn new(region: ByteRegion, anomaly: Anomaly) -> Diagnostic {
        Diagnostic {
            severity: anomaly.severity(),
            region,
            anomaly,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:?}] at {}..{}: {}",
            self.severity,
            self.region.offset,
            self.region.end(),
            self.anomaly
        )
    }
}
