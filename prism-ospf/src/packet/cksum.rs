//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::IpAddr;

use internet_checksum::Checksum;
use serde::{Deserialize, Serialize};

// IP protocol number assigned to OSPF.
pub(crate) const IP_PROTO_OSPF: u8 = 89;

// Result of verifying a declared checksum against the computed one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum ChecksumStatus {
    Match,
    Mismatch { expected: u16 },
}

// Computes the ones-complement checksum over a list of byte regions.
//
// The regions are summed as one contiguous stream, so a checksum field can be
// excluded by splitting around it and substituting zeros.
pub(crate) fn compute(regions: &[&[u8]]) -> u16 {
    let mut cksum = Checksum::new();
    for region in regions {
        cksum.add_bytes(region);
    }
    u16::from_be_bytes(cksum.checksum())
}

// Compares the checksum carried by the message against the computed one.
pub fn verify(declared: u16, expected: u16) -> ChecksumStatus {
    if declared == expected {
        ChecksumStatus::Match
    } else {
        ChecksumStatus::Mismatch { expected }
    }
}

// Builds the pseudo-header prepended to the message for the OSPFv3 checksum:
// source address, destination address, upper-layer length, and the OSPF
// protocol number.
pub(crate) fn pseudo_header(
    src_addr: &IpAddr,
    dst_addr: &IpAddr,
    upper_len: u32,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(40);
    match src_addr {
        IpAddr::V4(addr) => buf.extend(addr.octets()),
        IpAddr::V6(addr) => buf.extend(addr.octets()),
    }
    match dst_addr {
        IpAddr::V4(addr) => buf.extend(addr.octets()),
        IpAddr::V6(addr) => buf.extend(addr.octets()),
    }
    buf.extend(upper_len.to_be_bytes());
    buf.extend([0, 0, 0, IP_PROTO_OSPF]);
    buf
}

// Checks the Fletcher checksum embedded in an LSA. The sum over the LSA bytes
// starting past the age field is zero when the checksum is intact.
pub(crate) fn fletcher_valid(data: &[u8]) -> bool {
    fletcher::calc_fletcher16(data) == 0
}

// Computes the expected Fletcher check bytes for an LSA. `data` holds the LSA
// bytes starting past the age field; the embedded checksum sits at offset 14
// and is zeroed before summing.
pub(crate) fn fletcher_expected(data: &[u8]) -> u16 {
    let mut data = data.to_vec();
    if data.len() < 16 {
        return 0;
    }
    data[14..16].copy_from_slice(&[0, 0]);

    let checksum = fletcher::calc_fletcher16(&data);
    let mut checkbyte0 = (checksum & 0x00ff) as i32;
    let mut checkbyte1 = ((checksum >> 8) & 0x00ff) as i32;

    // Adjust checksum value using the scaling factor (the checksum field
    // starts 15 bytes into the summed data).
    let sop = data.len() as i32 - 15;
    let mut x = (sop * checkbyte0 - checkbyte1) % 255;
    if x <= 0 {
        x += 255;
    }
    checkbyte1 = 510 - checkbyte0 - x;
    if checkbyte1 > 255 {
        checkbyte1 -= 255;
    }
    checkbyte0 = x;
    u16::from_be_bytes([checkbyte0 as u8, checkbyte1 as u8])
}

// ===== unit tests =====
