//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//

use prism_utils::bytes::{ByteRegion, Cursor};

use crate::packet::error::{Anomaly, DecodeResult};
use crate::packet::tree::Field;

// Length of the OSPFv3 authentication trailer fixed header.
pub const AUTH_TRAILER_HDR_SIZE: u16 = 16;

// Decodes the OSPFv2 cryptographic authentication trailer: the message
// digest appended after the declared packet length. The digest is recorded
// verbatim; verifying it requires key material a dissector does not have.
pub(crate) fn decode_auth_trailer_v2(
    cursor: &mut Cursor,
    auth_len: u8,
    parent: &mut Field,
) -> DecodeResult<()> {
    let wanted = auth_len as usize;
    let available = cursor.remaining();
    let region = ByteRegion::new(
        cursor.position(),
        std::cmp::min(wanted, available),
    );
    let value = cursor.take(region.length)?;
    let mut field = Field::raw("auth_data", region, value);
    if available < wanted {
        field.record(region, Anomaly::Truncated { wanted, available });
    }
    parent.push(field);
    Ok(())
}

// Decodes the OSPFv3 authentication trailer (RFC 7166): type, length,
// reserved, SA ID, 64-bit sequence number, then the message digest.
pub(crate) fn decode_auth_trailer_v3(
    cursor: &mut Cursor,
    parent: &mut Field,
) -> DecodeResult<()> {
    let start = cursor.position();

    if cursor.remaining() < AUTH_TRAILER_HDR_SIZE as usize {
        let region = cursor.remaining_region();
        let value = cursor.take(region.length)?;
        let mut field = Field::raw("auth_trailer", region, value);
        field.record(
            region,
            Anomaly::Truncated {
                wanted: AUTH_TRAILER_HDR_SIZE as usize,
                available: region.length,
            },
        );
        parent.push(field);
        return Ok(());
    }

    let mut node = Field::container("auth_trailer", ByteRegion::new(start, 0));
    let field_start = cursor.position();
    let auth_type = cursor.get_u16()?;
    node.push(Field::uint(
        "auth_type",
        cursor.region_since(field_start),
        auth_type,
    ));
    let field_start = cursor.position();
    let auth_len = cursor.get_u16()?;
    node.push(Field::uint(
        "auth_length",
        cursor.region_since(field_start),
        auth_len,
    ));
    let field_start = cursor.position();
    let reserved = cursor.get_u16()?;
    if reserved != 0 {
        node.record(
            cursor.region_since(field_start),
            Anomaly::ReservedNonZero {
                value: reserved as u32,
            },
        );
    }
    let field_start = cursor.position();
    let sa_id = cursor.get_u16()?;
    node.push(Field::uint("sa_id", cursor.region_since(field_start), sa_id));
    let field_start = cursor.position();
    let seqno = cursor.get_u64()?;
    node.push(Field::uint(
        "sequence",
        cursor.region_since(field_start),
        seqno,
    ));

    // The declared length covers the fixed header plus the digest.
    let wanted = (auth_len as usize).saturating_sub(AUTH_TRAILER_HDR_SIZE as usize);
    let available = cursor.remaining();
    let digest_len = std::cmp::min(wanted, available);
    let region = ByteRegion::new(cursor.position(), digest_len);
    let value = cursor.take(digest_len)?;
    let mut digest = Field::raw("auth_data", region, value);
    if available < wanted {
        digest.record(region, Anomaly::Truncated { wanted, available });
    }
    node.push(digest);

    node.region = ByteRegion::new(start, cursor.position() - start);
    parent.push(node);
    Ok(())
}
