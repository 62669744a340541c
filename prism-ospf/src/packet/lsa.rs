//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use prism_utils::bytes::{ByteRegion, Cursor};

use crate::packet::cksum;
use crate::packet::error::{Anomaly, DecodeResult};
use crate::packet::tree::Field;
use crate::packet::DecodeCtx;
use crate::version::Version;

// LSA header size, identical for both OSPF versions.
pub const LSA_HDR_LENGTH: u16 = 20;

// Control data pulled out of an LSA header while its fields are emitted.
#[derive(Clone, Copy, Debug)]
pub struct LsaHdr {
    pub ls_type: u16,
    pub lsa_id: Ipv4Addr,
    pub cksum: u16,
    pub length: u16,
}

// Decodes the LSA list of a Link State Update: a 32-bit count followed by
// that many full LSAs.
pub(crate) fn decode_ls_update<V>(
    cursor: &mut Cursor,
    parent: &mut Field,
    ctx: &DecodeCtx,
) -> DecodeResult<()>
where
    V: Version,
{
    let start = cursor.position();
    let count = cursor.get_u32()?;
    parent.push(Field::uint("lsa_count", cursor.region_since(start), count));

    for _ in 0..count {
        if cursor.is_empty() {
            parent.record(
                cursor.remaining_region(),
                Anomaly::MissingElement {
                    what: "advertised LSA".to_owned(),
                },
            );
            break;
        }
        if !decode_lsa::<V>(cursor, parent, ctx)? {
            break;
        }
    }
    Ok(())
}

// Decodes a run of bare LSA headers (Database Description, LS Ack).
pub(crate) fn decode_lsa_hdr_list<V>(
    cursor: &mut Cursor,
    parent: &mut Field,
) -> DecodeResult<()>
where
    V: Version,
{
    while cursor.remaining() >= LSA_HDR_LENGTH as usize {
        let start = cursor.position();
        let mut node = Field::container(
            "lsa_header",
            ByteRegion::new(start, LSA_HDR_LENGTH as usize),
        );
        V::decode_lsa_hdr(cursor, &mut node)?;
        parent.push(node);
    }
    Ok(())
}

// Decodes one full LSA: header, per-type minimum-length gate, Fletcher
// checksum annotation, then the type-dispatched body inside a bounded
// cursor.
//
// Returns false when the declared length overruns the remaining buffer and
// the LSA sequence cannot be resynchronized; the remainder has then been
// consumed. In every other case, including a rejected body, the cursor lands
// exactly on `start + declared length` so the next sibling decodes cleanly.
pub(crate) fn decode_lsa<V>(
    cursor: &mut Cursor,
    parent: &mut Field,
    ctx: &DecodeCtx,
) -> DecodeResult<bool>
where
    V: Version,
{
    let start = cursor.position();

    // Not even a full header left.
    if cursor.remaining() < LSA_HDR_LENGTH as usize {
        let region = cursor.remaining_region();
        let value = cursor.take(region.length)?;
        let mut field = Field::raw("truncated_lsa", region, value);
        field.record(
            region,
            Anomaly::Truncated {
                wanted: LSA_HDR_LENGTH as usize,
                available: region.length,
            },
        );
        parent.push(field);
        return Ok(false);
    }

    let mut node = Field::container(
        "lsa",
        ByteRegion::new(start, LSA_HDR_LENGTH as usize),
    );
    let hdr = V::decode_lsa_hdr(cursor, &mut node)?;
    let length_region = ByteRegion::new(start + 18, 2);

    // Reject bodies below the per-type minimum before trying to decode them.
    // The declared length is still trusted for skipping to the next LSA.
    let min_length = V::lsa_min_length(hdr.ls_type);
    if hdr.length < min_length {
        node.record(
            length_region,
            Anomaly::BadLength {
                declared: hdr.length as u32,
                minimum: min_length as u32,
            },
        );
        let declared_body = hdr.length.saturating_sub(LSA_HDR_LENGTH) as usize;
        if declared_body > cursor.remaining() {
            let region = cursor.remaining_region();
            let value = cursor.take(region.length)?;
            node.push(Field::raw("body", region, value));
            node.region = ByteRegion::new(start, cursor.position() - start);
            parent.push(node);
            return Ok(false);
        }
        if declared_body > 0 {
            let region = ByteRegion::new(cursor.position(), declared_body);
            let value = cursor.take(declared_body)?;
            node.push(Field::raw("body", region, value));
        }
        node.region = ByteRegion::new(start, cursor.position() - start);
        parent.push(node);
        return Ok(true);
    }

    let declared_body = (hdr.length - LSA_HDR_LENGTH) as usize;
    if declared_body > cursor.remaining() {
        node.record(
            cursor.remaining_region(),
            Anomaly::Truncated {
                wanted: declared_body,
                available: cursor.remaining(),
            },
        );
        let region = cursor.remaining_region();
        let value = cursor.take(region.length)?;
        node.push(Field::raw("body", region, value));
        node.region = ByteRegion::new(start, cursor.position() - start);
        parent.push(node);
        return Ok(false);
    }

    // Verify the Fletcher checksum over everything past the age field. A
    // zero checksum field marks a deliberately unchecksummed LSA and is
    // skipped.
    if hdr.cksum != 0 {
        let span = ByteRegion::new(start + 2, hdr.length as usize - 2);
        if let Some(bytes) = cursor.peek_region(span) {
            if !cksum::fletcher_valid(&bytes) {
                node.record(
                    ByteRegion::new(start + 16, 2),
                    Anomaly::ChecksumMismatch {
                        declared: hdr.cksum,
                        expected: cksum::fletcher_expected(&bytes),
                    },
                );
            }
        }
    }

    // Decode the body inside its own bounded cursor. A failing body decoder
    // marks this LSA only; the cursor has already advanced past the declared
    // length.
    let mut body_cursor = cursor.sub_cursor(declared_body)?;
    if declared_body > 0 {
        match V::decode_lsa_body(
            hdr.ls_type,
            hdr.lsa_id,
            &mut body_cursor,
            &mut node,
            ctx,
        ) {
            Ok(()) => {
                if !body_cursor.is_empty() {
                    let region = body_cursor.remaining_region();
                    let value = body_cursor.take(region.length)?;
                    node.push(Field::raw("trailing_data", region, value));
                }
            }
            Err(error) => match error.demote() {
                Some(anomaly) => {
                    node.record(body_cursor.remaining_region(), anomaly);
                    if !body_cursor.is_empty() {
                        let region = body_cursor.remaining_region();
                        let value = body_cursor.take(region.length)?;
                        node.push(Field::raw("unparsed", region, value));
                    }
                }
                None => return Err(error),
            },
        }
    }

    node.region = ByteRegion::new(start, hdr.length as usize);
    parent.push(node);
    Ok(true)
}
