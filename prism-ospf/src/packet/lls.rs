//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//

use bitflags::bitflags;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use prism_utils::bytes::{ByteRegion, Cursor};

use crate::packet::cksum::{self, ChecksumStatus};
use crate::packet::error::{Anomaly, DecodeResult};
use crate::packet::tlv::{decode_tlvs, TlvDispatch, TlvHandler};
use crate::packet::tree::Field;
use crate::packet::DecodeCtx;

// LLS header size.
pub const LLS_HDR_SIZE: u16 = 4;

// LLS TLV types.
//
// IANA Registry:
// https://www.iana.org/assignments/ospf-lls-tlvs/ospf-lls-tlvs.xhtml
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(FromPrimitive)]
pub enum LlsTlvType {
    ExtendedOptionsFlags = 1,
    CryptoAuth = 2,
}

// Extended Options and Flags.
//
// IANA Registry:
// https://www.iana.org/assignments/ospf-lls-tlvs/ospf-lls-tlvs.xhtml#ospf-lls-tlvs-2
bitflags! {
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct ExtendedOptionsFlags: u32 {
        const LR = 0x00000001;
        const RS = 0x00000002;
    }
}

static LLS_TLVS: TlvDispatch = TlvDispatch { lookup: lls_lookup };

// Decodes the link-local signaling data block that trails the main message
// body: a ones-complement checksum, a length in 32-bit words covering the
// whole block, and a TLV sequence.
pub(crate) fn decode_lls_block(
    cursor: &mut Cursor,
    parent: &mut Field,
    ctx: &DecodeCtx,
) -> DecodeResult<()> {
    let start = cursor.position();

    if cursor.remaining() < LLS_HDR_SIZE as usize {
        let region = cursor.remaining_region();
        let value = cursor.take(region.length)?;
        let mut field = Field::raw("lls", region, value);
        field.record(
            region,
            Anomaly::Truncated {
                wanted: LLS_HDR_SIZE as usize,
                available: region.length,
            },
        );
        parent.push(field);
        return Ok(());
    }

    let mut node = Field::container("lls", ByteRegion::new(start, 0));
    let cksum_region = ByteRegion::new(start, 2);
    let lls_cksum = cursor.get_u16()?;
    node.push(Field::uint("checksum", cksum_region, lls_cksum));
    let length_region = ByteRegion::new(start + 2, 2);
    let lls_len = cursor.get_u16()?;
    node.push(Field::uint("length", length_region, lls_len));

    // The length is expressed in 32-bit words and includes the header.
    let declared = (lls_len as usize * 4).saturating_sub(LLS_HDR_SIZE as usize);
    let body_len = std::cmp::min(declared, cursor.remaining());
    if body_len < declared {
        node.record(
            cursor.remaining_region(),
            Anomaly::Truncated {
                wanted: declared,
                available: body_len,
            },
        );
    }
    let mut body_cursor = cursor.sub_cursor(body_len)?;

    // The block checksum covers the whole block with its own field zeroed,
    // so summing everything past the field yields the expected value. A zero
    // field means cryptographic authentication covers the block instead.
    if lls_cksum != 0 && body_len == declared {
        let span = ByteRegion::new(start + 2, 2 + body_len);
        if let Some(bytes) = cursor.peek_region(span) {
            match cksum::verify(lls_cksum, cksum::compute(&[&bytes])) {
                ChecksumStatus::Match => {
                    node.push(Field::str(
                        "checksum_status",
                        cksum_region,
                        "correct",
                    ));
                }
                ChecksumStatus::Mismatch { expected } => {
                    node.record(
                        cksum_region,
                        Anomaly::ChecksumMismatch {
                            declared: lls_cksum,
                            expected,
                        },
                    );
                }
            }
        }
    }

    decode_tlvs(&mut body_cursor, &LLS_TLVS, ctx, &mut node)?;

    node.region = ByteRegion::new(start, cursor.position() - start);
    parent.push(node);
    Ok(())
}

fn lls_lookup(tlv_type: u16) -> Option<TlvHandler> {
    let handler = match LlsTlvType::from_u16(tlv_type)? {
        LlsTlvType::ExtendedOptionsFlags => TlvHandler {
            name: "extended_options",
            decode: decode_ext_options,
        },
        LlsTlvType::CryptoAuth => TlvHandler {
            name: "crypto_auth",
            decode: decode_crypto_auth,
        },
    };
    Some(handler)
}

fn decode_ext_options(
    buf: &mut Cursor,
    tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    if tlv_len != 4 {
        tlv.record(
            buf.remaining_region(),
            Anomaly::BadLength {
                declared: tlv_len as u32,
                minimum: 4,
            },
        );
        return Ok(());
    }

    let start = buf.position();
    let options = ExtendedOptionsFlags::from_bits_truncate(buf.get_u32()?);
    tlv.push(Field::flags(
        "options",
        buf.region_since(start),
        options.bits(),
    ));
    Ok(())
}

fn decode_crypto_auth(
    buf: &mut Cursor,
    tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    if tlv_len < 4 {
        tlv.record(
            buf.remaining_region(),
            Anomaly::BadLength {
                declared: tlv_len as u32,
                minimum: 4,
            },
        );
        return Ok(());
    }

    let start = buf.position();
    let seqno = buf.get_u32()?;
    tlv.push(Field::uint("sequence", buf.region_since(start), seqno));

    // The message digest is kept opaque; no key material is available here.
    let region = buf.remaining_region();
    let value = buf.take(region.length)?;
    tlv.push(Field::raw("auth_data", region, value));
    Ok(())
}
