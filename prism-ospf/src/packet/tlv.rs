//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//

use bitflags::bitflags;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use prism_utils::bytes::{ByteRegion, Cursor};

use crate::packet::error::{Anomaly, DecodeResult};
use crate::packet::tree::Field;
use crate::packet::DecodeCtx;

// TLV header size.
pub const TLV_HDR_SIZE: u16 = 4;

// Decoder for one TLV value. The cursor is bounded to exactly the declared
// value length; fields are appended to the TLV's own node.
pub type TlvDecodeFn =
    fn(&mut Cursor, u16, &DecodeCtx, &mut Field) -> DecodeResult<()>;

#[derive(Clone, Copy)]
pub struct TlvHandler {
    pub name: &'static str,
    pub decode: TlvDecodeFn,
}

// Immutable type-to-decoder table. One static instance exists per TLV
// namespace (each opaque LSA kind, LLS, extended LSAs, sub-TLV sets).
#[derive(Clone, Copy)]
pub struct TlvDispatch {
    pub lookup: fn(u16) -> Option<TlvHandler>,
}

// OSPF Router Information (RI) TLV types.
//
// IANA registry:
// https://www.iana.org/assignments/ospf-parameters/ospf-parameters.xhtml#ri-tlv
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(FromPrimitive)]
pub enum RouterInfoTlvType {
    InformationalCaps = 1,
    FunctionalCaps = 2,
    DynamicHostname = 7,
    SrAlgo = 8,
    SidLabelRange = 9,
    NodeMsd = 12,
    SrLocalBlock = 14,
    SrmsPref = 15,
}

// SID/Label Sub-TLV type.
//
// This Sub-TLV appears in multiple TLVs, some of which don't have a separate
// Sub-TLV registry of their own. Regardless of that, its type value is always
// the same.
const SUBTLV_SID_LABEL: u16 = 1;

// MPLS label values are 20 bits wide.
const LABEL_VALUE_MASK: u32 = 0x000fffff;

// OSPF Grace-LSA TLV types.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(FromPrimitive)]
pub enum GraceTlvType {
    GracePeriod = 1,
    GrReason = 2,
    InterfaceAddr = 3,
}

// OSPF Router Informational Capability Bits.
//
// IANA registry:
// https://www.iana.org/assignments/ospf-parameters/ospf-parameters.xhtml#router-informational-capability
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct RouterInfoCaps: u32 {
        const GR = 1 << 31;
        const GR_HELPER = 1 << 30;
        const STUB_ROUTER = 1 << 29;
        const TE = 1 << 28;
        const P2P_LAN = 1 << 27;
        const EXPERIMENTAL_TE = 1 << 26;
    }
}

// Prefix-SID Flags.
//
// The flags are the same for both OSPF versions (even though they are
// specified separately).
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct PrefixSidFlags: u8 {
        const NP = 0x40;
        const M = 0x20;
        const E = 0x10;
        const V = 0x08;
        const L = 0x04;
    }
}

// (LAN)Adj-SID Flags.
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct AdjSidFlags: u8 {
        const B = 0x80;
        const V = 0x40;
        const L = 0x20;
        const G = 0x10;
        const P = 0x08;
    }
}

// Graceful Restart reason values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(FromPrimitive)]
pub enum GrReason {
    Unknown = 0,
    SoftwareRestart = 1,
    SoftwareUpgrade = 2,
    ControlProcessorSwitchover = 3,
}

// Shared TLV dispatch tables.
pub static ROUTER_INFO_TLVS: TlvDispatch = TlvDispatch {
    lookup: router_info_lookup,
};
pub static GRACE_TLVS: TlvDispatch = TlvDispatch {
    lookup: grace_lookup,
};
static SID_LABEL_SUBTLVS: TlvDispatch = TlvDispatch {
    lookup: sid_label_lookup,
};

// The TLV length is padded to 4-byte alignment. Computed in usize so a
// maximal declared length cannot overflow.
pub(crate) fn tlv_wire_len(tlv_len: u16) -> usize {
    (tlv_len as usize + 3) & !0x03
}

// Iterates the TLVs of a bounded region, dispatching each value through the
// given table and appending one field per TLV to `parent`.
//
// Unknown types are preserved as raw leaves. A declared length that overruns
// the region terminates the loop with a single diagnostic covering the
// remainder. Each iteration consumes at least the 4-byte TLV header, so a
// zero-length TLV cannot stall the loop. A failing type-specific decoder
// only marks its own TLV; the declared length always resynchronizes the
// cursor for the next sibling.
pub(crate) fn decode_tlvs(
    cursor: &mut Cursor,
    dispatch: &TlvDispatch,
    ctx: &DecodeCtx,
    parent: &mut Field,
) -> DecodeResult<()> {
    let _depth = ctx.recurse()?;

    while !cursor.is_empty() {
        let start = cursor.position();

        // A tail too short for a TLV header is trailing data, not a TLV.
        if cursor.remaining() < TLV_HDR_SIZE as usize {
            let region = cursor.remaining_region();
            let value = cursor.take(region.length)?;
            parent.push(Field::raw("trailing_data", region, value));
            break;
        }

        let type_region = ByteRegion::new(start, 2);
        let tlv_type = cursor.get_u16()?;
        let len_region = ByteRegion::new(start + 2, 2);
        let tlv_len = cursor.get_u16()?;

        // The declared value length overruns the enclosing region. Keep the
        // remainder as raw bytes and stop; resynchronization is impossible.
        if tlv_len as usize > cursor.remaining() {
            let available = cursor.remaining();
            let value_region = cursor.remaining_region();
            let value = cursor.take(available)?;
            let mut field = Field::container(
                "truncated_tlv",
                ByteRegion::new(start, TLV_HDR_SIZE as usize + available),
            );
            field.push(Field::uint("tlv_type", type_region, tlv_type));
            field.push(Field::uint("tlv_length", len_region, tlv_len));
            field.push(Field::raw("value", value_region, value));
            field.record(
                value_region,
                Anomaly::TruncatedTlv {
                    declared: tlv_len,
                    available,
                },
            );
            parent.push(field);
            break;
        }

        let mut value_cursor = cursor.sub_cursor(tlv_len as usize)?;

        // Pad bytes inside the declared span are consumed, never interpreted.
        let pad = tlv_wire_len(tlv_len) - tlv_len as usize;
        cursor.skip(std::cmp::min(pad, cursor.remaining()))?;

        let region = ByteRegion::new(start, cursor.position() - start);
        match (dispatch.lookup)(tlv_type) {
            Some(handler) => {
                let mut field = Field::container(handler.name, region);
                field.push(Field::uint("tlv_type", type_region, tlv_type));
                field.push(Field::uint("tlv_length", len_region, tlv_len));
                if let Err(error) =
                    (handler.decode)(&mut value_cursor, tlv_len, ctx, &mut field)
                {
                    match error.demote() {
                        Some(anomaly) => field.record(region, anomaly),
                        None => return Err(error),
                    }
                }
                parent.push(field);
            }
            None => {
                let value_region =
                    ByteRegion::new(start + TLV_HDR_SIZE as usize, tlv_len as usize);
                let value = value_cursor.take(tlv_len as usize)?;
                let mut field = Field::container("unknown_tlv", region);
                field.push(Field::uint("tlv_type", type_region, tlv_type));
                field.push(Field::uint("tlv_length", len_region, tlv_len));
                field.push(Field::raw("value", value_region, value));
                field.record(region, Anomaly::UnknownType { code: tlv_type });
                parent.push(field);
            }
        }
    }

    Ok(())
}

// ===== Router Information TLVs =====

fn router_info_lookup(tlv_type: u16) -> Option<TlvHandler> {
    let handler = match RouterInfoTlvType::from_u16(tlv_type)? {
        RouterInfoTlvType::InformationalCaps => TlvHandler {
            name: "informational_caps",
            decode: decode_info_caps,
        },
        RouterInfoTlvType::FunctionalCaps => TlvHandler {
            name: "functional_caps",
            decode: decode_func_caps,
        },
        RouterInfoTlvType::DynamicHostname => TlvHandler {
            name: "dynamic_hostname",
            decode: decode_hostname,
        },
        RouterInfoTlvType::SrAlgo => TlvHandler {
            name: "sr_algo",
            decode: decode_sr_algo,
        },
        RouterInfoTlvType::SidLabelRange => TlvHandler {
            name: "sid_label_range",
            decode: decode_sid_label_range,
        },
        RouterInfoTlvType::NodeMsd => TlvHandler {
            name: "node_msd",
            decode: decode_msd,
        },
        RouterInfoTlvType::SrLocalBlock => TlvHandler {
            name: "sr_local_block",
            decode: decode_sid_label_range,
        },
        RouterInfoTlvType::SrmsPref => TlvHandler {
            name: "srms_pref",
            decode: decode_srms_pref,
        },
    };
    Some(handler)
}

fn decode_info_caps(
    buf: &mut Cursor,
    tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    // Validate minimum TLV length.
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

    // Ignore unknown capability bits.
    let start = buf.position();
    let caps = RouterInfoCaps::from_bits_truncate(buf.get_u32()?);
    tlv.push(Field::flags(
        "capabilities",
        buf.region_since(start),
        caps.bits(),
    ));
    Ok(())
}

fn decode_func_caps(
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
    let caps = buf.get_u32()?;
    tlv.push(Field::flags("capabilities", buf.region_since(start), caps));
    Ok(())
}

fn decode_hostname(
    buf: &mut Cursor,
    tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    let start = buf.position();
    let bytes = buf.take(tlv_len as usize)?;
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let hostname = String::from_utf8_lossy(&bytes[..end]).into_owned();
    tlv.push(Field::str("hostname", buf.region_since(start), hostname));
    Ok(())
}

fn decode_sr_algo(
    buf: &mut Cursor,
    tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    for _ in 0..tlv_len {
        let start = buf.position();
        let algo = buf.get_u8()?;
        tlv.push(Field::uint("algorithm", buf.region_since(start), algo));
    }
    Ok(())
}

// SID/Label Range and SR Local Block share the same layout: a 24-bit range
// size, a reserved byte, and nested Sub-TLVs carrying the first SID.
fn decode_sid_label_range(
    buf: &mut Cursor,
    _tlv_len: u16,
    ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    let start = buf.position();
    let range = buf.get_u24()?;
    tlv.push(Field::uint("range", buf.region_since(start), range));
    let start = buf.position();
    let reserved = buf.get_u8()?;
    if reserved != 0 {
        tlv.record(
            buf.region_since(start),
            Anomaly::ReservedNonZero {
                value: reserved as u32,
            },
        );
    }
    decode_tlvs(buf, &SID_LABEL_SUBTLVS, ctx, tlv)
}

pub(crate) fn decode_msd(
    buf: &mut Cursor,
    tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    // Validate the TLV length.
    if tlv_len % 2 != 0 {
        tlv.record(
            buf.remaining_region(),
            Anomaly::BadLength {
                declared: tlv_len as u32,
                minimum: 2,
            },
        );
        return Ok(());
    }

    let mut tlv_rlen = tlv_len;
    while tlv_rlen >= 2 {
        let start = buf.position();
        let msd_type = buf.get_u8()?;
        let msd_value = buf.get_u8()?;
        let mut msd = Field::container("msd", buf.region_since(start));
        msd.push(Field::uint("msd_type", ByteRegion::new(start, 1), msd_type));
        msd.push(Field::uint(
            "msd_value",
            ByteRegion::new(start + 1, 1),
            msd_value,
        ));
        tlv.push(msd);

        tlv_rlen -= 2;
    }
    Ok(())
}

fn decode_srms_pref(
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
    let pref = buf.get_u8()?;
    tlv.push(Field::uint("preference", buf.region_since(start), pref));
    Ok(())
}

fn sid_label_lookup(tlv_type: u16) -> Option<TlvHandler> {
    if tlv_type != SUBTLV_SID_LABEL {
        return None;
    }
    Some(TlvHandler {
        name: "sid_label",
        decode: decode_sid_label,
    })
}

fn decode_sid_label(
    buf: &mut Cursor,
    tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    let start = buf.position();
    match tlv_len {
        4 => {
            let index = buf.get_u32()?;
            tlv.push(Field::uint("sid_index", buf.region_since(start), index));
        }
        3 => {
            let label = buf.get_u24()? & LABEL_VALUE_MASK;
            tlv.push(Field::uint("label", buf.region_since(start), label));
        }
        _ => {
            tlv.record(
                buf.remaining_region(),
                Anomaly::BadLength {
                    declared: tlv_len as u32,
                    minimum: 3,
                },
            );
        }
    }
    Ok(())
}

// ===== Grace TLVs =====

fn grace_lookup(tlv_type: u16) -> Option<TlvHandler> {
    let handler = match GraceTlvType::from_u16(tlv_type)? {
        GraceTlvType::GracePeriod => TlvHandler {
            name: "grace_period",
            decode: decode_grace_period,
        },
        GraceTlvType::GrReason => TlvHandler {
            name: "gr_reason",
            decode: decode_gr_reason,
        },
        GraceTlvType::InterfaceAddr => TlvHandler {
            name: "interface_addr",
            decode: decode_gr_interface_addr,
        },
    };
    Some(handler)
}

fn decode_grace_period(
    buf: &mut Cursor,
    tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    // Validate TLV length.
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
    let period = buf.get_u32()?;
    tlv.push(Field::uint("period", buf.region_since(start), period));
    Ok(())
}

fn decode_gr_reason(
    buf: &mut Cursor,
    tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    // Validate TLV length.
    if tlv_len != 1 {
        tlv.record(
            buf.remaining_region(),
            Anomaly::BadLength {
                declared: tlv_len as u32,
                minimum: 1,
            },
        );
        return Ok(());
    }

    let start = buf.position();
    let reason = buf.get_u8()?;
    let mut field = Field::uint("reason", buf.region_since(start), reason);
    if let Some(reason) = GrReason::from_u8(reason) {
        field.push(Field::str(
            "reason_name",
            buf.region_since(start),
            reason.to_string(),
        ));
    }
    tlv.push(field);
    Ok(())
}

fn decode_gr_interface_addr(
    buf: &mut Cursor,
    tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    // Validate TLV length.
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
    let addr = buf.get_ipv4()?;
    tlv.push(Field::ipv4("addr", buf.region_since(start), addr));
    Ok(())
}

// ===== shared SID Sub-TLV decoders =====

// A SID is encoded as a 4-byte index or a 3-byte label depending on the V/L
// flags. Any other flag combination keeps the value opaque.
pub(crate) fn decode_sid_value(
    buf: &mut Cursor,
    tlv: &mut Field,
    v_flag: bool,
    l_flag: bool,
) -> DecodeResult<()> {
    let start = buf.position();
    match (v_flag, l_flag) {
        (false, false) => {
            let index = buf.get_u32()?;
            tlv.push(Field::uint("sid_index", buf.region_since(start), index));
        }
        (true, true) => {
            let label = buf.get_u24()? & LABEL_VALUE_MASK;
            tlv.push(Field::uint("label", buf.region_since(start), label));
        }
        _ => {
            // Invalid V-Flag and L-Flag combination: keep the value opaque.
            let region = buf.remaining_region();
            let value = buf.take(region.length)?;
            tlv.push(Field::raw("sid", region, value));
        }
    }
    Ok(())
}

// ===== impl GrReason =====

impl std::fmt::Display for GrReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrReason::Unknown => {
                write!(f, "unknown")
            }
            GrReason::SoftwareRestart => {
                write!(f, "software restart")
            }
            GrReason::SoftwareUpgrade => {
                write!(f, "software upgrade")
            }
            GrReason::ControlProcessorSwitchover => {
                write!(f, "control plane switchover")
            }
        }
    }
}

// ===== unit tests =====
