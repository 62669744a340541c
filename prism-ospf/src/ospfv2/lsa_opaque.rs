//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use bitflags::bitflags;
use ipnetwork::Ipv4Network;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use prism_utils::bytes::Cursor;

use crate::ospfv2::lsa::LsaRouterLinkType;
use crate::packet::error::{Anomaly, DecodeResult};
use crate::packet::tlv::{
    decode_msd, decode_sid_value, decode_tlvs, AdjSidFlags, PrefixSidFlags,
    TlvDispatch, TlvHandler, GRACE_TLVS, ROUTER_INFO_TLVS,
};
use crate::packet::tree::Field;
use crate::packet::DecodeCtx;

// OSPFv2 opaque LSA types.
//
// IANA registry:
// https://www.iana.org/assignments/ospf-opaque-types/ospf-opaque-types.xhtml#ospf-opaque-types-2
#[derive(Clone, Copy, Debug, Eq, Ord, FromPrimitive, PartialEq, PartialOrd)]
pub enum LsaOpaqueType {
    Te = 1,
    Grace = 3,
    RouterInfo = 4,
    ExtPrefix = 7,
    ExtLink = 8,
}

// Traffic Engineering LSA top-level TLV types (RFC 3630).
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
pub enum TeTlvType {
    RouterAddress = 1,
    Link = 2,
}

// Traffic Engineering Link TLV Sub-TLV types (RFC 3630).
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
pub enum TeLinkSubTlvType {
    LinkType = 1,
    LinkId = 2,
    LocalIfAddr = 3,
    RemoteIfAddr = 4,
    TeMetric = 5,
    MaxBandwidth = 6,
    MaxReservableBandwidth = 7,
    UnreservedBandwidth = 8,
    AdminGroup = 9,
}

// OSPFv2 Extended Prefix Opaque LSA TLV types.
//
// IANA registry:
// https://www.iana.org/assignments/ospfv2-parameters/ospfv2-parameters.xhtml#extended-prefix-opaque-lsa-tlvs
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
pub enum ExtPrefixTlvType {
    ExtPrefix = 1,
    ExtPrefixRange = 2,
}

// OSPFv2 Extended Prefix TLV Sub-TLV types.
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
pub enum ExtPrefixSubTlvType {
    SidLabel = 1,
    PrefixSid = 2,
}

// OSPFv2 Extended Link Opaque LSA TLV types.
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
pub enum ExtLinkTlvType {
    ExtLink = 1,
}

// OSPFv2 Extended Link TLV Sub-TLV types.
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
pub enum ExtLinkSubTlvType {
    SidLabel = 1,
    AdjSid = 2,
    LanAdjSid = 3,
    LinkMsd = 6,
}

// OSPFv2 Extended Prefix TLV Flags.
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct LsaExtPrefixFlags: u8 {
        const A = 0x80;
        const N = 0x40;
    }
}

static TE_TLVS: TlvDispatch = TlvDispatch { lookup: te_lookup };
static TE_LINK_SUBTLVS: TlvDispatch = TlvDispatch {
    lookup: te_link_lookup,
};
static EXT_PREFIX_TLVS: TlvDispatch = TlvDispatch {
    lookup: ext_prefix_lookup,
};
static EXT_PREFIX_SUBTLVS: TlvDispatch = TlvDispatch {
    lookup: ext_prefix_subtlv_lookup,
};
static EXT_LINK_TLVS: TlvDispatch = TlvDispatch {
    lookup: ext_link_lookup,
};
static EXT_LINK_SUBTLVS: TlvDispatch = TlvDispatch {
    lookup: ext_link_subtlv_lookup,
};

// Dispatches an opaque LSA body by the opaque type carried in the high byte
// of the link state ID. Every opaque body is a TLV sequence.
pub(crate) fn decode(
    lsa_id: Ipv4Addr,
    cursor: &mut Cursor,
    tree: &mut Field,
    ctx: &DecodeCtx,
) -> DecodeResult<()> {
    let opaque_type = lsa_id.octets()[0];
    match LsaOpaqueType::from_u8(opaque_type) {
        Some(LsaOpaqueType::Te) => decode_tlvs(cursor, &TE_TLVS, ctx, tree),
        Some(LsaOpaqueType::Grace) => {
            decode_tlvs(cursor, &GRACE_TLVS, ctx, tree)
        }
        Some(LsaOpaqueType::RouterInfo) => {
            decode_tlvs(cursor, &ROUTER_INFO_TLVS, ctx, tree)
        }
        Some(LsaOpaqueType::ExtPrefix) => {
            decode_tlvs(cursor, &EXT_PREFIX_TLVS, ctx, tree)
        }
        Some(LsaOpaqueType::ExtLink) => {
            decode_tlvs(cursor, &EXT_LINK_TLVS, ctx, tree)
        }
        None => {
            // Unrecognized opaque type: keep the body verbatim.
            let region = cursor.remaining_region();
            let value = cursor.take(region.length)?;
            tree.push(Field::raw("body", region, value));
            tree.record(
                region,
                Anomaly::UnknownType {
                    code: opaque_type as u16,
                },
            );
            Ok(())
        }
    }
}

// ===== Traffic Engineering TLVs =====

fn te_lookup(tlv_type: u16) -> Option<TlvHandler> {
    let handler = match TeTlvType::from_u16(tlv_type)? {
        TeTlvType::RouterAddress => TlvHandler {
            name: "router_address",
            decode: decode_te_router_addr,
        },
        TeTlvType::Link => TlvHandler {
            name: "te_link",
            decode: decode_te_link,
        },
    };
    Some(handler)
}

fn decode_te_router_addr(
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
    let addr = buf.get_ipv4()?;
    tlv.push(Field::ipv4("addr", buf.region_since(start), addr));
    Ok(())
}

// The Link TLV is a pure container: all link information lives in Sub-TLVs.
fn decode_te_link(
    buf: &mut Cursor,
    _tlv_len: u16,
    ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    decode_tlvs(buf, &TE_LINK_SUBTLVS, ctx, tlv)
}

fn te_link_lookup(tlv_type: u16) -> Option<TlvHandler> {
    let handler = match TeLinkSubTlvType::from_u16(tlv_type)? {
        TeLinkSubTlvType::LinkType => TlvHandler {
            name: "link_type",
            decode: decode_te_link_type,
        },
        TeLinkSubTlvType::LinkId => TlvHandler {
            name: "link_id",
            decode: decode_te_link_id,
        },
        TeLinkSubTlvType::LocalIfAddr => TlvHandler {
            name: "local_if_addr",
            decode: decode_te_if_addrs,
        },
        TeLinkSubTlvType::RemoteIfAddr => TlvHandler {
            name: "remote_if_addr",
            decode: decode_te_if_addrs,
        },
        TeLinkSubTlvType::TeMetric => TlvHandler {
            name: "te_metric",
            decode: decode_te_metric,
        },
        TeLinkSubTlvType::MaxBandwidth => TlvHandler {
            name: "max_bandwidth",
            decode: decode_te_bandwidth,
        },
        TeLinkSubTlvType::MaxReservableBandwidth => TlvHandler {
            name: "max_reservable_bandwidth",
            decode: decode_te_bandwidth,
        },
        TeLinkSubTlvType::UnreservedBandwidth => TlvHandler {
            name: "unreserved_bandwidth",
            decode: decode_te_unreserved_bw,
        },
        TeLinkSubTlvType::AdminGroup => TlvHandler {
            name: "admin_group",
            decode: decode_te_admin_group,
        },
    };
    Some(handler)
}

fn decode_te_link_type(
    buf: &mut Cursor,
    tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
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
    let link_type = buf.get_u8()?;
    tlv.push(Field::uint("link_type", buf.region_since(start), link_type));
    if LsaRouterLinkType::from_u8(link_type).is_none() {
        tlv.record(
            buf.region_since(start),
            Anomaly::UnknownType {
                code: link_type as u16,
            },
        );
    }
    Ok(())
}

fn decode_te_link_id(
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
    let link_id = buf.get_ipv4()?;
    tlv.push(Field::ipv4("link_id", buf.region_since(start), link_id));
    Ok(())
}

// Local/Remote Interface IP Address Sub-TLVs carry 4N octets, one address
// per neighbor.
fn decode_te_if_addrs(
    buf: &mut Cursor,
    _tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    while buf.remaining() >= 4 {
        let start = buf.position();
        let addr = buf.get_ipv4()?;
        tlv.push(Field::ipv4("addr", buf.region_since(start), addr));
    }
    Ok(())
}

fn decode_te_metric(
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
    let metric = buf.get_u32()?;
    tlv.push(Field::uint("metric", buf.region_since(start), metric));
    Ok(())
}

// Bandwidths are IEEE floats in bytes per second.
fn decode_te_bandwidth(
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
    let bandwidth = buf.get_f32()?;
    tlv.push(Field::float(
        "bandwidth",
        buf.region_since(start),
        bandwidth,
    ));
    Ok(())
}

// Unreserved bandwidth: one float per priority level, eight in total.
fn decode_te_unreserved_bw(
    buf: &mut Cursor,
    tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    if tlv_len != 32 {
        tlv.record(
            buf.remaining_region(),
            Anomaly::BadLength {
                declared: tlv_len as u32,
                minimum: 32,
            },
        );
        return Ok(());
    }

    for _ in 0..8 {
        let start = buf.position();
        let bandwidth = buf.get_f32()?;
        tlv.push(Field::float(
            "bandwidth",
            buf.region_since(start),
            bandwidth,
        ));
    }
    Ok(())
}

fn decode_te_admin_group(
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
    let group = buf.get_u32()?;
    tlv.push(Field::flags("admin_group", buf.region_since(start), group));
    Ok(())
}

// ===== Extended Prefix TLVs =====

fn ext_prefix_lookup(tlv_type: u16) -> Option<TlvHandler> {
    let handler = match ExtPrefixTlvType::from_u16(tlv_type)? {
        ExtPrefixTlvType::ExtPrefix => TlvHandler {
            name: "ext_prefix",
            decode: decode_ext_prefix,
        },
        ExtPrefixTlvType::ExtPrefixRange => TlvHandler {
            name: "ext_prefix_range",
            decode: decode_ext_prefix_range,
        },
    };
    Some(handler)
}

//
// OSPFv2 Extended Prefix TLV.
//
// Encoding format:
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |  Route Type   | Prefix Length |     AF        |     Flags     |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                     Address Prefix (variable)                 |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                      Sub-TLVs (variable)                      |
//
fn decode_ext_prefix(
    buf: &mut Cursor,
    tlv_len: u16,
    ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    if tlv_len < 8 {
        tlv.record(
            buf.remaining_region(),
            Anomaly::BadLength {
                declared: tlv_len as u32,
                minimum: 8,
            },
        );
        return Ok(());
    }

    let start = buf.position();
    let route_type = buf.get_u8()?;
    tlv.push(Field::uint(
        "route_type",
        buf.region_since(start),
        route_type,
    ));
    let prefixlen = buf.get_u8()?;
    let start = buf.position();
    let af = buf.get_u8()?;
    tlv.push(Field::uint("af", buf.region_since(start), af));
    let start = buf.position();
    let flags = LsaExtPrefixFlags::from_bits_truncate(buf.get_u8()?);
    tlv.push(Field::flags(
        "flags",
        buf.region_since(start),
        flags.bits(),
    ));
    decode_prefix_field(buf, prefixlen, tlv)?;

    decode_tlvs(buf, &EXT_PREFIX_SUBTLVS, ctx, tlv)
}

//
// OSPFv2 Extended Prefix Range TLV: prefix length, AF, range size, flags,
// the starting prefix, then Sub-TLVs.
//
fn decode_ext_prefix_range(
    buf: &mut Cursor,
    tlv_len: u16,
    ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    if tlv_len < 12 {
        tlv.record(
            buf.remaining_region(),
            Anomaly::BadLength {
                declared: tlv_len as u32,
                minimum: 12,
            },
        );
        return Ok(());
    }

    let prefixlen = buf.get_u8()?;
    let start = buf.position();
    let af = buf.get_u8()?;
    tlv.push(Field::uint("af", buf.region_since(start), af));
    let start = buf.position();
    let range_size = buf.get_u16()?;
    tlv.push(Field::uint(
        "range_size",
        buf.region_since(start),
        range_size,
    ));
    let start = buf.position();
    let flags = buf.get_u8()?;
    tlv.push(Field::flags("flags", buf.region_since(start), flags));
    let start = buf.position();
    let reserved = buf.get_u24()?;
    if reserved != 0 {
        tlv.record(
            buf.region_since(start),
            Anomaly::ReservedNonZero { value: reserved },
        );
    }
    decode_prefix_field(buf, prefixlen, tlv)?;

    decode_tlvs(buf, &EXT_PREFIX_SUBTLVS, ctx, tlv)
}

fn decode_prefix_field(
    buf: &mut Cursor,
    prefixlen: u8,
    tlv: &mut Field,
) -> DecodeResult<()> {
    let start = buf.position();
    let addr = buf.get_ipv4()?;
    let region = buf.region_since(start);
    match Ipv4Network::new(addr, prefixlen) {
        Ok(prefix) => tlv.push(Field::prefix("prefix", region, prefix.into())),
        Err(_) => {
            tlv.push(Field::ipv4("prefix", region, addr));
            tlv.record(
                region,
                Anomaly::BadLength {
                    declared: prefixlen as u32,
                    minimum: 0,
                },
            );
        }
    }
    Ok(())
}

fn ext_prefix_subtlv_lookup(tlv_type: u16) -> Option<TlvHandler> {
    let handler = match ExtPrefixSubTlvType::from_u16(tlv_type)? {
        ExtPrefixSubTlvType::SidLabel => return None,
        ExtPrefixSubTlvType::PrefixSid => TlvHandler {
            name: "prefix_sid",
            decode: decode_prefix_sid,
        },
    };
    Some(handler)
}

//
// Prefix-SID Sub-TLV: flags, reserved, MT-ID, algorithm, then the SID.
//
fn decode_prefix_sid(
    buf: &mut Cursor,
    _tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    let start = buf.position();
    let flags = PrefixSidFlags::from_bits_truncate(buf.get_u8()?);
    tlv.push(Field::flags(
        "flags",
        buf.region_since(start),
        flags.bits() as u32,
    ));
    let _reserved = buf.get_u8()?;
    let start = buf.position();
    let mt_id = buf.get_u8()?;
    tlv.push(Field::uint("mt_id", buf.region_since(start), mt_id));
    let start = buf.position();
    let algo = buf.get_u8()?;
    tlv.push(Field::uint("algorithm", buf.region_since(start), algo));

    decode_sid_value(
        buf,
        tlv,
        flags.contains(PrefixSidFlags::V),
        flags.contains(PrefixSidFlags::L),
    )
}

// ===== Extended Link TLVs =====

fn ext_link_lookup(tlv_type: u16) -> Option<TlvHandler> {
    let handler = match ExtLinkTlvType::from_u16(tlv_type)? {
        ExtLinkTlvType::ExtLink => TlvHandler {
            name: "ext_link",
            decode: decode_ext_link,
        },
    };
    Some(handler)
}

//
// OSPFv2 Extended Link TLV.
//
// Encoding format:
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |     Link Type |                  Reserved                     |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                            Link ID                            |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                           Link Data                           |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                      Sub-TLVs (variable)                      |
//
fn decode_ext_link(
    buf: &mut Cursor,
    tlv_len: u16,
    ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    if tlv_len < 12 {
        tlv.record(
            buf.remaining_region(),
            Anomaly::BadLength {
                declared: tlv_len as u32,
                minimum: 12,
            },
        );
        return Ok(());
    }

    let start = buf.position();
    let link_type = buf.get_u8()?;
    tlv.push(Field::uint("link_type", buf.region_since(start), link_type));
    if LsaRouterLinkType::from_u8(link_type).is_none() {
        tlv.record(
            buf.region_since(start),
            Anomaly::UnknownType {
                code: link_type as u16,
            },
        );
    }
    let start = buf.position();
    let reserved = buf.get_u24()?;
    if reserved != 0 {
        tlv.record(
            buf.region_since(start),
            Anomaly::ReservedNonZero { value: reserved },
        );
    }
    let start = buf.position();
    let link_id = buf.get_ipv4()?;
    tlv.push(Field::ipv4("link_id", buf.region_since(start), link_id));
    let start = buf.position();
    let link_data = buf.get_ipv4()?;
    tlv.push(Field::ipv4(
        "link_data",
        buf.region_since(start),
        link_data,
    ));

    decode_tlvs(buf, &EXT_LINK_SUBTLVS, ctx, tlv)
}

fn ext_link_subtlv_lookup(tlv_type: u16) -> Option<TlvHandler> {
    let handler = match ExtLinkSubTlvType::from_u16(tlv_type)? {
        ExtLinkSubTlvType::SidLabel => return None,
        ExtLinkSubTlvType::AdjSid => TlvHandler {
            name: "adj_sid",
            decode: decode_adj_sid,
        },
        ExtLinkSubTlvType::LanAdjSid => TlvHandler {
            name: "lan_adj_sid",
            decode: decode_lan_adj_sid,
        },
        ExtLinkSubTlvType::LinkMsd => TlvHandler {
            name: "link_msd",
            decode: decode_msd,
        },
    };
    Some(handler)
}

fn decode_adj_sid(
    buf: &mut Cursor,
    _tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    decode_adj_sid_fields(buf, tlv, false)
}

fn decode_lan_adj_sid(
    buf: &mut Cursor,
    _tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    decode_adj_sid_fields(buf, tlv, true)
}

//
// (LAN-)Adj-SID Sub-TLV: flags, reserved, MT-ID, weight, for the LAN
// variant a neighbor ID, then the SID.
//
fn decode_adj_sid_fields(
    buf: &mut Cursor,
    tlv: &mut Field,
    lan: bool,
) -> DecodeResult<()> {
    let start = buf.position();
    let flags = AdjSidFlags::from_bits_truncate(buf.get_u8()?);
    tlv.push(Field::flags(
        "flags",
        buf.region_since(start),
        flags.bits() as u32,
    ));
    let _reserved = buf.get_u8()?;
    let start = buf.position();
    let mt_id = buf.get_u8()?;
    tlv.push(Field::uint("mt_id", buf.region_since(start), mt_id));
    let start = buf.position();
    let weight = buf.get_u8()?;
    tlv.push(Field::uint("weight", buf.region_since(start), weight));

    if lan {
        let start = buf.position();
        let nbr_router_id = buf.get_ipv4()?;
        tlv.push(Field::ipv4(
            "nbr_router_id",
            buf.region_since(start),
            nbr_router_id,
        ));
    }

    decode_sid_value(
        buf,
        tlv,
        flags.contains(AdjSidFlags::V),
        flags.contains(AdjSidFlags::L),
    )
}
