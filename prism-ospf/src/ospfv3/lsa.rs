//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bitflags::bitflags;
use ipnetwork::IpNetwork;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use prism_utils::bytes::{ByteRegion, Cursor};
use prism_utils::ip::AddressFamily;

use crate::packet::error::{Anomaly, DecodeResult};
use crate::packet::tlv::{
    decode_msd, decode_sid_value, decode_tlvs, AdjSidFlags, PrefixSidFlags,
    TlvDispatch, TlvHandler, GRACE_TLVS, ROUTER_INFO_TLVS,
};
use crate::packet::tree::Field;
use crate::packet::DecodeCtx;

// Layout of the 16-bit LSA type field.
pub const FUNCTION_CODE_MASK: u16 = 0x1fff;
pub const SCOPE_MASK: u16 = 0x6000;
pub const SCOPE_LINK: u16 = 0x0000;
pub const SCOPE_AREA: u16 = 0x2000;
pub const SCOPE_AS: u16 = 0x4000;
pub const SCOPE_RESERVED: u16 = 0x6000;
pub const U_BIT: u16 = 0x8000;

// OSPFv3 LSA function code.
//
// IANA registry:
// https://www.iana.org/assignments/ospfv3-parameters/ospfv3-parameters.xhtml#ospfv3-parameters-3
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, Ord, PartialEq, PartialOrd)]
pub enum LsaFunctionCode {
    // Legacy LSA Types
    Router = 1,
    Network = 2,
    InterAreaPrefix = 3,
    InterAreaRouter = 4,
    AsExternal = 5,
    NssaExternal = 7,
    Link = 8,
    IntraAreaPrefix = 9,
    // Extended LSA Types
    ExtRouter = 33,
    ExtNetwork = 34,
    ExtInterAreaPrefix = 35,
    ExtInterAreaRouter = 36,
    ExtAsExternal = 37,
    ExtNssaExternal = 39,
    ExtLink = 40,
    ExtIntraAreaPrefix = 41,
    // Other LSA types
    Grace = 11,
    RouterInfo = 12,
}

// OSPFv3 Extended-LSA TLV types.
//
// IANA registry:
// https://www.iana.org/assignments/ospfv3-parameters/ospfv3-parameters.xhtml#extended-lsa-tlvs
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
pub enum ExtLsaTlv {
    RouterLink = 1,
    AttachedRouters = 2,
    InterAreaPrefix = 3,
    InterAreaRouter = 4,
    ExternalPrefix = 5,
    IntraAreaPrefix = 6,
    Ipv6LinkLocalAddr = 7,
    Ipv4LinkLocalAddr = 8,
}

// OSPFv3 Extended-LSA Sub-TLV types.
//
// IANA registry:
// https://www.iana.org/assignments/ospfv3-parameters/ospfv3-parameters.xhtml#extended-lsa-sub-tlvs
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
pub enum ExtLsaSubTlv {
    Ipv6FwdAddr = 1,
    Ipv4FwdAddr = 2,
    RouteTag = 3,
    PrefixSid = 4,
    AdjSid = 5,
    LanAdjSid = 6,
    LinkMsd = 9,
}

// The PrefixOptions Field.
//
// IANA registry:
// https://www.iana.org/assignments/ospfv3-parameters/ospfv3-parameters.xhtml#ospfv3-parameters-4
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct PrefixOptions: u8 {
        const NU = 0x01;
        const LA = 0x02;
        const P = 0x08;
        const DN = 0x10;
        const N = 0x20;
    }
}

// OSPFv3 Router LSA flags.
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct LsaRouterFlags: u8 {
        const B = 0x01;
        const E = 0x02;
        const V = 0x04;
        const W = 0x08;
        const NT = 0x10;
    }
}

// OSPFv3 AS-External LSA flags.
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct LsaAsExternalFlags: u8 {
        const T = 0x01;
        const F = 0x02;
        const E = 0x04;
    }
}

static EXT_LSA_TLVS: TlvDispatch = TlvDispatch {
    lookup: ext_lsa_lookup,
};
static EXT_LSA_SUBTLVS: TlvDispatch = TlvDispatch {
    lookup: ext_lsa_subtlv_lookup,
};

// ===== LSA body decoders =====

pub(crate) fn decode_lsa_body(
    ls_type: u16,
    _lsa_id: Ipv4Addr,
    cursor: &mut Cursor,
    tree: &mut Field,
    ctx: &DecodeCtx,
) -> DecodeResult<()> {
    let function_code = ls_type & FUNCTION_CODE_MASK;
    match LsaFunctionCode::from_u16(function_code) {
        Some(LsaFunctionCode::Router) => decode_router(cursor, tree, false, ctx),
        Some(LsaFunctionCode::ExtRouter) => {
            decode_router(cursor, tree, true, ctx)
        }
        Some(LsaFunctionCode::Network) => {
            decode_network(cursor, tree, false, ctx)
        }
        Some(LsaFunctionCode::ExtNetwork) => {
            decode_network(cursor, tree, true, ctx)
        }
        Some(LsaFunctionCode::InterAreaPrefix) => {
            decode_inter_area_prefix(cursor, tree, ctx)
        }
        Some(LsaFunctionCode::ExtInterAreaPrefix) => {
            decode_tlvs(cursor, &EXT_LSA_TLVS, ctx, tree)
        }
        Some(LsaFunctionCode::InterAreaRouter) => {
            decode_inter_area_router(cursor, tree, ctx)
        }
        Some(LsaFunctionCode::ExtInterAreaRouter) => {
            decode_tlvs(cursor, &EXT_LSA_TLVS, ctx, tree)
        }
        Some(
            LsaFunctionCode::AsExternal | LsaFunctionCode::NssaExternal,
        ) => decode_as_external(cursor, tree, ctx),
        Some(
            LsaFunctionCode::ExtAsExternal | LsaFunctionCode::ExtNssaExternal,
        ) => decode_tlvs(cursor, &EXT_LSA_TLVS, ctx, tree),
        Some(LsaFunctionCode::Link) => decode_link(cursor, tree, false, ctx),
        Some(LsaFunctionCode::ExtLink) => decode_link(cursor, tree, true, ctx),
        Some(LsaFunctionCode::IntraAreaPrefix) => {
            decode_intra_area_prefix(cursor, tree, false, ctx)
        }
        Some(LsaFunctionCode::ExtIntraAreaPrefix) => {
            decode_intra_area_prefix(cursor, tree, true, ctx)
        }
        Some(LsaFunctionCode::Grace) => {
            decode_tlvs(cursor, &GRACE_TLVS, ctx, tree)
        }
        Some(LsaFunctionCode::RouterInfo) => {
            decode_tlvs(cursor, &ROUTER_INFO_TLVS, ctx, tree)
        }
        None => {
            // Unrecognized function code: keep the body verbatim.
            let region = cursor.remaining_region();
            let value = cursor.take(region.length)?;
            tree.push(Field::raw("body", region, value));
            tree.record(region, Anomaly::UnknownType { code: ls_type });
            Ok(())
        }
    }
}

fn decode_router_flags(
    cursor: &mut Cursor,
    tree: &mut Field,
) -> DecodeResult<()> {
    let start = cursor.position();
    let flags = LsaRouterFlags::from_bits_truncate(cursor.get_u8()?);
    tree.push(Field::flags(
        "flags",
        cursor.region_since(start),
        flags.bits(),
    ));
    Ok(())
}

fn decode_options_field(
    cursor: &mut Cursor,
    tree: &mut Field,
) -> DecodeResult<()> {
    let start = cursor.position();
    let options = cursor.get_u24()?;
    tree.push(Field::flags("options", cursor.region_since(start), options));
    Ok(())
}

//
// OSPFv3 Router-LSA: flags and options, then one interface description per
// 16 bytes. The extended variant carries the interfaces in Router-Link
// TLVs instead.
//
fn decode_router(
    cursor: &mut Cursor,
    tree: &mut Field,
    extended: bool,
    ctx: &DecodeCtx,
) -> DecodeResult<()> {
    decode_router_flags(cursor, tree)?;
    decode_options_field(cursor, tree)?;

    if extended {
        return decode_tlvs(cursor, &EXT_LSA_TLVS, ctx, tree);
    }

    while cursor.remaining() >= 16 {
        let start = cursor.position();
        let mut link = Field::container(
            "link",
            ByteRegion::new(start, 16),
        );
        decode_router_link_fields(cursor, &mut link)?;
        tree.push(link);
    }
    Ok(())
}

// The fixed part of an interface description, shared between the legacy
// Router-LSA and the Router-Link TLV.
fn decode_router_link_fields(
    cursor: &mut Cursor,
    link: &mut Field,
) -> DecodeResult<()> {
    let start = cursor.position();
    let link_type = cursor.get_u8()?;
    link.push(Field::uint(
        "link_type",
        cursor.region_since(start),
        link_type,
    ));
    let _ = cursor.get_u8()?;
    let start = cursor.position();
    let metric = cursor.get_u16()?;
    link.push(Field::uint("metric", cursor.region_since(start), metric));
    let start = cursor.position();
    let iface_id = cursor.get_u32()?;
    link.push(Field::uint(
        "iface_id",
        cursor.region_since(start),
        iface_id,
    ));
    let start = cursor.position();
    let nbr_iface_id = cursor.get_u32()?;
    link.push(Field::uint(
        "nbr_iface_id",
        cursor.region_since(start),
        nbr_iface_id,
    ));
    let start = cursor.position();
    let nbr_router_id = cursor.get_ipv4()?;
    link.push(Field::ipv4(
        "nbr_router_id",
        cursor.region_since(start),
        nbr_router_id,
    ));
    Ok(())
}

//
// OSPFv3 Network-LSA: options, then the attached routers. The extended
// variant carries them in an Attached-Routers TLV.
//
fn decode_network(
    cursor: &mut Cursor,
    tree: &mut Field,
    extended: bool,
    ctx: &DecodeCtx,
) -> DecodeResult<()> {
    let _ = cursor.get_u8()?;
    decode_options_field(cursor, tree)?;

    if extended {
        return decode_tlvs(cursor, &EXT_LSA_TLVS, ctx, tree);
    }

    while cursor.remaining() >= 4 {
        let start = cursor.position();
        let rtr = cursor.get_ipv4()?;
        tree.push(Field::ipv4(
            "attached_router",
            cursor.region_since(start),
            rtr,
        ));
    }
    Ok(())
}

//
// OSPFv3 Inter-Area-Prefix-LSA: metric and the advertised prefix.
//
fn decode_inter_area_prefix(
    cursor: &mut Cursor,
    tree: &mut Field,
    ctx: &DecodeCtx,
) -> DecodeResult<()> {
    let _ = cursor.get_u8()?;
    let start = cursor.position();
    let metric = cursor.get_u24()?;
    tree.push(Field::uint("metric", cursor.region_since(start), metric));
    let prefixlen = cursor.get_u8()?;
    decode_prefix_options(cursor, tree)?;
    let _ = cursor.get_u16()?;
    decode_prefix_value(cursor, tree, prefixlen, ctx.af)?;
    Ok(())
}

//
// OSPFv3 Inter-Area-Router-LSA: options, metric, and the destination
// router.
//
fn decode_inter_area_router(
    cursor: &mut Cursor,
    tree: &mut Field,
    _ctx: &DecodeCtx,
) -> DecodeResult<()> {
    let _ = cursor.get_u8()?;
    decode_options_field(cursor, tree)?;
    let _ = cursor.get_u8()?;
    let start = cursor.position();
    let metric = cursor.get_u24()?;
    tree.push(Field::uint("metric", cursor.region_since(start), metric));
    let start = cursor.position();
    let router_id = cursor.get_ipv4()?;
    tree.push(Field::ipv4(
        "dest_router_id",
        cursor.region_since(start),
        router_id,
    ));
    Ok(())
}

//
// OSPFv3 AS-External-LSA (and NSSA): flags, metric, the prefix, then
// optional fields gated by the E/F/T flags and the referenced LSA type.
//
fn decode_as_external(
    cursor: &mut Cursor,
    tree: &mut Field,
    ctx: &DecodeCtx,
) -> DecodeResult<()> {
    let start = cursor.position();
    let flags = LsaAsExternalFlags::from_bits_truncate(cursor.get_u8()?);
    tree.push(Field::flags(
        "flags",
        cursor.region_since(start),
        flags.bits(),
    ));
    let start = cursor.position();
    let metric = cursor.get_u24()?;
    tree.push(Field::uint("metric", cursor.region_since(start), metric));
    let prefixlen = cursor.get_u8()?;
    decode_prefix_options(cursor, tree)?;
    let start = cursor.position();
    let ref_ls_type = cursor.get_u16()?;
    tree.push(Field::uint(
        "ref_ls_type",
        cursor.region_since(start),
        ref_ls_type,
    ));
    decode_prefix_value(cursor, tree, prefixlen, ctx.af)?;

    if flags.contains(LsaAsExternalFlags::F) {
        decode_addr_field(cursor, tree, "fwd_addr", ctx.af)?;
    }
    if flags.contains(LsaAsExternalFlags::T) {
        let start = cursor.position();
        let tag = cursor.get_u32()?;
        tree.push(Field::uint("tag", cursor.region_since(start), tag));
    }
    if ref_ls_type != 0 {
        let start = cursor.position();
        let ref_lsa_id = cursor.get_ipv4()?;
        tree.push(Field::ipv4(
            "ref_lsa_id",
            cursor.region_since(start),
            ref_lsa_id,
        ));
    }
    Ok(())
}

//
// OSPFv3 Link-LSA: priority, options, the link-local address, then the
// prefix list. The extended variant carries the address and prefixes in
// TLVs.
//
fn decode_link(
    cursor: &mut Cursor,
    tree: &mut Field,
    extended: bool,
    ctx: &DecodeCtx,
) -> DecodeResult<()> {
    let start = cursor.position();
    let priority = cursor.get_u8()?;
    tree.push(Field::uint(
        "priority",
        cursor.region_since(start),
        priority,
    ));
    decode_options_field(cursor, tree)?;

    if extended {
        return decode_tlvs(cursor, &EXT_LSA_TLVS, ctx, tree);
    }

    decode_addr_field(cursor, tree, "linklocal_addr", ctx.af)?;

    let start = cursor.position();
    let prefixes_cnt = cursor.get_u32()?;
    tree.push(Field::uint(
        "num_prefixes",
        cursor.region_since(start),
        prefixes_cnt,
    ));
    for _ in 0..prefixes_cnt {
        let start = cursor.position();
        let mut entry = Field::container(
            "prefix_entry",
            ByteRegion::new(start, 0),
        );
        let prefixlen = cursor.get_u8()?;
        decode_prefix_options(cursor, &mut entry)?;
        let _ = cursor.get_u16()?;
        decode_prefix_value(cursor, &mut entry, prefixlen, ctx.af)?;
        entry.region = cursor.region_since(start);
        tree.push(entry);
    }
    Ok(())
}

//
// OSPFv3 Intra-Area-Prefix-LSA: the referenced LSA header fields, then the
// prefix list with per-prefix metrics.
//
fn decode_intra_area_prefix(
    cursor: &mut Cursor,
    tree: &mut Field,
    extended: bool,
    ctx: &DecodeCtx,
) -> DecodeResult<()> {
    let mut prefixes_cnt = 0;
    if extended {
        let _ = cursor.get_u16()?;
    } else {
        let start = cursor.position();
        prefixes_cnt = cursor.get_u16()?;
        tree.push(Field::uint(
            "num_prefixes",
            cursor.region_since(start),
            prefixes_cnt,
        ));
    }
    let start = cursor.position();
    let ref_ls_type = cursor.get_u16()?;
    tree.push(Field::uint(
        "ref_ls_type",
        cursor.region_since(start),
        ref_ls_type,
    ));
    let start = cursor.position();
    let ref_lsa_id = cursor.get_ipv4()?;
    tree.push(Field::ipv4(
        "ref_lsa_id",
        cursor.region_since(start),
        ref_lsa_id,
    ));
    let start = cursor.position();
    let ref_adv_rtr = cursor.get_ipv4()?;
    tree.push(Field::ipv4(
        "ref_adv_rtr",
        cursor.region_since(start),
        ref_adv_rtr,
    ));

    if extended {
        return decode_tlvs(cursor, &EXT_LSA_TLVS, ctx, tree);
    }

    for _ in 0..prefixes_cnt {
        let start = cursor.position();
        let mut entry = Field::container(
            "prefix_entry",
            ByteRegion::new(start, 0),
        );
        let prefixlen = cursor.get_u8()?;
        decode_prefix_options(cursor, &mut entry)?;
        let field_start = cursor.position();
        let metric = cursor.get_u16()?;
        entry.push(Field::uint(
            "metric",
            cursor.region_since(field_start),
            metric,
        ));
        decode_prefix_value(cursor, &mut entry, prefixlen, ctx.af)?;
        entry.region = cursor.region_since(start);
        tree.push(entry);
    }
    Ok(())
}

// ===== Extended-LSA TLVs =====

fn ext_lsa_lookup(tlv_type: u16) -> Option<TlvHandler> {
    let handler = match ExtLsaTlv::from_u16(tlv_type)? {
        ExtLsaTlv::RouterLink => TlvHandler {
            name: "router_link",
            decode: decode_router_link_tlv,
        },
        ExtLsaTlv::AttachedRouters => TlvHandler {
            name: "attached_routers",
            decode: decode_attached_routers_tlv,
        },
        ExtLsaTlv::InterAreaPrefix => TlvHandler {
            name: "inter_area_prefix",
            decode: decode_inter_area_prefix_tlv,
        },
        ExtLsaTlv::InterAreaRouter => TlvHandler {
            name: "inter_area_router",
            decode: decode_inter_area_router_tlv,
        },
        ExtLsaTlv::ExternalPrefix => TlvHandler {
            name: "external_prefix",
            decode: decode_external_prefix_tlv,
        },
        ExtLsaTlv::IntraAreaPrefix => TlvHandler {
            name: "intra_area_prefix",
            decode: decode_intra_area_prefix_tlv,
        },
        ExtLsaTlv::Ipv6LinkLocalAddr => TlvHandler {
            name: "ipv6_linklocal_addr",
            decode: decode_ipv6_linklocal_tlv,
        },
        ExtLsaTlv::Ipv4LinkLocalAddr => TlvHandler {
            name: "ipv4_linklocal_addr",
            decode: decode_ipv4_linklocal_tlv,
        },
    };
    Some(handler)
}

fn decode_router_link_tlv(
    buf: &mut Cursor,
    tlv_len: u16,
    ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    if tlv_len < 16 {
        tlv.record(
            buf.remaining_region(),
            Anomaly::BadLength {
                declared: tlv_len as u32,
                minimum: 16,
            },
        );
        return Ok(());
    }

    decode_router_link_fields(buf, tlv)?;
    decode_tlvs(buf, &EXT_LSA_SUBTLVS, ctx, tlv)
}

fn decode_attached_routers_tlv(
    buf: &mut Cursor,
    tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    if tlv_len < 4 || tlv_len % 4 != 0 {
        tlv.record(
            buf.remaining_region(),
            Anomaly::BadLength {
                declared: tlv_len as u32,
                minimum: 4,
            },
        );
        return Ok(());
    }

    while buf.remaining() >= 4 {
        let start = buf.position();
        let rtr = buf.get_ipv4()?;
        tlv.push(Field::ipv4(
            "attached_router",
            buf.region_since(start),
            rtr,
        ));
    }
    Ok(())
}

// Identical fields to the legacy Inter-Area-Prefix-LSA, plus Sub-TLVs.
fn decode_inter_area_prefix_tlv(
    buf: &mut Cursor,
    _tlv_len: u16,
    ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    let _ = buf.get_u8()?;
    let start = buf.position();
    let metric = buf.get_u24()?;
    tlv.push(Field::uint("metric", buf.region_since(start), metric));
    let prefixlen = buf.get_u8()?;
    decode_prefix_options(buf, tlv)?;
    let _ = buf.get_u16()?;
    decode_prefix_value(buf, tlv, prefixlen, ctx.af)?;
    decode_tlvs(buf, &EXT_LSA_SUBTLVS, ctx, tlv)
}

// Identical fields to the legacy Inter-Area-Router-LSA, plus Sub-TLVs.
fn decode_inter_area_router_tlv(
    buf: &mut Cursor,
    _tlv_len: u16,
    ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    let _ = buf.get_u8()?;
    decode_options_field(buf, tlv)?;
    let _ = buf.get_u8()?;
    let start = buf.position();
    let metric = buf.get_u24()?;
    tlv.push(Field::uint("metric", buf.region_since(start), metric));
    let start = buf.position();
    let router_id = buf.get_ipv4()?;
    tlv.push(Field::ipv4(
        "dest_router_id",
        buf.region_since(start),
        router_id,
    ));
    decode_tlvs(buf, &EXT_LSA_SUBTLVS, ctx, tlv)
}

fn decode_external_prefix_tlv(
    buf: &mut Cursor,
    _tlv_len: u16,
    ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    let start = buf.position();
    let flags = LsaAsExternalFlags::from_bits_truncate(buf.get_u8()?);
    tlv.push(Field::flags(
        "flags",
        buf.region_since(start),
        flags.bits(),
    ));
    let start = buf.position();
    let metric = buf.get_u24()?;
    tlv.push(Field::uint("metric", buf.region_since(start), metric));
    let prefixlen = buf.get_u8()?;
    decode_prefix_options(buf, tlv)?;
    let _ = buf.get_u16()?;
    decode_prefix_value(buf, tlv, prefixlen, ctx.af)?;
    decode_tlvs(buf, &EXT_LSA_SUBTLVS, ctx, tlv)
}

fn decode_intra_area_prefix_tlv(
    buf: &mut Cursor,
    _tlv_len: u16,
    ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    let _ = buf.get_u16()?;
    let start = buf.position();
    let metric = buf.get_u16()?;
    tlv.push(Field::uint("metric", buf.region_since(start), metric));
    let prefixlen = buf.get_u8()?;
    decode_prefix_options(buf, tlv)?;
    let _ = buf.get_u16()?;
    decode_prefix_value(buf, tlv, prefixlen, ctx.af)?;
    decode_tlvs(buf, &EXT_LSA_SUBTLVS, ctx, tlv)
}

fn decode_ipv6_linklocal_tlv(
    buf: &mut Cursor,
    tlv_len: u16,
    ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    if tlv_len < 16 {
        tlv.record(
            buf.remaining_region(),
            Anomaly::BadLength {
                declared: tlv_len as u32,
                minimum: 16,
            },
        );
        return Ok(());
    }

    let start = buf.position();
    let addr = buf.get_ipv6()?;
    tlv.push(Field::ipv6("addr", buf.region_since(start), addr));
    decode_tlvs(buf, &EXT_LSA_SUBTLVS, ctx, tlv)
}

fn decode_ipv4_linklocal_tlv(
    buf: &mut Cursor,
    tlv_len: u16,
    ctx: &DecodeCtx,
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
    let addr = buf.get_ipv4()?;
    tlv.push(Field::ipv4("addr", buf.region_since(start), addr));
    decode_tlvs(buf, &EXT_LSA_SUBTLVS, ctx, tlv)
}

// ===== Extended-LSA Sub-TLVs =====

fn ext_lsa_subtlv_lookup(tlv_type: u16) -> Option<TlvHandler> {
    let handler = match ExtLsaSubTlv::from_u16(tlv_type)? {
        ExtLsaSubTlv::Ipv6FwdAddr => TlvHandler {
            name: "ipv6_fwd_addr",
            decode: decode_ipv6_fwd_addr,
        },
        ExtLsaSubTlv::Ipv4FwdAddr => TlvHandler {
            name: "ipv4_fwd_addr",
            decode: decode_ipv4_fwd_addr,
        },
        ExtLsaSubTlv::RouteTag => TlvHandler {
            name: "route_tag",
            decode: decode_route_tag,
        },
        ExtLsaSubTlv::PrefixSid => TlvHandler {
            name: "prefix_sid",
            decode: decode_prefix_sid,
        },
        ExtLsaSubTlv::AdjSid => TlvHandler {
            name: "adj_sid",
            decode: decode_adj_sid,
        },
        ExtLsaSubTlv::LanAdjSid => TlvHandler {
            name: "lan_adj_sid",
            decode: decode_lan_adj_sid,
        },
        ExtLsaSubTlv::LinkMsd => TlvHandler {
            name: "link_msd",
            decode: decode_msd,
        },
    };
    Some(handler)
}

fn decode_ipv6_fwd_addr(
    buf: &mut Cursor,
    tlv_len: u16,
    _ctx: &DecodeCtx,
    tlv: &mut Field,
) -> DecodeResult<()> {
    if tlv_len != 16 {
        tlv.record(
            buf.remaining_region(),
            Anomaly::BadLength {
                declared: tlv_len as u32,
                minimum: 16,
            },
        );
        return Ok(());
    }

    let start = buf.position();
    let addr = buf.get_ipv6()?;
    tlv.push(Field::ipv6("fwd_addr", buf.region_since(start), addr));
    Ok(())
}

fn decode_ipv4_fwd_addr(
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
    tlv.push(Field::ipv4("fwd_addr", buf.region_since(start), addr));
    Ok(())
}

fn decode_route_tag(
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
    let tag = buf.get_u32()?;
    tlv.push(Field::uint("tag", buf.region_since(start), tag));
    Ok(())
}

//
// OSPFv3 Prefix-SID Sub-TLV: flags, algorithm, reserved, then the SID.
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
    let start = buf.position();
    let algo = buf.get_u8()?;
    tlv.push(Field::uint("algorithm", buf.region_since(start), algo));
    let _reserved = buf.get_u16()?;

    decode_sid_value(
        buf,
        tlv,
        flags.contains(PrefixSidFlags::V),
        flags.contains(PrefixSidFlags::L),
    )
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
// OSPFv3 (LAN-)Adj-SID Sub-TLV: flags, weight, reserved, for the LAN
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
    let start = buf.position();
    let weight = buf.get_u8()?;
    tlv.push(Field::uint("weight", buf.region_since(start), weight));
    let _reserved = buf.get_u16()?;

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

// ===== helper functions =====

fn decode_prefix_options(
    cursor: &mut Cursor,
    tree: &mut Field,
) -> DecodeResult<()> {
    let start = cursor.position();
    let options = PrefixOptions::from_bits_truncate(cursor.get_u8()?);
    tree.push(Field::flags(
        "prefix_options",
        cursor.region_since(start),
        options.bits(),
    ));
    Ok(())
}

// Address prefixes are encoded in as many 32-bit words as the prefix length
// requires.
fn prefix_wire_len(len: u8) -> usize {
    (len as usize).div_ceil(32) * 4
}

fn decode_prefix_value(
    cursor: &mut Cursor,
    tree: &mut Field,
    prefixlen: u8,
    af: AddressFamily,
) -> DecodeResult<()> {
    let start = cursor.position();

    // An impossible prefix length poisons the rest of the body; keep the
    // remainder opaque.
    if prefixlen > af.max_prefixlen() {
        let region = cursor.remaining_region();
        let value = cursor.take(region.length)?;
        tree.push(Field::raw("prefix", region, value));
        tree.record(
            region,
            Anomaly::BadLength {
                declared: prefixlen as u32,
                minimum: 0,
            },
        );
        return Ok(());
    }

    let plen_wire = prefix_wire_len(prefixlen);
    let bytes = cursor.take(plen_wire)?;
    let addr: IpAddr = match af {
        AddressFamily::Ipv4 => {
            let mut prefix_bytes = [0; 4];
            prefix_bytes[..plen_wire].copy_from_slice(&bytes);
            Ipv4Addr::from(prefix_bytes).into()
        }
        AddressFamily::Ipv6 => {
            let mut prefix_bytes = [0; 16];
            prefix_bytes[..plen_wire].copy_from_slice(&bytes);
            Ipv6Addr::from(prefix_bytes).into()
        }
    };
    let region = cursor.region_since(start);
    match IpNetwork::new(addr, prefixlen) {
        Ok(prefix) => tree.push(Field::prefix("prefix", region, prefix)),
        Err(_) => {
            tree.push(Field::raw(
                "prefix",
                region,
                bytes,
            ));
            tree.record(
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

// As per RFC 5838, IPv4 addresses occupy the first four bytes of the
// 16-byte address field; the remainder is ignored.
fn decode_addr_field(
    cursor: &mut Cursor,
    tree: &mut Field,
    name: &'static str,
    af: AddressFamily,
) -> DecodeResult<()> {
    let start = cursor.position();
    let addr: IpAddr = match af {
        AddressFamily::Ipv4 => {
            let addr = cursor.get_ipv4()?;
            cursor.skip(12)?;
            addr.into()
        }
        AddressFamily::Ipv6 => cursor.get_ipv6()?.into(),
    };
    let region = cursor.region_since(start);
    match addr {
        IpAddr::V4(addr) => tree.push(Field::ipv4(name, region, addr)),
        IpAddr::V6(addr) => tree.push(Field::ipv6(name, region, addr)),
    }
    Ok(())
}
