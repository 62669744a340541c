//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use bitflags::bitflags;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use prism_utils::bytes::{ByteRegion, Cursor};

use crate::ospfv2::lsa_opaque;
use crate::packet::error::{Anomaly, DecodeResult};
use crate::packet::tree::Field;
use crate::packet::DecodeCtx;

// OSPFv2 LSA type code.
//
// IANA registry:
// https://www.iana.org/assignments/ospfv2-parameters/ospfv2-parameters.xhtml#ospfv2-parameters-5
#[derive(Clone, Copy, Debug, Eq, Ord, FromPrimitive, PartialEq, PartialOrd)]
pub enum LsaTypeCode {
    Router = 1,
    Network = 2,
    SummaryNetwork = 3,
    SummaryRouter = 4,
    AsExternal = 5,
    NssaExternal = 7,
    OpaqueLink = 9,
    OpaqueArea = 10,
    OpaqueAs = 11,
}

// OSPFv2 Router LSA Link Type.
//
// IANA registry:
// https://www.iana.org/assignments/ospfv2-parameters/ospfv2-parameters.xhtml#ospfv2-parameters-7
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
pub enum LsaRouterLinkType {
    PointToPoint = 0x01,
    TransitNetwork = 0x02,
    StubNetwork = 0x03,
    VirtualLink = 0x04,
}

// OSPFv2 Router Properties Registry.
//
// IANA registry:
// https://www.iana.org/assignments/ospfv2-parameters/ospfv2-parameters.xhtml#ospfv2-parameters-11
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct LsaRouterFlags: u8 {
        const B = 0x01;
        const E = 0x02;
        const V = 0x04;
        const NT = 0x10;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct LsaAsExternalFlags: u8 {
        const E = 0x80;
    }
}

// ===== impl LsaTypeCode =====

impl LsaTypeCode {
    pub(crate) fn is_opaque(&self) -> bool {
        matches!(
            self,
            LsaTypeCode::OpaqueLink
                | LsaTypeCode::OpaqueArea
                | LsaTypeCode::OpaqueAs
        )
    }
}

// ===== LSA body decoders =====

pub(crate) fn decode_lsa_body(
    ls_type: u16,
    lsa_id: Ipv4Addr,
    cursor: &mut Cursor,
    tree: &mut Field,
    ctx: &DecodeCtx,
) -> DecodeResult<()> {
    match LsaTypeCode::from_u16(ls_type) {
        Some(LsaTypeCode::Router) => decode_router(cursor, tree),
        Some(LsaTypeCode::Network) => decode_network(cursor, tree),
        Some(LsaTypeCode::SummaryNetwork | LsaTypeCode::SummaryRouter) => {
            decode_summary(cursor, tree)
        }
        Some(LsaTypeCode::AsExternal | LsaTypeCode::NssaExternal) => {
            decode_as_external(cursor, tree)
        }
        Some(
            LsaTypeCode::OpaqueLink
            | LsaTypeCode::OpaqueArea
            | LsaTypeCode::OpaqueAs,
        ) => lsa_opaque::decode(lsa_id, cursor, tree, ctx),
        None => {
            // Unrecognized type: keep the body verbatim.
            let region = cursor.remaining_region();
            let value = cursor.take(region.length)?;
            tree.push(Field::raw("body", region, value));
            tree.record(region, Anomaly::UnknownType { code: ls_type });
            Ok(())
        }
    }
}

//
// OSPFv2 Router-LSA.
//
// Encoding format (LSA body):
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |    0    |V|E|B|        0      |            # links            |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                          Link ID                              |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                         Link Data                             |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |     Type      |     # TOS     |            metric             |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |      TOS      |        0      |          TOS  metric          |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                              ...                              |
//
fn decode_router(cursor: &mut Cursor, tree: &mut Field) -> DecodeResult<()> {
    let start = cursor.position();
    let flags = LsaRouterFlags::from_bits_truncate(cursor.get_u8()?);
    tree.push(Field::flags(
        "flags",
        cursor.region_since(start),
        flags.bits(),
    ));
    let _ = cursor.get_u8()?;
    let start = cursor.position();
    let links_cnt = cursor.get_u16()?;
    tree.push(Field::uint(
        "num_links",
        cursor.region_since(start),
        links_cnt,
    ));

    for _ in 0..links_cnt {
        let start = cursor.position();
        let mut link = Field::container("link", ByteRegion::new(start, 0));

        let field_start = cursor.position();
        let link_id = cursor.get_ipv4()?;
        link.push(Field::ipv4(
            "link_id",
            cursor.region_since(field_start),
            link_id,
        ));
        let field_start = cursor.position();
        let link_data = cursor.get_ipv4()?;
        link.push(Field::ipv4(
            "link_data",
            cursor.region_since(field_start),
            link_data,
        ));
        let field_start = cursor.position();
        let link_type = cursor.get_u8()?;
        link.push(Field::uint(
            "link_type",
            cursor.region_since(field_start),
            link_type,
        ));
        if LsaRouterLinkType::from_u8(link_type).is_none() {
            link.record(
                cursor.region_since(field_start),
                Anomaly::UnknownType {
                    code: link_type as u16,
                },
            );
        }
        let field_start = cursor.position();
        let num_metrics = cursor.get_u8()?;
        link.push(Field::uint(
            "num_metrics",
            cursor.region_since(field_start),
            num_metrics,
        ));
        let field_start = cursor.position();
        let metric = cursor.get_u16()?;
        link.push(Field::uint(
            "metric",
            cursor.region_since(field_start),
            metric,
        ));

        // Deprecated TOS metrics share their 4-byte shape with MT-ID
        // entries, so they are decoded rather than skipped.
        for _ in 0..num_metrics {
            let entry_start = cursor.position();
            let mut entry =
                Field::container("tos_metric", ByteRegion::new(entry_start, 4));
            let field_start = cursor.position();
            let tos = cursor.get_u8()?;
            entry.push(Field::uint(
                "tos",
                cursor.region_since(field_start),
                tos,
            ));
            let _ = cursor.get_u8()?;
            let field_start = cursor.position();
            let tos_metric = cursor.get_u16()?;
            entry.push(Field::uint(
                "metric",
                cursor.region_since(field_start),
                tos_metric,
            ));
            link.push(entry);
        }

        link.region = cursor.region_since(start);
        tree.push(link);
    }
    Ok(())
}

//
// OSPFv2 Network-LSA: the network mask followed by the attached routers.
//
fn decode_network(cursor: &mut Cursor, tree: &mut Field) -> DecodeResult<()> {
    let start = cursor.position();
    let mask = cursor.get_ipv4()?;
    let mask_region = cursor.region_since(start);
    tree.push(Field::ipv4("network_mask", mask_region, mask));

    if cursor.is_empty() {
        tree.record(
            mask_region,
            Anomaly::MissingElement {
                what: "attached router".to_owned(),
            },
        );
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
// OSPFv2 Summary-LSA (types 3 and 4 share the format): the network mask and
// a 24-bit metric, optionally followed by TOS metrics.
//
fn decode_summary(cursor: &mut Cursor, tree: &mut Field) -> DecodeResult<()> {
    let start = cursor.position();
    let mask = cursor.get_ipv4()?;
    tree.push(Field::ipv4("network_mask", cursor.region_since(start), mask));
    let _ = cursor.get_u8()?;
    let start = cursor.position();
    let metric = cursor.get_u24()?;
    tree.push(Field::uint("metric", cursor.region_since(start), metric));

    while cursor.remaining() >= 4 {
        let start = cursor.position();
        let mut entry = Field::container("tos_metric", ByteRegion::new(start, 4));
        let field_start = cursor.position();
        let tos = cursor.get_u8()?;
        entry.push(Field::uint("tos", cursor.region_since(field_start), tos));
        let field_start = cursor.position();
        let tos_metric = cursor.get_u24()?;
        entry.push(Field::uint(
            "metric",
            cursor.region_since(field_start),
            tos_metric,
        ));
        tree.push(entry);
    }
    Ok(())
}

//
// OSPFv2 AS-External-LSA (and NSSA type 7): the network mask followed by one
// or more (metric, forwarding address, route tag) blocks.
//
fn decode_as_external(
    cursor: &mut Cursor,
    tree: &mut Field,
) -> DecodeResult<()> {
    let start = cursor.position();
    let mask = cursor.get_ipv4()?;
    let mask_region = cursor.region_since(start);
    tree.push(Field::ipv4("network_mask", mask_region, mask));

    if cursor.remaining() < 12 {
        tree.record(
            mask_region,
            Anomaly::MissingElement {
                what: "TOS forwarding block".to_owned(),
            },
        );
    }
    while cursor.remaining() >= 12 {
        let start = cursor.position();
        let mut route = Field::container("route", ByteRegion::new(start, 12));

        let field_start = cursor.position();
        let flags_tos = cursor.get_u8()?;
        let flags = LsaAsExternalFlags::from_bits_truncate(flags_tos);
        route.push(Field::flags(
            "flags",
            cursor.region_since(field_start),
            flags.bits(),
        ));
        route.push(Field::uint(
            "tos",
            cursor.region_since(field_start),
            flags_tos & 0x7f,
        ));
        let field_start = cursor.position();
        let metric = cursor.get_u24()?;
        route.push(Field::uint(
            "metric",
            cursor.region_since(field_start),
            metric,
        ));
        let field_start = cursor.position();
        let fwd_addr = cursor.get_ipv4()?;
        route.push(Field::ipv4(
            "fwd_addr",
            cursor.region_since(field_start),
            fwd_addr,
        ));
        let field_start = cursor.position();
        let tag = cursor.get_u32()?;
        route.push(Field::uint("tag", cursor.region_since(field_start), tag));

        tree.push(route);
    }
    Ok(())
}
