//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod auth;
pub mod cksum;
pub mod error;
pub mod lls;
pub mod lsa;
pub mod tlv;
pub mod tree;

use std::cell::Cell;
use std::net::{IpAddr, Ipv4Addr};

use bitflags::bitflags;
use bytes::Bytes;
use derive_new::new;
use enum_as_inner::EnumAsInner;
use num_derive::FromPrimitive;
use prism_utils::bytes::{ByteRegion, Cursor};
use prism_utils::ip::AddressFamily;
use serde::{Deserialize, Serialize};

use crate::packet::cksum::ChecksumStatus;
use crate::packet::error::{Anomaly, DecodeError, DecodeResult, Diagnostic};
use crate::packet::tree::Field;
use crate::version::{Ospfv2, Ospfv3, Version};

// Database Description flags.
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct DbDescFlags: u8 {
        const MS = 0x01;
        const M = 0x02;
        const I = 0x04;
        const R = 0x08;
    }
}

// OSPF Packet Type.
//
// IANA registry:
// https://www.iana.org/assignments/ospfv2-parameters/ospfv2-parameters.xhtml#ospfv2-parameters-3
#[derive(Clone, Copy, Debug, Eq, Hash, FromPrimitive, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum PacketType {
    Hello = 0x01,
    DbDesc = 0x02,
    LsRequest = 0x03,
    LsUpdate = 0x04,
    LsAck = 0x05,
}

// Read-only state threaded through a whole decode pass.
//
// The recursion depth cell is only touched by the TLV engine; OSPF's flat
// TLV grammars use two levels in practice, but the engine supports
// arbitrarily nested grammars up to a hard ceiling.
#[derive(Debug, new)]
pub struct DecodeCtx {
    // Address family, for the field layouts that depend on it.
    pub af: AddressFamily,
    // Source and destination addresses of the enclosing IP packet, needed
    // only for the OSPFv3 pseudo-header checksum. `None` disables checksum
    // verification (e.g. for reassembled fragments).
    pub src_addr: Option<IpAddr>,
    pub dst_addr: Option<IpAddr>,
    #[new(default)]
    depth: Cell<u8>,
}

pub(crate) struct DepthGuard<'a> {
    ctx: &'a DecodeCtx,
}

// Authentication information carried in the OSPFv2 packet header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HdrAuth {
    None,
    Simple,
    Cryptographic { auth_len: u8 },
    Unknown(u16),
}

// Control data pulled out of a packet header while its fields are emitted.
#[derive(Clone, Copy, Debug)]
pub struct PacketHdr {
    pub pkt_type: PacketType,
    pub pkt_len: u16,
    pub router_id: Ipv4Addr,
    pub area_id: Ipv4Addr,
    pub cksum: u16,
    pub instance_id: Option<u8>,
    pub auth: HdrAuth,
}

// Trailing blocks announced by the packet body.
#[derive(Clone, Copy, Debug, Default)]
pub struct BodyInfo {
    pub lls: bool,
    pub at: bool,
}

// Terminal result of decoding one message.
#[derive(Clone, Debug, EnumAsInner, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum DecodeOutcome {
    Decoded(Field),
    DecodedWithWarnings(Field, Vec<Diagnostic>),
    Fatal(Field, DecodeError),
}

// ===== impl DecodeCtx =====

impl DecodeCtx {
    // Nesting ceiling for mutually recursive grammars. Deeper input is a
    // fatal error, never a stack overflow.
    pub const MAX_DEPTH: u8 = 8;

    pub(crate) fn recurse(&self) -> DecodeResult<DepthGuard<'_>> {
        let depth = self.depth.get() + 1;
        if depth > Self::MAX_DEPTH {
            return Err(DecodeError::RecursionLimit(Self::MAX_DEPTH));
        }
        self.depth.set(depth);
        Ok(DepthGuard { ctx: self })
    }
}

impl Default for DecodeCtx {
    fn default() -> DecodeCtx {
        DecodeCtx::new(AddressFamily::Ipv6, None, None)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.ctx.depth.set(self.ctx.depth.get() - 1);
    }
}

// ===== impl DecodeOutcome =====

impl DecodeOutcome {
    /// Returns the decoded field tree, complete or partial.
    pub fn tree(&self) -> &Field {
        match self {
            DecodeOutcome::Decoded(tree) => tree,
            DecodeOutcome::DecodedWithWarnings(tree, _) => tree,
            DecodeOutcome::Fatal(tree, _) => tree,
        }
    }

    /// Returns all diagnostics recorded in the tree.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            DecodeOutcome::Decoded(_) => Vec::new(),
            DecodeOutcome::DecodedWithWarnings(_, diagnostics) => {
                diagnostics.clone()
            }
            DecodeOutcome::Fatal(tree, _) => tree.all_diagnostics(),
        }
    }
}

// ===== global functions =====

// Decodes one OSPF message, sniffing the version from the first byte.
//
// This is a pure function: no I/O, no state kept between calls. Decoding
// always terminates and never reads outside the supplied buffer.
pub fn decode(data: Bytes, ctx: &DecodeCtx) -> DecodeOutcome {
    match data.first() {
        Some(&version) if version == Ospfv2::VERSION => {
            decode_version::<Ospfv2>(data, ctx)
        }
        Some(&version) if version == Ospfv3::VERSION => {
            decode_version::<Ospfv3>(data, ctx)
        }
        Some(&version) => {
            // Unknown version: return the raw header fields decoded so far.
            let mut root = Field::container(
                "ospf",
                ByteRegion::new(0, data.len()),
            );
            root.push(Field::uint("version", ByteRegion::new(0, 1), version));
            DecodeOutcome::Fatal(root, DecodeError::UnsupportedVersion(version))
        }
        None => {
            let root = Field::container("ospf", ByteRegion::new(0, 0));
            DecodeOutcome::Fatal(
                root,
                DecodeError::Truncated {
                    offset: 0,
                    wanted: 1,
                    available: 0,
                },
            )
        }
    }
}

// Decodes one OSPF message of a known version.
pub fn decode_version<V>(data: Bytes, ctx: &DecodeCtx) -> DecodeOutcome
where
    V: Version,
{
    let mut root = Field::container("ospf", ByteRegion::new(0, data.len()));
    match decode_message::<V>(&data, ctx, &mut root) {
        Ok(()) => {
            let diagnostics = root.all_diagnostics();
            if diagnostics.is_empty() {
                DecodeOutcome::Decoded(root)
            } else {
                DecodeOutcome::DecodedWithWarnings(root, diagnostics)
            }
        }
        Err(error) => {
            tracing::debug!(version = V::VERSION, %error, "fatal decode error");
            DecodeOutcome::Fatal(root, error)
        }
    }
}

fn decode_message<V>(
    data: &Bytes,
    ctx: &DecodeCtx,
    root: &mut Field,
) -> DecodeResult<()>
where
    V: Version,
{
    let mut cursor = Cursor::new(data.clone());

    // Decode the fixed header. Fields decoded before a failure are kept.
    let mut hdr_node = Field::container(
        "header",
        ByteRegion::new(0, std::cmp::min(
            V::PACKET_HDR_LENGTH as usize,
            data.len(),
        )),
    );
    let hdr = match V::decode_packet_hdr(&mut cursor, &mut hdr_node) {
        Ok(hdr) => {
            root.push(hdr_node);
            hdr
        }
        Err(error) => {
            root.push(hdr_node);
            return Err(error);
        }
    };

    // Resolve the address family once; everything below reads it from the
    // context.
    let ctx = DecodeCtx {
        af: V::address_family(&hdr, ctx),
        src_addr: ctx.src_addr,
        dst_addr: ctx.dst_addr,
        depth: Cell::new(0),
    };
    let ctx = &ctx;

    // Verify the message checksum. A zero checksum field (cryptographic
    // authentication) or a buffer shorter than the declared length skips
    // verification; a mismatch never stops body decoding.
    if hdr.cksum != 0 && data.len() >= hdr.pkt_len as usize {
        if let Some(status) = V::verify_cksum(data, hdr.pkt_len, ctx) {
            if let Some(hdr_node) = root.children.last_mut() {
                let cksum_region = ByteRegion::new(12, 2);
                match status {
                    ChecksumStatus::Match => {
                        hdr_node.push(Field::str(
                            "checksum_status",
                            cksum_region,
                            "correct",
                        ));
                    }
                    ChecksumStatus::Mismatch { expected } => {
                        hdr_node.record(
                            cksum_region,
                            Anomaly::ChecksumMismatch {
                                declared: hdr.cksum,
                                expected,
                            },
                        );
                    }
                }
            }
        }
    }

    // Bound the body by the declared packet length.
    let declared_body = (hdr.pkt_len - V::PACKET_HDR_LENGTH) as usize;
    let body_len = std::cmp::min(declared_body, cursor.remaining());
    if body_len < declared_body {
        root.record(
            cursor.remaining_region(),
            Anomaly::Truncated {
                wanted: declared_body,
                available: body_len,
            },
        );
    }
    let mut body_cursor = cursor.sub_cursor(body_len)?;

    let body_name = match hdr.pkt_type {
        PacketType::Hello => "hello",
        PacketType::DbDesc => "db_desc",
        PacketType::LsRequest => "ls_request",
        PacketType::LsUpdate => "ls_update",
        PacketType::LsAck => "ls_ack",
    };
    let mut body_node = Field::container(
        body_name,
        ByteRegion::new(body_cursor.position(), body_len),
    );

    let info = match hdr.pkt_type {
        PacketType::Hello => {
            V::decode_hello(&mut body_cursor, &mut body_node, ctx)
        }
        PacketType::DbDesc => {
            V::decode_db_desc(&mut body_cursor, &mut body_node, ctx)
        }
        PacketType::LsRequest => {
            V::decode_ls_request(&mut body_cursor, &mut body_node, ctx)
                .map(|_| BodyInfo::default())
        }
        PacketType::LsUpdate => {
            lsa::decode_ls_update::<V>(&mut body_cursor, &mut body_node, ctx)
                .map(|_| BodyInfo::default())
        }
        PacketType::LsAck => {
            lsa::decode_lsa_hdr_list::<V>(&mut body_cursor, &mut body_node)
                .map(|_| BodyInfo::default())
        }
    };
    let info = match info {
        Ok(info) => info,
        Err(error) => match error.demote() {
            Some(anomaly) => {
                body_node.record(body_cursor.remaining_region(), anomaly);
                BodyInfo::default()
            }
            None => {
                root.push(body_node);
                return Err(error);
            }
        },
    };

    // Bytes inside the declared length that no field claimed.
    if !body_cursor.is_empty() {
        let region = body_cursor.remaining_region();
        let value = body_cursor.take(region.length)?;
        body_node.push(Field::raw("trailing_data", region, value));
    }
    root.push(body_node);

    // Optional trailing blocks live past the declared packet length and
    // never overlap the body.
    if !cursor.is_empty() {
        V::decode_trailer(&mut cursor, &hdr, &info, root, ctx)?;

        if !cursor.is_empty() {
            let region = cursor.remaining_region();
            let value = cursor.take(region.length)?;
            root.push(Field::raw("trailer", region, value));
        }
    }

    Ok(())
}
