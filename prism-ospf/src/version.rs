//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use prism_utils::bytes::Cursor;
use prism_utils::ip::AddressFamily;

use crate::packet::cksum::ChecksumStatus;
use crate::packet::error::DecodeResult;
use crate::packet::lsa::LsaHdr;
use crate::packet::tree::Field;
use crate::packet::{BodyInfo, DecodeCtx, PacketHdr};

// OSPF version-specific code.
pub trait Version
where
    Self: 'static + Send + Sync + Clone + Copy + Default + Eq + PartialEq + std::fmt::Debug,
{
    const VERSION: u8;
    const PACKET_HDR_LENGTH: u16;

    // Address family the message's variable-size address fields use.
    fn address_family(hdr: &PacketHdr, ctx: &DecodeCtx) -> AddressFamily;

    // Decode the fixed packet header, appending its fields to `tree`.
    fn decode_packet_hdr(
        cursor: &mut Cursor,
        tree: &mut Field,
    ) -> DecodeResult<PacketHdr>;

    // Compute the expected message checksum, or `None` when the context
    // lacks what the computation needs.
    fn verify_cksum(
        data: &[u8],
        pkt_len: u16,
        ctx: &DecodeCtx,
    ) -> Option<ChecksumStatus>;

    // Decode the Hello packet body.
    fn decode_hello(
        cursor: &mut Cursor,
        tree: &mut Field,
        ctx: &DecodeCtx,
    ) -> DecodeResult<BodyInfo>;

    // Decode the Database Description packet body.
    fn decode_db_desc(
        cursor: &mut Cursor,
        tree: &mut Field,
        ctx: &DecodeCtx,
    ) -> DecodeResult<BodyInfo>;

    // Decode the Link State Request packet body.
    fn decode_ls_request(
        cursor: &mut Cursor,
        tree: &mut Field,
        ctx: &DecodeCtx,
    ) -> DecodeResult<()>;

    // Decode one LSA header, appending its fields to `tree`.
    fn decode_lsa_hdr(
        cursor: &mut Cursor,
        tree: &mut Field,
    ) -> DecodeResult<LsaHdr>;

    // Minimum valid LSA length (header included) for an LSA type.
    fn lsa_min_length(ls_type: u16) -> u16;

    // Decode a type-dispatched LSA body inside its bounded cursor.
    fn decode_lsa_body(
        ls_type: u16,
        lsa_id: Ipv4Addr,
        cursor: &mut Cursor,
        tree: &mut Field,
        ctx: &DecodeCtx,
    ) -> DecodeResult<()>;

    // Decode the trailing blocks located past the declared packet length.
    fn decode_trailer(
        cursor: &mut Cursor,
        hdr: &PacketHdr,
        info: &BodyInfo,
        tree: &mut Field,
        ctx: &DecodeCtx,
    ) -> DecodeResult<()>;
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Ospfv2();

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Ospfv3();
