//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod lsa;

use std::net::Ipv4Addr;

use bitflags::bitflags;
use num_traits::FromPrimitive;
use prism_utils::bytes::{ByteRegion, Cursor};
use prism_utils::ip::AddressFamily;

use crate::packet::cksum::{self, ChecksumStatus};
use crate::packet::error::{Anomaly, DecodeError, DecodeResult};
use crate::packet::lsa::{decode_lsa_hdr_list, LsaHdr, LSA_HDR_LENGTH};
use crate::packet::tree::Field;
use crate::packet::{
    auth, lls, BodyInfo, DbDescFlags, DecodeCtx, HdrAuth, PacketHdr,
    PacketType,
};
use crate::version::{Ospfv3, Version};

// OSPFv3 Options field.
//
// IANA registry:
// https://www.iana.org/assignments/ospfv3-parameters/ospfv3-parameters.xhtml#ospfv3-parameters-1
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct Options: u32 {
        const V6 = 0x000001;
        const E = 0x000002;
        const N = 0x000008;
        const R = 0x000010;
        const DC = 0x000020;
        const AF = 0x000100;
        const L = 0x000200;
        const AT = 0x000400;
    }
}

// Instance IDs mapped to the IPv4 unicast address family (RFC 5838).
const AF_IPV4_INSTANCE_IDS: std::ops::RangeInclusive<u8> = 64..=95;

// Minimum Hello body length.
const HELLO_BASE_LENGTH: u16 = 20;

// Minimum Database Description body length.
const DB_DESC_BASE_LENGTH: u16 = 12;

// Link State Request entry length.
const LS_REQUEST_ENTRY_LENGTH: u16 = 12;

// Decodes the 24-bit options field, ignoring unknown bits.
fn decode_options(cursor: &mut Cursor, tree: &mut Field) -> DecodeResult<Options> {
    let start = cursor.position();
    let options = Options::from_bits_truncate(cursor.get_u24()?);
    tree.push(Field::flags(
        "options",
        cursor.region_since(start),
        options.bits(),
    ));
    Ok(options)
}

// ===== impl Ospfv3 =====

impl Version for Ospfv3 {
    const VERSION: u8 = 3;
    const PACKET_HDR_LENGTH: u16 = 16;

    // The address family follows the instance ID ranges of RFC 5838; the
    // context supplies the default outside the IPv4 ranges.
    fn address_family(hdr: &PacketHdr, ctx: &DecodeCtx) -> AddressFamily {
        match hdr.instance_id {
            Some(instance_id)
                if AF_IPV4_INSTANCE_IDS.contains(&instance_id) =>
            {
                AddressFamily::Ipv4
            }
            _ => ctx.af,
        }
    }

    //
    // OSPFv3 packet header.
    //
    // Encoding format:
    //
    //  0                   1                   2                   3
    //  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |   Version #   |     Type      |         Packet length         |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                         Router ID                             |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                          Area ID                              |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |          Checksum             |  Instance ID  |      0        |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //
    fn decode_packet_hdr(
        cursor: &mut Cursor,
        tree: &mut Field,
    ) -> DecodeResult<PacketHdr> {
        // Parse version.
        let start = cursor.position();
        let version = cursor.get_u8()?;
        tree.push(Field::uint("version", cursor.region_since(start), version));
        if version != Self::VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }

        // Parse packet type.
        let start = cursor.position();
        let pkt_type_raw = cursor.get_u8()?;
        tree.push(Field::uint(
            "pkt_type",
            cursor.region_since(start),
            pkt_type_raw,
        ));
        let pkt_type = match PacketType::from_u8(pkt_type_raw) {
            Some(pkt_type) => pkt_type,
            None => return Err(DecodeError::UnknownPacketType(pkt_type_raw)),
        };

        // Parse and validate message length.
        let start = cursor.position();
        let pkt_len = cursor.get_u16()?;
        tree.push(Field::uint("pkt_len", cursor.region_since(start), pkt_len));
        if pkt_len < Self::PACKET_HDR_LENGTH {
            return Err(DecodeError::InvalidLength(pkt_len));
        }

        // Parse Router-ID.
        let start = cursor.position();
        let router_id = cursor.get_ipv4()?;
        tree.push(Field::ipv4(
            "router_id",
            cursor.region_since(start),
            router_id,
        ));

        // Parse Area ID.
        let start = cursor.position();
        let area_id = cursor.get_ipv4()?;
        tree.push(Field::ipv4("area_id", cursor.region_since(start), area_id));

        // Parse checksum (verified separately).
        let start = cursor.position();
        let cksum = cursor.get_u16()?;
        tree.push(Field::uint("checksum", cursor.region_since(start), cksum));

        // Parse Instance ID.
        let start = cursor.position();
        let instance_id = cursor.get_u8()?;
        tree.push(Field::uint(
            "instance_id",
            cursor.region_since(start),
            instance_id,
        ));

        // Parse reserved field.
        let start = cursor.position();
        let reserved = cursor.get_u8()?;
        if reserved != 0 {
            tree.record(
                cursor.region_since(start),
                Anomaly::ReservedNonZero {
                    value: reserved as u32,
                },
            );
        }

        Ok(PacketHdr {
            pkt_type,
            pkt_len,
            router_id,
            area_id,
            cksum,
            instance_id: Some(instance_id),
            auth: HdrAuth::None,
        })
    }

    // IPv6-style checksum covering a synthesized pseudo-header and the whole
    // message. Without the enclosing addresses there is nothing to verify.
    fn verify_cksum(
        data: &[u8],
        pkt_len: u16,
        ctx: &DecodeCtx,
    ) -> Option<ChecksumStatus> {
        let src_addr = ctx.src_addr?;
        let dst_addr = ctx.dst_addr?;

        let declared = u16::from_be_bytes([data[12], data[13]]);
        let pseudo_hdr =
            cksum::pseudo_header(&src_addr, &dst_addr, pkt_len as u32);
        let expected = cksum::compute(&[
            &pseudo_hdr,
            &data[0..12],
            &[0, 0],
            &data[14..pkt_len as usize],
        ]);
        // The pseudo-header carries the non-zero OSPF protocol number, so
        // the complemented sum can never be all-ones (RFC 1624, section 3).
        debug_assert_ne!(expected, 0xffff);
        Some(cksum::verify(declared, expected))
    }

    //
    // OSPFv3 Hello packet.
    //
    // Encoding format (packet body):
    //
    //  0                   1                   2                   3
    //  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                        Interface ID                           |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // | Rtr Priority  |             Options                           |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |        HelloInterval          |       RouterDeadInterval      |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                   Designated Router ID                        |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                Backup Designated Router ID                    |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                         Neighbor ID                           |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //
    fn decode_hello(
        cursor: &mut Cursor,
        tree: &mut Field,
        _ctx: &DecodeCtx,
    ) -> DecodeResult<BodyInfo> {
        if cursor.remaining() < HELLO_BASE_LENGTH as usize {
            return Err(DecodeError::InvalidLength(cursor.remaining() as u16));
        }

        let start = cursor.position();
        let iface_id = cursor.get_u32()?;
        tree.push(Field::uint(
            "iface_id",
            cursor.region_since(start),
            iface_id,
        ));
        let start = cursor.position();
        let priority = cursor.get_u8()?;
        tree.push(Field::uint(
            "priority",
            cursor.region_since(start),
            priority,
        ));
        let options = decode_options(cursor, tree)?;
        let start = cursor.position();
        let hello_interval = cursor.get_u16()?;
        tree.push(Field::uint(
            "hello_interval",
            cursor.region_since(start),
            hello_interval,
        ));
        let start = cursor.position();
        let dead_interval = cursor.get_u16()?;
        tree.push(Field::uint(
            "dead_interval",
            cursor.region_since(start),
            dead_interval,
        ));
        let start = cursor.position();
        let dr = cursor.get_ipv4()?;
        tree.push(Field::ipv4("dr", cursor.region_since(start), dr));
        let start = cursor.position();
        let bdr = cursor.get_ipv4()?;
        tree.push(Field::ipv4("bdr", cursor.region_since(start), bdr));

        // Parse list of neighbors.
        while cursor.remaining() >= 4 {
            let start = cursor.position();
            let nbr = cursor.get_ipv4()?;
            tree.push(Field::ipv4("neighbor", cursor.region_since(start), nbr));
        }

        Ok(BodyInfo {
            lls: options.contains(Options::L),
            at: options.contains(Options::AT),
        })
    }

    //
    // OSPFv3 Database Description packet: reserved, options, MTU, reserved,
    // DD flags, sequence number, then bare LSA headers.
    //
    fn decode_db_desc(
        cursor: &mut Cursor,
        tree: &mut Field,
        _ctx: &DecodeCtx,
    ) -> DecodeResult<BodyInfo> {
        if cursor.remaining() < DB_DESC_BASE_LENGTH as usize {
            return Err(DecodeError::InvalidLength(cursor.remaining() as u16));
        }

        let _ = cursor.get_u8()?;
        let options = decode_options(cursor, tree)?;
        let start = cursor.position();
        let mtu = cursor.get_u16()?;
        tree.push(Field::uint("mtu", cursor.region_since(start), mtu));
        let _ = cursor.get_u8()?;
        let start = cursor.position();
        let dd_flags = DbDescFlags::from_bits_truncate(cursor.get_u8()?);
        tree.push(Field::flags(
            "dd_flags",
            cursor.region_since(start),
            dd_flags.bits(),
        ));
        let start = cursor.position();
        let dd_seq_no = cursor.get_u32()?;
        tree.push(Field::uint(
            "dd_seq_no",
            cursor.region_since(start),
            dd_seq_no,
        ));

        // Parse list of LSA headers.
        decode_lsa_hdr_list::<Ospfv3>(cursor, tree)?;

        Ok(BodyInfo {
            lls: options.contains(Options::L),
            at: options.contains(Options::AT),
        })
    }

    //
    // OSPFv3 Link State Request packet: a run of fixed 12-byte records.
    //
    fn decode_ls_request(
        cursor: &mut Cursor,
        tree: &mut Field,
        _ctx: &DecodeCtx,
    ) -> DecodeResult<()> {
        while cursor.remaining() >= LS_REQUEST_ENTRY_LENGTH as usize {
            let start = cursor.position();
            let mut entry = Field::container(
                "request",
                ByteRegion::new(start, LS_REQUEST_ENTRY_LENGTH as usize),
            );
            let _ = cursor.get_u16()?;
            let field_start = cursor.position();
            let ls_type = cursor.get_u16()?;
            entry.push(Field::uint(
                "ls_type",
                cursor.region_since(field_start),
                ls_type,
            ));
            let field_start = cursor.position();
            let lsa_id = cursor.get_ipv4()?;
            entry.push(Field::ipv4(
                "lsa_id",
                cursor.region_since(field_start),
                lsa_id,
            ));
            let field_start = cursor.position();
            let adv_rtr = cursor.get_ipv4()?;
            entry.push(Field::ipv4(
                "adv_rtr",
                cursor.region_since(field_start),
                adv_rtr,
            ));
            tree.push(entry);
        }
        Ok(())
    }

    //
    // OSPFv3 LSA header. The 16-bit LSA type carries the U-bit, the
    // flooding scope, and the function code.
    //
    fn decode_lsa_hdr(
        cursor: &mut Cursor,
        tree: &mut Field,
    ) -> DecodeResult<LsaHdr> {
        let start = cursor.position();
        let age = cursor.get_u16()?;
        let age_region = cursor.region_since(start);
        tree.push(Field::uint("age", age_region, age & 0x7fff));
        tree.push(Field::uint("do_not_age", age_region, (age >> 15) & 0x1));

        let start = cursor.position();
        let ls_type = cursor.get_u16()?;
        let type_region = cursor.region_since(start);
        tree.push(Field::uint("lsa_type", type_region, ls_type));
        tree.push(Field::uint(
            "function_code",
            type_region,
            ls_type & lsa::FUNCTION_CODE_MASK,
        ));
        tree.push(Field::uint(
            "u_bit",
            type_region,
            (ls_type & lsa::U_BIT) >> 15,
        ));
        let scope_bits = ls_type & lsa::SCOPE_MASK;
        let scope = match scope_bits {
            lsa::SCOPE_LINK => "link",
            lsa::SCOPE_AREA => "area",
            lsa::SCOPE_AS => "as",
            _ => "reserved",
        };
        tree.push(Field::str("scope", type_region, scope));
        if scope_bits == lsa::SCOPE_RESERVED {
            tree.record(
                type_region,
                Anomaly::ReservedNonZero {
                    value: (scope_bits >> 13) as u32,
                },
            );
        }

        let start = cursor.position();
        let lsa_id = cursor.get_ipv4()?;
        tree.push(Field::ipv4("lsa_id", cursor.region_since(start), lsa_id));
        let start = cursor.position();
        let adv_rtr = cursor.get_ipv4()?;
        tree.push(Field::ipv4("adv_rtr", cursor.region_since(start), adv_rtr));
        let start = cursor.position();
        let seq_no = cursor.get_u32()?;
        tree.push(Field::uint("seq_no", cursor.region_since(start), seq_no));
        let start = cursor.position();
        let lsa_cksum = cursor.get_u16()?;
        tree.push(Field::uint(
            "checksum",
            cursor.region_since(start),
            lsa_cksum,
        ));
        let start = cursor.position();
        let length = cursor.get_u16()?;
        tree.push(Field::uint("length", cursor.region_since(start), length));

        Ok(LsaHdr {
            ls_type,
            lsa_id,
            cksum: lsa_cksum,
            length,
        })
    }

    // Per-function-code minimum LSA length, header included. Extended LSA
    // bodies are mostly TLVs, so only their fixed parts count.
    fn lsa_min_length(ls_type: u16) -> u16 {
        match ls_type & lsa::FUNCTION_CODE_MASK {
            1 => 24,
            2 => 28,
            3 => 28,
            4 => 32,
            5 | 7 => 28,
            8 => 44,
            9 => 32,
            33 | 34 | 40 => 24,
            41 => 32,
            _ => LSA_HDR_LENGTH,
        }
    }

    fn decode_lsa_body(
        ls_type: u16,
        lsa_id: Ipv4Addr,
        cursor: &mut Cursor,
        tree: &mut Field,
        ctx: &DecodeCtx,
    ) -> DecodeResult<()> {
        lsa::decode_lsa_body(ls_type, lsa_id, cursor, tree, ctx)
    }

    // OSPFv3 trailing blocks: the LLS data block first, then the
    // authentication trailer (RFC 7166 includes LLS in its scope).
    fn decode_trailer(
        cursor: &mut Cursor,
        _hdr: &PacketHdr,
        info: &BodyInfo,
        tree: &mut Field,
        ctx: &DecodeCtx,
    ) -> DecodeResult<()> {
        if info.lls && !cursor.is_empty() {
            lls::decode_lls_block(cursor, tree, ctx)?;
        }
        if info.at && !cursor.is_empty() {
            auth::decode_auth_trailer_v3(cursor, tree)?;
        }
        Ok(())
    }
}
