//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod lsa;
pub mod lsa_opaque;

use std::net::Ipv4Addr;

use bitflags::bitflags;
use num_derive::FromPrimitive;
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
use crate::version::{Ospfv2, Version};

// OSPFv2 Options field.
//
// IANA registry:
// https://www.iana.org/assignments/ospfv2-parameters/ospfv2-parameters.xhtml#ospfv2-parameters-1
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct Options: u8 {
        const MT = 0x01;
        const E = 0x02;
        const MC = 0x04;
        const NP = 0x08;
        const L = 0x10;
        const DC = 0x20;
        const O = 0x40;
        const DN = 0x80;
    }
}

// OSPFv2 authentication type.
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
pub enum AuthType {
    Null = 0x00,
    Simple = 0x01,
    Cryptographic = 0x02,
}

// OSPFv2 packet header ranges.
const CKSUM_RANGE: std::ops::Range<usize> = 12..14;
const AUTH_RANGE: std::ops::Range<usize> = 16..24;

// Minimum Hello body length.
const HELLO_BASE_LENGTH: u16 = 20;

// Minimum Database Description body length.
const DB_DESC_BASE_LENGTH: u16 = 8;

// Link State Request entry length.
const LS_REQUEST_ENTRY_LENGTH: u16 = 12;

// ===== impl Ospfv2 =====

impl Version for Ospfv2 {
    const VERSION: u8 = 2;
    const PACKET_HDR_LENGTH: u16 = 24;

    fn address_family(_hdr: &PacketHdr, _ctx: &DecodeCtx) -> AddressFamily {
        AddressFamily::Ipv4
    }

    //
    // OSPFv2 packet header.
    //
    // Encoding format:
    //
    //  0                   1                   2                   3
    //  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |   Version #   |     Type      |         Packet length         |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                          Router ID                            |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                           Area ID                             |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |           Checksum            |             AuType            |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                       Authentication                          |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                       Authentication                          |
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

        // Parse authentication data.
        let start = cursor.position();
        let au_type = cursor.get_u16()?;
        tree.push(Field::uint(
            "auth_type",
            cursor.region_since(start),
            au_type,
        ));
        let auth = match AuthType::from_u16(au_type) {
            Some(AuthType::Null) => {
                let start = cursor.position();
                let value = cursor.take(8)?;
                tree.push(Field::raw(
                    "auth_data",
                    cursor.region_since(start),
                    value,
                ));
                HdrAuth::None
            }
            Some(AuthType::Simple) => {
                let start = cursor.position();
                let value = cursor.take(8)?;
                let end =
                    value.iter().position(|&b| b == 0).unwrap_or(value.len());
                let password = String::from_utf8_lossy(&value[..end]);
                tree.push(Field::str(
                    "auth_password",
                    cursor.region_since(start),
                    password,
                ));
                HdrAuth::Simple
            }
            Some(AuthType::Cryptographic) => {
                let start = cursor.position();
                let reserved = cursor.get_u16()?;
                if reserved != 0 {
                    tree.record(
                        cursor.region_since(start),
                        Anomaly::ReservedNonZero {
                            value: reserved as u32,
                        },
                    );
                }
                let start = cursor.position();
                let key_id = cursor.get_u8()?;
                tree.push(Field::uint(
                    "auth_key_id",
                    cursor.region_since(start),
                    key_id,
                ));
                let start = cursor.position();
                let auth_len = cursor.get_u8()?;
                tree.push(Field::uint(
                    "auth_data_len",
                    cursor.region_since(start),
                    auth_len,
                ));
                let start = cursor.position();
                let seqno = cursor.get_u32()?;
                tree.push(Field::uint(
                    "auth_seqno",
                    cursor.region_since(start),
                    seqno,
                ));
                HdrAuth::Cryptographic { auth_len }
            }
            None => {
                let start = cursor.position();
                let value = cursor.take(8)?;
                let region = cursor.region_since(start);
                tree.push(Field::raw("auth_data", region, value));
                tree.record(region, Anomaly::UnknownType { code: au_type });
                HdrAuth::Unknown(au_type)
            }
        };

        Ok(PacketHdr {
            pkt_type,
            pkt_len,
            router_id,
            area_id,
            cksum,
            instance_id: None,
            auth,
        })
    }

    // The OSPFv2 checksum covers the whole message except the 64-bit
    // authentication field.
    fn verify_cksum(
        data: &[u8],
        pkt_len: u16,
        _ctx: &DecodeCtx,
    ) -> Option<ChecksumStatus> {
        let declared =
            u16::from_be_bytes([data[CKSUM_RANGE.start], data[CKSUM_RANGE.start + 1]]);
        let expected = cksum::compute(&[
            &data[0..CKSUM_RANGE.start],
            &[0, 0],
            &data[CKSUM_RANGE.end..AUTH_RANGE.start],
            &data[AUTH_RANGE.end..pkt_len as usize],
        ]);
        // The summed data always contains the non-zero version byte, so the
        // complemented sum can never be all-ones (RFC 1624, section 3).
        debug_assert_ne!(expected, 0xffff);
        Some(cksum::verify(declared, expected))
    }

    //
    // OSPFv2 Hello packet.
    //
    // Encoding format (packet body):
    //
    //  0                   1                   2                   3
    //  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                        Network Mask                           |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |         HelloInterval         |    Options    |    Rtr Pri    |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                     RouterDeadInterval                        |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                      Designated Router                        |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                   Backup Designated Router                    |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                          Neighbor                             |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                              ...                              |
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
        let network_mask = cursor.get_ipv4()?;
        tree.push(Field::ipv4(
            "network_mask",
            cursor.region_since(start),
            network_mask,
        ));
        let start = cursor.position();
        let hello_interval = cursor.get_u16()?;
        tree.push(Field::uint(
            "hello_interval",
            cursor.region_since(start),
            hello_interval,
        ));
        // Ignore unknown options.
        let start = cursor.position();
        let options = Options::from_bits_truncate(cursor.get_u8()?);
        tree.push(Field::flags(
            "options",
            cursor.region_since(start),
            options.bits(),
        ));
        let start = cursor.position();
        let priority = cursor.get_u8()?;
        tree.push(Field::uint(
            "priority",
            cursor.region_since(start),
            priority,
        ));
        let start = cursor.position();
        let dead_interval = cursor.get_u32()?;
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
            at: false,
        })
    }

    //
    // OSPFv2 Database Description packet.
    //
    // Encoding format (packet body):
    //
    //  0                   1                   2                   3
    //  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |         Interface MTU         |    Options    |0|0|0|0|0|I|M|MS
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                     DD sequence number                        |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                      An LSA Header ...                        |
    //
    fn decode_db_desc(
        cursor: &mut Cursor,
        tree: &mut Field,
        _ctx: &DecodeCtx,
    ) -> DecodeResult<BodyInfo> {
        if cursor.remaining() < DB_DESC_BASE_LENGTH as usize {
            return Err(DecodeError::InvalidLength(cursor.remaining() as u16));
        }

        let start = cursor.position();
        let mtu = cursor.get_u16()?;
        tree.push(Field::uint("mtu", cursor.region_since(start), mtu));
        let start = cursor.position();
        let options = Options::from_bits_truncate(cursor.get_u8()?);
        tree.push(Field::flags(
            "options",
            cursor.region_since(start),
            options.bits(),
        ));
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
        decode_lsa_hdr_list::<Ospfv2>(cursor, tree)?;

        Ok(BodyInfo {
            lls: options.contains(Options::L),
            at: false,
        })
    }

    //
    // OSPFv2 Link State Request packet: a run of fixed 12-byte records.
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
            let field_start = cursor.position();
            let ls_type = cursor.get_u32()?;
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
    // OSPFv2 LSA header.
    //
    // Encoding format:
    //
    //  0                   1                   2                   3
    //  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |            LS age             |    Options    |    LS type    |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                        Link State ID                          |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                     Advertising Router                        |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                     LS sequence number                        |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |         LS checksum           |             length            |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
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
        let options = Options::from_bits_truncate(cursor.get_u8()?);
        tree.push(Field::flags(
            "options",
            cursor.region_since(start),
            options.bits(),
        ));

        let start = cursor.position();
        let ls_type = cursor.get_u8()?;
        tree.push(Field::uint("ls_type", cursor.region_since(start), ls_type));

        // For opaque LSAs the link state ID carries an opaque type and an
        // opaque ID instead of an address.
        let start = cursor.position();
        let lsa_id = cursor.get_ipv4()?;
        let lsa_id_region = cursor.region_since(start);
        if lsa::LsaTypeCode::from_u8(ls_type)
            .is_some_and(|code| code.is_opaque())
        {
            let octets = lsa_id.octets();
            tree.push(Field::uint(
                "opaque_type",
                ByteRegion::new(start, 1),
                octets[0],
            ));
            let opaque_id =
                u32::from_be_bytes([0, octets[1], octets[2], octets[3]]);
            tree.push(Field::uint(
                "opaque_id",
                ByteRegion::new(start + 1, 3),
                opaque_id,
            ));
        } else {
            tree.push(Field::ipv4("lsa_id", lsa_id_region, lsa_id));
        }

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
            ls_type: ls_type as u16,
            lsa_id,
            cksum: lsa_cksum,
            length,
        })
    }

    // Per-type minimum LSA length, header included. Unrecognized types fall
    // back to the universal header-only floor.
    fn lsa_min_length(ls_type: u16) -> u16 {
        match ls_type {
            1 => 24,
            2 => 28,
            3 | 4 => 28,
            5 | 7 => 36,
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

    // OSPFv2 trailing blocks: the cryptographic authentication digest comes
    // right after the declared packet length, then the LLS data block.
    fn decode_trailer(
        cursor: &mut Cursor,
        hdr: &PacketHdr,
        info: &BodyInfo,
        tree: &mut Field,
        ctx: &DecodeCtx,
    ) -> DecodeResult<()> {
        if let HdrAuth::Cryptographic { auth_len } = hdr.auth {
            auth::decode_auth_trailer_v2(cursor, auth_len, tree)?;
        }
        if info.lls && !cursor.is_empty() {
            lls::decode_lls_block(cursor, tree, ctx)?;
        }
        Ok(())
    }
}
