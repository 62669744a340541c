//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::LazyLock as Lazy;

use bytes::Bytes;
use ipnetwork::IpNetwork;
use prism_ospf::packet::error::Anomaly;
use prism_ospf::packet::tree::FieldValue;
use prism_ospf::packet::{decode, DecodeCtx, DecodeOutcome};
use prism_utils::ip::AddressFamily;

use crate::{flags, ipv4, uint};

//
// Helper functions.
//

fn test_decode(bytes: &[u8]) -> DecodeOutcome {
    let ctx = DecodeCtx::new(AddressFamily::Ipv6, None, None);
    decode(Bytes::copy_from_slice(bytes), &ctx)
}

fn test_decode_with_addrs(bytes: &[u8]) -> DecodeOutcome {
    let src_addr: IpAddr = Ipv6Addr::from_str("fe80::1").unwrap().into();
    let dst_addr: IpAddr = Ipv6Addr::from_str("ff02::5").unwrap().into();
    let ctx =
        DecodeCtx::new(AddressFamily::Ipv6, Some(src_addr), Some(dst_addr));
    decode(Bytes::copy_from_slice(bytes), &ctx)
}

//
// Test packets.
//

static HELLO1: Lazy<Vec<u8>> = Lazy::new(|| {
    vec![
        // Packet header.
        0x03, 0x01, 0x00, 0x28, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00,
        // Hello body.
        0x00, 0x00, 0x00, 0x07, 0x01, 0x00, 0x00, 0x13, 0x00, 0x0a, 0x00,
        0x28, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00, 0x00, 0x03, 0x03,
        0x03, 0x03,
    ]
});

static LSUPDATE1: Lazy<Vec<u8>> = Lazy::new(|| {
    vec![
        // Packet header.
        0x03, 0x04, 0x00, 0x3c, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00,
        // One advertised LSA.
        0x00, 0x00, 0x00, 0x01,
        // Router-LSA header.
        0x00, 0x01, 0x20, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01,
        0x01, 0x80, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x28,
        // Router-LSA body with one interface.
        0x01, 0x00, 0x00, 0x33,
        0x01, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
        0x02, 0x03, 0x03, 0x03, 0x03,
    ]
});

#[test]
fn test_decode_hello1() {
    let outcome = test_decode(&HELLO1);
    let tree = match outcome {
        DecodeOutcome::Decoded(ref tree) => tree,
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    let hdr = tree.get("header").unwrap();
    assert_eq!(uint(hdr, "version"), 3);
    assert_eq!(uint(hdr, "instance_id"), 0);
    assert_eq!(ipv4(hdr, "router_id"), Ipv4Addr::from_str("1.1.1.1").unwrap());

    let hello = tree.get("hello").unwrap();
    assert_eq!(uint(hello, "iface_id"), 7);
    assert_eq!(uint(hello, "priority"), 1);
    assert_eq!(flags(hello, "options"), 0x13);
    assert_eq!(uint(hello, "hello_interval"), 10);
    assert_eq!(uint(hello, "dead_interval"), 40);
    assert_eq!(ipv4(hello, "dr"), Ipv4Addr::from_str("2.2.2.2").unwrap());
    let neighbors: Vec<_> = hello.fields("neighbor").collect();
    assert_eq!(neighbors.len(), 1);
    assert_eq!(
        neighbors[0].value,
        FieldValue::Ipv4(Ipv4Addr::from_str("3.3.3.3").unwrap())
    );
}

// The pseudo-header checksum is only verified when the enclosing addresses
// are known; a mismatch is a warning, never an abort.
#[test]
fn test_decode_hello1_checksum() {
    let mut bytes = HELLO1.clone();
    bytes[12] = 0xde;
    bytes[13] = 0xad;

    // Without the enclosing addresses the checksum is left unverified.
    let outcome = test_decode(&bytes);
    assert!(matches!(outcome, DecodeOutcome::Decoded(_)));

    // With them, the bogus checksum draws a mismatch warning.
    let outcome = test_decode_with_addrs(&bytes);
    let diagnostics = outcome.diagnostics();
    assert!(diagnostics.iter().any(|diagnostic| matches!(
        diagnostic.anomaly,
        Anomaly::ChecksumMismatch { .. }
    )));
    assert!(outcome.tree().get("hello").is_some());
}

#[test]
fn test_decode_dbdesc1() {
    let bytes: Vec<u8> = vec![
        // Packet header (Database Description, 28 bytes).
        0x03, 0x02, 0x00, 0x1c, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00,
        // Fixed fields: reserved, options, MTU, reserved, flags, sequence.
        0x00, 0x00, 0x00, 0x13, 0x05, 0xdc, 0x00, 0x07, 0x00, 0x00, 0x20,
        0x00,
    ];

    let outcome = test_decode(&bytes);
    let tree = match outcome {
        DecodeOutcome::Decoded(ref tree) => tree,
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    let db_desc = tree.get("db_desc").unwrap();
    assert_eq!(flags(db_desc, "options"), 0x13);
    assert_eq!(uint(db_desc, "mtu"), 1500);
    assert_eq!(flags(db_desc, "dd_flags"), 0x07);
    assert_eq!(uint(db_desc, "dd_seq_no"), 0x2000);
}

#[test]
fn test_decode_lsupdate1() {
    let outcome = test_decode(&LSUPDATE1);
    let tree = match outcome {
        DecodeOutcome::Decoded(ref tree) => tree,
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    let update = tree.get("ls_update").unwrap();
    assert_eq!(uint(update, "lsa_count"), 1);

    let lsa = update.get("lsa").unwrap();
    assert_eq!(uint(lsa, "lsa_type"), 0x2001);
    assert_eq!(uint(lsa, "function_code"), 1);
    assert_eq!(
        lsa.get("scope").unwrap().value,
        FieldValue::Str("area".to_owned())
    );

    let link = lsa.get("link").unwrap();
    assert_eq!(uint(link, "link_type"), 1);
    assert_eq!(uint(link, "metric"), 10);
    assert_eq!(uint(link, "iface_id"), 1);
    assert_eq!(uint(link, "nbr_iface_id"), 2);
    assert_eq!(
        ipv4(link, "nbr_router_id"),
        Ipv4Addr::from_str("3.3.3.3").unwrap()
    );
}

// Inter-Area-Prefix-LSA with an IPv6 prefix encoded in two 32-bit words.
#[test]
fn test_decode_inter_area_prefix_lsa1() {
    let bytes: Vec<u8> = vec![
        // Packet header (LS Update, 56 bytes).
        0x03, 0x04, 0x00, 0x38, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00,
        // One advertised LSA.
        0x00, 0x00, 0x00, 0x01,
        // Inter-Area-Prefix-LSA header (36 bytes).
        0x00, 0x01, 0x20, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01,
        0x01, 0x80, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x24,
        // Body: metric 10, then 2001:db8::/64.
        0x00, 0x00, 0x00, 0x0a, 0x40, 0x00, 0x00, 0x00, 0x20, 0x01, 0x0d,
        0xb8, 0x00, 0x00, 0x00, 0x00,
    ];

    let outcome = test_decode(&bytes);
    let tree = match outcome {
        DecodeOutcome::Decoded(ref tree) => tree,
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    let lsa = tree.get("ls_update").unwrap().get("lsa").unwrap();
    assert_eq!(uint(lsa, "metric"), 10);
    assert_eq!(
        lsa.get("prefix").unwrap().value,
        FieldValue::Prefix(IpNetwork::from_str("2001:db8::/64").unwrap())
    );
}

// E-Router-LSA: the interface description moves into a Router-Link TLV.
#[test]
fn test_decode_ext_router_lsa1() {
    let bytes: Vec<u8> = vec![
        // Packet header (LS Update, 64 bytes).
        0x03, 0x04, 0x00, 0x40, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00,
        // One advertised LSA.
        0x00, 0x00, 0x00, 0x01,
        // E-Router-LSA header (44 bytes), type U|area|33.
        0x00, 0x01, 0xa0, 0x21, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01,
        0x01, 0x80, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x2c,
        // Fixed part: flags and options.
        0x01, 0x00, 0x00, 0x33,
        // Router-Link TLV.
        0x00, 0x01, 0x00, 0x10,
        0x02, 0x00, 0x00, 0x40, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00,
        0x06, 0x04, 0x04, 0x04, 0x04,
    ];

    let outcome = test_decode(&bytes);
    let tree = match outcome {
        DecodeOutcome::Decoded(ref tree) => tree,
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    let lsa = tree.get("ls_update").unwrap().get("lsa").unwrap();
    assert_eq!(uint(lsa, "function_code"), 33);
    assert_eq!(uint(lsa, "u_bit"), 1);

    let link = lsa.get("router_link").unwrap();
    assert_eq!(uint(link, "tlv_type"), 1);
    assert_eq!(uint(link, "link_type"), 2);
    assert_eq!(uint(link, "metric"), 64);
    assert_eq!(uint(link, "iface_id"), 5);
    assert_eq!(uint(link, "nbr_iface_id"), 6);
    assert_eq!(
        ipv4(link, "nbr_router_id"),
        Ipv4Addr::from_str("4.4.4.4").unwrap()
    );
}

// An LSA type in the reserved flooding scope draws a warning; the function
// code still dispatches the body.
#[test]
fn test_decode_lsa_reserved_scope() {
    let bytes: Vec<u8> = vec![
        // Packet header (LS Update, 44 bytes).
        0x03, 0x04, 0x00, 0x2c, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00,
        // One advertised LSA.
        0x00, 0x00, 0x00, 0x01,
        // Router-LSA header with scope bits 0x6000 (reserved).
        0x00, 0x01, 0x60, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01,
        0x01, 0x80, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x18,
        // Body: flags and options only, no interfaces.
        0x01, 0x00, 0x00, 0x33,
    ];

    let outcome = test_decode(&bytes);
    let (tree, diagnostics) = match outcome {
        DecodeOutcome::DecodedWithWarnings(ref tree, ref diagnostics) => {
            (tree, diagnostics)
        }
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    let lsa = tree.get("ls_update").unwrap().get("lsa").unwrap();
    assert_eq!(
        lsa.get("scope").unwrap().value,
        FieldValue::Str("reserved".to_owned())
    );
    assert!(diagnostics.iter().any(|diagnostic| matches!(
        diagnostic.anomaly,
        Anomaly::ReservedNonZero { value: 3 }
    )));
    assert_eq!(flags(lsa, "flags"), 0x01);
}

// Authentication trailer announced by the AT option bit.
#[test]
fn test_decode_hello_auth_trailer1() {
    let bytes: Vec<u8> = vec![
        // Packet header (Hello, 40 bytes declared).
        0x03, 0x01, 0x00, 0x28, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00,
        // Hello body with the AT option bit set.
        0x00, 0x00, 0x00, 0x07, 0x01, 0x00, 0x04, 0x13, 0x00, 0x0a, 0x00,
        0x28, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00, 0x00, 0x03, 0x03,
        0x03, 0x03,
        // Authentication trailer: type 1, 32 bytes, SA 1, sequence 42.
        0x00, 0x01, 0x00, 0x20, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x2a,
        0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb,
        0xbb, 0xbb, 0xbb, 0xbb, 0xbb,
    ];

    let outcome = test_decode(&bytes);
    let tree = match outcome {
        DecodeOutcome::Decoded(ref tree) => tree,
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    let trailer = tree.get("auth_trailer").unwrap();
    assert_eq!(uint(trailer, "auth_type"), 1);
    assert_eq!(uint(trailer, "auth_length"), 32);
    assert_eq!(uint(trailer, "sa_id"), 1);
    assert_eq!(uint(trailer, "sequence"), 42);
    assert_eq!(
        trailer.get("auth_data").unwrap().value,
        FieldValue::Raw(Bytes::from_static(&[0xbb; 16]))
    );
}

// Decoding must terminate without panicking on any truncation or single-byte
// mutation of a valid message.
#[test]
fn test_decode_mutated() {
    for fixture in [&*HELLO1, &*LSUPDATE1] {
        for len in 0..fixture.len() {
            let _ = test_decode(&fixture[..len]);
        }
        for pos in 0..fixture.len() {
            let mut bytes = fixture.clone();
            bytes[pos] ^= 0xff;
            let _ = test_decode_with_addrs(&bytes);
        }
    }
}
