//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::LazyLock as Lazy;

use bytes::Bytes;
use prism_ospf::packet::error::{Anomaly, DecodeError, Severity};
use prism_ospf::packet::tree::FieldValue;
use prism_ospf::packet::{decode, DecodeCtx, DecodeOutcome};
use prism_utils::ip::AddressFamily;

use crate::{flags, ipv4, uint};

//
// Helper functions.
//

fn test_decode(bytes: &[u8]) -> DecodeOutcome {
    let ctx = DecodeCtx::new(AddressFamily::Ipv4, None, None);
    decode(Bytes::copy_from_slice(bytes), &ctx)
}

//
// Test packets.
//

static HELLO1: Lazy<Vec<u8>> = Lazy::new(|| {
    vec![
        0x02, 0x01, 0x00, 0x30, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
        0x01, 0xf6, 0x9e, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0xff, 0xff, 0xff, 0x00, 0x00, 0x03, 0x02, 0x01, 0x00,
        0x00, 0x00, 0x24, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x01, 0x01, 0x01, 0x01,
    ]
});

static LSUPDATE1: Lazy<Vec<u8>> = Lazy::new(|| {
    vec![
        // Packet header.
        0x02, 0x04, 0x00, 0x4c, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
        // One advertised LSA.
        0x00, 0x00, 0x00, 0x01,
        // Router-LSA header.
        0x00, 0x01, 0x02, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
        0x01, 0x80, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x30,
        // Router-LSA body with two links.
        0x00, 0x00, 0x00, 0x02,
        0xc0, 0xa8, 0x01, 0x00, 0xff, 0xff, 0xff, 0x00, 0x03, 0x00, 0x00,
        0x0a,
        0x0a, 0x00, 0x00, 0x02, 0x0a, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x40,
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
    assert_eq!(uint(hdr, "version"), 2);
    assert_eq!(uint(hdr, "pkt_len"), 0x30);
    assert_eq!(ipv4(hdr, "router_id"), Ipv4Addr::from_str("2.2.2.2").unwrap());
    assert_eq!(ipv4(hdr, "area_id"), Ipv4Addr::from_str("0.0.0.1").unwrap());
    assert_eq!(
        hdr.get("checksum_status").unwrap().value,
        FieldValue::Str("correct".to_owned())
    );

    let hello = tree.get("hello").unwrap();
    assert_eq!(
        ipv4(hello, "network_mask"),
        Ipv4Addr::from_str("255.255.255.0").unwrap()
    );
    assert_eq!(uint(hello, "hello_interval"), 3);
    assert_eq!(flags(hello, "options"), 0x02);
    assert_eq!(uint(hello, "priority"), 1);
    assert_eq!(uint(hello, "dead_interval"), 36);
    let neighbors: Vec<_> = hello.fields("neighbor").collect();
    assert_eq!(neighbors.len(), 1);
    assert_eq!(
        neighbors[0].value,
        FieldValue::Ipv4(Ipv4Addr::from_str("1.1.1.1").unwrap())
    );
}

// Flipping any non-checksum byte after the fixed header turns the checksum
// annotation into a mismatch without aborting the decode.
#[test]
fn test_decode_hello1_checksum_mismatch() {
    let mut bytes = HELLO1.clone();
    bytes[31] ^= 0xff;

    let outcome = test_decode(&bytes);
    let (tree, diagnostics) = match outcome {
        DecodeOutcome::DecodedWithWarnings(ref tree, ref diagnostics) => {
            (tree, diagnostics)
        }
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    assert!(diagnostics.iter().any(|diagnostic| matches!(
        diagnostic.anomaly,
        Anomaly::ChecksumMismatch { .. }
    )));
    // The body is still fully decoded.
    assert!(tree.get("hello").is_some());
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
    assert_eq!(uint(lsa, "ls_type"), 1);
    assert_eq!(uint(lsa, "age"), 1);
    assert_eq!(uint(lsa, "seq_no"), 0x80000001);
    assert_eq!(uint(lsa, "length"), 48);
    assert_eq!(uint(lsa, "num_links"), 2);

    let links: Vec<_> = lsa.fields("link").collect();
    assert_eq!(links.len(), 2);
    assert_eq!(
        links[0].get("link_id").unwrap().value,
        FieldValue::Ipv4(Ipv4Addr::from_str("192.168.1.0").unwrap())
    );
    assert_eq!(
        links[0].get("link_data").unwrap().value,
        FieldValue::Ipv4(Ipv4Addr::from_str("255.255.255.0").unwrap())
    );
    assert_eq!(uint(links[0], "link_type"), 3);
    assert_eq!(uint(links[0], "metric"), 10);
    assert_eq!(
        links[1].get("link_id").unwrap().value,
        FieldValue::Ipv4(Ipv4Addr::from_str("10.0.0.2").unwrap())
    );
    assert_eq!(uint(links[1], "link_type"), 1);
    assert_eq!(uint(links[1], "metric"), 64);
}

#[test]
fn test_decode_dbdesc1() {
    let bytes: Vec<u8> = vec![
        // Packet header (Database Description, 52 bytes).
        0x02, 0x02, 0x00, 0x34, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
        // Fixed fields.
        0x05, 0xdc, 0x42, 0x07, 0x00, 0x00, 0x10, 0x01,
        // One LSA header, no body.
        0x00, 0x28, 0x02, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
        0x01, 0x80, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x30,
    ];

    let outcome = test_decode(&bytes);
    let tree = match outcome {
        DecodeOutcome::Decoded(ref tree) => tree,
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    let db_desc = tree.get("db_desc").unwrap();
    assert_eq!(uint(db_desc, "mtu"), 1500);
    assert_eq!(flags(db_desc, "dd_flags"), 0x07);
    assert_eq!(uint(db_desc, "dd_seq_no"), 0x1001);

    let lsa_hdrs: Vec<_> = db_desc.fields("lsa_header").collect();
    assert_eq!(lsa_hdrs.len(), 1);
    assert_eq!(uint(lsa_hdrs[0], "age"), 40);
    assert_eq!(uint(lsa_hdrs[0], "seq_no"), 0x80000002);
    assert_eq!(uint(lsa_hdrs[0], "length"), 48);
}

#[test]
fn test_decode_lsrequest1() {
    let bytes: Vec<u8> = vec![
        // Packet header (Link State Request, 36 bytes).
        0x02, 0x03, 0x00, 0x24, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
        // One request record.
        0x00, 0x00, 0x00, 0x01, 0x01, 0x01, 0x01, 0x01, 0x02, 0x02, 0x02,
        0x02,
    ];

    let outcome = test_decode(&bytes);
    let tree = match outcome {
        DecodeOutcome::Decoded(ref tree) => tree,
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    let request = tree.get("ls_request").unwrap().get("request").unwrap();
    assert_eq!(uint(request, "ls_type"), 1);
    assert_eq!(ipv4(request, "lsa_id"), Ipv4Addr::from_str("1.1.1.1").unwrap());
    assert_eq!(ipv4(request, "adv_rtr"), Ipv4Addr::from_str("2.2.2.2").unwrap());
}

#[test]
fn test_decode_lsack1() {
    let bytes: Vec<u8> = vec![
        // Packet header (Link State Acknowledgment, 44 bytes).
        0x02, 0x05, 0x00, 0x2c, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
        // One acknowledged LSA header.
        0x00, 0x28, 0x02, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
        0x01, 0x80, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x30,
    ];

    let outcome = test_decode(&bytes);
    let tree = match outcome {
        DecodeOutcome::Decoded(ref tree) => tree,
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    let ack = tree.get("ls_ack").unwrap();
    let lsa_hdrs: Vec<_> = ack.fields("lsa_header").collect();
    assert_eq!(lsa_hdrs.len(), 1);
    assert_eq!(uint(lsa_hdrs[0], "ls_type"), 1);
}

// A corrupted LSA checksum draws a warning but the LSA still decodes.
#[test]
fn test_decode_lsa_checksum_mismatch() {
    let mut bytes = LSUPDATE1.clone();
    // The LSA checksum field sits 16 bytes into the LSA header.
    bytes[44] = 0xde;
    bytes[45] = 0xad;

    let outcome = test_decode(&bytes);
    let tree = match outcome {
        DecodeOutcome::DecodedWithWarnings(ref tree, ref diagnostics) => {
            assert!(diagnostics.iter().any(|diagnostic| matches!(
                diagnostic.anomaly,
                Anomaly::ChecksumMismatch { declared: 0xdead, .. }
            )));
            tree
        }
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    // The body is decoded regardless of the bad checksum.
    let lsa = tree.get("ls_update").unwrap().get("lsa").unwrap();
    assert_eq!(lsa.fields("link").count(), 2);
}

// A Network-LSA below its 28-byte minimum is rejected without body fields,
// and the declared length still resynchronizes the LSA sequence.
#[test]
fn test_decode_lsa_bad_length() {
    let bytes: Vec<u8> = vec![
        // Packet header (LS Update, 80 bytes).
        0x02, 0x04, 0x00, 0x50, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
        // Two advertised LSAs.
        0x00, 0x00, 0x00, 0x02,
        // Network-LSA header declaring 24 bytes (minimum is 28).
        0x00, 0x01, 0x02, 0x02, 0x0a, 0x00, 0x01, 0x01, 0x01, 0x01, 0x01,
        0x01, 0x80, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x18,
        // Rejected body, skipped via the declared length.
        0xaa, 0xbb, 0xcc, 0xdd,
        // Summary-LSA header (28 bytes).
        0x00, 0x01, 0x02, 0x03, 0x0a, 0x00, 0x02, 0x00, 0x01, 0x01, 0x01,
        0x01, 0x80, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x1c,
        // Summary-LSA body.
        0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0a,
    ];

    let outcome = test_decode(&bytes);
    let tree = match outcome {
        DecodeOutcome::DecodedWithWarnings(ref tree, _) => tree,
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    let update = tree.get("ls_update").unwrap();
    let lsas: Vec<_> = update.fields("lsa").collect();
    assert_eq!(lsas.len(), 2);

    // First LSA: rejected, no decoded body fields.
    assert!(lsas[0].diagnostics.iter().any(|diagnostic| matches!(
        diagnostic.anomaly,
        Anomaly::BadLength {
            declared: 24,
            minimum: 28
        }
    )));
    assert!(lsas[0].get("network_mask").is_none());

    // Second LSA: decoded normally after the 24-byte skip.
    assert_eq!(uint(lsas[1], "ls_type"), 3);
    assert_eq!(
        ipv4(lsas[1], "network_mask"),
        Ipv4Addr::from_str("255.255.0.0").unwrap()
    );
    assert_eq!(uint(lsas[1], "metric"), 10);
}

// An unrecognized LSA type is preserved as raw bytes and never fails the
// message.
#[test]
fn test_decode_lsa_unknown_type() {
    let bytes: Vec<u8> = vec![
        // Packet header (LS Update, 80 bytes).
        0x02, 0x04, 0x00, 0x50, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
        // Two advertised LSAs.
        0x00, 0x00, 0x00, 0x02,
        // LSA of unknown type 99, 24 bytes.
        0x00, 0x01, 0x02, 0x63, 0x0a, 0x00, 0x01, 0x01, 0x01, 0x01, 0x01,
        0x01, 0x80, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x18,
        0xde, 0xad, 0xbe, 0xef,
        // Summary-LSA (28 bytes).
        0x00, 0x01, 0x02, 0x03, 0x0a, 0x00, 0x02, 0x00, 0x01, 0x01, 0x01,
        0x01, 0x80, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x1c,
        0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0a,
    ];

    let outcome = test_decode(&bytes);
    let tree = outcome.tree();
    let update = tree.get("ls_update").unwrap();
    let lsas: Vec<_> = update.fields("lsa").collect();
    assert_eq!(lsas.len(), 2);

    let unknown = lsas[0];
    assert_eq!(uint(unknown, "ls_type"), 99);
    assert_eq!(
        unknown.get("body").unwrap().value,
        FieldValue::Raw(Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]))
    );
    assert!(unknown.diagnostics.iter().any(|diagnostic| {
        diagnostic.severity == Severity::Note
            && matches!(diagnostic.anomaly, Anomaly::UnknownType { code: 99 })
    }));

    assert_eq!(uint(lsas[1], "metric"), 10);
}

// Grace-LSA: an opaque body decoded through the grace TLV table.
#[test]
fn test_decode_grace_lsa1() {
    let bytes: Vec<u8> = vec![
        // Packet header (LS Update, 64 bytes).
        0x02, 0x04, 0x00, 0x40, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
        // One advertised LSA.
        0x00, 0x00, 0x00, 0x01,
        // Opaque link-local LSA (type 9), opaque type 3 (grace), 36 bytes.
        0x00, 0x01, 0x02, 0x09, 0x03, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01,
        0x01, 0x80, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x24,
        // Grace period TLV.
        0x00, 0x01, 0x00, 0x04, 0x00, 0x00, 0x00, 0x78,
        // Graceful restart reason TLV (padded).
        0x00, 0x02, 0x00, 0x01, 0x01, 0x00, 0x00, 0x00,
    ];

    let outcome = test_decode(&bytes);
    let tree = match outcome {
        DecodeOutcome::Decoded(ref tree) => tree,
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    let lsa = tree.get("ls_update").unwrap().get("lsa").unwrap();
    assert_eq!(uint(lsa, "opaque_type"), 3);
    let period = lsa.get("grace_period").unwrap();
    assert_eq!(uint(period, "period"), 120);
    let reason = lsa.get("gr_reason").unwrap();
    assert_eq!(uint(reason, "reason"), 1);
}

// Router Information LSA with a SID/Label Range TLV whose first SID lives
// in a nested Sub-TLV.
#[test]
fn test_decode_router_info_lsa1() {
    let bytes: Vec<u8> = vec![
        // Packet header (LS Update, 64 bytes).
        0x02, 0x04, 0x00, 0x40, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
        // One advertised LSA.
        0x00, 0x00, 0x00, 0x01,
        // Opaque area LSA (type 10), opaque type 4 (router information).
        0x00, 0x01, 0x02, 0x0a, 0x04, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01,
        0x01, 0x80, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x24,
        // SID/Label Range TLV with a nested SID/Label Sub-TLV.
        0x00, 0x09, 0x00, 0x0c, 0x00, 0x03, 0xe8, 0x00, 0x00, 0x01, 0x00,
        0x04, 0x00, 0x00, 0x00, 0x64,
    ];

    let outcome = test_decode(&bytes);
    let tree = match outcome {
        DecodeOutcome::Decoded(ref tree) => tree,
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    let lsa = tree.get("ls_update").unwrap().get("lsa").unwrap();
    let range = lsa.get("sid_label_range").unwrap();
    assert_eq!(uint(range, "range"), 1000);
    let sid = range.get("sid_label").unwrap();
    assert_eq!(uint(sid, "sid_index"), 100);
}

// Traffic Engineering LSA: router address TLV plus a link TLV whose
// information lives entirely in Sub-TLVs.
#[test]
fn test_decode_te_lsa1() {
    let bytes: Vec<u8> = vec![
        // Packet header (LS Update, 84 bytes).
        0x02, 0x04, 0x00, 0x54, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
        // One advertised LSA.
        0x00, 0x00, 0x00, 0x01,
        // Opaque area LSA (type 10), opaque type 1 (TE), 56 bytes.
        0x00, 0x01, 0x02, 0x0a, 0x01, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01,
        0x01, 0x80, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x38,
        // Router Address TLV.
        0x00, 0x01, 0x00, 0x04, 0x01, 0x02, 0x03, 0x04,
        // Link TLV with three Sub-TLVs.
        0x00, 0x02, 0x00, 0x18,
        0x00, 0x01, 0x00, 0x01, 0x02, 0x00, 0x00, 0x00,
        0x00, 0x02, 0x00, 0x04, 0xc0, 0xa8, 0x00, 0x01,
        0x00, 0x05, 0x00, 0x04, 0x00, 0x00, 0x00, 0x14,
    ];

    let outcome = test_decode(&bytes);
    let tree = match outcome {
        DecodeOutcome::Decoded(ref tree) => tree,
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    let lsa = tree.get("ls_update").unwrap().get("lsa").unwrap();
    assert_eq!(uint(lsa, "opaque_type"), 1);
    let router_addr = lsa.get("router_address").unwrap();
    assert_eq!(
        ipv4(router_addr, "addr"),
        Ipv4Addr::from_str("1.2.3.4").unwrap()
    );

    let link = lsa.get("te_link").unwrap();
    assert_eq!(uint(link.get("link_type").unwrap(), "link_type"), 2);
    assert_eq!(
        ipv4(link.get("link_id").unwrap(), "link_id"),
        Ipv4Addr::from_str("192.168.0.1").unwrap()
    );
    assert_eq!(uint(link.get("te_metric").unwrap(), "metric"), 20);
}

// Extended Prefix LSA carrying a Prefix-SID Sub-TLV.
#[test]
fn test_decode_ext_prefix_lsa1() {
    let bytes: Vec<u8> = vec![
        // Packet header (LS Update, 72 bytes).
        0x02, 0x04, 0x00, 0x48, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
        // One advertised LSA.
        0x00, 0x00, 0x00, 0x01,
        // Opaque area LSA (type 10), opaque type 7 (extended prefix).
        0x00, 0x01, 0x02, 0x0a, 0x07, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01,
        0x01, 0x80, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x2c,
        // Extended Prefix TLV: intra-area route to 192.168.2.0/24.
        0x00, 0x01, 0x00, 0x14, 0x01, 0x18, 0x00, 0x00, 0xc0, 0xa8, 0x02,
        0x00,
        // Prefix-SID Sub-TLV: algorithm 0, SID index 100.
        0x00, 0x02, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x64,
    ];

    let outcome = test_decode(&bytes);
    let tree = match outcome {
        DecodeOutcome::Decoded(ref tree) => tree,
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    let lsa = tree.get("ls_update").unwrap().get("lsa").unwrap();
    let prefix = lsa.get("ext_prefix").unwrap();
    assert_eq!(uint(prefix, "route_type"), 1);
    assert_eq!(
        prefix.get("prefix").unwrap().value,
        FieldValue::Prefix(
            ipnetwork::IpNetwork::from_str("192.168.2.0/24").unwrap()
        )
    );

    let sid = prefix.get("prefix_sid").unwrap();
    assert_eq!(uint(sid, "algorithm"), 0);
    assert_eq!(uint(sid, "sid_index"), 100);
}

// A TLV declaring more value bytes than its container holds yields a single
// truncation diagnostic and the LSA sequence continues at the next sibling.
#[test]
fn test_decode_truncated_tlv() {
    let bytes: Vec<u8> = vec![
        // Packet header (LS Update, 90 bytes).
        0x02, 0x04, 0x00, 0x5a, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
        // Two advertised LSAs.
        0x00, 0x00, 0x00, 0x02,
        // Opaque area LSA (router information), 34 bytes: the TLV declares
        // 20 value bytes but only 10 remain in the body.
        0x00, 0x01, 0x02, 0x0a, 0x04, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01,
        0x01, 0x80, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x22,
        0x00, 0x01, 0x00, 0x14, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa,
        0xaa, 0xaa, 0xaa,
        // Summary-LSA (28 bytes).
        0x00, 0x01, 0x02, 0x03, 0x0a, 0x00, 0x02, 0x00, 0x01, 0x01, 0x01,
        0x01, 0x80, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x1c,
        0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0a,
    ];

    let outcome = test_decode(&bytes);
    let tree = outcome.tree();
    let update = tree.get("ls_update").unwrap();
    let lsas: Vec<_> = update.fields("lsa").collect();
    assert_eq!(lsas.len(), 2);

    let truncated = lsas[0].get("truncated_tlv").unwrap();
    assert!(truncated.diagnostics.iter().any(|diagnostic| matches!(
        diagnostic.anomaly,
        Anomaly::TruncatedTlv {
            declared: 20,
            available: 10
        }
    )));

    // The next LSA is resynchronized correctly.
    assert_eq!(uint(lsas[1], "metric"), 10);
}

// LLS data block following the declared packet length.
#[test]
fn test_decode_hello_lls1() {
    let bytes: Vec<u8> = vec![
        // Packet header (Hello, 44 bytes declared).
        0x02, 0x01, 0x00, 0x2c, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
        // Hello body with the L option bit set.
        0xff, 0xff, 0xff, 0x00, 0x00, 0x03, 0x12, 0x01, 0x00, 0x00, 0x00,
        0x24, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        // LLS data block: 3 words, extended options TLV.
        0x00, 0x00, 0x00, 0x03, 0x00, 0x01, 0x00, 0x04, 0x00, 0x00, 0x00,
        0x03,
    ];

    let outcome = test_decode(&bytes);
    let tree = outcome.tree();
    let lls = tree.get("lls").unwrap();
    assert_eq!(uint(lls, "length"), 3);
    let ext = lls.get("extended_options").unwrap();
    assert_eq!(flags(ext, "options"), 0x03);
}

// Cryptographic authentication: the digest trails the declared length and
// is kept opaque.
#[test]
fn test_decode_hello_crypt_auth1() {
    let bytes: Vec<u8> = vec![
        // Packet header with cryptographic authentication.
        0x02, 0x01, 0x00, 0x2c, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x01, 0x10, 0x00, 0x00,
        0x00, 0x05,
        // Hello body.
        0xff, 0xff, 0xff, 0x00, 0x00, 0x03, 0x02, 0x01, 0x00, 0x00, 0x00,
        0x24, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        // Message digest.
        0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa,
        0xaa, 0xaa, 0xaa, 0xaa, 0xaa,
    ];

    let outcome = test_decode(&bytes);
    let tree = match outcome {
        DecodeOutcome::Decoded(ref tree) => tree,
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    };

    let hdr = tree.get("header").unwrap();
    assert_eq!(uint(hdr, "auth_key_id"), 1);
    assert_eq!(uint(hdr, "auth_seqno"), 5);

    let digest = tree.get("auth_data").unwrap();
    assert_eq!(digest.region.length, 16);
    assert_eq!(
        digest.value,
        FieldValue::Raw(Bytes::from_static(&[0xaa; 16]))
    );
}

#[test]
fn test_decode_unsupported_version() {
    let bytes = vec![0x05, 0x01, 0x00, 0x18];
    let outcome = test_decode(&bytes);
    match outcome {
        DecodeOutcome::Fatal(ref tree, DecodeError::UnsupportedVersion(5)) => {
            assert_eq!(uint(tree, "version"), 5);
        }
        ref outcome => panic!("unexpected outcome: {:?}", outcome),
    }
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
            let _ = test_decode(&bytes);
        }
    }
}

// The field tree serializes to JSON and back unchanged.
#[test]
fn test_tree_serialization() {
    let outcome = test_decode(&LSUPDATE1);
    let tree = outcome.tree();
    let json = serde_json::to_string(tree).unwrap();
    let tree2: prism_ospf::packet::tree::Field =
        serde_json::from_str(&json).unwrap();
    assert_eq!(*tree, tree2);
}
