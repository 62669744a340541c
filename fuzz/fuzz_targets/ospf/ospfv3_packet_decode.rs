//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//
#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use prism_ospf::packet::{decode_version, DecodeCtx};
use prism_ospf::version::Ospfv3;
use prism_utils::ip::AddressFamily;

fuzz_target!(|data: &[u8]| {
    let bytes = Bytes::copy_from_slice(data);
    let ctx = DecodeCtx::new(AddressFamily::Ipv6, None, None);
    let _ = decode_version::<Ospfv3>(bytes, &ctx);
});
