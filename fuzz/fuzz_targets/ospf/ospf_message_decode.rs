//
// Copyright (c) The Prism Core Contributors
//
// SPDX-License-Identifier: MIT
//
#![no_main]

use bytes::Bytes;
use libfuzzer_sys::arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use prism_ospf::packet::{decode, DecodeCtx};
use prism_utils::ip::AddressFamily;

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    if let Ok(af) = AddressFamily::arbitrary(&mut u) {
        let bytes = Bytes::copy_from_slice(u.take_rest());
        let ctx = DecodeCtx::new(af, None, None);
        let _ = decode(bytes, &ctx);
    }
});
