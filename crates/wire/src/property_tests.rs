// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use shade_core::ModuleSpec;

// Dashes are excluded so a generated word never collides with the
// `module` spec/command separator.
fn word() -> impl Strategy<Value = String> {
    "[a-z0-9.:/_]{1,12}"
}

fn spec() -> impl Strategy<Value = ModuleSpec> {
    (word(), proptest::collection::vec(word(), 0..3))
        .prop_map(|(name, args)| ModuleSpec::new(name.as_str(), args))
}

fn request() -> impl Strategy<Value = Request> {
    prop_oneof![
        Just(Request::Ping),
        Just(Request::Status),
        Just(Request::Stop),
        Just(Request::Reload),
        any::<bool>().prop_map(|wait| Request::Lock { wait }),
        Just(Request::Unlock),
        spec().prop_map(|session| Request::Attach { session }),
        spec().prop_map(|session| Request::Detach { session }),
        (spec(), proptest::collection::vec(word(), 0..3))
            .prop_map(|(spec, command)| Request::Module { spec, command }),
    ]
}

proptest! {
    #[test]
    fn encode_decode_round_trip(request in request()) {
        let line = encode_request(&request);
        let text = std::str::from_utf8(&line).unwrap();
        let decoded = decode_line(text).unwrap();
        prop_assert_eq!(decoded, request);
    }
}
