// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property tests for [`Envelope::from_payload`].

use acp_core::{CoreError, Envelope, Risk};
use proptest::prelude::*;
use serde_json::json;

fn arb_risk() -> impl Strategy<Value = Risk> {
    prop_oneof![Just(Risk::Low), Just(Risk::Medium), Just(Risk::High)]
}

proptest! {
    #[test]
    fn non_blank_slugs_always_build(slug in "[a-zA-Z][a-zA-Z0-9_.]{0,32}", default_risk in arb_risk()) {
        let payload = json!({"tool_slug": slug, "arguments": {}});
        let env = Envelope::from_payload(&payload, "tenant", default_risk).unwrap();
        prop_assert_eq!(env.tool_slug, slug);
        prop_assert_eq!(env.risk, default_risk);
    }

    #[test]
    fn blank_or_whitespace_slugs_always_reject(padding in "[ \\t]{0,4}") {
        let payload = json!({"tool_slug": padding, "arguments": {}});
        let err = Envelope::from_payload(&payload, "tenant", Risk::Low).unwrap_err();
        prop_assert!(matches!(err, CoreError::MissingToolSlug));
    }

    #[test]
    fn external_id_is_preserved_verbatim_across_reenqueue(ext_id in "[a-zA-Z0-9-]{1,24}") {
        let payload = json!({
            "tool_slug": "a__b",
            "arguments": {},
            "external_id": ext_id,
        });
        let first = Envelope::from_payload(&payload, "tenant", Risk::Low).unwrap();
        let second = Envelope::from_payload(&payload, "tenant", Risk::Low).unwrap();
        prop_assert_eq!(first.external_id, ext_id);
        prop_assert_eq!(first.external_id, second.external_id);
    }
}
