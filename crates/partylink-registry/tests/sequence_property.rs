//! Property: across any publication order, the sequence of accepted
//! registries is monotonically non-decreasing.

use partylink_registry::{
    RegistryChannel, RegistryClient, RegistryConfig, RegistryEndpoints, RegistryFetch,
};
use partylink_testkit::{ManualClock, MemoryStore, RegistryFixture, StaticFetcher};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

const REGISTRY_URL: &str = "https://registry.example/v1/stable/registry.json";
const SIGNATURE_URL: &str = "https://registry.example/v1/stable/registry.sig";

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn accepted_sequences_never_decrease(
        offered in proptest::collection::vec(0u64..16, 1..10)
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("runtime");
        runtime.block_on(async move {
            let fixture = RegistryFixture::new();
            let fetcher = Arc::new(StaticFetcher::new());
            let mut endpoints = HashMap::new();
            endpoints.insert(
                RegistryChannel::Stable,
                RegistryEndpoints {
                    registry_url: REGISTRY_URL.to_owned(),
                    signature_url: SIGNATURE_URL.to_owned(),
                },
            );
            let client = RegistryClient::new(
                RegistryConfig {
                    endpoints,
                    trusted_keys: vec![fixture.trusted_key_base64()],
                    ttl_ms: 60_000,
                },
                fetcher.clone() as Arc<dyn RegistryFetch>,
                Arc::new(MemoryStore::new()),
                Arc::new(ManualClock::new()),
            )
            .expect("client");

            let mut last_accepted = 0u64;
            let mut any_accepted = false;
            for sequence in offered {
                let signed = fixture.signed_with_sequence(sequence);
                fetcher.serve_document(REGISTRY_URL, signed.bytes.clone(), None);
                fetcher.serve_document(SIGNATURE_URL, signed.signature_json(), None);

                let result = client.fetch_registry(RegistryChannel::Stable).await;

                if any_accepted && sequence < last_accepted {
                    // Downgrade: rejected, floor unchanged.
                    prop_assert_eq!(
                        result.status.error.as_ref().map(|e| e.code()),
                        Some("DOWNGRADE")
                    );
                    prop_assert_eq!(result.status.sequence, last_accepted);
                } else {
                    prop_assert!(result.status.error.is_none());
                    prop_assert_eq!(result.status.sequence, sequence);
                    last_accepted = sequence;
                    any_accepted = true;
                }
                // The served sequence never moves backwards.
                prop_assert!(result.status.sequence <= last_accepted);
                prop_assert_eq!(result.status.sequence, last_accepted);
            }
            Ok(())
        })?;
    }
}
