//! In-process transport.

use std::sync::Arc;

use async_trait::async_trait;

use brit_core::error::Result;
use brit_core::traits::Transport;

use crate::matcher::MatcherResponder;

/// [`Transport`] that hands request bodies straight to a
/// [`MatcherResponder`] in the same process.
///
/// Used for tests and for a wallet bundled with its own Matcher.
#[derive(Clone, Debug)]
pub struct LocalTransport {
    responder: Arc<MatcherResponder>,
}

impl LocalTransport {
    /// Wraps a responder.
    pub fn new(responder: Arc<MatcherResponder>) -> Self {
        Self { responder }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn post(&self, body: Vec<u8>) -> Result<Vec<u8>> {
        self.responder.handle_request(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brit_core::traits::{FixedClock, HybridCipher};
    use brit_core::types::{timestamp_from_millis, KemSecretKey, PayerId};
    use brit_crypto::MlKemEnvelope;
    use brit_pool::{MemoryAddressPool, PoolConfig};
    use tokio_test::{assert_err, assert_ok, block_on};

    use crate::payer::PayerRequestBuilder;

    fn transport() -> (LocalTransport, brit_core::types::KemPublicKey) {
        let keys = MlKemEnvelope.generate_keypair();
        let pool = Arc::new(MemoryAddressPool::new(PoolConfig::default().with_cohort_size(1)));
        let at = timestamp_from_millis(100).unwrap();
        pool.activate("1Addr", at).unwrap();
        pool.rotate_cohort(at);

        let responder = MatcherResponder::new(
            KemSecretKey::from_bytes(keys.secret.as_bytes()).unwrap(),
            pool,
            Arc::new(FixedClock(at)),
            Arc::new(MlKemEnvelope),
        );
        (LocalTransport::new(Arc::new(responder)), keys.public.clone())
    }

    #[test]
    fn test_local_exchange() {
        let (transport, matcher_key) = transport();
        let exchange = assert_ok!(PayerRequestBuilder::new(Arc::new(MlKemEnvelope), matcher_key)
            .payer_id(PayerId::from_array([3u8; 20]))
            .build());

        let allocation = assert_ok!(block_on(exchange.send(&transport)));
        assert_eq!(allocation.addresses, vec!["1Addr"]);
    }

    #[test]
    fn test_local_rejects_garbage() {
        let (transport, _) = transport();
        assert_err!(block_on(transport.post(b"garbage".to_vec())));
    }
}
