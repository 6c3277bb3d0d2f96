//! Matcher side of the exchange.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use brit_core::error::Result;
use brit_core::traits::{AddressPool, Clock, HybridCipher};
use brit_core::types::{KemSecretKey, MatcherResponse, PayerRequest};
use brit_core::wire;
use brit_pool::allocate;

/// Steps of handling one request, used to label failures in logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatcherStage {
    /// Request bytes arrived
    Received,
    /// Request decrypted with the Matcher key
    Decrypted,
    /// Request parsed and version-checked
    Decoded,
    /// Addresses chosen
    Allocated,
    /// Response rendered to wire text
    Encoded,
    /// Response encrypted to the payer's reply key
    Encrypted,
    /// Response handed back to the host
    Returned,
}

impl fmt::Display for MatcherStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Decrypted => "decrypted",
            Self::Decoded => "decoded",
            Self::Allocated => "allocated",
            Self::Encoded => "encoded",
            Self::Encrypted => "encrypted",
            Self::Returned => "returned",
        };
        f.write_str(name)
    }
}

/// Answers encrypted payer requests.
///
/// Holds no per-request state; one responder serves any number of
/// concurrent requests.
pub struct MatcherResponder {
    secret_key: KemSecretKey,
    pool: Arc<dyn AddressPool>,
    clock: Arc<dyn Clock>,
    cipher: Arc<dyn HybridCipher>,
}

impl MatcherResponder {
    /// Creates a responder from the Matcher's secret key and collaborators.
    pub fn new(
        secret_key: KemSecretKey,
        pool: Arc<dyn AddressPool>,
        clock: Arc<dyn Clock>,
        cipher: Arc<dyn HybridCipher>,
    ) -> Self {
        Self {
            secret_key,
            pool,
            clock,
            cipher,
        }
    }

    /// Handles one encrypted request and returns the encrypted response.
    ///
    /// # Errors
    /// - `DecryptionFailure` if the request was not encrypted to this
    ///   Matcher or was tampered with
    /// - `VersionMismatch` / `MalformedMessage` if the plaintext is not a
    ///   request this Matcher understands
    /// - `EncryptionFailure` if the reply key is unusable
    #[instrument(skip_all, fields(request_len = request.len()))]
    pub fn handle_request(&self, request: &[u8]) -> Result<Vec<u8>> {
        let mut stage = MatcherStage::Received;
        self.run(request, &mut stage).map_err(|error| {
            warn!(stage = %stage, %error, "Request rejected");
            error
        })
    }

    /// Runs the allocation policy for an already decoded request.
    pub fn respond(&self, request: &PayerRequest) -> MatcherResponse {
        allocate(
            self.pool.as_ref(),
            request.first_transaction_date,
            self.clock.now(),
        )
    }

    fn run(&self, request: &[u8], stage: &mut MatcherStage) -> Result<Vec<u8>> {
        let plaintext = self.cipher.decrypt_hybrid(request, &self.secret_key)?;
        *stage = MatcherStage::Decrypted;

        let request = wire::decode_request(&plaintext)?;
        *stage = MatcherStage::Decoded;

        let response = self.respond(&request);
        *stage = MatcherStage::Allocated;

        let encoded = wire::encode_response(&response);
        *stage = MatcherStage::Encoded;

        let blob = self.cipher.encrypt_hybrid(&encoded, &request.reply_key)?;
        *stage = MatcherStage::Encrypted;

        debug!(
            count = response.address_list.len(),
            has_replay_date = response.replay_date.is_some(),
            "Request answered"
        );
        *stage = MatcherStage::Returned;
        Ok(blob)
    }
}

impl fmt::Debug for MatcherResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherResponder")
            .field("secret_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocalTransport, PayerRequestBuilder};
    use brit_core::constants::PAYER_ID_SIZE;
    use brit_core::error::BritError;
    use brit_core::traits::FixedClock;
    use brit_core::types::{timestamp_from_millis, KemPublicKey, PayerId, Timestamp};
    use brit_crypto::MlKemEnvelope;
    use brit_pool::{MemoryAddressPool, PoolConfig};

    fn ts(millis: i64) -> Timestamp {
        timestamp_from_millis(millis).unwrap()
    }

    struct Fixture {
        cipher: Arc<dyn HybridCipher>,
        matcher_public: KemPublicKey,
        pool: Arc<MemoryAddressPool>,
        responder: Arc<MatcherResponder>,
    }

    fn fixture(now: i64) -> Fixture {
        let cipher: Arc<dyn HybridCipher> = Arc::new(MlKemEnvelope);
        let keys = cipher.generate_keypair();
        let pool = Arc::new(MemoryAddressPool::new(
            PoolConfig::default().with_cohort_size(1),
        ));
        let secret = KemSecretKey::from_bytes(keys.secret.as_bytes()).unwrap();
        let responder = Arc::new(MatcherResponder::new(
            secret,
            pool.clone(),
            Arc::new(FixedClock(ts(now))),
            cipher.clone(),
        ));
        Fixture {
            cipher,
            matcher_public: keys.public.clone(),
            pool,
            responder,
        }
    }

    impl Fixture {
        async fn exchange(&self, replay_date: Option<Timestamp>) -> Result<MatcherResponse> {
            let transport = LocalTransport::new(self.responder.clone());
            let allocation = PayerRequestBuilder::new(self.cipher.clone(), self.matcher_public.clone())
                .payer_id(PayerId::from_array([1u8; PAYER_ID_SIZE]))
                .replay_date(replay_date)
                .build()?
                .send(&transport)
                .await?;
            Ok(MatcherResponse::new(allocation.replay_date, allocation.addresses))
        }
    }

    fn response(addresses: &[&str], replay_millis: Option<i64>) -> MatcherResponse {
        MatcherResponse::new(
            replay_millis.map(ts),
            addresses.iter().map(|a| a.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_exchange() {
        let f = fixture(1_000);
        f.pool.activate("A", ts(100)).unwrap();
        f.pool.activate("B", ts(200)).unwrap();
        f.pool.rotate_cohort(ts(200));

        let first = f.exchange(None).await.unwrap();
        assert_eq!(first, response(&["B"], Some(200)));

        let second = f.exchange(first.replay_date).await.unwrap();
        assert_eq!(second, response(&["B"], Some(200)));

        f.pool.activate("C", ts(300)).unwrap();
        let third = f.exchange(Some(ts(200))).await.unwrap();
        assert_eq!(third, response(&["B", "C"], Some(300)));
    }

    #[tokio::test]
    async fn test_empty_pool_is_not_an_error() {
        let f = fixture(1_000);
        let response = f.exchange(None).await.unwrap();
        assert!(response.is_empty());
        assert_eq!(response.replay_date, None);
    }

    #[test]
    fn test_request_for_another_matcher_rejected() {
        let f = fixture(1_000);
        let other = f.cipher.generate_keypair();
        let mut exchange = PayerRequestBuilder::new(f.cipher.clone(), other.public.clone())
            .payer_id(PayerId::from_array([1u8; PAYER_ID_SIZE]))
            .build()
            .unwrap();
        let blob = exchange.seal().unwrap();

        assert!(matches!(
            f.responder.handle_request(&blob),
            Err(BritError::DecryptionFailure)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let f = fixture(1_000);
        assert!(matches!(
            f.responder.handle_request(b"not an envelope"),
            Err(BritError::DecryptionFailure)
        ));
    }

    #[test]
    fn test_wrong_version_request_rejected() {
        let f = fixture(1_000);
        let blob = f
            .cipher
            .encrypt_hybrid(b"7\nnot-present\nabc\n", &f.matcher_public)
            .unwrap();
        assert!(matches!(
            f.responder.handle_request(&blob),
            Err(BritError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_malformed_request_rejected() {
        let f = fixture(1_000);
        let blob = f
            .cipher
            .encrypt_hybrid(b"1\nnot-present\n", &f.matcher_public)
            .unwrap();
        assert!(matches!(
            f.responder.handle_request(&blob),
            Err(BritError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_respond_uses_clock() {
        let f = fixture(150);
        f.pool.activate("A", ts(100)).unwrap();
        f.pool.activate("B", ts(200)).unwrap();
        f.pool.rotate_cohort(ts(100));

        let request = PayerRequest::new(
            PayerId::from_array([1u8; PAYER_ID_SIZE]),
            Some(ts(50)),
            f.matcher_public.clone(),
        );
        // B activates after the clock's "now"
        assert_eq!(f.responder.respond(&request), response(&["A"], Some(100)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let f = fixture(0);
        assert!(format!("{:?}", f.responder).contains("REDACTED"));
    }
}
