//! The wallet-facing fee service.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use brit_core::error::Result;
use brit_core::traits::{HybridCipher, ReplayDateStore, Transport};
use brit_core::types::{AddressAllocation, KemPublicKey, PayerId, Timestamp};
use brit_exchange::PayerRequestBuilder;

use crate::config::FeeConfig;
use crate::schedule::{FeePayment, FeeState};

/// Wallet-side facade over the address exchange.
///
/// All collaborators are injected: the crypto provider, the transport to
/// the Matcher and the replay-date store.
///
/// # Failure policy
///
/// [`request_addresses`](Self::request_addresses) reports errors to the
/// caller. [`refresh`](Self::refresh) never does: it retries transient
/// failures, then logs and gives up, keeping the last good allocation.
pub struct FeeService {
    payer_id: PayerId,
    matcher_key: KemPublicKey,
    cipher: Arc<dyn HybridCipher>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn ReplayDateStore>,
    config: FeeConfig,
    cached: RwLock<AddressAllocation>,
    fees: Mutex<FeeState>,
}

impl FeeService {
    /// Creates a fee service.
    ///
    /// # Errors
    /// `ConfigError` if `config` fails validation.
    pub fn new(
        payer_id: PayerId,
        matcher_key: KemPublicKey,
        cipher: Arc<dyn HybridCipher>,
        transport: Arc<dyn Transport>,
        store: Arc<dyn ReplayDateStore>,
        config: FeeConfig,
    ) -> Result<Self> {
        config.validate()?;
        let fees = Mutex::new(FeeState::new(&config));

        Ok(Self {
            payer_id,
            matcher_key,
            cipher,
            transport,
            store,
            config,
            cached: RwLock::new(AddressAllocation::default()),
            fees,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FeeConfig {
        &self.config
    }

    /// Runs one exchange with the Matcher.
    ///
    /// `prior_replay_date` is the replay date from the previous exchange, or
    /// `None` on first contact.
    pub async fn request_addresses(
        &self,
        prior_replay_date: Option<Timestamp>,
    ) -> Result<AddressAllocation> {
        PayerRequestBuilder::new(self.cipher.clone(), self.matcher_key.clone())
            .payer_id(self.payer_id)
            .replay_date(prior_replay_date)
            .build()?
            .send(self.transport.as_ref())
            .await
    }

    /// Best-effort refresh of the cached allocation.
    ///
    /// Attaches the stored replay date, retries recoverable failures with
    /// backoff, stores the new replay date and caches the addresses.
    /// Returns `None` when the refresh gave up.
    ///
    /// An empty allocation leaves the cached addresses in place.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Option<AddressAllocation> {
        let prior = match self.store.load().await {
            Ok(date) => date,
            Err(e) => {
                warn!(error = %e, "Could not load replay date, requesting from scratch");
                None
            }
        };

        let mut attempt = 1;
        let allocation = loop {
            match self.request_addresses(prior).await {
                Ok(allocation) => break allocation,
                Err(e) if e.is_recoverable() && self.config.retry.allows_retry_after(attempt) => {
                    let delay = self.config.retry.delay_for(attempt);
                    debug!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Retrying refresh");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Address refresh failed");
                    return None;
                }
            }
        };

        if let Some(replay_date) = allocation.replay_date {
            if let Err(e) = self.store.save(Some(replay_date)).await {
                warn!(error = %e, "Could not persist replay date");
            }
        }

        if allocation.addresses.is_empty() {
            debug!("Matcher had no addresses this cycle, keeping cache");
        } else {
            *self.cached.write() = allocation.clone();
        }

        info!(
            attempts = attempt,
            count = allocation.addresses.len(),
            "Address refresh complete"
        );
        Some(allocation)
    }

    /// Runs [`refresh`](Self::refresh) on a background task.
    pub fn spawn_refresh(self: &Arc<Self>) -> JoinHandle<Option<AddressAllocation>> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.refresh().await })
    }

    /// The last non-empty allocation received.
    pub fn cached_allocation(&self) -> AddressAllocation {
        self.cached.read().clone()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FEE SCHEDULE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Records one wallet send; returns the payment if one is now due.
    pub fn record_send(&self) -> Option<FeePayment> {
        self.fees.lock().record_send(&self.config);
        self.next_fee_payment()
    }

    /// The payment currently due, if any.
    ///
    /// `None` while below the threshold or while no addresses are cached.
    pub fn next_fee_payment(&self) -> Option<FeePayment> {
        let addresses = self.cached.read().addresses.clone();
        self.fees.lock().payment_due(&addresses)
    }

    /// Clears the accrual once the wallet has made the payment.
    pub fn record_fee_paid(&self) {
        self.fees.lock().reset(&self.config);
        info!("Fee payment recorded");
    }

    /// Snapshot of the fee accrual.
    pub fn fee_state(&self) -> FeeState {
        self.fees.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use brit_core::constants::PAYER_ID_SIZE;
    use brit_core::error::BritError;
    use brit_core::traits::FixedClock;
    use brit_core::types::{timestamp_from_millis, KemSecretKey};
    use brit_crypto::MlKemEnvelope;
    use brit_exchange::{LocalTransport, MatcherResponder};
    use brit_pool::{MemoryAddressPool, PoolConfig};

    use crate::backoff::RetryPolicy;
    use crate::store::MemoryReplayStore;

    fn ts(millis: i64) -> Timestamp {
        timestamp_from_millis(millis).unwrap()
    }

    /// Fails the first `failures` posts with `error`, then forwards.
    struct FlakyTransport {
        inner: LocalTransport,
        failures: u32,
        error: fn() -> BritError,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn post(&self, body: Vec<u8>) -> Result<Vec<u8>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err((self.error)());
            }
            self.inner.post(body).await
        }
    }

    struct Setup {
        pool: Arc<MemoryAddressPool>,
        store: Arc<MemoryReplayStore>,
        transport: Arc<FlakyTransport>,
        service: Arc<FeeService>,
    }

    fn setup(failures: u32, error: fn() -> BritError, config: FeeConfig) -> Setup {
        let cipher: Arc<dyn HybridCipher> = Arc::new(MlKemEnvelope);
        let keys = cipher.generate_keypair();
        let pool = Arc::new(MemoryAddressPool::new(
            PoolConfig::default().with_cohort_size(1),
        ));
        let responder = Arc::new(MatcherResponder::new(
            KemSecretKey::from_bytes(keys.secret.as_bytes()).unwrap(),
            pool.clone(),
            Arc::new(FixedClock(ts(1_000))),
            cipher.clone(),
        ));
        let transport = Arc::new(FlakyTransport {
            inner: LocalTransport::new(responder),
            failures,
            error,
            calls: AtomicU32::new(0),
        });
        let store = Arc::new(MemoryReplayStore::new());
        let service = Arc::new(
            FeeService::new(
                PayerId::from_array([5u8; PAYER_ID_SIZE]),
                keys.public.clone(),
                cipher,
                transport.clone(),
                store.clone(),
                config,
            )
            .unwrap(),
        );
        Setup {
            pool,
            store,
            transport,
            service,
        }
    }

    fn transient() -> BritError {
        BritError::TransportFailure("connection reset".into())
    }

    fn permanent() -> BritError {
        BritError::DecryptionFailure
    }

    fn fast_retry(max_attempts: u32) -> FeeConfig {
        FeeConfig::default().with_retry(RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 5,
        })
    }

    fn seed_pool(pool: &MemoryAddressPool) {
        pool.activate("A", ts(100)).unwrap();
        pool.activate("B", ts(200)).unwrap();
        pool.rotate_cohort(ts(200));
    }

    #[tokio::test]
    async fn test_request_addresses() {
        let s = setup(0, transient, FeeConfig::default());
        seed_pool(&s.pool);

        let allocation = s.service.request_addresses(None).await.unwrap();
        assert_eq!(allocation.addresses, vec!["B"]);
        assert_eq!(allocation.replay_date, Some(ts(200)));
    }

    #[tokio::test]
    async fn test_request_addresses_reports_errors() {
        let s = setup(1, transient, FeeConfig::default());
        assert!(matches!(
            s.service.request_addresses(None).await,
            Err(BritError::TransportFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_persists_and_caches() {
        let s = setup(0, transient, FeeConfig::default());
        seed_pool(&s.pool);

        let allocation = s.service.refresh().await.unwrap();
        assert_eq!(allocation.addresses, vec!["B"]);
        assert_eq!(s.store.load().await.unwrap(), Some(ts(200)));
        assert_eq!(s.service.cached_allocation(), allocation);

        // The stored replay date rides along on the next refresh
        s.pool.activate("C", ts(300)).unwrap();
        let next = s.service.refresh().await.unwrap();
        assert_eq!(next.addresses, vec!["B", "C"]);
        assert_eq!(s.store.load().await.unwrap(), Some(ts(300)));
    }

    #[tokio::test]
    async fn test_refresh_retries_transient_failures() {
        let s = setup(2, transient, fast_retry(3));
        seed_pool(&s.pool);

        assert!(s.service.refresh().await.is_some());
        assert_eq!(s.transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_refresh_gives_up_after_budget() {
        let s = setup(10, transient, fast_retry(3));
        seed_pool(&s.pool);

        assert!(s.service.refresh().await.is_none());
        assert_eq!(s.transport.calls.load(Ordering::SeqCst), 3);
        assert_eq!(s.store.load().await.unwrap(), None);
        assert!(s.service.cached_allocation().addresses.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_does_not_retry_protocol_errors() {
        let s = setup(1, permanent, fast_retry(5));
        seed_pool(&s.pool);

        assert!(s.service.refresh().await.is_none());
        assert_eq!(s.transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_allocation_keeps_cache() {
        let s = setup(0, transient, FeeConfig::default());
        seed_pool(&s.pool);
        s.service.refresh().await.unwrap();

        s.pool.clear();
        let empty = s.service.refresh().await.unwrap();
        assert!(empty.addresses.is_empty());
        assert_eq!(s.service.cached_allocation().addresses, vec!["B"]);
        assert_eq!(s.store.load().await.unwrap(), Some(ts(200)));
    }

    #[tokio::test]
    async fn test_spawn_refresh() {
        let s = setup(0, transient, FeeConfig::default());
        seed_pool(&s.pool);

        let handle = s.service.spawn_refresh();
        let allocation = handle.await.unwrap().unwrap();
        assert_eq!(allocation.addresses, vec!["B"]);
    }

    #[tokio::test]
    async fn test_fee_payment_cycle() {
        let config = FeeConfig::default()
            .with_send_range(2, 2)
            .with_fee_per_send(250);
        let s = setup(0, transient, config);
        seed_pool(&s.pool);

        // Due but nowhere to pay until addresses are cached
        assert!(s.service.record_send().is_none());
        assert!(s.service.record_send().is_none());
        s.service.refresh().await.unwrap();

        let payment = s.service.next_fee_payment().unwrap();
        assert_eq!(payment.address, "B");
        assert_eq!(payment.amount_sats, 500);

        s.service.record_fee_paid();
        assert_eq!(s.service.fee_state().accrued_sats, 0);
        assert!(s.service.next_fee_payment().is_none());
        assert!(s.service.record_send().is_none());
        assert!(s.service.record_send().is_some());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cipher: Arc<dyn HybridCipher> = Arc::new(MlKemEnvelope);
        let keys = cipher.generate_keypair();
        let result = FeeService::new(
            PayerId::from_array([5u8; PAYER_ID_SIZE]),
            keys.public.clone(),
            cipher,
            Arc::new(UnreachableTransport),
            Arc::new(MemoryReplayStore::new()),
            FeeConfig::default().with_send_range(9, 1),
        );
        assert!(matches!(result, Err(BritError::ConfigError(_))));
    }

    struct UnreachableTransport;

    #[async_trait]
    impl Transport for UnreachableTransport {
        async fn post(&self, _body: Vec<u8>) -> Result<Vec<u8>> {
            Err(BritError::TransportFailure("unused".into()))
        }
    }
}
