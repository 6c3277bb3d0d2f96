//! Payer side of the exchange.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use brit_core::error::{BritError, Result};
use brit_core::traits::{HybridCipher, Transport};
use brit_core::types::{
    AddressAllocation, KemPublicKey, KeyPair, PayerId, PayerRequest, Timestamp,
};
use brit_core::wire;

/// Where a payer exchange stands.
///
/// ```text
/// Built → Encoded → Encrypted → Sent → Received → Decrypted → Decoded
///   └──────────────── any failure ────────────────→ Failed
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeState {
    /// Request assembled, reply key generated
    Built,
    /// Request rendered to wire text
    Encoded,
    /// Request encrypted to the Matcher
    Encrypted,
    /// Request handed to the transport
    Sent,
    /// Response bytes arrived
    Received,
    /// Response decrypted with the reply key
    Decrypted,
    /// Response parsed; the exchange is complete
    Decoded,
    /// A step failed; the exchange cannot continue
    Failed,
}

impl fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Built => "built",
            Self::Encoded => "encoded",
            Self::Encrypted => "encrypted",
            Self::Sent => "sent",
            Self::Received => "received",
            Self::Decrypted => "decrypted",
            Self::Decoded => "decoded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILDER
// ═══════════════════════════════════════════════════════════════════════════════

/// Assembles a [`PayerExchange`].
pub struct PayerRequestBuilder {
    cipher: Arc<dyn HybridCipher>,
    matcher_key: KemPublicKey,
    payer_id: Option<PayerId>,
    replay_date: Option<Timestamp>,
}

impl PayerRequestBuilder {
    /// Starts a request addressed to the Matcher holding `matcher_key`.
    pub fn new(cipher: Arc<dyn HybridCipher>, matcher_key: KemPublicKey) -> Self {
        Self {
            cipher,
            matcher_key,
            payer_id: None,
            replay_date: None,
        }
    }

    /// Sets the wallet's payer identifier (required).
    pub fn payer_id(mut self, payer_id: PayerId) -> Self {
        self.payer_id = Some(payer_id);
        self
    }

    /// Sets the replay date from the previous exchange, if any.
    pub fn replay_date(mut self, replay_date: Option<Timestamp>) -> Self {
        self.replay_date = replay_date;
        self
    }

    /// Builds the exchange and generates its one-off reply key pair.
    pub fn build(self) -> Result<PayerExchange> {
        let payer_id = self
            .payer_id
            .ok_or_else(|| BritError::ConfigError("payer id is required".into()))?;

        let reply_keys = self.cipher.generate_keypair();
        let request = PayerRequest::new(payer_id, self.replay_date, reply_keys.public.clone());

        Ok(PayerExchange {
            state: ExchangeState::Built,
            request,
            reply_keys,
            matcher_key: self.matcher_key,
            cipher: self.cipher,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXCHANGE
// ═══════════════════════════════════════════════════════════════════════════════

/// One payer exchange.
///
/// Holds the secret half of the reply key until the response is decrypted;
/// it is zeroized when the exchange is dropped.
pub struct PayerExchange {
    state: ExchangeState,
    request: PayerRequest,
    reply_keys: KeyPair,
    matcher_key: KemPublicKey,
    cipher: Arc<dyn HybridCipher>,
}

impl PayerExchange {
    /// Current state.
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// The request being sent.
    pub fn request(&self) -> &PayerRequest {
        &self.request
    }

    /// Encodes and encrypts the request: `Built → Encoded → Encrypted`.
    pub fn seal(&mut self) -> Result<Vec<u8>> {
        self.expect(&[ExchangeState::Built])?;

        let encoded = wire::encode_request(&self.request);
        self.state = ExchangeState::Encoded;

        let blob = self
            .cipher
            .encrypt_hybrid(&encoded, &self.matcher_key)
            .map_err(|e| self.fail(e))?;
        self.state = ExchangeState::Encrypted;

        debug!(request_len = blob.len(), "Request sealed");
        Ok(blob)
    }

    /// Decrypts and decodes the Matcher's reply:
    /// `Received → Decrypted → Decoded`.
    pub fn open(&mut self, response: &[u8]) -> Result<AddressAllocation> {
        self.expect(&[ExchangeState::Encrypted, ExchangeState::Sent])?;
        self.state = ExchangeState::Received;

        let plaintext = self
            .cipher
            .decrypt_hybrid(response, &self.reply_keys.secret)
            .map_err(|e| self.fail(e))?;
        self.state = ExchangeState::Decrypted;

        let decoded = wire::decode_response(&plaintext).map_err(|e| self.fail(e))?;
        self.state = ExchangeState::Decoded;

        debug!(
            count = decoded.address_list.len(),
            has_replay_date = decoded.replay_date.is_some(),
            "Response decoded"
        );
        Ok(decoded.into())
    }

    /// Runs the whole exchange over `transport`.
    #[instrument(skip_all)]
    pub async fn send(mut self, transport: &dyn Transport) -> Result<AddressAllocation> {
        let blob = self.seal()?;

        self.state = ExchangeState::Sent;
        let response = transport.post(blob).await.map_err(|e| self.fail(e))?;

        self.open(&response)
    }

    fn expect(&self, allowed: &[ExchangeState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(BritError::InternalError(format!(
                "exchange step not allowed in state '{}'",
                self.state
            )))
        }
    }

    fn fail(&mut self, error: BritError) -> BritError {
        warn!(state = %self.state, %error, "Exchange failed");
        self.state = ExchangeState::Failed;
        error
    }
}

impl fmt::Debug for PayerExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayerExchange")
            .field("state", &self.state)
            .field("payer_id", &self.request.payer_id)
            .field("replay_date", &self.request.first_transaction_date)
            .finish_non_exhaustive()
    }
}
