//! Flat, versioned wire codec.
//!
//! Both message types share one framing: UTF-8 text, every row terminated
//! by `\n`.
//!
//! ```text
//! <version>\n
//! <epoch-millis | "not-present">\n
//! <item>\n            (zero or more payload rows)
//! ```
//!
//! For a [`MatcherResponse`] the payload rows are the addresses. For a
//! [`PayerRequest`] they are the payer id and the reply key, both hex.

use tracing::debug;

use crate::constants::{DATE_NOT_PRESENT, PROTOCOL_VERSION, WIRE_SEPARATOR};
use crate::error::{BritError, Result};
use crate::types::{
    timestamp_from_millis, KemPublicKey, MatcherResponse, PayerId, PayerRequest, Timestamp,
};

/// Decoded rows common to both message types.
#[derive(Debug, PartialEq, Eq)]
struct Frame {
    date: Option<Timestamp>,
    items: Vec<String>,
}

fn encode_frame<'a>(
    version: u32,
    date: Option<&Timestamp>,
    items: impl IntoIterator<Item = &'a str>,
) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(&version.to_string());
    out.push(WIRE_SEPARATOR);
    match date {
        Some(date) => out.push_str(&date.timestamp_millis().to_string()),
        None => out.push_str(DATE_NOT_PRESENT),
    }
    out.push(WIRE_SEPARATOR);
    for item in items {
        out.push_str(item);
        out.push(WIRE_SEPARATOR);
    }
    out.into_bytes()
}

fn decode_frame(bytes: &[u8]) -> Result<Frame> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| BritError::MalformedMessage(format!("not UTF-8: {}", e)))?;
    let rows: Vec<&str> = text.split(WIRE_SEPARATOR).collect();

    // Version gate runs before any other row is looked at.
    let version_row = rows[0];
    match version_row.parse::<i64>() {
        Ok(v) if v == i64::from(PROTOCOL_VERSION) => {}
        _ => {
            return Err(BritError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                actual: version_row.to_string(),
            })
        }
    }

    if rows.len() < 2 {
        return Err(BritError::MalformedMessage(
            "require 2 or more rows".into(),
        ));
    }

    let date = match rows[1] {
        DATE_NOT_PRESENT => None,
        row => {
            let millis = row.parse::<i64>().map_err(|_| {
                BritError::MalformedMessage(format!("date row is neither millis nor '{}': '{}'", DATE_NOT_PRESENT, row))
            })?;
            Some(timestamp_from_millis(millis)?)
        }
    };

    let items: Vec<String> = rows[2..]
        .iter()
        .filter(|row| !row.is_empty())
        .map(|row| row.to_string())
        .collect();

    debug!(items = items.len(), has_date = date.is_some(), "Decoded wire frame");
    Ok(Frame { date, items })
}

// ═══════════════════════════════════════════════════════════════════════════════
// MATCHER RESPONSE
// ═══════════════════════════════════════════════════════════════════════════════

/// Serializes a Matcher response.
pub fn encode_response(response: &MatcherResponse) -> Vec<u8> {
    encode_frame(
        response.version,
        response.replay_date.as_ref(),
        response.address_list.iter().map(String::as_str),
    )
}

/// Parses a serialized Matcher response.
///
/// # Errors
/// - [`BritError::VersionMismatch`] if row 0 is anything but the supported version
/// - [`BritError::MalformedMessage`] if there are fewer than two rows or the date row is invalid
pub fn decode_response(bytes: &[u8]) -> Result<MatcherResponse> {
    let frame = decode_frame(bytes)?;
    Ok(MatcherResponse::new(frame.date, frame.items))
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAYER REQUEST
// ═══════════════════════════════════════════════════════════════════════════════

/// Serializes a payer request.
pub fn encode_request(request: &PayerRequest) -> Vec<u8> {
    let payer_id = request.payer_id.to_hex();
    let reply_key = request.reply_key.to_hex();
    encode_frame(
        request.version,
        request.first_transaction_date.as_ref(),
        [payer_id.as_str(), reply_key.as_str()],
    )
}

/// Parses a serialized payer request.
///
/// # Errors
/// Same as [`decode_response`], plus [`BritError::MalformedMessage`] if the
/// payload is not exactly a payer id row and a reply key row.
pub fn decode_request(bytes: &[u8]) -> Result<PayerRequest> {
    let frame = decode_frame(bytes)?;
    let [payer_id, reply_key] = <[String; 2]>::try_from(frame.items).map_err(|items| {
        BritError::MalformedMessage(format!(
            "request needs payer id and reply key rows, got {} rows",
            items.len()
        ))
    })?;

    let payer_id = PayerId::from_hex(&payer_id)?;
    let reply_key = KemPublicKey::from_hex(&reply_key)
        .map_err(|e| BritError::MalformedMessage(format!("reply key: {}", e)))?;

    Ok(PayerRequest::new(payer_id, frame.date, reply_key))
}
