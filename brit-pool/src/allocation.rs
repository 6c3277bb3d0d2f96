//! Replay-date allocation policy.
//!
//! Decides which addresses a payer receives, given the replay date it last
//! saw. The replay date bounds which activations the payer has not seen yet,
//! which keeps responses small across repeated contacts:
//!
//! | Prior replay date | Addresses | Replay date |
//! |---|---|---|
//! | absent (first contact) | current cohort | newest activation at or before `now` |
//! | `D` | cohort plus everything activated in `(D, now]` | newest of `D` and the activations considered |
//! | (nothing to offer) | empty | absent |
//!
//! A prior date later than `now` cannot have come from this pool and is
//! treated as absent. A payer's replay date never moves backwards while the
//! pool has something to offer.

use std::collections::HashSet;

use tracing::debug;

use brit_core::traits::AddressPool;
use brit_core::types::{MatcherResponse, PoolAddress, Timestamp};

/// Chooses the addresses and replay date for one request.
///
/// Pure given the pool state at call time: the same pool, prior date and
/// `now` always produce the same response. An empty response is a normal
/// outcome, not an error.
pub fn allocate(
    pool: &dyn AddressPool,
    prior_replay_date: Option<Timestamp>,
    now: Timestamp,
) -> MatcherResponse {
    let prior = prior_replay_date.filter(|date| *date <= now);

    let cohort = pool.current_cohort();
    let considered: Vec<PoolAddress> = match prior {
        None => cohort,
        Some(since) => merge(cohort, pool.activated_since(since, now)),
    };

    if considered.is_empty() {
        debug!(first_contact = prior.is_none(), "Nothing to allocate");
        return MatcherResponse::empty();
    }

    let newest_considered = considered.iter().map(|a| a.activated_at).max();
    let replay_date = match prior {
        None => pool.latest_activation(now).max(newest_considered),
        Some(since) => newest_considered.max(Some(since)),
    };

    debug!(
        first_contact = prior.is_none(),
        count = considered.len(),
        "Allocated addresses"
    );

    MatcherResponse::new(
        replay_date,
        considered.into_iter().map(|a| a.address).collect(),
    )
}

/// Union of both lists, de-duplicated by address and ordered by activation.
fn merge(cohort: Vec<PoolAddress>, fresh: Vec<PoolAddress>) -> Vec<PoolAddress> {
    let mut seen = HashSet::with_capacity(cohort.len() + fresh.len());
    let mut merged: Vec<PoolAddress> = cohort
        .into_iter()
        .chain(fresh)
        .filter(|a| seen.insert(a.address.clone()))
        .collect();
    merged.sort_by_key(|a| a.activated_at);
    merged
}
