use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::PriceOracle;
use crate::error::BotError;
use crate::models::PriceSnapshot;
use crate::notify::ErrorReporter;

#[derive(Debug, Default)]
struct FeedState {
    cached: Option<PriceSnapshot>,
    last_fetch: Option<Instant>, // Last successful fetch
    in_flight: bool,
    generation: u64,             // Bumped by reset(); stale fetches are dropped
    fetches: u64,
}

/// Throttled poller for one token's price. Never overlaps fetches and never
/// drops a good snapshot because of a failed one.
pub struct PriceFeed {
    oracle: Arc<dyn PriceOracle>,
    reporter: Arc<dyn ErrorReporter>,
    min_interval: Duration,
    state: Mutex<FeedState>,
}

// Clears the in-flight flag even if the fetching future is dropped.
struct InFlight<'a> {
    feed: &'a PriceFeed,
    generation: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.feed.lock();
        if state.generation == self.generation {
            state.in_flight = false;
        }
    }
}

impl PriceFeed {
    pub fn new(oracle: Arc<dyn PriceOracle>, reporter: Arc<dyn ErrorReporter>, min_interval: Duration) -> Self {
        Self {
            oracle,
            reporter,
            min_interval,
            state: Mutex::new(FeedState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        // A poisoned lock only means a panic elsewhere; the state itself stays usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the freshest snapshot available for `token`, fetching only when
    /// the throttle allows. `None` when no token is selected or nothing is known yet.
    pub async fn refresh(&self, token: Option<&str>) -> Option<PriceSnapshot> {
        let token = token?;

        let generation = {
            let mut state = self.lock();
            let cached_for_token = state
                .cached
                .as_ref()
                .filter(|s| s.token_address == token)
                .cloned();

            if state.in_flight {
                debug!("Price fetch already in flight for {}; serving cache", token);
                return cached_for_token;
            }
            if let (Some(cached), Some(last)) = (&cached_for_token, state.last_fetch) {
                if last.elapsed() < self.min_interval {
                    debug!("Price for {} throttled; serving cache", token);
                    return Some(cached.clone());
                }
            }
            state.in_flight = true;
            state.fetches += 1;
            state.generation
        };

        let guard = InFlight { feed: self, generation };
        let result = self.oracle.get_price(token).await;
        drop(guard);

        let mut state = self.lock();
        if state.generation != generation {
            debug!("Discarding price for {} fetched before feed reset", token);
            return None;
        }

        match result {
            Ok(price) => {
                let snapshot = PriceSnapshot {
                    token_address: token.to_string(),
                    symbol: price.symbol,
                    price: price.price,
                    change_24h: price.change_24h,
                    fetched_at: Utc::now(),
                };
                debug!(
                    "Price for {}: {:.8} ({:+.2}% 24h)",
                    snapshot.display_symbol(), snapshot.price, snapshot.change_24h
                );
                state.cached = Some(snapshot.clone());
                state.last_fetch = Some(Instant::now());
                Some(snapshot)
            }
            Err(e) => {
                let stale = state
                    .cached
                    .as_ref()
                    .filter(|s| s.token_address == token)
                    .cloned();
                drop(state);
                warn!("Price fetch for {} failed; keeping stale snapshot: {}", token, e);
                self.reporter
                    .report(&BotError::Fetch(format!("{:#}", e)), &format!("price refresh for {}", token));
                stale
            }
        }
    }

    /// Last snapshot without fetching.
    pub fn current(&self) -> Option<PriceSnapshot> {
        self.lock().cached.clone()
    }

    /// Number of oracle calls issued so far.
    pub fn fetch_count(&self) -> u64 {
        self.lock().fetches
    }

    /// Tears the feed down: drops the cache and invalidates any fetch in flight.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.cached = None;
        state.last_fetch = None;
        state.in_flight = false;
        state.generation += 1;
    }
}
