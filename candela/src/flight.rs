use std::collections::HashMap;
use std::sync::Mutex;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use candela_core::{CandelaError, Timeframe};

use crate::router::RouteReport;

/// Key of one coalesced refresh: (symbol, timeframe, sub-range).
pub(crate) type FlightKey = (String, Timeframe, i64, i64);

pub(crate) type FlightOutcome = Result<RouteReport, CandelaError>;
type SharedFlight = Shared<BoxFuture<'static, FlightOutcome>>;

/// Keyed single-flight map: concurrent refreshes of the same sub-range share
/// one in-flight future, so only one provider call chain runs and every
/// waiter observes the same outcome.
#[derive(Default)]
pub(crate) struct FlightMap {
    inflight: Mutex<HashMap<FlightKey, SharedFlight>>,
}

impl FlightMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight refresh for `key`, or start one with `make`.
    pub(crate) async fn run<F>(&self, key: FlightKey, make: F) -> FlightOutcome
    where
        F: FnOnce() -> BoxFuture<'static, FlightOutcome>,
    {
        let (flight, leader) = match self.inflight.lock() {
            Ok(mut map) => {
                if let Some(existing) = map.get(&key) {
                    (existing.clone(), false)
                } else {
                    let shared = make().shared();
                    map.insert(key.clone(), shared.clone());
                    (shared, true)
                }
            }
            // Poisoned map: degrade to an uncoalesced refresh.
            Err(_) => (make().shared(), true),
        };

        let outcome = flight.await;
        if leader && let Ok(mut map) = self.inflight.lock() {
            map.remove(&key);
        }
        outcome
    }
}
