use api_client::{ApiError, BrokerApi};
use core_types::{Bar, Target};
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How many bar fetches run concurrently during a bulk refresh. Kept small
/// to respect the broker's per-second rate limit.
const FETCH_CONCURRENCY: usize = 5;

struct CacheEntry {
    bars: Vec<Bar>,
}

/// The per-market daily-bar cache.
///
/// Bars for every target symbol are refetched in bulk each time the refresh
/// interval elapses. Between bulk refreshes only symbols *missing* from the
/// cache are retried, so one failed fetch is corrected on the next cycle
/// instead of waiting out the full interval.
///
/// The cache is mutated only by `refresh`; readers get an immutable series or
/// a per-cycle working copy with the live quote overlaid.
pub struct MarketDataCache {
    entries: HashMap<String, CacheEntry>,
    last_bulk_refresh: Option<Instant>,
    refresh_interval: Duration,
}

impl MarketDataCache {
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            last_bulk_refresh: None,
            refresh_interval,
        }
    }

    /// Refreshes the cache for the given targets.
    ///
    /// Fetches run through a bounded concurrent pool; each symbol's failure
    /// is logged and isolated so the rest of the refresh proceeds.
    pub async fn refresh(&mut self, api: &Arc<dyn BrokerApi>, targets: &[Target]) {
        let bulk_due = self
            .last_bulk_refresh
            .map(|t| t.elapsed() >= self.refresh_interval)
            .unwrap_or(true);

        let wanted: Vec<(String, Option<String>)> = targets
            .iter()
            .filter(|t| bulk_due || !self.entries.contains_key(&t.symbol))
            .map(|t| (t.symbol.clone(), t.exchange.clone()))
            .collect();

        if wanted.is_empty() {
            return;
        }
        tracing::debug!(count = wanted.len(), bulk = bulk_due, "Refreshing bar cache.");

        let results: Vec<(String, Result<Vec<Bar>, ApiError>)> = stream::iter(wanted)
            .map(|(symbol, exchange)| {
                let api = Arc::clone(api);
                async move {
                    let bars = api.get_daily_bars(&symbol, exchange.as_deref()).await;
                    (symbol, bars)
                }
            })
            .buffer_unordered(FETCH_CONCURRENCY)
            .collect()
            .await;

        for (symbol, result) in results {
            match result {
                Ok(bars) if !bars.is_empty() => {
                    self.entries.insert(symbol, CacheEntry { bars });
                }
                Ok(_) => {
                    tracing::warn!(symbol, "Broker returned an empty bar series; will retry.");
                }
                Err(e) => {
                    // Left absent on purpose: the missing-symbol path retries
                    // it next cycle without waiting for the bulk timer.
                    tracing::warn!(symbol, error = %e, "Bar fetch failed.");
                }
            }
        }

        if bulk_due {
            self.last_bulk_refresh = Some(Instant::now());
        }
    }

    /// The cached series for a symbol, oldest bar first.
    pub fn bars(&self, symbol: &str) -> Option<&[Bar]> {
        self.entries.get(symbol).map(|e| e.bars.as_slice())
    }

    /// A per-cycle working copy of the series with the live quote overlaid
    /// onto the most recent bar (close replaced, high/low extended).
    ///
    /// The cache itself is never touched by quote data; only this copy is.
    pub fn working_bars(&self, symbol: &str, quote: Decimal) -> Option<Vec<Bar>> {
        let mut bars = self.entries.get(symbol)?.bars.clone();
        if let Some(last) = bars.last_mut() {
            last.close = quote;
            last.high = last.high.max(quote);
            last.low = last.low.min(quote);
        }
        Some(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use core_types::{BalanceSnapshot, MacdRsiParams, OrderRequest, StrategySpec};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedBroker {
        bar_calls: AtomicUsize,
        fail_symbols: Vec<String>,
    }

    #[async_trait]
    impl BrokerApi for ScriptedBroker {
        async fn authenticate(&self) -> Result<(), ApiError> {
            Ok(())
        }
        async fn get_balance(&self) -> Result<BalanceSnapshot, ApiError> {
            Ok(BalanceSnapshot::default())
        }
        async fn get_daily_bars(
            &self,
            symbol: &str,
            _exchange: Option<&str>,
        ) -> Result<Vec<Bar>, ApiError> {
            self.bar_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_symbols.iter().any(|s| s == symbol) {
                return Err(ApiError::Server {
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(vec![bar(1, dec!(100)), bar(2, dec!(110))])
        }
        async fn get_quote(
            &self,
            _symbol: &str,
            _exchange: Option<&str>,
        ) -> Result<Decimal, ApiError> {
            Ok(dec!(100))
        }
        async fn submit_order(&self, _order: &OrderRequest) -> Result<String, ApiError> {
            unimplemented!()
        }
        async fn get_open_orders(&self) -> Result<Vec<String>, ApiError> {
            Ok(vec![])
        }
        async fn cancel_order(&self, _order_id: &str, _symbol: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn bar(day: u32, close: Decimal) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + dec!(5),
            low: close - dec!(5),
            close,
            volume: 1000,
        }
    }

    fn target(symbol: &str) -> Target {
        Target {
            symbol: symbol.into(),
            display_name: symbol.into(),
            target_weight: dec!(0.1),
            strategy: StrategySpec::MacdRsi(MacdRsiParams::default()),
            exchange: None,
        }
    }

    #[tokio::test]
    async fn failed_symbols_are_retried_before_the_bulk_timer() {
        let broker = Arc::new(ScriptedBroker {
            bar_calls: AtomicUsize::new(0),
            fail_symbols: vec!["BBB".into()],
        });
        let api: Arc<dyn BrokerApi> = broker.clone();
        let targets = vec![target("AAA"), target("BBB")];

        let mut cache = MarketDataCache::new(Duration::from_secs(600));
        cache.refresh(&api, &targets).await;
        assert!(cache.bars("AAA").is_some());
        assert!(cache.bars("BBB").is_none());
        assert_eq!(broker.bar_calls.load(Ordering::SeqCst), 2);

        // Second pass, well inside the interval: only the missing symbol.
        cache.refresh(&api, &targets).await;
        assert_eq!(broker.bar_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn quote_overlay_does_not_mutate_the_cache() {
        let broker = Arc::new(ScriptedBroker {
            bar_calls: AtomicUsize::new(0),
            fail_symbols: vec![],
        });
        let api: Arc<dyn BrokerApi> = broker;
        let targets = vec![target("AAA")];

        let mut cache = MarketDataCache::new(Duration::from_secs(600));
        cache.refresh(&api, &targets).await;

        let working = cache.working_bars("AAA", dec!(130)).unwrap();
        let overlaid = working.last().unwrap();
        assert_eq!(overlaid.close, dec!(130));
        assert_eq!(overlaid.high, dec!(130));

        // The cached series still shows the fetched close.
        let cached = cache.bars("AAA").unwrap().last().unwrap().clone();
        assert_eq!(cached.close, dec!(110));
        assert_eq!(cached.high, dec!(115));
    }
}
