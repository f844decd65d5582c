use core_types::Bar;
use rust_decimal::prelude::*;
use ta::Next as _;
use ta::indicators::{
    MovingAverageConvergenceDivergence, RelativeStrengthIndex, SimpleMovingAverage,
};

use crate::error::StrategyError;

/// Below this many bars the moving averages are meaningless, so no frame is
/// produced at all.
pub const MIN_BARS: usize = 20;

/// One bar with every derived indicator the rule families consume.
///
/// Prices are converted to `f64` once here; the `ta` crate works in floats and
/// every downstream comparison is a float comparison. Indicators that need a
/// warm-up window are `None` until enough history has been seen.
#[derive(Debug, Clone)]
pub struct IndicatorRow {
    pub date: chrono::NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub sma5: Option<f64>,
    pub sma20: Option<f64>,
    pub sma60: Option<f64>,
    pub macd: f64,
    pub macd_signal: f64,
    pub rsi: Option<f64>,
    /// Previous day's high minus previous day's low. `None` on the first bar.
    pub range: Option<f64>,
    /// 20-day average of the candle noise ratio `1 - |open-close| / (high-low)`.
    pub noise_ma20: Option<f64>,
}

/// The fully derived indicator series for one symbol, oldest row first.
#[derive(Debug)]
pub struct IndicatorFrame {
    rows: Vec<IndicatorRow>,
}

impl IndicatorFrame {
    /// Builds the frame from a daily bar series.
    ///
    /// Bars are sorted by date before computation so callers don't have to
    /// care which order the broker delivered them in.
    pub fn compute(bars: &[Bar]) -> Result<Self, StrategyError> {
        if bars.len() < MIN_BARS {
            return Err(StrategyError::InsufficientData {
                have: bars.len(),
                need: MIN_BARS,
            });
        }

        let mut bars = bars.to_vec();
        bars.sort_by_key(|b| b.date);

        let mut sma5 = sma(5)?;
        let mut sma20 = sma(20)?;
        let mut sma60 = sma(60)?;
        let mut noise_ma = sma(20)?;
        let mut macd = MovingAverageConvergenceDivergence::new(12, 26, 9)
            .map_err(|e| StrategyError::InvalidParameters(format!("MACD init failed: {e:?}")))?;
        let mut rsi = RelativeStrengthIndex::new(14)
            .map_err(|e| StrategyError::InvalidParameters(format!("RSI init failed: {e:?}")))?;

        let mut rows = Vec::with_capacity(bars.len());
        let mut prev_span: Option<f64> = None;

        for (i, bar) in bars.iter().enumerate() {
            let open = to_f64(bar.open, "open")?;
            let high = to_f64(bar.high, "high")?;
            let low = to_f64(bar.low, "low")?;
            let close = to_f64(bar.close, "close")?;
            let volume = bar.volume as f64;

            let s5 = sma5.next(close);
            let s20 = sma20.next(close);
            let s60 = sma60.next(close);
            let macd_out = macd.next(close);
            let r = rsi.next(close);

            // Noise ratio: long wicks push it toward 1, full-bodied candles
            // toward 0. A zero-height candle (trading halt) counts the body
            // against a span of 1, matching the moving average's scale.
            let body = (open - close).abs();
            let span = high - low;
            let noise = if span > 0.0 { 1.0 - body / span } else { 1.0 - body };
            let nma = noise_ma.next(noise);

            rows.push(IndicatorRow {
                date: bar.date,
                open,
                high,
                low,
                close,
                volume,
                sma5: (i + 1 >= 5).then_some(s5),
                sma20: (i + 1 >= 20).then_some(s20),
                sma60: (i + 1 >= 60).then_some(s60),
                macd: macd_out.macd,
                macd_signal: macd_out.signal,
                // 14 deltas need 15 closes.
                rsi: (i + 1 >= 15).then_some(r),
                range: prev_span,
                noise_ma20: (i + 1 >= 20).then_some(nma),
            });

            prev_span = Some(high - low);
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[IndicatorRow] {
        &self.rows
    }

    /// The most recent row and the one before it, i.e. (today, yesterday).
    pub fn latest_pair(&self) -> Option<(&IndicatorRow, &IndicatorRow)> {
        let n = self.rows.len();
        if n < 2 {
            return None;
        }
        Some((&self.rows[n - 1], &self.rows[n - 2]))
    }
}

fn sma(period: usize) -> Result<SimpleMovingAverage, StrategyError> {
    SimpleMovingAverage::new(period)
        .map_err(|e| StrategyError::InvalidParameters(format!("SMA({period}) init failed: {e:?}")))
}

fn to_f64(value: rust_decimal::Decimal, field: &str) -> Result<f64, StrategyError> {
    value
        .to_f64()
        .ok_or_else(|| StrategyError::IndicatorError(format!("Failed to convert {field} to f64")))
}

#[cfg(test)]
pub(crate) mod test_rows {
    use super::IndicatorRow;
    use chrono::NaiveDate;

    /// A neutral row the strategy tests tweak field by field.
    pub fn row(tweak: impl FnOnce(&mut IndicatorRow)) -> IndicatorRow {
        let mut r = IndicatorRow {
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            open: 100.0,
            high: 105.0,
            low: 95.0,
            close: 100.0,
            volume: 1000.0,
            sma5: Some(100.0),
            sma20: Some(100.0),
            sma60: None,
            macd: 0.0,
            macd_signal: 0.0,
            rsi: Some(50.0),
            range: Some(10.0),
            noise_ma20: None,
        };
        tweak(&mut r);
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let close = rust_decimal::Decimal::from(100 + i as i64);
                Bar {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                        + chrono::Days::new(i as u64),
                    open: close - dec!(1),
                    high: close + dec!(2),
                    low: close - dec!(2),
                    close,
                    volume: 1000 + i as i64,
                }
            })
            .collect()
    }

    #[test]
    fn too_few_bars_is_an_error() {
        let err = IndicatorFrame::compute(&bars(19)).unwrap_err();
        assert!(matches!(
            err,
            StrategyError::InsufficientData { have: 19, need: 20 }
        ));
    }

    #[test]
    fn warmup_gating_matches_each_window() {
        let frame = IndicatorFrame::compute(&bars(30)).unwrap();
        let rows = frame.rows();

        assert!(rows[3].sma5.is_none());
        assert!(rows[4].sma5.is_some());
        assert!(rows[18].sma20.is_none());
        assert!(rows[19].sma20.is_some());
        // Only 30 bars: the 60-day average never warms up.
        assert!(rows[29].sma60.is_none());
        assert!(rows[13].rsi.is_none());
        assert!(rows[14].rsi.is_some());
        assert!(rows[19].noise_ma20.is_some());
    }

    #[test]
    fn range_is_the_previous_days_span() {
        let frame = IndicatorFrame::compute(&bars(20)).unwrap();
        let rows = frame.rows();
        assert!(rows[0].range.is_none());
        // Every synthetic bar spans high - low = 4.
        assert_eq!(rows[1].range, Some(4.0));
    }

    #[test]
    fn unsorted_bars_are_reordered_by_date() {
        let mut series = bars(25);
        series.reverse();
        let frame = IndicatorFrame::compute(&series).unwrap();
        let rows = frame.rows();
        assert!(rows.windows(2).all(|w| w[0].date < w[1].date));
        // Latest close is the highest in the ascending synthetic series.
        assert_eq!(rows.last().unwrap().close, 124.0);
    }

    #[test]
    fn latest_pair_is_today_then_yesterday() {
        let frame = IndicatorFrame::compute(&bars(21)).unwrap();
        let (today, yesterday) = frame.latest_pair().unwrap();
        assert!(today.date > yesterday.date);
        assert_eq!(today.close, 120.0);
        assert_eq!(yesterday.close, 119.0);
    }
}
