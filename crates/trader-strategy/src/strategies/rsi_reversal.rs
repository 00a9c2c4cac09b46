//! RSI 평균회귀 전략.
//!
//! RSI가 과매도 구간이면 CALL, 과매수 구간이면 PUT.

use trader_core::{Candle, ParamMap, ParamRange, ParamRanges, StrategySignal};

use super::common::rsi;
use crate::traits::{param_or, period_param, Strategy};

/// RSI 과매수/과매도 반전 전략
#[derive(Debug, Clone, Default)]
pub struct RsiReversalStrategy;

impl RsiReversalStrategy {
    /// 레지스트리 ID
    pub const ID: &'static str = "rsi_reversal";

    pub fn new() -> Self {
        Self
    }
}

impl Strategy for RsiReversalStrategy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "RSI 반전"
    }

    fn description(&self) -> &str {
        "RSI 과매수/과매도 구간에서 반대 방향 진입"
    }

    fn default_params(&self) -> ParamMap {
        ParamMap::from([
            ("period".to_string(), 14.0),
            ("oversold".to_string(), 30.0),
            ("overbought".to_string(), 70.0),
        ])
    }

    fn param_ranges(&self) -> ParamRanges {
        ParamRanges::from([
            ("period".to_string(), ParamRange::new(7.0, 21.0, 7.0)),
            ("oversold".to_string(), ParamRange::new(20.0, 35.0, 5.0)),
            ("overbought".to_string(), ParamRange::new(65.0, 80.0, 5.0)),
        ])
    }

    fn generate_signal(&self, candles: &[Candle], params: &ParamMap) -> Option<StrategySignal> {
        let defaults = self.default_params();
        let period = period_param(param_or(params, &defaults, "period", 14.0));
        let oversold = param_or(params, &defaults, "oversold", 30.0);
        let overbought = param_or(params, &defaults, "overbought", 70.0);

        let value = rsi(candles, period)?;

        let signal = if value < oversold {
            let depth = (oversold - value) / oversold.max(1.0);
            StrategySignal::call(0.5 + depth / 2.0).with_reason("RSI 과매도")
        } else if value > overbought {
            let depth = (value - overbought) / (100.0 - overbought).max(1.0);
            StrategySignal::put(0.5 + depth / 2.0).with_reason("RSI 과매수")
        } else {
            StrategySignal::none()
        };

        Some(signal.with_indicator("rsi", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trader_core::Direction;

    fn series(closes: impl Iterator<Item = f64>) -> Vec<Candle> {
        closes
            .enumerate()
            .map(|(i, c)| Candle::new(60_000 * (i as i64 + 1), c, c + 0.1, c - 0.1, c))
            .collect()
    }

    #[test]
    fn test_insufficient_data_returns_none() {
        let candles = series((0..10).map(|i| 10.0 + i as f64));
        assert!(RsiReversalStrategy.generate_signal(&candles, &ParamMap::new()).is_none());
    }

    #[test]
    fn test_overbought_signals_put() {
        let candles = series((0..30).map(|i| 10.0 + i as f64 * 0.1));
        let signal = RsiReversalStrategy
            .generate_signal(&candles, &ParamMap::new())
            .unwrap();
        assert_eq!(signal.direction, Some(Direction::Put));
        assert_eq!(signal.indicators.get("rsi"), Some(&100.0));
    }

    #[test]
    fn test_oversold_signals_call() {
        let candles = series((0..30).map(|i| 10.0 - i as f64 * 0.1));
        let signal = RsiReversalStrategy
            .generate_signal(&candles, &ParamMap::new())
            .unwrap();
        assert_eq!(signal.direction, Some(Direction::Call));
    }

    #[test]
    fn test_neutral_zone_no_trade() {
        let candles = series((0..30).map(|i| if i % 2 == 0 { 10.0 } else { 10.1 }));
        let signal = RsiReversalStrategy
            .generate_signal(&candles, &ParamMap::new())
            .unwrap();
        assert!(!signal.is_actionable());
    }
}
