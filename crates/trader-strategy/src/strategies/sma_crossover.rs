//! 이동평균 크로스오버 모멘텀 전략.
//!
//! 직전 봉 대비 단기 SMA가 장기 SMA를 상향 돌파하면 CALL, 하향 돌파하면 PUT.

use trader_core::{Candle, ParamMap, ParamRange, ParamRanges, StrategySignal};

use super::common::sma;
use crate::traits::{param_or, period_param, Strategy};

/// 단기/장기 SMA 크로스오버 전략
#[derive(Debug, Clone, Default)]
pub struct SmaCrossoverStrategy;

impl SmaCrossoverStrategy {
    /// 레지스트리 ID
    pub const ID: &'static str = "sma_crossover";

    pub fn new() -> Self {
        Self
    }
}

impl Strategy for SmaCrossoverStrategy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "SMA 크로스오버"
    }

    fn description(&self) -> &str {
        "단기/장기 이동평균 교차 방향으로 진입"
    }

    fn default_params(&self) -> ParamMap {
        ParamMap::from([("fast".to_string(), 5.0), ("slow".to_string(), 20.0)])
    }

    fn param_ranges(&self) -> ParamRanges {
        ParamRanges::from([
            ("fast".to_string(), ParamRange::new(3.0, 9.0, 2.0)),
            ("slow".to_string(), ParamRange::new(15.0, 30.0, 5.0)),
        ])
    }

    fn generate_signal(&self, candles: &[Candle], params: &ParamMap) -> Option<StrategySignal> {
        let defaults = self.default_params();
        let fast = period_param(param_or(params, &defaults, "fast", 5.0));
        let slow = period_param(param_or(params, &defaults, "slow", 20.0));
        if fast >= slow || candles.len() < slow + 1 {
            return None;
        }

        let previous = &candles[..candles.len() - 1];
        let fast_now = sma(candles, fast)?;
        let slow_now = sma(candles, slow)?;
        let fast_prev = sma(previous, fast)?;
        let slow_prev = sma(previous, slow)?;

        let spread = (fast_now - slow_now) / slow_now;
        let confidence = 0.5 + (spread.abs() * 100.0).min(0.5);

        let signal = if fast_prev <= slow_prev && fast_now > slow_now {
            StrategySignal::call(confidence).with_reason("골든 크로스")
        } else if fast_prev >= slow_prev && fast_now < slow_now {
            StrategySignal::put(confidence).with_reason("데드 크로스")
        } else {
            StrategySignal::none()
        };

        Some(
            signal
                .with_indicator("sma_fast", fast_now)
                .with_indicator("sma_slow", slow_now),
        )
    }
}
