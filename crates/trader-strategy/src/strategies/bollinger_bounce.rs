//! 볼린저 밴드 반등 전략.

use trader_core::{Candle, ParamMap, ParamRange, ParamRanges, StrategySignal};

use super::common::bollinger;
use crate::traits::{param_or, period_param, Strategy};

/// 종가가 하단 밴드를 이탈하면 CALL, 상단 밴드를 이탈하면 PUT
#[derive(Debug, Clone, Default)]
pub struct BollingerBounceStrategy;

impl BollingerBounceStrategy {
    /// 레지스트리 ID
    pub const ID: &'static str = "bollinger_bounce";

    pub fn new() -> Self {
        Self
    }
}

impl Strategy for BollingerBounceStrategy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "볼린저 반등"
    }

    fn description(&self) -> &str {
        "볼린저 밴드 이탈 후 평균 회귀 방향으로 진입"
    }

    fn default_params(&self) -> ParamMap {
        ParamMap::from([("period".to_string(), 20.0), ("std_dev".to_string(), 2.0)])
    }

    fn param_ranges(&self) -> ParamRanges {
        ParamRanges::from([
            ("period".to_string(), ParamRange::new(10.0, 30.0, 5.0)),
            ("std_dev".to_string(), ParamRange::new(1.5, 3.0, 0.5)),
        ])
    }

    fn generate_signal(&self, candles: &[Candle], params: &ParamMap) -> Option<StrategySignal> {
        let defaults = self.default_params();
        let period = period_param(param_or(params, &defaults, "period", 20.0));
        let std_dev = param_or(params, &defaults, "std_dev", 2.0);

        let (middle, upper, lower) = bollinger(candles, period, std_dev)?;
        let close = candles.last()?.close;
        let width = upper - lower;

        let signal = if width > 0.0 && close < lower {
            StrategySignal::call(0.5 + ((lower - close) / width).min(0.5)).with_reason("하단 밴드 이탈")
        } else if width > 0.0 && close > upper {
            StrategySignal::put(0.5 + ((close - upper) / width).min(0.5)).with_reason("상단 밴드 이탈")
        } else {
            StrategySignal::none()
        };

        Some(
            signal
                .with_indicator("bb_middle", middle)
                .with_indicator("bb_upper", upper)
                .with_indicator("bb_lower", lower),
        )
    }
}
