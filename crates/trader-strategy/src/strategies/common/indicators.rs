//! 전략 공통 지표 계산기.
//!
//! 전략은 시그널 시점까지의 전체 캔들을 받지만, 지표 계산에는 마지막 구간만 사용합니다.

use std::collections::VecDeque;

use trader_core::Candle;

/// RSI 계산기 (단순 평균 방식)
#[derive(Debug, Clone, Default)]
pub struct RsiCalculator {
    gains: VecDeque<f64>,
    losses: VecDeque<f64>,
    prev_close: Option<f64>,
    period: usize,
}

impl RsiCalculator {
    /// 새 계산기 생성
    pub fn new(period: usize) -> Self {
        Self {
            gains: VecDeque::with_capacity(period + 1),
            losses: VecDeque::with_capacity(period + 1),
            prev_close: None,
            period: period.max(1),
        }
    }

    /// 종가를 추가하고 RSI를 반환합니다. 기간이 채워지기 전에는 `None`.
    pub fn update(&mut self, close: f64) -> Option<f64> {
        if let Some(prev) = self.prev_close {
            let change = close - prev;
            self.gains.push_back(change.max(0.0));
            self.losses.push_back((-change).max(0.0));

            while self.gains.len() > self.period {
                self.gains.pop_front();
            }
            while self.losses.len() > self.period {
                self.losses.pop_front();
            }
        }
        self.prev_close = Some(close);

        if self.gains.len() < self.period {
            return None;
        }

        let avg_gain = self.gains.iter().sum::<f64>() / self.period as f64;
        let avg_loss = self.losses.iter().sum::<f64>() / self.period as f64;

        if avg_loss == 0.0 {
            // 변동이 전혀 없으면 중립
            return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
        }

        let rs = avg_gain / avg_loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }
}

/// 마지막 캔들 기준 RSI.
pub fn rsi(candles: &[Candle], period: usize) -> Option<f64> {
    if candles.len() < period + 1 {
        return None;
    }
    let mut calculator = RsiCalculator::new(period);
    let mut value = None;
    for candle in &candles[candles.len() - period - 1..] {
        value = calculator.update(candle.close);
    }
    value
}

/// 마지막 `period`개 종가의 단순 이동평균.
pub fn sma(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period {
        return None;
    }
    let window = &candles[candles.len() - period..];
    Some(window.iter().map(|c| c.close).sum::<f64>() / period as f64)
}

/// 볼린저 밴드 (중심선, 상단, 하단).
pub fn bollinger(candles: &[Candle], period: usize, std_multiplier: f64) -> Option<(f64, f64, f64)> {
    let middle = sma(candles, period)?;
    let window = &candles[candles.len() - period..];
    let variance = window
        .iter()
        .map(|c| (c.close - middle).powi(2))
        .sum::<f64>()
        / period as f64;
    let band = variance.sqrt() * std_multiplier;
    Some((middle, middle + band, middle - band))
}
