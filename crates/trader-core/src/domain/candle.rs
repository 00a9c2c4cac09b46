//! OHLCV 캔들.
//!
//! 외부에서 수집되거나 갭 보간으로 합성되는 읽기 전용 입력 레코드입니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Candle
// =============================================================================

/// 고정 시간 간격의 OHLCV 봉.
///
/// # 불변식
///
/// - OHLC 값은 모두 유한하고 0보다 큼
/// - `low <= min(open, close)`, `high >= max(open, close)`
/// - `timestamp > 0` (밀리초)
///
/// 불변식은 생성 시 강제하지 않으며 [`Candle::is_valid`]로 검사합니다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 봉 시작 시각 (Unix epoch 밀리초)
    pub timestamp: i64,
    /// 시가
    pub open: f64,
    /// 고가
    pub high: f64,
    /// 저가
    pub low: f64,
    /// 종가
    pub close: f64,
    /// 거래량 (합성 캔들은 0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Candle {
    /// 새 캔들 생성.
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    /// 거래량 설정
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// 시가=고가=저가=종가인 캔들 (도지 테스트용).
    pub fn flat(timestamp: i64, price: f64) -> Self {
        Self::new(timestamp, price, price, price, price)
    }

    /// 불변식 검사.
    ///
    /// 도지(네 가격이 모두 같은 캔들)도 유효합니다.
    pub fn is_valid(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return false;
        }
        if self.timestamp <= 0 {
            return false;
        }
        if let Some(volume) = self.volume {
            if !volume.is_finite() || volume < 0.0 {
                return false;
            }
        }

        self.low <= self.open.min(self.close) && self.high >= self.open.max(self.close)
    }

    /// 갭 보간으로 만들어진 캔들인지 여부 (거래량 0).
    pub fn is_synthetic(&self) -> bool {
        self.volume == Some(0.0)
    }

    /// 봉 몸통 중간값.
    pub fn mid(&self) -> f64 {
        (self.open + self.close) / 2.0
    }

    /// UTC 시각으로 변환. 범위를 벗어나면 `None`.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}
