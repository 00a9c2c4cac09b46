//! 전략의 트레이딩 시그널.
//!
//! 이 모듈은 전략이 생성하는 매매 신호 관련 타입을 정의합니다:
//! - `Direction` - 만기 시점 가격 방향 예측 (CALL / PUT)
//! - `StrategySignal` - 한 시점의 전략 평가 결과

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 만기 시점 가격 방향 베팅.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// 만기 가격이 진입가보다 높을 것
    Call,
    /// 만기 가격이 진입가보다 낮을 것
    Put,
}

impl Direction {
    /// 반대 방향
    pub fn opposite(self) -> Self {
        match self {
            Direction::Call => Direction::Put,
            Direction::Put => Direction::Call,
        }
    }

    /// 방향 부호 (CALL = +1, PUT = -1).
    ///
    /// 슬리피지 적용 및 손익 판정에 사용됩니다.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Call => 1.0,
            Direction::Put => -1.0,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Call => write!(f, "CALL"),
            Direction::Put => write!(f, "PUT"),
        }
    }
}

/// 전략 평가 결과.
///
/// `direction`이 `None`이면 "평가는 했지만 진입하지 않음"을 의미합니다.
/// 데이터가 부족한 경우에는 전략이 시그널 자체를 반환하지 않습니다(`Option::None`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StrategySignal {
    /// 진입 방향
    pub direction: Option<Direction>,
    /// 신뢰도 (0.0 ~ 1.0)
    pub confidence: f64,
    /// 시그널 시점의 지표 스냅샷
    #[serde(default)]
    pub indicators: BTreeMap<String, f64>,
    /// 판단 근거
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StrategySignal {
    /// 진입 시그널 생성. 신뢰도는 [0, 1]로 클램프됩니다.
    pub fn entry(direction: Direction, confidence: f64) -> Self {
        Self {
            direction: Some(direction),
            confidence: clamp_confidence(confidence),
            ..Default::default()
        }
    }

    /// CALL 시그널
    pub fn call(confidence: f64) -> Self {
        Self::entry(Direction::Call, confidence)
    }

    /// PUT 시그널
    pub fn put(confidence: f64) -> Self {
        Self::entry(Direction::Put, confidence)
    }

    /// 진입 없음 (평가 완료)
    pub fn none() -> Self {
        Self::default()
    }

    /// 지표 값 추가
    pub fn with_indicator(mut self, name: impl Into<String>, value: f64) -> Self {
        self.indicators.insert(name.into(), value);
        self
    }

    /// 판단 근거 설정
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// 진입 여부
    pub fn is_actionable(&self) -> bool {
        self.direction.is_some()
    }
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_serde_uppercase() {
        assert_eq!(serde_json::to_string(&Direction::Call).unwrap(), "\"CALL\"");
        let put: Direction = serde_json::from_str("\"PUT\"").unwrap();
        assert_eq!(put, Direction::Put);
        assert_eq!(put.opposite(), Direction::Call);
    }

    #[test]
    fn test_signal_builders() {
        let signal = StrategySignal::call(1.7)
            .with_indicator("rsi", 24.5)
            .with_reason("과매도");
        assert!(signal.is_actionable());
        assert_eq!(signal.confidence, 1.0);
        assert_eq!(signal.indicators.get("rsi"), Some(&24.5));

        let idle = StrategySignal::none();
        assert!(!idle.is_actionable());
        assert_eq!(StrategySignal::put(f64::NAN).confidence, 0.0);
    }
}
