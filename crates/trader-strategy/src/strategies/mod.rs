//! 내장 트레이딩 전략.
//!
//! 레지스트리·리더보드·CLI를 끝까지 실행해 볼 수 있도록 제공되는 참조 전략입니다:
//!
//! - **RSI Reversal**: RSI 과매수/과매도 반전
//! - **SMA Crossover**: 단기/장기 이동평균 교차 모멘텀
//! - **Bollinger Bounce**: 볼린저 밴드 이탈 후 평균 회귀
//!
//! ## 공통 유틸리티
//!
//! `common` 서브모듈은 RSI, SMA, 볼린저 밴드 계산기를 제공합니다.

use std::sync::Arc;

// 공통 유틸리티
pub mod common;

// 내장 전략
pub mod bollinger_bounce;
pub mod rsi_reversal;
pub mod sma_crossover;

pub use bollinger_bounce::BollingerBounceStrategy;
pub use rsi_reversal::RsiReversalStrategy;
pub use sma_crossover::SmaCrossoverStrategy;

use crate::traits::Strategy;

/// 내장 전략 목록.
///
/// 문자열 ID 대신 고정된 열거형으로 구현체를 선택합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinStrategy {
    RsiReversal,
    SmaCrossover,
    BollingerBounce,
}

impl BuiltinStrategy {
    /// 등록 순서
    pub const ALL: [BuiltinStrategy; 3] = [
        BuiltinStrategy::RsiReversal,
        BuiltinStrategy::SmaCrossover,
        BuiltinStrategy::BollingerBounce,
    ];

    /// 레지스트리 ID
    pub fn id(self) -> &'static str {
        match self {
            Self::RsiReversal => RsiReversalStrategy::ID,
            Self::SmaCrossover => SmaCrossoverStrategy::ID,
            Self::BollingerBounce => BollingerBounceStrategy::ID,
        }
    }

    /// 짧은 별칭
    pub fn alias(self) -> &'static str {
        match self {
            Self::RsiReversal => "rsi",
            Self::SmaCrossover => "sma",
            Self::BollingerBounce => "bb",
        }
    }

    /// ID 문자열 파싱 (별칭 허용)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rsi_reversal" | "rsi" => Some(Self::RsiReversal),
            "sma_crossover" | "sma" | "crossover" => Some(Self::SmaCrossover),
            "bollinger_bounce" | "bollinger" | "bb" => Some(Self::BollingerBounce),
            _ => None,
        }
    }

    /// 전략 인스턴스 생성
    pub fn create(self) -> Arc<dyn Strategy> {
        match self {
            Self::RsiReversal => Arc::new(RsiReversalStrategy),
            Self::SmaCrossover => Arc::new(SmaCrossoverStrategy),
            Self::BollingerBounce => Arc::new(BollingerBounceStrategy),
        }
    }
}
