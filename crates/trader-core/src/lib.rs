//! 트레이딩 백테스트 공통 도메인 타입.
//!
//! 모든 크레이트가 공유하는 레코드를 정의합니다:
//! - [`Candle`] - OHLCV 캔들과 유효성 불변식
//! - [`Direction`], [`StrategySignal`] - 전략 시그널 계약
//! - [`ParamMap`], [`ParamRange`], [`ParamRanges`] - 전략 파라미터와 탐색 공간

pub mod domain;
pub mod serde_helpers;

pub use domain::*;
