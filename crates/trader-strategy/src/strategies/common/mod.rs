//! 전략 공통 유틸리티.

pub mod indicators;

pub use indicators::{bollinger, rsi, sma, RsiCalculator};
