//! 도메인 레코드.

pub mod candle;
pub mod params;
pub mod signal;

pub use candle::Candle;
pub use params::{format_params, ParamMap, ParamRange, ParamRanges};
pub use signal::{Direction, StrategySignal};
