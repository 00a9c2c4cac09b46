//! 전략 계약과 레지스트리.
//!
//! - [`Strategy`]: 시그널 생성 capability 인터페이스
//! - [`StrategyRegistry`]: 명시적으로 생성해 전달하는 ID → 전략 맵
//! - [`strategies`]: 내장 참조 전략

pub mod registry;
pub mod strategies;
pub mod traits;

pub use registry::StrategyRegistry;
pub use strategies::BuiltinStrategy;
pub use traits::{param_or, period_param, Strategy, StrategyMetadata};
