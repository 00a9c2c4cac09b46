//! 백테스팅 모듈
//!
//! 과거 캔들로 바이너리 옵션 전략을 시뮬레이션하고 성과를 집계합니다.
//!
//! # 주요 구성요소
//!
//! - [`preprocess`]: 캔들 정렬/검증/중복 제거/갭 처리
//! - [`BacktestConfig`]: 백테스트 설정 (잔고, 베팅 방식, 지급률, 만기, 슬리피지, 지연)
//! - [`BacktestEngine`]: 백테스트 실행 엔진
//! - [`BacktestResult`]: 백테스트 결과 (거래, 자산 곡선, 데이터 품질)

pub mod engine;
pub mod preprocessor;
pub mod report;

pub use engine::{
    profit_factor, BacktestConfig, BacktestEngine, BacktestError, BetSizing, EngineResult,
    LOOKBACK, MIN_CANDLES,
};
pub use preprocessor::{
    calculate_coverage, detect_gaps, detect_interval, fill_gaps, is_valid_candle, preprocess,
    split_at_gaps, CandleGap, DataAnalysis, GapStrategy, PreprocessOptions, PreprocessResult,
    DEFAULT_INTERVAL_MS, DEFAULT_MAX_GAP_CANDLES, DEFAULT_TOLERANCE_FACTOR,
};
pub use report::{BacktestResult, BacktestTrade, DataQuality, EquityPoint, TradeOutcome};
