//! 백테스트, 파라미터 최적화, 점수/리더보드.
//!
//! 이 crate는 다음 파이프라인을 제공합니다:
//! - 원시 캔들 전처리 (간격/갭 탐지, 보간, 분할, 검증, 중복 제거)
//! - 바이너리 옵션 거래 시뮬레이션 (지연/슬리피지, 자산 곡선)
//! - 그리드/유전/베이지안 파라미터 탐색
//! - 0~100 점수와 등급, 전략 간 상대 순위
//!
//! # 예제
//!
//! ```rust,ignore
//! use trader_analytics::{run_leaderboard, LeaderboardConfig, RunControl};
//! use trader_strategy::StrategyRegistry;
//!
//! let registry = StrategyRegistry::with_builtins();
//! let result = run_leaderboard(&registry, &candles, &LeaderboardConfig::default(), &RunControl::new());
//! println!("{}", result.summary());
//! ```

pub mod backtest;
pub mod leaderboard;
pub mod optimizer;
pub mod progress;
pub mod scoring;

// 주요 타입 재내보내기
pub use backtest::{
    preprocess, BacktestConfig, BacktestEngine, BacktestError, BacktestResult, BacktestTrade,
    BetSizing, DataQuality, GapStrategy, PreprocessOptions, PreprocessResult, TradeOutcome,
};
pub use leaderboard::{
    run_leaderboard, CompositeWeights, LeaderboardConfig, LeaderboardEntry, LeaderboardResult,
    LeaderboardSkip, SkippedStrategy,
};
pub use optimizer::{
    optimize, BayesianConfig, GeneticConfig, Objective, OptimizationEntry, OptimizationReport,
    OptimizeOptions, SearchMethod, SkipReason, SkippedTrial,
};
pub use progress::{ProgressEvent, ProgressStage, RunControl};
pub use scoring::{
    calculate_score, weekly_win_rate_std, Grade, ScoreBreakdown, ScoreInput,
    ScoreResult, ScoreWeights,
};
