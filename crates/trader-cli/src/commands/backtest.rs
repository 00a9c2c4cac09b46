//! 백테스트 명령어.
//!
//! JSON 캔들 파일로 단일 전략을 백테스트합니다.
//!
//! # 사용 예시
//!
//! ```bash
//! # 기본 파라미터로 RSI 반전 전략 백테스트
//! trader backtest --candles data/eurusd_1m.json --strategy rsi
//!
//! # 설정 파일 + 파라미터 덮어쓰기, JSON 출력
//! trader backtest --candles data/eurusd_1m.json -c run.toml -p period=10 -p oversold=25 --json
//! ```

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use trader_analytics::{calculate_score, BacktestEngine, ScoreInput, ScoreWeights};
use trader_strategy::StrategyRegistry;

use super::{emit, load_candles, merge_params, render, resolve_strategy_id, RunConfigFile};

/// 백테스트 CLI 설정
#[derive(Debug, Clone, Default)]
pub struct BacktestCliConfig {
    pub candles_path: PathBuf,
    pub config_path: Option<PathBuf>,
    /// 전략 ID (설정 파일 값보다 우선)
    pub strategy: Option<String>,
    pub params: Vec<(String, f64)>,
    pub payout_percent: Option<f64>,
    pub expiry_seconds: Option<u64>,
    pub json: bool,
    pub output: Option<PathBuf>,
}

/// 백테스트 실행
pub fn run_backtest(cli: BacktestCliConfig) -> Result<()> {
    let registry = StrategyRegistry::with_builtins();
    let file = RunConfigFile::load(cli.config_path.as_deref())?;
    let candles = load_candles(&cli.candles_path)?;

    let mut config = file.backtest;
    if let Some(strategy) = &cli.strategy {
        config.strategy_id = strategy.clone();
    }
    config.strategy_id = resolve_strategy_id(&registry, &config.strategy_id)?;
    config.strategy_params = merge_params(&config.strategy_params, &cli.params);
    if let Some(payout) = cli.payout_percent {
        config.payout_percent = payout;
    }
    if let Some(expiry) = cli.expiry_seconds {
        config.expiry_seconds = expiry;
    }

    info!(
        strategy_id = %config.strategy_id,
        candles = candles.len(),
        payout = config.payout_percent,
        expiry = config.expiry_seconds,
        "백테스트 시작"
    );

    let engine = BacktestEngine::new(&registry);
    let result = engine.run(&config, &candles)?;
    let score = calculate_score(
        &ScoreInput::from_result(&result).with_payout_percent(config.payout_percent),
        &ScoreWeights::default(),
    );

    let text = render(
        &serde_json::json!({ "result": &result, "score": &score }),
        cli.json,
        || format!("{}\n{}", result.summary(), score.summary),
    )?;
    emit(&text, cli.output.as_deref())
}
