//! 전략 리더보드 명령어.
//!
//! # 사용 예시
//!
//! ```bash
//! trader leaderboard --candles data/eurusd_1m.json --min-trades 20
//! trader leaderboard --candles data/eurusd_1m.json -c run.toml --json -o board.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use trader_analytics::{run_leaderboard, RunControl};
use trader_strategy::StrategyRegistry;

use super::{emit, load_candles, render, spawn_progress_logger, RunConfigFile};

/// 리더보드 CLI 설정
#[derive(Debug, Clone, Default)]
pub struct LeaderboardCliConfig {
    pub candles_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub min_trades: Option<usize>,
    pub min_win_rate: Option<f64>,
    pub payout_percent: Option<f64>,
    pub json: bool,
    pub output: Option<PathBuf>,
}

/// 리더보드 실행
pub async fn run_leaderboard_command(
    cli: LeaderboardCliConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    let registry = StrategyRegistry::with_builtins();
    let file = RunConfigFile::load(cli.config_path.as_deref())?;
    let candles = load_candles(&cli.candles_path)?;

    let mut config = file.leaderboard;
    if let Some(min_trades) = cli.min_trades {
        config.min_trades = min_trades;
    }
    if let Some(min_win_rate) = cli.min_win_rate {
        config.min_win_rate = min_win_rate;
    }
    if let Some(payout) = cli.payout_percent {
        config.template.payout_percent = payout;
    }

    let (control, receiver) = RunControl::with_channel();
    let control = control.with_cancellation(shutdown);
    let logger = spawn_progress_logger(receiver);

    let result = tokio::task::spawn_blocking(move || {
        run_leaderboard(&registry, &candles, &config, &control)
    })
    .await
    .context("리더보드 작업이 비정상 종료됨")?;
    let _ = logger.await;

    if result.cancelled {
        warn!("리더보드가 취소됨, 부분 결과 출력");
    }
    info!(
        ranked = result.entries.len(),
        filtered_out = result.filtered_out,
        "리더보드 완료"
    );

    let text = render(&result, cli.json, || result.summary())?;
    emit(&text, cli.output.as_deref())
}
