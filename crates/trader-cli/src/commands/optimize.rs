//! 파라미터 최적화 명령어.
//!
//! # 사용 예시
//!
//! ```bash
//! # 전략 권장 범위로 그리드 탐색
//! trader optimize --candles data/eurusd_1m.json --strategy sma
//!
//! # 범위 지정 + 유전 알고리즘 + 시드 고정
//! trader optimize --candles data/eurusd_1m.json --strategy rsi \
//!     --method genetic -r period=7:21:1 -r oversold=20:35:5 --seed 42 --top 5
//! ```
//!
//! 실행 중 Ctrl-C를 누르면 남은 시도를 취소하고 지금까지의 결과를 출력합니다.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use trader_analytics::{
    optimize, BacktestEngine, Objective, OptimizationReport, RunControl, SearchMethod,
};
use trader_core::{format_params, ParamRange, ParamRanges};
use trader_strategy::StrategyRegistry;

use super::{
    emit, load_candles, merge_params, render, resolve_strategy_id, spawn_progress_logger,
    validate_ranges, RunConfigFile,
};

/// 최적화 CLI 설정
#[derive(Debug, Clone, Default)]
pub struct OptimizeCliConfig {
    pub candles_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub strategy: Option<String>,
    pub method: Option<SearchMethod>,
    pub objective: Option<Objective>,
    pub params: Vec<(String, f64)>,
    pub ranges: Vec<(String, ParamRange)>,
    pub seed: Option<u64>,
    pub min_trades: Option<usize>,
    /// 출력할 상위 항목 수
    pub top: usize,
    pub json: bool,
    pub output: Option<PathBuf>,
}

/// 최적화 실행
pub async fn run_optimize(cli: OptimizeCliConfig, shutdown: CancellationToken) -> Result<()> {
    let registry = StrategyRegistry::with_builtins();
    let file = RunConfigFile::load(cli.config_path.as_deref())?;
    let candles = load_candles(&cli.candles_path)?;

    let mut base_config = file.backtest;
    if let Some(strategy) = &cli.strategy {
        base_config.strategy_id = strategy.clone();
    }
    base_config.strategy_id = resolve_strategy_id(&registry, &base_config.strategy_id)?;
    base_config.strategy_params = merge_params(&base_config.strategy_params, &cli.params);

    let mut options = file.optimize.options;
    if let Some(method) = cli.method {
        options.method = method;
    }
    if let Some(objective) = cli.objective {
        options.objective = objective;
    }
    if let Some(seed) = cli.seed {
        options.seed = Some(seed);
    }
    if let Some(min_trades) = cli.min_trades {
        options.min_trades = min_trades;
    }

    // 범위 우선순위: 명령행 > 설정 파일 > 전략 권장 범위
    let ranges: ParamRanges = if !cli.ranges.is_empty() {
        cli.ranges.iter().cloned().collect()
    } else if !file.optimize.ranges.is_empty() {
        file.optimize.ranges
    } else {
        registry
            .get(&base_config.strategy_id)
            .map(|strategy| strategy.param_ranges())
            .unwrap_or_default()
    };
    validate_ranges(&ranges, options.method)?;

    if ranges.is_empty() {
        warn!(strategy_id = %base_config.strategy_id, "탐색할 파라미터 범위가 없어 기본 파라미터로 1회 실행");
    }

    let (control, receiver) = RunControl::with_channel();
    let control = control.with_cancellation(shutdown);
    let logger = spawn_progress_logger(receiver);

    let report = tokio::task::spawn_blocking(move || {
        let engine = BacktestEngine::new(&registry);
        optimize(
            &engine,
            &base_config,
            &candles,
            &ranges,
            &options,
            &control,
        )
    })
    .await
    .context("최적화 작업이 비정상 종료됨")?;

    // 송신 측이 작업과 함께 drop되었으므로 로거는 곧 종료됨
    let _ = logger.await;

    if report.cancelled {
        warn!(evaluated = report.evaluated, "최적화가 취소됨, 부분 결과 출력");
    }
    info!(
        best = report.best().map(|e| format_params(&e.params)),
        "최적화 결과"
    );

    let text = render(&trimmed(&report, cli.top), cli.json, || {
        summary_with_top(&report, cli.top)
    })?;
    emit(&text, cli.output.as_deref())
}

/// 상위 n개만 남긴 리포트 (JSON 출력용)
fn trimmed(report: &OptimizationReport, top: usize) -> OptimizationReport {
    let mut trimmed = report.clone();
    if top > 0 {
        trimmed.entries.truncate(top);
    }
    trimmed
}

fn summary_with_top(report: &OptimizationReport, top: usize) -> String {
    let mut lines = vec![report.summary()];
    let shown = if top == 0 { report.entries.len() } else { top };
    for (i, entry) in report.top(shown).iter().enumerate() {
        lines.push(format!(
            "{:>3}. {:<40} 점수 {:>10.4}  거래 {:>4}  승률 {:>5.1}%  순손익 {:>9.2}",
            i + 1,
            format_params(&entry.params),
            entry.score,
            entry.result.total_trades,
            entry.result.win_rate,
            entry.result.net_profit,
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use trader_analytics::{BacktestResult, OptimizationEntry};
    use trader_core::ParamMap;

    fn report_with(n: usize) -> OptimizationReport {
        let entries = (0..n)
            .map(|i| OptimizationEntry {
                params: ParamMap::from([("period".to_string(), i as f64)]),
                result: BacktestResult::default(),
                score: (n - i) as f64,
                iteration: None,
                generation: None,
            })
            .collect();
        OptimizationReport {
            strategy_id: "rsi_reversal".to_string(),
            method: SearchMethod::Grid,
            objective: Objective::NetProfit,
            seed: None,
            entries,
            evaluated: n,
            succeeded: n,
            skipped: Vec::new(),
            cancelled: false,
        }
    }

    #[test]
    fn test_trimmed_keeps_top_entries() {
        let report = report_with(5);
        assert_eq!(trimmed(&report, 2).entries.len(), 2);
        assert_eq!(trimmed(&report, 0).entries.len(), 5);
        assert_eq!(trimmed(&report, 10).entries.len(), 5);
    }

    #[test]
    fn test_summary_lists_ranked_params() {
        let text = summary_with_top(&report_with(3), 2);
        assert!(text.contains("  1. period=0"));
        assert!(text.contains("  2. period=1"));
        assert!(!text.contains("  3. period=2"));
    }
}
