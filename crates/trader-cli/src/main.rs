//! 바이너리 옵션 전략 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 내장 전략 목록
//! trader strategies
//!
//! # 단일 백테스트
//! trader backtest --candles data/eurusd_1m.json -s rsi -p period=10
//!
//! # 파라미터 최적화 (유전 알고리즘)
//! trader optimize --candles data/eurusd_1m.json -s sma --method genetic --seed 7
//!
//! # 전체 전략 리더보드
//! trader leaderboard --candles data/eurusd_1m.json --min-trades 20
//! ```
//!
//! 로그 레벨은 `RUST_LOG` 환경변수로 조정합니다 (기본 `info`).

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use trader_analytics::{Objective, SearchMethod};
use trader_core::ParamRange;

mod commands;

use commands::{
    backtest::{run_backtest, BacktestCliConfig},
    leaderboard::{run_leaderboard_command, LeaderboardCliConfig},
    optimize::{run_optimize, OptimizeCliConfig},
    parse_method, parse_objective, parse_param, parse_range,
    strategies::run_strategies,
};

#[derive(Parser)]
#[command(name = "trader")]
#[command(about = "Binary option strategy CLI - 백테스트, 최적화, 리더보드", long_about = None)]
#[command(version)]
struct Cli {
    /// 로그를 JSON 형식으로 출력
    #[arg(long, global = true, default_value = "false")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 단일 전략 백테스트
    Backtest {
        /// 캔들 JSON 파일 경로
        #[arg(long)]
        candles: PathBuf,

        /// 실행 설정 파일 (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// 전략 ID 또는 별칭 (rsi, sma, bb)
        #[arg(short, long)]
        strategy: Option<String>,

        /// 파라미터 덮어쓰기 (name=value, 반복 가능)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, f64)>,

        /// 페이아웃 (%)
        #[arg(long)]
        payout: Option<f64>,

        /// 만기 (초)
        #[arg(long)]
        expiry: Option<u64>,

        /// JSON으로 출력
        #[arg(long, default_value = "false")]
        json: bool,

        /// 출력 파일 경로 (지정하지 않으면 stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 전략 파라미터 최적화
    Optimize {
        /// 캔들 JSON 파일 경로
        #[arg(long)]
        candles: PathBuf,

        /// 실행 설정 파일 (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// 전략 ID 또는 별칭
        #[arg(short, long)]
        strategy: Option<String>,

        /// 고정 파라미터 (name=value, 반복 가능)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, f64)>,

        /// 탐색 범위 (name=min:max:step, 반복 가능)
        #[arg(short, long = "range", value_parser = parse_range)]
        ranges: Vec<(String, ParamRange)>,

        /// 탐색 방식 (grid, genetic, bayesian)
        #[arg(short, long, value_parser = parse_method)]
        method: Option<SearchMethod>,

        /// 목적 함수 (net_profit, win_rate, profit_factor, expectancy)
        #[arg(long, value_parser = parse_objective)]
        objective: Option<Objective>,

        /// 난수 시드
        #[arg(long)]
        seed: Option<u64>,

        /// 최소 거래 수
        #[arg(long)]
        min_trades: Option<usize>,

        /// 출력할 상위 결과 수 (0 = 전체)
        #[arg(long, default_value = "10")]
        top: usize,

        /// JSON으로 출력
        #[arg(long, default_value = "false")]
        json: bool,

        /// 출력 파일 경로
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 등록된 모든 전략의 순위 산출
    Leaderboard {
        /// 캔들 JSON 파일 경로
        #[arg(long)]
        candles: PathBuf,

        /// 실행 설정 파일 (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// 최소 거래 수
        #[arg(long)]
        min_trades: Option<usize>,

        /// 최소 승률 (%)
        #[arg(long)]
        min_win_rate: Option<f64>,

        /// 페이아웃 (%)
        #[arg(long)]
        payout: Option<f64>,

        /// JSON으로 출력
        #[arg(long, default_value = "false")]
        json: bool,

        /// 출력 파일 경로
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 사용 가능한 전략 목록
    Strategies {
        /// JSON으로 출력
        #[arg(long, default_value = "false")]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let outcome = match cli.command {
        Commands::Backtest {
            candles,
            config,
            strategy,
            params,
            payout,
            expiry,
            json,
            output,
        } => run_backtest(BacktestCliConfig {
            candles_path: candles,
            config_path: config,
            strategy,
            params,
            payout_percent: payout,
            expiry_seconds: expiry,
            json,
            output,
        }),

        Commands::Optimize {
            candles,
            config,
            strategy,
            params,
            ranges,
            method,
            objective,
            seed,
            min_trades,
            top,
            json,
            output,
        } => {
            run_optimize(
                OptimizeCliConfig {
                    candles_path: candles,
                    config_path: config,
                    strategy,
                    method,
                    objective,
                    params,
                    ranges,
                    seed,
                    min_trades,
                    top,
                    json,
                    output,
                },
                shutdown.clone(),
            )
            .await
        }

        Commands::Leaderboard {
            candles,
            config,
            min_trades,
            min_win_rate,
            payout,
            json,
            output,
        } => {
            run_leaderboard_command(
                LeaderboardCliConfig {
                    candles_path: candles,
                    config_path: config,
                    min_trades,
                    min_win_rate,
                    payout_percent: payout,
                    json,
                    output,
                },
                shutdown.clone(),
            )
            .await
        }

        Commands::Strategies { json } => run_strategies(json),
    };

    if let Err(e) = &outcome {
        error!("명령 실행 실패: {:#}", e);
    }
    outcome
}

/// 트레이싱 초기화 (stderr 출력, stdout은 결과 전용)
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Ctrl+C / SIGTERM 수신 시 실행 중인 작업에 취소 전파
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl+C 핸들러 설치 실패: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("SIGTERM 핸들러 설치 실패: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Ctrl+C 수신, 남은 작업을 취소합니다...");
        }
        _ = terminate => {
            warn!("SIGTERM 수신, 남은 작업을 취소합니다...");
        }
    }

    shutdown_token.cancel();
    info!("취소 신호 전파 완료");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_optimize_args() {
        let cli = Cli::try_parse_from([
            "trader",
            "optimize",
            "--candles",
            "candles.json",
            "-s",
            "rsi",
            "-r",
            "period=7:21:7",
            "-m",
            "genetic",
            "--seed",
            "42",
        ])
        .unwrap();

        match cli.command {
            Commands::Optimize {
                strategy,
                ranges,
                method,
                seed,
                top,
                ..
            } => {
                assert_eq!(strategy.as_deref(), Some("rsi"));
                assert_eq!(ranges.len(), 1);
                assert_eq!(ranges[0].1.len(), 3);
                assert_eq!(method, Some(SearchMethod::Genetic));
                assert_eq!(seed, Some(42));
                assert_eq!(top, 10);
            }
            _ => panic!("optimize 명령이어야 함"),
        }
    }

    #[test]
    fn test_parse_backtest_params() {
        let cli = Cli::try_parse_from([
            "trader",
            "backtest",
            "--candles",
            "c.json",
            "-p",
            "period=10",
            "-p",
            "oversold=25",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Backtest { params, json, .. } => {
                assert_eq!(params.len(), 2);
                assert!(json);
            }
            _ => panic!("backtest 명령이어야 함"),
        }
    }

    #[test]
    fn test_invalid_range_rejected() {
        let result = Cli::try_parse_from([
            "trader", "optimize", "--candles", "c.json", "-r", "period=7:21",
        ]);
        assert!(result.is_err());
    }
}
