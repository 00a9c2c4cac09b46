//! CLI 명령어 구현.

pub mod backtest;
pub mod leaderboard;
pub mod optimize;
pub mod strategies;

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::info;
use trader_analytics::optimizer::grid;
use trader_analytics::{
    BacktestConfig, LeaderboardConfig, Objective, OptimizeOptions, ProgressEvent, ProgressStage,
    SearchMethod,
};
use trader_core::{Candle, ParamMap, ParamRange, ParamRanges};
use trader_strategy::{BuiltinStrategy, StrategyRegistry};

// =============================================================================
// 실행 설정 파일
// =============================================================================

/// `[optimize]` 테이블: 탐색 옵션 + 파라미터 범위
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizeSection {
    #[serde(flatten)]
    pub options: OptimizeOptions,

    /// 파라미터 범위 (없으면 전략 권장 범위)
    #[serde(default)]
    pub ranges: ParamRanges,
}

/// 실행 설정 파일 (TOML)
///
/// ```toml
/// [backtest]
/// strategy_id = "rsi_reversal"
/// payout_percent = 92
/// bet_sizing = { type = "percentage", percent = 2 }
///
/// [optimize]
/// method = "genetic"
/// objective = "net_profit"
///
/// [optimize.ranges.period]
/// min = 7
/// max = 21
/// step = 7
///
/// [leaderboard]
/// min_trades = 20
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfigFile {
    #[serde(default)]
    pub backtest: BacktestConfig,

    #[serde(default)]
    pub optimize: OptimizeSection,

    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
}

impl RunConfigFile {
    /// 파일에서 로드 (경로가 없으면 기본값)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("설정 파일을 읽을 수 없음: {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("설정 파일 파싱 실패: {}", path.display()))?;
        info!(path = %path.display(), "실행 설정 로드");
        Ok(config)
    }
}

// =============================================================================
// 입출력 헬퍼
// =============================================================================

/// JSON 배열 캔들 파일 로드
pub fn load_candles(path: &Path) -> Result<Vec<Candle>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("캔들 파일을 읽을 수 없음: {}", path.display()))?;
    let candles: Vec<Candle> = serde_json::from_str(&text)
        .with_context(|| format!("캔들 JSON 파싱 실패: {}", path.display()))?;
    info!(path = %path.display(), count = candles.len(), "캔들 로드 완료");
    Ok(candles)
}

/// 결과를 stdout 또는 파일로 출력
pub fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("결과 저장 실패: {}", path.display()))?;
            info!(path = %path.display(), "결과 저장 완료");
        }
        None => println!("{}", text),
    }
    Ok(())
}

/// 직렬화 가능한 결과를 JSON 또는 요약 텍스트로 변환
pub fn render<T: Serialize>(value: &T, json: bool, summary: impl FnOnce() -> String) -> Result<String> {
    if json {
        serde_json::to_string_pretty(value).context("결과 JSON 직렬화 실패")
    } else {
        Ok(summary())
    }
}

/// 진행률 이벤트를 10% 단위로 로그에 남기는 태스크.
///
/// 송신 측이 모두 drop되면 종료됩니다.
pub fn spawn_progress_logger(mut receiver: UnboundedReceiver<ProgressEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last: Option<(ProgressStage, u64)> = None;
        while let Some(event) = receiver.recv().await {
            let bucket = progress_bucket(&event);
            if last != Some((event.stage, bucket)) {
                info!(
                    stage = %event.stage,
                    completed = event.completed,
                    total = event.total,
                    "진행률 {}%",
                    bucket * 10
                );
                last = Some((event.stage, bucket));
            }
        }
    })
}

/// 완료율을 10% 구간 번호(0~10)로 변환
fn progress_bucket(event: &ProgressEvent) -> u64 {
    (event.percent() / 10.0).floor().clamp(0.0, 10.0) as u64
}

// =============================================================================
// 인자 파싱
// =============================================================================

/// 전략 ID 해석 (내장 전략 별칭 허용)
pub fn resolve_strategy_id(registry: &StrategyRegistry, requested: &str) -> Result<String> {
    if registry.contains(requested) {
        return Ok(requested.to_string());
    }
    if let Some(builtin) = BuiltinStrategy::parse(requested) {
        return Ok(builtin.id().to_string());
    }
    Err(anyhow!(
        "알 수 없는 전략: {} (사용 가능: {})",
        requested,
        registry.ids().join(", ")
    ))
}

/// `name=value` 파라미터 파싱
pub fn parse_param(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("'name=value' 형식이어야 합니다: {}", s))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("숫자가 아닌 파라미터 값: {}", s))?;
    Ok((name.trim().to_string(), value))
}

/// `name=min:max:step` 범위 파싱
pub fn parse_range(s: &str) -> Result<(String, ParamRange), String> {
    let (name, bounds) = s
        .split_once('=')
        .ok_or_else(|| format!("'name=min:max:step' 형식이어야 합니다: {}", s))?;
    let parts: Vec<f64> = bounds
        .split(':')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("숫자가 아닌 범위 값: {}", s))?;
    match parts.as_slice() {
        [min, max, step] => Ok((name.trim().to_string(), ParamRange::new(*min, *max, *step))),
        [value] => Ok((name.trim().to_string(), ParamRange::fixed(*value))),
        _ => Err(format!("'name=min:max:step' 형식이어야 합니다: {}", s)),
    }
}

/// 탐색 방식 파싱
pub fn parse_method(s: &str) -> Result<SearchMethod, String> {
    match s.to_lowercase().as_str() {
        "grid" => Ok(SearchMethod::Grid),
        "genetic" | "ga" => Ok(SearchMethod::Genetic),
        "bayesian" | "bayes" => Ok(SearchMethod::Bayesian),
        _ => Err(format!("Invalid method: {}. Supported: grid, genetic, bayesian", s)),
    }
}

/// 목적 함수 파싱
pub fn parse_objective(s: &str) -> Result<Objective, String> {
    match s.to_lowercase().replace('-', "_").as_str() {
        "net_profit" | "profit" => Ok(Objective::NetProfit),
        "win_rate" => Ok(Objective::WinRate),
        "profit_factor" | "pf" => Ok(Objective::ProfitFactor),
        "expectancy" => Ok(Objective::Expectancy),
        _ => Err(format!(
            "Invalid objective: {}. Supported: net_profit, win_rate, profit_factor, expectancy",
            s
        )),
    }
}

/// 명령행 파라미터를 설정 파라미터 위에 덮어씁니다.
pub fn merge_params(base: &ParamMap, overrides: &[(String, f64)]) -> ParamMap {
    let mut params = base.clone();
    params.extend(overrides.iter().cloned());
    params
}

/// 범위 검증 (min <= max, step > 0, 그리드 탐색이면 조합 수 한도)
pub fn validate_ranges(ranges: &ParamRanges, method: SearchMethod) -> Result<()> {
    for (name, range) in ranges {
        if !(range.min <= range.max) {
            bail!("파라미터 범위 오류 ({}): min > max", name);
        }
        if !(range.step > 0.0) {
            bail!("파라미터 범위 오류 ({}): step은 0보다 커야 합니다", name);
        }
    }
    if method == SearchMethod::Grid && !grid::is_within_limit(ranges) {
        bail!(
            "그리드 조합 수가 너무 많습니다 (한도 {}): step을 늘리거나 genetic/bayesian 탐색을 사용하세요",
            grid::MAX_GRID_COMBINATIONS
        );
    }
    Ok(())
}
