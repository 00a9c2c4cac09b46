//! 전략 파라미터 최적화.
//!
//! 같은 캔들 데이터에 대해 파라미터 조합을 반복 실행하고 목적 함수 기준으로 정렬합니다.
//!
//! # 탐색 방식
//!
//! - [`SearchMethod::Grid`]: 모든 조합 전수 탐색 (rayon 병렬)
//! - [`SearchMethod::Genetic`]: 토너먼트 선택 + 균등 교차 + 유전자 변이 + 엘리트 보존
//! - [`SearchMethod::Bayesian`]: 커널 대리 모델 위의 UCB 획득 함수로 순차 탐색
//!
//! 개별 시도의 실패는 전체 탐색을 중단시키지 않으며 [`SkippedTrial`]로 기록됩니다.

pub mod bayesian;
pub mod genetic;
pub mod grid;

pub use bayesian::BayesianConfig;
pub use genetic::GeneticConfig;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use trader_core::{format_params, Candle, ParamMap, ParamRanges};

use crate::backtest::{BacktestConfig, BacktestEngine, BacktestResult};
use crate::progress::RunControl;

// =============================================================================
// 옵션
// =============================================================================

/// 탐색 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    #[default]
    Grid,
    Genetic,
    Bayesian,
}

impl std::fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMethod::Grid => write!(f, "grid"),
            SearchMethod::Genetic => write!(f, "genetic"),
            SearchMethod::Bayesian => write!(f, "bayesian"),
        }
    }
}

/// 최적화 목적 함수 (클수록 좋음)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    NetProfit,
    WinRate,
    ProfitFactor,
    Expectancy,
}

impl Objective {
    /// 결과에서 목적 값 추출
    pub fn value(&self, result: &BacktestResult) -> f64 {
        match self {
            Objective::NetProfit => result.net_profit,
            Objective::WinRate => result.win_rate,
            Objective::ProfitFactor => result.profit_factor,
            Objective::Expectancy => result.expectancy,
        }
    }
}

impl std::fmt::Display for Objective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Objective::NetProfit => write!(f, "net_profit"),
            Objective::WinRate => write!(f, "win_rate"),
            Objective::ProfitFactor => write!(f, "profit_factor"),
            Objective::Expectancy => write!(f, "expectancy"),
        }
    }
}

/// 최적화 옵션
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeOptions {
    #[serde(default)]
    pub method: SearchMethod,

    #[serde(default)]
    pub objective: Objective,

    /// 이 거래 수 미만인 시도는 제외
    #[serde(default = "default_min_trades")]
    pub min_trades: usize,

    /// 난수 시드 (없으면 무작위)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(default)]
    pub genetic: GeneticConfig,

    #[serde(default)]
    pub bayesian: BayesianConfig,
}

fn default_min_trades() -> usize {
    5
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            method: SearchMethod::default(),
            objective: Objective::default(),
            min_trades: default_min_trades(),
            seed: None,
            genetic: GeneticConfig::default(),
            bayesian: BayesianConfig::default(),
        }
    }
}

impl OptimizeOptions {
    pub fn with_method(mut self, method: SearchMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_min_trades(mut self, min_trades: usize) -> Self {
        self.min_trades = min_trades;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_genetic(mut self, config: GeneticConfig) -> Self {
        self.genetic = config;
        self
    }

    pub fn with_bayesian(mut self, config: BayesianConfig) -> Self {
        self.bayesian = config;
        self
    }

    /// 시드 결정 (미지정 시 무작위)
    pub(crate) fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }
}

// =============================================================================
// 결과
// =============================================================================

/// 성공한 시도
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationEntry {
    /// 실제 사용된 전체 파라미터
    pub params: ParamMap,
    pub result: BacktestResult,
    /// 목적 함수 값
    #[serde(with = "trader_core::serde_helpers::float")]
    pub score: f64,
    /// 베이지안 반복 번호 (0부터)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<usize>,
    /// 유전 알고리즘 세대 번호 (0부터)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<usize>,
}

/// 시도 제외 사유
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// 백테스트 실패
    #[error("백테스트 실패: {0}")]
    Backtest(String),

    /// 최소 거래 수 미달
    #[error("거래 수 부족: {trades} < {required}")]
    BelowMinTrades { trades: usize, required: usize },

    /// 취소됨
    #[error("취소됨")]
    Cancelled,
}

/// 제외된 시도
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedTrial {
    pub params: ParamMap,
    pub reason: SkipReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<usize>,
}

/// 최적화 리포트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub strategy_id: String,
    pub method: SearchMethod,
    pub objective: Objective,
    /// 실제 사용된 시드
    pub seed: Option<u64>,
    /// 목적 값 내림차순
    pub entries: Vec<OptimizationEntry>,
    /// 시도 수 (제외 포함)
    pub evaluated: usize,
    /// 성공한 시도 수
    pub succeeded: usize,
    pub skipped: Vec<SkippedTrial>,
    /// 취소 여부
    pub cancelled: bool,
}

impl OptimizationReport {
    /// 최고 시도
    pub fn best(&self) -> Option<&OptimizationEntry> {
        self.entries.first()
    }

    /// 상위 n개
    pub fn top(&self, n: usize) -> &[OptimizationEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// 요약 문자열 반환
    pub fn summary(&self) -> String {
        let best = self
            .best()
            .map(|e| format!("{} → {}={:.4}", format_params(&e.params), self.objective, e.score))
            .unwrap_or_else(|| "-".to_string());
        format!(
            "최적화 결과 요약\n\
             ═══════════════════════════════════════\n\
             전략: {}\n\
             방식: {} / 목적: {}\n\
             시도: {} (성공 {}, 제외 {}){}\n\
             최고: {}\n\
             ═══════════════════════════════════════",
            self.strategy_id,
            self.method,
            self.objective,
            self.evaluated,
            self.succeeded,
            self.skipped.len(),
            if self.cancelled { " [취소됨]" } else { "" },
            best,
        )
    }
}

// =============================================================================
// 실행
// =============================================================================

/// 파라미터 최적화 실행.
///
/// 탐색 중 개별 시도 실패는 `skipped`에 기록되며 오류를 반환하지 않습니다.
pub fn optimize(
    engine: &BacktestEngine<'_>,
    base_config: &BacktestConfig,
    candles: &[Candle],
    ranges: &ParamRanges,
    options: &OptimizeOptions,
    control: &RunControl,
) -> OptimizationReport {
    let seed = options.resolve_seed();
    info!(
        strategy_id = %base_config.strategy_id,
        method = %options.method,
        objective = %options.objective,
        params = ranges.len(),
        seed,
        "파라미터 최적화 시작"
    );

    let runner = TrialRunner {
        engine,
        base_config,
        candles,
        options,
    };
    let trials = match options.method {
        SearchMethod::Grid => grid::search(&runner, ranges, control),
        SearchMethod::Genetic => genetic::search(&runner, ranges, &options.genetic, seed, control),
        SearchMethod::Bayesian => {
            bayesian::search(&runner, ranges, &options.bayesian, seed, control)
        }
    };

    let seed = (options.method != SearchMethod::Grid).then_some(seed);
    let report = collect_report(base_config, options, seed, trials, control);
    info!(
        evaluated = report.evaluated,
        succeeded = report.succeeded,
        skipped = report.skipped.len(),
        cancelled = report.cancelled,
        best = report.best().map(|e| e.score),
        "파라미터 최적화 완료"
    );
    report
}

/// 단일 시도 기록
pub(crate) struct Trial {
    pub params: ParamMap,
    pub iteration: Option<usize>,
    pub generation: Option<usize>,
    pub outcome: Result<BacktestResult, SkipReason>,
}

impl Trial {
    /// 탐색기가 쓰는 적합도 (실패는 -inf)
    pub fn fitness(&self, objective: Objective) -> f64 {
        match &self.outcome {
            Ok(result) => objective.value(result),
            Err(_) => f64::NEG_INFINITY,
        }
    }
}

/// 기본 설정 + 후보 파라미터로 백테스트를 실행하는 공용 실행기
pub(crate) struct TrialRunner<'a> {
    pub engine: &'a BacktestEngine<'a>,
    pub base_config: &'a BacktestConfig,
    pub candles: &'a [Candle],
    pub options: &'a OptimizeOptions,
}

impl TrialRunner<'_> {
    /// 후보 파라미터를 기본 파라미터 위에 덮어써 한 번 실행
    pub fn run_trial(
        &self,
        candidate: &ParamMap,
        iteration: Option<usize>,
        generation: Option<usize>,
        control: &RunControl,
    ) -> Trial {
        let mut params = self.base_config.strategy_params.clone();
        params.extend(candidate.iter().map(|(k, v)| (k.clone(), *v)));

        let outcome = if control.is_cancelled() {
            Err(SkipReason::Cancelled)
        } else {
            self.evaluate(&params)
        };

        match &outcome {
            Ok(result) => debug!(
                params = %format_params(&params),
                trades = result.total_trades,
                score = self.options.objective.value(result),
                "최적화 시도 완료"
            ),
            Err(reason) => debug!(params = %format_params(&params), %reason, "최적화 시도 제외"),
        }

        Trial {
            params,
            iteration,
            generation,
            outcome,
        }
    }

    fn evaluate(&self, params: &ParamMap) -> Result<BacktestResult, SkipReason> {
        let config = self.base_config.clone().with_params(params.clone());
        let result = self
            .engine
            .run(&config, self.candles)
            .map_err(|e| SkipReason::Backtest(e.to_string()))?;
        if result.total_trades < self.options.min_trades {
            return Err(SkipReason::BelowMinTrades {
                trades: result.total_trades,
                required: self.options.min_trades,
            });
        }
        Ok(result)
    }

    pub fn objective(&self) -> Objective {
        self.options.objective
    }
}

fn collect_report(
    base_config: &BacktestConfig,
    options: &OptimizeOptions,
    seed: Option<u64>,
    trials: Vec<Trial>,
    control: &RunControl,
) -> OptimizationReport {
    let evaluated = trials.len();
    let mut entries = Vec::new();
    let mut skipped = Vec::new();

    for trial in trials {
        match trial.outcome {
            Ok(result) => entries.push(OptimizationEntry {
                score: options.objective.value(&result),
                params: trial.params,
                result,
                iteration: trial.iteration,
                generation: trial.generation,
            }),
            Err(reason) => skipped.push(SkippedTrial {
                params: trial.params,
                reason,
                iteration: trial.iteration,
                generation: trial.generation,
            }),
        }
    }

    // 안정 정렬: 동점이면 탐색 순서 유지
    entries.sort_by(|a, b| b.score.total_cmp(&a.score));

    let cancelled =
        control.is_cancelled() || skipped.iter().any(|s| s.reason == SkipReason::Cancelled);

    OptimizationReport {
        strategy_id: base_config.strategy_id.clone(),
        method: options.method,
        objective: options.objective,
        seed,
        succeeded: entries.len(),
        entries,
        evaluated,
        skipped,
        cancelled,
    }
}
