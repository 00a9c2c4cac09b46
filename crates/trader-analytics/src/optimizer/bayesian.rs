//! 베이지안 스타일 순차 탐색.
//!
//! 처음 `initial_samples`번은 균등 무작위로 탐색하고, 이후에는 관측값으로 만든
//! 커널 대리 모델 위에서 UCB 획득 함수가 가장 큰 후보를 고릅니다.
//!
//! - 파라미터 공간은 각 범위를 `[0, 1]`로 정규화해 다룹니다.
//! - 대리 평균: 가우시안 커널 가중 평균 (Nadaraya-Watson). 관측 평균 쪽으로 수축시킵니다.
//! - 불확실성: `1 / sqrt(1 + Σkernel)` (근처 관측이 적을수록 큼)
//! - 획득 함수: `mean + exploration_weight * spread * uncertainty`
//!
//! 후보 풀의 절반은 균등 샘플, 나머지는 상위 관측점 주변의 가우시안 섭동입니다.

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;
use trader_core::{ParamMap, ParamRange, ParamRanges};

use super::{Trial, TrialRunner};
use crate::progress::{ProgressStage, RunControl};

/// 커널 폭 (정규화 공간)
const KERNEL_BANDWIDTH: f64 = 0.15;

/// 관측 평균으로의 수축 강도
const PRIOR_WEIGHT: f64 = 1.0;

/// 섭동 후보의 표준편차 (정규화 공간)
const PERTURBATION_STD: f64 = 0.1;

/// 섭동 중심으로 쓰는 상위 관측 수
const TOP_OBSERVATIONS: usize = 3;

/// 대리 모델에 넣는 목적 값 상한 (무한대 프로핏 팩터 등)
const OBJECTIVE_CAP: f64 = 1e6;

/// 베이지안 탐색 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BayesianConfig {
    /// 무작위 초기 탐색 횟수
    #[serde(default = "default_initial_samples")]
    pub initial_samples: usize,
    /// 전체 평가 횟수 (초기 탐색 포함)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// 탐험 가중치 (클수록 미탐색 영역 선호)
    #[serde(default = "default_exploration_weight")]
    pub exploration_weight: f64,
    /// 반복마다 평가하는 후보 수
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: usize,
}

fn default_initial_samples() -> usize {
    8
}
fn default_max_iterations() -> usize {
    30
}
fn default_exploration_weight() -> f64 {
    1.0
}
fn default_candidate_pool() -> usize {
    64
}

impl Default for BayesianConfig {
    fn default() -> Self {
        Self {
            initial_samples: default_initial_samples(),
            max_iterations: default_max_iterations(),
            exploration_weight: default_exploration_weight(),
            candidate_pool: default_candidate_pool(),
        }
    }
}

impl BayesianConfig {
    pub fn with_iterations(mut self, initial_samples: usize, max_iterations: usize) -> Self {
        self.initial_samples = initial_samples;
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_exploration_weight(mut self, weight: f64) -> Self {
        self.exploration_weight = weight;
        self
    }
}

/// 정규화 공간의 관측점
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub point: Vec<f64>,
    pub value: f64,
}

pub(crate) fn search(
    runner: &TrialRunner<'_>,
    ranges: &ParamRanges,
    config: &BayesianConfig,
    seed: u64,
    control: &RunControl,
) -> Vec<Trial> {
    let names: Vec<&String> = ranges.keys().collect();
    let dims: Vec<ParamRange> = ranges.values().copied().collect();
    let mut rng = StdRng::seed_from_u64(seed);

    if dims.is_empty() {
        let trial = runner.run_trial(&ParamMap::new(), Some(0), None, control);
        control.report(ProgressStage::Bayesian, 1, 1);
        return vec![trial];
    }

    let total = config.max_iterations.max(1);
    let mut observations: Vec<Observation> = Vec::new();
    let mut trials = Vec::with_capacity(total);

    for iteration in 0..total {
        let point = if iteration < config.initial_samples || observations.len() < 2 {
            uniform_point(&dims, &mut rng)
        } else {
            propose(&observations, &dims, config, &mut rng)
        };
        let params: ParamMap = names
            .iter()
            .zip(dims.iter().zip(&point))
            .map(|(name, (range, unit))| ((*name).clone(), range.denormalize(*unit)))
            .collect();

        let trial = runner.run_trial(&params, Some(iteration), None, control);
        if let Ok(result) = &trial.outcome {
            let value = runner.objective().value(result);
            observations.push(Observation {
                point,
                value: value.clamp(-OBJECTIVE_CAP, OBJECTIVE_CAP),
            });
        }
        let cancelled = matches!(trial.outcome, Err(super::SkipReason::Cancelled));
        trials.push(trial);
        control.report(ProgressStage::Bayesian, iteration + 1, total);

        if cancelled {
            break;
        }
    }

    debug!(
        iterations = trials.len(),
        observations = observations.len(),
        "베이지안 탐색 종료"
    );
    trials
}

/// 그리드에 맞춘 균등 무작위 점
fn uniform_point(dims: &[ParamRange], rng: &mut StdRng) -> Vec<f64> {
    dims.iter()
        .map(|range| snap_unit(range, rng.gen::<f64>()))
        .collect()
}

fn snap_unit(range: &ParamRange, unit: f64) -> f64 {
    range.normalize(range.denormalize(unit))
}

/// 다음 평가점 제안 (정규화 공간).
///
/// 관측이 없으면 균등 무작위 점을 반환합니다.
pub fn propose(
    observations: &[Observation],
    dims: &[ParamRange],
    config: &BayesianConfig,
    rng: &mut StdRng,
) -> Vec<f64> {
    if observations.is_empty() {
        return uniform_point(dims, rng);
    }

    let surrogate = Surrogate::fit(observations);
    let exploration = if config.exploration_weight.is_finite() {
        config.exploration_weight.max(0.0)
    } else {
        0.0
    };

    let mut top: Vec<&Observation> = observations.iter().collect();
    top.sort_by(|a, b| b.value.total_cmp(&a.value));
    top.truncate(TOP_OBSERVATIONS);

    let pool = config.candidate_pool.max(2);
    let normal = Normal::new(0.0, PERTURBATION_STD).ok();

    let mut best_point = uniform_point(dims, rng);
    let mut best_acquisition = surrogate.acquisition(&best_point, exploration);

    for i in 1..pool {
        let candidate: Vec<f64> = match &normal {
            Some(normal) if i % 2 == 1 => {
                let center = &top[(i / 2) % top.len()].point;
                dims.iter()
                    .zip(center)
                    .map(|(range, c)| snap_unit(range, (c + normal.sample(rng)).clamp(0.0, 1.0)))
                    .collect()
            }
            _ => uniform_point(dims, rng),
        };
        let acquisition = surrogate.acquisition(&candidate, exploration);
        if acquisition > best_acquisition {
            best_acquisition = acquisition;
            best_point = candidate;
        }
    }

    best_point
}

/// 커널 가중 평균 대리 모델
struct Surrogate<'a> {
    observations: &'a [Observation],
    prior_mean: f64,
    spread: f64,
}

impl<'a> Surrogate<'a> {
    fn fit(observations: &'a [Observation]) -> Self {
        let n = observations.len() as f64;
        let prior_mean = observations.iter().map(|o| o.value).sum::<f64>() / n;
        let (min, max) = observations
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), o| {
                (lo.min(o.value), hi.max(o.value))
            });
        let spread = if max > min { max - min } else { 1.0 };
        Self {
            observations,
            prior_mean,
            spread,
        }
    }

    /// (평균, 불확실성)
    fn predict(&self, point: &[f64]) -> (f64, f64) {
        let mut weight_sum = 0.0;
        let mut weighted_value = 0.0;
        for observation in self.observations {
            let k = kernel(point, &observation.point);
            weight_sum += k;
            weighted_value += k * observation.value;
        }
        let mean = (weighted_value + PRIOR_WEIGHT * self.prior_mean) / (weight_sum + PRIOR_WEIGHT);
        let uncertainty = 1.0 / (1.0 + weight_sum).sqrt();
        (mean, uncertainty)
    }

    fn acquisition(&self, point: &[f64], exploration: f64) -> f64 {
        let (mean, uncertainty) = self.predict(point);
        mean + exploration * self.spread * uncertainty
    }
}

fn kernel(a: &[f64], b: &[f64]) -> f64 {
    let distance_sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
    (-distance_sq / (2.0 * KERNEL_BANDWIDTH * KERNEL_BANDWIDTH)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// x = 0.1..0.9 관측, 0.5에서 최대인 목적 함수
    fn observations() -> Vec<Observation> {
        (1..=9)
            .map(|i| {
                let x = i as f64 / 10.0;
                Observation {
                    point: vec![x],
                    value: 1.0 - 10.0 * (x - 0.5).powi(2),
                }
            })
            .collect()
    }

    fn unit_range() -> Vec<ParamRange> {
        vec![ParamRange::new(0.0, 1.0, 0.01)]
    }

    fn mean_distance_from_best(exploration_weight: f64) -> f64 {
        let observations = observations();
        let dims = unit_range();
        let config = BayesianConfig::default().with_exploration_weight(exploration_weight);

        let distances: Vec<f64> = (0..40)
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let point = propose(&observations, &dims, &config, &mut rng);
                (point[0] - 0.5).abs()
            })
            .collect();
        distances.iter().sum::<f64>() / distances.len() as f64
    }

    #[test]
    fn test_exploitation_stays_near_best() {
        assert!(mean_distance_from_best(0.0) < 0.15);
    }

    #[test]
    fn test_exploration_widens_proposals() {
        let exploit = mean_distance_from_best(0.0);
        let explore = mean_distance_from_best(100.0);
        assert!(explore > exploit);
        assert!(explore > 0.3);
    }

    #[test]
    fn test_proposals_snapped_to_grid() {
        let dims = vec![ParamRange::new(10.0, 20.0, 5.0)];
        let observations = vec![
            Observation {
                point: vec![0.0],
                value: 1.0,
            },
            Observation {
                point: vec![1.0],
                value: 2.0,
            },
        ];
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..20 {
            let point = propose(&observations, &dims, &BayesianConfig::default(), &mut rng);
            let value = dims[0].denormalize(point[0]);
            assert!([10.0, 15.0, 20.0].contains(&value));
        }
    }

    #[test]
    fn test_uncertainty_shrinks_near_data() {
        let observations = observations();
        let surrogate = Surrogate::fit(&observations);
        let (_, near) = surrogate.predict(&[0.5]);
        let (_, far) = surrogate.predict(&[0.0]);
        assert!(near < far);
        assert!(near > 0.0 && far <= 1.0);
    }
}
