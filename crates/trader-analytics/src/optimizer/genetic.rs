//! 유전 알고리즘 탐색.
//!
//! 세대마다 개체군 전체를 병렬 평가한 뒤 다음 세대를 구성합니다.
//!
//! 1. 엘리트 `elitism_count`개를 변경 없이 복사
//! 2. 토너먼트 선택으로 부모 두 개체 선택
//! 3. `crossover_rate` 확률로 균등 교차, 아니면 첫 부모 복제
//! 4. 유전자별 `mutation_rate` 확률로 변이 (재샘플링 또는 한 스텝 이동)
//!
//! 실패하거나 최소 거래 수에 못 미친 개체의 적합도는 `-inf`입니다.

use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;
use trader_core::{ParamMap, ParamRange, ParamRanges};

use super::{Trial, TrialRunner};
use crate::progress::{ProgressStage, RunControl};

/// 유전 알고리즘 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticConfig {
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// 유전자별 변이 확률
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// 교차 확률
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
    /// 다음 세대로 그대로 넘기는 상위 개체 수
    #[serde(default = "default_elitism_count")]
    pub elitism_count: usize,
}

fn default_population_size() -> usize {
    20
}
fn default_generations() -> usize {
    10
}
fn default_mutation_rate() -> f64 {
    0.1
}
fn default_crossover_rate() -> f64 {
    0.7
}
fn default_tournament_size() -> usize {
    3
}
fn default_elitism_count() -> usize {
    2
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            generations: default_generations(),
            mutation_rate: default_mutation_rate(),
            crossover_rate: default_crossover_rate(),
            tournament_size: default_tournament_size(),
            elitism_count: default_elitism_count(),
        }
    }
}

impl GeneticConfig {
    pub fn with_population(mut self, population_size: usize, generations: usize) -> Self {
        self.population_size = population_size;
        self.generations = generations;
        self
    }

    pub fn with_rates(mut self, mutation_rate: f64, crossover_rate: f64) -> Self {
        self.mutation_rate = mutation_rate;
        self.crossover_rate = crossover_rate;
        self
    }

    pub fn with_elitism(mut self, elitism_count: usize) -> Self {
        self.elitism_count = elitism_count;
        self
    }

    /// 실행 가능한 값으로 보정
    fn sanitized(&self) -> Self {
        let population_size = self.population_size.max(2);
        Self {
            population_size,
            generations: self.generations.max(1),
            mutation_rate: clamp_rate(self.mutation_rate),
            crossover_rate: clamp_rate(self.crossover_rate),
            tournament_size: self.tournament_size.clamp(1, population_size),
            elitism_count: self.elitism_count.min(population_size),
        }
    }
}

fn clamp_rate(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

pub(crate) fn search(
    runner: &TrialRunner<'_>,
    ranges: &ParamRanges,
    config: &GeneticConfig,
    seed: u64,
    control: &RunControl,
) -> Vec<Trial> {
    let config = config.sanitized();
    let genes: Vec<(&String, &ParamRange)> = ranges.iter().collect();
    let mut rng = StdRng::seed_from_u64(seed);

    // 탐색할 유전자가 없으면 기본 파라미터로 한 번만 실행
    if genes.is_empty() {
        let trial = runner.run_trial(&ParamMap::new(), None, Some(0), control);
        control.report(ProgressStage::Genetic { generation: 0 }, 1, 1);
        return vec![trial];
    }

    let mut population: Vec<ParamMap> = (0..config.population_size)
        .map(|_| random_individual(&genes, &mut rng))
        .collect();
    let mut trials = Vec::with_capacity(config.population_size * config.generations);

    for generation in 0..config.generations {
        let tracker = control.tracker(ProgressStage::Genetic { generation }, population.len());
        let evaluated: Vec<Trial> = population
            .par_iter()
            .map(|individual| {
                let trial = runner.run_trial(individual, None, Some(generation), control);
                tracker.tick();
                trial
            })
            .collect();

        let fitness: Vec<f64> = evaluated
            .iter()
            .map(|t| t.fitness(runner.objective()))
            .collect();
        let best = fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        debug!(generation, best_fitness = best, "세대 평가 완료");

        trials.extend(evaluated);
        if control.is_cancelled() || generation + 1 == config.generations {
            break;
        }

        population = next_generation(&population, &fitness, &genes, &config, &mut rng);
    }

    trials
}

fn random_individual(genes: &[(&String, &ParamRange)], rng: &mut StdRng) -> ParamMap {
    genes
        .iter()
        .map(|(name, range)| ((*name).clone(), random_gene(range, rng)))
        .collect()
}

fn random_gene(range: &ParamRange, rng: &mut StdRng) -> f64 {
    range.value_at(rng.gen_range(0..range.len()))
}

fn next_generation(
    population: &[ParamMap],
    fitness: &[f64],
    genes: &[(&String, &ParamRange)],
    config: &GeneticConfig,
    rng: &mut StdRng,
) -> Vec<ParamMap> {
    let mut ranked: Vec<usize> = (0..population.len()).collect();
    ranked.sort_by(|&a, &b| fitness[b].total_cmp(&fitness[a]));

    let mut next: Vec<ParamMap> = ranked
        .iter()
        .take(config.elitism_count)
        .map(|&i| population[i].clone())
        .collect();

    while next.len() < config.population_size {
        let first = tournament_select(fitness, config.tournament_size, rng);
        let second = tournament_select(fitness, config.tournament_size, rng);

        let mut child = if rng.gen::<f64>() < config.crossover_rate {
            crossover(&population[first], &population[second], rng)
        } else {
            population[first].clone()
        };
        mutate(&mut child, genes, config.mutation_rate, rng);
        next.push(child);
    }

    next
}

/// 무작위로 k개를 뽑아 적합도가 가장 높은 개체의 인덱스를 반환
fn tournament_select(fitness: &[f64], k: usize, rng: &mut StdRng) -> usize {
    let mut best = rng.gen_range(0..fitness.len());
    for _ in 1..k {
        let challenger = rng.gen_range(0..fitness.len());
        if fitness[challenger] > fitness[best] {
            best = challenger;
        }
    }
    best
}

/// 균등 교차: 유전자마다 부모 중 하나를 동전 던지기로 선택
fn crossover(first: &ParamMap, second: &ParamMap, rng: &mut StdRng) -> ParamMap {
    first
        .iter()
        .map(|(name, value)| {
            let gene = match second.get(name) {
                Some(other) if rng.gen::<bool>() => *other,
                _ => *value,
            };
            (name.clone(), gene)
        })
        .collect()
}

fn mutate(individual: &mut ParamMap, genes: &[(&String, &ParamRange)], rate: f64, rng: &mut StdRng) {
    for (name, range) in genes {
        if rng.gen::<f64>() >= rate {
            continue;
        }
        let current = individual.get(*name).copied().unwrap_or(range.min);
        let mutated = if rng.gen::<bool>() {
            random_gene(range, rng)
        } else {
            let direction = if rng.gen::<bool>() { 1.0 } else { -1.0 };
            range.snap(current + direction * range.step)
        };
        individual.insert((*name).clone(), mutated);
    }
}
