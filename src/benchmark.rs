//! Benchmarking module for the assignment engine.
//!
//! A benchmark run simulates one dive of a branch-and-bound search on the
//! assignment relaxation of an instance: at every level an assigned free arc
//! is forbidden and the relaxation is re-solved. The sequence of forbidden
//! arcs is planned once per instance and replayed on every engine
//! configuration, so bounds can be compared level by level.

use crate::ap::{ApError, Cost, PrimalDualConfig, ResumePolicy};
use crate::instance::TsppdInstance;
use crate::relaxation::AssignmentRelaxation;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::time::Instant;

/// Engine configuration under test, with a display name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedConfiguration {
    pub name: String,
    pub config: PrimalDualConfig,
}

impl NamedConfiguration {
    pub fn new(name: &str, config: PrimalDualConfig) -> Self {
        NamedConfiguration {
            name: name.to_string(),
            config,
        }
    }
}

/// Result of replaying one dive with one configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Configuration name
    pub configuration: String,
    /// Instance name
    pub instance: String,
    /// Instance dimension
    pub dimension: usize,
    /// Number of bound changes replayed
    pub depth: usize,
    /// Number of feasible solves, root included
    pub feasible_solves: usize,
    /// Bound at the root node
    pub root_bound: Option<Cost>,
    /// Bound at the deepest node
    pub final_bound: Option<Cost>,
    /// Augmenting paths over the whole dive
    pub augmentations: usize,
    /// Dual adjustments over the whole dive
    pub dual_updates: usize,
    /// Computation time in seconds
    pub time: f64,
}

/// Aggregated statistics for a configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationStatistics {
    pub configuration: String,
    pub num_runs: usize,
    pub avg_time: f64,
    pub total_time: f64,
    pub avg_augmentations: f64,
    pub avg_dual_updates: f64,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of forbidden arcs per dive
    pub depth: usize,
    /// Seed of the dive planner
    pub seed: u64,
    /// Run instances in parallel, one engine per worker
    pub parallel: bool,
    /// Configurations compared on every instance
    pub configurations: Vec<NamedConfiguration>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            depth: 20,
            seed: 42,
            parallel: true,
            configurations: Benchmark::standard_configurations(),
        }
    }
}

/// Outcome of all configurations on one instance
#[derive(Debug, Clone)]
struct InstanceOutcome {
    results: Vec<RunResult>,
    mismatches: usize,
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<RunResult>,
    mismatches: usize,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
            mismatches: 0,
        }
    }

    /// Both resumption policies, warm and cold
    pub fn standard_configurations() -> Vec<NamedConfiguration> {
        vec![
            NamedConfiguration::new(
                "warm/scan-to-end",
                PrimalDualConfig { resume_policy: ResumePolicy::ScanToEnd, warm_start: true },
            ),
            NamedConfiguration::new(
                "warm/after-probe",
                PrimalDualConfig { resume_policy: ResumePolicy::AfterProbe, warm_start: true },
            ),
            NamedConfiguration::new(
                "cold/scan-to-end",
                PrimalDualConfig { resume_policy: ResumePolicy::ScanToEnd, warm_start: false },
            ),
            NamedConfiguration::new(
                "cold/after-probe",
                PrimalDualConfig { resume_policy: ResumePolicy::AfterProbe, warm_start: false },
            ),
        ]
    }

    /// Plan a dive: repeatedly forbid a random assigned free arc.
    ///
    /// Stops early when the relaxation becomes infeasible or no free arc is
    /// left in the assignment.
    pub fn plan_dive(instance: &TsppdInstance, depth: usize, seed: u64) -> Result<Vec<(usize, usize)>, ApError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut relaxation = AssignmentRelaxation::new(instance, PrimalDualConfig::default())?;
        let mut dive = Vec::with_capacity(depth);

        if relaxation.solve().is_none() {
            return Ok(dive);
        }

        while dive.len() < depth {
            let candidates = relaxation.assigned_free_arcs();
            let Some(&(from, to)) = candidates.choose(&mut rng) else {
                break;
            };

            relaxation.forbid(from, to)?;
            dive.push((from, to));
            if relaxation.solve().is_none() {
                break;
            }
        }

        Ok(dive)
    }

    /// Replay a planned dive with one configuration, returning the run summary
    /// and the bound found at every level (root first).
    pub fn replay(
        instance: &TsppdInstance,
        configuration: &NamedConfiguration,
        dive: &[(usize, usize)],
    ) -> Result<(RunResult, Vec<Option<Cost>>), ApError> {
        let mut relaxation = AssignmentRelaxation::new(instance, configuration.config)?;
        let mut bounds = Vec::with_capacity(dive.len() + 1);

        let start = Instant::now();
        bounds.push(relaxation.solve());
        for &(from, to) in dive {
            relaxation.forbid(from, to)?;
            bounds.push(relaxation.solve());
        }
        let time = start.elapsed().as_secs_f64();

        let stats = relaxation.solver().stats();
        let result = RunResult {
            configuration: configuration.name.clone(),
            instance: instance.name.clone(),
            dimension: instance.dimension,
            depth: dive.len(),
            feasible_solves: bounds.iter().filter(|b| b.is_some()).count(),
            root_bound: bounds.first().copied().flatten(),
            final_bound: bounds.last().copied().flatten(),
            augmentations: stats.augmentations,
            dual_updates: stats.dual_updates,
            time,
        };

        Ok((result, bounds))
    }

    /// Run every configuration on one instance and cross-check the bounds.
    fn run_instance(config: &BenchmarkConfig, instance: &TsppdInstance, seed: u64) -> InstanceOutcome {
        let mut outcome = InstanceOutcome {
            results: Vec::new(),
            mismatches: 0,
        };

        let dive = match Self::plan_dive(instance, config.depth, seed) {
            Ok(dive) => dive,
            Err(e) => {
                log::error!("Planning failed on {}: {}", instance.name, e);
                return outcome;
            }
        };

        let mut reference: Option<Vec<Option<Cost>>> = None;
        for configuration in &config.configurations {
            match Self::replay(instance, configuration, &dive) {
                Ok((result, bounds)) => {
                    match &reference {
                        Some(expected) if *expected != bounds => {
                            log::warn!(
                                "Configuration {} disagrees on bounds for {}",
                                configuration.name,
                                instance.name
                            );
                            outcome.mismatches += 1;
                        }
                        Some(_) => {}
                        None => reference = Some(bounds),
                    }
                    outcome.results.push(result);
                }
                Err(e) => {
                    log::error!("Configuration {} failed on {}: {}", configuration.name, instance.name, e);
                }
            }
        }

        outcome
    }

    /// Run benchmark on multiple instances
    pub fn run_on_instances(&mut self, instances: &[TsppdInstance]) {
        let config = &self.config;
        let outcomes: Vec<InstanceOutcome> = if config.parallel {
            instances
                .par_iter()
                .enumerate()
                .map(|(i, instance)| {
                    log::info!("Running benchmark on instance: {}", instance.name);
                    Self::run_instance(config, instance, config.seed.wrapping_add(i as u64))
                })
                .collect()
        } else {
            instances
                .iter()
                .enumerate()
                .map(|(i, instance)| {
                    log::info!("Running benchmark on instance: {}", instance.name);
                    Self::run_instance(config, instance, config.seed.wrapping_add(i as u64))
                })
                .collect()
        };

        for outcome in outcomes {
            self.mismatches += outcome.mismatches;
            self.results.extend(outcome.results);
        }
    }

    /// Compute statistics for each configuration
    pub fn compute_statistics(&self) -> Vec<ConfigurationStatistics> {
        let mut stats_map: HashMap<String, Vec<&RunResult>> = HashMap::new();

        for result in &self.results {
            stats_map.entry(result.configuration.clone()).or_default().push(result);
        }

        let mut statistics: Vec<ConfigurationStatistics> = stats_map
            .into_iter()
            .map(|(configuration, results)| {
                let runs = results.len() as f64;
                let total_time = results.iter().map(|r| r.time).sum::<f64>();
                ConfigurationStatistics {
                    configuration,
                    num_runs: results.len(),
                    avg_time: total_time / runs,
                    total_time,
                    avg_augmentations: results.iter().map(|r| r.augmentations as f64).sum::<f64>() / runs,
                    avg_dual_updates: results.iter().map(|r| r.dual_updates as f64).sum::<f64>() / runs,
                }
            })
            .collect();

        statistics.sort_by(|a, b| a.avg_time.total_cmp(&b.avg_time));
        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("   Assignment Relaxation Benchmark\n");
        report.push_str("========================================\n\n");

        report.push_str("Configuration Summary:\n");
        report.push_str("-".repeat(80).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<20} {:>8} {:>14} {:>14} {:>12} {:>10}\n",
            "Configuration", "Runs", "Avg Augment", "Avg Dual Upd", "Total Time", "Avg Time"
        ));
        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        for stat in self.compute_statistics() {
            report.push_str(&format!(
                "{:<20} {:>8} {:>14.1} {:>14.1} {:>12.4} {:>10.6}\n",
                stat.configuration,
                stat.num_runs,
                stat.avg_augmentations,
                stat.avg_dual_updates,
                stat.total_time,
                stat.avg_time
            ));
        }

        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        report.push_str("\nBounds per Instance (root -> deepest):\n");
        let mut seen: Vec<&str> = Vec::new();
        for result in &self.results {
            if seen.contains(&result.instance.as_str()) {
                continue;
            }
            seen.push(&result.instance);
            let show = |b: Option<Cost>| b.map(|b| b.to_string()).unwrap_or_else(|| "infeasible".to_string());
            report.push_str(&format!(
                "  {}: {} -> {} after {} levels\n",
                result.instance,
                show(result.root_bound),
                show(result.final_bound),
                result.depth
            ));
        }

        if self.mismatches > 0 {
            report.push_str(&format!("\nWARNING: {} configuration runs disagreed on bounds\n", self.mismatches));
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[RunResult] {
        &self.results
    }

    /// Number of runs whose bounds differed from the first configuration
    pub fn mismatches(&self) -> usize {
        self.mismatches
    }
}

/// Generate `count` random instances per request count
pub fn generate_instances(request_counts: &[usize], count: usize, grid: f64, seed: u64) -> Result<Vec<TsppdInstance>, String> {
    let mut instances = Vec::with_capacity(request_counts.len() * count);
    for &requests in request_counts {
        for k in 0..count {
            let instance_seed = seed.wrapping_add((requests * 1000 + k) as u64);
            let name = format!("random-{}-{}", requests, k);
            instances.push(TsppdInstance::random(&name, requests, grid, instance_seed)?);
        }
    }

    instances.sort_by_key(|i| i.dimension);
    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benchmark_config() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.depth, 20);
        assert_eq!(config.configurations.len(), 4);
    }

    #[test]
    fn test_plan_dive_is_deterministic() {
        let instance = TsppdInstance::random("plan", 6, 300.0, 11).unwrap();
        let a = Benchmark::plan_dive(&instance, 8, 5).unwrap();
        let b = Benchmark::plan_dive(&instance, 8, 5).unwrap();

        assert_eq!(a, b);
        assert!(!a.is_empty());
        assert!(a.len() <= 8);
    }

    #[test]
    fn test_replay_bounds_are_monotone() {
        let instance = TsppdInstance::random("replay", 6, 300.0, 2).unwrap();
        let dive = Benchmark::plan_dive(&instance, 10, 9).unwrap();
        let configuration = NamedConfiguration::new("default", PrimalDualConfig::default());

        let (result, bounds) = Benchmark::replay(&instance, &configuration, &dive).unwrap();
        assert_eq!(bounds.len(), dive.len() + 1);
        assert_eq!(result.depth, dive.len());

        let feasible: Vec<Cost> = bounds.iter().flatten().copied().collect();
        assert!(feasible.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_configurations_agree_on_bounds() {
        let instances = generate_instances(&[4, 6], 2, 250.0, 1).unwrap();
        let mut benchmark = Benchmark::new(BenchmarkConfig {
            depth: 6,
            parallel: false,
            ..Default::default()
        });

        benchmark.run_on_instances(&instances);

        assert_eq!(benchmark.mismatches(), 0);
        assert_eq!(benchmark.results().len(), instances.len() * 4);
        let stats = benchmark.compute_statistics();
        assert_eq!(stats.len(), 4);
        assert!(stats.iter().all(|s| s.num_runs == instances.len()));
        assert!(benchmark.generate_report().contains("random-4-0"));
    }
}
