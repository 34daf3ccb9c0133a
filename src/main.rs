//! TSPPD assignment bound - Command Line Interface
//!
//! Computes assignment relaxation bounds for random TSPPD instances and
//! benchmarks the incremental engine configurations.

use clap::{Parser, Subcommand, ValueEnum};
use tsppd_ap::ap::{Cost, PrimalDualConfig, ResumePolicy};
use tsppd_ap::benchmark::{generate_instances, Benchmark, BenchmarkConfig};
use tsppd_ap::instance::TsppdInstance;
use tsppd_ap::relaxation::AssignmentRelaxation;

use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "tsppd-ap")]
#[command(version = "1.0")]
#[command(about = "Primal-dual assignment bounds for the TSP with pickup and delivery")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the assignment relaxation of a random instance
    Solve {
        /// Number of pickup and delivery requests
        #[arg(short, long, default_value = "10")]
        requests: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Side of the square the nodes are drawn in
        #[arg(short, long, default_value = "1000")]
        grid: f64,

        /// Arcs to forbid, as "from,to"
        #[arg(long, value_parser = parse_arc)]
        forbid: Vec<(usize, usize)>,

        /// Arcs to force, as "from,to"
        #[arg(long, value_parser = parse_arc)]
        force: Vec<(usize, usize)>,

        /// Where phase-two row repair resumes its scan
        #[arg(long, value_enum, default_value = "scan-to-end")]
        resume: Resume,

        /// Rebuild the solution from scratch on every solve
        #[arg(long)]
        cold: bool,

        /// Output solution to JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Replay search dives on random instances with every engine configuration
    Benchmark {
        /// Request counts to generate instances for
        #[arg(short, long, value_delimiter = ',', default_value = "10,20,40")]
        requests: Vec<usize>,

        /// Instances per request count
        #[arg(short, long, default_value = "5")]
        instances: usize,

        /// Arcs forbidden per dive
        #[arg(short, long, default_value = "20")]
        depth: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Run instances one after another
        #[arg(long)]
        sequential: bool,
    },

    /// Analyze the relaxation of a random instance
    Analyze {
        /// Number of pickup and delivery requests
        #[arg(short, long, default_value = "10")]
        requests: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Resume {
    /// Keep scanning a row's candidates to the end
    ScanToEnd,
    /// Resume right after the last probed column
    AfterProbe,
}

impl From<Resume> for ResumePolicy {
    fn from(resume: Resume) -> Self {
        match resume {
            Resume::ScanToEnd => ResumePolicy::ScanToEnd,
            Resume::AfterProbe => ResumePolicy::AfterProbe,
        }
    }
}

fn parse_arc(s: &str) -> Result<(usize, usize), String> {
    let (from, to) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"from,to\", got {:?}", s))?;
    let from = from.trim().parse::<usize>().map_err(|e| format!("invalid node {:?}: {}", from, e))?;
    let to = to.trim().parse::<usize>().map_err(|e| format!("invalid node {:?}: {}", to, e))?;
    Ok((from, to))
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve { requests, seed, grid, forbid, force, resume, cold, output, verbose } => {
            let config = PrimalDualConfig {
                resume_policy: resume.into(),
                warm_start: !cold,
            };
            solve_instance(requests, seed, grid, &forbid, &force, config, output, verbose);
        }

        Commands::Benchmark { requests, instances, depth, seed, output, sequential } => {
            run_benchmark(&requests, instances, depth, seed, &output, !sequential);
        }

        Commands::Analyze { requests, seed } => {
            analyze_instance(requests, seed);
        }
    }
}

fn build_instance(requests: usize, seed: u64, grid: f64) -> TsppdInstance {
    let name = format!("random-{}-{}", requests, seed);
    match TsppdInstance::random(&name, requests, grid, seed) {
        Ok(instance) => instance,
        Err(e) => {
            eprintln!("Error generating instance: {}", e);
            std::process::exit(1);
        }
    }
}

fn build_relaxation(instance: &TsppdInstance, config: PrimalDualConfig) -> AssignmentRelaxation {
    match AssignmentRelaxation::new(instance, config) {
        Ok(relaxation) => relaxation,
        Err(e) => {
            eprintln!("Error building relaxation: {}", e);
            std::process::exit(1);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn solve_instance(
    requests: usize,
    seed: u64,
    grid: f64,
    forbid: &[(usize, usize)],
    force: &[(usize, usize)],
    config: PrimalDualConfig,
    output: Option<PathBuf>,
    verbose: bool,
) {
    let instance = build_instance(requests, seed, grid);
    if verbose {
        println!("{}", instance.statistics());
        println!("Engine: {:?}", config);
    }

    let mut relaxation = build_relaxation(&instance, config);

    let start = Instant::now();
    let root = relaxation.solve();
    match root {
        Some(bound) => println!("Root bound: {}", bound),
        None => println!("Root relaxation is infeasible"),
    }

    for &(from, to) in forbid {
        if let Err(e) = relaxation.forbid(from, to) {
            eprintln!("Cannot forbid ({}, {}): {}", from, to, e);
            std::process::exit(1);
        }
    }
    for &(from, to) in force {
        if let Err(e) = relaxation.force(from, to) {
            eprintln!("Cannot force ({}, {}): {}", from, to, e);
            std::process::exit(1);
        }
    }

    let bound = if forbid.is_empty() && force.is_empty() {
        root
    } else {
        let bound = relaxation.solve();
        match bound {
            Some(bound) => println!("Bound after {} bound changes: {}", forbid.len() + force.len(), bound),
            None => println!("Relaxation is infeasible after bound changes"),
        }
        bound
    };
    let elapsed = start.elapsed().as_secs_f64();

    let mut solution = relaxation.solution(bound.is_some());
    solution.computation_time = elapsed;

    println!("\n========== Solution ==========");
    println!("Feasible: {}", solution.feasible);
    println!("Objective: {}", solution.objective);
    println!("Subtours: {}", solution.subtours().len());
    println!("Augmentations: {}", solution.stats.augmentations);
    println!("Dual updates: {}", solution.stats.dual_updates);
    println!("Time: {:.6}s", elapsed);

    if verbose {
        for (i, cycle) in solution.subtours().iter().enumerate() {
            let nodes: Vec<String> = cycle.iter().map(|n| n.to_string()).collect();
            println!("  cycle {}: {}", i, nodes.join(" -> "));
        }
    }

    if let Some(path) = output {
        let written = serde_json::to_string_pretty(&solution)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
        match written {
            Ok(()) => println!("Solution saved to {:?}", path),
            Err(e) => eprintln!("Failed to save solution: {}", e),
        }
    }
}

fn run_benchmark(requests: &[usize], count: usize, depth: usize, seed: u64, output: &PathBuf, parallel: bool) {
    let instances = match generate_instances(requests, count, 1000.0, seed) {
        Ok(instances) => instances,
        Err(e) => {
            eprintln!("Error generating instances: {}", e);
            std::process::exit(1);
        }
    };

    println!("Generated {} instances", instances.len());
    if instances.is_empty() {
        eprintln!("No instances to run!");
        return;
    }

    if let Err(e) = std::fs::create_dir_all(output) {
        eprintln!("Failed to create output directory: {}", e);
        std::process::exit(1);
    }

    let config = BenchmarkConfig {
        depth,
        seed,
        parallel,
        ..Default::default()
    };

    let mut benchmark = Benchmark::new(config);
    benchmark.run_on_instances(&instances);

    let results_path = output.join("results.csv");
    match benchmark.export_to_csv(&results_path) {
        Ok(()) => println!("\nResults exported to {:?}", results_path),
        Err(e) => eprintln!("Failed to export results: {}", e),
    }

    let stats_path = output.join("statistics.csv");
    match benchmark.export_statistics_csv(&stats_path) {
        Ok(()) => println!("Statistics exported to {:?}", stats_path),
        Err(e) => eprintln!("Failed to export statistics: {}", e),
    }

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    match std::fs::write(&report_path, &report) {
        Ok(()) => println!("Report saved to {:?}", report_path),
        Err(e) => eprintln!("Failed to save report: {}", e),
    }
}

fn analyze_instance(requests: usize, seed: u64) {
    let instance = build_instance(requests, seed, 1000.0);

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let mut relaxation = build_relaxation(&instance, PrimalDualConfig::default());
    println!("Structural bounds:");
    println!("  Free arcs: {}", relaxation.free_arcs().len());
    println!("  Fixed arcs: {}", instance.dimension * instance.dimension - relaxation.free_arcs().len());

    let Some(bound) = relaxation.solve() else {
        println!("\nRelaxation is infeasible");
        return;
    };

    let tour_cost = instance.tour_cost(&instance.sequential_tour());
    let solution = relaxation.solution(true);

    println!("\nAssignment Relaxation:");
    println!("  Bound: {}", bound);
    println!("  Sequential tour: {}", tour_cost);
    if tour_cost > 0 {
        println!("  Gap to sequential tour: {:.2}%", (tour_cost - bound) as f64 / tour_cost as f64 * 100.0);
    }
    println!("  Subtours: {}", solution.subtours().len());

    let solver = relaxation.solver();
    let mut reduced: Vec<Cost> = relaxation
        .free_arcs()
        .iter()
        .filter(|&&(from, to)| !solver.is_assigned(from, to))
        .map(|&(from, to)| solver.reduced_cost(from, to))
        .collect();
    reduced.sort_unstable();

    if !reduced.is_empty() {
        let zero = reduced.iter().filter(|&&rc| rc == 0).count();
        let median = reduced[reduced.len() / 2];
        println!("\nReduced Costs (unassigned free arcs):");
        println!("  Zero: {}", zero);
        println!("  Median: {}", median);
        println!("  Max: {}", reduced[reduced.len() - 1]);
        println!(
            "  Prunable against sequential tour: {}",
            reduced.iter().filter(|&&rc| bound + rc > tour_cost).count()
        );
    }
}
