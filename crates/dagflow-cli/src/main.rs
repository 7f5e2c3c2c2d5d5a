mod input;
mod logging;
mod output;

use std::io;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use dagflow_decomp::{
    Coverage, DecompError, DecompositionConfig, KFlowDecomp, KLeastAbsErrors, KMinPathError,
    MinFlowDecomp, SafetyMode, WeightType,
};
use dagflow_solver::SolverConfig;
use tracing::debug;

use crate::input::{FLOW_ATTR, GraphInput, InputFormat, LENGTH_ATTR, read_graphs};
use crate::logging::LogFormat;
use crate::output::{GraphRecord, OutputFormat, render};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Decompose flows on directed acyclic graphs into weighted paths"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fewest weighted paths reproducing the flow exactly
    Mfd(SolveArgs),
    /// Exactly k weighted paths reproducing the flow
    Kfd(FixedPathsArgs),
    /// k weighted paths minimizing the summed absolute edge error
    Klae(FixedPathsArgs),
    /// k weighted paths with per-path slack, minimizing the total slack
    Kmpe(OptionalPathsArgs),
}

impl Command {
    fn common(&self) -> &SolveArgs {
        match self {
            Command::Mfd(args) => args,
            Command::Kfd(args) | Command::Klae(args) => &args.common,
            Command::Kmpe(args) => &args.common,
        }
    }
}

#[derive(Args, Debug)]
struct FixedPathsArgs {
    /// Number of paths
    #[arg(long)]
    k: usize,

    #[command(flatten)]
    common: SolveArgs,
}

#[derive(Args, Debug)]
struct OptionalPathsArgs {
    /// Number of paths; defaults to the width of the graph
    #[arg(long)]
    k: Option<usize>,

    #[command(flatten)]
    common: SolveArgs,
}

#[derive(Args, Debug)]
struct SolveArgs {
    /// Input file holding one or more graphs
    #[arg(long)]
    input: PathBuf,

    #[arg(long, value_enum, default_value = "text")]
    input_format: InputFormat,

    /// Output format for stdout
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    #[arg(long, value_enum, default_value = "int")]
    weight_type: WeightArg,

    /// Safety pruning: none, paths, paths-zero, sequences, sequences-zero
    #[arg(long, default_value = "paths-zero")]
    safety: SafetyMode,

    /// Always build the MILP, even when the greedy decomposition fits
    #[arg(long)]
    no_greedy: bool,

    /// Fraction of every subpath a solution path must cover
    #[arg(long)]
    coverage: Option<f64>,

    /// Measure subpath coverage by edge length instead of edge count
    #[arg(long)]
    length_coverage: bool,

    /// Solver threads
    #[arg(long)]
    threads: Option<u32>,

    /// Time limit in seconds for each solver call
    #[arg(long)]
    time_limit: Option<f64>,

    /// Log filter such as `info` or `dagflow_decomp=debug`; overrides DAGFLOW_TRACE
    #[arg(long)]
    log_level: Option<String>,

    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
enum WeightArg {
    Int,
    Float,
}

impl From<WeightArg> for WeightType {
    fn from(value: WeightArg) -> Self {
        match value {
            WeightArg::Int => WeightType::Integer,
            WeightArg::Float => WeightType::Continuous,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let common = cli.command.common();
    logging::init(common.log_level.as_deref(), common.log_format)?;

    let graphs = read_graphs(&common.input, common.input_format)?;
    debug!(
        component = "cli",
        operation = "read_input",
        status = "success",
        path = %common.input.display(),
        graphs = graphs.len(),
        "Read input graphs"
    );

    let records = graphs
        .iter()
        .map(|input| solve_graph(&cli.command, input))
        .collect::<Result<Vec<_>, _>>()?;
    let stdout = io::stdout();
    render(&mut stdout.lock(), common.format, &records)
}

fn decomposition_config(
    args: &SolveArgs,
    input: &GraphInput,
) -> Result<DecompositionConfig, DecompError> {
    let mut solver = SolverConfig::builder();
    if let Some(threads) = args.threads {
        solver = solver.with_threads(threads);
    }
    if let Some(seconds) = args.time_limit {
        solver = solver.with_time_limit(seconds);
    }

    let mut config = DecompositionConfig::new(FLOW_ATTR)
        .with_weight_type(args.weight_type.into())
        .with_safety(args.safety)
        .with_greedy(!args.no_greedy)
        .with_solver(solver.build()?)
        .with_subpaths(input.subpaths.clone())
        .with_edges_to_ignore(input.edges_to_ignore.clone())
        .with_additional_starts(input.additional_starts.clone())
        .with_additional_ends(input.additional_ends.clone());
    if input.has_lengths {
        config = config.with_edge_length_attr(LENGTH_ATTR);
    }
    if args.coverage.is_some() || args.length_coverage {
        let fraction = args.coverage.unwrap_or(1.0);
        config = config.with_coverage(if args.length_coverage {
            Coverage::Length(fraction)
        } else {
            Coverage::Edges(fraction)
        });
    }
    Ok(config)
}

fn solve_graph(command: &Command, input: &GraphInput) -> Result<GraphRecord, DecompError> {
    let config = decomposition_config(command.common(), input)?;
    let graph = &input.graph;
    let graph_id = graph.id();
    let record = match command {
        Command::Mfd(_) => {
            let mut mfd = MinFlowDecomp::new(graph, config)?;
            let outcome = mfd.solve()?;
            GraphRecord::new("mfd", graph_id, &outcome, mfd.statistics())
        }
        Command::Kfd(args) => {
            let mut kfd = KFlowDecomp::new(graph, args.k, config)?;
            let outcome = kfd.solve()?;
            GraphRecord::new("kfd", graph_id, &outcome, kfd.statistics())
        }
        Command::Klae(args) => {
            let mut klae = KLeastAbsErrors::new(graph, args.k, config)?;
            let outcome = klae.solve()?;
            GraphRecord::new("klae", graph_id, &outcome, klae.statistics())
        }
        Command::Kmpe(args) => {
            let mut kmpe = KMinPathError::new(graph, args.k, config)?
                .with_error_scaling(&input.error_scaling)?;
            let outcome = kmpe.solve()?;
            GraphRecord::new("kmpe", graph_id, &outcome, kmpe.statistics())
        }
    };
    Ok(record)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    const EXAMPLE: &str = "\
#example
6
s a 6
s b 7
a b 2
a c 4
b c 9
c d 6
c t 7
d t 6
";

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dagflow").chain(args.iter().copied())).unwrap()
    }

    fn example() -> GraphInput {
        input::parse_text(EXAMPLE).unwrap().remove(0)
    }

    #[test]
    fn test_cli_defaults() {
        let cli = parse(&["mfd", "--input", "graphs.txt"]);
        let common = cli.command.common();
        assert_eq!(common.input_format, InputFormat::Text);
        assert_eq!(common.format, OutputFormat::Table);
        assert_eq!(common.weight_type, WeightArg::Int);
        assert_eq!(common.safety, SafetyMode::SafePathsWithZeroEdges);
        assert!(!common.no_greedy);
    }

    #[test]
    fn test_cli_options() {
        let cli = parse(&[
            "kfd",
            "--input",
            "g.json",
            "--input-format",
            "json",
            "--k",
            "3",
            "--safety",
            "sequences",
            "--weight-type",
            "float",
            "--format",
            "ndjson",
            "--no-greedy",
        ]);
        let Command::Kfd(args) = &cli.command else {
            panic!("expected kfd");
        };
        assert_eq!(args.k, 3);
        assert_eq!(args.common.safety, SafetyMode::SafeSequences);
        assert_eq!(WeightType::from(args.common.weight_type), WeightType::Continuous);
        assert!(args.common.no_greedy);
    }

    #[test]
    fn test_cli_rejections() {
        assert!(Cli::try_parse_from(["dagflow", "kfd", "--input", "g.txt"]).is_err());
        assert!(
            Cli::try_parse_from(["dagflow", "mfd", "--input", "g.txt", "--safety", "all"])
                .is_err()
        );
    }

    #[test]
    fn test_config_from_args() {
        let cli = parse(&[
            "mfd",
            "--input",
            "g.txt",
            "--coverage",
            "0.5",
            "--threads",
            "2",
        ]);
        let config = decomposition_config(cli.command.common(), &example()).unwrap();
        assert_eq!(config.coverage, Coverage::Edges(0.5));
        assert_eq!(config.solver.threads(), 2);
        assert_eq!(config.edge_length_attr, None);

        let cli = parse(&["mfd", "--input", "g.txt", "--threads", "0"]);
        let err = decomposition_config(cli.command.common(), &example()).unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID_THREADS");
    }

    #[test]
    fn test_solve_example_graph() {
        let cli = parse(&["mfd", "--input", "g.txt"]);
        let record = solve_graph(&cli.command, &example()).unwrap();
        assert_eq!(record.graph_id.as_deref(), Some("example"));
        assert_eq!(record.status, "optimal");
        let mut weights = record.paths.iter().map(|p| p.weight).collect::<Vec<_>>();
        weights.sort_by(f64::total_cmp);
        assert_eq!(weights, vec![2.0, 4.0, 7.0]);
        assert_eq!(record.statistics.lower_bound, Some(3));
    }

    #[test]
    fn test_solve_fixed_paths() {
        let cli = parse(&["kfd", "--input", "g.txt", "--k", "2"]);
        let record = solve_graph(&cli.command, &example()).unwrap();
        assert_eq!(record.status, "infeasible");
        assert!(record.paths.is_empty());

        let cli = parse(&["klae", "--input", "g.txt", "--k", "3"]);
        let record = solve_graph(&cli.command, &example()).unwrap();
        assert_eq!(record.total_error, Some(0.0));
    }
}
