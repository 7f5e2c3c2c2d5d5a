//! Result records and their table, JSON and NDJSON renderings.

use std::io::{self, Write};

use clap::ValueEnum;
use dagflow_decomp::{
    Decomposition, EdgeErrorDecomposition, Outcome, SlackDecomposition, SolveStatistics,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Ndjson,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathRecord {
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack: Option<f64>,
    pub nodes: Vec<String>,
}

/// One output record per input graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphRecord {
    pub graph_id: Option<String>,
    pub objective: &'static str,
    pub status: &'static str,
    pub num_paths: usize,
    pub paths: Vec<PathRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_error: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_slack: Option<f64>,
    pub statistics: SolveStatistics,
}

/// Solutions that can be flattened into path records.
pub trait SolutionRecord {
    fn path_records(&self) -> Vec<PathRecord>;

    fn total_error(&self) -> Option<f64> {
        None
    }

    fn total_slack(&self) -> Option<f64> {
        None
    }
}

fn plain_paths(paths: &[Vec<String>], weights: &[f64]) -> Vec<PathRecord> {
    paths
        .iter()
        .zip(weights)
        .map(|(nodes, &weight)| PathRecord {
            weight,
            slack: None,
            nodes: nodes.clone(),
        })
        .collect()
}

impl SolutionRecord for Decomposition {
    fn path_records(&self) -> Vec<PathRecord> {
        plain_paths(&self.paths, &self.weights)
    }
}

impl SolutionRecord for EdgeErrorDecomposition {
    fn path_records(&self) -> Vec<PathRecord> {
        plain_paths(&self.paths, &self.weights)
    }

    fn total_error(&self) -> Option<f64> {
        Some(EdgeErrorDecomposition::total_error(self))
    }
}

impl SolutionRecord for SlackDecomposition {
    fn path_records(&self) -> Vec<PathRecord> {
        self.paths
            .iter()
            .zip(self.weights.iter().zip(&self.slacks))
            .map(|(nodes, (&weight, &slack))| PathRecord {
                weight,
                slack: Some(slack),
                nodes: nodes.clone(),
            })
            .collect()
    }

    fn total_slack(&self) -> Option<f64> {
        Some(SlackDecomposition::total_slack(self))
    }
}

impl GraphRecord {
    pub fn new<S: SolutionRecord>(
        objective: &'static str,
        graph_id: Option<&str>,
        outcome: &Outcome<S>,
        statistics: &SolveStatistics,
    ) -> Self {
        let solution = outcome.solution();
        let paths = solution.map(S::path_records).unwrap_or_default();
        Self {
            graph_id: graph_id.map(str::to_string),
            objective,
            status: outcome.status_str(),
            num_paths: paths.len(),
            paths,
            total_error: solution.and_then(S::total_error),
            total_slack: solution.and_then(S::total_slack),
            statistics: statistics.clone(),
        }
    }
}

pub fn render(
    out: &mut impl Write,
    format: OutputFormat,
    records: &[GraphRecord],
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Table => {
            write_table(out, records)?;
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(records)?)?;
        }
        OutputFormat::Ndjson => {
            for record in records {
                writeln!(out, "{}", serde_json::to_string(record)?)?;
            }
        }
    }
    Ok(())
}

fn write_table(out: &mut impl Write, records: &[GraphRecord]) -> io::Result<()> {
    writeln!(
        out,
        "{:<16} {:<20} {:<12} {:>6} {:>12} {:>12}",
        "graph", "objective", "status", "paths", "total_ms", "value"
    )?;
    for record in records {
        let value = record
            .total_error
            .or(record.total_slack)
            .map_or_else(|| "-".to_string(), |v| format!("{v:.3}"));
        writeln!(
            out,
            "{:<16} {:<20} {:<12} {:>6} {:>12.3} {:>12}",
            record.graph_id.as_deref().unwrap_or("-"),
            record.objective,
            record.status,
            record.num_paths,
            record.statistics.total_ms,
            value,
        )?;
        for path in &record.paths {
            let slack = path.slack.map_or_else(String::new, |s| format!(" slack={s}"));
            writeln!(out, "  {:>10}{}  {}", path.weight, slack, path.nodes.join(" "))?;
        }
    }
    Ok(())
}
