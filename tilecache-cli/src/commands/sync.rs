//! `tilecache sync`: reconcile layers from a source cache into a destination.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use tilecache_core::{config::SYNC_USAGE, LayerName, SyncConfig};
use tilecache_sync::{pipeline, MergePlan, RunPhase, RunReport, SyncObserver};

use super::usage_exit;

/// Arguments for `tilecache sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// YAML run file with `source`, `destination` and `layers`.
    #[arg(long, value_name = "FILE", conflicts_with = "args")]
    pub config: Option<PathBuf>,

    /// -src src.db -dst dst.db {[-updateOnly | -noUpdateOnly] -dir layer}
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let parsed = match &self.config {
            Some(path) => SyncConfig::load_at(path),
            None => SyncConfig::from_args(self.args),
        };
        let config = parsed.unwrap_or_else(|err| usage_exit("sync", SYNC_USAGE, &err));

        let mut console = ConsoleObserver;
        let report = pipeline::run(&config, &mut console).with_context(|| {
            format!(
                "sync {} -> {} failed",
                config.source.display(),
                config.destination.display()
            )
        })?;

        print_summary(&report);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Console output
// ---------------------------------------------------------------------------

struct ConsoleObserver;

impl SyncObserver for ConsoleObserver {
    fn phase(&mut self, phase: &RunPhase) {
        match phase {
            RunPhase::Planning(layer) => {
                println!("{}: performing select, please wait...", layer.as_str().bold())
            }
            RunPhase::Committed(layer) => {
                println!("{}: {}", layer.as_str().bold(), "committed".green())
            }
            RunPhase::Aborted => eprintln!("{}", "sync aborted".red().bold()),
            _ => {}
        }
    }

    fn planned(&mut self, plan: &MergePlan) {
        println!(
            "{}: total updates: {} (new: {})",
            plan.layer().as_str().bold(),
            plan.len(),
            plan.new_tiles()
        );
    }

    fn progress(&mut self, layer: &LayerName, percent: u8) {
        println!("{}: {percent}% of inserts done", layer.as_str().bright_black());
    }
}

#[derive(Tabled)]
struct LayerRow {
    #[tabled(rename = "layer")]
    layer: String,
    #[tabled(rename = "policy")]
    policy: String,
    #[tabled(rename = "planned")]
    planned: usize,
    #[tabled(rename = "new")]
    new_tiles: usize,
    #[tabled(rename = "copied")]
    copied: usize,
}

fn print_summary(report: &RunReport) {
    if report.layers.is_empty() {
        println!("No layers requested.");
        return;
    }

    let rows: Vec<LayerRow> = report
        .layers
        .iter()
        .map(|l| LayerRow {
            layer: l.layer.to_string(),
            policy: l.policy.to_string(),
            planned: l.planned,
            new_tiles: l.new_tiles,
            copied: l.copied,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("{} {} tiles copied", "✓".green(), report.copied());
}
