//! `tilecache import` / `tilecache export`: move layers between tile
//! directories and a cache.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use tilecache_core::{config::TRANSFER_USAGE, TransferConfig};

use super::usage_exit;

/// Arguments shared by `tilecache import` and `tilecache export`.
#[derive(Args, Debug)]
pub struct TransferArgs {
    /// -db cache.db {[-flipY | -noFlipY] -dir dir}
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,
}

#[derive(Tabled)]
struct TransferRow {
    #[tabled(rename = "layer")]
    layer: String,
    #[tabled(rename = "tiles")]
    tiles: usize,
    #[tabled(rename = "skipped")]
    skipped: usize,
}

impl TransferArgs {
    pub fn run_import(self) -> Result<()> {
        let config = self.parse("import");
        let reports = tilecache_files::import(&config)
            .with_context(|| format!("import into {} failed", config.database.display()))?;
        print_rows(
            "imported",
            reports.into_iter().map(|(layer, r)| TransferRow {
                layer: layer.to_string(),
                tiles: r.imported,
                skipped: r.skipped,
            }),
        );
        Ok(())
    }

    pub fn run_export(self) -> Result<()> {
        let config = self.parse("export");
        let reports = tilecache_files::export(&config)
            .with_context(|| format!("export from {} failed", config.database.display()))?;
        print_rows(
            "exported",
            reports.into_iter().map(|(layer, r)| TransferRow {
                layer: layer.to_string(),
                tiles: r.exported,
                skipped: r.skipped,
            }),
        );
        Ok(())
    }

    fn parse(self, command: &str) -> TransferConfig {
        TransferConfig::from_args(self.args)
            .unwrap_or_else(|err| usage_exit(command, TRANSFER_USAGE, &err))
    }
}

fn print_rows(verb: &str, rows: impl Iterator<Item = TransferRow>) {
    let rows: Vec<TransferRow> = rows.collect();
    if rows.is_empty() {
        println!("No directories requested.");
        return;
    }
    let total: usize = rows.iter().map(|r| r.tiles).sum();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("{} {total} tiles {verb}", "✓".green());
}
