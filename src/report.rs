//! Final per-wallet report: console table, CSV and JSON exports.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::domain::RunResult;
use crate::error::Result;

/// One table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct ReportRow {
    #[tabled(rename = "Wallet")]
    pub wallet: String,
    #[tabled(rename = "Streak")]
    pub streak: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Rewards")]
    pub rewards: String,
}

impl From<&RunResult> for ReportRow {
    fn from(result: &RunResult) -> Self {
        Self {
            wallet: result.address.clone(),
            streak: result.streak_label(),
            status: result.status.label().to_string(),
            rewards: result.reward.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Report {
    results: Vec<RunResult>,
}

impl Report {
    pub fn new(results: Vec<RunResult>) -> Self {
        Self { results }
    }

    pub fn rows(&self) -> Vec<ReportRow> {
        self.results.iter().map(ReportRow::from).collect()
    }

    pub fn render_table(&self) -> String {
        if self.results.is_empty() {
            return "(no wallets)".to_string();
        }
        let mut table = Table::new(self.rows());
        table.with(Style::modern());
        table.to_string()
    }

    /// Wallet count per status label
    pub fn summary(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for result in &self.results {
            *counts.entry(result.status.label()).or_insert(0) += 1;
        }
        counts
    }

    /// `address,streak,status,reward`; unknown streak is an empty field
    pub fn to_csv(&self) -> String {
        let mut out = String::from("address,streak,status,reward\n");
        for r in &self.results {
            let streak = r.streak.map(|s| s.to_string()).unwrap_or_default();
            out.push_str(&format!(
                "{},{},{},{}\n",
                csv_field(&r.address),
                streak,
                csv_field(r.status.label()),
                csv_field(&r.reward)
            ));
        }
        out
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = BufWriter::new(File::create(path)?);
        file.write_all(self.to_csv().as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut file, &self.results)?;
        writeln!(file)?;
        file.flush()?;
        Ok(())
    }
}

/// Quote a field when it holds a separator, a quote or a line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
