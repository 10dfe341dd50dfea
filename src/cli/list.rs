//! `recipe-audit list`: presence table of recipe files.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::{OutputFormat, RunContext, recipe_filter};
use crate::probe::{self, Presence};
use crate::utils::list_recipes;

#[derive(Args)]
pub struct ListCommand {
    /// Only list recipes whose directory name matches this glob
    #[arg(long, value_name = "GLOB")]
    pub filter: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct ListEntry {
    name: String,
    #[serde(flatten)]
    presence: Presence,
    scripts: usize,
}

impl ListCommand {
    pub fn execute(self, context: &RunContext) -> Result<()> {
        let root = &context.config.aggregate_dir;
        let filter = recipe_filter(self.filter.as_deref())?;
        let names = list_recipes(root, filter.as_ref())?;

        let entries: Vec<ListEntry> = names
            .into_iter()
            .map(|name| {
                let presence = probe::probe(root, &name);
                ListEntry {
                    scripts: presence.script_count(),
                    name,
                    presence,
                }
            })
            .collect();

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
            OutputFormat::Text => print_table(&entries),
        }
        Ok(())
    }
}

fn print_table(entries: &[ListEntry]) {
    if entries.is_empty() {
        println!("No recipes found.");
        return;
    }

    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0).max("Recipe".len());
    println!(
        "{:<width$}  {:^9}  {:^11}  {:^11}  {:^12}",
        "Recipe".bold(),
        "meta.yaml".bold(),
        "run_test.sh".bold(),
        "run_test.py".bold(),
        "run_test.bat".bold()
    );
    for entry in entries {
        println!(
            "{:<width$}  {:^9}  {:^11}  {:^11}  {:^12}",
            entry.name,
            mark(entry.presence.meta_yaml),
            mark(entry.presence.run_test_sh),
            mark(entry.presence.run_test_py),
            mark(entry.presence.run_test_bat)
        );
    }
    println!("\n{} recipe(s)", entries.len());
}

fn mark(present: bool) -> colored::ColoredString {
    if present {
        "✓".green()
    } else {
        "✗".red()
    }
}
