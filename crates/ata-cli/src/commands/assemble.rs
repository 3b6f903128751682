//! The `ata assemble` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use ata_core::engine::{Assembler, AssemblyObserver};
use ata_core::formulation::FormulationStats;
use ata_core::lp_format::write_lp_file;
use ata_core::parser::validate_pool;
use ata_core::report::AssemblyReport;
use ata_core::traits::SolverOutcome;
use ata_solver::MicroLpSolver;

use super::load_inputs;

/// Console progress reporter.
struct ConsoleReporter;

impl AssemblyObserver for ConsoleReporter {
    fn on_formulated(&self, stats: &FormulationStats) {
        eprintln!(
            "  Model: {} variables ({} binary), {} constraints",
            stats.variables, stats.binary_variables, stats.constraints
        );
    }

    fn on_solved(&self, solver: &str, outcome: &SolverOutcome, elapsed: Duration) {
        eprintln!(
            "  Solved with {solver}: {} ({:.2}s)",
            outcome.status,
            elapsed.as_secs_f64()
        );
    }
}

pub fn execute(
    items: PathBuf,
    config_path: Option<PathBuf>,
    forms: Option<usize>,
    items_per_form: Option<usize>,
    output: PathBuf,
    format: String,
    lp: Option<PathBuf>,
) -> Result<()> {
    let formats: Vec<&str> = if format == "all" {
        vec!["table", "json"]
    } else {
        format.split(',').map(str::trim).collect()
    };
    if let Some(bad) = formats.iter().find(|f| !matches!(**f, "table" | "json")) {
        anyhow::bail!("unknown format '{bad}' (expected table, json or all)");
    }

    let (pool, mut config) = load_inputs(&items, config_path.as_ref())?;
    if let Some(n) = forms {
        config.num_forms = n;
    }
    if let Some(n) = items_per_form {
        config.items_per_form = n;
    }

    for w in validate_pool(&pool, &config) {
        match &w.item_id {
            Some(id) => eprintln!("  [{id}] WARNING: {}", w.message),
            None => eprintln!("  WARNING: {}", w.message),
        }
    }

    eprintln!(
        "ata v{} - Assembling {} forms x {} items from {} items",
        env!("CARGO_PKG_VERSION"),
        config.num_forms,
        config.items_per_form,
        pool.len()
    );

    let assembler = Assembler::new(Arc::new(MicroLpSolver::new()), config);

    let report = match &lp {
        Some(lp_path) => {
            let (matrix, formulation) = assembler.formulate(&pool)?;
            write_lp_file(&formulation, lp_path)?;
            eprintln!("LP model: {}", lp_path.display());
            assembler.run_formulated(&pool, &matrix, &formulation, &ConsoleReporter)?
        }
        None => assembler.run(&pool, &ConsoleReporter)?,
    };

    for fmt in &formats {
        match *fmt {
            "table" => print_summary(&report),
            "json" => {
                let timestamp = report.created_at.format("%Y-%m-%dT%H%M%S");
                let path = output.join(format!("assembly-{timestamp}.json"));
                report.save_json(&path)?;
                eprintln!("Results saved to: {}", path.display());
            }
            _ => {}
        }
    }

    Ok(())
}

fn print_summary(report: &AssemblyReport) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    let mut header = vec!["Form".to_string(), "Items".to_string()];
    if let Some(first) = report.forms.first() {
        header.extend(
            first
                .information
                .iter()
                .map(|level| format!("I({:+.2}) / target", level.theta)),
        );
    }
    header.push("Categories".to_string());
    table.set_header(header);

    for form in &report.forms {
        let mut row = vec![
            Cell::new(form.form),
            Cell::new(form.item_ids.join(", ")),
        ];
        row.extend(
            form.information
                .iter()
                .map(|level| Cell::new(format!("{:.3} / {:.3}", level.achieved, level.target))),
        );
        let counts: Vec<String> = form.category_counts.iter().map(|c| c.to_string()).collect();
        row.push(Cell::new(counts.join("/")));
        table.add_row(row);
    }

    println!("{table}");
    println!(
        "Status: {}  deviation: {:.4}  worst form deviation: {:.4}",
        report.status, report.deviation, report.worst_deviation
    );
}
