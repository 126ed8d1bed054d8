use std::path::{Path, PathBuf};

use clap::Parser;
use panel_cutting::job::{Job, Report};
use panel_cutting::{PanelShape, SearchError, Solution};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "panel_cutting",
    about = "Cheapest way to buy and cut sheet stock into the panels you want"
)]
struct Cli {
    /// Job file (JSON) with the supplier, the wanted panels and an optional budget
    #[arg(long)]
    job: PathBuf,

    /// Stop after expanding this many search states
    #[arg(long)]
    max_expanded: Option<usize>,

    /// Stop after this many milliseconds
    #[arg(long)]
    time_limit_ms: Option<u64>,

    /// Print the full report as JSON instead of the summary
    #[arg(long)]
    json: bool,

    /// Log search progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn load_job(path: &Path) -> Result<Job, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid job {}: {}", path.display(), e))
}

fn print_summary(solution: &Solution) {
    for (i, sheet) in solution.bought().iter().enumerate() {
        println!(
            "Sheet {}: {} {} ({})",
            i + 1,
            sheet.rect(),
            sheet.available().label(),
            sheet.cost()
        );
        for f in solution
            .finished()
            .iter()
            .filter(|f| f.panel().progenitor().id() == sheet.id())
        {
            let flip = if f.want().is_flipped() { " [flipped]" } else { "" };
            println!(
                "  {} {} @ ({}, {}){}",
                f.label(),
                f.rect(),
                f.panel().x(),
                f.panel().y(),
                flip
            );
        }
        println!();
    }

    println!(
        "Summary: {} sheet{} used, {} cut{}, {} total, {:.1}% waste",
        solution.sheet_count(),
        if solution.sheet_count() == 1 { "" } else { "s" },
        solution.cuts(),
        if solution.cuts() == 1 { "" } else { "s" },
        solution.cost(),
        solution.total_waste_percent(),
    );
    if !solution.is_exhaustive() {
        println!(
            "Search stopped after {} states; a cheaper pattern may exist.",
            solution.stats.expanded
        );
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let mut job = load_job(&cli.job).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    if cli.max_expanded.is_some() {
        job.budget.max_expanded = cli.max_expanded;
    }
    if cli.time_limit_ms.is_some() {
        job.budget.time_limit_ms = cli.time_limit_ms;
    }

    let solver = job.solver().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let started = std::time::Instant::now();
    let solution = match solver.solve() {
        Ok(solution) => solution,
        Err(e @ SearchError::BudgetExceeded { .. }) => {
            eprintln!(
                "Error: {} (after {:?}); raise --max-expanded or --time-limit-ms",
                e,
                started.elapsed()
            );
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    if cli.json {
        let report = Report::from(&solution);
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        print_summary(&solution);
    }
}
