// tickring-cli/src/main.rs

mod pump;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tickring_common::{
    write_ipc_snapshot, ColumnValues, Generation, GetContext, LongRingColumn, RingKind, RingTable, CONFIG,
};

#[derive(Parser)]
#[command(name = "tickring")]
#[command(about = "tickring: circular columnar storage with double-buffered generations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append capacity + 1 values to a Long ring and show the windows
    Demo {
        #[arg(short, long, default_value_t = 4)]
        capacity: usize,
    },

    /// Append in cycles while reader threads sum the previous generation
    Pump {
        /// Ring capacity (defaults to the configured capacity)
        #[arg(short, long)]
        capacity: Option<usize>,

        #[arg(long, default_value_t = 10)]
        cycles: u64,

        #[arg(short, long, default_value_t = 1024)]
        batch: usize,

        #[arg(short, long, default_value_t = 4)]
        readers: usize,
    },

    /// Load one number per line into a ring table and write it as Arrow IPC
    Snapshot {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Ring capacity (defaults to the configured capacity)
        #[arg(short, long)]
        capacity: Option<usize>,

        /// Rows per cycle; every full batch closes a cycle
        #[arg(short, long, default_value_t = 1024)]
        batch: usize,

        /// Write the previous generation instead of the current one
        #[arg(long)]
        previous: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Demo { capacity } => demo(capacity)?,

        Commands::Pump {
            capacity,
            cycles,
            batch,
            readers,
        } => {
            let capacity = capacity.unwrap_or(CONFIG.default_capacity);
            let report = pump::pump(capacity, cycles, batch, readers)?;
            for cycle in &report.cycles {
                println!(
                    "cycle {:>4}: +{} rows, previous {:?} sum {:.4}, added {:?} removed {:?}",
                    cycle.cycle,
                    cycle.appended,
                    cycle.previous_window,
                    cycle.previous_sum,
                    cycle.update.added,
                    cycle.update.removed
                );
            }
            println!("\n✅ Pump done:");
            println!("🔁 Cycles:          {}", report.cycles.len());
            println!("📥 Rows appended:   {}", report.total_appended);
            println!("🪟 Final window:    {:?}", report.final_window);
        }

        Commands::Snapshot {
            input,
            output,
            capacity,
            batch,
            previous,
        } => {
            let capacity = capacity.unwrap_or(CONFIG.default_capacity);
            let generation = if previous {
                Generation::Previous
            } else {
                Generation::Current
            };
            let table = load_table(&input, capacity, batch)?;
            let rows = write_ipc_snapshot(&table, generation, &output)?;
            println!("\n✅ Snapshot written:");
            println!("📄 File:            {}", output.display());
            println!("📊 Rows:            {}", rows);
            println!("🔁 Cycles closed:   {}", table.generation());
        }
    }

    Ok(())
}

fn demo(capacity: usize) -> Result<()> {
    let mut column = LongRingColumn::new(capacity)?;
    let values: Vec<i64> = (1..=capacity as i64 + 1).map(|v| v * 10).collect();
    column.append_slice(&values);

    let window = column.current().indices().context("ring is empty")?;
    println!("appended {:?}", values);
    println!("current window {:?}", window);
    println!("key 0 reads {} (null sentinel)", column.get(0));

    let first = (window.last - 2).max(window.first);
    let mut context = GetContext::new(capacity);
    let chunk = column.get_chunk(&mut context, first, window.last)?;
    println!(
        "get_chunk({}, {}) = {:?} ({})",
        first,
        window.last,
        &*chunk,
        if chunk.is_view() { "view" } else { "materialized" }
    );

    column.advance_generation();
    let next = (capacity as i64 + 2) * 10;
    column.append(next);
    println!("advanced generation, appended {}", next);
    println!(
        "previous window {:?}, current window {:?}",
        column.previous().indices(),
        column.current().indices()
    );
    println!(
        "get_prev({}) = {}, get({}) = {}",
        window.last,
        column.get_prev(window.last),
        window.last + 1,
        column.get(window.last + 1)
    );
    Ok(())
}

/// Reads the input in batches of `batch` rows. Each full batch is followed
/// by a cycle barrier, so the previous generation lags by the last batch.
fn load_table(input: &Path, capacity: usize, batch: usize) -> Result<RingTable> {
    let mut table = RingTable::new(&[("Line", RingKind::Long), ("Value", RingKind::Double)], capacity)?;
    let file = File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;

    let mut lines = Vec::with_capacity(batch);
    let mut values = Vec::with_capacity(batch);
    for (ix, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", input.display()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value: f64 = trimmed
            .parse()
            .with_context(|| format!("Line {}: '{}' is not a number", ix + 1, trimmed))?;
        lines.push(ix as i64 + 1);
        values.push(value);

        if values.len() == batch.max(1) {
            table.append(&[
                ColumnValues::Long(std::mem::take(&mut lines)),
                ColumnValues::Double(std::mem::take(&mut values)),
            ])?;
            table.end_cycle();
        }
    }
    table.append(&[ColumnValues::Long(lines), ColumnValues::Double(values)])?;
    Ok(table)
}
