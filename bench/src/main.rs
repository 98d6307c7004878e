//! Stencil memory bandwidth benchmark
//!
//! Runs one of the stencil variants on a configurable domain and reports
//! timings, achieved bandwidth and hardware counter statistics, either for a
//! single configuration or swept over domain sizes or tile sizes.

mod table;

use clap::{Parser, ValueEnum};
use compute::{harness::ALL_STENCILS, BenchResult, Metric};
use compute_selector::SelectorArgs;
use eyre::{ensure, Result};
use indicatif::ProgressBar;
use log::{info, warn};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    iter,
    path::PathBuf,
};
use table::Table;

/// Measure the memory bandwidth achieved by stencil computations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Variant, precision and domain
    #[command(flatten)]
    setup: SelectorArgs,

    /// Stencil to run, or "all" for the whole family of the variant
    #[arg(long, env, default_value = ALL_STENCILS)]
    stencil: String,

    /// Number of timed repetitions of each stencil
    #[arg(long, env, default_value_t = 20)]
    runs: usize,

    /// What to measure
    #[arg(long, env, value_enum, default_value_t)]
    run_mode: RunMode,

    /// Quantity reported by the sweeping run modes
    #[arg(long, env, value_enum, default_value_t)]
    metric: Metric,

    /// Smallest domain or block size of the sweeping run modes
    #[arg(long, env, default_value_t = 1)]
    min_size: usize,

    /// Path to the results output file, standard output by default
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not print the configuration before the results
    #[arg(long)]
    no_header: bool,
}

/// Benchmark campaigns
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, ValueEnum)]
enum RunMode {
    /// Full statistics for the configured domain
    #[default]
    SingleSize,

    /// Chosen metric for square i/j domains of growing size
    IjScaling,

    /// Chosen metric for every pair of i/j block sizes
    BlocksizeScan,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    if !args.no_header {
        write_header(&mut out, &args)?;
    }

    let results = match args.run_mode {
        RunMode::SingleSize => single_size(&args)?,
        RunMode::IjScaling => ij_scaling(&args)?,
        RunMode::BlocksizeScan => blocksize_scan(&args)?,
    };
    results.write(&mut out)?;
    out.flush()?;
    Ok(())
}

/// Describe every argument as comment lines
fn write_header(out: &mut impl Write, args: &Args) -> io::Result<()> {
    let SelectorArgs {
        variant,
        precision,
        domain,
        parallel,
    } = &args.setup;
    writeln!(out, "# variant: {variant}, precision: {precision}")?;
    writeln!(
        out,
        "# domain: {}x{}x{}, layout: {}-{}-{}, halo: {}, alignment: {}, rotating padding: {}",
        domain.i_size,
        domain.j_size,
        domain.k_size,
        domain.i_layout,
        domain.j_layout,
        domain.k_layout,
        domain.halo,
        domain.alignment,
        domain.rotating_padding
    )?;
    writeln!(
        out,
        "# threads: {}, blocksize: {}x{}",
        parallel.threads, parallel.i_blocksize, parallel.j_blocksize
    )?;
    writeln!(
        out,
        "# stencil: {}, runs: {}, run mode: {}, metric: {}, min size: {}",
        args.stencil,
        args.runs,
        value_name(args.run_mode),
        value_name(args.metric),
        args.min_size
    )?;
    let output = args.output.as_ref().map_or_else(
        || "stdout".into(),
        |path| path.display().to_string(),
    );
    writeln!(out, "# output: {output}")?;
    if args.run_mode != RunMode::SingleSize {
        writeln!(out, "# reported values: {}", args.metric.description())?;
    }
    Ok(())
}

/// Command-line spelling of an enumerated argument
fn value_name(value: impl ValueEnum) -> String {
    value
        .to_possible_value()
        .map(|value| value.get_name().to_owned())
        .unwrap_or_default()
}

/// Run the selected stencils once, with some setup
fn run(setup: &SelectorArgs, stencil: &str, runs: usize) -> Result<Vec<BenchResult>> {
    let mut benchmark = compute_selector::create(setup)?;
    let results = benchmark.run(stencil, runs)?;
    for result in results.iter().filter(|result| !result.verified) {
        warn!(
            "{} produced wrong results with {setup:?}",
            result.stencil
        );
    }
    Ok(results)
}

/// Sizes from `min` that double while they remain accepted by `keep`
fn doubling(min: usize, keep: impl Fn(usize) -> bool) -> impl Iterator<Item = usize> {
    iter::successors(Some(min), |size| size.checked_mul(2)).take_while(move |&size| keep(size))
}

/// Full statistics of the configured run
fn single_size(args: &Args) -> Result<Table> {
    let results = run(&args.setup, &args.stencil, args.runs)?;
    Ok(table::results(&results))
}

/// Metric for growing square domains, one row per stencil and one column
/// per size
fn ij_scaling(args: &Args) -> Result<Table> {
    let domain = &args.setup.domain;
    ensure!(
        domain.i_size == domain.j_size,
        "ij-scaling needs i-size ({}) and j-size ({}) to be equal",
        domain.i_size,
        domain.j_size
    );
    ensure!(args.min_size >= 1, "min-size must be at least 1");

    // Sizes are swept including the halo, points where the halo alone
    // exceeds the size are skipped
    let halos = 2 * domain.halo;
    let sizes = doubling(args.min_size, |size| size <= domain.i_size + halos)
        .filter(|&size| size > halos)
        .map(|size| size - halos)
        .collect::<Vec<_>>();
    info!("Sweeping over i/j sizes {sizes:?}");

    let progress = ProgressBar::new(sizes.len() as u64);
    let mut rows = Vec::<(String, Vec<String>)>::new();
    for &size in &sizes {
        let mut setup = args.setup.clone();
        setup.domain.i_size = size;
        setup.domain.j_size = size;
        let results = run(&setup, &args.stencil, args.runs)?;
        if rows.is_empty() {
            rows = (results.iter())
                .map(|result| (result.stencil.to_owned(), Vec::new()))
                .collect();
        }
        for ((_, cells), result) in rows.iter_mut().zip(&results) {
            cells.push(table::metric_cell(args.metric, result));
        }
        progress.inc(1);
    }
    progress.finish();

    let mut sweep =
        Table::new(iter::once("stencil".to_owned()).chain(sizes.iter().map(ToString::to_string)));
    for (stencil, cells) in rows {
        sweep.push(iter::once(stencil).chain(cells));
    }
    Ok(sweep)
}

/// Metric for every pair of block sizes, one row per i block size and one
/// column per j block size
fn blocksize_scan(args: &Args) -> Result<Table> {
    ensure!(
        args.stencil != ALL_STENCILS,
        "blocksize-scan needs a single stencil, not \"{ALL_STENCILS}\""
    );
    ensure!(args.min_size >= 1, "min-size must be at least 1");
    if !args.setup.variant.is_blocked() {
        warn!(
            "{} does not use block sizes, all scan points will be alike",
            args.setup.variant
        );
    }

    let domain = &args.setup.domain;
    let i_blocks = doubling(args.min_size, |block| block < 2 * domain.i_size).collect::<Vec<_>>();
    let j_blocks = doubling(args.min_size, |block| block < 2 * domain.j_size).collect::<Vec<_>>();
    info!("Sweeping over i block sizes {i_blocks:?} and j block sizes {j_blocks:?}");

    let mut sweep = Table::new(
        iter::once("i\\j".to_owned()).chain(j_blocks.iter().map(ToString::to_string)),
    );
    let progress = ProgressBar::new((i_blocks.len() * j_blocks.len()) as u64);
    for &i_block in &i_blocks {
        let mut row = vec![i_block.to_string()];
        for &j_block in &j_blocks {
            let mut setup = args.setup.clone();
            setup.parallel.i_blocksize = i_block;
            setup.parallel.j_blocksize = j_block;
            let results = run(&setup, &args.stencil, args.runs)?;
            row.extend(
                (results.iter()).map(|result| table::metric_cell(args.metric, result)),
            );
            progress.inc(1);
        }
        sweep.push(row);
    }
    progress.finish();
    Ok(sweep)
}
