mod loader;
mod logic;
mod store;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use loader::FileLoader;
use logic::{
    GameplayStrategy, LogicTester, ScenarioResult, SimulationPlan, resolve_seed_inputs,
};
use util::split_csv;

#[derive(Debug, Parser)]
#[command(name = "cashloop-tester", version = "0.1.0")]
#[command(about = "Headless automated play for the Cashloop rules engine")]
struct Args {
    /// Seeds to run (comma-separated integers or ranges like 1..10)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Strategies to play (comma-separated, or "all")
    #[arg(long, default_value = "all")]
    strategies: String,

    /// Rounds to play per run
    #[arg(long, default_value_t = 3)]
    rounds: u32,

    /// Turn cap per round before the run gives up on winning it
    #[arg(long, default_value_t = 5_000)]
    max_turns: u32,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Rules JSON overriding the built-in economy and board
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Building catalog JSON overriding the built-in one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Quiz bank JSON overriding the built-in chapter questions
    #[arg(long)]
    quizzes: Option<PathBuf>,

    /// Keep profiles on disk under this directory so reruns resume them
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Skip the chapter quizzes between rounds
    #[arg(long)]
    no_quizzes: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn plan(&self) -> SimulationPlan {
        SimulationPlan {
            rounds: self.rounds,
            max_turns: self.max_turns,
            take_quizzes: !self.no_quizzes,
        }
    }

    fn loader(&self) -> FileLoader {
        FileLoader {
            rules: self.rules.clone(),
            catalog: self.catalog.clone(),
            quizzes: self.quizzes.clone(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    announce_banner();

    let start_time = Instant::now();
    let strategies = expand_strategies(&args.strategies)?;
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    log::info!(
        "running {} strategies over {} seeds",
        strategies.len(),
        seeds.len()
    );

    let tester = LogicTester::new(
        args.loader(),
        args.save_dir.clone(),
        args.plan(),
        args.verbose,
    );
    let results = tester.run_all(&strategies, &seeds);

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }
    Ok(())
}

fn announce_banner() {
    println!("{}", "🎮 Cashloop Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_strategies(raw: &str) -> Result<Vec<GameplayStrategy>> {
    let tokens = split_csv(raw);
    if tokens.is_empty() || tokens.iter().any(|t| t.eq_ignore_ascii_case("all")) {
        return Ok(GameplayStrategy::ALL.to_vec());
    }
    let mut strategies = Vec::new();
    for token in tokens {
        let strategy = token
            .parse::<GameplayStrategy>()
            .map_err(anyhow::Error::msg)?;
        if !strategies.contains(&strategy) {
            strategies.push(strategy);
        }
    }
    Ok(strategies)
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut output_target, results)?,
        "markdown" => logic::reports::generate_markdown_report(&mut output_target, results)?,
        _ => logic::reports::generate_console_report(
            &mut output_target,
            results,
            start_time.elapsed(),
        )?,
    }

    if args.report == "console" {
        writeln!(&mut output_target)?;
        writeln!(
            &mut output_target,
            "🏁 Total time: {:?}",
            start_time.elapsed()
        )?;
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
