mod error;
mod export;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use bf_blocks::BlockRegistry;
use bf_project::Assembled;
use bf_sim::{Executor, IntegratorType, RunState};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::{CliError, CliResult};

#[derive(Parser)]
#[command(name = "bf-cli")]
#[command(about = "BlockFlow CLI - block-diagram simulation tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a diagram file and compile the diagram
    Validate {
        /// Path to the diagram file (YAML or JSON)
        diagram_path: PathBuf,
    },
    /// Print a table of blocks and wires
    Report {
        /// Path to the diagram file (YAML or JSON)
        diagram_path: PathBuf,
    },
    /// Export the diagram as Graphviz DOT
    Dot {
        /// Path to the diagram file (YAML or JSON)
        diagram_path: PathBuf,
        /// Output DOT file (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a simulation and export sink data
    Run {
        /// Path to the diagram file (YAML or JSON)
        diagram_path: PathBuf,
        /// Time step in seconds (overrides the file)
        #[arg(long)]
        dt: Option<f64>,
        /// End time in seconds (overrides the file)
        #[arg(long)]
        t_end: Option<f64>,
        /// Integration method (overrides the file)
        #[arg(long, value_enum)]
        integrator: Option<IntegratorArg>,
        /// Upper bound on the number of steps
        #[arg(long)]
        max_steps: Option<usize>,
        /// Keep every N-th time point
        #[arg(long)]
        record_every: Option<usize>,
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
        /// Output file (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum IntegratorArg {
    Rk4,
    Euler,
}

impl From<IntegratorArg> for IntegratorType {
    fn from(arg: IntegratorArg) -> Self {
        match arg {
            IntegratorArg::Rk4 => IntegratorType::Rk4,
            IntegratorArg::Euler => IntegratorType::ForwardEuler,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

struct RunArgs {
    dt: Option<f64>,
    t_end: Option<f64>,
    integrator: Option<IntegratorArg>,
    max_steps: Option<usize>,
    record_every: Option<usize>,
    format: Format,
    output: Option<PathBuf>,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { diagram_path } => cmd_validate(&diagram_path),
        Commands::Report { diagram_path } => cmd_report(&diagram_path),
        Commands::Dot {
            diagram_path,
            output,
        } => cmd_dot(&diagram_path, output.as_deref()),
        Commands::Run {
            diagram_path,
            dt,
            t_end,
            integrator,
            max_steps,
            record_every,
            format,
            output,
        } => cmd_run(
            &diagram_path,
            RunArgs {
                dt,
                t_end,
                integrator,
                max_steps,
                record_every,
                format,
                output,
            },
        ),
    }
}

fn assemble(path: &Path) -> CliResult<Assembled> {
    let file = bf_project::load(path)?;
    let registry = BlockRegistry::with_builtins();
    Ok(bf_project::build_diagram(&file, &registry)?)
}

fn cmd_validate(path: &Path) -> CliResult<()> {
    println!("Validating diagram: {}", path.display());
    let built = assemble(path)?;
    let plan = built.diagram.compile()?;
    println!(
        "✓ Diagram is valid ({} blocks, {} wires, {} states)",
        built.diagram.blocks().len(),
        built.diagram.wires().len(),
        plan.nstates()
    );
    Ok(())
}

fn cmd_report(path: &Path) -> CliResult<()> {
    let built = assemble(path)?;
    // An uncompilable diagram still gets a report, just without execution order.
    let report = match built.diagram.compile() {
        Ok(plan) => plan.report(&built.diagram),
        Err(errs) => {
            eprintln!("{errs}");
            built.diagram.report()
        }
    };
    println!("{report}");
    Ok(())
}

fn cmd_dot(path: &Path, output: Option<&Path>) -> CliResult<()> {
    let built = assemble(path)?;
    match output {
        Some(out) => {
            built.diagram.dotfile(out)?;
            println!("✓ Wrote {}", out.display());
        }
        None => print!("{}", built.diagram.to_dot()),
    }
    Ok(())
}

fn cmd_run(path: &Path, args: RunArgs) -> CliResult<()> {
    let Assembled {
        mut diagram,
        sim: mut opts,
        ..
    } = assemble(path)?;

    if let Some(dt) = args.dt {
        opts.dt = dt;
    }
    if let Some(t_end) = args.t_end {
        opts.t_end = t_end;
    }
    if let Some(integrator) = args.integrator {
        opts.integrator = integrator.into();
    }
    if let Some(max_steps) = args.max_steps {
        opts.max_steps = max_steps;
    }
    if let Some(record_every) = args.record_every {
        opts.record_every = record_every;
    }

    eprintln!("Running simulation: {}", path.display());
    eprintln!(
        "  dt = {} s, t_end = {} s, integrator = {:?}",
        opts.dt, opts.t_end, opts.integrator
    );

    let plan = diagram.compile()?;
    let start = Instant::now();
    let mut exec = Executor::new(&mut diagram, plan, opts)?;
    let record = exec.run_to_end()?;
    let elapsed = start.elapsed().as_secs_f64();

    if exec.state() != RunState::Completed {
        eprintln!("! Run ended early ({})", exec.state().as_str());
    }
    info!(steps = record.steps, elapsed_s = elapsed, "simulation finished");
    eprintln!(
        "✓ Simulation completed: {} steps, {} recorded, {:.3}s",
        record.steps,
        record.t.len(),
        elapsed
    );

    match &args.output {
        Some(out) => {
            let file = File::create(out).map_err(|source| CliError::Write {
                path: out.clone(),
                source,
            })?;
            write_record(&record, args.format, BufWriter::new(file))?;
            eprintln!("✓ Wrote {}", out.display());
        }
        None => write_record(&record, args.format, io::stdout().lock())?,
    }
    Ok(())
}

fn write_record<W: Write>(record: &bf_sim::RunRecord, format: Format, out: W) -> CliResult<()> {
    match format {
        Format::Csv => export::write_csv(record, out)?,
        Format::Json => export::write_json(record, out)?,
    }
    Ok(())
}
