use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use dats::{
    Config, Ensemble, Finals, Molecule, Role, Workflow, collection,
    config::QueueKind,
    die,
    journal::{Journal, LOG_FILE},
    monitor::SystemClock,
    workflow::rate_table,
};
use qcjobs::{
    Procedure, ProgramKind, Queue,
    queue::{Local, Slurm},
};

const DEFAULT_CONFIG: &str = "dats.toml";

/// automated transition-state searches and rate constants for OH reactions
#[derive(Parser, Debug)]
#[command(author, about, long_about = None)]
struct Args {
    /// XYZ structures to start from, JSON collections to resume, or, with
    /// --info, collections and log files to print
    inputs: Vec<PathBuf>,

    /// Configuration file. When the default file does not exist the default
    /// settings are used.
    #[arg(short, long, default_value_t = String::from(DEFAULT_CONFIG))]
    config: String,

    /// Build the candidate directories and their initial collections, then
    /// exit. Defaults to false.
    #[arg(long, default_value_t = false)]
    init: bool,

    /// Print the molecules in the input collections or log files and exit.
    /// Defaults to false.
    #[arg(long, default_value_t = false)]
    info: bool,

    /// Compute the rate constants from the final collections in the current
    /// directory and exit. Defaults to false.
    #[arg(long, default_value_t = false)]
    rate: bool,

    /// Set the maximum number of threads to use. Defaults to 0, which means to
    /// use as many threads as there are CPUS.
    #[arg(short, long, default_value_t = 0)]
    threads: usize,

    /// Serialize the configuration to JSON and exit.
    #[arg(short, long, default_value_t = false, hide = true)]
    json: bool,
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    if path == DEFAULT_CONFIG && !Path::new(path).exists() {
        log::info!("no {DEFAULT_CONFIG} found, using the default settings");
        return Ok(Config::default());
    }
    Config::load(path).with_context(|| format!("loading {path}"))
}

/// a molecule holding whatever `path` reports. `.out` files are read as ORCA
/// output, everything else as Gaussian
fn read_log(path: &Path, config: &Config) -> anyhow::Result<Molecule> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let program = match path.extension().and_then(|e| e.to_str()) {
        Some("out") => ProgramKind::Orca,
        _ => ProgramKind::Gaussian,
    };
    let summary = program.program().parse_log(&contents, Procedure::Opt)?;
    let Some(atoms) = summary.atoms.clone() else {
        bail!("no geometry in {}", path.display());
    };
    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("log");
    let dir = path.parent().unwrap_or(Path::new("."));
    let mult = summary.multiplicity.unwrap_or(1);
    let mut mol = Molecule::new(name, dir, atoms, mult, Role::Reactant);
    mol.program = program;
    mol.active_site = config.cho;
    mol.apply_summary(summary, Procedure::Opt, config.temperature)?;
    Ok(mol)
}

fn info(args: &Args, config: &Config) -> anyhow::Result<()> {
    let mut logs = Vec::new();
    for input in &args.inputs {
        match input.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                println!("{}:", input.display());
                print!("{}", collection::summarize(&collection::load(input)?));
            }
            Some("log" | "out") => logs.push(read_log(input, config)?),
            _ => bail!("cannot print {}", input.display()),
        }
    }
    if !logs.is_empty() {
        print!("{}", collection::summarize(&logs));
    }
    Ok(())
}

fn rate(root: &Path, config: &Config) -> anyhow::Result<()> {
    let finals = Finals::discover(root)?;
    if finals.is_empty() {
        bail!("no final collections in {}", root.display());
    }
    for (base, f) in &finals {
        print!("{}", rate_table(base, &f.rates(config.temperature)));
    }
    Ok(())
}

fn run<Q: Queue>(
    queue: &Q,
    config: &Config,
    args: &Args,
    root: &Path,
) -> anyhow::Result<()> {
    let clock = SystemClock::default();
    let journal = Journal::new(root.join(LOG_FILE))?;
    let wf = Workflow::new(queue, config, &clock, root)
        .with_journal(Some(journal.sender()));

    let mut ensembles = Vec::new();
    for input in &args.inputs {
        match input.extension().and_then(|e| e.to_str()) {
            Some("xyz") => ensembles.extend(wf.initialize(input)?),
            Some("json") => ensembles.push(Ensemble::load(input)?),
            _ => bail!("expected an XYZ or JSON input, got {}", input.display()),
        }
    }
    journal.send(format!(
        "{} ensembles for a {} reaction",
        ensembles.len(),
        config.reaction
    ));

    if args.init {
        for ens in &ensembles {
            println!("{:<24} {}", ens.name, ens.dir.display());
        }
        drop(wf);
        journal.shutdown();
        return Ok(());
    }

    let finals = wf.execute(ensembles);
    drop(wf);
    journal.shutdown();
    for (base, f) in &finals? {
        if !f.transition_states.is_empty() {
            print!("{}", rate_table(base, &f.rates(config.temperature)));
        }
    }
    println!("normal termination of dats");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args.config)?;
    if args.json {
        match serde_json::to_string(&config) {
            Ok(s) => println!("{s}"),
            Err(e) => die!("failed to serialize {} with {e}", args.config),
        }
        return Ok(());
    }
    let root = std::env::current_dir()?;
    if args.info {
        return info(&args, &config);
    }
    if args.rate {
        return rate(&root, &config);
    }
    if args.inputs.is_empty() {
        die!("nothing to do. give an XYZ structure or a collection to resume");
    }
    println!("PID: {}", std::process::id());
    qcjobs::max_threads(args.threads);

    let template = config.queue_template.clone();
    match config.queue {
        QueueKind::Slurm => run(&Slurm::new(template), &config, &args, &root),
        QueueKind::Local => run(&Local::new(template), &config, &args, &root),
    }
}
