use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use raspi_recipe::Result;
use raspi_recipe::config::{self, GeneratorConfig};
use raspi_recipe::facts::FactBundle;
use raspi_recipe::generate;
use raspi_recipe::target::Target;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Raspberry Pi revision (1, 2, 3 or 4)
    revision: String,
    /// Debian release (buster, bullseye or bookworm)
    release: String,
    /// TOML config providing paths and mirror
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Master template [default: raspi_master.yaml]
    #[arg(short, long)]
    template: Option<PathBuf>,
    /// Directory the recipe is written to [default: .]
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Debian mirror used for the backports source
    #[arg(long)]
    mirror: Option<String>,
    /// Print the recipe instead of writing it
    #[arg(long)]
    stdout: bool,
    /// Print the resolved facts as JSON and exit
    #[arg(long, conflicts_with = "stdout")]
    print_facts: bool,
    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("E: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    // Validate before touching the filesystem.
    let target = Target::parse(&args.revision, &args.release)?;
    let cfg = load_config(args)?;

    if args.print_facts {
        let facts = FactBundle::resolve_with_mirror(target, cfg.mirror());
        println!("{}", raspi_recipe::util::to_json_pretty(&facts)?);
        return Ok(());
    }

    let recipe = generate::generate(target, &cfg)?;
    if args.stdout {
        std::io::stdout().lock().write_all(recipe.text.as_bytes())?;
        return Ok(());
    }
    generate::write_recipe(&recipe, &cfg.output_dir())?;
    Ok(())
}

fn load_config(args: &Args) -> Result<GeneratorConfig> {
    let mut cfg = match &args.config {
        Some(path) => GeneratorConfig::from_doc(&config::load(path)?)?,
        None => GeneratorConfig::default(),
    };
    if let Some(template) = &args.template {
        cfg.paths.template = template.display().to_string();
    }
    if let Some(dir) = &args.output_dir {
        cfg.paths.output_dir = dir.display().to_string();
    }
    if let Some(mirror) = &args.mirror {
        cfg.apt.mirror = mirror.clone();
    }
    Ok(cfg)
}
