use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use ccval::assemble::{AssembleOptions, DEFAULT_CATEGORY_KEY, NestedAnnualMap, assemble_annual_series};
use ccval::config::{RecipeLoader, ResolvedRecipe};
use ccval::error::CcvalError;
use ccval::index::{DEFAULT_BASE_DIR, FileQuery, find_matching_files};
use ccval::output::{FilesResult, JsonOutput};
use ccval::resolver::{StashLookup, load_records, try_extract};

#[derive(Parser)]
#[command(name = "ccval")]
#[command(about = "Locate, identify and assemble climate model output")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List dated model dumps in year/month order")]
    Files(FilesArgs),
    #[command(about = "Select loaded records matching a variable identifier")]
    Resolve(ResolveArgs),
    #[command(about = "Assemble an annual means JSON file into a dense dataset")]
    Assemble(AssembleArgs),
}

#[derive(Args)]
struct FilesArgs {
    /// Experiment id; every recipe experiment when omitted
    experiment: Option<String>,

    #[arg(long, default_value = "a")]
    model: String,

    #[arg(long)]
    run: String,

    #[arg(long)]
    start_year: Option<i32>,

    #[arg(long)]
    end_year: Option<i32>,

    #[arg(long)]
    base_dir: Option<PathBuf>,

    #[arg(long)]
    recipe: Option<String>,
}

#[derive(Args)]
struct ResolveArgs {
    /// JSON array of loaded variable records
    records: PathBuf,

    /// Short name, numeric STASH code or MSI
    identifier: String,

    #[arg(long)]
    recipe: Option<String>,
}

#[derive(Args)]
struct AssembleArgs {
    /// Annual means JSON, `{expt: {region: {var: series}}}`
    input: PathBuf,

    #[arg(long, default_value = DEFAULT_CATEGORY_KEY)]
    category_key: String,

    #[arg(long, default_value = "pft")]
    category_axis: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<CcvalError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CcvalError) -> u8 {
    match error {
        CcvalError::MissingConfig
        | CcvalError::ConfigRead(_)
        | CcvalError::AnnualRead(_)
        | CcvalError::RecordsRead(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Files(args) => run_files(args),
        Commands::Resolve(args) => run_resolve(args),
        Commands::Assemble(args) => run_assemble(args),
    }
}

fn load_recipe(path: Option<&str>) -> miette::Result<Option<ResolvedRecipe>> {
    match path {
        Some(path) => Ok(Some(RecipeLoader::resolve(Some(path))?)),
        None => Ok(None),
    }
}

fn run_files(args: FilesArgs) -> miette::Result<()> {
    let recipe = load_recipe(args.recipe.as_deref())?;

    let experiments = match (&args.experiment, &recipe) {
        (Some(experiment), _) => vec![experiment.clone()],
        (None, Some(recipe)) => recipe.expts.clone(),
        (None, None) => {
            return Err(miette::Report::msg(
                "experiment required (or pass --recipe)",
            ));
        }
    };
    let base_dir = args
        .base_dir
        .clone()
        .or_else(|| {
            recipe
                .as_ref()
                .map(|recipe| recipe.paths.raw_root.clone().into_std_path_buf())
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_DIR));

    let results = experiments
        .into_iter()
        .map(|experiment| {
            let query = FileQuery::new(&experiment, &args.model, &args.run)
                .with_years(args.start_year, args.end_year)
                .with_base_dir(base_dir.clone());
            FilesResult {
                files: find_matching_files(&query),
                experiment,
            }
        })
        .collect::<Vec<_>>();

    JsonOutput::print_files(&results).into_diagnostic()?;
    Ok(())
}

fn run_resolve(args: ResolveArgs) -> miette::Result<()> {
    let recipe = load_recipe(args.recipe.as_deref())?;
    let records = load_records(&args.records)?;

    let lookup = recipe
        .as_ref()
        .map(|recipe| &recipe.variables as &dyn StashLookup);
    let selected = try_extract(&records, args.identifier.as_str(), lookup);
    tracing::info!("{} of {} records matched {}", selected.len(), records.len(), args.identifier);

    let json = JsonOutput::to_json(&selected).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

fn run_assemble(args: AssembleArgs) -> miette::Result<()> {
    let annual = NestedAnnualMap::load(&args.input, &args.category_key)?;
    let options = AssembleOptions {
        category_axis: args.category_axis,
        category_key: args.category_key,
        ..AssembleOptions::default()
    };
    let dataset = assemble_annual_series(&annual, &options);
    JsonOutput::print_dataset(&dataset).into_diagnostic()?;
    Ok(())
}
