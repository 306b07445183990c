use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use fnol_triage::{
    analytics::ClaimsOverview,
    config::Config,
    data::{load_claims, load_training_batch},
    ml::{bootstrap, ForestParams, HyperParameters, Predictor, Retrainer, TreeParams},
    models::PredictionRequest,
    registry::{HubArtifactStore, ModelRegistry},
    telemetry::init_tracing,
    AppError,
};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fnol-triage", version)]
#[command(about = "FNOL claims triage: analytics, ultimate cost prediction and model retraining", long_about = None)]
struct Cli {
    /// Directory holding the production model and versioned snapshots
    #[arg(long, env = "FNOL_MODELS_DIR")]
    models_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Portfolio KPIs and grouped summaries
    Overview {
        /// Claims CSV (defaults to data.claims_path)
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Predict the ultimate amount of a single claim
    Predict {
        #[arg(long)]
        claim_type: String,

        #[arg(long)]
        estimated_amount: f64,

        #[arg(long)]
        traffic: String,

        #[arg(long)]
        weather: String,

        #[arg(long)]
        vehicle_type: String,

        #[arg(long)]
        vehicle_year: f64,

        #[arg(long)]
        driver_age: f64,

        #[arg(long)]
        license_age: f64,
    },

    /// Evaluate a candidate on a labeled batch and promote it if it beats production
    Retrain {
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Save the current production model to the next versioned slot
    Snapshot,

    /// List versioned snapshots
    Versions,

    /// Fetch production artifacts from the hub into the local models directory
    Pull,

    /// Fit a first production model from a labeled batch
    Bootstrap {
        #[arg(short, long)]
        data: PathBuf,

        #[arg(long, value_enum, default_value = "random-forest")]
        family: Family,

        #[arg(long, default_value_t = 100)]
        n_trees: usize,

        #[arg(long)]
        max_depth: Option<u16>,

        /// Replace an existing production model
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Family {
    RandomForest,
    DecisionTree,
    Baseline,
}

fn main() {
    if let Err(err) = run() {
        match err.downcast_ref::<AppError>() {
            Some(app) => eprintln!("error [{}]: {:#}", app.error_code(), err),
            None => eprintln!("error: {:#}", err),
        }
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(dir) = cli.models_dir {
        config.registry.models_dir = dir;
    }
    init_tracing(&config.observability);

    tracing::debug!("fnol-triage v{}", env!("CARGO_PKG_VERSION"));

    let registry = ModelRegistry::from_config(&config.registry)?;

    match cli.command {
        Commands::Overview { data } => {
            let path = data.unwrap_or_else(|| config.data.claims_path.clone());
            let claims = load_claims(&path)?;
            print_json(&ClaimsOverview::from_records(&claims))?;
        }

        Commands::Predict {
            claim_type,
            estimated_amount,
            traffic,
            weather,
            vehicle_type,
            vehicle_year,
            driver_age,
            license_age,
        } => {
            let request = PredictionRequest {
                claim_type,
                estimated_claim_amount: estimated_amount,
                traffic_condition: traffic,
                weather_condition: weather,
                vehicle_type,
                vehicle_year,
                driver_age,
                license_age,
            };
            let (model, schema) = registry.load()?;
            let predictor = Predictor::new(model, schema)?;
            print_json(&predictor.predict_request(request)?)?;
        }

        Commands::Retrain { data } => {
            let batch = load_training_batch(&data)?;
            let result = Retrainer::new(&registry, config.retraining.clone()).retrain(batch)?;
            let message = if result.promoted {
                "Candidate promoted to production"
            } else {
                "Production model kept; candidate discarded"
            };
            print_json(&json!({ "result": result, "message": message }))?;
        }

        Commands::Snapshot => {
            let (model, _) = registry.load()?;
            let path = registry.save(&model, true)?;
            print_json(&json!({ "model_id": model.id(), "path": path }))?;
        }

        Commands::Versions => {
            print_json(&registry.list_versions()?)?;
        }

        Commands::Pull => {
            let hub = HubArtifactStore::from_config(&config.registry)?;
            let (model, schema) = registry.pull_from(&hub)?;
            print_json(&json!({
                "model_id": model.id(),
                "model_type": model.model_type(),
                "features": schema.len(),
                "path": registry.production_path(),
            }))?;
        }

        Commands::Bootstrap {
            data,
            family,
            n_trees,
            max_depth,
            force,
        } => {
            if registry.production_path().exists() && !force {
                bail!(
                    "{} already exists; pass --force to replace it",
                    registry.production_path().display()
                );
            }
            let hyperparameters = match family {
                Family::RandomForest => HyperParameters::RandomForest(ForestParams {
                    n_trees,
                    max_depth,
                    seed: config.retraining.seed,
                    ..ForestParams::default()
                }),
                Family::DecisionTree => {
                    let defaults = TreeParams::default();
                    HyperParameters::DecisionTree(TreeParams {
                        max_depth: max_depth.or(defaults.max_depth),
                        ..defaults
                    })
                }
                Family::Baseline => HyperParameters::Baseline,
            };

            let batch = load_training_batch(&data)?;
            let (model, schema) = bootstrap(batch, hyperparameters, &config.retraining)?;
            let path = registry.install(&model, &schema)?;
            print_json(&json!({
                "model_id": model.id(),
                "model_type": model.model_type(),
                "hyperparameters": model.hyperparameters().describe(),
                "features": schema.len(),
                "path": path,
            }))?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
