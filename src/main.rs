use anyhow::Context as _;
use clap::{Parser, Subcommand};
use panelcv::config::{AppConfig, ConfigManager};
use panelcv::data::{load_panel, PredictionStore};
use panelcv::engines::splitters::{CvConfig, DataSplitter, MultipleTimeSeriesCV, SplitSummary};
use panelcv::ml::models::ModelFamily;
use panelcv::ml::tuning::TuningResults;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "panelcv", about = "Walk-backward CV windows for panel data")]
struct Args {
    /// TOML or JSON config file; PANELCV__* environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print panel metadata
    Describe {
        /// Panel file (CSV or Parquet); defaults to data.panel_path
        #[arg(long)]
        panel: Option<PathBuf>,
    },
    /// Print the train/test date windows of every split
    Plan {
        #[arg(long)]
        panel: Option<PathBuf>,
        #[arg(long)]
        n_splits: Option<usize>,
        #[arg(long)]
        train_length: Option<usize>,
        #[arg(long)]
        test_length: Option<usize>,
        #[arg(long)]
        lookahead: Option<usize>,
    },
    /// Print the best tuned configurations for one lookahead
    Select {
        /// Tuning results file; defaults to data.tuning_path
        #[arg(long)]
        tuning: Option<PathBuf>,
        #[arg(long, default_value = "lightgbm")]
        family: ModelFamily,
        #[arg(long, default_value_t = 1)]
        lookahead: usize,
        /// Defaults to workflow.top_n
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Print a stored prediction table
    Show {
        #[arg(long, default_value = "lightgbm")]
        family: ModelFamily,
        #[arg(long, default_value_t = 1)]
        lookahead: usize,
        /// Defaults to workflow.store_dir
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let manager = ConfigManager::new();
    if let Some(path) = &args.config {
        manager
            .load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?;
    }
    let config = manager.get();

    match args.command {
        Command::Describe { panel } => {
            let path = panel_path(panel, &config)?;
            let panel = load_panel(
                &path,
                &config.data.entity_column,
                &config.data.date_column,
                Some(config.data.min_dates),
            )
            .with_context(|| format!("loading panel {}", path.display()))?;
            let metadata = panel.metadata(&path)?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Command::Plan {
            panel,
            n_splits,
            train_length,
            test_length,
            lookahead,
        } => {
            let cv_config = CvConfig::new(
                n_splits.unwrap_or(config.cv.n_splits),
                train_length.unwrap_or(config.cv.train_period_length),
                test_length.unwrap_or(config.cv.test_period_length),
                lookahead.unwrap_or(config.cv.lookahead),
            )?;
            let path = panel_path(panel, &config)?;
            let panel = load_panel(
                &path,
                &config.data.entity_column,
                &config.data.date_column,
                Some(config.data.min_dates),
            )
            .with_context(|| format!("loading panel {}", path.display()))?;

            let cv = MultipleTimeSeriesCV::new(cv_config)?;
            let plan: Vec<SplitSummary> = cv
                .split_panel(&panel)
                .context("splitting panel")?
                .map(|split| split.summary())
                .collect();
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::Select {
            tuning,
            family,
            lookahead,
            top_n,
        } => {
            let path = tuning
                .or_else(|| config.data.tuning_path.clone())
                .context("no tuning results file given (--tuning or data.tuning_path)")?;
            let results = TuningResults::load(&path, family)
                .with_context(|| format!("loading tuning results {}", path.display()))?;
            let best = results.best(lookahead, top_n.unwrap_or(config.workflow.top_n));
            if best.is_empty() {
                anyhow::bail!(
                    "no tuning results for lookahead {} (available: {:?})",
                    lookahead,
                    results.lookaheads()
                );
            }
            println!("{}", serde_json::to_string_pretty(&best)?);
        }
        Command::Show {
            family,
            lookahead,
            store,
        } => {
            let store = match store {
                Some(root) => PredictionStore::new(root),
                None => PredictionStore::from_config(&config.workflow),
            };
            let table = store
                .get(family, lookahead)
                .with_context(|| format!("reading predictions under {}", store.root().display()))?;
            println!("{}", table);
        }
    }

    Ok(())
}

fn panel_path(arg: Option<PathBuf>, config: &AppConfig) -> anyhow::Result<PathBuf> {
    arg.or_else(|| config.data.panel_path.clone())
        .context("no panel file given (--panel or data.panel_path)")
}
