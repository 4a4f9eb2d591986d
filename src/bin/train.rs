use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use clap::{Parser, Subcommand};
use log::info;

use emigration_forecast::engine::{ForecastEngine, ForecastRow, TrainConfig, TrainingProgress};
use emigration_forecast::record::{self, DatasetCategory, RawRecord};
use emigration_forecast::store::ModelStore;

type Backend = Autodiff<NdArray>;

#[derive(Parser)]
#[command(name = "train", about = "Train and run emigration forecasts per dataset category")]
struct Cli {
    /// Directory holding trained model artifacts
    #[arg(long, default_value = "artifacts", global = true)]
    models_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a model from a JSON file of raw yearly records, then forecast
    Train {
        /// JSON file holding an array of raw yearly records
        #[arg(long)]
        records: PathBuf,
        /// Dataset category (sex, age, civil-status, education, occupation,
        /// place-of-origin, major-destination, all-countries)
        #[arg(long)]
        category: String,
        #[arg(long, default_value_t = 3)]
        lookback: usize,
        #[arg(long, default_value_t = 100)]
        epochs: usize,
        /// Years to forecast after training
        #[arg(long, default_value_t = 5)]
        horizon: usize,
    },
    /// Forecast from a previously trained model
    Forecast {
        #[arg(long)]
        category: String,
        #[arg(long, default_value_t = 5)]
        horizon: usize,
    },
    /// Print the exported metadata of a trained model
    Export {
        #[arg(long)]
        category: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let device = NdArrayDevice::default();

    match cli.command {
        Command::Train {
            records,
            category,
            lookback,
            epochs,
            horizon,
        } => {
            let category = parse_category(&category)?;
            let raw = load_records(&records)?;
            let features: Vec<String> = match category.features() {
                Some(schema) => schema.iter().map(|f| f.to_string()).collect(),
                None => record::infer_features(&raw),
            };
            if features.is_empty() {
                bail!("no features found in {}", records.display());
            }

            let store = ModelStore::new(&cli.models_dir);
            let mut engine = ForecastEngine::<Backend>::new(device, store, category.as_str());

            let config = TrainConfig::new(lookback, features.clone(), features).with_epochs(epochs);

            let (sender, receiver) = crossbeam_channel::unbounded::<TrainingProgress>();
            let printer = std::thread::spawn(move || {
                for progress in receiver {
                    info!(
                        "epoch {}: loss {:.6}, mae {:.6}",
                        progress.epoch, progress.loss, progress.mae
                    );
                }
            });
            let report = engine.train(&raw, config, Some(sender))?;
            let _ = printer.join();

            println!("Training metrics for `{}`:", category.as_str());
            for (target, metrics) in &report.targets {
                println!(
                    "  {target}: mae {:.2}, rmse {:.2}, mape {:.2}%, accuracy {:.2}%",
                    metrics.mae, metrics.rmse, metrics.mape, metrics.accuracy
                );
            }
            println!(
                "  overall: mae {:.2}, rmse {:.2}, accuracy {:.2}%",
                report.overall.mae, report.overall.rmse, report.overall.accuracy
            );

            print_rows(&engine.forecast(horizon)?);
        }
        Command::Forecast { category, horizon } => {
            let category = parse_category(&category)?;
            let store = ModelStore::new(&cli.models_dir);
            let mut engine = ForecastEngine::<Backend>::new(device, store, category.as_str());
            if !engine.load_model()? {
                bail!("no trained model for `{}`, run `train` first", category.as_str());
            }
            print_rows(&engine.forecast(horizon)?);
        }
        Command::Export { category } => {
            let category = parse_category(&category)?;
            let store = ModelStore::new(&cli.models_dir);
            let export = store.export(category.as_str())?;
            println!("{}", export.metadata_json);
            info!("model artifact is {} bytes", export.model_bytes.len());
        }
    }

    Ok(())
}

fn parse_category(name: &str) -> Result<DatasetCategory> {
    DatasetCategory::from_str(name).map_err(|e| anyhow::anyhow!(e))
}

fn load_records(path: &PathBuf) -> Result<Vec<RawRecord>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let raw: Vec<RawRecord> =
        serde_json::from_reader(file).with_context(|| format!("parsing {}", path.display()))?;
    Ok(raw)
}

fn print_rows(rows: &[ForecastRow]) {
    for row in rows {
        let values: Vec<String> = row
            .values
            .iter()
            .map(|(feature, value)| format!("{feature} {value:.0}"))
            .collect();
        println!("  {}  {}  total {:.0}", row.year, values.join(", "), row.total);
    }
}
