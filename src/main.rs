use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use churn_data::{ChurnModel, Prediction, ReportWriter, TrainerConfig};
use churn_tree::SplitCriterion;
use churn_web::{ModelHandle, ServerConfig, render_tree_svg};

#[derive(Parser)]
#[command(name = "churn")]
#[command(about = "Customer churn CART classifier: trainer and predictor UI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for the holdout split and tree fitting
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Train a decision tree on the churn CSV and save the model
    Train {
        /// Path to the input CSV file
        #[arg(long, default_value = "iranian_churn_clean.csv")]
        data: PathBuf,

        /// Path to write the trained model binary
        #[arg(long, default_value = "Cart-Customer_Churn.bin")]
        model: PathBuf,

        /// Maximum tree depth (0 = unlimited)
        #[arg(long, default_value_t = 10)]
        max_depth: usize,

        /// Fraction of rows held out for evaluation
        #[arg(long, default_value_t = 0.3)]
        test_fraction: f64,

        /// Impurity criterion: "gini" or "entropy"
        #[arg(long, default_value = "gini")]
        criterion: String,

        /// Optional path for a full JSON training report
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Serve the prediction form and tree visualisation
    Serve {
        /// Path to the trained model binary
        #[arg(long, default_value = "Cart-Customer_Churn.bin")]
        model: PathBuf,

        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8501")]
        addr: SocketAddr,
    },

    /// Predict one customer from comma-separated feature values
    Predict {
        /// Path to the trained model binary
        #[arg(long, default_value = "Cart-Customer_Churn.bin")]
        model: PathBuf,

        /// Feature values in schema order, e.g. "0,0,10,0,1000,50,10,5,2,1,1,30,500"
        #[arg(long)]
        values: String,
    },

    /// Write the fitted tree as an SVG drawing
    RenderTree {
        /// Path to the trained model binary
        #[arg(long, default_value = "Cart-Customer_Churn.bin")]
        model: PathBuf,

        /// Output SVG path
        #[arg(long, default_value = "tree.svg")]
        output: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    model: String,
    n_rows: usize,
    n_train: usize,
    n_test: usize,
    accuracy: f64,
    n_nodes: usize,
    depth: usize,
    imputed_columns: Vec<String>,
    top_features: Vec<String>,
}

#[derive(Serialize)]
struct RenderOutput {
    output: String,
    n_nodes: usize,
    n_leaves: usize,
    size_bytes: usize,
}

fn parse_criterion(s: &str) -> Result<SplitCriterion> {
    match s {
        "gini" => Ok(SplitCriterion::Gini),
        "entropy" => Ok(SplitCriterion::Entropy),
        other => anyhow::bail!("unknown criterion: {other} (expected gini or entropy)"),
    }
}

fn load_model(path: &Path) -> Result<ChurnModel> {
    let model = ChurnModel::load(path)
        .with_context(|| format!("failed to load model from {}", path.display()))?;
    info!(
        n_features = model.schema().len(),
        n_nodes = model.tree().n_nodes(),
        holdout_accuracy = model.holdout_accuracy(),
        "model loaded"
    );
    Ok(model)
}

fn predict_values(model: &ChurnModel, values: &str) -> Result<Prediction> {
    let raw: Vec<Option<&str>> = values.split(',').map(Some).collect();
    let expected = model.schema().len();
    if raw.len() != expected {
        anyhow::bail!("expected {expected} comma-separated values, got {}", raw.len());
    }
    let features = model.encode_inputs(&raw).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::anyhow!("invalid input: {}", messages.join("; "))
    })?;
    model.predict(&features).context("prediction failed")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Train {
            data,
            model,
            max_depth,
            test_fraction,
            criterion,
            report,
        } => {
            let config = TrainerConfig::new()
                .with_seed(cli.seed)
                .with_max_depth((max_depth > 0).then_some(max_depth))
                .with_test_fraction(test_fraction)
                .with_criterion(parse_criterion(&criterion)?);

            let outcome = config
                .train(&data)
                .with_context(|| format!("training on {} failed", data.display()))?;
            info!(
                accuracy = %format!("{:.2}", outcome.report.accuracy),
                "model accuracy"
            );

            outcome
                .model
                .save(&model)
                .with_context(|| format!("failed to save model to {}", model.display()))?;

            if let Some(report_path) = &report {
                ReportWriter::new(report_path)
                    .write(&outcome.report)
                    .context("failed to write training report")?;
            }

            let r = &outcome.report;
            let output = TrainOutput {
                model: model.display().to_string(),
                n_rows: r.n_rows,
                n_train: r.n_train,
                n_test: r.n_test,
                accuracy: r.accuracy,
                n_nodes: r.n_nodes,
                depth: r.depth,
                imputed_columns: r.imputed.iter().map(|f| f.column.clone()).collect(),
                top_features: r.importances.iter().take(3).map(|f| f.name.clone()).collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Serve { model, addr } => {
            let handle = ModelHandle::new(load_model(&model)?);
            let config = ServerConfig::new().with_addr(addr);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to start async runtime")?;
            runtime
                .block_on(churn_web::serve(&config, handle))
                .context("predictor server failed")?;
        }

        Command::Predict { model, values } => {
            let model = load_model(&model)?;
            let prediction = predict_values(&model, &values)?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }

        Command::RenderTree { model, output } => {
            let model = load_model(&model)?;
            let svg = render_tree_svg(model.tree(), &model.schema().labels());
            std::fs::write(&output, &svg)
                .with_context(|| format!("failed to write {}", output.display()))?;

            let out = RenderOutput {
                output: output.display().to_string(),
                n_nodes: model.tree().n_nodes(),
                n_leaves: model.tree().n_leaves(),
                size_bytes: svg.len(),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}
