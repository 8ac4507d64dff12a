use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info};

use digit_estimator::data::image_input::image_file_to_input;
use digit_estimator::network::model::IMAGE_PIXELS;
use digit_estimator::train::run_config::DEFAULT_MODEL_DIR;
use digit_estimator::{
    load_mnist_32x32, synthetic, train_and_evaluate, Datasets, Estimator, InputFn, Matrix,
    Result, RunConfig,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Checkpoint directory
    #[arg(short, long, global = true, default_value = DEFAULT_MODEL_DIR)]
    model_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train on the training partition, then evaluate on the test partition
    Train {
        #[command(flatten)]
        source: DataSource,

        /// Images per gradient update
        #[arg(short, long, default_value_t = 550)]
        batch_size: usize,

        /// Passes over the training data (conflicts with --steps)
        #[arg(short, long, conflicts_with = "steps")]
        epochs: Option<usize>,

        /// Train for roughly one epoch, counted in steps
        #[arg(short, long)]
        steps: bool,

        /// Seed for weight initialization and shuffling
        #[arg(long)]
        seed: Option<u64>,

        /// Also checkpoint every N steps
        #[arg(long)]
        save_every: Option<usize>,
    },
    /// Evaluate the latest checkpoint on the test partition
    Evaluate {
        #[command(flatten)]
        source: DataSource,
    },
    /// Classify image files with the latest checkpoint
    Predict {
        /// PNG/JPEG/BMP/GIF files; resized to 32x32 grayscale
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct DataSource {
    /// Directory holding the four MNIST IDX files
    #[arg(short, long, required_unless_present = "synthetic")]
    data_dir: Option<PathBuf>,

    /// Use a generated dataset instead of IDX files
    #[arg(long, conflicts_with = "data_dir")]
    synthetic: bool,
}

impl DataSource {
    fn load(&self) -> Result<Datasets> {
        match &self.data_dir {
            Some(dir) if !self.synthetic => load_mnist_32x32(dir),
            _ => synthetic(5_000, 1_000, 0),
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = RunConfig::default().with_model_dir(&args.model_dir);

    match args.command {
        Command::Train {
            source,
            batch_size,
            epochs,
            steps,
            seed,
            save_every,
        } => {
            let data = source.load()?;
            let mut config = config;
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            if let Some(every) = save_every {
                config = config.with_save_checkpoints_steps(every);
            }
            // Two epochs unless told otherwise.
            let num_epochs = match (epochs, steps) {
                (None, false) => Some(2),
                (e, _) => e,
            };
            // The step count itself is derived from the dataset size.
            let steps = steps.then_some(0);
            let results = train_and_evaluate(&data, batch_size, num_epochs, steps, config)?;
            println!("{}", results);
        }
        Command::Evaluate { source } => {
            let data = source.load()?;
            let eval_batch_size = config.eval_batch_size;
            let mut estimator = Estimator::from_checkpoint(config)?;
            let results = estimator.evaluate(InputFn::new(&data.test, eval_batch_size))?;
            println!("{}", results);
        }
        Command::Predict { images } => {
            let mut estimator = Estimator::from_checkpoint(config)?;
            let mut pixels = Vec::with_capacity(images.len() * IMAGE_PIXELS);
            for path in &images {
                pixels.extend(image_file_to_input(path)?);
            }
            let batch = Matrix::from_vec(images.len(), IMAGE_PIXELS, pixels)?;
            let predictions = estimator.predict(std::iter::once(batch))?;
            for (path, prediction) in images.iter().zip(&predictions) {
                let probabilities: Vec<String> = prediction
                    .probabilities
                    .iter()
                    .map(|p| format!("{:.4}", p))
                    .collect();
                println!(
                    "{}: class {} [{}]",
                    path.display(),
                    prediction.class,
                    probabilities.join(", ")
                );
            }
            info!("Classified {} images", predictions.len());
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
