use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;

use crate::backtest::{BacktestEngine, Signal};
use crate::classifier::RiseClassifier;
use crate::config::Config;
use crate::scorer::Scorer;

mod backtest;
mod classifier;
mod config;
mod data;
mod dataset;
mod device;
mod mlp;
mod report;
mod scorer;

/// Trains a rise classifier on windowed OHLC closes, then backtests a
/// single-position strategy on its probabilities.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// CSV file with timestamp,open,high,low,close rows.
    data: PathBuf,

    /// Close-window length fed to the classifier.
    #[arg(long, default_value_t = Config::default().window)]
    window: usize,

    /// How many candles ahead the label looks.
    #[arg(long, default_value_t = Config::default().horizon)]
    horizon: usize,

    /// Forward return at or above this counts as a rise.
    #[arg(long, default_value_t = Config::default().up_threshold)]
    up_threshold: f64,

    /// Hidden layer width.
    #[arg(long, default_value_t = Config::default().hidden)]
    hidden: usize,

    /// Number of hidden layers.
    #[arg(long, default_value_t = Config::default().layers)]
    layers: usize,

    #[arg(long, default_value_t = Config::default().epochs)]
    epochs: usize,

    #[arg(long, default_value_t = Config::default().batch_size)]
    batch_size: usize,

    #[arg(long, default_value_t = Config::default().learning_rate)]
    learning_rate: f64,

    #[arg(long, default_value_t = Config::default().weight_decay)]
    weight_decay: f64,

    /// Training range, half-open candle offsets.
    #[arg(long, default_value_t = Config::default().train_start)]
    train_start: usize,

    #[arg(long, default_value_t = Config::default().train_end)]
    train_end: usize,

    /// Backtest range, half-open candle offsets.
    #[arg(long, default_value_t = Config::default().test_start)]
    test_start: usize,

    #[arg(long, default_value_t = Config::default().test_end)]
    test_end: usize,

    /// Enter long at or above this probability.
    #[arg(long, default_value_t = Config::default().p_buy)]
    p_buy: f32,

    /// Exit at or below this probability.
    #[arg(long, default_value_t = Config::default().p_sell)]
    p_sell: f32,

    #[arg(long, default_value_t = Config::default().take_profit)]
    take_profit: f64,

    #[arg(long, default_value_t = Config::default().stop_loss)]
    stop_loss: f64,

    /// Write the trade ledger to this CSV file.
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Args {
    fn to_config(&self) -> Config {
        Config {
            window: self.window,
            horizon: self.horizon,
            up_threshold: self.up_threshold,
            hidden: self.hidden,
            layers: self.layers,
            epochs: self.epochs,
            batch_size: self.batch_size,
            learning_rate: self.learning_rate,
            weight_decay: self.weight_decay,
            train_start: self.train_start,
            train_end: self.train_end,
            test_start: self.test_start,
            test_end: self.test_end,
            p_buy: self.p_buy,
            p_sell: self.p_sell,
            take_profit: self.take_profit,
            stop_loss: self.stop_loss,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = args.to_config();

    let candles = data::load_candles(&args.data)?;
    if candles.is_empty() {
        bail!("{} contains no usable rows", args.data.display());
    }
    log::info!("loaded {} candles from {}", candles.len(), args.data.display());

    let train = dataset::build_samples(
        &candles,
        config.train_start,
        config.train_end,
        config.window,
        config.horizon,
        config.up_threshold,
    );
    let test = dataset::build_samples(
        &candles,
        config.test_start,
        config.test_end,
        config.window,
        config.horizon,
        config.up_threshold,
    );
    log::info!("built {} train / {} test samples", train.len(), test.len());

    let mut classifier = RiseClassifier::new(&config)?;
    if train.is_empty() {
        log::warn!("training range produced no samples, the model stays untrained");
    } else {
        classifier.fit(&train, config.epochs)?;
    }

    let windows: Vec<Vec<f32>> = test.iter().map(|s| s.window.clone()).collect();
    let probabilities = classifier.score(&windows)?;
    let signals: Vec<Signal> = test
        .iter()
        .zip(&probabilities)
        .map(|(sample, &probability)| Signal {
            index: sample.index,
            probability,
        })
        .collect();

    let engine = BacktestEngine::new(&config);
    let trades = engine.run(&candles, &signals)?;

    let summary = report::summarize(&trades);
    print!("{}", report::render(&trades, &summary));

    if let Some(path) = &args.output {
        report::write_trades_csv(path, &trades)?;
        log::info!("wrote {} trades to {}", trades.len(), path.display());
    }
    Ok(())
}
