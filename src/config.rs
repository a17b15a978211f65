/// Parameters for dataset construction, classifier training, and the
/// backtest. Index ranges are half-open candle offsets.
#[derive(Debug, Clone)]
pub struct Config {
    pub window: usize,
    pub horizon: usize,
    pub up_threshold: f64,
    pub hidden: usize,
    pub layers: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub train_start: usize,
    pub train_end: usize,
    pub test_start: usize,
    pub test_end: usize,
    pub p_buy: f32,
    pub p_sell: f32,
    pub take_profit: f64,
    pub stop_loss: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: 64,
            horizon: 12,
            up_threshold: 0.002,
            hidden: 64,
            layers: 1,
            epochs: 8,
            batch_size: 64,
            learning_rate: 1e-3,
            weight_decay: 1e-4,
            train_start: 500,
            train_end: 2500,
            test_start: 2500,
            test_end: 3600,
            p_buy: 0.6,
            p_sell: 0.45,
            take_profit: 0.015,
            stop_loss: 0.008,
        }
    }
}
