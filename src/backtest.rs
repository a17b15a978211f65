use thiserror::Error;

use crate::config::Config;
use crate::data::Candle;

/// A scored candle: the probability of a rise at `index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub index: usize,
    pub probability: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryCause {
    Buy,
}

impl EntryCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryCause::Buy => "buy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCause {
    TakeProfit,
    StopLoss,
    SignalDown,
    EndOfData,
}

impl ExitCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitCause::TakeProfit => "tp",
            ExitCause::StopLoss => "sl",
            ExitCause::SignalDown => "p_down",
            ExitCause::EndOfData => "eod",
        }
    }
}

/// One completed round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub entry_index: usize,
    pub entry_price: f64,
    pub exit_index: usize,
    pub exit_price: f64,
    pub entry_cause: EntryCause,
    pub exit_cause: ExitCause,
}

impl Trade {
    pub fn ret(&self) -> f64 {
        self.exit_price / self.entry_price - 1.0
    }

    /// Entry and exit causes joined the way the report prints them,
    /// e.g. `buy|tp`.
    pub fn reason(&self) -> String {
        format!("{}|{}", self.entry_cause.as_str(), self.exit_cause.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BacktestError {
    #[error("signal index {index} out of range for {len} candles")]
    SignalOutOfRange { index: usize, len: usize },
}

enum Position {
    Flat,
    Open {
        entry_index: usize,
        entry_price: f64,
        entry_cause: EntryCause,
    },
}

/// Single-position strategy simulator. Enters long when the rise probability
/// reaches `p_buy`, exits on take-profit, stop-loss, or a probability at or
/// below `p_sell`, in that priority order.
pub struct BacktestEngine {
    p_buy: f32,
    p_sell: f32,
    take_profit: f64,
    stop_loss: f64,
}

impl BacktestEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            p_buy: config.p_buy,
            p_sell: config.p_sell,
            take_profit: config.take_profit,
            stop_loss: config.stop_loss,
        }
    }

    /// Runs the state machine over the signals and returns the completed
    /// trades in entry order. Signals must arrive in strictly increasing
    /// index order; an index without a candle is an error. A position still
    /// open after the last signal is force-closed at that signal's candle.
    pub fn run(
        &self,
        candles: &[Candle],
        signals: &[Signal],
    ) -> Result<Vec<Trade>, BacktestError> {
        let mut trades = Vec::new();
        let mut position = Position::Flat;
        let mut last_index: Option<usize> = None;

        for signal in signals {
            debug_assert!(last_index.is_none_or(|prev| signal.index > prev));
            last_index = Some(signal.index);

            let candle =
                candles
                    .get(signal.index)
                    .ok_or(BacktestError::SignalOutOfRange {
                        index: signal.index,
                        len: candles.len(),
                    })?;
            let px = candle.close;

            position = match position {
                Position::Flat => {
                    if signal.probability >= self.p_buy {
                        Position::Open {
                            entry_index: signal.index,
                            entry_price: px,
                            entry_cause: EntryCause::Buy,
                        }
                    } else {
                        Position::Flat
                    }
                }
                Position::Open {
                    entry_index,
                    entry_price,
                    entry_cause,
                } => {
                    let tp_hit = px >= entry_price * (1.0 + self.take_profit);
                    let sl_hit = px <= entry_price * (1.0 - self.stop_loss);
                    let signal_down = signal.probability <= self.p_sell;

                    let exit_cause = if tp_hit {
                        Some(ExitCause::TakeProfit)
                    } else if sl_hit {
                        Some(ExitCause::StopLoss)
                    } else if signal_down {
                        Some(ExitCause::SignalDown)
                    } else {
                        None
                    };

                    match exit_cause {
                        Some(exit_cause) => {
                            trades.push(Trade {
                                entry_index,
                                entry_price,
                                exit_index: signal.index,
                                exit_price: px,
                                entry_cause,
                                exit_cause,
                            });
                            Position::Flat
                        }
                        None => Position::Open {
                            entry_index,
                            entry_price,
                            entry_cause,
                        },
                    }
                }
            };
        }

        if let (
            Position::Open {
                entry_index,
                entry_price,
                entry_cause,
            },
            Some(last),
        ) = (position, signals.last())
        {
            // Bounds were already checked when the signal was consumed.
            trades.push(Trade {
                entry_index,
                entry_price,
                exit_index: last.index,
                exit_price: candles[last.index].close,
                entry_cause,
                exit_cause: ExitCause::EndOfData,
            });
        }

        Ok(trades)
    }
}
