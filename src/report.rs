use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use polars::frame::DataFrame;
use polars::io::SerWriter;
use polars::prelude::{Column, CsvWriter};

use crate::backtest::Trade;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub total_pnl: f64,
    pub win_rate: f64,
}

/// Total PnL is the plain sum of per-trade returns, not compounded. A win is
/// a strictly positive return. An empty ledger summarizes to zeros.
pub fn summarize(trades: &[Trade]) -> Summary {
    if trades.is_empty() {
        return Summary {
            total_pnl: 0.0,
            win_rate: 0.0,
        };
    }
    let total_pnl = trades.iter().map(Trade::ret).sum();
    let wins = trades.iter().filter(|t| t.ret() > 0.0).count();
    Summary {
        total_pnl,
        win_rate: wins as f64 / trades.len() as f64,
    }
}

/// One line per trade, then the totals.
pub fn render(trades: &[Trade], summary: &Summary) -> String {
    let mut out = String::from("\nSignals:\n");
    for trade in trades {
        out.push_str(&format!(
            "BUY @{} ({})  SELL @{} ({})  ret={:.2}%  {}\n",
            trade.entry_index,
            trade.entry_price,
            trade.exit_index,
            trade.exit_price,
            trade.ret() * 100.0,
            trade.reason()
        ));
    }
    out.push_str(&format!(
        "Total PnL={:.2}%  winrate={:.1}%\n",
        summary.total_pnl * 100.0,
        summary.win_rate * 100.0
    ));
    out
}

/// Writes the ledger as CSV, one row per trade.
pub fn write_trades_csv(path: impl AsRef<Path>, trades: &[Trade]) -> Result<()> {
    let entry_index: Vec<u32> = trades.iter().map(|t| t.entry_index as u32).collect();
    let entry_price: Vec<f64> = trades.iter().map(|t| t.entry_price).collect();
    let exit_index: Vec<u32> = trades.iter().map(|t| t.exit_index as u32).collect();
    let exit_price: Vec<f64> = trades.iter().map(|t| t.exit_price).collect();
    let returns: Vec<f64> = trades.iter().map(Trade::ret).collect();
    let reasons: Vec<String> = trades.iter().map(Trade::reason).collect();

    let mut df = DataFrame::new(vec![
        Column::new("entry_index".into(), entry_index),
        Column::new("entry_price".into(), entry_price),
        Column::new("exit_index".into(), exit_index),
        Column::new("exit_price".into(), exit_price),
        Column::new("return".into(), returns),
        Column::new("reason".into(), reasons),
    ])?;

    let path = path.as_ref();
    let mut file =
        File::create(path).with_context(|| format!("create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .finish(&mut df)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
