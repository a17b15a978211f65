use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result, bail};
use polars::io::SerReader;
use polars::prelude::{CsvReadOptions, DataType};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

// A file starts with a header when the first field of its first line is not
// numeric. Timestamps and prices always parse as numbers.
fn starts_with_header(path: &Path) -> Result<bool> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut first_line = String::new();
    BufReader::new(file)
        .read_line(&mut first_line)
        .with_context(|| format!("read first line of {}", path.display()))?;
    let first_field = first_line.split(',').next().unwrap_or("").trim();
    Ok(first_field.parse::<f64>().is_err())
}

/// Loads an OHLC series from a CSV file. The first five columns are taken
/// positionally as timestamp, open, high, low, close; a header row is
/// detected and skipped automatically. Rows with missing values are dropped.
pub fn load_candles(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let path = path.as_ref();
    let has_header = starts_with_header(path)?;

    let df = CsvReadOptions::default()
        .with_has_header(has_header)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .with_context(|| format!("read {}", path.display()))?;

    let columns = df.get_columns();
    if columns.len() < 5 {
        bail!(
            "{} has {} columns, expected timestamp,open,high,low,close",
            path.display(),
            columns.len()
        );
    }

    let timestamps = columns[0].cast(&DataType::Int64)?.i64()?.to_vec();
    let opens = columns[1].cast(&DataType::Float64)?.f64()?.to_vec();
    let highs = columns[2].cast(&DataType::Float64)?.f64()?.to_vec();
    let lows = columns[3].cast(&DataType::Float64)?.f64()?.to_vec();
    let closes = columns[4].cast(&DataType::Float64)?.f64()?.to_vec();

    let mut candles = Vec::with_capacity(timestamps.len());
    for i in 0..timestamps.len() {
        let (Some(timestamp), Some(open), Some(high), Some(low), Some(close)) =
            (timestamps[i], opens[i], highs[i], lows[i], closes[i])
        else {
            continue;
        };
        candles.push(Candle {
            timestamp,
            open,
            high,
            low,
            close,
        });
    }
    Ok(candles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_temp_csv(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("updown_{}_{}", std::process::id(), name));
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn header_and_headerless_parse_identically() {
        let with_header = write_temp_csv(
            "header.csv",
            "timestamp,open,high,low,close\n1,100.0,101.0,99.0,100.5\n2,100.5,102.0,100.0,101.5\n",
        );
        let without_header = write_temp_csv(
            "no_header.csv",
            "1,100.0,101.0,99.0,100.5\n2,100.5,102.0,100.0,101.5\n",
        );

        let a = load_candles(&with_header).unwrap();
        let b = load_candles(&without_header).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].timestamp, 1);
        assert_eq!(a[1].close, 101.5);
    }

    #[test]
    fn integer_price_columns_are_accepted() {
        let path = write_temp_csv("int_prices.csv", "1,100,101,99,100\n2,100,102,100,101\n");
        let candles = load_candles(&path).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open, 100.0);
        assert_eq!(candles[1].close, 101.0);
    }

    #[test]
    fn rows_with_missing_values_are_dropped() {
        let path = write_temp_csv(
            "gaps.csv",
            "ts,o,h,l,c\n1,100.0,101.0,99.0,100.5\n2,,102.0,100.0,101.5\n3,101.5,103.0,101.0,102.5\n",
        );
        let candles = load_candles(&path).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, 1);
        assert_eq!(candles[1].timestamp, 3);
    }

    #[test]
    fn too_few_columns_is_an_error() {
        let path = write_temp_csv("narrow.csv", "1,100.0,101.0\n");
        assert!(load_candles(&path).is_err());
    }
}
