use crate::data::frame::IndicatorFrame;
use crate::data::interval::Interval;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord};
use std::path::Path;

const OHLCV_COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

//column positions resolved once from the header row
struct Columns {
    ohlcv: [usize; 6],
    indicators: Vec<(usize, String)>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let mut ohlcv = [0usize; 6];
        for (slot, name) in ohlcv.iter_mut().zip(OHLCV_COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .with_context(|| format!("CSV header is missing required column '{}'", name))?;
        }

        //every non-ohlcv column is an indicator
        let indicators = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| !ohlcv.contains(i))
            .map(|(i, h)| (i, h.trim().to_string()))
            .collect();

        Ok(Columns { ohlcv, indicators })
    }
}

fn parse_price(record: &StringRecord, column: usize, name: &str, line: usize) -> Result<f64> {
    let raw = record.get(column).unwrap_or("").trim();
    raw.parse::<f64>()
        .with_context(|| format!("Failed to parse {} '{}' at line {}", name, raw, line))
}

//loads intervals from a csv file and validates them into a frame
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<IndicatorFrame> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context(format!("Failed to open CSV file: {:?}", path))?;

    let columns = Columns::from_headers(reader.headers()?)?;
    let mut intervals = Vec::new();

    for (index, result) in reader.records().enumerate() {
        let line = index + 2;
        let record = result.context(format!("Failed to parse CSV record at line {}", line))?;

        let raw_ts = record.get(columns.ohlcv[0]).unwrap_or("").trim();
        let timestamp = DateTime::parse_from_rfc3339(raw_ts)
            .context(format!(
                "Failed to parse timestamp '{}' at line {}",
                raw_ts, line
            ))?
            .with_timezone(&Utc);

        let mut interval = Interval::new(
            timestamp,
            parse_price(&record, columns.ohlcv[1], "open", line)?,
            parse_price(&record, columns.ohlcv[2], "high", line)?,
            parse_price(&record, columns.ohlcv[3], "low", line)?,
            parse_price(&record, columns.ohlcv[4], "close", line)?,
            parse_price(&record, columns.ohlcv[5], "volume", line)?,
        );

        //empty cells stay missing so the evaluator can reject them
        for (column, name) in &columns.indicators {
            let raw = record.get(*column).unwrap_or("").trim();
            if raw.is_empty() {
                continue;
            }
            let value = raw.parse::<f64>().with_context(|| {
                format!("Failed to parse indicator {} '{}' at line {}", name, raw, line)
            })?;
            interval.indicators.insert(name.clone(), value);
        }

        intervals.push(interval);
    }

    if intervals.is_empty() {
        bail!("No intervals found in {:?}", path);
    }

    //sort by timestamp to ensure chronological order
    intervals.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let frame = IndicatorFrame::new(intervals).context(format!("Invalid data in {:?}", path))?;
    tracing::info!(path = ?path, intervals = frame.len(), "loaded indicator frame");
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::interval::DataError;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_and_sorts_intervals_with_indicators() {
        let file = write_csv(
            "timestamp,open,high,low,close,volume,ema_fast,ema_slow,rsi\n\
             2025-01-06T09:05:00Z,10.1,10.4,10.0,10.3,120,10.05,9.9,55\n\
             2025-01-06T09:00:00Z,10.0,10.2,9.9,10.1,100,10.0,9.88,\n",
        );

        let frame = load_csv(file.path()).unwrap();
        assert_eq!(frame.len(), 2);
        assert!(frame[0].timestamp < frame[1].timestamp);
        assert_eq!(frame[0].indicators.get("ema_fast"), Some(&10.0));
        assert_eq!(frame[0].indicators.get("rsi"), None);
        assert_eq!(frame[1].indicators.get("rsi"), Some(&55.0));
    }

    #[test]
    fn missing_ohlcv_column_is_an_error() {
        let file = write_csv("timestamp,open,high,low,close,ema_fast\n");
        let err = load_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("volume"));
    }

    #[test]
    fn bad_number_reports_line() {
        let file = write_csv(
            "timestamp,open,high,low,close,volume,ema_fast\n\
             2025-01-06T09:00:00Z,10.0,10.2,9.9,abc,100,10.0\n",
        );
        let err = load_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn duplicate_timestamps_rejected() {
        let file = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2025-01-06T09:00:00Z,10.0,10.2,9.9,10.1,100\n\
             2025-01-06T09:00:00Z,10.0,10.2,9.9,10.1,100\n",
        );
        assert!(load_csv(file.path()).is_err());
    }

    #[test]
    fn nan_and_infinite_prices_rejected() {
        let nan_close = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2025-01-06T09:00:00Z,10.0,10.2,9.9,10.1,100\n\
             2025-01-06T09:05:00Z,10.0,10.2,9.9,NaN,100\n",
        );
        let err = load_csv(nan_close.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::NonFinitePrice {
                index: 1,
                field: "close",
                ..
            })
        ));

        let inf_high = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2025-01-06T09:00:00Z,10.0,inf,9.9,10.1,100\n",
        );
        let err = load_csv(inf_high.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::NonFinitePrice { field: "high", .. })
        ));
    }
}
