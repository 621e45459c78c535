//! CSV import of rate samples.
//!
//! Expected header: `timestamp,rate,buy_rate,sell_rate[,source]` with RFC 3339
//! timestamps. Rows may come in any order; the result is sorted ascending.

use crate::domain::error::FxError;
use crate::domain::rate::RateSample;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_IMPORT_SOURCE: &str = "csv_import";

pub fn read_samples_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<RateSample>, FxError> {
    let file = File::open(path.as_ref())?;
    read_samples(file)
}

pub fn read_samples<R: Read>(reader: R) -> Result<Vec<RateSample>, FxError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut samples = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| FxError::Import {
            line: e.position().map(|p| p.line() as usize).unwrap_or(0),
            reason: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

        let field = |idx: usize, name: &str| {
            record
                .get(idx)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| FxError::Import {
                    line,
                    reason: format!("missing {name} column"),
                })
        };
        let decimal = |idx: usize, name: &str| {
            let raw = field(idx, name)?;
            Decimal::from_str(raw).map_err(|e| FxError::Import {
                line,
                reason: format!("invalid {name} value '{raw}': {e}"),
            })
        };

        let raw_ts = field(0, "timestamp")?;
        let timestamp = DateTime::parse_from_rfc3339(raw_ts)
            .map_err(|e| FxError::Import {
                line,
                reason: format!("invalid timestamp '{raw_ts}': {e}"),
            })?
            .with_timezone(&Utc);

        let rate = decimal(1, "rate")?;
        if rate <= Decimal::ZERO {
            return Err(FxError::Import {
                line,
                reason: format!("rate must be positive, got {rate}"),
            });
        }

        samples.push(RateSample {
            rate,
            buy_rate: decimal(2, "buy_rate")?,
            sell_rate: decimal(3, "sell_rate")?,
            timestamp,
            source: record
                .get(4)
                .filter(|v| !v.is_empty())
                .unwrap_or(DEFAULT_IMPORT_SOURCE)
                .to_string(),
        });
    }

    samples.sort_by_key(|s| s.timestamp);
    Ok(samples)
}
