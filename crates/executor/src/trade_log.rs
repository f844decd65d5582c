use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::error::ExecutorError;

/// One row of the trade history file.
#[derive(Debug, Serialize)]
pub struct TradeRecord {
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Price")]
    pub price: Decimal,
    #[serde(rename = "Qty")]
    pub quantity: i64,
    #[serde(rename = "Total_Amt")]
    pub total: Decimal,
    #[serde(rename = "Reason")]
    pub reason: String,
}

impl TradeRecord {
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        kind: impl Into<String>,
        name: impl Into<String>,
        price: Decimal,
        quantity: i64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            time: timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            kind: kind.into(),
            name: name.into(),
            price,
            quantity,
            total: price * Decimal::from(quantity),
            reason: reason.into(),
        }
    }
}

/// Append-only CSV log of every order the engine submits.
pub struct TradeLog {
    path: PathBuf,
}

impl TradeLog {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("trade_history.csv"),
        }
    }

    /// Appends one record, writing the header only when the file is new.
    pub fn record(&self, record: &TradeRecord) -> Result<(), ExecutorError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let write_header = !self.path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }
}
