//! Typed records and the normalizers that build them from upstream JSON.
//!
//! Upstream payloads are loosely shaped: ids arrive as numbers or strings,
//! dates in several timestamp flavours, numerics sometimes as `null`. Every
//! entry is normalized into a [`Record`] here so nothing past the store ever
//! sees an undefined field. Entries that cannot be normalized are skipped and
//! logged.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::cmp::Ordering;
use std::collections::HashSet;

/// A single cell of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Number(f64),
    Null,
}

impl Value {
    fn kind_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Number(_) => 1,
            Value::Text(_) => 2,
        }
    }

    /// Natural ordering: numeric for numbers, lexical for text.
    ///
    /// Values of different kinds order `Null < Number < Text`.
    pub fn natural_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Value::Text(s) => Json::String(s.clone()),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Null => Json::Null,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<Option<f64>> for Value {
    fn from(n: Option<f64>) -> Self {
        n.map(Value::Number).unwrap_or(Value::Null)
    }
}

/// One invoice or market entry: a stable id plus ordered fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: String,
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Build a record whose first field is `id`.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Record {
            fields: vec![("id".to_string(), Value::Text(id.clone()))],
            id,
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value.into());
        self
    }

    /// Set a field, keeping its position if it already exists.
    pub fn set(&mut self, name: &str, value: Value) {
        match self.fields.iter_mut().find(|(k, _)| k == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// JSON object with fields in record order.
    pub fn to_json(&self) -> Json {
        let map = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        Json::Object(map)
    }
}

/// Reason an upstream entry was rejected during normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Malformed(pub String);

/// An upstream payload shape that normalizes into [`Record`]s.
pub trait Schema {
    /// Label used in log lines.
    const NAME: &'static str;

    fn normalize(raw: &Json) -> Result<Record, Malformed>;
}

/// Normalize a batch, skipping malformed entries and duplicate ids.
pub fn normalize_batch<S: Schema>(raw: &[Json]) -> Vec<Record> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());

    for (index, entry) in raw.iter().enumerate() {
        match S::normalize(entry) {
            Ok(record) => {
                if seen.insert(record.id().to_string()) {
                    out.push(record);
                } else {
                    warn!(
                        "skipping {} #{}: duplicate id '{}'",
                        S::NAME,
                        index,
                        record.id()
                    );
                }
            }
            Err(Malformed(reason)) => {
                warn!("skipping {} #{}: {}", S::NAME, index, reason);
            }
        }
    }

    out
}

fn object(raw: &Json) -> Result<&serde_json::Map<String, Json>, Malformed> {
    raw.as_object()
        .ok_or_else(|| Malformed("entry is not an object".to_string()))
}

/// Text field that may arrive as a string or a number.
fn text(obj: &serde_json::Map<String, Json>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn required_text(obj: &serde_json::Map<String, Json>, key: &str) -> Result<String, Malformed> {
    text(obj, key)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Malformed(format!("missing '{}'", key)))
}

/// Numeric field that may arrive as a number or a numeric string.
fn number(obj: &serde_json::Map<String, Json>, key: &str) -> Result<Option<f64>, Malformed> {
    match obj.get(key) {
        None | Some(Json::Null) => Ok(None),
        Some(Json::Number(n)) => Ok(n.as_f64()),
        Some(Json::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| Malformed(format!("'{}' is not numeric: {:?}", key, s))),
        Some(other) => Err(Malformed(format!("'{}' is not numeric: {}", key, other))),
    }
}

/// Normalize an upstream date to its UTC calendar day (`YYYY-MM-DD`).
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let date = if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        dt.with_timezone(&Utc).date_naive()
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        dt.date()
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        dt.date()
    } else {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?
    };
    Some(date.format("%Y-%m-%d").to_string())
}

/// Invoice rows from `/api/getInvdata`.
pub struct Invoice;

impl Invoice {
    pub const COLUMNS: [&'static str; 6] = [
        "id",
        "invoiceNumber",
        "date",
        "amount",
        "customerName",
        "status",
    ];
}

impl Schema for Invoice {
    const NAME: &'static str = "invoice";

    fn normalize(raw: &Json) -> Result<Record, Malformed> {
        let obj = object(raw)?;
        let id = required_text(obj, "stt_rec")?;

        let date = match text(obj, "ngay_hd") {
            Some(s) => Value::Text(
                normalize_date(&s).ok_or_else(|| Malformed(format!("bad date {:?}", s)))?,
            ),
            None => Value::Null,
        };

        Ok(Record::new(id)
            .with("invoiceNumber", text(obj, "so_hd").map_or(Value::Null, Value::Text))
            .with("date", date)
            .with("amount", number(obj, "t_tt_nt")?)
            .with("customerName", text(obj, "ten_kh").map_or(Value::Null, Value::Text))
            .with("status", text(obj, "trang_thai").map_or(Value::Null, Value::Text)))
    }
}

/// Coin entries from the CoinGecko `coins/markets` endpoint.
pub struct CoinMarket;

impl CoinMarket {
    pub const COLUMNS: [&'static str; 11] = [
        "id",
        "name",
        "symbol",
        "image",
        "market_cap_rank",
        "current_price",
        "price_change_percentage_24h",
        "market_cap",
        "total_volume",
        "circulating_supply",
        "ath",
    ];
}

impl Schema for CoinMarket {
    const NAME: &'static str = "coin";

    fn normalize(raw: &Json) -> Result<Record, Malformed> {
        let obj = object(raw)?;
        let id = required_text(obj, "id")?;
        let name = required_text(obj, "name")?;

        let mut record = Record::new(id)
            .with("name", name)
            .with("symbol", text(obj, "symbol").map_or(Value::Null, Value::Text))
            .with("image", text(obj, "image").map_or(Value::Null, Value::Text));

        for key in &Self::COLUMNS[4..] {
            record.set(key, number(obj, key)?.into());
        }
        Ok(record)
    }
}
