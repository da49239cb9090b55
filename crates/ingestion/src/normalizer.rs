//! CSV schema normalization.
//!
//! Maps heterogeneous trade-log headers onto the canonical column set and
//! coerces every cell, degrading unparsable values to null instead of failing
//! the whole upload.

use bias_core::{Action, Error, Result, Timestamp, TradeRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ByteRecord, ReaderBuilder};
use tracing::{debug, warn};

/// Canonical columns of a normalized trade table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Timestamp,
    Action,
    Asset,
    Quantity,
    Price,
    Pnl,
    Balance,
}

impl Column {
    /// Columns that must be present after header mapping.
    pub const REQUIRED: [Column; 5] = [
        Column::Timestamp,
        Column::Action,
        Column::Asset,
        Column::Quantity,
        Column::Price,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Timestamp => "timestamp",
            Column::Action => "action",
            Column::Asset => "asset",
            Column::Quantity => "quantity",
            Column::Price => "price",
            Column::Pnl => "pnl",
            Column::Balance => "balance",
        }
    }

    /// Map a raw header (case-insensitive, trimmed) onto a canonical column.
    pub fn from_header(header: &str) -> Option<Self> {
        let key = header.trim_start_matches('\u{feff}').trim().to_lowercase();
        let column = match key.as_str() {
            "timestamp" | "date" | "time" | "datetime" => Column::Timestamp,
            "buy/sell" | "action" | "side" | "type" => Column::Action,
            "asset" | "symbol" | "ticker" => Column::Asset,
            "quantity" | "qty" | "amount" | "shares" => Column::Quantity,
            "price" | "entry_price" => Column::Price,
            "p/l" | "pl" | "pnl" | "profit" => Column::Pnl,
            "balance" | "account_balance" => Column::Balance,
            _ => return None,
        };
        Some(column)
    }
}

/// One row after type coercion. Nulls are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub timestamp: Option<Timestamp>,
    /// Always `"buy"` or `"sell"` once normalized.
    pub action: String,
    pub asset: Option<String>,
    pub quantity: Option<f64>,
    pub price: Option<f64>,
    pub pnl: Option<f64>,
    pub balance: Option<f64>,
}

/// Normalized table, sorted ascending by timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTable {
    pub rows: Vec<NormalizedRow>,
    /// Whether the source carried a P/L column.
    pub has_pnl: bool,
    /// Whether the source carried a balance column.
    pub has_balance: bool,
}

impl NormalizedTable {
    /// Build a table from already-typed trades (e.g. stored records).
    pub fn from_records(records: &[TradeRecord]) -> Self {
        let mut rows: Vec<NormalizedRow> = records
            .iter()
            .map(|t| NormalizedRow {
                timestamp: Some(t.timestamp),
                action: t.action.as_str().to_string(),
                asset: Some(t.asset.clone()),
                quantity: Some(t.quantity),
                price: Some(t.price),
                pnl: t.pnl,
                balance: t.balance,
            })
            .collect();
        rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        Self {
            rows,
            has_pnl: true,
            has_balance: true,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Header position of each canonical column.
#[derive(Debug, Default)]
struct ColumnMap {
    positions: [Option<usize>; 7],
}

impl ColumnMap {
    fn from_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Self {
        let mut map = ColumnMap::default();
        for (idx, header) in headers.enumerate() {
            let Some(column) = Column::from_header(header) else {
                continue;
            };
            match map.positions[column as usize] {
                Some(first) => warn!(
                    column = column.name(),
                    kept = first,
                    ignored = idx,
                    "duplicate header for column, keeping the first"
                ),
                None => map.positions[column as usize] = Some(idx),
            }
        }
        map
    }

    fn get(&self, column: Column) -> Option<usize> {
        self.positions[column as usize]
    }

    fn missing_required(&self) -> Vec<&'static str> {
        Column::REQUIRED
            .iter()
            .filter(|c| self.get(**c).is_none())
            .map(|c| c.name())
            .collect()
    }
}

/// Parse CSV bytes into a normalized table.
///
/// Fails only when a required column cannot be mapped or the CSV structure
/// itself is unreadable. Individual cells never fail the parse.
pub fn normalize_csv(bytes: &[u8]) -> Result<NormalizedTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    let columns = ColumnMap::from_headers(headers.iter().map(String::as_str));

    let missing = columns.missing_required();
    if !missing.is_empty() {
        warn!(?missing, ?headers, "schema rejected");
        return Err(Error::schema(missing));
    }

    let has_pnl = columns.get(Column::Pnl).is_some();
    let has_balance = columns.get(Column::Balance).is_some();

    let mut rows = Vec::new();
    let mut record = ByteRecord::new();
    while reader.read_byte_record(&mut record)? {
        rows.push(coerce_row(&record, &columns));
    }

    // Stable: equal timestamps keep file order
    rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    debug!(rows = rows.len(), has_pnl, has_balance, "csv normalized");
    Ok(NormalizedTable {
        rows,
        has_pnl,
        has_balance,
    })
}

/// Trimmed, non-empty UTF-8 text of a cell.
fn cell<'r>(record: &'r ByteRecord, columns: &ColumnMap, column: Column) -> Option<&'r str> {
    let raw = record.get(columns.get(column)?)?;
    let text = std::str::from_utf8(raw).ok()?.trim();
    (!text.is_empty()).then_some(text)
}

fn coerce_row(record: &ByteRecord, columns: &ColumnMap) -> NormalizedRow {
    let number = |column| cell(record, columns, column).and_then(parse_number);
    let finite = |column| number(column).filter(|v: &f64| v.is_finite());

    NormalizedRow {
        timestamp: cell(record, columns, Column::Timestamp).and_then(parse_timestamp),
        action: normalize_action(cell(record, columns, Column::Action)),
        asset: cell(record, columns, Column::Asset).map(str::to_string),
        quantity: number(Column::Quantity),
        price: number(Column::Price),
        pnl: finite(Column::Pnl),
        balance: finite(Column::Balance),
    }
}

/// Collapse any action cell onto `"buy"` / `"sell"`.
///
/// Only `buy` and `b` (any case) are buys. Everything else, including blanks
/// and garbage, becomes a sell.
pub fn normalize_action(raw: Option<&str>) -> String {
    let is_buy = raw
        .map(|a| matches!(a.to_lowercase().as_str(), "buy" | "b"))
        .unwrap_or(false);
    if is_buy {
        Action::Buy.as_str().to_string()
    } else {
        Action::Sell.as_str().to_string()
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok()
}

const NAIVE_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse a timestamp cell. Offsets are converted to UTC wall clock; naive
/// values are taken literally. Unrecognized text yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_header_synonyms() {
        assert_eq!(Column::from_header(" Date "), Some(Column::Timestamp));
        assert_eq!(Column::from_header("Buy/Sell"), Some(Column::Action));
        assert_eq!(Column::from_header("TICKER"), Some(Column::Asset));
        assert_eq!(Column::from_header("shares"), Some(Column::Quantity));
        assert_eq!(Column::from_header("Entry_Price"), Some(Column::Price));
        assert_eq!(Column::from_header("P/L"), Some(Column::Pnl));
        assert_eq!(Column::from_header("account_balance"), Some(Column::Balance));
        assert_eq!(Column::from_header("\u{feff}Timestamp"), Some(Column::Timestamp));
        assert_eq!(Column::from_header("notes"), None);
    }

    #[test]
    fn test_missing_required_columns() {
        let err = normalize_csv(b"Timestamp,Asset,Notes\n2024-01-01 10:00:00,AAPL,x\n").unwrap_err();
        match err {
            Error::Schema { missing } => assert_eq!(missing, vec!["action", "price", "quantity"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_full_header_set() {
        let csv = "Timestamp,Buy/Sell,Asset,Quantity,Price,P/L,Balance\n\
                   2024-01-02 10:00:00,BUY,AAPL,10,150.5,-12.5,10000\n\
                   2024-01-02 09:00:00,Sell,MSFT,5,300,20,10020\n";
        let table = normalize_csv(csv.as_bytes()).unwrap();

        assert!(table.has_pnl && table.has_balance);
        assert_eq!(table.len(), 2);
        // Sorted by timestamp
        assert_eq!(table.rows[0].asset.as_deref(), Some("MSFT"));
        assert_eq!(table.rows[0].action, "sell");
        assert_eq!(table.rows[1].action, "buy");
        assert_eq!(table.rows[1].pnl, Some(-12.5));
        assert_eq!(table.rows[1].balance, Some(10000.0));
    }

    #[test]
    fn test_coerce_or_null_cells() {
        let csv = "date,side,symbol,qty,price,pnl\n\
                   not-a-date,b,AAPL,ten,1.5,abc\n\
                   2024-01-02 10:00:00,garbage,,3,,\n";
        let table = normalize_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);

        let bad_ts = table.rows.iter().find(|r| r.timestamp.is_none()).unwrap();
        assert_eq!(bad_ts.action, "buy");
        assert_eq!(bad_ts.quantity, None);
        assert_eq!(bad_ts.price, Some(1.5));
        assert_eq!(bad_ts.pnl, None);

        let garbage = table.rows.iter().find(|r| r.timestamp.is_some()).unwrap();
        assert_eq!(garbage.action, "sell");
        assert_eq!(garbage.asset, None);
        assert_eq!(garbage.price, None);
    }

    #[test]
    fn test_short_rows_are_null_padded() {
        let csv = "timestamp,action,asset,quantity,price,balance\n2024-01-02 10:00:00,buy,AAPL\n";
        let table = normalize_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.rows[0].quantity, None);
        assert_eq!(table.rows[0].balance, None);
    }

    #[test]
    fn test_action_normalization() {
        assert_eq!(normalize_action(Some("B")), "buy");
        assert_eq!(normalize_action(Some("Buy")), "buy");
        assert_eq!(normalize_action(Some("SELL")), "sell");
        assert_eq!(normalize_action(Some("short")), "sell");
        assert_eq!(normalize_action(None), "sell");
    }

    #[test]
    fn test_timestamp_formats() {
        let ts = parse_timestamp("2024-03-01T12:30:45Z").unwrap();
        assert_eq!(ts.hour(), 12);
        let ts = parse_timestamp("2024-03-01T12:30:45+02:00").unwrap();
        assert_eq!(ts.hour(), 10);
        assert!(parse_timestamp("2024-03-01 12:30:45.250").is_some());
        assert!(parse_timestamp("2024-03-01 12:30").is_some());
        assert!(parse_timestamp("2024/03/01 12:30:45").is_some());
        assert!(parse_timestamp("03/01/2024 12:30").is_some());
        assert_eq!(parse_timestamp("2024-03-01").unwrap().hour(), 0);
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("  ").is_none());
    }

    #[test]
    fn test_non_finite_optional_columns_are_null() {
        let csv = "timestamp,action,asset,quantity,price,pnl,balance\n2024-01-02 10:00:00,buy,AAPL,1,inf,NaN,inf\n";
        let table = normalize_csv(csv.as_bytes()).unwrap();
        let row = &table.rows[0];
        // Required numerics keep their value so validity can reject them
        assert_eq!(row.price, Some(f64::INFINITY));
        assert_eq!(row.pnl, None);
        assert_eq!(row.balance, None);
    }
}
