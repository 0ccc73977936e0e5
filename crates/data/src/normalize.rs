use brokersync_core::{BrokerKind, RawTrade, Side, SyncError, Trade};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

/// Maps one raw broker record to a canonical trade, tagging it with `broker`.
pub type Normalizer = fn(&RawTrade, &str) -> Trade;

/// Symbol used when a record carries no usable ticker.
pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";

/// Naive exchange timestamps are reported in IST.
const EXCHANGE_UTC_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Select the normalization rule for a broker name.
pub fn normalizer_for(broker_name: &str) -> Result<Normalizer, SyncError> {
    match broker_name.parse::<BrokerKind>()? {
        // The mock broker emits Kite-shaped records.
        BrokerKind::ZerodhaReal | BrokerKind::Mock => Ok(normalize_kite_trade),
    }
}

/// Normalize a batch, preserving order and length.
pub fn normalize_trades(raw_trades: &[RawTrade], broker_name: &str) -> Result<Vec<Trade>, SyncError> {
    let normalizer = normalizer_for(broker_name)?;
    Ok(raw_trades
        .iter()
        .map(|raw| normalizer(raw, broker_name))
        .collect())
}

/// Normalize a single record with the rule registered for `broker_name`.
pub fn normalize_trade(raw: &RawTrade, broker_name: &str) -> Result<Trade, SyncError> {
    Ok(normalizer_for(broker_name)?(raw, broker_name))
}

/// Kite Connect trade / order record.
///
/// Never fails: missing or malformed fields fall through to the next
/// candidate and finally to a default. A value is usable when it is present,
/// non-empty and, for numbers, strictly positive.
pub fn normalize_kite_trade(raw: &RawTrade, broker: &str) -> Trade {
    let id = first_text(raw, &["trade_id", "order_id"]).unwrap_or_else(|| {
        let id = fallback_id(raw);
        warn!(broker = %broker, id = %id, "Raw trade has no trade_id or order_id, derived id from contents");
        id
    });

    Trade {
        id,
        broker: broker.to_string(),
        symbol: first_text(raw, &["tradingsymbol", "symbol"])
            .unwrap_or_else(|| UNKNOWN_SYMBOL.to_string()),
        side: Side::from_transaction_type(raw.field("transaction_type").and_then(Value::as_str)),
        quantity: first_decimal(raw, &["quantity", "filled_quantity"]).unwrap_or(Decimal::ZERO),
        price: first_decimal(raw, &["average_price", "price"]).unwrap_or(Decimal::ZERO),
        timestamp: first_timestamp(raw, &["order_timestamp", "exchange_timestamp"])
            .unwrap_or_else(Utc::now),
    }
}

/// Deterministic id derived from the canonical JSON of the record.
fn fallback_id(raw: &RawTrade) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, raw.as_value().to_string().as_bytes()).to_string()
}

fn first_text(raw: &RawTrade, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match raw.field(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn first_decimal(raw: &RawTrade, fields: &[&str]) -> Option<Decimal> {
    fields.iter().find_map(|field| {
        let value = match raw.field(field)? {
            Value::Number(n) => parse_decimal(&n.to_string()),
            Value::String(s) => parse_decimal(s.trim()),
            _ => None,
        }?;
        (value > Decimal::ZERO).then_some(value)
    })
}

fn first_timestamp(raw: &RawTrade, fields: &[&str]) -> Option<DateTime<Utc>> {
    fields.iter().find_map(|field| match raw.field(field)? {
        Value::String(s) => parse_timestamp(s.trim()),
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    })
}

/// Parse through the decimal text so values like `2500.50` stay exact.
fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let exchange_tz = FixedOffset::east_opt(EXCHANGE_UTC_OFFSET_SECS)?;
    NAIVE_FORMATS.iter().find_map(|fmt| {
        let naive = NaiveDateTime::parse_from_str(s, fmt).ok()?;
        exchange_tz
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    })
}
