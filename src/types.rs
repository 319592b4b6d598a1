//! Value types shared by the ledgers: timestamps, amounts and adjustment ops
use super::error::LedgerError;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Inventory counts are whole units and can never go negative.
pub type Quantity = u64;

/// A point in time. Inside a transaction this always comes from the host's
/// deterministic transaction timestamp, never from the local clock.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    /// Build from the seconds/nanos pair a ledger host hands to a transaction.
    pub fn from_unix(secs: i64, nanos: u32) -> Result<Self, LedgerError> {
        DateTime::from_timestamp(secs, nanos)
            .map(TimeStamp)
            .ok_or_else(|| LedgerError::invalid(format!("timestamp out of range: {secs}.{nanos}")))
    }
    pub fn new_with(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        min: u32,
        sec: u32,
    ) -> Result<Self, LedgerError> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(TimeStamp)
            .ok_or_else(|| {
                LedgerError::invalid(format!(
                    "no such instant: {year:04}-{month:02}-{day:02} {hour:02}:{min:02}:{sec:02}"
                ))
            })
    }
    pub fn parse_rfc3339(value: &str) -> Result<Self, LedgerError> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| TimeStamp(dt.with_timezone(&Utc)))
            .map_err(|e| LedgerError::invalid(format!("invalid timestamp {value:?}: {e}")))
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl fmt::Display for TimeStamp<Utc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl serde::Serialize for TimeStamp<Utc> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&self.0, serializer)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// Signed decimal balance amount. Arithmetic is exact so every executor
/// computes the same bits.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }
    pub fn value(&self) -> Decimal {
        self.0
    }
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
    pub fn checked_add(self, rhs: Amount) -> Result<Amount, LedgerError> {
        self.0
            .checked_add(rhs.0)
            .map(Amount)
            .ok_or_else(|| LedgerError::invalid(format!("amount overflow: {self} + {rhs}")))
    }
    pub fn checked_sub(self, rhs: Amount) -> Result<Amount, LedgerError> {
        self.0
            .checked_sub(rhs.0)
            .map(Amount)
            .ok_or_else(|| LedgerError::invalid(format!("amount overflow: {self} - {rhs}")))
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount(Decimal::from(value))
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}

impl FromStr for Amount {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map(Amount)
            .map_err(|e| LedgerError::invalid(format!("invalid amount {s:?}: {e}")))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<C> minicbor::Encode<C> for Amount {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.0.serialize())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Amount {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let raw: [u8; 16] = d
            .bytes()?
            .try_into()
            .map_err(|_| minicbor::decode::Error::message("decimal must be 16 bytes"))?;

        Ok(Amount(Decimal::deserialize(raw)))
    }
}

/// Direction of a balance or inventory adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Credit,
    Debit,
}

impl FromStr for Op {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" | "credit" => Ok(Op::Credit),
            "subtract" | "debit" => Ok(Op::Debit),
            other => Err(LedgerError::invalid(format!("invalid operation: {other}"))),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Credit => f.write_str("add"),
            Op::Debit => f.write_str("subtract"),
        }
    }
}

/// Parse a wire quantity; negative or fractional input is rejected.
pub fn parse_quantity(value: &str) -> Result<Quantity, LedgerError> {
    value
        .trim()
        .parse::<Quantity>()
        .map_err(|e| LedgerError::invalid(format!("invalid quantity {value:?}: {e}")))
}
