use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::ShowtimeInfo;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Seat {
    pub id: i64,
    pub showtime_id: String,
    pub row: String,
    pub number: i32,
    pub booked: bool,
    pub booking_id: Option<Uuid>,
}

impl Seat {
    pub fn status(&self) -> &'static str {
        if self.booked {
            "booked"
        } else {
            "available"
        }
    }
}

/// Human-readable seat identifier: one uppercase row letter followed by a
/// 1-2 digit seat number without a leading zero ("A7", "H12").
///
/// Parsing only checks the grammar. Whether the seat exists in a given hall
/// is a lookup concern, so "Z9" parses fine and then fails resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeatId {
    pub row: char,
    pub number: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSeatIdError;

impl fmt::Display for ParseSeatIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected a row letter followed by a seat number, e.g. A7")
    }
}

impl std::error::Error for ParseSeatIdError {}

impl FromStr for SeatId {
    type Err = ParseSeatIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let row = chars.next().ok_or(ParseSeatIdError)?;
        if !row.is_ascii_uppercase() {
            return Err(ParseSeatIdError);
        }

        let digits = chars.as_str();
        if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseSeatIdError);
        }
        if digits.starts_with('0') {
            return Err(ParseSeatIdError);
        }

        let number: i32 = digits.parse().map_err(|_| ParseSeatIdError)?;
        Ok(SeatId { row, number })
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.number)
    }
}

/// One entry of the seat map returned to clients. The status string is
/// derived from the booked flag; a transient "selected" state is a client
/// concern and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatMapEntry {
    pub id: String,
    pub row: String,
    pub number: i32,
    pub status: String,
}

impl From<&Seat> for SeatMapEntry {
    fn from(seat: &Seat) -> Self {
        SeatMapEntry {
            id: format!("{}{}", seat.row, seat.number),
            row: seat.row.clone(),
            number: seat.number,
            status: seat.status().to_string(),
        }
    }
}

/// Seat map payload for one showtime: summary plus seats ordered by row
/// then number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatMap {
    pub showtime: ShowtimeInfo,
    pub seats: Vec<SeatMapEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_identifiers() {
        assert_eq!("A1".parse::<SeatId>().unwrap(), SeatId { row: 'A', number: 1 });
        assert_eq!("H12".parse::<SeatId>().unwrap(), SeatId { row: 'H', number: 12 });
        assert_eq!("Z99".parse::<SeatId>().unwrap(), SeatId { row: 'Z', number: 99 });
    }

    #[test]
    fn rejects_malformed_identifiers() {
        for bad in ["", "A", "7", "7A", "a1", "A0", "A007", "AA1", "A 1", "A1 ", "A123"] {
            assert!(bad.parse::<SeatId>().is_err(), "expected {bad:?} to be rejected");
        }
    }

    #[test]
    fn display_round_trips() {
        for raw in ["A1", "B10", "H12"] {
            let id: SeatId = raw.parse().unwrap();
            assert_eq!(id.to_string(), raw);
        }
    }

    #[test]
    fn orders_numerically_within_a_row() {
        let a2: SeatId = "A2".parse().unwrap();
        let a10: SeatId = "A10".parse().unwrap();
        let b1: SeatId = "B1".parse().unwrap();
        assert!(a2 < a10);
        assert!(a10 < b1);
    }
}
