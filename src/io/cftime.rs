//! Decoding of CF-convention time coordinates (`<unit> since <date>`).

use chrono::{NaiveDate, TimeDelta};

/// Dates for `offsets` measured in `units`, e.g. `"hours since 1800-01-01 00:00:0.0"`.
///
/// Only the date part of the reference is used; offsets are rounded to the second.
#[cfg_attr(not(feature = "netcdf"), allow(dead_code))]
pub(crate) fn decode_time(offsets: &[f64], units: &str) -> Result<Vec<NaiveDate>, String> {
    let (unit, reference) = units.split_once(" since ")
        .ok_or_else(|| format!("unsupported time units {units:?}"))?;
    let seconds = match unit.trim() {
        "days" | "day" | "d" => 86_400.0,
        "hours" | "hour" | "h" => 3_600.0,
        "minutes" | "minute" => 60.0,
        "seconds" | "second" | "s" => 1.0,
        other => return Err(format!("unsupported time unit {other:?}")),
    };

    let date = reference.trim().split(['T', ' ']).next().unwrap_or_default();
    let origin = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("unparseable time reference {reference:?}"))?;

    offsets.iter()
        .map(|&offset| {
            (offset * seconds).is_finite()
                .then(|| TimeDelta::try_seconds((offset * seconds).round() as i64))
                .flatten()
                .and_then(|delta| origin.checked_add_signed(delta))
                .map(|at| at.date())
                .ok_or_else(|| format!("time offset {offset} is out of range"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_since_reanalysis_epoch() {
        // 1948-01-01 and 1948-02-01 in NCEP monthly-mean files.
        let dates = decode_time(&[1_297_320.0, 1_298_064.0], "hours since 1800-01-01 00:00:0.0").unwrap();
        assert_eq!(dates, vec![
            NaiveDate::from_ymd_opt(1948, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(1948, 2, 1).unwrap(),
        ]);
    }

    #[test]
    fn days_with_unpadded_reference() {
        let dates = decode_time(&[0.0, 31.0], "days since 1800-1-1 00:00:00").unwrap();
        assert_eq!(dates[1], NaiveDate::from_ymd_opt(1800, 2, 1).unwrap());
    }

    #[test]
    fn unknown_units_are_rejected() {
        assert!(decode_time(&[0.0], "fortnights since 2000-01-01").is_err());
        assert!(decode_time(&[0.0], "hours").is_err());
        assert!(decode_time(&[f64::NAN], "hours since 2000-01-01").is_err());
    }
}
