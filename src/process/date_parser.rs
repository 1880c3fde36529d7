use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Output pattern for date-formatted cells (`dd.MM.yyyy`).
pub const DATE_FORMAT: &str = "%d.%m.%Y";

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Excel 1900-system serial → local naive date-time.
///
/// Serial 1 is 1900-01-01. Excel pretends 1900-02-29 exists (serial 60),
/// so from serial 61 on the day count is shifted back by one. Time of day
/// is rounded to the millisecond, which can carry into the next day.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let whole_days = serial.floor();
    let millis = ((serial - whole_days) * MILLIS_PER_DAY).round() as i64;
    let whole_days = whole_days as i64;
    let adjust = if whole_days < 61 { 0 } else { -1 };

    // "January 0, 1900"
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 31)?.and_hms_opt(0, 0, 0)?;
    epoch
        .checked_add_signed(Duration::try_days(whole_days + adjust)?)?
        .checked_add_signed(Duration::try_milliseconds(millis)?)
}

/// Render a date-time as `dd.MM.yyyy`.
pub fn format_date(dt: &NaiveDateTime) -> String {
    dt.format(DATE_FORMAT).to_string()
}
