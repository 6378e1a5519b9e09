//! Display helpers for logical time and modifier values.

/// Format a number of seconds as `M:SS`.
///
/// # Examples
/// ```
/// use buffkeep_types::formatting::format_duration;
/// assert_eq!(format_duration(5), "0:05");
/// assert_eq!(format_duration(125), "2:05");
/// ```
pub fn format_duration(secs: i64) -> String {
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.abs();
    format!("{}{}:{:02}", sign, secs / 60, secs % 60)
}

/// Format the time left on a buff. `None` means the buff never expires.
pub fn format_remaining(remaining: Option<i64>) -> String {
    match remaining {
        None => "permanent".to_string(),
        Some(secs) if secs <= 0 => "expiring".to_string(),
        Some(secs) => format_duration(secs),
    }
}

/// Format a modifier delta with an explicit sign (`+5`, `-3`, `0`).
pub fn format_signed(n: i32) -> String {
    if n > 0 { format!("+{n}") } else { n.to_string() }
}
