/// Formats seconds as `M:SS`. Minutes are not padded and fractional seconds
/// are truncated; anything that is not a finite number shows as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "0:00".to_string();
    }
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
