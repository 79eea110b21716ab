use super::*;

#[test]
fn format_time_ago_zero_is_a_dash() {
    assert_eq!(format_time_ago(0), "-");
}

#[test]
fn format_time_ago_buckets_by_magnitude() {
    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64;
    assert_eq!(format_time_ago(now_ms - 5_000), "5s");
    assert_eq!(format_time_ago(now_ms - 120_000), "2m");
    assert_eq!(format_time_ago(now_ms - 7_200_000), "2h");
    assert_eq!(format_time_ago(now_ms - 172_800_000), "2d");
}
