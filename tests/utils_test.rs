use spotyt::utils::*;

#[test]
fn test_parse_single_numbers() {
    assert_eq!(parse_playlist_selection("1", 5), vec![0]);
    assert_eq!(parse_playlist_selection("5,2", 5), vec![1, 4]);
}

#[test]
fn test_parse_ranges_and_numbers() {
    assert_eq!(parse_playlist_selection("1,3-5", 6), vec![0, 2, 3, 4]);
    assert_eq!(parse_playlist_selection(" 2 - 3 , 6 ", 6), vec![1, 2, 5]);
}

#[test]
fn test_parse_deduplicates_and_sorts() {
    assert_eq!(parse_playlist_selection("4,1-4,2", 4), vec![0, 1, 2, 3]);
}

#[test]
fn test_parse_skips_invalid_parts() {
    // Out of bounds, reversed, zero and garbage are all dropped
    assert_eq!(parse_playlist_selection("0,7,3-1,abc,2,1-x", 5), vec![1]);
    assert_eq!(parse_playlist_selection("2-9", 5), Vec::<usize>::new());
}

#[test]
fn test_parse_empty_input() {
    assert!(parse_playlist_selection("", 3).is_empty());
    assert!(parse_playlist_selection(" , ,", 3).is_empty());
}

#[test]
fn test_truncate_title_keeps_short_titles() {
    assert_eq!(truncate_title("Road Trip"), "Road Trip");
}

#[test]
fn test_truncate_title_counts_characters() {
    let long: String = "é".repeat(200);
    let cut = truncate_title(&long);
    assert_eq!(cut.chars().count(), MAX_TITLE_CHARS);
    assert!(long.starts_with(&cut));
}

#[test]
fn test_success_rate() {
    assert_eq!(success_rate(0, 0), 0.0);
    assert!((success_rate(13, 23) - 56.52).abs() < 0.01);
    assert_eq!(success_rate(10, 10), 100.0);
}

#[test]
fn test_format_timestamp_handles_garbage() {
    assert_ne!(format_timestamp(1_700_000_000.0), "-");
    assert_eq!(format_timestamp(f64::MAX), "-");
}
