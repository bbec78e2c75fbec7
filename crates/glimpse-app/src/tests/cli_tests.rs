use clap::Parser;
use glimpse_types::CaptureRegion;

use crate::{Args, parse_region};

#[test]
fn test_region_parsing() {
    assert_eq!(
        parse_region("10, 20, 300, 40"),
        Ok(CaptureRegion::new(10, 20, 300, 40))
    );
    assert!(parse_region("10,20,300").is_err());
    assert!(parse_region("a,b,c,d").is_err());
    assert!(parse_region("0,0,0,40").is_err());
}

#[test]
fn test_default_args() {
    let args = Args::try_parse_from(["glimpse"]).unwrap();

    assert_eq!(args.region, CaptureRegion::new(0, 0, 800, 200));
    assert_eq!(args.profile, "main");
    assert!(!args.live);
    assert!(!args.no_hotkey);
    assert_eq!(args.interval_ms, None);
}

#[test]
fn test_live_args() {
    let args = Args::try_parse_from([
        "glimpse",
        "--live",
        "--interval-ms",
        "2500",
        "--region",
        "100,50,640,120",
        "--no-hotkey",
        "--json-logs",
    ])
    .unwrap();

    assert!(args.live);
    assert_eq!(args.interval_ms, Some(2500));
    assert_eq!(args.region, CaptureRegion::new(100, 50, 640, 120));
    assert!(args.no_hotkey);
    assert!(args.json_logs);
}

#[test]
fn test_bad_region_rejected_by_cli() {
    assert!(Args::try_parse_from(["glimpse", "--region", "1,2"]).is_err());
}
