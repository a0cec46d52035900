//! Global logging setup. Kept in its own test binary because installing a
//! subscriber affects every test in the process.

use drilljobs::{init_logging, TelemetryError};

#[test]
fn test_second_init_fails() {
    init_logging("warn", false).unwrap();

    let err = init_logging("info", true).unwrap_err();
    assert!(matches!(err, TelemetryError::Subscriber(_)));
}
