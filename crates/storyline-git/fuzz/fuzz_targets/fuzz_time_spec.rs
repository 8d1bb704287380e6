#![no_main]

use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use storyline_git::{TimeWindow, parse_time_spec, parse_timestamp};

fuzz_target!(|data: &[u8]| {
    let Ok(spec) = std::str::from_utf8(data) else {
        return;
    };
    let Some(now) = Utc.timestamp_opt(1_767_225_600, 0).single() else {
        return;
    };

    // Absolute timestamps must resolve to themselves regardless of "now"
    if let Some(absolute) = parse_timestamp(spec) {
        assert_eq!(parse_time_spec(spec, now).ok(), Some(absolute));
    }

    if let Ok(window) = TimeWindow::resolve(Some(spec), None, now) {
        assert_eq!(window.until, now);
    }
});
