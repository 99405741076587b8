//! Property-based tests for richlog using proptest

use chrono::{Duration, Local, TimeZone};
use proptest::prelude::*;
use richlog::prelude::*;
use richlog::render::{escape_markup, LayoutInput, LayoutRenderer};
use richlog::{TracebackRenderer, TracebackConfig};

const STANDARD_NAMES: [&str; 8] = [
    "NOTSET", "TRACE", "DEBUG", "INFO", "SUCCESS", "WARNING", "ERROR", "CRITICAL",
];

fn any_level() -> impl Strategy<Value = Level> {
    prop::sample::select(STANDARD_NAMES.to_vec())
        .prop_map(|name| Level::lookup(name).expect("standard level"))
}

// ============================================================================
// Level Tests
// ============================================================================

proptest! {
    /// Test that lookup ignores case
    #[test]
    fn test_level_lookup_case_insensitive(
        name in prop::sample::select(STANDARD_NAMES.to_vec()),
        use_lower in any::<bool>()
    ) {
        let input = if use_lower { name.to_lowercase() } else { name.to_string() };
        let level = Level::lookup(input.as_str()).unwrap();
        prop_assert_eq!(level.name(), name);
    }

    /// Test that looking up a resolved level returns it unchanged
    #[test]
    fn test_level_lookup_idempotent(level in any_level()) {
        let again = Level::lookup(&level).unwrap();
        prop_assert_eq!(again.name(), level.name());
        prop_assert_eq!(again.rank(), level.rank());
    }

    /// Test that threshold filtering follows rank ordering
    #[test]
    fn test_threshold_follows_rank(record in any_level(), threshold in any_level()) {
        prop_assert_eq!(
            record.is_enabled_for(&threshold),
            record.rank() >= threshold.rank()
        );
    }

    /// Test that unknown names never resolve
    #[test]
    fn test_unknown_names_not_found(name in "[a-z]{12,20}") {
        let is_not_found = matches!(Level::lookup(name.as_str()), Err(LogError::NotFound { .. }));
        prop_assert!(is_not_found);
    }
}

// ============================================================================
// Text Tests
// ============================================================================

proptest! {
    /// Test that escaped markup renders verbatim
    #[test]
    fn test_escaped_markup_is_verbatim(message in ".*") {
        let text = Text::from_markup(&escape_markup(&message));
        prop_assert_eq!(text.plain(), message.as_str());
        prop_assert!(text.spans().is_empty());
    }

    /// Test that wrapping respects the width and keeps every word character
    #[test]
    fn test_wrap_respects_width(message in "[a-z ]{0,200}", width in 1usize..40) {
        let lines = Text::new(message.clone()).wrap(width);
        for line in &lines {
            prop_assert!(line.cell_len() <= width, "{:?} wider than {}", line.plain(), width);
        }

        let kept: String = lines
            .iter()
            .flat_map(|line| line.plain().chars())
            .filter(|c| *c != ' ')
            .collect();
        let expected: String = message.chars().filter(|c| *c != ' ').collect();
        prop_assert_eq!(kept, expected);
    }
}

// ============================================================================
// Layout Tests
// ============================================================================

proptest! {
    /// Test that a time is shown only when it is past the omit interval
    #[test]
    fn test_repeated_time_dedup(gaps in prop::collection::vec(0i64..1_500, 1..30)) {
        let level = Level::info();
        let mut renderer = LayoutRenderer::new(RenderConfig::default());
        let start = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();

        let mut now = start;
        let mut last_shown = None;
        for gap in gaps {
            now += Duration::milliseconds(gap);
            let shown = last_shown.map_or(true, |last| now - last > Duration::milliseconds(500));
            if shown {
                last_shown = Some(now);
            }
            let mut input = LayoutInput::new(&level, now);
            input.message = Some(Text::new("tick"));
            let blocks = renderer.render(input, true);

            prop_assert_eq!(renderer.last_displayed_time(), last_shown);
            prop_assert_eq!(blocks.len(), if shown { 2 } else { 1 });
        }
    }
}

// ============================================================================
// Traceback Tests
// ============================================================================

proptest! {
    /// Test that elision keeps an equal number of frames on both ends
    #[test]
    fn test_elision_keeps_both_ends(count in 0usize..200, max_frames in 0usize..50) {
        let renderer = TracebackRenderer::new(TracebackConfig::default().with_max_frames(max_frames));
        match renderer.elided_range(count) {
            None => prop_assert!(max_frames == 0 || count <= max_frames),
            Some(range) => {
                prop_assert!(max_frames > 0 && count > max_frames);
                prop_assert_eq!(range.start, max_frames / 2);
                prop_assert_eq!(count - range.end, max_frames / 2);
                prop_assert!(!range.is_empty());
            }
        }
    }

    /// Test that rendering never fails for well-formed frames
    #[test]
    fn test_render_well_formed_traces(
        frames in prop::collection::vec(("[a-z_]{1,12}", 1u32..500), 0..40),
        message in "[ -~]{0,60}"
    ) {
        let frames = frames
            .into_iter()
            .map(|(name, line)| Frame::new("/nonexistent/module.rs", line, name))
            .collect();
        let trace = Trace::new(vec![Stack::new("RuntimeError", message).with_frames(frames)]);
        let renderer = TracebackRenderer::new(TracebackConfig::default()).with_restricted_host(true);
        prop_assert!(renderer.render(&trace).is_ok());
    }
}
