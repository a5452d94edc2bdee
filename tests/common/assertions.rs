//! Assertion helpers over received events

use xfboard::shared::ServerEvent;

/// Names of the events, in receipt order
pub fn names(events: &[ServerEvent]) -> Vec<&str> {
    events.iter().map(|e| e.event.as_str()).collect()
}

/// Find the first event called `name`, panicking with the received list otherwise
pub fn find<'a>(events: &'a [ServerEvent], name: &str) -> &'a ServerEvent {
    events
        .iter()
        .find(|e| e.event == name)
        .unwrap_or_else(|| panic!("no {} in {:?}", name, names(events)))
}

/// Assert `events` holds exactly one `error` carrying `code`
pub fn assert_single_error(events: &[ServerEvent], code: &str) {
    assert_eq!(names(events), vec!["error"], "expected one error event");
    assert_eq!(events[0].error_code(), Some(code));
}
