use super::*;

#[test]
fn provisional_name_roundtrip() {
    assert_eq!(provisional_window_name(1), "new-1");
    assert!(is_provisional_window_name("new-1"));
    assert!(is_provisional_window_name("new-42"));
    assert!(!is_provisional_window_name("abcd1234"));
    assert!(!is_provisional_window_name("new-"));
    assert!(!is_provisional_window_name("new-abc"));
}

#[test]
fn assistant_window_name_truncates_to_eight() {
    assert_eq!(assistant_window_name("abcd1234-5678-90ab"), "abcd1234");
    assert_eq!(assistant_window_name("short"), "short");
}

#[test]
fn resurrectable_requires_terminated_known_id_nonprovisional_window() {
    let mut s = Session::new_starting("t1", "c1", "new-1", "/tmp", 0);
    assert!(!s.resurrectable());

    s.status = Status::Terminated;
    assert!(!s.resurrectable(), "no assistant_id yet");

    s.assistant_id = Some("abcd1234-xyz".to_owned());
    assert!(!s.resurrectable(), "window still provisional");

    s.window = "abcd1234".to_owned();
    assert!(s.resurrectable());
}

#[test]
fn starting_session_defaults() {
    let s = Session::new_starting("t1", "c1", "new-1", "/tmp", 100);
    assert_eq!(s.status, Status::Starting);
    assert!(s.assistant_id.is_none());
    assert!(!s.pending_permission);
    assert_eq!(s.created_at, 100);
    assert_eq!(s.last_activity, 100);
}
