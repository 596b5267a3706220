use super::*;

#[test]
fn classifies_numeric_option_with_instructions() {
    match classify("2 please use the other approach") {
        Classification::OptionWithInstructions { option, instructions } => {
            assert_eq!(option, 2);
            assert_eq!(instructions, "please use the other approach");
        }
        other => panic!("unexpected classification: {other:?}"),
    }
}

#[test]
fn classifies_yes_with_instructions_as_option_one() {
    match classify("yes but skip the tests") {
        Classification::OptionWithInstructions { option, instructions } => {
            assert_eq!(option, 1);
            assert_eq!(instructions, "but skip the tests");
        }
        other => panic!("unexpected classification: {other:?}"),
    }
}

#[test]
fn classifies_no_with_instructions_as_option_three() {
    match classify("no, try a different file") {
        Classification::OptionWithInstructions { option, instructions } => {
            assert_eq!(option, 3);
            assert_eq!(instructions, "try a different file");
        }
        other => panic!("unexpected classification: {other:?}"),
    }
}

#[test]
fn classifies_bare_digit_as_simple_option() {
    assert_eq!(classify("4"), Classification::SimpleOption { option: 4 });
}

#[test]
fn classifies_yes_no_as_simple_option() {
    assert_eq!(classify("y"), Classification::SimpleOption { option: 1 });
    assert_eq!(classify("no"), Classification::SimpleOption { option: 3 });
}

#[test]
fn classifies_everything_else_as_free_text() {
    assert_eq!(classify("please fix the bug in parser.rs"), Classification::FreeText);
}

#[test]
fn is_plain_rejection_matches_only_bare_reject_forms() {
    assert!(is_plain_rejection("3"));
    assert!(is_plain_rejection("n"));
    assert!(is_plain_rejection("No"));
    assert!(!is_plain_rejection("no, try again"));
    assert!(!is_plain_rejection("2"));
}

#[test]
fn is_option_selection_excludes_free_text() {
    assert!(is_option_selection("1"));
    assert!(is_option_selection("2 amend it"));
    assert!(!is_option_selection("write me a poem"));
}

#[test]
fn plan_for_simple_option_is_a_single_literal_digit_no_enter() {
    assert_eq!(plan("1"), vec![Step::Literal("1".to_owned())]);
}

#[test]
fn plan_for_free_text_is_literal_then_double_enter() {
    assert_eq!(
        plan("hello there"),
        vec![
            Step::Literal("hello there".to_owned()),
            Step::Key("enter"),
            Step::Sleep(SleepKind::DoubleEnterGap),
            Step::Key("enter"),
        ]
    );
}

#[test]
fn plan_for_option_with_instructions_sends_down_n_minus_one_times() {
    let steps = plan("3 do it differently");
    let down_count = steps.iter().filter(|s| **s == Step::Key("down")).count();
    assert_eq!(down_count, 2);
    assert!(steps.contains(&Step::Key("tab")));
    assert!(steps.contains(&Step::Literal("do it differently".to_owned())));
    assert_eq!(steps.last(), Some(&Step::Key("enter")));
}

#[test]
fn plan_for_option_one_with_instructions_sends_no_down_presses() {
    let steps = plan("1 go ahead");
    assert!(!steps.contains(&Step::Key("down")));
}

#[test]
fn plan_for_option_with_instructions_uses_distinct_sleep_kinds() {
    let steps = plan("2 do it differently");
    assert_eq!(
        steps,
        vec![
            Step::Key("down"),
            Step::Sleep(SleepKind::DownKeyGap),
            Step::Key("tab"),
            Step::Sleep(SleepKind::AmendmentOpen),
            Step::Literal("do it differently".to_owned()),
            Step::Sleep(SleepKind::AmendmentSubmit),
            Step::Key("enter"),
        ]
    );
}

proptest::proptest! {
    #[test]
    fn classify_never_panics_on_arbitrary_text(text in ".*") {
        let _ = classify(&text);
    }
}
