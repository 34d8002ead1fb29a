mod common;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use qtml::{render, Error, JsonErrorKind};
use serde_json::json;

#[test]
fn identity_on_plain_text() {
    assert_eq!(render("no tags here", "{}", false).unwrap(), "no tags here");
}

#[test]
fn variable_holding_an_expression() {
    let data = json!({"eq": "((1+2)^3)/2"}).to_string();
    assert_eq!(
        render("{v:eq} = {math: {v:eq}}", &data, false).unwrap(),
        "((1+2)^3)/2 = 13.5"
    );
}

#[test]
fn floating_point_canonical_formatting() {
    assert_eq!(
        render("(0.1 + 0.2) is {math: 0.1 + 0.2}", "{}", false).unwrap(),
        "(0.1 + 0.2) is 0.3"
    );
    assert_eq!(
        render("(0.1 + 0.2) is {math:   0.1   +   0.2  }", "{}", false).unwrap(),
        "(0.1 + 0.2) is 0.3"
    );
}

#[test]
fn inline_conditional_true_branch() {
    let data = json!({"qen": "Qentem"}).to_string();
    assert_eq!(
        render(r#"{iif case="{v:qen} = Qentem" true="{v:qen}"} Engine"#, &data, false).unwrap(),
        "Qentem Engine"
    );
}

#[test]
fn inline_conditional_false_branch() {
    let data = json!({"numbers": [1, 2, 3, 4, 5]}).to_string();
    assert_eq!(
        render(
            r#"{iif case="{v:numbers[0]} = {v:numbers[4]}" false="it's not {v:numbers[4]}!"}"#,
            &data,
            false
        )
        .unwrap(),
        "it's not 5!"
    );
}

#[test]
fn inline_conditional_missing_branch_is_empty() {
    assert_eq!(render(r#"[{iif case="1" false="no"}]"#, "{}", false).unwrap(), "[]");
    assert_eq!(render(r#"[{iif case="0" true="yes"}]"#, "{}", false).unwrap(), "[]");
}

#[test]
fn json_comment_tolerance() {
    let data = "{\n  // the answer\n  \"a\": 42 /* inline */\n}";
    assert_eq!(render("{v:a}", data, true).unwrap(), "42");
    match render("{v:a}", data, false) {
        Err(Error::Json(err)) => assert_eq!(err.kind, JsonErrorKind::CommentNotAllowed),
        other => panic!("expected a JSON syntax error, got {other:?}"),
    }
}

#[test]
fn unresolved_reference_is_empty() {
    assert_eq!(render("{v:missing}", "{}", false).unwrap(), "");
    assert_eq!(render("a{v:x.y.z}b", r#"{"x": {"y": 1}}"#, false).unwrap(), "ab");
}

#[test]
fn syntax_errors_are_fatal() {
    assert!(matches!(render("{v:a}", "{", false), Err(Error::Json(_))));
    assert!(matches!(render("<loop set=\"a\">", "{}", false), Err(Error::Template(_))));
    assert!(matches!(render("{math: 1 + 2", "{}", false), Err(Error::Template(_))));
}

proptest! {
    #[test]
    fn literal_text_is_idempotent(text in "[^{<]*") {
        prop_assert_eq!(render(&text, "{}", false).unwrap(), text);
    }

    #[test]
    fn integer_arithmetic_renders_without_decimal_point(a in -100_000i64..100_000, b in -100_000i64..100_000) {
        let out = render(&format!("{{math: {a} + {b}}}|{{math: {a} * {b}}}"), "{}", false).unwrap();
        prop_assert_eq!(out, format!("{}|{}", a + b, a * b));
    }

    #[test]
    fn decimal_sums_round_trip(a in 0u32..10_000, b in 0u32..10_000) {
        // Two-decimal operands: the rendered sum is the exact decimal sum.
        let out = render(
            &format!("{{math: {}.{:02} + {}.{:02}}}", a / 100, a % 100, b / 100, b % 100),
            "{}",
            false,
        )
        .unwrap();
        let expected = (a + b) as f64 / 100.0;
        prop_assert_eq!(out.parse::<f64>().unwrap(), expected);
    }
}
