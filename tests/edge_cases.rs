mod common;

use pretty_assertions::assert_eq;
use qtml::{render, Error, TemplateErrorKind};

fn template_error(template: &str) -> (TemplateErrorKind, usize) {
    match render(template, "{}", false) {
        Err(Error::Template(err)) => (err.kind, err.offset),
        other => panic!("expected template error for {template:?}, got {other:?}"),
    }
}

// ── Text handling ──

#[test]
fn empty_template_renders_empty() {
    assert_eq!(render("", "{}", false).unwrap(), "");
}

#[test]
fn markup_and_css_braces_pass_through() {
    let template = "<style>p { color: red; }</style><p class=\"x\">{v:t}</p>";
    assert_eq!(
        render(template, r#"{"t": "hi"}"#, false).unwrap(),
        "<style>p { color: red; }</style><p class=\"x\">hi</p>"
    );
}

#[test]
fn newlines_and_unicode_are_preserved() {
    let template = "héllo\n{v:w}\r\n\n";
    assert_eq!(render(template, r#"{"w": "wörld ✓"}"#, false).unwrap(), "héllo\nwörld ✓\r\n\n");
}

// ── Loops ──

#[test]
fn empty_collections_render_nothing() {
    let template = "[<loop set=\"a\">x</loop><loop set=\"o\">y</loop>]";
    assert_eq!(render(template, r#"{"a": [], "o": {}}"#, false).unwrap(), "[]");
}

#[test]
fn loop_without_bindings_repeats_body() {
    assert_eq!(
        render("<loop set=\"a\">*</loop>", r#"{"a": [null, null, null]}"#, false).unwrap(),
        "***"
    );
}

#[test]
fn loop_over_nested_path() {
    let data = r#"{"lvl2": {"numbers": [1, 2, 3]}}"#;
    assert_eq!(
        render("<loop set=\"lvl2[numbers]\" var=\"id\">{v:id}:{v:lvl2[numbers][id]} </loop>", data, false).unwrap(),
        "0:1 1:2 2:3 "
    );
}

#[test]
fn bindings_are_popped_after_the_loop() {
    let data = r#"{"xs": [1], "x": "root"}"#;
    assert_eq!(
        render("<loop set=\"xs\" value=\"x\">{v:x}</loop>|{v:x}", data, false).unwrap(),
        "1|root"
    );
}

#[test]
fn sequential_loops() {
    let data = r#"{"strings": {"a": "A", "b": "B"}, "strings2": ["E", "F"]}"#;
    let template = concat!(
        "<loop set=\"strings\" value=\"s_value\" key=\"s_key\">{v:s_key}: {v:s_value}\n</loop>--\n",
        "<loop set=\"strings2\" value=\"s_value\" key=\"s_key\">{v:s_key}: {v:s_value}\n</loop>",
    );
    assert_eq!(
        render(template, data, false).unwrap(),
        "a: A\nb: B\n--\n0: E\n1: F\n"
    );
}

// ── Conditionals ──

#[test]
fn nested_ifs() {
    assert_eq!(
        render(" <if case=\"1\"><if case=\"1\"><if case=\"1\"><if case=\"1\">8</if></if></if></if>", "{}", false).unwrap(),
        " 8"
    );
}

#[test]
fn else_chains() {
    assert_eq!(render("<if case=\"1\">4<else /> 6 </if>", "{}", false).unwrap(), "4");
    assert_eq!(render("<if case=\"0\"> 4 <else />6</if>", "{}", false).unwrap(), "6");
    assert_eq!(
        render("<if case=\"0\"> 4 <else /><if case=\"0\"> 4 <else /><if case=\"0\"> 4 <else />7</if></if></if>", "{}", false).unwrap(),
        "7"
    );
    assert_eq!(render("<if case=\"0\"><else />91</if>", "{}", false).unwrap(), "91");
    assert_eq!(
        render("<if case=\"0\">4<elseif case=\"0\" /> 6 <elseif case=\"1\" />9</if>", "{}", false).unwrap(),
        "9"
    );
}

#[test]
fn logical_operators_in_case() {
    let data = r#"{"role": "user", "n": 4}"#;
    let template = "<if case=\"{v:role} = admin || {v:n} > 3 && {v:n} < 10\">Y<else />N</if>";
    assert_eq!(render(template, data, false).unwrap(), "Y");
}

#[test]
fn booleans_in_case() {
    let data = r#"{"on": true, "off": false}"#;
    assert_eq!(
        render("<if case=\"{v:on}\">a</if><if case=\"{v:off}\">b</if><if case=\"!{v:off}\">c</if>", data, false).unwrap(),
        "ac"
    );
}

// ── Malformed templates fail loudly ──

#[test]
fn unclosed_brace_tags() {
    assert_eq!(template_error("ab {v:x"), (TemplateErrorKind::UnclosedTag("{v:"), 3));
    assert_eq!(template_error("{iif case=\"1\""), (TemplateErrorKind::UnclosedTag("{iif"), 0));
}

#[test]
fn unclosed_blocks() {
    assert_eq!(template_error("<loop set=\"a\">"), (TemplateErrorKind::UnclosedBlock("loop"), 0));
    assert_eq!(template_error("x<if case=\"1\">y"), (TemplateErrorKind::UnclosedBlock("if"), 1));
    assert_eq!(template_error("<if case=\"1\""), (TemplateErrorKind::UnclosedTag("<if"), 0));
}

#[test]
fn stray_closing_tags() {
    assert_eq!(template_error("</loop>"), (TemplateErrorKind::UnexpectedTag("</loop>"), 0));
    assert_eq!(template_error("a<else />"), (TemplateErrorKind::UnexpectedTag("<else />"), 1));
}

#[test]
fn invalid_variable_path() {
    let (kind, offset) = template_error("xx{v:a[b}");
    assert_eq!(kind, TemplateErrorKind::InvalidPath("a[b".into()));
    assert_eq!(offset, 2);
}

// ── Data quirks ──

#[test]
fn duplicate_json_keys_keep_first_position_and_last_value() {
    let data = r#"{"o": {"a": 1, "b": 2, "a": 3}}"#;
    assert_eq!(
        render("<loop set=\"o\" key=\"k\" value=\"v\">{v:k}={v:v} </loop>", data, false).unwrap(),
        "a=3 b=2 "
    );
}

#[test]
fn json_string_escapes() {
    let data = r#"{"s": "tab\tquote\" snow☃ clef𝄞"}"#;
    assert_eq!(render("{v:s}", data, false).unwrap(), "tab\tquote\" snow☃ clef𝄞");
}

#[test]
fn keys_with_spaces_via_quoted_brackets() {
    let data = r#"{"major": {"Computer Science": ["Oliver"]}}"#;
    assert_eq!(render("{v:major['Computer Science'][0]}", data, false).unwrap(), "Oliver");
}

// ── Oversized input stays bounded ──

#[test]
fn long_flat_sum_renders_empty() {
    let sum = vec!["1"; 10_000].join("+");
    assert_eq!(render(&format!("[{{math: {sum}}}]"), "{}", false).unwrap(), "[]");
    assert_eq!(
        render(&format!("<if case=\"{sum}\">x<else />y</if>"), "{}", false).unwrap(),
        "y"
    );
    let short = vec!["1"; 100].join("+");
    assert_eq!(render(&format!("{{math: {short}}}"), "{}", false).unwrap(), "100");
}

#[test]
fn deeply_bracketed_path_is_rejected() {
    let path = format!("a{}x{}", "[".repeat(10_000), "]".repeat(10_000));
    assert_eq!(
        template_error(&format!("ok {{v:{path}}}")),
        (TemplateErrorKind::TooDeep, 3)
    );
}

#[test]
fn name_after_bracket_needs_a_dot() {
    let (kind, offset) = template_error("{v:a[b]c}");
    assert_eq!(kind, TemplateErrorKind::InvalidPath("a[b]c".into()));
    assert_eq!(offset, 0);
    assert_eq!(render("{v:a[b].c}", r#"{"a": {"b": {"c": 5}}}"#, false).unwrap(), "5");
}

// ── Number and escape syntax ──

#[test]
fn exponent_literals_in_expressions() {
    assert_eq!(render("{math: 1e+3 + 1}", "{}", false).unwrap(), "1001");
    let data = r#"{"g": "2.5e-1"}"#;
    assert_eq!(
        render("<if case=\"{v:g} < 0.3\">low</if>", data, false).unwrap(),
        "low"
    );
}

#[test]
fn unicode_escape_rejects_signs() {
    match render("{v:a}", r#"{"a": "\u+041"}"#, false) {
        Err(Error::Json(err)) => assert_eq!(err.kind, qtml::JsonErrorKind::InvalidUnicode),
        other => panic!("expected a JSON syntax error, got {other:?}"),
    }
}
