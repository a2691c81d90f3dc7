use imgsdk_core::SdkError;
use imgsdk_effect::{parse_command, EffectKind};

// ---- Golden commands ----

const ACCEPTED: &[(&str, EffectKind, &[i32])] = &[
    (r#"{"effect":"Normal"}"#, EffectKind::Normal, &[]),
    (r#"{"effect":"Rotate","degree":-90}"#, EffectKind::Rotate, &[-90]),
    (r#"{"effect":"Scale","percent":150}"#, EffectKind::Scale, &[150]),
    (
        r#"{"effect":"Clip","x":1,"y":2,"w":30,"h":40}"#,
        EffectKind::Clip,
        &[1, 2, 30, 40],
    ),
    (
        r#" {"degree":45,"effect":"Rotate","note":"extra keys are ignored"}"#,
        EffectKind::Rotate,
        &[45],
    ),
];

const REJECTED: &[&str] = &[
    "{",
    "[]",
    r#"{"kind":"Normal"}"#,
    r#"{"effect":7}"#,
    r#"{"effect":"normal"}"#,
    r#"{"effect":"Blur"}"#,
    r#"{"effect":"Rotate"}"#,
    r#"{"effect":"Rotate","degree":"90"}"#,
    r#"{"effect":"Scale","percent":1.5}"#,
    r#"{"effect":"Clip","x":1,"y":2,"w":3}"#,
    r#"{"effect":"Scale","percent":4294967296}"#,
];

#[test]
fn golden_commands_parse() {
    for (json, kind, params) in ACCEPTED {
        let d = parse_command(json).unwrap_or_else(|e| panic!("{json}: {e}"));
        assert_eq!(d.kind, *kind, "{json}");
        assert_eq!(d.params, *params, "{json}");
    }
}

#[test]
fn malformed_commands_are_invalid() {
    for json in REJECTED {
        let err = parse_command(json).expect_err(json);
        assert!(matches!(err, SdkError::InvalidCommand(_)), "{json}: got {err:?}");
    }
}

#[test]
fn parsed_but_unrendered_effects_are_not_implemented() {
    for json in [r#"{"effect":"Skin"}"#, r#"{"effect":"Eye","level":3}"#] {
        let err = parse_command(json).expect_err(json);
        assert!(matches!(err, SdkError::NotImplemented(_)), "{json}: got {err:?}");
    }
}

#[test]
fn descriptors_serialize_with_kind_names() {
    let d = parse_command(r#"{"effect":"Clip","x":0,"y":0,"w":8,"h":8}"#).expect("clip");
    let v = serde_json::to_value(&d).expect("serialize");
    assert_eq!(v["kind"], "Clip");
    assert_eq!(v["params"], serde_json::json!([0, 0, 8, 8]));
    assert_eq!(d.param("w"), Some(8));
    assert_eq!(d.param("degree"), None);
}
