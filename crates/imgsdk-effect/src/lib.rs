#![forbid(unsafe_code)]

//! Effect command grammar.
//!
//! An effect command is a JSON object whose string field `"effect"` names the effect, with
//! the effect's integer parameters as sibling fields:
//!
//! ```json
//! { "effect": "Clip", "x": 0, "y": 0, "w": 64, "h": 32 }
//! ```
//!
//! Parsing only validates. The render path draws an unparameterized full-surface quad and
//! does not consume the descriptor yet.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

use std::fmt;

use imgsdk_core::SdkError;
use serde::Serialize;
use serde_json::{Map, Value};

/// Field carrying the effect name.
pub const DISCRIMINATOR: &str = "effect";

// -------------------------------------------------------------------------------------------------
// Kinds
// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EffectKind {
    Normal,
    Rotate,
    Scale,
    Clip,
    Skin,
    Eye,
}

impl EffectKind {
    pub const ALL: [EffectKind; 6] = [
        EffectKind::Normal,
        EffectKind::Rotate,
        EffectKind::Scale,
        EffectKind::Clip,
        EffectKind::Skin,
        EffectKind::Eye,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Normal => "Normal",
            EffectKind::Rotate => "Rotate",
            EffectKind::Scale => "Scale",
            EffectKind::Clip => "Clip",
            EffectKind::Skin => "Skin",
            EffectKind::Eye => "Eye",
        }
    }

    /// Parameter field names, in the order they are stored in [`EffectDescriptor::params`].
    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            EffectKind::Normal => &[],
            EffectKind::Rotate => &["degree"],
            EffectKind::Scale => &["percent"],
            EffectKind::Clip => &["x", "y", "w", "h"],
            EffectKind::Skin | EffectKind::Eye => &[],
        }
    }

    pub fn is_implemented(self) -> bool {
        !matches!(self, EffectKind::Skin | EffectKind::Eye)
    }

    pub fn from_name(name: &str) -> Option<EffectKind> {
        EffectKind::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// -------------------------------------------------------------------------------------------------
// Descriptor
// -------------------------------------------------------------------------------------------------

/// A validated effect command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectDescriptor {
    pub kind: EffectKind,
    pub params: Vec<i32>,
}

impl EffectDescriptor {
    pub fn normal() -> Self {
        Self {
            kind: EffectKind::Normal,
            params: Vec::new(),
        }
    }

    /// Looks up a parameter by its field name.
    pub fn param(&self, name: &str) -> Option<i32> {
        self.kind
            .param_names()
            .iter()
            .position(|n| *n == name)
            .and_then(|i| self.params.get(i).copied())
    }
}

// -------------------------------------------------------------------------------------------------
// Parsing
// -------------------------------------------------------------------------------------------------

/// True when `cmd` should be treated as an effect command rather than an image path.
pub fn looks_like_command(cmd: &str) -> bool {
    cmd.trim_start().starts_with('{')
}

/// Parses and validates an effect command.
///
/// Errors:
/// - malformed JSON, a non-object root, a missing or non-string `"effect"`, an unknown effect
///   name, or a missing or non-`i32` parameter: [`SdkError::InvalidCommand`]
/// - `Skin` / `Eye`: [`SdkError::NotImplemented`]
pub fn parse_command(json: &str) -> Result<EffectDescriptor, SdkError> {
    let root: Value = serde_json::from_str(json)
        .map_err(|e| SdkError::invalid_command(format!("malformed json: {e}")))?;
    let Value::Object(obj) = root else {
        return Err(SdkError::invalid_command("command must be a json object"));
    };

    let name = match obj.get(DISCRIMINATOR) {
        Some(Value::String(s)) => s.as_str(),
        Some(other) => {
            return Err(SdkError::invalid_command(format!(
                "\"{DISCRIMINATOR}\" must be a string (got {other})"
            )))
        }
        None => {
            return Err(SdkError::invalid_command(format!(
                "missing \"{DISCRIMINATOR}\" field"
            )))
        }
    };

    let Some(kind) = EffectKind::from_name(name) else {
        return Err(SdkError::invalid_command(format!("unknown effect '{name}'")));
    };
    if !kind.is_implemented() {
        return Err(SdkError::NotImplemented(kind.name().to_string()));
    }

    let params = kind
        .param_names()
        .iter()
        .map(|field| int_param(&obj, kind, field))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(%kind, ?params, "parsed effect command");
    Ok(EffectDescriptor { kind, params })
}

fn int_param(obj: &Map<String, Value>, kind: EffectKind, field: &str) -> Result<i32, SdkError> {
    let value = obj.get(field).ok_or_else(|| {
        SdkError::invalid_command(format!("{kind} requires integer \"{field}\""))
    })?;
    value
        .as_i64()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| {
            SdkError::invalid_command(format!(
                "{kind} parameter \"{field}\" must be a 32-bit integer (got {value})"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_carries_degree() {
        let d = parse_command(r#"{"effect":"Rotate","degree":45}"#).unwrap();
        assert_eq!(
            d,
            EffectDescriptor {
                kind: EffectKind::Rotate,
                params: vec![45]
            }
        );
        assert_eq!(d.param("degree"), Some(45));
    }

    #[test]
    fn rotate_without_degree_is_invalid() {
        let err = parse_command(r#"{"effect":"Rotate"}"#).unwrap_err();
        assert!(matches!(err, SdkError::InvalidCommand(_)), "{err}");
    }

    #[test]
    fn skin_and_eye_are_not_implemented() {
        for name in ["Skin", "Eye"] {
            let err = parse_command(&format!(r#"{{"effect":"{name}"}}"#)).unwrap_err();
            match err {
                SdkError::NotImplemented(n) => assert_eq!(n, name),
                other => panic!("unexpected: {other:?}"),
            }
        }
    }

    #[test]
    fn normal_has_no_params_and_ignores_extra_fields() {
        let d = parse_command(r#"{"effect":"Normal","note":"x"}"#).unwrap();
        assert_eq!(d, EffectDescriptor::normal());
    }

    #[test]
    fn clip_params_keep_field_order() {
        let d = parse_command(r#"{"h":4,"w":3,"y":2,"x":1,"effect":"Clip"}"#).unwrap();
        assert_eq!(d.kind, EffectKind::Clip);
        assert_eq!(d.params, vec![1, 2, 3, 4]);
    }

    #[test]
    fn scale_rejects_wrong_typed_param() {
        for bad in [
            r#"{"effect":"Scale","percent":"50"}"#,
            r#"{"effect":"Scale","percent":50.5}"#,
            r#"{"effect":"Scale","percent":4294967296}"#,
        ] {
            assert!(
                matches!(parse_command(bad), Err(SdkError::InvalidCommand(_))),
                "{bad}"
            );
        }
        assert_eq!(
            parse_command(r#"{"effect":"Scale","percent":-20}"#).unwrap().params,
            vec![-20]
        );
    }

    #[test]
    fn discriminator_problems_are_invalid() {
        for bad in [
            "{ not json",
            "[1,2]",
            r#"{"degree":45}"#,
            r#"{"effect":7}"#,
            r#"{"effect":"Sepia"}"#,
            r#"{"effect":"rotate","degree":1}"#,
        ] {
            assert!(
                matches!(parse_command(bad), Err(SdkError::InvalidCommand(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn command_detection() {
        assert!(looks_like_command(r#"  {"effect":"Normal"}"#));
        assert!(!looks_like_command("/sdcard/input.png"));
    }
}
