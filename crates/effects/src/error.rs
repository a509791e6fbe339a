//! Why an effect layer's parameters were rejected.
//!
//! The editor surfaces these when a layer is added or edited; at render time
//! the backend folds them into [`GpuError::Dispatch`] so the compositor can
//! degrade the offending layer.

use ps_common::{EffectId, GpuError, ParamType, ParamValue};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum EffectError {
    #[error("No effect program named '{0}'")]
    UnknownEffect(EffectId),

    #[error("'{0}' is not a parameter of this effect")]
    UnknownParam(String),

    #[error("'{param}' = {value} is outside [{min}, {max}]")]
    OutOfRange {
        param: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("'{param}' takes a {expected} value, got {got}")]
    WrongKind {
        param: String,
        expected: &'static str,
        got: &'static str,
    },
}

impl EffectError {
    /// The parameter at fault, if any.
    pub fn param(&self) -> Option<&str> {
        match self {
            Self::UnknownEffect(_) => None,
            Self::UnknownParam(param)
            | Self::OutOfRange { param, .. }
            | Self::WrongKind { param, .. } => Some(param),
        }
    }

    /// Render-time form: a dispatch of `effect` that cannot run.
    pub fn into_dispatch(self, effect: &EffectId) -> GpuError {
        GpuError::Dispatch {
            effect: effect.clone(),
            reason: self.to_string(),
        }
    }
}

pub(crate) fn type_kind(ty: &ParamType) -> &'static str {
    match ty {
        ParamType::Float { .. } => "float",
        ParamType::Int { .. } => "int",
        ParamType::Bool => "bool",
        ParamType::Color => "color",
        ParamType::Vec2 => "vec2",
    }
}

pub(crate) fn value_kind(value: &ParamValue) -> &'static str {
    match value {
        ParamValue::Float(_) => "float",
        ParamValue::Int(_) => "int",
        ParamValue::Bool(_) => "bool",
        ParamValue::Color(_) => "color",
        ParamValue::Vec2(_) => "vec2",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_message() {
        let err = EffectError::OutOfRange {
            param: "brightness".to_string(),
            value: 2.0,
            min: -1.0,
            max: 1.0,
        };
        assert_eq!(err.to_string(), "'brightness' = 2 is outside [-1, 1]");
        assert_eq!(err.param(), Some("brightness"));
    }

    #[test]
    fn dispatch_keeps_effect_and_reason() {
        let effect = EffectId::new("vignette");
        let err = EffectError::UnknownParam("radius".to_string()).into_dispatch(&effect);
        match err {
            GpuError::Dispatch { effect: id, reason } => {
                assert_eq!(id, effect);
                assert!(reason.contains("radius"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
