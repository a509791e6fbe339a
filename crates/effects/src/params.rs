//! Parameter validation and lookup.
//!
//! Effect programs read parameters leniently (missing or mistyped values
//! fall back to the definition's default); validation is where bad values
//! are rejected.

use ps_common::{ParamDef, ParamMap, ParamType, ParamValue};

use crate::error::{type_kind, value_kind, EffectError};

/// Check every supplied value against `defs`. Absent parameters are fine.
pub fn validate_params(defs: &[ParamDef], params: &ParamMap) -> Result<(), EffectError> {
    params.iter().try_for_each(|(name, value)| {
        let def = defs
            .iter()
            .find(|d| d.name == *name)
            .ok_or_else(|| EffectError::UnknownParam(name.clone()))?;
        validate_single_param(def, value)
    })
}

/// Check one value. NaN is never in range.
pub fn validate_single_param(def: &ParamDef, value: &ParamValue) -> Result<(), EffectError> {
    let (v, min, max) = match (&def.param_type, value) {
        (ParamType::Float { min, max }, ParamValue::Float(v)) => {
            (f64::from(*v), f64::from(*min), f64::from(*max))
        }
        (ParamType::Int { min, max }, ParamValue::Int(v)) => {
            (f64::from(*v), f64::from(*min), f64::from(*max))
        }
        (ParamType::Bool, ParamValue::Bool(_))
        | (ParamType::Color, ParamValue::Color(_))
        | (ParamType::Vec2, ParamValue::Vec2(_)) => return Ok(()),
        (expected, got) => {
            return Err(EffectError::WrongKind {
                param: def.name.clone(),
                expected: type_kind(expected),
                got: value_kind(got),
            })
        }
    };
    if (min..=max).contains(&v) {
        Ok(())
    } else {
        Err(EffectError::OutOfRange {
            param: def.name.clone(),
            value: v,
            min,
            max,
        })
    }
}

/// Get a parameter value from the supplied params, falling back to the default.
///
/// Returns `None` only if the parameter name is not found in either `params` or `defs`.
pub fn get_param_or_default<'a>(
    name: &str,
    params: &'a ParamMap,
    defs: &'a [ParamDef],
) -> Option<&'a ParamValue> {
    params
        .get(name)
        .or_else(|| defs.iter().find(|d| d.name == name).map(|d| &d.default))
}

/// Parameter map filled with every definition's default value.
pub fn default_params(defs: &[ParamDef]) -> ParamMap {
    defs.iter()
        .map(|d| (d.name.clone(), d.default.clone()))
        .collect()
}

/// Helper to extract a float parameter, with fallback to default.
pub fn get_float(name: &str, params: &ParamMap, defs: &[ParamDef]) -> f32 {
    get_param_or_default(name, params, defs)
        .and_then(ParamValue::as_float)
        .unwrap_or(0.0)
}

/// Helper to extract an int parameter, with fallback to default.
pub fn get_int(name: &str, params: &ParamMap, defs: &[ParamDef]) -> i32 {
    get_param_or_default(name, params, defs)
        .and_then(ParamValue::as_int)
        .unwrap_or(0)
}

/// Helper to extract a bool parameter, with fallback to default.
pub fn get_bool(name: &str, params: &ParamMap, defs: &[ParamDef]) -> bool {
    get_param_or_default(name, params, defs)
        .and_then(ParamValue::as_bool)
        .unwrap_or(false)
}

/// Helper to extract a color parameter, with fallback to default.
pub fn get_color(name: &str, params: &ParamMap, defs: &[ParamDef]) -> [f32; 4] {
    get_param_or_default(name, params, defs)
        .and_then(ParamValue::as_color)
        .unwrap_or([0.0, 0.0, 0.0, 1.0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_defs() -> Vec<ParamDef> {
        vec![
            ParamDef {
                name: "brightness".to_string(),
                display_name: "Brightness".to_string(),
                param_type: ParamType::Float {
                    min: -1.0,
                    max: 1.0,
                },
                default: ParamValue::Float(0.0),
            },
            ParamDef {
                name: "contrast".to_string(),
                display_name: "Contrast".to_string(),
                param_type: ParamType::Float { min: 0.0, max: 3.0 },
                default: ParamValue::Float(1.0),
            },
            ParamDef {
                name: "seed".to_string(),
                display_name: "Seed".to_string(),
                param_type: ParamType::Int { min: 0, max: 100 },
                default: ParamValue::Int(7),
            },
            ParamDef {
                name: "monochrome".to_string(),
                display_name: "Monochrome".to_string(),
                param_type: ParamType::Bool,
                default: ParamValue::Bool(false),
            },
        ]
    }

    fn params(entries: &[(&str, ParamValue)]) -> ParamMap {
        entries
            .iter()
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn validate_valid_params() {
        let defs = sample_defs();
        let p = params(&[
            ("brightness", ParamValue::Float(0.5)),
            ("contrast", ParamValue::Float(1.5)),
        ]);
        assert!(validate_params(&defs, &p).is_ok());
    }

    #[test]
    fn validate_out_of_range() {
        let defs = sample_defs();
        let p = params(&[("brightness", ParamValue::Float(2.0))]);
        let err = validate_params(&defs, &p).unwrap_err();
        assert!(matches!(err, EffectError::OutOfRange { .. }));

        let p = params(&[("seed", ParamValue::Int(101))]);
        let err = validate_params(&defs, &p).unwrap_err();
        assert_eq!(
            err,
            EffectError::OutOfRange {
                param: "seed".to_string(),
                value: 101.0,
                min: 0.0,
                max: 100.0,
            }
        );
    }

    #[test]
    fn validate_rejects_nan() {
        let defs = sample_defs();
        let p = params(&[("brightness", ParamValue::Float(f32::NAN))]);
        assert!(validate_params(&defs, &p).is_err());
    }

    #[test]
    fn validate_unknown_param() {
        let defs = sample_defs();
        let p = params(&[("nonexistent", ParamValue::Float(0.0))]);
        let err = validate_params(&defs, &p).unwrap_err();
        assert_eq!(err, EffectError::UnknownParam("nonexistent".to_string()));
    }

    #[test]
    fn validate_type_mismatch() {
        let defs = sample_defs();
        let p = params(&[("brightness", ParamValue::Bool(true))]);
        let err = validate_params(&defs, &p).unwrap_err();
        assert_eq!(
            err,
            EffectError::WrongKind {
                param: "brightness".to_string(),
                expected: "float",
                got: "bool",
            }
        );
    }

    #[test]
    fn get_param_returns_supplied_value() {
        let defs = sample_defs();
        let p = params(&[("brightness", ParamValue::Float(0.7))]);
        let val = get_param_or_default("brightness", &p, &defs).unwrap();
        assert_eq!(val.as_float(), Some(0.7));
    }

    #[test]
    fn get_param_falls_back_to_default() {
        let defs = sample_defs();
        let p = ParamMap::new();
        assert_eq!(get_float("contrast", &p, &defs), 1.0);
        assert_eq!(get_int("seed", &p, &defs), 7);
        assert!(!get_bool("monochrome", &p, &defs));
        assert!(get_param_or_default("nonexistent", &p, &defs).is_none());
    }

    #[test]
    fn default_params_cover_every_def() {
        let defs = sample_defs();
        let p = default_params(&defs);
        assert_eq!(p.len(), defs.len());
        assert!(validate_params(&defs, &p).is_ok());
    }
}
