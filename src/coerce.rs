//! Value coercion.
//!
//! [`coerce_value`] converts one value to a host type; [`coerce_signature`]
//! binds a sequence of values to a parameter list and scores the binding so
//! overloads can be ranked.
//!
//! ## Scoring
//!
//! Every value bound to a parameter adds [`EXPLICIT_BONUS`]; every optional
//! parameter left to its default, and a variadic tail, adds
//! [`IMPLICIT_BONUS`]. The explicit bonus is larger than the total implicit
//! penalty any signature of at most [`MAX_PARAMETERS`] parameters can
//! accumulate, so a candidate binding more values always outranks one binding
//! fewer.

use rust_decimal::prelude::FromPrimitive;
use tether_core::{Decimal, HostArray, HostType, HostValue, Param, PrimitiveKind};

/// Score adjustment for a parameter filled without a value of its own.
pub const IMPLICIT_BONUS: i64 = -1;

/// Longest parameter list [`coerce_signature`] scores.
pub const MAX_PARAMETERS: usize = u16::MAX as usize;

/// Score adjustment for a value bound to its own parameter.
pub const EXPLICIT_BONUS: i64 = (MAX_PARAMETERS as i64 + 1) * -IMPLICIT_BONUS;

/// A successful signature binding.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureMatch {
    pub score: i64,
    /// One argument per parameter, in declaration order.
    pub arguments: Vec<HostValue>,
}

/// Convert `value` so it can be passed where `target` is expected.
///
/// Returns `None` when the value does not fit; never raises.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn coerce_value(value: &HostValue, target: &HostType) -> Option<HostValue> {
    if value.is_null() {
        return (!target.is_value_type() || target.is_nullable()).then_some(HostValue::Null);
    }

    let target = target.unwrap_nullable().unwrap_by_ref().unwrap_nullable();

    if let Some(integer) = value.integral()
        && let Some(kind) = target.primitive_kind()
        && let Some(converted) = narrow_integer(integer, kind)
    {
        return converted;
    }

    if let Some(float) = value.floating() {
        match target.primitive_kind() {
            Some(PrimitiveKind::Float32) => return Some(HostValue::F32(float as f32)),
            Some(PrimitiveKind::Float64) => return Some(HostValue::F64(float)),
            Some(PrimitiveKind::Decimal) => return Decimal::from_f64(float).map(HostValue::Decimal),
            _ => {}
        }
    }

    if let Some(text) = value.as_str()
        && target.primitive_kind() == Some(PrimitiveKind::Char)
    {
        let mut chars = text.chars();
        return match (chars.next(), chars.next()) {
            (Some(c), None) => Some(HostValue::Char(c)),
            _ => None,
        };
    }

    value.is_instance_of(target).then(|| value.clone())
}

/// Outer `None`: `kind` is not numeric, fall back to instance checks.
/// Inner `None`: the value does not fit.
fn narrow_integer(value: i128, kind: PrimitiveKind) -> Option<Option<HostValue>> {
    Some(match kind {
        PrimitiveKind::Int8 => i8::try_from(value).ok().map(HostValue::I8),
        PrimitiveKind::Int16 => i16::try_from(value).ok().map(HostValue::I16),
        PrimitiveKind::Int32 => i32::try_from(value).ok().map(HostValue::I32),
        PrimitiveKind::Int64 => i64::try_from(value).ok().map(HostValue::I64),
        PrimitiveKind::Uint8 => u8::try_from(value).ok().map(HostValue::U8),
        PrimitiveKind::Uint16 => u16::try_from(value).ok().map(HostValue::U16),
        PrimitiveKind::Uint32 => u32::try_from(value).ok().map(HostValue::U32),
        // reinterpreted, never range checked
        PrimitiveKind::Uint64 => Some(HostValue::U64(value as u64)),
        PrimitiveKind::Float32 => Some(HostValue::F32(value as f32)),
        PrimitiveKind::Float64 => Some(HostValue::F64(value as f64)),
        PrimitiveKind::Decimal => Decimal::try_from_i128_with_scale(value, 0)
            .ok()
            .map(HostValue::Decimal),
        PrimitiveKind::Bool | PrimitiveKind::Char => return None,
    })
}

/// Bind `values` to `params` left to right and score the binding.
///
/// Out parameters consume no value. A trailing variadic parameter first tries
/// to absorb every remaining value; if any of them does not fit the element
/// type, the parameter is bound like an ordinary one. The binding fails unless
/// every value is consumed.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn coerce_signature(values: &[HostValue], params: &[Param]) -> Option<SignatureMatch> {
    if params.len() > MAX_PARAMETERS {
        return None;
    }

    let mut arguments = vec![HostValue::Null; params.len()];
    let mut score = 0;
    let mut cursor = 0;

    for (i, param) in params.iter().enumerate() {
        if param.is_out() {
            continue;
        }

        if i + 1 == params.len()
            && param.is_variadic()
            && let Some(array) = absorb_rest(&values[cursor.min(values.len())..], &param.ty)
        {
            arguments[i] = HostValue::Array(array);
            return Some(SignatureMatch {
                score: score + IMPLICIT_BONUS,
                arguments,
            });
        }

        match values.get(cursor) {
            Some(value) => {
                arguments[i] = coerce_value(value, &param.ty)?;
                cursor += 1;
                score += EXPLICIT_BONUS;
            }
            None if param.is_optional() => {
                arguments[i] = param.default.clone();
                score += IMPLICIT_BONUS;
            }
            None => return None,
        }
    }

    (cursor == values.len()).then_some(SignatureMatch { score, arguments })
}

fn absorb_rest(rest: &[HostValue], array_type: &HostType) -> Option<HostArray> {
    let element = array_type.element_type()?;
    let items = rest
        .iter()
        .map(|value| coerce_value(value, element))
        .collect::<Option<Vec<_>>>()?;
    Some(HostArray::new(element.clone(), items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::TypeInfo;

    fn int() -> HostType {
        HostType::primitive(PrimitiveKind::Int32)
    }

    #[test]
    fn bonus_ordering_holds_for_the_longest_signature() {
        assert!(EXPLICIT_BONUS > MAX_PARAMETERS as i64 * -IMPLICIT_BONUS);
    }

    #[test]
    fn null_fits_reference_and_nullable_types_only() {
        assert_eq!(coerce_value(&HostValue::Null, &HostType::string()), Some(HostValue::Null));
        assert_eq!(coerce_value(&HostValue::Null, &HostType::nullable_of(int())), Some(HostValue::Null));
        assert_eq!(coerce_value(&HostValue::Null, &int()), None);
    }

    #[test]
    fn integers_narrow_with_range_checks() {
        let byte = HostType::primitive(PrimitiveKind::Uint8);
        assert_eq!(coerce_value(&HostValue::I64(100), &byte), Some(HostValue::U8(100)));
        assert_eq!(coerce_value(&HostValue::I64(300), &byte), None);
        assert_eq!(coerce_value(&HostValue::I64(-1), &byte), None);
        assert_eq!(
            coerce_value(&HostValue::I64(-1), &HostType::primitive(PrimitiveKind::Uint64)),
            Some(HostValue::U64(u64::MAX))
        );
        assert_eq!(
            coerce_value(&HostValue::I64(3), &HostType::primitive(PrimitiveKind::Float64)),
            Some(HostValue::F64(3.0))
        );
    }

    #[test]
    fn targets_unwrap_nullable_and_by_ref() {
        let target = HostType::nullable_of(int());
        assert_eq!(coerce_value(&HostValue::I64(7), &target), Some(HostValue::I32(7)));
        let target = HostType::by_ref(int());
        assert_eq!(coerce_value(&HostValue::I64(7), &target), Some(HostValue::I32(7)));
    }

    #[test]
    fn floats_narrow_to_single_and_decimal() {
        assert_eq!(
            coerce_value(&HostValue::F64(1.5), &HostType::primitive(PrimitiveKind::Float32)),
            Some(HostValue::F32(1.5))
        );
        assert_eq!(
            coerce_value(&HostValue::F64(2.25), &HostType::primitive(PrimitiveKind::Decimal)),
            Some(HostValue::Decimal(Decimal::new(225, 2)))
        );
        assert_eq!(coerce_value(&HostValue::F64(1.5), &int()), None);
    }

    #[test]
    fn decimal_targets_reject_out_of_range_values() {
        let decimal = HostType::primitive(PrimitiveKind::Decimal);
        assert_eq!(coerce_value(&HostValue::F64(f64::NAN), &decimal), None);
        assert_eq!(coerce_value(&HostValue::F64(1e30), &decimal), None);
        assert_eq!(
            coerce_value(&HostValue::I64(-12), &decimal),
            Some(HostValue::Decimal(Decimal::new(-12, 0)))
        );
        assert!(coerce_value(&HostValue::U64(u64::MAX), &decimal).is_some());
    }

    #[test]
    fn single_character_strings_become_chars() {
        let char_type = HostType::primitive(PrimitiveKind::Char);
        assert_eq!(coerce_value(&HostValue::from("x"), &char_type), Some(HostValue::Char('x')));
        assert_eq!(coerce_value(&HostValue::from("xy"), &char_type), None);
        assert_eq!(coerce_value(&HostValue::from(""), &char_type), None);
    }

    #[test]
    fn everything_fits_object() {
        assert_eq!(coerce_value(&HostValue::I64(1), &HostType::object()), Some(HostValue::I64(1)));
        assert_eq!(coerce_value(&HostValue::Bool(true), &int()), None);
    }

    #[test]
    fn subtypes_pass_unchanged() {
        let animal = TypeInfo::class("Animal").build();
        let dog = TypeInfo::class("Dog").with_base(animal.clone()).build();
        let value = HostValue::Object(tether_core::HostObject::new(dog, ()));
        assert_eq!(coerce_value(&value, &animal), Some(value.clone()));
        assert_eq!(coerce_value(&value, &HostType::string()), None);
    }

    #[test]
    fn explicit_values_outrank_defaults() {
        let two = [Param::new("a", int()), Param::new("b", int())];
        let one_and_default = [
            Param::new("a", int()),
            Param::optional("b", int(), HostValue::I32(0)),
        ];
        let values = [HostValue::I64(1), HostValue::I64(2)];
        let exact = coerce_signature(&values, &two).unwrap();
        assert_eq!(exact.score, 2 * EXPLICIT_BONUS);

        let partial = coerce_signature(&values[..1], &one_and_default).unwrap();
        assert_eq!(partial.score, EXPLICIT_BONUS + IMPLICIT_BONUS);
        assert_eq!(partial.arguments, vec![HostValue::I32(1), HostValue::I32(0)]);
        assert!(exact.score > partial.score);
    }

    #[test]
    fn leftover_values_fail() {
        let params = [Param::new("a", int())];
        assert!(coerce_signature(&[HostValue::I64(1), HostValue::I64(2)], &params).is_none());
        assert!(coerce_signature(&[], &params).is_none());
    }

    #[test]
    fn out_parameters_consume_nothing() {
        let params = [Param::new("a", int()), Param::out("result", int())];
        let bound = coerce_signature(&[HostValue::I64(4)], &params).unwrap();
        assert_eq!(bound.score, EXPLICIT_BONUS);
        assert_eq!(bound.arguments, vec![HostValue::I32(4), HostValue::Null]);
    }

    #[test]
    fn variadic_tail_absorbs_the_rest() {
        let params = [Param::new("first", int()), Param::variadic("rest", int())];
        let values = [HostValue::I64(1), HostValue::I64(2), HostValue::I64(3)];
        let bound = coerce_signature(&values, &params).unwrap();
        assert_eq!(bound.score, EXPLICIT_BONUS + IMPLICIT_BONUS);
        match &bound.arguments[1] {
            HostValue::Array(array) => assert_eq!(array.to_vec(), vec![HostValue::I32(2), HostValue::I32(3)]),
            other => panic!("expected array, got {other:?}"),
        }

        let empty = coerce_signature(&values[..1], &params).unwrap();
        assert_eq!(empty.score, EXPLICIT_BONUS + IMPLICIT_BONUS);
    }

    #[test]
    fn variadic_tail_falls_back_to_a_plain_array_argument() {
        let params = [Param::variadic("items", int())];
        let array = HostValue::Array(HostArray::new(int(), vec![HostValue::I32(1)]));
        let bound = coerce_signature(&[array.clone()], &params).unwrap();
        assert_eq!(bound.score, EXPLICIT_BONUS);
        assert_eq!(bound.arguments, vec![array]);
    }
}
