//! Parameter marshalling between loosely typed JSON and typed engine calls.
//!
//! Inputs are checked against a function's ordered schema ([`ParamSpec`])
//! and coerced into [`Args`]. Typed results are collected into [`Outputs`]
//! and flattened back into a JSON mapping with the exact key names the
//! schema declares.

use std::collections::HashMap;

use serde_json::Value;
use strum::Display;

use crate::derived::{DerivedSlot, DerivedSnapshot, SlotValue};
use crate::request::ParamMap;
use crate::{CallError, Result};

/// Shape a parameter is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ParamKind {
    #[strum(serialize = "integer")]
    Int,
    #[strum(serialize = "float")]
    Float,
    #[strum(serialize = "sequence of float")]
    FloatSeq,
    #[strum(serialize = "sequence of integer")]
    IntSeq,
}

/// A coerced argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Int(i32),
    Float(f64),
    FloatSeq(Vec<f64>),
    IntSeq(Vec<i32>),
}

impl ArgValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ArgValue::Int(_) => ParamKind::Int,
            ArgValue::Float(_) => ParamKind::Float,
            ArgValue::FloatSeq(_) => ParamKind::FloatSeq,
            ArgValue::IntSeq(_) => ParamKind::IntSeq,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            ArgValue::Int(v) => Value::from(*v),
            ArgValue::Float(v) => Value::from(*v),
            ArgValue::FloatSeq(values) => values.iter().copied().map(Value::from).collect(),
            ArgValue::IntSeq(values) => values.iter().copied().map(Value::from).collect(),
        }
    }
}

impl From<SlotValue> for ArgValue {
    fn from(value: SlotValue) -> Self {
        match value {
            SlotValue::Floats(values) => ArgValue::FloatSeq(values),
            SlotValue::Ints(values) => ArgValue::IntSeq(values),
        }
    }
}

/// One entry of a function's argument schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub key: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    /// Alternative input keys accepted for this parameter.
    pub aliases: &'static [&'static str],
    /// Value used when the key is absent.
    pub default: Option<ArgValue>,
    /// Derived slot consulted before `default` when the key is absent.
    pub fallback: Option<DerivedSlot>,
}

impl ParamSpec {
    fn new(key: &'static str, kind: ParamKind) -> Self {
        Self {
            key,
            kind,
            required: true,
            aliases: &[],
            default: None,
            fallback: None,
        }
    }

    pub fn int(key: &'static str) -> Self {
        Self::new(key, ParamKind::Int)
    }

    pub fn float(key: &'static str) -> Self {
        Self::new(key, ParamKind::Float)
    }

    pub fn floats(key: &'static str) -> Self {
        Self::new(key, ParamKind::FloatSeq)
    }

    pub fn ints(key: &'static str) -> Self {
        Self::new(key, ParamKind::IntSeq)
    }

    /// Make the parameter optional, substituting `value` when absent.
    pub fn or_default(mut self, value: ArgValue) -> Self {
        self.required = false;
        self.default = Some(value);
        self
    }

    /// Consult the derived slot when the parameter is absent. The parameter
    /// stays required: it is reported missing only if the slot is also empty.
    pub fn derived_from(mut self, slot: DerivedSlot) -> Self {
        self.fallback = Some(slot);
        self
    }

    pub fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    fn lookup<'a>(&self, input: &'a ParamMap) -> Option<&'a Value> {
        input
            .get(self.key)
            .or_else(|| self.aliases.iter().find_map(|alias| input.get(*alias)))
            .filter(|value| !value.is_null())
    }
}

/// Schema-checked arguments for one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: HashMap<&'static str, ArgValue>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &'static str, value: ArgValue) {
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.values.get(key)
    }

    pub fn int(&self, key: &str) -> Result<i32> {
        match self.values.get(key) {
            Some(ArgValue::Int(v)) => Ok(*v),
            Some(_) => Err(mismatch(key, ParamKind::Int)),
            None => Err(CallError::MissingParameter(key.to_string())),
        }
    }

    pub fn float(&self, key: &str) -> Result<f64> {
        match self.values.get(key) {
            Some(ArgValue::Float(v)) => Ok(*v),
            Some(ArgValue::Int(v)) => Ok(f64::from(*v)),
            Some(_) => Err(mismatch(key, ParamKind::Float)),
            None => Err(CallError::MissingParameter(key.to_string())),
        }
    }

    pub fn floats(&self, key: &str) -> Result<&[f64]> {
        match self.values.get(key) {
            Some(ArgValue::FloatSeq(v)) => Ok(v),
            Some(_) => Err(mismatch(key, ParamKind::FloatSeq)),
            None => Err(CallError::MissingParameter(key.to_string())),
        }
    }

    pub fn ints(&self, key: &str) -> Result<&[i32]> {
        match self.values.get(key) {
            Some(ArgValue::IntSeq(v)) => Ok(v),
            Some(_) => Err(mismatch(key, ParamKind::IntSeq)),
            None => Err(CallError::MissingParameter(key.to_string())),
        }
    }

    /// Render the arguments back into a canonical wire mapping, in schema order.
    pub fn to_param_map(&self, schema: &[ParamSpec]) -> ParamMap {
        schema
            .iter()
            .filter_map(|spec| {
                self.values
                    .get(spec.key)
                    .map(|value| (spec.key.to_string(), value.to_json()))
            })
            .collect()
    }
}

/// A single typed result field.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Floats(Vec<f64>),
    Ints(Vec<i32>),
}

impl OutputValue {
    fn to_json(&self) -> Value {
        match self {
            OutputValue::Int(v) => Value::from(*v),
            OutputValue::Float(v) => Value::from(*v),
            OutputValue::Bool(v) => Value::Bool(*v),
            OutputValue::Floats(values) => values.iter().copied().map(Value::from).collect(),
            OutputValue::Ints(values) => values.iter().copied().map(Value::from).collect(),
        }
    }

    /// View the value as a derived-slot sequence, if it is one.
    pub fn as_slot_value(&self) -> Option<SlotValue> {
        match self {
            OutputValue::Floats(values) => Some(SlotValue::Floats(values.clone())),
            OutputValue::Ints(values) => Some(SlotValue::Ints(values.clone())),
            _ => None,
        }
    }

    /// Parse a wire value back into a sequence, used for relayed results.
    pub fn sequence_from_json(value: &Value) -> Option<OutputValue> {
        let items = value.as_array()?;
        if items.iter().all(|v| v.is_i64()) {
            let ints = items
                .iter()
                .map(|v| v.as_i64().and_then(|i| i32::try_from(i).ok()))
                .collect::<Option<Vec<_>>>()?;
            return Some(OutputValue::Ints(ints));
        }
        let floats = items.iter().map(Value::as_f64).collect::<Option<Vec<_>>>()?;
        Some(OutputValue::Floats(floats))
    }
}

/// Ordered typed results of an invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outputs {
    fields: Vec<(&'static str, OutputValue)>,
}

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &'static str, value: OutputValue) -> Self {
        self.fields.push((key, value));
        self
    }

    pub fn floats(self, key: &'static str, values: Vec<f64>) -> Self {
        self.with(key, OutputValue::Floats(values))
    }

    pub fn ints(self, key: &'static str, values: Vec<i32>) -> Self {
        self.with(key, OutputValue::Ints(values))
    }

    pub fn float(self, key: &'static str, value: f64) -> Self {
        self.with(key, OutputValue::Float(value))
    }

    pub fn int(self, key: &'static str, value: i64) -> Self {
        self.with(key, OutputValue::Int(value))
    }

    /// The `{"success": true}` acknowledgement of setter calls.
    pub fn success() -> Self {
        Self::new().with("success", OutputValue::Bool(true))
    }

    pub fn get(&self, key: &str) -> Option<&OutputValue> {
        self.fields
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Coerce `input` against `schema`, in schema order.
///
/// Absent parameters are filled from `derived` (when the parameter names a
/// fallback slot that is populated) and then from their default.
/// Keys the schema does not mention are ignored.
pub fn marshal(schema: &[ParamSpec], input: &ParamMap, derived: &DerivedSnapshot) -> Result<Args> {
    let mut args = Args::new();
    for spec in schema {
        match spec.lookup(input) {
            Some(raw) => {
                let value = coerce(raw, spec.kind).ok_or_else(|| mismatch(spec.key, spec.kind))?;
                args.insert(spec.key, value);
            }
            None => {
                let from_cache = spec
                    .fallback
                    .map(|slot| derived.get(slot))
                    .filter(|value| !value.is_empty())
                    .map(ArgValue::from);
                match from_cache.or_else(|| spec.default.clone()) {
                    Some(value) => args.insert(spec.key, value),
                    None if spec.required => {
                        return Err(CallError::MissingParameter(spec.key.to_string()));
                    }
                    None => {}
                }
            }
        }
    }
    Ok(args)
}

/// Flatten typed results into the wire output mapping.
pub fn unmarshal(outputs: &Outputs) -> ParamMap {
    outputs
        .fields
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_json()))
        .collect()
}

fn mismatch(key: &str, expected: ParamKind) -> CallError {
    CallError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

fn coerce(value: &Value, kind: ParamKind) -> Option<ArgValue> {
    match kind {
        ParamKind::Int => coerce_int(value).map(ArgValue::Int),
        ParamKind::Float => coerce_float(value).map(ArgValue::Float),
        ParamKind::FloatSeq => value
            .as_array()?
            .iter()
            .map(coerce_float)
            .collect::<Option<Vec<_>>>()
            .map(ArgValue::FloatSeq),
        ParamKind::IntSeq => value
            .as_array()?
            .iter()
            .map(coerce_int)
            .collect::<Option<Vec<_>>>()
            .map(ArgValue::IntSeq),
    }
}

fn coerce_int(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i32::try_from(i).ok(),
            // fractional values truncate toward zero
            None => n
                .as_f64()
                .filter(|f| f.is_finite() && *f >= f64::from(i32::MIN) && *f <= f64::from(i32::MAX))
                .map(|f| f.trunc() as i32),
        },
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i32>()
                .ok()
                .or_else(|| coerce_int(&Value::from(s.parse::<f64>().ok()?)))
        }
        _ => None,
    }
}

fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}
