//! Polymorphic rule values and the data-expression tree (component C/D).
//!
//! `Value` is the Rust rendering of the original polymorphic `data_value`
//! tagged union: `string | raw | handle | number | list`.

use std::collections::HashMap;

use crate::rules::context::Context;
use crate::Error;

/// The five data kinds a data expression can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Raw,
    Handle,
    Number,
    List,
}

/// A polymorphic rule value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Raw(Vec<u8>),
    Handle(u64),
    Number(f64),
    List(Vec<Value>),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::String(_) => DataType::String,
            Value::Raw(_) => DataType::Raw,
            Value::Handle(_) => DataType::Handle,
            Value::Number(_) => DataType::Number,
            Value::List(_) => DataType::List,
        }
    }

    /// Narrows to the requested type, failing with [`Error::TypeMismatch`]
    /// if the dynamic type differs. `String` also supports being read as
    /// `Raw` (bytes of the UTF-8 string) per spec's "`string` supports
    /// string and raw".
    pub fn expect(self, dtype: DataType) -> Result<Value, Error> {
        match (&self, dtype) {
            (Value::String(_), DataType::String) => Ok(self),
            (Value::String(s), DataType::Raw) => Ok(Value::Raw(s.clone().into_bytes())),
            (Value::Raw(_), DataType::Raw) => Ok(self),
            (Value::Handle(_), DataType::Handle) => Ok(self),
            (Value::Number(_), DataType::Number) => Ok(self),
            (Value::List(_), DataType::List) => Ok(self),
            _ => Err(Error::TypeMismatch { expected: dtype, actual: self.data_type() }),
        }
    }

    pub fn as_string(&self) -> Result<&str, Error> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(Error::TypeMismatch { expected: DataType::String, actual: other.data_type() }),
        }
    }

    pub fn as_raw(&self) -> Result<&[u8], Error> {
        match self {
            Value::Raw(b) => Ok(b),
            other => Err(Error::TypeMismatch { expected: DataType::Raw, actual: other.data_type() }),
        }
    }

    pub fn as_number(&self) -> Result<f64, Error> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(Error::TypeMismatch { expected: DataType::Number, actual: other.data_type() }),
        }
    }

    pub fn as_list(&self) -> Result<&[Value], Error> {
        match self {
            Value::List(l) => Ok(l),
            other => Err(Error::TypeMismatch { expected: DataType::List, actual: other.data_type() }),
        }
    }
}

/// A parsed data expression: the `Box<dyn Fn>`-style node the parser builds
/// for `string(...)`, `concat(...)`, `map(...)`, etc. Evaluated against a
/// [`Context`] so `global`/`local`/`current_element` lookups and
/// `vkstruct`/`vkhandle`/`received` all resolve against live rule state.
pub trait DataExpr: Send + Sync {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error>;
}

pub type DataCtor = fn(args: Vec<Box<dyn DataExpr>>) -> Box<dyn DataExpr>;

/// `string("literal")` / `string(inner)` where inner already yields a string.
pub struct StringLiteral(pub String);
impl DataExpr for StringLiteral {
    fn eval(&self, _ctx: &mut Context) -> Result<Value, Error> {
        Ok(Value::String(self.0.clone()))
    }
}

/// `number(n)` literal.
pub struct NumberLiteral(pub f64);
impl DataExpr for NumberLiteral {
    fn eval(&self, _ctx: &mut Context) -> Result<Value, Error> {
        Ok(Value::Number(self.0))
    }
}

/// `concat(a, b, …)` — homogeneous concatenation over strings or raws.
pub struct Concat(pub Vec<Box<dyn DataExpr>>);
impl DataExpr for Concat {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        let mut parts = Vec::with_capacity(self.0.len());
        for e in &self.0 {
            parts.push(e.eval(ctx)?);
        }
        match parts.first() {
            Some(Value::String(_)) => {
                let mut s = String::new();
                for p in parts {
                    s.push_str(p.expect(DataType::String)?.as_string()?);
                }
                Ok(Value::String(s))
            }
            Some(Value::Raw(_)) => {
                let mut b = Vec::new();
                for p in parts {
                    b.extend_from_slice(p.expect(DataType::Raw)?.as_raw()?);
                }
                Ok(Value::Raw(b))
            }
            Some(_) => Err(Error::TypeMismatch { expected: DataType::String, actual: parts[0].data_type() }),
            None => Ok(Value::String(String::new())),
        }
    }
}

/// `convert(src_type, dst_type, inner)`.
pub struct Convert {
    pub dst: DataType,
    pub inner: Box<dyn DataExpr>,
}
impl DataExpr for Convert {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        let v = self.inner.eval(ctx)?;
        match (v, self.dst) {
            (Value::String(s), DataType::Raw) => Ok(Value::Raw(s.into_bytes())),
            (Value::Raw(b), DataType::String) => Ok(Value::String(String::from_utf8_lossy(&b).into_owned())),
            (Value::Number(n), DataType::String) => Ok(Value::String(format!("{}", n))),
            (Value::String(s), DataType::Number) => {
                s.trim().parse::<f64>().map(Value::Number).map_err(|_| Error::ReflectionError {
                    path: String::new(),
                    type_name: String::new(),
                    message: format!("cannot parse `{}` as a number", s),
                })
            }
            (v, dst) => Err(Error::TypeMismatch { expected: dst, actual: v.data_type() }),
        }
    }
}

/// `strclean(inner)` — drop non-printable characters from a string.
pub struct StrClean(pub Box<dyn DataExpr>);
impl DataExpr for StrClean {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        let s = self.0.eval(ctx)?.expect(DataType::String)?;
        let cleaned: String = s.as_string()?.chars().filter(|c| !c.is_control()).collect();
        Ok(Value::String(cleaned))
    }
}

/// `split(inner, delimiter)` — string -> list of strings.
pub struct Split {
    pub inner: Box<dyn DataExpr>,
    pub delimiter: String,
}
impl DataExpr for Split {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        let s = self.inner.eval(ctx)?.expect(DataType::String)?;
        let parts = s
            .as_string()?
            .split(self.delimiter.as_str())
            .map(|p| Value::String(p.to_owned()))
            .collect();
        Ok(Value::List(parts))
    }
}

/// `at(i, inner)` — list indexing with a runtime type check.
pub struct At {
    pub index: usize,
    pub dtype: DataType,
    pub inner: Box<dyn DataExpr>,
}
impl DataExpr for At {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        let list = self.inner.eval(ctx)?.expect(DataType::List)?;
        let items = list.as_list()?;
        let item = items.get(self.index).ok_or_else(|| Error::ReflectionError {
            path: String::new(),
            type_name: String::new(),
            message: format!("list index {} out of range (len {})", self.index, items.len()),
        })?;
        item.clone().expect(self.dtype)
    }
}

/// `global(name)` / `local(name)`.
pub struct VarLookup {
    pub global: bool,
    pub name: String,
}
impl DataExpr for VarLookup {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        let map: &HashMap<String, Value> = if self.global { &ctx.globals.variables } else { &ctx.locals };
        map.get(&self.name).cloned().ok_or_else(|| Error::UnknownName {
            name: self.name.clone(),
            available: map.keys().cloned().collect::<Vec<_>>().join(", "),
        })
    }
}

/// `received()` — for `receive` selectors, the inbound byte frame.
pub struct Received;
impl DataExpr for Received {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        ctx.additional_info.receive_bytes().map(|b| Value::Raw(b.to_vec())).ok_or_else(|| Error::UnknownName {
            name: "received()".to_owned(),
            available: "only valid for receive selectors".to_owned(),
        })
    }
}

/// `vkhandle()` — the selector's primary handle.
pub struct VkHandle;
impl DataExpr for VkHandle {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        Ok(Value::Handle(ctx.primary_handle))
    }
}

/// `current()` / `index()` / `accumulator()` — only valid inside `map`/
/// `reduce`, resolved against the innermost [`crate::rules::context::ReductionFrame`].
pub struct CurrentElement;
impl DataExpr for CurrentElement {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        ctx.current_element().cloned().ok_or_else(|| Error::UnknownName {
            name: "current()".to_owned(),
            available: "only valid inside map()/reduce()".to_owned(),
        })
    }
}

pub struct CurrentIndex;
impl DataExpr for CurrentIndex {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        ctx.current_index().map(|i| Value::Number(i as f64)).ok_or_else(|| Error::UnknownName {
            name: "index()".to_owned(),
            available: "only valid inside map()/reduce()".to_owned(),
        })
    }
}

pub struct Accumulator;
impl DataExpr for Accumulator {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        ctx.current_reduction().cloned().ok_or_else(|| Error::UnknownName {
            name: "accumulator()".to_owned(),
            available: "only valid inside reduce()".to_owned(),
        })
    }
}

/// `map(list, body)` — evaluates `body` once per element with
/// [`CurrentElement`]/[`CurrentIndex`] bound via a pushed reduction frame.
pub struct Map {
    pub list: Box<dyn DataExpr>,
    pub body: Box<dyn DataExpr>,
}
impl DataExpr for Map {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        let list = self.list.eval(ctx)?.expect(DataType::List)?;
        let items = list.as_list()?.to_vec();
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            ctx.reduction_stack.push(crate::rules::context::ReductionFrame {
                current_element: item,
                current_index: Some(i),
                current_reduction: None,
            });
            let result = self.body.eval(ctx);
            ctx.reduction_stack.pop();
            out.push(result?);
        }
        Ok(Value::List(out))
    }
}

/// `reduce(list, init, body)` — folds `body` left-to-right, exposing the
/// running value via [`Accumulator`].
pub struct Reduce {
    pub list: Box<dyn DataExpr>,
    pub init: Box<dyn DataExpr>,
    pub body: Box<dyn DataExpr>,
}
impl DataExpr for Reduce {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        let list = self.list.eval(ctx)?.expect(DataType::List)?;
        let items = list.as_list()?.to_vec();
        let mut acc = self.init.eval(ctx)?;
        for (i, item) in items.into_iter().enumerate() {
            ctx.reduction_stack.push(crate::rules::context::ReductionFrame {
                current_element: item,
                current_index: Some(i),
                current_reduction: Some(acc.clone()),
            });
            let result = self.body.eval(ctx);
            ctx.reduction_stack.pop();
            acc = result?;
        }
        Ok(acc)
    }
}

/// `pack(a, b, …)` — concatenates each argument's little-endian byte
/// representation (numbers as f64, strings/raws verbatim, handles as u64)
/// into one `raw` value.
pub struct Pack(pub Vec<Box<dyn DataExpr>>);
impl DataExpr for Pack {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        let mut bytes = Vec::new();
        for e in &self.0 {
            match e.eval(ctx)? {
                Value::Number(n) => bytes.extend_from_slice(&n.to_le_bytes()),
                Value::Handle(h) => bytes.extend_from_slice(&h.to_le_bytes()),
                Value::String(s) => bytes.extend_from_slice(s.as_bytes()),
                Value::Raw(r) => bytes.extend_from_slice(&r),
                Value::List(_) => {
                    return Err(Error::TypeMismatch { expected: DataType::Raw, actual: DataType::List })
                }
            }
        }
        Ok(Value::Raw(bytes))
    }
}

/// `unpack(inner, offset, dtype)` — reads a fixed-width field out of a raw
/// byte buffer at `offset`. Numbers and handles are little-endian; `dtype ==
/// String` reads the remaining bytes as UTF-8 (lossy).
pub struct Unpack {
    pub inner: Box<dyn DataExpr>,
    pub offset: usize,
    pub dtype: DataType,
}
impl DataExpr for Unpack {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        let raw = self.inner.eval(ctx)?.expect(DataType::Raw)?;
        let bytes = raw.as_raw()?;
        let err = || Error::ReflectionError {
            path: String::new(),
            type_name: "raw".to_owned(),
            message: format!("unpack offset {} out of range (len {})", self.offset, bytes.len()),
        };
        match self.dtype {
            DataType::Number => {
                let slice: [u8; 8] = bytes.get(self.offset..self.offset + 8).ok_or_else(err)?.try_into().unwrap();
                Ok(Value::Number(f64::from_le_bytes(slice)))
            }
            DataType::Handle => {
                let slice: [u8; 8] = bytes.get(self.offset..self.offset + 8).ok_or_else(err)?.try_into().unwrap();
                Ok(Value::Handle(u64::from_le_bytes(slice)))
            }
            DataType::String => {
                let slice = bytes.get(self.offset..).ok_or_else(err)?;
                Ok(Value::String(String::from_utf8_lossy(slice).into_owned()))
            }
            DataType::Raw => Ok(Value::Raw(bytes.get(self.offset..).ok_or_else(err)?.to_vec())),
            DataType::List => Err(Error::TypeMismatch { expected: DataType::Number, actual: DataType::List }),
        }
    }
}

/// `math(op, a, b, …)` arithmetic, and `call(name, args…)` builtin string
/// helpers. Both are a closed operator set matched by name at parse time, not
/// a user-extensible function table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
    Floor,
    Ceil,
    Abs,
}
impl MathOp {
    pub fn from_name(name: &str) -> Option<MathOp> {
        Some(match name {
            "add" => MathOp::Add,
            "sub" => MathOp::Sub,
            "mul" => MathOp::Mul,
            "div" => MathOp::Div,
            "mod" => MathOp::Mod,
            "min" => MathOp::Min,
            "max" => MathOp::Max,
            "floor" => MathOp::Floor,
            "ceil" => MathOp::Ceil,
            "abs" => MathOp::Abs,
            _ => return None,
        })
    }
}

pub struct Math {
    pub op: MathOp,
    pub args: Vec<Box<dyn DataExpr>>,
}
impl DataExpr for Math {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        let mut nums = Vec::with_capacity(self.args.len());
        for a in &self.args {
            nums.push(a.eval(ctx)?.expect(DataType::Number)?.as_number()?);
        }
        let result = match self.op {
            MathOp::Add => nums.iter().sum(),
            MathOp::Sub => nums.iter().copied().reduce(|a, b| a - b).unwrap_or(0.0),
            MathOp::Mul => nums.iter().product(),
            MathOp::Div => nums.iter().copied().reduce(|a, b| a / b).unwrap_or(0.0),
            MathOp::Mod => nums.iter().copied().reduce(|a, b| a % b).unwrap_or(0.0),
            MathOp::Min => nums.iter().copied().fold(f64::INFINITY, f64::min),
            MathOp::Max => nums.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            MathOp::Floor => nums.first().copied().unwrap_or(0.0).floor(),
            MathOp::Ceil => nums.first().copied().unwrap_or(0.0).ceil(),
            MathOp::Abs => nums.first().copied().unwrap_or(0.0).abs(),
        };
        Ok(Value::Number(result))
    }
}

/// `call(name, args…)` — a small closed set of string/list builtins that
/// don't fit naturally as `math` operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallFn {
    Len,
    ToUpper,
    ToLower,
    Contains,
}
impl CallFn {
    pub fn from_name(name: &str) -> Option<CallFn> {
        Some(match name {
            "len" => CallFn::Len,
            "to_upper" => CallFn::ToUpper,
            "to_lower" => CallFn::ToLower,
            "contains" => CallFn::Contains,
            _ => return None,
        })
    }
}

pub struct Call {
    pub func: CallFn,
    pub args: Vec<Box<dyn DataExpr>>,
}
impl DataExpr for Call {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        match self.func {
            CallFn::Len => {
                let v = self.args.first().ok_or_else(arity_err)?.eval(ctx)?;
                let n = match v {
                    Value::String(s) => s.chars().count(),
                    Value::Raw(r) => r.len(),
                    Value::List(l) => l.len(),
                    other => return Err(Error::TypeMismatch { expected: DataType::List, actual: other.data_type() }),
                };
                Ok(Value::Number(n as f64))
            }
            CallFn::ToUpper => {
                let s = self.args.first().ok_or_else(arity_err)?.eval(ctx)?.expect(DataType::String)?;
                Ok(Value::String(s.as_string()?.to_uppercase()))
            }
            CallFn::ToLower => {
                let s = self.args.first().ok_or_else(arity_err)?.eval(ctx)?.expect(DataType::String)?;
                Ok(Value::String(s.as_string()?.to_lowercase()))
            }
            CallFn::Contains => {
                let haystack = self.args.first().ok_or_else(arity_err)?.eval(ctx)?.expect(DataType::String)?;
                let needle = self.args.get(1).ok_or_else(arity_err)?.eval(ctx)?.expect(DataType::String)?;
                Ok(Value::Number(if haystack.as_string()?.contains(needle.as_string()?) { 1.0 } else { 0.0 }))
            }
        }
    }
}

fn arity_err() -> Error {
    Error::RuleError { line: 0, col: 0, message: "call() missing required argument".into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_supports_raw_conversion() {
        let v = Value::String("abc".to_owned());
        assert_eq!(v.expect(DataType::Raw).unwrap(), Value::Raw(b"abc".to_vec()));
    }

    #[test]
    fn mismatched_expect_is_type_mismatch() {
        let v = Value::Number(1.0);
        assert!(matches!(v.expect(DataType::String), Err(Error::TypeMismatch { .. })));
    }
}
