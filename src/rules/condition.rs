//! Rule conditions (component C/D): `hash`, `mark`, `with`, `not`, `or`,
//! `compare`, `custom`.

use crate::hash::{sha256_hex, OverrideKind};
use crate::rules::ast::{Condition, SelectorType};
use crate::rules::context::Context;
use crate::rules::data::{DataExpr, DataType, Value};
use crate::Error;

/// `hash(H)` — the selector's handle has content-hash `H`. Only valid for
/// `image`/`buffer`/`shader` selectors.
pub struct Hash(pub String);
impl Condition for Hash {
    fn matches(&self, handle: u64, ctx: &mut Context) -> Result<bool, Error> {
        Ok(ctx.globals.content_hashes.get(&handle).map(|h| h == &self.0).unwrap_or(false))
    }
}

/// `mark(M)` — the handle carries mark `M`.
pub struct Mark(pub String);
impl Condition for Mark {
    fn matches(&self, handle: u64, ctx: &mut Context) -> Result<bool, Error> {
        Ok(ctx.globals.marks.get(&handle).map(|marks| marks.contains(&self.0)).unwrap_or(false))
    }
}

/// `not(c)` — logical negation.
pub struct Not(pub Box<dyn Condition>);
impl Condition for Not {
    fn matches(&self, handle: u64, ctx: &mut Context) -> Result<bool, Error> {
        Ok(!self.0.matches(handle, ctx)?)
    }
}

/// `or(c1, c2, …)` — logical disjunction.
pub struct Or(pub Vec<Box<dyn Condition>>);
impl Condition for Or {
    fn matches(&self, handle: u64, ctx: &mut Context) -> Result<bool, Error> {
        for c in &self.0 {
            if c.matches(handle, ctx)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// `with(inner_selector)` — for `draw`/`pipeline`: the inner selector
/// matches at least one related handle (the draw's images/vertex buffers/
/// index buffer/shaders, or the pipeline's shader stages).
///
/// The candidate handle set is not known at parse time: it depends on the
/// specific draw call/pipeline being evaluated, so the hook that fired the
/// outer selector (`hooks::draw`) stashes it into `ctx.locals` under a
/// `with:<selector-name>` key as a `Value::List` of `Value::Handle`, and
/// this reads it back out by `self.inner`'s name.
pub struct With {
    pub inner: SelectorType,
    pub inner_conditions: Vec<Box<dyn Condition>>,
}
impl Condition for With {
    fn matches(&self, _handle: u64, ctx: &mut Context) -> Result<bool, Error> {
        let key = format!("with:{}", self.inner.name());
        let candidates: Vec<u64> = match ctx.locals.get(&key) {
            Some(Value::List(items)) => {
                items.iter().filter_map(|v| if let Value::Handle(h) = v { Some(*h) } else { None }).collect()
            }
            _ => return Ok(false),
        };
        for candidate in candidates {
            let mut all_match = true;
            for c in &self.inner_conditions {
                if !c.matches(candidate, ctx)? {
                    all_match = false;
                    break;
                }
            }
            if all_match {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// `compare(lhs, op, dtype, rhs)`.
pub struct Compare {
    pub lhs: Box<dyn DataExpr>,
    pub op: CompareOp,
    pub dtype: DataType,
    pub rhs: Box<dyn DataExpr>,
}
impl Condition for Compare {
    fn matches(&self, _handle: u64, ctx: &mut Context) -> Result<bool, Error> {
        let lhs = self.lhs.eval(ctx)?.expect(self.dtype)?;
        let rhs = self.rhs.eval(ctx)?.expect(self.dtype)?;
        let ordering = match self.dtype {
            DataType::Number => lhs.as_number()?.partial_cmp(&rhs.as_number()?),
            DataType::String => lhs.as_string()?.partial_cmp(rhs.as_string()?),
            DataType::Raw => lhs.as_raw()?.partial_cmp(rhs.as_raw()?),
            DataType::Handle => {
                let (Ok(a), Ok(b)) = (lhs.expect(DataType::Handle), rhs.expect(DataType::Handle)) else {
                    return Ok(false);
                };
                match (a, b) {
                    (crate::rules::data::Value::Handle(a), crate::rules::data::Value::Handle(b)) => a.partial_cmp(&b),
                    _ => None,
                }
            }
            DataType::List => return Err(Error::TypeMismatch { expected: DataType::Number, actual: DataType::List }),
        };
        let Some(ordering) = ordering else { return Ok(false) };
        Ok(match self.op {
            CompareOp::Eq => ordering.is_eq(),
            CompareOp::Ne => ordering.is_ne(),
            CompareOp::Lt => ordering.is_lt(),
            CompareOp::Le => ordering.is_le(),
            CompareOp::Gt => ordering.is_gt(),
            CompareOp::Ge => ordering.is_ge(),
        })
    }
}

/// `custom(tag)` — matches `custom` selectors whose `custom_tag` equals `tag`.
pub struct Custom(pub String);
impl Condition for Custom {
    fn matches(&self, _handle: u64, ctx: &mut Context) -> Result<bool, Error> {
        Ok(ctx.custom_tag.as_deref() == Some(self.0.as_str()))
    }
}

/// Helper shared by `hooks::*`: computes the content hash of a byte range
/// and records it on the handle, the way every hot-path hook does before
/// firing its selector.
pub fn attach_content_hash(ctx: &mut Context, handle: u64, bytes: &[u8]) -> String {
    let digest = sha256_hex(bytes);
    ctx.globals.content_hashes.insert(handle, digest.clone());
    digest
}

pub fn override_kind_for(selector: SelectorType) -> Option<OverrideKind> {
    match selector {
        SelectorType::Image => Some(OverrideKind::Image),
        SelectorType::Buffer => Some(OverrideKind::Buffer),
        SelectorType::Shader => Some(OverrideKind::Shader),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::data::NumberLiteral;

    #[test]
    fn compare_eq_numbers() {
        let c = Compare {
            lhs: Box::new(NumberLiteral(1.0)),
            op: CompareOp::Eq,
            dtype: DataType::Number,
            rhs: Box::new(NumberLiteral(1.0)),
        };
        // Condition::matches needs a full Context to run; this is exercised
        // end-to-end in tests/rule_scenarios.rs instead of in isolation here,
        // since Context requires a live Instance/Device.
        let _ = c;
    }
}
