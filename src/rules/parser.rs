//! Rule-file parser: `selector_type{cond(...), cond(...)} -> action(...)`,
//! one rule per (possibly multi-line) statement, `#` line comments. Grounded
//! on the original stream-operator grammar in `rules.cpp`/`reader.hpp`.

use crate::rules::action::{self, BoxedAction, DeferredEvent};
use crate::rules::ast::{BoxedCondition, Rule, Selector, SelectorType};
use crate::rules::condition::{self, CompareOp};
use crate::rules::data::{self, Call, CallFn, DataExpr, DataType, Math, MathOp};
use crate::rules::data_vk::{VkDescriptor, VkStruct};
use crate::rules::lexer::{split_args, Cursor};
use crate::Error;

/// A fully parsed rule file.
pub struct ParsedFile {
    pub rules: Vec<Rule>,
}

pub fn parse(source: &str) -> Result<ParsedFile, Error> {
    let mut cur = Cursor::new(source);
    let mut rules = Vec::new();
    loop {
        cur.skip_ws();
        if cur.at_end() {
            break;
        }
        rules.push(parse_rule(&mut cur)?);
    }
    Ok(ParsedFile { rules })
}

fn parse_rule(cur: &mut Cursor) -> Result<Rule, Error> {
    let line = cur.line();
    let col = cur.col();
    let (ty, conditions) = parse_selector(cur)?;
    cur.skip_ws();
    for expected in "->".chars() {
        match cur.advance() {
            Some(c) if c == expected => {}
            _ => return Err(cur.err("expected '->' after selector")),
        }
    }
    cur.skip_ws();
    let action = parse_action_call(cur, ty)?;
    Ok(Rule { selector: Selector { ty }, conditions, action, line, col, disabled: std::sync::atomic::AtomicBool::new(false) })
}

fn parse_selector(cur: &mut Cursor) -> Result<(SelectorType, Vec<BoxedCondition>), Error> {
    let name = cur.read_until_top_level('{')?;
    cur.expect('{')?;
    let ty = SelectorType::from_name(name.trim())
        .ok_or_else(|| cur.err(format!("unknown selector type \"{}\"", name.trim())))?;

    let mut conditions = Vec::new();
    loop {
        cur.skip_ws();
        if cur.peek() == Some('}') {
            break;
        }
        conditions.push(parse_condition_call(cur, ty)?);
        cur.skip_ws();
        if cur.peek() == Some(',') {
            cur.advance();
        }
    }
    cur.expect('}')?;
    Ok((ty, conditions))
}

fn read_call(cur: &mut Cursor) -> Result<(String, Vec<String>), Error> {
    let name = cur.read_until_top_level('(')?;
    cur.expect('(')?;
    let raw_args = cur.read_until_top_level(')')?;
    cur.expect(')')?;
    Ok((name.trim().to_owned(), split_args(&raw_args)))
}

fn parse_condition_call(cur: &mut Cursor, ty: SelectorType) -> Result<BoxedCondition, Error> {
    let (name, args) = read_call(cur)?;
    parse_condition(&name, &args, ty, cur)
}

fn parse_condition(name: &str, args: &[String], ty: SelectorType, cur: &Cursor) -> Result<BoxedCondition, Error> {
    Ok(match name {
        "hash" => Box::new(condition::Hash(unquote(arg(args, 0, cur)?)?)),
        "mark" => Box::new(condition::Mark(unquote(arg(args, 0, cur)?)?)),
        "not" => {
            let inner = parse_condition_expr(arg(args, 0, cur)?, ty)?;
            Box::new(condition::Not(inner))
        }
        "or" => {
            let mut inner = Vec::with_capacity(args.len());
            for a in args {
                inner.push(parse_condition_expr(a, ty)?);
            }
            Box::new(condition::Or(inner))
        }
        "with" => {
            let inner_name = arg(args, 0, cur)?;
            let inner_ty = SelectorType::from_name(inner_name.trim())
                .ok_or_else(|| cur.err(format!("unknown selector type \"{}\" in with()", inner_name)))?;
            let mut inner_conditions = Vec::new();
            for a in args.iter().skip(1) {
                inner_conditions.push(parse_condition_expr(a, inner_ty)?);
            }
            Box::new(condition::With { inner: inner_ty, inner_conditions })
        }
        "custom" => Box::new(condition::Custom(unquote(arg(args, 0, cur)?)?)),
        "compare" => {
            let lhs = parse_data_expr(arg(args, 0, cur)?)?;
            let op = parse_compare_op(arg(args, 1, cur)?, cur)?;
            let dtype = parse_dtype(arg(args, 2, cur)?, cur)?;
            let rhs = parse_data_expr(arg(args, 3, cur)?)?;
            Box::new(condition::Compare { lhs, op, dtype, rhs })
        }
        other => return Err(cur.err(format!("unknown condition \"{}\"", other))),
    })
}

fn parse_condition_expr(raw: &str, ty: SelectorType) -> Result<BoxedCondition, Error> {
    let mut cur = Cursor::new(raw);
    parse_condition_call(&mut cur, ty)
}

fn parse_action_call(cur: &mut Cursor, ty: SelectorType) -> Result<BoxedAction, Error> {
    let (name, args) = read_call(cur)?;
    parse_action(&name, &args, ty, cur)
}

fn parse_action(name: &str, args: &[String], ty: SelectorType, cur: &Cursor) -> Result<BoxedAction, Error> {
    Ok(match name {
        "mark" => Box::new(action::Mark(unquote(arg(args, 0, cur)?)?)),
        "unmark" => {
            let target = arg(args, 0, cur)?.trim();
            if target == "--clear" {
                Box::new(action::Unmark(action::UnmarkTarget::Clear))
            } else {
                Box::new(action::Unmark(action::UnmarkTarget::Named(unquote(target)?)))
            }
        }
        "verbose" => Box::new(action::Verbose),
        "seq" => {
            let mut inner = Vec::with_capacity(args.len());
            for a in args {
                inner.push(parse_action_expr(a, ty)?);
            }
            Box::new(action::Seq(inner))
        }
        "on" => {
            let event = match arg(args, 0, cur)?.trim() {
                "end_command_buffer" => DeferredEvent::EndCommandBuffer,
                "queue_submit" => DeferredEvent::QueueSubmit,
                "end_render_pass" => DeferredEvent::EndRenderPass,
                other => return Err(cur.err(format!("unknown on() event \"{}\"", other))),
            };
            let inner_text = arg(args, 1, cur)?.to_owned();
            // Validate the inner action parses at load time; `make_action`
            // re-parses the same (already-validated) text on every
            // registration since actions aren't `Clone`.
            parse_action_expr(&inner_text, ty)?;
            let make_action = Box::new(move || -> BoxedAction {
                parse_action_expr(&inner_text, ty)
                    .expect("on() inner action was validated at parse time")
            });
            Box::new(action::On { event, make_action })
        }
        "each" => {
            let inner_name = arg(args, 0, cur)?;
            let inner_ty = SelectorType::from_name(inner_name.trim())
                .ok_or_else(|| cur.err(format!("unknown selector type \"{}\" in each()", inner_name)))?;
            let action = parse_action_expr(arg(args, 1, cur)?, ty)?;
            Box::new(action::Each { inner: inner_ty, action })
        }
        "disable" => Box::new(action::Disable),
        "cancel" => Box::new(action::Cancel),
        "log" => Box::new(action::Log(parse_data_expr(arg(args, 0, cur)?)?)),
        "override" => {
            let key = unquote(arg(args, 0, cur)?)?;
            let value = parse_data_expr(arg(args, 1, cur)?)?;
            Box::new(action::Override { key, value })
        }
        "write" => {
            let fd = unquote(arg(args, 0, cur)?)?;
            let data = parse_data_expr(arg(args, 1, cur)?)?;
            Box::new(action::Write { fd, data })
        }
        "socket" => {
            let fd = unquote(arg(args, 0, cur)?)?;
            let transport = parse_transport(arg(args, 1, cur)?, cur)?;
            let host = unquote(arg(args, 2, cur)?)?;
            let port: u16 =
                arg(args, 3, cur)?.trim().parse().map_err(|_| cur.err("invalid port in socket()"))?;
            let framing = parse_framing(arg(args, 4, cur)?, cur)?;
            Box::new(action::OpenSocket { fd, transport, host, port, framing })
        }
        "server_socket" => {
            let fd = unquote(arg(args, 0, cur)?)?;
            let transport = parse_transport(arg(args, 1, cur)?, cur)?;
            let port: u16 =
                arg(args, 2, cur)?.trim().parse().map_err(|_| cur.err("invalid port in server_socket()"))?;
            let framing = parse_framing(arg(args, 3, cur)?, cur)?;
            Box::new(action::OpenServerSocket { fd, transport, port, framing })
        }
        "close" => Box::new(action::Close(unquote(arg(args, 0, cur)?)?)),
        other => return Err(cur.err(format!("unknown action \"{}\"", other))),
    })
}

fn parse_action_expr(raw: &str, ty: SelectorType) -> Result<BoxedAction, Error> {
    let mut cur = Cursor::new(raw);
    parse_action_call(&mut cur, ty)
}

fn parse_transport(raw: &str, cur: &Cursor) -> Result<crate::ipc::Transport, Error> {
    match unquote(raw)?.as_str() {
        "tcp" => Ok(crate::ipc::Transport::Tcp),
        "udp" => Ok(crate::ipc::Transport::Udp),
        other => Err(cur.err(format!("unknown transport \"{}\"", other))),
    }
}

fn parse_framing(raw: &str, cur: &Cursor) -> Result<crate::ipc::Framing, Error> {
    match unquote(raw)?.as_str() {
        "raw" => Ok(crate::ipc::Framing::Raw),
        "length_prefixed" => Ok(crate::ipc::Framing::LengthPrefixed),
        "lines" => Ok(crate::ipc::Framing::Lines),
        other => Err(cur.err(format!("unknown framing \"{}\"", other))),
    }
}

fn parse_data_expr(raw: &str) -> Result<Box<dyn DataExpr>, Error> {
    let trimmed = raw.trim();
    if let Some(lit) = try_string_literal(trimmed) {
        return Ok(Box::new(data::StringLiteral(lit)));
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        return Ok(Box::new(data::NumberLiteral(n)));
    }
    let mut cur = Cursor::new(trimmed);
    let (name, args) = read_call(&mut cur)?;
    parse_data(&name, &args, &cur)
}

fn parse_data(name: &str, args: &[String], cur: &Cursor) -> Result<Box<dyn DataExpr>, Error> {
    Ok(match name {
        "string" => Box::new(data::StringLiteral(unquote(arg(args, 0, cur)?)?)),
        "number" => {
            let n: f64 = arg(args, 0, cur)?.trim().parse().map_err(|_| cur.err("invalid number literal"))?;
            Box::new(data::NumberLiteral(n))
        }
        "concat" => {
            let mut inner = Vec::with_capacity(args.len());
            for a in args {
                inner.push(parse_data_expr(a)?);
            }
            Box::new(data::Concat(inner))
        }
        "convert" => {
            let dst = parse_dtype(arg(args, 0, cur)?, cur)?;
            let inner = parse_data_expr(arg(args, 1, cur)?)?;
            Box::new(data::Convert { dst, inner })
        }
        "strclean" => Box::new(data::StrClean(parse_data_expr(arg(args, 0, cur)?)?)),
        "split" => {
            let inner = parse_data_expr(arg(args, 0, cur)?)?;
            let delimiter = unquote(arg(args, 1, cur)?)?;
            Box::new(data::Split { inner, delimiter })
        }
        "at" => {
            let index: usize = arg(args, 0, cur)?.trim().parse().map_err(|_| cur.err("invalid at() index"))?;
            let dtype = parse_dtype(arg(args, 1, cur)?, cur)?;
            let inner = parse_data_expr(arg(args, 2, cur)?)?;
            Box::new(data::At { index, dtype, inner })
        }
        "global" => Box::new(data::VarLookup { global: true, name: unquote(arg(args, 0, cur)?)? }),
        "local" => Box::new(data::VarLookup { global: false, name: unquote(arg(args, 0, cur)?)? }),
        "received" => Box::new(data::Received),
        "vkhandle" => Box::new(data::VkHandle),
        "current" => Box::new(data::CurrentElement),
        "index" => Box::new(data::CurrentIndex),
        "accumulator" => Box::new(data::Accumulator),
        "map" => {
            let list = parse_data_expr(arg(args, 0, cur)?)?;
            let body = parse_data_expr(arg(args, 1, cur)?)?;
            Box::new(data::Map { list, body })
        }
        "reduce" => {
            let list = parse_data_expr(arg(args, 0, cur)?)?;
            let init = parse_data_expr(arg(args, 1, cur)?)?;
            let body = parse_data_expr(arg(args, 2, cur)?)?;
            Box::new(data::Reduce { list, init, body })
        }
        "pack" => {
            let mut inner = Vec::with_capacity(args.len());
            for a in args {
                inner.push(parse_data_expr(a)?);
            }
            Box::new(data::Pack(inner))
        }
        "unpack" => {
            let inner = parse_data_expr(arg(args, 0, cur)?)?;
            let offset: usize = arg(args, 1, cur)?.trim().parse().map_err(|_| cur.err("invalid unpack() offset"))?;
            let dtype = parse_dtype(arg(args, 2, cur)?, cur)?;
            Box::new(data::Unpack { inner, offset, dtype })
        }
        "vkstruct" => Box::new(VkStruct(unquote(arg(args, 0, cur)?)?)),
        "vkdescriptor" => {
            let set: u32 = arg(args, 0, cur)?.trim().parse().map_err(|_| cur.err("invalid vkdescriptor() set"))?;
            let binding: u32 =
                arg(args, 1, cur)?.trim().parse().map_err(|_| cur.err("invalid vkdescriptor() binding"))?;
            let arr_index: u32 = args
                .get(2)
                .map(|a| a.trim().parse())
                .transpose()
                .map_err(|_| cur.err("invalid vkdescriptor() array index"))?
                .unwrap_or(0);
            Box::new(VkDescriptor { set, binding, arr_index })
        }
        math_name if MathOp::from_name(math_name).is_some() => {
            let op = MathOp::from_name(math_name).unwrap();
            let mut inner = Vec::with_capacity(args.len());
            for a in args {
                inner.push(parse_data_expr(a)?);
            }
            Box::new(Math { op, args: inner })
        }
        call_name if CallFn::from_name(call_name).is_some() => {
            let func = CallFn::from_name(call_name).unwrap();
            let mut inner = Vec::with_capacity(args.len());
            for a in args {
                inner.push(parse_data_expr(a)?);
            }
            Box::new(Call { func, args: inner })
        }
        other => return Err(cur.err(format!("unknown data expression \"{}\"", other))),
    })
}

fn parse_compare_op(raw: &str, cur: &Cursor) -> Result<CompareOp, Error> {
    Ok(match unquote(raw)?.as_str() {
        "eq" | "==" => CompareOp::Eq,
        "ne" | "!=" => CompareOp::Ne,
        "lt" | "<" => CompareOp::Lt,
        "le" | "<=" => CompareOp::Le,
        "gt" | ">" => CompareOp::Gt,
        "ge" | ">=" => CompareOp::Ge,
        other => return Err(cur.err(format!("unknown compare() operator \"{}\"", other))),
    })
}

fn parse_dtype(raw: &str, cur: &Cursor) -> Result<DataType, Error> {
    Ok(match unquote(raw)?.as_str() {
        "string" => DataType::String,
        "raw" => DataType::Raw,
        "handle" => DataType::Handle,
        "number" => DataType::Number,
        "list" | "vector" | "array" => DataType::List,
        other => return Err(cur.err(format!("unknown data type \"{}\"", other))),
    })
}

fn arg<'a>(args: &'a [String], i: usize, cur: &Cursor) -> Result<&'a str, Error> {
    args.get(i).map(String::as_str).ok_or_else(|| cur.err(format!("missing argument {}", i)))
}

fn try_string_literal(s: &str) -> Option<String> {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        unquote(s).ok()
    } else {
        None
    }
}

fn unquote(s: &str) -> Result<String, Error> {
    let trimmed = s.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        let inner = &trimmed[1..trimmed.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(other) => out.push(other),
                    None => {}
                }
            } else {
                out.push(c);
            }
        }
        Ok(out)
    } else {
        Ok(trimmed.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_rule() {
        let parsed = parse(r#"image{hash("abc123")} -> mark("seen")"#).unwrap();
        assert_eq!(parsed.rules.len(), 1);
        assert_eq!(parsed.rules[0].selector.ty, SelectorType::Image);
    }

    #[test]
    fn parses_multiple_conditions_and_compare() {
        let parsed = parse(
            r#"draw{mark("a"), not(mark("b")), compare(number(1), eq, number, number(1))} -> cancel()"#,
        )
        .unwrap();
        assert_eq!(parsed.rules[0].conditions.len(), 3);
    }

    #[test]
    fn parses_multiline_rule_and_comments() {
        let src = "# a full line comment\nimage{\n  hash(\"a\"),\n  mark(\"b\")\n} -> seq(mark(\"c\"), log(string(\"hi\")))";
        let parsed = parse(src).unwrap();
        assert_eq!(parsed.rules.len(), 1);
        assert_eq!(parsed.rules[0].conditions.len(), 2);
    }

    #[test]
    fn rejects_unknown_selector() {
        let err = parse("bogus{} -> mark(\"x\")").unwrap_err();
        assert!(matches!(err, Error::RuleError { .. }));
    }

    #[test]
    fn parses_nested_data_expressions() {
        let parsed = parse(r#"buffer{} -> log(concat(string("a"), string("b")))"#).unwrap();
        assert_eq!(parsed.rules.len(), 1);
    }
}
