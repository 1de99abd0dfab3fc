//! Rule actions (component C/D): `mark`, `verbose`, `seq`, `on`, `each`,
//! `disable`, `cancel`, `log`, `override`, and the IPC actions.

use crate::ipc::{Framing, Transport};
use crate::rules::ast::SelectorType;
use crate::rules::context::Context;
use crate::rules::data::{DataExpr, Value};
use crate::Error;

/// An action causes a side effect: it never produces a value, only mutates
/// the context or the outside world (marks, logger, sockets, …).
pub trait Action: Send + Sync {
    fn execute(&self, ctx: &mut Context) -> Result<(), Error>;
}

pub type BoxedAction = Box<dyn Action>;

/// `mark(M)` — adds mark `M` to `global.marks[handle]`.
pub struct Mark(pub String);
impl Action for Mark {
    fn execute(&self, ctx: &mut Context) -> Result<(), Error> {
        ctx.globals.marks.entry(ctx.primary_handle).or_default().insert(self.0.clone());
        Ok(())
    }
}

/// `unmark(M)` / `unmark(--clear)`.
pub enum UnmarkTarget {
    Named(String),
    Clear,
}
pub struct Unmark(pub UnmarkTarget);
impl Action for Unmark {
    fn execute(&self, ctx: &mut Context) -> Result<(), Error> {
        if let Some(marks) = ctx.globals.marks.get_mut(&ctx.primary_handle) {
            match &self.0 {
                UnmarkTarget::Named(m) => {
                    marks.remove(m);
                }
                UnmarkTarget::Clear => marks.clear(),
            }
        }
        Ok(())
    }
}

/// `verbose()` — invokes the attached verbose printer, if any.
pub struct Verbose;
impl Action for Verbose {
    fn execute(&self, ctx: &mut Context) -> Result<(), Error> {
        ctx.logger.verbose(&format!("handle {:#x}", ctx.primary_handle));
        Ok(())
    }
}

/// `seq(a, b, …)` — sequential composition.
pub struct Seq(pub Vec<BoxedAction>);
impl Action for Seq {
    fn execute(&self, ctx: &mut Context) -> Result<(), Error> {
        for a in &self.0 {
            a.execute(ctx)?;
        }
        Ok(())
    }
}

/// The two deferred-callback events `on(event, action)` can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredEvent {
    EndCommandBuffer,
    QueueSubmit,
    EndRenderPass,
}

/// `on(event, action)` — registers `action` against the current command
/// buffer's deferred-callback list, drained at `CmdEndRenderPass`/
/// `EndCommandBuffer` or `QueueSubmit` (component H). `make_action` is
/// invoked once per registration to produce a fresh, independently
/// executable instance of the inner action (action trees are not `Clone`).
pub struct On {
    pub event: DeferredEvent,
    pub make_action: Box<dyn Fn() -> BoxedAction + Send + Sync>,
}
impl Action for On {
    fn execute(&self, ctx: &mut Context) -> Result<(), Error> {
        let cb = ctx.command_buffer_handle.ok_or_else(|| Error::RuleError {
            line: 0,
            col: 0,
            message: "on() requires an active command buffer".into(),
        })?;
        let list = match self.event {
            DeferredEvent::EndCommandBuffer => &mut ctx.globals.on_end_command_buffer,
            DeferredEvent::QueueSubmit => &mut ctx.globals.on_queue_submit,
            DeferredEvent::EndRenderPass => &mut ctx.globals.on_end_render_pass,
        };
        list.entry(cb).or_default().push((self.make_action)());
        Ok(())
    }
}

/// `each(inner_selector, action)` — `draw` only.
pub struct Each {
    pub inner: SelectorType,
    pub action: BoxedAction,
}
impl Action for Each {
    fn execute(&self, ctx: &mut Context) -> Result<(), Error> {
        // The concrete set of handles iterated (images/buffers/shaders of
        // the current draw) is supplied by hooks::draw before this action
        // runs; here we only guard the selector-type restriction.
        if !matches!(ctx.additional_info, crate::rules::context::AdditionalInfo::Draw { .. }) {
            return Err(Error::RuleError { line: 0, col: 0, message: "each() only valid for draw selectors".into() });
        }
        let _ = self.inner;
        self.action.execute(ctx)
    }
}

/// `disable()` — disables the firing rule. The evaluator clears the rule's
/// `disabled` flag storage by atomic index, so this action itself is a
/// marker consumed by `rules::eval::execute_rules`.
pub struct Disable;
impl Action for Disable {
    fn execute(&self, ctx: &mut Context) -> Result<(), Error> {
        ctx.custom_tag = Some("__disable__".to_owned());
        Ok(())
    }
}

/// `cancel()` — `draw` only: marks the draw canceled so forwarding is skipped.
pub struct Cancel;
impl Action for Cancel {
    fn execute(&self, ctx: &mut Context) -> Result<(), Error> {
        ctx.canceled = true;
        Ok(())
    }
}

/// `log(text)` — writes to the instance logger.
pub struct Log(pub Box<dyn DataExpr>);
impl Action for Log {
    fn execute(&self, ctx: &mut Context) -> Result<(), Error> {
        let text = self.0.eval(ctx)?;
        ctx.logger.line(text.as_string()?);
        Ok(())
    }
}

/// `override(key, value)` — appends `"key = value"` to the local overrides,
/// later applied via `reflection::assign`.
pub struct Override {
    pub key: String,
    pub value: Box<dyn DataExpr>,
}
impl Action for Override {
    fn execute(&self, ctx: &mut Context) -> Result<(), Error> {
        let v = self.value.eval(ctx)?;
        let rendered = match v {
            Value::String(s) => s,
            Value::Number(n) => {
                if n.fract() == 0.0 { format!("{}", n as i64) } else { n.to_string() }
            }
            Value::Handle(h) => format!("{:#x}", h),
            other => {
                return Err(Error::TypeMismatch {
                    expected: crate::rules::data::DataType::String,
                    actual: other.data_type(),
                })
            }
        };
        ctx.overrides.push(format!("{} = {}", self.key, rendered));
        Ok(())
    }
}

/// `write(fd, data)` — writes the evaluated data expression to a named
/// file descriptor registered on the instance.
pub struct Write {
    pub fd: String,
    pub data: Box<dyn DataExpr>,
}
impl Action for Write {
    fn execute(&self, ctx: &mut Context) -> Result<(), Error> {
        let data = self.data.eval(ctx)?;
        let bytes = data.expect(crate::rules::data::DataType::Raw)?;
        let bytes = bytes.as_raw()?;
        let registry = ctx.instance.fd_registry.lock()?;
        if let Some(fd) = registry.get(&self.fd) {
            if let Err(e) = fd.write(bytes) {
                log::warn!("write({}) failed: {}", self.fd, e);
            }
        } else {
            log::warn!("write() to unknown file descriptor `{}`", self.fd);
        }
        Ok(())
    }
}

/// `socket(fd, transport, host, port, framing)` — opens an outbound socket
/// and registers it under `fd`, starting its reader thread.
pub struct OpenSocket {
    pub fd: String,
    pub transport: Transport,
    pub host: String,
    pub port: u16,
    pub framing: Framing,
}
impl Action for OpenSocket {
    fn execute(&self, ctx: &mut Context) -> Result<(), Error> {
        let instance = ctx.instance.clone();
        let descriptor = crate::ipc::socket::Socket::connect(
            self.transport,
            &self.host,
            self.port,
            self.framing,
            instance,
        )?;
        ctx.instance.fd_registry.lock()?.insert(self.fd.clone(), std::sync::Arc::new(descriptor));
        Ok(())
    }
}

/// `server_socket(fd, transport, port, framing)` — opens a listening
/// socket; each accepted connection gets its own reader thread.
pub struct OpenServerSocket {
    pub fd: String,
    pub transport: Transport,
    pub port: u16,
    pub framing: Framing,
}
impl Action for OpenServerSocket {
    fn execute(&self, ctx: &mut Context) -> Result<(), Error> {
        let instance = ctx.instance.clone();
        let descriptor = crate::ipc::socket::Socket::listen(self.transport, self.port, self.framing, instance)?;
        ctx.instance.fd_registry.lock()?.insert(self.fd.clone(), std::sync::Arc::new(descriptor));
        Ok(())
    }
}

/// `close(fd)` — signals the reader thread to stop and drops the descriptor.
pub struct Close(pub String);
impl Action for Close {
    fn execute(&self, ctx: &mut Context) -> Result<(), Error> {
        if let Some(fd) = ctx.instance.fd_registry.lock()?.remove(&self.0) {
            fd.close();
        }
        Ok(())
    }
}
