//! `execute_rules`: the evaluator entry point invoked by every hook
//! (component D). Mirrors the original's per-rule try/catch-and-log loop.

use crate::rules::ast::{Rule, SelectorType};
use crate::rules::context::Context;

/// Runs every loaded rule whose selector matches `ty` against `handle`,
/// applying side effects through `ctx`. A single rule's error is logged and
/// does not abort the remaining rules, matching the original's per-rule
/// isolation in `execute_rules`.
pub fn execute_rules(rules: &[Rule], ty: SelectorType, handle: u64, ctx: &mut Context) {
    for rule in rules {
        if rule.selector.ty != ty {
            continue;
        }
        match rule.matches(handle, ctx) {
            Ok(true) => {
                ctx.custom_tag = None;
                if let Err(e) = rule.action.execute(ctx) {
                    ctx.logger.error(&format!(
                        "rule at {}:{} failed to execute: {}",
                        rule.line, rule.col, e
                    ));
                    continue;
                }
                if ctx.custom_tag.as_deref() == Some("__disable__") {
                    rule.disabled.store(true, std::sync::atomic::Ordering::Relaxed);
                }
            }
            Ok(false) => {}
            Err(e) => {
                ctx.logger.error(&format!("rule at {}:{} failed to match: {}", rule.line, rule.col, e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // `execute_rules` needs a live `Context` (logger + instance), exercised
    // end-to-end in `tests/rule_scenarios.rs` rather than in isolation here.
}
