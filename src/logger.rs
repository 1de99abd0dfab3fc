//! Component J: the per-instance logger. Distinct from the `log` facade
//! (used for this crate's own process-internal diagnostics, see
//! `src/lib.rs`'s `pretty_env_logger` dev-dependency) — this is the
//! rule-facing, file-backed sink `log()`/`verbose()` actions and every hook
//! write lines to, one file per `VkInstance`, mirroring
//! `CheekyLayer::logger`'s single-writer-thread design.

use std::fs::File;
use std::io::Write as _;
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;

use log::Level;

use crate::Error;

enum Message {
    Line(String),
    Flush,
}

/// Substitutes `{{pid}}`/`{{inst}}` placeholders in a configured log-file
/// path template.
pub fn expand_path_template(template: &str, pid: u32, instance_handle: u64) -> String {
    template.replace("{{pid}}", &pid.to_string()).replace("{{inst}}", &format!("{:#x}", instance_handle))
}

pub struct InstanceLogger {
    sender: Option<Sender<Message>>,
    worker: Option<JoinHandle<()>>,
    flush_on: Level,
}

impl InstanceLogger {
    pub fn open(path: &str, flush_on: Level) -> Result<Self, Error> {
        let mut file = File::create(path)?;
        let (sender, receiver) = mpsc::channel::<Message>();
        let worker = std::thread::spawn(move || {
            for msg in receiver {
                match msg {
                    Message::Line(line) => {
                        let _ = writeln!(file, "{}", line);
                    }
                    Message::Flush => {
                        let _ = file.flush();
                    }
                }
            }
        });
        Ok(InstanceLogger { sender: Some(sender), worker: Some(worker), flush_on })
    }

    fn send(&self, level: Level, line: String) {
        let Some(sender) = &self.sender else { return };
        let _ = sender.send(Message::Line(line));
        if level <= self.flush_on {
            let _ = sender.send(Message::Flush);
        }
    }

    pub fn line(&self, text: &str) {
        self.send(Level::Info, text.to_owned());
    }

    pub fn verbose(&self, text: &str) {
        self.send(Level::Debug, format!("[verbose] {}", text));
    }

    pub fn warn(&self, text: &str) {
        self.send(Level::Warn, format!("[warn] {}", text));
        log::warn!("{}", text);
    }

    pub fn error(&self, text: &str) {
        self.send(Level::Error, format!("[error] {}", text));
        log::error!("{}", text);
    }

    pub fn flush(&self) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(Message::Flush);
        }
    }
}

impl Drop for InstanceLogger {
    fn drop(&mut self) {
        self.flush();
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_pid_and_instance_placeholders() {
        let expanded = expand_path_template("/tmp/{{pid}}-{{inst}}.log", 42, 0xdead);
        assert_eq!(expanded, "/tmp/42-0xdead.log");
    }
}
