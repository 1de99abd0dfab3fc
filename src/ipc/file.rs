//! A local-file file descriptor: `write(fd, data)` targets opened in append
//! mode, the simplest of the rule engine's output sinks.

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::sync::Mutex;

use crate::ipc::FileDescriptor;
use crate::Error;

pub struct LocalFile {
    file: Mutex<File>,
}

impl LocalFile {
    pub fn open_append(path: &std::path::Path) -> Result<Self, Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(LocalFile { file: Mutex::new(file) })
    }
}

impl FileDescriptor for LocalFile {
    fn write(&self, data: &[u8]) -> Result<(), Error> {
        self.file.lock()?.write_all(data)?;
        Ok(())
    }

    fn close(&self) {
        if let Ok(mut f) = self.file.lock() {
            let _ = f.flush();
        }
    }
}
