//! The run log. A single thread owns the file and every other thread sends it
//! lines, so entries from concurrent ensembles never interleave

use std::{
    fs::OpenOptions,
    io::{BufWriter, Write},
    path::Path,
    sync::mpsc::{self, Sender},
    thread::{self, JoinHandle},
};

use qcjobs::time;

use crate::error::DatsError;

/// the name of the run log in the working directory
pub const LOG_FILE: &str = "log";

/// A handle for sending lines to the journal thread
pub struct Journal {
    /// handle for spawned thread
    handle: JoinHandle<()>,

    /// channel for sending lines to be written
    sender: Sender<String>,
}

impl Journal {
    /// start a journal appending to `path`
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DatsError> {
        let path = path.as_ref();
        let f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| DatsError::Io(path.display().to_string(), e.kind()))?;
        let (sender, receiver) = mpsc::channel::<String>();
        let handle = thread::spawn(move || {
            let mut w = BufWriter::new(f);
            for line in receiver {
                let date = jiff::Zoned::now().strftime("%Y-%m-%d %H:%M:%S");
                if let Err(e) = writeln!(w, "[{date}] {line}").and_then(|_| w.flush())
                {
                    log::error!("failed to write to journal with {e}");
                }
            }
        });
        Ok(Self { handle, sender })
    }

    /// a sender for another thread
    pub fn sender(&self) -> Sender<String> {
        self.sender.clone()
    }

    pub fn send(&self, s: impl Into<String>) {
        // the receiver only hangs up in shutdown, which consumes self
        let _ = self.sender.send(s.into());
    }

    /// wait for every queued line to be written. the thread exits once the
    /// last sender, including the clones handed out by [Journal::sender], is
    /// dropped
    pub fn shutdown(self) {
        let Self { handle, sender } = self;
        drop(sender);
        time!(e, {
            if handle.join().is_err() {
                log::error!("journal thread panicked");
            }
        });
        log::debug!(
            "journal finished after {:.1} s",
            e.as_millis() as f64 / 1000.0
        );
    }
}
