//! Buffered per-sensor stream writers.
//!
//! Each subscribed sensor gets one [`StreamWriter`]: an append-only CSV log
//! owned by a dedicated writer thread, fed through a bounded channel. The
//! channel decouples the provider's delivery thread from disk I/O, so a slow
//! disk for one sensor never stalls delivery for another, and the event
//! callback never blocks beyond a `try_send`.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::warn;

use crate::sensor::{SensorKind, SensorSample};

/// How many records a writer buffers before the sink starts dropping.
/// Sized to absorb several seconds of the fastest sensor's burst rate.
const SINK_CAPACITY: usize = 10_000;

/// Errors raised by stream writer control operations.
#[derive(Debug)]
pub enum WriterError {
    Io(std::io::Error),
    /// The writer thread is gone; the stream was already closed or panicked.
    Disconnected,
}

impl std::fmt::Display for WriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriterError::Io(e) => write!(f, "I/O error: {e}"),
            WriterError::Disconnected => write!(f, "writer thread is not running"),
        }
    }
}

impl std::error::Error for WriterError {}

impl From<std::io::Error> for WriterError {
    fn from(e: std::io::Error) -> Self {
        WriterError::Io(e)
    }
}

enum WriterCommand {
    Record(String),
    Flush(Sender<std::io::Result<()>>),
    Close(Sender<std::io::Result<()>>),
}

/// The event sink handed to the sensor provider for one subscribed sensor.
///
/// Cloneable and cheap: delivery threads call [`RecordSink::on_event`], which
/// encodes the sample and hands it to the writer thread without blocking. If
/// the writer's buffer is full the sample is dropped and logged; losing one
/// sample must not abort the stream.
#[derive(Clone)]
pub struct RecordSink {
    kind: SensorKind,
    tx: Sender<WriterCommand>,
}

impl RecordSink {
    /// The sensor this sink accepts samples for.
    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Accept one sample. Invoked on the provider's delivery thread; returns
    /// immediately regardless of disk latency.
    pub fn on_event(&self, sample: &SensorSample) {
        let line = sample.csv_line();
        if self.tx.try_send(WriterCommand::Record(line)).is_err() {
            warn!(sensor = self.kind.name(), "sample dropped: writer buffer full or stream closed");
        }
    }
}

impl std::fmt::Debug for RecordSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordSink").field("kind", &self.kind).finish()
    }
}

/// Owns one sensor's log file and the thread that writes to it.
///
/// The file handle is exclusively owned by the writer thread; no other
/// component writes to it. `flush` is always invoked before `close` on every
/// control path, because buffered close can swallow pending I/O errors.
pub struct StreamWriter {
    kind: SensorKind,
    path: PathBuf,
    tx: Sender<WriterCommand>,
    handle: Option<JoinHandle<()>>,
}

impl StreamWriter {
    /// Create `<sensor name>.csv` inside `dir` and start the writer thread.
    ///
    /// Fails if the file already exists or cannot be created. Returns the
    /// writer handle together with the sink to subscribe to the provider.
    pub fn open(kind: SensorKind, dir: &Path) -> Result<(StreamWriter, RecordSink), WriterError> {
        let path = dir.join(format!("{}.csv", kind.name()));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;

        let (tx, rx) = bounded(SINK_CAPACITY);
        let handle = thread::spawn(move || run_writer(kind, file, rx));

        let sink = RecordSink {
            kind,
            tx: tx.clone(),
        };
        let writer = StreamWriter {
            kind,
            path,
            tx,
            handle: Some(handle),
        };
        Ok((writer, sink))
    }

    /// The sensor this writer persists.
    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Path of the backing log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write out all buffered records. Waits for every record handed to the
    /// sink before this call to reach the file.
    pub fn flush(&self) -> Result<(), WriterError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.tx
            .send(WriterCommand::Flush(reply_tx))
            .map_err(|_| WriterError::Disconnected)?;
        reply_rx
            .recv()
            .map_err(|_| WriterError::Disconnected)?
            .map_err(WriterError::Io)
    }

    /// Flush and close the stream, stopping the writer thread.
    pub fn close(mut self) -> Result<(), WriterError> {
        self.close_inner()
    }

    fn close_inner(&mut self) -> Result<(), WriterError> {
        let result = (|| {
            let (reply_tx, reply_rx) = bounded(1);
            self.tx
                .send(WriterCommand::Close(reply_tx))
                .map_err(|_| WriterError::Disconnected)?;
            reply_rx
                .recv()
                .map_err(|_| WriterError::Disconnected)?
                .map_err(WriterError::Io)
        })();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        result
    }
}

impl Drop for StreamWriter {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(e) = self.close_inner() {
                warn!(sensor = self.kind.name(), error = %e, "error closing stream on drop");
            }
        }
    }
}

impl std::fmt::Debug for StreamWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamWriter")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .finish()
    }
}

fn run_writer(kind: SensorKind, file: File, rx: Receiver<WriterCommand>) {
    let mut out = BufWriter::new(file);
    for command in rx {
        match command {
            WriterCommand::Record(line) => {
                let result = out
                    .write_all(line.as_bytes())
                    .and_then(|_| out.write_all(b"\n"));
                if let Err(e) = result {
                    // Best-effort: one lost record must not end the stream.
                    warn!(sensor = kind.name(), error = %e, "failed to persist record");
                }
            }
            WriterCommand::Flush(reply) => {
                let _ = reply.send(out.flush());
            }
            WriterCommand::Close(reply) => {
                // Flush explicitly: BufWriter's drop discards flush errors.
                let _ = reply.send(out.flush());
                break;
            }
        }
    }
}
