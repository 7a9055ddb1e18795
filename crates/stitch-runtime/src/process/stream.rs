//! Backend output readers (non-UTF8-safe).
//!
//! Backends such as Flask or uvicorn may emit non-UTF8 bytes on stdout/stderr.
//! `BufReader::lines()` would end the reader task on invalid UTF-8, so lines
//! are read as bytes and decoded lossily.

use std::sync::Arc;

use stitch_core::{LifecycleEvent, LifecycleEventEmitter, OutputStream};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub(crate) fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    which: OutputStream,
    pid: Option<u32>,
    emitter: Arc<dyn LifecycleEventEmitter>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    let line = String::from_utf8_lossy(trim_line_ending(&buf)).into_owned();
                    info!(target: "backend", pid = ?pid, stream = which.as_str(), "{}", line);
                    emitter.emit(LifecycleEvent::output(which, line));
                }
                Err(e) => {
                    debug!(pid = ?pid, stream = which.as_str(), error = %e, "backend output reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(pid = ?pid, stream = which.as_str(), "backend output reader task exiting");
    })
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}
