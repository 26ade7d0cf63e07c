//! Reader and writer tasks bridging child streams and line channels.
//!
//! One reader task runs per output-side producer. It suspends on the
//! underlying stream read (no polling), forwards each line into its
//! channel, and on EOF drops its sender so the channel can report
//! end-of-stream once every producer is gone. The writer task suspends on
//! the input channel and exits when the channel closes or the pipe
//! breaks.

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::ChildStdin;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channel::{LineReceiver, LineSender};
use crate::types::Line;

/// Spawn a task draining one child output stream into a channel.
///
/// Lines keep their terminator bytes; a final unterminated partial line
/// is forwarded as-is. Overflow evicts the oldest buffered line, logged
/// at warn level.
pub(crate) fn spawn_reader<R>(stream: &'static str, source: R, tx: LineSender) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        info!(stream, "reader task started");
        let mut reader = BufReader::new(source);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    debug!(stream, bytes = n, "read line");
                    let line = Line::new(Bytes::copy_from_slice(&buf));
                    if let Some(evicted) = tx.send(line) {
                        warn!(
                            stream,
                            evicted_bytes = evicted.len(),
                            "channel full, evicted oldest line"
                        );
                    }
                }
                Err(err) => {
                    debug!(stream, error = %err, "read failed, stopping reader");
                    break;
                }
            }
        }
        info!(stream, "reader task finished");
        // Dropping `tx` closes this producer side; the channel reports
        // end-of-stream once the last producer is gone.
    })
}

/// Spawn a task draining the input channel into the child's stdin.
///
/// Each dequeued line is written and flushed before the next is taken.
/// A write or flush error means the child has gone away; the task logs
/// and exits rather than crashing.
pub(crate) fn spawn_writer(mut stdin: ChildStdin, mut rx: LineReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("writer task started");
        while let Some(line) = rx.recv().await {
            debug!(bytes = line.len(), "writing line to stdin");
            let bytes = line.into_bytes();
            let result = async {
                stdin.write_all(&bytes).await?;
                stdin.flush().await
            }
            .await;
            if let Err(err) = result {
                debug!(error = %err, "stdin closed, stopping writer");
                break;
            }
        }
        info!("writer task finished");
    })
}
