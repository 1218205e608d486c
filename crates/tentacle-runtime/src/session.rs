//! One connected stream: a reader task and a writer task.
//!
//! The reader turns bytes into operations and pushes them at the
//! scheduler; the writer drains the stream's result channel back onto
//! the wire. Neither task knows about the other — teardown flows
//! through the scheduler (`StreamClosed` cancels pending work and
//! unregisters the result channel, which ends the writer).

use crate::results::ResultRouter;
use crate::scheduler::SchedulerHandle;
use crate::transport::{FrameReader, FrameWriter};
use tentacle_proto::{decode, ResultEnvelope};
use tentacle_types::{Diagnostic, ErrorCode, StreamId};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Spawns the reader and writer tasks for one stream.
///
/// Registers the stream with the router before either task starts so
/// no outcome can race past an unregistered channel.
pub fn spawn_session<R, W>(
    stream: StreamId,
    reader: R,
    writer: W,
    scheduler: SchedulerHandle,
    router: &ResultRouter,
    max_payload: usize,
    result_buffer: usize,
) -> (JoinHandle<()>, JoinHandle<()>)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let results = router.register(stream, result_buffer);
    let read_router = router.clone();

    let read_task = tokio::spawn(async move {
        run_reader(stream, reader, scheduler, read_router, max_payload).await;
    });
    let write_task = tokio::spawn(async move {
        run_writer(stream, writer, results).await;
    });
    (read_task, write_task)
}

async fn run_reader<R>(
    stream: StreamId,
    reader: R,
    scheduler: SchedulerHandle,
    router: ResultRouter,
    max_payload: usize,
) where
    R: AsyncRead + Unpin,
{
    let mut frames = FrameReader::new(reader, stream, max_payload);
    let mut last_seq = 0u64;
    loop {
        match frames.next_frame().await {
            Ok(Some(frame)) => {
                if frame.seq <= last_seq {
                    warn!(stream = %stream, seq = frame.seq, last_seq, "out-of-order frame");
                    let fault = ResultEnvelope::Fault {
                        seq: Some(frame.seq),
                        diagnostic: Diagnostic::error(format!(
                            "frame {} arrived after frame {}",
                            frame.seq, last_seq
                        )),
                    };
                    router.deliver(&stream, fault).await;
                    continue;
                }
                last_seq = frame.seq;
                match decode(&frame) {
                    Ok(op) => {
                        if scheduler.submit(stream, op).await.is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        // Decode failures are per-frame: report and
                        // keep reading.
                        if scheduler.decode_failed(stream, frame.seq, error).await.is_err() {
                            break;
                        }
                    }
                }
            }
            Ok(None) => {
                debug!(stream = %stream, "stream reached end of input");
                break;
            }
            Err(e) => {
                warn!(stream = %stream, code = e.code(), "transport fault: {e}");
                break;
            }
        }
    }
    info!(stream = %stream, frames = last_seq, "reader finished");
    let _ = scheduler.stream_closed(stream).await;
}

async fn run_writer<W>(
    stream: StreamId,
    writer: W,
    mut results: tokio::sync::mpsc::Receiver<ResultEnvelope>,
) where
    W: AsyncWrite + Unpin,
{
    let mut sink = FrameWriter::new(writer);
    while let Some(envelope) = results.recv().await {
        if let Err(e) = sink.send(&envelope.encode()).await {
            warn!(stream = %stream, code = e.code(), "result write failed: {e}");
            break;
        }
    }
    let _ = sink.close().await;
    debug!(stream = %stream, "writer finished");
}
