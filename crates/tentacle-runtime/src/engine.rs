//! Engine assembly: scheduler task plus stream attachment.

use crate::client::StreamClient;
use crate::config::TentacleConfig;
use crate::results::ResultRouter;
use crate::scheduler::{CommitNotice, MutationScheduler, SchedulerHandle};
use crate::session::spawn_session;
use tentacle_types::StreamId;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// Commit notices buffered between scheduler and compile bridge.
const COMMIT_BUFFER: usize = 64;

/// A running scheduler plus the pieces needed to attach streams to it.
///
/// The engine owns no sockets. The frontend accepts connections (or
/// builds in-process pipes) and hands the halves to
/// [`attach_stream`](Self::attach_stream).
pub struct TentacleEngine {
    config: TentacleConfig,
    handle: SchedulerHandle,
    router: ResultRouter,
    scheduler_task: JoinHandle<()>,
}

impl TentacleEngine {
    /// Starts an engine with no compile side. Commits are applied but
    /// never compiled.
    #[must_use]
    pub fn start(config: TentacleConfig) -> Self {
        Self::assemble(config, None)
    }

    /// Starts an engine that emits a [`CommitNotice`] per committed
    /// mutation. The caller feeds the receiver to a compile bridge.
    #[must_use]
    pub fn start_with_commits(config: TentacleConfig) -> (Self, mpsc::Receiver<CommitNotice>) {
        let (tx, rx) = mpsc::channel(COMMIT_BUFFER);
        (Self::assemble(config, Some(tx)), rx)
    }

    fn assemble(config: TentacleConfig, commits: Option<mpsc::Sender<CommitNotice>>) -> Self {
        let router = ResultRouter::new();
        let (scheduler, handle) = MutationScheduler::new(router.clone(), commits, config.queue_depth);
        let scheduler_task = tokio::spawn(scheduler.run());
        info!(queue_depth = config.queue_depth, "engine started");
        Self {
            config,
            handle,
            router,
            scheduler_task,
        }
    }

    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    #[must_use]
    pub fn router(&self) -> &ResultRouter {
        &self.router
    }

    #[must_use]
    pub fn config(&self) -> &TentacleConfig {
        &self.config
    }

    /// Attaches a connected byte stream as a new command stream.
    pub fn attach_stream<R, W>(&self, reader: R, writer: W) -> StreamId
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let stream = StreamId::new();
        spawn_session(
            stream,
            reader,
            writer,
            self.handle.clone(),
            &self.router,
            self.config.max_frame_len,
            self.config.result_buffer,
        );
        info!(stream = %stream, "stream attached");
        stream
    }

    /// Opens an in-process stream and returns its client end. Used by
    /// embedded frontends and tests.
    #[must_use]
    pub fn open_local(&self) -> LocalClient {
        let (near, far) = tokio::io::duplex(self.config.max_frame_len * 2);
        let (far_read, far_write) = tokio::io::split(far);
        self.attach_stream(far_read, far_write);
        let (near_read, near_write) = tokio::io::split(near);
        StreamClient::new(near_read, near_write, self.config.max_frame_len)
    }

    /// Stops the scheduler after it drains in-flight commands.
    pub async fn shutdown(self) {
        self.handle.shutdown().await;
        let _ = self.scheduler_task.await;
        info!("engine stopped");
    }
}

/// Client end of an in-process stream.
pub type LocalClient = StreamClient<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;
