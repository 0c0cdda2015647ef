//! Log output.
//!
//! Without a log file, `env_logger` writes to stderr as usual. With one, every
//! formatted record is pushed through a channel to [`LogSink`], a pingora
//! service that appends to the file from its own thread so request handlers
//! never block on disk I/O.

use std::io::{self, Write};

use async_trait::async_trait;
use env_logger::Builder;
use log::LevelFilter;
use pingora::{
    server::{ListenFds, ShutdownWatch},
    services::Service,
};
use tokio::{
    fs::{create_dir_all, metadata, OpenOptions},
    io::{AsyncWrite, AsyncWriteExt, BufWriter},
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
};

use crate::config;

/// `env_logger` target that forwards each record to the sink.
pub struct ChannelWriter {
    sender: UnboundedSender<Vec<u8>>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sender
            .send(buf.to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct LogSink {
    sender: UnboundedSender<Vec<u8>>,
    receiver: UnboundedReceiver<Vec<u8>>,
    config: config::Log,
}

impl LogSink {
    pub fn new(config: config::Log) -> Self {
        let (sender, receiver) = unbounded_channel::<Vec<u8>>();
        Self {
            sender,
            receiver,
            config,
        }
    }

    pub fn writer(&self) -> ChannelWriter {
        ChannelWriter {
            sender: self.sender.clone(),
        }
    }

    /// Installs `env_logger` with this sink as its target. `RUST_LOG` still
    /// applies on top of the `info` default.
    pub fn init_env_logger(&self) {
        Builder::new()
            .filter(None, LevelFilter::Info)
            .parse_env(env_logger::Env::default())
            .target(env_logger::Target::Pipe(Box::new(self.writer())))
            .init();
    }

    /// Drains records into `out` until shutdown or until every writer is gone.
    async fn drain<W: AsyncWrite + Unpin>(&mut self, out: &mut W, shutdown: &mut ShutdownWatch) {
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                },
                data = self.receiver.recv() => {
                    match data {
                        Some(data) => {
                            if let Err(e) = out.write_all(&data).await {
                                eprintln!("Failed to write to log file: {e}");
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        // keep what was queued before the signal
        while let Ok(data) = self.receiver.try_recv() {
            if let Err(e) = out.write_all(&data).await {
                eprintln!("Failed to write to log file: {e}");
                break;
            }
        }

        if let Err(e) = out.flush().await {
            eprintln!("Failed to flush log file: {e}");
        }
    }

    async fn open(&self) -> io::Result<BufWriter<tokio::fs::File>> {
        if let Some(parent) = std::path::Path::new(&self.config.path).parent() {
            if !parent.as_os_str().is_empty() && metadata(parent).await.is_err() {
                create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.config.path)
            .await?;
        Ok(BufWriter::new(file))
    }
}

#[async_trait]
impl Service for LogSink {
    async fn start_service(&mut self, _fds: Option<ListenFds>, mut shutdown: ShutdownWatch) {
        let mut file = match self.open().await {
            Ok(file) => file,
            Err(e) => {
                // the logger itself points here, so stderr is the only way out
                eprintln!("Failed to open log file {}: {e}", self.config.path);
                return;
            }
        };

        self.drain(&mut file, &mut shutdown).await;
    }

    fn name(&self) -> &'static str {
        "log sink"
    }

    fn threads(&self) -> Option<usize> {
        Some(1)
    }
}
