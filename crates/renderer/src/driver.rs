//! The control loop. Each tick drains pending commands, advances the active
//! pattern, snapshots the tree and pushes the frame to the output queue.
//!
//! Commands arrive on a crossbeam channel so any thread (the stdin console,
//! a test) can steer the pipeline. A command may carry a reply channel; the
//! driver answers it once the command has been applied.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use thiserror::Error;
use tracing::{debug, info, trace, warn};
use tree::RawFrame;

use crate::queue::{FrameQueue, QueueClosed};
use crate::runner::{PatternRunner, RunnerError};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StopPattern,
    StartPattern(String),
    DrawFrame(RawFrame),
}

/// What a successfully applied command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAck {
    Stopped,
    Started(String),
    Drawn { applied: usize },
}

pub type CommandResult = Result<CommandAck, RunnerError>;

#[derive(Debug)]
pub struct CommandEnvelope {
    command: Command,
    reply: Option<Sender<CommandResult>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("pipeline driver is no longer accepting commands")]
pub struct DriverGone;

/// Sending side of the command channel.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<CommandEnvelope>,
}

impl CommandSender {
    /// Queues a command without waiting for its result.
    pub fn send(&self, command: Command) -> Result<(), DriverGone> {
        self.tx
            .send(CommandEnvelope {
                command,
                reply: None,
            })
            .map_err(|_| DriverGone)
    }

    /// Queues a command and returns the channel its result will arrive on.
    pub fn request(&self, command: Command) -> Result<Receiver<CommandResult>, DriverGone> {
        let (reply_tx, reply_rx) = bounded(1);
        self.tx
            .send(CommandEnvelope {
                command,
                reply: Some(reply_tx),
            })
            .map_err(|_| DriverGone)?;
        Ok(reply_rx)
    }
}

pub fn command_channel() -> (CommandSender, Receiver<CommandEnvelope>) {
    let (tx, rx) = unbounded();
    (CommandSender { tx }, rx)
}

/// Stops a running driver from another thread.
///
/// Closing the queue as well wakes a tick that is blocked pushing to a
/// stalled output.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    queue: FrameQueue,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        if !self.flag.swap(true, Ordering::AcqRel) {
            info!("shutdown requested");
        }
        self.queue.close();
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

pub struct PipelineDriver {
    runner: PatternRunner,
    commands: Receiver<CommandEnvelope>,
    queue: FrameQueue,
    shutdown: Arc<AtomicBool>,
    frame_limit: Option<u64>,
    frames: u64,
}

impl PipelineDriver {
    pub fn new(runner: PatternRunner, commands: Receiver<CommandEnvelope>, queue: FrameQueue) -> Self {
        Self {
            runner,
            commands,
            queue,
            shutdown: Arc::new(AtomicBool::new(false)),
            frame_limit: None,
            frames: 0,
        }
    }

    /// Stop after `limit` frames have been pushed.
    pub fn with_frame_limit(mut self, limit: Option<u64>) -> Self {
        self.frame_limit = limit;
        self
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            queue: self.queue.clone(),
        }
    }

    pub fn runner(&self) -> &PatternRunner {
        &self.runner
    }

    pub fn runner_mut(&mut self) -> &mut PatternRunner {
        &mut self.runner
    }

    pub fn frames_pushed(&self) -> u64 {
        self.frames
    }

    /// One pass of the pipeline. Fails only when the queue was closed.
    pub fn tick(&mut self) -> Result<(), QueueClosed> {
        let pending: Vec<CommandEnvelope> = self.commands.try_iter().collect();
        for envelope in pending {
            self.handle(envelope);
        }

        self.runner.draw_current_step();
        let frame = self.runner.topology().snapshot_frame();
        self.queue.push(frame)?;
        self.frames += 1;
        trace!(frame = self.frames, "frame pushed");
        Ok(())
    }

    fn handle(&mut self, envelope: CommandEnvelope) {
        let CommandEnvelope { command, reply } = envelope;
        debug!(?command, "applying command");
        let result = self.apply(command);
        if let Err(err) = &result {
            warn!(error = %err, "command failed");
        }
        if let Some(reply) = reply {
            // The requester may have given up waiting.
            let _ = reply.send(result);
        }
    }

    pub fn apply(&mut self, command: Command) -> CommandResult {
        match command {
            Command::StopPattern => {
                self.runner.unload();
                Ok(CommandAck::Stopped)
            }
            Command::StartPattern(name) => {
                self.runner.load(&name)?;
                Ok(CommandAck::Started(name))
            }
            Command::DrawFrame(frame) => {
                let applied = self.runner.apply_raw_frame(&frame)?;
                Ok(CommandAck::Drawn { applied })
            }
        }
    }

    /// Ticks until shutdown, the frame limit, or a closed queue; then stops
    /// the pattern and closes the queue. Returns the number of frames pushed.
    pub fn run(&mut self) -> u64 {
        info!(
            pixels = self.runner.topology().len(),
            capacity = self.queue.capacity(),
            "pipeline running"
        );
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }
            if self.frame_limit.is_some_and(|limit| self.frames >= limit) {
                info!(frames = self.frames, "frame limit reached");
                break;
            }
            if self.tick().is_err() {
                if !self.shutdown.load(Ordering::Acquire) {
                    warn!("frame queue closed by the output stage; stopping");
                }
                break;
            }
        }
        self.runner.unload();
        self.queue.close();
        info!(frames = self.frames, "pipeline stopped");
        self.frames
    }
}

impl std::fmt::Debug for PipelineDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineDriver")
            .field("runner", &self.runner)
            .field("queue", &self.queue)
            .field("frames", &self.frames)
            .field("frame_limit", &self.frame_limit)
            .finish()
    }
}
