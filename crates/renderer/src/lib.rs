//! Rendering pipeline for the GRIDmas tree.
//!
//! The crate glues patterns, the shared canvas and the output stage together.
//! The overall flow is:
//!
//! ```text
//!   command source ──▶ CommandSender ──▶ PipelineDriver::tick
//!                                           │ 1. drain commands (load/unload/draw)
//!                                           │ 2. PatternRunner::draw_current_step
//!                                           │ 3. Topology::snapshot_frame
//!                                           ▼ 4. FrameQueue::push (blocks when full)
//!                                        FrameQueue ──▶ OutputRuntime thread ──▶ OutputBackend
//! ```
//!
//! `PatternRunner` enforces a single writer: the canvas lives either in the
//! runner or on the one pattern thread it spawned, and unloading joins that
//! thread before anything else may write.

mod driver;
mod output;
mod queue;
mod runner;

pub use driver::{
    command_channel, Command, CommandAck, CommandEnvelope, CommandResult, CommandSender,
    DriverGone, PipelineDriver, ShutdownHandle,
};
pub use output::{JsonLinesOutput, NullOutput, OutputBackend, OutputRuntime, OutputSummary};
pub use queue::{FrameQueue, QueueClosed, DEFAULT_QUEUE_CAPACITY};
pub use runner::{
    PatternRunner, RunnerError, RunnerState, RunnerStatus, DEFAULT_FRAME_INTERVAL,
    DEFAULT_STOP_WARNING,
};
