//! Pattern lifecycle: at most one animation runs at a time and the canvas
//! always has exactly one writer.
//!
//! Types:
//!
//! - `RunnerState` is the observable state machine (`Idle`, `Running`,
//!   `Stopping`).
//! - `RunnerStatus` is a cloneable read-only view of that state for other
//!   threads (the command console, tests).
//! - `PatternRunner` owns the pattern library and, whenever no looping
//!   pattern is active, the [`Canvas`]. Loading a looping pattern moves the
//!   canvas onto the pattern thread; unloading joins the thread and takes the
//!   canvas back.
//!
//! Faults (errors and panics) inside a pattern are caught at the thread or
//! step boundary, logged, and turned into an implicit unload.
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use patterns::{
    Animation, LoopingPattern, PatternContext, PatternError, PatternLibrary, SteppedPattern,
    StopSignal, StopTrigger,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use tree::{Canvas, RawFrame, Topology};

pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(1000 / 45);
pub const DEFAULT_STOP_WARNING: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("pattern '{0}' not found")]
    PatternNotFound(String),
    #[error("failed to spawn thread for pattern '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("canvas was lost when a pattern thread died; restart required")]
    CanvasLost,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunnerState {
    #[default]
    Idle,
    Running {
        name: String,
    },
    Stopping {
        name: String,
    },
}

impl RunnerState {
    pub fn pattern(&self) -> Option<&str> {
        match self {
            RunnerState::Idle => None,
            RunnerState::Running { name } | RunnerState::Stopping { name } => Some(name),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunnerState::Idle => "idle",
            RunnerState::Running { .. } => "running",
            RunnerState::Stopping { .. } => "stopping",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunnerStatus {
    state: Arc<RwLock<RunnerState>>,
}

impl RunnerStatus {
    pub fn get(&self) -> RunnerState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, next: RunnerState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

/// How a looping pattern thread ended.
#[derive(Debug)]
enum TaskOutcome {
    Finished,
    Cancelled,
    Failed(PatternError),
    Panicked(String),
}

struct TaskExit {
    canvas: Canvas,
    outcome: TaskOutcome,
}

enum ActiveRun {
    Stepped(Box<dyn SteppedPattern>),
    Looping {
        trigger: StopTrigger,
        exit_rx: Receiver<TaskExit>,
        join_handle: JoinHandle<()>,
    },
}

struct Active {
    name: String,
    run: ActiveRun,
}

pub struct PatternRunner {
    library: PatternLibrary,
    topology: Arc<Topology>,
    canvas: Option<Canvas>,
    active: Option<Active>,
    status: RunnerStatus,
    frame_interval: Duration,
    stop_warning: Duration,
}

impl PatternRunner {
    pub fn new(canvas: Canvas, library: PatternLibrary) -> Self {
        Self {
            library,
            topology: Arc::clone(canvas.topology()),
            canvas: Some(canvas),
            active: None,
            status: RunnerStatus::default(),
            frame_interval: DEFAULT_FRAME_INTERVAL,
            stop_warning: DEFAULT_STOP_WARNING,
        }
    }

    /// Frame interval handed to looping patterns through their context.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// How long `unload` waits before warning that a pattern is slow to
    /// observe its stop signal.
    pub fn with_stop_warning(mut self, threshold: Duration) -> Self {
        self.stop_warning = threshold;
        self
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    pub fn library(&self) -> &PatternLibrary {
        &self.library
    }

    pub fn status(&self) -> RunnerStatus {
        self.status.clone()
    }

    pub fn state(&self) -> RunnerState {
        self.status.get()
    }

    /// Stops whatever is running and starts `name`.
    ///
    /// The name is resolved before anything is stopped, so an unknown name
    /// leaves the current pattern untouched.
    pub fn load(&mut self, name: &str) -> Result<(), RunnerError> {
        let descriptor = self
            .library
            .get(name)
            .cloned()
            .ok_or_else(|| RunnerError::PatternNotFound(name.to_string()))?;
        self.unload();

        let canvas = self.canvas.take().ok_or(RunnerError::CanvasLost)?;
        let name = descriptor.name().to_string();
        let animation = descriptor.instantiate();
        let style = animation.style();
        let run = match animation {
            Animation::Stepped(pattern) => {
                self.canvas = Some(canvas);
                ActiveRun::Stepped(pattern)
            }
            Animation::Looping(pattern) => self.spawn_looping(&name, canvas, pattern)?,
        };

        self.active = Some(Active {
            name: name.clone(),
            run,
        });
        self.status.set(RunnerState::Running { name: name.clone() });
        info!(pattern = %name, style, "pattern loaded");
        Ok(())
    }

    fn spawn_looping(
        &mut self,
        name: &str,
        canvas: Canvas,
        pattern: Box<dyn LoopingPattern>,
    ) -> Result<ActiveRun, RunnerError> {
        let (signal, trigger) = StopSignal::new();
        let (handoff_tx, handoff_rx) = bounded(1);
        let (exit_tx, exit_rx) = bounded(1);
        let interval = self.frame_interval;
        let spawned = thread::Builder::new()
            .name(format!("pattern-{name}"))
            .spawn(move || run_pattern_thread(handoff_rx, exit_tx, signal, interval));
        let join_handle = match spawned {
            Ok(handle) => handle,
            Err(source) => {
                self.canvas = Some(canvas);
                return Err(RunnerError::Spawn {
                    name: name.to_string(),
                    source,
                });
            }
        };
        // The thread blocks on the handoff until it owns the canvas, so a
        // failed spawn never strands it.
        if let Err(returned) = handoff_tx.send((canvas, pattern)) {
            let (canvas, _) = returned.into_inner();
            self.canvas = Some(canvas);
            let _ = join_handle.join();
            return Err(RunnerError::Spawn {
                name: name.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "pattern thread exited before receiving the canvas",
                ),
            });
        }
        Ok(ActiveRun::Looping {
            trigger,
            exit_rx,
            join_handle,
        })
    }

    /// Stops the active pattern, if any, and waits until it can no longer
    /// touch the canvas.
    pub fn unload(&mut self) {
        let Some(Active { name, run }) = self.active.take() else {
            return;
        };
        self.status.set(RunnerState::Stopping { name: name.clone() });
        match run {
            ActiveRun::Stepped(pattern) => drop(pattern),
            ActiveRun::Looping {
                trigger,
                exit_rx,
                join_handle,
            } => {
                trigger.stop();
                let started = Instant::now();
                let exit = match exit_rx.recv_timeout(self.stop_warning) {
                    Ok(exit) => Some(exit),
                    Err(RecvTimeoutError::Timeout) => {
                        warn!(
                            pattern = %name,
                            waited = ?self.stop_warning,
                            "pattern has not observed its stop signal; still waiting"
                        );
                        exit_rx.recv().ok()
                    }
                    Err(RecvTimeoutError::Disconnected) => None,
                };
                let _ = join_handle.join();
                debug!(pattern = %name, elapsed = ?started.elapsed(), "pattern thread joined");
                self.reclaim(&name, exit);
            }
        }
        self.status.set(RunnerState::Idle);
        info!(pattern = %name, "pattern unloaded");
    }

    fn reclaim(&mut self, name: &str, exit: Option<TaskExit>) {
        let Some(TaskExit { canvas, outcome }) = exit else {
            error!(pattern = %name, "pattern thread exited without returning the canvas");
            return;
        };
        self.canvas = Some(canvas);
        match outcome {
            TaskOutcome::Finished => info!(pattern = %name, "pattern finished on its own"),
            TaskOutcome::Cancelled => debug!(pattern = %name, "pattern observed stop signal"),
            TaskOutcome::Failed(err) => {
                error!(pattern = %name, error = %err, "pattern failed; unloading")
            }
            TaskOutcome::Panicked(message) => {
                error!(pattern = %name, panic = %message, "pattern panicked; unloading")
            }
        }
    }

    /// Advances the active pattern by one frame.
    ///
    /// Stepped patterns draw here. Looping patterns pace themselves, so this
    /// only checks whether their thread has ended and, if so, unloads them.
    pub fn draw_current_step(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let failure = match &mut active.run {
            ActiveRun::Stepped(pattern) => {
                let Some(canvas) = self.canvas.as_mut() else {
                    return;
                };
                match panic::catch_unwind(AssertUnwindSafe(|| pattern.step(canvas))) {
                    Ok(Ok(())) => None,
                    Ok(Err(err)) => Some(TaskOutcome::Failed(err)),
                    Err(payload) => Some(TaskOutcome::Panicked(panic_message(payload.as_ref()))),
                }
            }
            ActiveRun::Looping { exit_rx, .. } => match exit_rx.try_recv() {
                Ok(exit) => {
                    // The thread is done; finish the unload with what it sent back.
                    let name = active.name.clone();
                    if let Some(Active {
                        run: ActiveRun::Looping { join_handle, .. },
                        ..
                    }) = self.active.take()
                    {
                        let _ = join_handle.join();
                    }
                    self.reclaim(&name, Some(exit));
                    self.status.set(RunnerState::Idle);
                    info!(pattern = %name, "pattern unloaded");
                    return;
                }
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    Some(TaskOutcome::Panicked("pattern thread vanished".to_string()))
                }
            },
        };

        if let Some(outcome) = failure {
            let name = active.name.clone();
            match outcome {
                TaskOutcome::Failed(err) => {
                    error!(pattern = %name, error = %err, "pattern failed; unloading")
                }
                TaskOutcome::Panicked(message) => {
                    error!(pattern = %name, panic = %message, "pattern panicked; unloading")
                }
                TaskOutcome::Finished | TaskOutcome::Cancelled => {}
            }
            self.unload();
        }
    }

    /// Stops any pattern, then writes every colored slot of `frame` onto the
    /// canvas. Returns how many pixels changed.
    pub fn apply_raw_frame(&mut self, frame: &RawFrame) -> Result<usize, RunnerError> {
        self.unload();
        let canvas = self.canvas.as_mut().ok_or(RunnerError::CanvasLost)?;
        if frame.len() > canvas.len() {
            debug!(
                slots = frame.len(),
                pixels = canvas.len(),
                "raw frame longer than the tree; extra slots ignored"
            );
        }
        Ok(canvas.apply_raw_frame(frame))
    }
}

impl Drop for PatternRunner {
    fn drop(&mut self) {
        self.unload();
    }
}

impl std::fmt::Debug for PatternRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternRunner")
            .field("state", &self.status.get())
            .field("patterns", &self.library.len())
            .field("holds_canvas", &self.canvas.is_some())
            .finish()
    }
}

fn run_pattern_thread(
    handoff_rx: Receiver<(Canvas, Box<dyn LoopingPattern>)>,
    exit_tx: Sender<TaskExit>,
    signal: StopSignal,
    interval: Duration,
) {
    let Ok((mut canvas, pattern)) = handoff_rx.recv() else {
        return;
    };
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut pattern = pattern;
        let mut ctx = PatternContext::new(&mut canvas, &signal, interval);
        pattern.run(&mut ctx)
    }));
    let outcome = match outcome {
        Ok(Ok(())) => TaskOutcome::Finished,
        Ok(Err(PatternError::Cancelled)) => TaskOutcome::Cancelled,
        Ok(Err(err)) => TaskOutcome::Failed(err),
        Err(payload) => TaskOutcome::Panicked(panic_message(payload.as_ref())),
    };
    let _ = exit_tx.send(TaskExit { canvas, outcome });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
