use std::io::Write;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, error, info, warn};
use tree::Frame;

use crate::queue::FrameQueue;

/// Final stage of the pipeline: receives every finished frame in order.
pub trait OutputBackend: Send {
    fn name(&self) -> &'static str;

    fn present(&mut self, frame: &Frame) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Discards frames. Useful for dry runs and benchmarks of the control loop.
#[derive(Debug, Default)]
pub struct NullOutput;

impl OutputBackend for NullOutput {
    fn name(&self) -> &'static str {
        "null"
    }

    fn present(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }
}

/// Writes one JSON array of `#rrggbb` strings per frame.
#[derive(Debug)]
pub struct JsonLinesOutput<W: Write + Send> {
    writer: W,
    line: Vec<u8>,
}

impl<W: Write + Send> JsonLinesOutput<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            line: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> OutputBackend for JsonLinesOutput<W> {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.line.clear();
        serde_json::to_writer(&mut self.line, frame).context("failed to encode frame")?;
        self.line.push(b'\n');
        // One write per line keeps frames whole when stdout is shared.
        self.writer
            .write_all(&self.line)
            .context("failed to write frame")?;
        self.writer.flush().context("failed to flush frame output")
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().context("failed to flush frame output")
    }
}

/// Sleeps between frames to hold a target rate. Falls back to the current
/// time when it runs more than one interval behind instead of bursting.
#[derive(Debug)]
pub(crate) struct FramePacer {
    interval: Option<Duration>,
    next: Option<Instant>,
}

impl FramePacer {
    pub(crate) fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .and_then(|fps| match Duration::try_from_secs_f32(1.0 / fps) {
                Ok(interval) => Some(interval),
                Err(err) => {
                    warn!(fps, error = %err, "output rate out of range; running unpaced");
                    None
                }
            });
        Self {
            interval,
            next: None,
        }
    }

    pub(crate) fn wait(&mut self) {
        let Some(interval) = self.interval else {
            return;
        };
        if let Some(deadline) = self.next {
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            }
        }
        let now = Instant::now();
        self.next = Some(match self.next {
            Some(deadline) if deadline + interval >= now => deadline + interval,
            _ => now + interval,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSummary {
    pub frames: u64,
}

/// Runs an [`OutputBackend`] on its own thread, popping frames until the
/// queue closes.
pub struct OutputRuntime {
    queue: FrameQueue,
    join_handle: Option<JoinHandle<Result<OutputSummary>>>,
}

impl OutputRuntime {
    pub fn spawn(
        queue: FrameQueue,
        backend: Box<dyn OutputBackend>,
        target_fps: Option<f32>,
    ) -> Result<Self> {
        let thread_queue = queue.clone();
        let handle = thread::Builder::new()
            .name("gridmas-output".into())
            .spawn(move || run_output_thread(thread_queue, backend, target_fps))
            .map_err(|err| anyhow!("failed to spawn output thread: {err}"))?;
        Ok(Self {
            queue,
            join_handle: Some(handle),
        })
    }

    /// Waits for the output to drain every buffered frame. The queue must be
    /// closed by the producer (or here, if it has not been yet).
    pub fn shutdown(mut self) -> Result<OutputSummary> {
        self.queue.close();
        match self.join_handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|err| anyhow!("output thread panicked: {err:?}"))?,
            None => Ok(OutputSummary { frames: 0 }),
        }
    }
}

impl Drop for OutputRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            self.queue.close();
            let _ = handle.join();
        }
    }
}

fn run_output_thread(
    queue: FrameQueue,
    mut backend: Box<dyn OutputBackend>,
    target_fps: Option<f32>,
) -> Result<OutputSummary> {
    let mut pacer = FramePacer::new(target_fps);
    let mut frames = 0u64;
    info!(backend = backend.name(), fps = ?target_fps, "output started");
    while let Ok(frame) = queue.pop() {
        pacer.wait();
        if let Err(err) = backend.present(&frame) {
            error!(backend = backend.name(), error = %err, "output failed; closing frame queue");
            // Unblock the producer; nothing will consume its frames now.
            queue.close();
            return Err(err);
        }
        frames += 1;
    }
    backend.finish()?;
    debug!(backend = backend.name(), frames, "output drained");
    Ok(OutputSummary { frames })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tree::Rgb;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn json_lines_writes_hex_arrays() {
        let mut output = JsonLinesOutput::new(Vec::new());
        output
            .present(&Frame::new(vec![Rgb::RED, Rgb::new(0, 16, 255)]))
            .unwrap();
        let text = String::from_utf8(output.into_inner()).unwrap();
        assert_eq!(text, "[\"#ff0000\",\"#0010ff\"]\n");
    }

    #[test]
    fn runtime_drains_queue_after_close() {
        let queue = FrameQueue::new(4);
        let buffer = SharedBuffer::default();
        for level in 0..3u8 {
            queue.push(Frame::new(vec![Rgb::new(level, 0, 0)])).unwrap();
        }
        let runtime = OutputRuntime::spawn(
            queue.clone(),
            Box::new(JsonLinesOutput::new(buffer.clone())),
            None,
        )
        .unwrap();
        queue.close();
        let summary = runtime.shutdown().unwrap();
        assert_eq!(summary.frames, 3);
        let text = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn pacer_holds_the_target_rate() {
        let mut pacer = FramePacer::new(Some(100.0));
        let start = Instant::now();
        for _ in 0..5 {
            pacer.wait();
        }
        // First frame is immediate, the next four wait 10ms each.
        assert!(start.elapsed() >= Duration::from_millis(38));
        assert!(FramePacer::new(Some(0.0)).interval.is_none());
        assert!(FramePacer::new(None).interval.is_none());
        assert!(FramePacer::new(Some(1e-30)).interval.is_none());
    }
}
