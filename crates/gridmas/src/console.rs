//! Line-oriented JSON control surface on stdin.
//!
//! Each input line is one request object tagged by `type`:
//!
//! ```text
//! {"type":"start","name":"spin"}
//! {"type":"stop"}
//! {"type":"draw","frame":["#ff0000",null,[0,0,255]]}
//! {"type":"status"}
//! {"type":"list"}
//! ```
//!
//! Every request gets exactly one response object on the output, written as
//! a single line. End of input stops the console; the pipeline keeps running.
use std::io::{BufRead, Write};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use patterns::PatternLibrary;
use renderer::{Command, CommandAck, CommandSender, RunnerStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tree::RawFrame;

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Request {
    Start { name: String },
    Stop,
    Draw { frame: RawFrame },
    Status,
    List,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PatternInfo {
    pub name: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PatternInfo {
    pub fn catalog(library: &PatternLibrary) -> Vec<PatternInfo> {
        library
            .iter()
            .map(|descriptor| PatternInfo {
                name: descriptor.name().to_string(),
                kind: descriptor.kind().to_string(),
                author: descriptor.author().map(str::to_string),
                description: descriptor.description().map(str::to_string),
            })
            .collect()
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
enum Response {
    Ok {
        ok: bool,
        #[serde(flatten)]
        body: ResponseBody,
    },
    Error {
        ok: bool,
        error: String,
    },
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
enum ResponseBody {
    Started { started: String },
    Stopped { stopped: bool },
    Drawn { applied: usize },
    Status {
        state: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    Patterns { patterns: Vec<PatternInfo> },
}

impl Response {
    fn ok(body: ResponseBody) -> Self {
        Response::Ok { ok: true, body }
    }

    fn error(message: impl Into<String>) -> Self {
        Response::Error {
            ok: false,
            error: message.into(),
        }
    }
}

impl From<CommandAck> for ResponseBody {
    fn from(ack: CommandAck) -> Self {
        match ack {
            CommandAck::Started(name) => ResponseBody::Started { started: name },
            CommandAck::Stopped => ResponseBody::Stopped { stopped: true },
            CommandAck::Drawn { applied } => ResponseBody::Drawn { applied },
        }
    }
}

/// Everything the console needs to answer requests.
#[derive(Debug, Clone)]
pub struct Console {
    commands: CommandSender,
    status: RunnerStatus,
    catalog: Vec<PatternInfo>,
}

impl Console {
    pub fn new(commands: CommandSender, status: RunnerStatus, catalog: Vec<PatternInfo>) -> Self {
        Self {
            commands,
            status,
            catalog,
        }
    }

    /// Serves requests on a detached thread until input ends or the
    /// pipeline goes away.
    pub fn spawn<R, W>(self, input: R, output: W) -> Result<JoinHandle<()>>
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        thread::Builder::new()
            .name("gridmas-console".into())
            .spawn(move || {
                if let Err(err) = self.serve(input, output) {
                    warn!("console stopped: {err:#}");
                }
            })
            .map_err(|err| anyhow!("failed to spawn console thread: {err}"))
    }

    pub fn serve<R: BufRead, W: Write>(&self, input: R, mut output: W) -> Result<()> {
        info!("console ready; reading JSON commands from stdin");
        for line in input.lines() {
            let line = line.context("failed to read console input")?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let Some(response) = self.handle_line(trimmed) else {
                info!("pipeline has shut down; closing console");
                return Ok(());
            };
            write_response(&mut output, &response)?;
        }
        debug!("console input closed");
        Ok(())
    }

    /// `None` once the driver is gone.
    fn handle_line(&self, line: &str) -> Option<Response> {
        let request: Request = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(err) => return Some(Response::error(format!("invalid request: {err}"))),
        };
        debug!(?request, "console request");

        let command = match request {
            Request::Status => {
                let state = self.status.get();
                return Some(Response::ok(ResponseBody::Status {
                    state: state.label(),
                    pattern: state.pattern().map(str::to_string),
                }));
            }
            Request::List => {
                return Some(Response::ok(ResponseBody::Patterns {
                    patterns: self.catalog.clone(),
                }));
            }
            Request::Start { name } => Command::StartPattern(name),
            Request::Stop => Command::StopPattern,
            Request::Draw { frame } => Command::DrawFrame(frame),
        };

        let reply = self.commands.request(command).ok()?;
        match reply.recv() {
            Ok(Ok(ack)) => Some(Response::ok(ack.into())),
            Ok(Err(err)) => Some(Response::error(err.to_string())),
            Err(_) => None,
        }
    }
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> Result<()> {
    let mut line = serde_json::to_vec(response).context("failed to encode response")?;
    line.push(b'\n');
    output
        .write_all(&line)
        .context("failed to write console response")?;
    output.flush().context("failed to flush console response")
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderer::{command_channel, FrameQueue, PatternRunner, PipelineDriver};
    use serde_json::{json, Value};
    use std::io::Cursor;
    use std::time::Duration;
    use tree::{Rgb, Topology};

    fn driver() -> (PipelineDriver, CommandSender, FrameQueue) {
        let canvas = Topology::from_coords(vec![[0.0, 0.0, 0.0], [0.0, 0.0, 1.0]]).unwrap();
        let runner = PatternRunner::new(canvas, PatternLibrary::builtin())
            .with_frame_interval(Duration::from_millis(2));
        let (commands, command_rx) = command_channel();
        let queue = FrameQueue::new(64);
        (
            PipelineDriver::new(runner, command_rx, queue.clone()),
            commands,
            queue,
        )
    }

    fn responses(output: Vec<u8>) -> Vec<Value> {
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn parses_every_request_shape() {
        let parse = |line: &str| serde_json::from_str::<Request>(line).unwrap();
        assert_eq!(
            parse(r#"{"type":"start","name":"spin"}"#),
            Request::Start { name: "spin".into() }
        );
        assert_eq!(parse(r#"{"type":"stop"}"#), Request::Stop);
        assert_eq!(
            parse(r##"{"type":"draw","frame":["#ff0000",null]}"##),
            Request::Draw {
                frame: RawFrame::new(vec![Some(Rgb::RED), None])
            }
        );
        assert!(serde_json::from_str::<Request>(r#"{"type":"explode"}"#).is_err());
    }

    #[test]
    fn status_and_list_are_answered_locally() {
        let (driver, commands, _queue) = driver();
        let library = driver.runner().library().clone();
        let console = Console::new(
            commands,
            driver.runner().status(),
            PatternInfo::catalog(&library),
        );

        let mut output = Vec::new();
        let input = Cursor::new("{\"type\":\"status\"}\n\n{\"type\":\"list\"}\nnot json\n");
        console.serve(input, &mut output).unwrap();

        let replies = responses(output);
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0], json!({"ok": true, "state": "idle"}));
        let names: Vec<_> = replies[1]["patterns"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["rainbow", "solid", "spin", "twinkle"]);
        assert_eq!(replies[2]["ok"], json!(false));
        assert!(replies[2]["error"]
            .as_str()
            .unwrap()
            .starts_with("invalid request"));
    }

    #[test]
    fn commands_round_trip_through_the_driver() {
        let (mut driver, commands, queue) = driver();
        let console = Console::new(commands, driver.runner().status(), Vec::new());

        let drain = queue.clone();
        let ticker = std::thread::spawn(move || {
            while driver.tick().is_ok() {
                let _ = drain.try_pop();
                std::thread::sleep(Duration::from_millis(1));
            }
        });

        let mut output = Vec::new();
        let input = Cursor::new(concat!(
            "{\"type\":\"start\",\"name\":\"rainbow\"}\n",
            "{\"type\":\"start\",\"name\":\"nope\"}\n",
            "{\"type\":\"draw\",\"frame\":[null,\"#0000ff\"]}\n",
            "{\"type\":\"stop\"}\n",
        ));
        console.serve(input, &mut output).unwrap();
        queue.close();
        ticker.join().unwrap();

        let replies = responses(output);
        assert_eq!(replies[0], json!({"ok": true, "started": "rainbow"}));
        assert_eq!(replies[1]["ok"], json!(false));
        assert!(replies[1]["error"].as_str().unwrap().contains("nope"));
        assert_eq!(replies[2], json!({"ok": true, "applied": 1}));
        assert_eq!(replies[3], json!({"ok": true, "stopped": true}));
    }

    #[test]
    fn console_ends_when_the_driver_is_gone() {
        let (driver, commands, _queue) = driver();
        let console = Console::new(commands, driver.runner().status(), Vec::new());
        drop(driver);

        let mut output = Vec::new();
        let input = Cursor::new("{\"type\":\"stop\"}\n{\"type\":\"status\"}\n");
        console.serve(input, &mut output).unwrap();
        assert!(output.is_empty());
    }
}
