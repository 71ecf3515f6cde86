//! Interactive terminal surface.
//!
//! Lines starting with `:` are commands; anything else is appended to the
//! problem text. A solve runs as a spawned task while input keeps being
//! read, so the user can switch modes mid-flight.

use crate::ai::SolverService;
use crate::input::{Point, Sketch};
use crate::models::InputMode;
use crate::render::{render_header, render_result, render_tabs, submit_label};
use crate::session::{Session, SolveTicket};
use crate::{Error, Result};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const HELP: &str = "\
Commands:
  :mode text|image|draw   switch input mode (clears all input)
  :text <problem>         replace the problem text
  :image <path>           attach an image file (image mode)
  :stroke x,y x,y ...     draw a stroke (draw mode)
  :sketch <path>          load strokes from a JSON sketch file (draw mode)
  :clear                  clear the drawing
  :solve                  send the problem
  :show                   show current mode and result
  :help                   this text
  :quit                   exit
Any other line is appended to the problem text.";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Mode(InputMode),
    SetText(String),
    AppendText(String),
    Image(PathBuf),
    Stroke(Vec<Point>),
    Sketch(PathBuf),
    Clear,
    Solve,
    Show,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let Some(rest) = line.trim_end().strip_prefix(':') else {
        return Ok(Command::AppendText(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let require_arg = |what: &str| {
        if arg.is_empty() {
            Err(format!(":{} needs {}", name, what))
        } else {
            Ok(arg)
        }
    };

    match name {
        "mode" => Ok(Command::Mode(require_arg("a mode")?.parse()?)),
        "text" => Ok(Command::SetText(arg.to_string())),
        "image" => Ok(Command::Image(PathBuf::from(require_arg("a path")?))),
        "stroke" => Ok(Command::Stroke(parse_points(require_arg("points")?)?)),
        "sketch" => Ok(Command::Sketch(PathBuf::from(require_arg("a path")?))),
        "clear" => Ok(Command::Clear),
        "solve" => Ok(Command::Solve),
        "show" => Ok(Command::Show),
        "help" | "h" | "?" => Ok(Command::Help),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        other => Err(format!("Unknown command ':{}'. Try :help", other)),
    }
}

fn parse_points(arg: &str) -> std::result::Result<Vec<Point>, String> {
    arg.split_whitespace()
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| format!("Expected x,y but got '{}'", pair))?;
            let x: f32 = x.parse().map_err(|_| format!("Bad x coordinate '{}'", x))?;
            let y: f32 = y.parse().map_err(|_| format!("Bad y coordinate '{}'", y))?;
            let point = Point::new(x, y);
            if !point.is_finite() {
                return Err(format!("Coordinates must be finite, got '{}'", pair));
            }
            Ok(point)
        })
        .collect()
}

/// What the loop should do after a command was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Print(String),
    Submit,
    Quit,
    Nothing,
}

struct InFlight {
    ticket: SolveTicket,
    handle: JoinHandle<Result<String>>,
}

pub struct Repl {
    session: Session,
    service: Arc<dyn SolverService>,
}

impl Repl {
    pub fn new(service: Arc<dyn SolverService>) -> Self {
        Self {
            session: Session::new(),
            service,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Apply a command to the session. Never touches the network.
    pub fn apply(&mut self, command: Command) -> Outcome {
        match command {
            Command::Mode(mode) => {
                self.session.set_mode(mode);
                Outcome::Print(render_tabs(mode))
            }
            Command::SetText(text) => {
                self.session.set_text(text);
                Outcome::Nothing
            }
            Command::AppendText(line) => {
                let text = if self.session.text().is_empty() {
                    line
                } else {
                    format!("{}\n{}", self.session.text(), line)
                };
                self.session.set_text(text);
                Outcome::Nothing
            }
            Command::Image(path) => {
                if self.session.mode() != InputMode::Image {
                    return Outcome::Print("Switch to image mode first (:mode image)".to_string());
                }
                match self.session.attach_image_path(&path) {
                    Ok(()) => Outcome::Print(format!("Attached {}", path.display())),
                    Err(e) => Outcome::Print(format!("Could not read the image: {}", e)),
                }
            }
            Command::Stroke(points) => {
                if self.session.mode() != InputMode::Draw {
                    return Outcome::Print("Switch to draw mode first (:mode draw)".to_string());
                }
                self.session.canvas_mut().add_stroke(points);
                Outcome::Print(format!(
                    "Canvas has {} stroke(s)",
                    self.session.canvas().stroke_count()
                ))
            }
            Command::Sketch(path) => {
                if self.session.mode() != InputMode::Draw {
                    return Outcome::Print("Switch to draw mode first (:mode draw)".to_string());
                }
                match Sketch::load(&path) {
                    Ok(sketch) => {
                        sketch.apply_to(self.session.canvas_mut());
                        Outcome::Print(format!(
                            "Canvas has {} stroke(s)",
                            self.session.canvas().stroke_count()
                        ))
                    }
                    Err(e) => Outcome::Print(format!("Could not load sketch: {}", e)),
                }
            }
            Command::Clear => {
                self.session.canvas_mut().clear();
                Outcome::Print("Canvas cleared".to_string())
            }
            Command::Solve => Outcome::Submit,
            Command::Show => Outcome::Print(self.status()),
            Command::Help => Outcome::Print(HELP.to_string()),
            Command::Quit => Outcome::Quit,
        }
    }

    fn status(&self) -> String {
        let view = self.session.view();
        let mut status = format!(
            "{}\n<{}>",
            render_tabs(self.session.mode()),
            submit_label(view.busy)
        );
        let result = render_result(&view);
        if !result.is_empty() {
            status.push_str("\n\n");
            status.push_str(&result);
        }
        status
    }

    fn submit(&mut self) -> std::result::Result<InFlight, String> {
        if self.session.is_busy() {
            return Err(format!("{} (already working on a problem)", submit_label(true)));
        }

        match self.session.begin_solve() {
            Some(ticket) => {
                let service = Arc::clone(&self.service);
                let payload = ticket.payload.clone();
                let handle = tokio::spawn(async move {
                    service.solve(&payload.text, payload.image.as_ref()).await
                });
                Ok(InFlight { ticket, handle })
            }
            None => Err(render_result(&self.session.view())),
        }
    }

    fn settle(&mut self, flight: InFlight, outcome: Result<String>) -> Option<String> {
        if self.session.finish_solve(flight.ticket, outcome) {
            Some(render_result(&self.session.view()))
        } else {
            debug!("Dropped a response for an abandoned problem");
            None
        }
    }

    /// Read commands from `input` until EOF or `:quit`, writing to `out`.
    ///
    /// An outstanding request is waited for before returning.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        writeln!(out, "{}\n{}", render_header(), render_tabs(self.session.mode()))?;
        writeln!(out, "Type :help for commands.")?;

        let mut lines = input.lines();
        let mut in_flight: Option<InFlight> = None;

        loop {
            tokio::select! {
                outcome = wait_for(&mut in_flight) => {
                    if let Some(flight) = in_flight.take() {
                        if let Some(rendered) = self.settle(flight, outcome) {
                            writeln!(out, "{}", rendered)?;
                        }
                    }
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }

                    let command = match parse_command(&line) {
                        Ok(command) => command,
                        Err(message) => {
                            writeln!(out, "{}", message)?;
                            continue;
                        }
                    };

                    match self.apply(command) {
                        Outcome::Print(text) => writeln!(out, "{}", text)?,
                        Outcome::Submit => match self.submit() {
                            Ok(flight) => {
                                writeln!(out, "{}", render_result(&self.session.view()))?;
                                in_flight = Some(flight);
                            }
                            Err(message) => writeln!(out, "{}", message)?,
                        },
                        Outcome::Quit => break,
                        Outcome::Nothing => {}
                    }
                }
            }
        }

        if in_flight.is_some() {
            info!("Waiting for the outstanding solve before exiting");
            let outcome = wait_for(&mut in_flight).await;
            if let Some(flight) = in_flight.take() {
                if let Some(rendered) = self.settle(flight, outcome) {
                    writeln!(out, "{}", rendered)?;
                }
            }
        }

        Ok(())
    }
}

/// Resolves with the outstanding request's outcome; pends forever when there
/// is none.
async fn wait_for(in_flight: &mut Option<InFlight>) -> Result<String> {
    match in_flight {
        Some(flight) => match (&mut flight.handle).await {
            Ok(outcome) => outcome,
            Err(e) => Err(Error::Invariant(format!("Solve task failed: {}", e))),
        },
        None => std::future::pending().await,
    }
}
