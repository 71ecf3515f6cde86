//! Input-mode state machine and solve orchestration.
//!
//! A [`Session`] owns everything one user interaction touches: the active
//! mode, the three producers, and the single result slot. A solve is split
//! into [`Session::begin_solve`] and [`Session::finish_solve`] so the request
//! can run while the surface keeps handling input; [`Session::solve`] chains
//! both around one service call.
//!
//! Every mode switch bumps a generation counter. A response that settles
//! after the generation moved on is dropped instead of overwriting whatever
//! the user is looking at now.

use crate::ai::SolverService;
use crate::input::{CanvasSource, DrawCanvas, ImageInput, TextInput};
use crate::models::{ImageData, InputMode, ProblemPayload};
use crate::{Error, Result};
use std::path::Path;
use thiserror::Error as ThisError;
use tracing::{debug, info, warn};

const UNKNOWN_FAILURE: &str = "An unknown error occurred while trying to solve the problem.";

/// Nothing usable was supplied for the active mode.
#[derive(ThisError, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingInput {
    #[error("Please type a problem to solve.")]
    Text,
    #[error("Please upload an image first.")]
    Image,
    #[error("Please draw something on the canvas.")]
    Drawing,
}

/// The single result slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SolveState {
    #[default]
    Idle,
    Pending,
    Solved(String),
    Failed(String),
}

/// Snapshot consumed by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultView {
    pub busy: bool,
    pub error: Option<String>,
    pub solution: Option<String>,
}

/// Proof that a request was started: the payload to send and the generation
/// it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveTicket {
    generation: u64,
    pub payload: ProblemPayload,
}

impl SolveTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default)]
pub struct Session {
    mode: InputMode,
    text: TextInput,
    image: Option<ImageData>,
    canvas: DrawCanvas,
    state: SolveState,
    /// A request is outstanding. Tracked apart from `state` because a mode
    /// switch may replace the visible state while the request still runs.
    in_flight: bool,
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Switch the active producer.
    ///
    /// Always clears the text buffer, the attached image, the drawing and any
    /// displayed error, even when `mode` is already active.
    pub fn set_mode(&mut self, mode: InputMode) {
        debug!("Switching input mode {} -> {}", self.mode, mode);
        self.mode = mode;
        self.text.clear();
        self.image = None;
        self.canvas = DrawCanvas::default();
        self.generation += 1;

        match self.state {
            SolveState::Failed(_) => self.state = SolveState::Idle,
            // The outstanding request now belongs to a dead generation.
            SolveState::Pending => self.state = SolveState::Idle,
            _ => {}
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text.set(text);
    }

    pub fn image(&self) -> Option<&ImageData> {
        self.image.as_ref()
    }

    /// Publish an already-encoded image (the upload callback).
    pub fn set_image(&mut self, image: Option<ImageData>) {
        self.image = image;
    }

    /// Load an image file into the session. On failure no image stays
    /// attached and the reason is shown in the error slot.
    pub fn attach_image_path(&mut self, path: &Path) -> Result<()> {
        let loaded = ImageInput::load_path(path);
        self.apply_image(loaded)
    }

    pub fn attach_image_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let loaded = ImageInput::load_bytes(bytes);
        self.apply_image(loaded)
    }

    fn apply_image(&mut self, loaded: Result<ImageData>) -> Result<()> {
        match loaded {
            Ok(image) => {
                self.image = Some(image);
                if matches!(self.state, SolveState::Failed(_)) {
                    self.state = SolveState::Idle;
                }
                Ok(())
            }
            Err(e) => {
                warn!("Rejected image upload: {}", e);
                self.image = None;
                if !self.is_busy() {
                    self.state = SolveState::Failed(format!("Could not read the image: {}", e));
                }
                Err(e)
            }
        }
    }

    pub fn canvas(&self) -> &DrawCanvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut DrawCanvas {
        &mut self.canvas
    }

    pub fn state(&self) -> &SolveState {
        &self.state
    }

    /// True while a request is outstanding; the submit control is disabled.
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    pub fn view(&self) -> ResultView {
        let (error, solution) = match &self.state {
            SolveState::Idle | SolveState::Pending => (None, None),
            SolveState::Solved(text) => (None, Some(text.clone())),
            SolveState::Failed(message) => (Some(message.clone()), None),
        };
        ResultView {
            busy: self.in_flight,
            error,
            solution,
        }
    }

    /// Start a solve.
    ///
    /// Returns `None` without touching any state while a request is
    /// outstanding. Otherwise the previous result is wiped; if the active
    /// producer has nothing usable the mode-specific message is shown and
    /// `None` is returned, else the caller gets a ticket to send.
    pub fn begin_solve(&mut self) -> Option<SolveTicket> {
        if self.in_flight {
            debug!("Ignoring solve while a request is outstanding");
            return None;
        }

        self.state = SolveState::Pending;
        self.in_flight = true;

        match self.collect_payload() {
            Ok(payload) => {
                info!(
                    "Starting solve (mode: {}, text: {} chars, image: {})",
                    self.mode,
                    payload.text.len(),
                    payload.image.is_some()
                );
                Some(SolveTicket {
                    generation: self.generation,
                    payload,
                })
            }
            Err(message) => {
                debug!("Solve rejected before sending: {}", message);
                self.state = SolveState::Failed(message);
                self.in_flight = false;
                None
            }
        }
    }

    fn collect_payload(&self) -> std::result::Result<ProblemPayload, String> {
        let text = self.text.as_str().to_string();
        let image = match self.mode {
            InputMode::Image => match &self.image {
                Some(image) => Some(image.clone()),
                None => return Err(MissingInput::Image.to_string()),
            },
            InputMode::Draw => match self.canvas.canvas_data() {
                Ok(Some(image)) => Some(image),
                Ok(None) => return Err(MissingInput::Drawing.to_string()),
                Err(e) => return Err(failure_message(&e)),
            },
            InputMode::Text => {
                if self.text.is_blank() {
                    return Err(MissingInput::Text.to_string());
                }
                None
            }
        };
        Ok(ProblemPayload { text, image })
    }

    /// Settle a request started by [`Session::begin_solve`].
    ///
    /// Always releases the busy flag. Returns `false` when the outcome was
    /// dropped because the mode changed after the ticket was issued.
    pub fn finish_solve(&mut self, ticket: SolveTicket, outcome: Result<String>) -> bool {
        self.in_flight = false;

        if ticket.generation != self.generation {
            info!(
                "Discarding stale solve result (generation {} != {})",
                ticket.generation, self.generation
            );
            return false;
        }

        self.state = match outcome {
            Ok(solution) => {
                info!("Solve succeeded");
                SolveState::Solved(solution)
            }
            Err(e) => {
                warn!("Solve failed: {}", e);
                SolveState::Failed(failure_message(&e))
            }
        };
        true
    }

    /// Run one full solve against `service`.
    pub async fn solve(&mut self, service: &dyn SolverService) {
        let Some(ticket) = self.begin_solve() else {
            return;
        };
        let outcome = service
            .solve(&ticket.payload.text, ticket.payload.image.as_ref())
            .await;
        self.finish_solve(ticket, outcome);
    }
}

fn failure_message(error: &Error) -> String {
    let detail = error.to_string();
    if detail.trim().is_empty() {
        UNKNOWN_FAILURE.to_string()
    } else {
        format!(
            "An error occurred while trying to solve the problem: {}",
            detail
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockSolverClient;
    use crate::input::Point;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_text_solve_success() {
        let service = MockSolverClient::new().with_solution("Step 1: ... Answer: 4".to_string());
        let mut session = Session::new();
        session.set_text("What is 2+2?");

        session.solve(&service).await;

        assert_eq!(
            session.view(),
            ResultView {
                busy: false,
                error: None,
                solution: Some("Step 1: ... Answer: 4".to_string()),
            }
        );
        assert_eq!(service.requests()[0].text, "What is 2+2?");
        assert!(service.requests()[0].image.is_none());
    }

    #[tokio::test]
    async fn test_missing_input_per_mode_makes_no_call() {
        let cases = [
            (InputMode::Text, "Please type a problem to solve."),
            (InputMode::Image, "Please upload an image first."),
            (InputMode::Draw, "Please draw something on the canvas."),
        ];

        for (mode, expected) in cases {
            let service = MockSolverClient::new();
            let mut session = Session::new();
            session.set_mode(mode);

            session.solve(&service).await;

            assert_eq!(session.state(), &SolveState::Failed(expected.to_string()));
            assert!(!session.is_busy());
            assert_eq!(service.get_call_count(), 0, "mode {}", mode);
        }
    }

    #[tokio::test]
    async fn test_whitespace_text_is_missing() {
        let service = MockSolverClient::new();
        let mut session = Session::new();
        session.set_text("   ");

        session.solve(&service).await;

        assert_eq!(
            session.view().error.as_deref(),
            Some("Please type a problem to solve.")
        );
        assert_eq!(service.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_service_failure_is_prefixed() {
        let service = MockSolverClient::new().with_failure("network timeout".to_string());
        let mut session = Session::new();
        session.set_text("1+1");

        session.solve(&service).await;

        let view = session.view();
        assert!(!view.busy);
        assert!(view.solution.is_none());
        assert_eq!(
            view.error.as_deref(),
            Some("An error occurred while trying to solve the problem: network timeout")
        );
    }

    #[tokio::test]
    async fn test_empty_service_message_uses_fallback() {
        let service = MockSolverClient::new().with_failure(String::new());
        let mut session = Session::new();
        session.set_text("1+1");

        session.solve(&service).await;

        assert_eq!(session.view().error.as_deref(), Some(UNKNOWN_FAILURE));
    }

    #[tokio::test]
    async fn test_failure_clears_prior_solution() {
        let service = MockSolverClient::new()
            .with_solution("x = 2".to_string())
            .with_failure("quota exceeded".to_string());
        let mut session = Session::new();
        session.set_text("2x = 4");

        session.solve(&service).await;
        assert_eq!(session.view().solution.as_deref(), Some("x = 2"));

        session.solve(&service).await;
        let view = session.view();
        assert!(view.solution.is_none());
        assert!(view.error.unwrap().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_success_clears_prior_error() {
        let service = MockSolverClient::new()
            .with_failure("boom".to_string())
            .with_solution("fine".to_string());
        let mut session = Session::new();
        session.set_text("q");

        session.solve(&service).await;
        session.solve(&service).await;

        let view = session.view();
        assert!(view.error.is_none());
        assert_eq!(view.solution.as_deref(), Some("fine"));
    }

    #[test]
    fn test_begin_solve_sets_pending_and_busy() {
        let mut session = Session::new();
        session.set_text("q");

        let ticket = session.begin_solve().unwrap();
        assert_eq!(session.state(), &SolveState::Pending);
        assert!(session.is_busy());
        assert!(session.view().busy);

        // Resubmission is suppressed while busy.
        assert!(session.begin_solve().is_none());
        assert_eq!(session.state(), &SolveState::Pending);

        assert!(session.finish_solve(ticket, Ok("a".to_string())));
        assert!(!session.is_busy());
    }

    #[test]
    fn test_begin_solve_wipes_previous_solution() {
        let mut session = Session::new();
        session.set_text("q");
        let ticket = session.begin_solve().unwrap();
        session.finish_solve(ticket, Ok("old".to_string()));

        let _ticket = session.begin_solve().unwrap();
        assert!(session.view().solution.is_none());
    }

    #[test]
    fn test_set_mode_clears_inputs_and_error() {
        for from in InputMode::ALL {
            for to in InputMode::ALL {
                let mut session = Session::new();
                session.set_mode(from);
                session.set_text("leftover");
                session.set_image(Some(ImageData::from_bytes("image/png", &[1])));
                session
                    .canvas_mut()
                    .add_stroke(vec![Point::new(1.0, 1.0), Point::new(2.0, 2.0)]);
                session.state = SolveState::Failed("old error".to_string());

                session.set_mode(to);

                assert_eq!(session.mode(), to);
                assert_eq!(session.text(), "");
                assert!(session.image().is_none());
                assert!(session.canvas().is_blank());
                assert!(session.view().error.is_none());
            }
        }
    }

    #[test]
    fn test_set_mode_keeps_solution() {
        let mut session = Session::new();
        session.set_text("q");
        let ticket = session.begin_solve().unwrap();
        session.finish_solve(ticket, Ok("kept".to_string()));

        session.set_mode(InputMode::Draw);
        assert_eq!(session.view().solution.as_deref(), Some("kept"));
    }

    #[test]
    fn test_stale_response_after_mode_switch_is_dropped() {
        let mut session = Session::new();
        session.set_text("q");
        let ticket = session.begin_solve().unwrap();

        session.set_mode(InputMode::Image);
        // Still one outstanding request.
        assert!(session.is_busy());
        assert!(session.begin_solve().is_none());

        assert!(!session.finish_solve(ticket, Ok("late answer".to_string())));
        assert!(!session.is_busy());
        assert_eq!(session.state(), &SolveState::Idle);
    }

    #[tokio::test]
    async fn test_image_mode_sends_image_and_text() {
        let service = MockSolverClient::new();
        let mut session = Session::new();
        session.set_mode(InputMode::Image);
        session.attach_image_bytes(&png_bytes()).unwrap();
        session.set_text("find the area");

        session.solve(&service).await;

        let request = &service.requests()[0];
        assert_eq!(request.text, "find the area");
        assert_eq!(request.image.as_ref().unwrap().mime_type, "image/png");
        assert!(session.view().solution.is_some());
    }

    #[test]
    fn test_bad_upload_surfaces_error() {
        let mut session = Session::new();
        session.set_mode(InputMode::Image);
        session.attach_image_bytes(&png_bytes()).unwrap();

        let err = session.attach_image_bytes(b"not an image").unwrap_err();
        assert!(matches!(err, Error::UnsupportedImage(_)));
        assert!(session.image().is_none());
        assert!(session
            .view()
            .error
            .unwrap()
            .starts_with("Could not read the image:"));
    }

    #[tokio::test]
    async fn test_draw_mode_without_visible_ink_makes_no_call() {
        let service = MockSolverClient::new();
        let mut session = Session::new();
        session.set_mode(InputMode::Draw);
        session
            .canvas_mut()
            .add_stroke(vec![Point::new(5000.0, 5000.0), Point::new(6000.0, 6000.0)]);
        session
            .canvas_mut()
            .add_stroke(vec![Point::new(f32::NAN, 1.0), Point::new(1.0, f32::INFINITY)]);

        session.solve(&service).await;

        assert_eq!(
            session.view().error.as_deref(),
            Some("Please draw something on the canvas.")
        );
        assert_eq!(service.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_draw_mode_pulls_canvas_at_submit() {
        let service = MockSolverClient::new();
        let mut session = Session::new();
        session.set_mode(InputMode::Draw);
        session
            .canvas_mut()
            .add_stroke(vec![Point::new(10.0, 10.0), Point::new(60.0, 40.0)]);

        session.solve(&service).await;

        assert_eq!(service.get_call_count(), 1);
        let request = &service.requests()[0];
        assert_eq!(request.text, "");
        assert_eq!(request.image.as_ref().unwrap().mime_type, "image/png");
    }
}
