//! Formula Forge - step-by-step math and science solutions
//!
//! A problem arrives as typed text, an image file, or a freehand sketch, is
//! forwarded to a Gemini model with a fixed formatting instruction, and the
//! returned solution is rendered for the terminal.

pub mod ai;
pub mod error;
pub mod input;
pub mod models;
pub mod prompts;
pub mod render;
pub mod repl;
pub mod session;

pub use error::{Error, Result};
