//! Solving service integration
//!
//! The rest of the crate only sees [`SolverService`]: given problem text and an
//! optional inline image, return the generated step-by-step solution or fail.

pub mod gemini;
pub mod mime;
pub mod mock;

pub use gemini::GeminiSolverClient;
pub use mock::MockSolverClient;

use crate::models::ImageData;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait SolverService: Send + Sync {
    async fn solve(&self, text: &str, image: Option<&ImageData>) -> Result<String>;
}
