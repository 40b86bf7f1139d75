//! Domain models for story-studio.
//!
//! - [`Character`]: one of four reference image slots. Only selected slots with
//!   an uploaded image are sent to the image service.
//! - [`PromptItem`]: one line of the batch. Between 1 and 10 exist at all times.
//! - [`GeneratedImage`]: a result, keyed by the id of the prompt that made it.
//! - [`Outcome`]: transient success/failure of one prompt in a batch.

mod character;
mod image;
mod prompt;

pub use character::*;
pub use image::*;
pub use prompt::*;
