mod engine;
mod input;

pub use engine::PromptEngine;
pub use input::CallerInput;
