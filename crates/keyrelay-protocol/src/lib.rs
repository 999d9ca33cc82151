pub mod gemini;
pub mod identify;
