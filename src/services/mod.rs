pub mod drafting;
pub mod gemini;
pub mod music_api;
pub mod pipeline;
pub mod polling;
pub mod queue;
pub mod retrieval;
pub mod submission;
