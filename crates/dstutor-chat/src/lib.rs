//! Tutor pipeline for dstutor
//!
//! This crate gates questions by topic, generates answers, reveals them with a
//! typing effect, and keeps the turn log. The terminal and the web server both
//! drive it through [`Tutor`].

pub mod classifier;
pub mod code_runner;
pub mod generator;
pub mod history;
pub mod orchestrator;
pub mod renderer;
pub mod session;
pub mod widgets;

#[cfg(test)]
mod test_support;

pub use classifier::{build_classifier_prompt, is_affirmative, RelevanceClassifier};
pub use code_runner::{remove_scratch_dir, ExecutionOutput, PythonRunner};
pub use generator::ResponseGenerator;
pub use history::{export_transcript, record, save_transcript, HistoryStore};
pub use orchestrator::{CodeReport, TurnOutcome, TurnReport, Tutor, TutorConfig};
pub use renderer::{
    render_chunks, render_stream, render_stream_cancellable, DisplaySink, Frame, FrameStream,
    MemorySink,
};
pub use session::SessionState;
pub use widgets::{
    comparison_table, comparison_tables, diagram, diagrams, quick_question, ComparisonTable,
    Diagram, QUICK_QUESTIONS,
};
