//! Answer-generation pipeline for the librarian engine.
//!
//! One [`Engine`] per site drives the whole flow for each question:
//! condense the follow-up into a standalone question, retrieve and merge
//! passages, optionally run a tool round, stream the generated answer to
//! a bounded sink, and emit the final [`ResponseEnvelope`] with its
//! citations. Sessions are transient; nothing is persisted here.

pub mod deadline;
pub mod envelope;
pub mod events;
pub mod orchestrator;
pub mod session;
pub mod tools;

// Re-export main types
pub use deadline::with_deadline;
pub use envelope::{cite_sources, RelatedQuestion, ResponseEnvelope, SourceRef};
pub use events::{answer_channel, AnswerEvent, AnswerSink};
pub use orchestrator::Engine;
pub use session::AskOptions;
pub use tools::Tool;

// The cancellation primitive callers hand to [`Engine::answer`].
pub use tokio_util::sync::CancellationToken;

// Chat history is part of the public answer API.
pub use librarian_prompt::ChatTurn;
