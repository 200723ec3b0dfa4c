//! Typing-effect rendering.
//!
//! An answer is revealed to a [`DisplaySink`] as a sequence of frames. Each
//! frame supersedes the previous one in the sink's most recent block, so a
//! sink that drops intermediate frames still ends in the same state.

use std::str::SplitWhitespace;
use std::time::Duration;

use async_trait::async_trait;
use dstutor_api::ChunkStream;
use dstutor_types::{Speaker, TutorError, CURSOR_GLYPH};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

/// Surface that shows conversation blocks.
///
/// Implemented by the terminal and the web socket; tests use [`MemorySink`].
#[async_trait]
pub trait DisplaySink: Send {
    /// Start a new block authored by `speaker`
    async fn append_block(&mut self, speaker: Speaker, content: &str);

    /// Replace the content of the most recent block with an in-progress frame
    async fn replace_last(&mut self, content: &str);

    /// Replace the content of the most recent block with its final text
    async fn finish_block(&mut self, content: &str) {
        self.replace_last(content).await;
    }
}

/// One display state of an answer being revealed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Tokens so far, each followed by a space, then the cursor glyph
    Partial(String),
    /// The complete answer exactly as generated
    Final(String),
}

impl Frame {
    pub fn content(&self) -> &str {
        match self {
            Frame::Partial(s) | Frame::Final(s) => s,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Frame::Final(_))
    }
}

/// Iterator over the frames of a fixed text
pub struct FrameStream<'a> {
    text: &'a str,
    tokens: SplitWhitespace<'a>,
    revealed: String,
    finished: bool,
}

impl<'a> FrameStream<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            tokens: text.split_whitespace(),
            revealed: String::with_capacity(text.len() + CURSOR_GLYPH.len()),
            finished: false,
        }
    }
}

impl Iterator for FrameStream<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.finished {
            return None;
        }
        match self.tokens.next() {
            Some(token) => {
                self.revealed.push_str(token);
                self.revealed.push(' ');
                Some(Frame::Partial(format!("{}{}", self.revealed, CURSOR_GLYPH)))
            }
            None => {
                self.finished = true;
                Some(Frame::Final(self.text.to_string()))
            }
        }
    }
}

/// Reveal `text` word by word, sleeping `delay` after each partial frame
pub async fn render_stream(text: &str, sink: &mut dyn DisplaySink, delay: Duration) {
    for frame in FrameStream::new(text) {
        if frame.is_final() {
            sink.finish_block(frame.content()).await;
        } else {
            sink.replace_last(frame.content()).await;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Like [`render_stream`], but jumps to the final frame once `cancel` fires.
///
/// Returns `true` when every partial frame was shown.
pub async fn render_stream_cancellable(
    text: &str,
    sink: &mut dyn DisplaySink,
    delay: Duration,
    cancel: &CancellationToken,
) -> bool {
    for frame in FrameStream::new(text) {
        if frame.is_final() {
            sink.finish_block(frame.content()).await;
            return true;
        }
        if cancel.is_cancelled() {
            break;
        }
        sink.replace_last(frame.content()).await;
        if !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => break,
            }
        }
    }

    sink.finish_block(text).await;
    false
}

/// Render live model deltas with the cursor convention and return the full text
pub async fn render_chunks(
    mut chunks: ChunkStream,
    sink: &mut dyn DisplaySink,
) -> Result<String, TutorError> {
    let mut answer = String::new();

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|e| TutorError::GenerationFailure(format!("{:#}", e)))?;
        if chunk.delta.is_empty() {
            continue;
        }
        answer.push_str(&chunk.delta);
        sink.replace_last(&format!("{}{}", answer, CURSOR_GLYPH)).await;
    }

    sink.finish_block(&answer).await;
    Ok(answer)
}

/// Sink that keeps everything it is shown
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    /// Current content of each block
    pub blocks: Vec<(Speaker, String)>,
    /// Every frame written, in order
    pub frames: Vec<String>,
    /// Frames written through `finish_block`
    pub finished: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_block(&self) -> Option<&str> {
        self.blocks.last().map(|(_, content)| content.as_str())
    }
}

#[async_trait]
impl DisplaySink for MemorySink {
    async fn append_block(&mut self, speaker: Speaker, content: &str) {
        self.blocks.push((speaker, content.to_string()));
    }

    async fn replace_last(&mut self, content: &str) {
        self.frames.push(content.to_string());
        match self.blocks.last_mut() {
            Some((_, last)) => *last = content.to_string(),
            None => self.blocks.push((Speaker::Assistant, content.to_string())),
        }
    }

    async fn finish_block(&mut self, content: &str) {
        self.replace_last(content).await;
        self.finished.push(content.to_string());
    }
}
