//! Typewriter Text Animation
//!
//! Drives the slogan line on the login screen.
//! Features:
//! - Sentences typed and erased one character at a time
//! - Independent blinking cursor
//! - Cooperative shutdown through a single running flag
//!
//! The typing and cursor tasks never touch display state. They send events
//! to a compositor task, which owns the state and is the only caller of the
//! render target.

mod render;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub use render::*;

/// Slogans shown under the login title
pub fn default_script() -> Vec<String> {
    [
        "微信自动化一体化解决方案",
        "专业级微信管理工具",
        "智能化消息处理平台",
        "企业级自动化服务",
        "高效便捷的微信助手",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Animation timing configuration
#[derive(Debug, Clone)]
pub struct TypewriterTimings {
    /// Delay between revealed characters
    pub type_interval: Duration,
    /// Pause with the full sentence shown
    pub hold: Duration,
    /// Delay between erased characters
    pub delete_interval: Duration,
    /// Pause before the next sentence starts
    pub between: Duration,
    /// Cursor toggle period
    pub cursor_interval: Duration,
    /// Longest uninterrupted sleep; bounds how late a stop is noticed
    pub poll: Duration,
}

impl Default for TypewriterTimings {
    fn default() -> Self {
        Self {
            type_interval: Duration::from_millis(100),
            hold: Duration::from_secs(2),
            delete_interval: Duration::from_millis(50),
            between: Duration::from_millis(500),
            cursor_interval: Duration::from_millis(500),
            poll: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Error)]
pub enum TypewriterError {
    #[error("typewriter script has no sentences")]
    EmptyScript,

    #[error("typewriter must be started inside a tokio runtime")]
    NoRuntime,
}

#[derive(Debug)]
enum AnimationEvent {
    Prefix(String),
    Advance(usize),
    Cursor(bool),
}

/// Handle to a running animation; dropping it stops the tasks
pub struct AnimatedTextController {
    running: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl AnimatedTextController {
    /// Spawn the typing, cursor, and compositor tasks on the current runtime.
    pub fn start<T: RenderTarget>(
        script: Vec<String>,
        style: TextStyle,
        timings: TypewriterTimings,
        target: T,
    ) -> Result<Self, TypewriterError> {
        if script.is_empty() {
            return Err(TypewriterError::EmptyScript);
        }
        let handle = tokio::runtime::Handle::try_current().map_err(|_| TypewriterError::NoRuntime)?;

        let running = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::unbounded_channel();
        let sentences: Arc<[Vec<char>]> = script.iter().map(|s| s.chars().collect()).collect();

        tracing::debug!("Starting typewriter with {} sentences", sentences.len());

        let tasks = vec![
            handle.spawn(typing_task(sentences, timings.clone(), running.clone(), tx.clone())),
            handle.spawn(cursor_task(timings, running.clone(), tx)),
            handle.spawn(compositor_task(rx, style, running.clone(), target)),
        ];

        Ok(Self { running, tasks })
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signal all tasks to stop. They exit at their next check.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Stop and wait until every task has exited.
    pub async fn shutdown(mut self) {
        self.stop();
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                tracing::warn!("Typewriter task ended abnormally: {}", e);
            }
        }
        tracing::debug!("Typewriter stopped");
    }
}

impl Drop for AnimatedTextController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleep for `duration` in slices of at most `poll`.
/// Returns false as soon as the running flag is cleared.
async fn pause(running: &AtomicBool, duration: Duration, poll: Duration) -> bool {
    let poll = poll.max(Duration::from_millis(1));
    let deadline = Instant::now() + duration;
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        tokio::time::sleep((deadline - now).min(poll)).await;
    }
}

async fn typing_task(
    sentences: Arc<[Vec<char>]>,
    timings: TypewriterTimings,
    running: Arc<AtomicBool>,
    tx: UnboundedSender<AnimationEvent>,
) {
    let mut index = 0;
    loop {
        let sentence = &sentences[index];

        for len in 1..=sentence.len() {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            if tx.send(AnimationEvent::Prefix(sentence[..len].iter().collect())).is_err() {
                return;
            }
            if !pause(&running, timings.type_interval, timings.poll).await {
                return;
            }
        }

        if !pause(&running, timings.hold, timings.poll).await {
            return;
        }

        for len in (0..sentence.len()).rev() {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            if tx.send(AnimationEvent::Prefix(sentence[..len].iter().collect())).is_err() {
                return;
            }
            if !pause(&running, timings.delete_interval, timings.poll).await {
                return;
            }
        }

        index = (index + 1) % sentences.len();
        if tx.send(AnimationEvent::Advance(index)).is_err() {
            return;
        }

        if !pause(&running, timings.between, timings.poll).await {
            return;
        }
    }
}

async fn cursor_task(timings: TypewriterTimings, running: Arc<AtomicBool>, tx: UnboundedSender<AnimationEvent>) {
    let mut cursor_on = true;
    while pause(&running, timings.cursor_interval, timings.poll).await {
        cursor_on = !cursor_on;
        if tx.send(AnimationEvent::Cursor(cursor_on)).is_err() {
            return;
        }
    }
}

async fn compositor_task<T: RenderTarget>(
    mut rx: UnboundedReceiver<AnimationEvent>,
    style: TextStyle,
    running: Arc<AtomicBool>,
    mut target: T,
) {
    let mut snapshot = AnimationSnapshot::default();
    let mut render = |snapshot: &AnimationSnapshot| -> bool {
        let frame = Frame {
            snapshot: snapshot.clone(),
            style: style.clone(),
        };
        match target.render(&frame) {
            Ok(()) => true,
            Err(RenderError::Closed) => {
                tracing::debug!("Typewriter render target closed");
                false
            }
            Err(e) => {
                tracing::warn!("Typewriter render error: {}", e);
                true
            }
        }
    };

    if !render(&snapshot) {
        return;
    }

    while let Some(event) = rx.recv().await {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        match event {
            AnimationEvent::Prefix(prefix) => snapshot.displayed_prefix = prefix,
            AnimationEvent::Advance(index) => {
                snapshot.sentence_index = index;
                snapshot.displayed_prefix.clear();
            }
            AnimationEvent::Cursor(on) => snapshot.cursor_on = on,
        }

        if !render(&snapshot) {
            break;
        }
    }
}
