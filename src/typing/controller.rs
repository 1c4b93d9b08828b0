//! Run-state machine and the character emission loop.
//!
//! A [`TypingController`] owns one emitter and allows at most one run at a
//! time. The run itself happens on a dedicated worker thread; the control side
//! only flips a shared atomic [`RunState`], which the worker re-reads before
//! every character, while paused, and between slices of every sleep. Reaction
//! latency to stop and pause is therefore bounded by the poll interval.
//!
//! The same atomic word carries a run id, bumped on every start, so a
//! [`RunHandle`] can only ever stop the run it was returned for.
//!
//! ```text
//! Idle --start--> Running <--toggle_pause--> Paused
//! Running | Paused --stop--> Stopping --worker exit--> Idle
//! Running | Paused --last character--> Idle
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::error::TypingError;
use super::pacing;
use super::progress::{ProgressEvent, ProgressSink, RunOutcome};
use crate::input::{KeyEmitter, emit_char};

/// Longest allowed poll interval.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lifecycle of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run; `start` is accepted.
    Idle,
    /// Emitting characters.
    Running,
    /// A run exists but is not advancing.
    Paused,
    /// Stop requested; the worker exits at its next poll.
    Stopping,
}

impl RunState {
    /// Encoding used in the shared atomic.
    const fn to_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
            Self::Paused => 2,
            Self::Stopping => 3,
        }
    }

    /// Inverse of [`RunState::to_u8`].
    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Running,
            2 => Self::Paused,
            3 => Self::Stopping,
            _ => Self::Idle,
        }
    }
}

/// Low bits of the shared word hold the [`RunState`], the rest the run id.
const STATE_BITS: u32 = 8;

/// Mask selecting the [`RunState`] bits.
const STATE_MASK: u64 = 0xFF;

/// Combine a run id and a state into one word.
fn pack(run: u64, state: RunState) -> u64 {
    (run << STATE_BITS) | u64::from(state.to_u8())
}

/// Split a word into run id and state.
fn unpack(word: u64) -> (u64, RunState) {
    let raw = u8::try_from(word & STATE_MASK).unwrap_or_default();
    (word >> STATE_BITS, RunState::from_u8(raw))
}

/// The only state shared between the control side and the worker.
#[derive(Debug)]
struct SharedState(AtomicU64);

impl SharedState {
    /// New state, starting idle with no run yet
    const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Current run id and state
    fn snapshot(&self) -> (u64, RunState) {
        unpack(self.0.load(Ordering::SeqCst))
    }

    /// Current state
    fn load(&self) -> RunState {
        self.snapshot().1
    }

    /// Set the state, keeping the run id
    fn store(&self, state: RunState) {
        // The closure always returns Some, so this cannot fail
        let _ = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |word| {
                Some(pack(unpack(word).0, state))
            });
    }

    /// Idle -> Running under a fresh run id. Returns the id, or the state
    /// that blocked the start.
    fn begin(&self) -> Result<u64, RunState> {
        let word = self.0.load(Ordering::SeqCst);
        let (run, state) = unpack(word);
        if state != RunState::Idle {
            return Err(state);
        }
        let next = run.wrapping_add(1) & (u64::MAX >> STATE_BITS);
        self.0
            .compare_exchange(
                word,
                pack(next, RunState::Running),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map(|_| next)
            .map_err(|actual| unpack(actual).1)
    }

    /// Move run `run` from `from` to `to`; fails if either has changed.
    fn transition(&self, run: u64, from: RunState, to: RunState) -> bool {
        self.0
            .compare_exchange(
                pack(run, from),
                pack(run, to),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }
}

/// Returns the controller to idle when the worker exits, panics included.
struct IdleOnDrop<'a>(&'a SharedState);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(RunState::Idle);
    }
}

/// A validated request to type some text.
#[derive(Debug, Clone)]
pub struct TypingRequest {
    /// Characters to emit, in order
    text: Vec<char>,
    /// Requested rate, before clamping
    rate_wps: f64,
    /// Wait before the first key
    lead_in: Duration,
}

impl TypingRequest {
    /// Validate `text` and build a request with no lead-in.
    pub fn new(text: &str, rate_wps: f64) -> Result<Self, TypingError> {
        if text.is_empty() {
            return Err(TypingError::EmptyText);
        }
        Ok(Self {
            text: text.chars().collect(),
            rate_wps,
            lead_in: Duration::ZERO,
        })
    }

    /// Give the user time to place the cursor before typing starts.
    #[must_use]
    pub fn with_lead_in(mut self, lead_in: Duration) -> Self {
        self.lead_in = lead_in;
        self
    }

    /// Number of characters to emit.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Always false; requests are non-empty by construction.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The characters to emit.
    pub fn chars(&self) -> &[char] {
        &self.text
    }

    /// Delay slept after each character.
    pub fn delay(&self) -> Duration {
        pacing::char_delay(self.rate_wps)
    }
}

/// Drives typing runs against one emitter.
pub struct TypingController<E> {
    /// Run state shared with the worker
    state: Arc<SharedState>,
    /// Keystroke backend, used by one worker at a time
    emitter: Arc<Mutex<E>>,
    /// Progress observer
    sink: Arc<dyn ProgressSink>,
    /// Sleep granularity while paused or waiting
    poll_interval: Duration,
}

impl<E: KeyEmitter + 'static> TypingController<E> {
    /// Create an idle controller.
    pub fn new(emitter: E, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            state: Arc::new(SharedState::new()),
            emitter: Arc::new(Mutex::new(emitter)),
            sink,
            poll_interval: MAX_POLL_INTERVAL,
        }
    }

    /// Use a finer poll interval. Values above [`MAX_POLL_INTERVAL`] are
    /// capped; zero is raised to one millisecond.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.clamp(Duration::from_millis(1), MAX_POLL_INTERVAL);
        self
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.state.load()
    }

    /// Validate and start typing `text` at `rate_wps` words per second.
    pub fn start(&self, text: &str, rate_wps: f64) -> Result<RunHandle, TypingError> {
        self.start_request(TypingRequest::new(text, rate_wps)?)
    }

    /// Start a run on a new worker thread.
    ///
    /// Rejected with [`TypingError::AlreadyActive`] unless the controller is
    /// idle; the active run is left untouched.
    pub fn start_request(&self, request: TypingRequest) -> Result<RunHandle, TypingError> {
        let run_id = self.state.begin().map_err(TypingError::AlreadyActive)?;

        info!(
            "Typing {} characters at {:.1} WPS",
            request.len(),
            pacing::effective_wps(request.rate_wps)
        );

        let state = Arc::clone(&self.state);
        let emitter = Arc::clone(&self.emitter);
        let sink = Arc::clone(&self.sink);
        let poll = self.poll_interval;

        let spawned = thread::Builder::new()
            .name("typing-worker".to_owned())
            .spawn(move || run(&state, emitter.as_ref(), sink.as_ref(), &request, poll));

        match spawned {
            Ok(worker) => Ok(RunHandle {
                state: Arc::clone(&self.state),
                run_id,
                worker,
            }),
            Err(e) => {
                self.state.store(RunState::Idle);
                Err(TypingError::Spawn(e))
            }
        }
    }

    /// Flip between running and paused. Returns whether the run is now paused.
    ///
    /// Without an active run this does nothing and returns `false`.
    pub fn toggle_pause(&self) -> bool {
        toggle_pause(&self.state)
    }

    /// Ask the active run, if any, to end at its next poll.
    ///
    /// Idempotent. The controller reaches [`RunState::Idle`] once the worker
    /// has exited, within one poll interval plus any in-flight key.
    pub fn stop(&self) {
        request_stop(&self.state, None);
    }
}

/// Handle to a run in progress.
#[derive(Debug)]
pub struct RunHandle {
    /// Run state shared with the worker
    state: Arc<SharedState>,
    /// Id of the run this handle was returned for
    run_id: u64,
    /// Worker thread
    worker: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Same as [`TypingController::stop`], but only for this handle's run.
    ///
    /// Does nothing once the run has ended, even if another run has started.
    pub fn cancel(&self) {
        request_stop(&self.state, Some(self.run_id));
    }

    /// Whether the worker has exited.
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the run to end. `None` if the worker panicked.
    pub fn join(self) -> Option<RunOutcome> {
        self.worker.join().ok()
    }
}

/// Running <-> Paused; anything else is left alone.
fn toggle_pause(state: &SharedState) -> bool {
    loop {
        match state.snapshot() {
            (run, RunState::Running) => {
                if state.transition(run, RunState::Running, RunState::Paused) {
                    info!("Typing paused");
                    return true;
                }
            }
            (run, RunState::Paused) => {
                if state.transition(run, RunState::Paused, RunState::Running) {
                    info!("Typing resumed");
                    return false;
                }
            }
            (_, RunState::Idle | RunState::Stopping) => return false,
        }
    }
}

/// Running | Paused -> Stopping, for run `only` if given, else any run.
fn request_stop(state: &SharedState, only: Option<u64>) {
    loop {
        let (run, current) = state.snapshot();
        if only.is_some_and(|wanted| wanted != run) {
            return;
        }
        if !matches!(current, RunState::Running | RunState::Paused) {
            return;
        }
        if state.transition(run, current, RunState::Stopping) {
            info!("Stop requested");
            return;
        }
    }
}

/// Whether the run should keep going.
fn is_live(state: &SharedState) -> bool {
    matches!(state.load(), RunState::Running | RunState::Paused)
}

/// Block while paused. Returns `false` once a stop is observed.
fn wait_while_paused(state: &SharedState, poll: Duration) -> bool {
    loop {
        match state.load() {
            RunState::Running => return true,
            RunState::Paused => thread::sleep(poll),
            RunState::Idle | RunState::Stopping => return false,
        }
    }
}

/// Sleep for `duration` in slices of at most `poll`. Returns `false` if a
/// stop cut the sleep short.
///
/// A duration too long to represent as an `Instant` waits until stopped.
fn sleep_unless_stopped(state: &SharedState, duration: Duration, poll: Duration) -> bool {
    let deadline = Instant::now().checked_add(duration);
    loop {
        if !is_live(state) {
            return false;
        }
        let slice = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return true;
                }
                (deadline - now).min(poll)
            }
            None => poll,
        };
        thread::sleep(slice);
    }
}

/// Worker body: lead-in, focus, then one key per character.
fn run<E: KeyEmitter>(
    state: &SharedState,
    emitter: &Mutex<E>,
    sink: &dyn ProgressSink,
    request: &TypingRequest,
    poll: Duration,
) -> RunOutcome {
    let reset = IdleOnDrop(state);
    let total = request.len();
    let delay = request.delay();
    let mut emitter = emitter.lock().unwrap_or_else(PoisonError::into_inner);
    let mut typed = 0;

    let outcome = 'run: {
        if !sleep_unless_stopped(state, request.lead_in, poll) || !wait_while_paused(state, poll) {
            break 'run RunOutcome::Cancelled { typed, total };
        }

        if let Err(e) = emitter.acquire_focus() {
            warn!("Failed to focus target window: {}", e);
        }

        for (index, &character) in request.chars().iter().enumerate() {
            if !wait_while_paused(state, poll) {
                break 'run RunOutcome::Cancelled { typed, total };
            }

            if let Err(e) = emit_char(&mut *emitter, character) {
                warn!("Skipping character at index {}: {}", index, e);
            }

            // A stop during the delay still reports the key already sent
            sleep_unless_stopped(state, delay, poll);

            sink.on_progress(ProgressEvent {
                index,
                character,
                total,
            });
            typed = index + 1;
        }

        RunOutcome::Completed { total }
    };

    drop(emitter);
    drop(reset);

    match outcome {
        RunOutcome::Completed { total } => info!("Typing complete ({} characters)", total),
        RunOutcome::Cancelled { typed, total } => {
            info!("Typing stopped after {} of {} characters", typed, total);
        }
    }
    sink.on_finished(outcome);

    outcome
}
