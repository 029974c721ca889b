//! Progress animation shown while a single blocking command runs.
//!
//! The indicator runs on its own thread and shares exactly one atomic flag with
//! the caller. Frames are rendered through a `FrameSink` so the drawing backend
//! (an `indicatif` spinner on the terminal) can be replaced in tests.

use crate::error::Result;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How often a new frame is drawn.
pub const RENDER_INTERVAL: Duration = Duration::from_secs(1);
/// How often the stop flag is checked.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// The dot counter cycles through 1..=MAX_DOTS.
pub const MAX_DOTS: usize = 5;

/// Receives rendered frames and the final line.
pub trait FrameSink: Send + Sync + 'static {
    /// Replaces the currently displayed frame.
    fn frame(&self, text: &str);

    /// Clears the animation and prints the completion line.
    fn finish(&self, text: &str);
}

/// Draws frames in place on stderr using an `indicatif` spinner.
pub struct SpinnerSink {
    bar: ProgressBar,
}

impl SpinnerSink {
    pub fn new() -> Result<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template("{msg}")?);
        Ok(Self { bar })
    }
}

impl FrameSink for SpinnerSink {
    fn frame(&self, text: &str) {
        self.bar.set_message(text.to_string());
    }

    fn finish(&self, text: &str) {
        self.bar.finish_and_clear();
        println!("{}", text);
    }
}

/// Formats the frame for a given dot count, e.g. `Exporting . . .`.
pub fn frame_text(message: &str, dots: usize) -> String {
    format!("{} {}", message, vec!["."; dots].join(" "))
}

/// Handle to a running indicator. Dropping it without calling `stop` leaves the
/// thread running until the process exits, so callers always stop it.
pub struct ProgressIndicator<S: FrameSink> {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    sink: Arc<S>,
}

impl<S: FrameSink> ProgressIndicator<S> {
    /// Starts animating `message` on a background thread.
    pub fn start(sink: S, message: &str) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let sink = Arc::new(sink);

        let thread_stop = Arc::clone(&stop);
        let thread_sink = Arc::clone(&sink);
        let message = message.to_string();
        let handle = thread::spawn(move || {
            let mut dots = 1;
            let mut last_render: Option<Instant> = None;

            while !thread_stop.load(Ordering::Acquire) {
                if last_render.map_or(true, |t| t.elapsed() >= RENDER_INTERVAL) {
                    thread_sink.frame(&frame_text(&message, dots));
                    dots = dots % MAX_DOTS + 1;
                    last_render = Some(Instant::now());
                }
                thread::sleep(POLL_INTERVAL);
            }
            debug!("Progress indicator stopped");
        });

        Self {
            stop,
            handle: Some(handle),
            sink,
        }
    }

    /// Signals the thread, waits for it to exit, then prints `final_line` once.
    pub fn stop(mut self, final_line: &str) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Progress indicator thread panicked");
            }
        }
        self.sink.finish(final_line);
    }
}

/// Runs `work` while animating `message` on the terminal, then prints `done` or
/// `failed` depending on the outcome.
pub fn with_spinner<T>(
    message: &str,
    done: &str,
    failed: &str,
    work: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let indicator = ProgressIndicator::start(SpinnerSink::new()?, message);
    let result = work();
    match &result {
        Ok(_) => indicator.stop(&done.green().to_string()),
        Err(_) => indicator.stop(&failed.red().to_string()),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Frame(String),
        Finish(String),
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        events: Arc<Mutex<Vec<Event>>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }
    }

    impl FrameSink for RecordingSink {
        fn frame(&self, text: &str) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Frame(text.to_string()));
        }

        fn finish(&self, text: &str) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Finish(text.to_string()));
        }
    }

    #[test]
    fn test_frame_text() {
        assert_eq!(frame_text("Exporting", 1), "Exporting .");
        assert_eq!(frame_text("Exporting", 3), "Exporting . . .");
    }

    #[test]
    fn test_stop_is_prompt_and_prints_one_line() {
        let sink = RecordingSink::default();
        let indicator = ProgressIndicator::start(sink.clone(), "Exporting");
        thread::sleep(Duration::from_millis(1200));

        let started = Instant::now();
        indicator.stop("Done.");
        // Within one polling interval plus scheduling slack
        assert!(started.elapsed() < POLL_INTERVAL * 5);

        let events = sink.events();
        let finishes: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, Event::Finish(_)))
            .collect();
        assert_eq!(finishes, vec![&Event::Finish("Done.".to_string())]);
        assert_eq!(events.last(), Some(&Event::Finish("Done.".to_string())));
        assert!(matches!(events.first(), Some(Event::Frame(f)) if f == "Exporting ."));

        // Nothing is rendered after stop returns
        thread::sleep(RENDER_INTERVAL + POLL_INTERVAL * 2);
        assert_eq!(sink.events().len(), events.len());
    }

    #[test]
    fn test_dot_counter_wraps_after_five() {
        let sink = RecordingSink::default();
        let indicator = ProgressIndicator::start(sink.clone(), "x");
        thread::sleep(RENDER_INTERVAL * 6 + Duration::from_millis(300));
        indicator.stop("ok");

        let frames: Vec<String> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Frame(f) => Some(f),
                Event::Finish(_) => None,
            })
            .collect();
        assert!(frames.len() >= 6, "only {} frames", frames.len());
        assert_eq!(frames[4], "x . . . . .");
        assert_eq!(frames[5], "x .");
    }

    #[test]
    fn test_immediate_stop() {
        let sink = RecordingSink::default();
        let indicator = ProgressIndicator::start(sink.clone(), "x");
        indicator.stop("ok");
        let events = sink.events();
        assert_eq!(events.last(), Some(&Event::Finish("ok".to_string())));
        assert!(events.len() <= 2);
    }
}
