//! Unified Progress Bar
//!
//! One batch bar per run. While a bar is visible it is registered as the active bar, and
//! every console log line goes through [`ProgressAwareStderr`], which suspends the bar
//! for the duration of the write so log output and bar redraws never interleave.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub mod templates {
    pub const BATCH: &str = "{spinner:.green} {prefix:.cyan.bold} ▕{bar:35.green/black}▏ {percent:>3}% • {pos}/{len} • ⏱️ {elapsed_precise} • {msg}";
    pub const PROGRESS_CHARS: &str = "█▓░";
    pub const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
}

static ACTIVE_BAR: Mutex<Option<ProgressBar>> = Mutex::new(None);

fn register_active(bar: &ProgressBar) {
    if let Ok(mut guard) = ACTIVE_BAR.lock() {
        *guard = Some(bar.clone());
    }
}

fn clear_active() {
    if let Ok(mut guard) = ACTIVE_BAR.lock() {
        *guard = None;
    }
}

/// Run `f` with the active progress bar (if any) hidden.
pub fn with_suspended_progress<R>(f: impl FnOnce() -> R) -> R {
    // clone out of the lock: suspend() may block on the bar's own draw state
    let bar = ACTIVE_BAR.lock().ok().and_then(|guard| guard.clone());
    match bar {
        Some(bar) => bar.suspend(f),
        None => f(),
    }
}

pub struct UnifiedProgressBar {
    pub bar: ProgressBar,
    visible: bool,
    is_finished: AtomicBool,
}

impl UnifiedProgressBar {
    /// `visible = false` keeps the counters but never draws.
    pub fn new(total: u64, prefix: &str, visible: bool) -> Arc<Self> {
        let bar = ProgressBar::new(total);
        if visible {
            if let Ok(style) = ProgressStyle::default_bar().template(templates::BATCH) {
                bar.set_style(
                    style
                        .progress_chars(templates::PROGRESS_CHARS)
                        .tick_chars(templates::SPINNER_CHARS),
                );
            }
            bar.set_prefix(prefix.to_string());
            bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(20));
            register_active(&bar);
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        Arc::new(Self {
            bar,
            visible,
            is_finished: AtomicBool::new(false),
        })
    }

    pub fn inc(&self) {
        self.bar.inc(1);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish_with_message(&self, msg: &str) {
        if self.is_finished.swap(true, Ordering::Relaxed) {
            return;
        }
        self.bar.finish_with_message(msg.to_string());
        if self.visible {
            clear_active();
        }
    }
}

impl Drop for UnifiedProgressBar {
    fn drop(&mut self) {
        if !self.is_finished.load(Ordering::Relaxed) {
            self.bar.finish_and_clear();
            if self.visible {
                clear_active();
            }
        }
    }
}

/// stderr writer for the console log layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgressAwareStderr;

impl Write for ProgressAwareStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        with_suspended_progress(|| io::stderr().write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        with_suspended_progress(|| io::stderr().write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}
