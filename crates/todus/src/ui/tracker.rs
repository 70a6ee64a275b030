use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use todus_transfer::{Observer, TransferEvent};

const PB_STYLE: &str =
    "{spinner:.blue} {prefix:>12.cyan.bold} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {wide_msg}";

const SPINNER_STYLE: &str = "{spinner:.blue} {prefix:>12.cyan.bold} [{elapsed_precise}] {wide_msg}";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

static PB_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    ProgressStyle::with_template(PB_STYLE)
        .ok()
        .map(|style| style.tick_chars(TICK).progress_chars(PB_CHARS))
});

static SPINNER_TEMPLATE: Lazy<Option<ProgressStyle>> =
    Lazy::new(|| ProgressStyle::with_template(SPINNER_STYLE).ok().map(|style| style.tick_chars(TICK)));

/// Terminal view of a transfer: one bar per active file, status lines above.
#[derive(Default)]
pub struct ProgressTracker {
    multi: MultiProgress,
    bars:  Mutex<HashMap<String, ProgressBar>>,
}

impl ProgressTracker {
    pub fn new() -> Self { Self::default() }

    /// Print above the bars so they are not torn.
    ///
    /// Hidden bars swallow their output, so plain stdout is used then.
    pub fn println(&self, line: impl AsRef<str>) {
        if self.multi.is_hidden() || self.multi.println(line.as_ref()).is_err() {
            println!("{}", line.as_ref());
        }
    }

    fn start(&self, name: &str, prefix: &'static str) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        let pb = match SPINNER_TEMPLATE.as_ref() {
            Some(style) => pb.with_style(style.clone()),
            None => pb,
        };
        pb.set_prefix(prefix);
        pb.set_message(name.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        self.lock().insert(name.to_string(), pb);
    }

    fn progress(&self, name: &str, pos: u64, total: u64) {
        let bars = self.lock();
        let Some(pb) = bars.get(name) else {
            return;
        };
        if pb.length() != Some(total) {
            if let Some(style) = PB_TEMPLATE.as_ref() {
                pb.set_style(style.clone());
            }
            pb.set_length(total);
        }
        pb.set_position(pos);
    }

    fn finish(&self, name: &str) {
        if let Some(pb) = self.lock().remove(name) {
            pb.finish_and_clear();
            self.multi.remove(&pb);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ProgressBar>> {
        self.bars.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Observer for ProgressTracker {
    fn on_event(&self, event: TransferEvent<'_>) {
        match event {
            TransferEvent::Skipping { name } => self.println(format!("Skipping: {name}")),
            TransferEvent::Uploading { name } => {
                self.println(format!("Uploading: {name}"));
                self.start(name, "Uploading");
            }
            TransferEvent::Uploaded { name } => {
                self.finish(name);
                self.println(format!("Uploaded: {name}"));
            }
            TransferEvent::Downloading { name, .. } => {
                self.println(format!("Downloading: {name}"));
                self.start(name, "Downloading");
            }
            TransferEvent::Progress { name, pos, total } => self.progress(name, pos, total),
            TransferEvent::Downloaded { name, size } => {
                self.finish(name);
                self.println(format!("Downloaded: {name} ({size} bytes)"));
            }
            TransferEvent::Retrying { name, error } => {
                self.println(format!("Retrying: {name} (ERROR: {error})"));
            }
        }
    }
}
