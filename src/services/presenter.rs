use crate::core::model::StoryResult;
use crate::core::state::ControllerState;
use crate::services::collector::FormSource;
use crate::utils::timer::{sleep, spawn, TaskHandle};
use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

pub const GENERATE_LABEL: &str = "Create My Story";
pub const BUSY_LABEL: &str = "Creating...";
pub const NO_AUDIO_MESSAGE: &str = "No audio available to download.";
pub const STEP_LABELS: [&str; 3] = [
    "Writing your story",
    "Analyzing emotions",
    "Recording the narration",
];

/// Everything the controller needs from a page. Implementations only touch
/// their widgets; no lifecycle decisions are made here.
#[async_trait(?Send)]
pub trait StoryView: FormSource {
    fn set_submit(&self, enabled: bool, label: &str);
    fn set_loading_visible(&self, visible: bool);
    fn set_output_visible(&self, visible: bool);
    /// `None` clears every step.
    fn highlight_step(&self, step: Option<usize>);
    /// `Some` replaces the banner text and reveals it, `None` hides it.
    fn set_error(&self, message: Option<&str>);
    fn show_story(&self, display: &StoryDisplay);
    fn set_audio_source(&self, url: Option<&str>);
    fn scroll_to_output(&self);
    async fn play_audio(&self) -> Result<()>;
    async fn save_audio(&self, url: &str, file_name: &str) -> Result<()>;
}

/// Display strings for the output panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryDisplay {
    pub duration: String,
    pub emotions: String,
    pub word_count: String,
    pub story: String,
}

impl From<&StoryResult> for StoryDisplay {
    fn from(result: &StoryResult) -> Self {
        Self {
            duration: format!("Duration: {}", result.duration_estimate),
            emotions: format!("Emotions: {}", result.emotions_used.join(", ")),
            word_count: format!("Words: {}", result.word_count),
            story: result.story.clone(),
        }
    }
}

pub fn download_file_name(prefix: &str, epoch_millis: i64) -> String {
    format!("{}-{}.mp3", prefix, epoch_millis)
}

pub fn render(view: &dyn StoryView, state: &mut ControllerState, result: &StoryResult) {
    view.show_story(&StoryDisplay::from(result));
    view.set_audio_source(result.audio_url.as_deref());
    state.remember_audio(result.audio_url.clone());
    view.set_output_visible(true);
    view.scroll_to_output();
}

/// Browsers may refuse unsolicited playback; that is logged, not reported.
pub async fn autoplay(view: Rc<dyn StoryView>, delay: Duration) {
    sleep(delay).await;
    match view.play_audio().await {
        Ok(()) => debug!("Autoplay started"),
        Err(e) => info!("Auto-play prevented: {:#}", e),
    }
}

/// Error banner with a single pending auto-hide timer.
#[derive(Default)]
pub struct ErrorBanner {
    pending_hide: RefCell<Option<TaskHandle>>,
}

impl ErrorBanner {
    pub fn show(&self, view: &Rc<dyn StoryView>, message: &str, auto_hide: Duration) {
        view.set_error(Some(message));

        let view = view.clone();
        let timer = spawn(async move {
            sleep(auto_hide).await;
            view.set_error(None);
        });
        if let Some(previous) = self.pending_hide.borrow_mut().replace(timer) {
            previous.cancel();
        }
    }

    pub fn hide(&self, view: &dyn StoryView) {
        if let Some(timer) = self.pending_hide.borrow_mut().take() {
            timer.cancel();
        }
        view.set_error(None);
    }
}

impl Drop for ErrorBanner {
    fn drop(&mut self) {
        if let Some(timer) = self.pending_hide.get_mut().take() {
            timer.cancel();
        }
    }
}
