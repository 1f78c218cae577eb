use crate::core::model::{RawInput, DEFAULT_MOOD};
use log::{info, warn};

/// Read side of the story form, plus the one write the controller needs
/// (re-checking the default mood).
pub trait FormSource {
    fn keywords(&self) -> String;
    fn theme(&self) -> String;
    /// Raw value of the duration selector.
    fn duration(&self) -> String;
    fn checked_moods(&self) -> Vec<String>;
    fn check_mood(&self, mood: &str);
}

pub fn collect<F: FormSource + ?Sized>(form: &F, default_duration: u32) -> RawInput {
    let raw_duration = form.duration();
    let duration_minutes = match raw_duration.trim().parse::<u32>() {
        Ok(minutes) => minutes,
        Err(_) => {
            warn!(
                "Unreadable duration {:?}, using {} minutes",
                raw_duration, default_duration
            );
            default_duration
        }
    };

    let mut moods: Vec<String> = Vec::new();
    for mood in form.checked_moods() {
        if !moods.contains(&mood) {
            moods.push(mood);
        }
    }

    RawInput {
        keywords: form.keywords(),
        theme: form.theme(),
        duration_minutes,
        moods,
    }
}

/// Keeps at least one mood checked. Returns `true` if the form was corrected.
pub fn enforce_mood_selection<F: FormSource + ?Sized>(form: &F) -> bool {
    if form.checked_moods().is_empty() {
        info!("No mood selected, checking {:?}", DEFAULT_MOOD);
        form.check_mood(DEFAULT_MOOD);
        return true;
    }
    false
}
