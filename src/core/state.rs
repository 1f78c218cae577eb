use crate::utils::timer::TaskHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    /// Behaves like `Idle` for new submissions.
    Done,
}

/// Per-page controller state. Only the transition methods below mutate it.
#[derive(Debug, Default)]
pub struct ControllerState {
    phase: Phase,
    current_audio_url: Option<String>,
    loading_animation: Option<TaskHandle>,
}

impl ControllerState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_generating(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn current_audio_url(&self) -> Option<&str> {
        self.current_audio_url.as_deref()
    }

    /// `Idle | Done -> Loading`. Returns `false` if a request is already in flight.
    pub fn begin_loading(&mut self) -> bool {
        if self.is_generating() {
            return false;
        }
        self.phase = Phase::Loading;
        true
    }

    pub fn attach_animation(&mut self, handle: TaskHandle) {
        if let Some(previous) = self.loading_animation.replace(handle) {
            previous.cancel();
        }
    }

    /// `Loading -> Done`, stopping the step animation.
    pub fn finish_loading(&mut self) {
        if let Some(animation) = self.loading_animation.take() {
            animation.cancel();
        }
        if self.phase == Phase::Loading {
            self.phase = Phase::Done;
        }
    }

    pub fn remember_audio(&mut self, url: Option<String>) {
        self.current_audio_url = url;
    }
}

impl Drop for ControllerState {
    fn drop(&mut self) {
        if let Some(animation) = self.loading_animation.take() {
            animation.cancel();
        }
    }
}
