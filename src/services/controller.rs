//! Request lifecycle: the dispatch table from page actions to state
//! transitions, the single in-flight request guard, and loading teardown.

use crate::core::config::Config;
use crate::core::error::{StoryError, ValidationError, NETWORK_FAILURE_MESSAGE};
use crate::core::model::StoryRequest;
use crate::core::state::{ControllerState, Phase};
use crate::services::api::StoryApi;
use crate::services::collector::{collect, enforce_mood_selection};
use crate::services::presenter::{
    self, autoplay, ErrorBanner, StoryView, BUSY_LABEL, GENERATE_LABEL, NO_AUDIO_MESSAGE,
    STEP_LABELS,
};
use crate::services::validator::validate;
use crate::utils::timer::{sleep, spawn, spawn_detached};
use chrono::Utc;
use futures_util::future::{FutureExt, LocalBoxFuture};
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Page actions, one per wired control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Generate,
    KeywordsEnter,
    Regenerate,
    Download,
    DismissError,
    MoodsChanged,
}

/// Work left for the frontend to spawn or await.
pub type Task = LocalBoxFuture<'static, ()>;

pub enum Submission {
    /// A request is already in flight; nothing happened.
    Busy,
    /// Rejected locally; the banner shows the reason and no request was sent.
    Invalid(ValidationError),
    /// Loading has started. The future performs the request and applies the
    /// completing transition.
    Dispatched(LocalBoxFuture<'static, RequestOutcome>),
}

impl Submission {
    pub fn into_task(self) -> Option<Task> {
        match self {
            Submission::Dispatched(request) => Some(request.map(|_| ()).boxed_local()),
            Submission::Busy | Submission::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Rendered,
    ServerError(String),
    NetworkError,
}

/// Cycle driven while loading: each step in turn, then a tick with none.
#[derive(Debug, Default, Clone)]
pub struct LoadingSteps {
    tick: usize,
}

impl Iterator for LoadingSteps {
    type Item = Option<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.tick;
        self.tick = (self.tick + 1) % (STEP_LABELS.len() + 1);
        Some((current < STEP_LABELS.len()).then_some(current))
    }
}

async fn animate_steps(view: Rc<dyn StoryView>, dwell: Duration) {
    for step in LoadingSteps::default() {
        sleep(dwell).await;
        debug!("Loading step {:?}", step);
        view.highlight_step(step);
    }
}

/// Leaves the loading state when dropped, so a request future that is
/// cancelled or never polled still re-enables the form.
struct LoadingGuard {
    controller: Option<StoryController>,
}

impl LoadingGuard {
    fn release(mut self) {
        if let Some(controller) = self.controller.take() {
            controller.leave_loading();
        }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if let Some(controller) = self.controller.take() {
            warn!("Story request dropped before completing");
            controller.leave_loading();
        }
    }
}

struct Inner {
    config: Config,
    api: Box<dyn StoryApi>,
    view: Rc<dyn StoryView>,
    state: RefCell<ControllerState>,
    banner: ErrorBanner,
}

#[derive(Clone)]
pub struct StoryController {
    inner: Rc<Inner>,
}

impl StoryController {
    pub fn new(config: Config, api: Box<dyn StoryApi>, view: Rc<dyn StoryView>) -> Self {
        Self {
            inner: Rc::new(Inner {
                config,
                api,
                view,
                state: RefCell::new(ControllerState::default()),
                banner: ErrorBanner::default(),
            }),
        }
    }

    pub fn phase(&self) -> Phase {
        self.inner.state.borrow().phase()
    }

    pub fn current_audio_url(&self) -> Option<String> {
        self.inner.state.borrow().current_audio_url().map(str::to_string)
    }

    pub fn dispatch(&self, action: UiAction) -> Option<Task> {
        debug!("Dispatching {:?}", action);
        match action {
            UiAction::Generate | UiAction::KeywordsEnter => self.submit().into_task(),
            UiAction::Regenerate => self.regenerate().into_task(),
            UiAction::Download => {
                let this = self.clone();
                Some(async move { this.download().await }.boxed_local())
            }
            UiAction::DismissError => {
                self.hide_error();
                None
            }
            UiAction::MoodsChanged => {
                enforce_mood_selection(self.inner.view.as_ref());
                None
            }
        }
    }

    /// Spawns whatever `dispatch` returns on the local executor.
    pub fn handle(&self, action: UiAction) {
        if let Some(task) = self.dispatch(action) {
            spawn_detached(task);
        }
    }

    pub fn submit(&self) -> Submission {
        if self.inner.state.borrow().is_generating() {
            debug!("Submit ignored: a story is already being generated");
            return Submission::Busy;
        }

        let raw = collect(self.inner.view.as_ref(), self.inner.config.default_duration);
        let request = match validate(raw) {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejected story request: {:?}", e);
                self.show_error(&e.to_string());
                return Submission::Invalid(e);
            }
        };

        if !self.enter_loading() {
            return Submission::Busy;
        }

        let this = self.clone();
        let guard = LoadingGuard {
            controller: Some(self.clone()),
        };
        Submission::Dispatched(async move { this.run_request(request, guard).await }.boxed_local())
    }

    pub fn regenerate(&self) -> Submission {
        self.inner.view.set_output_visible(false);
        self.submit()
    }

    pub async fn download(&self) {
        let url = self.current_audio_url();
        let Some(url) = url else {
            self.show_error(NO_AUDIO_MESSAGE);
            return;
        };

        let file_name = presenter::download_file_name(
            &self.inner.config.download_prefix,
            Utc::now().timestamp_millis(),
        );
        info!("Downloading {} as {}", url, file_name);
        if let Err(e) = self.inner.view.save_audio(&url, &file_name).await {
            error!("Download failed: {:#}", e);
            self.show_error(&format!("Download failed: {}", e));
        }
    }

    pub fn show_error(&self, message: &str) {
        let auto_hide = self.inner.config.timings.error_auto_hide();
        self.inner.banner.show(&self.inner.view, message, auto_hide);
    }

    pub fn hide_error(&self) {
        self.inner.banner.hide(self.inner.view.as_ref());
    }

    fn enter_loading(&self) -> bool {
        if !self.inner.state.borrow_mut().begin_loading() {
            return false;
        }

        let view = &self.inner.view;
        view.set_submit(false, BUSY_LABEL);
        view.set_loading_visible(true);
        view.set_output_visible(false);
        self.hide_error();

        let animation = spawn(animate_steps(
            view.clone(),
            self.inner.config.timings.step_dwell(),
        ));
        self.inner.state.borrow_mut().attach_animation(animation);
        true
    }

    fn leave_loading(&self) {
        self.inner.state.borrow_mut().finish_loading();

        let view = &self.inner.view;
        view.set_submit(true, GENERATE_LABEL);
        view.set_loading_visible(false);
        view.highlight_step(None);
    }

    async fn run_request(self, request: StoryRequest, guard: LoadingGuard) -> RequestOutcome {
        info!(
            "Generating story: {:?}, {}, {}min, {:?}",
            request.keywords, request.theme, request.duration_minutes, request.moods
        );
        let result = self.inner.api.generate(&request).await;
        guard.release();

        match result {
            Ok(story) => {
                info!("Story received: {} words", story.word_count);
                presenter::render(
                    self.inner.view.as_ref(),
                    &mut self.inner.state.borrow_mut(),
                    &story,
                );
                if story.audio_url.is_some() {
                    spawn(autoplay(
                        self.inner.view.clone(),
                        self.inner.config.timings.autoplay_delay(),
                    ));
                }
                RequestOutcome::Rendered
            }
            Err(StoryError::Transport(e)) => {
                error!("Story request failed: {:#}", e);
                self.show_error(NETWORK_FAILURE_MESSAGE);
                RequestOutcome::NetworkError
            }
            Err(e @ StoryError::Application(_)) => {
                let message = e.to_string();
                warn!("Backend refused story: {}", message);
                self.show_error(&message);
                RequestOutcome::ServerError(message)
            }
        }
    }
}
