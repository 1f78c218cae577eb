use crate::core::config::Config;
use crate::core::model::{DEFAULT_MOOD, DURATIONS, MOODS, THEMES};
use crate::services::api::HttpStoryApi;
use crate::services::collector::FormSource;
use crate::services::controller::{StoryController, UiAction};
use crate::services::presenter::{StoryDisplay, StoryView, STEP_LABELS};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use leptos::*;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

#[derive(Clone, Copy)]
struct PageSignals {
    keywords: RwSignal<String>,
    theme: RwSignal<String>,
    duration: RwSignal<String>,
    moods: RwSignal<Vec<String>>,
    submit_enabled: RwSignal<bool>,
    submit_label: RwSignal<String>,
    loading_visible: RwSignal<bool>,
    output_visible: RwSignal<bool>,
    active_step: RwSignal<Option<usize>>,
    error: RwSignal<Option<String>>,
    story: RwSignal<Option<StoryDisplay>>,
    audio_src: RwSignal<Option<String>>,
}

impl PageSignals {
    fn new() -> Self {
        Self {
            keywords: create_rw_signal(String::new()),
            theme: create_rw_signal(THEMES[0].to_string()),
            duration: create_rw_signal("3".to_string()),
            moods: create_rw_signal(vec![DEFAULT_MOOD.to_string()]),
            submit_enabled: create_rw_signal(true),
            submit_label: create_rw_signal(crate::services::presenter::GENERATE_LABEL.to_string()),
            loading_visible: create_rw_signal(false),
            output_visible: create_rw_signal(false),
            active_step: create_rw_signal(None),
            error: create_rw_signal(None),
            story: create_rw_signal(None),
            audio_src: create_rw_signal(None),
        }
    }
}

/// The controller's handle on the page: writes go to signals, the audio
/// element and output panel are reached through node refs.
struct WebView {
    signals: PageSignals,
    audio: NodeRef<html::Audio>,
    output: NodeRef<html::Div>,
}

impl FormSource for WebView {
    fn keywords(&self) -> String {
        self.signals.keywords.get_untracked()
    }

    fn theme(&self) -> String {
        self.signals.theme.get_untracked()
    }

    fn duration(&self) -> String {
        self.signals.duration.get_untracked()
    }

    fn checked_moods(&self) -> Vec<String> {
        self.signals.moods.get_untracked()
    }

    fn check_mood(&self, mood: &str) {
        self.signals.moods.update(|moods| {
            if !moods.iter().any(|m| m == mood) {
                moods.push(mood.to_string());
            }
        });
    }
}

#[async_trait(?Send)]
impl StoryView for WebView {
    fn set_submit(&self, enabled: bool, label: &str) {
        self.signals.submit_enabled.set(enabled);
        self.signals.submit_label.set(label.to_string());
    }

    fn set_loading_visible(&self, visible: bool) {
        self.signals.loading_visible.set(visible);
    }

    fn set_output_visible(&self, visible: bool) {
        self.signals.output_visible.set(visible);
    }

    fn highlight_step(&self, step: Option<usize>) {
        self.signals.active_step.set(step);
    }

    fn set_error(&self, message: Option<&str>) {
        self.signals.error.set(message.map(str::to_string));
    }

    fn show_story(&self, display: &StoryDisplay) {
        self.signals.story.set(Some(display.clone()));
    }

    fn set_audio_source(&self, url: Option<&str>) {
        self.signals.audio_src.set(url.map(str::to_string));
    }

    fn scroll_to_output(&self) {
        if let Some(output) = self.output.get_untracked() {
            let options = web_sys::ScrollIntoViewOptions::new();
            options.set_behavior(web_sys::ScrollBehavior::Smooth);
            options.set_block(web_sys::ScrollLogicalPosition::Start);
            output.scroll_into_view_with_scroll_into_view_options(&options);
        }
    }

    async fn play_audio(&self) -> Result<()> {
        let audio = self
            .audio
            .get_untracked()
            .ok_or_else(|| anyhow!("audio element is not mounted"))?;
        let promise = audio
            .play()
            .map_err(|e| anyhow!("play() failed: {:?}", e))?;
        JsFuture::from(promise)
            .await
            .map_err(|e| anyhow!("play() rejected: {:?}", e))?;
        Ok(())
    }

    async fn save_audio(&self, url: &str, file_name: &str) -> Result<()> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| anyhow!("no document"))?;
        let body = document.body().ok_or_else(|| anyhow!("no document body"))?;

        let link = document
            .create_element("a")
            .map_err(|e| anyhow!("Failed to create link: {:?}", e))?
            .dyn_into::<web_sys::HtmlAnchorElement>()
            .map_err(|_| anyhow!("created element is not an anchor"))?;
        link.set_href(url);
        link.set_download(file_name);

        body.append_child(&link)
            .map_err(|e| anyhow!("Failed to attach link: {:?}", e))?;
        link.click();
        body.remove_child(&link)
            .map_err(|e| anyhow!("Failed to detach link: {:?}", e))?;
        Ok(())
    }
}

fn build_controller(
    signals: PageSignals,
    audio: NodeRef<html::Audio>,
    output: NodeRef<html::Div>,
) -> Result<StoryController> {
    let mut config = Config::default();
    if let Some(origin) = web_sys::window().and_then(|w| w.location().origin().ok()) {
        config.base_url = origin;
    }

    let api = HttpStoryApi::new(&config)?;
    let view = Rc::new(WebView {
        signals,
        audio,
        output,
    });
    Ok(StoryController::new(config, Box::new(api), view))
}

fn display(visible: bool) -> &'static str {
    if visible {
        "block"
    } else {
        "none"
    }
}

#[component]
pub fn App() -> impl IntoView {
    let signals = PageSignals::new();
    let audio_ref = create_node_ref::<html::Audio>();
    let output_ref = create_node_ref::<html::Div>();

    let controller = match build_controller(signals, audio_ref, output_ref) {
        Ok(controller) => store_value(controller),
        Err(e) => {
            leptos::logging::error!("Failed to start: {:#}", e);
            return view! { <p class="error">"Failed to start: " {e.to_string()}</p> }.into_view();
        }
    };
    let act = move |action: UiAction| controller.with_value(|c| c.handle(action));

    let story_field = move |pick: fn(&StoryDisplay) -> String| {
        move || signals.story.with(|s| s.as_ref().map(pick).unwrap_or_default())
    };

    view! {
        <div class="app-container">
            <h1>"NarrateAI"</h1>

            <div class="story-form">
                <label for="keywords">"Keywords"</label>
                <input
                    id="keywords"
                    type="text"
                    placeholder="dragon, forest, lost key"
                    prop:value=move || signals.keywords.get()
                    on:input=move |ev| signals.keywords.set(event_target_value(&ev))
                    on:keypress=move |ev| {
                        if ev.key() == "Enter" {
                            act(UiAction::KeywordsEnter);
                        }
                    }
                />

                <label for="theme">"Theme"</label>
                <select id="theme" on:change=move |ev| signals.theme.set(event_target_value(&ev))>
                    {THEMES
                        .iter()
                        .map(|theme| {
                            let theme = *theme;
                            view! {
                                <option value=theme prop:selected=move || signals.theme.get() == theme>
                                    {theme}
                                </option>
                            }
                        })
                        .collect_view()}
                </select>

                <label for="duration">"Duration"</label>
                <select id="duration" on:change=move |ev| signals.duration.set(event_target_value(&ev))>
                    {DURATIONS
                        .iter()
                        .map(|minutes| {
                            let value = minutes.to_string();
                            let current = value.clone();
                            view! {
                                <option value=value prop:selected=move || signals.duration.get() == current>
                                    {format!("{} min", minutes)}
                                </option>
                            }
                        })
                        .collect_view()}
                </select>

                <div class="moods">
                    {MOODS
                        .iter()
                        .map(|mood| {
                            let mood = *mood;
                            view! {
                                <label class="mood-tag">
                                    <input
                                        type="checkbox"
                                        name="moods"
                                        value=mood
                                        prop:checked=move || signals.moods.with(|m| m.iter().any(|x| x == mood))
                                        on:change=move |ev| {
                                            let checked = event_target_checked(&ev);
                                            signals.moods.update(|m| {
                                                m.retain(|x| x != mood);
                                                if checked {
                                                    m.push(mood.to_string());
                                                }
                                            });
                                            act(UiAction::MoodsChanged);
                                        }
                                    />
                                    <span>{mood}</span>
                                </label>
                            }
                        })
                        .collect_view()}
                </div>

                <button
                    class="generate-btn"
                    prop:disabled=move || !signals.submit_enabled.get()
                    on:click=move |_| act(UiAction::Generate)
                >
                    {move || signals.submit_label.get()}
                </button>
            </div>

            <div
                class="error-message"
                style:display=move || if signals.error.with(Option::is_some) { "flex" } else { "none" }
            >
                <span>{move || signals.error.get().unwrap_or_default()}</span>
                <button on:click=move |_| act(UiAction::DismissError)>"×"</button>
            </div>

            <div class="loading-section" style:display=move || display(signals.loading_visible.get())>
                {STEP_LABELS
                    .iter()
                    .enumerate()
                    .map(|(i, label)| {
                        view! {
                            <div class="loading-step" class:active=move || signals.active_step.get() == Some(i)>
                                {*label}
                            </div>
                        }
                    })
                    .collect_view()}
            </div>

            <div
                class="output-section"
                node_ref=output_ref
                style:display=move || display(signals.output_visible.get())
            >
                <div class="story-info">
                    <span>{story_field(|d| d.duration.clone())}</span>
                    <span>{story_field(|d| d.emotions.clone())}</span>
                    <span>{story_field(|d| d.word_count.clone())}</span>
                </div>
                <p class="story-text">{story_field(|d| d.story.clone())}</p>
                <audio node_ref=audio_ref controls=true src=move || signals.audio_src.get()></audio>
                <div class="story-actions">
                    <button class="download-btn" on:click=move |_| act(UiAction::Download)>
                        "Download Audio"
                    </button>
                    <button class="regenerate-btn" on:click=move |_| act(UiAction::Regenerate)>
                        "Regenerate"
                    </button>
                </div>
            </div>
        </div>
    }
    .into_view()
}
