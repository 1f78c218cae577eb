use crate::core::config::Config;
use crate::core::model::{DEFAULT_MOOD, DURATIONS, MOODS, THEMES};
use crate::services::collector::FormSource;
use crate::services::presenter::{StoryDisplay, StoryView, STEP_LABELS};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{MultiSelect, Select, Text};
use log::debug;
use reqwest::Client;
use std::cell::RefCell;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
struct FormState {
    keywords: String,
    theme: String,
    duration: String,
    moods: Vec<String>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            keywords: String::new(),
            theme: THEMES[0].to_string(),
            duration: "3".to_string(),
            moods: vec![DEFAULT_MOOD.to_string()],
        }
    }
}

/// Terminal rendition of the story page: `inquire` prompts stand in for the
/// form, an `indicatif` spinner for the loading panel, and downloads land in
/// the configured output folder.
pub struct TerminalView {
    form: RefCell<FormState>,
    spinner: RefCell<Option<ProgressBar>>,
    audio_url: RefCell<Option<String>>,
    client: Client,
    base_url: Url,
    output_folder: PathBuf,
}

impl TerminalView {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            form: RefCell::new(FormState::default()),
            spinner: RefCell::new(None),
            audio_url: RefCell::new(None),
            client: Client::new(),
            base_url: config.base()?,
            output_folder: PathBuf::from(&config.output_folder),
        })
    }

    /// Asks for every field. An empty mood selection is left as is; the
    /// controller's mood check puts the default back.
    pub fn prompt_form(&self) -> Result<()> {
        let previous = self.form.borrow().clone();

        let keywords = Text::new("Story keywords (comma separated):")
            .with_initial_value(&previous.keywords)
            .with_help_message("e.g. dragon, forest, lost key")
            .prompt()?;

        let theme_cursor = THEMES
            .iter()
            .position(|t| *t == previous.theme)
            .unwrap_or(0);
        let theme = Select::new("Theme:", THEMES.to_vec())
            .with_starting_cursor(theme_cursor)
            .prompt()?;

        let duration_cursor = DURATIONS
            .iter()
            .position(|d| d.to_string() == previous.duration)
            .unwrap_or(1);
        let duration = Select::new("Duration (minutes):", DURATIONS.to_vec())
            .with_starting_cursor(duration_cursor)
            .prompt()?;

        let checked = checked_mood_indices(&previous.moods);
        let moods = MultiSelect::new("Moods:", MOODS.to_vec())
            .with_default(&checked)
            .with_help_message("space to toggle, enter to confirm")
            .prompt()?;

        let mut form = self.form.borrow_mut();
        form.keywords = keywords;
        form.theme = theme.to_string();
        form.duration = duration.to_string();
        form.moods = moods.into_iter().map(str::to_string).collect();
        Ok(())
    }

    fn resolve(&self, url: &str) -> Result<Url> {
        self.base_url
            .join(url)
            .with_context(|| format!("Invalid audio url: {}", url))
    }
}

/// Positions in `MOODS` of the moods already chosen, for pre-checking.
fn checked_mood_indices(moods: &[String]) -> Vec<usize> {
    MOODS
        .iter()
        .enumerate()
        .filter(|(_, mood)| moods.iter().any(|m| m == *mood))
        .map(|(i, _)| i)
        .collect()
}

impl FormSource for TerminalView {
    fn keywords(&self) -> String {
        self.form.borrow().keywords.clone()
    }

    fn theme(&self) -> String {
        self.form.borrow().theme.clone()
    }

    fn duration(&self) -> String {
        self.form.borrow().duration.clone()
    }

    fn checked_moods(&self) -> Vec<String> {
        self.form.borrow().moods.clone()
    }

    fn check_mood(&self, mood: &str) {
        let mut form = self.form.borrow_mut();
        if !form.moods.iter().any(|m| m == mood) {
            println!("No mood selected, using \"{}\".", mood);
            form.moods.push(mood.to_string());
        }
    }
}

#[async_trait(?Send)]
impl StoryView for TerminalView {
    fn set_submit(&self, enabled: bool, label: &str) {
        debug!("Submit {} ({})", if enabled { "enabled" } else { "disabled" }, label);
    }

    fn set_loading_visible(&self, visible: bool) {
        let mut spinner = self.spinner.borrow_mut();
        if let Some(pb) = spinner.take() {
            pb.finish_and_clear();
        }
        if visible {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
                pb.set_style(style);
            }
            pb.set_message("Creating your story...");
            pb.enable_steady_tick(Duration::from_millis(120));
            *spinner = Some(pb);
        }
    }

    fn set_output_visible(&self, _visible: bool) {}

    fn highlight_step(&self, step: Option<usize>) {
        if let (Some(pb), Some(label)) = (
            self.spinner.borrow().as_ref(),
            step.and_then(|i| STEP_LABELS.get(i)),
        ) {
            pb.set_message(*label);
        }
    }

    fn set_error(&self, message: Option<&str>) {
        // A printed line cannot be taken back, so hiding is a no-op.
        if let Some(message) = message {
            eprintln!("\n  ! {}\n", message);
        }
    }

    fn show_story(&self, display: &StoryDisplay) {
        println!();
        println!("{}  |  {}  |  {}", display.duration, display.emotions, display.word_count);
        println!();
        println!("{}", display.story);
        println!();
    }

    fn set_audio_source(&self, url: Option<&str>) {
        *self.audio_url.borrow_mut() = url.map(str::to_string);
        match url.map(|u| self.resolve(u)) {
            Some(Ok(absolute)) => println!("Narration: {}", absolute),
            Some(Err(e)) => debug!("{:#}", e),
            None => println!("Narration unavailable for this story."),
        }
    }

    fn scroll_to_output(&self) {}

    async fn play_audio(&self) -> Result<()> {
        Err(anyhow!("playback is not supported in the terminal"))
    }

    async fn save_audio(&self, url: &str, file_name: &str) -> Result<()> {
        let source = self.resolve(url)?;
        let mut response = self
            .client
            .get(source.clone())
            .send()
            .await
            .with_context(|| format!("Failed to request {}", source))?
            .error_for_status()
            .context("Audio download was rejected")?;

        let total_size = response.content_length().unwrap_or(0);
        let pb = ProgressBar::new(total_size);
        pb.set_style(ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
            .progress_chars("#>-"));

        let mut data = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            pb.inc(chunk.len() as u64);
            data.extend_from_slice(&chunk);
        }
        pb.finish_and_clear();

        tokio::fs::create_dir_all(&self.output_folder).await?;
        let path = self.output_folder.join(file_name);
        tokio::fs::write(&path, &data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Saved {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn view_for(base_url: &str, output_folder: &std::path::Path) -> Result<TerminalView> {
        TerminalView::new(&Config {
            base_url: base_url.to_string(),
            output_folder: output_folder.to_string_lossy().to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_form_defaults_and_mood_check() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let view = view_for("http://127.0.0.1:5000", temp_dir.path())?;
        assert_eq!(view.theme(), "adventure");
        assert_eq!(view.duration(), "3");
        assert_eq!(view.checked_moods(), vec!["calm".to_string()]);

        view.form.borrow_mut().moods.clear();
        view.check_mood("calm");
        view.check_mood("calm");
        assert_eq!(view.checked_moods(), vec!["calm".to_string()]);
        Ok(())
    }

    #[test]
    fn test_previous_moods_are_prechecked() {
        let calm = MOODS.iter().position(|m| *m == "calm");
        assert_eq!(
            checked_mood_indices(&FormState::default().moods),
            calm.into_iter().collect::<Vec<_>>()
        );

        let chosen = vec![MOODS[2].to_string(), MOODS[0].to_string(), "unknown".to_string()];
        assert_eq!(checked_mood_indices(&chosen), vec![0, 2]);
        assert!(checked_mood_indices(&[]).is_empty());
    }

    #[test]
    fn test_relative_audio_url_uses_base() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let view = view_for("http://127.0.0.1:5000", temp_dir.path())?;
        assert_eq!(
            view.resolve("/static/audio/generated/story_1.mp3")?.as_str(),
            "http://127.0.0.1:5000/static/audio/generated/story_1.mp3"
        );
        assert_eq!(
            view.resolve("https://cdn.example.com/a.mp3")?.as_str(),
            "https://cdn.example.com/a.mp3"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_save_audio_writes_file() -> Result<()> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let mut request = Vec::new();
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let body = b"ID3fake-mp3";
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: audio/mpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        let temp_dir = tempfile::tempdir()?;
        let output = temp_dir.path().join("output");
        let view = view_for(&base_url, &output)?;
        view.save_audio("/audio/1.mp3", "narrate-ai-story-1.mp3").await?;

        let saved = std::fs::read(output.join("narrate-ai-story-1.mp3"))?;
        assert_eq!(saved, b"ID3fake-mp3");
        assert!(server.await?.starts_with("GET /audio/1.mp3 "));
        Ok(())
    }
}
