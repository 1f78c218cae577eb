use anyhow::Result;
use inquire::Select;
use narrate_ai::core::config::Config;
use narrate_ai::services::api::HttpStoryApi;
use narrate_ai::services::controller::{StoryController, UiAction};
use narrate_ai::ui::terminal::TerminalView;
use std::rc::Rc;

const CONFIG_PATH: &str = "config.yml";

const MENU_DOWNLOAD: &str = "Download audio";
const MENU_REGENERATE: &str = "Regenerate";
const MENU_EDIT: &str = "Edit story settings";
const MENU_QUIT: &str = "Quit";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = Config::load_or_default(CONFIG_PATH)?;
    config.ensure_directories()?;

    // The controller is single-threaded; its background timers need a LocalSet.
    let local = tokio::task::LocalSet::new();
    local.run_until(run(config)).await
}

async fn run(config: Config) -> Result<()> {
    let view = Rc::new(TerminalView::new(&config)?);
    let api = HttpStoryApi::new(&config)?;
    let controller = StoryController::new(config, Box::new(api), view.clone());

    view.prompt_form()?;
    controller.dispatch(UiAction::MoodsChanged);

    let mut next = Some(UiAction::Generate);
    while let Some(action) = next.take() {
        if let Some(task) = controller.dispatch(action) {
            task.await;
        }

        let choice = Select::new(
            "What next?",
            vec![MENU_DOWNLOAD, MENU_REGENERATE, MENU_EDIT, MENU_QUIT],
        )
        .prompt()?;

        next = match choice {
            MENU_DOWNLOAD => Some(UiAction::Download),
            MENU_REGENERATE => Some(UiAction::Regenerate),
            MENU_EDIT => {
                view.prompt_form()?;
                controller.dispatch(UiAction::MoodsChanged);
                Some(UiAction::Generate)
            }
            _ => None,
        };
    }

    Ok(())
}
