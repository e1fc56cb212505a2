// UI layer: the interactive mint form built on `dialoguer`, a spinner
// from `indicatif` as status indicator and the system clipboard.
// Everything here is a thin shell around `form` and `pipeline`.

use crate::api::ApiClient;
use crate::config::Preferences;
use crate::form::{Field, FormState, SubmissionInput};
use crate::pipeline::{Clipboard, Orchestrator, Stage, Status, StatusIndicator};
use anyhow::Result;
use crossterm::style::{style, Stylize};
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "file-picker")]
const FILE_PROMPT: &str = "File (leave empty to browse)";
#[cfg(not(feature = "file-picker"))]
const FILE_PROMPT: &str = "File";

/// Main interactive menu. Loops until the user chooses "Exit".
pub fn main_menu(orchestrator: &Orchestrator<ApiClient>, prefs: &Preferences) -> Result<()> {
    let mut form = FormState::default();
    let mut clipboard = SystemClipboard::default();
    loop {
        let items = vec!["Mint NFT", "Exit"];
        let selection = Select::new()
            .with_prompt(Stage::Idle.title())
            .items(&items)
            .default(0)
            .interact()?;
        match selection {
            0 => handle_mint(orchestrator, prefs, &mut form, &mut clipboard)?,
            _ => break,
        }
    }
    Ok(())
}

/// Collect a submission and run it through the orchestrator. Failures are
/// shown by the spinner and do not end the session.
fn handle_mint(
    orchestrator: &Orchestrator<ApiClient>,
    prefs: &Preferences,
    form: &mut FormState,
    clipboard: &mut SystemClipboard,
) -> Result<()> {
    let input = collect_submission(form)?;

    if !form.begin_submit() {
        println!("A submission is already in progress.");
        return Ok(());
    }
    let mut status = SpinnerStatus::new();
    let result = orchestrator.run(&input, &mut status, clipboard);
    form.end_submit();

    if let Ok(outcome) = result {
        println!("Marketplace: {}", outcome.link);
        if let Some(link) = prefs.gateway_link(&outcome.image_hash) {
            println!("Image: {}", link);
        }
    }
    Ok(())
}

/// Prompt every field. Empty text fields get an inline error but do not
/// stop the submission; only a missing file does, in the orchestrator.
fn collect_submission(form: &mut FormState) -> Result<SubmissionInput> {
    let mut input = SubmissionInput {
        file: prompt_file()?,
        ..Default::default()
    };
    for field in Field::ALL {
        let value: String = Input::new()
            .with_prompt(format!("{} ({})", field.title(), field.placeholder()))
            .allow_empty(true)
            .interact_text()?;
        if let Some(err) = form.errors.blur(field, &value) {
            println!("  {}", style(err).red());
        }
        input.set(field, value);
    }
    Ok(input)
}

fn prompt_file() -> Result<Option<PathBuf>> {
    let path: String = Input::new()
        .with_prompt(FILE_PROMPT)
        .allow_empty(true)
        .interact_text()?;
    let path = path.trim();
    if !path.is_empty() {
        return Ok(Some(PathBuf::from(path)));
    }
    Ok(pick_file())
}

#[cfg(feature = "file-picker")]
fn pick_file() -> Option<PathBuf> {
    rfd::FileDialog::new().set_title("Select a file").pick_file()
}

#[cfg(not(feature = "file-picker"))]
fn pick_file() -> Option<PathBuf> {
    None
}

/// Spinner showing the current stage; finished in green or red once the
/// run ends.
struct SpinnerStatus {
    bar: ProgressBar,
}

impl SpinnerStatus {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        SpinnerStatus { bar }
    }
}

impl StatusIndicator for SpinnerStatus {
    fn update(&mut self, status: &Status) {
        let text = match &status.message {
            Some(message) => format!("{} {}", status.title, message),
            None => status.title.clone(),
        };
        match status.stage {
            Stage::Success => self.bar.finish_with_message(style(text).green().to_string()),
            Stage::Failed => self.bar.finish_with_message(style(text).red().to_string()),
            _ => self.bar.set_message(text),
        }
    }
}

/// System clipboard. The handle is opened on first use and kept for the
/// session, since on X11 the contents only live as long as it does.
#[derive(Default)]
struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl Clipboard for SystemClipboard {
    fn copy(&mut self, text: &str) -> Result<()> {
        let clipboard = match &mut self.inner {
            Some(clipboard) => clipboard,
            slot @ None => slot.insert(arboard::Clipboard::new()?),
        };
        clipboard.set_text(text.to_string())?;
        Ok(())
    }
}
