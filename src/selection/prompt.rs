//! Prompting collaborators
//!
//! A [`Prompter`] supplies the elements and labels the selection session
//! turns into fields. [`TerminalPrompter`] asks a person to click in the
//! browser window; [`ScriptedPrompter`] replays picks from the config file.

use crate::config::{AnchorPick, Config, FieldPick};
use crate::driver::PageDriver;
use crate::HarvestError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// What the user is being asked to pick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTarget {
    /// One example element of a data field
    Field,
    /// The control that opens the next page
    NextPage,
}

/// Source of element picks and labels
#[async_trait]
pub trait Prompter<D: PageDriver>: Send {
    /// Lets the user pick one element
    ///
    /// `None` ends field collection, or declines the next-page control.
    async fn request_selection(
        &mut self,
        driver: &D,
        target: SelectionTarget,
    ) -> Result<Option<D::Element>, HarvestError>;

    /// Label for the element picked last; `None` ends field collection
    async fn request_label(&mut self) -> Result<Option<String>, HarvestError>;
}

/// Interactive prompter over stdin and the browser window
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }
}

/// Prints `prompt` and reads one line on a blocking thread; `None` on EOF
async fn read_line(prompt: String) -> io::Result<Option<String>> {
    tokio::task::spawn_blocking(move || {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        Ok((read > 0).then(|| line.trim().to_string()))
    })
    .await
    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}

#[async_trait]
impl<D: PageDriver> Prompter<D> for TerminalPrompter {
    async fn request_selection(
        &mut self,
        driver: &D,
        target: SelectionTarget,
    ) -> Result<Option<D::Element>, HarvestError> {
        let prompt = match target {
            SelectionTarget::Field => {
                println!("\nClick an example of the data you want, then press Enter.");
                println!("Type 'done' and press Enter when all fields are selected.");
                "Field> "
            }
            SelectionTarget::NextPage => {
                println!("\nClick the 'next page' button, then press Enter.");
                println!("Press Enter without clicking to scrape a single page.");
                "Next page> "
            }
        };

        loop {
            driver.arm_selection().await?;

            let line = read_line(prompt.to_string()).await?;
            let finished = match &line {
                None => true,
                Some(input) => {
                    target == SelectionTarget::Field && input.eq_ignore_ascii_case("done")
                }
            };

            // Always read back, which also disarms the click hooks
            let selected = driver.take_selection().await?;
            if finished {
                return Ok(None);
            }

            match (selected, target) {
                (Some(element), _) => return Ok(Some(element)),
                (None, SelectionTarget::NextPage) => return Ok(None),
                (None, SelectionTarget::Field) => {
                    println!("Nothing selected. Click an element first.");
                }
            }
        }
    }

    async fn request_label(&mut self) -> Result<Option<String>, HarvestError> {
        loop {
            let line = read_line("Label for this field: ".to_string()).await?;
            match line {
                None => return Ok(None),
                Some(label) if label.eq_ignore_ascii_case("done") => return Ok(None),
                Some(label) if label.is_empty() => println!("The label cannot be empty."),
                Some(label) => return Ok(Some(label)),
            }
        }
    }
}

/// Unattended prompter replaying `[[field]]` and `[next-page]` picks
///
/// Each anchor is a CSS selector whose first match stands in for the
/// element the user would have clicked.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompter {
    fields: VecDeque<FieldPick>,
    next_page: Option<AnchorPick>,
    pending_label: Option<String>,
}

impl ScriptedPrompter {
    pub fn new(fields: Vec<FieldPick>, next_page: Option<AnchorPick>) -> Self {
        Self {
            fields: fields.into(),
            next_page,
            pending_label: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.fields.clone(), config.next_page.clone())
    }
}

#[async_trait]
impl<D: PageDriver> Prompter<D> for ScriptedPrompter {
    async fn request_selection(
        &mut self,
        driver: &D,
        target: SelectionTarget,
    ) -> Result<Option<D::Element>, HarvestError> {
        match target {
            SelectionTarget::Field => {
                while let Some(pick) = self.fields.pop_front() {
                    match driver.first_match(&pick.anchor).await? {
                        Some(element) => {
                            self.pending_label = Some(pick.label);
                            return Ok(Some(element));
                        }
                        None => tracing::warn!(
                            label = %pick.label,
                            anchor = %pick.anchor,
                            "Anchor matched nothing, field skipped"
                        ),
                    }
                }
                Ok(None)
            }
            SelectionTarget::NextPage => {
                let pick = match self.next_page.take() {
                    Some(pick) => pick,
                    None => return Ok(None),
                };
                let element = driver.first_match(&pick.anchor).await?;
                if element.is_none() {
                    tracing::warn!(anchor = %pick.anchor, "Next-page anchor matched nothing");
                }
                Ok(element)
            }
        }
    }

    async fn request_label(&mut self) -> Result<Option<String>, HarvestError> {
        Ok(self.pending_label.take())
    }
}
