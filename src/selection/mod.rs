//! Field selection session
//!
//! Builds the ordered set of `(label, locator)` pairs the crawler extracts,
//! and the optional next-page locator, by repeatedly asking a [`Prompter`]
//! for an element and generalizing it with [`infer`].

mod prompt;

pub use prompt::{Prompter, ScriptedPrompter, SelectionTarget, TerminalPrompter};

use crate::driver::PageDriver;
use crate::locator::{infer, InferenceStrategy, Locator};
use crate::HarvestError;
use thiserror::Error;

/// Errors raised while building the field set
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("No element was selected")]
    NoElementSelected,

    #[error("Duplicate field label: {0}")]
    DuplicateLabel(String),

    #[error("Field label must not be empty")]
    EmptyLabel,
}

/// One extracted field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub label: String,
    pub locator: Locator,
    /// Strategy that produced `locator`
    pub strategy: InferenceStrategy,
}

/// Ordered set of fields with unique, non-empty labels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    fields: Vec<FieldSpec>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, keeping selection order
    ///
    /// The label is trimmed. Empty and duplicate labels are rejected and
    /// leave the set unchanged.
    pub fn insert(&mut self, mut spec: FieldSpec) -> Result<(), SelectionError> {
        spec.label = spec.label.trim().to_string();
        if spec.label.is_empty() {
            return Err(SelectionError::EmptyLabel);
        }
        if self.get(&spec.label).is_some() {
            return Err(SelectionError::DuplicateLabel(spec.label));
        }
        self.fields.push(spec);
        Ok(())
    }

    pub fn get(&self, label: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.label == label)
    }

    /// Labels in selection order; this is the export column order
    pub fn labels(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.label.clone()).collect()
    }

    /// Labels whose locator came from the imprecise tag fallback
    pub fn fallback_labels(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.strategy == InferenceStrategy::Fallback)
            .map(|f| f.label.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Consecutive failed picks after which field selection ends
const MAX_SELECTION_FAILURES: usize = 3;

/// Collects fields until the prompter signals completion
///
/// A pick that cannot be resolved or profiled is skipped; only fatal driver
/// errors end selection with an error. Ending with zero fields is allowed.
pub async fn select_fields<D, P>(driver: &D, prompter: &mut P) -> Result<FieldSet, HarvestError>
where
    D: PageDriver,
    P: Prompter<D>,
{
    let mut fields = FieldSet::new();
    let mut failures = 0;

    loop {
        let element = match prompter
            .request_selection(driver, SelectionTarget::Field)
            .await
        {
            Ok(Some(element)) => element,
            Ok(None) => break,
            Err(HarvestError::Driver(e)) if !e.is_fatal() => {
                failures += 1;
                tracing::warn!(attempt = failures, "Selection failed, pick skipped: {}", e);
                if failures >= MAX_SELECTION_FAILURES {
                    tracing::warn!("Giving up on field selection after repeated failures");
                    break;
                }
                continue;
            }
            Err(e) => return Err(e),
        };
        failures = 0;

        let inference = match infer(driver, Some(&element)).await {
            Ok(inference) => inference,
            Err(HarvestError::Driver(e)) if !e.is_fatal() => {
                tracing::warn!("Could not inspect the selected element: {}", e);
                continue;
            }
            Err(e) => return Err(e),
        };

        let label = match prompter.request_label().await? {
            Some(label) => label,
            None => break,
        };

        let spec = FieldSpec {
            label: label.clone(),
            locator: inference.locator.clone(),
            strategy: inference.strategy,
        };

        match fields.insert(spec) {
            Ok(()) => tracing::info!(
                label = %label.trim(),
                locator = %inference.locator,
                strategy = %inference.strategy,
                "Field added"
            ),
            Err(e) => tracing::warn!("Selection discarded: {}", e),
        }
    }

    tracing::info!(fields = fields.len(), "Field selection finished");
    Ok(fields)
}

/// Asks once for the next-page control
///
/// Returns `None` (single-page mode) when the user declines or the
/// element cannot be profiled.
pub async fn select_next_page<D, P>(
    driver: &D,
    prompter: &mut P,
) -> Result<Option<Locator>, HarvestError>
where
    D: PageDriver,
    P: Prompter<D>,
{
    let element = match prompter
        .request_selection(driver, SelectionTarget::NextPage)
        .await
    {
        Ok(element) => element,
        Err(HarvestError::Driver(e)) if !e.is_fatal() => {
            tracing::warn!("Next-page selection failed, single-page mode: {}", e);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let inference = match infer(driver, element.as_ref()).await {
        Ok(inference) => inference,
        Err(HarvestError::Selection(SelectionError::NoElementSelected)) => {
            tracing::info!("No next-page control selected, single-page mode");
            return Ok(None);
        }
        Err(HarvestError::Driver(e)) if !e.is_fatal() => {
            tracing::warn!("Could not inspect the next-page control, single-page mode: {}", e);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    tracing::info!(locator = %inference.locator, "Next-page control selected");
    Ok(Some(inference.locator))
}
