//! Locator inference from one picked element
//!
//! Strategies, first success wins:
//!
//! 1. **Shared class**: the first class of the element (attribute order)
//!    carried by more than one element in the document.
//! 2. **Sibling tag**: the parent has more than one child with the element's
//!    tag; scoped to the parent's id when it has one.
//! 3. **Fallback**: every element of the tag in the document. Known to be
//!    imprecise, so it is flagged for the operator.

use crate::driver::{ElementProfile, PageDriver};
use crate::locator::Locator;
use crate::selection::SelectionError;
use crate::HarvestError;
use std::fmt;

/// Which strategy produced an inferred locator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InferenceStrategy {
    SharedClass,
    SiblingTag,
    /// Least precise result; may overmatch same-tag elements elsewhere
    Fallback,
}

impl fmt::Display for InferenceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SharedClass => "shared-class",
            Self::SiblingTag => "sibling-tag",
            Self::Fallback => "fallback",
        };
        write!(f, "{}", name)
    }
}

/// Result of locator inference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inference {
    pub locator: Locator,
    pub strategy: InferenceStrategy,
}

impl Inference {
    /// True when the imprecise tag fallback was used
    pub fn is_fallback(&self) -> bool {
        self.strategy == InferenceStrategy::Fallback
    }
}

/// Infers a locator matching the homogeneous set `element` belongs to
///
/// # Arguments
///
/// * `driver` - Driver holding the page the element was picked on
/// * `element` - The picked element; `None` when the user picked nothing
///
/// # Returns
///
/// * `Ok(Inference)` - The locator and the strategy that produced it
/// * `Err(HarvestError::Selection(NoElementSelected))` - Nothing was picked
/// * `Err(HarvestError::Driver(_))` - The element could not be inspected
///
/// A failing class count is treated as "not shared" unless the driver
/// reports a fatal error.
pub async fn infer<D: PageDriver>(
    driver: &D,
    element: Option<&D::Element>,
) -> Result<Inference, HarvestError> {
    let element = element.ok_or(SelectionError::NoElementSelected)?;
    let profile = driver.profile(element).await?;

    for class in &profile.classes {
        if class.is_empty() {
            continue;
        }

        let count = match driver.count_class(class).await {
            Ok(count) => count,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                tracing::debug!(class = %class, "Class count failed: {}", e);
                0
            }
        };

        if count > 1 {
            tracing::debug!(class = %class, matches = count, "Inferred shared-class locator");
            return Ok(Inference {
                locator: Locator::Class(class.clone()),
                strategy: InferenceStrategy::SharedClass,
            });
        }
    }

    let inference = structural_inference(&profile);
    if inference.is_fallback() {
        tracing::warn!(
            tag = %profile.tag,
            locator = %inference.locator,
            "No shared class or sibling tag found; falling back to every <{}> on the page",
            profile.tag
        );
    }
    Ok(inference)
}

/// Sibling-tag strategy with the tag fallback, from an element profile alone
pub fn structural_inference(profile: &ElementProfile) -> Inference {
    let tag = profile.tag.clone();

    if let Some(parent) = &profile.parent {
        if parent.same_tag_children > 1 {
            let locator = match &parent.id {
                Some(id) if !id.is_empty() => Locator::ScopedTag {
                    scope_id: id.clone(),
                    tag,
                },
                _ => Locator::Tag(tag),
            };
            return Inference {
                locator,
                strategy: InferenceStrategy::SiblingTag,
            };
        }
    }

    Inference {
        locator: Locator::Tag(tag),
        strategy: InferenceStrategy::Fallback,
    }
}
