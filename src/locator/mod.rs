//! Locator expressions and their inference from a single picked element
//!
//! A [`Locator`] is an immutable, serializable query that can be re-evaluated
//! against any later page to yield the matching elements in document order.
//! [`infer`] derives one from a single concrete element so that it matches
//! every homogeneous sibling of a repeated list.

mod inference;

pub use inference::{infer, structural_inference, Inference, InferenceStrategy};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A re-evaluable query identifying zero or more DOM elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Locator {
    /// All elements carrying the class token
    Class(String),

    /// All elements of `tag` below the element whose id is `scope_id`
    ScopedTag { scope_id: String, tag: String },

    /// All elements of `tag` in the document
    Tag(String),
}

impl Locator {
    /// Renders the locator as an XPath expression
    ///
    /// Class matching is whole-token: `item` does not match `items-list`.
    pub fn to_xpath(&self) -> String {
        match self {
            Self::Class(class) => format!(
                "//*[contains(concat(' ', normalize-space(@class), ' '), {})]",
                xpath_literal(&format!(" {} ", class))
            ),
            Self::ScopedTag { scope_id, tag } => {
                format!("//*[@id={}]//{}", xpath_literal(scope_id), tag)
            }
            Self::Tag(tag) => format!("//{}", tag),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_xpath())
    }
}

/// Quotes a string as an XPath 1.0 literal
///
/// XPath has no escape sequences, so a value holding both quote kinds is
/// assembled with `concat()`.
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }

    let parts: Vec<String> = value
        .split('\'')
        .map(|part| format!("'{}'", part))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}
