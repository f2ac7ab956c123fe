//! Declarative form reading.
//!
//! Each category describes its form as a table of [`FieldSpec`]s grouped into
//! [`FormSection`]s. Values are taken from the live [`FieldState`] the
//! browser reports for each field: a field that is absent reads as `null`, a
//! field that is present but cannot be coerced to its declared kind reads as
//! `null` and leaves a note. Neither stops the remaining fields from being
//! read.

use super::element_text;
use crate::traits::FieldState;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single-line input, trimmed.
    Text,
    /// Textarea content kept verbatim.
    Multiline,
    Checkbox,
    Select,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldKind::Text => "text",
            FieldKind::Multiline => "multiline",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Select => "select",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub label: &'static str,
    /// CSS selector; comma-separated lists match engine-specific variants.
    pub selector: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn text(label: &'static str, selector: &'static str) -> Self {
        Self::new(label, selector, FieldKind::Text)
    }

    pub const fn multiline(label: &'static str, selector: &'static str) -> Self {
        Self::new(label, selector, FieldKind::Multiline)
    }

    pub const fn checkbox(label: &'static str, selector: &'static str) -> Self {
        Self::new(label, selector, FieldKind::Checkbox)
    }

    pub const fn select(label: &'static str, selector: &'static str) -> Self {
        Self::new(label, selector, FieldKind::Select)
    }

    const fn new(label: &'static str, selector: &'static str, kind: FieldKind) -> Self {
        Self {
            label,
            selector,
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FormSection {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl FormSection {
    pub const fn new(name: &'static str, fields: &'static [FieldSpec]) -> Self {
        Self { name, fields }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
}

pub type FieldValues = BTreeMap<String, Option<FieldValue>>;

#[derive(Error, Debug)]
pub enum FieldError {
    #[error("expected a {expected} control, found <{tag}>")]
    KindMismatch { expected: FieldKind, tag: String },
    #[error("could not be read: {0}")]
    Unreadable(String),
}

#[derive(Debug, Default)]
pub struct FormReadout {
    sections: BTreeMap<&'static str, FieldValues>,
    pub notes: Vec<String>,
}

impl FormReadout {
    /// Records the outcome of reading `field`; an error becomes `null` plus
    /// a note.
    pub fn insert(
        &mut self,
        section: &'static str,
        field: &FieldSpec,
        read: Result<Option<FieldValue>, FieldError>,
    ) {
        let value = match read {
            Ok(value) => value,
            Err(e) => {
                self.notes.push(format!("{}.{}: {}", section, field.label, e));
                None
            }
        };
        self.sections
            .entry(section)
            .or_default()
            .insert(field.label.to_string(), value);
    }

    /// Removes and returns the values read for `section`.
    pub fn take(&mut self, section: &str) -> FieldValues {
        self.sections.remove(section).unwrap_or_default()
    }
}

/// Coerces a control's live state to the declared kind.
pub fn coerce(state: &FieldState, kind: FieldKind) -> Result<FieldValue, FieldError> {
    match (kind, state.tag.as_str()) {
        (FieldKind::Checkbox, "input") => Ok(FieldValue::Flag(state.checked)),
        (FieldKind::Select | FieldKind::Text, "select")
        | (FieldKind::Text, "input" | "textarea") => {
            Ok(FieldValue::Text(state.value.trim().to_string()))
        }
        (FieldKind::Multiline, "textarea" | "input") => Ok(FieldValue::Text(state.value.clone())),
        (expected, tag) => Err(FieldError::KindMismatch {
            expected,
            tag: tag.to_string(),
        }),
    }
}

/// State of `element` as written in the markup, before any script ran.
pub fn markup_state(element: ElementRef<'_>) -> FieldState {
    let node = element.value();
    let tag = node.name().to_string();
    let value = match tag.as_str() {
        "input" => node.attr("value").unwrap_or_default().to_string(),
        "select" => selected_option(element),
        _ => element.text().collect(),
    };
    FieldState {
        checked: node.attr("checked").is_some(),
        tag,
        value,
    }
}

// Browsers show the first option when none is marked selected.
fn selected_option(select: ElementRef<'_>) -> String {
    let options: Vec<ElementRef<'_>> = select
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| element.value().name() == "option")
        .collect();
    options
        .iter()
        .find(|option| option.value().attr("selected").is_some())
        .or_else(|| options.first())
        .map(|option| match option.value().attr("value") {
            Some(value) => value.to_string(),
            None => element_text(*option),
        })
        .unwrap_or_default()
}
