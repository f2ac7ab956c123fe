//! Structural parsing of rendered console pages.
//!
//! Everything in here is synchronous and works on a parsed [`Html`] snapshot
//! taken from [`Browser::content`](crate::traits::Browser::content). The
//! parsed tree never crosses an `.await`; callers hand in markup and get
//! owned records back. Form values are the exception: they are read live
//! and only coerced here.
//!
//! - [`section`] splits a page into heading-delimited card groups
//! - [`card`] turns one card element into a flat record
//! - [`form`] reads declared form fields with type-aware coercion

pub mod card;
pub mod form;
pub mod section;

use crate::traits::Locator;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use card::{extract_card, CardRecord};
pub use form::{
    coerce, markup_state, FieldError, FieldKind, FieldSpec, FieldValue, FieldValues, FormReadout,
    FormSection,
};
pub use section::{locate_sections, parse_sections, RawSection, Section};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid selector `{selector}`: {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

pub fn compile(selector: &str) -> Result<Selector, SelectorError> {
    Selector::parse(selector).map_err(|e| SelectorError {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Every selector and locator the harvester relies on.
///
/// Defaults match the stock console markup; a JSON file can override any
/// subset of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSelectors {
    pub login_path: String,
    pub login_identity: Locator,
    pub login_secret: Locator,
    pub login_submit: Locator,

    pub projects_path: String,
    pub project_card: String,

    pub heading: String,
    pub card_group: String,
    pub card: String,
    pub card_title: String,
    pub card_description: String,
    pub card_link: String,
    pub status_badge: String,
    pub tag_group: String,
    pub tag: String,

    pub page_title: String,
    pub env_menu_link: Locator,
    pub env_developer_toggle: Locator,
    pub env_editor: Locator,
    pub compose_button: Locator,
    pub compose_editor: Locator,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            login_identity: Locator::css("input[name='email']"),
            login_secret: Locator::css("input[name='password']"),
            login_submit: Locator::css("button[type='submit']"),

            projects_path: "/projects".to_string(),
            project_card: ".box".to_string(),

            heading: "h2".to_string(),
            card_group: "div.grid".to_string(),
            card: ".box".to_string(),
            card_title: ".box-title".to_string(),
            card_description: ".box-description".to_string(),
            card_link: "a[href]".to_string(),
            status_badge: ".badge".to_string(),
            tag_group: "span".to_string(),
            tag: ".tag".to_string(),

            page_title: "h1".to_string(),
            env_menu_link: Locator::css("a[href$='/environment-variables']"),
            env_developer_toggle: Locator::with_text("button", "Developer view"),
            env_editor: Locator::css("textarea"),
            compose_button: Locator::with_text("button", "Edit Compose File"),
            compose_editor: Locator::css("dialog textarea, .modal textarea"),
        }
    }
}

/// Pre-parsed document selectors used by the section and card parsers.
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    pub project_card: Selector,
    pub heading: Selector,
    pub card_group: Selector,
    pub card: Selector,
    pub card_title: Selector,
    pub card_description: Selector,
    pub card_link: Selector,
    pub status_badge: Selector,
    pub tag_group: Selector,
    pub tag: Selector,
    pub page_title: Selector,
}

impl CompiledSelectors {
    pub fn compile(selectors: &PageSelectors) -> Result<Self, SelectorError> {
        Ok(Self {
            project_card: compile(&selectors.project_card)?,
            heading: compile(&selectors.heading)?,
            card_group: compile(&selectors.card_group)?,
            card: compile(&selectors.card)?,
            card_title: compile(&selectors.card_title)?,
            card_description: compile(&selectors.card_description)?,
            card_link: compile(&selectors.card_link)?,
            status_badge: compile(&selectors.status_badge)?,
            tag_group: compile(&selectors.tag_group)?,
            tag: compile(&selectors.tag)?,
            page_title: compile(&selectors.page_title)?,
        })
    }
}

/// Trimmed text content of an element.
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Whitespace-collapsed text, used when matching labels.
fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The element itself or its nearest ancestor matching `selector`.
pub fn closest<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .find(|candidate| selector.matches(candidate))
}

/// First element in `document` addressed by `locator`.
pub fn locate<'a>(
    document: &'a Html,
    locator: &Locator,
) -> Result<Option<ElementRef<'a>>, SelectorError> {
    let selector = compile(locator.selector())?;
    let mut matches = document.select(&selector);
    Ok(match locator.text() {
        None => matches.next(),
        Some(text) => matches.find(|element| collapsed_text(*element).contains(text)),
    })
}

/// Whether `locator` addresses anything in `markup`.
pub fn contains(markup: &str, locator: &Locator) -> Result<bool, SelectorError> {
    let document = Html::parse_document(markup);
    Ok(locate(&document, locator)?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_selectors_compile() {
        assert!(CompiledSelectors::compile(&PageSelectors::default()).is_ok());
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let selectors = PageSelectors {
            card: "div[".to_string(),
            ..Default::default()
        };
        let err = CompiledSelectors::compile(&selectors).unwrap_err();
        assert_eq!(err.selector, "div[");
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let selectors: PageSelectors =
            serde_json::from_str(r#"{"heading": "h3", "env_editor": "textarea#vars"}"#).unwrap();
        assert_eq!(selectors.heading, "h3");
        assert_eq!(selectors.env_editor, Locator::css("textarea#vars"));
        assert_eq!(selectors.card, PageSelectors::default().card);
    }

    #[test]
    fn test_locate_by_text() {
        let document = Html::parse_document(
            r#"<div><button>Normal view</button><button>
                Developer   view
            </button></div>"#,
        );
        let toggle = locate(&document, &Locator::with_text("button", "Developer view"))
            .unwrap()
            .unwrap();
        assert_eq!(element_text(toggle).split_whitespace().count(), 2);
        assert!(locate(&document, &Locator::with_text("button", "Raw"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_closest_includes_self() {
        let document = Html::parse_document(r#"<a href="/x" class="box"><span>t</span></a>"#);
        let link = compile("a[href]").unwrap();
        let card = document.select(&compile(".box").unwrap()).next().unwrap();
        assert_eq!(
            closest(card, &link).and_then(|a| a.value().attr("href")),
            Some("/x")
        );
    }
}
