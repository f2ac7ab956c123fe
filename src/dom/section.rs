use super::{element_text, extract_card, CardRecord, CompiledSelectors};
use scraper::{ElementRef, Html};

/// A heading and the card elements of the first card group after it.
#[derive(Debug)]
pub struct RawSection<'a> {
    pub heading: String,
    pub cards: Vec<ElementRef<'a>>,
}

/// A heading and the valid cards listed under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub cards: Vec<CardRecord>,
}

/// Pairs every heading with the cards of the first card group that follows
/// it among its siblings.
///
/// The scan for a heading stops at the first card group or at the next
/// heading, whichever comes first. Headings without a card group, or whose
/// group holds no cards, produce nothing.
pub fn locate_sections<'a>(
    document: &'a Html,
    selectors: &CompiledSelectors,
) -> Vec<RawSection<'a>> {
    let mut sections = Vec::new();

    for heading in document.select(&selectors.heading) {
        let group = heading
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .take_while(|sibling| !selectors.heading.matches(sibling))
            .find(|sibling| selectors.card_group.matches(sibling));

        let Some(group) = group else {
            continue;
        };

        let cards: Vec<_> = group.select(&selectors.card).collect();
        if cards.is_empty() {
            continue;
        }

        sections.push(RawSection {
            heading: element_text(heading),
            cards,
        });
    }

    sections
}

/// Parses `markup` into sections of valid cards, dropping sections left
/// empty once invalid cards are removed.
pub fn parse_sections(markup: &str, selectors: &CompiledSelectors) -> Vec<Section> {
    let document = Html::parse_document(markup);

    locate_sections(&document, selectors)
        .into_iter()
        .filter_map(|raw| {
            let cards: Vec<_> = raw
                .cards
                .into_iter()
                .filter_map(|card| extract_card(card, selectors))
                .collect();
            (!cards.is_empty()).then_some(Section {
                heading: raw.heading,
                cards,
            })
        })
        .collect()
}
