use super::{closest, element_text, CompiledSelectors};
use crate::model::ResourceStatus;
use scraper::ElementRef;

/// Flat record read off one card element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRecord {
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub fqdn: Option<String>,
    pub status: ResourceStatus,
    pub tags: Vec<String>,
}

/// Reads a card, or `None` when it has no title or no link.
pub fn extract_card(card: ElementRef<'_>, selectors: &CompiledSelectors) -> Option<CardRecord> {
    let name = card
        .select(&selectors.card_title)
        .next()
        .map(element_text)
        .filter(|name| !name.is_empty())?;

    let url = closest(card, &selectors.card_link)
        .or_else(|| card.select(&selectors.card_link).next())
        .and_then(|link| link.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())?
        .to_string();

    let mut descriptions = card.select(&selectors.card_description).map(element_text);
    let description = descriptions.next();
    let fqdn = descriptions.next();

    let status = card
        .select(&selectors.status_badge)
        .next()
        .map(|badge| ResourceStatus::from_classes(badge.value().classes()))
        .unwrap_or_default();

    Some(CardRecord {
        name,
        url,
        description,
        fqdn,
        status,
        tags: tags_near(card, selectors),
    })
}

// Tags live beside the card, inside the nearest inline wrapper around it.
fn tags_near(card: ElementRef<'_>, selectors: &CompiledSelectors) -> Vec<String> {
    let Some(group) = card
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| selectors.tag_group.matches(ancestor))
    else {
        return Vec::new();
    };

    group
        .select(&selectors.tag)
        .map(element_text)
        .filter(|tag| !tag.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::PageSelectors;
    use scraper::Html;

    fn selectors() -> CompiledSelectors {
        CompiledSelectors::compile(&PageSelectors::default()).unwrap()
    }

    fn first_card(markup: &str) -> Option<CardRecord> {
        let document = Html::parse_document(markup);
        let selectors = selectors();
        let card = document.select(&selectors.card).next()?;
        extract_card(card, &selectors)
    }

    #[test]
    fn test_card_inside_link() {
        let record = first_card(
            r#"<span>
                <a href="/application/w1">
                  <div class="box">
                    <div class="box-title"> web </div>
                    <div class="box-description">Frontend</div>
                    <div class="box-description">https://web.example.com</div>
                    <div class="badge badge-success"></div>
                  </div>
                </a>
                <div class="tag"> prod </div><div class="tag"></div><div class="tag">eu</div>
              </span>"#,
        )
        .unwrap();

        assert_eq!(record.name, "web");
        assert_eq!(record.url, "/application/w1");
        assert_eq!(record.description.as_deref(), Some("Frontend"));
        assert_eq!(record.fqdn.as_deref(), Some("https://web.example.com"));
        assert_eq!(record.status, ResourceStatus::Running);
        assert_eq!(record.tags, vec!["prod", "eu"]);
    }

    #[test]
    fn test_card_is_the_link() {
        let record = first_card(
            r#"<a class="box" href="/database/d1"><div class="box-title">db</div>
               <div class="badge badge-error"></div></a>"#,
        )
        .unwrap();
        assert_eq!(record.url, "/database/d1");
        assert_eq!(record.status, ResourceStatus::Exited);
        assert!(record.tags.is_empty());
        assert!(record.description.is_none());
        assert!(record.fqdn.is_none());
    }

    #[test]
    fn test_nested_link_used_without_enclosing_link() {
        let record = first_card(
            r#"<div class="box"><div class="box-title">svc</div>
               <a href="/service/s1">open</a><div class="badge"></div></div>"#,
        )
        .unwrap();
        assert_eq!(record.url, "/service/s1");
        assert_eq!(record.status, ResourceStatus::Unknown);
    }

    #[test]
    fn test_card_without_name_or_url_is_dropped() {
        let untitled = r#"<a href="/x"><div class="box"><p>no title</p></div></a>"#;
        assert!(first_card(untitled).is_none());
        let unlinked = r#"<div class="box"><div class="box-title">orphan</div></div>"#;
        assert!(first_card(unlinked).is_none());
        assert!(
            first_card(r#"<a href=" "><div class="box"><div class="box-title">x</div></div></a>"#)
                .is_none()
        );
        assert!(first_card(
            r#"<a href="/x"><div class="box"><div class="box-title">  </div></div></a>"#
        )
        .is_none());
    }

    #[test]
    fn test_warning_badge() {
        let record = first_card(
            r#"<a href="/x"><div class="box"><div class="box-title">x</div>
               <span class="badge badge-warning"></span></div></a>"#,
        )
        .unwrap();
        assert_eq!(record.status, ResourceStatus::Warning);
    }
}
