//! Environment-variable sub-flow shared by every category.
//!
//! From a resource's detail page: follow the environment-variables menu
//! link, switch the editor into developer view, wait for it and read its
//! text. The link and toggle each get a short bounded wait to render; only
//! when that wait elapses are they treated as absent, which is expected for
//! some resources and comes back as a note. Any other failure comes back as
//! an error message. The flow never fails the surrounding extraction.

use super::{read_editor, StepError};
use crate::dom::PageSelectors;
use crate::session::Session;
use tracing::{debug, warn};

pub const MENU_NOT_FOUND: &str = "Environment variables menu not found";
pub const DEVELOPER_VIEW_NOT_FOUND: &str = "Environment variables developer view not found";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentReadout {
    /// Raw editor text.
    pub payload: Option<String>,
    pub note: Option<String>,
    pub error: Option<String>,
}

impl EnvironmentReadout {
    fn noted(note: &str) -> Self {
        Self {
            note: Some(note.to_string()),
            ..Default::default()
        }
    }
}

pub async fn read_environment(session: &Session, selectors: &PageSelectors) -> EnvironmentReadout {
    match try_read(session, selectors).await {
        Ok(readout) => readout,
        Err(e) => {
            warn!(error = %e, "Environment variables could not be read");
            EnvironmentReadout {
                error: Some(e.to_string()),
                ..Default::default()
            }
        }
    }
}

async fn try_read(
    session: &Session,
    selectors: &PageSelectors,
) -> Result<EnvironmentReadout, StepError> {
    let limit = session.timeouts().sub_view;

    if !session.appears(&selectors.env_menu_link, limit).await? {
        debug!("No environment variables menu");
        return Ok(EnvironmentReadout::noted(MENU_NOT_FOUND));
    }
    session.click(&selectors.env_menu_link).await?;
    session.settle().await?;

    if !session.appears(&selectors.env_developer_toggle, limit).await? {
        debug!("No developer view toggle");
        return Ok(EnvironmentReadout::noted(DEVELOPER_VIEW_NOT_FOUND));
    }
    session.click(&selectors.env_developer_toggle).await?;
    session
        .wait_for(&selectors.env_editor, session.timeouts().env_editor)
        .await?;

    let payload = read_editor(session, &selectors.env_editor).await?;
    debug!(bytes = payload.len(), "Environment variables read");
    Ok(EnvironmentReadout {
        payload: Some(payload),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::fixtures::{self, application_page, env_page};

    #[tokio::test]
    async fn test_reads_developer_view() {
        let (session, browser) = fixtures::signed_in(fixtures::console());
        session.goto("/application/w1").await.unwrap();

        let readout = read_environment(&session, &PageSelectors::default()).await;

        assert_eq!(
            readout.payload.as_deref(),
            Some("NODE_ENV=production\nPORT=3000")
        );
        assert_eq!(readout.note, None);
        assert_eq!(readout.error, None);
        assert_eq!(
            browser.history().last().map(String::as_str),
            Some("/application/w1/environment-variables/developer")
        );
    }

    #[tokio::test]
    async fn test_missing_menu_is_a_note() {
        let (session, _) = fixtures::signed_in(
            fixtures::console().with_page("/application/w2", application_page("api", None)),
        );
        session.goto("/application/w2").await.unwrap();

        let readout = read_environment(&session, &PageSelectors::default()).await;

        assert_eq!(readout.payload, None);
        assert_eq!(readout.note.as_deref(), Some(MENU_NOT_FOUND));
        assert_eq!(readout.error, None);
    }

    #[tokio::test]
    async fn test_late_rendering_controls_are_waited_for() {
        let (session, _) = fixtures::signed_in(
            fixtures::console()
                .with_render_delay("/application/w1", 2)
                .with_render_delay("/application/w1/environment-variables", 2),
        );
        session.goto("/projects").await.unwrap();
        session.goto("/application/w1").await.unwrap();

        let readout = read_environment(&session, &PageSelectors::default()).await;

        assert_eq!(readout.note, None);
        assert_eq!(
            readout.payload.as_deref(),
            Some("NODE_ENV=production\nPORT=3000")
        );
    }

    #[tokio::test]
    async fn test_developer_view_reads_live_editor() {
        let (session, _) = fixtures::signed_in(fixtures::console().with_live_value(
            "/application/w1/environment-variables/developer",
            "textarea",
            "NODE_ENV=staging",
        ));
        session.goto("/application/w1").await.unwrap();

        let readout = read_environment(&session, &PageSelectors::default()).await;

        assert_eq!(readout.payload.as_deref(), Some("NODE_ENV=staging"));
    }

    #[tokio::test]
    async fn test_missing_toggle_is_a_note() {
        let (session, _) = fixtures::signed_in(
            fixtures::console()
                .with_page("/application/w1/environment-variables", "<html><body></body></html>"),
        );
        session.goto("/application/w1").await.unwrap();

        let readout = read_environment(&session, &PageSelectors::default()).await;

        assert_eq!(readout.note.as_deref(), Some(DEVELOPER_VIEW_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_editor_timeout_is_an_error() {
        let (session, _) = fixtures::signed_in(
            fixtures::console()
                .with_page(
                    "/application/w1/environment-variables",
                    env_page("/application/w1/environment-variables/empty"),
                )
                .with_page(
                    "/application/w1/environment-variables/empty",
                    "<html><body><p>Loading</p></body></html>",
                ),
        );
        session.goto("/application/w1").await.unwrap();

        let readout = read_environment(&session, &PageSelectors::default()).await;

        assert_eq!(readout.payload, None);
        assert_eq!(readout.note, None);
        assert!(readout.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_broken_menu_link_is_an_error() {
        let (session, _) = fixtures::signed_in(
            fixtures::console().with_failing_path("/application/w1/environment-variables"),
        );
        session.goto("/application/w1").await.unwrap();

        let readout = read_environment(&session, &PageSelectors::default()).await;

        assert!(readout.error.unwrap().contains("connection reset"));
    }
}
