//! Canned console pages shared by the harvest tests.

use crate::browser::FixtureBrowser;
use crate::config::Timeouts;
use crate::session::Session;
use reqwest::Url;
use std::sync::Arc;

pub(crate) const LOGIN: &str = r#"<html><body><form>
    <input name="email"><input name="password" type="password">
    <button type="submit" data-goto="/projects">Login</button>
  </form></body></html>"#;

pub(crate) fn base() -> Url {
    Url::parse("http://console.test").unwrap()
}

pub(crate) fn card(name: &str, href: &str, badge: &str, descriptions: &[&str]) -> String {
    let descriptions: String = descriptions
        .iter()
        .map(|d| format!(r#"<div class="box-description">{}</div>"#, d))
        .collect();
    format!(
        r#"<a class="box" href="{href}">
             <div class="box-title">{name}</div>{descriptions}
             <div class="badge {badge}"></div>
           </a>"#
    )
}

pub(crate) fn projects_page(projects: &[(&str, &str)]) -> String {
    let cards: String = projects
        .iter()
        .map(|(title, href)| card(title, href, "", &[]))
        .collect();
    format!(r#"<html><body><h1>Projects</h1><div class="grid">{}</div></body></html>"#, cards)
}

pub(crate) fn project_page(sections: &[(&str, Vec<String>)]) -> String {
    let body: String = sections
        .iter()
        .map(|(heading, cards)| {
            format!(r#"<h2>{}</h2><div class="grid">{}</div>"#, heading, cards.concat())
        })
        .collect();
    format!("<html><body>{}</body></html>", body)
}

pub(crate) fn application_page(name: &str, env_href: Option<&str>) -> String {
    let env_link = env_href
        .map(|href| format!(r#"<a href="{}">Environment Variables</a>"#, href))
        .unwrap_or_default();
    format!(
        r#"<html><body><h1>{name}</h1>{env_link}
        <form>
          <input id="name" value="{name}">
          <input id="description" value="frontend">
          <select id="build_pack"><option value="nixpacks" selected>Nixpacks</option></select>
          <input id="fqdn" value="https://{name}.example.com">
          <input id="ports_exposes" value="3000">
          <input id="is_http_basic_auth_enabled" type="checkbox">
          <textarea id="custom_labels">traefik.enable=true</textarea>
        </form></body></html>"#
    )
}

pub(crate) fn env_page(developer_href: &str) -> String {
    format!(
        r#"<html><body><h1>Environment Variables</h1>
        <button data-goto="{}">Developer view</button></body></html>"#,
        developer_href
    )
}

pub(crate) fn developer_view(variables: &str) -> String {
    format!(
        "<html><body><h1>Environment Variables</h1><textarea>{}</textarea></body></html>",
        variables
    )
}

pub(crate) fn database_page(name: &str) -> String {
    format!(
        r#"<html><body><h1>{name}</h1>
        <form>
          <input id="name" value="{name}">
          <input id="image" value="postgres:16-alpine">
          <input id="postgres_user" value="postgres">
          <input id="postgres_password" value="s3cret">
          <input id="postgres_db" value="app">
          <input id="is_public" type="checkbox">
          <input id="public_port" value="">
        </form></body></html>"#
    )
}

pub(crate) fn service_page(name: &str, compose_href: &str, env_href: &str) -> String {
    format!(
        r#"<html><body><h1>{name}</h1>
        <button data-goto="{compose_href}">Edit Compose File</button>
        <a href="{env_href}">Environment Variables</a></body></html>"#
    )
}

pub(crate) fn compose_modal(back: &str, compose: &str) -> String {
    format!(
        r#"<html><body><dialog open data-on-escape="{back}"><textarea>{compose}</textarea></dialog></body></html>"#
    )
}

/// Console with one project holding one application and one database, both
/// with environment variables in developer view.
pub(crate) fn console() -> FixtureBrowser {
    FixtureBrowser::new(base())
        .with_page("/login", LOGIN)
        .with_page("/projects", projects_page(&[("Production", "/project/p1")]))
        .with_page(
            "/project/p1",
            project_page(&[
                (
                    "Applications",
                    vec![card(
                        "web",
                        "/application/w1",
                        "badge-success",
                        &["frontend", "https://web.example.com"],
                    )],
                ),
                (
                    "Databases",
                    vec![card("db", "/database/d1", "", &["postgres"])],
                ),
            ]),
        )
        .with_page(
            "/application/w1",
            application_page("web", Some("/application/w1/environment-variables")),
        )
        .with_page(
            "/application/w1/environment-variables",
            env_page("/application/w1/environment-variables/developer"),
        )
        .with_page(
            "/application/w1/environment-variables/developer",
            developer_view("NODE_ENV=production\nPORT=3000"),
        )
        .with_page(
            "/database/d1",
            database_page("db").replace(
                "<form>",
                r#"<a href="/database/d1/environment-variables">Environment Variables</a><form>"#,
            ),
        )
        .with_page(
            "/database/d1/environment-variables",
            env_page("/database/d1/environment-variables/developer"),
        )
        .with_page(
            "/database/d1/environment-variables/developer",
            developer_view("POSTGRES_DB=app"),
        )
}

/// A session that skipped the login form.
pub(crate) fn signed_in(browser: FixtureBrowser) -> (Session, Arc<FixtureBrowser>) {
    let browser = Arc::new(browser);
    let mut session = Session::new(browser.clone(), base(), Timeouts::immediate());
    session.mark_authenticated();
    (session, browser)
}
