//! [`Browser`](crate::traits::Browser) implementations.
//!
//! - [`WebDriverBrowser`] drives a real browser through a W3C WebDriver
//!   endpoint (chromedriver, geckodriver, Selenium)
//! - [`FixtureBrowser`] serves canned documents for offline replay and tests

mod fixture;
mod webdriver;

pub use fixture::FixtureBrowser;
pub use webdriver::{WebDriverBrowser, WebDriverOptions};
