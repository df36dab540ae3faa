//! Scripts that run inside a surface: the bootstrap content script, the page
//! logic, and the scrape overlay.

mod content;
mod logic;
mod scrape;

pub use content::ContentScript;
pub use logic::LogicScript;
pub use scrape::ScrapeScript;

pub const CONTENT_SCRIPT: &str = "js/content.js";
pub const LOGIC_SCRIPT: &str = "js/logic.js";

#[cfg(test)]
#[path = "../tests/scripts_tests.rs"]
mod tests;
