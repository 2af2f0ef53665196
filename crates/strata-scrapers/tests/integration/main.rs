mod common;
mod scrape_tests;

#[cfg(feature = "browser")]
mod browser_tests;
