use scraper::{Html, Selector};
use thiserror::Error;

/// Failure inside a caller-supplied extractor.
///
/// Wrapped into [`ScraperError::Parse`](crate::error::ScraperError::Parse)
/// by the scraper that ran the extractor, preserving the cause and the
/// selector involved when one is known.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("invalid selector '{0}'")]
    InvalidSelector(String),

    #[error("no element matched '{0}'")]
    MissingElement(String),

    #[error("{0}")]
    Custom(String),
}

impl ExtractError {
    /// The CSS selector involved in this failure, if any.
    pub fn selector(&self) -> Option<String> {
        match self {
            ExtractError::InvalidSelector(s) | ExtractError::MissingElement(s) => Some(s.clone()),
            ExtractError::Custom(_) => None,
        }
    }
}

impl From<String> for ExtractError {
    fn from(msg: String) -> Self {
        ExtractError::Custom(msg)
    }
}

impl From<&str> for ExtractError {
    fn from(msg: &str) -> Self {
        ExtractError::Custom(msg.to_string())
    }
}

/// Queryable tree over loaded markup, shared by both strategies.
///
/// The static strategy parses the fetched body; the dynamic strategy parses
/// the rendered DOM captured from the browser, so script-produced content is
/// visible through the same interface.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parse markup into a queryable document. Parsing itself never fails;
    /// malformed HTML yields a best-effort tree, as browsers do.
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    /// Concatenated text of the first element matching `selector`.
    pub fn first_text(&self, selector: &str) -> Result<String, ExtractError> {
        let sel = compile(selector)?;
        self.html
            .select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .ok_or_else(|| ExtractError::MissingElement(selector.to_string()))
    }

    /// Text of every element matching `selector`, in document order.
    pub fn all_texts(&self, selector: &str) -> Result<Vec<String>, ExtractError> {
        let sel = compile(selector)?;
        Ok(self
            .html
            .select(&sel)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .collect())
    }

    /// Attribute value on the first element matching `selector`.
    pub fn first_attr(&self, selector: &str, attr: &str) -> Result<String, ExtractError> {
        let sel = compile(selector)?;
        self.html
            .select(&sel)
            .next()
            .and_then(|el| el.value().attr(attr))
            .map(str::to_string)
            .ok_or_else(|| ExtractError::MissingElement(selector.to_string()))
    }

    /// Whether any element matches `selector`.
    pub fn exists(&self, selector: &str) -> Result<bool, ExtractError> {
        let sel = compile(selector)?;
        Ok(self.html.select(&sel).next().is_some())
    }

    /// Escape hatch to the underlying tree for extractors that need more
    /// than the helpers above.
    pub fn as_html(&self) -> &Html {
        &self.html
    }
}

fn compile(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|_| ExtractError::InvalidSelector(selector.to_string()))
}
