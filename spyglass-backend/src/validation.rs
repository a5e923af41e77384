use serde::Deserialize;
use spyglass_roster::PageSize;
use thiserror::Error;

/// Maximum accepted search term length in characters
pub const MAX_SEARCH_TERM_CHARS: usize = 128;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("search term must be at most {max} characters, got {actual}")]
    SearchTermTooLong { max: usize, actual: usize },
    #[error("page_size must be a positive number or \"all\"")]
    PageSizeZero,
    #[error("unrecognized page_size keyword: {0}")]
    PageSizeUnrecognized(String),
}

/// Page size as it arrives on the wire: a number or a keyword
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PageSizeParam {
    Count(usize),
    Keyword(String),
}

/// Validate a search term before it reaches the view
pub fn validate_search_term(term: &str) -> Result<(), ValidationError> {
    let actual = term.chars().count();
    if actual > MAX_SEARCH_TERM_CHARS {
        return Err(ValidationError::SearchTermTooLong {
            max: MAX_SEARCH_TERM_CHARS,
            actual,
        });
    }
    Ok(())
}

/// Parse a wire page size into the domain type
///
/// An explicit 0 is rejected rather than treated as unbounded; callers
/// that want everything say "all".
pub fn parse_page_size(param: &PageSizeParam) -> Result<PageSize, ValidationError> {
    match param {
        PageSizeParam::Count(0) => Err(ValidationError::PageSizeZero),
        PageSizeParam::Count(count) => Ok(PageSize::limited(*count)),
        PageSizeParam::Keyword(word) if word.eq_ignore_ascii_case("all") => Ok(PageSize::All),
        PageSizeParam::Keyword(word) => Err(ValidationError::PageSizeUnrecognized(word.clone())),
    }
}
