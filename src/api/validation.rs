//! Boundary validation of submitted links
//!
//! Only syntax is checked here. Whether a URL is reachable or points at an
//! acceptable file is the pipeline's business, not the API boundary's.

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum LinkValidationError {
    #[error("urls must not be empty")]
    Empty,

    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported scheme {scheme:?} in {url:?}")]
    UnsupportedScheme { url: String, scheme: String },
}

pub fn validate_links(urls: &[String]) -> Result<(), LinkValidationError> {
    if urls.is_empty() {
        return Err(LinkValidationError::Empty);
    }

    for raw in urls {
        let parsed = Url::parse(raw).map_err(|err| LinkValidationError::InvalidUrl {
            url: raw.clone(),
            reason: err.to_string(),
        })?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(LinkValidationError::UnsupportedScheme {
                    url: raw.clone(),
                    scheme: other.to_string(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_valid_links() {
        assert!(validate_links(&urls(&["https://example.com/a.jpg"])).is_ok());
        assert!(validate_links(&urls(&["http://example.com/b.png?x=1"])).is_ok());
    }

    #[test]
    fn test_empty_list_rejected() {
        assert!(matches!(
            validate_links(&[]),
            Err(LinkValidationError::Empty)
        ));
    }

    #[test]
    fn test_unparsable_url_rejected() {
        assert!(matches!(
            validate_links(&urls(&["not a url"])),
            Err(LinkValidationError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        assert!(matches!(
            validate_links(&urls(&["ftp://example.com/a.jpg"])),
            Err(LinkValidationError::UnsupportedScheme { .. })
        ));
    }
}
