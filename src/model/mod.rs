//! Domain records handled by the harvester
//!
//! - `Product`: one listing extracted from a shop page
//! - `Subscription`: one user subscribed to one notification topic
//!
//! Both carry an identity that is computed from their own fields rather than
//! assigned by the source; see [`Identified`].

mod product;
mod subscription;

pub use product::Product;
pub use subscription::Subscription;

use thiserror::Error;
use url::Url;

/// Errors raised when a record violates its field constraints
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("{field} must be between {min} and {max} characters, got {len}")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
        len: usize,
    },

    #[error("{field} is not a valid http(s) URL: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("price must be a finite number, got {0}")]
    InvalidPrice(f64),
}

/// A record whose identity is derived deterministically from its fields
///
/// Two records with the same computed identity are duplicates, whatever
/// their other fields hold.
pub trait Identified {
    /// Derives the identity key from the record's fields
    fn compute_identity(&self) -> String;

    /// The identity assigned at persistence time, if any
    fn identity(&self) -> Option<&str>;

    /// Stamps the record with its identity
    fn assign_identity(&mut self, id: String);
}

/// Trims `value` and checks its length in characters
pub(crate) fn bounded_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ModelError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > max {
        return Err(ModelError::Length {
            field,
            min: 1,
            max,
            len,
        });
    }
    Ok(trimmed.to_string())
}

/// Checks that `value` is an absolute http or https URL
pub(crate) fn http_url(field: &'static str, value: &str) -> Result<String, ModelError> {
    let trimmed = value.trim();
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Ok(url.to_string())
        }
        _ => Err(ModelError::InvalidUrl {
            field,
            value: trimmed.to_string(),
        }),
    }
}
