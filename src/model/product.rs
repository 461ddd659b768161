use crate::model::{bounded_text, http_url, Identified, ModelError};
use serde::{Deserialize, Serialize};

/// A single product listing extracted from a shop page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Computed identity, assigned when the product is first persisted
    #[serde(default)]
    pub id: Option<String>,

    pub title: String,

    pub price: f64,

    /// ISO currency code, or `UNKNOWN` when no symbol was recognised
    pub currency: String,

    pub image_url: String,
}

impl Product {
    pub const MAX_TITLE_LEN: usize = 200;
    pub const MAX_CURRENCY_LEN: usize = 10;

    /// Builds a validated product without an identity
    pub fn new(
        title: &str,
        price: f64,
        currency: &str,
        image_url: &str,
    ) -> Result<Self, ModelError> {
        if !price.is_finite() {
            return Err(ModelError::InvalidPrice(price));
        }

        Ok(Self {
            id: None,
            title: bounded_text("title", title, Self::MAX_TITLE_LEN)?,
            price,
            currency: bounded_text("currency", currency, Self::MAX_CURRENCY_LEN)?,
            image_url: http_url("image_url", image_url)?,
        })
    }
}

impl Identified for Product {
    /// `title#price`, with the price in its shortest round-trip form
    /// (`1200.0`, `12.5`). A price change yields a new identity.
    fn compute_identity(&self) -> String {
        format!("{}#{:?}", self.title, self.price)
    }

    fn identity(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn assign_identity(&mut self, id: String) {
        self.id = Some(id);
    }
}
