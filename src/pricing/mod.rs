//! AI-assisted nightly price suggestions.
//!
//! A `PriceSuggester` takes property attributes plus market signals and
//! returns `{ suggestedPrice, reasoning }`. The call is opaque: no retries,
//! no caching.

#[cfg(feature = "http")]
mod http;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dashboard::Listing;
use crate::error::RemoteError;

#[cfg(feature = "http")]
pub use http::{HttpPriceSuggester, SUGGEST_PATH};

/// Error type for price suggestions.
#[derive(Debug, Clone, PartialEq)]
pub enum PricingError {
    /// The text-generation backend could not be reached or refused.
    Remote(RemoteError),
    /// The backend answered, but not with a usable suggestion.
    InvalidSuggestion(String),
}

impl fmt::Display for PricingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingError::Remote(e) => write!(f, "pricing backend failed: {}", e),
            PricingError::InvalidSuggestion(msg) => write!(f, "invalid price suggestion: {}", msg),
        }
    }
}

impl std::error::Error for PricingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PricingError::Remote(e) => Some(e),
            PricingError::InvalidSuggestion(_) => None,
        }
    }
}

impl From<RemoteError> for PricingError {
    fn from(err: RemoteError) -> Self {
        PricingError::Remote(err)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyAttributes {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_guests: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amenities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_rate: Option<f64>,
}

impl From<&Listing> for PropertyAttributes {
    fn from(listing: &Listing) -> Self {
        let amenities = listing
            .extra
            .get("amenities")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            title: listing.title.clone(),
            location: listing.address.clone(),
            bedrooms: listing.bedrooms,
            max_guests: listing.max_guests,
            amenities,
            current_rate: listing.nightly_rate,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSignals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_nightly_rate: Option<f64>,
    /// Fraction of comparable units booked, `0.0..=1.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupancy_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_events: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingRequest {
    pub property: PropertyAttributes,
    pub market: MarketSignals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSuggestion {
    pub suggested_price: f64,
    pub reasoning: String,
}

impl PriceSuggestion {
    /// Reject prices that are not finite and positive.
    pub fn validated(self) -> Result<Self, PricingError> {
        if self.suggested_price.is_finite() && self.suggested_price > 0.0 {
            Ok(self)
        } else {
            Err(PricingError::InvalidSuggestion(format!(
                "suggested price {} is not a positive amount",
                self.suggested_price
            )))
        }
    }
}

/// Source of price suggestions.
#[async_trait]
pub trait PriceSuggester: Send + Sync {
    async fn suggest(&self, request: &PricingRequest) -> Result<PriceSuggestion, PricingError>;
}

/// Render `request` as a prompt for a text-generation backend.
pub fn build_prompt(request: &PricingRequest) -> String {
    let property = &request.property;
    let market = &request.market;

    let mut prompt = String::from(
        "You are a revenue manager for short-term rentals. Suggest a nightly price.\n\nProperty:\n",
    );
    prompt.push_str(&format!("- Title: {}\n", property.title));
    if let Some(location) = &property.location {
        prompt.push_str(&format!("- Location: {}\n", location));
    }
    if let Some(bedrooms) = property.bedrooms {
        prompt.push_str(&format!("- Bedrooms: {}\n", bedrooms));
    }
    if let Some(guests) = property.max_guests {
        prompt.push_str(&format!("- Max guests: {}\n", guests));
    }
    if !property.amenities.is_empty() {
        prompt.push_str(&format!("- Amenities: {}\n", property.amenities.join(", ")));
    }
    if let Some(rate) = property.current_rate {
        prompt.push_str(&format!("- Current nightly rate: {:.2}\n", rate));
    }

    prompt.push_str("\nMarket:\n");
    if let Some(rate) = market.average_nightly_rate {
        prompt.push_str(&format!("- Average nightly rate nearby: {:.2}\n", rate));
    }
    if let Some(occupancy) = market.occupancy_rate {
        prompt.push_str(&format!("- Occupancy: {:.0}%\n", occupancy * 100.0));
    }
    if let Some(season) = &market.season {
        prompt.push_str(&format!("- Season: {}\n", season));
    }
    if !market.local_events.is_empty() {
        prompt.push_str(&format!("- Local events: {}\n", market.local_events.join(", ")));
    }

    prompt.push_str(
        "\nAnswer with a single JSON object and nothing else: \
         {\"suggestedPrice\": <number>, \"reasoning\": \"<one paragraph>\"}",
    );
    prompt
}

/// Extract a suggestion from free text: the first JSON object in `text` that
/// decodes as a `PriceSuggestion`.
pub fn parse_suggestion(text: &str) -> Result<PriceSuggestion, PricingError> {
    for (start, _) in text.match_indices('{') {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        let Some(Ok(value)) = values.next() else {
            continue;
        };
        if let Ok(suggestion) = serde_json::from_value::<PriceSuggestion>(value) {
            return suggestion.validated();
        }
    }
    Err(PricingError::InvalidSuggestion(
        "no suggestion object found in response".into(),
    ))
}
