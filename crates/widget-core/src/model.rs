//! Domain Model
//!
//! Visitors, weather readings, charges and the identity handed over by the
//! identity provider.

use serde::{Deserialize, Deserializer, Serialize};

/// Scope an operator needs before the widget offers a purchase
pub const BILLING_SCOPE: &str = "billing_manage";

/// Visitor coordinates as reported by the chat host
///
/// The host sends them as decimal strings; plain numbers are accepted too.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    #[serde(deserialize_with = "coordinate")]
    pub latitude: f64,
    #[serde(deserialize_with = "coordinate")]
    pub longitude: f64,
}

/// The customer currently selected in the chat host
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Visitor {
    /// Host identifier; numeric ids are normalized to their decimal text
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub geolocation: Option<Geolocation>,
}

impl Visitor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            geolocation: None,
        }
    }

    pub fn located_at(mut self, latitude: f64, longitude: f64) -> Self {
        self.geolocation = Some(Geolocation { latitude, longitude });
        self
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

fn coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Current conditions at the visitor's location
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    /// Degrees Celsius
    pub temperature: f64,

    /// Provider icon code, e.g. `01d`
    pub icon: String,
}

impl Weather {
    pub fn icon_url(&self) -> String {
        format!("https://openweathermap.org/img/w/{}.png", self.icon)
    }
}

/// Status of a direct charge as reported by the billing API
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeStatus {
    Success,
    Processed,
    #[serde(other)]
    Other,
}

/// A billing record of a purchase attempt
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    #[serde(default)]
    pub id: Option<String>,
    pub status: ChargeStatus,
}

impl Charge {
    pub fn with_status(status: ChargeStatus) -> Self {
        Self { id: None, status }
    }
}

/// Purchase progress shown to the operator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Charge accepted, waiting for the billing API to settle it
    Processed,
    Paid,
    /// Charge history could not be fetched
    Error,
}

impl PaymentStatus {
    /// Aggregate a charge history: any success wins over any processed charge
    pub fn from_charges(charges: &[Charge]) -> Option<Self> {
        if charges.iter().any(|c| c.status == ChargeStatus::Success) {
            Some(Self::Paid)
        } else if charges.iter().any(|c| c.status == ChargeStatus::Processed) {
            Some(Self::Processed)
        } else {
            None
        }
    }
}

/// The one-time good the widget sells
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Offer {
    pub name: &'static str,
    pub price_cents: u32,
    pub quantity: u32,
}

/// Unlocks the weather icon for the account
pub const WEATHER_ICON_OFFER: Offer = Offer {
    name: "Weather icon",
    price_cents: 125,
    quantity: 1,
};

impl Offer {
    /// Price formatted for display, e.g. `$1.25`
    pub fn price_label(&self) -> String {
        format!("${}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }
}

/// Parameters of a direct charge creation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRequest {
    /// Where the billing page sends the operator back to
    pub return_url: String,
    pub name: String,
    pub price_cents: u32,
    pub quantity: u32,
}

impl ChargeRequest {
    pub fn for_offer(offer: &Offer, return_url: impl Into<String>) -> Self {
        Self {
            return_url: return_url.into(),
            name: offer.name.to_string(),
            price_cents: offer.price_cents,
            quantity: offer.quantity,
        }
    }
}

/// Body of a successful charge creation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedCharge {
    #[serde(default)]
    pub id: Option<String>,

    /// Page the operator must visit to accept the charge
    pub confirmation_url: String,
}

/// Body of a successful charge activation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivatedCharge {
    #[serde(default)]
    pub status: Option<ChargeStatus>,
}

/// Opaque bearer token issued by the identity provider
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Successful identity callback payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub access_token: AccessToken,

    /// Granted scopes; the SDK sends either a list or a comma separated string
    #[serde(default, deserialize_with = "scope_list")]
    pub scopes: Vec<String>,
}

impl Identity {
    pub fn new(access_token: impl Into<String>, scopes: &[&str]) -> Self {
        Self {
            access_token: AccessToken::new(access_token),
            scopes: scopes.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn has_billing_access(&self) -> bool {
        self.scopes.iter().any(|scope| scope == BILLING_SCOPE)
    }
}

fn scope_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::List(scopes) => scopes,
        Raw::Joined(joined) => joined
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect(),
    })
}

/// Failed identity callback payload
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityFailure {
    #[serde(default)]
    pub identity_exception: Option<String>,

    #[serde(default)]
    pub oauth_exception: Option<String>,
}

impl IdentityFailure {
    pub fn into_auth_error(self) -> crate::AuthError {
        use crate::AuthError;

        if self.identity_exception.as_deref() == Some("unauthorized") {
            return AuthError::Unauthorized;
        }
        if self.oauth_exception.as_deref() == Some("access_denied") {
            return AuthError::AccessDenied;
        }

        let detail = self
            .identity_exception
            .or(self.oauth_exception)
            .unwrap_or_else(|| "unknown".into());
        AuthError::Other(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthError;

    #[test]
    fn test_payment_status_success_wins() {
        let charges = vec![
            Charge::with_status(ChargeStatus::Processed),
            Charge::with_status(ChargeStatus::Other),
            Charge::with_status(ChargeStatus::Success),
        ];
        assert_eq!(PaymentStatus::from_charges(&charges), Some(PaymentStatus::Paid));
    }

    #[test]
    fn test_payment_status_processed_without_success() {
        let charges = vec![
            Charge::with_status(ChargeStatus::Other),
            Charge::with_status(ChargeStatus::Processed),
        ];
        assert_eq!(PaymentStatus::from_charges(&charges), Some(PaymentStatus::Processed));
    }

    #[test]
    fn test_payment_status_none() {
        assert_eq!(PaymentStatus::from_charges(&[]), None);
        assert_eq!(
            PaymentStatus::from_charges(&[Charge::with_status(ChargeStatus::Other)]),
            None
        );
    }

    #[test]
    fn test_unknown_charge_status_is_other() {
        let charge: Charge = serde_json::from_str(r#"{"id":"ch_1","status":"declined"}"#).unwrap();
        assert_eq!(charge.status, ChargeStatus::Other);
    }

    #[test]
    fn test_visitor_numeric_id() {
        let visitor: Visitor = serde_json::from_str(
            r#"{"id":1,"name":"Ann","geolocation":{"latitude":10.0,"longitude":20.0}}"#,
        )
        .unwrap();
        assert_eq!(visitor.id, "1");
        assert_eq!(
            visitor.geolocation,
            Some(Geolocation { latitude: 10.0, longitude: 20.0 })
        );
    }

    #[test]
    fn test_visitor_coordinates_as_strings() {
        let visitor: Visitor = serde_json::from_str(
            r#"{"id":"S1","name":"Ann","geolocation":{"city":"Warsaw","latitude":"52.25","longitude":"21.0"}}"#,
        )
        .unwrap();
        assert_eq!(
            visitor.geolocation,
            Some(Geolocation { latitude: 52.25, longitude: 21.0 })
        );

        let bad = serde_json::from_str::<Visitor>(r#"{"id":"S1","geolocation":{"latitude":"north","longitude":"1"}}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_scopes_from_list_or_string() {
        let listed: Identity =
            serde_json::from_str(r#"{"access_token":"t","scopes":["chats--all:ro","billing_manage"]}"#).unwrap();
        assert!(listed.has_billing_access());

        let joined: Identity =
            serde_json::from_str(r#"{"access_token":"t","scopes":"chats--all:ro,billing_manage"}"#).unwrap();
        assert_eq!(joined.scopes, vec!["chats--all:ro", "billing_manage"]);
        assert!(joined.has_billing_access());
    }

    #[test]
    fn test_billing_scope_is_exact_match() {
        let identity = Identity::new("t", &["billing_manage_readonly", "billing"]);
        assert!(!identity.has_billing_access());
    }

    #[test]
    fn test_identity_failure_kinds() {
        let unauthorized: IdentityFailure =
            serde_json::from_str(r#"{"identity_exception":"unauthorized"}"#).unwrap();
        assert_eq!(unauthorized.into_auth_error(), AuthError::Unauthorized);

        let denied: IdentityFailure = serde_json::from_str(r#"{"oauth_exception":"access_denied"}"#).unwrap();
        assert_eq!(denied.into_auth_error(), AuthError::AccessDenied);

        let other: IdentityFailure = serde_json::from_str(r#"{"oauth_exception":"server_error"}"#).unwrap();
        assert_eq!(other.into_auth_error(), AuthError::Other("server_error".into()));
    }

    #[test]
    fn test_offer_price_label() {
        assert_eq!(WEATHER_ICON_OFFER.price_label(), "$1.25");
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = AccessToken::new("secret");
        assert_eq!(format!("{token:?}"), "AccessToken(..)");
    }
}
