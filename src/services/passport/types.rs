/*
 * Responsibility
 * - Wire types of the passport issuance contract
 *   - request:  { passportId, destination, expirationTime }
 *   - response: flat { "<claimKey>": "<value>", ... }
 */
use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /api/passport`. A fresh `passport_id` is drawn per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassportRequest {
    pub passport_id: Uuid,
    pub destination: String,
    pub expiration_time: DateTime<Utc>,
}

impl PassportRequest {
    pub fn new(destination: impl Into<String>, lifetime: TimeDelta) -> Self {
        Self::issued_at(destination, lifetime, Utc::now())
    }

    pub fn issued_at(destination: impl Into<String>, lifetime: TimeDelta, now: DateTime<Utc>) -> Self {
        Self {
            passport_id: Uuid::new_v4(),
            destination: destination.into(),
            expiration_time: now
                .checked_add_signed(lifetime)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }
}

/// Claims issued for one request; keys are header suffixes.
///
/// Lives only while the request is being prepared and is dropped after its
/// entries have been turned into trusted headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Passport(BTreeMap<String, String>);

impl Passport {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Passport
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
