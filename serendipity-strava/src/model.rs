use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tokens::Tokens;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Athlete {
    pub id: i64,
    pub username: Option<String>,
    pub resource_state: i32,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub sex: Option<String>,
}

/// Answer to the authorization code exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token_type: String,
    pub expires_at: i64,
    pub expires_in: i64,
    pub refresh_token: String,
    pub access_token: String,
    pub athlete: Athlete,
}

impl TokenResponse {
    pub fn tokens(&self) -> Tokens {
        Tokens::new(&*self.access_token, &*self.refresh_token, self.expires_at)
    }
}

/// Answer to a refresh token grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub token_type: String,
    pub access_token: String,
    pub expires_at: i64,
    #[serde(default)]
    pub expires_in: i64,
    pub refresh_token: String,
}

impl From<RefreshResponse> for Tokens {
    fn from(res: RefreshResponse) -> Self {
        Tokens {
            access_token: res.access_token,
            refresh_token: res.refresh_token,
            expires_at: res.expires_at,
        }
    }
}

/// Activity owner, as embedded in activity payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaAthlete {
    pub id: i64,
    pub resource_state: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityMap {
    pub id: String,
    /// Only present on detailed activities.
    pub polyline: Option<String>,
    pub summary_polyline: Option<String>,
    pub resource_state: i32,
}

/// Name of a route an activity was matched against. Unknown names are kept as they are.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route(Cow<'static, str>);

impl Route {
    pub const WEST_SIDE_HIGHWAY: Route = Route(Cow::Borrowed("WestSideHighway"));

    pub fn new(name: impl Into<String>) -> Self {
        Route(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One entry of the athlete's activity list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryActivity {
    pub id: i64,
    pub athlete: MetaAthlete,
    pub name: String,
    /// Meters.
    pub distance: f64,
    /// Seconds.
    pub elapsed_time: i64,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub sport_type: String,
    pub start_date: Option<DateTime<Utc>>,
    /// Local wall clock time, which Strava sends with a `Z` suffix anyway.
    pub start_date_local: Option<DateTime<Utc>>,
    pub timezone: Option<String>,
    /// Seconds.
    pub utc_offset: f64,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_country: Option<String>,
    pub map: ActivityMap,
    pub private: bool,
    pub visibility: Option<String>,
    pub start_latlng: Vec<f64>,
    pub end_latlng: Vec<f64>,
    /// Set by the application after matching, never by Strava.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serendipity_route: Option<Route>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailedActivity {
    pub id: i64,
    pub external_id: Option<String>,
    pub upload_id: Option<i64>,
    pub name: String,
    pub distance: f64,
    pub moving_time: i64,
    pub elapsed_time: i64,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub start_date: Option<DateTime<Utc>>,
    pub start_date_local: Option<DateTime<Utc>>,
    pub timezone: Option<String>,
    pub start_latlng: Vec<f64>,
    pub end_latlng: Vec<f64>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_country: Option<String>,
    pub map: ActivityMap,
    pub description: Option<String>,
}

/// Filters and paging of `GET /athlete/activities`. Unset fields are left out of the query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityQuery {
    /// Epoch seconds.
    pub before: Option<i64>,
    /// Epoch seconds.
    pub after: Option<i64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ActivityQuery {
    pub fn page(mut self, page: u32, per_page: u32) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }

    pub fn between(mut self, after: i64, before: i64) -> Self {
        self.after = Some(after);
        self.before = Some(before);
        self
    }

    pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(before) = self.before {
            pairs.push(("before", before.to_string()));
        }
        if let Some(after) = self.after {
            pairs.push(("after", after.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            pairs.push(("per_page", per_page.to_string()));
        }
        pairs
    }
}
