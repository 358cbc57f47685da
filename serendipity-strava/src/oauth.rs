use url::form_urlencoded;

pub const WEB_AUTHORIZE_URI: &str = "https://www.strava.com/oauth/authorize";
pub const IOS_AUTHORIZE_URI: &str = "strava://oauth/mobile/authorize";
pub const ANDROID_AUTHORIZE_URI: &str = "https://www.strava.com/oauth/mobile/authorize";

/// Where the user approves the application. Mobile platforms open the Strava app when present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Platform {
    #[default]
    Web,
    Ios,
    Android,
}

impl Platform {
    pub fn authorize_uri(self) -> &'static str {
        match self {
            Platform::Web => WEB_AUTHORIZE_URI,
            Platform::Ios => IOS_AUTHORIZE_URI,
            Platform::Android => ANDROID_AUTHORIZE_URI,
        }
    }
}

/// Builds the page a user is sent to for granting `scope`.
///
/// Values are form encoded, so distinct inputs always give distinct URLs.
pub fn authorization_url(
    platform: Platform,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("approval_prompt", "auto")
        .append_pair("scope", scope)
        .finish();
    format!("{}?{}", platform.authorize_uri(), query)
}
