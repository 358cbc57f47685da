use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serendipity_request::{CallContext, Failure, RequestExecutor, Transport, Url};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::ClientParams;
use crate::error::{Error, Result};
use crate::model::{ActivityQuery, DetailedActivity, RefreshResponse, SummaryActivity, TokenResponse};
use crate::oauth::{self, Platform};
use crate::tokens::{TokenManager, Tokens};

/// Strava API client acting for one user.
///
/// Domain calls check the token snapshot first and refresh it when it has expired. A 401
/// answer triggers a refresh followed by a replay of the call, up to
/// [`ClientParams::max_unauthorized_retries`] times. Refreshed tokens are handed to the
/// [`TokenManager`] for persistence.
///
/// Calls that may refresh take `&mut self`, so one client never runs two refreshes at once.
pub struct StravaClient {
    user_id: String,
    tokens: Tokens,
    token_manager: Arc<dyn TokenManager>,
    params: ClientParams,
    executor: RequestExecutor,
}

impl StravaClient {
    pub fn new(
        user_id: impl Into<String>,
        tokens: Tokens,
        token_manager: Arc<dyn TokenManager>,
        params: ClientParams,
        executor: RequestExecutor,
    ) -> Self {
        StravaClient {
            user_id: user_id.into(),
            tokens,
            token_manager,
            params,
            executor,
        }
    }

    /// Same as [`StravaClient::new`] with the default executor over `transport`.
    pub fn with_transport<T: Transport>(
        user_id: impl Into<String>,
        tokens: Tokens,
        token_manager: Arc<dyn TokenManager>,
        params: ClientParams,
        transport: T,
    ) -> Self {
        let executor = RequestExecutor::default_for(transport);
        Self::new(user_id, tokens, token_manager, params, executor)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Current token snapshot.
    pub fn tokens(&self) -> &Tokens {
        &self.tokens
    }

    pub fn params(&self) -> &ClientParams {
        &self.params
    }

    /// Page where the user grants `scope` to this application.
    pub fn authorization_url(&self, scope: &str, platform: Platform) -> String {
        oauth::authorization_url(
            platform,
            &self.params.client_id,
            &self.params.redirect_uri,
            scope,
        )
    }

    /// Exchanges an authorization code for the user's first tokens.
    ///
    /// The client's own snapshot is left alone; store the returned tokens and build a client
    /// from them.
    pub async fn generate_tokens(&self, ctx: &CallContext, code: &str) -> Result<TokenResponse> {
        let span = info_span!(parent: ctx.span(), "generate_tokens", user_id = %self.user_id);
        let url = self.token_url(&[("code", code), ("grant_type", "authorization_code")])?;
        self.executor
            .post(url)
            .send::<_, Value>(ctx)
            .instrument(span)
            .await
            .map_err(|failure| token_failure("get Strava auth tokens", failure))
    }

    /// Trades the refresh token for a new snapshot, then asks the [`TokenManager`] to store it.
    ///
    /// A storage failure is logged and does not fail the refresh.
    pub async fn refresh_access_token(&mut self, ctx: &CallContext) -> Result<()> {
        let span = info_span!(parent: ctx.span(), "refresh_access_token", user_id = %self.user_id);
        self.refresh(ctx).instrument(span).await
    }

    /// Lists the user's activities, newest first.
    pub async fn list_activities(
        &mut self,
        ctx: &CallContext,
        query: &ActivityQuery,
    ) -> Result<Vec<SummaryActivity>> {
        let span = info_span!(parent: ctx.span(), "list_activities", user_id = %self.user_id);
        let url = Url::parse_with_params(&self.endpoint("athlete/activities"), query.pairs())?;
        self.call_authorized(ctx, "list strava activities", url)
            .instrument(span)
            .await
    }

    pub async fn get_activity(&mut self, ctx: &CallContext, id: i64) -> Result<DetailedActivity> {
        let span = info_span!(parent: ctx.span(), "get_activity", user_id = %self.user_id, activity_id = id);
        let url = Url::parse(&self.endpoint(&format!("activities/{}", id)))?;
        self.call_authorized(ctx, "get strava activity", url)
            .instrument(span)
            .await
    }

    async fn call_authorized<T: DeserializeOwned>(
        &mut self,
        ctx: &CallContext,
        what: &'static str,
        url: Url,
    ) -> Result<T> {
        self.check_expiry(ctx).await;

        let mut refreshes = 0;
        loop {
            match self.fetch(ctx, what, url.clone()).await {
                Err(Error::Unauthorized) if refreshes < self.params.max_unauthorized_retries => {
                    refreshes += 1;
                    info!(refreshes, "access token was rejected, refreshing before replay");
                    self.refresh(ctx)
                        .await
                        .map_err(|e| Error::Refresh(Box::new(e)))?;
                }
                outcome => return outcome,
            }
        }
    }

    /// Refreshes an expired snapshot. A failed refresh is only logged; the call goes ahead with
    /// the old token and its 401 takes the reactive path.
    async fn check_expiry(&mut self, ctx: &CallContext) {
        let now = Utc::now().timestamp();
        if !self.tokens.is_expired_at(now) {
            return;
        }
        info!(
            expired_at = self.tokens.expires_at,
            secs_since_expiry = now - self.tokens.expires_at,
            "detected expired access token, refreshing"
        );
        if self.refresh(ctx).await.is_err() {
            warn!("proceeding with stale access token");
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        what: &'static str,
        url: Url,
    ) -> Result<T> {
        let result = self
            .executor
            .get(url)
            .bearer_auth(&self.tokens.access_token)
            .send::<_, Value>(ctx)
            .await;
        match result {
            Ok(value) => Ok(value),
            Err(failure) if failure.status() == Some(StatusCode::UNAUTHORIZED) => {
                debug!("returning unauthorized error to trigger refresh loop");
                Err(Error::Unauthorized)
            }
            Err(failure) => Err(request_failure(what, failure)),
        }
    }

    async fn refresh(&mut self, ctx: &CallContext) -> Result<()> {
        let url = self.token_url(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", self.tokens.refresh_token.as_str()),
        ])?;
        let res: RefreshResponse = self
            .executor
            .post(url)
            .send::<_, Value>(ctx)
            .await
            .map_err(|failure| token_failure("refresh Strava access token", failure))?;

        let tokens = Tokens::from(res);
        if let Err(e) = self
            .token_manager
            .set_user_tokens(ctx, &self.user_id, &tokens)
            .await
        {
            // the refreshed snapshot is still used for this client
            warn!(error = %e, "unable to update user's access tokens in storage");
        }
        self.tokens = tokens;
        debug!(expires_at = self.tokens.expires_at, "access token refreshed");
        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.params.api_base_url.trim_end_matches('/'), path)
    }

    /// `POST {base}/oauth/token` with the client credentials followed by `grant`.
    fn token_url(&self, grant: &[(&str, &str)]) -> Result<Url> {
        let credentials = [
            ("client_id", self.params.client_id.as_str()),
            ("client_secret", self.params.client_secret.as_str()),
        ];
        let url = Url::parse_with_params(
            &self.endpoint("oauth/token"),
            credentials.iter().chain(grant.iter()),
        )?;
        Ok(url)
    }
}

impl fmt::Debug for StravaClient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("StravaClient")
            .field("user_id", &self.user_id)
            .field("expires_at", &self.tokens.expires_at)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

fn request_failure(what: &'static str, failure: Failure<Value>) -> Error {
    let Failure { error, reason } = failure;
    let err = match error {
        serendipity_request::Error::BadStatus(status) => Error::BadStatus {
            what,
            status,
            reason,
        },
        other => Error::Request(other),
    };
    error!(error = %err, "unable to {}", what);
    err
}

// Token endpoint URLs carry the client secret, so transport errors lose theirs.
fn token_failure(what: &'static str, failure: Failure<Value>) -> Error {
    let Failure { error, reason } = failure;
    let error = match error {
        serendipity_request::Error::Transport(e) => {
            serendipity_request::Error::Transport(e.without_url())
        }
        other => other,
    };
    request_failure(what, Failure { error, reason })
}
