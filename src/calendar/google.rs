//! Google Calendar v3 client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::{CalendarProvider, InsertOutcome};
use crate::error::ProviderError;
use crate::models::{EventDescriptor, TokenGrant};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Endpoints and OAuth client credentials for the Google provider.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_base: String,
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: None,
            client_secret: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    config: GoogleConfig,
    client: Client,
}

impl GoogleCalendarClient {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &EventDescriptor,
    ) -> Result<InsertOutcome, ProviderError> {
        let url = format!(
            "{}/calendars/{}/events",
            self.config.api_base.trim_end_matches('/'),
            calendar_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(InsertOutcome::Created),
            StatusCode::CONFLICT => Ok(InsertOutcome::Conflict),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ProviderError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, ProviderError> {
        let (Some(client_id), Some(client_secret)) =
            (&self.config.client_id, &self.config.client_secret)
        else {
            return Err(ProviderError::RefreshUnavailable(
                "OAuth client credentials not configured".to_string(),
            ));
        };

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::models::EventDateTime;

    fn client_for(server: &MockServer, with_oauth: bool) -> GoogleCalendarClient {
        GoogleCalendarClient::new(GoogleConfig {
            api_base: server.uri(),
            token_url: format!("{}/token", server.uri()),
            client_id: with_oauth.then(|| "client".to_string()),
            client_secret: with_oauth.then(|| "secret".to_string()),
        })
    }

    fn event() -> EventDescriptor {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        EventDescriptor {
            id: "momentumt1".to_string(),
            summary: "Write report".to_string(),
            description: None,
            start: EventDateTime {
                date_time: day.and_hms_opt(9, 0, 0).unwrap(),
                time_zone: "UTC".to_string(),
            },
            end: EventDateTime {
                date_time: day.and_hms_opt(10, 0, 0).unwrap(),
                time_zone: "UTC".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn insert_success_is_created() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(header("authorization", "Bearer token"))
            .and(body_string_contains("\"id\":\"momentumt1\""))
            .and(body_string_contains("\"dateTime\":\"2024-01-01T09:00:00\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "momentumt1"})))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client_for(&server, false)
            .insert_event("token", "primary", &event())
            .await
            .unwrap();
        assert_eq!(outcome, InsertOutcome::Created);
    }

    #[tokio::test]
    async fn insert_conflict_is_reported_as_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409).set_body_string("duplicate"))
            .mount(&server)
            .await;

        let outcome = client_for(&server, false)
            .insert_event("token", "primary", &event())
            .await
            .unwrap();
        assert_eq!(outcome, InsertOutcome::Conflict);
    }

    #[tokio::test]
    async fn other_failures_carry_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = client_for(&server, false)
            .insert_event("token", "primary", &event())
            .await
            .unwrap_err();
        match err {
            ProviderError::Status { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn refresh_posts_refresh_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let grant = client_for(&server, true)
            .refresh_access_token("r1")
            .await
            .unwrap();
        assert_eq!(grant.access_token, "fresh");
        assert_eq!(grant.expires_in, Some(3599));
    }

    #[tokio::test]
    async fn refresh_without_client_credentials_is_unavailable() {
        let server = MockServer::start().await;
        let err = client_for(&server, false)
            .refresh_access_token("r1")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RefreshUnavailable(_)));
    }
}
