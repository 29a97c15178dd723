use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, PRAGMA, REFERER};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::error::OmsError;
use super::types::{
    Credentials, LocationId, LoginRequest, LoginResponse, PageWindow, PendingFilter, PendingPage,
    PendingRequest, PendingResponse, ReasonDetailResponse, Session, Submission,
};

pub const DEFAULT_BASE_URL: &str = "https://omsapi.geourja.com";
const WEB_REFERER: &str = "https://smartoms.geourja.com/";

/// The operations the automation needs from the OMS.
///
/// [`OmsClient`] talks HTTP; tests substitute in-memory gateways.
pub trait OmsGateway {
    async fn login(&self, credentials: &Credentials) -> Result<Session, OmsError>;

    async fn fetch_pending_page(
        &self,
        session: &Session,
        filter: &PendingFilter,
        window: PageWindow,
    ) -> Result<PendingPage, OmsError>;

    async fn fetch_location_candidates(
        &self,
        session: &Session,
        outage_id: &str,
        feeder_id: Option<i64>,
        pole_type: Option<&str>,
    ) -> Result<Vec<LocationId>, OmsError>;

    async fn submit_classification(
        &self,
        session: &Session,
        submission: &Submission,
    ) -> Result<(), OmsError>;
}

pub struct OmsClient {
    client: Client,
    base_url: String,
}

impl OmsClient {
    pub fn new(base_url: &str) -> Result<Self, OmsError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request carrying the headers the OMS web client sends.
    fn request(&self, method: Method, path: &str, session: &Session) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(ACCEPT, "application/json, text/plain, */*")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("bearer {}", session.token()))
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .header(REFERER, WEB_REFERER)
    }
}

/// Fails on non-2xx, otherwise returns the body text.
async fn read_body(response: Response) -> Result<String, OmsError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(OmsError::ApiError {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(body)
}

fn decode<T: DeserializeOwned>(body: &str, context: impl Into<String>) -> Result<T, OmsError> {
    serde_json::from_str(body).map_err(|source| OmsError::Decode {
        context: context.into(),
        source,
    })
}

impl OmsGateway for OmsClient {
    async fn login(&self, credentials: &Credentials) -> Result<Session, OmsError> {
        if credentials.emp_no.trim().is_empty() || credentials.password.is_empty() {
            return Err(OmsError::Rejected(
                "employee number and password are required".into(),
            ));
        }

        // No token yet, so the web client literally sends "bearer null".
        let response = self
            .client
            .post(self.url("/auth/login"))
            .header(ACCEPT, "*/*")
            .header(CONTENT_TYPE, "application/json; charset=UTF-8")
            .header(AUTHORIZATION, "bearer null")
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .header(REFERER, WEB_REFERER)
            .json(&LoginRequest::from(credentials))
            .send()
            .await?;

        let body = read_body(response).await?;
        let login: LoginResponse = decode(&body, "login response")?;

        if login.status == Some(false) {
            let message = login.message.unwrap_or_else(|| "status false".into());
            return Err(OmsError::Rejected(message));
        }
        let token = login
            .token()
            .ok_or_else(|| OmsError::Rejected("auth token missing from response".into()))?;

        let session = Session::new(token, credentials.emp_no.clone());
        info!(
            emp_no = session.emp_no(),
            token = %session.masked_token(),
            "logged in"
        );
        Ok(session)
    }

    async fn fetch_pending_page(
        &self,
        session: &Session,
        filter: &PendingFilter,
        window: PageWindow,
    ) -> Result<PendingPage, OmsError> {
        let response = self
            .request(Method::POST, "/reason/pending", session)
            .json(&PendingRequest::new(filter, window))
            .send()
            .await?;

        let body = read_body(response).await?;
        let page: PendingResponse = decode(&body, "pending outages")?;
        Ok(page.into())
    }

    async fn fetch_location_candidates(
        &self,
        session: &Session,
        outage_id: &str,
        feeder_id: Option<i64>,
        pole_type: Option<&str>,
    ) -> Result<Vec<LocationId>, OmsError> {
        let path = match feeder_id {
            Some(feeder) => format!("/reason/{feeder}/{outage_id}"),
            None => format!("/reason/outage/{outage_id}"),
        };
        let response = self.request(Method::GET, &path, session).send().await?;

        let body = read_body(response).await?;
        let detail: ReasonDetailResponse = decode(&body, format!("reason detail {outage_id}"))?;
        if detail.status == Some(false) {
            let message = detail.message.unwrap_or_else(|| "status false".into());
            return Err(OmsError::Rejected(message));
        }
        let ids = detail.pole_ids(pole_type);
        debug!(outage_id, poles = ids.len(), "extracted pole ids");
        Ok(ids)
    }

    async fn submit_classification(
        &self,
        session: &Session,
        submission: &Submission,
    ) -> Result<(), OmsError> {
        let path = format!("/reason/outage/{}", submission.outage_id);
        let response = self
            .request(Method::POST, &path, session)
            .json(&submission.payload())
            .send()
            .await?;

        read_body(response).await?;
        Ok(())
    }
}
