use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderValue, USER_AGENT};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::model::{HistoryQuery, Network, Organization, Ssid};

#[derive(Debug, Clone)]
pub struct ResponseData {
    pub status: u16,
    pub body: String,
    pub json: Option<Value>,
}

/// The four Dashboard reads the tool depends on.
pub trait DashboardApi {
    fn organizations(&self) -> Result<Vec<Organization>>;
    fn networks(&self, organization_id: &str) -> Result<Vec<Network>>;
    fn ssids(&self, network_id: &str) -> Result<Vec<Ssid>>;
    /// Raw history records; normalization happens in the fetch layer.
    fn client_count_history(&self, query: &HistoryQuery) -> Result<Vec<Value>>;
}

impl<T: DashboardApi + ?Sized> DashboardApi for &T {
    fn organizations(&self) -> Result<Vec<Organization>> {
        (**self).organizations()
    }

    fn networks(&self, organization_id: &str) -> Result<Vec<Network>> {
        (**self).networks(organization_id)
    }

    fn ssids(&self, network_id: &str) -> Result<Vec<Ssid>> {
        (**self).ssids(network_id)
    }

    fn client_count_history(&self, query: &HistoryQuery) -> Result<Vec<Value>> {
        (**self).client_count_history(query)
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: Client,
    api_key: String,
}

impl ApiClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        // Url::join drops the last segment unless the base ends with a slash.
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        let parsed = Url::parse(&base).context("parsing base URL")?;
        let http = Client::builder()
            .user_agent(HeaderValue::from_static("wirelessctl/0.1"))
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            base_url: parsed,
            http,
            api_key: api_key.to_string(),
        })
    }

    pub fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ResponseData> {
        self.request(Method::GET, path, query)
    }

    pub fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self.get(path, query)?;
        let json = response
            .json
            .ok_or_else(|| anyhow!("response from `{}` is not JSON", path))?;
        serde_json::from_value(json).with_context(|| format!("decoding response from `{}`", path))
    }

    fn request(&self, method: Method, path: &str, query: &[(&str, String)]) -> Result<ResponseData> {
        let normalized = path.trim_start_matches('/');
        let url = self
            .base_url
            .join(normalized)
            .with_context(|| format!("joining path `{}` to base URL", path))?;

        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(USER_AGENT, HeaderValue::from_static("wirelessctl/0.1"));

        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request
            .send()
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("sending request to `{}`", path))?;

        let status = response.status().as_u16();
        let text = response.text().context("reading response body")?;
        let json = serde_json::from_str(&text).ok();

        Ok(ResponseData {
            status,
            body: text,
            json,
        })
    }
}

impl DashboardApi for ApiClient {
    fn organizations(&self) -> Result<Vec<Organization>> {
        self.get_json("/organizations", &[])
    }

    fn networks(&self, organization_id: &str) -> Result<Vec<Network>> {
        self.get_json(&format!("/organizations/{organization_id}/networks"), &[])
    }

    fn ssids(&self, network_id: &str) -> Result<Vec<Ssid>> {
        self.get_json(&format!("/networks/{network_id}/wireless/ssids"), &[])
    }

    fn client_count_history(&self, query: &HistoryQuery) -> Result<Vec<Value>> {
        let mut params = vec![
            ("t0", query.t0.clone()),
            ("t1", query.t1.clone()),
            ("resolution", query.resolution.seconds().to_string()),
        ];
        if let Some(ssid) = query.ssid {
            params.push(("ssid", ssid.to_string()));
        }
        let path = format!(
            "/networks/{}/wireless/clientCountHistory",
            query.network_id
        );
        // An empty body is a valid "no data" answer.
        let response = self.get(&path, &params)?;
        match response.json {
            Some(Value::Array(records)) => Ok(records),
            Some(Value::Null) => Ok(Vec::new()),
            None if response.body.trim().is_empty() => Ok(Vec::new()),
            _ => Err(anyhow!(
                "unexpected history payload from `{}` (status {})",
                path,
                response.status
            )),
        }
    }
}
