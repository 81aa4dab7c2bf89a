//! ConfirmTkt PNR status provider.
//!
//! One POST per reservation against the public web API. The request body and
//! most headers are fixed; only the API key and client id are configurable.

use async_trait::async_trait;
use railwatch_core::config::ProviderConfig;
use railwatch_core::error::FetchError;
use railwatch_core::traits::StatusFetcher;
use railwatch_core::types::{PassengerStatus, StatusSnapshot, TrackedEntity};
use serde::{Deserialize, Deserializer};

const REQUEST_BODY: &str = r#"{"proPlanName":"CP7","emailId":"","tempToken":""}"#;
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36";

/// Fetches reservation status from the ConfirmTkt API.
pub struct ConfirmTktFetcher {
    endpoint_template: String,
    api_key: String,
    client_id: String,
    timeout: std::time::Duration,
    client: reqwest::Client,
}

impl ConfirmTktFetcher {
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            endpoint_template: config.endpoint_template.clone(),
            api_key: config.api_key.clone(),
            client_id: config.client_id.clone(),
            timeout: std::time::Duration::from_secs(config.timeout_secs),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, pnr: &str) -> String {
        self.endpoint_template.replace("{pnr}", pnr)
    }
}

#[async_trait]
impl StatusFetcher for ConfirmTktFetcher {
    fn name(&self) -> &str {
        "confirmtkt"
    }

    async fn fetch(&self, entity: &TrackedEntity) -> Result<StatusSnapshot, FetchError> {
        let url = self.endpoint(&entity.identifier);
        tracing::debug!("🚆 Fetching status for {}", entity.identifier);

        let resp = self
            .client
            .post(&url)
            .header("Accept", "*/*")
            .header("Accept-Language", "en-GB,en-US;q=0.9,en;q=0.8,hi;q=0.7")
            .header("ApiKey", self.api_key.as_str())
            .header("CT-Token", "")
            .header("CT-Userkey", "")
            .header("ClientId", self.client_id.as_str())
            .header("Content-Type", "application/json")
            .header("Origin", "https://www.confirmtkt.com")
            .header("Referer", "https://www.confirmtkt.com/")
            .header("User-Agent", USER_AGENT)
            .body(REQUEST_BODY)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        parse_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    data: Option<WireData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireData {
    pnr_response: Option<WirePnr>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WirePnr {
    #[serde(deserialize_with = "null_as_default")]
    pnr: String,
    #[serde(deserialize_with = "null_as_default")]
    train_no: String,
    #[serde(deserialize_with = "null_as_default")]
    train_name: String,
    #[serde(deserialize_with = "null_as_default")]
    doj: String,
    #[serde(deserialize_with = "null_as_default")]
    from: String,
    #[serde(deserialize_with = "null_as_default")]
    to: String,
    #[serde(deserialize_with = "null_as_default")]
    class: String,
    #[serde(deserialize_with = "null_as_default")]
    chart_prepared: bool,
    #[serde(deserialize_with = "null_as_default")]
    cache_time: String,
    #[serde(deserialize_with = "null_as_default")]
    passenger_status: Vec<WirePassenger>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WirePassenger {
    #[serde(deserialize_with = "null_as_default")]
    number: u32,
    #[serde(deserialize_with = "null_as_default")]
    booking_status: String,
    #[serde(deserialize_with = "null_as_default")]
    current_status: String,
    #[serde(deserialize_with = "null_as_default")]
    coach: String,
    #[serde(deserialize_with = "null_as_default")]
    berth: u32,
}

/// Waitlisted passengers come back with `null` coach and berth; read a null
/// like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Map the provider JSON into a snapshot.
pub(crate) fn parse_response(body: &str) -> Result<StatusSnapshot, FetchError> {
    let wire: WireResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Payload(e.to_string()))?;
    let pnr = wire
        .data
        .and_then(|d| d.pnr_response)
        .ok_or_else(|| FetchError::Payload("missing data.pnrResponse".into()))?;

    Ok(StatusSnapshot {
        pnr: pnr.pnr,
        train_no: pnr.train_no,
        train_name: pnr.train_name,
        doj: pnr.doj,
        from: pnr.from,
        to: pnr.to,
        class: pnr.class,
        chart_prepared: pnr.chart_prepared,
        cache_time: pnr.cache_time,
        passengers: pnr
            .passenger_status
            .into_iter()
            .map(|p| PassengerStatus {
                number: p.number,
                booking_status: p.booking_status,
                current_status: p.current_status,
                coach: p.coach,
                berth: p.berth,
            })
            .collect(),
    })
}
