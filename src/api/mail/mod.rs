use crate::api::drive::client::{api_error, build_blocking_client};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// 连通性探测拉取的最近邮件条数。
const PROBE_MESSAGE_COUNT: u32 = 3;
/// 探测调用的超时，比元数据调用更短。
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// 列出收件箱最近几封邮件的主题，作为凭据与连通性的冒烟检查。
pub(crate) fn probe_recent_messages(
    graph_base: &str,
    access_token: &str,
    email_address: &str,
) -> Result<Vec<String>> {
    let client = build_blocking_client(PROBE_TIMEOUT)?;
    let url = format!(
        "{graph_base}/users/{email_address}/mailFolders/inbox/messages?$top={PROBE_MESSAGE_COUNT}&$select=subject"
    );

    let response = client
        .get(url)
        .bearer_auth(access_token)
        .header("Accept", "application/json")
        .send()?;

    if response.status().as_u16() == 401 {
        return Err(Error::Auth {
            message: "access token rejected by graph api".to_string(),
        });
    }
    if !response.status().is_success() {
        return Err(api_error("listing inbox messages", response));
    }

    let status = response.status().as_u16();
    let payload: MessagesResponse = response
        .json()
        .map_err(|e| Error::Parse(format!("failed to parse messages response: {e}")))?;

    if let Some(error) = payload.error {
        return Err(Error::Api {
            action: "listing inbox messages",
            status,
            body: error.message.unwrap_or_default(),
        });
    }

    Ok(payload
        .value
        .into_iter()
        .filter_map(|message| message.subject)
        .collect())
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    value: Vec<MessageDto>,
    error: Option<GraphErrorDto>,
}

#[derive(Debug, Deserialize)]
struct MessageDto {
    subject: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorDto {
    message: Option<String>,
}
