use super::Credentials;
use crate::error::{Error, Result};
use crate::spec::ProtocolSpec;
use chrono::{Duration as ChronoDuration, Local};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
const TOKEN_PATH: &str = "oauth2/v2.0/token";
/// `.default` 覆盖应用已获同意的全部 Graph 权限；
/// `offline_access` 保证响应里带回可轮换的 refresh token。
const SCOPE: &str = "https://graph.microsoft.com/.default offline_access";

/// 向 token 端点提交 refresh token 换取新的访问凭据。
/// 过期时刻按 `expires_in` 基于本地时钟推算。
pub(crate) fn exchange_refresh_token(protocol: &ProtocolSpec) -> Result<Credentials> {
    let params = [
        ("client_id", protocol.client_id.as_str()),
        ("grant_type", "refresh_token"),
        ("refresh_token", protocol.refresh_token.as_str()),
        ("scope", SCOPE),
    ];

    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

    let authority = protocol
        .authority_url
        .as_deref()
        .unwrap_or(DEFAULT_AUTHORITY)
        .trim_end_matches('/');
    let token_url = format!("{authority}/{}/{TOKEN_PATH}", protocol.tenant_id);
    let response = client.post(token_url).form(&params).send()?;

    if !response.status().is_success() {
        return Err(Error::Auth {
            message: format!("token endpoint returned HTTP {}", response.status()),
        });
    }

    let payload: TokenResponse = response
        .json()
        .map_err(|e| Error::Parse(format!("failed to parse token response: {e}")))?;

    if let Some(error) = payload.error {
        let description = payload.error_description.unwrap_or_default();
        return Err(Error::Auth {
            message: format!("{error}: {description}"),
        });
    }

    let access_token = payload.access_token.ok_or_else(|| Error::Auth {
        message: "missing access_token in token response".to_string(),
    })?;

    Ok(Credentials {
        access_token,
        expiry: payload
            .expires_in
            .map(|seconds| Local::now() + ChronoDuration::seconds(seconds)),
        // 端点未轮换时沿用原 refresh token。
        refresh_token: payload
            .refresh_token
            .unwrap_or_else(|| protocol.refresh_token.clone()),
    })
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}
