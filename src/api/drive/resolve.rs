use super::client::{build_blocking_client, encode_drive_path, METADATA_TIMEOUT};
use crate::error::{Error, Result};
use serde::Deserialize;

/// 把配置的站点主机名 + 站点名解析为站点 id。
/// handler 构造时调用一次，结果在实例生命周期内缓存。
pub(crate) fn resolve_site_id(
    graph_base: &str,
    access_token: &str,
    site_hostname: &str,
    site_name: &str,
) -> Result<String> {
    let path = format!("{site_hostname}:/sites/{site_name}");
    let url = format!("{graph_base}/sites/{path}");
    fetch_identifier(&url, access_token, path)
}

/// 把人类可读的远端路径解析为 API 寻址用的 item id。
/// 每次调用都重新解析，不做任何缓存。
pub(crate) fn resolve_item_id(
    graph_base: &str,
    access_token: &str,
    site_id: &str,
    path: &str,
) -> Result<String> {
    let encoded = encode_drive_path(path);
    let url = if encoded.is_empty() {
        format!("{graph_base}/sites/{site_id}/drive/root")
    } else {
        format!("{graph_base}/sites/{site_id}/drive/root:/{encoded}")
    };
    fetch_identifier(&url, access_token, path.to_string())
}

fn fetch_identifier(url: &str, access_token: &str, path: String) -> Result<String> {
    let client = build_blocking_client(METADATA_TIMEOUT)?;

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
        let status = response.status();
        let body = response.text().unwrap_or_default();
        return Err(Error::Lookup {
            path,
            message: format!("graph api returned HTTP {status}: {body}"),
        });
    }

    let payload: IdentifierDto = response
        .json()
        .map_err(|e| Error::Parse(format!("failed to parse identifier response: {e}")))?;

    match payload.id {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(Error::Lookup {
            path,
            message: "response carried no identifier".to_string(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct IdentifierDto {
    id: Option<String>,
}
