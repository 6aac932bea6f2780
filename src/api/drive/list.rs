use super::client::{api_error, build_blocking_client, encode_drive_path, METADATA_TIMEOUT};
use super::models::{DriveChildEntry, DriveChildrenPage};
use crate::error::{Error, Result};
use serde::Deserialize;

/// 统一的 children 查询参数：只取必须字段，并用 $top 限定单页条目数。
const CHILDREN_QUERY: &str = "?$select=id,name,size,lastModifiedDateTime,folder,file&$top=100";

/// 根据目录构造首页 children URL。目录为空或 `/` 时列根目录，
/// 否则走 `root:/{path}:/children` 的路径寻址形式。
pub(crate) fn build_children_url(
    graph_base: &str,
    site_id: &str,
    directory: Option<&str>,
) -> String {
    match directory {
        Some(raw) if !raw.trim_matches('/').trim().is_empty() => {
            let encoded = encode_drive_path(raw);
            format!("{graph_base}/sites/{site_id}/drive/root:/{encoded}:/children{CHILDREN_QUERY}")
        }
        _ => format!("{graph_base}/sites/{site_id}/drive/root/children{CHILDREN_QUERY}"),
    }
}

/// 拉取一页子项列表。分页循环由调用方驱动，
/// 以便每页之前重新校验凭据有效性。
pub(crate) fn fetch_children_page(url: &str, access_token: &str) -> Result<DriveChildrenPage> {
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
        return Err(api_error("listing directory", response));
    }

    let payload: DriveChildrenResponse = response
        .json()
        .map_err(|e| Error::Parse(format!("failed to parse children response: {e}")))?;

    let entries = payload
        .value
        .into_iter()
        .map(DriveChildEntry::from)
        .collect();

    Ok(DriveChildrenPage {
        entries,
        next_link: payload.next_link,
    })
}

#[derive(Debug, Deserialize)]
struct DriveChildrenResponse {
    #[serde(default)]
    value: Vec<DriveItemDto>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveItemDto {
    name: Option<String>,
    size: Option<u64>,
    #[serde(rename = "lastModifiedDateTime")]
    last_modified_date_time: Option<String>,
    folder: Option<DriveFolderFacet>,
}

#[derive(Debug, Deserialize)]
struct DriveFolderFacet {}

impl From<DriveItemDto> for DriveChildEntry {
    fn from(value: DriveItemDto) -> Self {
        DriveChildEntry {
            name: value.name.unwrap_or_default(),
            size: value.size.unwrap_or(0),
            last_modified: value.last_modified_date_time,
            is_folder: value.folder.is_some(),
        }
    }
}
