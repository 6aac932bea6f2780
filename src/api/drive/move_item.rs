use super::client::{api_error, build_blocking_client, METADATA_TIMEOUT};
use crate::error::{Error, Result};
use serde::Serialize;

/// 把 item 挂到新的父目录下，同时设置名字。
/// move 与 rename 共用这一个调用，区别只在调用方给出的 `new_name`。
/// 服务端约定成功返回 200，其余状态视为失败。
pub(crate) fn patch_item_location(
    graph_base: &str,
    access_token: &str,
    site_id: &str,
    item_id: &str,
    new_parent_id: &str,
    new_name: &str,
) -> Result<()> {
    let body = MoveRequest {
        parent_reference: ParentRefDto {
            id: new_parent_id.to_string(),
        },
        name: new_name.to_string(),
    };

    let client = build_blocking_client(METADATA_TIMEOUT)?;
    let url = format!("{graph_base}/sites/{site_id}/drive/items/{item_id}");

    let response = client
        .patch(url)
        .bearer_auth(access_token)
        .header("Accept", "application/json")
        .json(&body)
        .send()?;

    if response.status().as_u16() == 401 {
        return Err(Error::Auth {
            message: "access token rejected by graph api".to_string(),
        });
    }
    if response.status().as_u16() != 200 {
        return Err(api_error("moving item", response));
    }

    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MoveRequest {
    parent_reference: ParentRefDto,
    name: String,
}

#[derive(Debug, Serialize)]
struct ParentRefDto {
    id: String,
}
