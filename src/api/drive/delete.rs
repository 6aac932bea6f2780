use super::client::{api_error, build_blocking_client, METADATA_TIMEOUT};
use crate::error::{Error, Result};

/// 按 item id 删除远端文件。只有 204 算成功，其余状态一律报错。
pub(crate) fn delete_item(
    graph_base: &str,
    access_token: &str,
    site_id: &str,
    item_id: &str,
) -> Result<()> {
    let client = build_blocking_client(METADATA_TIMEOUT)?;
    let url = format!("{graph_base}/sites/{site_id}/drive/items/{item_id}");

    let response = client
        .delete(url)
        .bearer_auth(access_token)
        .header("Accept", "application/json")
        .send()?;

    if response.status().as_u16() == 401 {
        return Err(Error::Auth {
            message: "access token rejected by graph api".to_string(),
        });
    }
    if response.status().as_u16() != 204 {
        return Err(api_error("deleting item", response));
    }

    Ok(())
}
