use super::client::{api_error, build_blocking_client, DOWNLOAD_TIMEOUT};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// 按 item id 下载文件内容，逐字节写入目标路径，返回写入的字节数。
pub(crate) fn download_item_content(
    graph_base: &str,
    access_token: &str,
    site_id: &str,
    item_id: &str,
    destination: &Path,
) -> Result<u64> {
    let client = build_blocking_client(DOWNLOAD_TIMEOUT)?;
    let url = format!("{graph_base}/sites/{site_id}/drive/items/{item_id}/content");

    let mut response = client.get(url).bearer_auth(access_token).send()?;

    if response.status().as_u16() == 401 {
        return Err(Error::Auth {
            message: "access token rejected by graph api".to_string(),
        });
    }
    if !response.status().is_success() {
        return Err(api_error("downloading file content", response));
    }

    let file = File::create(destination)?;
    let mut writer = BufWriter::new(file);
    let bytes_copied = io::copy(&mut response, &mut writer)?;
    writer.flush()?;

    Ok(bytes_copied)
}
