use crate::error::{Error, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{
    blocking::{Client, Response},
    redirect::Policy,
};
use std::time::Duration;

/// 元数据类调用的超时（解析、列表、删除、移动）。
pub(crate) const METADATA_TIMEOUT: Duration = Duration::from_secs(30);
/// 内容上传超时。
pub(crate) const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);
/// 内容下载超时。
pub(crate) const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// 构建一个带统一超时与重定向策略的阻塞式 HTTP 客户端。
/// 所有 Graph 调用应复用该函数，避免重复配置。
pub(crate) fn build_blocking_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .redirect(Policy::limited(10))
        .build()
        .map_err(Error::from)
}

/// 路径段转义集：保留 RFC 3986 unreserved 字符，其余全部转义。
const PATH_SEGMENT_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// 将远端路径逐段 percent-encode，自动剔除空段与多余的 `/`。
pub(crate) fn encode_drive_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT_ESCAPE).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// 把非预期状态码连同响应体一起收进错误，便于运维定位。
pub(crate) fn api_error(action: &'static str, response: Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    Error::Api {
        action,
        status,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_path_segments_individually() {
        assert_eq!(encode_drive_path("inbound/daily"), "inbound/daily");
        assert_eq!(encode_drive_path("inbound/report_a.csv"), "inbound/report_a.csv");
        assert_eq!(
            encode_drive_path("/reports 2024/q1 data/"),
            "reports%202024/q1%20data"
        );
        assert_eq!(encode_drive_path("a//b"), "a/b");
        assert_eq!(encode_drive_path("/"), "");
    }
}
