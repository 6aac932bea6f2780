use super::client::{api_error, build_blocking_client, encode_drive_path, UPLOAD_TIMEOUT};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::thread;
use std::time::Duration;
use tracing::warn;

/// 同一路径的内容写入最多尝试的次数（含首次）。
const CONFLICT_MAX_ATTEMPTS: u32 = 5;

/// 第 `attempt` 次尝试失败后的退避时长：基准单位逐次翻倍（1、2、4、8）。
pub(crate) fn conflict_backoff(attempt: u32, unit: Duration) -> Duration {
    unit * 2_u32.pow(attempt.saturating_sub(1))
}

/// 以覆盖语义把内容写入远端路径。服务端返回 409 冲突时按指数退避重试，
/// 预算耗尽仍冲突则报 ConflictExhausted；其余非成功状态立即失败。
/// 成功时返回服务端给出的 webUrl（若有）。
pub(crate) fn upload_content(
    graph_base: &str,
    access_token: &str,
    site_id: &str,
    remote_path: &str,
    content: &[u8],
    backoff_unit: Duration,
) -> Result<Option<String>> {
    let encoded = encode_drive_path(remote_path);
    let url = format!(
        "{graph_base}/sites/{site_id}/drive/root:/{encoded}:/content?@microsoft.graph.conflictBehavior=replace"
    );
    let client = build_blocking_client(UPLOAD_TIMEOUT)?;

    let mut attempt = 0;
    loop {
        attempt += 1;
        let response = client
            .put(&url)
            .bearer_auth(access_token)
            .header("Content-Type", "application/octet-stream")
            .body(content.to_vec())
            .send()?;

        let status = response.status();
        if status.as_u16() == 409 {
            if attempt >= CONFLICT_MAX_ATTEMPTS {
                return Err(Error::ConflictExhausted {
                    path: remote_path.to_string(),
                    attempts: attempt,
                });
            }
            let delay = conflict_backoff(attempt, backoff_unit);
            warn!(
                path = %remote_path,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "upload conflicted, backing off before retry"
            );
            thread::sleep(delay);
            continue;
        }
        if status.as_u16() == 401 {
            return Err(Error::Auth {
                message: "access token rejected by graph api".to_string(),
            });
        }
        if !status.is_success() {
            return Err(api_error("uploading file content", response));
        }

        let payload: UploadResponseDto = response
            .json()
            .map_err(|e| Error::Parse(format!("failed to parse upload response: {e}")))?;
        return Ok(payload.web_url);
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponseDto {
    web_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn backoff_schedule_doubles_from_one_unit() {
        let unit = Duration::from_secs(1);
        let delays: Vec<u64> = (1..=4)
            .map(|attempt| conflict_backoff(attempt, unit).as_secs())
            .collect();
        assert_eq!(delays, vec![1, 2, 4, 8]);
    }

    /// 读完一个完整的 HTTP 请求（头部 + Content-Length 指定的请求体）。
    fn read_request(stream: &mut TcpStream) {
        let mut data = Vec::new();
        let mut buf = [0_u8; 4096];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => return,
                Ok(n) => data.extend_from_slice(&buf[..n]),
                Err(_) => return,
            }
            let Some(header_end) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&data[..header_end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                return;
            }
        }
    }

    /// 按脚本顺序逐个连接返回状态码的极简 HTTP 服务。
    fn spawn_scripted_server(statuses: Vec<u16>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("failed to bind test listener");
        let address = listener.local_addr().expect("listener has no address");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        std::thread::spawn(move || {
            for status in statuses {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                read_request(&mut stream);
                counter.fetch_add(1, Ordering::SeqCst);
                let body = if status == 200 {
                    r#"{"id":"item-1","webUrl":"https://contoso.example/doc.csv"}"#
                } else {
                    r#"{"error":{"code":"resourceLocked"}}"#
                };
                let response = format!(
                    "HTTP/1.1 {status} STATUS\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        (format!("http://{address}"), hits)
    }

    #[test]
    fn conflict_then_success_retries_until_the_fifth_attempt() {
        let (base, hits) = spawn_scripted_server(vec![409, 409, 409, 409, 200]);
        let result = upload_content(
            &base,
            "token",
            "site-1",
            "report.csv",
            b"payload",
            Duration::from_millis(1),
        );
        assert_eq!(
            result.expect("upload should eventually succeed").as_deref(),
            Some("https://contoso.example/doc.csv")
        );
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn permanent_conflict_exhausts_after_five_attempts() {
        let (base, hits) = spawn_scripted_server(vec![409; 5]);
        let result = upload_content(
            &base,
            "token",
            "site-1",
            "report.csv",
            b"payload",
            Duration::from_millis(1),
        );
        match result {
            Err(Error::ConflictExhausted { attempts, .. }) => assert_eq!(attempts, 5),
            other => panic!("expected ConflictExhausted, got {other:?}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn non_conflict_failure_is_terminal_without_retry() {
        let (base, hits) = spawn_scripted_server(vec![503]);
        let result = upload_content(
            &base,
            "token",
            "site-1",
            "report.csv",
            b"payload",
            Duration::from_millis(1),
        );
        match result {
            Err(Error::Api { status, .. }) => assert_eq!(status, 503),
            other => panic!("expected Api error, got {other:?}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
