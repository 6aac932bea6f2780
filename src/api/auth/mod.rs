mod refresh;

pub(crate) use refresh::exchange_refresh_token;

use crate::cache::{flush_cacheable_variables, VariableCache};
use crate::error::Result;
use crate::spec::TransferSpec;
use chrono::{DateTime, Local};
use tracing::{debug, info};

/// 当前持有的 Graph 访问凭据。由 handler 独占，刷新时整体替换。
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_token: String,
    /// 按本地时区解释的过期时刻；缺失视为已过期。
    pub expiry: Option<DateTime<Local>>,
    pub refresh_token: String,
}

impl Credentials {
    pub fn is_expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => expiry <= Local::now(),
            None => true,
        }
    }
}

/// 用配置中的 refresh token 换取一份新凭据。
pub(crate) fn acquire(spec: &TransferSpec) -> Result<Credentials> {
    exchange_refresh_token(&spec.protocol)
}

/// 每一串远端操作开始前同步调用：过期则重新换取凭据，
/// 把新的 refresh token 写回配置副本，并把声明的 cacheable
/// 变量推送给外部缓存。没有后台定时器，过期检查只发生在这里。
pub(crate) fn validate_or_refresh(
    credentials: &mut Credentials,
    spec: &mut TransferSpec,
    cache: &dyn VariableCache,
) -> Result<()> {
    debug!(
        expiry = ?credentials.expiry,
        now = %Local::now(),
        "checking credential expiry"
    );
    if !credentials.is_expired() {
        return Ok(());
    }

    info!("credentials expired, refreshing");
    *credentials = exchange_refresh_token(&spec.protocol)?;
    spec.protocol.refresh_token = credentials.refresh_token.clone();
    flush_cacheable_variables(spec, cache)?;
    Ok(())
}
