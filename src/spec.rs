use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// 编排器为单个任务下发的配置树。字段命名与任务定义 JSON 对齐，
/// 反序列化后即为只读（刷新 refresh token 时由 handler 原位更新）。
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSpec {
    #[serde(default)]
    pub task_id: Option<String>,
    pub protocol: ProtocolSpec,
    /// SharePoint 端点寻址：站点主机名 + 站点名。
    #[serde(default)]
    pub site_hostname: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
    /// 邮件端点寻址：收件箱所属邮箱地址。
    #[serde(default)]
    pub source_email_address: Option<String>,
    /// 作为目的端时，上传文件统一放置的远端子目录。
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub rename: Option<RenameRule>,
    #[serde(default)]
    pub post_copy_action: Option<PostCopyActionSpec>,
    #[serde(default)]
    pub cacheable_variables: Option<Vec<CacheableVariable>>,
    #[serde(default)]
    pub flags: Option<FlagsSpec>,
}

/// 协议层参数：token 交换所需的凭据与可选的端点覆盖。
/// `authorityUrl` / `graphUrl` 默认为公开云端点，私有云或测试环境可覆盖。
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolSpec {
    pub client_id: String,
    pub tenant_id: String,
    pub refresh_token: String,
    #[serde(default)]
    pub authority_url: Option<String>,
    #[serde(default)]
    pub graph_url: Option<String>,
}

/// 上传时对文件名做的正则替换规则。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenameRule {
    pub pattern: String,
    pub sub: String,
}

impl RenameRule {
    /// 构造阶段编译正则，配置错误在第一次远端调用前暴露。
    pub(crate) fn compile(&self) -> Result<CompiledRename> {
        let regex = Regex::new(&self.pattern)
            .map_err(|e| Error::InvalidSpec(format!("invalid rename pattern '{}': {e}", self.pattern)))?;
        Ok(CompiledRename {
            regex,
            sub: self.sub.clone(),
        })
    }
}

/// 编译后的重命名规则，handler 构造时生成一次。
#[derive(Debug, Clone)]
pub(crate) struct CompiledRename {
    regex: Regex,
    sub: String,
}

impl CompiledRename {
    /// 对文件名应用替换；与任务定义一致，替换所有匹配处。
    pub(crate) fn apply(&self, name: &str) -> String {
        self.regex.replace_all(name, self.sub.as_str()).into_owned()
    }
}

/// 传输完成后对源文件执行的动作。
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCopyActionSpec {
    pub action: PostCopyActionKind,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostCopyActionKind {
    Delete,
    Move,
    Rename,
}

impl PostCopyActionSpec {
    /// 校验动作所需字段齐全：move/rename 需要 destination，
    /// rename 还需要 pattern 与 sub。
    pub(crate) fn validate(&self) -> Result<()> {
        match self.action {
            PostCopyActionKind::Delete => Ok(()),
            PostCopyActionKind::Move => self.require_destination(),
            PostCopyActionKind::Rename => {
                self.require_destination()?;
                if self.pattern.is_none() || self.sub.is_none() {
                    return Err(Error::InvalidSpec(
                        "postCopyAction rename requires both pattern and sub".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    fn require_destination(&self) -> Result<()> {
        match self.destination.as_deref() {
            Some(dest) if !dest.trim().is_empty() => Ok(()),
            _ => Err(Error::InvalidSpec(
                "postCopyAction move/rename requires a destination".to_string(),
            )),
        }
    }

    /// rename 动作的替换规则；move/delete 返回 None。
    pub(crate) fn compile_rename(&self) -> Result<Option<CompiledRename>> {
        if self.action != PostCopyActionKind::Rename {
            return Ok(None);
        }
        let rule = RenameRule {
            pattern: self.pattern.clone().unwrap_or_default(),
            sub: self.sub.clone().unwrap_or_default(),
        };
        rule.compile().map(Some)
    }
}

/// 值变化后需要同步到外部缓存的配置字段描述。
/// `variableName` 是相对配置树根的点号路径，如 `protocol.refreshToken`。
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheableVariable {
    pub variable_name: String,
    #[serde(default)]
    pub caching_plugin: Option<String>,
    #[serde(default)]
    pub cache_args: Option<serde_json::Value>,
}

/// 传输完成后写入的标志文件（零字节标记对象）的远端路径。
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagsSpec {
    pub full_path: String,
}

impl TransferSpec {
    /// 两个 handler 变体共用的校验：端点覆盖必须是合法 URL，
    /// 重命名与 post-copy 规则的正则必须可编译。
    pub(crate) fn validate_common(&self) -> Result<()> {
        for (field, value) in [
            ("protocol.authorityUrl", &self.protocol.authority_url),
            ("protocol.graphUrl", &self.protocol.graph_url),
        ] {
            if let Some(raw) = value {
                Url::parse(raw)
                    .map_err(|e| Error::InvalidSpec(format!("{field} '{raw}' is not a valid URL: {e}")))?;
            }
        }
        if let Some(rule) = &self.rename {
            rule.compile()?;
        }
        if let Some(action) = &self.post_copy_action {
            action.validate()?;
            action.compile_rename()?;
        }
        Ok(())
    }

    /// SharePoint 端点必填的寻址字段。
    pub(crate) fn require_site(&self) -> Result<(&str, &str)> {
        match (self.site_hostname.as_deref(), self.site_name.as_deref()) {
            (Some(hostname), Some(site)) if !hostname.is_empty() && !site.is_empty() => {
                Ok((hostname, site))
            }
            _ => Err(Error::InvalidSpec(
                "siteHostname and siteName are required for a sharepoint endpoint".to_string(),
            )),
        }
    }

    /// 邮件端点必填的寻址字段。
    pub(crate) fn require_email_address(&self) -> Result<&str> {
        match self.source_email_address.as_deref() {
            Some(address) if !address.trim().is_empty() => Ok(address),
            _ => Err(Error::InvalidSpec(
                "sourceEmailAddress is required for a mail endpoint".to_string(),
            )),
        }
    }
}
