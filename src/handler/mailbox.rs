use super::{Capabilities, FileMap, RemoteTransferHandler};
use crate::api::auth::{self, Credentials};
use crate::api::drive::effective_graph_base;
use crate::api::mail::probe_recent_messages;
use crate::cache::{flush_cacheable_variables, VariableCache};
use crate::error::{Error, Result};
use crate::spec::TransferSpec;
use std::path::Path;
use tracing::info;

/// 邮件端点的通知型 handler：构造时列出最近几封收件箱邮件，
/// 作为凭据与连通性的冒烟检查。该端点不是文件存储，
/// 所有文件操作一律返回 NotSupported，且不会发起额外远端请求。
pub struct MailboxTransfer {
    spec: TransferSpec,
    credentials: Credentials,
}

impl MailboxTransfer {
    pub fn new(spec: TransferSpec, cache: Box<dyn VariableCache>) -> Result<Self> {
        spec.validate_common()?;
        let email_address = spec.require_email_address()?.to_string();
        let graph_base = effective_graph_base(&spec.protocol);

        let mut spec = spec;
        let mut credentials = auth::acquire(&spec)?;
        spec.protocol.refresh_token = credentials.refresh_token.clone();
        auth::validate_or_refresh(&mut credentials, &mut spec, cache.as_ref())?;
        flush_cacheable_variables(&spec, cache.as_ref())?;

        let subjects =
            probe_recent_messages(&graph_base, &credentials.access_token, &email_address)?;
        info!(
            task = spec.task_id.as_deref().unwrap_or(""),
            mailbox = %email_address,
            "mailbox probe passed"
        );
        for subject in &subjects {
            info!(subject = %subject, "recent inbox message");
        }

        Ok(Self { spec, credentials })
    }

    /// 构造时生效的任务配置（含刷新后写回的 refresh token）。
    pub fn spec(&self) -> &TransferSpec {
        &self.spec
    }

    /// 当前应持久化的 refresh token，供编排器在任务结束时读取。
    pub fn refresh_token(&self) -> &str {
        &self.credentials.refresh_token
    }
}

impl RemoteTransferHandler for MailboxTransfer {
    fn list_files(
        &mut self,
        _directory: Option<&str>,
        _file_pattern: Option<&str>,
    ) -> Result<FileMap> {
        Err(Error::NotSupported {
            operation: "list_files",
        })
    }

    fn pull_files(&mut self, _files: &FileMap, _local_staging_directory: &Path) -> Result<()> {
        Err(Error::NotSupported {
            operation: "pull_files",
        })
    }

    fn push_files(
        &mut self,
        _local_staging_directory: &Path,
        _file_list: Option<&FileMap>,
    ) -> Result<()> {
        Err(Error::NotSupported {
            operation: "push_files",
        })
    }

    fn handle_post_copy_action(&mut self, _files: &FileMap) -> Result<()> {
        Err(Error::NotSupported {
            operation: "handle_post_copy_action",
        })
    }

    fn create_flag_files(&mut self) -> Result<()> {
        Err(Error::NotSupported {
            operation: "create_flag_files",
        })
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            listing: false,
            transfer: false,
            post_copy: false,
            flags: false,
        }
    }
}
