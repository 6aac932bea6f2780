use super::{Capabilities, FileMap, RemoteTransferHandler};
use crate::api::auth::{self, Credentials};
use crate::api::drive::{
    build_children_url, delete_item, download_item_content, effective_graph_base,
    fetch_children_page, patch_item_location, resolve_item_id, resolve_site_id, upload_content,
    RemoteFile,
};
use crate::cache::{flush_cacheable_variables, VariableCache};
use crate::error::{Error, Result};
use crate::spec::{CompiledRename, PostCopyActionKind, TransferSpec};
use chrono::NaiveDateTime;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};

/// Graph 返回的 lastModifiedDateTime 的解析格式。
const MODIFIED_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const DEFAULT_CONFLICT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// SharePoint 站点 drive 的传输 handler。
/// 构造时换取凭据并解析站点 id，之后站点 id 在实例生命周期内复用。
pub struct SharepointTransfer {
    spec: TransferSpec,
    cache: Box<dyn VariableCache>,
    credentials: Credentials,
    graph_base: String,
    site_id: String,
    rename: Option<CompiledRename>,
    post_copy_rename: Option<CompiledRename>,
    conflict_backoff_unit: Duration,
}

impl SharepointTransfer {
    pub fn new(spec: TransferSpec, cache: Box<dyn VariableCache>) -> Result<Self> {
        spec.validate_common()?;
        let (site_hostname, site_name) = {
            let (hostname, site) = spec.require_site()?;
            (hostname.to_string(), site.to_string())
        };
        let rename = spec.rename.as_ref().map(|rule| rule.compile()).transpose()?;
        let post_copy_rename = spec
            .post_copy_action
            .as_ref()
            .map(|action| action.compile_rename())
            .transpose()?
            .flatten();
        let graph_base = effective_graph_base(&spec.protocol);

        let mut spec = spec;
        let mut credentials = auth::acquire(&spec)?;
        spec.protocol.refresh_token = credentials.refresh_token.clone();
        auth::validate_or_refresh(&mut credentials, &mut spec, cache.as_ref())?;
        flush_cacheable_variables(&spec, cache.as_ref())?;

        let site_id = resolve_site_id(
            &graph_base,
            &credentials.access_token,
            &site_hostname,
            &site_name,
        )?;
        info!(
            task = spec.task_id.as_deref().unwrap_or(""),
            site = %site_name,
            site_id = %site_id,
            "resolved sharepoint site"
        );

        Ok(Self {
            spec,
            cache,
            credentials,
            graph_base,
            site_id,
            rename,
            post_copy_rename,
            conflict_backoff_unit: DEFAULT_CONFLICT_BACKOFF_UNIT,
        })
    }

    /// 构造时生效的任务配置（含刷新后写回的 refresh token）。
    pub fn spec(&self) -> &TransferSpec {
        &self.spec
    }

    /// 当前应持久化的 refresh token，供编排器在任务结束时读取。
    pub fn refresh_token(&self) -> &str {
        &self.credentials.refresh_token
    }

    /// 调整上传冲突重试的退避基准单位（默认 1 秒）。
    pub fn set_conflict_backoff_unit(&mut self, unit: Duration) {
        self.conflict_backoff_unit = unit;
    }

    fn validate_or_refresh_creds(&mut self) -> Result<()> {
        auth::validate_or_refresh(&mut self.credentials, &mut self.spec, self.cache.as_ref())
    }

    /// 上传文件名的派生：可选的正则替换规则应用在去掉目录前缀之后。
    fn derive_push_name(&self, local_name: &str) -> String {
        match &self.rename {
            Some(rule) => {
                let renamed = rule.apply(local_name);
                if renamed != local_name {
                    info!(from = %local_name, to = %renamed, "renaming file for upload");
                }
                renamed
            }
            None => local_name.to_string(),
        }
    }

    /// 上传的目标路径：配置了目的子目录时拼在文件名之前。
    fn remote_push_path(&self, file_name: &str) -> String {
        match self.spec.directory.as_deref().map(|d| d.trim_matches('/')) {
            Some(dir) if !dir.is_empty() => format!("{dir}/{file_name}"),
            _ => file_name.to_string(),
        }
    }

    fn resolve_file_id(&self, remote_path: &str) -> Result<String> {
        resolve_item_id(
            &self.graph_base,
            &self.credentials.access_token,
            &self.site_id,
            remote_path,
        )
    }
}

impl RemoteTransferHandler for SharepointTransfer {
    fn list_files(
        &mut self,
        directory: Option<&str>,
        file_pattern: Option<&str>,
    ) -> Result<FileMap> {
        let pattern = file_pattern
            .map(|raw| {
                Regex::new(raw)
                    .map_err(|e| Error::InvalidSpec(format!("invalid file pattern '{raw}': {e}")))
            })
            .transpose()?;
        let listed_directory = directory.unwrap_or("").trim_matches('/').to_string();
        info!(directory = %listed_directory, pattern = ?file_pattern, "listing remote files");

        let mut remote_files = FileMap::new();
        let mut url = build_children_url(&self.graph_base, &self.site_id, directory);
        loop {
            self.validate_or_refresh_creds()?;
            let page = match fetch_children_page(&url, &self.credentials.access_token) {
                Ok(page) => page,
                Err(e) => {
                    error!(directory = %listed_directory, error = %e, "listing aborted");
                    return Err(e);
                }
            };
            if page.entries.is_empty() {
                break;
            }
            for entry in page.entries {
                // 目录永远跳过，不做递归。
                if entry.is_folder {
                    continue;
                }
                if let Some(re) = &pattern {
                    if !matches_prefix(re, &entry.name) {
                        continue;
                    }
                }
                info!(name = %entry.name, "found file");
                let modified_time = parse_modified_time(entry.last_modified.as_deref())?;
                remote_files.insert(
                    entry.name,
                    RemoteFile {
                        size: entry.size,
                        modified_time,
                        directory: listed_directory.clone(),
                    },
                );
            }
            match page.next_link {
                Some(next) => url = next,
                None => break,
            }
        }
        Ok(remote_files)
    }

    fn pull_files(&mut self, files: &FileMap, local_staging_directory: &Path) -> Result<()> {
        self.validate_or_refresh_creds()?;

        let total = files.len();
        let mut failed = 0_usize;
        for (name, record) in files {
            let remote_path = join_remote_path(&record.directory, name);
            info!(file = %remote_path, "downloading file");
            let destination = local_staging_directory.join(file_base_name(name));
            let outcome = self.resolve_file_id(&remote_path).and_then(|item_id| {
                download_item_content(
                    &self.graph_base,
                    &self.credentials.access_token,
                    &self.site_id,
                    &item_id,
                    &destination,
                )
            });
            match outcome {
                Ok(bytes) => info!(file = %name, bytes, "downloaded file"),
                Err(e) => {
                    error!(file = %remote_path, error = %e, "failed to transfer file");
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(Error::Transfer { failed, total });
        }
        Ok(())
    }

    fn push_files(
        &mut self,
        local_staging_directory: &Path,
        file_list: Option<&FileMap>,
    ) -> Result<()> {
        self.validate_or_refresh_creds()?;

        let names: Vec<String> = match file_list {
            Some(list) => list.keys().cloned().collect(),
            // 未给出清单时取暂存目录直接子项里的普通文件，不递归。
            None => {
                let mut found = Vec::new();
                for dir_entry in fs::read_dir(local_staging_directory)? {
                    let dir_entry = dir_entry?;
                    if dir_entry.file_type()?.is_file() {
                        found.push(dir_entry.file_name().to_string_lossy().into_owned());
                    }
                }
                found.sort();
                found
            }
        };

        let total = names.len();
        let mut failed = 0_usize;
        for name in names {
            let base_name = file_base_name(&name).to_string();
            let remote_path = self.remote_push_path(&self.derive_push_name(&base_name));
            info!(file = %base_name, remote = %remote_path, "uploading file");

            let content = match fs::read(local_staging_directory.join(&base_name)) {
                Ok(content) => content,
                Err(e) => {
                    error!(file = %base_name, error = %e, "failed to read staged file");
                    failed += 1;
                    continue;
                }
            };
            match upload_content(
                &self.graph_base,
                &self.credentials.access_token,
                &self.site_id,
                &remote_path,
                &content,
                self.conflict_backoff_unit,
            ) {
                Ok(web_url) => {
                    info!(file = %base_name, web_url = web_url.as_deref().unwrap_or(""), "uploaded file")
                }
                Err(e) => {
                    error!(file = %base_name, error = %e, "failed to upload file");
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(Error::Transfer { failed, total });
        }
        Ok(())
    }

    fn handle_post_copy_action(&mut self, files: &FileMap) -> Result<()> {
        let Some(action_spec) = self.spec.post_copy_action.clone() else {
            debug!("no post copy action configured");
            return Ok(());
        };
        self.validate_or_refresh_creds()?;

        match action_spec.action {
            PostCopyActionKind::Delete => {
                for (name, record) in files {
                    let remote_path = join_remote_path(&record.directory, name);
                    info!(file = %remote_path, "deleting file");
                    let outcome = self.resolve_file_id(&remote_path).and_then(|item_id| {
                        delete_item(
                            &self.graph_base,
                            &self.credentials.access_token,
                            &self.site_id,
                            &item_id,
                        )
                    });
                    // 部分删除不允许静默继续，首个失败立即中止。
                    if let Err(e) = outcome {
                        error!(file = %remote_path, error = %e, "failed to delete file");
                        return Err(e);
                    }
                }
            }
            PostCopyActionKind::Move | PostCopyActionKind::Rename => {
                // destination 在构造阶段已校验存在。
                let destination = action_spec.destination.clone().unwrap_or_default();
                for (name, record) in files {
                    let base_name = file_base_name(name);
                    let new_name = match (&action_spec.action, &self.post_copy_rename) {
                        (PostCopyActionKind::Rename, Some(rule)) => rule.apply(base_name),
                        _ => base_name.to_string(),
                    };
                    let remote_path = join_remote_path(&record.directory, name);
                    info!(
                        from = %remote_path,
                        to = %format!("{}/{new_name}", destination.trim_matches('/')),
                        "moving file"
                    );
                    let outcome = self.resolve_file_id(&remote_path).and_then(|item_id| {
                        let destination_id = self.resolve_file_id(&destination)?;
                        patch_item_location(
                            &self.graph_base,
                            &self.credentials.access_token,
                            &self.site_id,
                            &item_id,
                            &destination_id,
                            &new_name,
                        )
                    });
                    if let Err(e) = outcome {
                        error!(file = %remote_path, error = %e, "failed to move file");
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }

    fn create_flag_files(&mut self) -> Result<()> {
        let Some(flags) = self.spec.flags.clone() else {
            return Err(Error::InvalidSpec(
                "no flag file configured for this transfer".to_string(),
            ));
        };
        self.validate_or_refresh_creds()?;

        info!(path = %flags.full_path, "creating flag file");
        match upload_content(
            &self.graph_base,
            &self.credentials.access_token,
            &self.site_id,
            &flags.full_path,
            b"",
            self.conflict_backoff_unit,
        ) {
            Ok(_) => Ok(()),
            Err(e) => {
                error!(path = %flags.full_path, error = %e, "failed to create flag file");
                Err(e)
            }
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            listing: true,
            transfer: true,
            post_copy: true,
            flags: true,
        }
    }
}

/// 与任务定义约定一致的前缀匹配：命中必须从名字开头算起。
fn matches_prefix(pattern: &Regex, name: &str) -> bool {
    pattern.find(name).is_some_and(|m| m.start() == 0)
}

/// 去掉目录前缀，保留文件基础名。
fn file_base_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn join_remote_path(directory: &str, name: &str) -> String {
    let dir = directory.trim_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

fn parse_modified_time(raw: Option<&str>) -> Result<i64> {
    let Some(raw) = raw else {
        return Err(Error::Parse(
            "listing entry carried no lastModifiedDateTime".to_string(),
        ));
    };
    NaiveDateTime::parse_from_str(raw, MODIFIED_TIME_FORMAT)
        .map(|parsed| parsed.and_utc().timestamp())
        .map_err(|e| Error::Parse(format!("failed to parse lastModifiedDateTime '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_matching_is_anchored_at_name_start() {
        let pattern = Regex::new("report").unwrap();
        assert!(matches_prefix(&pattern, "report_2024.csv"));
        assert!(!matches_prefix(&pattern, "monthly_report.csv"));
    }

    #[test]
    fn modified_time_parses_epoch_seconds() {
        let parsed = parse_modified_time(Some("2024-03-01T12:00:00Z")).unwrap();
        assert_eq!(parsed, 1_709_294_400);
        assert!(parse_modified_time(Some("not-a-timestamp")).is_err());
        assert!(parse_modified_time(None).is_err());
    }

    #[test]
    fn remote_paths_join_without_duplicate_slashes() {
        assert_eq!(join_remote_path("", "a.csv"), "a.csv");
        assert_eq!(join_remote_path("/inbound/", "a.csv"), "inbound/a.csv");
        assert_eq!(file_base_name("inbound/a.csv"), "a.csv");
        assert_eq!(file_base_name("a.csv"), "a.csv");
    }
}
