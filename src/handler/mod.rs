pub mod mailbox;
pub mod sharepoint;

use crate::api::drive::RemoteFile;
use crate::error::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// 一次列表/传输周期内的文件集合，以文件名为键。
/// 有序映射保证批处理与 post-copy 动作的处理顺序可预期。
pub type FileMap = BTreeMap<String, RemoteFile>;

/// 编排器可预先查询的能力集合，避免靠捕获 NotSupported 来探测。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub listing: bool,
    pub transfer: bool,
    pub post_copy: bool,
    pub flags: bool,
}

/// 编排器驱动远端端点的统一契约。调用顺序固定：
/// 构造 → list → pull/push → post-copy 动作（可选）→ tidy。
pub trait RemoteTransferHandler {
    /// 列出目录下匹配模式的文件；模式按前缀语义匹配文件名。
    fn list_files(
        &mut self,
        directory: Option<&str>,
        file_pattern: Option<&str>,
    ) -> Result<FileMap>;

    /// 把远端文件拉到本地暂存目录。单个文件失败不中断批次。
    fn pull_files(&mut self, files: &FileMap, local_staging_directory: &Path) -> Result<()>;

    /// 把本地暂存目录里的文件推到远端。单个文件失败不中断批次。
    fn push_files(
        &mut self,
        local_staging_directory: &Path,
        file_list: Option<&FileMap>,
    ) -> Result<()>;

    /// 对已传输的源文件执行配置的 post-copy 动作，首个失败即中止。
    fn handle_post_copy_action(&mut self, files: &FileMap) -> Result<()>;

    /// 在远端写入配置的零字节标志文件。
    fn create_flag_files(&mut self) -> Result<()>;

    /// 本端点家族不支持端点间直传，所有移动都经过本地暂存。
    fn supports_direct_transfer(&self) -> bool {
        false
    }

    fn capabilities(&self) -> Capabilities;

    /// 任务结束后的清理钩子，默认无事可做。
    fn tidy(&mut self) -> Result<()> {
        Ok(())
    }
}
