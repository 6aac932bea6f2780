/// 一次列表调用里返回给编排器的远端文件记录，以文件名为键。
/// `directory` 记录查询时的目录，post-copy 动作靠它重新解析 item id。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub size: u64,
    /// 最后修改时刻，epoch 秒。
    pub modified_time: i64,
    pub directory: String,
}

/// 列表接口的单页结果，包含子项与服务端给出的下一页链接。
#[derive(Debug, Clone)]
pub(crate) struct DriveChildrenPage {
    pub(crate) entries: Vec<DriveChildEntry>,
    pub(crate) next_link: Option<String>,
}

/// 列表页里的一个子项。目录项只用于被跳过，不进入结果。
#[derive(Debug, Clone)]
pub(crate) struct DriveChildEntry {
    pub(crate) name: String,
    pub(crate) size: u64,
    pub(crate) last_modified: Option<String>,
    pub(crate) is_folder: bool,
}
