pub(crate) mod client;
mod delete;
mod download;
mod list;
mod models;
mod move_item;
mod resolve;
mod upload;

pub use models::RemoteFile;

pub(crate) use delete::delete_item;
pub(crate) use download::download_item_content;
pub(crate) use list::{build_children_url, fetch_children_page};
pub(crate) use move_item::patch_item_location;
pub(crate) use resolve::{resolve_item_id, resolve_site_id};
pub(crate) use upload::upload_content;

pub(crate) const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

/// 生效的 Graph 端点：默认公开云，私有云或测试环境可在配置里覆盖。
pub(crate) fn effective_graph_base(protocol: &crate::spec::ProtocolSpec) -> String {
    protocol
        .graph_url
        .as_deref()
        .unwrap_or(GRAPH_BASE)
        .trim_end_matches('/')
        .to_string()
}
