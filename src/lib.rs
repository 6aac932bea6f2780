//! 面向文件搬运编排器的 Microsoft Graph 远端端点 handler。
//! 把 SharePoint 站点 drive 与邮件收件箱统一到
//! list / pull / push / post-copy 的执行契约之下。

mod api;
mod cache;
mod error;
mod handler;
mod spec;

pub use api::auth::Credentials;
pub use api::drive::RemoteFile;
pub use cache::{NoopCache, VariableCache};
pub use error::{Error, Result};
pub use handler::mailbox::MailboxTransfer;
pub use handler::sharepoint::SharepointTransfer;
pub use handler::{Capabilities, FileMap, RemoteTransferHandler};
pub use spec::{
    CacheableVariable, FlagsSpec, PostCopyActionKind, PostCopyActionSpec, ProtocolSpec,
    RenameRule, TransferSpec,
};
