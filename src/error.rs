use thiserror::Error;

/// 整个 crate 共用的错误类型，按失败场景分类。
/// 编排器依赖这些分类决定是否中止、重试或上报。
#[derive(Debug, Error)]
pub enum Error {
    /// token 交换被拒绝或响应缺少必要字段。
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// 远端路径无法解析为 item id。
    #[error("failed to resolve '{path}': {message}")]
    Lookup { path: String, message: String },

    /// 批量 push/pull 中至少有一个文件失败。
    #[error("{failed} of {total} files failed to transfer")]
    Transfer { failed: usize, total: usize },

    /// 上传在重试预算内始终返回冲突状态。
    #[error("upload of '{path}' still conflicting after {attempts} attempts")]
    ConflictExhausted { path: String, attempts: u32 },

    /// 该 handler 变体不支持请求的能力。
    #[error("{operation} is not supported by this handler")]
    NotSupported { operation: &'static str },

    /// 网络层失败（连接、超时、响应体读取）。
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Graph API 返回了预期之外的状态码。
    #[error("graph api returned HTTP {status} while {action}: {body}")]
    Api {
        action: &'static str,
        status: u16,
        body: String,
    },

    /// 响应内容无法按约定格式解析。
    #[error("failed to parse graph api response: {0}")]
    Parse(String),

    /// 任务配置在构造阶段校验失败。
    #[error("invalid transfer specification: {0}")]
    InvalidSpec(String),

    /// 本地暂存目录读写失败。
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// 外部变量缓存协作方更新失败。
    #[error("failed to update cached variable '{variable}': {message}")]
    Cache { variable: String, message: String },
}

/// crate 内部统一的 Result 别名。
pub type Result<T> = std::result::Result<T, Error>;
