// error.rs — 统一错误类型
// 各模块返回 crate::error::Result，main 中再转换为 Box<dyn Error>

use thiserror::Error;

/// 程序运行中可能出现的错误
#[derive(Debug, Error)]
pub enum AppError {
    /// 网络请求失败（传输错误或非 2xx 状态码）
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON 解析或序列化失败
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 文件读写失败
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML 配置文件序列化失败
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// 配置文件存在但无法解析
    #[error("Failed to parse {}: {source}", path.display())]
    ConfigParse {
        path: std::path::PathBuf,
        source: toml::de::Error,
    },

    /// 配置项无效
    #[error("Configuration error: {0}")]
    Config(String),

    /// 系统壁纸接口调用失败
    #[error("Wallpaper error: {0}")]
    Wallpaper(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
