// source/mod.rs — 壁纸源模块入口
// 负责根据 (来源, 分辨率, 地区) 构建请求 URL、发起请求，并把响应解析成统一的 Wallpaper
pub mod bing;
pub mod spotlight;

use crate::error::Result;
use crate::model::{Resolution, WallpaperLocale, WallpaperSource, Wallpaper};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP 抽象
///
/// 所有网络访问都经过这个 Trait，测试时可以替换成不发请求的实现。
/// 非 2xx 状态码同样视为错误。
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// 以文本形式获取响应体
    async fn get_text(&self, url: &str) -> Result<String>;

    /// 以字节形式获取响应体（用于下载图片）
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// 基于 reqwest 的默认实现
pub struct HttpFetcher {
    /// HTTP 客户端（内部有连接池，应复用）
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get_text(&self, url: &str) -> Result<String> {
        debug!(url, "GET");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "GET (bytes)");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// 为指定的来源组合构建请求 URL
pub fn build_url(resolution: Resolution, locale: WallpaperLocale) -> String {
    match resolution {
        Resolution::Spotlight(r) => spotlight::build_url(r, locale),
        Resolution::Bing(_) => bing::build_url(locale),
    }
}

/// 把响应体按来源解析成壁纸列表
pub fn parse_response(resolution: Resolution, body: &str) -> Result<Vec<Wallpaper>> {
    let wallpapers = match resolution {
        Resolution::Spotlight(r) => spotlight::parse(body, r)?,
        Resolution::Bing(r) => bing::parse(body, r)?,
    };

    // 标题或图片地址缺失的条目没有意义
    Ok(wallpapers
        .into_iter()
        .filter(|w| !w.is_empty() && !w.url.is_empty())
        .collect())
}

/// 壁纸源客户端
///
/// 出错时不抛出：网络失败、状态码异常或字段缺失都只记日志，返回空结果，
/// 调用方需要把空标题的记录当作“未找到”处理。
pub struct SourceClient<'a> {
    fetcher: &'a dyn Fetcher,
}

impl<'a> SourceClient<'a> {
    pub fn new(fetcher: &'a dyn Fetcher) -> Self {
        Self { fetcher }
    }

    /// 获取一批壁纸元数据
    pub async fn fetch(&self, resolution: Resolution, locale: WallpaperLocale) -> Vec<Wallpaper> {
        let source: WallpaperSource = resolution.source();
        let url = build_url(resolution, locale);

        let body = match self.fetcher.get_text(&url).await {
            Ok(body) if !body.trim().is_empty() => body,
            Ok(_) => {
                warn!(%source, "empty response body");
                return Vec::new();
            }
            Err(e) => {
                warn!(%source, error = %e, "failed to fetch wallpaper metadata");
                return Vec::new();
            }
        };

        match parse_response(resolution, &body) {
            Ok(list) => {
                debug!(%source, count = list.len(), "parsed wallpaper metadata");
                list
            }
            Err(e) => {
                warn!(%source, error = %e, "failed to parse wallpaper metadata");
                Vec::new()
            }
        }
    }

    /// 只取第一张，失败时返回空记录
    pub async fn fetch_one(&self, resolution: Resolution, locale: WallpaperLocale) -> Wallpaper {
        self.fetch(resolution, locale)
            .await
            .into_iter()
            .next()
            .unwrap_or_default()
    }
}
