// model.rs — 数据模型
// 壁纸来源、分辨率、地区以及统一的壁纸元数据记录

use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// 壁纸来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WallpaperSource {
    /// Windows 聚焦（Spotlight）
    #[default]
    Spotlight,
    /// 必应每日一图
    #[serde(rename = "bing")]
    #[value(name = "bing")]
    BingDaily,
}

impl fmt::Display for WallpaperSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spotlight => write!(f, "spotlight"),
            Self::BingDaily => write!(f, "bing"),
        }
    }
}

/// Spotlight 分辨率：桌面接口只提供 4K，锁屏接口提供 1080p
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotlightResolution {
    Desktop,
    Lockscreen,
}

impl SpotlightResolution {
    const ALL: [Self; 2] = [Self::Desktop, Self::Lockscreen];

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Desktop => "3840x2160",
            Self::Lockscreen => "1920x1080",
        }
    }
}

/// 必应每日一图支持的分辨率
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BingResolution {
    Uhd,
    R1920x1200,
    R1920x1080,
    R1366x768,
    R1280x768,
    R1024x768,
    R800x600,
}

impl BingResolution {
    const ALL: [Self; 7] = [
        Self::Uhd,
        Self::R1920x1200,
        Self::R1920x1080,
        Self::R1366x768,
        Self::R1280x768,
        Self::R1024x768,
        Self::R800x600,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Uhd => "UHD",
            Self::R1920x1200 => "1920x1200",
            Self::R1920x1080 => "1920x1080",
            Self::R1366x768 => "1366x768",
            Self::R1280x768 => "1280x768",
            Self::R1024x768 => "1024x768",
            Self::R800x600 => "800x600",
        }
    }
}

/// 与来源绑定的分辨率选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Spotlight(SpotlightResolution),
    Bing(BingResolution),
}

impl Resolution {
    /// 嵌入请求 URL 和缓存文件名中的分辨率标记
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Spotlight(r) => r.suffix(),
            Self::Bing(r) => r.suffix(),
        }
    }

    pub fn source(self) -> WallpaperSource {
        match self {
            Self::Spotlight(_) => WallpaperSource::Spotlight,
            Self::Bing(_) => WallpaperSource::BingDaily,
        }
    }

    /// 按来源解析分辨率字符串，大小写不敏感
    pub fn parse(source: WallpaperSource, text: &str) -> Option<Self> {
        let text = text.trim();
        match source {
            WallpaperSource::Spotlight => SpotlightResolution::ALL
                .into_iter()
                .find(|r| r.suffix().eq_ignore_ascii_case(text))
                .map(Self::Spotlight),
            WallpaperSource::BingDaily => BingResolution::ALL
                .into_iter()
                .find(|r| r.suffix().eq_ignore_ascii_case(text))
                .map(Self::Bing),
        }
    }

    pub fn default_for(source: WallpaperSource) -> Self {
        match source {
            WallpaperSource::Spotlight => Self::Spotlight(SpotlightResolution::Desktop),
            WallpaperSource::BingDaily => Self::Bing(BingResolution::Uhd),
        }
    }

    /// 某个来源可选的全部分辨率标记
    pub fn options(source: WallpaperSource) -> Vec<&'static str> {
        match source {
            WallpaperSource::Spotlight => SpotlightResolution::ALL.iter().map(|r| r.suffix()).collect(),
            WallpaperSource::BingDaily => BingResolution::ALL.iter().map(|r| r.suffix()).collect(),
        }
    }

    /// 解析 "WxH" 形式的尺寸；UHD 视为 3840x2160
    pub fn dimensions(self) -> (u32, u32) {
        let suffix = self.suffix();
        if suffix.eq_ignore_ascii_case("UHD") {
            return (3840, 2160);
        }
        let mut parts = suffix.splitn(2, 'x');
        let w = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        let h = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        (w, h)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// 壁纸内容的语言地区
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema, ValueEnum)]
pub enum WallpaperLocale {
    #[default]
    #[serde(rename = "zh-CN")]
    #[value(name = "zh-CN")]
    ZhCn,
    #[serde(rename = "en-US")]
    #[value(name = "en-US")]
    EnUs,
    #[serde(rename = "en-GB")]
    #[value(name = "en-GB")]
    EnGb,
    #[serde(rename = "ja-JP")]
    #[value(name = "ja-JP")]
    JaJp,
    #[serde(rename = "de-DE")]
    #[value(name = "de-DE")]
    DeDe,
    #[serde(rename = "fr-FR")]
    #[value(name = "fr-FR")]
    FrFr,
}

impl WallpaperLocale {
    pub fn code(self) -> &'static str {
        match self {
            Self::ZhCn => "zh-CN",
            Self::EnUs => "en-US",
            Self::EnGb => "en-GB",
            Self::JaJp => "ja-JP",
            Self::DeDe => "de-DE",
            Self::FrFr => "fr-FR",
        }
    }

    /// 两位国家代码（大写）
    pub fn country(self) -> &'static str {
        // code() 固定为 "ll-CC"
        &self.code()[3..]
    }

    pub fn parse(text: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(text.trim(), true).ok()
    }
}

impl fmt::Display for WallpaperLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 统一的壁纸元数据记录
///
/// 不论来自 Spotlight 还是 Bing，解析后都转换成这个结构体。
/// `path` 在图片下载完成后才会赋值，并与 metadata.json 中的条目一一对应。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallpaper {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub copyright: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Wallpaper {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        copyright: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            copyright: copyright.into(),
            url: url.into(),
            path: None,
        }
    }

    /// 只带路径的空记录，用于元数据缺失时的返回值
    pub fn with_path_only(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            ..Self::default()
        }
    }

    /// 标题为空的记录视为“未找到”
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty()
    }
}
