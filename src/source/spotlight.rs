// spotlight.rs — Windows 聚焦（Spotlight）接口
//
// 桌面接口 (iris v4) 与锁屏接口 (arc v3) 的外层结构相同：
// batchrsp.items[].item 本身是一段 JSON 字符串，需要二次反序列化，
// 内层的 ad 对象则是两种不同的结构。

use crate::error::Result;
use crate::model::{Resolution, SpotlightResolution, Wallpaper, WallpaperLocale};
use serde::Deserialize;
use tracing::warn;

/// 桌面接口单次返回的图片数量
const DESKTOP_BATCH_COUNT: u32 = 4;

pub fn build_url(resolution: SpotlightResolution, locale: WallpaperLocale) -> String {
    match resolution {
        SpotlightResolution::Desktop => format!(
            "https://fd.api.iris.microsoft.com/v4/api/selection?placement=88000820&bcnt={}&country={}&locale={}&fmt=json",
            DESKTOP_BATCH_COUNT,
            locale.country(),
            locale.code(),
        ),
        SpotlightResolution::Lockscreen => {
            let (w, h) = Resolution::Spotlight(resolution).dimensions();
            format!(
                "https://arc.msn.com/v3/Delivery/Placement?pid=338387&fmt=json&ua=WindowsShellClient%2F0&cdm=1&disphorzres={}&dispvertres={}&lo=80217&pl={}&lc={}&ctry={}",
                w,
                h,
                locale.code(),
                locale.code(),
                locale.country().to_lowercase(),
            )
        }
    }
}

/// 外层响应
#[derive(Deserialize, Debug)]
struct SpotlightResponse {
    batchrsp: BatchResponse,
}

#[derive(Deserialize, Debug)]
struct BatchResponse {
    #[serde(default)]
    items: Vec<ItemWrapper>,
}

/// item 字段是一段被编码成字符串的 JSON
#[derive(Deserialize, Debug)]
struct ItemWrapper {
    item: String,
}

#[derive(Deserialize, Debug)]
struct ItemContent<T> {
    ad: T,
}

/// 桌面接口的 ad 结构
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct DesktopAd {
    pub title: String,
    #[serde(rename = "iconHoverText")]
    pub icon_hover_text: String,
    pub copyright: String,
    #[serde(rename = "landscapeImage")]
    pub landscape_image: Option<DesktopImage>,
}

#[derive(Deserialize, Debug, Default)]
pub struct DesktopImage {
    #[serde(default)]
    pub asset: String,
}

/// 锁屏接口的 ad 结构，文本都包在 { "tx": ... } 里
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct LockscreenAd {
    pub title_text: Option<TextContent>,
    pub hs1_title_text: Option<TextContent>,
    pub copyright_text: Option<TextContent>,
    pub image_fullscreen_001_landscape: Option<LockscreenImage>,
}

#[derive(Deserialize, Debug, Default)]
pub struct TextContent {
    #[serde(default)]
    pub tx: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct LockscreenImage {
    #[serde(default)]
    pub u: String,
}

/// 两种 ad 结构的统一视图
#[derive(Debug)]
pub enum AdContent {
    Desktop(DesktopAd),
    Lockscreen(LockscreenAd),
}

fn text(content: &Option<TextContent>) -> &str {
    content.as_ref().map(|t| t.tx.as_str()).unwrap_or_default()
}

impl AdContent {
    pub fn title(&self) -> &str {
        match self {
            Self::Desktop(ad) => &ad.title,
            Self::Lockscreen(ad) => text(&ad.title_text),
        }
    }

    /// 桌面接口的 iconHoverText 第一行才是描述，后面是操作提示
    pub fn description(&self) -> &str {
        match self {
            Self::Desktop(ad) => ad
                .icon_hover_text
                .split(['\r', '\n'])
                .next()
                .unwrap_or_default(),
            Self::Lockscreen(ad) => text(&ad.hs1_title_text),
        }
    }

    pub fn copyright(&self) -> &str {
        match self {
            Self::Desktop(ad) => &ad.copyright,
            Self::Lockscreen(ad) => text(&ad.copyright_text),
        }
    }

    pub fn image_url(&self) -> &str {
        match self {
            Self::Desktop(ad) => ad
                .landscape_image
                .as_ref()
                .map(|i| i.asset.as_str())
                .unwrap_or_default(),
            Self::Lockscreen(ad) => ad
                .image_fullscreen_001_landscape
                .as_ref()
                .map(|i| i.u.as_str())
                .unwrap_or_default(),
        }
    }

    pub fn to_wallpaper(&self) -> Wallpaper {
        Wallpaper::new(
            self.title().trim(),
            self.description().trim(),
            self.copyright().trim(),
            self.image_url().trim(),
        )
    }
}

fn parse_item(resolution: SpotlightResolution, raw: &str) -> Result<AdContent> {
    let ad = match resolution {
        SpotlightResolution::Desktop => {
            AdContent::Desktop(serde_json::from_str::<ItemContent<DesktopAd>>(raw)?.ad)
        }
        SpotlightResolution::Lockscreen => {
            AdContent::Lockscreen(serde_json::from_str::<ItemContent<LockscreenAd>>(raw)?.ad)
        }
    };
    Ok(ad)
}

/// 解析 Spotlight 响应
///
/// 外层结构不对时返回错误；单个 item 解析失败只跳过该条目。
pub fn parse(body: &str, resolution: SpotlightResolution) -> Result<Vec<Wallpaper>> {
    let response: SpotlightResponse = serde_json::from_str(body)?;

    let wallpapers = response
        .batchrsp
        .items
        .iter()
        .filter_map(|wrapper| match parse_item(resolution, &wrapper.item) {
            Ok(ad) => Some(ad.to_wallpaper()),
            Err(e) => {
                warn!(error = %e, "skipping malformed spotlight item");
                None
            }
        })
        .collect();

    Ok(wallpapers)
}
