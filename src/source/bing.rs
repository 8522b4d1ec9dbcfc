// bing.rs — 必应每日一图接口
// 响应是扁平的 images[] 数组，分辨率通过替换 urlbase 中的分辨率标记实现

use crate::error::Result;
use crate::model::{BingResolution, Resolution, Wallpaper, WallpaperLocale, WallpaperSource};
use serde::Deserialize;

const BING_HOST: &str = "https://www.bing.com";

pub fn build_url(locale: WallpaperLocale) -> String {
    format!(
        "https://services.bingapis.com/ge-apps/api/v2/bwc/hpimages?mkt={}&theme=bing&defaultBrowser=ME&dhpSetToBing=true&dseSetToBing=true",
        locale.code().to_lowercase()
    )
}

/// 接口返回的顶层结构
#[derive(Deserialize, Debug)]
struct BingDailyResponse {
    images: Vec<BingImage>,
}

/// 单张图片，只提取需要的字段
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct BingImage {
    urlbase: String,
    title: String,
    description: String,
    headline: String,
    copyrighttext: String,
}

/// 把 urlbase 转成指定分辨率的完整图片地址
///
/// urlbase 可能是相对路径 (/th?id=OHR.Foo_ZH-CN123)，也可能已经带了
/// `_1920x1080.jpg` 这样的分辨率标记，带标记时直接替换。
pub fn image_url(urlbase: &str, resolution: BingResolution) -> String {
    let base = if urlbase.starts_with("http://") || urlbase.starts_with("https://") {
        urlbase.to_string()
    } else {
        format!("{}{}", BING_HOST, urlbase)
    };

    let wanted = format!("_{}.", resolution.suffix());
    for token in Resolution::options(WallpaperSource::BingDaily) {
        let pattern = format!("_{}.", token);
        if base.contains(&pattern) {
            return base.replacen(&pattern, &wanted, 1);
        }
    }

    if base.contains(".jpg") {
        base
    } else {
        format!("{}_{}.jpg", base, resolution.suffix())
    }
}

pub fn parse(body: &str, resolution: BingResolution) -> Result<Vec<Wallpaper>> {
    let response: BingDailyResponse = serde_json::from_str(body)?;

    let wallpapers = response
        .images
        .into_iter()
        .filter(|image| !image.urlbase.is_empty())
        .map(|image| {
            let description = if image.description.trim().is_empty() {
                image.headline.trim()
            } else {
                image.description.trim()
            };
            Wallpaper::new(
                image.title.trim(),
                description,
                image.copyrighttext.trim(),
                image_url(&image.urlbase, resolution),
            )
        })
        .collect();

    Ok(wallpapers)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "imageCount": 2,
        "images": [
            {
                "urlbase": "/th?id=OHR.HappySunflower_ZH-CN8791544241",
                "copyrighttext": "© Sunny Fields / Alamy",
                "headline": "Sunflowers in bloom",
                "title": "向日葵花田",
                "description": "夏末的向日葵花田。",
                "fullDateString": "2024 8月 20"
            },
            {
                "urlbase": "/th?id=OHR.Lighthouse_ZH-CN1234_1920x1080.jpg",
                "copyrighttext": "© Coast Photo",
                "headline": "A lighthouse at dusk",
                "title": "灯塔",
                "description": ""
            }
        ]
    }"#;

    #[test]
    fn url_uses_lowercase_market() {
        assert_eq!(
            build_url(WallpaperLocale::EnGb),
            "https://services.bingapis.com/ge-apps/api/v2/bwc/hpimages?mkt=en-gb&theme=bing&defaultBrowser=ME&dhpSetToBing=true&dseSetToBing=true"
        );
    }

    #[test]
    fn parse_appends_resolution_token() {
        let list = parse(SAMPLE, BingResolution::Uhd).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].title, "向日葵花田");
        assert_eq!(list[0].description, "夏末的向日葵花田。");
        assert_eq!(list[0].copyright, "© Sunny Fields / Alamy");
        assert_eq!(
            list[0].url,
            "https://www.bing.com/th?id=OHR.HappySunflower_ZH-CN8791544241_UHD.jpg"
        );
    }

    #[test]
    fn parse_replaces_existing_token() {
        let list = parse(SAMPLE, BingResolution::R1366x768).unwrap();
        assert_eq!(
            list[1].url,
            "https://www.bing.com/th?id=OHR.Lighthouse_ZH-CN1234_1366x768.jpg"
        );
        // description 为空时退回 headline
        assert_eq!(list[1].description, "A lighthouse at dusk");
    }

    #[test]
    fn absolute_urlbase_is_kept() {
        let url = image_url("https://cn.bing.com/th?id=OHR.Foo_EN-US1_UHD.jpg", BingResolution::R800x600);
        assert_eq!(url, "https://cn.bing.com/th?id=OHR.Foo_EN-US1_800x600.jpg");
    }

    #[test]
    fn missing_images_is_an_error() {
        assert!(parse(r#"{"imageCount":0}"#, BingResolution::Uhd).is_err());
    }
}
