// testing.rs — 单元测试用的替身实现

use crate::error::{AppError, Result};
use crate::model::{Resolution, WallpaperLocale};
use crate::notify::Notifier;
use crate::service::{ServiceSettings, WallpaperService};
use crate::setter::WallpaperSetter;
use crate::source::Fetcher;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 不联网的 Fetcher，记录调用次数
#[derive(Clone)]
pub struct MockFetcher {
    body: Option<String>,
    images: bool,
    text_calls: Arc<AtomicUsize>,
    bytes_calls: Arc<AtomicUsize>,
}

impl MockFetcher {
    pub const IMAGE_BYTES: &'static [u8] = b"\xFF\xD8\xFFfake-jpeg";

    pub fn with_text(body: &str) -> Self {
        Self {
            body: Some(body.to_string()),
            images: true,
            text_calls: Arc::default(),
            bytes_calls: Arc::default(),
        }
    }

    /// 所有请求都失败
    pub fn failing() -> Self {
        Self {
            body: None,
            images: false,
            text_calls: Arc::default(),
            bytes_calls: Arc::default(),
        }
    }

    /// 元数据请求正常，图片请求失败
    pub fn without_images(mut self) -> Self {
        self.images = false;
        self
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn bytes_calls(&self) -> usize {
        self.bytes_calls.load(Ordering::SeqCst)
    }
}

fn offline() -> AppError {
    AppError::Io(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "offline"))
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn get_text(&self, _url: &str) -> Result<String> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.body.clone().ok_or_else(offline)
    }

    async fn get_bytes(&self, _url: &str) -> Result<Vec<u8>> {
        self.bytes_calls.fetch_add(1, Ordering::SeqCst);
        if self.images {
            Ok(Self::IMAGE_BYTES.to_vec())
        } else {
            Err(offline())
        }
    }
}

/// 记录设置过的壁纸，并可指定“当前壁纸”
#[derive(Clone, Default)]
pub struct MockSetter {
    fail: bool,
    applied: Arc<Mutex<Vec<PathBuf>>>,
    current: Arc<Mutex<Option<PathBuf>>>,
}

impl MockSetter {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn set_current(&self, path: PathBuf) {
        *self.current.lock().unwrap() = Some(path);
    }

    pub fn applied(&self) -> Vec<PathBuf> {
        self.applied.lock().unwrap().clone()
    }
}

impl WallpaperSetter for MockSetter {
    fn set(&self, path: &Path) -> Result<()> {
        if self.fail {
            return Err(AppError::Wallpaper("unsupported".to_string()));
        }
        self.applied.lock().unwrap().push(path.to_path_buf());
        *self.current.lock().unwrap() = Some(path.to_path_buf());
        Ok(())
    }

    fn current(&self) -> Result<PathBuf> {
        self.current
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::Wallpaper("no wallpaper set".to_string()))
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

/// 数据目录为 `root/data`，自动另存目录为 `root/saved`
pub fn test_service(
    root: &Path,
    resolution: Resolution,
    fetcher: MockFetcher,
    setter: MockSetter,
) -> WallpaperService {
    test_service_with_notifier(root, resolution, fetcher, setter, RecordingNotifier::default())
}

pub fn test_service_with_notifier(
    root: &Path,
    resolution: Resolution,
    fetcher: MockFetcher,
    setter: MockSetter,
    notifier: RecordingNotifier,
) -> WallpaperService {
    let settings = ServiceSettings {
        resolution,
        locale: WallpaperLocale::ZhCn,
        data_dir: root.join("data"),
        auto_save: false,
        auto_save_dir: root.join("saved"),
    };
    WallpaperService::new(
        settings,
        Box::new(fetcher),
        Box::new(setter),
        Box::new(notifier),
    )
}
