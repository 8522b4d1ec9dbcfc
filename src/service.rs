// service.rs — 壁纸服务
// 串起整条流程：获取元数据 → 检查本地缓存 → 下载图片 → 写元数据 → 设置壁纸 → 自动另存

use crate::error::Result;
use crate::model::{Resolution, Wallpaper, WallpaperLocale, WallpaperSource};
use crate::notify::Notifier;
use crate::setter::WallpaperSetter;
use crate::source::{Fetcher, SourceClient};
use crate::store::MetadataStore;
use rust_i18n::t;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

/// 服务的运行参数，通常由 AppConfig 生成
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub resolution: Resolution,
    pub locale: WallpaperLocale,
    /// 缓存图片与 metadata.json 所在目录
    pub data_dir: PathBuf,
    pub auto_save: bool,
    pub auto_save_dir: PathBuf,
}

/// Windows 文件名中不允许出现的字符统一替换为 `_`
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_end_matches('.').to_string();
    if cleaned.is_empty() {
        "wallpaper".to_string()
    } else {
        cleaned
    }
}

fn is_jpg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg"))
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

pub struct WallpaperService {
    settings: ServiceSettings,
    fetcher: Box<dyn Fetcher>,
    setter: Box<dyn WallpaperSetter>,
    notifier: Box<dyn Notifier>,
    store: MetadataStore,
    /// 已获取元数据但还没下载的壁纸
    pending: VecDeque<Wallpaper>,
}

impl WallpaperService {
    pub fn new(
        settings: ServiceSettings,
        fetcher: Box<dyn Fetcher>,
        setter: Box<dyn WallpaperSetter>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let store = MetadataStore::new(&settings.data_dir);
        Self {
            settings,
            fetcher,
            setter,
            notifier,
            store,
            pending: VecDeque::new(),
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// 切换来源；分辨率不属于该来源时退回该来源的默认分辨率
    pub fn change_source(&mut self, source: WallpaperSource, resolution: Option<&str>) {
        let resolution = resolution
            .and_then(|r| Resolution::parse(source, r))
            .unwrap_or_else(|| Resolution::default_for(source));
        if resolution != self.settings.resolution {
            debug!(%source, %resolution, "source changed");
            self.settings.resolution = resolution;
            self.pending.clear();
        }
    }

    pub fn set_locale(&mut self, locale: WallpaperLocale) {
        if locale != self.settings.locale {
            self.settings.locale = locale;
            self.pending.clear();
        }
    }

    /// 缓存文件路径：`{title}_{suffix}.jpg`
    pub fn cache_path(&self, title: &str) -> PathBuf {
        self.settings.data_dir.join(format!(
            "{}_{}.jpg",
            sanitize_title(title),
            self.settings.resolution.suffix()
        ))
    }

    /// 下载下一张壁纸
    ///
    /// 本地已存在同名缓存时直接返回缓存的元数据，不再发起图片请求。
    /// 任何失败都返回空记录。
    pub async fn download_wallpaper(&mut self) -> Wallpaper {
        if self.pending.is_empty() {
            let client = SourceClient::new(self.fetcher.as_ref());
            let batch = client
                .fetch(self.settings.resolution, self.settings.locale)
                .await;
            self.pending.extend(batch);
        }

        let Some(mut wallpaper) = self.pending.pop_front() else {
            warn!("no wallpaper available");
            return Wallpaper::default();
        };

        let cache_path = self.cache_path(&wallpaper.title);
        if cache_path.exists() {
            info!(path = %cache_path.display(), "wallpaper already cached");
            let cached = self.store.lookup(&cache_path);
            if !cached.is_empty() {
                return cached;
            }
            // 图片在但元数据丢了，用这次获取到的信息补上
        } else {
            match self.save_image(&wallpaper.url, &cache_path).await {
                Ok(()) => {
                    info!(title = %wallpaper.title, path = %cache_path.display(), "wallpaper downloaded");
                }
                Err(e) => {
                    error!(title = %wallpaper.title, error = %e, "failed to download wallpaper");
                    return Wallpaper::default();
                }
            }
        }

        wallpaper.path = Some(cache_path);
        if let Err(e) = self.store.save(&wallpaper) {
            // 图片已经落盘，元数据写失败不影响使用
            warn!(error = %e, "failed to save wallpaper metadata");
        }
        wallpaper
    }

    async fn save_image(&self, url: &str, save_path: &Path) -> Result<()> {
        let bytes = self.fetcher.get_bytes(url).await?;

        if let Some(parent) = save_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = File::create(save_path).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        Ok(())
    }

    /// 设置系统壁纸，返回是否成功
    pub fn set_wallpaper(&self, path: &Path) -> bool {
        if !path.is_file() {
            warn!(path = %path.display(), "wallpaper file does not exist");
            return false;
        }

        match self.setter.set(path) {
            Ok(()) => {
                info!(path = %path.display(), "wallpaper applied");
                true
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to apply wallpaper");
                false
            }
        }
    }

    /// 设置壁纸，成功后按配置自动另存
    ///
    /// 自动另存失败只通过通知提示用户，不影响返回值。
    pub fn apply(&self, wallpaper: &Wallpaper) -> bool {
        let Some(path) = wallpaper.path.as_deref() else {
            warn!(title = %wallpaper.title, "wallpaper has no local file");
            return false;
        };

        if !self.set_wallpaper(path) {
            return false;
        }

        if self.settings.auto_save {
            match self.auto_save(wallpaper) {
                Ok(Some(saved)) => info!(path = %saved.display(), "wallpaper auto-saved"),
                Ok(None) => debug!("wallpaper already present in auto-save directory"),
                Err(e) => {
                    error!(error = %e, "auto-save failed");
                    self.notifier.notify(
                        &t!("notify_autosave_failed_title"),
                        &t!("notify_autosave_failed_body", reason => e),
                    );
                }
            }
        }

        true
    }

    /// 把壁纸复制到自动另存目录；目标已存在同名文件时返回 None
    pub fn auto_save(&self, wallpaper: &Wallpaper) -> Result<Option<PathBuf>> {
        let source = wallpaper.path.as_deref().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "wallpaper has no local file")
        })?;
        let file_name = source.file_name().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "wallpaper path has no file name")
        })?;

        fs::create_dir_all(&self.settings.auto_save_dir)?;
        let target = self.settings.auto_save_dir.join(file_name);
        if target.exists() {
            return Ok(None);
        }

        fs::copy(source, &target)?;
        Ok(Some(target))
    }

    /// 当前系统壁纸及其元数据
    pub fn current_wallpaper(&self) -> Result<Wallpaper> {
        let path = self.setter.current()?;
        Ok(self.store.lookup(&path))
    }

    /// 删除数据目录中除当前系统壁纸以外的所有 jpg，返回删除数量
    ///
    /// 读取不到当前壁纸时不做任何删除。
    pub fn cleanup(&self) -> Result<usize> {
        let current = self.setter.current()?;
        let dir = &self.settings.data_dir;
        if !dir.exists() {
            return Ok(0);
        }

        let mut candidates = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_jpg(&path) && !same_file(&path, &current) {
                candidates.push(path);
            }
        }

        let (deleted, failed) = remove_files(&candidates);
        info!(deleted, failed, kept = %current.display(), "cache cleaned");
        Ok(deleted)
    }
}

/// 逐个删除文件；单个失败只记日志，返回 (删除数, 失败数)
fn remove_files(paths: &[PathBuf]) -> (usize, usize) {
    let mut deleted = 0;
    let mut failed = 0;
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "deleted cached wallpaper");
                deleted += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to delete cached wallpaper");
                failed += 1;
            }
        }
    }
    (deleted, failed)
}
