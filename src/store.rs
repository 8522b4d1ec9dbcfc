// store.rs — 壁纸元数据存储
// 数据目录下的 metadata.json 保存所有下载过的壁纸记录，每次更新整体重写

use crate::error::Result;
use crate::model::Wallpaper;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const METADATA_FILE: &str = "metadata.json";

pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    /// 在指定数据目录下打开（或稍后创建）metadata.json
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(METADATA_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取全部记录，文件不存在时返回空列表
    pub fn load(&self) -> Result<Vec<Wallpaper>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_all(&self, records: &[Wallpaper]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// 保存一条记录
    ///
    /// (title, description) 相同的旧记录先移除再追加到末尾，否则直接追加。
    pub fn save(&self, wallpaper: &Wallpaper) -> Result<()> {
        let mut records = self.load()?;
        records.retain(|w| !(w.title == wallpaper.title && w.description == wallpaper.description));
        records.push(wallpaper.clone());
        debug!(title = %wallpaper.title, total = records.len(), "metadata saved");
        self.write_all(&records)
    }

    pub fn find_by_path(&self, path: &Path) -> Result<Option<Wallpaper>> {
        Ok(self
            .load()?
            .into_iter()
            .rev()
            .find(|w| w.path.as_deref() == Some(path)))
    }

    /// 缓存文件名形如 `{title}_{suffix}`，按标题前缀匹配，取最长的标题
    ///
    /// 长度相同时取最新保存的记录（max_by_key 返回最后一个最大值）。
    pub fn find_by_file_stem(&self, stem: &str) -> Result<Option<Wallpaper>> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|w| !w.title.is_empty() && stem.starts_with(&crate::service::sanitize_title(&w.title)))
            .max_by_key(|w| w.title.len()))
    }

    /// 查找某个图片文件对应的元数据
    ///
    /// 找不到时返回只带路径的空记录，元数据文件损坏时同样降级为空记录。
    pub fn lookup(&self, path: &Path) -> Wallpaper {
        let found = self.find_by_path(path).and_then(|hit| match hit {
            Some(w) => Ok(Some(w)),
            None => {
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default();
                self.find_by_file_stem(stem)
            }
        });

        match found {
            Ok(Some(mut w)) => {
                w.path = Some(path.to_path_buf());
                w
            }
            Ok(None) => Wallpaper::with_path_only(path.to_path_buf()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read metadata");
                Wallpaper::with_path_only(path.to_path_buf())
            }
        }
    }
}
