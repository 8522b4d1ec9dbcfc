// setter.rs — 系统壁纸设置模块

use crate::error::{AppError, Result};
use std::path::{Path, PathBuf};

/// 系统壁纸能力：设置与读取当前壁纸
pub trait WallpaperSetter: Send + Sync {
    fn set(&self, path: &Path) -> Result<()>;

    /// 当前系统壁纸的文件路径
    fn current(&self) -> Result<PathBuf>;
}

/// 调用 wallpaper 库，由它自动识别操作系统并调用相应的 API
pub struct SystemSetter;

impl WallpaperSetter for SystemSetter {
    fn set(&self, path: &Path) -> Result<()> {
        let path_str = path
            .to_str()
            .ok_or_else(|| AppError::Wallpaper(format!("non UTF-8 path: {}", path.display())))?;

        wallpaper::set_from_path(path_str).map_err(|e| AppError::Wallpaper(e.to_string()))
    }

    fn current(&self) -> Result<PathBuf> {
        let current = wallpaper::get().map_err(|e| AppError::Wallpaper(e.to_string()))?;
        // 部分桌面环境返回 file:// URI
        let current = current.strip_prefix("file://").unwrap_or(&current);
        Ok(PathBuf::from(current.trim()))
    }
}
