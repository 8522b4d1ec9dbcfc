// config.rs — 配置管理模块
// 遵循 Unix 风格：优先从 ~/.config/spotlight-gallery/config.toml 读取配置

use crate::error::{AppError, Result};
use crate::model::{Resolution, WallpaperLocale, WallpaperSource};
use crate::scheduler::UpdateMode;
use crate::service::ServiceSettings;
use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellexpand::tilde;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "spotlight-gallery";

/// 展开路径中的 ~ 和环境变量；相对路径则相对于 $HOME
fn expand_path(path_str: &str, home: &Path) -> PathBuf {
    let p = PathBuf::from(tilde(path_str).into_owned());
    if p.is_absolute() { p } else { home.join(p) }
}

/// 映射 config.toml 文件内容的嵌套结构体
#[derive(Debug, Deserialize, Serialize, Default, JsonSchema)]
pub struct ConfigFile {
    #[serde(default)]
    common: CommonConfig,
    #[serde(default)]
    auto_save: AutoSaveConfig,
    #[serde(default)]
    update: UpdateConfig,
}

#[derive(Debug, Deserialize, Serialize, Default, JsonSchema)]
struct CommonConfig {
    /// 壁纸来源 (spotlight / bing)，默认 spotlight
    #[serde(default)]
    source: WallpaperSource,
    /// 分辨率，取值取决于来源；不配置或无效时使用该来源的第一个选项
    #[serde(default)]
    resolution: Option<String>,
    /// 壁纸内容的语言地区，默认 zh-CN
    #[serde(default)]
    locale: WallpaperLocale,
    /// 缓存图片与元数据的目录 (支持 ~、$HOME 等环境变量，相对路径则相对于 $HOME)
    #[serde(default)]
    data_dir: Option<String>,
    /// 输出 debug 级别日志
    #[serde(default)]
    debug_log: bool,
}

#[derive(Debug, Deserialize, Serialize, Default, JsonSchema)]
struct AutoSaveConfig {
    /// 设置壁纸后自动复制一份到 directory
    #[serde(default)]
    enabled: bool,
    /// 自动另存目录，默认 ~/Pictures/SpotlightGallery
    #[serde(default)]
    directory: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct UpdateConfig {
    /// 是否启用定时更新
    #[serde(default)]
    enabled: bool,
    /// 更新模式："daily"（每天零点）或 "at:HH:MM"（每天指定时刻）
    #[serde(default = "default_mode")]
    mode: String,
    /// 后台检查间隔（分钟），与更新模式无关
    #[serde(default = "default_check_interval")]
    check_interval_minutes: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: default_mode(),
            check_interval_minutes: default_check_interval(),
        }
    }
}

fn default_mode() -> String {
    "daily".to_string()
}
fn default_check_interval() -> u64 {
    240
}

/// 通过环境变量覆盖的配置项（优先级：ENV > TOML）
#[derive(Debug, Default)]
pub struct EnvOverrides {
    pub source: Option<String>,
    pub data_dir: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            source: env::var("SPOTLIGHT_GALLERY_SOURCE").ok(),
            data_dir: env::var("SPOTLIGHT_GALLERY_DATA_DIR").ok(),
        }
    }
}

/// 应用全局配置项
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source: WallpaperSource,
    pub resolution: Resolution,
    pub locale: WallpaperLocale,
    /// 缓存图片与 metadata.json 所在目录
    pub data_dir: PathBuf,
    pub debug_log: bool,
    pub auto_save: bool,
    pub auto_save_dir: PathBuf,
    pub update_enabled: bool,
    pub update_mode: UpdateMode,
    pub check_interval_minutes: u64,
    /// 配置文件所在路径
    pub config_path: PathBuf,
    home: PathBuf,
    /// 配置文件里原本的值；环境变量只影响本次运行，保存时写回这些值
    file_source: WallpaperSource,
    file_resolution: Option<String>,
    file_data_dir: Option<String>,
}

impl AppConfig {
    /// 读取配置文件与环境变量
    ///
    /// 文件不存在时使用默认值；文件存在但无法解析时报错，避免随后的保存覆盖用户配置。
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let config_path = dirs::config_dir()
            .unwrap_or_else(|| home.join(".config"))
            .join(APP_DIR)
            .join("config.toml");

        let config_file = Self::load_config_from_file(&config_path)?;
        Ok(Self::from_parts(config_file, config_path, home, EnvOverrides::from_env()))
    }

    /// 由已解析的配置文件内容生成最终配置
    pub fn from_parts(
        file: ConfigFile,
        config_path: PathBuf,
        home: PathBuf,
        overrides: EnvOverrides,
    ) -> Self {
        let source = overrides
            .source
            .as_deref()
            .and_then(|s| WallpaperSource::from_str(s, true).ok())
            .unwrap_or(file.common.source);

        let resolution = file
            .common
            .resolution
            .as_deref()
            .and_then(|r| Resolution::parse(source, r))
            .unwrap_or_else(|| Resolution::default_for(source));

        // 数据目录：ENV > 配置文件 > 系统数据目录/spotlight-gallery
        let data_dir = match overrides.data_dir.or_else(|| file.common.data_dir.clone()) {
            Some(dir) => expand_path(&dir, &home),
            None => dirs::data_local_dir()
                .unwrap_or_else(|| home.join(".local").join("share"))
                .join(APP_DIR),
        };

        let auto_save_dir = match file.auto_save.directory {
            Some(dir) => expand_path(&dir, &home),
            None => dirs::picture_dir()
                .unwrap_or_else(|| home.join("Pictures"))
                .join("SpotlightGallery"),
        };

        let update_mode = file.update.mode.parse().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid update mode in config, using daily");
            UpdateMode::Daily
        });

        Self {
            source,
            resolution,
            locale: file.common.locale,
            data_dir,
            debug_log: file.common.debug_log,
            auto_save: file.auto_save.enabled,
            auto_save_dir,
            update_enabled: file.update.enabled,
            update_mode,
            check_interval_minutes: file.update.check_interval_minutes.max(1),
            config_path,
            home,
            file_source: file.common.source,
            file_resolution: file.common.resolution,
            file_data_dir: file.common.data_dir,
        }
    }

    /// 辅助函数：解析 TOML 配置文件，文件不存在时返回默认内容
    fn load_config_from_file(path: &Path) -> Result<ConfigFile> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ConfigFile::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content).map_err(|e| AppError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// 确保所有必要的目录都存在
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_minutes * 60)
    }

    /// 交给 WallpaperService 的运行参数
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            resolution: self.resolution,
            locale: self.locale,
            data_dir: self.data_dir.clone(),
            auto_save: self.auto_save,
            auto_save_dir: self.auto_save_dir.clone(),
        }
    }

    fn to_file(&self) -> ConfigFile {
        ConfigFile {
            common: CommonConfig {
                source: self.file_source,
                // 来源被环境变量临时改掉时，分辨率也沿用文件里的值
                resolution: if self.source == self.file_source {
                    Some(self.resolution.suffix().to_string())
                } else {
                    self.file_resolution.clone()
                },
                locale: self.locale,
                data_dir: self.file_data_dir.clone(),
                debug_log: self.debug_log,
            },
            auto_save: AutoSaveConfig {
                enabled: self.auto_save,
                directory: Some(self.auto_save_dir.to_string_lossy().to_string()),
            },
            update: UpdateConfig {
                enabled: self.update_enabled,
                mode: self.update_mode.to_string(),
                check_interval_minutes: self.check_interval_minutes,
            },
        }
    }

    /// 将配置保存回文件
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(&self.to_file())?;
        fs::write(&self.config_path, toml_str)?;
        Ok(())
    }

    /// 修改单个配置项（不会自动保存）
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "source" => {
                let source = WallpaperSource::from_str(value, true)
                    .map_err(|_| invalid(key, value))?;
                self.source = source;
                self.file_source = source;
                if self.resolution.source() != source {
                    self.resolution = Resolution::default_for(source);
                }
            }
            "res" | "resolution" => {
                self.resolution = Resolution::parse(self.source, value).ok_or_else(|| {
                    AppError::Config(format!(
                        "invalid resolution '{}' for {}, expected one of: {}",
                        value,
                        self.source,
                        Resolution::options(self.source).join(", ")
                    ))
                })?;
            }
            "locale" => {
                self.locale = WallpaperLocale::parse(value).ok_or_else(|| invalid(key, value))?;
            }
            "data_dir" => {
                self.data_dir = expand_path(value, &self.home);
                self.file_data_dir = Some(value.to_string());
            }
            "auto_save" => self.auto_save = parse_bool(key, value)?,
            "auto_save_dir" => self.auto_save_dir = expand_path(value, &self.home),
            "update" => self.update_enabled = parse_bool(key, value)?,
            "update_mode" => self.update_mode = value.parse()?,
            "check_interval" => {
                self.check_interval_minutes = value
                    .parse::<u64>()
                    .ok()
                    .filter(|m| *m > 0)
                    .ok_or_else(|| invalid(key, value))?;
            }
            "debug_log" => self.debug_log = parse_bool(key, value)?,
            _ => return Err(AppError::Config(format!("unknown key: {key}"))),
        }
        Ok(())
    }

    /// 获取配置文件的 JSON Schema
    pub fn get_schema() -> String {
        let schema = schemars::schema_for!(ConfigFile);
        serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
    }

    /// 将当前配置转换为 TOML 字符串
    pub fn to_toml(&self) -> String {
        let toml_str = toml::to_string_pretty(&self.to_file())
            .unwrap_or_else(|_| "# Error serializing config".to_string());

        // toml 库不支持带注释序列化，所以手动插入
        toml_str.replacen(
            "[auto_save]",
            &format!(
                "# spotlight 可选分辨率: {}\n# bing 可选分辨率: {}\n\n[auto_save]",
                Resolution::options(WallpaperSource::Spotlight).join(", "),
                Resolution::options(WallpaperSource::BingDaily).join(", "),
            ),
            1,
        )
    }
}

fn invalid(key: &str, value: &str) -> AppError {
    AppError::Config(format!("invalid value for {key}: {value}"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}
