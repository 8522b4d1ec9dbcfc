// cli.rs — 命令行接口定义模块
// 使用 clap 的 derive 模式定义所有子命令和参数

use crate::model::{WallpaperLocale, WallpaperSource};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// 每日壁纸工具
///
/// 从 Windows 聚焦或必应每日一图获取壁纸，缓存到本地并设置为桌面背景。
#[derive(Parser)]
#[command(name = "spotlight-gallery")]
#[command(version)]
#[command(author)]
#[command(about = "每日壁纸工具 — 从 Windows 聚焦 / 必应获取壁纸并设置为桌面背景")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 临时覆盖配置中的来源选择
#[derive(Args, Debug, Default)]
pub struct SelectionArgs {
    /// 壁纸来源
    #[arg(short, long, value_enum)]
    pub source: Option<WallpaperSource>,

    /// 分辨率（spotlight: 3840x2160/1920x1080；bing: UHD/1920x1200/.../800x600）
    #[arg(short, long)]
    pub resolution: Option<String>,

    /// 壁纸内容的语言地区
    #[arg(short, long, value_enum)]
    pub locale: Option<WallpaperLocale>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 下载壁纸到本地缓存（不设置）
    ///
    /// 用法示例:
    ///   spotlight-gallery fetch
    ///   spotlight-gallery fetch --source bing -r 1920x1080 -n 3
    Fetch {
        #[command(flatten)]
        selection: SelectionArgs,

        /// 下载数量
        #[arg(short = 'n', long, default_value = "1", value_name = "N")]
        count: usize,
    },

    /// 一键更换：下载并设置为系统壁纸（按配置自动另存）
    ///
    /// 用法示例:
    ///   spotlight-gallery set
    ///   spotlight-gallery set --source bing --locale en-US
    Set {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// 将本地指定的图片设置为系统壁纸
    ///
    /// 用法示例:
    ///   spotlight-gallery apply image.jpg
    Apply {
        /// 图片的本地路径
        image: String,
    },

    /// 查看当前系统壁纸及其元数据
    Current,

    /// 清理缓存目录中除当前壁纸以外的所有图片
    Clean,

    /// 执行一次定时更新检查（适合交给 cron / 任务计划程序调用）
    ///
    /// 用法示例:
    ///   spotlight-gallery update
    ///   spotlight-gallery update --force
    Update {
        /// 忽略下次更新时间，立即更新
        #[arg(short, long)]
        force: bool,
    },

    /// 常驻运行，按固定间隔检查是否需要更新
    Watch,

    /// 定时更新设置
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },

    /// 配置管理操作
    ///
    /// 用法示例:
    ///   spotlight-gallery config show
    ///   spotlight-gallery config set source bing
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// 生成 shell 补全脚本（支持 bash, zsh, fish, elvish, powershell）
    ///
    /// 用法示例：
    ///   spotlight-gallery completions zsh > ~/.zsh/completions/_spotlight-gallery
    Completions {
        /// 目标 shell 类型
        shell: Shell,
    },
}

/// 定时更新操作
#[derive(Subcommand)]
pub enum ScheduleAction {
    /// 查看定时更新状态与下次更新时间
    Show,
    /// 启用定时更新并计算下次更新时间
    Enable,
    /// 停用定时更新
    Disable,
    /// 设置更新模式：daily 或 at:HH:MM
    Mode {
        /// daily（每天零点）或 at:HH:MM（每天指定时刻）
        mode: String,
    },
}

/// 配置管理操作
#[derive(Subcommand)]
pub enum ConfigAction {
    /// 查看当前所有配置简报
    Show,
    /// 生成配置文件对应的 JSON Schema
    Schema,
    /// 以 TOML 格式打印当前完整配置内容
    Dump,
    /// 设置配置项的值
    /// (source, resolution, locale, data_dir, auto_save, auto_save_dir, update, update_mode, check_interval, debug_log)
    Set {
        /// 要设置的键
        key: String,
        /// 要设置的值
        value: String,
    },
}
