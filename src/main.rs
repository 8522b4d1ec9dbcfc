// main.rs — 程序入口
// 负责初始化异步运行时、日志与多语言，解析命令行参数、分发子命令

mod cli;
mod config;
mod error;
mod logging;
mod model;
mod notify;
mod scheduler;
mod service;
mod setter;
mod source;
mod store;
#[cfg(test)]
mod testing;

// 初始化多语言支持，嵌入 locales 目录下的所有翻译
rust_i18n::i18n!("locales", fallback = "en");

use chrono::Local;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands, ConfigAction, ScheduleAction, SelectionArgs};
use config::AppConfig;
use model::{Resolution, Wallpaper};
use notify::DesktopNotifier;
use rust_i18n::t;
use scheduler::{TaskOutcome, UpdateState, UpdateTask};
use service::WallpaperService;
use setter::SystemSetter;
use source::HttpFetcher;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 自动检测系统语言并设置
    let locale = std::env::var("LANG").unwrap_or_else(|_| "en".to_string());
    if locale.starts_with("zh") {
        rust_i18n::set_locale("zh-CN");
    } else {
        rust_i18n::set_locale("en");
    }

    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    config.ensure_dirs()?;

    let _log_guard = logging::init(&config.data_dir, config.debug_log);
    tracing::debug!(config_path = %config.config_path.display(), "configuration loaded");

    match &cli.command {
        Commands::Fetch { selection, count } => {
            let mut service = build_service(&config, selection)?;
            handle_fetch(&mut service, *count).await?;
        }

        Commands::Set { selection } => {
            let mut service = build_service(&config, selection)?;
            handle_set(&mut service).await?;
        }

        Commands::Apply { image } => {
            let service = build_service(&config, &SelectionArgs::default())?;
            handle_apply(&service, Path::new(image))?;
        }

        Commands::Current => {
            let service = build_service(&config, &SelectionArgs::default())?;
            let wallpaper = service.current_wallpaper()?;
            print_wallpaper(&wallpaper);
        }

        Commands::Clean => {
            let service = build_service(&config, &SelectionArgs::default())?;
            println!("{}", t!("cleaning_dir", path => config.data_dir.display()));
            let deleted = service.cleanup()?;
            println!("{}", t!("clean_done", count => deleted));
        }

        Commands::Update { force } => {
            handle_update(&config, *force).await?;
        }

        Commands::Watch => {
            if !config.update_enabled {
                println!("{}", t!("update_disabled"));
                return Ok(());
            }
            let mut service = build_service(&config, &SelectionArgs::default())?;
            println!(
                "{}",
                t!("watch_start", minutes => config.check_interval_minutes, mode => config.update_mode)
            );
            scheduler::watch(&mut service, config.update_mode, config.check_interval()).await;
        }

        Commands::Schedule { action } => {
            handle_schedule(&mut config, action)?;
        }

        Commands::Config { action } => {
            handle_config(&mut config, action)?;
        }

        Commands::Completions { shell } => {
            generate(
                *shell,
                &mut Cli::command(),
                "spotlight-gallery",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// 根据配置（以及命令行的临时覆盖）构建壁纸服务
fn build_service(
    config: &AppConfig,
    selection: &SelectionArgs,
) -> Result<WallpaperService, Box<dyn std::error::Error>> {
    let mut service = WallpaperService::new(
        config.service_settings(),
        Box::new(HttpFetcher::new()?),
        Box::new(SystemSetter),
        Box::new(DesktopNotifier),
    );

    if selection.source.is_some() || selection.resolution.is_some() {
        let source = selection.source.unwrap_or(config.source);
        if let Some(res) = selection.resolution.as_deref() {
            if Resolution::parse(source, res).is_none() {
                return Err(t!(
                    "error_resolution",
                    res => res,
                    source => source,
                    options => Resolution::options(source).join(", ")
                )
                .into());
            }
        }
        service.change_source(source, selection.resolution.as_deref());
    }
    if let Some(locale) = selection.locale {
        service.set_locale(locale);
    }

    Ok(service)
}

fn print_wallpaper(wallpaper: &Wallpaper) {
    if !wallpaper.is_empty() {
        println!("  {}", wallpaper.title);
        if !wallpaper.description.is_empty() {
            println!("  {}", wallpaper.description);
        }
        if !wallpaper.copyright.is_empty() {
            println!("  {}", wallpaper.copyright);
        }
    } else {
        println!("  {}", t!("no_metadata"));
    }
    if let Some(path) = &wallpaper.path {
        println!("{}", t!("save_path", path => path.display()));
    }
}

/// 处理 fetch 子命令：下载壁纸到本地缓存
async fn handle_fetch(
    service: &mut WallpaperService,
    count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = service.settings();
    println!(
        "{}",
        t!(
            "fetch_start",
            source => settings.resolution.source(),
            res => settings.resolution,
            region => settings.locale.code()
        )
    );

    let mut downloaded = 0;
    for i in 0..count {
        let wallpaper = service.download_wallpaper().await;
        if wallpaper.is_empty() {
            if downloaded == 0 {
                return Err(t!("error_no_wallpapers").into());
            }
            break;
        }
        println!("{}", t!("download_info", current => i + 1, total => count));
        print_wallpaper(&wallpaper);
        downloaded += 1;
    }

    println!("{}", t!("download_done", count => downloaded));
    Ok(())
}

/// 处理 set 子命令：下载并设置为系统壁纸
async fn handle_set(service: &mut WallpaperService) -> Result<(), Box<dyn std::error::Error>> {
    let wallpaper = service.download_wallpaper().await;
    if wallpaper.is_empty() || wallpaper.path.is_none() {
        return Err(t!("error_no_wallpapers").into());
    }
    print_wallpaper(&wallpaper);

    println!("{}", t!("setting_wallpaper"));
    if !service.apply(&wallpaper) {
        return Err(t!("error_set_failed").into());
    }
    println!("{}", t!("set_done"));
    Ok(())
}

/// 处理 apply 子命令：设置本地图片
fn handle_apply(service: &WallpaperService, image: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let path = image.canonicalize().unwrap_or_else(|_| image.to_path_buf());
    println!("{}", t!("setting_wallpaper"));
    println!("  -> {}", path.display());
    if !service.set_wallpaper(&path) {
        return Err(t!("error_set_failed").into());
    }
    println!("{}", t!("set_done"));
    Ok(())
}

/// 处理 update 子命令：执行一次定时更新检查
async fn handle_update(config: &AppConfig, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !config.update_enabled && !force {
        println!("{}", t!("update_disabled"));
        return Ok(());
    }

    let mut service = build_service(config, &SelectionArgs::default())?;
    match UpdateTask::new(&mut service, config.update_mode).run(Local::now(), force).await {
        TaskOutcome::Idle { next } => {
            println!("{}", t!("update_not_due", next => next.format("%Y-%m-%d %H:%M")));
        }
        TaskOutcome::Updated { wallpaper, next } => {
            print_wallpaper(&wallpaper);
            println!("{}", t!("update_done", next => next.format("%Y-%m-%d %H:%M")));
        }
        // 失败已经记日志并通知，下次唤醒会重试
        TaskOutcome::Failed(reason) => {
            println!("{}", t!("update_failed", reason => reason));
        }
    }
    Ok(())
}

/// 处理 schedule 子命令：查看或修改定时更新
fn handle_schedule(
    config: &mut AppConfig,
    action: &ScheduleAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let state_path = UpdateState::path_in(&config.data_dir);
    let now = Local::now();

    match action {
        ScheduleAction::Show => {
            let state = UpdateState::load(&state_path)?;
            println!("{}", t!("schedule_enabled", enabled => config.update_enabled));
            println!("{}", t!("schedule_mode", mode => config.update_mode));
            let next = state
                .next_update_time
                .map(|n| n.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("{}", t!("schedule_next", next => next));
            println!("{}", t!("schedule_interval", minutes => config.check_interval_minutes));
        }
        ScheduleAction::Enable => {
            config.update_enabled = true;
            config.save()?;
            let next = scheduler::reschedule(&state_path, config.update_mode, now)?;
            println!("{}", t!("schedule_next", next => next.format("%Y-%m-%d %H:%M")));
            let bin_path = std::env::current_exe()?;
            println!("{}", t!("schedule_tip", bin_path => bin_path.to_string_lossy()));
        }
        ScheduleAction::Disable => {
            config.update_enabled = false;
            config.save()?;
            println!("{}", t!("schedule_enabled", enabled => false));
        }
        ScheduleAction::Mode { mode } => {
            config.set("update_mode", mode)?;
            config.save()?;
            println!("{}", t!("schedule_mode", mode => config.update_mode));
            if config.update_enabled {
                let next = scheduler::reschedule(&state_path, config.update_mode, now)?;
                println!("{}", t!("schedule_next", next => next.format("%Y-%m-%d %H:%M")));
            }
        }
    }
    Ok(())
}

/// 处理 config 子命令：查看或修改配置
fn handle_config(
    config: &mut AppConfig,
    action: &ConfigAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            println!("{}", t!("config_title"));
            println!("{}", t!("config_path", path => config.config_path.display()));
            println!("{}", t!("config_data_dir", path => config.data_dir.display()));
            println!("{}", t!("config_source", source => config.source, res => config.resolution));
            println!("{}", t!("config_locale", region => config.locale.code()));
            println!(
                "{}",
                t!("config_auto_save", enabled => config.auto_save, path => config.auto_save_dir.display())
            );
            println!(
                "{}",
                t!("config_update", enabled => config.update_enabled, mode => config.update_mode)
            );
        }
        ConfigAction::Schema => {
            println!("{}", AppConfig::get_schema());
        }
        ConfigAction::Dump => {
            println!("{}", config.to_toml());
        }
        ConfigAction::Set { key, value } => {
            config.set(key, value)?;
            config.save()?;
            println!("{}", t!("config_updated", key => key, value => value));

            // 修改更新模式后重新计算下次更新时间
            if key == "update_mode" && config.update_enabled {
                let state_path = UpdateState::path_in(&config.data_dir);
                scheduler::reschedule(&state_path, config.update_mode, Local::now())?;
            }
        }
    }
    Ok(())
}
