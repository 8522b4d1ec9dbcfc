// notify.rs — 桌面通知
// 后台更新的成功与失败都需要让用户看到
// Windows 走 WinRT toast，其余平台调用系统自带的通知命令

use tracing::{info, warn};

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// 系统桌面通知；发送失败只记日志
pub struct DesktopNotifier;

/// 在 tokio 多线程运行时里把阻塞调用移出工作线程，其它情况直接执行
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    use tokio::runtime::{Handle, RuntimeFlavor};
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

#[cfg(windows)]
fn show(title: &str, message: &str) -> Result<(), String> {
    use winrt_notification::{Duration, Sound, Toast};

    // 未注册的 AppUserModelID 发出的 toast 会被系统丢弃，借用 PowerShell 的 ID
    Toast::new(Toast::POWERSHELL_APP_ID)
        .title(title)
        .text1(message)
        .duration(Duration::Short)
        .sound(Some(Sound::Default))
        .show()
        .map_err(|e| format!("winrt-notification error: {e}"))
}

#[cfg(not(windows))]
fn show(title: &str, message: &str) -> Result<(), String> {
    let status = notify_command(title, message)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map_err(|e| format!("notification command unavailable: {e}"))?;

    if status.success() {
        Ok(())
    } else {
        Err(format!("notification command exited with {:?}", status.code()))
    }
}

#[cfg(not(windows))]
fn notify_command(title: &str, message: &str) -> std::process::Command {
    use std::process::Command;

    if cfg!(target_os = "macos") {
        let script = format!(
            "display notification \"{}\" with title \"{}\"",
            applescript_escape(message),
            applescript_escape(title),
        );
        let mut cmd = Command::new("osascript");
        cmd.args(["-e", &script]);
        cmd
    } else {
        let mut cmd = Command::new("notify-send");
        cmd.args(["-a", env!("CARGO_PKG_NAME"), title, message]);
        cmd
    }
}

/// AppleScript 双引号字符串里 \ 和 " 需要转义
#[cfg(not(windows))]
fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, message: &str) {
        info!(title, message, "notification");

        if let Err(reason) = run_blocking(|| show(title, message)) {
            warn!(%reason, "failed to show desktop notification");
        }
    }
}
