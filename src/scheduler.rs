// scheduler.rs — 定时更新
//
// 按固定间隔唤醒，与持久化的“下次更新时间”比较：未到期什么也不做，
// 到期则执行一次 下载 → 设置 → 自动另存，成功后按更新模式重新计算下次时间。
// 失败时保留原来的下次时间，下一次唤醒会重试。

use crate::error::{AppError, Result};
use crate::model::Wallpaper;
use crate::service::WallpaperService;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone};
use rust_i18n::t;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

pub const STATE_FILE: &str = "state.json";

/// 更新模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// 每天零点
    #[default]
    Daily,
    /// 每天的指定时刻
    AtTime(NaiveTime),
}

impl UpdateMode {
    /// 未指定时刻时使用中午 12 点
    pub fn default_time() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default()
    }
}

impl FromStr for UpdateMode {
    type Err = AppError;

    /// 支持 `daily`、`at`（12:00）、`at:HH:MM`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("daily") {
            return Ok(Self::Daily);
        }
        if s.eq_ignore_ascii_case("at") {
            return Ok(Self::AtTime(Self::default_time()));
        }
        match s.split_once(':') {
            Some((prefix, time)) if prefix.eq_ignore_ascii_case("at") => {
                NaiveTime::parse_from_str(time.trim(), "%H:%M")
                    .map(Self::AtTime)
                    .map_err(|e| AppError::Config(format!("invalid update time '{time}': {e}")))
            }
            _ => Err(AppError::Config(format!(
                "invalid update mode '{s}', expected 'daily' or 'at:HH:MM'"
            ))),
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::AtTime(t) => write!(f, "at:{}", t.format("%H:%M")),
        }
    }
}

fn at_local<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
    let naive = date.and_time(time);
    // 夏令时跳变造成的空档按 UTC 解释
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

/// 计算下一次更新时间
///
/// - Daily：明天零点
/// - AtTime：今天的指定时刻，已经过去（或正好是现在）则顺延到明天
pub fn next_update_time<Tz: TimeZone>(now: &DateTime<Tz>, mode: UpdateMode) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();
    let tomorrow = today.succ_opt().unwrap_or(today);

    match mode {
        UpdateMode::Daily => at_local(&tz, tomorrow, NaiveTime::MIN),
        UpdateMode::AtTime(time) => {
            let candidate = at_local(&tz, today, time);
            if candidate <= *now {
                at_local(&tz, tomorrow, time)
            } else {
                candidate
            }
        }
    }
}

/// 持久化的更新状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateState {
    #[serde(default)]
    pub next_update_time: Option<DateTime<FixedOffset>>,
}

impl UpdateState {
    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(STATE_FILE)
    }

    /// 文件不存在时返回默认状态
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// 按更新模式重新计算并保存下次更新时间
///
/// `now` 应带真实时区（通常是 `Local`），夏令时切换前后的偏移才会算对；
/// 只在保存时转换成固定偏移。
pub fn reschedule<Tz: TimeZone>(
    state_path: &Path,
    mode: UpdateMode,
    now: DateTime<Tz>,
) -> Result<DateTime<FixedOffset>> {
    let mut state = UpdateState::load(state_path)?;
    let next = next_update_time(&now, mode).fixed_offset();
    state.next_update_time = Some(next);
    state.save(state_path)?;
    info!(%next, %mode, "next update scheduled");
    Ok(next)
}

/// 单次运行的结果
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// 还没到更新时间
    Idle { next: DateTime<FixedOffset> },
    /// 已完成一次更新
    Updated {
        wallpaper: Wallpaper,
        next: DateTime<FixedOffset>,
    },
    /// 更新失败，下次时间保持不变
    Failed(String),
}

pub struct UpdateTask<'a> {
    service: &'a mut WallpaperService,
    mode: UpdateMode,
    state_path: PathBuf,
}

impl<'a> UpdateTask<'a> {
    pub fn new(service: &'a mut WallpaperService, mode: UpdateMode) -> Self {
        let state_path = UpdateState::path_in(&service.settings().data_dir);
        Self {
            service,
            mode,
            state_path,
        }
    }

    pub fn state(&self) -> Result<UpdateState> {
        UpdateState::load(&self.state_path)
    }

    /// 重新计算并保存下次更新时间（开启自动更新或修改模式时调用）
    pub fn reschedule<Tz: TimeZone>(&self, now: DateTime<Tz>) -> Result<DateTime<FixedOffset>> {
        reschedule(&self.state_path, self.mode, now)
    }

    /// 执行一次检查；`force` 为 true 时忽略下次更新时间
    ///
    /// 不返回错误：所有失败都记日志并通知用户。
    pub async fn run<Tz: TimeZone>(&mut self, now: DateTime<Tz>, force: bool) -> TaskOutcome {
        let now_fixed = now.fixed_offset();
        let state = match self.state() {
            Ok(state) => state,
            Err(e) => return self.fail(e.to_string()),
        };

        if let Some(next) = state.next_update_time {
            if next > now_fixed && !force {
                debug!(%next, "update not due yet");
                return TaskOutcome::Idle { next };
            }
        }

        info!(now = %now_fixed, "running scheduled wallpaper update");
        let wallpaper = match self.update_wallpaper().await {
            Ok(w) => w,
            Err(reason) => return self.fail(reason),
        };

        let next = next_update_time(&now, self.mode).fixed_offset();
        let new_state = UpdateState {
            next_update_time: Some(next),
        };
        if let Err(e) = new_state.save(&self.state_path) {
            return self.fail(e.to_string());
        }

        info!(title = %wallpaper.title, %next, "wallpaper updated");
        self.service.notifier().notify(
            &t!("notify_updated_title"),
            &t!("notify_updated_body", title => wallpaper.title.as_str()),
        );
        TaskOutcome::Updated { wallpaper, next }
    }

    async fn update_wallpaper(&mut self) -> std::result::Result<Wallpaper, String> {
        let wallpaper = self.service.download_wallpaper().await;
        if wallpaper.is_empty() || wallpaper.path.is_none() {
            return Err(t!("error_no_wallpapers").to_string());
        }
        if !self.service.apply(&wallpaper) {
            return Err(t!("error_set_failed").to_string());
        }
        Ok(wallpaper)
    }

    fn fail(&self, reason: String) -> TaskOutcome {
        error!(%reason, "scheduled wallpaper update failed");
        self.service.notifier().notify(
            &t!("notify_update_failed_title"),
            &t!("notify_update_failed_body", reason => &reason),
        );
        TaskOutcome::Failed(reason)
    }
}

/// 常驻运行：每隔固定时间唤醒一次检查是否到期，Ctrl-C 退出
pub async fn watch(service: &mut WallpaperService, mode: UpdateMode, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    info!(interval_secs = interval.as_secs(), %mode, "watching for scheduled updates");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = UpdateTask::new(service, mode).run(Local::now(), false).await;
                debug!(?outcome, "scheduled check finished");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("stopping scheduled updates");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BingResolution, Resolution};
    use crate::testing::{MockFetcher, MockSetter, RecordingNotifier, test_service_with_notifier};
    use chrono::Utc;

    const BING_BODY: &str = r#"{"images":[
        {"urlbase":"/th?id=OHR.Daily_ZH-CN1","title":"Daily","description":"d","copyrighttext":"© D"}
    ]}"#;

    fn time(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn parse_update_modes() {
        assert_eq!("daily".parse::<UpdateMode>().unwrap(), UpdateMode::Daily);
        assert_eq!(
            "at:07:30".parse::<UpdateMode>().unwrap(),
            UpdateMode::AtTime(NaiveTime::from_hms_opt(7, 30, 0).unwrap())
        );
        assert_eq!(
            "at".parse::<UpdateMode>().unwrap(),
            UpdateMode::AtTime(UpdateMode::default_time())
        );
        assert!("weekly".parse::<UpdateMode>().is_err());
        assert!("at:25:00".parse::<UpdateMode>().is_err());
        assert_eq!(UpdateMode::AtTime(NaiveTime::from_hms_opt(7, 5, 0).unwrap()).to_string(), "at:07:05");
    }

    #[test]
    fn daily_is_next_midnight() {
        let now = time("2024-03-10T15:20:00+08:00");
        assert_eq!(next_update_time(&now, UpdateMode::Daily), time("2024-03-11T00:00:00+08:00"));
    }

    #[test]
    fn at_time_later_today() {
        let now = time("2024-03-10T08:00:00+08:00");
        let mode = UpdateMode::AtTime(NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert_eq!(next_update_time(&now, mode), time("2024-03-10T12:00:00+08:00"));
    }

    #[test]
    fn at_time_already_passed_rolls_over() {
        let mode = UpdateMode::AtTime(NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        let now = time("2024-12-31T12:00:00+00:00");
        assert_eq!(next_update_time(&now, mode), time("2025-01-01T12:00:00+00:00"));

        let utc_now = Utc.with_ymd_and_hms(2024, 2, 28, 18, 0, 0).unwrap();
        assert_eq!(
            next_update_time(&utc_now, mode),
            Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = UpdateState::path_in(dir.path());
        assert_eq!(UpdateState::load(&path).unwrap(), UpdateState::default());

        let state = UpdateState {
            next_update_time: Some(time("2024-03-11T00:00:00+08:00")),
        };
        state.save(&path).unwrap();
        assert_eq!(UpdateState::load(&path).unwrap(), state);
    }

    #[tokio::test]
    async fn due_task_runs_one_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::with_text(BING_BODY);
        let setter = MockSetter::default();
        let notifier = RecordingNotifier::default();
        let mut service = test_service_with_notifier(
            dir.path(),
            Resolution::Bing(BingResolution::Uhd),
            fetcher.clone(),
            setter.clone(),
            notifier.clone(),
        );

        let now = time("2024-03-10T09:00:00+08:00");
        let state_path = UpdateState::path_in(&service.settings().data_dir);
        UpdateState {
            next_update_time: Some(time("2024-03-10T00:00:00+08:00")),
        }
        .save(&state_path)
        .unwrap();

        let outcome = UpdateTask::new(&mut service, UpdateMode::Daily).run(now, false).await;

        let TaskOutcome::Updated { wallpaper, next } = outcome else {
            panic!("expected an update, got {outcome:?}");
        };
        assert_eq!(wallpaper.title, "Daily");
        assert_eq!(next, time("2024-03-11T00:00:00+08:00"));
        assert!(next > now);
        assert_eq!(fetcher.text_calls(), 1);
        assert_eq!(fetcher.bytes_calls(), 1);
        assert_eq!(setter.applied().len(), 1);
        assert_eq!(notifier.messages().len(), 1);
        assert_eq!(UpdateState::load(&state_path).unwrap().next_update_time, Some(next));
    }

    #[tokio::test]
    async fn future_due_time_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::with_text(BING_BODY);
        let setter = MockSetter::default();
        let mut service = test_service_with_notifier(
            dir.path(),
            Resolution::Bing(BingResolution::Uhd),
            fetcher.clone(),
            setter.clone(),
            RecordingNotifier::default(),
        );

        let next = time("2024-03-11T00:00:00+08:00");
        let mut task = UpdateTask::new(&mut service, UpdateMode::Daily);
        UpdateState {
            next_update_time: Some(next),
        }
        .save(&task.state_path)
        .unwrap();

        let outcome = task.run(time("2024-03-10T09:00:00+08:00"), false).await;
        assert_eq!(outcome, TaskOutcome::Idle { next });
        assert_eq!(fetcher.text_calls(), 0);
        assert!(setter.applied().is_empty());
    }

    #[tokio::test]
    async fn failure_keeps_due_time_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = RecordingNotifier::default();
        let mut service = test_service_with_notifier(
            dir.path(),
            Resolution::Bing(BingResolution::Uhd),
            MockFetcher::failing(),
            MockSetter::default(),
            notifier.clone(),
        );

        let due = time("2024-03-10T00:00:00+08:00");
        let mut task = UpdateTask::new(&mut service, UpdateMode::Daily);
        UpdateState {
            next_update_time: Some(due),
        }
        .save(&task.state_path)
        .unwrap();

        let outcome = task.run(time("2024-03-10T09:00:00+08:00"), false).await;
        assert!(matches!(outcome, TaskOutcome::Failed(_)));
        assert_eq!(task.state().unwrap().next_update_time, Some(due));
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn missing_state_counts_as_due() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::with_text(BING_BODY);
        let mut service = test_service_with_notifier(
            dir.path(),
            Resolution::Bing(BingResolution::Uhd),
            fetcher.clone(),
            MockSetter::default(),
            RecordingNotifier::default(),
        );

        let outcome = UpdateTask::new(&mut service, UpdateMode::Daily)
            .run(time("2024-03-10T09:00:00+08:00"), false)
            .await;
        assert!(matches!(outcome, TaskOutcome::Updated { .. }));
        assert_eq!(fetcher.bytes_calls(), 1);
    }

    /// 2024-03-31 02:00 本地时间切换到夏令时，+01:00 → +02:00
    #[derive(Debug, Clone, Copy)]
    struct CentralEurope;

    impl CentralEurope {
        fn winter() -> FixedOffset {
            FixedOffset::east_opt(3600).unwrap()
        }

        fn summer() -> FixedOffset {
            FixedOffset::east_opt(7200).unwrap()
        }

        fn switch_utc() -> chrono::NaiveDateTime {
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap().and_hms_opt(1, 0, 0).unwrap()
        }
    }

    impl TimeZone for CentralEurope {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            CentralEurope
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> chrono::LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(
            &self,
            local: &chrono::NaiveDateTime,
        ) -> chrono::LocalResult<FixedOffset> {
            let day = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
            let gap_start = day.and_hms_opt(2, 0, 0).unwrap();
            let gap_end = day.and_hms_opt(3, 0, 0).unwrap();
            if *local < gap_start {
                chrono::LocalResult::Single(Self::winter())
            } else if *local < gap_end {
                chrono::LocalResult::None
            } else {
                chrono::LocalResult::Single(Self::summer())
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &chrono::NaiveDateTime) -> FixedOffset {
            if *utc < Self::switch_utc() {
                Self::winter()
            } else {
                Self::summer()
            }
        }
    }

    #[test]
    fn reschedule_across_dst_uses_new_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = UpdateState::path_in(dir.path());
        let mode = UpdateMode::AtTime(NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        let now = CentralEurope.with_ymd_and_hms(2024, 3, 30, 13, 0, 0).unwrap();

        let next = reschedule(&path, mode, now).unwrap();
        assert_eq!(next, time("2024-03-31T12:00:00+02:00"));
        assert_eq!(next.offset(), &CentralEurope::summer());

        let daily = reschedule(&path, UpdateMode::Daily, now).unwrap();
        assert_eq!(daily, time("2024-03-31T00:00:00+01:00"));
    }

    #[tokio::test]
    async fn force_ignores_future_due_time() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::with_text(BING_BODY);
        let setter = MockSetter::default();
        let mut service = test_service_with_notifier(
            dir.path(),
            Resolution::Bing(BingResolution::Uhd),
            fetcher.clone(),
            setter.clone(),
            RecordingNotifier::default(),
        );

        let mut task = UpdateTask::new(&mut service, UpdateMode::Daily);
        UpdateState {
            next_update_time: Some(time("2024-03-11T00:00:00+08:00")),
        }
        .save(&task.state_path)
        .unwrap();

        let now = time("2024-03-10T09:00:00+08:00");
        let outcome = task.run(now, true).await;
        let TaskOutcome::Updated { next, .. } = outcome else {
            panic!("expected a forced update, got {outcome:?}");
        };
        assert_eq!(next, time("2024-03-11T00:00:00+08:00"));
        assert_eq!(fetcher.bytes_calls(), 1);
        assert_eq!(setter.applied().len(), 1);
    }

    #[test]
    fn reschedule_writes_next_time() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = test_service_with_notifier(
            dir.path(),
            Resolution::Bing(BingResolution::Uhd),
            MockFetcher::failing(),
            MockSetter::default(),
            RecordingNotifier::default(),
        );
        let mode = UpdateMode::AtTime(NaiveTime::from_hms_opt(6, 0, 0).unwrap());
        let task = UpdateTask::new(&mut service, mode);
        let next = task.reschedule(time("2024-03-10T09:00:00+08:00")).unwrap();
        assert_eq!(next, time("2024-03-11T06:00:00+08:00"));
        assert_eq!(task.state().unwrap().next_update_time, Some(next));
    }
}
