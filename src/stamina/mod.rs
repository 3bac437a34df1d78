//! Daily stamina card
//!
//! Derives everything the status card displays from the daily note and the
//! account counters. Drawing is left to the caller; [`StaminaCard`] also
//! renders itself as text, with ANSI colors under the alternate flag (`{:#}`).

pub mod model;

pub use model::{AccountBaseInfo, DailyData, EnergyData, ProgressData};

use crate::colors::{TrueColor, GOLD, GREEN, GREY, RED, WHITE, YELLOW};
use chrono::{DateTime, TimeZone};
use std::fmt;

/// Shown instead of a refresh time when energy is already full
pub const FULL_ENERGY_TEXT: &str = "漂泊者该上潮了";

/// Ratio above which a meter is drawn in the warning color
pub const PRESSURE_THRESHOLD: f64 = 0.8;

const ROLE_NAME_MAX_CHARS: usize = 7;

/// A current/limit pair with fill ratio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Meter {
    pub current: Option<i64>,
    pub limit: Option<i64>,
    pub ratio: f64,
    pub color: TrueColor,
}

impl Meter {
    /// Meter that turns red when nearly full
    #[must_use]
    pub fn pressure(current: Option<i64>, limit: Option<i64>) -> Self {
        let ratio = fill_ratio(current, limit);
        let color = if ratio > PRESSURE_THRESHOLD { RED } else { YELLOW };
        Self {
            current,
            limit,
            ratio,
            color,
        }
    }

    #[must_use]
    pub fn plain(current: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            current,
            limit,
            ratio: fill_ratio(current, limit),
            color: YELLOW,
        }
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({:.0}%)",
            display_count(self.current),
            display_count(self.limit),
            self.ratio * 100.0
        )
    }
}

/// Ratio of `current` to `limit`, or 0 when either is missing or the limit is 0
#[must_use]
pub fn fill_ratio(current: Option<i64>, limit: Option<i64>) -> f64 {
    match (current, limit) {
        (Some(current), Some(limit)) if limit != 0 => current as f64 / limit as f64,
        _ => 0.0,
    }
}

fn display_count(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// A counter shown as `value / limit` with a state color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub value: Option<i64>,
    pub limit: Option<i64>,
    pub color: TrueColor,
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            display_count(self.value),
            display_count(self.limit)
        )
    }
}

/// Everything the stamina card shows for one account
#[derive(Debug, Clone, PartialEq)]
pub struct StaminaCard {
    pub role_name: String,
    pub role_id: String,
    pub signed_in: bool,
    pub liveness_full: bool,
    /// Remaining weekly boss clears; absent when the API omits either count
    pub weekly: Option<Tally>,
    pub battle_pass_level: Option<i64>,
    pub rouge: Tally,
    pub energy: Meter,
    pub store_energy: Meter,
    pub liveness: Meter,
    pub refresh: String,
}

impl StaminaCard {
    pub fn build<Tz>(daily: &DailyData, account: &AccountBaseInfo, now: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let liveness = &daily.liveness_data;

        let weekly = match (account.weekly_inst_count, account.weekly_inst_count_limit) {
            (Some(count), Some(limit)) => Some(Tally {
                value: Some(limit.saturating_sub(count)),
                limit: Some(limit),
                color: if count != 0 { RED } else { GREEN },
            }),
            _ => None,
        };

        let rouge = Tally {
            value: account.rouge_score,
            limit: account.rouge_score_limit,
            color: if account.rouge_score != account.rouge_score_limit {
                RED
            } else {
                GREEN
            },
        };

        Self {
            role_name: daily.role_name.chars().take(ROLE_NAME_MAX_CHARS).collect(),
            role_id: daily.role_id.clone(),
            signed_in: daily.has_sign_in,
            liveness_full: liveness.total != 0 && liveness.cur == liveness.total,
            weekly,
            battle_pass_level: daily.battle_pass_data.first().map(|pass| pass.cur),
            rouge,
            energy: Meter::pressure(Some(daily.energy_data.cur), Some(daily.energy_data.total)),
            store_energy: Meter::pressure(account.store_energy, account.store_energy_limit),
            liveness: Meter::plain(Some(liveness.cur), Some(liveness.total)),
            refresh: refresh_label(daily.energy_data.refresh_time_stamp, now),
        }
    }

    #[must_use]
    pub fn sign_in_text(&self) -> &'static str {
        if self.signed_in {
            "签到已完成！"
        } else {
            "今日未签到！"
        }
    }

    #[must_use]
    pub fn liveness_text(&self) -> &'static str {
        if self.liveness_full {
            "活跃度已满！"
        } else {
            "活跃度未满！"
        }
    }
}

impl fmt::Display for StaminaCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let colored = f.alternate();
        let paint = |color: TrueColor, text: String| {
            if colored {
                color.paint(text)
            } else {
                text
            }
        };

        writeln!(
            f,
            "{}  {}",
            paint(GREY, self.role_name.clone()),
            paint(GOLD, format!("特征码: {}", self.role_id))
        )?;
        writeln!(f, "{}  {}", self.sign_in_text(), self.liveness_text())?;
        writeln!(
            f,
            "结晶波片  {}  [{}]",
            paint(self.energy.color, self.energy.to_string()),
            paint(WHITE, self.refresh.clone())
        )?;
        writeln!(
            f,
            "结晶单质  {}",
            paint(self.store_energy.color, self.store_energy.to_string())
        )?;
        writeln!(
            f,
            "活跃度    {}",
            paint(self.liveness.color, self.liveness.to_string())
        )?;
        if let Some(weekly) = &self.weekly {
            writeln!(
                f,
                "{}  {}",
                paint(GREY, "战歌重奏".to_string()),
                paint(weekly.color, weekly.to_string())
            )?;
        }
        if let Some(level) = self.battle_pass_level {
            writeln!(f, "{}  Lv.{level}", paint(GREY, "先约电台".to_string()))?;
        }
        write!(
            f,
            "{}  {}",
            paint(GREY, "千道门扉的异想".to_string()),
            paint(self.rouge.color, self.rouge.to_string())
        )
    }
}

/// Label for the moment energy is full again, relative to `now`
///
/// A missing or zero timestamp means energy is already full.
pub fn refresh_label<Tz>(refresh_time_stamp: Option<i64>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let now_ts = now.timestamp();
    let refresh_ts = refresh_time_stamp.filter(|&ts| ts != 0).unwrap_or(now_ts);
    if refresh_ts == now_ts {
        return FULL_ENERGY_TEXT.to_string();
    }

    let Some(at) = now.timezone().timestamp_opt(refresh_ts, 0).single() else {
        return FULL_ENERGY_TEXT.to_string();
    };

    let today = now.date_naive();
    let day = at.date_naive();
    if day == today {
        format!("今天 {}", at.format("%H:%M:%S"))
    } else if today.succ_opt() == Some(day) {
        format!("明天 {}", at.format("%H:%M:%S"))
    } else {
        at.format("%m.%d %H:%M:%S").to_string()
    }
}

/// Format a duration as `HH小时MM分`
#[must_use]
pub fn seconds_to_hours(seconds: i64) -> String {
    let minutes = seconds.div_euclid(60);
    let (hours, minutes) = (minutes.div_euclid(60), minutes.rem_euclid(60));
    format!("{hours:02}小时{minutes:02}分")
}

/// Per-user choice of card artwork.
///
/// The stored value is a character name optionally tagged with `背景`
/// (use a background), `立绘` (use a standing portrait) or `官方` (official
/// art only).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackgroundPreference {
    pub force_background: bool,
    pub force_portrait: bool,
    pub official_only: bool,
    pub character: String,
}

impl BackgroundPreference {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        Self {
            force_background: value.contains("背景"),
            force_portrait: value.contains("立绘"),
            official_only: value.contains("官方"),
            character: value
                .replace("背景", "")
                .replace("立绘", "")
                .replace("官方", "")
                .trim()
                .to_string(),
        }
    }
}
