//! Display utilities for the rhythmee CLI.
//!
//! This module provides formatted output for:
//! - Alarm listings
//! - Station search results
//! - Country/tag listings
//! - Error messages

use crate::alarms::Alarm;
use crate::directory::{Country, Station, Tag};

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows an added alarm.
    pub fn show_alarm_added(alarm: &Alarm) {
        println!("* アラームを追加しました");
        println!("  {}", Self::format_alarm(alarm));
    }

    /// Shows the alarm list.
    pub fn show_alarm_list(alarms: &[Alarm]) {
        if alarms.is_empty() {
            println!("アラームは登録されていません");
            return;
        }
        println!("アラーム一覧");
        println!("─────────────────────────────");
        for alarm in alarms {
            println!("{}", Self::format_alarm(alarm));
        }
    }

    /// Shows a removed alarm id.
    pub fn show_alarm_removed(id: &str) {
        println!("* アラームを削除しました: {}", id);
    }

    /// Shows a snoozed alarm.
    pub fn show_alarm_snoozed(id: &str, minutes: u32) {
        println!("* アラームを{}分後に延期しました: {}", minutes, id);
    }

    /// Shows an enabled/disabled alarm.
    pub fn show_alarm_toggled(id: &str, enabled: bool) {
        if enabled {
            println!("* アラームを有効にしました: {}", id);
        } else {
            println!("* アラームを無効にしました: {}", id);
        }
    }

    /// Shows station search results.
    pub fn show_stations(stations: &[Station]) {
        if stations.is_empty() {
            println!("ステーションが見つかりませんでした");
            println!("  （検索条件を変えるか、しばらくしてから再試行してください）");
            return;
        }
        for station in stations {
            let mut line = format!("{}  [{}]", station.name, station.countrycode);
            if station.bitrate > 0 {
                line.push_str(&format!("  {}kbps", station.bitrate));
            }
            if !station.codec.is_empty() {
                line.push_str(&format!("  {}", station.codec));
            }
            println!("{}", line);
            println!("  {}", station.playable_url());
        }
    }

    /// Shows the country list.
    pub fn show_countries(countries: &[Country]) {
        if countries.is_empty() {
            println!("国リストを取得できませんでした");
            return;
        }
        for country in countries {
            println!("{:>6}  {}", country.stationcount, country.name);
        }
    }

    /// Shows the tag list.
    pub fn show_tags(tags: &[Tag]) {
        if tags.is_empty() {
            println!("タグリストを取得できませんでした");
            return;
        }
        for tag in tags {
            println!("{:>6}  {}", tag.stationcount, tag.name);
        }
    }

    /// Shows the station being previewed.
    pub fn show_listening(station: &Station) {
        println!("> 再生中: {}", station.name);
        println!("  {}", station.playable_url());
        println!("  Ctrl+C で停止します");
    }

    /// Shows the armed sleep timer.
    pub fn show_sleep_timer_started(minutes: u32) {
        println!("* スリープタイマー: {}分後に停止します", minutes);
    }

    /// Shows favorite toggle result.
    pub fn show_favorite_toggled(station: &Station, is_favorite: bool) {
        if is_favorite {
            println!("* お気に入りに追加しました: {}", station.name);
        } else {
            println!("* お気に入りから削除しました: {}", station.name);
        }
    }

    /// Shows the favorite list.
    pub fn show_favorites(stations: &[Station]) {
        if stations.is_empty() {
            println!("お気に入りは登録されていません");
            return;
        }
        println!("お気に入り一覧");
        println!("─────────────────────────────");
        for station in stations {
            println!("{}", station.name);
            println!("  {}", station.playable_url());
        }
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }

    /// Formats one alarm line: id, time, days, state, station.
    fn format_alarm(alarm: &Alarm) -> String {
        let days = if alarm.is_one_shot() {
            "単発".to_string()
        } else {
            const DAY_NAMES: [&str; 7] = ["月", "火", "水", "木", "金", "土", "日"];
            alarm
                .repeat_days
                .iter()
                .filter_map(|d| DAY_NAMES.get(usize::from(*d) - 1))
                .copied()
                .collect::<Vec<_>>()
                .join(",")
        };
        let state = if alarm.enabled { "有効" } else { "無効" };
        let station = alarm
            .station
            .as_ref()
            .map_or("内蔵アラーム音", |s| s.name.as_str());
        format!(
            "{}  {}  [{}]  {}  {}  ({})",
            alarm.id, alarm.time, days, state, alarm.label, station
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarms::{AlarmTime, StationRef};

    #[test]
    fn test_format_alarm_one_shot() {
        let alarm = Alarm::new(AlarmTime::new(7, 30).unwrap(), "起床");
        let line = Display::format_alarm(&alarm);
        assert!(line.contains("07:30"));
        assert!(line.contains("単発"));
        assert!(line.contains("有効"));
        assert!(line.contains("内蔵アラーム音"));
    }

    #[test]
    fn test_format_alarm_weekdays_and_station() {
        let mut alarm = Alarm::new(AlarmTime::new(6, 0).unwrap(), "平日")
            .with_repeat_days([1, 2, 3, 4, 5])
            .with_station(StationRef {
                id: "x".to_string(),
                name: "FIP".to_string(),
                stream_url: "http://example.com/fip".to_string(),
            });
        alarm.enabled = false;

        let line = Display::format_alarm(&alarm);
        assert!(line.contains("月,火,水,木,金"));
        assert!(line.contains("無効"));
        assert!(line.contains("FIP"));
    }
}
