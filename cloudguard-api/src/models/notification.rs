use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Id;

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RainDetected,
    ClothesRetracted,
    ClothesExtended,
    ScheduleExecuted,
    DeviceOffline,
    LowBattery,
    SystemError,
    WeatherAlert,
}

impl From<String> for NotificationKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "rain_detected" => NotificationKind::RainDetected,
            "clothes_retracted" => NotificationKind::ClothesRetracted,
            "clothes_extended" => NotificationKind::ClothesExtended,
            "schedule_executed" => NotificationKind::ScheduleExecuted,
            "device_offline" => NotificationKind::DeviceOffline,
            "low_battery" => NotificationKind::LowBattery,
            "weather_alert" => NotificationKind::WeatherAlert,
            _ => NotificationKind::SystemError,
        }
    }
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            NotificationKind::RainDetected => write!(f, "rain_detected"),
            NotificationKind::ClothesRetracted => write!(f, "clothes_retracted"),
            NotificationKind::ClothesExtended => write!(f, "clothes_extended"),
            NotificationKind::ScheduleExecuted => write!(f, "schedule_executed"),
            NotificationKind::DeviceOffline => write!(f, "device_offline"),
            NotificationKind::LowBattery => write!(f, "low_battery"),
            NotificationKind::SystemError => write!(f, "system_error"),
            NotificationKind::WeatherAlert => write!(f, "weather_alert"),
        }
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        match value.as_str() {
            "warning" => Severity::Warning,
            "error" => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub id: Id,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
