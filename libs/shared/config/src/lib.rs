use std::env;
use std::str::FromStr;
use tracing::warn;

/// Working-hours calendar used by slot search and booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulingConfig {
    pub work_start_hour: u32,
    pub work_end_hour: u32,
    pub slot_minutes: i64,
    pub appointment_duration_minutes: i64,
    /// Offset of the clinic's wall clock from UTC. All working-hour math happens in this offset.
    pub utc_offset_minutes: i32,
    pub max_scan_days: u32,
    pub offered_slot_count: usize,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            work_start_hour: 10,
            work_end_hour: 17,
            slot_minutes: 30,
            appointment_duration_minutes: 30,
            utc_offset_minutes: 0,
            max_scan_days: 60,
            offered_slot_count: 3,
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            work_start_hour: parse_var("WORK_START_HOUR", defaults.work_start_hour),
            work_end_hour: parse_var("WORK_END_HOUR", defaults.work_end_hour),
            slot_minutes: parse_var("SLOT_MINUTES", defaults.slot_minutes),
            appointment_duration_minutes: parse_var(
                "APPOINTMENT_DURATION_MINUTES",
                defaults.appointment_duration_minutes,
            ),
            utc_offset_minutes: parse_var(
                "SCHEDULING_UTC_OFFSET_MINUTES",
                defaults.utc_offset_minutes,
            ),
            max_scan_days: parse_var("SLOT_SCAN_DAYS", defaults.max_scan_days),
            offered_slot_count: parse_var("OFFERED_SLOT_COUNT", defaults.offered_slot_count),
        }
    }

    pub fn is_valid(&self) -> bool {
        if self.work_start_hour >= self.work_end_hour || self.work_end_hour > 24 {
            return false;
        }
        let window_minutes = i64::from(self.work_end_hour - self.work_start_hour) * 60;

        self.utc_offset_minutes.abs() < 24 * 60
            && self.slot_minutes > 0
            && self.slot_minutes <= window_minutes
            && self.appointment_duration_minutes > 0
            && self.appointment_duration_minutes <= window_minutes
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub agent_timeout_seconds: u64,
    pub agent_history_window: usize,
    pub scheduling: SchedulingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            port: parse_var("PORT", 3000),
            openai_api_key: env::var("OPENAI_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("OPENAI_API_KEY not set, using empty value");
                    String::new()
                }),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            agent_timeout_seconds: parse_var("AGENT_TIMEOUT_SECONDS", 30),
            agent_history_window: parse_var("AGENT_HISTORY_WINDOW", 8),
            scheduling: SchedulingConfig::from_env(),
        };

        if !config.is_configured() {
            warn!("Intake agent not configured - every turn will use the fallback reply");
        }

        if !config.scheduling.is_valid() {
            warn!("Scheduling window is invalid, no appointment slots will be offered: {:?}", config.scheduling);
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.openai_api_key.is_empty() && !self.openai_base_url.is_empty()
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {:?}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scheduling_window() {
        let config = SchedulingConfig::default();

        assert_eq!(config.work_start_hour, 10);
        assert_eq!(config.work_end_hour, 17);
        assert_eq!(config.slot_minutes, 30);
        assert!(config.is_valid());
    }

    #[test]
    fn test_inverted_window_is_invalid() {
        let config = SchedulingConfig {
            work_start_hour: 17,
            work_end_hour: 10,
            ..SchedulingConfig::default()
        };

        assert!(!config.is_valid());
    }

    #[test]
    fn test_duration_longer_than_window_is_invalid() {
        let config = SchedulingConfig {
            work_start_hour: 10,
            work_end_hour: 11,
            appointment_duration_minutes: 90,
            ..SchedulingConfig::default()
        };

        assert!(!config.is_valid());
    }

    #[test]
    fn test_slot_longer_than_window_is_invalid() {
        let config = SchedulingConfig {
            work_start_hour: 10,
            work_end_hour: 11,
            slot_minutes: 61,
            appointment_duration_minutes: 30,
            ..SchedulingConfig::default()
        };
        let huge = SchedulingConfig {
            slot_minutes: i64::MAX,
            ..SchedulingConfig::default()
        };

        assert!(!config.is_valid());
        assert!(!huge.is_valid());
    }
}
