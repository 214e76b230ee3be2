use super::{NotificationRequest, Urgency};
use crate::config::PlatformSettings;
use std::path::PathBuf;

/// Desktop platform, picked once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

/// How long the notification stays up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Millis(u64),
    Seconds(u64),
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sound {
    Off,
    On,
    Named(String),
}

/// A request shaped for one platform's notification tool
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformNotification {
    pub title: String,
    pub message: String,
    pub icon: Option<PathBuf>,
    pub expiry: Expiry,
    pub sound: Sound,
    /// Linux only, already mapped through the configured names
    pub urgency: Option<String>,
}

impl Platform {
    pub fn detect() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    pub fn shape(
        self,
        request: &NotificationRequest,
        settings: &PlatformSettings,
    ) -> PlatformNotification {
        let mut shaped = PlatformNotification {
            title: request.title.clone(),
            message: request.message.clone(),
            icon: request.icon.clone(),
            expiry: Expiry::Seconds(request.timeout_secs),
            sound: Sound::Off,
            urgency: None,
        };

        match self {
            Platform::Windows => {
                shaped.expiry = Expiry::Millis(request.timeout_secs.saturating_mul(1000));
                if request.sound && settings.windows.sound_enabled {
                    shaped.sound = Sound::On;
                }
            }
            Platform::MacOs => {
                if request.timeout_secs == 0 {
                    shaped.expiry = Expiry::Never;
                }
                if request.sound && settings.macos.sound_enabled {
                    shaped.sound = Sound::Named(settings.macos.sound_name.clone());
                }
            }
            Platform::Linux => {
                if request.sound && settings.linux.sound_enabled {
                    shaped.sound = Sound::On;
                }
                let mapping = &settings.linux.urgency_mapping;
                shaped.urgency = Some(
                    match request.urgency {
                        Urgency::Low => &mapping.low,
                        Urgency::Normal => &mapping.normal,
                        Urgency::Critical => &mapping.critical,
                    }
                    .clone(),
                );
            }
        }

        shaped
    }
}
