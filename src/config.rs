use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{BotError, Result};
use crate::selector::Selector;
use crate::utils::redact;

// --- Remote Session ---
pub const DEFAULT_SERVER_URL: &str = "http://localhost:4723/wd/hub";
pub const DEFAULT_DEVICE_NAME: &str = "Android Emulator";
pub const DEFAULT_PLATFORM_VERSION: &str = "11";
pub const APP_PACKAGE: &str = "com.instagram.android";
pub const APP_ACTIVITY: &str = ".activity.MainTabActivity";
pub const NEW_COMMAND_TIMEOUT_SECS: u64 = 300;

// --- Credentials ---
pub const ENV_USERNAME: &str = "IG_USERNAME";
pub const ENV_PASSWORD: &str = "IG_PASSWORD";

// --- Selectors ---
// 1. Interstitials (each one optional, clicked independently)
pub const DISMISS_PROMPTS: &[Selector] = &[
    Selector::id("com.android.permissioncontroller:id/permission_allow_button"),
    Selector::ui(r#"new UiSelector().text("Allow")"#),
    Selector::ui(r#"new UiSelector().textContains("Skip")"#),
];

// 2. "Log in" entry on the landing screen
// The bare "Log in" text also matches the form's submit button, so it goes last.
pub const LOGIN_ENTRY: &[Selector] = &[
    Selector::id("com.instagram.android:id/log_in_button"),
    Selector::ui(r#"new UiSelector().textContains("Log into existing account")"#),
    Selector::ui(r#"new UiSelector().descriptionContains("Log in")"#),
    Selector::ui(r#"new UiSelector().textContains("Log in")"#),
];

// 3. Login form
pub const USERNAME_FIELD: &[Selector] = &[
    Selector::id("com.instagram.android:id/login_username"),
    Selector::ui(r#"new UiSelector().resourceId("com.instagram.android:id/login_username")"#),
    Selector::ui(r#"new UiSelector().className("android.widget.EditText").instance(0)"#),
];

pub const PASSWORD_FIELD: &[Selector] = &[
    Selector::id("com.instagram.android:id/password"),
    Selector::ui(r#"new UiSelector().resourceId("com.instagram.android:id/password")"#),
    Selector::ui(r#"new UiSelector().className("android.widget.EditText").instance(1)"#),
];

pub const SUBMIT_BUTTON: &[Selector] = &[
    Selector::id("com.instagram.android:id/button_text"),
    Selector::ui(r#"new UiSelector().text("Log in").enabled(true)"#),
    Selector::ui(r#"new UiSelector().className("android.widget.Button").textContains("Log in")"#),
];

// 4. Post-login markers (success is always checked first)
pub const SUCCESS_INDICATORS: &[Selector] = &[
    Selector::id("com.instagram.android:id/tab_bar"),
    Selector::id("com.instagram.android:id/feed_tab"),
    Selector::ui(r#"new UiSelector().descriptionContains("Home")"#),
];

pub const FAILURE_INDICATORS: &[Selector] = &[
    Selector::ui(r#"new UiSelector().textContains("incorrect")"#),
    Selector::ui(r#"new UiSelector().textContains("wrong")"#),
    Selector::ui(r#"new UiSelector().textContains("try again")"#),
    Selector::ui(r#"new UiSelector().textContains("Try again")"#),
];

/// Every wait the flow performs, in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timings {
    pub app_settle: Duration,
    pub dismiss_pause: Duration,
    pub navigation_pause: Duration,
    pub field_pause: Duration,
    pub field_timeout: Duration,
    pub poll_interval: Duration,
    pub submit_settle: Duration,
    pub verify_settle: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            app_settle: Duration::from_secs(10),
            dismiss_pause: Duration::from_secs(2),
            navigation_pause: Duration::from_secs(3),
            field_pause: Duration::from_secs(1),
            field_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(500),
            submit_settle: Duration::from_secs(15),
            verify_settle: Duration::from_secs(10),
        }
    }
}

impl Timings {
    /// Divides every delay by `divisor`; the poll interval is left alone.
    pub fn scaled(&self, divisor: u32) -> Self {
        let divisor = divisor.max(1);
        Self {
            app_settle: self.app_settle / divisor,
            dismiss_pause: self.dismiss_pause / divisor,
            navigation_pause: self.navigation_pause / divisor,
            field_pause: self.field_pause / divisor,
            field_timeout: self.field_timeout / divisor,
            poll_interval: self.poll_interval,
            submit_settle: self.submit_settle / divisor,
            verify_settle: self.verify_settle / divisor,
        }
    }

    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            app_settle: Duration::ZERO,
            dismiss_pause: Duration::ZERO,
            navigation_pause: Duration::ZERO,
            field_pause: Duration::ZERO,
            field_timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
            submit_settle: Duration::ZERO,
            verify_settle: Duration::ZERO,
        }
    }
}

/// Connection parameters handed to the automation server.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub server_url: String,
    pub device_name: String,
    pub platform_version: String,
    pub app_package: String,
    pub app_activity: String,
    pub screenshot_dir: PathBuf,
    pub command_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            platform_version: DEFAULT_PLATFORM_VERSION.to_string(),
            app_package: APP_PACKAGE.to_string(),
            app_activity: APP_ACTIVITY.to_string(),
            screenshot_dir: PathBuf::from("."),
            command_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    /// Reads both values through `lookup`; blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(BotError::MissingCredentials(key))
        };
        Ok(Self::new(read(ENV_USERNAME)?, read(ENV_PASSWORD)?))
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn redacted_username(&self) -> String {
        redact(&self.username)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.redacted_username())
            .field("password", &"***")
            .finish()
    }
}
