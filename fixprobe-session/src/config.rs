/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session configuration.
//!
//! Settings are addressed by the key names used in engine configuration
//! files so that they can be read and written through the engine adapter.
//! Durations are expressed in whole seconds.

use fixprobe_core::error::SessionError;
use fixprobe_core::types::SessionId;
use std::collections::BTreeMap;
use std::time::Duration;

/// Well-known configuration keys.
pub mod keys {
    /// FIX version string.
    pub const BEGIN_STRING: &str = "BeginString";
    /// Our CompID.
    pub const SENDER_COMP_ID: &str = "SenderCompID";
    /// Counterparty CompID.
    pub const TARGET_COMP_ID: &str = "TargetCompID";
    /// Seconds between automatic logon retries.
    pub const RECONNECT_INTERVAL: &str = "ReconnectInterval";
    /// Seconds to wait for a Logon response.
    pub const LOGON_TIMEOUT: &str = "LogonTimeout";
    /// Seconds to wait for a Logout response.
    pub const LOGOUT_TIMEOUT: &str = "LogoutTimeout";
    /// Copied into outbound Logon as tag 1407.
    pub const DEFAULT_APPL_EXT_ID: &str = "DefaultApplExtID";
    /// Copied into outbound Logon as tag 57.
    pub const TARGET_SUB_ID: &str = "TargetSubID";
    /// Copied into outbound Logon as tag 142.
    pub const SENDER_LOCATION_ID: &str = "SenderLocationID";
}

/// Default reconnect interval.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(30);
/// Default logon timeout.
pub const DEFAULT_LOGON_TIMEOUT: Duration = Duration::from_secs(10);
/// Default logout timeout.
pub const DEFAULT_LOGOUT_TIMEOUT: Duration = Duration::from_secs(2);

/// Parses a whole-seconds setting, falling back to `default` when the value
/// is absent or not a number.
#[must_use]
pub fn parse_secs(value: Option<&str>, default: Duration) -> Duration {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

/// Configuration for a FIX session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// FIX version BeginString (e.g., "FIX.4.4").
    pub begin_string: String,
    /// Sender CompID (tag 49).
    pub sender_comp_id: String,
    /// Target CompID (tag 56).
    pub target_comp_id: String,
    /// Delay between automatic logon retries.
    pub reconnect_interval: Duration,
    /// Logon timeout duration.
    pub logon_timeout: Duration,
    /// Logout timeout duration.
    pub logout_timeout: Duration,
    /// Optional DefaultApplExtID (tag 1407).
    pub default_appl_ext_id: Option<String>,
    /// Optional target sub ID (tag 57).
    pub target_sub_id: Option<String>,
    /// Optional sender location ID (tag 142).
    pub sender_location_id: Option<String>,
    /// Any other engine setting.
    pub extra: BTreeMap<String, String>,
}

impl SessionConfig {
    /// Creates a new session configuration with required fields.
    ///
    /// # Arguments
    /// * `begin_string` - The FIX version string
    /// * `sender_comp_id` - The sender CompID
    /// * `target_comp_id` - The target CompID
    #[must_use]
    pub fn new(
        begin_string: impl Into<String>,
        sender_comp_id: impl Into<String>,
        target_comp_id: impl Into<String>,
    ) -> Self {
        Self {
            begin_string: begin_string.into(),
            sender_comp_id: sender_comp_id.into(),
            target_comp_id: target_comp_id.into(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            logon_timeout: DEFAULT_LOGON_TIMEOUT,
            logout_timeout: DEFAULT_LOGOUT_TIMEOUT,
            default_appl_ext_id: None,
            target_sub_id: None,
            sender_location_id: None,
            extra: BTreeMap::new(),
        }
    }

    /// Sets the reconnect interval.
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Sets the logon timeout.
    #[must_use]
    pub fn with_logon_timeout(mut self, timeout: Duration) -> Self {
        self.logon_timeout = timeout;
        self
    }

    /// Sets the logout timeout.
    #[must_use]
    pub fn with_logout_timeout(mut self, timeout: Duration) -> Self {
        self.logout_timeout = timeout;
        self
    }

    /// Sets the DefaultApplExtID.
    #[must_use]
    pub fn with_default_appl_ext_id(mut self, id: impl Into<String>) -> Self {
        self.default_appl_ext_id = Some(id.into());
        self
    }

    /// Sets the target sub ID.
    #[must_use]
    pub fn with_target_sub_id(mut self, sub_id: impl Into<String>) -> Self {
        self.target_sub_id = Some(sub_id.into());
        self
    }

    /// Sets the sender location ID.
    #[must_use]
    pub fn with_sender_location_id(mut self, location: impl Into<String>) -> Self {
        self.sender_location_id = Some(location.into());
        self
    }

    /// Returns the session identifier these settings describe.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        SessionId::new(
            self.begin_string.clone(),
            self.sender_comp_id.clone(),
            self.target_comp_id.clone(),
        )
    }

    /// Returns the setting stored under `key` as text.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            keys::BEGIN_STRING => Some(self.begin_string.clone()),
            keys::SENDER_COMP_ID => Some(self.sender_comp_id.clone()),
            keys::TARGET_COMP_ID => Some(self.target_comp_id.clone()),
            keys::RECONNECT_INTERVAL => Some(self.reconnect_interval.as_secs().to_string()),
            keys::LOGON_TIMEOUT => Some(self.logon_timeout.as_secs().to_string()),
            keys::LOGOUT_TIMEOUT => Some(self.logout_timeout.as_secs().to_string()),
            keys::DEFAULT_APPL_EXT_ID => self.default_appl_ext_id.clone(),
            keys::TARGET_SUB_ID => self.target_sub_id.clone(),
            keys::SENDER_LOCATION_ID => self.sender_location_id.clone(),
            other => self.extra.get(other).cloned(),
        }
    }

    /// Stores `value` under `key`.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` if a duration setting is not a
    /// whole number of seconds.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        let secs = || {
            value
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| SessionError::Configuration(format!("{key} must be whole seconds, got '{value}'")))
        };
        match key {
            keys::BEGIN_STRING => self.begin_string = value.to_string(),
            keys::SENDER_COMP_ID => self.sender_comp_id = value.to_string(),
            keys::TARGET_COMP_ID => self.target_comp_id = value.to_string(),
            keys::RECONNECT_INTERVAL => self.reconnect_interval = secs()?,
            keys::LOGON_TIMEOUT => self.logon_timeout = secs()?,
            keys::LOGOUT_TIMEOUT => self.logout_timeout = secs()?,
            keys::DEFAULT_APPL_EXT_ID => self.default_appl_ext_id = Some(value.to_string()),
            keys::TARGET_SUB_ID => self.target_sub_id = Some(value.to_string()),
            keys::SENDER_LOCATION_ID => self.sender_location_id = Some(value.to_string()),
            other => {
                self.extra.insert(other.to_string(), value.to_string());
            }
        }
        Ok(())
    }
}

/// Credentials injected into outbound Logon messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Username (tag 553).
    pub username: Option<String>,
    /// Password (tag 554).
    pub password: Option<String>,
    /// NewPassword (tag 925).
    pub new_password: Option<String>,
}

impl Credentials {
    /// Sets the username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the new password.
    #[must_use]
    pub fn with_new_password(mut self, password: impl Into<String>) -> Self {
        self.new_password = Some(password.into());
        self
    }

    /// Returns true if a username or password is set.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
            || self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}
