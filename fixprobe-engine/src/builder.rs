/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Probe builder for fluent configuration.
//!
//! This module provides [`ProbeConfig`], readable from `FIXPROBE_*`
//! environment variables, and the [`ProbeBuilder`] that wires a [`Probe`]
//! to a session engine.

use crate::application::ProbeApplication;
use crate::fuzz::FuzzOptions;
use crate::probe::Probe;
use fixprobe_core::error::SessionError;
use fixprobe_core::types::SeqNum;
use fixprobe_session::{Credentials, SessionEngine};
use fixprobe_tagvalue::DEFAULT_PRINTABLE_DELIMITER;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable names read by [`ProbeConfig::from_env`].
pub mod env {
    /// Printable delimiter, a single character.
    pub const DELIMITER: &str = "FIXPROBE_DELIMITER";
    /// `true`/`false`: keep plain heartbeats in history.
    pub const LOG_HEARTBEAT: &str = "FIXPROBE_LOG_HEARTBEAT";
    /// History log directory; empty disables file logging.
    pub const LOG_DIR: &str = "FIXPROBE_LOG_DIR";
    /// Fuzz output directory.
    pub const OUTPUT_DIR: &str = "FIXPROBE_OUTPUT_DIR";
    /// Milliseconds between fuzz payloads.
    pub const FUZZ_DELAY_MS: &str = "FIXPROBE_FUZZ_DELAY_MS";
    /// Milliseconds to wait for a reply after a send.
    pub const RESPONSE_DELAY_MS: &str = "FIXPROBE_RESPONSE_DELAY_MS";
    /// Logon username.
    pub const USERNAME: &str = "FIXPROBE_USERNAME";
    /// Logon password.
    pub const PASSWORD: &str = "FIXPROBE_PASSWORD";
    /// Logon new password.
    pub const NEW_PASSWORD: &str = "FIXPROBE_NEW_PASSWORD";
    /// Initial sender sequence override.
    pub const SEQ_SEED: &str = "FIXPROBE_SEQ_SEED";
    /// Initial next-expected sequence override.
    pub const EXPECTED_SEQ_SEED: &str = "FIXPROBE_EXPECTED_SEQ_SEED";
}

/// Tool-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Delimiter shown in place of SOH.
    pub printable_delimiter: char,
    /// Keep plain heartbeats in history.
    pub log_heartbeat: bool,
    /// History log directory; `None` keeps history in memory only.
    pub log_dir: Option<PathBuf>,
    /// Fuzz pacing and output directory.
    pub fuzz: FuzzOptions,
    /// Pause after an operator send so replies reach the history.
    pub response_delay: Duration,
    /// Credentials for outbound Logon.
    pub credentials: Credentials,
    /// Initial sender sequence override for new sessions.
    pub sender_seed: Option<SeqNum>,
    /// Initial next-expected sequence override for new sessions.
    pub expected_seed: Option<SeqNum>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            printable_delimiter: DEFAULT_PRINTABLE_DELIMITER,
            log_heartbeat: false,
            log_dir: Some(PathBuf::from("./logs/")),
            fuzz: FuzzOptions::default(),
            response_delay: Duration::from_millis(100),
            credentials: Credentials::default(),
            sender_seed: None,
            expected_seed: None,
        }
    }
}

impl ProbeConfig {
    /// Reads the configuration from `FIXPROBE_*` environment variables,
    /// using defaults for anything unset.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` for a malformed value.
    pub fn from_env() -> Result<Self, SessionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` for a malformed value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SessionError> {
        let invalid = |key: &str, value: &str| {
            SessionError::Configuration(format!("invalid value for {key}: '{value}'"))
        };
        let number = |key: &str| -> Result<Option<u64>, SessionError> {
            lookup(key)
                .map(|value| value.trim().parse::<u64>().map_err(|_| invalid(key, &value)))
                .transpose()
        };

        let mut config = Self::default();
        if let Some(value) = lookup(env::DELIMITER) {
            let mut chars = value.chars();
            config.printable_delimiter = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => return Err(invalid(env::DELIMITER, &value)),
            };
        }
        if let Some(value) = lookup(env::LOG_HEARTBEAT) {
            config.log_heartbeat = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(invalid(env::LOG_HEARTBEAT, &value)),
            };
        }
        if let Some(value) = lookup(env::LOG_DIR) {
            config.log_dir = (!value.is_empty()).then(|| PathBuf::from(value));
        }
        if let Some(value) = lookup(env::OUTPUT_DIR) {
            config.fuzz.output_dir = PathBuf::from(value);
        }
        if let Some(ms) = number(env::FUZZ_DELAY_MS)? {
            config.fuzz.payload_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = number(env::RESPONSE_DELAY_MS)? {
            config.response_delay = Duration::from_millis(ms);
        }
        config.credentials = Credentials {
            username: lookup(env::USERNAME),
            password: lookup(env::PASSWORD),
            new_password: lookup(env::NEW_PASSWORD),
        };
        config.sender_seed = number(env::SEQ_SEED)?.map(SeqNum::new);
        config.expected_seed = number(env::EXPECTED_SEQ_SEED)?.map(SeqNum::new);
        Ok(config)
    }
}

/// Builder for configuring a [`Probe`].
#[derive(Debug, Default)]
pub struct ProbeBuilder {
    config: ProbeConfig,
}

impl ProbeBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    #[must_use]
    pub fn from_config(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Sets the printable delimiter.
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: char) -> Self {
        self.config.printable_delimiter = delimiter;
        self
    }

    /// Enables heartbeat history.
    #[must_use]
    pub const fn with_log_heartbeat(mut self, enabled: bool) -> Self {
        self.config.log_heartbeat = enabled;
        self
    }

    /// Sets the history log directory.
    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = Some(dir.into());
        self
    }

    /// Keeps history in memory only.
    #[must_use]
    pub fn without_log_files(mut self) -> Self {
        self.config.log_dir = None;
        self
    }

    /// Sets the fuzz output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.fuzz.output_dir = dir.into();
        self
    }

    /// Sets the pause between fuzz payloads.
    #[must_use]
    pub fn with_fuzz_delay(mut self, delay: Duration) -> Self {
        self.config.fuzz.payload_delay = delay;
        self
    }

    /// Sets the fuzz reply polling.
    #[must_use]
    pub fn with_fuzz_polling(mut self, interval: Duration, attempts: u32) -> Self {
        self.config.fuzz.poll_interval = interval;
        self.config.fuzz.poll_attempts = attempts;
        self
    }

    /// Sets the pause after operator sends.
    #[must_use]
    pub fn with_response_delay(mut self, delay: Duration) -> Self {
        self.config.response_delay = delay;
        self
    }

    /// Sets the logon credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = credentials;
        self
    }

    /// Sets the initial sequence overrides.
    #[must_use]
    pub const fn with_seeds(mut self, sender: Option<SeqNum>, expected: Option<SeqNum>) -> Self {
        self.config.sender_seed = sender;
        self.config.expected_seed = expected;
        self
    }

    /// Returns the configuration built so far.
    #[must_use]
    pub const fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Builds the probe.
    ///
    /// `connect` receives the hooks the engine must call and returns the
    /// engine driving the sessions.
    pub fn build<E, F>(self, connect: F) -> Probe
    where
        E: SessionEngine + 'static,
        F: FnOnce(Arc<ProbeApplication>) -> Arc<E>,
    {
        Probe::new(self.config, |application| {
            let engine: Arc<dyn SessionEngine> = connect(application);
            engine
        })
    }
}
