use crate::error::Result;
use crate::trend::AlertThresholds;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ScoringConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Score reported for a pulse with no responses.
    #[serde(default = "default_score")]
    pub default_score: u32,
}

fn default_score() -> u32 {
    75
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            default_score: default_score(),
        }
    }
}

// ---------------------------------------------------------------------------
// AlertsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_warning_drop")]
    pub warning_drop: u32,
    #[serde(default = "default_emergency_below")]
    pub emergency_below: u32,
}

fn default_warning_drop() -> u32 {
    crate::trend::DEFAULT_WARNING_DROP
}

fn default_emergency_below() -> u32 {
    crate::trend::DEFAULT_EMERGENCY_BELOW
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            warning_drop: default_warning_drop(),
            emergency_below: default_emergency_below(),
        }
    }
}

impl AlertsConfig {
    pub fn thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            warning_drop: self.warning_drop,
            emergency_below: self.emergency_below,
        }
    }
}

// ---------------------------------------------------------------------------
// FeedbackConfig / DashboardConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Completed pulses read when building a generation prompt.
    #[serde(default = "default_pulse_window")]
    pub pulse_window: usize,
    /// Feedback strings passed to generation.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Entries in the dashboard feed.
    #[serde(default = "default_recent_items")]
    pub recent_items: usize,
}

fn default_pulse_window() -> usize {
    4
}

fn default_max_items() -> usize {
    10
}

fn default_recent_items() -> usize {
    5
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            pulse_window: default_pulse_window(),
            max_items: default_max_items(),
            recent_items: default_recent_items(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_history_weeks")]
    pub history_weeks: usize,
    #[serde(default = "default_open_actions")]
    pub open_actions: usize,
}

fn default_history_weeks() -> usize {
    8
}

fn default_open_actions() -> usize {
    5
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            history_weeks: default_history_weeks(),
            open_actions: default_open_actions(),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Header the authenticating proxy sets to the member id.
    #[serde(default = "default_identity_header")]
    pub identity_header: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_port() -> u16 {
    3141
}

fn default_identity_header() -> String {
    "x-pulse-member".to_string()
}

fn default_db_path() -> String {
    "pulse.db".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            identity_header: default_identity_header(),
            db_path: default_db_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// GenerationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_action_max_tokens")]
    pub action_max_tokens: u32,
    #[serde(default = "default_mediation_max_tokens")]
    pub mediation_max_tokens: u32,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_action_max_tokens() -> u32 {
    1000
}

fn default_mediation_max_tokens() -> u32 {
    3000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            action_max_tokens: default_action_max_tokens(),
            mediation_max_tokens: default_mediation_max_tokens(),
        }
    }
}

// ---------------------------------------------------------------------------
// BillingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingProvider {
    #[default]
    Mock,
    Stripe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    #[serde(default)]
    pub provider: BillingProvider,
    #[serde(default = "default_billing_api_base")]
    pub api_base: String,
    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: String,
    /// Where the hosted portal sends the member back to.
    #[serde(default = "default_return_url")]
    pub return_url: String,
}

fn default_billing_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_secret_key_env() -> String {
    "STRIPE_SECRET_KEY".to_string()
}

fn default_return_url() -> String {
    "http://localhost:3000/dashboard/settings".to_string()
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            provider: BillingProvider::default(),
            api_base: default_billing_api_base(),
            secret_key_env: default_secret_key_env(),
            return_url: default_return_url(),
        }
    }
}

impl BillingConfig {
    pub fn secret_key(&self) -> Option<String> {
        std::env::var(&self.secret_key_env).ok().filter(|k| !k.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub billing: BillingConfig,
}

impl Config {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut warn = |level: WarnLevel, message: String| {
            warnings.push(ConfigWarning { level, message });
        };

        if !(10..=100).contains(&self.scoring.default_score) {
            warn(
                WarnLevel::Warning,
                format!(
                    "scoring.default_score {} is outside the reachable range 10-100",
                    self.scoring.default_score
                ),
            );
        }

        if self.alerts.emergency_below > 100 {
            warn(
                WarnLevel::Error,
                format!(
                    "alerts.emergency_below {} exceeds 100; every score would be an emergency",
                    self.alerts.emergency_below
                ),
            );
        }

        if self.alerts.warning_drop == 0 {
            warn(
                WarnLevel::Warning,
                "alerts.warning_drop is 0; any stable week will raise a warning".to_string(),
            );
        }

        for (name, value) in [
            ("feedback.pulse_window", self.feedback.pulse_window),
            ("feedback.max_items", self.feedback.max_items),
            ("dashboard.history_weeks", self.dashboard.history_weeks),
        ] {
            if value == 0 {
                warn(WarnLevel::Warning, format!("{name} is 0; the window is empty"));
            }
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            warn(
                WarnLevel::Error,
                format!(
                    "generation.temperature {} is outside 0.0-2.0",
                    self.generation.temperature
                ),
            );
        }

        if self.server.identity_header.trim().is_empty() {
            warn(
                WarnLevel::Error,
                "server.identity_header must not be empty".to_string(),
            );
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
