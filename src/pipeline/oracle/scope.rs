//! Research scopes: the topic relevancy is judged against, plus the
//! domain hints each analysis prompt carries.

use serde::Serialize;

/// Extra instructions appended to one analysis prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromptHints {
    pub methodology: Vec<String>,
    pub analysis: Vec<String>,
    pub dataset: Vec<String>,
    pub experimental_setup: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchScope {
    /// Short machine name (`time-series-forecasting`, `custom`, ...).
    pub name: String,
    /// Topic description placed in the relevancy question.
    pub topic: String,
    pub hints: PromptHints,
}

pub const DEFAULT_SCOPE: &str = "time-series-forecasting";

/// Names accepted by [`ResearchScope::from_name`].
pub const BUILTIN_SCOPES: &[&str] = &["time-series-forecasting", "power-system-protection"];

impl ResearchScope {
    pub fn time_series_forecasting() -> Self {
        Self {
            name: "time-series-forecasting".into(),
            topic: "Time Series Forecasting".into(),
            hints: PromptHints::default(),
        }
    }

    pub fn power_system_protection() -> Self {
        Self {
            name: "power-system-protection".into(),
            topic: "Power System Management - Machine Learning for fault detection, \
                    Islanding detection, fault classification, fault localisation"
                .into(),
            hints: PromptHints {
                methodology: vec![],
                analysis: vec![
                    "problem_statement: Provide a CONCISE \"Focus\" statement (e.g., \"Fault detection in transmission lines\", \"Islanding detection in PV-based microgrids\").".into(),
                    "main_findings: Summarize the key quantitative results (e.g., \"Achieved 99% accuracy with <2ms detection time\").".into(),
                ],
                dataset: vec![
                    "source_type: Specify if it is \"Real-world\", \"Simulated\", or \"Synthetic\". IF SIMULATED, name the platform (e.g., \"Simulink\", \"PowerFactory\", \"OpenDSS\").".into(),
                    "granularity_scale: describe the scope (e.g., \"IEEE 39-bus system\", \"Real 20kV network\").".into(),
                    "num_data_points: Look for total samples, scenarios, or event recordings (e.g., \"5000 fault cases\", \"181 COMTRADE events\").".into(),
                ],
                experimental_setup: vec![
                    "resolution: Look specifically for sampling frequency or time intervals (e.g., \"40 MHz\", \"2 kHz\", \"15 minutes\"). If not found, explicitly state \"unspecified\".".into(),
                    "features_used: explicitly mention the signal domain if listed (e.g., \"phasor domain V/I\", \"waveform current\", \"RMS images\").".into(),
                    "metrics: List ALL quantitative results mentioned in the abstract or conclusion (accuracy %, detection time in ms, MAPE).".into(),
                ],
            },
        }
    }

    /// A free-form topic with no domain-specific hints.
    pub fn custom(topic: &str) -> Self {
        Self {
            name: "custom".into(),
            topic: topic.trim().to_string(),
            hints: PromptHints::default(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "time-series-forecasting" => Some(Self::time_series_forecasting()),
            "power-system-protection" => Some(Self::power_system_protection()),
            _ => None,
        }
    }
}

impl Default for ResearchScope {
    fn default() -> Self {
        Self::time_series_forecasting()
    }
}
