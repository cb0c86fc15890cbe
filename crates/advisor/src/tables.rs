//! Static recommendation tables.
//!
//! Expected-value scores per follow-up window and historical response rates
//! per message style, both keyed by company type. Recommendations are plain
//! argmax lookups over these tables.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Company size bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyType {
    Startup,
    #[default]
    Midsize,
    Enterprise,
}

impl CompanyType {
    /// Parse a company type, falling back to midsize for anything unknown.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "startup" => CompanyType::Startup,
            "enterprise" => CompanyType::Enterprise,
            "midsize" => CompanyType::Midsize,
            other => {
                tracing::debug!("Unknown company type {:?}, using midsize", other);
                CompanyType::Midsize
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyType::Startup => "startup",
            CompanyType::Midsize => "midsize",
            CompanyType::Enterprise => "enterprise",
        }
    }

    fn row(&self) -> usize {
        match self {
            CompanyType::Startup => 0,
            CompanyType::Midsize => 1,
            CompanyType::Enterprise => 2,
        }
    }
}

impl fmt::Display for CompanyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CompanyType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(CompanyType::parse(&raw))
    }
}

/// Follow-up wait window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitWindow {
    #[serde(rename = "1-3 days")]
    Days1To3,
    #[serde(rename = "3-5 days")]
    Days3To5,
    #[serde(rename = "5-7 days")]
    Days5To7,
    #[serde(rename = "7-10 days")]
    Days7To10,
}

impl WaitWindow {
    pub const ALL: [WaitWindow; 4] = [
        WaitWindow::Days1To3,
        WaitWindow::Days3To5,
        WaitWindow::Days5To7,
        WaitWindow::Days7To10,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WaitWindow::Days1To3 => "1-3 days",
            WaitWindow::Days3To5 => "3-5 days",
            WaitWindow::Days5To7 => "5-7 days",
            WaitWindow::Days7To10 => "7-10 days",
        }
    }

    /// First day of the window.
    pub fn lower_bound(&self) -> u32 {
        match self {
            WaitWindow::Days1To3 => 1,
            WaitWindow::Days3To5 => 3,
            WaitWindow::Days5To7 => 5,
            WaitWindow::Days7To10 => 7,
        }
    }
}

impl fmt::Display for WaitWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Follow-up message tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStyle {
    Formal,
    Casual,
    ConnectionFocused,
}

impl MessageStyle {
    pub const ALL: [MessageStyle; 3] = [
        MessageStyle::Formal,
        MessageStyle::Casual,
        MessageStyle::ConnectionFocused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStyle::Formal => "formal",
            MessageStyle::Casual => "casual",
            MessageStyle::ConnectionFocused => "connection_focused",
        }
    }
}

impl fmt::Display for MessageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Rows: startup, midsize, enterprise. Columns follow `WaitWindow::ALL`.
const TIMING_SCORES: [[f64; 4]; 3] = [
    [10.83, 8.42, 6.15, 3.91],
    [7.25, 9.18, 8.67, 6.42],
    [3.12, 5.67, 7.89, 4.06],
];

// Rows follow `MessageStyle::ALL`. Columns: startup, midsize, enterprise.
const STYLE_RATES: [[f64; 3]; 3] = [
    [0.283, 0.358, 0.417],
    [0.733, 0.408, 0.267],
    [0.700, 0.625, 0.550],
];

const FLAT_TABLE_CONFIDENCE: f64 = 85.0;

/// Expected-value score of following up in `window` at a `company` type.
pub fn timing_score(company: CompanyType, window: WaitWindow) -> f64 {
    let column = WaitWindow::ALL
        .iter()
        .position(|w| *w == window)
        .unwrap_or_default();
    TIMING_SCORES[company.row()][column]
}

/// Historical response rate of `style` at a `company` type, in `0..=1`.
pub fn success_rate(style: MessageStyle, company: CompanyType) -> f64 {
    let row = MessageStyle::ALL
        .iter()
        .position(|s| *s == style)
        .unwrap_or_default();
    STYLE_RATES[row][company.row()]
}

/// Recommended follow-up window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingRecommendation {
    pub company_type: CompanyType,
    pub wait_time: WaitWindow,
    pub q_value: f64,
    /// Percentage, 0-100
    pub confidence: f64,
}

impl TimingRecommendation {
    /// True once `days_since_application` reaches the window's first day.
    pub fn should_act_now(&self, days_since_application: u32) -> bool {
        days_since_application >= self.wait_time.lower_bound()
    }
}

/// Recommended message style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StyleRecommendation {
    pub style: MessageStyle,
    pub success_rate: f64,
    /// Percentage, 0-100
    pub confidence: f64,
}

/// Best follow-up window for `company`.
///
/// Confidence is the winning score's position between the row minimum and
/// maximum. A startup reached through a connection is always pinned to the
/// earliest window.
pub fn recommend_timing(company: CompanyType, has_connection: bool) -> TimingRecommendation {
    let row = &TIMING_SCORES[company.row()];

    let mut best = 0;
    for (i, score) in row.iter().enumerate() {
        if *score > row[best] {
            best = i;
        }
    }

    let max = row.iter().copied().fold(f64::MIN, f64::max);
    let min = row.iter().copied().fold(f64::MAX, f64::min);
    let q_value = row[best];
    let mut confidence = if max > min {
        (q_value - min) / (max - min) * 100.0
    } else {
        FLAT_TABLE_CONFIDENCE
    };
    let mut wait_time = WaitWindow::ALL[best];

    if has_connection && company == CompanyType::Startup {
        wait_time = WaitWindow::Days1To3;
        confidence = (confidence + 10.0).min(95.0);
    }

    TimingRecommendation {
        company_type: company,
        wait_time,
        q_value,
        confidence,
    }
}

/// Best message style for `company`; connection-focused whenever there is a
/// connection.
pub fn recommend_style(company: CompanyType, has_connection: bool) -> StyleRecommendation {
    let style = if has_connection {
        MessageStyle::ConnectionFocused
    } else {
        let mut best = MessageStyle::ALL[0];
        for style in MessageStyle::ALL {
            if success_rate(style, company) > success_rate(best, company) {
                best = style;
            }
        }
        best
    };

    let rate = success_rate(style, company);
    StyleRecommendation {
        style,
        success_rate: rate,
        confidence: rate * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_type_parse_falls_back_to_midsize() {
        assert_eq!(CompanyType::parse("Startup"), CompanyType::Startup);
        assert_eq!(CompanyType::parse(" enterprise "), CompanyType::Enterprise);
        assert_eq!(CompanyType::parse("agency"), CompanyType::Midsize);
        assert_eq!(CompanyType::parse(""), CompanyType::Midsize);

        let parsed: CompanyType = serde_json::from_str("\"nonprofit\"").unwrap();
        assert_eq!(parsed, CompanyType::Midsize);
    }

    #[test]
    fn test_timing_argmax_per_company() {
        let enterprise = recommend_timing(CompanyType::Enterprise, false);
        assert_eq!(enterprise.wait_time, WaitWindow::Days5To7);
        assert_eq!(enterprise.q_value, 7.89);
        assert!((enterprise.confidence - 100.0).abs() < 1e-9);

        let midsize = recommend_timing(CompanyType::Midsize, false);
        assert_eq!(midsize.wait_time, WaitWindow::Days3To5);
        assert_eq!(midsize.q_value, 9.18);
    }

    #[test]
    fn test_startup_with_connection_is_pinned() {
        let rec = recommend_timing(CompanyType::Startup, true);
        assert_eq!(rec.wait_time, WaitWindow::Days1To3);
        assert_eq!(rec.q_value, 10.83);
        assert!((rec.confidence - 95.0).abs() < 1e-9);
    }

    #[test]
    fn test_should_act_now() {
        let rec = recommend_timing(CompanyType::Enterprise, false);
        assert!(!rec.should_act_now(4));
        assert!(rec.should_act_now(5));
        assert!(rec.should_act_now(12));
    }

    #[test]
    fn test_style_recommendation() {
        let startup = recommend_style(CompanyType::Startup, false);
        assert_eq!(startup.style, MessageStyle::Casual);
        assert_eq!(startup.success_rate, 0.733);
        assert!((startup.confidence - 73.3).abs() < 1e-9);

        let enterprise = recommend_style(CompanyType::Enterprise, false);
        assert_eq!(enterprise.style, MessageStyle::ConnectionFocused);

        let connected = recommend_style(CompanyType::Enterprise, true);
        assert_eq!(connected.style, MessageStyle::ConnectionFocused);
        assert_eq!(connected.success_rate, 0.550);
    }

    #[test]
    fn test_lookup_helpers() {
        assert_eq!(timing_score(CompanyType::Startup, WaitWindow::Days7To10), 3.91);
        assert_eq!(success_rate(MessageStyle::Formal, CompanyType::Midsize), 0.358);
    }

    #[test]
    fn test_serialized_labels() {
        assert_eq!(
            serde_json::to_string(&WaitWindow::Days3To5).unwrap(),
            "\"3-5 days\""
        );
        assert_eq!(
            serde_json::to_string(&MessageStyle::ConnectionFocused).unwrap(),
            "\"connection_focused\""
        );
        assert_eq!(
            serde_json::to_string(&CompanyType::Startup).unwrap(),
            "\"startup\""
        );
    }
}
