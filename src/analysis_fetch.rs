use anyhow::{Context, Result, anyhow};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ApiConfig;
use crate::http_client::http_client;

pub const MSG_MISSING_PLAYER: &str = "Please enter a player name";
pub const MSG_INVALID_LINE: &str = "Please enter a valid line";
pub const MSG_RATE_LIMITED: &str = "Rate limit reached. Please try again later.";
pub const MSG_ANALYSIS_FAILED: &str = "Analysis failed";
pub const MSG_UNREACHABLE: &str = "Unable to connect to server. Please try again.";
pub const MSG_BAD_RESPONSE: &str = "Failed to analyze. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatType {
    Points,
    Assists,
    Rebounds,
    PointsAssists,
    PointsReboundsAssists,
}

impl StatType {
    pub const ALL: [StatType; 5] = [
        StatType::Points,
        StatType::Assists,
        StatType::Rebounds,
        StatType::PointsAssists,
        StatType::PointsReboundsAssists,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            StatType::Points => "points",
            StatType::Assists => "assists",
            StatType::Rebounds => "rebounds",
            StatType::PointsAssists => "points_assists",
            StatType::PointsReboundsAssists => "points_rebounds_assists",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatType::Points => "PTS",
            StatType::Assists => "AST",
            StatType::Rebounds => "REB",
            StatType::PointsAssists => "PTS+AST",
            StatType::PointsReboundsAssists => "PRA",
        }
    }

    pub fn from_wire(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|s| s.wire_name() == key)
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetType {
    Over,
    Under,
}

impl BetType {
    pub fn wire_name(self) -> &'static str {
        match self {
            BetType::Over => "over",
            BetType::Under => "under",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BetType::Over => "OVER",
            BetType::Under => "UNDER",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            BetType::Over => BetType::Under,
            BetType::Under => BetType::Over,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub player: String,
    pub stat_type: StatType,
    pub line: f64,
    pub bet_type: BetType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub remaining: i64,
    pub total_limit: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub player: String,
    pub stat_type: String,
    pub line: f64,
    pub bet_type: String,
    pub season_avg: f64,
    #[serde(default)]
    pub season_std: Option<f64>,
    pub recent_avg: f64,
    #[serde(default)]
    pub adjusted_avg: Option<f64>,
    pub probability: f64,
    pub edge: f64,
    pub recommendation: String,
    #[serde(default)]
    pub confidence_80: Option<(f64, f64)>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recommendation {
    Hit,
    Miss,
    Other(String),
}

impl AnalysisResult {
    pub fn recommendation_kind(&self) -> Recommendation {
        match self.recommendation.trim().to_ascii_uppercase().as_str() {
            "HIT" => Recommendation::Hit,
            "MISS" => Recommendation::Miss,
            _ => Recommendation::Other(self.recommendation.clone()),
        }
    }

    /// `(mean, std_dev, line)` for the distribution chart, or `None` when the
    /// response carries no std dev. The adjusted average wins over the season
    /// average when present.
    pub fn distribution_params(&self) -> Option<(f64, f64, f64)> {
        let std_dev = self.season_std?;
        let mean = self
            .adjusted_avg
            .filter(|v| v.is_finite())
            .unwrap_or(self.season_avg);
        Some((mean, std_dev, self.line))
    }

    pub fn probability_pct(&self) -> f64 {
        self.probability * 100.0
    }
}

/// Validate raw form input into a request.
pub fn validate_form(
    player: &str,
    line_text: &str,
    stat_type: StatType,
    bet_type: BetType,
) -> Result<AnalyzeRequest> {
    let player = player.trim();
    if player.is_empty() {
        return Err(anyhow!(MSG_MISSING_PLAYER));
    }
    let line = line_text
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
        .ok_or_else(|| anyhow!(MSG_INVALID_LINE))?;
    Ok(AnalyzeRequest {
        player: player.to_string(),
        stat_type,
        line,
        bet_type,
    })
}

pub fn parse_analysis_json(raw: &str) -> Result<AnalysisResult> {
    serde_json::from_str::<AnalysisResult>(raw).context("invalid analysis json")
}

/// Map an HTTP status and body to a result or a user-facing error.
pub fn interpret_response(status: u16, body: &str) -> Result<AnalysisResult> {
    if status == 429 {
        let msg = error_detail(body)
            .and_then(|d| detail_field(&d, "message"))
            .unwrap_or_else(|| MSG_RATE_LIMITED.to_string());
        return Err(anyhow!(msg));
    }
    if !(200..300).contains(&status) {
        let msg = error_detail(body)
            .and_then(|d| detail_field(&d, "error").or_else(|| detail_text(&d)))
            .unwrap_or_else(|| MSG_ANALYSIS_FAILED.to_string());
        return Err(anyhow!(msg));
    }
    parse_analysis_json(body)
}

pub fn fetch_analysis(config: &ApiConfig, req: &AnalyzeRequest) -> Result<AnalysisResult> {
    let client = http_client(config.timeout)?;
    let mut builder = client
        .post(config.analyze_url())
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json")
        .json(req);
    if let Some(token) = config.token.as_deref() {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }

    let resp = builder.send().map_err(|_| anyhow!(MSG_UNREACHABLE))?;
    let status = resp.status().as_u16();
    let body = resp.text().map_err(|_| anyhow!(MSG_UNREACHABLE))?;
    interpret_response(status, &body)
}

fn error_detail(body: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("detail").cloned()
}

fn detail_field(detail: &Value, key: &str) -> Option<String> {
    detail
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn detail_text(detail: &Value) -> Option<String> {
    match detail {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Null | Value::String(_) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_type_cycles_through_all() {
        let mut s = StatType::Points;
        for _ in 0..StatType::ALL.len() {
            s = s.next();
        }
        assert_eq!(s, StatType::Points);
        assert_eq!(StatType::Points.prev(), StatType::PointsReboundsAssists);
    }

    #[test]
    fn stat_type_from_wire_is_case_insensitive() {
        assert_eq!(StatType::from_wire(" PRA "), None);
        assert_eq!(
            StatType::from_wire("Points_Rebounds_Assists"),
            Some(StatType::PointsReboundsAssists)
        );
    }

    #[test]
    fn request_serializes_with_wire_names() {
        let req = AnalyzeRequest {
            player: "LeBron James".to_string(),
            stat_type: StatType::PointsAssists,
            line: 25.5,
            bet_type: BetType::Under,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["stat_type"], "points_assists");
        assert_eq!(json["bet_type"], "under");
        assert_eq!(json["line"], 25.5);
    }

    #[test]
    fn detail_object_without_error_falls_back_to_its_json() {
        let err = interpret_response(500, r#"{"detail":{"code":7}}"#).unwrap_err();
        assert_eq!(err.to_string(), r#"{"code":7}"#);
    }
}
