use std::collections::VecDeque;

use chrono::{DateTime, Local};

use crate::analysis_fetch::{AnalysisResult, AnalyzeRequest, BetType, StatType, validate_form};
use crate::distribution::{CurveMemo, DistributionCurve, Viewport};

const MAX_LOGS: usize = 200;
const MAX_PLAYER_LEN: usize = 64;
const MAX_LINE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Player,
    Stat,
    Line,
    Direction,
    History,
}

impl FormField {
    const ORDER: [FormField; 5] = [
        FormField::Player,
        FormField::Stat,
        FormField::Line,
        FormField::Direction,
        FormField::History,
    ];

    pub fn is_text(self) -> bool {
        matches!(self, FormField::Player | FormField::Line)
    }
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub request: AnalyzeRequest,
    pub probability: f64,
    pub recommendation: String,
    pub analyzed_at: DateTime<Local>,
    pub cached: bool,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub player: String,
    pub stat_type: StatType,
    pub line: String,
    pub bet_type: BetType,
    pub focus: FormField,
    pub loading: bool,
    pub error: Option<String>,
    pub pending: Option<AnalyzeRequest>,
    pub result: Option<AnalysisResult>,
    pub result_cached: bool,
    pub curve: Option<DistributionCurve>,
    pub curve_memo: CurveMemo,
    pub viewport: Viewport,
    pub history: VecDeque<HistoryEntry>,
    pub history_selected: usize,
    pub history_limit: usize,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_settings(Viewport::default(), 20)
    }

    pub fn with_settings(viewport: Viewport, history_limit: usize) -> Self {
        Self {
            player: String::new(),
            stat_type: StatType::Points,
            line: String::new(),
            bet_type: BetType::Over,
            focus: FormField::Player,
            loading: false,
            error: None,
            pending: None,
            result: None,
            result_cached: false,
            curve: None,
            curve_memo: CurveMemo::new(),
            viewport,
            history: VecDeque::with_capacity(history_limit),
            history_selected: 0,
            history_limit: history_limit.max(1),
            logs: VecDeque::with_capacity(MAX_LOGS),
            help_overlay: false,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn focus_next(&mut self) {
        let idx = self.focus_index();
        self.focus = FormField::ORDER[(idx + 1) % FormField::ORDER.len()];
    }

    pub fn focus_prev(&mut self) {
        let idx = self.focus_index();
        let len = FormField::ORDER.len();
        self.focus = FormField::ORDER[(idx + len - 1) % len];
    }

    fn focus_index(&self) -> usize {
        FormField::ORDER
            .iter()
            .position(|f| *f == self.focus)
            .unwrap_or(0)
    }

    /// Type into the focused text field. Ignored while a request is in flight.
    pub fn input_char(&mut self, c: char) {
        if self.loading {
            return;
        }
        match self.focus {
            FormField::Player => {
                if !c.is_control() && self.player.chars().count() < MAX_PLAYER_LEN {
                    self.player.push(c);
                }
            }
            FormField::Line => {
                let accept = c.is_ascii_digit() || (c == '.' && !self.line.contains('.'));
                if accept && self.line.len() < MAX_LINE_LEN {
                    self.line.push(c);
                }
            }
            _ => {}
        }
    }

    pub fn backspace(&mut self) {
        if self.loading {
            return;
        }
        match self.focus {
            FormField::Player => {
                self.player.pop();
            }
            FormField::Line => {
                self.line.pop();
            }
            _ => {}
        }
    }

    pub fn cycle_stat(&mut self, forward: bool) {
        if self.loading {
            return;
        }
        self.stat_type = if forward {
            self.stat_type.next()
        } else {
            self.stat_type.prev()
        };
    }

    pub fn toggle_bet(&mut self) {
        if !self.loading {
            self.bet_type = self.bet_type.toggled();
        }
    }

    pub fn set_bet(&mut self, bet: BetType) {
        if !self.loading {
            self.bet_type = bet;
        }
    }

    /// Mirrors the analyze button: disabled while loading or with empty fields.
    pub fn can_submit(&self) -> bool {
        !self.loading && !self.player.trim().is_empty() && !self.line.is_empty()
    }

    /// Validate the form. On failure the message lands in `error`.
    pub fn submit(&mut self) -> Option<AnalyzeRequest> {
        if self.loading {
            return None;
        }
        match validate_form(&self.player, &self.line, self.stat_type, self.bet_type) {
            Ok(req) => {
                self.error = None;
                Some(req)
            }
            Err(err) => {
                self.error = Some(err.to_string());
                None
            }
        }
    }

    /// Drop the current result and its curve.
    pub fn clear_result(&mut self) {
        self.result = None;
        self.result_cached = false;
        self.curve = None;
        self.error = None;
    }

    pub fn select_history_next(&mut self) {
        if self.history.is_empty() {
            self.history_selected = 0;
            return;
        }
        self.history_selected = (self.history_selected + 1).min(self.history.len() - 1);
    }

    pub fn select_history_prev(&mut self) {
        self.history_selected = self.history_selected.saturating_sub(1);
    }

    /// Refill the form from a history entry (newest first).
    pub fn recall_history(&mut self, idx: usize) -> bool {
        if self.loading {
            return false;
        }
        let Some(entry) = self.history.get(idx) else {
            return false;
        };
        let req = entry.request.clone();
        self.player = req.player;
        self.stat_type = req.stat_type;
        self.line = format_line(req.line);
        self.bet_type = req.bet_type;
        self.focus = FormField::Line;
        true
    }

    fn record_history(&mut self, request: AnalyzeRequest, result: &AnalysisResult, cached: bool) {
        self.history.retain(|h| h.request != request);
        self.history.push_front(HistoryEntry {
            request,
            probability: result.probability,
            recommendation: result.recommendation.clone(),
            analyzed_at: Local::now(),
            cached,
        });
        self.history.truncate(self.history_limit);
        self.history_selected = 0;
    }

    fn rebuild_curve(&mut self) {
        let Some(result) = self.result.as_ref() else {
            self.curve = None;
            return;
        };
        let Some((mean, std_dev, line)) = result.distribution_params() else {
            self.curve = None;
            self.push_log("[INFO] Distribution unavailable: response has no std dev");
            return;
        };
        self.curve = self
            .curve_memo
            .get(mean, std_dev, line, self.viewport)
            .cloned();
        if self.curve.is_none() {
            let reason = self
                .curve_memo
                .last_error()
                .unwrap_or("unknown")
                .to_string();
            self.push_log(format!("[INFO] Distribution unavailable: {reason}"));
        }
    }
}

/// Format a line value back into form text (`25.5`, `30`). Shortest text
/// that parses back to the same value.
pub fn format_line(line: f64) -> String {
    format!("{line}")
}

#[derive(Debug, Clone)]
pub enum Delta {
    AnalysisStarted(AnalyzeRequest),
    AnalysisFinished {
        request: AnalyzeRequest,
        result: AnalysisResult,
        cached: bool,
    },
    AnalysisFailed {
        request: AnalyzeRequest,
        message: String,
    },
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    Analyze(AnalyzeRequest),
    ClearCache,
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::AnalysisStarted(req) => {
            state.loading = true;
            state.error = None;
            state.result = None;
            state.result_cached = false;
            state.curve = None;
            state.push_log(format!(
                "[INFO] Analyzing {} {} {} {}",
                req.player,
                req.bet_type.label(),
                format_line(req.line),
                req.stat_type.label()
            ));
            state.pending = Some(req);
        }
        Delta::AnalysisFinished {
            request,
            result,
            cached,
        } => {
            if state.pending.as_ref().is_some_and(|p| *p != request) {
                state.push_log("[WARN] Dropped stale analysis result");
                return;
            }
            state.loading = false;
            state.pending = None;
            state.error = None;
            if let Some(usage) = result.usage.as_ref() {
                state.push_log(format!(
                    "[INFO] Usage: {}/{} analyses remaining",
                    usage.remaining, usage.total_limit
                ));
            }
            state.push_log(format!(
                "[INFO] {} {:.1}% {}{}",
                result.player,
                result.probability_pct(),
                result.recommendation,
                if cached { " (cached)" } else { "" }
            ));
            state.record_history(request, &result, cached);
            state.result = Some(result);
            state.result_cached = cached;
            state.rebuild_curve();
        }
        Delta::AnalysisFailed { request, message } => {
            if state.pending.as_ref().is_some_and(|p| *p != request) {
                state.push_log("[WARN] Dropped stale analysis failure");
                return;
            }
            state.loading = false;
            state.pending = None;
            state.push_log(format!("[WARN] {message}"));
            state.error = Some(message);
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_line_trims_trailing_zeros() {
        assert_eq!(format_line(25.5), "25.5");
        assert_eq!(format_line(30.0), "30");
        assert_eq!(format_line(7.25), "7.25");
        assert_eq!(format_line(0.001), "0.001");
        assert_eq!(format_line(25.555), "25.555");
        assert_eq!(format_line(0.001).parse::<f64>().unwrap(), 0.001);
    }

    #[test]
    fn line_field_accepts_single_decimal_point() {
        let mut state = AppState::new();
        state.focus = FormField::Line;
        for c in "2a5..5".chars() {
            state.input_char(c);
        }
        assert_eq!(state.line, "25.5");
    }

    #[test]
    fn focus_wraps_both_ways() {
        let mut state = AppState::new();
        state.focus_prev();
        assert_eq!(state.focus, FormField::History);
        state.focus_next();
        assert_eq!(state.focus, FormField::Player);
    }
}
