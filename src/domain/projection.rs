//! Deterministic performance projection.
//!
//! Three compounding scenarios around an expected annual return:
//! conservative (return - volatility), expected, optimistic (return + volatility).
//! Each annual rate is converted to the equivalent monthly rate
//! `(1 + r)^(1/12) - 1` and compounded month by month.

use serde::Serialize;
use tracing::warn;

pub const DEFAULT_ANNUAL_VOLATILITY: f64 = 0.15;
pub const MONTHS_PER_YEAR: u32 = 12;
pub const MAX_YEARS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectionInput {
    pub investment: f64,
    pub expected_annual_return: f64,
    pub years: u32,
    pub annual_volatility: f64,
}

impl ProjectionInput {
    pub fn new(investment: f64, expected_annual_return: f64, years: u32) -> Self {
        Self {
            investment,
            expected_annual_return,
            years,
            annual_volatility: DEFAULT_ANNUAL_VOLATILITY,
        }
    }

    pub fn with_volatility(mut self, annual_volatility: f64) -> Self {
        self.annual_volatility = annual_volatility;
        self
    }

    fn check(&self) -> Result<(), String> {
        let fields = [
            ("investment", self.investment),
            ("expected_annual_return", self.expected_annual_return),
            ("annual_volatility", self.annual_volatility),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(format!("{name} must be a finite number, got {value}"));
            }
        }
        if self.investment < 0.0 {
            return Err(format!(
                "investment must not be negative, got {}",
                self.investment
            ));
        }
        if self.annual_volatility < 0.0 {
            return Err(format!(
                "annual_volatility must not be negative, got {}",
                self.annual_volatility
            ));
        }
        if self.years > MAX_YEARS {
            return Err(format!(
                "years must be at most {MAX_YEARS}, got {}",
                self.years
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Conservative,
    Expected,
    Optimistic,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 3] = [
        ScenarioKind::Conservative,
        ScenarioKind::Expected,
        ScenarioKind::Optimistic,
    ];

    fn annual_return(self, input: &ProjectionInput) -> f64 {
        match self {
            ScenarioKind::Conservative => input.expected_annual_return - input.annual_volatility,
            ScenarioKind::Expected => input.expected_annual_return,
            ScenarioKind::Optimistic => input.expected_annual_return + input.annual_volatility,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub annual_return: f64,
    pub monthly_return: f64,
    /// Value at month 0 through the final month.
    pub values: Vec<f64>,
    pub final_value: f64,
    pub total_return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub input: ProjectionInput,
    pub timeline_months: u32,
    pub scenarios: Vec<Scenario>,
    pub error: Option<String>,
}

impl Projection {
    fn failed(input: ProjectionInput, reason: String) -> Self {
        warn!(error = %reason, "projection failed");
        Self {
            input,
            timeline_months: input.years.saturating_mul(MONTHS_PER_YEAR),
            scenarios: Vec::new(),
            error: Some(format!("failed to calculate projections: {reason}")),
        }
    }

    pub fn scenario(&self, kind: ScenarioKind) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.kind == kind)
    }
}

/// Equivalent monthly rate for an annual rate; `None` when the annual rate is
/// at or below -100%.
pub fn monthly_rate(annual: f64) -> Option<f64> {
    (annual > -1.0).then(|| (1.0 + annual).powf(1.0 / MONTHS_PER_YEAR as f64) - 1.0)
}

fn build_scenario(
    kind: ScenarioKind,
    input: &ProjectionInput,
    months: u32,
) -> Result<Scenario, String> {
    let annual_return = kind.annual_return(input);
    let monthly_return = monthly_rate(annual_return).ok_or_else(|| {
        format!("{kind:?} annual return {annual_return} leaves nothing to compound")
    })?;

    let growth = 1.0 + monthly_return;
    let values: Vec<f64> = (0..=months)
        .map(|m| input.investment * growth.powi(m as i32))
        .collect();
    let final_value = values.last().copied().unwrap_or(input.investment);
    let total_return_pct = if input.investment > 0.0 {
        (final_value - input.investment) / input.investment * 100.0
    } else {
        0.0
    };

    Ok(Scenario {
        kind,
        annual_return,
        monthly_return,
        values,
        final_value,
        total_return_pct,
    })
}

/// Never fails: invalid input is reported through `Projection::error`.
pub fn project(input: ProjectionInput) -> Projection {
    if let Err(reason) = input.check() {
        return Projection::failed(input, reason);
    }
    let months = input.years * MONTHS_PER_YEAR;

    let mut scenarios = Vec::with_capacity(ScenarioKind::ALL.len());
    for kind in ScenarioKind::ALL {
        match build_scenario(kind, &input, months) {
            Ok(scenario) => scenarios.push(scenario),
            Err(reason) => return Projection::failed(input, reason),
        }
    }

    Projection {
        input,
        timeline_months: months,
        scenarios,
        error: None,
    }
}
