//! Result ranking for candidate comparison during a sweep.

use leverlab_core::engine::StrategyReport;

/// Multiplier by which a candidate's ROI must beat the incumbent's to win
/// outright, regardless of drawdown.
const OUTRIGHT_ROI_FACTOR: f64 = 1.5;

/// Risk-adjusted return: ROI per unit of relative drawdown. A run that never
/// draws down scores its raw ROI.
pub fn score(report: &StrategyReport) -> f64 {
    let drawdown = report.max_relative_drawdown.abs();
    if drawdown < f64::EPSILON {
        report.roi
    } else {
        report.roi / drawdown
    }
}

/// Whether `candidate` should replace `incumbent` as the sweep's best.
///
/// Primary criterion is the risk-adjusted score. A candidate whose positive
/// ROI exceeds the incumbent's by more than 50% wins outright even at a
/// worse score, so a strategy making half again as much money is never
/// discarded for a moderately bumpier equity curve.
pub fn is_better(candidate: &StrategyReport, incumbent: &StrategyReport) -> bool {
    if candidate.roi > 0.0 && candidate.roi > incumbent.roi * OUTRIGHT_ROI_FACTOR {
        return true;
    }
    if incumbent.roi > 0.0 && incumbent.roi > candidate.roi * OUTRIGHT_ROI_FACTOR {
        return false;
    }
    score(candidate) > score(incumbent)
}
