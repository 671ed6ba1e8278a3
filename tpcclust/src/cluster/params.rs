use serde::{Deserialize, Serialize};

/// Scan pass of a row. The second pass re-scans the residual buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pass {
    First,
    Second,
}

impl Pass {
    pub fn number(&self) -> u8 {
        match self {
            Pass::First => 1,
            Pass::Second => 2,
        }
    }
}

/// Tuning parameters of the cluster finder.
///
/// Charges are in ADC counts, shape ratios are measured variance over the
/// variance expected from [`tpccore::SigmaModel`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClustererParams {
    /// Minimal residual charge of a local maximum.
    pub min_max_charge: f32,
    /// Neighbours below this are treated as suppressed and get a virtual charge.
    pub near_zero_charge: f32,
    /// Neighbours below this are kept but do not pull in the cells behind them.
    pub reliable_charge: f32,
    /// Exponential slope of the virtual-charge falloff.
    pub virtual_decay: f32,
    /// Second-pass candidates narrower than this ratio (either axis) are rejected.
    pub narrow_ratio: f32,
    /// Clusters wider than this ratio (either axis) are unfolded.
    pub wide_ratio: f32,
    pub unfold: bool,
    pub second_pass: bool,
    pub second_pass_min_max_charge: f32,

    // candidate pre-cuts, disabled at 0 / false
    /// Minimal peak + time-neighbour charge.
    pub min_up_down_charge: f32,
    /// Minimal peak + pad-neighbour charge.
    pub min_left_right_charge: f32,
    /// Require charge on both sides of the peak in pad and in time.
    pub reject_isolated: bool,

    /// Track acceptance |z|/r; time bins outside it are not scanned.
    pub ctg_range: Option<f32>,
    /// Worker threads for multi-row processing; 0 uses the global pool.
    pub num_threads: usize,
}

impl Default for ClustererParams {
    fn default() -> Self {
        Self {
            min_max_charge: 8.0,
            near_zero_charge: 2.0,
            reliable_charge: 4.0,
            virtual_decay: 1.2,
            narrow_ratio: 0.6,
            wide_ratio: 1.2,
            unfold: true,
            second_pass: true,
            second_pass_min_max_charge: 6.0,
            min_up_down_charge: 0.0,
            min_left_right_charge: 0.0,
            reject_isolated: false,
            ctg_range: None,
            num_threads: 0,
        }
    }
}

impl ClustererParams {
    /// Low thresholds, no pre-cuts; keeps small and isolated deposits.
    pub fn permissive() -> Self {
        Self {
            min_max_charge: 5.0,
            second_pass_min_max_charge: 4.0,
            wide_ratio: 1.5,
            ..Self::default()
        }
    }

    /// High thresholds and shape pre-cuts against noise and single-sample spikes.
    pub fn strict() -> Self {
        Self {
            min_max_charge: 12.0,
            second_pass_min_max_charge: 10.0,
            min_up_down_charge: 20.0,
            min_left_right_charge: 20.0,
            reject_isolated: true,
            ctg_range: Some(2.2),
            ..Self::default()
        }
    }

    pub fn with_threads(self, num_threads: usize) -> Self {
        Self { num_threads, ..self }
    }

    /// Minimal peak charge used by the detector in `pass`.
    pub fn min_peak_charge(&self, pass: Pass) -> f32 {
        match pass {
            Pass::First => self.min_max_charge,
            Pass::Second => self.second_pass_min_max_charge,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = ClustererParams::default();
        assert!(params.min_max_charge == 8.0);
        assert!(params.wide_ratio == 1.2);
        assert!(params.narrow_ratio == 0.6);
        assert!(params.virtual_decay == 1.2);
        assert!(params.unfold);
    }

    #[test]
    fn test_permissive_params() {
        let params = ClustererParams::permissive();
        assert!(params.min_max_charge == 5.0);
        assert!(!params.reject_isolated);
    }

    #[test]
    fn test_strict_params() {
        let params = ClustererParams::strict();
        assert!(params.min_max_charge == 12.0);
        assert!(params.reject_isolated);
        assert_eq!(params.ctg_range, Some(2.2));
    }

    #[test]
    fn test_min_peak_charge_per_pass() {
        let params = ClustererParams::default();
        assert_eq!(params.min_peak_charge(Pass::First), 8.0);
        assert_eq!(params.min_peak_charge(Pass::Second), 6.0);
        assert_eq!(Pass::Second.number(), 2);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let params: ClustererParams = serde_json::from_str(r#"{"min_max_charge": 10.0, "unfold": false}"#).unwrap();
        assert_eq!(params.min_max_charge, 10.0);
        assert!(!params.unfold);
        assert_eq!(params.reliable_charge, 4.0);
    }
}
