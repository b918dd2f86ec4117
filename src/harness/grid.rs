//! Parameter grid and harness configuration.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::runtime_detection::supported_dtypes;
use crate::types::{DType, KernelError, KernelResult};
use crate::validation::ToleranceTable;

/// Environment variable naming a JSON `HarnessConfig` file.
pub const CONFIG_ENV: &str = "BIAS_RELU_HARNESS_CONFIG";

pub const DEFAULT_BATCH: [usize; 2] = [1, 2];
pub const DEFAULT_SEQUENCE: [usize; 3] = [1, 128, 255];
pub const DEFAULT_CHANNELS: [usize; 3] = [512, 1232, 4096];
pub const DEFAULT_SEED: u64 = 0x5EED_B1A5;

/// One grid point. Each trial generates its own inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trial {
    pub batch: usize,
    pub sequence: usize,
    pub channels: usize,
    pub dtype: DType,
}

impl Trial {
    pub const fn new(batch: usize, sequence: usize, channels: usize, dtype: DType) -> Self {
        Self {
            batch,
            sequence,
            channels,
            dtype,
        }
    }

    pub fn activation_shape(&self) -> [usize; 3] {
        [self.batch, self.sequence, self.channels]
    }

    pub fn bias_shape(&self) -> [usize; 1] {
        [self.channels]
    }

    /// Per-trial RNG seed: distinct grid points get unrelated streams.
    pub fn seed(&self, base: u64) -> u64 {
        // splitmix64 over the packed parameters
        let mut z = base
            ^ (self.batch as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (self.sequence as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9)
            ^ (self.channels as u64).wrapping_mul(0x94D0_49BB_1331_11EB)
            ^ u64::from(self.dtype.elem_id()) << 56;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

impl fmt::Display for Trial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch={} sequence={} channels={} dtype={}",
            self.batch, self.sequence, self.channels, self.dtype
        )
    }
}

/// Cross product of batch x sequence x channels x dtype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TrialGrid {
    pub batch: Vec<usize>,
    pub sequence: Vec<usize>,
    pub channels: Vec<usize>,
    pub dtypes: Vec<DType>,
}

impl Default for TrialGrid {
    fn default() -> Self {
        Self {
            batch: DEFAULT_BATCH.to_vec(),
            sequence: DEFAULT_SEQUENCE.to_vec(),
            channels: DEFAULT_CHANNELS.to_vec(),
            dtypes: supported_dtypes(),
        }
    }
}

impl TrialGrid {
    /// Trials in a fixed order: dtype outermost, batch innermost.
    pub fn trials(&self) -> Vec<Trial> {
        let mut out = Vec::with_capacity(self.len());
        for &dtype in &self.dtypes {
            for &channels in &self.channels {
                for &sequence in &self.sequence {
                    for &batch in &self.batch {
                        out.push(Trial::new(batch, sequence, channels, dtype));
                    }
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.batch.len() * self.sequence.len() * self.channels.len() * self.dtypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self) -> KernelResult<()> {
        for (name, values) in [
            ("batch", &self.batch),
            ("sequence", &self.sequence),
            ("channels", &self.channels),
        ] {
            if values.is_empty() {
                return Err(KernelError::InvalidConfig(format!("grid.{} is empty", name)));
            }
            if values.contains(&0) {
                return Err(KernelError::InvalidConfig(format!("grid.{} contains 0", name)));
            }
        }
        if self.dtypes.is_empty() {
            return Err(KernelError::InvalidConfig("grid.dtypes is empty".into()));
        }
        Ok(())
    }
}

/// Everything the harness can be configured with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct HarnessConfig {
    pub grid: TrialGrid,
    pub tolerances: ToleranceTable,
    pub seed: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            grid: TrialGrid::default(),
            tolerances: ToleranceTable::default(),
            seed: DEFAULT_SEED,
        }
    }
}

impl HarnessConfig {
    pub fn from_json_str(json: &str) -> KernelResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> KernelResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        log::debug!("Loaded harness config from: {:?}", path);
        Self::from_json_str(&content)
    }

    /// Config from `BIAS_RELU_HARNESS_CONFIG` if set, defaults otherwise.
    pub fn from_env() -> KernelResult<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> KernelResult<()> {
        self.grid.validate()?;
        self.tolerances.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_size() {
        let grid = TrialGrid::default();
        assert_eq!(grid.len(), 2 * 3 * 3 * grid.dtypes.len());
        assert_eq!(grid.trials().len(), grid.len());
    }

    #[test]
    fn test_trials_cover_cross_product() {
        let grid = TrialGrid {
            batch: vec![1, 2],
            sequence: vec![1],
            channels: vec![4096],
            dtypes: vec![DType::F32],
        };
        assert_eq!(
            grid.trials(),
            vec![Trial::new(1, 1, 4096, DType::F32), Trial::new(2, 1, 4096, DType::F32)]
        );
    }

    #[test]
    fn test_seed_is_stable_and_distinct() {
        let a = Trial::new(1, 128, 512, DType::F16);
        let b = Trial::new(1, 128, 512, DType::BF16);
        assert_eq!(a.seed(1), a.seed(1));
        assert_ne!(a.seed(1), b.seed(1));
        assert_ne!(a.seed(1), a.seed(2));
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config = HarnessConfig::from_json_str(
            r#"{ "grid": { "channels": [8], "dtypes": ["fp32"] }, "seed": 3 }"#,
        )
        .unwrap();
        assert_eq!(config.seed, 3);
        assert_eq!(config.grid.channels, vec![8]);
        assert_eq!(config.grid.batch, DEFAULT_BATCH.to_vec());
        assert_eq!(config.tolerances, ToleranceTable::default());
    }

    #[test]
    fn test_config_rejects_unknown_and_empty() {
        assert!(matches!(
            HarnessConfig::from_json_str(r#"{ "grd": {} }"#),
            Err(KernelError::Json(_))
        ));
        assert!(matches!(
            HarnessConfig::from_json_str(r#"{ "grid": { "batch": [] } }"#),
            Err(KernelError::InvalidConfig(_))
        ));
        assert!(matches!(
            HarnessConfig::from_json_str(r#"{ "grid": { "channels": [0] } }"#),
            Err(KernelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_config_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.json");
        std::fs::write(&path, r#"{ "seed": 11 }"#).unwrap();
        assert_eq!(HarnessConfig::from_path(&path).unwrap().seed, 11);
        assert!(matches!(
            HarnessConfig::from_path(dir.path().join("missing.json")),
            Err(KernelError::Io(_))
        ));
    }

    #[test]
    fn test_trial_display() {
        let t = Trial::new(2, 1, 4096, DType::BF16);
        assert_eq!(t.to_string(), "batch=2 sequence=1 channels=4096 dtype=bf16");
    }
}
