use super::*;
use std::env;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

static NUM_THREADS: AtomicUsize = AtomicUsize::new(0);
static BINARY_PARALLEL_THRESHOLD: AtomicUsize = AtomicUsize::new(1_000_000);
static UNARY_PARALLEL_THRESHOLD: AtomicUsize = AtomicUsize::new(10_000);
static TRANSPOSE_PARALLEL_THRESHOLD: AtomicUsize = AtomicUsize::new(1_000_000);
static MATMUL_PARALLEL_THRESHOLD: AtomicUsize = AtomicUsize::new(8_000);
static MATMUL_TILED_THRESHOLD: AtomicUsize = AtomicUsize::new(64_000_000);
/// 0 = automatic, otherwise an [`ExecutionMode::code`].
static FORCED_MODE: AtomicU8 = AtomicU8::new(0);

/// Process-wide execution tuning.
///
/// Values only take effect once [`apply`](ExecutionConfig::apply)-ed; the defaults are active
/// until then.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Worker threads of a parallel region. 0 means all available cores.
    pub num_threads: usize,
    /// Element count above which binary element-wise operations run in parallel.
    pub binary_parallel_threshold: usize,
    /// Element count above which unary element-wise operations run in parallel.
    pub unary_parallel_threshold: usize,
    /// Element count above which a matrix transpose uses the parallel blocked copy.
    pub transpose_parallel_threshold: usize,
    /// `m * k * n` above which matmul uses the parallel kernel.
    pub matmul_parallel_threshold: usize,
    /// `m * k * n` above which matmul uses the tiled kernel.
    pub matmul_tiled_threshold: usize,
    /// Overrides the threshold decisions of the element-wise kernels.
    pub forced_mode: Option<ExecutionMode>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            binary_parallel_threshold: 1_000_000,
            unary_parallel_threshold: 10_000,
            transpose_parallel_threshold: 1_000_000,
            matmul_parallel_threshold: 8_000,
            matmul_tiled_threshold: 64_000_000,
            forced_mode: None,
        }
    }
}

impl ExecutionConfig {
    /// Reads `RAPID_NUM_THREADS`, the `RAPID_*_THRESHOLD` variables and `RAPID_EXECUTION_MODE`
    /// (`auto`, `serial` or `parallel`). Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let number = |name: &str, default: usize| -> Result<usize> {
            match lookup(name) {
                Some(value) => value.trim().parse().map_err(|_| {
                    ArrayError::ConfigurationError(format!(
                        "{name} must be a non-negative integer, got '{value}'"
                    ))
                }),
                None => Ok(default),
            }
        };

        let defaults = Self::default();
        let forced_mode = match lookup("RAPID_EXECUTION_MODE") {
            Some(value) if value.trim().eq_ignore_ascii_case("auto") => None,
            Some(value) => Some(value.parse::<ExecutionMode>()?),
            None => defaults.forced_mode,
        };

        Ok(Self {
            num_threads: number("RAPID_NUM_THREADS", defaults.num_threads)?,
            binary_parallel_threshold: number(
                "RAPID_BINARY_PARALLEL_THRESHOLD",
                defaults.binary_parallel_threshold,
            )?,
            unary_parallel_threshold: number(
                "RAPID_UNARY_PARALLEL_THRESHOLD",
                defaults.unary_parallel_threshold,
            )?,
            transpose_parallel_threshold: number(
                "RAPID_TRANSPOSE_PARALLEL_THRESHOLD",
                defaults.transpose_parallel_threshold,
            )?,
            matmul_parallel_threshold: number(
                "RAPID_MATMUL_PARALLEL_THRESHOLD",
                defaults.matmul_parallel_threshold,
            )?,
            matmul_tiled_threshold: number(
                "RAPID_MATMUL_TILED_THRESHOLD",
                defaults.matmul_tiled_threshold,
            )?,
            forced_mode,
        })
    }

    /// Makes this configuration the active one for all subsequent operations.
    pub fn apply(&self) {
        NUM_THREADS.store(self.num_threads, Ordering::Relaxed);
        BINARY_PARALLEL_THRESHOLD.store(self.binary_parallel_threshold, Ordering::Relaxed);
        UNARY_PARALLEL_THRESHOLD.store(self.unary_parallel_threshold, Ordering::Relaxed);
        TRANSPOSE_PARALLEL_THRESHOLD.store(self.transpose_parallel_threshold, Ordering::Relaxed);
        MATMUL_PARALLEL_THRESHOLD.store(self.matmul_parallel_threshold, Ordering::Relaxed);
        MATMUL_TILED_THRESHOLD.store(self.matmul_tiled_threshold, Ordering::Relaxed);
        FORCED_MODE.store(self.forced_mode.map_or(0, ExecutionMode::code), Ordering::Relaxed);

        log::debug!("execution config applied: {self:?}");
    }

    /// The active configuration.
    pub fn current() -> Self {
        Self {
            num_threads: NUM_THREADS.load(Ordering::Relaxed),
            binary_parallel_threshold: BINARY_PARALLEL_THRESHOLD.load(Ordering::Relaxed),
            unary_parallel_threshold: UNARY_PARALLEL_THRESHOLD.load(Ordering::Relaxed),
            transpose_parallel_threshold: TRANSPOSE_PARALLEL_THRESHOLD.load(Ordering::Relaxed),
            matmul_parallel_threshold: MATMUL_PARALLEL_THRESHOLD.load(Ordering::Relaxed),
            matmul_tiled_threshold: MATMUL_TILED_THRESHOLD.load(Ordering::Relaxed),
            forced_mode: forced_mode(),
        }
    }
}

pub(crate) fn forced_mode() -> Option<ExecutionMode> {
    ExecutionMode::try_from(FORCED_MODE.load(Ordering::Relaxed)).ok()
}

pub(crate) fn binary_parallel_threshold() -> usize {
    BINARY_PARALLEL_THRESHOLD.load(Ordering::Relaxed)
}

pub(crate) fn unary_parallel_threshold() -> usize {
    UNARY_PARALLEL_THRESHOLD.load(Ordering::Relaxed)
}

pub(crate) fn transpose_parallel_threshold() -> usize {
    TRANSPOSE_PARALLEL_THRESHOLD.load(Ordering::Relaxed)
}

/// Resolved worker count, never zero.
pub(crate) fn worker_threads() -> usize {
    match NUM_THREADS.load(Ordering::Relaxed) {
        0 => std::thread::available_parallelism().map_or(4, |n| n.get()),
        n => n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults_match_documented_thresholds() {
        let config = ExecutionConfig::default();
        assert_eq!(config.num_threads, 0);
        assert_eq!(config.binary_parallel_threshold, 1_000_000);
        assert_eq!(config.unary_parallel_threshold, 10_000);
        assert_eq!(config.transpose_parallel_threshold, 1_000_000);
        assert_eq!(config.matmul_parallel_threshold, 8_000);
        assert_eq!(config.matmul_tiled_threshold, 64_000_000);
        assert_eq!(config.forced_mode, None);
    }

    #[test]
    fn environment_overrides_defaults() -> Result<()> {
        let config = ExecutionConfig::from_lookup(lookup(&[
            ("RAPID_NUM_THREADS", "3"),
            ("RAPID_MATMUL_TILED_THRESHOLD", " 1000 "),
            ("RAPID_EXECUTION_MODE", "serial"),
        ]))?;

        assert_eq!(config.num_threads, 3);
        assert_eq!(config.matmul_tiled_threshold, 1000);
        assert_eq!(config.unary_parallel_threshold, 10_000);
        assert_eq!(config.forced_mode, Some(ExecutionMode::Serial));

        let config = ExecutionConfig::from_lookup(lookup(&[("RAPID_EXECUTION_MODE", "AUTO")]))?;
        assert_eq!(config.forced_mode, None);

        Ok(())
    }

    #[test]
    fn invalid_environment_is_rejected() {
        assert!(matches!(
            ExecutionConfig::from_lookup(lookup(&[("RAPID_EXECUTION_MODE", "turbo")])),
            Err(ArrayError::ConfigurationError(_))
        ));
        assert!(matches!(
            ExecutionConfig::from_lookup(lookup(&[("RAPID_NUM_THREADS", "-1")])),
            Err(ArrayError::ConfigurationError(_))
        ));
    }
}
