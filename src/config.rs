//! Engine configuration and its environment overrides.
//!
//! `YATZY_PARALLEL` turns the stage-parallel precompute off when set to `0`, `false` or `off`.
//! `RAYON_NUM_THREADS` gives the engine its own rayon pool of that size instead of the global one.

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::engine::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Solve each precompute stage with rayon.
    pub parallel: bool,
    /// Size of a dedicated pool; `None` uses rayon's global pool.
    pub threads: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
        }
    }
}

impl EngineConfig {
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            threads: None,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`EngineConfig::from_env`], reading variables through `lookup`. Unparseable values
    /// fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parallel = lookup("YATZY_PARALLEL")
            .map(|value| {
                !matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "0" | "false" | "off"
                )
            })
            .unwrap_or(true);
        let threads = lookup("RAYON_NUM_THREADS")
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|&n| n > 0);
        Self { parallel, threads }
    }

    /// A dedicated pool when `threads` is set.
    pub(crate) fn build_pool(&self) -> Result<Option<ThreadPool>, EngineError> {
        match self.threads {
            Some(num_threads) if self.parallel => ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .thread_name(|i| format!("yatzy-ev-{i}"))
                .build()
                .map(Some)
                .map_err(EngineError::from),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        assert_eq!(EngineConfig::from_lookup(lookup(&[])), EngineConfig::default());
    }

    #[test]
    fn parallel_can_be_disabled() {
        for value in ["0", "false", "OFF"] {
            let config = EngineConfig::from_lookup(lookup(&[("YATZY_PARALLEL", value)]));
            assert!(!config.parallel, "{value}");
        }
        let config = EngineConfig::from_lookup(lookup(&[("YATZY_PARALLEL", "1")]));
        assert!(config.parallel);
    }

    #[test]
    fn thread_count_is_parsed() {
        let config = EngineConfig::from_lookup(lookup(&[("RAYON_NUM_THREADS", "3")]));
        assert_eq!(config.threads, Some(3));
        let config = EngineConfig::from_lookup(lookup(&[("RAYON_NUM_THREADS", "lots")]));
        assert_eq!(config.threads, None);
        let config = EngineConfig::from_lookup(lookup(&[("RAYON_NUM_THREADS", "0")]));
        assert_eq!(config.threads, None);
    }

    #[test]
    fn pool_only_when_requested() {
        assert!(EngineConfig::default().build_pool().unwrap().is_none());
        let config = EngineConfig {
            parallel: true,
            threads: Some(2),
        };
        let pool = config.build_pool().unwrap().unwrap();
        assert_eq!(pool.current_num_threads(), 2);
    }
}
