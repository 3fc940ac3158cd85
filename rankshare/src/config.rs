//! Runtime configuration for rankshare.
//!
//! All values have sensible defaults. Override via environment variables
//! (prefixed `RANKSHARE_`) or by constructing a custom `RankshareConfig`.

/// Switches that control backend selection and diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankshareConfig {
    /// Use the single-process backend even when a multi-process backend is
    /// available.
    pub disable_distributed: bool,

    /// Do not warn when a distributed loop has fewer jobs than ranks.
    pub forgive_idle_ranks: bool,
}

impl RankshareConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `RANKSHARE_DISABLE_DISTRIBUTED`
    /// - `RANKSHARE_FORGIVE_IDLE_RANKS`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("RANKSHARE_DISABLE_DISTRIBUTED") {
            cfg.disable_distributed = parse_flag(&v);
        }
        if let Ok(v) = std::env::var("RANKSHARE_FORGIVE_IDLE_RANKS") {
            cfg.forgive_idle_ranks = parse_flag(&v);
        }

        cfg
    }
}

/// Any non-empty value except `0`, `false`, `no` and `off` enables a flag.
fn parse_flag(value: &str) -> bool {
    let v = value.trim();
    !(v.is_empty()
        || v == "0"
        || v.eq_ignore_ascii_case("false")
        || v.eq_ignore_ascii_case("no")
        || v.eq_ignore_ascii_case("off"))
}
