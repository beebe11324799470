use crate::error::DispatchError;
use std::env;
use std::str::FromStr;

pub const DEFAULT_INLINE_THRESHOLD_NS: u64 = 5_000;
pub const DEFAULT_MAX_DEFERRALS: u32 = 16;

/// Process-wide dispatch knobs.
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Record timing for every handler. Handlers without a time-limited form
    /// are always timed since their cost estimate drives deferral.
    pub profile_handlers: bool,

    /// Minimum slack a deadline must leave for an inline handler to be tried.
    pub inline_threshold_ns: u64,

    /// After this many deferrals a message runs regardless of its cost
    /// estimate, as long as the slice still has time left. 0 disables.
    pub max_deferrals: u32,

    /// When a message is deferred, defer the rest of its sender's list too so
    /// handlers always observe a sender's messages in arrival order.
    pub preserve_sender_order: bool,

    /// Dedicated handler threads started by `ManagerBuilder`.
    pub handler_threads: usize,

    /// CPUs the dedicated threads are pinned to (empty = no pinning).
    pub handler_thread_cpus: Vec<usize>,

    pub handler_stack_size: Option<usize>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            profile_handlers: false,
            inline_threshold_ns: DEFAULT_INLINE_THRESHOLD_NS,
            max_deferrals: DEFAULT_MAX_DEFERRALS,
            preserve_sender_order: true,
            handler_threads: 0,
            handler_thread_cpus: Vec::new(),
            handler_stack_size: None,
        }
    }
}

impl DispatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by any `AM_DISPATCH_*` variables that are set.
    pub fn from_env() -> Result<Self, DispatchError> {
        let mut cfg = Self::default();
        if let Some(v) = read_env("AM_DISPATCH_PROFILE")? {
            cfg.profile_handlers = v;
        }
        if let Some(v) = read_env("AM_DISPATCH_INLINE_NS")? {
            cfg.inline_threshold_ns = v;
        }
        if let Some(v) = read_env("AM_DISPATCH_MAX_DEFERRALS")? {
            cfg.max_deferrals = v;
        }
        if let Some(v) = read_env("AM_DISPATCH_ORDERED")? {
            cfg.preserve_sender_order = v;
        }
        if let Some(v) = read_env("AM_DISPATCH_THREADS")? {
            cfg.handler_threads = v;
        }
        if let Some(v) = read_env("AM_DISPATCH_STACK")? {
            cfg.handler_stack_size = Some(v);
        }
        if let Ok(raw) = env::var("AM_DISPATCH_CPUS") {
            cfg.handler_thread_cpus = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse().map_err(|_| DispatchError::InvalidConfig {
                        key: "AM_DISPATCH_CPUS",
                        value: raw.clone(),
                    })
                })
                .collect::<Result<_, _>>()?;
        }
        Ok(cfg)
    }

    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.profile_handlers = enabled;
        self
    }

    pub fn with_inline_threshold_ns(mut self, ns: u64) -> Self {
        self.inline_threshold_ns = ns;
        self
    }

    pub fn with_max_deferrals(mut self, max: u32) -> Self {
        self.max_deferrals = max;
        self
    }

    pub fn with_sender_order(mut self, preserve: bool) -> Self {
        self.preserve_sender_order = preserve;
        self
    }

    pub fn with_handler_threads(mut self, count: usize) -> Self {
        self.handler_threads = count;
        self
    }

    pub fn with_handler_thread_cpus(mut self, cpus: Vec<usize>) -> Self {
        self.handler_thread_cpus = cpus;
        self
    }

    pub fn with_handler_stack_size(mut self, size: usize) -> Self {
        self.handler_stack_size = Some(size);
        self
    }
}

// Accepts 1/0/true/false/yes/no for booleans
trait EnvValue: Sized {
    fn parse_env(raw: &str) -> Option<Self>;
}

impl EnvValue for bool {
    fn parse_env(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        }
    }
}

macro_rules! numeric_env_value {
    ($($t:ty),*) => {
        $(impl EnvValue for $t {
            fn parse_env(raw: &str) -> Option<Self> {
                <$t as FromStr>::from_str(raw.trim()).ok()
            }
        })*
    };
}

numeric_env_value!(u32, u64, usize);

fn read_env<T: EnvValue>(key: &'static str) -> Result<Option<T>, DispatchError> {
    match env::var(key) {
        Ok(raw) => T::parse_env(&raw)
            .map(Some)
            .ok_or(DispatchError::InvalidConfig { key, value: raw }),
        Err(_) => Ok(None),
    }
}
