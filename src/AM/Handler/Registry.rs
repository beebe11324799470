// Handler registry: message-type id -> handler callbacks, name and statistics
//
// Registrations are collected by a RegistryBuilder during process
// initialization and frozen into an immutable, hash-sorted table. Ids are
// positions in that table, so every participant that registers the same set
// of handlers agrees on the numbering.

use super::Stats::HandlerStats;
use crate::AM::Structs::Message::HandlerContext;
use crate::Core::TimeLimit;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::Level;

pub type HandlerId = u32;

/// `(ctx, header, payload, limit) -> handled`. Must return false rather than
/// overrun `limit`; the message is then deferred to a later drain.
pub type TimedHandlerFn =
    Arc<dyn Fn(&HandlerContext, &[u8], &[u8], TimeLimit) -> bool + Send + Sync>;

/// `(ctx, header, payload)`. Always runs to completion.
pub type UnlimitedHandlerFn = Arc<dyn Fn(&HandlerContext, &[u8], &[u8]) + Send + Sync>;

/// Fast path tried on the receiving thread. Returning false queues the message.
pub type InlineHandlerFn =
    Arc<dyn Fn(&HandlerContext, &[u8], &[u8], TimeLimit) -> bool + Send + Sync>;

/// One handler type, as supplied by the surrounding runtime.
pub struct HandlerRegistration {
    name: Cow<'static, str>,
    hash: Option<u64>,
    timed: Option<TimedHandlerFn>,
    unlimited: Option<UnlimitedHandlerFn>,
    inline: Option<InlineHandlerFn>,
}

impl HandlerRegistration {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            hash: None,
            timed: None,
            unlimited: None,
            inline: None,
        }
    }

    /// Override the name-derived stable hash.
    pub fn with_hash(mut self, hash: u64) -> Self {
        self.hash = Some(hash);
        self
    }

    pub fn time_limited<F>(mut self, f: F) -> Self
    where
        F: Fn(&HandlerContext, &[u8], &[u8], TimeLimit) -> bool + Send + Sync + 'static,
    {
        self.timed = Some(Arc::new(f));
        self
    }

    pub fn unlimited<F>(mut self, f: F) -> Self
    where
        F: Fn(&HandlerContext, &[u8], &[u8]) + Send + Sync + 'static,
    {
        self.unlimited = Some(Arc::new(f));
        self
    }

    pub fn inline<F>(mut self, f: F) -> Self
    where
        F: Fn(&HandlerContext, &[u8], &[u8], TimeLimit) -> bool + Send + Sync + 'static,
    {
        self.inline = Some(Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The hash this registration sorts by.
    pub fn stable_hash(&self) -> u64 {
        self.hash.unwrap_or_else(|| stable_hash(&self.name))
    }
}

/// First 8 bytes (big-endian) of SHA-256 over the handler name.
pub fn stable_hash(name: &str) -> u64 {
    let digest = Sha256::digest(name.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// A finalized handler. Immutable apart from its statistics.
pub struct HandlerEntry {
    pub(crate) id: HandlerId,
    pub(crate) hash: u64,
    pub(crate) name: Cow<'static, str>,
    pub(crate) timed: Option<TimedHandlerFn>,
    pub(crate) unlimited: Option<UnlimitedHandlerFn>,
    pub(crate) inline: Option<InlineHandlerFn>,
    /// Timings of the queued forms. Feeds the drain cost estimate.
    pub(crate) stats: HandlerStats,
    /// Timings of successful inline fast-path runs, kept apart so a cheap
    /// inline form never lowers the estimate for the queued one.
    pub(crate) inline_stats: HandlerStats,
}

impl HandlerEntry {
    #[inline]
    pub fn id(&self) -> HandlerId {
        self.id
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_time_limited(&self) -> bool {
        self.timed.is_some()
    }

    #[inline]
    pub fn has_inline(&self) -> bool {
        self.inline.is_some()
    }

    pub fn stats(&self) -> &HandlerStats {
        &self.stats
    }

    pub fn inline_stats(&self) -> &HandlerStats {
        &self.inline_stats
    }
}

/// Collects registrations until `finalize`.
#[derive(Default)]
pub struct RegistryBuilder {
    pending: Vec<HandlerRegistration>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, registration: HandlerRegistration) -> &mut Self {
        self.pending.push(registration);
        self
    }

    pub fn with(mut self, registration: HandlerRegistration) -> Self {
        self.pending.push(registration);
        self
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Freeze the registrations into a hash-sorted table.
    ///
    /// The coordinating node (`log_table = true`) dumps the resulting table
    /// at `info` level.
    ///
    /// # Panics
    /// If a registration has neither a time-limited nor an unlimited form, or
    /// if two registrations share a stable hash.
    pub fn finalize(self, log_table: bool) -> HandlerRegistry {
        let mut staged: Vec<(u64, HandlerRegistration)> = self
            .pending
            .into_iter()
            .map(|r| (r.stable_hash(), r))
            .collect();
        staged.sort_by_key(|(hash, _)| *hash);

        for pair in staged.windows(2) {
            assert!(
                pair[0].0 != pair[1].0,
                "handlers `{}` and `{}` share stable hash {:#018x}",
                pair[0].1.name,
                pair[1].1.name,
                pair[0].0
            );
        }

        let entries: Vec<HandlerEntry> = staged
            .into_iter()
            .enumerate()
            .map(|(idx, (hash, reg))| {
                assert!(
                    reg.timed.is_some() || reg.unlimited.is_some(),
                    "handler `{}` registered without a time-limited or unlimited callback",
                    reg.name
                );
                HandlerEntry {
                    id: idx as HandlerId,
                    hash,
                    name: reg.name,
                    timed: reg.timed,
                    unlimited: reg.unlimited,
                    inline: reg.inline,
                    stats: HandlerStats::new(),
                    inline_stats: HandlerStats::new(),
                }
            })
            .collect();

        let registry = HandlerRegistry { entries };
        if log_table {
            registry.log_table();
        }
        registry
    }
}

/// Immutable handler table. Lookups need no locking.
pub struct HandlerRegistry {
    entries: Vec<HandlerEntry>,
}

impl HandlerRegistry {
    /// # Panics
    /// If `id` was not assigned by `finalize`.
    #[inline]
    pub fn lookup(&self, id: HandlerId) -> &HandlerEntry {
        let count = self.entries.len();
        self.entries
            .get(id as usize)
            .unwrap_or_else(|| panic!("handler id {} out of range (table has {})", id, count))
    }

    pub fn find(&self, name: &str) -> Option<HandlerId> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HandlerEntry> {
        self.entries.iter()
    }

    fn log_table(&self) {
        tracing::info!(handlers = self.entries.len(), "active message handler table");
        for e in &self.entries {
            tracing::info!(
                id = e.id,
                hash = e.hash,
                name = %e.name,
                time_limited = e.timed.is_some(),
                inline = e.inline.is_some(),
                "handler"
            );
        }
    }

    /// Emit count/avg/stddev/min/max for every handler that has run.
    pub fn report_timing(&self, level: Level) {
        macro_rules! emit {
            ($lvl:expr, $e:expr, $path:expr, $s:expr) => {
                tracing::event!(
                    $lvl,
                    name = %$e.name,
                    path = $path,
                    count = $s.count,
                    avg_ns = $s.avg_ns,
                    stddev_ns = $s.stddev_ns,
                    min_ns = $s.min_ns,
                    max_ns = $s.max_ns,
                    "handler timing"
                )
            };
        }

        for e in &self.entries {
            for (path, stats) in [("queued", &e.stats), ("inline", &e.inline_stats)] {
                let s = stats.snapshot();
                if s.count == 0 {
                    continue;
                }
                if level == Level::ERROR {
                    emit!(Level::ERROR, e, path, s);
                } else if level == Level::WARN {
                    emit!(Level::WARN, e, path, s);
                } else if level == Level::INFO {
                    emit!(Level::INFO, e, path, s);
                } else if level == Level::DEBUG {
                    emit!(Level::DEBUG, e, path, s);
                } else {
                    emit!(Level::TRACE, e, path, s);
                }
            }
        }
    }
}
