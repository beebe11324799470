use super::Backend::background::BackgroundWorkManager;
use super::Handler::Registry::HandlerRegistry;
use super::Queue::IncomingMessageManager;
use crate::error::DispatchError;
use crate::Core::{CoreReservation, DispatchConfig};
use std::sync::Arc;

/// Assembles an `IncomingMessageManager` wired to its execution backends.
pub struct ManagerBuilder<'a> {
    registry: Arc<HandlerRegistry>,
    nodes: usize,
    config: DispatchConfig,
    background: Option<&'a BackgroundWorkManager>,
}

impl<'a> ManagerBuilder<'a> {
    pub fn new(registry: Arc<HandlerRegistry>, nodes: usize) -> Self {
        Self {
            registry,
            nodes,
            config: DispatchConfig::default(),
            background: None,
        }
    }

    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_nodes(mut self, nodes: usize) -> Self {
        self.nodes = nodes;
        self
    }

    /// Drain through slices of `bgwork` in addition to any dedicated threads.
    pub fn with_background(mut self, bgwork: &'a BackgroundWorkManager) -> Self {
        self.background = Some(bgwork);
        self
    }

    pub fn build(self) -> Result<Arc<IncomingMessageManager>, DispatchError> {
        let threads = self.config.handler_threads;
        let reservation = CoreReservation::new("am-handler")
            .with_cpus(self.config.handler_thread_cpus.iter().copied())
            .with_stack_size(self.config.handler_stack_size);

        let manager = Arc::new(IncomingMessageManager::new(self.registry, self.nodes, self.config));
        if let Some(bgwork) = self.background {
            manager.add_to_manager(bgwork)?;
        }
        if threads > 0 {
            manager.start_handler_threads(&reservation, threads)?;
        }
        Ok(manager)
    }
}
