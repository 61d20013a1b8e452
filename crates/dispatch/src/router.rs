//! Message-name routing to handler chains.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use {ebworker_config::HandlerSpec, tracing::info};

use crate::{Error, Handler, Result, SilentFailing};

/// Handlers available to routes, by name.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with [`SilentFailing`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SilentFailing));
        registry
    }

    /// Register a handler under its own name, replacing any previous one.
    pub fn register(&mut self, handler: Arc<dyn Handler>) {
        let name = handler.name().to_string();
        info!(handler = %name, "registered handler");
        self.handlers.insert(name, handler);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Handler>> {
        self.handlers.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Immutable map from message name to resolved handler chain.
#[derive(Default)]
pub struct RouterTable {
    routes: HashMap<String, Vec<Arc<dyn Handler>>>,
}

impl RouterTable {
    /// Resolve every route against `registry`.
    ///
    /// Fails with [`Error::HandlerSpec`] on the first empty chain or unknown
    /// handler name, so misconfiguration surfaces at startup.
    pub fn build(messages: &BTreeMap<String, HandlerSpec>, registry: &HandlerRegistry) -> Result<Self> {
        let mut routes = HashMap::with_capacity(messages.len());

        for (message, spec) in messages {
            let names = spec.handlers();
            if names.is_empty() {
                return Err(Error::handler_spec(message, "handler chain is empty"));
            }
            let chain = names
                .iter()
                .map(|name| {
                    registry.get(name).cloned().ok_or_else(|| {
                        Error::handler_spec(message, format!("unknown handler \"{name}\""))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            routes.insert(message.clone(), chain);
        }

        info!(routes = routes.len(), "built router table");
        Ok(Self { routes })
    }

    /// Chain for `name`; a miss is [`Error::UnmappedMessage`].
    pub fn resolve(&self, name: &str) -> Result<&[Arc<dyn Handler>]> {
        self.routes
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::unmapped(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
