// Copyright © 2026 Pathway

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::config::CoGroupConfig;
use super::error::{DynResult, Error, Result};
use super::rollup::RollupHandler;

pub type BoxedHandler = Box<dyn RollupHandler + Send>;

pub type HandlerFactory = Arc<dyn Fn(&CoGroupConfig) -> DynResult<BoxedHandler> + Send + Sync>;

/// Maps handler names declared in a configuration to factories creating them.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, H>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&CoGroupConfig) -> DynResult<H> + Send + Sync + 'static,
        H: RollupHandler + Send + 'static,
    {
        let factory: HandlerFactory =
            Arc::new(move |config: &CoGroupConfig| Ok(Box::new(factory(config)?) as BoxedHandler));
        self.factories.insert(name.into(), factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn resolve(&self, name: &str) -> Result<HandlerFactory> {
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownHandler(name.to_string()))
    }

    pub fn create(&self, name: &str, config: &CoGroupConfig) -> Result<BoxedHandler> {
        let factory = self.resolve(name)?;
        Ok(factory(config)?)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}
