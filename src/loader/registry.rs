//! Static module registry
//!
//! A [`ModuleLoader`] backed by test functions linked into the binary and
//! registered under their unit locator.

use std::collections::HashMap;
use std::sync::Arc;

use super::{LoadError, ModuleLoader, TestFn, TestModule};

#[derive(Debug, Default)]
struct StaticModule {
    functions: HashMap<String, TestFn>,
}

impl TestModule for StaticModule {
    fn function(&self, name: &str) -> Option<TestFn> {
        self.functions.get(name).copied()
    }
}

/// Loader resolving locators against registered modules
#[derive(Clone, Debug, Default)]
pub struct Registry {
    modules: HashMap<String, Arc<StaticModule>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn contains(&self, locator: &str) -> bool {
        self.modules.contains_key(locator)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleLoader for Registry {
    fn load(&self, locator: &str) -> Result<Arc<dyn TestModule>, LoadError> {
        self.modules
            .get(locator)
            .cloned()
            .map(|module| module as Arc<dyn TestModule>)
            .ok_or_else(|| LoadError::ModuleNotFound(locator.to_string()))
    }
}

/// Builder for [`Registry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    modules: HashMap<String, StaticModule>,
}

impl RegistryBuilder {
    /// Register (or extend) the module at `locator`
    pub fn module(
        mut self,
        locator: impl Into<String>,
        define: impl FnOnce(ModuleBuilder) -> ModuleBuilder,
    ) -> Self {
        let entry = self.modules.entry(locator.into()).or_default();
        let built = define(ModuleBuilder::default());
        entry.functions.extend(built.functions);
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            modules: self
                .modules
                .into_iter()
                .map(|(locator, module)| (locator, Arc::new(module)))
                .collect(),
        }
    }
}

/// Collects the exported test functions of one module
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    functions: HashMap<String, TestFn>,
}

impl ModuleBuilder {
    pub fn test(mut self, name: impl Into<String>, function: TestFn) -> Self {
        self.functions.insert(name.into(), function);
        self
    }
}
