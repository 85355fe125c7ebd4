//! Module loading
//!
//! The scheduler does not import code itself. It resolves a test's module
//! through a [`ModuleLoader`] and looks up the test function by name.

mod registry;

use futures::future::BoxFuture;
use std::sync::Arc;
use thiserror::Error;

pub use registry::{ModuleBuilder, Registry, RegistryBuilder};

/// Value returned by a test function.
///
/// `Err` only fails the test when result checking is enabled.
pub type TestReturn = Result<(), String>;

/// A test function
pub type TestFn = fn() -> BoxFuture<'static, TestReturn>;

/// Module loading errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Cannot find module '{0}'")]
    ModuleNotFound(String),

    #[error("Failed to load module '{locator}': {reason}")]
    Broken { locator: String, reason: String },
}

/// A loaded unit exposing test functions by name
pub trait TestModule: Send + Sync {
    fn function(&self, name: &str) -> Option<TestFn>;
}

/// Resolves a unit locator to a loaded module
pub trait ModuleLoader: Send + Sync {
    fn load(&self, locator: &str) -> Result<Arc<dyn TestModule>, LoadError>;
}

/// Builds unit locators from a package root and a module identifier
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitLocator {
    package: String,
}

impl UnitLocator {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Locator of `module` inside the package; bare module when no package is set
    pub fn locate(&self, module: &str) -> String {
        if self.package.is_empty() {
            module.to_string()
        } else {
            format!("{}/{}", self.package, module)
        }
    }
}
