//! Collects options before a policy exists.

use crate::error::{PolicyError, PolicyResult};
use crate::policy::{create_policy, CollectorPolicy};
use crate::util::options::Options;
use std::sync::Arc;

/// Holds the options for a policy while the embedder sets them. Options are read from
/// `GENHEAP_`-prefixed environment variables when the builder is created, and may then be
/// overridden.
pub struct PolicyBuilder {
    options: Options,
}

impl PolicyBuilder {
    /// Create a builder with the default options, then apply environment variables.
    pub fn new() -> Self {
        let mut builder = Self::new_no_env_vars();
        builder.options.read_env_var_settings();
        builder
    }

    /// Create a builder with the default options, ignoring environment variables.
    pub fn new_no_env_vars() -> Self {
        PolicyBuilder {
            options: Options::default(),
        }
    }

    /// Set an option by name. Returns false if the name is unknown or the value invalid.
    pub fn set_option(&mut self, name: &str, val: &str) -> bool {
        self.options.set_from_str(name, val)
    }

    /// Set options from a whitespace-separated list of `name=value` pairs. Returns true if all
    /// of them were set.
    pub fn set_options_bulk_by_str(&mut self, options: &str) -> bool {
        self.options.set_bulk_from_str(options)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Create and initialize the selected policy.
    pub fn build(&self) -> PolicyResult<Box<dyn CollectorPolicy>> {
        let mut policy = create_policy(Arc::new(self.options.clone()));
        policy.initialize_all()?;
        Ok(policy)
    }

    /// Like [`PolicyBuilder::set_option`], but reports a bad option as an error.
    pub fn try_set_option(&mut self, name: &str, val: &str) -> PolicyResult<()> {
        if self.set_option(name, val) {
            Ok(())
        } else {
            Err(PolicyError::invalid_option(name, val))
        }
    }
}

impl Default for PolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Options> for PolicyBuilder {
    fn from(options: Options) -> Self {
        PolicyBuilder { options }
    }
}
