//! Shared application state for the server.

use std::sync::Arc;

use logtail::deploy::Deployer;
use minijinja::Environment;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Starts, tails and lists deployments.
    pub deployer: Deployer,
    /// Page templates, parsed once at startup.
    pub templates: Arc<Environment<'static>>,
}

impl AppState {
    pub fn new(deployer: Deployer) -> anyhow::Result<Self> {
        let mut templates = Environment::new();
        templates.add_template("index.html", INDEX_TEMPLATE)?;
        Ok(Self {
            deployer,
            templates: Arc::new(templates),
        })
    }
}
