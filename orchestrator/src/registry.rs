//! Provider registry
//!
//! Holds providers keyed by type, in registration order. Registration
//! order is significant: routing ties resolve to the provider that was
//! registered first.

use std::sync::Arc;

use scholar_agent::llm::Llm;
use scholar_agent::personas::builtin_personas;
use scholar_agent::{ExecutionContext, Provider, ProviderInfo, ProviderType};

/// Registry of available providers
#[derive(Default)]
pub struct Registry {
    providers: Vec<Arc<dyn Provider>>,
    initialized: bool,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in personas
    pub fn with_defaults(llm: Arc<dyn Llm>) -> Self {
        let mut registry = Self::new();
        registry.initialize_all(llm);
        registry
    }

    /// Register a provider, replacing any provider of the same type in place
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let provider_type = provider.provider_type();
        match self.providers.iter_mut().find(|p| p.provider_type() == provider_type) {
            Some(slot) => {
                tracing::warn!("Agent {} already registered, replacing", provider_type);
                *slot = provider;
            }
            None => {
                tracing::info!("Registered agent: {} ({})", provider.descriptor().name, provider_type);
                self.providers.push(provider);
            }
        }
    }

    /// Register the built-in personas once. Returns false if already initialized.
    pub fn initialize_all(&mut self, llm: Arc<dyn Llm>) -> bool {
        self.initialize_with(|| builtin_personas(llm))
    }

    /// Register a fixed provider set once. Later calls are no-ops.
    pub fn initialize_with<F>(&mut self, providers: F) -> bool
    where
        F: FnOnce() -> Vec<Arc<dyn Provider>>,
    {
        if self.initialized {
            return false;
        }
        for provider in providers() {
            self.register(provider);
        }
        self.initialized = true;
        tracing::info!("Initialized {} agents: {:?}", self.providers.len(), self.types());
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Get a provider by type
    pub fn get(&self, provider_type: ProviderType) -> Option<Arc<dyn Provider>> {
        self.providers
            .iter()
            .find(|p| p.provider_type() == provider_type)
            .cloned()
    }

    pub fn contains(&self, provider_type: ProviderType) -> bool {
        self.providers.iter().any(|p| p.provider_type() == provider_type)
    }

    /// Iterate over providers in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.iter()
    }

    pub fn types(&self) -> Vec<ProviderType> {
        self.providers.iter().map(|p| p.provider_type()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Listing for clients
    pub fn info(&self) -> Vec<ProviderInfo> {
        self.providers.iter().map(|p| p.descriptor().info()).collect()
    }

    /// Find the provider that claims the request with the highest confidence.
    ///
    /// Only strictly greater confidence replaces the current best, so equal
    /// scores keep the earlier-registered provider. Returns `(None, 0.0)`
    /// when no provider claims the request.
    pub async fn route(
        &self,
        request: &str,
        context: &ExecutionContext,
        exclude: &[ProviderType],
    ) -> (Option<Arc<dyn Provider>>, f32) {
        let mut best: Option<&Arc<dyn Provider>> = None;
        let mut best_confidence = 0.0_f32;

        for provider in &self.providers {
            if exclude.contains(&provider.provider_type()) {
                continue;
            }
            let (claims, confidence) = provider.can_handle(request, context).await;
            if claims && confidence > best_confidence {
                best = Some(provider);
                best_confidence = confidence;
            }
        }

        match best {
            Some(provider) => {
                tracing::info!(
                    "Routed request to {} (confidence {:.2})",
                    provider.provider_type(),
                    best_confidence
                );
                (Some(provider.clone()), best_confidence)
            }
            None => (None, 0.0),
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("providers", &self.types())
            .field("initialized", &self.initialized)
            .finish()
    }
}
