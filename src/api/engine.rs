//! Policy engine implementation.

use super::{PolicyDecision, Request};
use crate::cache::{CacheStats, DecisionCache};
use crate::config::Config;
use crate::content::{Content, ContentStorage, ContentUpdate};
use crate::core::Types;
use crate::expression::FunctionRegistry;
use crate::policy::{Evaluable, PolicyCommand, PolicyStorage, PolicyUpdate};
use crate::telemetry::{Telemetry, TelemetryMetrics};
use crate::{Error, Result};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};
use uuid::Uuid;

/// The policy decision point.
///
/// Readers evaluate against whatever policy and content snapshots are
/// current when the request starts. Writers build new snapshots and swap
/// them in one at a time.
pub struct PolicyEngine {
    policies: ArcSwap<PolicyStorage>,
    content: ArcSwap<ContentStorage>,
    /// Serializes read-modify-write updates
    writer: Mutex<()>,
    /// Bumped on every swap so cache keys never outlive their snapshot
    generation: AtomicU64,
    registry: FunctionRegistry,
    types: Types,
    cache: Option<DecisionCache>,
    telemetry: Option<Telemetry>,
    config: Config,
}

impl PolicyEngine {
    /// Create a policy engine builder.
    pub fn builder() -> PolicyEngineBuilder {
        PolicyEngineBuilder::new()
    }

    /// Create an engine with empty policies and content.
    pub fn new(config: Config) -> Self {
        let cache = if config.cache.enabled {
            Some(DecisionCache::new(
                config.cache.max_entries,
                config.cache.ttl(),
            ))
        } else {
            None
        };

        Self {
            policies: ArcSwap::from_pointee(PolicyStorage::default()),
            content: ArcSwap::from_pointee(ContentStorage::new()),
            writer: Mutex::new(()),
            generation: AtomicU64::new(0),
            registry: FunctionRegistry::builtin(),
            types: Types::new(),
            cache,
            telemetry: None,
            config,
        }
    }

    /// Evaluate the current policies against a request.
    ///
    /// Failures never escape: a request that can't be evaluated gets an
    /// Indeterminate decision with the error as status.
    pub fn evaluate(&self, request: &Request) -> PolicyDecision {
        let start = Instant::now();

        let key = self.cache.as_ref().and_then(|_| self.cache_key(request));
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(cached) = cache.get(key) {
                let decision = cached.with_evaluation_time(start.elapsed());
                self.record(&decision, true);
                return decision;
            }
        }

        let policies = self.policies.load();
        let decision = match request.context(Some(self.content.load_full())) {
            Ok(ctx) => {
                let response = policies.evaluate(&ctx);
                if let (Some(telemetry), Some(status)) = (&self.telemetry, &response.status) {
                    telemetry.record_error(status);
                }
                PolicyDecision::from_response(response, &ctx)
            }
            Err(e) => {
                if let Some(ref telemetry) = self.telemetry {
                    telemetry.record_error(&e);
                }
                PolicyDecision::indeterminate(e)
            }
        }
        .with_evaluation_time(start.elapsed());

        trace!(
            decision = %decision.decision,
            status = ?decision.status,
            elapsed_ms = decision.evaluation_time_ms,
            "Evaluated request"
        );

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.put(key, &decision);
        }
        self.record(&decision, false);

        decision
    }

    /// Decode and evaluate a JSON request.
    pub fn evaluate_json(&self, json: &str) -> PolicyDecision {
        match Request::from_json(json, &self.types) {
            Ok(request) => self.evaluate(&request),
            Err(e) => PolicyDecision::indeterminate(e),
        }
    }

    fn cache_key(&self, request: &Request) -> Option<String> {
        let digest = request.cache_key().ok()?;
        Some(format!(
            "{}:{}",
            self.generation.load(Ordering::Acquire),
            digest
        ))
    }

    fn record(&self, decision: &PolicyDecision, cached: bool) {
        if let Some(ref telemetry) = self.telemetry {
            if telemetry.is_enabled() {
                telemetry.record_evaluation(
                    decision.decision,
                    decision.evaluation_time_ms,
                    cached,
                );
            }
        }
    }

    /// Replace the whole policy tree.
    pub fn set_policies(&self, root: impl Into<Evaluable>, tag: Option<Uuid>) {
        let _guard = self.writer.lock();
        self.publish_policies(PolicyStorage::new(root, tag));
    }

    /// Apply an incremental update to the current policies.
    ///
    /// The update must start from the current tag. On failure the current
    /// policies stay in place.
    pub fn update_policies(&self, update: &PolicyUpdate) -> Result<()> {
        self.check_paths(update)?;

        let _guard = self.writer.lock();
        let current = self.policies.load_full();
        let mut tx = current.new_transaction(update.old_tag())?;
        tx.apply(update)?;
        let next = tx.commit(&current)?;
        self.publish_policies(next);
        Ok(())
    }

    fn check_paths(&self, update: &PolicyUpdate) -> Result<()> {
        let limit = self.config.engine.max_path_depth;
        for command in update.commands() {
            let path = match command {
                PolicyCommand::Add { path, .. } | PolicyCommand::Delete { path } => path,
            };
            if path.len() > limit {
                return Err(Error::validation_field(
                    format!("path of {} ids exceeds limit of {}", path.len(), limit),
                    "path",
                ));
            }
        }
        Ok(())
    }

    fn publish_policies(&self, storage: PolicyStorage) {
        debug!(tag = ?storage.tag(), root = ?storage.root().id(), "Swapped policy root");
        self.policies.store(Arc::new(storage));
        self.invalidate();
    }

    /// Add or replace a content.
    pub fn set_content(&self, content: Content) {
        let _guard = self.writer.lock();
        let id = content.id().to_string();
        let next = self.content.load().with(content);
        self.publish_content(next, &id);
    }

    /// Remove a content by id.
    pub fn remove_content(&self, id: &str) {
        let _guard = self.writer.lock();
        let next = self.content.load().without(id);
        self.publish_content(next, id);
    }

    /// Apply an incremental update to one content.
    pub fn update_content(&self, update: &ContentUpdate) -> Result<()> {
        let _guard = self.writer.lock();
        let current = self.content.load_full();
        let mut tx = current.new_transaction(update.content_id(), update.old_tag())?;
        tx.apply(update)?;
        let next = tx.commit(&current)?;
        self.publish_content(next, update.content_id());
        Ok(())
    }

    fn publish_content(&self, storage: ContentStorage, id: &str) {
        debug!(content = id, contents = storage.len(), "Swapped content storage");
        self.content.store(Arc::new(storage));
        self.invalidate();
    }

    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(ref cache) = self.cache {
            cache.clear();
        }
    }

    /// Function registry used to build expressions.
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Type registry used to decode requests.
    pub fn types(&self) -> &Types {
        &self.types
    }

    /// Current policy snapshot.
    pub fn policies(&self) -> Arc<PolicyStorage> {
        self.policies.load_full()
    }

    /// Current content snapshot.
    pub fn content(&self) -> Arc<ContentStorage> {
        self.content.load_full()
    }

    /// Engine configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Clear the decision cache.
    pub fn clear_cache(&self) {
        if let Some(ref cache) = self.cache {
            cache.clear();
        }
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|c| c.stats())
    }

    /// Get engine metrics.
    pub fn metrics(&self) -> EngineMetrics {
        let policies = self.policies.load();
        EngineMetrics {
            policy_tag: policies.tag(),
            content_count: self.content.load().len(),
            cache_enabled: self.cache.is_some(),
            cache_stats: self.cache_stats(),
            decisions: self.telemetry.as_ref().map(Telemetry::metrics),
        }
    }
}

/// Builder for creating a PolicyEngine.
#[derive(Debug, Default)]
pub struct PolicyEngineBuilder {
    config: Option<Config>,
    root: Option<Evaluable>,
    tag: Option<Uuid>,
    contents: Vec<Content>,
    content_files: Vec<PathBuf>,
    types: Option<Types>,
    telemetry_enabled: Option<bool>,
}

impl PolicyEngineBuilder {
    /// Create a new policy engine builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the initial policy tree.
    pub fn with_policies(mut self, root: impl Into<Evaluable>, tag: Option<Uuid>) -> Self {
        self.root = Some(root.into());
        self.tag = tag;
        self
    }

    /// Add a content.
    pub fn with_content(mut self, content: Content) -> Self {
        self.contents.push(content);
        self
    }

    /// Add a JSON content file to load.
    pub fn with_content_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.content_files.push(path.into());
        self
    }

    /// Set the type registry, for custom flags types.
    pub fn with_types(mut self, types: Types) -> Self {
        self.types = Some(types);
        self
    }

    /// Enable or disable decision counters.
    pub fn with_telemetry_enabled(mut self, enabled: bool) -> Self {
        self.telemetry_enabled = Some(enabled);
        self
    }

    /// Build the policy engine.
    pub fn build(self) -> Result<PolicyEngine> {
        let mut config = self.config.unwrap_or_default();
        if let Some(enabled) = self.telemetry_enabled {
            config.telemetry.enabled = enabled;
        }
        config.validate()?;

        let files: Vec<PathBuf> = config
            .content
            .files
            .iter()
            .cloned()
            .chain(self.content_files)
            .collect();

        let mut engine = PolicyEngine::new(config);
        if let Some(types) = self.types {
            engine.types = types;
        }
        if engine.config.telemetry.enabled {
            engine.telemetry = Some(Telemetry::new(&engine.config.telemetry));
        }

        let mut content = ContentStorage::new();
        for path in &files {
            let loaded = Content::from_file(path, &engine.types)?;
            debug!(content = loaded.id(), path = %path.display(), "Loaded content file");
            content = content.with(loaded);
        }
        for c in self.contents {
            content = content.with(c);
        }
        engine.content = ArcSwap::from_pointee(content);

        if let Some(root) = self.root {
            engine.policies = ArcSwap::from_pointee(PolicyStorage::new(root, self.tag));
        }

        Ok(engine)
    }
}

/// Engine metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineMetrics {
    /// Tag of the current policies
    pub policy_tag: Option<Uuid>,
    /// Number of loaded contents
    pub content_count: usize,
    /// Whether caching is enabled
    pub cache_enabled: bool,
    /// Cache statistics (if caching is enabled)
    pub cache_stats: Option<CacheStats>,
    /// Decision counters (if telemetry is enabled)
    pub decisions: Option<TelemetryMetrics>,
}
