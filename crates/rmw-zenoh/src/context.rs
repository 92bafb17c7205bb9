// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Context and node.
//!
//! A [`Context`] owns the transport session, the runtime configuration and
//! the registry of local endpoints. Nodes are cheap handles onto it; every
//! entity a node creates is keyed `<domain>/<fully qualified name>/<type>`.

use crate::config::EnvConfig;
use crate::error::{Error, Result};
use crate::events::EntityEvents;
use crate::keyexpr::{topic_keyexpr, KeyExpr};
use crate::logging::{self, LogLevel};
use crate::node::{Client, Publisher, Service, Subscription};
use crate::payload::Gid;
use crate::qos::QosProfile;
use crate::registry::{endpoint, LocalEndpointKind, LocalEndpointRegistry};
use crate::transport::{LocalSession, Transport};
use crate::type_support::TypeSupport;
use crate::waitset::GuardCondition;
use std::sync::Arc;

struct ContextInner {
    session: Arc<dyn Transport>,
    config: EnvConfig,
    endpoints: LocalEndpointRegistry,
    graph_guard: Arc<GuardCondition>,
}

/// Shared handle to one transport session and its configuration.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Open an in-process session configured by `config`.
    pub fn new(config: EnvConfig) -> Result<Self> {
        let session =
            LocalSession::with_config(config.dispatch, config.session_config_uri.as_deref())?;
        Ok(Self::with_transport(Arc::new(session), config))
    }

    /// Configuration from the environment, see [`EnvConfig::from_env`].
    ///
    /// Also installs the console logger at `RMW_ZENOH_LOG_LEVEL` unless the
    /// application already installed one; `RUST_LOG` takes precedence.
    pub fn from_env() -> Result<Self> {
        let config = EnvConfig::from_env();
        config.apply_log_level();
        let level = config.log_level.parse::<LogLevel>().unwrap_or_else(|e| {
            log::warn!("[rmw] {}, falling back to info", e);
            LogLevel::Info
        });
        if let Err(e) = logging::init_from_env(level) {
            log::debug!("[rmw] keeping existing logger: {}", e);
        }

        if config.is_custom() {
            log::info!("[rmw] using environment configuration: {:?}", config);
        }
        Self::new(config)
    }

    /// Wrap an already opened transport session.
    pub fn with_transport(session: Arc<dyn Transport>, config: EnvConfig) -> Self {
        log::debug!("[rmw] context on domain {}", config.domain_id);
        Self {
            inner: Arc::new(ContextInner {
                session,
                config,
                endpoints: LocalEndpointRegistry::new(),
                graph_guard: Arc::new(GuardCondition::new()),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EnvConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn domain_id(&self) -> u32 {
        self.inner.config.domain_id
    }

    #[must_use]
    pub fn session(&self) -> &Arc<dyn Transport> {
        &self.inner.session
    }

    /// Guard condition triggered whenever a local endpoint appears.
    #[must_use]
    pub fn graph_guard(&self) -> Arc<GuardCondition> {
        Arc::clone(&self.inner.graph_guard)
    }

    /// Create a node. `namespace` may be empty (root namespace).
    pub fn create_node(&self, name: &str, namespace: &str) -> Result<Node> {
        if self.is_shutdown() {
            return Err(Error::SessionClosed);
        }
        validate_node_name(name)?;
        let namespace = normalize_namespace(namespace)?;
        log::debug!("[rmw] node '{}' in namespace '{}'", name, namespace);
        Ok(Node {
            name: name.to_string(),
            namespace,
            context: self.clone(),
        })
    }

    /// Close the session; existing entities stop receiving.
    pub fn shutdown(&self) {
        self.inner.session.close();
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.session.is_closed()
    }

    /// Publishers and subscriptions currently registered.
    #[must_use]
    pub fn local_endpoint_count(&self) -> usize {
        self.inner.endpoints.len()
    }

    pub(crate) fn register_endpoint(
        &self,
        gid: Gid,
        key: &KeyExpr,
        kind: LocalEndpointKind,
        qos: QosProfile,
        events: &Arc<EntityEvents>,
    ) {
        let mismatches = self
            .inner
            .endpoints
            .register(endpoint(gid, key, kind, qos, events));
        for mismatch in &mismatches {
            mismatch.raise();
        }
        self.inner.graph_guard.trigger();
    }

    pub(crate) fn unregister_endpoint(&self, gid: Gid) {
        if self.inner.endpoints.unregister(gid) {
            self.inner.graph_guard.trigger();
        }
    }
}

/// Named handle creating entities within a namespace.
#[derive(Clone)]
pub struct Node {
    name: String,
    namespace: String,
    context: Context,
}

impl Node {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace, `/` for the root.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn fully_qualified_name(&self) -> String {
        if self.namespace == "/" {
            format!("/{}", self.name)
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }

    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Resolve a topic or service name against this node's namespace.
    pub fn resolve_name(&self, name: &str) -> Result<String> {
        validate_topic_name(name)?;
        if name.starts_with('/') {
            Ok(name.to_string())
        } else if self.namespace == "/" {
            Ok(format!("/{}", name))
        } else {
            Ok(format!("{}/{}", self.namespace, name))
        }
    }

    pub(crate) fn entity_key(&self, name: &str, type_name: &str) -> Result<KeyExpr> {
        let resolved = self.resolve_name(name)?;
        topic_keyexpr(self.context.domain_id(), &resolved, type_name)
    }

    pub(crate) fn adapt_qos(&self, qos: QosProfile) -> QosProfile {
        qos.adapt(self.context.config().default_depth)
    }

    pub fn create_publisher<T: TypeSupport>(
        &self,
        topic: &str,
        qos: QosProfile,
        type_support: T,
    ) -> Result<Publisher<T>> {
        Publisher::new(self, topic, qos, type_support)
    }

    pub fn create_subscription<T: TypeSupport>(
        &self,
        topic: &str,
        qos: QosProfile,
        type_support: T,
    ) -> Result<Subscription<T>> {
        Subscription::new(self, topic, qos, type_support)
    }

    pub fn create_service<Req: TypeSupport, Res: TypeSupport>(
        &self,
        service: &str,
        qos: QosProfile,
        request: Req,
        response: Res,
    ) -> Result<Service<Req, Res>> {
        Service::new(self, service, qos, request, response)
    }

    pub fn create_client<Req: TypeSupport, Res: TypeSupport>(
        &self,
        service: &str,
        qos: QosProfile,
        request: Req,
        response: Res,
    ) -> Result<Client<Req, Res>> {
        Client::new(self, service, qos, request, response)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn validate_token(token: &str, what: &str) -> Result<()> {
    if token.is_empty() {
        return Err(Error::invalid_argument(format!("{} has an empty segment", what)));
    }
    if token.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(Error::invalid_argument(format!(
            "{} segment '{}' starts with a digit",
            what, token
        )));
    }
    if let Some(bad) = token.chars().find(|&c| !is_name_char(c)) {
        return Err(Error::invalid_argument(format!(
            "{} segment '{}' contains '{}'",
            what, token, bad
        )));
    }
    Ok(())
}

fn validate_node_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_argument("node name is empty"));
    }
    validate_token(name, "node name")
}

/// `""` and `"/"` map to the root; otherwise a leading `/` is added and each
/// segment validated.
fn normalize_namespace(namespace: &str) -> Result<String> {
    if namespace.is_empty() || namespace == "/" {
        return Ok("/".to_string());
    }
    if namespace.ends_with('/') {
        return Err(Error::invalid_argument(format!(
            "namespace '{}' ends with '/'",
            namespace
        )));
    }
    let trimmed = namespace.strip_prefix('/').unwrap_or(namespace);
    for token in trimmed.split('/') {
        validate_token(token, "namespace")?;
    }
    Ok(format!("/{}", trimmed))
}

fn validate_topic_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_argument("topic name is empty"));
    }
    if name.len() > 1 && name.ends_with('/') {
        return Err(Error::invalid_argument(format!(
            "topic name '{}' ends with '/'",
            name
        )));
    }
    let trimmed = name.strip_prefix('/').unwrap_or(name);
    for token in trimmed.split('/') {
        validate_token(token, "topic name")?;
    }
    Ok(())
}
