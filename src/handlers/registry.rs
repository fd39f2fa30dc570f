//! Command registry.
//!
//! Two namespaces behind one `RwLock`: lookups share the lock, while `add`,
//! `remove` and default installation take it exclusively. Defaults come from
//! the [`Plugin`]s handed to the registry and are installed on first use.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{Handler, NoopHandler};

/// Which command map a name lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Anyone, with the command prefix.
    Public,
    /// The authenticated master, with the master sub-prefix.
    Privileged,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Public => "public",
            Self::Privileged => "privileged",
        })
    }
}

/// A compiled-in set of commands.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Register this plugin's commands.
    fn register(&self, registrar: &mut Registrar<'_>);
}

type HandlerMap = HashMap<String, Arc<dyn Handler>>;

#[derive(Default)]
struct Tables {
    public: HandlerMap,
    privileged: HandlerMap,
    defaults_installed: bool,
}

impl Tables {
    fn map(&self, ns: Namespace) -> &HandlerMap {
        match ns {
            Namespace::Public => &self.public,
            Namespace::Privileged => &self.privileged,
        }
    }

    fn map_mut(&mut self, ns: Namespace) -> &mut HandlerMap {
        match ns {
            Namespace::Public => &mut self.public,
            Namespace::Privileged => &mut self.privileged,
        }
    }
}

/// Write access handed to [`Plugin::register`]. Never replaces an existing entry.
pub struct Registrar<'a> {
    tables: &'a mut Tables,
    plugin: &'static str,
}

impl Registrar<'_> {
    /// Register `handler` under `name` unless the name is taken. Returns true
    /// when it was inserted.
    pub fn add(&mut self, ns: Namespace, name: &str, handler: Arc<dyn Handler>) -> bool {
        let map = self.tables.map_mut(ns);
        if map.contains_key(name) {
            debug!(plugin = self.plugin, namespace = %ns, name, "keeping existing command");
            return false;
        }
        map.insert(name.to_string(), handler);
        true
    }

    pub fn public(&mut self, name: &str, handler: impl Handler + 'static) -> bool {
        self.add(Namespace::Public, name, Arc::new(handler))
    }

    pub fn privileged(&mut self, name: &str, handler: impl Handler + 'static) -> bool {
        self.add(Namespace::Privileged, name, Arc::new(handler))
    }
}

/// Registry of command handlers.
pub struct Registry {
    tables: RwLock<Tables>,
    plugins: Vec<Box<dyn Plugin>>,
    noop: Arc<dyn Handler>,
}

impl Registry {
    /// Create a registry that installs `plugins` on first use.
    pub fn new(plugins: Vec<Box<dyn Plugin>>) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            plugins,
            noop: Arc::new(NoopHandler),
        }
    }

    /// A registry with the built-in public and master commands.
    pub fn with_builtins() -> Self {
        Self::new(super::builtin_plugins())
    }

    /// Install the plugin defaults. Returns false when they were already
    /// installed; entries added earlier are never overwritten.
    pub fn install_defaults(&self) -> bool {
        let mut tables = self.tables.write();
        self.install_locked(&mut tables)
    }

    fn install_locked(&self, tables: &mut Tables) -> bool {
        if tables.defaults_installed {
            return false;
        }
        for plugin in &self.plugins {
            let mut registrar = Registrar {
                tables: &mut *tables,
                plugin: plugin.name(),
            };
            plugin.register(&mut registrar);
            debug!(plugin = plugin.name(), "plugin installed");
        }
        tables.defaults_installed = true;
        true
    }

    fn ensure_defaults(&self) {
        if !self.tables.read().defaults_installed {
            self.install_defaults();
        }
    }

    /// Register (or replace) a command.
    pub fn add(&self, ns: Namespace, name: impl Into<String>, handler: Arc<dyn Handler>) {
        let mut tables = self.tables.write();
        self.install_locked(&mut tables);
        tables.map_mut(ns).insert(name.into(), handler);
    }

    /// Remove a command. Returns true if it existed.
    pub fn remove(&self, ns: Namespace, name: &str) -> bool {
        let mut tables = self.tables.write();
        self.install_locked(&mut tables);
        tables.map_mut(ns).remove(name).is_some()
    }

    /// Look up a command; unknown names get a handler that does nothing.
    pub fn get(&self, ns: Namespace, name: &str) -> Arc<dyn Handler> {
        self.lookup(ns, name).unwrap_or_else(|| Arc::clone(&self.noop))
    }

    /// Look up a command, `None` when unknown.
    pub fn lookup(&self, ns: Namespace, name: &str) -> Option<Arc<dyn Handler>> {
        self.ensure_defaults();
        self.tables.read().map(ns).get(name).cloned()
    }

    pub fn is_known(&self, ns: Namespace, name: &str) -> bool {
        self.ensure_defaults();
        self.tables.read().map(ns).contains_key(name)
    }

    /// Command names in `ns`, sorted.
    pub fn names(&self, ns: Namespace) -> Vec<String> {
        self.ensure_defaults();
        let mut names: Vec<String> = self.tables.read().map(ns).keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerResult;
    use crate::handlers::Context;
    use async_trait::async_trait;

    struct Stub;

    #[async_trait]
    impl Handler for Stub {
        async fn handle(&self, _ctx: &Context<'_>) -> HandlerResult {
            Ok(())
        }
    }

    struct TwoCommands;

    impl Plugin for TwoCommands {
        fn name(&self) -> &'static str {
            "two"
        }

        fn register(&self, r: &mut Registrar<'_>) {
            r.public("echo", Stub);
            r.public("help", Stub);
            r.privileged("echo", Stub);
        }
    }

    fn registry() -> Registry {
        Registry::new(vec![Box::new(TwoCommands)])
    }

    #[test]
    fn test_defaults_installed_lazily() {
        let reg = registry();
        assert_eq!(reg.names(Namespace::Public), vec!["echo", "help"]);
        assert_eq!(reg.names(Namespace::Privileged), vec!["echo"]);
        // already installed by the lookup above
        assert!(!reg.install_defaults());
    }

    #[test]
    fn test_install_twice_is_noop() {
        let reg = registry();
        assert!(reg.install_defaults());
        assert!(!reg.install_defaults());
        assert_eq!(reg.names(Namespace::Public).len(), 2);
    }

    #[test]
    fn test_install_keeps_caller_entries() {
        let reg = registry();
        let custom: Arc<dyn Handler> = Arc::new(Stub);
        {
            // simulate an entry present before defaults are installed
            let mut tables = reg.tables.write();
            tables.public.insert("echo".to_string(), Arc::clone(&custom));
        }
        assert!(reg.install_defaults());
        let got = reg.get(Namespace::Public, "echo");
        assert!(Arc::ptr_eq(&got, &custom));
    }

    #[test]
    fn test_add_and_remove() {
        let reg = registry();
        reg.add(Namespace::Public, "hello", Arc::new(Stub));
        assert!(reg.is_known(Namespace::Public, "hello"));
        assert!(!reg.is_known(Namespace::Privileged, "hello"));
        assert!(reg.remove(Namespace::Public, "hello"));
        assert!(!reg.remove(Namespace::Public, "hello"));
        assert!(!reg.is_known(Namespace::Public, "hello"));
    }

    #[test]
    fn test_add_after_install_replaces() {
        let reg = registry();
        let custom: Arc<dyn Handler> = Arc::new(Stub);
        reg.add(Namespace::Public, "echo", Arc::clone(&custom));
        assert!(Arc::ptr_eq(&reg.get(Namespace::Public, "echo"), &custom));
        assert_eq!(reg.names(Namespace::Public).len(), 2);
    }

    #[test]
    fn test_unknown_gets_noop() {
        let reg = registry();
        assert!(reg.lookup(Namespace::Public, "missing").is_none());
        let a = reg.get(Namespace::Public, "missing");
        let b = reg.get(Namespace::Privileged, "also-missing");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let reg = registry();
        let public = reg.get(Namespace::Public, "echo");
        let privileged = reg.get(Namespace::Privileged, "echo");
        assert!(!Arc::ptr_eq(&public, &privileged));
    }

    #[test]
    fn test_builtin_names() {
        let reg = Registry::with_builtins();
        let public = reg.names(Namespace::Public);
        for name in ["about", "define", "echo", "help", "karma", "quiet", "seen", "up", "uptime"] {
            assert!(public.contains(&name.to_string()), "missing public {name}");
        }
        let master = reg.names(Namespace::Privileged);
        for name in ["do", "help", "join", "part", "q", "quit", "r", "set"] {
            assert!(master.contains(&name.to_string()), "missing master {name}");
        }
    }
}
