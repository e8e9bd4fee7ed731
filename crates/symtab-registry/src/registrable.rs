//! Objects that can be persisted under a durable name.

use symtab_core::handle::RemoteHandle;

/// A logical object spanning one or more server symbols.
///
/// `component_names()` and `registered_names(name)` are positionally
/// aligned: component `i` is registered as `registered_names(name)[i]`.
pub trait Registrable: Sized {
    /// Current logical name, used in error reports.
    fn label(&self) -> String;

    /// Every server name this object spans right now.
    fn component_names(&self) -> Vec<String>;

    /// The names the components take once registered as `name`.
    fn registered_names(&self, name: &str) -> Vec<String>;

    /// The same object under its registered identity.
    fn with_name(self, name: &str) -> Self;

    /// Components whose registration status must agree.
    ///
    /// Defaults to every component. Optional auxiliary symbols that may be
    /// materialized lazily are left out.
    fn required_names(&self) -> Vec<String> {
        self.component_names()
    }
}

impl Registrable for RemoteHandle {
    fn label(&self) -> String {
        self.name().to_string()
    }

    fn component_names(&self) -> Vec<String> {
        self.all_names()
    }

    fn registered_names(&self, name: &str) -> Vec<String> {
        RemoteHandle::registered_names(self, name)
    }

    fn with_name(self, name: &str) -> Self {
        self.renamed(name)
    }

    fn required_names(&self) -> Vec<String> {
        RemoteHandle::component_names(self).to_vec()
    }
}
