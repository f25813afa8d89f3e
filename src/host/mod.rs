//! Contract for the embedding scripting runtime.
//!
//! The bridge publishes two things into its host: the three byte channels
//! of the active request, and the request's environment variables. How the
//! host surfaces those to scripts (channel tables, interpreter globals,
//! superglobal arrays) is its own business; the bridge only drives the
//! notifications below in a fixed order around each accept/finish boundary.

use crate::transport::StreamRole;

/// The host scripting runtime's variable namespace and channel registry.
///
/// All methods must be idempotent per key/role: re-setting a variable
/// overwrites it, unsetting an absent variable is a no-op, and unbinding a
/// channel that was never bound is a no-op.
pub trait HostRuntime {
    /// Sets a request-scoped variable in the host's global namespace.
    fn set_global(&mut self, name: &str, value: &str);

    /// Removes a request-scoped variable from the host's global namespace.
    fn unset_global(&mut self, name: &str);

    /// Registers the channel for `role` as the host's active stream in that
    /// slot (stdin/stdout/stderr), replacing whatever was there before.
    fn bind_channel(&mut self, role: StreamRole);

    /// Detaches the channel for `role` from the host.
    fn unbind_channel(&mut self, role: StreamRole);
}
