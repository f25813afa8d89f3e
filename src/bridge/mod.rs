//! The request lifecycle manager.
//!
//! Owns the single process-wide request state and drives the
//! accept/finish/filter-data protocol against the transport, publishing
//! channels and environment variables into the host runtime around each
//! cycle boundary.

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

mod channel;
mod env;

pub use channel::{Channel, ChannelError};

use channel::StreamBinding;

use crate::host::HostRuntime;
use crate::transport::{AcceptResult, StreamRole, Transport};

/// Default flush threshold for the output and error streams, in bytes.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 128 * 1024;

/// How the process was invoked, resolved on the first accept and immutable
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunMode {
    /// Plain CGI child: exactly one implicit request, served over the
    /// process's own standard streams.
    Cgi,
    /// FastCGI application: requests arrive through the transport for the
    /// life of the process.
    FastCgi,
}

/// Result of [`FcgiBridge::accept`], as seen by the serving loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AcceptStatus {
    /// A request is bound and ready to serve; carries the transport's
    /// non-negative accept result.
    Accepted(i32),
    /// Running as plain CGI and the single request has already been served.
    /// No stream or environment state was touched.
    CgiDone,
    /// The transport is shutting down; carries its negative result code.
    /// The serving loop must stop.
    Shutdown(i32),
}

impl AcceptStatus {
    /// The scripting-visible integer for this status. [`CgiDone`] maps to
    /// the conventional end-of-input sentinel, -1.
    ///
    /// [`CgiDone`]: AcceptStatus::CgiDone
    #[must_use]
    pub fn as_code(self) -> i32 {
        match self {
            Self::Accepted(id) => id,
            Self::CgiDone => -1,
            Self::Shutdown(code) => code,
        }
    }
}

/// Adapts a FastCGI request cycle into byte channels and lifecycle
/// operations for a host scripting runtime.
///
/// One bridge serves one request at a time, start to finish, on the calling
/// thread; [`accept`](Self::accept) is the sole blocking point. The bridge
/// is an ordinary owned value, so tests can run any number of independent
/// instances.
pub struct FcgiBridge<T, H> {
    transport: T,
    host: H,
    accept_called: bool,
    accept_succeeded: bool,
    channels_created: bool,
    run_mode: Option<RunMode>,
    env: Vec<String>,
    bindings: [StreamBinding; 3],
    flush_threshold: usize,
}

impl<T: Transport, H: HostRuntime> FcgiBridge<T, H> {
    /// Creates a bridge over a transport and host, with the default flush
    /// threshold.
    pub fn new(transport: T, host: H) -> Self {
        Self {
            transport,
            host,
            accept_called: false,
            accept_succeeded: false,
            channels_created: false,
            run_mode: None,
            env: Vec::new(),
            bindings: [StreamBinding::default(); 3],
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }

    /// How the process was invoked; `None` until the first accept resolves
    /// it.
    #[must_use]
    pub fn run_mode(&self) -> Option<RunMode> {
        self.run_mode
    }

    /// The `key=value` environment snapshot of the currently bound request.
    /// Empty between requests.
    #[must_use]
    pub fn request_env(&self) -> &[String] {
        &self.env
    }

    /// Shared flush threshold used by the output and error channels.
    #[must_use]
    pub fn flush_threshold(&self) -> usize {
        self.flush_threshold
    }

    /// Replaces the shared flush threshold. Takes effect on the next write.
    pub fn set_flush_threshold(&mut self, bytes: usize) {
        self.flush_threshold = bytes;
    }

    /// The host runtime, for inspection.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host runtime, e.g. to drive the interpreter
    /// between accept and finish.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The transport, for inspection.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Borrows one of the three streams as a byte channel.
    ///
    /// The channel resolves the current handle through the transport at
    /// call time; holding one across an accept or finish is impossible by
    /// construction.
    pub fn channel(&mut self, role: StreamRole) -> Channel<'_, T> {
        Channel::new(
            role,
            self.channels_created,
            &mut self.bindings[role.index()],
            &mut self.transport,
            self.flush_threshold,
        )
    }

    /// Accepts the next request, blocking until the transport delivers one.
    ///
    /// The first call resolves whether the process runs as CGI or FastCGI.
    /// Under CGI the single implicit request is reported once and every
    /// later call returns [`AcceptStatus::CgiDone`] without side effects.
    /// Under FastCGI the previous request's environment is removed and the
    /// output channel flushed before the transport accept; on success the
    /// new environment is applied and, on the first cycle only, the three
    /// channels are registered with the host. A [`AcceptStatus::Shutdown`]
    /// result leaves environment and channels untouched.
    pub fn accept(&mut self) -> AcceptStatus {
        let first_call = !self.accept_called;
        if first_call {
            let mode = if self.transport.is_cgi() {
                RunMode::Cgi
            } else {
                RunMode::FastCgi
            };
            self.run_mode = Some(mode);
            self.accept_called = true;

            #[cfg(feature = "tracing")]
            debug!(?mode, "Run mode resolved");
        } else if self.run_mode == Some(RunMode::Cgi) {
            return AcceptStatus::CgiDone;
        }

        if self.run_mode == Some(RunMode::Cgi) {
            // The CGI child keeps its own stdin/stdout/stderr; nothing to
            // bind.
            return AcceptStatus::Accepted(1);
        }

        // Tear down the completed request's variables before blocking, and
        // push out whatever the output channel still counts as pending.
        if !self.env.is_empty() {
            let previous = std::mem::take(&mut self.env);
            env::remove(&mut self.host, &previous);
        }
        self.channel(StreamRole::Output).flush();

        match self.transport.accept() {
            AcceptResult::Accepted { id, env } => {
                if first_call {
                    for role in StreamRole::ALL {
                        self.host.bind_channel(role);
                    }
                    self.channels_created = true;
                }

                #[cfg(feature = "tracing")]
                trace!(id, vars = env.len(), "Request accepted");

                env::apply(&mut self.host, &env);
                self.env = env;
                self.accept_succeeded = true;
                AcceptStatus::Accepted(id)
            }
            AcceptResult::Shutdown(code) => {
                #[cfg(feature = "tracing")]
                debug!(code, "Transport shutdown");

                AcceptStatus::Shutdown(code)
            }
        }
    }

    /// Finishes the current request.
    ///
    /// Removes the bound environment, detaches the three channels from the
    /// host (zeroing their pending counters), and tears down the transport
    /// connection. When no accept ever succeeded, or the process runs as
    /// CGI, there is no connection and the transport is left alone.
    /// Best-effort: always succeeds.
    pub fn finish(&mut self) {
        if !self.env.is_empty() {
            let previous = std::mem::take(&mut self.env);
            env::remove(&mut self.host, &previous);
        }

        for role in StreamRole::ALL {
            self.host.unbind_channel(role);
            self.bindings[role.index()].reset();
        }

        if self.accept_succeeded && self.run_mode == Some(RunMode::FastCgi) {
            #[cfg(feature = "tracing")]
            trace!("Transport finish");

            self.transport.finish();
        }
    }

    /// Forwards the application exit status for the current request to the
    /// transport.
    pub fn set_exit_status(&mut self, status: i32) {
        self.transport.set_exit_status(status);
    }

    /// Switches a filter-role request to its filter-data phase.
    ///
    /// The input channel may have reached end-of-file during the main body
    /// phase, so it is detached and re-registered with the host before the
    /// transport continuation runs.
    pub fn start_filter_data(&mut self) -> i32 {
        self.host
            .unbind_channel(StreamRole::Input);
        self.bindings[StreamRole::Input.index()].reset();
        self.host
            .bind_channel(StreamRole::Input);

        self.transport.start_filter_data()
    }
}
