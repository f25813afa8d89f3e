//! The scripting-visible command surface.
//!
//! Hosts register these five command names with their interpreter and route
//! invocations through [`dispatch`]. Argument checking happens here, before
//! any lifecycle state is touched; the bridge itself only ever sees typed
//! arguments.

use thiserror::Error;

use crate::bridge::FcgiBridge;
use crate::host::HostRuntime;
use crate::transport::Transport;

/// The command names a host should register, in registration order.
pub const COMMAND_NAMES: [&str; 5] = [
    "FCGI_Accept",
    "FCGI_Finish",
    "FCGI_SetExitStatus",
    "FCGI_StartFilterData",
    "FCGI_SetBufSize",
];

/// Version string for the host's package-provide step.
pub const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors reported back to the interpreter. None of these mutate bridge
/// state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CommandError {
    /// The command was invoked with the wrong number of arguments.
    #[error("wrong # args: should be \"{usage}\"")]
    WrongArgCount {
        /// Canonical usage line for the failing command.
        usage: &'static str,
    },

    /// An argument that must be an integer was not one.
    #[error("expected integer but got \"{value}\"")]
    NotAnInteger {
        /// The offending argument, verbatim.
        value: String,
    },

    /// A buffer size below zero is meaningless.
    #[error("buffer size must be non-negative, got {0}")]
    NegativeSize(i64),

    /// The command name is not part of this surface.
    #[error("unknown command \"{0}\"")]
    UnknownCommand(String),
}

/// Routes one host command invocation to the bridge.
///
/// Returns the integer result the interpreter should report. `FCGI_Accept`
/// maps [`AcceptStatus`](crate::AcceptStatus) through
/// [`as_code`](crate::AcceptStatus::as_code), so a CGI process that has
/// served its request reports the -1 end-of-input sentinel. Extra
/// arguments to the zero-argument commands are ignored, matching the
/// historical surface.
pub fn dispatch<T: Transport, H: HostRuntime>(
    bridge: &mut FcgiBridge<T, H>,
    name: &str,
    args: &[&str],
) -> Result<i64, CommandError> {
    match name {
        "FCGI_Accept" => Ok(i64::from(bridge.accept().as_code())),

        "FCGI_Finish" => {
            bridge.finish();
            Ok(0)
        }

        "FCGI_SetExitStatus" => {
            let [status] = args else {
                return Err(CommandError::WrongArgCount {
                    usage: "FCGI_SetExitStatus status",
                });
            };
            let status = parse_int(status)?;
            let status = i32::try_from(status).map_err(|_| {
                CommandError::NotAnInteger {
                    value: status.to_string(),
                }
            })?;
            bridge.set_exit_status(status);
            Ok(0)
        }

        "FCGI_StartFilterData" => Ok(i64::from(bridge.start_filter_data())),

        "FCGI_SetBufSize" => match args {
            [] => Ok(bridge.flush_threshold() as i64),
            [size] => {
                let requested = parse_int(size)?;
                let bytes = usize::try_from(requested)
                    .map_err(|_| CommandError::NegativeSize(requested))?;
                bridge.set_flush_threshold(bytes);
                Ok(requested)
            }
            _ => Err(CommandError::WrongArgCount {
                usage: "FCGI_SetBufSize ?size?",
            }),
        },

        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

fn parse_int(value: &str) -> Result<i64, CommandError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| CommandError::NotAnInteger {
            value: value.to_string(),
        })
}
