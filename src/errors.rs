use uuid::Uuid;

/// All error types that can occur while driving the device fleet.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport exchange with a bulb failed (timeout, unreachable,
    /// malformed response). Never fatal; the device is marked disconnected
    /// and the next poll cycle retries.
    #[error("transport {action} error: {err:?}")]
    Transport { action: String, err: std::io::Error },

    /// The specified device id is not registered.
    #[error("unknown device {0}")]
    UnknownDevice(Uuid),

    /// The device's MAC has not yet been resolved to a network location.
    #[error("device {mac} has not been discovered yet")]
    Unresolved { mac: String },

    /// The device is administratively disabled; commands short-circuit.
    #[error("device {0} is not enabled")]
    Disabled(Uuid),

    /// A command parameter failed boundary validation before enqueue.
    #[error("invalid value {value} for {name}")]
    InvalidParameter { name: &'static str, value: String },

    /// The dispatcher did not observe the stop sentinel within the join
    /// timeout during shutdown.
    #[error("dispatcher did not stop within {0:?}")]
    ShutdownTimeout(std::time::Duration),
}

impl Error {
    /// Create a new transport error.
    pub fn transport(action: &str, err: std::io::Error) -> Self {
        Error::Transport {
            action: action.to_string(),
            err,
        }
    }

    /// Create a transport timeout error.
    pub fn timeout(action: &str) -> Self {
        Error::Transport {
            action: action.to_string(),
            err: std::io::Error::new(std::io::ErrorKind::TimedOut, "no response"),
        }
    }

    /// Create a new invalid parameter error.
    pub fn invalid_parameter(name: &'static str, value: impl ToString) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
        }
    }

    /// Whether this error indicates a failed device exchange (as opposed to
    /// a caller mistake).
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
