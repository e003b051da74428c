use hickory_proto::op::ResponseCode;
use thiserror::Error;

/// Failure reported by a handler in a plugin chain.
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("plugin/{plugin}: {reason}")]
    Failed {
        plugin: String,
        rcode: Option<ResponseCode>,
        reason: String,
    },

    #[error("no next plugin found")]
    NoNextPlugin,

    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),

    #[error(transparent)]
    Dso(#[from] crate::dso::DsoError),
}

impl PluginError {
    pub fn failed(plugin: &str, reason: impl Into<String>) -> Self {
        Self::Failed {
            plugin: plugin.to_string(),
            rcode: None,
            reason: reason.into(),
        }
    }

    pub fn with_rcode(plugin: &str, rcode: ResponseCode, reason: impl Into<String>) -> Self {
        Self::Failed {
            plugin: plugin.to_string(),
            rcode: Some(rcode),
            reason: reason.into(),
        }
    }

    /// Response code the server answers with when this error ends a chain.
    pub fn rcode(&self) -> ResponseCode {
        match self {
            Self::Failed {
                rcode: Some(rcode), ..
            } => *rcode,
            _ => ResponseCode::ServFail,
        }
    }
}

/// Whether a chain that returned `rcode` already wrote the client reply.
///
/// These four codes mean "nothing was written, answer for me"; every other
/// code means the chain wrote its own response.
pub fn client_wrote(rcode: ResponseCode) -> bool {
    !matches!(
        rcode,
        ResponseCode::ServFail
            | ResponseCode::Refused
            | ResponseCode::FormErr
            | ResponseCode::NotImp
    )
}
