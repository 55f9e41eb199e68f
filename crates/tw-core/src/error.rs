use crate::key::AgentId;

/// Alias for `Result<T, StateError>`.
pub type StateResult<T> = Result<T, StateError>;

/// Errors raised while reading or mutating agent state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    /// A property was touched through a handle that is not bound to an instance.
    #[error("agent {0} accessed before activation")]
    AccessBeforeActivation(AgentId),

    /// The identity has neither a static template nor an instance diff.
    #[error("unknown agent id: {0}")]
    UnknownAgentId(AgentId),

    /// The agent already has a static template.
    #[error("agent {0} is already static")]
    AgentAlreadyStatic(AgentId),

    /// The agent is bound into an instance and can no longer become static.
    #[error("agent {0} is already bound to an instance")]
    AgentAlreadyBound(AgentId),

    /// A key provider was asked to hand out a value it already issued or reserved.
    #[error("identity collision: {token} -> {value}")]
    IdentityCollision {
        /// The sentinel token, or `"generated"` when resuming a counter.
        token: String,
        /// The colliding raw value.
        value: u64,
    },
}
