use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("node '{name}' already exists")]
    DuplicateNode { name: String },

    #[error("unknown node: {name}")]
    UnknownNode { name: String },

    #[error("unknown parent '{parent}' for node '{node}'")]
    UnknownParent { node: String, parent: String },

    #[error("cannot parent '{node}' under '{parent}': '{parent}' is the node itself or one of its descendants")]
    ParentCycle { node: String, parent: String },

    #[error("dependency cycle detected between nodes: {}", nodes.join(", "))]
    CycleDetected { nodes: Vec<String> },

    #[error("invalid value: {message}")]
    InvalidValue { message: String },

    #[error("invalid chain: {message}")]
    InvalidChain { message: String },

    #[cfg(feature = "json")]
    #[error("failed to parse rig JSON: {message}")]
    JsonParse { message: String },

    #[cfg(feature = "json")]
    #[error("unknown parent '{parent}' for node '{node}'")]
    JsonUnknownParent { node: String, parent: String },

    #[cfg(feature = "json")]
    #[error("unknown node '{node}' referenced by constraint on '{constraint}'")]
    JsonUnknownConstraintNode { constraint: String, node: String },
}
