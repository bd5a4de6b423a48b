/// Backend context tokens from one completed turn.
///
/// Both ids always come from the same turn, so they travel as one value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Continuation {
    /// Opaque id of the backend's stored conversation.
    pub conversation_id: String,
    /// Opaque id of the most recent backend-generated turn.
    pub turn_id: String,
}

/// Normalized request for a single backend call.
#[derive(Clone, Debug)]
pub struct CompletionRequest {
    pub prompt: String,
    /// `None` starts a new thread.
    pub continuation: Option<Continuation>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub conversation_id: String,
    pub turn_id: String,
}
