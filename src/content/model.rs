use serde::{Deserialize, Serialize};

/// A fixed line of demo dialogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedLine {
    pub speaker: String,
    pub text: String,
}

/// A case-manager line and the counterpart's reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPair {
    pub cm: String,
    pub response: String,
}

/// Demo dialogue for one stakeholder role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueScript {
    /// Greeting exchange shown as soon as the call starts
    pub opening: Vec<ScriptedLine>,
    /// Pairs dripped by the timeline scheduler
    pub pairs: Vec<ScriptPair>,
}
