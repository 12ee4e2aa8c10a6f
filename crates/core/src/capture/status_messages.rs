/// Operator-facing prompts, indexed by the number of shots taken so far.
#[derive(Debug, Clone)]
pub struct StatusMessages {
    messages: Vec<String>,
}

impl StatusMessages {
    /// Message after `shots_taken` shots; past the end, the last one.
    pub fn for_shots(&self, shots_taken: usize) -> &str {
        let index = shots_taken.min(self.messages.len() - 1);
        &self.messages[index]
    }
}

impl Default for StatusMessages {
    fn default() -> Self {
        Self {
            messages: vec![
                "Press SPACE to start...".to_string(),
                "Another one?".to_string(),
                "Last one!!!".to_string(),
                "Done!!! Press SPACE to start again...".to_string(),
            ],
        }
    }
}
