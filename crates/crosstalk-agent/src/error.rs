use crosstalk_llm::LlmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("chat completion failed: {0}")]
    Llm(#[from] LlmError),

    #[error("agent stopped after {0} steps without a final answer")]
    StepLimit(usize),
}
