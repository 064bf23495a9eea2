// Analysis orchestration: the staged recommendation pipeline and the
// single-text bulk analysis it sits next to.
// All LLM calls go through provider adapters wrapped in the backoff executor —
// no direct HTTP from this module.

pub mod pipeline;
pub mod prompts;
pub mod state;
pub mod tasks;
