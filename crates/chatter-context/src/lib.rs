mod assembler;
mod context_input;
mod log;

pub use assembler::{assemble, AgentFamily, AssembledPrompt, DEFAULT_MAX_BYTES};
pub use context_input::{
    get_context_for_agent, get_context_for_route, ContextCandidate, ContextInput, ContextMeta,
    ContextOptions, RouteMeta, SiblingSummary, DEFAULT_MAX_SIBLINGS, DEFAULT_SIBLING_CONTENT_MAX_LENGTH,
    DEFAULT_WINDOW,
};
pub use log::{ContextError, MessageLog};
