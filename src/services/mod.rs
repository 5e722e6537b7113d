pub mod csv;
pub mod llm_agent;
