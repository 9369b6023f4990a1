pub mod types;
pub mod schema;
pub mod parser;
pub mod scope;
pub mod prompts;
pub mod ollama;

pub use types::*;
pub use schema::*;
pub use parser::*;
pub use scope::*;
pub use ollama::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Ollama is not running at {0}")]
    Connection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Malformed oracle response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("{schema} response is missing keys: {missing:?}")]
    SchemaMismatch {
        schema: &'static str,
        missing: Vec<String>,
    },

    #[error("{schema} response has an invalid `{key}` value")]
    InvalidValue { schema: &'static str, key: &'static str },

    #[error("Canned failure: {0}")]
    Scripted(String),
}
