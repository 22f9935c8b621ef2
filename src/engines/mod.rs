//! Concrete extraction engines. These sit outside the pure pipeline core and
//! are the only code that talks to the network.

pub mod ollama;

pub use ollama::OllamaGenerativeEngine;
