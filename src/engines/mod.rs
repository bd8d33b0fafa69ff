//! Concrete engine adapters
//!
//! Each adapter decides its own availability at construction time; the
//! manager's initialization loop tolerates individual failures and simply
//! omits the engine from the registry.

pub mod cloud;
pub mod coqui;
pub mod fallback;
pub mod piper;

pub use cloud::CloudEngine;
pub use coqui::CoquiEngine;
pub use fallback::FallbackEngine;
pub use piper::PiperEngine;
