pub mod registry;
pub mod router;
pub mod smart_router;
pub mod traits;

// Re-exports for convenience.
pub use registry::{ModelRegistry, RouterStartupPolicy};
pub use router::ModelRouter;
pub use smart_router::{classify, RoutingIntent};
pub use traits::{GenerateOptions, GenerateResult, Usage};
