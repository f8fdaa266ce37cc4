//! The compiler's analysis passes.
//!
//! Pass 1 ([`registration`]) builds the symbol tables; pass 1.5
//! ([`inheritance`]) linearizes and merges them. Pass 2 (the function
//! compiler) type-checks and lowers bodies in one walk.

pub mod inheritance;
pub mod registration;

pub use inheritance::resolve_inheritance;
pub use registration::build_registry;
