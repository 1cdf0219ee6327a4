//! Authentication and user store delegated to an external identity provider.
//!
//! - [`IdentityProvider`] - trait used by the auth service
//! - [`SupabaseIdentity`] - GoTrue REST implementation

mod provider;
mod supabase;

pub use provider::{IdentityProvider, IdentityUser, Session, SignUpOutcome};
pub use supabase::SupabaseIdentity;

#[cfg(test)]
pub use provider::MockIdentityProvider;
