pub mod challenge;
pub mod context;
pub mod error;
pub mod identity;
pub mod jwt;
pub mod signer;
pub mod tenancy;

pub use challenge::{
    ChallengeService, ChallengeStore, InMemoryChallengeStore, RedisChallengeStore,
};
pub use context::ContextService;
pub use error::ServiceError;
pub use identity::IdentityService;
pub use jwt::{JwtService, SessionClaims};
pub use tenancy::TenancyService;
