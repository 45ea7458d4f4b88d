//! Authentication and authorization guards

// Principal, decisions and token extraction
pub mod token;

// JWT verification, guards and issuance
pub mod jwt;

pub use token::{
    extract_token, AuthDecision, Principal, TokenValidator, ADMIN_REQUIRED_MESSAGE,
    DEFAULT_TOKEN_HEADER, INVALID_TOKEN_MESSAGE, NOT_ALLOWED_MESSAGE, NO_TOKEN_MESSAGE,
};

pub use jwt::{AuthGuard, TokenClaims, TokenIssuer};
