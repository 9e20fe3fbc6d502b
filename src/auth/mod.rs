// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication and role-based authorization for the API.
//!
//! ## Request Flow
//!
//! 1. Client logs in at `/api/auth/login` and receives a signed token
//! 2. Client sends `Authorization: Bearer <token>` on later requests
//! 3. Gatekeeper ([`middleware::authenticate`]):
//!    - Verifies signature and expiry with the [`TokenService`]
//!    - Loads the subject's principal through an [`IdentityLoader`]
//!    - Attaches an [`AuthenticatedUser`] to the request, or nothing
//! 4. Authorization ([`policy::enforce`]) consults the [`AccessPolicy`]:
//!    - `401` when a protected route has no identity
//!    - `403` when the identity lacks the route's role
//!
//! ## Security
//!
//! - Tokens are HS512 JWTs with a fixed 24 hour lifetime
//! - The reason a token was refused is logged, never returned
//! - Passwords are stored as Argon2id PHC strings

pub mod claims;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod principal;
pub mod roles;
pub mod token;

pub use claims::{AuthenticatedUser, TokenClaims};
pub use error::{AuthError, TokenError};
pub use extractor::{AdminOnly, Auth};
pub use policy::{AccessPolicy, Requirement};
pub use principal::{IdentityLoader, Principal};
pub use roles::Role;
pub use token::{IssuedToken, TokenService};
