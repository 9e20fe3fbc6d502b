// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ChurnInsight Gateway - Role-gated HTTP API
//!
//! This crate serves the ChurnInsight HTTP API behind stateless bearer-token
//! authentication and a route-level role policy, and converges the role and
//! admin-account baseline at startup.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Tokens, gatekeeper and access policy
//! - `bootstrap` - Startup reconciliation of roles and the admin account
//! - `prediction` - Churn prediction backend seam
//! - `storage` - Credential store (redb)

pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod prediction;
pub mod state;
pub mod storage;
