// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route access policy and the authorization middleware.
//!
//! The policy is an ordered rule table. The first rule whose method and
//! pattern match a request decides its requirement; a request that matches
//! no rule requires an authenticated identity.
//!
//! | Method | Pattern | Requirement |
//! |--------|---------|-------------|
//! | OPTIONS | `/**` | public |
//! | any | `/api/auth/**` | public |
//! | any | `/error`, `/favicon.ico` | public |
//! | any | `/v3/api-docs/**`, `/swagger-ui/**`, `/swagger-ui.html` | public |
//! | any | `/actuator/health` | public |
//! | any | `/api/churn/test/**` | public |
//! | any | `/api/churn/history/all` | `ADMIN` |
//! | any | `/api/admin/**` | `ADMIN` |
//! | any | `/api/stats/**` | `ADMIN` |
//! | any | anything else | authenticated |

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AuthError, AuthenticatedUser, Role};
use crate::state::AppState;

/// What a request must carry to reach a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// No identity needed
    Public,
    /// Any authenticated identity
    Authenticated,
    /// An identity holding the role
    Role(Role),
}

/// Path matcher used by policy rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPattern {
    /// Every path (`/**`)
    Any,
    /// Exactly this path
    Exact(&'static str),
    /// This path and everything beneath it (`/prefix/**`)
    Subtree(&'static str),
}

impl PathPattern {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Any => true,
            PathPattern::Exact(exact) => path == *exact,
            PathPattern::Subtree(prefix) => match path.strip_prefix(prefix) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }
}

/// A single policy entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Restrict the rule to one method; `None` matches every method
    pub method: Option<Method>,
    pub pattern: PathPattern,
    pub requirement: Requirement,
}

impl Rule {
    pub fn public(pattern: PathPattern) -> Self {
        Self {
            method: None,
            pattern,
            requirement: Requirement::Public,
        }
    }

    pub fn role(pattern: PathPattern, role: Role) -> Self {
        Self {
            method: None,
            pattern,
            requirement: Requirement::Role(role),
        }
    }

    pub fn for_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    fn matches(&self, method: &Method, path: &str) -> bool {
        self.method.as_ref().is_none_or(|m| m == method) && self.pattern.matches(path)
    }
}

/// Ordered route policy.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<Rule>,
}

impl AccessPolicy {
    /// Build a policy from rules evaluated top to bottom.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The service's route table.
    pub fn standard() -> Self {
        use PathPattern::{Any, Exact, Subtree};

        Self::new(vec![
            // CORS pre-flight
            Rule::public(Any).for_method(Method::OPTIONS),
            Rule::public(Subtree("/api/auth")),
            Rule::public(Exact("/error")),
            Rule::public(Exact("/favicon.ico")),
            Rule::public(Subtree("/v3/api-docs")),
            Rule::public(Subtree("/swagger-ui")),
            Rule::public(Exact("/swagger-ui.html")),
            Rule::public(Exact("/actuator/health")),
            Rule::public(Subtree("/api/churn/test")),
            Rule::role(Exact("/api/churn/history/all"), Role::Admin),
            Rule::role(Subtree("/api/admin"), Role::Admin),
            Rule::role(Subtree("/api/stats"), Role::Admin),
        ])
    }

    /// Requirement of the first matching rule, or `Authenticated`.
    pub fn requirement_for(&self, method: &Method, path: &str) -> Requirement {
        self.rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .map(|rule| rule.requirement)
            .unwrap_or(Requirement::Authenticated)
    }

    pub fn is_public(&self, method: &Method, path: &str) -> bool {
        self.requirement_for(method, path) == Requirement::Public
    }

    /// Decide whether `user` may reach `method path`.
    ///
    /// No identity on a protected route is `MissingAuthentication` (401);
    /// an identity without the required role is `InsufficientPermissions`
    /// (403).
    pub fn authorize(
        &self,
        method: &Method,
        path: &str,
        user: Option<&AuthenticatedUser>,
    ) -> Result<(), AuthError> {
        match (self.requirement_for(method, path), user) {
            (Requirement::Public, _) => Ok(()),
            (_, None) => Err(AuthError::MissingAuthentication),
            (Requirement::Authenticated, Some(_)) => Ok(()),
            (Requirement::Role(role), Some(user)) if user.has_role(role) => Ok(()),
            (Requirement::Role(_), Some(_)) => Err(AuthError::InsufficientPermissions),
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Authorization middleware.
///
/// Runs after the gatekeeper and enforces the access policy against
/// whatever identity (if any) it installed.
pub async fn enforce(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let user = request.extensions().get::<AuthenticatedUser>();
    match state
        .policy
        .authorize(request.method(), request.uri().path(), user)
    {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::info!(
                method = %request.method(),
                path = %request.uri().path(),
                user = user.map(|u| u.username.as_str()).unwrap_or("-"),
                reason = e.kind(),
                "Request denied by access policy"
            );
            e.into_response()
        }
    }
}
