// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role-based ability engine for the SaaS back end.
//!
//! A caller resolves the actor's role, the policy table builds an [`Ability`]
//! for that actor, and route handlers ask the ability whether an action is
//! permitted on a subject type or on a concrete, tagged resource instance.
//!
//! ```text
//! Actor { id, role } ──► PolicyTable::resolve(role) ──► AbilityBuilder ──► Ability
//!                                                                            │
//!          can(action, SubjectType | &TaggedInstance) ◄──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use saas_auth::{build_ability, Action, Actor, OrgId, ProjectId, Role, SubjectType, TaggedInstance, UserId};
//!
//! let actor = Actor::new(UserId::generate(), Role::Member);
//! let ability = build_ability(&actor)?;
//!
//! assert!(ability.can(Action::Create, SubjectType::Project)?);
//!
//! let project = TaggedInstance::project(ProjectId::generate(), actor.id, OrgId::generate());
//! assert!(ability.can(Action::Update, &project)?);
//! # Ok::<(), saas_auth::AuthzError>(())
//! ```
//!
//! Denials are ordinary `Ok(false)` values. Errors are reserved for policy
//! wiring bugs (unknown role, invalid rule) and malformed queries.

pub mod abac;
pub mod authorizer;
pub mod error;
pub mod types;

pub use abac::{
	build_ability, standard_table, Ability, AbilityBuilder, Action, Attribute, AuthSubject,
	Condition, Decision, Effect, PolicyFn, PolicyTable, Rule, RuleRef, SubjectQuery, SubjectType,
	TaggedInstance,
};
pub use authorizer::{Authorizer, PolicySettings};
pub use error::{AuthzError, Result};
pub use types::{Actor, InviteId, OrgId, ProjectId, Role, UserId};
