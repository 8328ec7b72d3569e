// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ability construction and evaluation.
//!
//! - [`types`]: the subject registry (subjects, actions, condition attributes)
//! - [`rule`]: grant/revoke rules and their condition predicates
//! - [`builder`]: accumulates rules and freezes them into an [`Ability`]
//! - [`engine`]: evaluates queries against an ability
//! - [`instance`]: tagged resource instances
//! - [`policies`]: the role → rules table
//!
//! All evaluation is pure: no database access, no I/O. Everything an
//! evaluation needs is captured in the ability or the tagged instance.

pub mod builder;
pub mod engine;
pub mod instance;
pub mod policies;
pub mod rule;
pub mod types;

pub use builder::{AbilityBuilder, RuleRef};
pub use engine::{Ability, Decision, SubjectQuery};
pub use instance::{AuthSubject, TaggedInstance};
pub use policies::{build_ability, standard_table, PolicyFn, PolicyTable};
pub use rule::{Condition, Effect, Rule};
pub use types::{Action, Attribute, SubjectType};
