// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ability evaluation.
//!
//! An [`Ability`] is an immutable, ordered rule list. A query names an action
//! and either a bare subject type or a tagged instance. Evaluation scans the
//! rules in authored order with a running decision that starts at "denied":
//!
//! 1. A rule is relevant when its subject is the queried type (or `all`) and
//!    its actions include the queried action (or `manage`).
//! 2. An unconditional relevant rule sets the decision to its effect.
//! 3. A conditional relevant rule does the same, but only when the query
//!    carries an instance that satisfies the condition. Bare type queries
//!    never match conditional rules, so "can this role ever do X" ignores
//!    instance-scoped exceptions.
//!
//! The last relevant rule wins, which is why a revoke placed after a broad
//! grant narrows it, and a conditional grant placed after that revoke
//! re-opens it for matching instances only.

use serde::Serialize;
use tracing::{debug, info, instrument, Span};

use super::instance::TaggedInstance;
use super::rule::Rule;
use super::types::{Action, SubjectType};
use crate::error::{AuthzError, Result};
use crate::types::Actor;

/// The subject half of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectQuery<'a> {
	/// Type-level check, no instance to evaluate conditions against.
	Type(SubjectType),
	Instance(&'a TaggedInstance),
}

impl SubjectQuery<'_> {
	pub fn subject_type(&self) -> SubjectType {
		match self {
			SubjectQuery::Type(subject_type) => *subject_type,
			SubjectQuery::Instance(instance) => instance.subject_type(),
		}
	}

	pub fn instance(&self) -> Option<&TaggedInstance> {
		match self {
			SubjectQuery::Type(_) => None,
			SubjectQuery::Instance(instance) => Some(instance),
		}
	}
}

impl From<SubjectType> for SubjectQuery<'_> {
	fn from(subject_type: SubjectType) -> Self {
		SubjectQuery::Type(subject_type)
	}
}

impl<'a> From<&'a TaggedInstance> for SubjectQuery<'a> {
	fn from(instance: &'a TaggedInstance) -> Self {
		SubjectQuery::Instance(instance)
	}
}

/// Outcome of a query and the rule that settled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
	pub allowed: bool,
	/// Index of the last matching rule; `None` means no rule matched and the
	/// default denial stands.
	pub rule_index: Option<usize>,
}

impl Decision {
	fn default_deny() -> Self {
		Self {
			allowed: false,
			rule_index: None,
		}
	}
}

/// An actor's finalized permissions.
///
/// Cheap to clone, safe to share across threads, never mutated after
/// [`AbilityBuilder::build`](super::AbilityBuilder::build).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ability {
	rules: Vec<Rule>,
	actor: Option<Actor>,
	audit_decisions: bool,
}

impl Ability {
	pub(crate) fn new(rules: Vec<Rule>, actor: Option<Actor>) -> Self {
		Self {
			rules,
			actor,
			audit_decisions: false,
		}
	}

	/// Logs every decision at info level under the `saas_auth::audit` target.
	pub fn with_audit(mut self, enabled: bool) -> Self {
		self.audit_decisions = enabled;
		self
	}

	pub fn rules(&self) -> &[Rule] {
		&self.rules
	}

	pub fn actor(&self) -> Option<&Actor> {
		self.actor.as_ref()
	}

	/// Rules that can affect queries on `subject_type`, with their indices.
	pub fn rules_for(&self, subject_type: SubjectType) -> impl Iterator<Item = (usize, &Rule)> {
		self.rules
			.iter()
			.enumerate()
			.filter(move |(_, rule)| rule.covers_subject(subject_type))
	}

	/// Returns whether `action` is permitted on `subject`.
	pub fn can<'a>(&self, action: Action, subject: impl Into<SubjectQuery<'a>>) -> Result<bool> {
		Ok(self.decide(action, subject)?.allowed)
	}

	/// Returns whether `action` is denied on `subject`.
	pub fn cannot<'a>(&self, action: Action, subject: impl Into<SubjectQuery<'a>>) -> Result<bool> {
		Ok(!self.decide(action, subject)?.allowed)
	}

	/// Evaluates a query and reports which rule settled it.
	#[instrument(
		level = "debug",
		skip(self, subject),
		fields(
			user_id = ?self.actor.map(|a| a.id),
			role = ?self.actor.map(|a| a.role),
			action = %action,
			subject_type = tracing::field::Empty,
		)
	)]
	pub fn decide<'a>(
		&self,
		action: Action,
		subject: impl Into<SubjectQuery<'a>>,
	) -> Result<Decision> {
		let query = subject.into();
		let subject_type = query.subject_type();
		Span::current().record("subject_type", subject_type.as_str());

		if !subject_type.supports_action(action) {
			return Err(AuthzError::InvalidQuery {
				action,
				subject: subject_type,
			});
		}

		let instance = query.instance();
		let mut decision = Decision::default_deny();

		for (index, rule) in self.rules.iter().enumerate() {
			if !rule.covers_subject(subject_type) || !rule.covers_action(action) {
				continue;
			}

			let applies = match (&rule.condition, instance) {
				(None, _) => true,
				(Some(condition), Some(instance)) => condition.matches(instance),
				(Some(_), None) => false,
			};

			if applies {
				decision = Decision {
					allowed: rule.effect.allows(),
					rule_index: Some(index),
				};
			}
		}

		if self.audit_decisions {
			info!(
				target: "saas_auth::audit",
				user_id = ?self.actor.map(|a| a.id),
				action = %action,
				subject_type = %subject_type,
				instance = instance.is_some(),
				allowed = decision.allowed,
				rule_index = ?decision.rule_index,
				"authorization decision"
			);
		} else {
			debug!(
				allowed = decision.allowed,
				rule_index = ?decision.rule_index,
				"authorization decision"
			);
		}

		Ok(decision)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::abac::builder::AbilityBuilder;
	use crate::abac::policies::build_ability;
	use crate::abac::rule::{Condition, Effect};
	use crate::types::{OrgId, ProjectId, Role, UserId};

	fn ability_for(role: Role, id: UserId) -> Ability {
		build_ability(&Actor::new(id, role)).unwrap()
	}

	fn organization_owned_by(owner: UserId) -> TaggedInstance {
		TaggedInstance::organization(OrgId::generate(), owner)
	}

	fn project_owned_by(owner: UserId) -> TaggedInstance {
		TaggedInstance::project(ProjectId::generate(), owner, OrgId::generate())
	}

	mod admin {
		use super::*;

		#[test]
		fn can_manage_all() {
			let ability = ability_for(Role::Admin, UserId::generate());
			assert!(ability.can(Action::Manage, SubjectType::All).unwrap());
		}

		#[test]
		fn cannot_update_organization_owned_by_someone_else() {
			let u1 = UserId::generate();
			let u2 = UserId::generate();
			let ability = ability_for(Role::Admin, u1);
			let org = organization_owned_by(u2);

			assert!(!ability.can(Action::Update, &org).unwrap());
			assert!(!ability.can(Action::TransferOwnership, &org).unwrap());
			assert!(ability.cannot(Action::Update, &org).unwrap());
		}

		#[test]
		fn can_update_own_organization() {
			let u1 = UserId::generate();
			let ability = ability_for(Role::Admin, u1);
			let org = organization_owned_by(u1);

			assert!(ability.can(Action::Update, &org).unwrap());
			assert!(ability.can(Action::TransferOwnership, &org).unwrap());
		}

		#[test]
		fn bare_organization_type_ignores_owner_exception() {
			let ability = ability_for(Role::Admin, UserId::generate());
			assert!(!ability.can(Action::Update, SubjectType::Organization).unwrap());
			assert!(!ability
				.can(Action::TransferOwnership, SubjectType::Organization)
				.unwrap());
		}

		#[test]
		fn keeps_other_organization_actions() {
			let ability = ability_for(Role::Admin, UserId::generate());
			let org = organization_owned_by(UserId::generate());
			assert!(ability.can(Action::Delete, &org).unwrap());
			assert!(ability.can(Action::Get, SubjectType::Organization).unwrap());
		}

		#[test]
		fn can_do_everything_elsewhere() {
			let ability = ability_for(Role::Admin, UserId::generate());
			for subject in [
				SubjectType::User,
				SubjectType::Project,
				SubjectType::Invite,
				SubjectType::Billing,
			] {
				for action in subject.actions() {
					assert!(ability.can(*action, subject).unwrap(), "{action} {subject}");
				}
			}
		}

		#[test]
		fn revoke_decides_foreign_organization_update() {
			let ability = ability_for(Role::Admin, UserId::generate());
			let org = organization_owned_by(UserId::generate());
			let decision = ability.decide(Action::Update, &org).unwrap();
			assert_eq!(
				decision,
				Decision {
					allowed: false,
					rule_index: Some(1)
				}
			);
		}
	}

	mod member {
		use super::*;

		#[test]
		fn can_create_projects() {
			let ability = ability_for(Role::Member, UserId::generate());
			assert!(ability.can(Action::Create, SubjectType::Project).unwrap());
		}

		#[test]
		fn cannot_update_project_owned_by_someone_else() {
			let ability = ability_for(Role::Member, UserId::generate());
			let project = project_owned_by(UserId::generate());
			assert!(!ability.can(Action::Update, &project).unwrap());
		}

		#[test]
		fn can_update_own_project() {
			let u1 = UserId::generate();
			let ability = ability_for(Role::Member, u1);
			assert!(ability.can(Action::Update, &project_owned_by(u1)).unwrap());
		}

		#[test]
		fn can_get_users() {
			let ability = ability_for(Role::Member, UserId::generate());
			assert!(ability.can(Action::Get, SubjectType::User).unwrap());
		}

		#[test]
		fn cannot_delete_projects() {
			let u1 = UserId::generate();
			let ability = ability_for(Role::Member, u1);
			assert!(!ability.can(Action::Delete, SubjectType::Project).unwrap());
			assert!(!ability.can(Action::Delete, &project_owned_by(u1)).unwrap());
		}

		#[test]
		fn cannot_touch_organizations_invites_or_billing() {
			let ability = ability_for(Role::Member, UserId::generate());
			assert!(ability.cannot(Action::Update, SubjectType::Organization).unwrap());
			assert!(ability.cannot(Action::Create, SubjectType::Invite).unwrap());
			assert!(ability.cannot(Action::Get, SubjectType::Billing).unwrap());
			assert!(ability.cannot(Action::Delete, SubjectType::User).unwrap());
		}

		#[test]
		fn bare_project_update_is_denied() {
			let ability = ability_for(Role::Member, UserId::generate());
			assert!(!ability.can(Action::Update, SubjectType::Project).unwrap());
		}
	}

	mod billing {
		use super::*;

		#[test]
		fn can_manage_billing() {
			let ability = ability_for(Role::Billing, UserId::generate());
			assert!(ability.can(Action::Manage, SubjectType::Billing).unwrap());
			assert!(ability.can(Action::Export, SubjectType::Billing).unwrap());
		}

		#[test]
		fn cannot_get_users() {
			let ability = ability_for(Role::Billing, UserId::generate());
			assert!(!ability.can(Action::Get, SubjectType::User).unwrap());
		}

		#[test]
		fn billing_grant_is_not_a_wildcard() {
			let ability = ability_for(Role::Billing, UserId::generate());
			assert!(!ability.can(Action::Manage, SubjectType::All).unwrap());
		}
	}

	mod rule_order {
		use super::*;

		fn admin_rules(builder: &mut AbilityBuilder, owner: UserId, reversed: bool) {
			let narrowed = [Action::TransferOwnership, Action::Update];
			builder.grant([Action::Manage], SubjectType::All);
			if reversed {
				builder
					.grant(narrowed, SubjectType::Organization)
					.when(Condition::owned_by(owner));
				builder.revoke(narrowed, SubjectType::Organization);
			} else {
				builder.revoke(narrowed, SubjectType::Organization);
				builder
					.grant(narrowed, SubjectType::Organization)
					.when(Condition::owned_by(owner));
			}
		}

		#[test]
		fn revoke_then_conditional_grant_lets_owner_update() {
			let u1 = UserId::generate();
			let mut builder = AbilityBuilder::new();
			admin_rules(&mut builder, u1, false);
			let ability = builder.build().unwrap();
			let own = organization_owned_by(u1);

			assert!(ability.can(Action::Update, &own).unwrap());
			assert_eq!(ability.decide(Action::Update, &own).unwrap().rule_index, Some(2));
		}

		#[test]
		fn reversed_order_makes_owner_exception_dead() {
			let u1 = UserId::generate();
			let mut builder = AbilityBuilder::new();
			admin_rules(&mut builder, u1, true);
			let ability = builder.build().unwrap();
			let own = organization_owned_by(u1);

			assert!(!ability.can(Action::Update, &own).unwrap());
			assert_eq!(ability.decide(Action::Update, &own).unwrap().rule_index, Some(2));
		}

		#[test]
		fn same_rules_same_count_different_outcome() {
			let u1 = UserId::generate();
			let own = organization_owned_by(u1);

			let mut specified = AbilityBuilder::new();
			admin_rules(&mut specified, u1, false);
			let mut reversed = AbilityBuilder::new();
			admin_rules(&mut reversed, u1, true);
			let specified = specified.build().unwrap();
			let reversed = reversed.build().unwrap();

			assert_eq!(specified.rules().len(), reversed.rules().len());
			assert_ne!(
				specified.can(Action::Update, &own).unwrap(),
				reversed.can(Action::Update, &own).unwrap()
			);
		}

		#[test]
		fn later_revoke_narrows_earlier_grant() {
			let mut builder = AbilityBuilder::new();
			builder.grant([Action::Manage], SubjectType::Project);
			builder.revoke([Action::Delete], SubjectType::Project);
			let ability = builder.build().unwrap();

			assert!(ability.can(Action::Update, SubjectType::Project).unwrap());
			assert!(!ability.can(Action::Delete, SubjectType::Project).unwrap());
		}
	}

	mod conditions {
		use super::*;

		#[test]
		fn conditional_revoke_only_hits_matching_instances() {
			let owner = UserId::generate();
			let mut builder = AbilityBuilder::new();
			builder.grant([Action::Get], SubjectType::Project);
			builder
				.revoke([Action::Get], SubjectType::Project)
				.when(Condition::owned_by(owner));
			let ability = builder.build().unwrap();

			assert!(!ability.can(Action::Get, &project_owned_by(owner)).unwrap());
			assert!(ability.can(Action::Get, &project_owned_by(UserId::generate())).unwrap());
			assert!(ability.can(Action::Get, SubjectType::Project).unwrap());
		}

		#[test]
		fn instance_without_the_attribute_does_not_match() {
			let owner = UserId::generate();
			let mut builder = AbilityBuilder::new();
			builder
				.grant([Action::Update], SubjectType::Project)
				.when(Condition::owned_by(owner));
			let ability = builder.build().unwrap();
			let anonymous = TaggedInstance::new(SubjectType::Project).unwrap();

			assert!(!ability.can(Action::Update, &anonymous).unwrap());
		}

		#[test]
		fn matching_is_by_attribute_not_primary_key() {
			let u1 = UserId::generate();
			let ability = ability_for(Role::Member, u1);
			// A project whose primary key happens to equal the actor id is still not theirs.
			let project = TaggedInstance::project(
				ProjectId::new(u1.into_inner()),
				UserId::generate(),
				OrgId::generate(),
			);
			assert!(!ability.can(Action::Update, &project).unwrap());
		}
	}

	mod queries {
		use super::*;

		#[test]
		fn action_not_defined_for_subject_is_an_error() {
			let ability = ability_for(Role::Admin, UserId::generate());
			let err = ability
				.can(Action::TransferOwnership, SubjectType::Project)
				.unwrap_err();
			assert_eq!(
				err,
				AuthzError::InvalidQuery {
					action: Action::TransferOwnership,
					subject: SubjectType::Project,
				}
			);
		}

		#[test]
		fn wildcard_query_only_accepts_manage() {
			let ability = ability_for(Role::Admin, UserId::generate());
			assert!(ability.can(Action::Get, SubjectType::All).unwrap_err().is_query_error());
		}

		#[test]
		fn invalid_query_errors_even_without_rules() {
			let ability = AbilityBuilder::new().build().unwrap();
			assert!(ability.cannot(Action::Export, SubjectType::User).is_err());
		}

		#[test]
		fn no_matching_rule_is_default_deny() {
			let ability = ability_for(Role::Billing, UserId::generate());
			assert_eq!(
				ability.decide(Action::Get, SubjectType::Project).unwrap(),
				Decision {
					allowed: false,
					rule_index: None
				}
			);
		}

		#[test]
		fn rules_for_includes_wildcard_rules() {
			let ability = ability_for(Role::Admin, UserId::generate());
			let indices: Vec<usize> = ability
				.rules_for(SubjectType::Organization)
				.map(|(index, _)| index)
				.collect();
			assert_eq!(indices, vec![0, 1, 2]);
			assert_eq!(ability.rules_for(SubjectType::User).count(), 1);
		}

		#[test]
		fn audit_flag_does_not_change_decisions() {
			let u1 = UserId::generate();
			let plain = ability_for(Role::Admin, u1);
			let audited = plain.clone().with_audit(true);
			let org = organization_owned_by(UserId::generate());
			assert_eq!(
				plain.decide(Action::Update, &org).unwrap(),
				audited.decide(Action::Update, &org).unwrap()
			);
		}

		#[test]
		fn ability_is_send_and_sync() {
			fn assert_send_sync<T: Send + Sync>() {}
			assert_send_sync::<Ability>();
		}

		#[test]
		fn effect_of_deciding_rule_matches_result() {
			let u1 = UserId::generate();
			let ability = ability_for(Role::Member, u1);
			let decision = ability.decide(Action::Update, &project_owned_by(u1)).unwrap();
			let rule = &ability.rules()[decision.rule_index.unwrap()];
			assert_eq!(rule.effect, Effect::Grant);
			assert!(rule.is_conditional());
		}
	}

	mod audit_log {
		use super::*;
		use std::sync::{Arc, Mutex};
		use tracing::field::{Field, Visit};
		use tracing::{Event, Subscriber};
		use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

		const AUDIT_TARGET: &str = "saas_auth::audit";

		/// Collects the `allowed` field of every audit event.
		#[derive(Clone, Default)]
		struct AuditCapture {
			events: Arc<Mutex<Vec<Option<bool>>>>,
		}

		impl AuditCapture {
			fn events(&self) -> Vec<Option<bool>> {
				self.events.lock().unwrap().clone()
			}
		}

		#[derive(Default)]
		struct AllowedField(Option<bool>);

		impl Visit for AllowedField {
			fn record_bool(&mut self, field: &Field, value: bool) {
				if field.name() == "allowed" {
					self.0 = Some(value);
				}
			}

			fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
		}

		impl<S: Subscriber> Layer<S> for AuditCapture {
			fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
				if event.metadata().target() != AUDIT_TARGET {
					return;
				}
				let mut allowed = AllowedField::default();
				event.record(&mut allowed);
				self.events.lock().unwrap().push(allowed.0);
			}
		}

		fn capture(f: impl FnOnce()) -> Vec<Option<bool>> {
			let layer = AuditCapture::default();
			let subscriber = tracing_subscriber::registry().with(layer.clone());
			tracing::subscriber::with_default(subscriber, f);
			layer.events()
		}

		#[test]
		fn audited_ability_emits_one_event_per_decision() {
			let ability = ability_for(Role::Admin, UserId::generate()).with_audit(true);
			let org = organization_owned_by(UserId::generate());

			let events = capture(|| {
				assert!(!ability.can(Action::Update, &org).unwrap());
			});
			assert_eq!(events, vec![Some(false)]);
		}

		#[test]
		fn audit_event_records_grants() {
			let u1 = UserId::generate();
			let ability = ability_for(Role::Member, u1).with_audit(true);

			let events = capture(|| {
				assert!(ability.can(Action::Update, &project_owned_by(u1)).unwrap());
				assert!(!ability.can(Action::Delete, SubjectType::Project).unwrap());
			});
			assert_eq!(events, vec![Some(true), Some(false)]);
		}

		#[test]
		fn plain_ability_emits_no_audit_events() {
			let ability = ability_for(Role::Admin, UserId::generate());
			let org = organization_owned_by(UserId::generate());

			let events = capture(|| {
				assert!(!ability.can(Action::Update, &org).unwrap());
			});
			assert!(events.is_empty());
		}

		#[test]
		fn rejected_query_is_not_audited() {
			let ability = ability_for(Role::Admin, UserId::generate()).with_audit(true);

			let events = capture(|| {
				assert!(ability
					.can(Action::TransferOwnership, SubjectType::Billing)
					.is_err());
			});
			assert!(events.is_empty());
		}
	}

	mod property_tests {
		use super::*;
		use proptest::prelude::*;
		use uuid::Uuid;

		fn arb_role() -> impl Strategy<Value = Role> {
			prop_oneof![Just(Role::Admin), Just(Role::Member), Just(Role::Billing)]
		}

		fn arb_action() -> impl Strategy<Value = Action> {
			prop::sample::select(Action::all().to_vec())
		}

		fn arb_subject() -> impl Strategy<Value = SubjectType> {
			prop::sample::select(SubjectType::variants().to_vec())
		}

		proptest! {
			#[test]
			fn evaluation_is_idempotent(
				role in arb_role(),
				actor_uuid in any::<u128>(),
				owner_uuid in any::<u128>(),
				action in arb_action(),
				subject in arb_subject(),
			) {
				let ability = ability_for(role, UserId::new(Uuid::from_u128(actor_uuid)));
				let first = ability.decide(action, subject);
				let second = ability.decide(action, subject);
				prop_assert_eq!(first, second);

				let org = organization_owned_by(UserId::new(Uuid::from_u128(owner_uuid)));
				prop_assert_eq!(
					ability.can(Action::Update, &org),
					ability.can(Action::Update, &org)
				);
			}

			#[test]
			fn cannot_is_negation_of_can(
				role in arb_role(),
				actor_uuid in any::<u128>(),
				action in arb_action(),
				subject in arb_subject(),
			) {
				let ability = ability_for(role, UserId::new(Uuid::from_u128(actor_uuid)));
				match (ability.can(action, subject), ability.cannot(action, subject)) {
					(Ok(can), Ok(cannot)) => prop_assert_eq!(can, !cannot),
					(Err(a), Err(b)) => prop_assert_eq!(a, b),
					_ => prop_assert!(false, "can and cannot disagree on validity"),
				}
			}

			#[test]
			fn admin_updates_organization_iff_owner(
				actor_uuid in any::<u128>(),
				owner_uuid in any::<u128>(),
			) {
				let actor = UserId::new(Uuid::from_u128(actor_uuid));
				let ability = ability_for(Role::Admin, actor);
				let org = organization_owned_by(UserId::new(Uuid::from_u128(owner_uuid)));
				prop_assert_eq!(
					ability.can(Action::Update, &org).unwrap(),
					actor_uuid == owner_uuid
				);
			}

			#[test]
			fn member_updates_project_iff_owner(
				actor_uuid in any::<u128>(),
				owner_uuid in any::<u128>(),
			) {
				let actor = UserId::new(Uuid::from_u128(actor_uuid));
				let ability = ability_for(Role::Member, actor);
				let project = project_owned_by(UserId::new(Uuid::from_u128(owner_uuid)));
				prop_assert_eq!(
					ability.can(Action::Update, &project).unwrap(),
					actor_uuid == owner_uuid
				);
			}

			#[test]
			fn type_queries_never_depend_on_actor_id(
				role in arb_role(),
				a in any::<u128>(),
				b in any::<u128>(),
				action in arb_action(),
				subject in arb_subject(),
			) {
				let first = ability_for(role, UserId::new(Uuid::from_u128(a)));
				let second = ability_for(role, UserId::new(Uuid::from_u128(b)));
				prop_assert_eq!(first.can(action, subject), second.can(action, subject));
			}
		}
	}
}
