// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The subject registry.
//!
//! Declares the closed set of subjects the engine reasons about and, per
//! subject, which actions exist and which attributes a condition may read:
//!
//! | subject        | actions                                                 | attributes                      |
//! |----------------|---------------------------------------------------------|---------------------------------|
//! | `User`         | manage, get, update, delete                             | id                              |
//! | `Organization` | manage, create, get, update, delete, transfer_ownership | id, ownerId                     |
//! | `Project`      | manage, create, get, update, delete                     | id, ownerId, organizationId     |
//! | `Invite`       | manage, create, get, delete                             | id, organizationId, authorId    |
//! | `Billing`      | manage, get, export                                     | organizationId                  |
//! | `all`          | manage                                                  |                                 |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AuthzError;

/// Kinds of resources that can be protected, plus the `all` wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubjectType {
	User,
	Organization,
	Project,
	Invite,
	Billing,
	/// Wildcard: a rule on `all` applies to every subject.
	#[serde(rename = "all")]
	All,
}

impl SubjectType {
	/// Returns every subject type, wildcard last.
	pub fn variants() -> &'static [SubjectType] {
		&[
			SubjectType::User,
			SubjectType::Organization,
			SubjectType::Project,
			SubjectType::Invite,
			SubjectType::Billing,
			SubjectType::All,
		]
	}

	pub fn is_wildcard(self) -> bool {
		matches!(self, SubjectType::All)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			SubjectType::User => "User",
			SubjectType::Organization => "Organization",
			SubjectType::Project => "Project",
			SubjectType::Invite => "Invite",
			SubjectType::Billing => "Billing",
			SubjectType::All => "all",
		}
	}

	/// Actions defined for this subject.
	pub fn actions(self) -> &'static [Action] {
		use Action::*;
		match self {
			SubjectType::User => &[Manage, Get, Update, Delete],
			SubjectType::Organization => &[Manage, Create, Get, Update, Delete, TransferOwnership],
			SubjectType::Project => &[Manage, Create, Get, Update, Delete],
			SubjectType::Invite => &[Manage, Create, Get, Delete],
			SubjectType::Billing => &[Manage, Get, Export],
			SubjectType::All => &[Manage],
		}
	}

	/// Attributes a condition on this subject may compare.
	pub fn attributes(self) -> &'static [Attribute] {
		use Attribute::*;
		match self {
			SubjectType::User => &[Id],
			SubjectType::Organization => &[Id, OwnerId],
			SubjectType::Project => &[Id, OwnerId, OrganizationId],
			SubjectType::Invite => &[Id, OrganizationId, AuthorId],
			SubjectType::Billing => &[OrganizationId],
			SubjectType::All => &[],
		}
	}

	pub fn supports_action(self, action: Action) -> bool {
		self.actions().contains(&action)
	}

	pub fn supports_attribute(self, attribute: Attribute) -> bool {
		self.attributes().contains(&attribute)
	}
}

impl fmt::Display for SubjectType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for SubjectType {
	type Err = AuthzError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		SubjectType::variants()
			.iter()
			.copied()
			.find(|subject| subject.as_str() == s)
			.ok_or_else(|| AuthzError::UnknownSubject(s.to_string()))
	}
}

/// Actions that can be performed on subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
	/// Wildcard: implies every action of the subject.
	Manage,
	Get,
	Create,
	Update,
	Delete,
	TransferOwnership,
	Export,
}

impl Action {
	pub fn all() -> &'static [Action] {
		&[
			Action::Manage,
			Action::Get,
			Action::Create,
			Action::Update,
			Action::Delete,
			Action::TransferOwnership,
			Action::Export,
		]
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Action::Manage => "manage",
			Action::Get => "get",
			Action::Create => "create",
			Action::Update => "update",
			Action::Delete => "delete",
			Action::TransferOwnership => "transfer_ownership",
			Action::Export => "export",
		}
	}
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Action {
	type Err = AuthzError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Action::all()
			.iter()
			.copied()
			.find(|action| action.as_str() == s)
			.ok_or_else(|| AuthzError::UnknownAction(s.to_string()))
	}
}

/// Subject attributes that condition predicates can compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Attribute {
	Id,
	OwnerId,
	OrganizationId,
	AuthorId,
}

impl Attribute {
	pub fn all() -> &'static [Attribute] {
		&[
			Attribute::Id,
			Attribute::OwnerId,
			Attribute::OrganizationId,
			Attribute::AuthorId,
		]
	}

	/// Field name on the plain record.
	pub fn as_str(self) -> &'static str {
		match self {
			Attribute::Id => "id",
			Attribute::OwnerId => "ownerId",
			Attribute::OrganizationId => "organizationId",
			Attribute::AuthorId => "authorId",
		}
	}
}

impl fmt::Display for Attribute {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
