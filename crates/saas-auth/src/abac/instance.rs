// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tagged resource instances.
//!
//! A [`TaggedInstance`] is a concrete resource reduced to what authorization
//! needs: an explicit subject tag and the condition-bearing attributes. The
//! tag is fixed at construction, so the evaluator never has to guess a
//! record's subject from its Rust type.
//!
//! Plain records are tagged through serde with a `__typeName` field
//! (`__typename` is accepted on input as well):
//!
//! ```
//! use saas_auth::{SubjectType, TaggedInstance};
//!
//! let record = r#"{
//!     "__typeName": "Project",
//!     "id": "0b6f4a4e-5d7c-4b43-9a39-2d1c84f2d0a1",
//!     "ownerId": "7d4c2b1a-0e9f-4a8b-8c7d-6e5f4a3b2c1d",
//!     "name": "fields that are not attributes are ignored"
//! }"#;
//! let project: TaggedInstance = serde_json::from_str(record)?;
//! assert_eq!(project.subject_type(), SubjectType::Project);
//! # Ok::<(), serde_json::Error>(())
//! ```

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::types::{Attribute, SubjectType};
use crate::error::{AuthzError, Result};
use crate::types::{InviteId, OrgId, ProjectId, UserId};

/// A resource instance carrying its subject tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedInstance {
	#[serde(rename = "__typeName")]
	subject_type: SubjectType,
	#[serde(flatten)]
	attributes: BTreeMap<Attribute, Uuid>,
}

impl TaggedInstance {
	/// Creates an instance with no attributes. The wildcard cannot tag an instance.
	pub fn new(subject_type: SubjectType) -> Result<Self> {
		if subject_type.is_wildcard() {
			return Err(AuthzError::InvalidInstance(
				"an instance cannot be tagged with the 'all' wildcard".to_string(),
			));
		}
		Ok(Self::tagged(subject_type))
	}

	fn tagged(subject_type: SubjectType) -> Self {
		Self {
			subject_type,
			attributes: BTreeMap::new(),
		}
	}

	fn with(mut self, attribute: Attribute, value: impl Into<Uuid>) -> Self {
		self.attributes.insert(attribute, value.into());
		self
	}

	pub fn user(id: UserId) -> Self {
		Self::tagged(SubjectType::User).with(Attribute::Id, id)
	}

	pub fn organization(id: OrgId, owner_id: UserId) -> Self {
		Self::tagged(SubjectType::Organization)
			.with(Attribute::Id, id)
			.with(Attribute::OwnerId, owner_id)
	}

	pub fn project(id: ProjectId, owner_id: UserId, organization_id: OrgId) -> Self {
		Self::tagged(SubjectType::Project)
			.with(Attribute::Id, id)
			.with(Attribute::OwnerId, owner_id)
			.with(Attribute::OrganizationId, organization_id)
	}

	pub fn invite(id: InviteId, organization_id: OrgId, author_id: UserId) -> Self {
		Self::tagged(SubjectType::Invite)
			.with(Attribute::Id, id)
			.with(Attribute::OrganizationId, organization_id)
			.with(Attribute::AuthorId, author_id)
	}

	pub fn billing(organization_id: OrgId) -> Self {
		Self::tagged(SubjectType::Billing).with(Attribute::OrganizationId, organization_id)
	}

	/// Sets an attribute, rejecting attributes the subject does not expose.
	pub fn with_attribute(self, attribute: Attribute, value: impl Into<Uuid>) -> Result<Self> {
		if !self.subject_type.supports_attribute(attribute) {
			return Err(AuthzError::InvalidInstance(format!(
				"subject '{}' has no attribute '{attribute}'",
				self.subject_type
			)));
		}
		Ok(self.with(attribute, value))
	}

	pub fn subject_type(&self) -> SubjectType {
		self.subject_type
	}

	pub fn attribute(&self, attribute: Attribute) -> Option<Uuid> {
		self.attributes.get(&attribute).copied()
	}

	pub fn attributes(&self) -> impl Iterator<Item = (Attribute, Uuid)> + '_ {
		self.attributes.iter().map(|(k, v)| (*k, *v))
	}

	/// Builds an instance from a plain record's fields.
	///
	/// Fields that are not attributes of the subject are ignored; `null` is
	/// treated as absent.
	pub fn from_fields(
		subject_type: SubjectType,
		fields: &serde_json::Map<String, serde_json::Value>,
	) -> Result<Self> {
		let mut instance = Self::new(subject_type)?;
		for attribute in subject_type.attributes() {
			match fields.get(attribute.as_str()) {
				None | Some(serde_json::Value::Null) => {}
				Some(serde_json::Value::String(raw)) => {
					let value = Uuid::parse_str(raw).map_err(|e| {
						AuthzError::InvalidInstance(format!("'{attribute}' is not a UUID: {e}"))
					})?;
					instance = instance.with(*attribute, value);
				}
				Some(other) => {
					return Err(AuthzError::InvalidInstance(format!(
						"'{attribute}' must be a string, got {other}"
					)));
				}
			}
		}
		Ok(instance)
	}
}

impl<'de> Deserialize<'de> for TaggedInstance {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		#[derive(Deserialize)]
		struct Record {
			#[serde(rename = "__typeName", alias = "__typename")]
			subject_type: SubjectType,
			#[serde(flatten)]
			fields: serde_json::Map<String, serde_json::Value>,
		}

		let record = Record::deserialize(deserializer)?;
		TaggedInstance::from_fields(record.subject_type, &record.fields).map_err(de::Error::custom)
	}
}

/// A domain record that can present itself as a tagged instance.
///
/// Implementations decide the subject tag explicitly; nothing is inferred
/// from the record's type.
pub trait AuthSubject {
	fn to_subject(&self) -> TaggedInstance;
}

impl AuthSubject for TaggedInstance {
	fn to_subject(&self) -> TaggedInstance {
		self.clone()
	}
}
