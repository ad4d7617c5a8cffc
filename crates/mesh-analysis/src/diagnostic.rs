use mesh_resource::{FullName, Origin, ResourceInstance, ResourceKind};
use serde::{ser::SerializeStruct, Serialize, Serializer};

use crate::{Level, Message};

/// A message reported against a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
	pub kind: ResourceKind,
	pub resource: FullName,
	pub origin: Option<Origin>,
	pub message: Message,
}

impl Diagnostic {
	pub fn new(kind: ResourceKind, resource: &ResourceInstance, message: Message) -> Self {
		Self {
			kind,
			resource: resource.full_name().clone(),
			origin: resource.origin.clone(),
			message,
		}
	}

	pub fn level(&self) -> Level {
		self.message.level()
	}

	pub fn code(&self) -> &'static str {
		self.message.code()
	}

	/// `Kind namespace/name`, the reference suppressions are matched against.
	pub fn reference(&self) -> String {
		format!("{} {}", self.kind, self.resource)
	}
}

impl Serialize for Diagnostic {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut s = serializer.serialize_struct("Diagnostic", 7)?;
		s.serialize_field("code", self.code())?;
		s.serialize_field("name", self.message.name())?;
		s.serialize_field("level", &self.level())?;
		s.serialize_field("resource", &self.reference())?;
		s.serialize_field("origin", &self.origin)?;
		s.serialize_field("message", &self.message.to_string())?;
		s.serialize_field("documentationUrl", &self.message.documentation_url())?;
		s.end()
	}
}
