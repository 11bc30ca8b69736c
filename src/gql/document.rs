use std::collections::BTreeMap;

use async_graphql::parser::parse_schema;
use async_graphql::parser::types::{
	InputObjectType, ObjectType, TypeDefinition, TypeKind, TypeSystemDefinition,
};

use super::error::{GqlError, schema_error};
use super::ext::TypeExt;
use super::shape::{NamedKind, TypeLookup};
use crate::cnf::{
	DEFAULT_MUTATION_TYPE, DEFAULT_QUERY_TYPE, ENTRY_VALUE_FIELD, ID_COLUMN, VERSIONSTAMP_FIELD,
};

const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// A parsed type-system document, indexed by type name.
#[derive(Debug)]
pub(crate) struct Document {
	/// The name of the root query type
	pub query: String,
	/// The name of the root mutation type, if the document has one
	pub mutation: Option<String>,
	/// Every type definition, in document order
	pub types: Vec<TypeDefinition>,
	index: BTreeMap<String, usize>,
	/// Entry types, mapped to the table whose rows they wrap
	entries: BTreeMap<String, String>,
}

impl Document {
	#[allow(clippy::result_large_err)]
	pub fn parse(sdl: &str) -> Result<Self, GqlError> {
		let doc =
			parse_schema(sdl).map_err(|e| schema_error(format!("failed to parse document: {e}")))?;

		let mut roots = None;
		let mut types = Vec::new();
		let mut index = BTreeMap::new();
		for def in doc.definitions {
			match def {
				TypeSystemDefinition::Schema(schema) => {
					let schema = schema.node;
					ensure!(
						!schema.extend,
						schema_error("schema extensions are not supported")
					);
					ensure!(roots.is_none(), schema_error("the schema is defined more than once"));
					ensure!(
						schema.subscription.is_none(),
						schema_error("subscriptions are not supported")
					);
					let query = schema
						.query
						.map(|n| n.node.to_string())
						.ok_or_else(|| schema_error("the schema definition has no query type"))?;
					roots = Some((query, schema.mutation.map(|n| n.node.to_string())));
				}
				TypeSystemDefinition::Type(ty) => {
					let ty = ty.node;
					let name = ty.name.node.to_string();
					ensure!(!ty.extend, schema_error(format!("type extensions are not supported: `{name}`")));
					ensure!(
						!BUILTIN_SCALARS.contains(&name.as_str()),
						schema_error(format!("built-in scalar `{name}` cannot be redefined"))
					);
					if index.insert(name.clone(), types.len()).is_some() {
						return Err(schema_error(format!("type `{name}` is defined more than once")));
					}
					types.push(ty);
				}
				// Directive definitions only describe the document
				TypeSystemDefinition::Directive(_) => {}
			}
		}

		let (query, mutation) = match roots {
			Some(roots) => roots,
			None => {
				let mutation = index.contains_key(DEFAULT_MUTATION_TYPE).then(|| DEFAULT_MUTATION_TYPE.to_owned());
				(DEFAULT_QUERY_TYPE.to_owned(), mutation)
			}
		};

		let mut doc = Document {
			query,
			mutation,
			types,
			index,
			entries: BTreeMap::new(),
		};
		ensure!(
			doc.object(&doc.query).is_some(),
			schema_error(format!("the root query type `{}` is not an object type", doc.query))
		);
		if let Some(mutation) = &doc.mutation {
			ensure!(
				doc.object(mutation).is_some(),
				schema_error(format!("the root mutation type `{mutation}` is not an object type"))
			);
		}
		doc.entries = doc.find_entries();
		trace!(query = %doc.query, mutation = ?doc.mutation, types = doc.types.len(), entries = doc.entries.len(), "parsed document");
		Ok(doc)
	}

	/// Finds the object types which wrap a stored row.
	///
	/// An entry type has a `value` field of a table type, a `versionstamp`
	/// field of type `String` or `ID`, and optionally an `id` field of type
	/// `ID`, and no other fields.
	fn find_entries(&self) -> BTreeMap<String, String> {
		let candidates: BTreeMap<String, String> = self
			.types
			.iter()
			.filter_map(|t| match &t.kind {
				TypeKind::Object(obj) if !self.is_root(&t.name.node) => {
					self.wrapped_table(obj).map(|tb| (t.name.node.to_string(), tb.to_owned()))
				}
				_ => None,
			})
			.collect();
		// A type wrapping another entry type is an ordinary table
		candidates
			.iter()
			.filter(|(_, tb)| !candidates.contains_key(tb.as_str()))
			.map(|(name, tb)| (name.clone(), tb.clone()))
			.collect()
	}

	fn wrapped_table<'a>(&self, obj: &'a ObjectType) -> Option<&'a str> {
		let mut table = None;
		let mut versionstamp = false;
		for field in &obj.fields {
			let field = &field.node;
			let ty = &field.ty.node;
			if ty.is_list() || !field.arguments.is_empty() {
				return None;
			}
			match (field.name.node.as_str(), ty.named_type()) {
				(ENTRY_VALUE_FIELD, tb) if self.object(tb).is_some() && !self.is_root(tb) => {
					table = Some(tb);
				}
				(VERSIONSTAMP_FIELD, "String" | "ID") => versionstamp = true,
				(ID_COLUMN, "ID") => {}
				_ => return None,
			}
		}
		table.filter(|_| versionstamp)
	}

	/// The entry types, with the table each one wraps
	pub fn entries(&self) -> impl Iterator<Item = (&str, &ObjectType)> {
		self.entries.keys().filter_map(|name| Some((name.as_str(), self.object(name)?)))
	}

	pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
		self.index.get(name).map(|i| &self.types[*i])
	}

	pub fn object(&self, name: &str) -> Option<&ObjectType> {
		match self.get(name).map(|t| &t.kind) {
			Some(TypeKind::Object(obj)) => Some(obj),
			_ => None,
		}
	}

	pub fn input_object(&self, name: &str) -> Option<&InputObjectType> {
		match self.get(name).map(|t| &t.kind) {
			Some(TypeKind::InputObject(obj)) => Some(obj),
			_ => None,
		}
	}

	pub fn is_root(&self, name: &str) -> bool {
		self.query == name || self.mutation.as_deref() == Some(name)
	}

	/// The object types backed by a table: every object type except the roots
	/// and the entry types
	pub fn tables(&self) -> impl Iterator<Item = (&str, &ObjectType)> {
		self.types.iter().filter_map(|t| match &t.kind {
			TypeKind::Object(obj)
				if !self.is_root(&t.name.node) && !self.entries.contains_key(t.name.node.as_str()) =>
			{
				Some((t.name.node.as_str(), obj))
			}
			_ => None,
		})
	}

	pub fn is_table(&self, name: &str) -> bool {
		self.kind_of(name) == Some(NamedKind::Table)
	}
}

impl TypeLookup for Document {
	fn kind_of(&self, name: &str) -> Option<NamedKind> {
		if BUILTIN_SCALARS.contains(&name) {
			return Some(NamedKind::Leaf);
		}
		let kind = match &self.get(name)?.kind {
			TypeKind::Object(_) if self.is_root(name) => return None,
			TypeKind::Object(_) if self.entries.contains_key(name) => NamedKind::Entry,
			TypeKind::Object(_) => NamedKind::Table,
			TypeKind::Scalar | TypeKind::Enum(_) => NamedKind::Leaf,
			TypeKind::InputObject(_) => NamedKind::Input,
			TypeKind::Interface(_) | TypeKind::Union(_) => NamedKind::Abstract,
		};
		Some(kind)
	}

	fn entry_table(&self, name: &str) -> Option<&str> {
		self.entries.get(name).map(String::as_str)
	}
}
