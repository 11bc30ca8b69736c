use async_graphql::Value as GqlValue;
use async_graphql::dynamic::TypeRef;
use async_graphql::parser::types::{BaseType, ConstDirective, Type};

/// Helpers over the wrapper structure of a parsed type reference.
pub trait TypeExt {
	/// The innermost named type, below every list and non-null wrapper
	fn named_type(&self) -> &str;
	/// Whether the type, ignoring non-null, is a list
	fn is_list(&self) -> bool;
	/// The equivalent reference for the executable schema
	fn to_type_ref(&self) -> TypeRef;
}

impl TypeExt for Type {
	fn named_type(&self) -> &str {
		match &self.base {
			BaseType::Named(name) => name.as_str(),
			BaseType::List(inner) => inner.named_type(),
		}
	}

	fn is_list(&self) -> bool {
		matches!(self.base, BaseType::List(_))
	}

	fn to_type_ref(&self) -> TypeRef {
		let base = match &self.base {
			BaseType::Named(name) => TypeRef::named(name.as_str()),
			BaseType::List(inner) => TypeRef::List(Box::new(inner.to_type_ref())),
		};
		if self.nullable {
			base
		} else {
			TypeRef::NonNull(Box::new(base))
		}
	}
}

pub trait DirectiveExt {
	fn name(&self) -> &str;
	fn argument(&self, name: &str) -> Option<&GqlValue>;
}

impl DirectiveExt for ConstDirective {
	fn name(&self) -> &str {
		self.name.node.as_str()
	}

	fn argument(&self, name: &str) -> Option<&GqlValue> {
		self.arguments.iter().find(|(n, _)| n.node.as_str() == name).map(|(_, v)| &v.node)
	}
}
