use super::Expression;
use crate::core::{AttributeValue, Context, Type};
use crate::{Error, Result};

/// Expression reading a value from the content storage of the context.
#[derive(Debug, Clone)]
pub struct Selector {
    content_id: String,
    item_id: String,
    path: Vec<Expression>,
    t: Type,
}

impl Selector {
    /// Create a selector of an item value addressed by key expressions.
    pub fn new(
        content_id: impl Into<String>,
        item_id: impl Into<String>,
        path: Vec<Expression>,
        t: Type,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            item_id: item_id.into(),
            path,
            t,
        }
    }

    /// Content id.
    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    /// Item id.
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// Key expressions, one per item level.
    pub fn path(&self) -> &[Expression] {
        &self.path
    }

    /// Type of the selected value.
    pub fn result_type(&self) -> &Type {
        &self.t
    }

    /// Look the value up in the context's content storage.
    pub fn calculate(&self, ctx: &Context) -> Result<AttributeValue> {
        let storage = ctx
            .content()
            .ok_or_else(|| Error::missing_value("no content storage in context"))?;

        let keys = self
            .path
            .iter()
            .map(|e| e.calculate(ctx))
            .collect::<Result<Vec<_>>>()?;

        let v = storage.get_value(&self.content_id, &self.item_id, &keys)?;
        if v.get_type() != &self.t {
            return Err(Error::value_type(self.t.name(), v.get_type().name()));
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Content, ContentItem, ContentStorage};
    use crate::expression::FunctionRegistry;
    use std::sync::Arc;

    fn storage() -> Arc<ContentStorage> {
        let item = ContentItem::new("owners", Type::String, vec![Type::String]).unwrap();
        let keys = item.parse_keys(&["alpha".to_string()]).unwrap();
        let item = item.insert(&keys, AttributeValue::new_string("alice")).unwrap();
        Arc::new(ContentStorage::new().with(Content::new("registry", None).with_item(item)))
    }

    fn owner_of(t: Type) -> Selector {
        Selector::new(
            "registry",
            "owners",
            vec![Expression::designator("project", Type::String)],
            t,
        )
    }

    #[test]
    fn test_select_by_attribute() {
        let ctx = Context::from_values(
            Some(storage()),
            [("project", AttributeValue::new_string("alpha"))],
        )
        .unwrap();

        let v = owner_of(Type::String).calculate(&ctx).unwrap();
        assert_eq!(v.as_str().unwrap(), "alice");
        assert!(owner_of(Type::Integer).calculate(&ctx).unwrap_err().is_type_error());
    }

    #[test]
    fn test_missing_entries_are_missing_values() {
        let ctx = Context::from_values(
            Some(storage()),
            [("project", AttributeValue::new_string("beta"))],
        )
        .unwrap();
        assert!(owner_of(Type::String).calculate(&ctx).unwrap_err().is_missing_value());

        let ctx = Context::from_values(
            None,
            [("project", AttributeValue::new_string("alpha"))],
        )
        .unwrap();
        assert!(owner_of(Type::String).calculate(&ctx).unwrap_err().is_missing_value());

        let other = Selector::new("registry", "nope", vec![], Type::String);
        let ctx = Context::from_values(Some(storage()), Vec::<(String, AttributeValue)>::new()).unwrap();
        assert!(other.calculate(&ctx).unwrap_err().is_missing_value());
    }

    #[test]
    fn test_selector_in_function() {
        let ctx = Context::from_values(
            Some(storage()),
            [("project", AttributeValue::new_string("beta"))],
        )
        .unwrap();
        let fallback = FunctionRegistry::builtin()
            .make(
                "try",
                vec![
                    owner_of(Type::String).into(),
                    AttributeValue::new_string("nobody").into(),
                ],
            )
            .unwrap();
        assert_eq!(fallback.calculate(&ctx).unwrap().as_str().unwrap(), "nobody");
    }
}
