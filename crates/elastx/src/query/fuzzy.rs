//! 🌫️ Fuzzy query: "did you mean...?" as a JSON clause.

use serde_json::{Map, Value, json};

use super::{Query, Rewrite};
use crate::error::{ElastxError, Result};

/// 🌫️ `{"fuzzy": {"<field>": {"value": "...", ...options}}}`
///
/// One field, ever. [`Fuzzy::new`] cannot hold two; [`Fuzzy::set_field`] refuses a second
/// distinct field instead of quietly overwriting the first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fuzzy {
    field: Option<(String, Map<String, Value>)>,
}

impl Fuzzy {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        let mut params = Map::new();
        params.insert("value".to_string(), Value::String(value.into()));
        Self {
            field: Some((field.into(), params)),
        }
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_ref().map(|(name, _)| name.as_str())
    }

    /// 🎯 Set (or re-set) the searched field and value. Re-setting the same field drops its options.
    pub fn set_field(&mut self, field: impl Into<String>, value: impl Into<String>) -> Result<&mut Self> {
        let field = field.into();
        if let Some(existing) = self.field() {
            if existing != field {
                return Err(ElastxError::invalid(format!(
                    "fuzzy query can only support a single field; '{}' is set, refusing '{}'",
                    existing, field
                )));
            }
        }
        *self = Self::new(field, value);
        Ok(self)
    }

    /// 🔧 Add an option (`fuzziness`, `prefix_length`, ...) next to the value.
    pub fn set_field_option(&mut self, option: impl Into<String>, value: impl Into<Value>) -> Result<&mut Self> {
        let (_, params) = self
            .field
            .as_mut()
            .ok_or_else(|| ElastxError::invalid("no field has been set on the fuzzy query"))?;
        params.insert(option.into(), value.into());
        Ok(self)
    }

    pub fn set_fuzziness(&mut self, fuzziness: impl Into<Value>) -> Result<&mut Self> {
        self.set_field_option("fuzziness", fuzziness)
    }

    pub fn set_rewrite(&mut self, rewrite: Rewrite) -> Result<&mut Self> {
        self.set_field_option("rewrite", rewrite)
    }
}

impl Query for Fuzzy {
    fn to_value(&self) -> Value {
        let mut body = Map::new();
        if let Some((name, params)) = &self.field {
            body.insert(name.clone(), Value::Object(params.clone()));
        }
        json!({ "fuzzy": body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_a_fuzzy_query_renders_its_one_field() {
        let query = Fuzzy::new("user", "kimchy");
        assert_eq!(
            query.to_value(),
            json!({ "fuzzy": { "user": { "value": "kimchy" } } })
        );
    }

    #[test]
    fn the_one_where_a_second_field_is_rejected() {
        let mut query = Fuzzy::default();
        query.set_field("a", "one").expect("💀 first field is always welcome");
        let err = query
            .set_field("b", "two")
            .expect_err("💀 second distinct field must be refused");
        assert!(matches!(err, ElastxError::InvalidConfiguration(_)));
        // -- 🪨 and the first field survives the attempted coup
        assert_eq!(query.field(), Some("a"));
    }

    #[test]
    fn the_one_where_the_same_field_twice_is_fine() {
        let mut query = Fuzzy::new("a", "one");
        query.set_field("a", "uno").expect("💀 same field may be re-set");
        assert_eq!(query.to_value()["fuzzy"]["a"]["value"], "uno");
    }

    #[test]
    fn the_one_where_options_and_rewrite_ride_along() -> Result<()> {
        let mut query = Fuzzy::new("name", "rufl");
        query
            .set_fuzziness("AUTO")?
            .set_field_option("prefix_length", 2)?
            .set_rewrite(Rewrite::TopTermsBoost(10))?;

        assert_eq!(
            query.to_value(),
            json!({
                "fuzzy": {
                    "name": {
                        "value": "rufl",
                        "fuzziness": "AUTO",
                        "prefix_length": 2,
                        "rewrite": "top_terms_boost_10"
                    }
                }
            })
        );
        Ok(())
    }

    #[test]
    fn the_one_where_options_without_a_field_are_a_configuration_problem() {
        let mut query = Fuzzy::default();
        assert!(matches!(
            query.set_rewrite(Rewrite::ScoringBoolean),
            Err(ElastxError::InvalidConfiguration(_))
        ));
        assert_eq!(query.to_value(), json!({ "fuzzy": {} }));
    }
}
