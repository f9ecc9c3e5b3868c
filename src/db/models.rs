use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::entities::{ingredient, recipe, tag};

/// Serialized form of a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDto {
    pub id: i32,
    pub name: String,
}

impl From<tag::Model> for TagDto {
    fn from(model: tag::Model) -> Self {
        TagDto {
            id: model.id,
            name: model.name,
        }
    }
}

/// Serialized form of an ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientDto {
    pub id: i32,
    pub name: String,
}

impl From<ingredient::Model> for IngredientDto {
    fn from(model: ingredient::Model) -> Self {
        IngredientDto {
            id: model.id,
            name: model.name,
        }
    }
}

/// Base projection of a recipe, used by the list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: i32,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<TagDto>,
    pub ingredients: Vec<IngredientDto>,
}

impl RecipeSummary {
    pub fn from_parts(
        recipe: recipe::Model,
        tags: Vec<tag::Model>,
        ingredients: Vec<ingredient::Model>,
    ) -> Self {
        RecipeSummary {
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link,
            tags: tags.into_iter().map(TagDto::from).collect(),
            ingredients: ingredients.into_iter().map(IngredientDto::from).collect(),
        }
    }
}

/// Detail projection: the base projection plus an additional-fields overlay
/// (`description`, `image`), flattened into one JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub summary: RecipeSummary,
    pub description: String,
    pub image: Option<String>,
}

impl RecipeDetail {
    pub fn from_parts(
        recipe: recipe::Model,
        tags: Vec<tag::Model>,
        ingredients: Vec<ingredient::Model>,
    ) -> Self {
        let description = recipe.description.clone();
        let image = recipe.image.clone();
        RecipeDetail {
            summary: RecipeSummary::from_parts(recipe, tags, ingredients),
            description,
            image,
        }
    }
}

/// A nested `{name}` element of a `tags` or `ingredients` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameEntry {
    pub name: String,
}

/// Incoming write payload for recipe create and update requests.
///
/// Every member is optional so the controller can tell "absent" apart from
/// "present": PATCH only touches present members, while PUT resets absent
/// ones to their declared defaults. Unknown members (notably `user`) are
/// accepted and discarded, which keeps the owner immutable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePayload {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<NameEntry>>,
    pub ingredients: Option<Vec<NameEntry>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_distinguishes_absent_from_empty_relations() {
        let absent: RecipePayload = serde_json::from_str(r#"{"title":"Pongal"}"#).unwrap();
        assert!(absent.tags.is_none());

        let empty: RecipePayload = serde_json::from_str(r#"{"tags":[]}"#).unwrap();
        assert_eq!(empty.tags, Some(vec![]));
    }

    #[test]
    fn payload_discards_user_member() {
        // Owner must not be assignable through the write payload.
        let payload: RecipePayload =
            serde_json::from_str(r#"{"title":"Pongal","user":42}"#).unwrap();
        assert_eq!(payload.title.as_deref(), Some("Pongal"));
    }

    #[test]
    fn payload_accepts_decimal_price_as_string() {
        let payload: RecipePayload = serde_json::from_str(r#"{"price":"2.50"}"#).unwrap();
        assert_eq!(payload.price, Some(Decimal::new(250, 2)));
    }

    #[test]
    fn detail_flattens_base_projection() {
        let recipe = recipe::Model {
            id: 7,
            user_id: 1,
            title: "Thai Prawn Curry".to_string(),
            time_minutes: 30,
            price: Decimal::new(250, 2),
            link: String::new(),
            description: "Spicy.".to_string(),
            image: None,
        };
        let detail = RecipeDetail::from_parts(recipe, vec![], vec![]);
        let json = serde_json::to_value(&detail).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["title"], "Thai Prawn Curry");
        assert_eq!(json["price"], "2.50");
        assert_eq!(json["description"], "Spicy.");
        assert!(json["image"].is_null());
    }
}
