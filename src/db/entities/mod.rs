//! SeaORM entities that map to the recipe API tables.
//!
//! Each entity lives in its own module. `recipe_tag` and `recipe_ingredient`
//! are the join tables behind the two many-to-many relations.

pub mod ingredient;
pub mod recipe;
pub mod recipe_ingredient;
pub mod recipe_tag;
pub mod tag;
pub mod user;

pub mod prelude {
    pub use super::user::Entity as User;
    pub use super::user::Model as UserModel;

    pub use super::recipe::Entity as Recipe;
    pub use super::recipe::Model as RecipeModel;

    pub use super::tag::Entity as Tag;
    pub use super::tag::Model as TagModel;

    pub use super::ingredient::Entity as Ingredient;
    pub use super::ingredient::Model as IngredientModel;

    pub use super::recipe_ingredient::Entity as RecipeIngredient;
    pub use super::recipe_tag::Entity as RecipeTag;
}
