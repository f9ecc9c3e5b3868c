use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder,
};

use crate::db::entities::ingredient;

/// Retrieves all of a user's ingredients, ordered by name, descending.
pub async fn list_ingredients(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<ingredient::Model>, DbErr> {
    ingredient::Entity::find()
        .filter(ingredient::Column::UserId.eq(user_id))
        .order_by_desc(ingredient::Column::Name)
        .all(db)
        .await
}

/// Renames one of the user's ingredients. Returns `None` when the ingredient
/// is absent or owned by someone else.
pub async fn update_ingredient(
    db: &DatabaseConnection,
    user_id: i32,
    ingredient_id: i32,
    name: &str,
) -> Result<Option<ingredient::Model>, DbErr> {
    let Some(existing) = ingredient::Entity::find_by_id(ingredient_id)
        .filter(ingredient::Column::UserId.eq(user_id))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    if existing.name == name {
        return Ok(Some(existing));
    }

    let mut model = existing.into_active_model();
    model.name = Set(name.to_string());
    Ok(Some(model.update(db).await?))
}

/// Deletes one of the user's ingredients.
pub async fn delete_ingredient(
    db: &DatabaseConnection,
    user_id: i32,
    ingredient_id: i32,
) -> Result<u64, DbErr> {
    let result = ingredient::Entity::delete_many()
        .filter(ingredient::Column::Id.eq(ingredient_id))
        .filter(ingredient::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
