use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder,
};

use crate::db::entities::tag;

/// Retrieves all of a user's tags, ordered by name, descending.
pub async fn list_tags(db: &DatabaseConnection, user_id: i32) -> Result<Vec<tag::Model>, DbErr> {
    tag::Entity::find()
        .filter(tag::Column::UserId.eq(user_id))
        .order_by_desc(tag::Column::Name)
        .all(db)
        .await
}

/// Renames one of the user's tags. Returns `None` when the tag is absent or
/// owned by someone else.
pub async fn update_tag(
    db: &DatabaseConnection,
    user_id: i32,
    tag_id: i32,
    name: &str,
) -> Result<Option<tag::Model>, DbErr> {
    let Some(existing) = tag::Entity::find_by_id(tag_id)
        .filter(tag::Column::UserId.eq(user_id))
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

/// Deletes one of the user's tags. Recipe links go with it via the cascade;
/// recipes themselves are untouched.
pub async fn delete_tag(db: &DatabaseConnection, user_id: i32, tag_id: i32) -> Result<u64, DbErr> {
    let result = tag::Entity::delete_many()
        .filter(tag::Column::Id.eq(tag_id))
        .filter(tag::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn update_of_foreign_tag_is_none() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<tag::Model>::new()])
            .into_connection();

        let result = update_tag(&db, 2, 8, "Brunch").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn update_with_same_name_skips_the_write() {
        let existing = tag::Model {
            id: 8,
            user_id: 1,
            name: "Brunch".to_string(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing.clone()]])
            .into_connection();

        let result = update_tag(&db, 1, 8, "Brunch").await.unwrap();
        assert_eq!(result, Some(existing));

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
    }
}
