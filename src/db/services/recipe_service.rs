use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sea_orm::sea_query::{OnConflict, Query};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, LoaderTrait, ModelTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};

use crate::db::entities::{ingredient, recipe, recipe_ingredient, recipe_tag, tag};
use crate::db::models::{NameEntry, RecipeDetail, RecipePayload, RecipeSummary};

/// Field-name to reason mapping reported back to the caller on 400s.
pub type FieldErrors = BTreeMap<String, String>;

/// Which update policy a request follows.
///
/// `Replace` (PUT) resets every scalar absent from the payload to its
/// declared default and clears every absent relation. `Merge` (PATCH) only
/// touches what the payload supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Replace,
    Merge,
}

/// Optional id filters for the list endpoint. Within one member any match
/// qualifies; when both are given a recipe must satisfy each.
#[derive(Debug, Default)]
pub struct RecipeListFilter {
    pub tag_ids: Option<Vec<i32>>,
    pub ingredient_ids: Option<Vec<i32>>,
}

/// Statically declared scalar schema of the recipe write payload.
///
/// Required/default handling for the full-update policy is driven by this
/// table rather than by reflecting over the live schema. The defaults
/// themselves are applied, typed, in `apply_scalars`.
struct ScalarField {
    name: &'static str,
    required: bool,
    present: fn(&RecipePayload) -> bool,
}

const SCALAR_FIELDS: &[ScalarField] = &[
    ScalarField {
        name: "title",
        required: true,
        present: |p| p.title.is_some(),
    },
    ScalarField {
        name: "time_minutes",
        required: false,
        present: |p| p.time_minutes.is_some(),
    },
    ScalarField {
        name: "price",
        required: false,
        present: |p| p.price.is_some(),
    },
    ScalarField {
        name: "link",
        required: false,
        present: |p| p.link.is_some(),
    },
    ScalarField {
        name: "description",
        required: false,
        present: |p| p.description.is_some(),
    },
];

const MAX_FIELD_LEN: usize = 255;

/// Validates a write payload. With `require_all` (create and PUT) every
/// required field of the static schema must be present; all violations are
/// collected and reported together.
pub fn validate_payload(payload: &RecipePayload, require_all: bool) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if require_all {
        for field in SCALAR_FIELDS {
            if field.required && !(field.present)(payload) {
                errors.insert(field.name.to_string(), "This field is required.".to_string());
            }
        }
    }

    if let Some(title) = &payload.title {
        if title.trim().is_empty() {
            errors.insert(
                "title".to_string(),
                "This field may not be blank.".to_string(),
            );
        } else if title.chars().count() > MAX_FIELD_LEN {
            errors.insert(
                "title".to_string(),
                format!("Ensure this field has no more than {MAX_FIELD_LEN} characters."),
            );
        }
    }

    if let Some(price) = payload.price {
        if price.is_sign_negative() && !price.is_zero() {
            errors.insert(
                "price".to_string(),
                "Ensure this value is greater than or equal to 0.".to_string(),
            );
        } else if price >= Decimal::from(1000) {
            errors.insert(
                "price".to_string(),
                "Ensure that there are no more than 3 digits before the decimal point.".to_string(),
            );
        } else if price.normalize().scale() > 2 {
            errors.insert(
                "price".to_string(),
                "Ensure that there are no more than 2 decimal places.".to_string(),
            );
        }
    }

    if let Some(link) = &payload.link {
        if link.chars().count() > MAX_FIELD_LEN {
            errors.insert(
                "link".to_string(),
                format!("Ensure this field has no more than {MAX_FIELD_LEN} characters."),
            );
        }
    }

    if let Some(tags) = &payload.tags {
        if let Some(reason) = validate_names(tags) {
            errors.insert("tags".to_string(), reason);
        }
    }
    if let Some(ingredients) = &payload.ingredients {
        if let Some(reason) = validate_names(ingredients) {
            errors.insert("ingredients".to_string(), reason);
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn validate_names(entries: &[NameEntry]) -> Option<String> {
    for entry in entries {
        if entry.name.trim().is_empty() {
            return Some("Name may not be blank.".to_string());
        }
        if entry.name.chars().count() > MAX_FIELD_LEN {
            return Some(format!(
                "Ensure each name has no more than {MAX_FIELD_LEN} characters."
            ));
        }
    }
    None
}

/// Applies the payload's scalar fields onto an existing recipe row.
///
/// `Replace` writes every scalar: present members take the supplied value,
/// absent ones the declared default (`time_minutes` 0, `price` 0.00, `link`
/// and `description` empty, `image` cleared). `Merge` only writes present
/// members. The id and owner are never written by either mode.
fn apply_scalars(
    existing: recipe::Model,
    payload: &RecipePayload,
    mode: UpdateMode,
) -> recipe::ActiveModel {
    let mut model = existing.into_active_model();

    if let Some(title) = &payload.title {
        model.title = Set(title.clone());
    }

    match (payload.time_minutes, mode) {
        (Some(minutes), _) => model.time_minutes = Set(minutes),
        (None, UpdateMode::Replace) => model.time_minutes = Set(0),
        (None, UpdateMode::Merge) => {}
    }
    match (payload.price, mode) {
        (Some(price), _) => model.price = Set(price),
        (None, UpdateMode::Replace) => model.price = Set(Decimal::ZERO),
        (None, UpdateMode::Merge) => {}
    }
    match (&payload.link, mode) {
        (Some(link), _) => model.link = Set(link.clone()),
        (None, UpdateMode::Replace) => model.link = Set(String::new()),
        (None, UpdateMode::Merge) => {}
    }
    match (&payload.description, mode) {
        (Some(description), _) => model.description = Set(description.clone()),
        (None, UpdateMode::Replace) => model.description = Set(String::new()),
        (None, UpdateMode::Merge) => {}
    }
    // The payload cannot carry an image; a full update clears it.
    if mode == UpdateMode::Replace {
        model.image = Set(None);
    }

    model
}

/// Lists the caller's recipes, newest first, optionally restricted to those
/// linked to any of the given tag or ingredient ids.
pub async fn list_recipes(
    db: &DatabaseConnection,
    user_id: i32,
    filter: &RecipeListFilter,
) -> Result<Vec<RecipeSummary>, DbErr> {
    let mut select = recipe::Entity::find()
        .filter(recipe::Column::UserId.eq(user_id))
        .order_by_desc(recipe::Column::Id);

    if let Some(ids) = &filter.tag_ids {
        select = select.filter(
            recipe::Column::Id.in_subquery(
                Query::select()
                    .column(recipe_tag::Column::RecipeId)
                    .from(recipe_tag::Entity)
                    .and_where(recipe_tag::Column::TagId.is_in(ids.iter().copied()))
                    .to_owned(),
            ),
        );
    }
    if let Some(ids) = &filter.ingredient_ids {
        select = select.filter(
            recipe::Column::Id.in_subquery(
                Query::select()
                    .column(recipe_ingredient::Column::RecipeId)
                    .from(recipe_ingredient::Entity)
                    .and_where(recipe_ingredient::Column::IngredientId.is_in(ids.iter().copied()))
                    .to_owned(),
            ),
        );
    }

    let recipes = select.all(db).await?;
    let tags = recipes
        .load_many_to_many(tag::Entity, recipe_tag::Entity, db)
        .await?;
    let ingredients = recipes
        .load_many_to_many(ingredient::Entity, recipe_ingredient::Entity, db)
        .await?;

    Ok(recipes
        .into_iter()
        .zip(tags)
        .zip(ingredients)
        .map(|((recipe, tags), ingredients)| RecipeSummary::from_parts(recipe, tags, ingredients))
        .collect())
}

/// Fetches one of the caller's recipes. A recipe owned by someone else is
/// indistinguishable from an absent one.
pub async fn get_recipe(
    db: &DatabaseConnection,
    user_id: i32,
    recipe_id: i32,
) -> Result<Option<RecipeDetail>, DbErr> {
    let Some(model) = find_owned(db, user_id, recipe_id).await? else {
        return Ok(None);
    };
    Ok(Some(hydrate_detail(db, model).await?))
}

/// Creates a recipe for the caller, resolving nested tag and ingredient
/// payloads against the caller's vocabularies inside one transaction.
pub async fn create_recipe(
    db: &DatabaseConnection,
    user_id: i32,
    payload: &RecipePayload,
) -> Result<RecipeDetail, DbErr> {
    let txn = db.begin().await?;

    let model = recipe::ActiveModel {
        user_id: Set(user_id),
        title: Set(payload.title.clone().unwrap_or_default()),
        time_minutes: Set(payload.time_minutes.unwrap_or(0)),
        price: Set(payload.price.unwrap_or(Decimal::ZERO)),
        link: Set(payload.link.clone().unwrap_or_default()),
        description: Set(payload.description.clone().unwrap_or_default()),
        image: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if let Some(tags) = &payload.tags {
        resolve_and_link_tags(&txn, user_id, model.id, tags).await?;
    }
    if let Some(ingredients) = &payload.ingredients {
        resolve_and_link_ingredients(&txn, user_id, model.id, ingredients).await?;
    }

    let detail = hydrate_detail(&txn, model).await?;
    txn.commit().await?;
    Ok(detail)
}

/// Updates one of the caller's recipes under the given policy. Returns
/// `None` when the recipe is absent or owned by someone else.
pub async fn update_recipe(
    db: &DatabaseConnection,
    user_id: i32,
    recipe_id: i32,
    payload: &RecipePayload,
    mode: UpdateMode,
) -> Result<Option<RecipeDetail>, DbErr> {
    let txn = db.begin().await?;

    let Some(existing) = find_owned(&txn, user_id, recipe_id).await? else {
        txn.rollback().await?;
        return Ok(None);
    };

    let changes = apply_scalars(existing.clone(), payload, mode);
    let model = if changes.is_changed() {
        changes.update(&txn).await?
    } else {
        existing
    };

    match (&payload.tags, mode) {
        (Some(entries), _) => {
            clear_tags(&txn, model.id).await?;
            resolve_and_link_tags(&txn, user_id, model.id, entries).await?;
        }
        (None, UpdateMode::Replace) => clear_tags(&txn, model.id).await?,
        (None, UpdateMode::Merge) => {}
    }
    match (&payload.ingredients, mode) {
        (Some(entries), _) => {
            clear_ingredients(&txn, model.id).await?;
            resolve_and_link_ingredients(&txn, user_id, model.id, entries).await?;
        }
        (None, UpdateMode::Replace) => clear_ingredients(&txn, model.id).await?,
        (None, UpdateMode::Merge) => {}
    }

    let detail = hydrate_detail(&txn, model).await?;
    txn.commit().await?;
    Ok(Some(detail))
}

/// Deletes one of the caller's recipes. Links are removed by the cascade;
/// tags and ingredients themselves survive.
pub async fn delete_recipe(
    db: &DatabaseConnection,
    user_id: i32,
    recipe_id: i32,
) -> Result<u64, DbErr> {
    let result = recipe::Entity::delete_many()
        .filter(recipe::Column::Id.eq(recipe_id))
        .filter(recipe::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Persists a freshly stored image reference on one of the caller's recipes,
/// returning the updated row and the reference it replaced.
pub async fn attach_image(
    db: &DatabaseConnection,
    user_id: i32,
    recipe_id: i32,
    reference: &str,
) -> Result<Option<(recipe::Model, Option<String>)>, DbErr> {
    let Some(existing) = find_owned(db, user_id, recipe_id).await? else {
        return Ok(None);
    };
    let previous = existing.image.clone();

    let mut model = existing.into_active_model();
    model.image = Set(Some(reference.to_string()));
    let updated = model.update(db).await?;

    Ok(Some((updated, previous)))
}

async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    recipe_id: i32,
) -> Result<Option<recipe::Model>, DbErr> {
    recipe::Entity::find_by_id(recipe_id)
        .filter(recipe::Column::UserId.eq(user_id))
        .one(conn)
        .await
}

async fn hydrate_detail<C: ConnectionTrait>(
    conn: &C,
    model: recipe::Model,
) -> Result<RecipeDetail, DbErr> {
    let tags = model
        .find_related(tag::Entity)
        .order_by_asc(tag::Column::Id)
        .all(conn)
        .await?;
    let ingredients = model
        .find_related(ingredient::Entity)
        .order_by_asc(ingredient::Column::Id)
        .all(conn)
        .await?;
    Ok(RecipeDetail::from_parts(model, tags, ingredients))
}

/// Find-or-create within the caller's tag namespace. A concurrent creation
/// race on the same new name is resolved by the `(user_id, name)` uniqueness
/// constraint: insert with `ON CONFLICT DO NOTHING`, then re-fetch.
async fn get_or_create_tag<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    name: &str,
) -> Result<tag::Model, DbErr> {
    if let Some(existing) = tag::Entity::find()
        .filter(tag::Column::UserId.eq(user_id))
        .filter(tag::Column::Name.eq(name))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    tag::Entity::insert(tag::ActiveModel {
        user_id: Set(user_id),
        name: Set(name.to_string()),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::columns([tag::Column::UserId, tag::Column::Name])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    tag::Entity::find()
        .filter(tag::Column::UserId.eq(user_id))
        .filter(tag::Column::Name.eq(name))
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("tag '{name}' missing after upsert")))
}

async fn get_or_create_ingredient<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    name: &str,
) -> Result<ingredient::Model, DbErr> {
    if let Some(existing) = ingredient::Entity::find()
        .filter(ingredient::Column::UserId.eq(user_id))
        .filter(ingredient::Column::Name.eq(name))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    ingredient::Entity::insert(ingredient::ActiveModel {
        user_id: Set(user_id),
        name: Set(name.to_string()),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::columns([ingredient::Column::UserId, ingredient::Column::Name])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    ingredient::Entity::find()
        .filter(ingredient::Column::UserId.eq(user_id))
        .filter(ingredient::Column::Name.eq(name))
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("ingredient '{name}' missing after upsert")))
}

async fn resolve_and_link_tags<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    recipe_id: i32,
    entries: &[NameEntry],
) -> Result<(), DbErr> {
    for entry in entries {
        let tag = get_or_create_tag(conn, user_id, &entry.name).await?;
        // Duplicate names within one request collapse on the composite key.
        recipe_tag::Entity::insert(recipe_tag::ActiveModel {
            recipe_id: Set(recipe_id),
            tag_id: Set(tag.id),
        })
        .on_conflict(
            OnConflict::columns([recipe_tag::Column::RecipeId, recipe_tag::Column::TagId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    }
    Ok(())
}

async fn resolve_and_link_ingredients<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    recipe_id: i32,
    entries: &[NameEntry],
) -> Result<(), DbErr> {
    for entry in entries {
        let ingredient = get_or_create_ingredient(conn, user_id, &entry.name).await?;
        recipe_ingredient::Entity::insert(recipe_ingredient::ActiveModel {
            recipe_id: Set(recipe_id),
            ingredient_id: Set(ingredient.id),
        })
        .on_conflict(
            OnConflict::columns([
                recipe_ingredient::Column::RecipeId,
                recipe_ingredient::Column::IngredientId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    }
    Ok(())
}

async fn clear_tags<C: ConnectionTrait>(conn: &C, recipe_id: i32) -> Result<(), DbErr> {
    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(conn)
        .await?;
    Ok(())
}

async fn clear_ingredients<C: ConnectionTrait>(conn: &C, recipe_id: i32) -> Result<(), DbErr> {
    recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ActiveValue, DatabaseBackend, MockDatabase, MockExecResult};

    fn sample_recipe() -> recipe::Model {
        recipe::Model {
            id: 5,
            user_id: 1,
            title: "Sample recipe title".to_string(),
            time_minutes: 22,
            price: Decimal::new(525, 2),
            link: "http://example.com/recipe.pdf".to_string(),
            description: "Sample description".to_string(),
            image: Some("recipe/old.png".to_string()),
        }
    }

    fn payload_json(json: &str) -> RecipePayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn full_update_reports_every_missing_required_field() {
        let errors = validate_payload(&RecipePayload::default(), true).unwrap_err();
        assert_eq!(
            errors.get("title").map(String::as_str),
            Some("This field is required.")
        );
    }

    #[test]
    fn partial_update_does_not_demand_required_fields() {
        assert!(validate_payload(&RecipePayload::default(), false).is_ok());
    }

    #[test]
    fn price_shape_is_enforced() {
        let too_wide = payload_json(r#"{"price":"1000.00"}"#);
        let errors = validate_payload(&too_wide, false).unwrap_err();
        assert!(errors.contains_key("price"));

        let too_precise = payload_json(r#"{"price":"2.505"}"#);
        let errors = validate_payload(&too_precise, false).unwrap_err();
        assert!(errors.contains_key("price"));

        let negative = payload_json(r#"{"price":"-1.00"}"#);
        let errors = validate_payload(&negative, false).unwrap_err();
        assert!(errors.contains_key("price"));

        let fine = payload_json(r#"{"price":"999.99"}"#);
        assert!(validate_payload(&fine, false).is_ok());
    }

    #[test]
    fn blank_title_and_blank_names_are_rejected_together() {
        let payload = payload_json(r#"{"title":"  ","tags":[{"name":""}]}"#);
        let errors = validate_payload(&payload, false).unwrap_err();
        assert!(errors.contains_key("title"));
        assert!(errors.contains_key("tags"));
    }

    #[test]
    fn replace_resets_absent_scalars_and_clears_image() {
        let payload = payload_json(r#"{"title":"New title"}"#);
        let model = apply_scalars(sample_recipe(), &payload, UpdateMode::Replace);

        assert!(matches!(model.title, ActiveValue::Set(ref t) if t == "New title"));
        assert!(matches!(model.time_minutes, ActiveValue::Set(0)));
        assert!(matches!(model.price, ActiveValue::Set(p) if p == Decimal::ZERO));
        assert!(matches!(model.link, ActiveValue::Set(ref l) if l.is_empty()));
        assert!(matches!(model.description, ActiveValue::Set(ref d) if d.is_empty()));
        assert!(matches!(model.image, ActiveValue::Set(None)));
    }

    #[test]
    fn merge_leaves_absent_scalars_untouched() {
        let payload = payload_json(r#"{"title":"New title"}"#);
        let model = apply_scalars(sample_recipe(), &payload, UpdateMode::Merge);

        assert!(matches!(model.title, ActiveValue::Set(ref t) if t == "New title"));
        assert!(matches!(model.time_minutes, ActiveValue::Unchanged(22)));
        assert!(matches!(model.link, ActiveValue::Unchanged(_)));
        assert!(matches!(model.description, ActiveValue::Unchanged(_)));
        assert!(matches!(model.image, ActiveValue::Unchanged(_)));
    }

    #[test]
    fn owner_is_never_written_by_either_mode() {
        let payload = payload_json(r#"{"title":"New title","time_minutes":10,"price":"2.50"}"#);
        for mode in [UpdateMode::Replace, UpdateMode::Merge] {
            let model = apply_scalars(sample_recipe(), &payload, mode);
            assert!(matches!(model.user_id, ActiveValue::Unchanged(1)));
            assert!(matches!(model.id, ActiveValue::Unchanged(5)));
        }
    }

    #[tokio::test]
    async fn update_of_foreign_recipe_is_none() {
        // The owner-scoped lookup comes back empty, so the caller sees
        // NotFound rather than Forbidden.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<recipe::Model>::new()])
            .into_connection();

        let result = update_recipe(&db, 2, 5, &RecipePayload::default(), UpdateMode::Merge)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    // Debug output escapes the identifier quoting; strip it for matching.
    fn logged_sql(db: DatabaseConnection) -> String {
        format!("{:?}", db.into_transaction_log()).replace('\\', "")
    }

    #[tokio::test]
    async fn merge_with_empty_tags_clears_tags_only() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![sample_recipe()]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 2,
            }])
            .append_query_results([Vec::<tag::Model>::new()])
            .append_query_results([Vec::<ingredient::Model>::new()])
            .into_connection();

        let payload = payload_json(r#"{"tags":[]}"#);
        let detail = update_recipe(&db, 1, 5, &payload, UpdateMode::Merge)
            .await
            .unwrap()
            .unwrap();
        assert!(detail.summary.tags.is_empty());

        let sql = logged_sql(db);
        assert!(sql.contains(r#"DELETE FROM "recipe_tags""#));
        assert!(!sql.contains(r#"INSERT INTO "recipe_tags""#));
        assert!(!sql.contains(r#"DELETE FROM "recipe_ingredients""#));
    }

    #[tokio::test]
    async fn replace_with_absent_relations_clears_both_join_tables() {
        let updated = recipe::Model {
            title: "New title".to_string(),
            time_minutes: 0,
            price: Decimal::ZERO,
            link: String::new(),
            description: String::new(),
            image: None,
            ..sample_recipe()
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![sample_recipe()], vec![updated]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .append_query_results([Vec::<tag::Model>::new()])
            .append_query_results([Vec::<ingredient::Model>::new()])
            .into_connection();

        let payload = payload_json(r#"{"title":"New title"}"#);
        let detail = update_recipe(&db, 1, 5, &payload, UpdateMode::Replace)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.summary.title, "New title");
        assert!(detail.summary.tags.is_empty());
        assert!(detail.summary.ingredients.is_empty());

        let sql = logged_sql(db);
        assert!(sql.contains(r#"DELETE FROM "recipe_tags""#));
        assert!(sql.contains(r#"DELETE FROM "recipe_ingredients""#));
        assert!(!sql.contains(r#"INSERT INTO "recipe_tags""#));
        assert!(!sql.contains(r#"INSERT INTO "recipe_ingredients""#));
    }

    #[tokio::test]
    async fn list_filter_restricts_recipes_by_tag_subquery() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![sample_recipe()]])
            .append_query_results([vec![recipe_tag::Model {
                recipe_id: 5,
                tag_id: 1,
            }]])
            .append_query_results([vec![tag::Model {
                id: 1,
                user_id: 1,
                name: "Dinner".to_string(),
            }]])
            .append_query_results([Vec::<recipe_ingredient::Model>::new()])
            .append_query_results([Vec::<ingredient::Model>::new()])
            .into_connection();

        let filter = RecipeListFilter {
            tag_ids: Some(vec![1, 2]),
            ingredient_ids: None,
        };
        let summaries = list_recipes(&db, 1, &filter).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].tags[0].name, "Dinner");

        let sql = logged_sql(db);
        assert!(sql.contains(r#"IN (SELECT "recipe_id" FROM "recipe_tags""#));
        assert!(sql.contains(r#"ORDER BY "recipes"."id" DESC"#));
    }

    #[tokio::test]
    async fn get_or_create_reuses_existing_row() {
        let existing = tag::Model {
            id: 3,
            user_id: 1,
            name: "Dinner".to_string(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing.clone()]])
            .into_connection();

        let tag = get_or_create_tag(&db, 1, "Dinner").await.unwrap();
        assert_eq!(tag, existing);

        // A single select, no insert.
        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn get_or_create_inserts_then_refetches() {
        let created = tag::Model {
            id: 9,
            user_id: 1,
            name: "Thai".to_string(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<tag::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 9,
                rows_affected: 1,
            }])
            .append_query_results([vec![created.clone()]])
            .into_connection();

        let tag = get_or_create_tag(&db, 1, "Thai").await.unwrap();
        assert_eq!(tag, created);
    }
}
