use sea_orm::{DatabaseConnection, DbErr, EntityTrait, QueryOrder, Set};
use uuid::Uuid;

use crate::entities::image;

pub struct NewImage {
    pub title: String,
    pub description: Option<String>,
    pub file_key: String,
    pub file_url: String,
}

/// All images, newest first. Order among records created in the same
/// microsecond is unspecified.
pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<image::Model>, DbErr> {
    image::Entity::find()
        .order_by_desc(image::Column::CreatedAt)
        .all(db)
        .await
}

pub async fn get_by_id(db: &DatabaseConnection, id: &str) -> Result<Option<image::Model>, DbErr> {
    image::Entity::find_by_id(id).one(db).await
}

/// Insert a new record and return the stored row. The row is re-read by id
/// after the insert; a missing row at that point surfaces as
/// `DbErr::RecordNotInserted`.
pub async fn create(db: &DatabaseConnection, new: NewImage) -> Result<image::Model, DbErr> {
    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string();

    let row = image::ActiveModel {
        id: Set(id.clone()),
        title: Set(new.title),
        description: Set(new.description),
        file_key: Set(new.file_key),
        file_url: Set(new.file_url),
        created_at: Set(now),
    };
    image::Entity::insert(row).exec(db).await?;

    get_by_id(db, &id).await?.ok_or(DbErr::RecordNotInserted)
}

/// Delete the row matching `id`. Returns whether a row was actually removed;
/// an already-absent row is `false`, not an error.
pub async fn delete(db: &DatabaseConnection, id: &str) -> Result<bool, DbErr> {
    let result = image::Entity::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected > 0)
}
