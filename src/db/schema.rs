use crate::entities::{
    author, book, catalog_book, comment, follow, librarian, library, library_book, like,
    notification, post, user, user_permission,
};
use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait, Schema};

/// Creates every table that does not exist yet.
///
/// Tables are listed so that referenced tables come first, which MySQL
/// requires for foreign keys.
pub async fn init_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let tables: Vec<TableCreateStatement> = vec![
        table(&schema, user::Entity),
        table(&schema, user_permission::Entity),
        table(&schema, follow::Entity),
        table(&schema, book::Entity),
        table(&schema, author::Entity),
        table(&schema, catalog_book::Entity),
        table(&schema, library::Entity),
        table(&schema, library_book::Entity),
        table(&schema, librarian::Entity),
        table(&schema, post::Entity),
        table(&schema, comment::Entity),
        table(&schema, like::Entity),
        table(&schema, notification::Entity),
    ];

    for stmt in tables {
        db.execute(backend.build(&stmt)).await?;
    }

    for mut stmt in indexes() {
        // MySQL has no IF NOT EXISTS for indexes; a rerun reports the duplicate instead
        if backend == DbBackend::MySql {
            match db.execute(backend.build(&stmt)).await {
                Err(err) if err.to_string().contains("Duplicate key name") => continue,
                other => other?,
            };
        } else {
            stmt.if_not_exists();
            db.execute(backend.build(&stmt)).await?;
        }
    }

    Ok(())
}

fn table<E: EntityTrait>(schema: &Schema, entity: E) -> TableCreateStatement {
    schema
        .create_table_from_entity(entity)
        .if_not_exists()
        .to_owned()
}

fn indexes() -> Vec<IndexCreateStatement> {
    vec![
        // One like per (user, post)
        Index::create()
            .name("uq_post_likes_user_post")
            .table(like::Entity)
            .col(like::Column::UserId)
            .col(like::Column::PostId)
            .unique()
            .to_owned(),
        Index::create()
            .name("idx_notifications_recipient_read")
            .table(notification::Entity)
            .col(notification::Column::RecipientId)
            .col(notification::Column::IsRead)
            .col(notification::Column::Timestamp)
            .to_owned(),
        Index::create()
            .name("idx_posts_created_at")
            .table(post::Entity)
            .col(post::Column::CreatedAt)
            .to_owned(),
    ]
}
