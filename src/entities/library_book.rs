use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Join table for the library <-> catalog book many-to-many association.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "library_books")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub library_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub catalog_book_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::library::Entity",
        from = "Column::LibraryId",
        to = "super::library::Column::Id",
        on_delete = "Cascade"
    )]
    Library,
    #[sea_orm(
        belongs_to = "super::catalog_book::Entity",
        from = "Column::CatalogBookId",
        to = "super::catalog_book::Column::Id",
        on_delete = "Cascade"
    )]
    CatalogBook,
}

impl ActiveModelBehavior for ActiveModel {}
