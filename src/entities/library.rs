use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "libraries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::librarian::Entity")]
    Librarian,
}

impl Related<super::librarian::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Librarian.def()
    }
}

impl Related<super::catalog_book::Entity> for Entity {
    fn to() -> RelationDef {
        super::library_book::Relation::CatalogBook.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::library_book::Relation::Library.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
