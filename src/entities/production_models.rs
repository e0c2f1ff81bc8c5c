use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "production_models")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub name: String, // staged folder name, the promotion key
    pub slug: String,
    pub staged_model_id: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub thumbnail_key: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub icon_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub banner_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::production_posts::Entity")]
    ProductionPosts,
}

impl Related<super::production_posts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductionPosts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
