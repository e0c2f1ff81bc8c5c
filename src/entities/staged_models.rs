use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "staged_models")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub folder_name: String, // top-level bucket prefix
    #[sea_orm(column_type = "Text", nullable)]
    pub thumbnail_key: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub icon_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub banner_url: Option<String>,
    #[sea_orm(default_value = 0)]
    pub post_count: i32,
    pub status: String, // "staged" | "active"
    pub last_synced_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::staged_posts::Entity")]
    StagedPosts,
}

impl Related<super::staged_posts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StagedPosts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
