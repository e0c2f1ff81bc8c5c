use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "staged_media")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub post_id: String,
    #[sea_orm(unique, column_type = "Text")]
    pub object_key: String,
    pub media_type: String, // "image" | "video"
    #[sea_orm(column_type = "Text")]
    pub url: String,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::staged_posts::Entity",
        from = "Column::PostId",
        to = "super::staged_posts::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    StagedPosts,
}

impl Related<super::staged_posts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StagedPosts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
