use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "staged_posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub model_id: String,
    pub folder_name: String, // unique together with model_id
    pub title: String,
    pub media_summary: Json, // {"images": [url], "videos": [url]}
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::staged_models::Entity",
        from = "Column::ModelId",
        to = "super::staged_models::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    StagedModels,
    #[sea_orm(has_many = "super::staged_media::Entity")]
    StagedMedia,
}

impl Related<super::staged_models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StagedModels.def()
    }
}

impl Related<super::staged_media::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StagedMedia.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
