use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "production_posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub model_id: String,
    #[sea_orm(column_type = "Text")]
    pub object_key: String, // unique together with model_id
    pub media_type: String,
    #[sea_orm(column_type = "Text")]
    pub content_url: String, // signed, expires
    pub title: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::production_models::Entity",
        from = "Column::ModelId",
        to = "super::production_models::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    ProductionModels,
}

impl Related<super::production_models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductionModels.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
