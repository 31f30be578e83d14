use sea_orm_migration::prelude::*;

use crate::db::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(KnowledgeEntities::Table)
                    .if_not_exists()
                    .col(id_col(KnowledgeEntities::EntityId))
                    .col(
                        ColumnDef::new(KnowledgeEntities::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_knowledge_entities")
                            .col(KnowledgeEntities::EntityId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(KnowledgeFacts::Table)
                    .if_not_exists()
                    .col(id_col(KnowledgeFacts::FactId))
                    .col(id_col(KnowledgeFacts::EntityId))
                    .col(
                        ColumnDef::new(KnowledgeFacts::Key)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(KnowledgeFacts::Type).string_len(16).null())
                    .col(ColumnDef::new(KnowledgeFacts::IntValue).big_integer().null())
                    .col(ColumnDef::new(KnowledgeFacts::CharValue).text().null())
                    .col(ColumnDef::new(KnowledgeFacts::FloatValue).double().null())
                    .col(ColumnDef::new(KnowledgeFacts::BoolValue).boolean().null())
                    .primary_key(
                        Index::create()
                            .name("pk_knowledge_facts")
                            .col(KnowledgeFacts::FactId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_knowledge_facts_entity")
                            .from(KnowledgeFacts::Table, KnowledgeFacts::EntityId)
                            .to(KnowledgeEntities::Table, KnowledgeEntities::EntityId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_knowledge_facts_entity_key")
                    .table(KnowledgeFacts::Table)
                    .col(KnowledgeFacts::EntityId)
                    .col(KnowledgeFacts::Key)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_knowledge_entities_name")
                    .table(KnowledgeEntities::Table)
                    .col(KnowledgeEntities::Name)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(KnowledgeFacts::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(KnowledgeEntities::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}

/// Ids are stored as hyphenated uuid strings on every backend.
fn id_col(col: impl Iden + 'static) -> ColumnDef {
    ColumnDef::new(col).string_len(36).not_null().to_owned()
}
