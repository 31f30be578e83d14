use sea_orm::sea_query;
use sea_orm_migration::prelude::Iden;

#[derive(Iden, Clone, Copy)]
pub enum KnowledgeEntities {
    Table,
    EntityId,
    Name,
}

#[derive(Iden, Clone, Copy)]
pub enum KnowledgeFacts {
    Table,
    FactId,
    EntityId,
    Key,
    #[iden = "type_"]
    Type,
    IntValue,
    CharValue,
    FloatValue,
    BoolValue,
}
