use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string_uniq(Users::WalletAddress))
                    .col(
                        big_integer(Users::KeyCount)
                            .default(0)
                            .check(Expr::col(Users::KeyCount).gte(0)),
                    )
                    .col(
                        big_integer(Users::BoxesOwned)
                            .default(0)
                            .check(Expr::col(Users::BoxesOwned).gte(0)),
                    )
                    .col(
                        big_integer(Users::BoxesOpened)
                            .default(0)
                            .check(Expr::col(Users::BoxesOpened).gte(0)),
                    )
                    .col(timestamp_with_time_zone(Users::CreatedAt))
                    .col(timestamp_with_time_zone(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OwnedBoxes::Table)
                    .if_not_exists()
                    .col(big_integer(OwnedBoxes::TokenId).primary_key())
                    .col(integer(OwnedBoxes::UserId))
                    .col(string(OwnedBoxes::Status)) // owned | opened | released
                    .col(timestamp_with_time_zone(OwnedBoxes::AcquiredAt))
                    .col(timestamp_with_time_zone(OwnedBoxes::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(OwnedBoxes::Table, OwnedBoxes::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_owned_boxes_user_status")
                    .table(OwnedBoxes::Table)
                    .col(OwnedBoxes::UserId)
                    .col(OwnedBoxes::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TaskDefinitions::Table)
                    .if_not_exists()
                    .col(string(TaskDefinitions::Id).primary_key())
                    .col(string(TaskDefinitions::Title))
                    .col(string(TaskDefinitions::Kind)) // social | nft | onchain
                    .col(string(TaskDefinitions::Platform))
                    .col(big_integer(TaskDefinitions::RewardKeys))
                    .col(string_null(TaskDefinitions::Collection))
                    .col(big_integer_null(TaskDefinitions::MinBalance))
                    .col(big_integer_null(TaskDefinitions::KeysPerNft))
                    .col(big_integer_null(TaskDefinitions::MaxKeys))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TaskRecords::Table)
                    .if_not_exists()
                    .col(pk_auto(TaskRecords::Id))
                    .col(integer(TaskRecords::UserId))
                    .col(string(TaskRecords::TaskId))
                    .col(string(TaskRecords::Platform))
                    .col(big_integer(TaskRecords::KeysCredited))
                    .col(timestamp_with_time_zone(TaskRecords::CreatedAt))
                    .col(timestamp_with_time_zone(TaskRecords::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(TaskRecords::Table, TaskRecords::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(TaskRecords::Table, TaskRecords::TaskId)
                            .to(TaskDefinitions::Table, TaskDefinitions::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_task_records_user_task")
                    .table(TaskRecords::Table)
                    .col(TaskRecords::UserId)
                    .col(TaskRecords::TaskId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RewardDefinitions::Table)
                    .if_not_exists()
                    .col(integer(RewardDefinitions::Position).primary_key()) // draw order
                    .col(string(RewardDefinitions::BoxTier))
                    .col(string(RewardDefinitions::Name))
                    .col(string(RewardDefinitions::RewardType))
                    .col(string(RewardDefinitions::Rarity))
                    .col(double(RewardDefinitions::Weight))
                    .col(string(RewardDefinitions::RewardData)) // json payload
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reward_definitions_box_tier")
                    .table(RewardDefinitions::Table)
                    .col(RewardDefinitions::BoxTier)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OpenedBoxes::Table)
                    .if_not_exists()
                    .col(pk_auto(OpenedBoxes::Id))
                    .col(integer(OpenedBoxes::UserId))
                    .col(big_integer_null(OpenedBoxes::BoxTokenId))
                    .col(string(OpenedBoxes::BoxTier))
                    .col(
                        big_integer(OpenedBoxes::KeysSpent)
                            .check(Expr::col(OpenedBoxes::KeysSpent).gte(0)),
                    )
                    .col(string(OpenedBoxes::RewardType))
                    .col(string(OpenedBoxes::RewardName))
                    .col(string(OpenedBoxes::RewardData)) // json payload
                    .col(string(OpenedBoxes::RewardTier))
                    .col(timestamp_with_time_zone(OpenedBoxes::OpenedAt))
                    .col(string_null(OpenedBoxes::TxHash))
                    .foreign_key(
                        ForeignKey::create()
                            .from(OpenedBoxes::Table, OpenedBoxes::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_opened_boxes_user")
                    .table(OpenedBoxes::Table)
                    .col(OpenedBoxes::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CampaignInventory::Table)
                    .if_not_exists()
                    .col(integer(CampaignInventory::Id).primary_key()) // singleton row
                    .col(big_integer(CampaignInventory::TotalBoxes))
                    .col(
                        big_integer(CampaignInventory::AvailableBoxes)
                            .check(Expr::col(CampaignInventory::AvailableBoxes).gte(0)),
                    )
                    .col(
                        big_integer(CampaignInventory::OpenedBoxes)
                            .check(Expr::col(CampaignInventory::OpenedBoxes).gte(0)),
                    )
                    .col(timestamp_with_time_zone(CampaignInventory::UpdatedAt))
                    .check(
                        Expr::expr(
                            Expr::col(CampaignInventory::AvailableBoxes)
                                .add(Expr::col(CampaignInventory::OpenedBoxes)),
                        )
                        .eq(Expr::col(CampaignInventory::TotalBoxes)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RewardDistribution::Table)
                    .if_not_exists()
                    .col(string(RewardDistribution::RewardType).primary_key())
                    .col(big_integer(RewardDistribution::Issued))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RewardDistribution::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CampaignInventory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OpenedBoxes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RewardDefinitions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskDefinitions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OwnedBoxes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    WalletAddress, // lowercase 0x-prefixed address
    KeyCount,
    BoxesOwned, // cached mirror of the on-chain balance
    BoxesOpened,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OwnedBoxes {
    Table,
    TokenId,
    UserId, // foreign key to users.id
    Status,
    AcquiredAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TaskDefinitions {
    Table,
    Id,
    Title,
    Kind,
    Platform,
    RewardKeys, // flat award

    Collection, // -------\
    MinBalance, //         +---- nft holding tasks only
    KeysPerNft, //         |
    MaxKeys,    // -------/
}

#[derive(DeriveIden)]
enum TaskRecords {
    Table,
    Id,
    UserId, // foreign key to users.id
    TaskId, // foreign key to task_definitions.id
    Platform,
    KeysCredited, // cumulative keys granted through this record
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RewardDefinitions {
    Table,
    Position,
    BoxTier,
    Name,
    RewardType,
    Rarity,
    Weight,
    RewardData,
}

#[derive(DeriveIden)]
enum OpenedBoxes {
    Table,
    Id,
    UserId, // foreign key to users.id
    BoxTokenId,
    BoxTier,
    KeysSpent, // keys the open cost, per the tier's price at the time
    RewardType,
    RewardName,
    RewardData,
    RewardTier,
    OpenedAt,
    TxHash, // attached after the on-chain burn confirms
}

#[derive(DeriveIden)]
enum CampaignInventory {
    Table,
    Id,
    TotalBoxes,
    AvailableBoxes,
    OpenedBoxes,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RewardDistribution {
    Table,
    RewardType,
    Issued,
}
