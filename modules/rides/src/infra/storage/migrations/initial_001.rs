use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Profiles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Profiles::Role).string().not_null())
                    .col(
                        ColumnDef::new(Profiles::AccountStatus)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Profiles::FullName).string().not_null())
                    .col(ColumnDef::new(Profiles::Phone).string())
                    .col(
                        ColumnDef::new(Profiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Profiles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Drivers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Drivers::UserId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Drivers::Status)
                            .string()
                            .not_null()
                            .default("offline"),
                    )
                    .col(
                        ColumnDef::new(Drivers::IsAvailable)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Drivers::DocumentsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Drivers::BackgroundCheckVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Drivers::CurrentLocation).string())
                    .col(ColumnDef::new(Drivers::CurrentHeading).double())
                    .col(ColumnDef::new(Drivers::LastLocationUpdate).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Drivers::Rating)
                            .double()
                            .not_null()
                            .default(5.0),
                    )
                    .col(
                        ColumnDef::new(Drivers::TotalRides)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Drivers::TotalEarnings)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Drivers::VehicleMake).string())
                    .col(ColumnDef::new(Drivers::VehicleModel).string())
                    .col(ColumnDef::new(Drivers::VehicleColor).string())
                    .col(ColumnDef::new(Drivers::VehiclePlate).string())
                    .col(
                        ColumnDef::new(Drivers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Drivers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_drivers_profile")
                            .from(Drivers::Table, Drivers::UserId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Rides::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Rides::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Rides::PassengerId).uuid().not_null())
                    .col(ColumnDef::new(Rides::DriverId).uuid())
                    .col(
                        ColumnDef::new(Rides::Status)
                            .string()
                            .not_null()
                            .default("requested"),
                    )
                    .col(ColumnDef::new(Rides::PickupAddress).string().not_null())
                    .col(ColumnDef::new(Rides::PickupLocation).string().not_null())
                    .col(ColumnDef::new(Rides::DropoffAddress).string().not_null())
                    .col(ColumnDef::new(Rides::DropoffLocation).string().not_null())
                    .col(ColumnDef::new(Rides::DistanceKm).double())
                    .col(ColumnDef::new(Rides::EstimatedDurationMin).integer())
                    .col(ColumnDef::new(Rides::FareEstimate).double())
                    .col(ColumnDef::new(Rides::FareFinal).double())
                    .col(
                        ColumnDef::new(Rides::SurgeMultiplier)
                            .double()
                            .not_null()
                            .default(1.0),
                    )
                    .col(ColumnDef::new(Rides::PassengerNotes).text())
                    .col(ColumnDef::new(Rides::DriverNotes).text())
                    .col(
                        ColumnDef::new(Rides::RequestedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Rides::AssignedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Rides::PickupAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Rides::DropoffAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Rides::CanceledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Rides::CanceledBy).uuid())
                    .col(ColumnDef::new(Rides::CancellationReason).text())
                    .col(
                        ColumnDef::new(Rides::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Rides::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_rides_status_requested_at")
                    .table(Rides::Table)
                    .col(Rides::Status)
                    .col(Rides::RequestedAt)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_rides_passenger_id")
                    .table(Rides::Table)
                    .col(Rides::PassengerId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_rides_driver_id")
                    .table(Rides::Table)
                    .col(Rides::DriverId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_drivers_status_available")
                    .table(Drivers::Table)
                    .col(Drivers::Status)
                    .col(Drivers::IsAvailable)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Rides::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Drivers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
    Role,
    AccountStatus,
    FullName,
    Phone,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Drivers {
    Table,
    UserId,
    Status,
    IsAvailable,
    DocumentsVerified,
    BackgroundCheckVerified,
    CurrentLocation,
    CurrentHeading,
    LastLocationUpdate,
    Rating,
    TotalRides,
    TotalEarnings,
    VehicleMake,
    VehicleModel,
    VehicleColor,
    VehiclePlate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Rides {
    Table,
    Id,
    PassengerId,
    DriverId,
    Status,
    PickupAddress,
    PickupLocation,
    DropoffAddress,
    DropoffLocation,
    DistanceKm,
    EstimatedDurationMin,
    FareEstimate,
    FareFinal,
    SurgeMultiplier,
    PassengerNotes,
    DriverNotes,
    RequestedAt,
    AssignedAt,
    PickupAt,
    DropoffAt,
    CanceledAt,
    CanceledBy,
    CancellationReason,
    CreatedAt,
    UpdatedAt,
}
