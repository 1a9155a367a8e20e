use sea_orm_migration::prelude::*;

/// Money columns. SQLite rejects a decimal precision above 16.
pub(crate) const MONEY_PRECISION: u32 = 16;
pub(crate) const MONEY_SCALE: u32 = 2;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_products_table::Migration),
            Box::new(m20240601_000002_create_inventory_tables::Migration),
            Box::new(m20240601_000003_create_order_tables::Migration),
            Box::new(m20240601_000004_create_ledger_tables::Migration),
        ]
    }
}

mod m20240601_000001_create_products_table {
    use super::{MONEY_PRECISION, MONEY_SCALE};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::VendorId).uuid().not_null())
                        .col(
                            ColumnDef::new(Products::ProductCode)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::UnitPrice)
                                .decimal_len(MONEY_PRECISION, MONEY_SCALE)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::DiscountPercentage)
                                .decimal_len(5, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::StockQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::WeightKg).decimal_len(10, 3).not_null())
                        .col(ColumnDef::new(Products::LengthCm).decimal_len(10, 2).not_null())
                        .col(ColumnDef::new(Products::WidthCm).decimal_len(10, 2).not_null())
                        .col(ColumnDef::new(Products::HeightCm).decimal_len(10, 2).not_null())
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_vendor_id")
                        .table(Products::Table)
                        .col(Products::VendorId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        VendorId,
        ProductCode,
        Name,
        UnitPrice,
        DiscountPercentage,
        StockQuantity,
        WeightKg,
        LengthCm,
        WidthCm,
        HeightCm,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000002_create_inventory_tables {
    use super::m20240601_000001_create_products_table::Products;
    use super::{MONEY_PRECISION, MONEY_SCALE};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_inventory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BatchInventories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BatchInventories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BatchInventories::ProductId).uuid().not_null())
                        .col(ColumnDef::new(BatchInventories::VendorId).uuid().not_null())
                        .col(
                            ColumnDef::new(BatchInventories::BatchNumber)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BatchInventories::LotNumber)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(BatchInventories::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(BatchInventories::UnitCost)
                                .decimal_len(MONEY_PRECISION, MONEY_SCALE)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(BatchInventories::IsSerialized)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(BatchInventories::ManufacturingDate).date().null())
                        .col(ColumnDef::new(BatchInventories::ExpiryDate).date().null())
                        .col(ColumnDef::new(BatchInventories::Notes).text().null())
                        .col(
                            ColumnDef::new(BatchInventories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_batch_inventories_product_id")
                                .from(BatchInventories::Table, BatchInventories::ProductId)
                                .to(Products::Table, Products::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_batch_inventories_product_id")
                        .table(BatchInventories::Table)
                        .col(BatchInventories::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductSerials::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductSerials::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductSerials::BatchInventoryId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductSerials::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(ProductSerials::SerialNumber)
                                .string_len(128)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ProductSerials::Status).string_len(20).not_null())
                        .col(
                            ColumnDef::new(ProductSerials::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductSerials::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_serials_batch_id")
                                .from(ProductSerials::Table, ProductSerials::BatchInventoryId)
                                .to(BatchInventories::Table, BatchInventories::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_serials_batch_status")
                        .table(ProductSerials::Table)
                        .col(ProductSerials::BatchInventoryId)
                        .col(ProductSerials::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ExportInventories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ExportInventories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ExportInventories::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(ExportInventories::BatchInventoryId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ExportInventories::ProductSerialId).uuid().null())
                        .col(ColumnDef::new(ExportInventories::OrderDetailId).uuid().null())
                        .col(ColumnDef::new(ExportInventories::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(ExportInventories::MovementType)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ExportInventories::Notes).text().null())
                        .col(
                            ColumnDef::new(ExportInventories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_export_inventories_batch_id")
                                .from(ExportInventories::Table, ExportInventories::BatchInventoryId)
                                .to(BatchInventories::Table, BatchInventories::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_export_inventories_batch_id")
                        .table(ExportInventories::Table)
                        .col(ExportInventories::BatchInventoryId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_export_inventories_order_detail_id")
                        .table(ExportInventories::Table)
                        .col(ExportInventories::OrderDetailId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ExportInventories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductSerials::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BatchInventories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum BatchInventories {
        Table,
        Id,
        ProductId,
        VendorId,
        BatchNumber,
        LotNumber,
        Quantity,
        UnitCost,
        IsSerialized,
        ManufacturingDate,
        ExpiryDate,
        Notes,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductSerials {
        Table,
        Id,
        BatchInventoryId,
        ProductId,
        SerialNumber,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ExportInventories {
        Table,
        Id,
        ProductId,
        BatchInventoryId,
        ProductSerialId,
        OrderDetailId,
        Quantity,
        MovementType,
        Notes,
        CreatedAt,
    }
}

mod m20240601_000003_create_order_tables {
    use super::{MONEY_PRECISION, MONEY_SCALE};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Orders::Status).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Orders::Subtotal)
                                .decimal_len(MONEY_PRECISION, MONEY_SCALE)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::TaxAmount)
                                .decimal_len(MONEY_PRECISION, MONEY_SCALE)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::ShippingFee)
                                .decimal_len(MONEY_PRECISION, MONEY_SCALE)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::DiscountAmount)
                                .decimal_len(MONEY_PRECISION, MONEY_SCALE)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::TotalAmount)
                                .decimal_len(MONEY_PRECISION, MONEY_SCALE)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::PaymentMethod).string_len(20).not_null())
                        .col(ColumnDef::new(Orders::CourierProvider).string_len(32).not_null())
                        .col(ColumnDef::new(Orders::CourierServiceId).string_len(64).not_null())
                        .col(ColumnDef::new(Orders::CourierServiceName).string().not_null())
                        .col(ColumnDef::new(Orders::PackageLengthCm).integer().not_null())
                        .col(ColumnDef::new(Orders::PackageWidthCm).integer().not_null())
                        .col(ColumnDef::new(Orders::PackageHeightCm).integer().not_null())
                        .col(ColumnDef::new(Orders::PackageWeightGrams).integer().not_null())
                        .col(ColumnDef::new(Orders::ShippingAddress).json().not_null())
                        .col(ColumnDef::new(Orders::Notes).text().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(Orders::ShippedAt).timestamp_with_time_zone().null())
                        .col(
                            ColumnDef::new(Orders::DeliveredAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::CancelledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_customer_id")
                        .table(Orders::Table)
                        .col(Orders::CustomerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderDetails::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderDetails::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderDetails::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderDetails::ProductId).uuid().not_null())
                        .col(ColumnDef::new(OrderDetails::VendorId).uuid().not_null())
                        .col(ColumnDef::new(OrderDetails::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderDetails::UnitPrice)
                                .decimal_len(MONEY_PRECISION, MONEY_SCALE)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderDetails::DiscountAmount)
                                .decimal_len(MONEY_PRECISION, MONEY_SCALE)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderDetails::Subtotal)
                                .decimal_len(MONEY_PRECISION, MONEY_SCALE)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderDetails::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_details_order_id")
                                .from(OrderDetails::Table, OrderDetails::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_details_order_id")
                        .table(OrderDetails::Table)
                        .col(OrderDetails::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Payments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Payments::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Payments::OrderId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Payments::PaymentMethod).string_len(20).not_null())
                        .col(ColumnDef::new(Payments::Gateway).string_len(32).not_null())
                        .col(ColumnDef::new(Payments::GatewayOrderCode).big_integer().null())
                        .col(ColumnDef::new(Payments::GatewayPaymentId).string().null())
                        .col(ColumnDef::new(Payments::CheckoutUrl).text().null())
                        .col(
                            ColumnDef::new(Payments::Amount)
                                .decimal_len(MONEY_PRECISION, MONEY_SCALE)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Payments::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Payments::GatewayResponse).json().null())
                        .col(
                            ColumnDef::new(Payments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Payments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Payments::PaidAt).timestamp_with_time_zone().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payments_order_id")
                                .from(Payments::Table, Payments::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payments_gateway_order_code")
                        .table(Payments::Table)
                        .col(Payments::GatewayOrderCode)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Payments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderDetails::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        CustomerId,
        Status,
        Subtotal,
        TaxAmount,
        ShippingFee,
        DiscountAmount,
        TotalAmount,
        PaymentMethod,
        CourierProvider,
        CourierServiceId,
        CourierServiceName,
        PackageLengthCm,
        PackageWidthCm,
        PackageHeightCm,
        PackageWeightGrams,
        ShippingAddress,
        Notes,
        CreatedAt,
        UpdatedAt,
        ShippedAt,
        DeliveredAt,
        CancelledAt,
    }

    #[derive(DeriveIden)]
    enum OrderDetails {
        Table,
        Id,
        OrderId,
        ProductId,
        VendorId,
        Quantity,
        UnitPrice,
        DiscountAmount,
        Subtotal,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Payments {
        Table,
        Id,
        OrderId,
        PaymentMethod,
        Gateway,
        GatewayOrderCode,
        GatewayPaymentId,
        CheckoutUrl,
        Amount,
        Status,
        GatewayResponse,
        CreatedAt,
        UpdatedAt,
        PaidAt,
    }
}

mod m20240601_000004_create_ledger_tables {
    use super::{MONEY_PRECISION, MONEY_SCALE};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_create_ledger_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Transactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Transactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transactions::TransactionType)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transactions::UserId).uuid().not_null())
                        .col(ColumnDef::new(Transactions::OrderId).uuid().null())
                        .col(
                            ColumnDef::new(Transactions::Amount)
                                .decimal_len(MONEY_PRECISION, MONEY_SCALE)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transactions::Currency)
                                .string_len(3)
                                .not_null()
                                .default("VND"),
                        )
                        .col(ColumnDef::new(Transactions::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Transactions::GatewayReference).string().null())
                        .col(ColumnDef::new(Transactions::Note).text().null())
                        .col(
                            ColumnDef::new(Transactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transactions::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transactions_user_type_status")
                        .table(Transactions::Table)
                        .col(Transactions::UserId)
                        .col(Transactions::TransactionType)
                        .col(Transactions::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transactions_order_id")
                        .table(Transactions::Table)
                        .col(Transactions::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Wallets::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Wallets::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Wallets::VendorId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Wallets::Balance)
                                .decimal_len(MONEY_PRECISION, MONEY_SCALE)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Wallets::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Wallets::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Cashouts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Cashouts::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Cashouts::VendorId).uuid().not_null())
                        .col(ColumnDef::new(Cashouts::TransactionId).uuid().not_null())
                        .col(
                            ColumnDef::new(Cashouts::Amount)
                                .decimal_len(MONEY_PRECISION, MONEY_SCALE)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Cashouts::BankCode).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Cashouts::BankAccountNumber)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Cashouts::AccountHolder).string().not_null())
                        .col(ColumnDef::new(Cashouts::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Cashouts::Reason).text().null())
                        .col(ColumnDef::new(Cashouts::ProcessedBy).uuid().null())
                        .col(
                            ColumnDef::new(Cashouts::ProcessedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Cashouts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cashouts_transaction_id")
                                .from(Cashouts::Table, Cashouts::TransactionId)
                                .to(Transactions::Table, Transactions::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_cashouts_vendor_status")
                        .table(Cashouts::Table)
                        .col(Cashouts::VendorId)
                        .col(Cashouts::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Cashouts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Wallets::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Transactions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Transactions {
        Table,
        Id,
        TransactionType,
        UserId,
        OrderId,
        Amount,
        Currency,
        Status,
        GatewayReference,
        Note,
        CreatedAt,
        CompletedAt,
    }

    #[derive(DeriveIden)]
    enum Wallets {
        Table,
        Id,
        VendorId,
        Balance,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Cashouts {
        Table,
        Id,
        VendorId,
        TransactionId,
        Amount,
        BankCode,
        BankAccountNumber,
        AccountHolder,
        Status,
        Reason,
        ProcessedBy,
        ProcessedAt,
        CreatedAt,
    }
}
