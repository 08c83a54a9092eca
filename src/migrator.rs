use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_master_data_tables::Migration),
            Box::new(m20240101_000002_create_quote_tables::Migration),
            Box::new(m20240101_000003_create_purchase_order_tables::Migration),
            Box::new(m20240101_000004_create_aro_tables::Migration),
            Box::new(m20240101_000005_create_delivery_note_tables::Migration),
            Box::new(m20240101_000006_create_invoice_tables::Migration),
            Box::new(m20240101_000007_create_document_sequences_table::Migration),
        ]
    }
}

fn uuid_pk<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().primary_key().to_owned()
}

fn money<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .decimal_len(15, 2)
        .not_null()
        .default(0)
        .to_owned()
}

fn rate<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).decimal_len(5, 4).not_null().to_owned()
}

fn timestamp<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

fn text_null<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).text().null().to_owned()
}

mod m20240101_000001_create_master_data_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_master_data_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(uuid_pk(Customers::Id))
                        .col(ColumnDef::new(Customers::CompanyName).string().not_null())
                        .col(ColumnDef::new(Customers::ContactName).string().null())
                        .col(ColumnDef::new(Customers::Email).string().null())
                        .col(ColumnDef::new(Customers::Phone).string_len(32).null())
                        .col(text_null(Customers::Address))
                        .col(ColumnDef::new(Customers::VatNumber).string_len(64).null())
                        .col(
                            ColumnDef::new(Customers::PerformanceFlag)
                                .string_len(32)
                                .null(),
                        )
                        .col(timestamp(Customers::CreatedAt))
                        .col(timestamp(Customers::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(uuid_pk(Products::Id))
                        .col(
                            ColumnDef::new(Products::ProductCode)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(text_null(Products::Description))
                        .col(text_null(Products::TechnicalSpecs))
                        .col(text_null(Products::CommercialTerms))
                        .col(text_null(Products::PaymentTerms))
                        .col(ColumnDef::new(Products::MinDeliveryDay).integer().null())
                        .col(ColumnDef::new(Products::MaxDeliveryDay).integer().null())
                        .col(ColumnDef::new(Products::AvailabilityYrs).integer().null())
                        .col(money(Products::UnitPrice))
                        .col(ColumnDef::new(Products::Status).string_len(16).not_null())
                        .col(timestamp(Products::CreatedAt))
                        .col(timestamp(Products::UpdatedAt))
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Customers {
        Table,
        Id,
        CompanyName,
        ContactName,
        Email,
        Phone,
        Address,
        VatNumber,
        PerformanceFlag,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        ProductCode,
        Name,
        Description,
        TechnicalSpecs,
        CommercialTerms,
        PaymentTerms,
        MinDeliveryDay,
        MaxDeliveryDay,
        AvailabilityYrs,
        UnitPrice,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_quote_tables {
    use super::m20240101_000001_create_master_data_tables::Customers;
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_quote_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Quotes::Table)
                        .if_not_exists()
                        .col(uuid_pk(Quotes::Id))
                        .col(
                            ColumnDef::new(Quotes::QuoteNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Quotes::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Quotes::SalespersonId).uuid().null())
                        .col(ColumnDef::new(Quotes::DateQuote).date().not_null())
                        .col(ColumnDef::new(Quotes::ValidUntil).date().not_null())
                        .col(ColumnDef::new(Quotes::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Quotes::HasPo)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Quotes::Currency).string_len(3).not_null())
                        .col(money(Quotes::Reduction))
                        .col(rate(Quotes::VatRate))
                        .col(money(Quotes::TotalAmount))
                        .col(money(Quotes::TotalHt))
                        .col(money(Quotes::Vat))
                        .col(money(Quotes::TotalTtc))
                        .col(text_null(Quotes::PaymentTerms))
                        .col(text_null(Quotes::DeliveryTerms))
                        .col(text_null(Quotes::DiscountNotes))
                        .col(ColumnDef::new(Quotes::SignatureName).string().null())
                        .col(ColumnDef::new(Quotes::SignatureTitle).string().null())
                        .col(timestamp(Quotes::CreatedAt))
                        .col(timestamp(Quotes::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_quotes_customer_id")
                                .from(Quotes::Table, Quotes::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(QuoteCustomers::Table)
                        .if_not_exists()
                        .col(uuid_pk(QuoteCustomers::Id))
                        .col(
                            ColumnDef::new(QuoteCustomers::QuoteId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(QuoteCustomers::CustomerId).uuid().not_null())
                        .col(
                            ColumnDef::new(QuoteCustomers::CompanyName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(QuoteCustomers::ContactName).string().null())
                        .col(ColumnDef::new(QuoteCustomers::Email).string().null())
                        .col(ColumnDef::new(QuoteCustomers::Phone).string_len(32).null())
                        .col(text_null(QuoteCustomers::Address))
                        .col(
                            ColumnDef::new(QuoteCustomers::VatNumber)
                                .string_len(64)
                                .null(),
                        )
                        .col(timestamp(QuoteCustomers::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_quote_customers_quote_id")
                                .from(QuoteCustomers::Table, QuoteCustomers::QuoteId)
                                .to(Quotes::Table, Quotes::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(QuoteProducts::Table)
                        .if_not_exists()
                        .col(uuid_pk(QuoteProducts::Id))
                        .col(ColumnDef::new(QuoteProducts::QuoteId).uuid().not_null())
                        .col(ColumnDef::new(QuoteProducts::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(QuoteProducts::ProductCode)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(ColumnDef::new(QuoteProducts::Name).string().not_null())
                        .col(text_null(QuoteProducts::Description))
                        .col(text_null(QuoteProducts::TechnicalSpecs))
                        .col(text_null(QuoteProducts::CommercialTerms))
                        .col(text_null(QuoteProducts::PaymentTerms))
                        .col(ColumnDef::new(QuoteProducts::MinDeliveryDay).integer().null())
                        .col(ColumnDef::new(QuoteProducts::MaxDeliveryDay).integer().null())
                        .col(
                            ColumnDef::new(QuoteProducts::AvailabilityYrs)
                                .integer()
                                .null(),
                        )
                        .col(ColumnDef::new(QuoteProducts::Quantity).integer().not_null())
                        .col(money(QuoteProducts::UnitPrice))
                        .col(money(QuoteProducts::TotalLinePrice))
                        .col(timestamp(QuoteProducts::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_quote_products_quote_id")
                                .from(QuoteProducts::Table, QuoteProducts::QuoteId)
                                .to(Quotes::Table, Quotes::Id)
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
                        .name("uq_quote_products_quote_product")
                        .table(QuoteProducts::Table)
                        .col(QuoteProducts::QuoteId)
                        .col(QuoteProducts::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_quotes_customer_id")
                        .table(Quotes::Table)
                        .col(Quotes::CustomerId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(QuoteProducts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(QuoteCustomers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Quotes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Quotes {
        Table,
        Id,
        QuoteNumber,
        CustomerId,
        SalespersonId,
        DateQuote,
        ValidUntil,
        Status,
        HasPo,
        Currency,
        Reduction,
        VatRate,
        TotalAmount,
        TotalHt,
        Vat,
        TotalTtc,
        PaymentTerms,
        DeliveryTerms,
        DiscountNotes,
        SignatureName,
        SignatureTitle,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum QuoteCustomers {
        Table,
        Id,
        QuoteId,
        CustomerId,
        CompanyName,
        ContactName,
        Email,
        Phone,
        Address,
        VatNumber,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum QuoteProducts {
        Table,
        Id,
        QuoteId,
        ProductId,
        ProductCode,
        Name,
        Description,
        TechnicalSpecs,
        CommercialTerms,
        PaymentTerms,
        MinDeliveryDay,
        MaxDeliveryDay,
        AvailabilityYrs,
        Quantity,
        UnitPrice,
        TotalLinePrice,
        CreatedAt,
    }
}

mod m20240101_000003_create_purchase_order_tables {
    use super::m20240101_000001_create_master_data_tables::Customers;
    use super::m20240101_000002_create_quote_tables::Quotes;
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_purchase_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrders::Table)
                        .if_not_exists()
                        .col(uuid_pk(PurchaseOrders::Id))
                        .col(
                            ColumnDef::new(PurchaseOrders::PoNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(PurchaseOrders::QuoteId).uuid().null())
                        .col(ColumnDef::new(PurchaseOrders::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(PurchaseOrders::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::PlannedDeliveryDate)
                                .date()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::ActualDeliveryDate)
                                .date()
                                .null(),
                        )
                        .col(text_null(PurchaseOrders::Remarks))
                        .col(ColumnDef::new(PurchaseOrders::PdfPath).string().null())
                        .col(timestamp(PurchaseOrders::CreatedAt))
                        .col(timestamp(PurchaseOrders::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_orders_customer_id")
                                .from(PurchaseOrders::Table, PurchaseOrders::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_orders_quote_id")
                                .from(PurchaseOrders::Table, PurchaseOrders::QuoteId)
                                .to(Quotes::Table, Quotes::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PoCustomers::Table)
                        .if_not_exists()
                        .col(uuid_pk(PoCustomers::Id))
                        .col(
                            ColumnDef::new(PoCustomers::PurchaseOrderId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(PoCustomers::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(PoCustomers::CompanyName).string().not_null())
                        .col(ColumnDef::new(PoCustomers::ContactName).string().null())
                        .col(ColumnDef::new(PoCustomers::Email).string().null())
                        .col(ColumnDef::new(PoCustomers::Phone).string_len(32).null())
                        .col(text_null(PoCustomers::Address))
                        .col(ColumnDef::new(PoCustomers::VatNumber).string_len(64).null())
                        .col(timestamp(PoCustomers::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_po_customers_purchase_order_id")
                                .from(PoCustomers::Table, PoCustomers::PurchaseOrderId)
                                .to(PurchaseOrders::Table, PurchaseOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PoProducts::Table)
                        .if_not_exists()
                        .col(uuid_pk(PoProducts::Id))
                        .col(ColumnDef::new(PoProducts::PurchaseOrderId).uuid().not_null())
                        .col(ColumnDef::new(PoProducts::QuoteProductId).uuid().null())
                        .col(ColumnDef::new(PoProducts::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(PoProducts::ProductCode)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PoProducts::Name).string().not_null())
                        .col(text_null(PoProducts::Description))
                        .col(text_null(PoProducts::TechnicalSpecs))
                        .col(text_null(PoProducts::CommercialTerms))
                        .col(text_null(PoProducts::PaymentTerms))
                        .col(ColumnDef::new(PoProducts::MinDeliveryDay).integer().null())
                        .col(ColumnDef::new(PoProducts::MaxDeliveryDay).integer().null())
                        .col(ColumnDef::new(PoProducts::AvailabilityYrs).integer().null())
                        .col(ColumnDef::new(PoProducts::Quantity).integer().not_null())
                        .col(money(PoProducts::UnitPrice))
                        .col(money(PoProducts::TotalLinePrice))
                        .col(timestamp(PoProducts::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_po_products_purchase_order_id")
                                .from(PoProducts::Table, PoProducts::PurchaseOrderId)
                                .to(PurchaseOrders::Table, PurchaseOrders::Id)
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
                        .name("idx_purchase_orders_quote_id")
                        .table(PurchaseOrders::Table)
                        .col(PurchaseOrders::QuoteId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PoProducts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PoCustomers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum PurchaseOrders {
        Table,
        Id,
        PoNumber,
        CustomerId,
        QuoteId,
        CreatedBy,
        Status,
        PlannedDeliveryDate,
        ActualDeliveryDate,
        Remarks,
        PdfPath,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PoCustomers {
        Table,
        Id,
        PurchaseOrderId,
        CustomerId,
        CompanyName,
        ContactName,
        Email,
        Phone,
        Address,
        VatNumber,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum PoProducts {
        Table,
        Id,
        PurchaseOrderId,
        QuoteProductId,
        ProductId,
        ProductCode,
        Name,
        Description,
        TechnicalSpecs,
        CommercialTerms,
        PaymentTerms,
        MinDeliveryDay,
        MaxDeliveryDay,
        AvailabilityYrs,
        Quantity,
        UnitPrice,
        TotalLinePrice,
        CreatedAt,
    }
}

mod m20240101_000004_create_aro_tables {
    use super::m20240101_000003_create_purchase_order_tables::PurchaseOrders;
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_aro_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Aros::Table)
                        .if_not_exists()
                        .col(uuid_pk(Aros::Id))
                        .col(
                            ColumnDef::new(Aros::AroNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Aros::PurchaseOrderId).uuid().not_null())
                        .col(ColumnDef::new(Aros::DateAro).date().not_null())
                        .col(ColumnDef::new(Aros::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Aros::CreatedBy).uuid().null())
                        .col(text_null(Aros::Remarks))
                        .col(timestamp(Aros::CreatedAt))
                        .col(timestamp(Aros::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_aros_purchase_order_id")
                                .from(Aros::Table, Aros::PurchaseOrderId)
                                .to(PurchaseOrders::Table, PurchaseOrders::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(AroProducts::Table)
                        .if_not_exists()
                        .col(uuid_pk(AroProducts::Id))
                        .col(ColumnDef::new(AroProducts::AroId).uuid().not_null())
                        .col(ColumnDef::new(AroProducts::QuoteProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(AroProducts::QuantityReceived)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(AroProducts::Remarks).string_len(500).null())
                        .col(timestamp(AroProducts::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_aro_products_aro_id")
                                .from(AroProducts::Table, AroProducts::AroId)
                                .to(Aros::Table, Aros::Id)
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
                        .name("uq_aro_products_aro_quote_product")
                        .table(AroProducts::Table)
                        .col(AroProducts::AroId)
                        .col(AroProducts::QuoteProductId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_aros_purchase_order_id")
                        .table(Aros::Table)
                        .col(Aros::PurchaseOrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AroProducts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Aros::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Aros {
        Table,
        Id,
        AroNumber,
        PurchaseOrderId,
        DateAro,
        Status,
        CreatedBy,
        Remarks,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum AroProducts {
        Table,
        Id,
        AroId,
        QuoteProductId,
        QuantityReceived,
        Remarks,
        CreatedAt,
    }
}

mod m20240101_000005_create_delivery_note_tables {
    use super::m20240101_000004_create_aro_tables::Aros;
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_delivery_note_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DeliveryNotes::Table)
                        .if_not_exists()
                        .col(uuid_pk(DeliveryNotes::Id))
                        .col(
                            ColumnDef::new(DeliveryNotes::DnpNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNotes::PurchaseOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryNotes::QuoteId).uuid().null())
                        .col(ColumnDef::new(DeliveryNotes::AroId).uuid().not_null())
                        .col(
                            ColumnDef::new(DeliveryNotes::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryNotes::DateDelivery).date().not_null())
                        .col(
                            ColumnDef::new(DeliveryNotes::PlannedDeliveryDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNotes::ActualDeliveryDate)
                                .date()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNotes::DeliveryAddress)
                                .text()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryNotes::Incoterms).string_len(20).null())
                        .col(text_null(DeliveryNotes::PackagingDetails))
                        .col(text_null(DeliveryNotes::Remarks))
                        .col(ColumnDef::new(DeliveryNotes::CreatedBy).uuid().null())
                        .col(timestamp(DeliveryNotes::CreatedAt))
                        .col(timestamp(DeliveryNotes::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_delivery_notes_aro_id")
                                .from(DeliveryNotes::Table, DeliveryNotes::AroId)
                                .to(Aros::Table, Aros::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DnpProducts::Table)
                        .if_not_exists()
                        .col(uuid_pk(DnpProducts::Id))
                        .col(ColumnDef::new(DnpProducts::DeliveryNoteId).uuid().not_null())
                        .col(ColumnDef::new(DnpProducts::AroProductId).uuid().not_null())
                        .col(ColumnDef::new(DnpProducts::PoProductId).uuid().not_null())
                        .col(ColumnDef::new(DnpProducts::QuoteProductId).uuid().not_null())
                        .col(ColumnDef::new(DnpProducts::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(DnpProducts::ProductCode)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(ColumnDef::new(DnpProducts::Name).string().not_null())
                        .col(text_null(DnpProducts::Description))
                        .col(
                            ColumnDef::new(DnpProducts::QuantityShipped)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(money(DnpProducts::UnitPrice))
                        .col(money(DnpProducts::TotalLinePrice))
                        .col(text_null(DnpProducts::SerialNumbers))
                        .col(ColumnDef::new(DnpProducts::TrackingCode).string().null())
                        .col(timestamp(DnpProducts::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_dnp_products_delivery_note_id")
                                .from(DnpProducts::Table, DnpProducts::DeliveryNoteId)
                                .to(DeliveryNotes::Table, DeliveryNotes::Id)
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
                        .name("idx_delivery_notes_aro_id")
                        .table(DeliveryNotes::Table)
                        .col(DeliveryNotes::AroId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DnpProducts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DeliveryNotes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum DeliveryNotes {
        Table,
        Id,
        DnpNumber,
        PurchaseOrderId,
        QuoteId,
        AroId,
        Status,
        DateDelivery,
        PlannedDeliveryDate,
        ActualDeliveryDate,
        DeliveryAddress,
        Incoterms,
        PackagingDetails,
        Remarks,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum DnpProducts {
        Table,
        Id,
        DeliveryNoteId,
        AroProductId,
        PoProductId,
        QuoteProductId,
        ProductId,
        ProductCode,
        Name,
        Description,
        QuantityShipped,
        UnitPrice,
        TotalLinePrice,
        SerialNumbers,
        TrackingCode,
        CreatedAt,
    }
}

mod m20240101_000006_create_invoice_tables {
    use super::m20240101_000002_create_quote_tables::Quotes;
    use super::m20240101_000005_create_delivery_note_tables::DeliveryNotes;
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_invoice_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Invoices::Table)
                        .if_not_exists()
                        .col(uuid_pk(Invoices::Id))
                        .col(
                            ColumnDef::new(Invoices::InvoiceNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Invoices::QuoteId).uuid().not_null())
                        .col(ColumnDef::new(Invoices::DeliveryNoteId).uuid().null())
                        .col(ColumnDef::new(Invoices::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Invoices::IssueDate).date().not_null())
                        .col(ColumnDef::new(Invoices::DueDate).date().not_null())
                        .col(ColumnDef::new(Invoices::Currency).string_len(3).not_null())
                        .col(text_null(Invoices::PaymentTerms))
                        .col(ColumnDef::new(Invoices::CustomerName).string().not_null())
                        .col(
                            ColumnDef::new(Invoices::CustomerContactPerson)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(Invoices::CustomerEmail).string().null())
                        .col(ColumnDef::new(Invoices::CustomerPhone).string_len(32).null())
                        .col(text_null(Invoices::CustomerAddress))
                        .col(ColumnDef::new(Invoices::CustomerVat).string_len(64).null())
                        .col(
                            ColumnDef::new(Invoices::SupplierVatNumber)
                                .string_len(64)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Invoices::SupplierIsoCertification)
                                .string()
                                .null(),
                        )
                        .col(rate(Invoices::VatRate))
                        .col(money(Invoices::SubTotal))
                        .col(money(Invoices::DiscountTotal))
                        .col(money(Invoices::TaxTotal))
                        .col(money(Invoices::GrandTotal))
                        .col(text_null(Invoices::Notes))
                        .col(text_null(Invoices::Remarks))
                        .col(ColumnDef::new(Invoices::CreatedBy).uuid().null())
                        .col(timestamp(Invoices::CreatedAt))
                        .col(timestamp(Invoices::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_invoices_quote_id")
                                .from(Invoices::Table, Invoices::QuoteId)
                                .to(Quotes::Table, Quotes::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_invoices_delivery_note_id")
                                .from(Invoices::Table, Invoices::DeliveryNoteId)
                                .to(DeliveryNotes::Table, DeliveryNotes::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InvoiceLines::Table)
                        .if_not_exists()
                        .col(uuid_pk(InvoiceLines::Id))
                        .col(ColumnDef::new(InvoiceLines::InvoiceId).uuid().not_null())
                        .col(ColumnDef::new(InvoiceLines::QuoteProductId).uuid().null())
                        .col(ColumnDef::new(InvoiceLines::DnpProductId).uuid().null())
                        .col(
                            ColumnDef::new(InvoiceLines::ProductCode)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(ColumnDef::new(InvoiceLines::Name).string().not_null())
                        .col(text_null(InvoiceLines::Description))
                        .col(
                            ColumnDef::new(InvoiceLines::QuantityInvoiced)
                                .integer()
                                .not_null(),
                        )
                        .col(money(InvoiceLines::UnitPrice))
                        .col(money(InvoiceLines::TotalHt))
                        .col(money(InvoiceLines::VatAmount))
                        .col(money(InvoiceLines::Reduction))
                        .col(money(InvoiceLines::LineTotal))
                        .col(timestamp(InvoiceLines::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_invoice_lines_invoice_id")
                                .from(InvoiceLines::Table, InvoiceLines::InvoiceId)
                                .to(Invoices::Table, Invoices::Id)
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
                        .name("idx_invoices_quote_id")
                        .table(Invoices::Table)
                        .col(Invoices::QuoteId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InvoiceLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Invoices::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Invoices {
        Table,
        Id,
        InvoiceNumber,
        QuoteId,
        DeliveryNoteId,
        Status,
        IssueDate,
        DueDate,
        Currency,
        PaymentTerms,
        CustomerName,
        CustomerContactPerson,
        CustomerEmail,
        CustomerPhone,
        CustomerAddress,
        CustomerVat,
        SupplierVatNumber,
        SupplierIsoCertification,
        VatRate,
        SubTotal,
        DiscountTotal,
        TaxTotal,
        GrandTotal,
        Notes,
        Remarks,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum InvoiceLines {
        Table,
        Id,
        InvoiceId,
        QuoteProductId,
        DnpProductId,
        ProductCode,
        Name,
        Description,
        QuantityInvoiced,
        UnitPrice,
        TotalHt,
        VatAmount,
        Reduction,
        LineTotal,
        CreatedAt,
    }
}

mod m20240101_000007_create_document_sequences_table {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000007_create_document_sequences_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DocumentSequences::Table)
                        .if_not_exists()
                        .col(uuid_pk(DocumentSequences::Id))
                        .col(
                            ColumnDef::new(DocumentSequences::Kind)
                                .string_len(24)
                                .not_null(),
                        )
                        .col(ColumnDef::new(DocumentSequences::Year).integer().not_null())
                        .col(
                            ColumnDef::new(DocumentSequences::LastValue)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(timestamp(DocumentSequences::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            // One counter per kind and year; a racing insert fails here and is retried.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_document_sequences_kind_year")
                        .table(DocumentSequences::Table)
                        .col(DocumentSequences::Kind)
                        .col(DocumentSequences::Year)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DocumentSequences::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DocumentSequences {
        Table,
        Id,
        Kind,
        Year,
        LastValue,
        UpdatedAt,
    }
}
