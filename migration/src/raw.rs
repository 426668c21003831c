use sea_orm_migration::{
    async_trait, sea_orm::ConnectionTrait, DbErr, MigrationName, MigrationTrait, SchemaManager,
};

/// A migration written as plain SQL scripts under `src/sql/<name>/`
pub trait RawSql: Send + Sync {
    const NAME: &'static str;

    fn up_sql() -> &'static str;
    fn down_sql() -> &'static str;
}

/// Declares a [`RawSql`] type for `src/sql/<name>/up.sql` and `down.sql`,
/// e.g. `sql_migration!("000001_transit_tables")` gives `Sql000001TransitTables`
#[macro_export]
macro_rules! sql_migration {
    ($name:expr) => {
        paste::paste! {
            pub struct [<Sql $name:camel>];

            impl RawSql for [<Sql $name:camel>] {
                const NAME: &'static str = $name;

                fn up_sql() -> &'static str {
                    include_str!(concat!("sql/", $name, "/up.sql"))
                }

                fn down_sql() -> &'static str {
                    include_str!(concat!("sql/", $name, "/down.sql"))
                }
            }

            impl [<Sql $name:camel>] {
                fn boxed() -> Box<dyn MigrationTrait> {
                    Box::new(RawMigration::<[<Sql $name:camel>]>::new())
                }
            }
        }
    };
}

pub struct RawMigration<T: RawSql> {
    _sql: std::marker::PhantomData<T>,
}

impl<T: RawSql> RawMigration<T> {
    pub fn new() -> Self {
        Self {
            _sql: std::marker::PhantomData,
        }
    }
}

impl<T: RawSql> Default for RawMigration<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RawSql> MigrationName for RawMigration<T> {
    fn name(&self) -> &str {
        T::NAME
    }
}

#[async_trait::async_trait]
impl<T: RawSql> MigrationTrait for RawMigration<T> {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(T::up_sql())
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(T::down_sql())
            .await?;
        Ok(())
    }
}
