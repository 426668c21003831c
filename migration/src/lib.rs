pub use sea_orm_migration::prelude::*;

pub mod raw;

use crate::raw::*;

pub struct Migrator;

sql_migration!("000001_transit_tables");

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Sql000001TransitTables::boxed()]
    }
}
